mod common;

use applyzen_core::{ApiError, ApiRequest};
use common::{hits, Harness};
use pretty_assertions::assert_eq;
use serde_json::json;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// First call to `route` answers 401, later calls answer `then`
async fn expire_once(server: &MockServer, route: &str, then: ResponseTemplate) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(ResponseTemplate::new(401))
        .up_to_n_times(1)
        .expect(1)
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(then)
        .expect(1)
        .mount(server)
        .await;
}

#[tokio::test]
async fn success_is_returned_without_refresh() {
    let server = MockServer::start().await;
    let harness = Harness::signed_in(&server, "rt-1");

    Mock::given(method("GET"))
        .and(path("/profile"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "name": "Ada" })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(path("/refresh"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let profile: serde_json::Value = harness.api.get_json("/profile").await.unwrap();
    assert_eq!(profile, json!({ "name": "Ada" }));
}

#[tokio::test]
async fn single_401_refreshes_once_and_resends_once() {
    let server = MockServer::start().await;
    let harness = Harness::signed_in(&server, "rt-1");

    expire_once(
        &server,
        "/profile",
        ResponseTemplate::new(200).set_body_json(json!({ "name": "Ada" })),
    )
    .await;
    Mock::given(method("POST"))
        .and(path("/refresh"))
        .and(body_json(json!({ "refresh_token": "rt-1" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "refresh_token": "rt-2" })))
        .expect(1)
        .mount(&server)
        .await;

    let profile: serde_json::Value = harness.api.get_json("/profile").await.unwrap();
    assert_eq!(profile, json!({ "name": "Ada" }));

    // Rotated token replaces the old one in memory and in storage
    assert!(harness.session.is_authenticated());
    assert_eq!(harness.session.refresh_token().as_deref(), Some("rt-2"));
    assert_eq!(harness.stored_token().as_deref(), Some("rt-2"));
}

#[tokio::test]
async fn second_401_is_propagated_without_another_refresh() {
    let server = MockServer::start().await;
    let harness = Harness::signed_in(&server, "rt-1");

    Mock::given(method("GET"))
        .and(path("/profile"))
        .respond_with(ResponseTemplate::new(401))
        .expect(2)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/refresh"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "refresh_token": "rt-2" })))
        .expect(1)
        .mount(&server)
        .await;

    let err = harness.api.send(&ApiRequest::get("/profile")).await.unwrap_err();
    assert!(matches!(err, ApiError::Unauthorized), "got {err:?}");

    // The refresh itself succeeded, so the session survives
    assert!(harness.session.is_authenticated());
}

#[tokio::test]
async fn failed_refresh_clears_session_and_reports_expiry() {
    let server = MockServer::start().await;
    let harness = Harness::signed_in(&server, "stale");

    Mock::given(method("GET"))
        .and(path("/profile"))
        .respond_with(ResponseTemplate::new(401))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/refresh"))
        .and(body_json(json!({ "refresh_token": "stale" })))
        .respond_with(ResponseTemplate::new(401))
        .expect(1)
        .mount(&server)
        .await;

    let err = harness.api.send(&ApiRequest::get("/profile")).await.unwrap_err();
    match err {
        ApiError::SessionExpired(cause) => assert!(matches!(*cause, ApiError::Unauthorized)),
        other => panic!("expected SessionExpired, got {other:?}"),
    }

    assert!(!harness.session.is_authenticated());
    assert_eq!(harness.session.refresh_token(), None);
    assert_eq!(harness.stored_token(), None);
}

#[tokio::test]
async fn missing_refresh_token_expires_session_without_refresh_call() {
    let server = MockServer::start().await;
    let harness = Harness::new(&server);

    Mock::given(method("GET"))
        .and(path("/profile"))
        .respond_with(ResponseTemplate::new(401))
        .expect(1)
        .mount(&server)
        .await;

    let err = harness.api.send(&ApiRequest::get("/profile")).await.unwrap_err();
    match err {
        ApiError::SessionExpired(cause) => assert!(matches!(*cause, ApiError::NoRefreshToken)),
        other => panic!("expected SessionExpired, got {other:?}"),
    }
    assert_eq!(hits(&server, "/refresh").await, 0);
    assert!(!harness.session.is_authenticated());
}

#[tokio::test]
async fn refresh_server_error_is_the_reported_cause() {
    let server = MockServer::start().await;
    let harness = Harness::signed_in(&server, "rt-1");

    Mock::given(method("GET"))
        .and(path("/profile"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/refresh"))
        .respond_with(ResponseTemplate::new(503).set_body_string("maintenance"))
        .expect(1)
        .mount(&server)
        .await;

    let err = harness.api.send(&ApiRequest::get("/profile")).await.unwrap_err();
    match err {
        ApiError::SessionExpired(cause) => {
            assert!(matches!(*cause, ApiError::ServerError(ref body) if body == "maintenance"))
        }
        other => panic!("expected SessionExpired, got {other:?}"),
    }
    assert!(!harness.session.is_authenticated());
}

#[tokio::test]
async fn other_errors_are_not_retried() {
    let server = MockServer::start().await;
    let harness = Harness::signed_in(&server, "rt-1");

    Mock::given(method("POST"))
        .and(path("/applications"))
        .respond_with(ResponseTemplate::new(422).set_body_string("title is required"))
        .expect(1)
        .mount(&server)
        .await;

    let err = harness
        .api
        .post_json::<serde_json::Value, _>("/applications", &json!({}))
        .await
        .unwrap_err();
    assert!(matches!(err, ApiError::BadRequest(ref body) if body == "title is required"));
    assert_eq!(hits(&server, "/refresh").await, 0);
    assert!(harness.session.is_authenticated());
}

#[tokio::test]
async fn resend_carries_the_refreshed_cookie() {
    let server = MockServer::start().await;
    let harness = Harness::signed_in(&server, "rt-1");

    Mock::given(method("GET"))
        .and(path("/profile"))
        .respond_with(ResponseTemplate::new(401))
        .up_to_n_times(1)
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/profile"))
        .and(header("cookie", "access_token=fresh"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "ok": true })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/refresh"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("set-cookie", "access_token=fresh; Path=/")
                .set_body_json(json!({ "refresh_token": "rt-2" })),
        )
        .expect(1)
        .mount(&server)
        .await;

    let body: serde_json::Value = harness.api.get_json("/profile").await.unwrap();
    assert_eq!(body, json!({ "ok": true }));
}

#[tokio::test]
async fn refresh_without_rotation_keeps_token() {
    let server = MockServer::start().await;
    let harness = Harness::signed_in(&server, "rt-1");

    expire_once(&server, "/profile", ResponseTemplate::new(204)).await;
    Mock::given(method("POST"))
        .and(path("/refresh"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let response = harness.api.send(&ApiRequest::get("/profile")).await.unwrap();
    assert_eq!(response.status(), 204);
    assert_eq!(harness.stored_token().as_deref(), Some("rt-1"));
}

#[tokio::test]
async fn plain_text_refresh_success_keeps_session() {
    let server = MockServer::start().await;
    let harness = Harness::signed_in(&server, "rt-1");

    expire_once(
        &server,
        "/profile",
        ResponseTemplate::new(200).set_body_json(json!({ "name": "Ada" })),
    )
    .await;
    Mock::given(method("POST"))
        .and(path("/refresh"))
        .respond_with(ResponseTemplate::new(200).set_body_string("Token refreshed"))
        .expect(1)
        .mount(&server)
        .await;

    let profile: serde_json::Value = harness.api.get_json("/profile").await.unwrap();
    assert_eq!(profile, json!({ "name": "Ada" }));
    assert!(harness.session.is_authenticated());
    assert_eq!(harness.stored_token().as_deref(), Some("rt-1"));
}

#[tokio::test]
async fn concurrent_401s_each_refresh_independently() {
    let server = MockServer::start().await;
    let harness = Harness::signed_in(&server, "rt-1");

    expire_once(&server, "/jobs", ResponseTemplate::new(200).set_body_json(json!([]))).await;
    expire_once(&server, "/profile", ResponseTemplate::new(200).set_body_json(json!({}))).await;
    Mock::given(method("POST"))
        .and(path("/refresh"))
        .and(body_json(json!({ "refresh_token": "rt-1" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(2)
        .mount(&server)
        .await;

    let jobs = ApiRequest::get("/jobs");
    let profile = ApiRequest::get("/profile");
    let (a, b) = futures::join!(harness.api.send(&jobs), harness.api.send(&profile));
    assert!(a.is_ok());
    assert!(b.is_ok());
}
