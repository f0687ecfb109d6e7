//! Command handlers for the CLI.
//!
//! `App` owns the config, the session-bound auth service and the resume
//! processor, and turns each subcommand into calls on them.

use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{debug, warn};

use applyzen_core::{
    password_strength, ApiClient, ApiError, ApiRequest, AuthService, Config, KeyringTokenStore,
    LoginForm, RegisterForm, ResumeError, ResumeProcessor, SessionStore,
};

pub struct App {
    config: Config,
    auth: AuthService,
    resume: ResumeProcessor,
}

impl App {
    pub fn new(config: Config) -> Result<Self> {
        let cache_dir = config.cache_dir().unwrap_or_else(|_| PathBuf::from("./cache"));
        debug!(?cache_dir, "Cache directory configured");

        let session = SessionStore::new(Arc::new(KeyringTokenStore::new()))
            .with_session_file(cache_dir);
        match session.restore() {
            Ok(authenticated) => debug!(authenticated, "Session loaded"),
            Err(e) => warn!(error = %e, "Failed to restore session"),
        }

        let api = ApiClient::new(&config, session).context("Failed to create API client")?;
        let resume = ResumeProcessor::new(&config).context("Failed to create upload client")?;

        Ok(Self {
            config,
            auth: AuthService::new(api),
            resume,
        })
    }

    pub async fn login(&mut self, email: Option<String>) -> Result<()> {
        let email = match email.or_else(|| self.config.last_username.clone()) {
            Some(email) => email,
            None => prompt("Email: ")?,
        };
        let password = rpassword::prompt_password("Password: ")?;

        println!("Signing in...");
        self.auth
            .login(&LoginForm::new(email.as_str(), password))
            .await
            .map_err(|e| match e {
                ApiError::Unauthorized => anyhow::anyhow!("Invalid email or password"),
                other => other.into(),
            })?;

        if let Err(e) = self.config.remember_username(&email) {
            warn!(error = %e, "Failed to save config");
        }
        println!("Signed in as {}", email);
        Ok(())
    }

    pub async fn register(&mut self, name: String, email: String) -> Result<()> {
        let password = rpassword::prompt_password("Password: ")?;
        let strength = password_strength(&password);
        if !strength.label.is_empty() {
            println!("Password strength: {} ({}/5)", strength.label, strength.score);
        }
        let confirm_password = rpassword::prompt_password("Confirm password: ")?;

        let form = RegisterForm {
            name,
            email: email.clone(),
            password,
            confirm_password,
        };
        self.auth.register(&form).await?;

        if let Err(e) = self.config.remember_username(&email) {
            warn!(error = %e, "Failed to save config");
        }
        println!("Registration successful!");
        Ok(())
    }

    pub async fn logout(&self) -> Result<()> {
        self.auth.logout().await?;
        println!("Logged out successfully!");
        Ok(())
    }

    pub fn status(&self) {
        let session = self.auth.session().snapshot();
        if !session.is_authenticated {
            println!("Not signed in");
            return;
        }

        println!(
            "Signed in as {}",
            session.identity.as_deref().unwrap_or("(unknown)")
        );
        if let Some(at) = session.authenticated_at {
            println!("Since {}", at.format("%b %d, %Y %H:%M UTC"));
        }
        println!("Backend: {}", self.auth.api().base_url());
    }

    pub async fn get(&self, path: &str) -> Result<()> {
        let response = self.auth.api().send(&ApiRequest::get(path)).await?;
        let text = response.text().await.context("Failed to read response body")?;

        match serde_json::from_str::<serde_json::Value>(&text) {
            Ok(json) => println!("{}", serde_json::to_string_pretty(&json)?),
            Err(_) => println!("{}", text),
        }
        Ok(())
    }

    pub fn strength(&self, password: Option<String>) -> Result<()> {
        let password = match password {
            Some(p) => p,
            None => rpassword::prompt_password("Password: ")?,
        };
        let strength = password_strength(&password);
        if strength.label.is_empty() {
            println!("No password given");
        } else {
            println!("{} ({}/5, {}%)", strength.label, strength.score, strength.percent());
        }
        Ok(())
    }

    pub async fn resume(&self, file: Option<&Path>, output: Option<&Path>) -> Result<()> {
        println!("Processing resume...");
        let processed = self
            .resume
            .process(file, output, |percent| {
                print!("\r{:>3}%", percent);
                let _ = io::stdout().flush();
            })
            .await?;
        println!();

        if processed.simulated {
            println!("Resume processed locally (processing service unavailable)");
        } else {
            println!("Resume processed successfully!");
        }
        println!("Saved to {}", processed.output_path.display());
        println!("{}", serde_json::to_string_pretty(&processed)?);
        Ok(())
    }
}

fn prompt(label: &str) -> Result<String> {
    print!("{}", label);
    io::stdout().flush()?;

    let mut input = String::new();
    io::stdin().read_line(&mut input)?;
    Ok(input.trim().to_string())
}

/// Turn a command failure into the message shown to the user
pub fn user_message(err: &anyhow::Error) -> String {
    if let Some(api_err) = err.downcast_ref::<ApiError>() {
        return match api_err {
            ApiError::SessionExpired(_) => {
                "Session expired. Please run `applyzen login`.".to_string()
            }
            ApiError::NoRefreshToken => "Not signed in. Please run `applyzen login`.".to_string(),
            ApiError::Unauthorized => {
                "Not authorized. Please run `applyzen login`.".to_string()
            }
            ApiError::Validation(errors) => {
                let lines: Vec<String> = errors
                    .iter()
                    .map(|(field, message)| format!("  - {}: {}", field, message))
                    .collect();
                format!("Please fix the following:\n{}", lines.join("\n"))
            }
            ApiError::NetworkError(_) => {
                "Unable to connect to server. Check your connection.".to_string()
            }
            other => format!("Error: {}", other),
        };
    }
    if let Some(resume_err) = err.downcast_ref::<ResumeError>() {
        return resume_err.to_string();
    }
    format!("Error: {:#}", err)
}
