//! ApplyZen CLI - sign in, sign up and upload resumes from the terminal.

mod app;

use std::io;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::{error, info};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use applyzen_core::Config;

use app::App;

/// Log file name prefix inside the cache directory
const LOG_FILE_PREFIX: &str = "applyzen.log";

#[derive(Parser)]
#[command(name = "applyzen", version, about = "Job-search productivity, from the terminal")]
struct Cli {
    /// Backend base URL (overrides config and APPLYZEN_API_URL)
    #[arg(long, global = true)]
    api_url: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Sign in to an existing account
    Login {
        /// E-mail address (defaults to the last one used)
        #[arg(long)]
        email: Option<String>,
    },
    /// Create an account
    Register {
        #[arg(long)]
        name: String,
        #[arg(long)]
        email: String,
    },
    /// Sign out and forget the stored session
    Logout,
    /// Show the current session
    Status,
    /// Fetch a backend path with the current session
    Get {
        /// Path relative to the backend base URL, e.g. /profile
        path: String,
    },
    /// Rate a password without sending it anywhere
    Strength {
        /// Password to rate (prompted for when omitted)
        password: Option<String>,
    },
    /// Upload a resume (PDF or Word) for processing
    Resume {
        file: Option<PathBuf>,

        /// Where to save the processed document (default: Tailored_Resume.<ext>
        /// next to the input)
        #[arg(long, short)]
        output: Option<PathBuf>,
    },
}

/// Initialize the tracing subscriber for logging.
///
/// Stderr output follows RUST_LOG (default `warn`); when a log directory is
/// available the same events also go to a daily rolling file there.
fn init_tracing(log_dir: Option<&Path>) -> Option<WorkerGuard> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    let (file_layer, guard) = match log_dir {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, LOG_FILE_PREFIX);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            (Some(fmt::layer().with_writer(writer).with_ansi(false)), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(file_layer)
        .with(filter)
        .init();

    guard
}

#[tokio::main]
async fn main() -> ExitCode {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    let config = match Config::load() {
        Ok(config) => config.with_overrides(cli.api_url.clone(), None),
        Err(e) => {
            eprintln!("Error: {:#}", e);
            return ExitCode::FAILURE;
        }
    };

    let log_dir = config
        .cache_dir()
        .ok()
        .filter(|dir| std::fs::create_dir_all(dir).is_ok());
    let _guard = init_tracing(log_dir.as_deref());
    info!("ApplyZen CLI starting");

    let app = match App::new(config) {
        Ok(app) => app,
        Err(e) => {
            error!(error = %e, "Startup failed");
            eprintln!("Error: {:#}", e);
            return ExitCode::FAILURE;
        }
    };

    match run(app, cli.command).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "Command failed");
            eprintln!("{}", app::user_message(&e));
            ExitCode::FAILURE
        }
    }
}

async fn run(mut app: App, command: Command) -> Result<()> {
    match command {
        Command::Login { email } => app.login(email).await,
        Command::Register { name, email } => app.register(name, email).await,
        Command::Logout => app.logout().await,
        Command::Status => {
            app.status();
            Ok(())
        }
        Command::Get { path } => app.get(&path).await,
        Command::Strength { password } => app.strength(password),
        Command::Resume { file, output } => {
            app.resume(file.as_deref(), output.as_deref()).await
        }
    }
}
