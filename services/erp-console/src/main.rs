//! ERP admin console
//!
//! Command-line client for the ERP REST API:
//! 1. Loads configuration and the persisted session
//! 2. Logs in, or reuses the stored access token
//! 3. Sends every protected call through the refresh gate, so an expired
//!    token is refreshed once and the call replayed transparently

mod cli;
mod config;
mod error;
mod metrics;

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use erp_auth::{Credentials, LoginData, LoginOutcome, PROFILE_PATH, TokenStore};
use erp_gate::AuthClient;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use transport::{ApiRequest, HttpTransport};

use crate::cli::{Args, Command, LogFormat};
use crate::config::Config;

fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_env("LOG_LEVEL")
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new("info"));
    let registry = tracing_subscriber::registry().with(filter);
    match format {
        LogFormat::Json => registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init(),
        LogFormat::Pretty => registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init(),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing(args.log_format);

    // Install before any request so the gate's counters are captured
    let prometheus = args.metrics.then(metrics::install_recorder);

    let config_path = Config::resolve_path(args.config.as_deref());
    info!(path = %config_path.display(), "loading configuration");
    let config = Config::load(&config_path)
        .with_context(|| format!("failed to load config from {}", config_path.display()))?;

    let store = match &config.session.file {
        Some(path) => TokenStore::load(path.clone())
            .await
            .with_context(|| format!("failed to load session from {}", path.display()))?,
        None => TokenStore::in_memory(),
    };
    let transport = HttpTransport::new(config.api.base_url.clone(), config.api.timeout())
        .context("failed to build HTTP client")?;
    info!(
        base_url = %config.api.base_url,
        timeout_secs = config.api.timeout_secs,
        refresh_timeout_secs = config.api.refresh_timeout_secs,
        logged_in = store.is_logged_in().await,
        "configuration loaded"
    );

    let client = AuthClient::with_defaults(
        Arc::new(transport),
        Arc::new(store),
        config.api.refresh_timeout(),
    );

    let outcome = run(&client, &config, args.command).await;

    if let Some(handle) = prometheus {
        eprintln!("{}", handle.render());
    }
    outcome
}

async fn run(client: &AuthClient, config: &Config, command: Command) -> Result<()> {
    match command {
        Command::Login { otp } => {
            let user = config
                .login
                .user_or_email
                .clone()
                .context("login.user_or_email is not configured")?;
            let password = config
                .login
                .password
                .clone()
                .context("no password: set ERP_PASSWORD or login.password_file")?;
            let mut credentials = Credentials::new(user, password);

            let outcome = match otp {
                Some(otp) => {
                    credentials = credentials.with_otp(otp);
                    client.login_2fa(&credentials).await
                }
                None => client.login(&credentials).await,
            }
            .context("login failed")?;

            match outcome {
                LoginOutcome::Authenticated(Some(user)) => print_user(&user),
                LoginOutcome::Authenticated(None) => println!("logged in"),
                LoginOutcome::TwoFactorRequired => {
                    println!("two-factor code required; run `erp-console login --otp CODE`")
                }
            }
        }
        Command::Logout => {
            client.logout().await.context("logout failed")?;
            println!("logged out");
        }
        Command::Whoami => {
            if !client.store().is_logged_in().await {
                warn!("no stored session");
            }
            let envelope = client
                .fetch::<LoginData>(&ApiRequest::get(PROFILE_PATH))
                .await
                .context("failed to fetch profile")?;
            match envelope.data {
                Some(user) => print_user(&user),
                None => println!("{}", envelope.message.unwrap_or_default()),
            }
        }
        Command::Request(spec) => {
            let request = spec.to_request();
            let response = client
                .execute(&request)
                .await
                .with_context(|| format!("{} {} failed", request.method, request.path))?;
            let body = serde_json::to_string_pretty(&response.body)
                .context("failed to format response body")?;
            println!("{body}");
        }
    }
    Ok(())
}

fn print_user(user: &LoginData) {
    let role = user
        .role
        .as_ref()
        .map(|r| r.role_name.as_str())
        .unwrap_or("-");
    println!(
        "{} <{}>\ncompany: {}\ntype: {}\nrole: {}",
        user.name, user.email, user.company_name, user.user_type, role
    );
}
