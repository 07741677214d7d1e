//! Command-line arguments

use clap::{Parser, Subcommand, ValueEnum};
use transport::{ApiRequest, Method};

use crate::error::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum LogFormat {
    #[default]
    Json,
    Pretty,
}

/// ERP admin console API client.
#[derive(Parser, Debug)]
#[command(name = "erp-console", about = "ERP admin console API client")]
pub struct Args {
    /// Config file (falls back to CONFIG_PATH, then erp-console.toml).
    #[arg(long, global = true)]
    pub config: Option<String>,

    /// Print Prometheus metrics to stderr on exit.
    #[arg(long, global = true)]
    pub metrics: bool,

    /// Log output format.
    #[arg(long, value_enum, default_value_t = LogFormat::Json, global = true)]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, PartialEq)]
pub enum Command {
    /// Log in with the configured credentials.
    Login {
        /// Two-factor code; sends the second login step.
        #[arg(long)]
        otp: Option<String>,
    },
    /// End the session.
    Logout,
    /// Show the logged-in admin profile.
    Whoami,
    /// Send an authenticated request.
    Request(RequestSpec),
}

/// Raw pieces of an ad-hoc API call.
#[derive(clap::Args, Debug, PartialEq)]
pub struct RequestSpec {
    #[arg(value_parser = parse_method)]
    pub method: Method,
    /// Path relative to the API base URL.
    pub path: String,
    /// JSON request body.
    #[arg(value_parser = parse_body)]
    pub body: Option<serde_json::Value>,
}

impl RequestSpec {
    pub fn to_request(&self) -> ApiRequest {
        let request = ApiRequest::new(self.method.clone(), self.path.clone());
        match &self.body {
            Some(body) => request.with_body(body.clone()),
            None => request,
        }
    }
}

fn parse_method(raw: &str) -> Result<Method> {
    Method::from_bytes(raw.to_ascii_uppercase().as_bytes())
        .map_err(|_| Error::InvalidMethod(raw.to_owned()))
}

fn parse_body(raw: &str) -> Result<serde_json::Value> {
    serde_json::from_str(raw).map_err(|e| Error::InvalidBody(e.to_string()))
}
