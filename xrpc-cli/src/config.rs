//! Command-line arguments
//!
//! Every global option falls back to an environment variable, and a `.env`
//! file is loaded before parsing.

use std::time::Duration;

use atproto_xrpc::XrpcClientConfig;
use clap::{Parser, Subcommand};

#[derive(Parser, Debug, Clone)]
#[command(name = "xrpc")]
#[command(about = "Call AT Protocol XRPC services and inspect identifiers")]
pub struct Args {
    /// Service base URL
    #[arg(long, env = "XRPC_SERVICE_URL", default_value = atproto_xrpc::DEFAULT_SERVICE_URL)]
    pub service: String,

    /// Access token sent as a bearer credential
    #[arg(long, env = "XRPC_TOKEN", hide_env_values = true)]
    pub token: Option<String>,

    /// Per-attempt timeout in seconds
    #[arg(long, env = "XRPC_TIMEOUT_SECS", default_value = "30")]
    pub timeout_secs: u64,

    /// Attempts per call, including the first
    #[arg(long, env = "XRPC_ATTEMPTS", default_value = "3")]
    pub attempts: u32,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "LOG_LEVEL", default_value = "warn")]
    pub log_level: String,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Run a query (HTTP GET) and print the JSON result
    Query {
        /// Method NSID, e.g. app.bsky.actor.getProfile
        method: String,

        /// Query parameter, repeatable
        #[arg(short = 'p', long = "param", value_parser = parse_key_value)]
        params: Vec<(String, String)>,
    },

    /// Run a procedure (HTTP POST) and print the JSON result
    Procedure {
        /// Method NSID, e.g. com.atproto.repo.createRecord
        method: String,

        /// JSON input body
        #[arg(long)]
        body: Option<String>,

        /// Retry transient failures; procedures are sent once otherwise
        #[arg(long)]
        retry: bool,
    },

    /// Identify and validate an identifier, printing its components
    Inspect {
        value: String,
    },

    /// Mint record keys
    Tid {
        #[arg(short, long, default_value = "1")]
        count: usize,
    },

    /// Show the labeling authorities a session would apply
    Labelers {
        /// Signed-in account handle; a guest session without it
        #[arg(long)]
        handle: Option<String>,

        /// Suppress the default labeler for guests
        #[arg(long)]
        no_default: bool,
    },
}

impl Args {
    pub fn validate(&self) -> Result<(), String> {
        if self.timeout_secs == 0 {
            return Err("XRPC_TIMEOUT_SECS must be greater than zero".to_string());
        }
        if !self.service.starts_with("http://") && !self.service.starts_with("https://") {
            return Err(format!("XRPC_SERVICE_URL must be an http(s) URL, got {}", self.service));
        }
        Ok(())
    }

    pub fn client_config(&self) -> XrpcClientConfig {
        XrpcClientConfig::new(self.service.clone())
            .with_timeout(Duration::from_secs(self.timeout_secs))
            .with_user_agent(format!("xrpc/{}", env!("CARGO_PKG_VERSION")))
    }
}

fn parse_key_value(raw: &str) -> Result<(String, String), String> {
    match raw.split_once('=') {
        Some((key, value)) if !key.is_empty() => Ok((key.to_string(), value.to_string())),
        _ => Err(format!("expected key=value, got `{raw}`")),
    }
}
