//! xrpc - command-line client for AT Protocol services

mod commands;
mod config;

use atproto_ids::TidGenerator;
use atproto_moderation::{AuthorityConfig, XrpcHandleResolver};
use atproto_xrpc::{cancel_pair, XrpcClient};
use clap::Parser;
use tracing::{debug, error, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use config::{Args, Command};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file if present
    let _ = dotenvy::dotenv();

    let args = Args::parse();

    let log_level = args.log_level.clone();
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("xrpc={0},atproto_xrpc={0},info", log_level).into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    if let Err(e) = args.validate() {
        error!("Configuration error: {}", e);
        std::process::exit(2);
    }

    let (cancel, signal) = cancel_pair();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, cancelling in-flight call");
            cancel.cancel();
        }
    });

    let client = XrpcClient::from_config(args.client_config())?.with_max_attempts(args.attempts);
    debug!(service = %args.service, attempts = args.attempts, "Client ready");
    let token = args.token.as_deref();

    let output = match &args.command {
        Command::Query { method, params } => {
            commands::query(&client, method, params, token, args.attempts, &signal).await?
        }
        Command::Procedure { method, body, retry } => {
            let body = body.as_deref();
            commands::procedure(&client, method, body, token, *retry, args.attempts, &signal).await?
        }
        Command::Inspect { value } => commands::inspect(value)?,
        Command::Tid { count } => commands::mint_tids(&TidGenerator::new(), *count),
        Command::Labelers { handle, no_default } => {
            let mut authority = AuthorityConfig::default();
            if *no_default {
                authority = authority.suppressed();
            }
            let resolver = XrpcHandleResolver::new(client.clone())
                .with_max_attempts(args.attempts)
                .with_cancel(signal.clone());
            commands::labelers(&authority, handle.as_deref(), &resolver).await?
        }
    };

    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}
