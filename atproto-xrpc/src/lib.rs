//! XRPC client for AT Protocol services
//!
//! Issues typed queries (HTTP GET) and procedures (HTTP POST) against
//! `<service>/xrpc/<method>`, classifying every failure into [`XrpcError`].
//!
//! ## Layers
//!
//! - [`XrpcTransport`]: a single attempt; [`HttpTransport`] for real
//!   services, [`MockTransport`] for tests
//! - [`RetryEngine`]: bounded exponential backoff for transient failures,
//!   racing a [`CancelSignal`]
//! - [`XrpcClient`]: request building and JSON decoding on top
//!
//! ## Example
//!
//! ```no_run
//! use atproto_xrpc::{cancel_pair, CallKind, XrpcClient, XrpcClientConfig, XrpcRequest};
//!
//! # async fn run() -> Result<(), atproto_xrpc::XrpcError> {
//! let client = XrpcClient::from_config(XrpcClientConfig::from_env())?;
//! let (_handle, signal) = cancel_pair();
//!
//! let request = XrpcRequest::parse(CallKind::Query, "app.bsky.actor.getProfile")?
//!     .param("actor", "bsky.app");
//! let profile = client
//!     .execute_with_retry::<serde_json::Value>(&request, 3, &signal)
//!     .await?;
//! println!("{}", profile.data["displayName"]);
//! # Ok(())
//! # }
//! ```

pub mod cancel;
pub mod client;
pub mod config;
pub mod error;
pub mod labelers;
pub mod request;
pub mod response;
pub mod retry;
pub mod transport;

pub use cancel::{cancel_pair, CancelHandle, CancelSignal};
pub use client::{XrpcClient, DEFAULT_MAX_ATTEMPTS};
pub use config::{XrpcClientConfig, DEFAULT_SERVICE_URL};
pub use error::{Result, XrpcError, OVERLOAD_STATUSES};
pub use labelers::{AcceptLabelers, ACCEPT_LABELERS_HEADER, MAX_LABELERS};
pub use request::{CallKind, XrpcRequest};
pub use response::{ErrorEnvelope, RawResponse, XrpcOutcome, XrpcResponse};
pub use retry::{RetryEngine, RetryPolicy};
pub use transport::{HttpTransport, MockTransport, XrpcTransport};
