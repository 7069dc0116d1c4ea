//! Typed XRPC client

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;

use crate::cancel::CancelSignal;
use crate::config::XrpcClientConfig;
use crate::error::XrpcError;
use crate::request::{CallKind, XrpcRequest};
use crate::response::XrpcOutcome;
use crate::retry::{RetryEngine, RetryPolicy};
use crate::transport::{HttpTransport, XrpcTransport};

/// Attempts used by the [`query`](XrpcClient::query) and
/// [`procedure`](XrpcClient::procedure) shortcuts.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// Sends requests through a transport and decodes typed results.
///
/// ```no_run
/// # async fn example() -> Result<(), atproto_xrpc::XrpcError> {
/// use atproto_xrpc::{XrpcClient, XrpcClientConfig};
///
/// let client = XrpcClient::from_config(XrpcClientConfig::default())?;
/// let profile: serde_json::Value = client
///     .query("app.bsky.actor.getProfile", &[("actor", "bsky.app")])
///     .await?
///     .data;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct XrpcClient<T = HttpTransport> {
    transport: T,
    retry: RetryEngine,
    max_attempts: u32,
}

impl XrpcClient<HttpTransport> {
    pub fn from_config(config: XrpcClientConfig) -> Result<Self, XrpcError> {
        Ok(Self::new(HttpTransport::new(config)?))
    }
}

impl<T: XrpcTransport> XrpcClient<T> {
    pub fn new(transport: T) -> Self {
        Self {
            transport,
            retry: RetryEngine::default(),
            max_attempts: DEFAULT_MAX_ATTEMPTS,
        }
    }

    pub fn with_retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.retry = RetryEngine::new(policy);
        self
    }

    /// Attempts used by the shortcut methods.
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn retry_policy(&self) -> &RetryPolicy {
        self.retry.policy()
    }

    /// Single attempt, no retry.
    pub async fn execute<R: DeserializeOwned>(&self, request: &XrpcRequest) -> XrpcOutcome<R> {
        debug!(method = %request.method(), kind = ?request.kind(), "Executing XRPC call");
        let raw = self.transport.send(request).await?;
        raw.decode()
    }

    /// Send with the retry engine, then decode.
    ///
    /// Decoding failures are never retried.
    pub async fn execute_with_retry<R: DeserializeOwned>(
        &self,
        request: &XrpcRequest,
        max_attempts: u32,
        cancel: &CancelSignal,
    ) -> XrpcOutcome<R> {
        debug!(
            method = %request.method(),
            kind = ?request.kind(),
            max_attempts,
            "Executing XRPC call with retry"
        );
        let raw = self
            .retry
            .run(&self.transport, request, max_attempts, cancel)
            .await?;
        raw.decode()
    }

    /// Query shortcut with the client's default retry budget.
    pub async fn query<R: DeserializeOwned>(
        &self,
        method: &str,
        params: &[(&str, &str)],
    ) -> XrpcOutcome<R> {
        let mut request = XrpcRequest::parse(CallKind::Query, method)?;
        for (key, value) in params {
            request = request.param(*key, value);
        }
        self.execute_with_retry(&request, self.max_attempts, &CancelSignal::never())
            .await
    }

    /// Procedure shortcut with a JSON body. Retried only if the policy
    /// allows procedures.
    pub async fn procedure<B: Serialize + ?Sized, R: DeserializeOwned>(
        &self,
        method: &str,
        body: &B,
    ) -> XrpcOutcome<R> {
        let request = XrpcRequest::parse(CallKind::Procedure, method)?.json_body(body)?;
        self.execute_with_retry(&request, self.max_attempts, &CancelSignal::never())
            .await
    }
}
