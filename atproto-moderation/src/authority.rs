//! Session labeling authorities
//!
//! Guests get the default public labeler unless it is suppressed. Signed-in
//! accounts get nothing beyond their own subscriptions, except in a test
//! environment where a well-known test handle names the sole authority.

use async_trait::async_trait;
use atproto_ids::{Did, Handle};
use atproto_xrpc::{CallKind, CancelSignal, XrpcClient, XrpcError, XrpcRequest, XrpcTransport};
use serde::Deserialize;
use tracing::{info, warn};

/// Bluesky's moderation service.
pub const DEFAULT_LABELER_DID: &str = "did:plc:ar7c4by46qjdydhdevvrndac";

/// Handle a test environment's moderation service is registered under.
pub const TEST_LABELER_HANDLE: &str = "mod-authority.test";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthorityConfig {
    /// Applied to guests; `None` disables the default entirely
    pub default_labeler: Option<Did>,
    /// Drop the default labeler for guests
    pub suppress_default: bool,
    /// Resolved when the account lives in a test environment
    pub test_labeler_handle: Option<Handle>,
}

impl Default for AuthorityConfig {
    fn default() -> Self {
        Self {
            default_labeler: Did::parse(DEFAULT_LABELER_DID).ok(),
            suppress_default: false,
            test_labeler_handle: Handle::parse(TEST_LABELER_HANDLE).ok(),
        }
    }
}

impl AuthorityConfig {
    pub fn suppressed(mut self) -> Self {
        self.suppress_default = true;
        self
    }
}

/// Labelers applied for the session on top of the account's subscriptions.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LabelerAuthorities {
    labelers: Vec<Did>,
    test_environment: bool,
}

impl LabelerAuthorities {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn dids(&self) -> &[Did] {
        &self.labelers
    }

    pub fn into_dids(self) -> Vec<Did> {
        self.labelers
    }

    pub fn is_empty(&self) -> bool {
        self.labelers.is_empty()
    }

    /// Whether the test-environment authority replaced the normal set.
    pub fn is_test_environment(&self) -> bool {
        self.test_environment
    }
}

/// Maps a handle to the DID it currently points at.
#[async_trait]
pub trait HandleResolver: Send + Sync {
    async fn resolve_handle(&self, handle: &Handle) -> Result<Did, XrpcError>;
}

/// Resolves handles with `com.atproto.identity.resolveHandle`.
pub struct XrpcHandleResolver<T: XrpcTransport> {
    client: XrpcClient<T>,
    max_attempts: u32,
    cancel: CancelSignal,
}

#[derive(Deserialize)]
struct ResolveHandleOutput {
    did: Did,
}

impl<T: XrpcTransport> XrpcHandleResolver<T> {
    pub fn new(client: XrpcClient<T>) -> Self {
        Self {
            client,
            max_attempts: atproto_xrpc::DEFAULT_MAX_ATTEMPTS,
            cancel: CancelSignal::never(),
        }
    }

    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    pub fn with_cancel(mut self, cancel: CancelSignal) -> Self {
        self.cancel = cancel;
        self
    }
}

#[async_trait]
impl<T: XrpcTransport> HandleResolver for XrpcHandleResolver<T> {
    async fn resolve_handle(&self, handle: &Handle) -> Result<Did, XrpcError> {
        let request = XrpcRequest::parse(CallKind::Query, "com.atproto.identity.resolveHandle")?
            .param("handle", handle);
        let response = self
            .client
            .execute_with_retry::<ResolveHandleOutput>(&request, self.max_attempts, &self.cancel)
            .await?;
        Ok(response.data.did)
    }
}

/// Authorities for a session without an account.
pub fn configure_for_guest(config: &AuthorityConfig) -> LabelerAuthorities {
    let labelers = match (&config.default_labeler, config.suppress_default) {
        (Some(did), false) => vec![did.clone()],
        _ => Vec::new(),
    };
    LabelerAuthorities {
        labelers,
        test_environment: false,
    }
}

/// Authorities for a signed-in account.
///
/// Default authorities are opt-in, so the normal set is empty. For an
/// account under the `.test` TLD the test labeler handle is resolved and,
/// on success, becomes the only authority. A failed resolution is logged
/// and falls back to the normal set.
pub async fn configure_for_account<R: HandleResolver + ?Sized>(
    config: &AuthorityConfig,
    account_handle: &Handle,
    resolver: &R,
) -> LabelerAuthorities {
    if !account_handle.is_test() {
        return LabelerAuthorities::none();
    }
    let Some(test_handle) = &config.test_labeler_handle else {
        return LabelerAuthorities::none();
    };

    match resolver.resolve_handle(test_handle).await {
        Ok(did) => {
            info!(
                account = %account_handle,
                labeler = %did,
                "Test environment moderation authority active"
            );
            LabelerAuthorities {
                labelers: vec![did],
                test_environment: true,
            }
        }
        Err(e) => {
            warn!(
                handle = %test_handle,
                error = %e,
                "Could not resolve test labeler handle, using normal authorities"
            );
            LabelerAuthorities::none()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use atproto_xrpc::MockTransport;
    use serde_json::json;

    fn handle(raw: &str) -> Handle {
        Handle::parse(raw).unwrap()
    }

    #[test]
    fn test_default_config_constants_parse() {
        let config = AuthorityConfig::default();
        assert_eq!(
            config.default_labeler.as_ref().map(Did::as_str),
            Some(DEFAULT_LABELER_DID)
        );
        assert_eq!(
            config.test_labeler_handle.as_ref().map(Handle::as_str),
            Some(TEST_LABELER_HANDLE)
        );
    }

    #[test]
    fn test_guest_gets_default_unless_suppressed() {
        let config = AuthorityConfig::default();
        assert_eq!(configure_for_guest(&config).dids().len(), 1);
        assert!(configure_for_guest(&config.suppressed()).is_empty());
    }

    #[test]
    fn test_regular_account_gets_nothing_without_io() {
        let resolver = XrpcHandleResolver::new(XrpcClient::new(MockTransport::new()));
        let authorities = tokio_test::block_on(configure_for_account(
            &AuthorityConfig::default(),
            &handle("alice.bsky.social"),
            &resolver,
        ));
        assert!(authorities.is_empty());
        assert_eq!(resolver.client.transport().call_count(), 0);
    }

    #[tokio::test]
    async fn test_test_account_uses_resolved_labeler() {
        let resolver = XrpcHandleResolver::new(XrpcClient::new(
            MockTransport::new().then_json(json!({ "did": "did:plc:testmod" })),
        ));
        let config = AuthorityConfig::default();
        let authorities = configure_for_account(&config, &handle("alice.test"), &resolver).await;

        assert!(authorities.is_test_environment());
        assert_eq!(authorities.dids(), &[Did::parse("did:plc:testmod").unwrap()]);

        let sent = resolver.client.transport().requests();
        assert_eq!(sent[0].params(), &[("handle".to_string(), TEST_LABELER_HANDLE.to_string())]);
    }

    #[tokio::test]
    async fn test_resolution_failure_is_not_fatal() {
        let resolver = XrpcHandleResolver::new(XrpcClient::new(MockTransport::new().then_error(
            XrpcError::from_status(400, "InvalidRequest", "Unable to resolve handle"),
        )));
        let config = AuthorityConfig::default();
        let authorities = configure_for_account(&config, &handle("alice.test"), &resolver).await;
        assert!(authorities.is_empty());
        assert!(!authorities.is_test_environment());
    }
}
