//! Core transport trait.

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::XrpcError;
use crate::request::XrpcRequest;
use crate::response::RawResponse;

/// One attempt at an XRPC call.
///
/// Implementations return the raw success body or an already classified
/// [`XrpcError`]. Retrying, decoding and cancellation live above this trait.
#[async_trait]
pub trait XrpcTransport: Send + Sync {
    async fn send(&self, request: &XrpcRequest) -> Result<RawResponse, XrpcError>;
}

#[async_trait]
impl<T: XrpcTransport + ?Sized> XrpcTransport for Arc<T> {
    async fn send(&self, request: &XrpcRequest) -> Result<RawResponse, XrpcError> {
        (**self).send(request).await
    }
}
