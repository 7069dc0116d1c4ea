//! XRPC request description

use atproto_ids::Nsid;
use serde::Serialize;

use crate::error::{Result, XrpcError};
use crate::labelers::AcceptLabelers;

/// Queries are reads (HTTP GET); procedures may change state (HTTP POST).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CallKind {
    Query,
    Procedure,
}

/// One XRPC call, built before sending and never mutated by the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XrpcRequest {
    kind: CallKind,
    method: Nsid,
    params: Vec<(String, String)>,
    headers: Vec<(String, String)>,
    body: Option<Vec<u8>>,
    encoding: Option<String>,
    auth_token: Option<String>,
    accept_labelers: Option<AcceptLabelers>,
}

impl XrpcRequest {
    pub fn new(kind: CallKind, method: Nsid) -> Self {
        Self {
            kind,
            method,
            params: Vec::new(),
            headers: Vec::new(),
            body: None,
            encoding: None,
            auth_token: None,
            accept_labelers: None,
        }
    }

    pub fn query(method: Nsid) -> Self {
        Self::new(CallKind::Query, method)
    }

    pub fn procedure(method: Nsid) -> Self {
        Self::new(CallKind::Procedure, method)
    }

    /// Build a request from a raw method name.
    ///
    /// ```
    /// use atproto_xrpc::{CallKind, XrpcRequest};
    ///
    /// let request = XrpcRequest::parse(CallKind::Query, "app.bsky.actor.getProfile")
    ///     .unwrap()
    ///     .param("actor", "alice.test");
    /// assert_eq!(request.params(), &[("actor".to_string(), "alice.test".to_string())]);
    /// assert!(XrpcRequest::parse(CallKind::Query, "getProfile").is_err());
    /// ```
    pub fn parse(kind: CallKind, method: &str) -> Result<Self> {
        Ok(Self::new(kind, Nsid::parse(method)?))
    }

    /// Append a query-string parameter. Repeating a key sends it repeatedly.
    pub fn param(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.params.push((key.into(), value.to_string()));
        self
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Attach a JSON body. Only procedures carry a body.
    pub fn json_body<B: Serialize + ?Sized>(self, body: &B) -> Result<Self> {
        let bytes = serde_json::to_vec(body)
            .map_err(|e| XrpcError::InvalidRequest(format!("body serialization failed: {e}")))?;
        self.body(bytes, "application/json")
    }

    /// Attach a raw body with its content type.
    pub fn body(mut self, bytes: Vec<u8>, encoding: impl Into<String>) -> Result<Self> {
        if self.kind == CallKind::Query {
            return Err(XrpcError::InvalidRequest(format!(
                "query {} cannot carry a body",
                self.method
            )));
        }
        self.body = Some(bytes);
        self.encoding = Some(encoding.into());
        Ok(self)
    }

    /// Bearer token sent as `Authorization`.
    pub fn auth(mut self, token: impl Into<String>) -> Self {
        self.auth_token = Some(token.into());
        self
    }

    /// Overrides the client's default accept-labelers value for this call.
    pub fn accept_labelers(mut self, labelers: AcceptLabelers) -> Self {
        self.accept_labelers = Some(labelers);
        self
    }

    pub fn kind(&self) -> CallKind {
        self.kind
    }

    pub fn method(&self) -> &Nsid {
        &self.method
    }

    pub fn params(&self) -> &[(String, String)] {
        &self.params
    }

    pub fn headers(&self) -> &[(String, String)] {
        &self.headers
    }

    pub fn body_bytes(&self) -> Option<&[u8]> {
        self.body.as_deref()
    }

    pub fn encoding(&self) -> Option<&str> {
        self.encoding.as_deref()
    }

    pub fn auth_token(&self) -> Option<&str> {
        self.auth_token.as_deref()
    }

    pub fn labelers(&self) -> Option<&AcceptLabelers> {
        self.accept_labelers.as_ref()
    }
}
