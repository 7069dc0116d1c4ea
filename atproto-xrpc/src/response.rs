//! Raw and decoded XRPC responses

use std::collections::HashMap;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::XrpcError;

/// A successful response before decoding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawResponse {
    pub status: u16,
    /// Header names are lowercase
    pub headers: HashMap<String, String>,
    pub body: Vec<u8>,
}

impl RawResponse {
    pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            headers: HashMap::new(),
            body: body.into(),
        }
    }

    /// 200 with a JSON body.
    pub fn json(value: &serde_json::Value) -> Self {
        let mut raw = Self::new(200, value.to_string());
        raw.headers
            .insert("content-type".to_string(), "application/json".to_string());
        raw
    }

    /// 200 with no body, as returned by procedures without output.
    pub fn empty() -> Self {
        Self::new(200, Vec::new())
    }

    /// Decode the body as JSON into `T`.
    ///
    /// An empty body decodes as `null`, so `()` and `Option<_>` outputs work
    /// for methods that return nothing.
    pub fn decode<T: DeserializeOwned>(self) -> XrpcOutcome<T> {
        let body: &[u8] = if self.body.iter().all(u8::is_ascii_whitespace) {
            b"null"
        } else {
            &self.body
        };
        let data = serde_json::from_slice(body).map_err(|e| XrpcError::DecodeFailure {
            status: self.status,
            message: e.to_string(),
        })?;
        Ok(XrpcResponse {
            status: self.status,
            headers: self.headers,
            data,
        })
    }
}

/// A decoded successful response.
#[derive(Debug, Clone, PartialEq)]
pub struct XrpcResponse<T> {
    pub status: u16,
    pub headers: HashMap<String, String>,
    pub data: T,
}

impl<T> XrpcResponse<T> {
    pub fn into_data(self) -> T {
        self.data
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }
}

/// Exactly one of a decoded payload or a classified failure.
pub type XrpcOutcome<T> = Result<XrpcResponse<T>, XrpcError>;

/// Error body returned alongside 4xx/5xx statuses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorEnvelope {
    pub error: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl ErrorEnvelope {
    /// Classify an error response body.
    ///
    /// Bodies that are not an envelope are reported under the `Unknown` kind
    /// with the raw text as the message.
    pub fn classify(status: u16, body: &[u8]) -> XrpcError {
        match serde_json::from_slice::<ErrorEnvelope>(body) {
            Ok(envelope) => XrpcError::from_status(
                status,
                envelope.error,
                envelope.message.unwrap_or_default(),
            ),
            Err(_) => XrpcError::from_status(
                status,
                "Unknown",
                String::from_utf8_lossy(body).into_owned(),
            ),
        }
    }
}
