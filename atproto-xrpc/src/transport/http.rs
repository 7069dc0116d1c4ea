//! HTTP transport over reqwest.

use std::collections::HashMap;

use async_trait::async_trait;
use reqwest::{header, Client};
use tracing::debug;

use super::traits::XrpcTransport;
use crate::config::XrpcClientConfig;
use crate::error::XrpcError;
use crate::labelers::ACCEPT_LABELERS_HEADER;
use crate::request::{CallKind, XrpcRequest};
use crate::response::{ErrorEnvelope, RawResponse};

/// Sends XRPC calls to `<service_url>/xrpc/<method>`.
///
/// Cloning is cheap; the underlying connection pool is shared.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
    config: XrpcClientConfig,
}

impl HttpTransport {
    pub fn new(config: XrpcClientConfig) -> Result<Self, XrpcError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|e| XrpcError::InvalidRequest(format!("failed to create HTTP client: {e}")))?;
        Ok(Self { client, config })
    }

    pub fn config(&self) -> &XrpcClientConfig {
        &self.config
    }
}

#[async_trait]
impl XrpcTransport for HttpTransport {
    async fn send(&self, request: &XrpcRequest) -> Result<RawResponse, XrpcError> {
        let url = self.config.method_url(request.method().as_str());

        let mut http_request = match request.kind() {
            CallKind::Query => self.client.get(&url),
            CallKind::Procedure => self.client.post(&url),
        };
        if !request.params().is_empty() {
            http_request = http_request.query(request.params());
        }

        for (name, value) in self.config.default_headers.iter().chain(request.headers()) {
            http_request = http_request.header(name.as_str(), value.as_str());
        }
        if let Some(token) = request.auth_token() {
            http_request = http_request.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        let labelers = request
            .labelers()
            .or(self.config.accept_labelers.as_ref())
            .filter(|labelers| !labelers.is_empty());
        if let Some(labelers) = labelers {
            http_request = http_request.header(ACCEPT_LABELERS_HEADER, labelers.header_value());
        }

        if let (Some(body), Some(encoding)) = (request.body_bytes(), request.encoding()) {
            http_request = http_request
                .header(header::CONTENT_TYPE, encoding)
                .body(body.to_vec());
        }

        let response = http_request.send().await?;
        let status = response.status().as_u16();
        let headers: HashMap<String, String> = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.as_str().to_string(), v.to_string()))
            })
            .collect();
        let body = response
            .bytes()
            .await
            .map_err(|e| XrpcError::network(format!("failed to read response body: {e}")))?;

        debug!(method = %request.method(), status, bytes = body.len(), "XRPC response");

        if (200..300).contains(&status) {
            Ok(RawResponse {
                status,
                headers,
                body: body.to_vec(),
            })
        } else {
            Err(ErrorEnvelope::classify(status, &body))
        }
    }
}
