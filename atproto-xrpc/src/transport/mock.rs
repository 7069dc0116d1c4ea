//! Scripted transport for testing.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;

use super::traits::XrpcTransport;
use crate::error::XrpcError;
use crate::request::XrpcRequest;
use crate::response::RawResponse;

type Outcome = Result<RawResponse, XrpcError>;

/// Mock transport for testing.
///
/// Replays queued outcomes in order, then repeats the fallback outcome.
/// Every request is recorded.
pub struct MockTransport {
    script: Mutex<VecDeque<Outcome>>,
    fallback: Outcome,
    latency: Option<Duration>,
    call_count: AtomicU32,
    requests: Mutex<Vec<XrpcRequest>>,
}

impl MockTransport {
    /// A transport that answers every call with an empty 200.
    pub fn new() -> Self {
        Self {
            script: Mutex::new(VecDeque::new()),
            fallback: Ok(RawResponse::empty()),
            latency: None,
            call_count: AtomicU32::new(0),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Queue one outcome.
    pub fn then(self, outcome: Outcome) -> Self {
        self.lock_script().push_back(outcome);
        self
    }

    pub fn then_json(self, value: serde_json::Value) -> Self {
        self.then(Ok(RawResponse::json(&value)))
    }

    pub fn then_error(self, error: XrpcError) -> Self {
        self.then(Err(error))
    }

    /// Outcome used once the script runs out.
    pub fn with_fallback(mut self, outcome: Outcome) -> Self {
        self.fallback = outcome;
        self
    }

    /// Delay each call, to exercise cancellation of in-flight attempts.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Number of times send was called.
    pub fn call_count(&self) -> u32 {
        self.call_count.load(Ordering::SeqCst)
    }

    /// Requests seen so far, oldest first.
    pub fn requests(&self) -> Vec<XrpcRequest> {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn lock_script(&self) -> std::sync::MutexGuard<'_, VecDeque<Outcome>> {
        self.script.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for MockTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl XrpcTransport for MockTransport {
    async fn send(&self, request: &XrpcRequest) -> Result<RawResponse, XrpcError> {
        self.call_count.fetch_add(1, Ordering::SeqCst);
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(request.clone());

        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }

        let next = self.lock_script().pop_front();
        next.unwrap_or_else(|| self.fallback.clone())
    }
}
