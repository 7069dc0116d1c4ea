//! Retry engine: bounded exponential backoff over a transport

use std::time::Duration;

use rand::Rng;
use tracing::{debug, warn};

use crate::cancel::CancelSignal;
use crate::error::XrpcError;
use crate::request::{CallKind, XrpcRequest};
use crate::response::RawResponse;
use crate::transport::XrpcTransport;

/// Backoff tuning.
///
/// The delay before retry `n` (1-based) is
/// `min(max_delay, initial_delay * multiplier^(n-1))`, then shortened by a
/// random fraction of up to `jitter`.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    pub initial_delay: Duration,
    pub max_delay: Duration,
    pub multiplier: f64,
    /// Fraction in `0.0..=1.0`
    pub jitter: f64,
    /// Procedures are not idempotent in general; retry them only on request.
    pub retry_procedures: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_millis(100),
            max_delay: Duration::from_secs(5),
            multiplier: 2.0,
            jitter: 0.2,
            retry_procedures: false,
        }
    }
}

impl RetryPolicy {
    pub fn with_initial_delay(mut self, delay: Duration) -> Self {
        self.initial_delay = delay;
        self
    }

    pub fn with_max_delay(mut self, delay: Duration) -> Self {
        self.max_delay = delay;
        self
    }

    pub fn with_multiplier(mut self, multiplier: f64) -> Self {
        self.multiplier = multiplier.max(1.0);
        self
    }

    pub fn with_jitter(mut self, jitter: f64) -> Self {
        self.jitter = jitter.clamp(0.0, 1.0);
        self
    }

    pub fn with_retry_procedures(mut self, enabled: bool) -> Self {
        self.retry_procedures = enabled;
        self
    }

    /// Un-jittered delay before retry `retry` (1-based).
    pub fn delay_for(&self, retry: u32) -> Duration {
        let exponent = retry.saturating_sub(1).min(i32::MAX as u32) as i32;
        let scaled = self.initial_delay.as_secs_f64() * self.multiplier.powi(exponent);
        if !scaled.is_finite() || scaled >= self.max_delay.as_secs_f64() {
            self.max_delay
        } else if scaled <= 0.0 {
            Duration::ZERO
        } else {
            Duration::from_secs_f64(scaled)
        }
    }

    fn jittered_delay(&self, retry: u32) -> Duration {
        let delay = self.delay_for(retry);
        if !self.jitter.is_finite() || self.jitter <= 0.0 {
            return delay;
        }
        let cut = rand::thread_rng().gen_range(0.0..=self.jitter.min(1.0));
        delay.mul_f64(1.0 - cut)
    }

    fn allows(&self, kind: CallKind) -> bool {
        kind == CallKind::Query || self.retry_procedures
    }
}

/// Runs a request through a transport until it succeeds, fails permanently,
/// runs out of attempts or is cancelled.
///
/// Holds no state between calls.
#[derive(Debug, Clone, Default)]
pub struct RetryEngine {
    policy: RetryPolicy,
}

impl RetryEngine {
    pub fn new(policy: RetryPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// `max_attempts` counts the first attempt; zero is treated as one.
    ///
    /// When attempts run out the last classified error is returned as is.
    pub async fn run<T: XrpcTransport + ?Sized>(
        &self,
        transport: &T,
        request: &XrpcRequest,
        max_attempts: u32,
        cancel: &CancelSignal,
    ) -> Result<RawResponse, XrpcError> {
        let max_attempts = max_attempts.max(1);
        let retryable_call = self.policy.allows(request.kind());
        let mut attempt = 0;

        loop {
            attempt += 1;
            if cancel.is_cancelled() {
                return Err(XrpcError::Cancelled);
            }

            let result = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(XrpcError::Cancelled),
                result = transport.send(request) => result,
            };

            let error = match result {
                Ok(response) => {
                    debug!(
                        method = %request.method(),
                        attempt,
                        status = response.status,
                        "XRPC call succeeded"
                    );
                    return Ok(response);
                }
                Err(error) => error,
            };

            if !retryable_call || !error.is_retryable() || attempt >= max_attempts {
                debug!(
                    method = %request.method(),
                    attempt,
                    error = %error,
                    "XRPC call failed"
                );
                return Err(error);
            }

            let delay = self.policy.jittered_delay(attempt);
            warn!(
                method = %request.method(),
                attempt,
                max_attempts,
                delay_ms = delay.as_millis() as u64,
                error = %error,
                "Retrying XRPC call"
            );

            tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(XrpcError::Cancelled),
                _ = tokio::time::sleep(delay) => {}
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cancel::cancel_pair;
    use crate::transport::MockTransport;
    use atproto_ids::Nsid;
    use serde_json::json;

    fn fast_policy() -> RetryPolicy {
        RetryPolicy::default()
            .with_initial_delay(Duration::from_millis(1))
            .with_max_delay(Duration::from_millis(5))
    }

    fn query() -> XrpcRequest {
        XrpcRequest::query(Nsid::parse("app.bsky.feed.getTimeline").unwrap())
    }

    fn overloaded() -> XrpcError {
        XrpcError::from_status(503, "Unavailable", "try later")
    }

    #[test]
    fn test_delay_growth_and_cap() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.delay_for(1), Duration::from_millis(100));
        assert_eq!(policy.delay_for(2), Duration::from_millis(200));
        assert_eq!(policy.delay_for(3), Duration::from_millis(400));
        assert_eq!(policy.delay_for(10), Duration::from_secs(5));
        assert_eq!(policy.delay_for(u32::MAX), Duration::from_secs(5));
    }

    #[test]
    fn test_out_of_range_fields_do_not_panic() {
        let negative = RetryPolicy {
            multiplier: -3.0,
            ..RetryPolicy::default()
        };
        assert_eq!(negative.delay_for(2), Duration::ZERO);
        assert_eq!(negative.jittered_delay(2), Duration::ZERO);

        let nan_jitter = RetryPolicy {
            jitter: f64::NAN,
            ..RetryPolicy::default()
        };
        assert_eq!(nan_jitter.jittered_delay(1), Duration::from_millis(100));

        let nan_multiplier = RetryPolicy {
            multiplier: f64::NAN,
            ..RetryPolicy::default()
        };
        assert_eq!(nan_multiplier.delay_for(3), nan_multiplier.max_delay);
    }

    #[test]
    fn test_jitter_only_shortens() {
        let policy = RetryPolicy::default().with_jitter(0.5);
        for _ in 0..100 {
            let delay = policy.jittered_delay(2);
            assert!(delay <= Duration::from_millis(200));
            assert!(delay >= Duration::from_millis(100));
        }
        let exact = RetryPolicy::default().with_jitter(0.0);
        assert_eq!(exact.jittered_delay(2), Duration::from_millis(200));
    }

    #[tokio::test]
    async fn test_recovers_after_transient_failures() {
        let transport = MockTransport::new()
            .then_error(overloaded())
            .then_error(overloaded())
            .then_json(json!({ "feed": [] }));
        let engine = RetryEngine::new(fast_policy());

        let response = engine
            .run(&transport, &query(), 3, &CancelSignal::never())
            .await
            .unwrap();
        assert_eq!(response.status, 200);
        assert_eq!(transport.call_count(), 3);
    }

    #[tokio::test]
    async fn test_exhaustion_returns_last_error() {
        let last = XrpcError::from_status(429, "RateLimitExceeded", "second");
        let transport = MockTransport::new()
            .then_error(overloaded())
            .then_error(last.clone())
            .then_json(json!({}));
        let engine = RetryEngine::new(fast_policy());

        let err = engine
            .run(&transport, &query(), 2, &CancelSignal::never())
            .await
            .unwrap_err();
        assert_eq!(err, last);
        assert_eq!(transport.call_count(), 2);
    }

    #[tokio::test]
    async fn test_zero_attempts_means_one() {
        let transport = MockTransport::new().with_fallback(Err(overloaded()));
        let engine = RetryEngine::new(fast_policy());
        let err = engine
            .run(&transport, &query(), 0, &CancelSignal::never())
            .await
            .unwrap_err();
        assert!(matches!(err, XrpcError::ServerOverload { .. }));
        assert_eq!(transport.call_count(), 1);
    }

    #[tokio::test]
    async fn test_permanent_errors_stop_immediately() {
        for error in [
            XrpcError::from_status(400, "InvalidRequest", ""),
            XrpcError::from_status(401, "AuthMissing", ""),
            XrpcError::from_status(400, "ExpiredToken", ""),
            XrpcError::DecodeFailure {
                status: 200,
                message: "bad".to_string(),
            },
        ] {
            let transport = MockTransport::new().with_fallback(Err(error.clone()));
            let engine = RetryEngine::new(fast_policy());
            let err = engine
                .run(&transport, &query(), 5, &CancelSignal::never())
                .await
                .unwrap_err();
            assert_eq!(err, error);
            assert_eq!(transport.call_count(), 1);
        }
    }

    #[tokio::test]
    async fn test_procedures_not_retried_by_default() {
        let procedure =
            XrpcRequest::procedure(Nsid::parse("com.atproto.repo.createRecord").unwrap());
        let transport = MockTransport::new().with_fallback(Err(XrpcError::network("reset")));

        let engine = RetryEngine::new(fast_policy());
        assert!(engine
            .run(&transport, &procedure, 5, &CancelSignal::never())
            .await
            .is_err());
        assert_eq!(transport.call_count(), 1);

        let opted_in = RetryEngine::new(fast_policy().with_retry_procedures(true));
        assert!(opted_in
            .run(&transport, &procedure, 3, &CancelSignal::never())
            .await
            .is_err());
        assert_eq!(transport.call_count(), 4);
    }

    #[tokio::test]
    async fn test_cancel_during_backoff() {
        let transport = MockTransport::new().with_fallback(Err(overloaded()));
        let engine = RetryEngine::new(
            RetryPolicy::default()
                .with_initial_delay(Duration::from_secs(30))
                .with_max_delay(Duration::from_secs(30)),
        );
        let (handle, signal) = cancel_pair();

        let canceller = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            handle.cancel();
        });

        let err = tokio::time::timeout(
            Duration::from_secs(5),
            engine.run(&transport, &query(), 10, &signal),
        )
        .await
        .expect("cancellation should end the backoff")
        .unwrap_err();
        canceller.await.unwrap();

        assert_eq!(err, XrpcError::Cancelled);
        assert_eq!(transport.call_count(), 1);
    }

    #[tokio::test]
    async fn test_cancel_in_flight_attempt() {
        let transport = MockTransport::new().with_latency(Duration::from_secs(30));
        let engine = RetryEngine::new(fast_policy());
        let (handle, signal) = cancel_pair();

        let canceller = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            handle.cancel();
        });

        let err = tokio::time::timeout(
            Duration::from_secs(5),
            engine.run(&transport, &query(), 3, &signal),
        )
        .await
        .expect("cancellation should abort the attempt")
        .unwrap_err();
        canceller.await.unwrap();
        assert_eq!(err, XrpcError::Cancelled);
    }

    #[tokio::test]
    async fn test_cancelled_before_start_sends_nothing() {
        let transport = MockTransport::new();
        let (handle, signal) = cancel_pair();
        handle.cancel();
        let err = RetryEngine::default()
            .run(&transport, &query(), 3, &signal)
            .await
            .unwrap_err();
        assert_eq!(err, XrpcError::Cancelled);
        assert_eq!(transport.call_count(), 0);
    }
}
