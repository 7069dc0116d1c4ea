//! Subcommand implementations
//!
//! Each returns the JSON value `main` prints, so the output shape is
//! testable without a terminal.

use anyhow::{bail, Context};
use atproto_ids::{AtIdentifier, AtUri, ContentId, Did, Handle, Nsid, RecordKey, Tid, TidGenerator};
use atproto_moderation::{
    configure_for_account, configure_for_guest, AuthorityConfig, HandleResolver,
};
use atproto_xrpc::{CallKind, CancelSignal, XrpcClient, XrpcRequest, XrpcTransport};
use chrono::{DateTime, Utc};
use serde_json::{json, Value};
use tracing::debug;

pub async fn query<T: XrpcTransport>(
    client: &XrpcClient<T>,
    method: &str,
    params: &[(String, String)],
    token: Option<&str>,
    attempts: u32,
    cancel: &CancelSignal,
) -> anyhow::Result<Value> {
    let mut request = XrpcRequest::parse(CallKind::Query, method)?;
    for (key, value) in params {
        request = request.param(key.as_str(), value);
    }
    if let Some(token) = token {
        request = request.auth(token);
    }
    let response = client.execute_with_retry::<Value>(&request, attempts, cancel).await?;
    Ok(response.data)
}

/// Without `retry` the procedure is sent exactly once.
pub async fn procedure<T: XrpcTransport + Clone>(
    client: &XrpcClient<T>,
    method: &str,
    body: Option<&str>,
    token: Option<&str>,
    retry: bool,
    attempts: u32,
    cancel: &CancelSignal,
) -> anyhow::Result<Value> {
    let mut request = XrpcRequest::parse(CallKind::Procedure, method)?;
    if let Some(body) = body {
        let input: Value = serde_json::from_str(body).context("--body is not valid JSON")?;
        request = request.json_body(&input)?;
    }
    if let Some(token) = token {
        request = request.auth(token);
    }

    let response = if retry {
        let policy = client.retry_policy().clone().with_retry_procedures(true);
        client
            .clone()
            .with_retry_policy(policy)
            .execute_with_retry::<Value>(&request, attempts, cancel)
            .await?
    } else {
        client.execute_with_retry::<Value>(&request, 1, cancel).await?
    };
    Ok(response.data)
}

/// Every identifier kind the value parses as, with its components.
///
/// Record keys accept nearly anything, so they are only reported when no
/// other kind matched.
pub fn inspect(value: &str) -> anyhow::Result<Value> {
    let mut matches = Vec::new();

    if let Ok(did) = Did::parse(value) {
        matches.push(json!({
            "kind": "did",
            "canonical": did.as_str(),
            "method": did.method(),
            "id": did.method_specific_id(),
        }));
    }
    if let Ok(handle) = Handle::parse(value) {
        matches.push(json!({
            "kind": "handle",
            "canonical": handle.as_str(),
            "tld": handle.tld(),
            "test": handle.is_test(),
        }));
    }
    if let Ok(nsid) = Nsid::parse(value) {
        matches.push(json!({
            "kind": "nsid",
            "canonical": nsid.as_str(),
            "authority": nsid.authority(),
            "name": nsid.name(),
        }));
    }
    if let Ok(uri) = AtUri::parse(value) {
        matches.push(describe_uri(&uri));
    }
    if let Ok(tid) = Tid::parse(value) {
        matches.push(describe_tid(tid));
    }
    if let Ok(cid) = ContentId::parse(value) {
        matches.push(json!({
            "kind": "cid",
            "canonical": cid.to_string(),
            "codec": format!("{:?}", cid.codec()),
            "hash": format!("{:?}", cid.hash()),
            "digest_len": cid.digest().len(),
        }));
    }
    if matches.is_empty() {
        if let Ok(rkey) = RecordKey::parse(value) {
            matches.push(json!({ "kind": "record_key", "canonical": rkey.as_str() }));
        }
    }

    if matches.is_empty() {
        bail!("`{value}` is not a recognized identifier");
    }
    Ok(Value::Array(matches))
}

fn describe_uri(uri: &AtUri) -> Value {
    let authority = match uri.authority() {
        AtIdentifier::Did(did) => json!({ "did": did.as_str() }),
        AtIdentifier::Handle(handle) => json!({ "handle": handle.as_str() }),
    };
    json!({
        "kind": "at_uri",
        "canonical": uri.to_string(),
        "level": format!("{:?}", uri.level()),
        "authority": authority,
        "collection": uri.collection_nsid().map(Nsid::as_str),
        "rkey": uri.rkey().map(RecordKey::as_str),
    })
}

fn describe_tid(tid: Tid) -> Value {
    let micros = tid.timestamp_micros();
    let timestamp = i64::try_from(micros / 1_000_000)
        .ok()
        .and_then(|secs| DateTime::<Utc>::from_timestamp(secs, (micros % 1_000_000) as u32 * 1_000))
        .map(|at| at.to_rfc3339());
    json!({
        "kind": "tid",
        "canonical": tid.to_string(),
        "timestamp": timestamp,
        "clock_id": tid.clock_id(),
    })
}

pub fn mint_tids(generator: &TidGenerator, count: usize) -> Value {
    let tids = generator.sequence(count);
    debug!(count = tids.len(), clock_id = generator.clock_id(), "Minted TIDs");
    Value::Array(tids.iter().map(|tid| Value::String(tid.to_string())).collect())
}

pub async fn labelers<R: HandleResolver + ?Sized>(
    config: &AuthorityConfig,
    handle: Option<&str>,
    resolver: &R,
) -> anyhow::Result<Value> {
    let authorities = match handle {
        Some(raw) => {
            let handle = Handle::parse(raw)?;
            configure_for_account(config, &handle, resolver).await
        }
        None => configure_for_guest(config),
    };
    Ok(json!({
        "session": if handle.is_some() { "account" } else { "guest" },
        "test_environment": authorities.is_test_environment(),
        "labelers": authorities.dids().iter().map(Did::as_str).collect::<Vec<_>>(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use atproto_ids::ManualClock;
    use atproto_moderation::XrpcHandleResolver;
    use atproto_xrpc::{MockTransport, RetryPolicy, XrpcError};

    #[test]
    fn test_inspect_did() {
        let out = inspect("did:plc:z72i7hdynmk6r22z27h6tvur").unwrap();
        assert_eq!(out[0]["kind"], "did");
        assert_eq!(out[0]["method"], "plc");
    }

    #[test]
    fn test_inspect_ambiguous_dotted_name() {
        let out = inspect("app.bsky.feed").unwrap();
        let kinds: Vec<&str> =
            out.as_array().unwrap().iter().map(|m| m["kind"].as_str().unwrap()).collect();
        assert_eq!(kinds, vec!["handle", "nsid"]);
    }

    #[test]
    fn test_inspect_record_uri() {
        let out = inspect("at://did:plc:alice/app.bsky.feed.post/3k2x").unwrap();
        assert_eq!(out[0]["kind"], "at_uri");
        assert_eq!(out[0]["collection"], "app.bsky.feed.post");
        assert_eq!(out[0]["rkey"], "3k2x");
        assert_eq!(out[0]["authority"]["did"], "did:plc:alice");
    }

    #[test]
    fn test_inspect_rejects_garbage() {
        assert!(inspect("at://").is_err());
    }

    #[test]
    fn test_mint_tids_increasing() {
        let generator = TidGenerator::with_clock(ManualClock::new(1_700_000_000_000_000), 3);
        let out = mint_tids(&generator, 4);
        let tids: Vec<&str> = out.as_array().unwrap().iter().map(|v| v.as_str().unwrap()).collect();
        assert_eq!(tids.len(), 4);
        assert!(tids.windows(2).all(|w| w[0] < w[1]));
    }

    #[tokio::test]
    async fn test_query_forwards_params_and_token() {
        let client = XrpcClient::new(MockTransport::new().then_json(json!({ "ok": true })));
        let out = query(
            &client,
            "app.bsky.actor.getProfile",
            &[("actor".to_string(), "bsky.app".to_string())],
            Some("jwt"),
            3,
            &CancelSignal::never(),
        )
        .await
        .unwrap();
        assert_eq!(out["ok"], true);

        let sent = client.transport().requests();
        assert_eq!(sent[0].params(), &[("actor".to_string(), "bsky.app".to_string())]);
        assert_eq!(sent[0].auth_token(), Some("jwt"));
    }

    #[tokio::test]
    async fn test_procedure_sent_once_without_retry() {
        let unavailable = XrpcError::from_status(503, "Unavailable", "");
        let transport = MockTransport::new().with_fallback(Err(unavailable));
        let client = XrpcClient::new(std::sync::Arc::new(transport));
        let result = procedure(
            &client,
            "com.atproto.repo.createRecord",
            Some(r#"{"repo":"did:plc:alice"}"#),
            None,
            false,
            3,
            &CancelSignal::never(),
        )
        .await;
        assert!(result.is_err());
        assert_eq!(client.transport().call_count(), 1);
    }

    #[tokio::test]
    async fn test_procedure_retries_when_asked() {
        let transport = MockTransport::new()
            .then_error(XrpcError::from_status(503, "Unavailable", ""))
            .then_json(json!({ "uri": "at://did:plc:alice/app.bsky.feed.post/3k2x" }));
        let client = XrpcClient::new(std::sync::Arc::new(transport)).with_retry_policy(
            RetryPolicy::default().with_initial_delay(std::time::Duration::from_millis(1)),
        );
        let out = procedure(
            &client,
            "com.atproto.repo.createRecord",
            Some("{}"),
            None,
            true,
            3,
            &CancelSignal::never(),
        )
        .await
        .unwrap();
        assert_eq!(out["uri"], "at://did:plc:alice/app.bsky.feed.post/3k2x");
        assert_eq!(client.transport().call_count(), 2);
    }

    #[tokio::test]
    async fn test_procedure_rejects_bad_body() {
        let client = XrpcClient::new(std::sync::Arc::new(MockTransport::new()));
        let cancel = CancelSignal::never();
        let result = procedure(&client, "a.b.c", Some("{"), None, false, 1, &cancel).await;
        assert!(result.is_err());
        assert_eq!(client.transport().call_count(), 0);
    }

    #[test]
    fn test_labelers_for_guest() {
        let resolver = XrpcHandleResolver::new(XrpcClient::new(MockTransport::new()));
        let config = AuthorityConfig::default();
        let out = tokio_test::block_on(labelers(&config, None, &resolver)).unwrap();
        assert_eq!(out["session"], "guest");
        assert_eq!(out["labelers"].as_array().unwrap().len(), 1);

        let suppressed = config.suppressed();
        let out = tokio_test::block_on(labelers(&suppressed, None, &resolver)).unwrap();
        assert!(out["labelers"].as_array().unwrap().is_empty());
    }

    #[test]
    fn test_labelers_for_test_account() {
        let resolver = XrpcHandleResolver::new(XrpcClient::new(
            MockTransport::new().then_json(json!({ "did": "did:plc:testmod" })),
        ));
        let config = AuthorityConfig::default();
        let out = tokio_test::block_on(labelers(&config, Some("alice.test"), &resolver)).unwrap();
        assert_eq!(out["test_environment"], true);
        assert_eq!(out["labelers"], json!(["did:plc:testmod"]));
    }
}
