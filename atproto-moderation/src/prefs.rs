//! Account moderation preferences
//!
//! Decodes the moderation-relevant entries of
//! `app.bsky.actor.getPreferences` into [`ModerationPrefs`]. The core only
//! reads these; writing preferences back belongs to the caller.

use std::collections::BTreeMap;

use atproto_ids::{AtUri, Did};
use atproto_xrpc::{CallKind, CancelSignal, XrpcClient, XrpcError, XrpcRequest, XrpcTransport};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::debug;

use crate::labels::LabelBehavior;

const ADULT_CONTENT_PREF: &str = "app.bsky.actor.defs#adultContentPref";
const CONTENT_LABEL_PREF: &str = "app.bsky.actor.defs#contentLabelPref";
const LABELERS_PREF: &str = "app.bsky.actor.defs#labelersPref";
const HIDDEN_POSTS_PREF: &str = "app.bsky.actor.defs#hiddenPostsPref";
const MUTED_WORDS_PREF: &str = "app.bsky.actor.defs#mutedWordsPref";

/// A labeler subscription with its per-label overrides.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelerPref {
    pub did: Did,
    pub labels: BTreeMap<String, LabelBehavior>,
}

impl LabelerPref {
    pub fn new(did: Did) -> Self {
        Self {
            did,
            labels: BTreeMap::new(),
        }
    }
}

const CONTENT_TARGET: &str = "content";
const TAG_TARGET: &str = "tag";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct MutedWord {
    pub value: String,
    /// `content` and/or `tag`; empty applies to both
    #[serde(default)]
    pub targets: Vec<String>,
}

impl MutedWord {
    pub fn new(value: impl Into<String>, targets: &[&str]) -> Self {
        Self {
            value: value.into(),
            targets: targets.iter().map(|t| t.to_string()).collect(),
        }
    }

    fn targets(&self, target: &str) -> bool {
        self.targets.is_empty() || self.targets.iter().any(|t| t == target)
    }

    /// Case-insensitive substring match against post text.
    pub fn matches_text(&self, text: &str) -> bool {
        let word = self.value.trim().to_lowercase();
        !word.is_empty() && self.targets(CONTENT_TARGET) && text.to_lowercase().contains(&word)
    }

    /// Case-insensitive match against a hashtag, with or without `#`.
    pub fn matches_tag(&self, tag: &str) -> bool {
        let word = self.value.trim().trim_start_matches('#');
        let tag = tag.trim().trim_start_matches('#');
        !word.is_empty() && self.targets(TAG_TARGET) && word.to_lowercase() == tag.to_lowercase()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ModerationPrefs {
    pub adult_content_enabled: bool,
    /// Global label settings, not tied to a labeler
    pub labels: BTreeMap<String, LabelBehavior>,
    /// Stored subscriptions in the order the account saved them
    pub labelers: Vec<LabelerPref>,
    pub hidden_posts: Vec<AtUri>,
    pub muted_words: Vec<MutedWord>,
}

#[derive(Deserialize)]
struct AdultContentPref {
    enabled: bool,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ContentLabelPref {
    #[serde(default)]
    labeler_did: Option<Did>,
    label: String,
    visibility: LabelBehavior,
}

#[derive(Deserialize)]
struct LabelersPref {
    labelers: Vec<LabelerPrefItem>,
}

#[derive(Deserialize)]
struct LabelerPrefItem {
    did: Did,
}

#[derive(Deserialize)]
struct HiddenPostsPref {
    items: Vec<AtUri>,
}

#[derive(Deserialize)]
struct MutedWordsPref {
    items: Vec<MutedWord>,
}

#[derive(Deserialize)]
struct GetPreferencesOutput {
    preferences: Vec<serde_json::Value>,
}

impl ModerationPrefs {
    /// Subscriptions only, no overrides.
    pub fn with_labelers(dids: impl IntoIterator<Item = Did>) -> Self {
        let mut prefs = Self::default();
        for did in dids {
            prefs.subscribe(did);
        }
        prefs
    }

    /// Add a subscription unless already present.
    pub fn subscribe(&mut self, did: Did) {
        if self.labeler(&did).is_none() {
            self.labelers.push(LabelerPref::new(did));
        }
    }

    pub fn labeler(&self, did: &Did) -> Option<&LabelerPref> {
        self.labelers.iter().find(|pref| &pref.did == did)
    }

    pub fn labeler_dids(&self) -> impl Iterator<Item = &Did> {
        self.labelers.iter().map(|pref| &pref.did)
    }

    /// Decode a `getPreferences` array.
    ///
    /// Unknown `$type`s are ignored. Known entries that fail to decode are
    /// skipped so one bad entry does not discard the rest. Label settings for
    /// labelers the account is not subscribed to are dropped.
    pub fn from_preferences(preferences: &[serde_json::Value]) -> Self {
        let mut prefs = Self::default();
        let mut labeler_labels: Vec<(Did, String, LabelBehavior)> = Vec::new();

        for entry in preferences {
            let Some(kind) = entry.get("$type").and_then(|t| t.as_str()) else {
                debug!("Skipping preference without $type");
                continue;
            };
            match kind {
                ADULT_CONTENT_PREF => {
                    if let Some(pref) = decode::<AdultContentPref>(kind, entry) {
                        prefs.adult_content_enabled = pref.enabled;
                    }
                }
                CONTENT_LABEL_PREF => {
                    if let Some(pref) = decode::<ContentLabelPref>(kind, entry) {
                        match pref.labeler_did {
                            Some(did) => labeler_labels.push((did, pref.label, pref.visibility)),
                            None => {
                                prefs.labels.insert(pref.label, pref.visibility);
                            }
                        }
                    }
                }
                LABELERS_PREF => {
                    if let Some(pref) = decode::<LabelersPref>(kind, entry) {
                        for item in pref.labelers {
                            prefs.subscribe(item.did);
                        }
                    }
                }
                HIDDEN_POSTS_PREF => {
                    if let Some(pref) = decode::<HiddenPostsPref>(kind, entry) {
                        prefs.hidden_posts.extend(pref.items);
                    }
                }
                MUTED_WORDS_PREF => {
                    if let Some(pref) = decode::<MutedWordsPref>(kind, entry) {
                        prefs.muted_words.extend(pref.items);
                    }
                }
                _ => {}
            }
        }

        for (did, label, behavior) in labeler_labels {
            match prefs.labelers.iter_mut().find(|pref| pref.did == did) {
                Some(pref) => {
                    pref.labels.insert(label, behavior);
                }
                None => debug!(
                    labeler = %did,
                    label = %label,
                    "Dropping label setting for unsubscribed labeler"
                ),
            }
        }

        prefs
    }
}

fn decode<T: DeserializeOwned>(kind: &str, entry: &serde_json::Value) -> Option<T> {
    match serde_json::from_value(entry.clone()) {
        Ok(value) => Some(value),
        Err(e) => {
            debug!(kind, error = %e, "Skipping malformed preference");
            None
        }
    }
}

/// Load the account's moderation preferences.
pub async fn fetch_preferences<T: XrpcTransport>(
    client: &XrpcClient<T>,
    access_token: &str,
    max_attempts: u32,
    cancel: &CancelSignal,
) -> Result<ModerationPrefs, XrpcError> {
    let request =
        XrpcRequest::parse(CallKind::Query, "app.bsky.actor.getPreferences")?.auth(access_token);
    let output = client
        .execute_with_retry::<GetPreferencesOutput>(&request, max_attempts, cancel)
        .await?
        .data;
    Ok(ModerationPrefs::from_preferences(&output.preferences))
}

#[cfg(test)]
mod tests {
    use super::*;
    use atproto_xrpc::MockTransport;
    use serde_json::json;

    fn did(raw: &str) -> Did {
        Did::parse(raw).unwrap()
    }

    #[test]
    fn test_decodes_known_entries() {
        let prefs = ModerationPrefs::from_preferences(&[
            json!({ "$type": ADULT_CONTENT_PREF, "enabled": true }),
            json!({
                "$type": LABELERS_PREF,
                "labelers": [{ "did": "did:plc:mod1" }, { "did": "did:plc:mod2" }]
            }),
            json!({ "$type": CONTENT_LABEL_PREF, "label": "graphic-media", "visibility": "warn" }),
            json!({
                "$type": CONTENT_LABEL_PREF,
                "labelerDid": "did:plc:mod2",
                "label": "rude",
                "visibility": "hide"
            }),
            json!({
                "$type": HIDDEN_POSTS_PREF,
                "items": ["at://did:plc:bob/app.bsky.feed.post/3k2x"]
            }),
            json!({
                "$type": MUTED_WORDS_PREF,
                "items": [{ "value": "spoiler", "targets": ["content"] }]
            }),
            json!({ "$type": "app.bsky.actor.defs#savedFeedsPrefV2", "items": [] }),
        ]);

        assert!(prefs.adult_content_enabled);
        assert_eq!(
            prefs.labeler_dids().cloned().collect::<Vec<_>>(),
            vec![did("did:plc:mod1"), did("did:plc:mod2")]
        );
        assert_eq!(prefs.labels.get("graphic-media"), Some(&LabelBehavior::Warn));
        assert_eq!(
            prefs.labeler(&did("did:plc:mod2")).unwrap().labels.get("rude"),
            Some(&LabelBehavior::Hide)
        );
        assert_eq!(prefs.hidden_posts.len(), 1);
        assert_eq!(prefs.muted_words[0].value, "spoiler");
    }

    #[test]
    fn test_malformed_entries_skipped() {
        let prefs = ModerationPrefs::from_preferences(&[
            json!({ "$type": LABELERS_PREF, "labelers": [{ "did": "not-a-did" }] }),
            json!({ "$type": ADULT_CONTENT_PREF }),
            json!({ "enabled": true }),
            json!({ "$type": LABELERS_PREF, "labelers": [{ "did": "did:plc:mod1" }] }),
        ]);
        assert!(!prefs.adult_content_enabled);
        assert_eq!(prefs.labelers.len(), 1);
    }

    #[test]
    fn test_duplicate_subscriptions_collapse() {
        let prefs = ModerationPrefs::from_preferences(&[
            json!({
                "$type": LABELERS_PREF,
                "labelers": [{ "did": "did:plc:a" }, { "did": "did:plc:a" }]
            }),
        ]);
        assert_eq!(prefs.labelers.len(), 1);
    }

    #[test]
    fn test_label_setting_for_unsubscribed_labeler_dropped() {
        let prefs = ModerationPrefs::from_preferences(&[json!({
            "$type": CONTENT_LABEL_PREF,
            "labelerDid": "did:plc:stranger",
            "label": "rude",
            "visibility": "hide"
        })]);
        assert!(prefs.labelers.is_empty());
        assert!(prefs.labels.is_empty());
    }

    #[test]
    fn test_muted_word_targets() {
        let content_only = MutedWord::new("Spoiler", &["content"]);
        assert!(content_only.matches_text("no SPOILERS please"));
        assert!(!content_only.matches_tag("spoiler"));

        let tag_only = MutedWord::new("#Spoiler", &["tag"]);
        assert!(tag_only.matches_tag("spoiler"));
        assert!(tag_only.matches_tag("#SPOILER"));
        assert!(!tag_only.matches_tag("spoilers"));
        assert!(!tag_only.matches_text("a spoiler here"));

        let both = MutedWord::new("spoiler", &[]);
        assert!(both.matches_text("Spoiler"));
        assert!(both.matches_tag("spoiler"));

        assert!(!MutedWord::new("  ", &[]).matches_text("anything"));
    }

    #[tokio::test]
    async fn test_fetch_preferences_sends_auth() {
        let client = XrpcClient::new(MockTransport::new().then_json(json!({
            "preferences": [
                { "$type": LABELERS_PREF, "labelers": [{ "did": "did:plc:mod1" }] }
            ]
        })));
        let prefs = fetch_preferences(&client, "access-jwt", 3, &CancelSignal::never())
            .await
            .unwrap();
        assert_eq!(prefs.labelers.len(), 1);

        let sent = client.transport().requests();
        assert_eq!(sent[0].auth_token(), Some("access-jwt"));
        assert_eq!(sent[0].method().as_str(), "app.bsky.actor.getPreferences");
    }
}
