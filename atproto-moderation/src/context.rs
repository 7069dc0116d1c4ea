//! Moderation context resolution

use std::collections::BTreeSet;

use atproto_ids::{AtUri, Did};
use atproto_xrpc::AcceptLabelers;

use crate::labels::{
    Label, LabelBehavior, LabelCatalog, LabelDecision, ADULT_LABELS, HIDE_LABEL, WARN_LABEL,
};
use crate::prefs::{ModerationPrefs, MutedWord};

/// Everything [`resolve`] looks at.
///
/// | Field | Effect |
/// |---|---|
/// | `account` | acting DID, `None` for guests |
/// | `preferences` | `None` means not loaded yet: the result is unresolved |
/// | `additional_labelers` | locally configured authorities, after stored subscriptions |
/// | `app_labelers` | session authorities (guest default, test environment), last |
/// | `hidden_content` | records hidden locally, `None` is empty |
/// | `label_defs` | attached as given |
/// | `test_override` | returned unchanged, everything else ignored |
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ModerationInputs {
    pub account: Option<Did>,
    pub preferences: Option<ModerationPrefs>,
    pub additional_labelers: Vec<Did>,
    pub app_labelers: Vec<Did>,
    pub hidden_content: Option<BTreeSet<AtUri>>,
    pub label_defs: LabelCatalog,
    pub test_override: Option<ModerationContext>,
}

/// Effective moderation configuration for one session.
///
/// Built by [`resolve`] and replaced wholesale when any input changes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ModerationContext {
    account: Option<Did>,
    prefs: ModerationPrefs,
    labelers: Vec<Did>,
    app_labelers: Vec<Did>,
    hidden_content: BTreeSet<AtUri>,
    label_defs: LabelCatalog,
}

/// Preferences loaded or not.
///
/// `Unresolved` means "hide nothing yet, show loading", never "no
/// moderation".
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModerationState {
    Unresolved,
    Ready(ModerationContext),
}

impl ModerationState {
    pub fn is_unresolved(&self) -> bool {
        matches!(self, ModerationState::Unresolved)
    }

    pub fn ready(&self) -> Option<&ModerationContext> {
        match self {
            ModerationState::Ready(context) => Some(context),
            ModerationState::Unresolved => None,
        }
    }

    pub fn into_ready(self) -> Option<ModerationContext> {
        match self {
            ModerationState::Ready(context) => Some(context),
            ModerationState::Unresolved => None,
        }
    }
}

/// Compute the moderation state from its inputs.
///
/// ```
/// use atproto_ids::Did;
/// use atproto_moderation::{resolve, ModerationInputs, ModerationPrefs};
///
/// let a = Did::parse("did:plc:a").unwrap();
/// let b = Did::parse("did:plc:b").unwrap();
/// let c = Did::parse("did:plc:c").unwrap();
///
/// let state = resolve(ModerationInputs {
///     preferences: Some(ModerationPrefs::with_labelers([a.clone(), b.clone()])),
///     additional_labelers: vec![b.clone(), c.clone()],
///     ..Default::default()
/// });
/// assert_eq!(state.ready().unwrap().labelers(), &[a, b, c]);
/// ```
pub fn resolve(inputs: ModerationInputs) -> ModerationState {
    if let Some(context) = inputs.test_override {
        return ModerationState::Ready(context);
    }
    let Some(prefs) = inputs.preferences else {
        return ModerationState::Unresolved;
    };

    let mut labelers: Vec<Did> = Vec::new();
    let candidates = prefs
        .labeler_dids()
        .chain(&inputs.additional_labelers)
        .chain(&inputs.app_labelers);
    for did in candidates {
        if !labelers.contains(did) {
            labelers.push(did.clone());
        }
    }

    ModerationState::Ready(ModerationContext {
        account: inputs.account,
        labelers,
        app_labelers: inputs.app_labelers,
        hidden_content: inputs.hidden_content.unwrap_or_default(),
        label_defs: inputs.label_defs,
        prefs,
    })
}

impl ModerationContext {
    /// A context with only an account and preferences; labelers come from
    /// the stored subscriptions.
    pub fn new(account: Option<Did>, prefs: ModerationPrefs) -> Self {
        let labelers = prefs.labeler_dids().cloned().collect();
        Self {
            account,
            prefs,
            labelers,
            ..Default::default()
        }
    }

    pub fn with_hidden_content(mut self, hidden: BTreeSet<AtUri>) -> Self {
        self.hidden_content = hidden;
        self
    }

    pub fn with_label_defs(mut self, label_defs: LabelCatalog) -> Self {
        self.label_defs = label_defs;
        self
    }

    pub fn account(&self) -> Option<&Did> {
        self.account.as_ref()
    }

    pub fn prefs(&self) -> &ModerationPrefs {
        &self.prefs
    }

    /// Effective labelers, deduplicated, in merge order.
    pub fn labelers(&self) -> &[Did] {
        &self.labelers
    }

    pub fn hidden_content(&self) -> &BTreeSet<AtUri> {
        &self.hidden_content
    }

    pub fn label_defs(&self) -> &LabelCatalog {
        &self.label_defs
    }

    pub fn is_hidden(&self, uri: &AtUri) -> bool {
        self.hidden_content.contains(uri)
    }

    /// Value for the `atproto-accept-labelers` header.
    ///
    /// Session authorities come first and ask for redaction, so they survive
    /// the header's size bound.
    pub fn accept_labelers(&self) -> AcceptLabelers {
        let mut header = AcceptLabelers::from_dids(&self.app_labelers, true);
        for did in &self.labelers {
            header.push(did.clone(), false);
        }
        header
    }

    /// First muted word found in post text, if any.
    pub fn muted_word_in_text(&self, text: &str) -> Option<&MutedWord> {
        self.prefs.muted_words.iter().find(|word| word.matches_text(text))
    }

    pub fn mutes_text(&self, text: &str) -> bool {
        self.muted_word_in_text(text).is_some()
    }

    /// Whether any of a post's hashtags is muted.
    pub fn mutes_tag(&self, tag: &str) -> bool {
        self.prefs.muted_words.iter().any(|word| word.matches_tag(tag))
    }

    /// Resolve how a subject carrying `labels` should be shown.
    ///
    /// Labels from labelers outside this context, negations and expired
    /// labels have no effect. The behavior of the most restrictive remaining
    /// label wins.
    pub fn decide(&self, labels: &[Label]) -> LabelDecision {
        let now = chrono::Utc::now();
        let mut decision = LabelDecision::default();
        for label in labels {
            if label.neg || label.is_expired_at(now) || !self.labelers.contains(&label.src) {
                continue;
            }
            decision.apply(label, self.behavior_for(label));
        }
        decision
    }

    fn behavior_for(&self, label: &Label) -> LabelBehavior {
        match label.val.as_str() {
            HIDE_LABEL => return LabelBehavior::Hide,
            WARN_LABEL => return LabelBehavior::Warn,
            _ => {}
        }

        let definition = self.label_defs.definition(&label.src, &label.val);
        let adult = definition.is_some_and(|def| def.adult_only)
            || ADULT_LABELS.contains(&label.val.as_str());
        if adult && !self.prefs.adult_content_enabled {
            return LabelBehavior::Hide;
        }

        self.prefs
            .labeler(&label.src)
            .and_then(|pref| pref.labels.get(&label.val))
            .or_else(|| self.prefs.labels.get(&label.val))
            .copied()
            .or_else(|| definition.map(|def| def.default_behavior))
            .unwrap_or(LabelBehavior::Warn)
    }
}
