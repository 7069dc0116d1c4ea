//! Labels, label definitions and how they resolve to a display behavior

use std::collections::BTreeMap;

use atproto_ids::Did;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Labels any subscribed labeler may apply that users cannot configure.
pub const HIDE_LABEL: &str = "!hide";
pub const WARN_LABEL: &str = "!warn";

/// Global label values that are adult-only regardless of labeler.
pub const ADULT_LABELS: [&str; 3] = ["porn", "sexual", "nudity"];

/// A label attached to an account or record by a labeler.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Label {
    /// Labeler that issued the label
    pub src: Did,
    /// Subject: an AT-URI for records, a DID for accounts
    pub uri: String,
    /// Pins the label to one version of the subject
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cid: Option<String>,
    pub val: String,
    /// A negation retracts an earlier label with the same value
    #[serde(default)]
    pub neg: bool,
    pub cts: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exp: Option<DateTime<Utc>>,
}

impl Label {
    pub fn new(src: Did, uri: impl Into<String>, val: impl Into<String>) -> Self {
        Self {
            src,
            uri: uri.into(),
            cid: None,
            val: val.into(),
            neg: false,
            cts: Utc::now(),
            exp: None,
        }
    }

    pub fn negated(mut self) -> Self {
        self.neg = true;
        self
    }

    pub fn expiring_at(mut self, exp: DateTime<Utc>) -> Self {
        self.exp = Some(exp);
        self
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.exp.is_some_and(|exp| exp <= now)
    }

    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }
}

/// What to do with content carrying a label. Ordered from least to most
/// restrictive.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LabelBehavior {
    #[default]
    #[serde(alias = "show")]
    Ignore,
    Warn,
    Hide,
}

/// A labeler's declaration of one label value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LabelDefinition {
    pub identifier: String,
    /// `inform`, `alert` or `none`
    #[serde(default)]
    pub severity: String,
    /// `content`, `media` or `none`
    #[serde(default)]
    pub blurs: String,
    #[serde(default = "default_setting", rename = "defaultSetting")]
    pub default_behavior: LabelBehavior,
    #[serde(default)]
    pub adult_only: bool,
}

fn default_setting() -> LabelBehavior {
    LabelBehavior::Warn
}

impl LabelDefinition {
    pub fn new(identifier: impl Into<String>, default_behavior: LabelBehavior) -> Self {
        Self {
            identifier: identifier.into(),
            severity: "alert".to_string(),
            blurs: "content".to_string(),
            default_behavior,
            adult_only: false,
        }
    }

    pub fn adult_only(mut self) -> Self {
        self.adult_only = true;
        self
    }
}

/// Label definitions keyed by the labeler that declared them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabelCatalog {
    definitions: BTreeMap<Did, Vec<LabelDefinition>>,
}

impl LabelCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the definitions for one labeler.
    pub fn insert(&mut self, labeler: Did, definitions: Vec<LabelDefinition>) {
        self.definitions.insert(labeler, definitions);
    }

    pub fn with(mut self, labeler: Did, definitions: Vec<LabelDefinition>) -> Self {
        self.insert(labeler, definitions);
        self
    }

    pub fn definition(&self, labeler: &Did, value: &str) -> Option<&LabelDefinition> {
        self.definitions
            .get(labeler)
            .and_then(|defs| defs.iter().find(|def| def.identifier == value))
    }

    pub fn labelers(&self) -> impl Iterator<Item = &Did> {
        self.definitions.keys()
    }

    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }
}

/// Outcome of applying labels to one subject.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LabelDecision {
    /// Most restrictive behavior among the applied labels
    pub behavior: LabelBehavior,
    /// Labels that took effect, in input order
    pub applied: Vec<Label>,
}

impl LabelDecision {
    pub fn should_hide(&self) -> bool {
        self.behavior == LabelBehavior::Hide
    }

    pub fn should_warn(&self) -> bool {
        self.behavior >= LabelBehavior::Warn
    }

    pub(crate) fn apply(&mut self, label: &Label, behavior: LabelBehavior) {
        if behavior == LabelBehavior::Ignore {
            return;
        }
        self.behavior = self.behavior.max(behavior);
        self.applied.push(label.clone());
    }
}
