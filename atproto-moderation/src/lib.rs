//! Moderation for AT Protocol clients
//!
//! Turns an account's stored preferences, locally configured labelers and
//! session labeling authorities into one [`ModerationContext`], and applies
//! that context to labels.
//!
//! ```
//! use atproto_moderation::{
//!     configure_for_guest, resolve, AuthorityConfig, ModerationInputs, ModerationPrefs,
//! };
//!
//! let authorities = configure_for_guest(&AuthorityConfig::default());
//! let state = resolve(ModerationInputs {
//!     preferences: Some(ModerationPrefs::default()),
//!     app_labelers: authorities.into_dids(),
//!     ..Default::default()
//! });
//! let context = state.ready().unwrap();
//! assert_eq!(context.labelers().len(), 1);
//! ```
//!
//! Resolution itself does no I/O; only [`configure_for_account`] and
//! [`fetch_preferences`] talk to a service.

pub mod authority;
pub mod context;
pub mod labels;
pub mod prefs;

pub use authority::{
    configure_for_account, configure_for_guest, AuthorityConfig, HandleResolver,
    LabelerAuthorities, XrpcHandleResolver, DEFAULT_LABELER_DID, TEST_LABELER_HANDLE,
};
pub use context::{resolve, ModerationContext, ModerationInputs, ModerationState};
pub use labels::{Label, LabelBehavior, LabelCatalog, LabelDecision, LabelDefinition};
pub use prefs::{fetch_preferences, LabelerPref, ModerationPrefs, MutedWord};
