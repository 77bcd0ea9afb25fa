//! Conversation synchronizer.
//!
//! Reconciles two independently-updating sources — the durable ordered
//! message store and the transient translation relay — into one
//! consistent view, under a session lifecycle gated by the external
//! auth collaborator and a client-local translation display toggle.

/// Session lifecycle state machine.
pub mod session;
/// The synchronizer core and its command/notice protocol.
pub mod synchronizer;
/// View model handed to presentation.
pub mod view;

pub use session::{InvalidTransition, SessionState, SessionStateMachine};
pub use synchronizer::{SubmitOutcome, SyncCommand, SyncConfig, SyncNotice, Synchronizer};
pub use view::{ConversationView, HEADING_ORIGINAL, HEADING_TRANSLATED, TranslationPanel, order_snapshot};
