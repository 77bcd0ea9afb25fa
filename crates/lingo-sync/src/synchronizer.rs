use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{broadcast, mpsc, watch};
use tracing::{debug, error, info, warn};

use lingo_relay::RelayChannels;
use lingo_store::{MessageStore, StoreWriteError, TailSubscription};
use lingo_types::{Identity, Message, MessageDraft, MessageId, RelayCommand, RelayEvent};

use crate::session::{SessionState, SessionStateMachine};
use crate::view::{ConversationView, TranslationPanel, order_snapshot};

/// Commands driving the synchronizer's event loop.
#[derive(Debug, Clone)]
pub enum SyncCommand {
    /// The auth collaborator started resolving an identity.
    AuthPending,
    /// Auth finished: `Some` means signed in, `None` signed out.
    AuthResolved(Option<Identity>),
    /// User submitted text from the input box.
    Submit { text: String },
    /// Flip the translation display mode. Affects future relay events
    /// only; persisted history never changes.
    SetTranslationEnabled(bool),
    Shutdown,
}

/// User-visible notifications (toast/log material).
#[derive(Debug, Clone)]
pub enum SyncNotice {
    /// A user send failed at the store. The text is carried so the
    /// interaction layer can keep it in the input box for retry.
    SendFailed {
        text: String,
        reason: StoreWriteError,
    },
}

/// What happened to one submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// Appended to the store and emitted on the relay.
    Sent(MessageId),
    /// Silently dropped (empty input, or no active session).
    Rejected,
    /// The store append failed; the relay emit was suppressed.
    Failed(StoreWriteError),
}

#[derive(Debug, Clone, Copy)]
pub struct SyncConfig {
    /// Bounded-tail size of the live store subscription.
    pub tail_limit: usize,
    /// Pause before re-subscribing when the tail stream ends mid-session.
    pub tail_retry_delay: Duration,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            tail_limit: 50,
            tail_retry_delay: Duration::from_millis(250),
        }
    }
}

/// The conversation synchronizer.
///
/// Merges the store's live ordered snapshots with relay translation
/// results into one view, owns the display-mode toggle, and persists
/// accepted translation results back to the store under the bot
/// identity. All mutable state lives here and is touched only by the
/// event loop; the store and relay never reach in.
pub struct Synchronizer {
    store: Arc<dyn MessageStore>,
    relay: RelayChannels,
    config: SyncConfig,
    session: SessionStateMachine,
    identity: Option<Identity>,
    translation_enabled: bool,
    latest_translation: Option<String>,
    messages: Vec<Message>,
    view_tx: watch::Sender<ConversationView>,
    notice_tx: broadcast::Sender<SyncNotice>,
}

impl Synchronizer {
    pub fn new(store: Arc<dyn MessageStore>, relay: RelayChannels, config: SyncConfig) -> Self {
        let initial = ConversationView::default();
        let translation_enabled = initial.translation_enabled;
        let (view_tx, _) = watch::channel(initial);
        let (notice_tx, _) = broadcast::channel(16);

        Self {
            store,
            relay,
            config,
            session: SessionStateMachine::default(),
            identity: None,
            translation_enabled,
            latest_translation: None,
            messages: Vec::new(),
            view_tx,
            notice_tx,
        }
    }

    /// Live view model for presentation.
    pub fn view(&self) -> watch::Receiver<ConversationView> {
        self.view_tx.subscribe()
    }

    /// User-facing notifications (send failures).
    pub fn notices(&self) -> broadcast::Receiver<SyncNotice> {
        self.notice_tx.subscribe()
    }

    pub fn session_state(&self) -> SessionState {
        self.session.state()
    }

    /// Outgoing path: append to the store first (the visible
    /// conversation is store-driven), then emit on the relay. A store
    /// failure suppresses the relay emit — never translate a message
    /// that failed to persist.
    pub async fn submit_message(&mut self, text: &str) -> SubmitOutcome {
        if text.trim().is_empty() {
            // Input guard, not a failure.
            return SubmitOutcome::Rejected;
        }

        let Some(identity) = self.identity.clone() else {
            warn!("submit without an active session, dropping");
            return SubmitOutcome::Rejected;
        };

        let draft = MessageDraft {
            text: text.to_owned(),
            author_id: identity.uid,
            avatar_url: identity.avatar_url,
        };

        match self.store.append(draft).await {
            Ok(id) => {
                self.relay.send(RelayCommand::OutgoingMessage {
                    message: text.to_owned(),
                });
                debug!(message_id = %id, "message sent");
                SubmitOutcome::Sent(id)
            }
            Err(reason) => {
                error!("failed to send message: {reason}");
                let _ = self.notice_tx.send(SyncNotice::SendFailed {
                    text: text.to_owned(),
                    reason: reason.clone(),
                });
                SubmitOutcome::Failed(reason)
            }
        }
    }

    /// Incoming path: pick translated vs original text by the display
    /// mode as it is *now*, persist it under the bot identity when a
    /// user is signed in (best-effort), and update the latest
    /// translation display value either way.
    pub async fn handle_translation_result(&mut self, original_text: String, translated_text: String) {
        let text_to_display = if self.translation_enabled {
            translated_text
        } else {
            original_text
        };

        if self.identity.is_some() {
            if let Err(e) = self.store.append(MessageDraft::bot(text_to_display.clone())).await {
                // No user is waiting on this write; log and move on.
                warn!("failed to persist translation result: {e}");
            }
        }

        self.latest_translation = Some(text_to_display);
        self.publish_view();
    }

    pub fn set_translation_enabled(&mut self, enabled: bool) {
        self.translation_enabled = enabled;
        self.publish_view();
    }

    /// Merge one full tail snapshot into the view.
    pub fn apply_snapshot(&mut self, snapshot: Vec<Message>) {
        self.messages = order_snapshot(snapshot, self.config.tail_limit);
        self.publish_view();
    }

    /// Apply an auth change from the identity boundary. Invalid
    /// transitions are logged, never fatal.
    pub fn handle_auth_pending(&mut self) {
        if let Err(e) = self.session.begin_loading() {
            warn!("{e}");
        }
    }

    pub fn handle_auth_resolved(&mut self, identity: Option<Identity>) {
        match identity {
            Some(identity) => {
                // Auth may resolve without a pending notice (restored
                // session); walk through Loading either way.
                if self.session.state() == SessionState::SignedOut {
                    if let Err(e) = self.session.begin_loading() {
                        warn!("{e}");
                    }
                }
                match self.session.state() {
                    SessionState::Loading => {
                        if let Err(e) = self.session.activate() {
                            warn!("{e}");
                        }
                        info!(uid = %identity.uid, "session active");
                    }
                    SessionState::Active => {
                        debug!(uid = %identity.uid, "identity refreshed");
                    }
                    SessionState::SignedOut => {}
                }
                self.identity = Some(identity);
            }
            None => {
                if self.session.state() != SessionState::SignedOut {
                    if let Err(e) = self.session.sign_out() {
                        warn!("{e}");
                    }
                    info!("session signed out");
                }
                self.identity = None;
                self.messages.clear();
                self.latest_translation = None;
                self.publish_view();
            }
        }
    }

    fn publish_view(&self) {
        let translation = self
            .latest_translation
            .clone()
            .map(|text| TranslationPanel::new(self.translation_enabled, text));

        let _ = self.view_tx.send(ConversationView {
            messages: self.messages.clone(),
            translation_enabled: self.translation_enabled,
            translation,
        });
    }

    /// Single-task event loop. Tail snapshots and relay events
    /// interleave arbitrarily; no relative ordering is assumed. The
    /// tail subscription exists only while the session is `Active` and
    /// is dropped in the same handler that leaves it, so no snapshot
    /// fires against a torn-down session.
    pub async fn run(mut self, mut commands: mpsc::Receiver<SyncCommand>) {
        let mut relay_events = self.relay.subscribe();
        let mut relay_closed = false;
        let mut tail: Option<TailSubscription> = None;

        loop {
            tokio::select! {
                command = commands.recv() => {
                    match command {
                        None | Some(SyncCommand::Shutdown) => {
                            info!("synchronizer shutting down");
                            return;
                        }
                        Some(SyncCommand::AuthPending) => self.handle_auth_pending(),
                        Some(SyncCommand::AuthResolved(identity)) => {
                            let was_active = self.session.is_active();
                            self.handle_auth_resolved(identity);
                            let is_active = self.session.is_active();

                            if is_active && !was_active {
                                tail = Some(self.store.subscribe_tail(self.config.tail_limit));
                            } else if !is_active {
                                // Dropping the subscription is the
                                // deregistration.
                                tail = None;
                            }
                        }
                        Some(SyncCommand::Submit { text }) => {
                            let _ = self.submit_message(&text).await;
                        }
                        Some(SyncCommand::SetTranslationEnabled(enabled)) => {
                            self.set_translation_enabled(enabled);
                        }
                    }
                }
                snapshot = next_tail_snapshot(&mut tail) => {
                    match snapshot {
                        Some(snapshot) => self.apply_snapshot(snapshot),
                        None if self.session.is_active() => {
                            // The store contract lets the stream end on a
                            // transient fault; live snapshots come back by
                            // re-subscribing.
                            warn!("store tail subscription ended mid-session, re-subscribing");
                            tokio::time::sleep(self.config.tail_retry_delay).await;
                            tail = Some(self.store.subscribe_tail(self.config.tail_limit));
                        }
                        None => {
                            warn!("store tail subscription ended");
                            tail = None;
                        }
                    }
                }
                event = relay_events.recv(), if !relay_closed => {
                    match event {
                        Ok(RelayEvent::TranslationResult { original_text, translated_text }) => {
                            self.handle_translation_result(original_text, translated_text).await;
                        }
                        Err(broadcast::error::RecvError::Lagged(n)) => {
                            warn!("relay event stream lagged by {n}, continuing");
                        }
                        Err(broadcast::error::RecvError::Closed) => {
                            warn!("relay event stream closed");
                            relay_closed = true;
                        }
                    }
                }
            }
        }
    }
}

/// Pending forever while no subscription exists, so the select loop
/// simply ignores the tail branch outside `Active`.
async fn next_tail_snapshot(tail: &mut Option<TailSubscription>) -> Option<Vec<Message>> {
    match tail {
        Some(subscription) => subscription.next_snapshot().await,
        None => std::future::pending().await,
    }
}
