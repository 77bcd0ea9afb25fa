//! End-to-end exercise of the synchronizer event loop against a
//! scripted store and a bare relay channel pair.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio::time::timeout;
use uuid::Uuid;

use lingo_relay::RelayChannels;
use lingo_store::{MessageStore, StoreWriteError, TailSubscription};
use lingo_sync::{SessionState, SyncCommand, SyncConfig, Synchronizer};
use lingo_types::{
    Identity, Message, MessageDraft, MessageId, RelayCommand, RelayEvent, UserId,
};

/// Store fake that records appends and exposes the tail sender so the
/// test can push snapshots at will.
#[derive(Default)]
struct ScriptedStore {
    appended: Mutex<Vec<MessageDraft>>,
    tail_tx: Mutex<Option<mpsc::Sender<Vec<Message>>>>,
    subscribes: AtomicUsize,
}

impl ScriptedStore {
    fn appended(&self) -> Vec<MessageDraft> {
        self.appended.lock().unwrap().clone()
    }

    fn tail_sender(&self) -> Option<mpsc::Sender<Vec<Message>>> {
        self.tail_tx.lock().unwrap().clone()
    }

    fn subscribe_count(&self) -> usize {
        self.subscribes.load(Ordering::Relaxed)
    }

    /// Ends the current tail stream, as the real store does on a
    /// query fault.
    fn drop_tail_sender(&self) {
        *self.tail_tx.lock().unwrap() = None;
    }
}

#[async_trait]
impl MessageStore for ScriptedStore {
    async fn append(&self, draft: MessageDraft) -> Result<MessageId, StoreWriteError> {
        self.appended.lock().unwrap().push(draft);
        Ok(MessageId(Uuid::new_v4()))
    }

    fn subscribe_tail(&self, _limit: usize) -> TailSubscription {
        let (tx, rx) = mpsc::channel(8);
        *self.tail_tx.lock().unwrap() = Some(tx);
        self.subscribes.fetch_add(1, Ordering::Relaxed);
        TailSubscription::new(rx)
    }
}

fn message(seq: i64, text: &str, author: &str) -> Message {
    Message {
        id: MessageId(Uuid::new_v4()),
        seq,
        text: text.to_owned(),
        author_id: UserId::new(author),
        avatar_url: "https://example.org/a.png".to_owned(),
        created_at: Some(chrono::Utc::now()),
    }
}

async fn wait_for<F: Fn() -> bool>(what: &str, check: F) {
    for _ in 0..100 {
        if check() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("timed out waiting for {what}");
}

#[tokio::test]
async fn runs_the_full_sign_in_send_translate_sign_out_flow() {
    let store = Arc::new(ScriptedStore::default());
    let (relay, mut relay_command_rx) = RelayChannels::new(8);

    let sync = Synchronizer::new(store.clone(), relay.clone(), SyncConfig::default());
    let mut view = sync.view();
    assert_eq!(sync.session_state(), SessionState::SignedOut);

    let (command_tx, command_rx) = mpsc::channel(8);
    let loop_task = tokio::spawn(sync.run(command_rx));

    // Sign in: Loading then Active; the tail subscription appears.
    command_tx.send(SyncCommand::AuthPending).await.unwrap();
    command_tx
        .send(SyncCommand::AuthResolved(Some(Identity {
            uid: UserId::new("alice"),
            avatar_url: "https://example.org/alice.png".to_owned(),
        })))
        .await
        .unwrap();
    wait_for("tail subscription", || store.tail_sender().is_some()).await;

    // A store snapshot flows into the view.
    let tail_tx = store.tail_sender().unwrap();
    tail_tx
        .send(vec![message(1, "earlier", "bob")])
        .await
        .unwrap();
    timeout(Duration::from_secs(2), view.changed())
        .await
        .expect("view update")
        .unwrap();
    assert_eq!(view.borrow().messages.len(), 1);
    assert_eq!(view.borrow().messages[0].text, "earlier");

    // A user submission is appended and emitted on the relay.
    command_tx
        .send(SyncCommand::Submit {
            text: "Hello".into(),
        })
        .await
        .unwrap();
    let emitted = timeout(Duration::from_secs(2), relay_command_rx.recv())
        .await
        .expect("relay emit")
        .unwrap();
    assert_eq!(
        emitted,
        RelayCommand::OutgoingMessage {
            message: "Hello".into()
        }
    );
    assert_eq!(store.appended().last().unwrap().text, "Hello");

    // A relay result is persisted under the bot identity.
    relay.emit(RelayEvent::TranslationResult {
        original_text: "Hello".into(),
        translated_text: "హలో".into(),
    });
    wait_for("bot append", || {
        store
            .appended()
            .iter()
            .any(|d| d.author_id.is_bot() && d.text == "హలో")
    })
    .await;

    // Sign out drops the tail subscription; pushing into it fails.
    command_tx.send(SyncCommand::AuthResolved(None)).await.unwrap();
    wait_for("tail teardown", || {
        store
            .tail_sender()
            .map(|tx| tx.is_closed())
            .unwrap_or(true)
    })
    .await;
    assert!(view.borrow().messages.is_empty());

    command_tx.send(SyncCommand::Shutdown).await.unwrap();
    timeout(Duration::from_secs(2), loop_task)
        .await
        .expect("loop exit")
        .unwrap();
}

#[tokio::test]
async fn resubscribes_when_tail_stream_ends_mid_session() {
    let store = Arc::new(ScriptedStore::default());
    let (relay, _relay_command_rx) = RelayChannels::new(8);

    let config = SyncConfig {
        tail_retry_delay: Duration::from_millis(20),
        ..SyncConfig::default()
    };
    let sync = Synchronizer::new(store.clone(), relay.clone(), config);
    let view = sync.view();

    let (command_tx, command_rx) = mpsc::channel(8);
    let loop_task = tokio::spawn(sync.run(command_rx));

    command_tx.send(SyncCommand::AuthPending).await.unwrap();
    command_tx
        .send(SyncCommand::AuthResolved(Some(Identity {
            uid: UserId::new("alice"),
            avatar_url: "https://example.org/alice.png".to_owned(),
        })))
        .await
        .unwrap();
    wait_for("tail subscription", || store.subscribe_count() == 1).await;

    // A store-side fault ends the stream while still signed in; live
    // snapshots must come back through a fresh subscription.
    store.drop_tail_sender();
    wait_for("re-subscription", || store.subscribe_count() >= 2).await;

    let tail_tx = store.tail_sender().unwrap();
    tail_tx.send(vec![message(1, "back", "bob")]).await.unwrap();
    wait_for("snapshot applied", || !view.borrow().messages.is_empty()).await;
    assert_eq!(view.borrow().messages[0].text, "back");

    command_tx.send(SyncCommand::Shutdown).await.unwrap();
    timeout(Duration::from_secs(2), loop_task)
        .await
        .expect("loop exit")
        .unwrap();
}

#[tokio::test]
async fn interleaves_snapshots_and_relay_events_in_any_order() {
    let store = Arc::new(ScriptedStore::default());
    let (relay, _relay_command_rx) = RelayChannels::new(8);

    let sync = Synchronizer::new(store.clone(), relay.clone(), SyncConfig::default());
    let view = sync.view();

    let (command_tx, command_rx) = mpsc::channel(8);
    let loop_task = tokio::spawn(sync.run(command_rx));

    command_tx.send(SyncCommand::AuthPending).await.unwrap();
    command_tx
        .send(SyncCommand::AuthResolved(Some(Identity {
            uid: UserId::new("alice"),
            avatar_url: "https://example.org/alice.png".to_owned(),
        })))
        .await
        .unwrap();
    wait_for("tail subscription", || store.tail_sender().is_some()).await;

    // Relay result lands before any store snapshot; then a snapshot
    // arrives that does not yet contain the bot message. Neither
    // ordering may disturb the other's outcome.
    relay.emit(RelayEvent::TranslationResult {
        original_text: "Hello".into(),
        translated_text: "హలో".into(),
    });
    wait_for("bot append", || !store.appended().is_empty()).await;

    let tail_tx = store.tail_sender().unwrap();
    tail_tx
        .send(vec![message(1, "Hello", "alice")])
        .await
        .unwrap();
    wait_for("snapshot applied", || !view.borrow().messages.is_empty()).await;

    let current = view.borrow().clone();
    assert_eq!(current.messages[0].text, "Hello");
    let panel = current.translation.expect("translation panel");
    assert_eq!(panel.text, "హలో");

    command_tx.send(SyncCommand::Shutdown).await.unwrap();
    timeout(Duration::from_secs(2), loop_task)
        .await
        .expect("loop exit")
        .unwrap();
}
