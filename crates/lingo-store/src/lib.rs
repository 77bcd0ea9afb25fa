//! Ordered message store client.
//!
//! The store is the authoritative, append-only, server-ordered message
//! log. This crate defines the boundary contract (`MessageStore`) and a
//! sqlite-backed implementation with live bounded-tail snapshots.

pub mod error;
pub mod migrations;
pub mod models;
mod sqlite;

pub use error::StoreWriteError;
pub use sqlite::SqliteStore;

use async_trait::async_trait;
use tokio::sync::mpsc;

use lingo_types::{Message, MessageDraft, MessageId};

/// Boundary contract of the durable ordered message log.
///
/// Implementations assign `id`, `seq`, and the server timestamp on
/// append. A successful append is not guaranteed to be visible in the
/// very next tail snapshot; propagation latency is permitted.
#[async_trait]
pub trait MessageStore: Send + Sync {
    /// Append one message. The store stamps the server timestamp and
    /// insertion order.
    async fn append(&self, draft: MessageDraft) -> Result<MessageId, StoreWriteError>;

    /// Subscribe to the live bounded tail: every underlying change
    /// produces the full current ordered set of the most recent
    /// `limit` messages, ascending by `created_at` (ties broken by
    /// insertion order). An initial snapshot is delivered up front.
    ///
    /// Dropping the subscription releases all resources held for it.
    fn subscribe_tail(&self, limit: usize) -> TailSubscription;
}

/// Live stream of full tail snapshots. Drop to unsubscribe.
pub struct TailSubscription {
    rx: mpsc::Receiver<Vec<Message>>,
}

impl TailSubscription {
    /// Wrap a snapshot receiver. Store implementations (and test
    /// fakes) push full ordered snapshots into the sending half.
    pub fn new(rx: mpsc::Receiver<Vec<Message>>) -> Self {
        Self { rx }
    }

    /// Next snapshot, or `None` once the store side has gone away.
    pub async fn next_snapshot(&mut self) -> Option<Vec<Message>> {
        self.rx.recv().await
    }
}
