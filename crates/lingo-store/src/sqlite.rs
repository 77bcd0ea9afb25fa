use std::path::Path;
use std::sync::{Arc, Mutex};

use chrono::{SecondsFormat, Utc};
use rusqlite::Connection;
use tokio::sync::{mpsc, watch};
use tracing::{debug, info, warn};
use uuid::Uuid;

use lingo_types::{Message, MessageDraft, MessageId};

use crate::models::MessageRow;
use crate::{MessageStore, StoreWriteError, TailSubscription, migrations};

/// Sqlite-backed message store.
///
/// A single connection behind a mutex, blocking work moved off the
/// runtime with `spawn_blocking`. Every committed append bumps a watch
/// revision; tail subscriptions re-query on each bump and push the
/// full snapshot to their subscriber.
#[derive(Clone)]
pub struct SqliteStore {
    inner: Arc<StoreInner>,
}

struct StoreInner {
    conn: Mutex<Connection>,
    revision: watch::Sender<u64>,
}

impl SqliteStore {
    pub fn open(path: &Path) -> Result<Self, StoreWriteError> {
        let conn = Connection::open(path)?;

        // WAL mode for concurrent readers
        conn.pragma_update(None, "journal_mode", "WAL")?;

        migrations::run(&conn)?;

        info!("Message store opened at {}", path.display());
        Ok(Self::from_connection(conn))
    }

    /// In-memory store, used by tests and the demo shell's scratch mode.
    pub fn open_in_memory() -> Result<Self, StoreWriteError> {
        let conn = Connection::open_in_memory()?;
        migrations::run(&conn)?;
        Ok(Self::from_connection(conn))
    }

    fn from_connection(conn: Connection) -> Self {
        let (revision, _) = watch::channel(0u64);
        Self {
            inner: Arc::new(StoreInner {
                conn: Mutex::new(conn),
                revision,
            }),
        }
    }

    pub fn with_conn<F, T>(&self, f: F) -> Result<T, StoreWriteError>
    where
        F: FnOnce(&Connection) -> Result<T, rusqlite::Error>,
    {
        self.inner.with_conn(f)
    }

    /// Signal tail subscriptions that the log changed. Called after
    /// every committed append; public so out-of-band writers (for
    /// example `with_conn` maintenance) can wake subscribers too.
    pub fn notify_changed(&self) {
        self.inner.notify_changed();
    }
}

impl StoreInner {
    fn with_conn<F, T>(&self, f: F) -> Result<T, StoreWriteError>
    where
        F: FnOnce(&Connection) -> Result<T, rusqlite::Error>,
    {
        let conn = self
            .conn
            .lock()
            .map_err(|e| StoreWriteError::Transport(format!("store lock poisoned: {e}")))?;
        f(&conn).map_err(StoreWriteError::from)
    }

    fn notify_changed(&self) {
        self.revision.send_modify(|rev| *rev += 1);
    }

    fn insert(&self, draft: &MessageDraft) -> Result<MessageId, StoreWriteError> {
        let id = Uuid::new_v4();
        let created_at = Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true);

        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO messages (id, author_id, avatar_url, text, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                rusqlite::params![
                    id.to_string(),
                    draft.author_id.as_str(),
                    draft.avatar_url,
                    draft.text,
                    created_at,
                ],
            )?;
            Ok(())
        })?;

        Ok(MessageId(id))
    }

    fn tail(&self, limit: usize) -> Result<Vec<Message>, StoreWriteError> {
        self.with_conn(|conn| query_tail(conn, limit))
    }
}

#[async_trait::async_trait]
impl MessageStore for SqliteStore {
    async fn append(&self, draft: MessageDraft) -> Result<MessageId, StoreWriteError> {
        if draft.text.is_empty() {
            return Err(StoreWriteError::Rejected("empty message text".into()));
        }

        // Run the blocking insert off the async runtime
        let inner = self.inner.clone();
        let id = tokio::task::spawn_blocking(move || inner.insert(&draft))
            .await
            .map_err(|e| StoreWriteError::Transport(format!("store task failed: {e}")))??;

        self.inner.notify_changed();
        debug!(message_id = %id, "message appended");
        Ok(id)
    }

    fn subscribe_tail(&self, limit: usize) -> TailSubscription {
        let (tx, rx) = mpsc::channel(8);
        let inner = self.inner.clone();

        tokio::spawn(async move {
            let mut revisions = inner.revision.subscribe();
            loop {
                // Mark the current revision seen before querying, so a
                // write racing the query shows up as a fresh change.
                revisions.borrow_and_update();

                let snapshot_inner = inner.clone();
                let snapshot = match tokio::task::spawn_blocking(move || {
                    snapshot_inner.tail(limit)
                })
                .await
                {
                    Ok(Ok(snapshot)) => snapshot,
                    Ok(Err(e)) => {
                        warn!("tail query failed, ending subscription: {e}");
                        break;
                    }
                    Err(e) => {
                        warn!("tail task failed, ending subscription: {e}");
                        break;
                    }
                };

                // Subscriber dropped
                if tx.send(snapshot).await.is_err() {
                    break;
                }

                // Park until the next write, but wake when the
                // subscriber goes away so the task does not outlive it.
                tokio::select! {
                    changed = revisions.changed() => {
                        if changed.is_err() {
                            break;
                        }
                    }
                    _ = tx.closed() => break,
                }
            }
        });

        TailSubscription::new(rx)
    }
}

fn query_tail(conn: &Connection, limit: usize) -> Result<Vec<Message>, rusqlite::Error> {
    let mut stmt = conn.prepare(
        "SELECT seq, id, author_id, avatar_url, text, created_at
         FROM messages
         ORDER BY created_at DESC, seq DESC
         LIMIT ?1",
    )?;

    let mut rows = stmt
        .query_map([limit as i64], |row| {
            Ok(MessageRow {
                seq: row.get(0)?,
                id: row.get(1)?,
                author_id: row.get(2)?,
                avatar_url: row.get(3)?,
                text: row.get(4)?,
                created_at: row.get(5)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;

    // The query walks newest-first to honor the cap; flip to the
    // ascending display order.
    rows.reverse();
    Ok(rows.into_iter().map(MessageRow::into_message).collect())
}
