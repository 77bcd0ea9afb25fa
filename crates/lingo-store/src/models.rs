//! Database row types — these map directly to sqlite rows.
//! Distinct from the lingo-types model to keep the store layer
//! independent of how timestamps are parsed.

use chrono::DateTime;
use tracing::warn;
use uuid::Uuid;

use lingo_types::{Message, MessageId, UserId};

pub struct MessageRow {
    pub seq: i64,
    pub id: String,
    pub author_id: String,
    pub avatar_url: String,
    pub text: String,
    pub created_at: String,
}

impl MessageRow {
    pub fn into_message(self) -> Message {
        let id = self.id.parse::<Uuid>().unwrap_or_else(|e| {
            warn!("Corrupt message id '{}': {}", self.id, e);
            Uuid::default()
        });

        let created_at = match DateTime::parse_from_rfc3339(&self.created_at) {
            Ok(ts) => Some(ts.to_utc()),
            Err(e) => {
                warn!(
                    "Corrupt created_at '{}' on message '{}': {}",
                    self.created_at, self.id, e
                );
                None
            }
        };

        Message {
            id: MessageId(id),
            seq: self.seq,
            text: self.text,
            author_id: UserId::new(self.author_id),
            avatar_url: self.avatar_url,
            created_at,
        }
    }
}
