use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Avatar shown next to every bot-authored message.
pub const BOT_AVATAR_URL: &str =
    "https://static.vecteezy.com/system/resources/previews/014/194/216/non_2x/avatar-icon-human-a-person-s-badge-social-media-profile-symbol-the-symbol-of-a-person-vector.jpg";

/// Store-assigned message identifier. Never minted by a client before
/// the store acknowledges the write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MessageId(pub Uuid);

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Posting identity. The reserved `"bot"` value marks messages written
/// on behalf of the translation relay.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UserId(pub String);

impl UserId {
    pub fn new(uid: impl Into<String>) -> Self {
        Self(uid.into())
    }

    /// The synthetic translation-bot author.
    pub fn bot() -> Self {
        Self("bot".to_owned())
    }

    pub fn is_bot(&self) -> bool {
        self.0 == "bot"
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A message in the shared room. Immutable once the store has stamped it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: MessageId,
    /// Store-assigned insertion order; tie-break for equal timestamps.
    pub seq: i64,
    pub text: String,
    pub author_id: UserId,
    pub avatar_url: String,
    /// Server-assigned. `None` only for writes the store has not
    /// acknowledged yet.
    pub created_at: Option<DateTime<Utc>>,
}

/// What a caller hands to the store. `id`, `seq`, and `created_at`
/// are assigned server-side on append.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageDraft {
    pub text: String,
    pub author_id: UserId,
    pub avatar_url: String,
}

impl MessageDraft {
    /// Draft authored by the translation bot, fixed avatar.
    pub fn bot(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            author_id: UserId::bot(),
            avatar_url: BOT_AVATAR_URL.to_owned(),
        }
    }
}

/// Read-only capability handed over by the external auth collaborator
/// while a user is signed in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub uid: UserId,
    pub avatar_url: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recognizes_bot_sentinel() {
        assert!(UserId::bot().is_bot());
        assert!(!UserId::new("alice").is_bot());
    }

    #[test]
    fn bot_draft_uses_fixed_avatar() {
        let draft = MessageDraft::bot("హలో");
        assert_eq!(draft.author_id, UserId::bot());
        assert_eq!(draft.avatar_url, BOT_AVATAR_URL);
        assert_eq!(draft.text, "హలో");
    }
}
