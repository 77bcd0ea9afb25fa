use lingo_types::Message;

/// Heading shown over the latest-translation panel while translation
/// display is enabled.
pub const HEADING_TRANSLATED: &str = "Translated Text (Telugu)";
/// Heading shown while translation display is disabled.
pub const HEADING_ORIGINAL: &str = "Original Text";

/// The single de-duplicated, time-ordered view handed to presentation.
#[derive(Debug, Clone, PartialEq)]
pub struct ConversationView {
    /// Ascending by `created_at`, ties broken by insertion order.
    pub messages: Vec<Message>,
    pub translation_enabled: bool,
    /// Most recent relay result, if any arrived this session.
    pub translation: Option<TranslationPanel>,
}

impl Default for ConversationView {
    fn default() -> Self {
        Self {
            messages: Vec::new(),
            // Translation display starts enabled.
            translation_enabled: true,
            translation: None,
        }
    }
}

/// Latest translation display value. The text is frozen at the moment
/// the relay event was handled; the heading tracks the live toggle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranslationPanel {
    pub heading: &'static str,
    pub text: String,
}

impl TranslationPanel {
    pub fn new(translation_enabled: bool, text: String) -> Self {
        Self {
            heading: if translation_enabled {
                HEADING_TRANSLATED
            } else {
                HEADING_ORIGINAL
            },
            text,
        }
    }
}

/// Sort a snapshot into display order: ascending `created_at`, with
/// unacknowledged writes (no timestamp yet) after everything stamped,
/// ties broken by store insertion order. Then cap to the newest
/// `limit` entries.
pub fn order_snapshot(mut messages: Vec<Message>, limit: usize) -> Vec<Message> {
    messages.sort_by_key(|m| (m.created_at.is_none(), m.created_at, m.seq));

    if messages.len() > limit {
        let excess = messages.len() - limit;
        messages.drain(0..excess);
    }
    messages
}
