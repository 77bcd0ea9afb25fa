use serde::{Deserialize, Serialize};

/// Commands sent FROM the client TO the translation relay.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum RelayCommand {
    /// Ask the backend to translate one user message.
    /// Fire-and-forget; no delivery acknowledgment exists at this layer.
    OutgoingMessage { message: String },
}

/// Events received FROM the translation relay.
///
/// Delivery order across in-flight translations is not guaranteed, and
/// a reconnect may redeliver events that were already seen. Consumers
/// must tolerate both.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum RelayEvent {
    /// One translation finished.
    TranslationResult {
        original_text: String,
        translated_text: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializes_outgoing_message_envelope() {
        let cmd = RelayCommand::OutgoingMessage {
            message: "Hello".into(),
        };
        let json = serde_json::to_value(&cmd).expect("serialize");
        assert_eq!(
            json,
            serde_json::json!({
                "type": "outgoing_message",
                "data": { "message": "Hello" }
            })
        );
    }

    #[test]
    fn parses_translation_result_envelope() {
        let raw = r#"{"type":"translation_result","data":{"original_text":"Hello","translated_text":"హలో"}}"#;
        let event: RelayEvent = serde_json::from_str(raw).expect("parse");
        assert_eq!(
            event,
            RelayEvent::TranslationResult {
                original_text: "Hello".into(),
                translated_text: "హలో".into(),
            }
        );
    }
}
