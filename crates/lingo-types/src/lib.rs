pub mod events;
pub mod models;

pub use events::{RelayCommand, RelayEvent};
pub use models::{BOT_AVATAR_URL, Identity, Message, MessageDraft, MessageId, UserId};
