use thiserror::Error;

/// Failure appending to the message store.
///
/// User-initiated writes surface this to the interaction layer so the
/// input can be kept for retry; bot-originated writes log and swallow
/// it. Nothing here is fatal.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreWriteError {
    /// The store refused the write (validation or permission).
    #[error("store rejected the write: {0}")]
    Rejected(String),

    /// Transient transport or engine failure; retrying may succeed.
    #[error("store transport failure: {0}")]
    Transport(String),
}

impl From<rusqlite::Error> for StoreWriteError {
    fn from(err: rusqlite::Error) -> Self {
        Self::Transport(err.to_string())
    }
}
