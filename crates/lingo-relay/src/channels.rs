use tokio::sync::{broadcast, mpsc};

use lingo_types::{RelayCommand, RelayEvent};

/// Inbound event stream handed to consumers.
pub type EventStream = broadcast::Receiver<RelayEvent>;

/// Command/event channel pair between the synchronizer and the socket
/// supervisor.
///
/// Constructable without any socket, so tests drive the consumer side
/// by emitting events directly.
#[derive(Clone, Debug)]
pub struct RelayChannels {
    command_tx: mpsc::UnboundedSender<RelayCommand>,
    event_tx: broadcast::Sender<RelayEvent>,
}

impl RelayChannels {
    /// Create a channel pair and return it with the command receiver
    /// (owned by the socket supervisor, or by a test).
    pub fn new(event_buffer: usize) -> (Self, mpsc::UnboundedReceiver<RelayCommand>) {
        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let (event_tx, _) = broadcast::channel(event_buffer.max(1));

        (
            Self {
                command_tx,
                event_tx,
            },
            command_rx,
        )
    }

    /// Queue one command for the backend. Fire-and-forget: if the
    /// supervisor is gone the command is silently dropped, matching
    /// the no-delivery-guarantee contract.
    pub fn send(&self, command: RelayCommand) {
        let _ = self.command_tx.send(command);
    }

    /// Subscribe to inbound relay events.
    pub fn subscribe(&self) -> EventStream {
        self.event_tx.subscribe()
    }

    /// Emit an inbound event to all subscribers. Best-effort; lagged
    /// subscribers are handled by `broadcast`.
    pub fn emit(&self, event: RelayEvent) {
        let _ = self.event_tx.send(event);
    }
}
