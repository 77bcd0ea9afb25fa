use futures_util::{SinkExt, StreamExt};
use thiserror::Error;
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tracing::{debug, info, warn};
use url::Url;

use lingo_types::{RelayCommand, RelayEvent};

use crate::backoff::ReconnectPolicy;
use crate::channels::RelayChannels;

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Errors surfaced while setting up the relay client.
#[derive(Debug, Error)]
pub enum RelayConnectError {
    #[error("invalid relay endpoint: {0}")]
    InvalidEndpoint(#[from] url::ParseError),
}

/// Handle on the running socket supervisor. Dropping it does not stop
/// the supervisor; call `shutdown`.
pub struct RelayClientHandle {
    task: JoinHandle<()>,
}

impl RelayClientHandle {
    pub fn shutdown(&self) {
        self.task.abort();
    }
}

/// WebSocket client for the translation relay.
pub struct RelayClient;

impl RelayClient {
    /// Validate the endpoint and spawn the socket supervisor. The
    /// returned channels survive reconnects; events received after a
    /// reconnect may include redeliveries of already-seen results.
    pub fn connect(
        endpoint: &str,
        policy: ReconnectPolicy,
    ) -> Result<(RelayChannels, RelayClientHandle), RelayConnectError> {
        let url = Url::parse(endpoint)?;

        let (channels, command_rx) = RelayChannels::new(64);
        let supervisor_channels = channels.clone();
        let task = tokio::spawn(supervise(url, policy, supervisor_channels, command_rx));

        Ok((channels, RelayClientHandle { task }))
    }
}

enum SocketExit {
    /// Transport loss; reconnect.
    Lost,
    /// Every command sender dropped; the client is done.
    CommandsClosed,
}

async fn supervise(
    url: Url,
    policy: ReconnectPolicy,
    channels: RelayChannels,
    mut command_rx: mpsc::UnboundedReceiver<RelayCommand>,
) {
    let mut attempt: u32 = 0;

    loop {
        match connect_async(url.as_str()).await {
            Ok((socket, _)) => {
                info!(endpoint = %url, "relay connected");
                attempt = 0;

                match run_socket(socket, &channels, &mut command_rx).await {
                    SocketExit::Lost => {
                        warn!(endpoint = %url, "relay connection lost, reconnecting");
                    }
                    SocketExit::CommandsClosed => {
                        info!("relay command channel closed, stopping supervisor");
                        return;
                    }
                }
            }
            Err(e) => {
                warn!(endpoint = %url, attempt, "relay connect failed: {e}");
            }
        }

        let delay = policy.delay_for_attempt(attempt);
        attempt = attempt.saturating_add(1);
        tokio::time::sleep(delay).await;
    }
}

async fn run_socket(
    socket: WsStream,
    channels: &RelayChannels,
    command_rx: &mut mpsc::UnboundedReceiver<RelayCommand>,
) -> SocketExit {
    let (mut write, mut read) = socket.split();

    loop {
        tokio::select! {
            command = command_rx.recv() => {
                let command = match command {
                    Some(command) => command,
                    None => return SocketExit::CommandsClosed,
                };

                let frame = match serde_json::to_string(&command) {
                    Ok(frame) => frame,
                    Err(e) => {
                        warn!("failed to encode relay command: {e}");
                        continue;
                    }
                };

                if write.send(Message::Text(frame.into())).await.is_err() {
                    return SocketExit::Lost;
                }
            }
            frame = read.next() => {
                let frame = match frame {
                    Some(Ok(frame)) => frame,
                    Some(Err(e)) => {
                        warn!("relay read failed: {e}");
                        return SocketExit::Lost;
                    }
                    None => return SocketExit::Lost,
                };

                match frame {
                    Message::Text(text) => match serde_json::from_str::<RelayEvent>(&text) {
                        Ok(event) => {
                            debug!(?event, "relay event received");
                            channels.emit(event);
                        }
                        Err(e) => {
                            // Unknown frames are skipped, not fatal.
                            warn!("undecodable relay frame: {e}");
                        }
                    },
                    Message::Close(_) => return SocketExit::Lost,
                    // Ping/pong handled by tungstenite; binary frames
                    // are not part of the relay protocol.
                    _ => {}
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn rejects_malformed_endpoint() {
        let err = RelayClient::connect("not a url", ReconnectPolicy::default())
            .map(|_| ())
            .expect_err("malformed endpoint must fail");
        assert!(matches!(err, RelayConnectError::InvalidEndpoint(_)));
    }

    #[tokio::test]
    async fn shutdown_stops_the_supervisor() {
        let (_channels, handle) =
            RelayClient::connect("ws://127.0.0.1:9", ReconnectPolicy::new(10, 20))
                .expect("connect should spawn");
        handle.shutdown();
    }
}
