//! Relay channel client.
//!
//! Duplex real-time channel to the translation backend. Outgoing user
//! messages go out as fire-and-forget events; translation results come
//! back whenever the backend finishes, possibly out of order and
//! possibly redelivered after a reconnect. The socket lifecycle
//! (including reconnects) is this crate's problem; consumers only see
//! the command/event channel pair.

pub mod backoff;
pub mod channels;
mod client;

pub use backoff::ReconnectPolicy;
pub use channels::RelayChannels;
pub use client::{RelayClient, RelayClientHandle, RelayConnectError};
