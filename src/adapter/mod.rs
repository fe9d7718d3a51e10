//! Connection adapter.
//!
//! Turns a transport connection into two observable outputs:
//!
//! - [`ConnectionStatus`]: how many of this adapter's transports are open
//! - [`Messages`]: a cold stream of decoded inbound messages
//!
//! and forwards an [`OutboundSource`] to each transport once it opens.
//!
//! # Example
//!
//! ```no_run
//! use futures_util::StreamExt;
//! use rx_websocket::{Connection, ConnectionRequest, Result, connect};
//! use serde_json::json;
//! use tokio::sync::broadcast;
//!
//! # async fn example() -> Result<()> {
//! let request = ConnectionRequest::new("ws://127.0.0.1:9001/feed")?;
//! let (outbound, _) = broadcast::channel(64);
//!
//! let connection: Connection = connect(request, outbound.clone());
//! let mut status = connection.connection_status.stream();
//! let mut messages = connection.messages.subscribe();
//!
//! assert_eq!(status.next().await, Some(0));
//! assert_eq!(status.next().await, Some(1));
//! outbound.send(json!({"type": "subscribe"})).ok();
//!
//! while let Some(message) = messages.next().await {
//!     println!("{}", message?);
//! }
//! # Ok(())
//! # }
//! ```

// ============================================================================
// Submodules
// ============================================================================

/// Cold inbound stream and its subscriptions.
pub mod messages;

/// Outbound message sources.
pub mod outbound;

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;

use serde_json::Value;

use crate::config::ConnectionRequest;
use crate::status::ConnectionStatus;
use crate::transport::{Connector, WebSocketConnector};

// ============================================================================
// Re-exports
// ============================================================================

pub use messages::{Messages, Subscription};
pub use outbound::OutboundSource;

// ============================================================================
// Connection
// ============================================================================

/// Outputs of [`connect`].
///
/// `I` is the inbound message type; any [`serde::de::DeserializeOwned`]
/// type works, [`Value`] by default.
#[derive(Debug)]
pub struct Connection<I = Value> {
    /// Open-connection counter shared by every subscription to `messages`.
    pub connection_status: ConnectionStatus,
    /// Cold inbound message stream.
    pub messages: Messages<I>,
}

impl<I> Clone for Connection<I> {
    fn clone(&self) -> Self {
        Self {
            connection_status: self.connection_status.clone(),
            messages: self.messages.clone(),
        }
    }
}

// ============================================================================
// Entry Points
// ============================================================================

/// Adapts a WebSocket at `request`'s address.
///
/// No I/O happens until [`Messages::subscribe`] is called.
#[must_use]
pub fn connect<I, O>(request: ConnectionRequest, outbound: O) -> Connection<I>
where
    O: OutboundSource,
{
    connect_with(WebSocketConnector::new(), request, outbound)
}

/// Adapts a connection opened by `connector`.
#[must_use]
pub fn connect_with<I, O, C>(connector: C, request: ConnectionRequest, outbound: O) -> Connection<I>
where
    O: OutboundSource,
    C: Connector,
{
    let connection_status = ConnectionStatus::new();
    let messages = Messages::new(
        request,
        Arc::new(connector),
        Arc::new(outbound),
        connection_status.clone(),
    );

    Connection {
        connection_status,
        messages,
    }
}
