//! rx-websocket - WebSocket connections as streams.
//!
//! This library adapts a bidirectional real-time connection into two
//! observable outputs: a connection-status counter and a cold stream of
//! inbound messages, while forwarding an outbound message source to the
//! connection as items arrive.
//!
//! # Architecture
//!
//! ```text
//!                  ┌────────────────────────────────────┐
//!  OutboundSource ─►            Subscription            │
//!                  │  (one per Messages::subscribe)     │
//!                  │                                    │
//!                  │  TransportHandle ◄──► Transport ───┼──► network
//!                  │        │                           │
//!                  └────────┼───────────────────────────┘
//!                           ▼
//!         ConnectionStatus (shared)   Stream<Item = Result<I>>
//! ```
//!
//! Key design principles:
//!
//! - Nothing connects until a message stream is subscribed
//! - Each subscription owns its own transport connection
//! - The status counter is shared by all subscriptions of one adapter
//! - Outbound items are forwarded only while the transport is open
//! - No reconnection, no buffering, no retries
//!
//! # Quick Start
//!
//! ```no_run
//! use futures_util::StreamExt;
//! use rx_websocket::{Connection, ConnectionRequest, Result, connect};
//! use tokio::sync::broadcast;
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let request = ConnectionRequest::builder("wss://example.com/socket")
//!         .protocol("json.v1")
//!         .build()?;
//!
//!     let (outbound, _) = broadcast::channel::<serde_json::Value>(64);
//!     let connection: Connection = connect(request, outbound.clone());
//!
//!     let mut messages = connection.messages.subscribe();
//!     while let Some(message) = messages.next().await {
//!         println!("received {}", message?);
//!     }
//!
//!     Ok(())
//! }
//! ```
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`adapter`] | [`connect`], [`Connection`], [`Messages`], [`Subscription`] |
//! | [`config`] | [`ConnectionRequest`] and its builder |
//! | [`status`] | [`ConnectionStatus`] counter |
//! | [`codec`] | JSON text encoding |
//! | [`transport`] | Transport contract and WebSocket implementation |
//! | [`error`] | Error types and [`Result`] alias |
//! | [`identifiers`] | Type-safe ID wrappers |

// ============================================================================
// Modules
// ============================================================================

/// Connection adapter: status counter plus cold message stream.
pub mod adapter;

/// JSON text encoding of messages.
pub mod codec;

/// Connection request configuration.
///
/// Use [`ConnectionRequest::builder()`] to describe a connection.
pub mod config;

/// Error types and result aliases.
pub mod error;

/// Type-safe identifiers.
pub mod identifiers;

/// Shared open-connection counter.
pub mod status;

/// Transport contract and WebSocket implementation.
pub mod transport;

// ============================================================================
// Re-exports
// ============================================================================

// Adapter types
pub use adapter::{
    Connection, Messages, OutboundSource, Subscription, connect, connect_with, outbound,
};

// Configuration types
pub use config::{ConnectionRequest, ConnectionRequestBuilder, RequestOptions};

// Error types
pub use error::{Error, Result};

// Identifier types
pub use identifiers::SubscriptionId;

// Status types
pub use status::ConnectionStatus;

// Transport types
pub use transport::{
    Connector, TransportCommand, TransportDriver, TransportEvent, TransportHandle,
    WebSocketConnector,
};
