//! Transport layer.
//!
//! A transport is anything that can open a message-oriented connection and
//! report its lifecycle as a sequence of [`TransportEvent`]s. The adapter
//! talks to it through a [`TransportHandle`]; the transport implementation
//! drives the other end of the same channel pair through a
//! [`TransportDriver`].
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────┐   TransportCommand    ┌──────────────────┐
//! │    Adapter       │ ────────────────────► │   Transport      │
//! │ (TransportHandle)│                       │ (TransportDriver)│
//! │                  │ ◄──────────────────── │                  │
//! └──────────────────┘    TransportEvent     └──────────────────┘
//! ```
//!
//! # Event Order
//!
//! A well-behaved transport emits `Open` at most once, any number of
//! `Message`s after it, and ends with `Error` and/or `Closed`. Emitting both
//! `Error` and `Closed` for the same connection is allowed.
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `websocket` | tokio-tungstenite client transport |

// ============================================================================
// Submodules
// ============================================================================

/// WebSocket client transport.
pub mod websocket;

// ============================================================================
// Imports
// ============================================================================

use tokio::sync::mpsc;
use tracing::trace;

use crate::config::ConnectionRequest;
use crate::error::{Error, Result};

// ============================================================================
// Re-exports
// ============================================================================

pub use websocket::WebSocketConnector;

// ============================================================================
// TransportEvent
// ============================================================================

/// Lifecycle notification from a transport.
#[derive(Debug)]
pub enum TransportEvent {
    /// Handshake completed; the connection accepts sends.
    Open,
    /// Text payload received.
    Message(String),
    /// Transport failure.
    Error(Error),
    /// Connection closed.
    Closed {
        /// `true` if the closing handshake completed.
        clean: bool,
        /// Close code, if one was received.
        code: Option<u16>,
        /// Close reason; empty if none was given.
        reason: String,
    },
}

// ============================================================================
// TransportCommand
// ============================================================================

/// Request from the adapter to a transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportCommand {
    /// Send one text frame.
    Send(String),
    /// Start the closing handshake.
    Close,
}

// ============================================================================
// Channel
// ============================================================================

/// Creates a connected handle/driver pair.
#[must_use]
pub fn channel() -> (TransportHandle, TransportDriver) {
    let (command_tx, command_rx) = mpsc::unbounded_channel();
    let (event_tx, event_rx) = mpsc::unbounded_channel();

    let handle = TransportHandle {
        control: TransportControl { tx: command_tx },
        events: event_rx,
    };
    let driver = TransportDriver {
        events: event_tx,
        commands: command_rx,
    };

    (handle, driver)
}

// ============================================================================
// TransportHandle
// ============================================================================

/// Adapter-side end of a transport connection.
#[derive(Debug)]
pub struct TransportHandle {
    control: TransportControl,
    events: mpsc::UnboundedReceiver<TransportEvent>,
}

impl TransportHandle {
    /// Returns a cloneable sender for commands.
    #[inline]
    #[must_use]
    pub fn control(&self) -> TransportControl {
        self.control.clone()
    }

    /// Waits for the next event.
    ///
    /// Returns `None` once the transport has dropped its driver.
    pub async fn next_event(&mut self) -> Option<TransportEvent> {
        self.events.recv().await
    }

    /// Splits the handle into its command and event halves.
    #[inline]
    #[must_use]
    pub fn into_parts(self) -> (TransportControl, mpsc::UnboundedReceiver<TransportEvent>) {
        (self.control, self.events)
    }
}

/// Cloneable command sender for one transport connection.
#[derive(Debug, Clone)]
pub struct TransportControl {
    tx: mpsc::UnboundedSender<TransportCommand>,
}

impl TransportControl {
    /// Queues a text frame for sending.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ConnectionClosed`] if the transport is gone.
    pub fn send(&self, text: String) -> Result<()> {
        self.tx
            .send(TransportCommand::Send(text))
            .map_err(|_| Error::ConnectionClosed)
    }

    /// Requests the transport to close. Best-effort.
    pub fn close(&self) {
        let _ = self.tx.send(TransportCommand::Close);
    }

    /// Returns `true` if the transport has gone away.
    #[inline]
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

// ============================================================================
// TransportDriver
// ============================================================================

/// Transport-side end of a connection.
///
/// Emitting returns `false` once the adapter has released its handle.
#[derive(Debug)]
pub struct TransportDriver {
    events: mpsc::UnboundedSender<TransportEvent>,
    commands: mpsc::UnboundedReceiver<TransportCommand>,
}

impl TransportDriver {
    /// Emits an event.
    pub fn emit(&self, event: TransportEvent) -> bool {
        trace!(?event, "Transport event");
        self.events.send(event).is_ok()
    }

    /// Emits [`TransportEvent::Open`].
    #[inline]
    pub fn open(&self) -> bool {
        self.emit(TransportEvent::Open)
    }

    /// Emits [`TransportEvent::Message`].
    #[inline]
    pub fn message(&self, text: impl Into<String>) -> bool {
        self.emit(TransportEvent::Message(text.into()))
    }

    /// Emits [`TransportEvent::Error`].
    #[inline]
    pub fn error(&self, error: Error) -> bool {
        self.emit(TransportEvent::Error(error))
    }

    /// Emits [`TransportEvent::Closed`].
    #[inline]
    pub fn closed(&self, clean: bool, code: Option<u16>, reason: impl Into<String>) -> bool {
        self.emit(TransportEvent::Closed {
            clean,
            code,
            reason: reason.into(),
        })
    }

    /// Waits for the next command.
    ///
    /// Returns `None` once every [`TransportControl`] has been dropped.
    pub async fn next_command(&mut self) -> Option<TransportCommand> {
        self.commands.recv().await
    }

    /// Returns `true` if the adapter no longer listens for events.
    #[inline]
    #[must_use]
    pub fn is_abandoned(&self) -> bool {
        self.events.is_closed()
    }
}

// ============================================================================
// Connector
// ============================================================================

/// Opens transport connections.
///
/// `connect` must return immediately; the handshake and all further I/O
/// happen in the background and are reported through events.
pub trait Connector: Send + Sync + 'static {
    /// Starts connecting according to `request`.
    fn connect(&self, request: &ConnectionRequest) -> TransportHandle;
}

// ============================================================================
// Tests
// ============================================================================
