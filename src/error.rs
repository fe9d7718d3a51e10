//! Error types for the WebSocket adapter.
//!
//! This module defines all error types used throughout the crate.
//!
//! # Usage
//!
//! Failures reach consumers in two ways: builder validation returns
//! [`Result<T>`] directly, and transport-level failures arrive as the
//! terminal item of a [`Subscription`](crate::Subscription):
//!
//! ```ignore
//! use futures_util::StreamExt;
//! use rx_websocket::{Error, Result};
//!
//! async fn drain(mut messages: rx_websocket::Subscription) -> Result<()> {
//!     while let Some(item) = messages.next().await {
//!         let value = item?;
//!         println!("{value}");
//!     }
//!     Ok(())
//! }
//! ```
//!
//! # Error Categories
//!
//! | Category | Variants |
//! |----------|----------|
//! | Configuration | [`Error::Config`], [`Error::InvalidArgument`] |
//! | Connection | [`Error::Connection`], [`Error::ConnectionTimeout`], [`Error::ConnectionClosed`], [`Error::UncleanClose`] |
//! | Codec | [`Error::Serialization`], [`Error::Deserialization`] |
//! | External | [`Error::WebSocket`] |

// ============================================================================
// Imports
// ============================================================================

use std::result::Result as StdResult;

use thiserror::Error;
use tokio_tungstenite::tungstenite::Error as WsError;

// ============================================================================
// Result Alias
// ============================================================================

/// Result type alias using crate [`enum@Error`].
pub type Result<T> = StdResult<T, Error>;

// ============================================================================
// Error Enum
// ============================================================================

/// Main error type for the crate.
#[derive(Error, Debug)]
pub enum Error {
    // ========================================================================
    // Configuration Errors
    // ========================================================================
    /// Configuration error.
    ///
    /// Returned when the connection request is invalid, e.g. the address
    /// is not a `ws://` or `wss://` URL.
    #[error("Configuration error: {message}")]
    Config {
        /// Description of the configuration error.
        message: String,
    },

    /// Invalid argument passed to the request builder.
    #[error("Invalid argument: {message}")]
    InvalidArgument {
        /// Description of the invalid argument.
        message: String,
    },

    // ========================================================================
    // Connection Errors
    // ========================================================================
    /// WebSocket connection failed.
    ///
    /// Returned when the handshake cannot be completed.
    #[error("Connection failed: {message}")]
    Connection {
        /// Description of the connection error.
        message: String,
    },

    /// Handshake did not complete within the configured timeout.
    #[error("Connection timeout after {timeout_ms}ms")]
    ConnectionTimeout {
        /// Milliseconds waited before timeout.
        timeout_ms: u64,
    },

    /// Transport went away without reporting a close.
    #[error("Connection closed")]
    ConnectionClosed,

    /// Transport closed without a clean closing handshake.
    #[error("Connection closed uncleanly: {reason}")]
    UncleanClose {
        /// Close code, if the peer sent one.
        code: Option<u16>,
        /// Close reason reported by the transport.
        reason: String,
    },

    // ========================================================================
    // Codec Errors
    // ========================================================================
    /// Outbound item could not be encoded as JSON text.
    #[error("Failed to encode outbound message: {0}")]
    Serialization(#[source] serde_json::Error),

    /// Inbound frame is not valid JSON for the expected type.
    #[error("Failed to decode inbound message: {0}")]
    Deserialization(#[source] serde_json::Error),

    // ========================================================================
    // External Errors
    // ========================================================================
    /// WebSocket error.
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] WsError),
}

// ============================================================================
// Error Constructors
// ============================================================================

impl Error {
    /// Creates a configuration error.
    #[inline]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Creates an invalid argument error.
    #[inline]
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            message: message.into(),
        }
    }

    /// Creates a connection error.
    #[inline]
    pub fn connection(message: impl Into<String>) -> Self {
        Self::Connection {
            message: message.into(),
        }
    }

    /// Creates a connection timeout error.
    #[inline]
    pub fn connection_timeout(timeout_ms: u64) -> Self {
        Self::ConnectionTimeout { timeout_ms }
    }

    /// Creates an unclean close error.
    #[inline]
    pub fn unclean_close(code: Option<u16>, reason: impl Into<String>) -> Self {
        Self::UncleanClose {
            code,
            reason: reason.into(),
        }
    }

    /// Creates a serialization error.
    #[inline]
    pub fn serialization(err: serde_json::Error) -> Self {
        Self::Serialization(err)
    }

    /// Creates a deserialization error.
    #[inline]
    pub fn deserialization(err: serde_json::Error) -> Self {
        Self::Deserialization(err)
    }
}

// ============================================================================
// Error Predicates
// ============================================================================

impl Error {
    /// Returns `true` if this is a connection-level error.
    #[inline]
    #[must_use]
    pub fn is_connection_error(&self) -> bool {
        matches!(
            self,
            Self::Connection { .. }
                | Self::ConnectionTimeout { .. }
                | Self::ConnectionClosed
                | Self::UncleanClose { .. }
                | Self::WebSocket(_)
        )
    }

    /// Returns `true` if this is an encode or decode error.
    #[inline]
    #[must_use]
    pub fn is_codec_error(&self) -> bool {
        matches!(self, Self::Serialization(_) | Self::Deserialization(_))
    }

    /// Returns `true` if this error ends a message stream.
    ///
    /// Everything except builder validation does.
    #[inline]
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Config { .. } | Self::InvalidArgument { .. })
    }
}

// ============================================================================
// Tests
// ============================================================================
