//! Connection configuration.
//!
//! # Components
//!
//! | Type | Description |
//! |------|-------------|
//! | [`ConnectionRequest`] | Immutable description of the connection to open |
//! | [`ConnectionRequestBuilder`] | Fluent, validating builder |
//! | [`RequestOptions`] | Handshake options (timeout, nodelay) |
//!
//! The tungstenite [`WebSocketConfig`](tokio_tungstenite::tungstenite::protocol::WebSocketConfig)
//! is carried as the client configuration and handed to the handshake as is.

// ============================================================================
// Submodules
// ============================================================================

/// Fluent builder pattern for connection requests.
pub mod builder;

/// Handshake options.
pub mod options;

/// The validated connection request.
pub mod request;

// ============================================================================
// Re-exports
// ============================================================================

pub use builder::ConnectionRequestBuilder;
pub use options::{DEFAULT_CONNECT_TIMEOUT, RequestOptions};
pub use request::ConnectionRequest;
