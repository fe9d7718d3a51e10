//! Handshake-level connection options.
//!
//! # Example
//!
//! ```ignore
//! use std::time::Duration;
//! use rx_websocket::RequestOptions;
//!
//! let options = RequestOptions::new()
//!     .with_connect_timeout(Duration::from_secs(5))
//!     .with_nodelay();
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::time::Duration;

// ============================================================================
// Constants
// ============================================================================

/// Default timeout for the opening handshake.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

// ============================================================================
// RequestOptions
// ============================================================================

/// Options applied while establishing the transport connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestOptions {
    /// Maximum time for TCP connect plus WebSocket handshake.
    ///
    /// `None` waits indefinitely.
    pub connect_timeout: Option<Duration>,

    /// Set `TCP_NODELAY` on the underlying socket.
    pub disable_nagle: bool,
}

impl Default for RequestOptions {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Constructors
// ============================================================================

impl RequestOptions {
    /// Creates options with default settings.
    #[inline]
    #[must_use]
    pub const fn new() -> Self {
        Self {
            connect_timeout: Some(DEFAULT_CONNECT_TIMEOUT),
            disable_nagle: false,
        }
    }
}

// ============================================================================
// Builder Methods
// ============================================================================

impl RequestOptions {
    /// Sets the handshake timeout.
    #[inline]
    #[must_use]
    pub const fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = Some(timeout);
        self
    }

    /// Removes the handshake timeout.
    #[inline]
    #[must_use]
    pub const fn without_connect_timeout(mut self) -> Self {
        self.connect_timeout = None;
        self
    }

    /// Disables Nagle's algorithm on the socket.
    #[inline]
    #[must_use]
    pub const fn with_nodelay(mut self) -> Self {
        self.disable_nagle = true;
        self
    }

    /// Validates the options.
    ///
    /// # Errors
    ///
    /// Returns an error message if the timeout is zero.
    pub fn validate(&self) -> Result<(), String> {
        if let Some(timeout) = self.connect_timeout
            && timeout.is_zero()
        {
            return Err("Connect timeout must be greater than zero".to_string());
        }
        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_creates_default() {
        let options = RequestOptions::new();
        assert_eq!(options.connect_timeout, Some(DEFAULT_CONNECT_TIMEOUT));
        assert!(!options.disable_nagle);
        assert_eq!(options, RequestOptions::default());
    }

    #[test]
    fn test_builder_chain() {
        let options = RequestOptions::new()
            .with_connect_timeout(Duration::from_millis(250))
            .with_nodelay();

        assert_eq!(options.connect_timeout, Some(Duration::from_millis(250)));
        assert!(options.disable_nagle);
    }

    #[test]
    fn test_without_connect_timeout() {
        let options = RequestOptions::new().without_connect_timeout();
        assert!(options.connect_timeout.is_none());
        assert!(options.validate().is_ok());
    }

    #[test]
    fn test_validate_zero_timeout() {
        let options = RequestOptions::new().with_connect_timeout(Duration::ZERO);
        assert!(options.validate().is_err());
    }
}
