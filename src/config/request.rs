//! Immutable description of a connection to open.

// ============================================================================
// Imports
// ============================================================================

use rustc_hash::FxHashMap;
use tokio_tungstenite::tungstenite::protocol::WebSocketConfig;
use url::Url;

use super::builder::ConnectionRequestBuilder;
use super::options::RequestOptions;

// ============================================================================
// ConnectionRequest
// ============================================================================

/// Everything a transport needs to open one connection.
///
/// Built and validated by [`ConnectionRequestBuilder`]. Once built it is
/// never mutated; every subscription connects with the same request.
#[derive(Debug, Clone)]
pub struct ConnectionRequest {
    pub(crate) address: Url,
    pub(crate) protocols: Vec<String>,
    pub(crate) origin: Option<String>,
    pub(crate) headers: FxHashMap<String, String>,
    pub(crate) request_options: RequestOptions,
    pub(crate) client_config: Option<WebSocketConfig>,
}

impl ConnectionRequest {
    /// Creates a builder for the given `ws://` or `wss://` address.
    #[inline]
    #[must_use]
    pub fn builder(address: impl Into<String>) -> ConnectionRequestBuilder {
        ConnectionRequestBuilder::new(address)
    }

    /// Creates a request with default options.
    ///
    /// # Errors
    ///
    /// - [`Error::Config`](crate::Error::Config) if the address is not a WebSocket URL
    pub fn new(address: impl Into<String>) -> crate::Result<Self> {
        Self::builder(address).build()
    }

    /// Returns the target address.
    #[inline]
    #[must_use]
    pub fn address(&self) -> &Url {
        &self.address
    }

    /// Returns the requested subprotocols, in preference order.
    #[inline]
    #[must_use]
    pub fn protocols(&self) -> &[String] {
        &self.protocols
    }

    /// Returns the `Origin` header value, if set.
    #[inline]
    #[must_use]
    pub fn origin(&self) -> Option<&str> {
        self.origin.as_deref()
    }

    /// Returns the extra handshake headers.
    #[inline]
    #[must_use]
    pub fn headers(&self) -> &FxHashMap<String, String> {
        &self.headers
    }

    /// Returns the handshake options.
    #[inline]
    #[must_use]
    pub const fn request_options(&self) -> &RequestOptions {
        &self.request_options
    }

    /// Returns the WebSocket client configuration, if set.
    #[inline]
    #[must_use]
    pub const fn client_config(&self) -> Option<&WebSocketConfig> {
        self.client_config.as_ref()
    }
}

// ============================================================================
// Tests
// ============================================================================
