//! Builder pattern for connection requests.
//!
//! Provides a fluent API for describing the connection every subscription
//! to a message stream will open.
//!
//! # Example
//!
//! ```no_run
//! use rx_websocket::ConnectionRequest;
//!
//! # fn example() -> rx_websocket::Result<()> {
//! let request = ConnectionRequest::builder("wss://example.com/socket")
//!     .protocol("chat.v2")
//!     .origin("https://example.com")
//!     .header("Authorization", "Bearer token")
//!     .build()?;
//! # Ok(())
//! # }
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::time::Duration;

use rustc_hash::{FxHashMap, FxHashSet};
use tokio_tungstenite::tungstenite::http::header::{HeaderName, HeaderValue};
use tokio_tungstenite::tungstenite::protocol::WebSocketConfig;
use url::Url;

use crate::error::{Error, Result};

use super::options::RequestOptions;
use super::request::ConnectionRequest;

// ============================================================================
// Constants
// ============================================================================

/// Characters RFC 7230 forbids in a token.
const TOKEN_SEPARATORS: &str = "()<>@,;:\\\"/[]?={} \t";

// ============================================================================
// ConnectionRequestBuilder
// ============================================================================

/// Builder for a [`ConnectionRequest`].
///
/// Use [`ConnectionRequest::builder()`] to create a new builder.
#[derive(Debug, Clone)]
pub struct ConnectionRequestBuilder {
    /// Target address, unparsed.
    address: String,
    /// Subprotocols in preference order.
    protocols: Vec<String>,
    /// `Origin` header.
    origin: Option<String>,
    /// Extra handshake headers.
    headers: FxHashMap<String, String>,
    /// Handshake options.
    request_options: RequestOptions,
    /// tungstenite client configuration.
    client_config: Option<WebSocketConfig>,
}

// ============================================================================
// ConnectionRequestBuilder Implementation
// ============================================================================

impl ConnectionRequestBuilder {
    /// Creates a builder for the given address.
    #[inline]
    #[must_use]
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            protocols: Vec::new(),
            origin: None,
            headers: FxHashMap::default(),
            request_options: RequestOptions::default(),
            client_config: None,
        }
    }

    /// Adds a subprotocol to offer during the handshake.
    #[inline]
    #[must_use]
    pub fn protocol(mut self, protocol: impl Into<String>) -> Self {
        self.protocols.push(protocol.into());
        self
    }

    /// Adds several subprotocols, keeping their order.
    #[inline]
    #[must_use]
    pub fn protocols(mut self, protocols: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.protocols.extend(protocols.into_iter().map(Into::into));
        self
    }

    /// Sets the `Origin` header.
    #[inline]
    #[must_use]
    pub fn origin(mut self, origin: impl Into<String>) -> Self {
        self.origin = Some(origin.into());
        self
    }

    /// Adds an extra handshake header, replacing any previous value.
    #[inline]
    #[must_use]
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    /// Adds several handshake headers.
    #[inline]
    #[must_use]
    pub fn headers<K, V>(mut self, headers: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        self.headers
            .extend(headers.into_iter().map(|(k, v)| (k.into(), v.into())));
        self
    }

    /// Replaces the handshake options.
    #[inline]
    #[must_use]
    pub fn request_options(mut self, options: RequestOptions) -> Self {
        self.request_options = options;
        self
    }

    /// Sets the handshake timeout.
    #[inline]
    #[must_use]
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.request_options = self.request_options.with_connect_timeout(timeout);
        self
    }

    /// Sets the tungstenite client configuration.
    ///
    /// Passed through to the handshake untouched.
    #[inline]
    #[must_use]
    pub fn client_config(mut self, config: WebSocketConfig) -> Self {
        self.client_config = Some(config);
        self
    }

    /// Builds the request with validation.
    ///
    /// # Errors
    ///
    /// - [`Error::Config`] if the address is not a `ws`/`wss` URL
    /// - [`Error::Config`] if the request options are invalid
    /// - [`Error::InvalidArgument`] if a protocol, origin or header is malformed
    pub fn build(self) -> Result<ConnectionRequest> {
        let address = self.validate_address()?;
        self.validate_protocols()?;
        self.validate_headers()?;
        self.request_options.validate().map_err(Error::config)?;

        Ok(ConnectionRequest {
            address,
            protocols: self.protocols,
            origin: self.origin,
            headers: self.headers,
            request_options: self.request_options,
            client_config: self.client_config,
        })
    }
}

// ============================================================================
// Validation
// ============================================================================

impl ConnectionRequestBuilder {
    /// Parses the address and checks its scheme.
    fn validate_address(&self) -> Result<Url> {
        let url = Url::parse(&self.address)
            .map_err(|e| Error::config(format!("Invalid address '{}': {e}", self.address)))?;

        match url.scheme() {
            "ws" | "wss" => Ok(url),
            scheme => Err(Error::config(format!(
                "Unsupported scheme '{scheme}' in '{}'. Use ws:// or wss://",
                self.address
            ))),
        }
    }

    /// Checks that every protocol is a unique, well-formed token.
    fn validate_protocols(&self) -> Result<()> {
        let mut seen = FxHashSet::default();

        for protocol in &self.protocols {
            if !is_token(protocol) {
                return Err(Error::invalid_argument(format!(
                    "Invalid subprotocol '{protocol}'"
                )));
            }
            if !seen.insert(protocol.as_str()) {
                return Err(Error::invalid_argument(format!(
                    "Duplicate subprotocol '{protocol}'"
                )));
            }
        }

        Ok(())
    }

    /// Checks header names and values, including the origin.
    fn validate_headers(&self) -> Result<()> {
        if let Some(origin) = &self.origin {
            HeaderValue::from_str(origin)
                .map_err(|_| Error::invalid_argument(format!("Invalid origin '{origin}'")))?;
        }

        for (name, value) in &self.headers {
            HeaderName::from_bytes(name.as_bytes())
                .map_err(|_| Error::invalid_argument(format!("Invalid header name '{name}'")))?;
            HeaderValue::from_str(value).map_err(|_| {
                Error::invalid_argument(format!("Invalid value for header '{name}'"))
            })?;
        }

        Ok(())
    }
}

/// Returns `true` if `s` is a non-empty RFC 7230 token.
fn is_token(s: &str) -> bool {
    !s.is_empty()
        && s.chars()
            .all(|c| c.is_ascii_graphic() && !TOKEN_SEPARATORS.contains(c))
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_creates_empty_builder() {
        let builder = ConnectionRequestBuilder::new("ws://localhost");
        assert!(builder.protocols.is_empty());
        assert!(builder.origin.is_none());
        assert!(builder.headers.is_empty());
        assert!(builder.client_config.is_none());
    }

    #[test]
    fn test_full_build() {
        let request = ConnectionRequest::builder("wss://example.com/socket")
            .protocols(["chat.v2", "chat.v1"])
            .origin("https://example.com")
            .header("X-Client", "rx")
            .connect_timeout(Duration::from_secs(3))
            .client_config(WebSocketConfig::default())
            .build()
            .unwrap();

        assert_eq!(request.protocols(), ["chat.v2", "chat.v1"]);
        assert_eq!(request.origin(), Some("https://example.com"));
        assert_eq!(request.headers().get("X-Client").map(String::as_str), Some("rx"));
        assert_eq!(
            request.request_options().connect_timeout,
            Some(Duration::from_secs(3))
        );
        assert!(request.client_config().is_some());
    }

    #[test]
    fn test_protocol_order_preserved() {
        let request = ConnectionRequest::builder("ws://localhost")
            .protocol("b")
            .protocol("a")
            .build()
            .unwrap();
        assert_eq!(request.protocols(), ["b", "a"]);
    }

    #[test]
    fn test_build_fails_with_bad_url() {
        let err = ConnectionRequestBuilder::new("not a url").build().unwrap_err();
        assert!(matches!(err, Error::Config { .. }));
    }

    #[test]
    fn test_build_fails_with_wrong_scheme() {
        let err = ConnectionRequestBuilder::new("https://example.com")
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("ws://"));
    }

    #[test]
    fn test_build_fails_with_bad_protocol() {
        let err = ConnectionRequestBuilder::new("ws://localhost")
            .protocol("chat v2")
            .build()
            .unwrap_err();
        assert!(matches!(err, Error::InvalidArgument { .. }));

        let err = ConnectionRequestBuilder::new("ws://localhost")
            .protocol("")
            .build()
            .unwrap_err();
        assert!(matches!(err, Error::InvalidArgument { .. }));
    }

    #[test]
    fn test_build_fails_with_duplicate_protocol() {
        let err = ConnectionRequestBuilder::new("ws://localhost")
            .protocols(["chat", "chat"])
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("Duplicate"));
    }

    #[test]
    fn test_build_fails_with_bad_header() {
        let err = ConnectionRequestBuilder::new("ws://localhost")
            .header("bad header", "x")
            .build()
            .unwrap_err();
        assert!(matches!(err, Error::InvalidArgument { .. }));

        let err = ConnectionRequestBuilder::new("ws://localhost")
            .header("X-Ok", "line\nbreak")
            .build()
            .unwrap_err();
        assert!(matches!(err, Error::InvalidArgument { .. }));
    }

    #[test]
    fn test_build_fails_with_zero_timeout() {
        let err = ConnectionRequestBuilder::new("ws://localhost")
            .connect_timeout(Duration::ZERO)
            .build()
            .unwrap_err();
        assert!(matches!(err, Error::Config { .. }));
    }

    #[test]
    fn test_is_token() {
        assert!(is_token("graphql-ws"));
        assert!(is_token("v1.json"));
        assert!(!is_token("a,b"));
        assert!(!is_token("é"));
    }
}
