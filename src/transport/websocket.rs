//! WebSocket client transport.
//!
//! [`WebSocketConnector`] opens one tokio-tungstenite client connection per
//! call and spawns a task that owns the socket for its whole life.
//!
//! # Event Loop
//!
//! The task handles:
//!
//! - The opening handshake (subprotocols, origin, extra headers, timeout)
//! - Incoming text frames, forwarded as [`TransportEvent::Message`]
//! - Outgoing [`TransportCommand::Send`] frames
//! - Close frames in both directions
//!
//! Handshake and read failures are reported as `Error` followed by an
//! unclean `Closed`.

// ============================================================================
// Imports
// ============================================================================

use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::header::{
    HeaderName, HeaderValue, ORIGIN, SEC_WEBSOCKET_PROTOCOL,
};
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async_with_config};
use tracing::{debug, info, trace, warn};

use crate::config::ConnectionRequest;
use crate::error::{Error, Result};

use super::{Connector, TransportCommand, TransportDriver, TransportHandle, channel};

// ============================================================================
// Types
// ============================================================================

type ClientStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

// ============================================================================
// WebSocketConnector
// ============================================================================

/// Connector backed by tokio-tungstenite.
///
/// Must be used from within a tokio runtime.
#[derive(Debug, Clone, Copy, Default)]
pub struct WebSocketConnector;

impl WebSocketConnector {
    /// Creates a connector.
    #[inline]
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl Connector for WebSocketConnector {
    fn connect(&self, request: &ConnectionRequest) -> TransportHandle {
        let (handle, driver) = channel();
        tokio::spawn(run_connection(request.clone(), driver));
        handle
    }
}

// ============================================================================
// Connection Task
// ============================================================================

/// Drives one connection from handshake to close.
async fn run_connection(request: ConnectionRequest, mut driver: TransportDriver) {
    let address = request.address().clone();

    let ws_stream = tokio::select! {
        result = handshake(&request) => result,
        () = wait_for_close(&mut driver) => {
            debug!(%address, "Connection abandoned during handshake");
            return;
        }
    };

    let ws_stream = match ws_stream {
        Ok(stream) => stream,
        Err(e) => {
            warn!(%address, error = %e, "WebSocket handshake failed");
            let reason = e.to_string();
            driver.error(e);
            driver.closed(false, None, reason);
            return;
        }
    };

    info!(%address, "WebSocket connection established");
    driver.open();

    run_event_loop(ws_stream, driver).await;

    debug!(%address, "WebSocket event loop terminated");
}

/// Performs the opening handshake.
async fn handshake(request: &ConnectionRequest) -> Result<ClientStream> {
    let mut http_request = request.address().as_str().into_client_request()?;
    let headers = http_request.headers_mut();

    if !request.protocols().is_empty() {
        let value = HeaderValue::from_str(&request.protocols().join(", "))
            .map_err(|e| Error::invalid_argument(format!("Invalid subprotocol list: {e}")))?;
        headers.insert(SEC_WEBSOCKET_PROTOCOL, value);
    }

    if let Some(origin) = request.origin() {
        let value = HeaderValue::from_str(origin)
            .map_err(|e| Error::invalid_argument(format!("Invalid origin: {e}")))?;
        headers.insert(ORIGIN, value);
    }

    for (name, value) in request.headers() {
        let name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|e| Error::invalid_argument(format!("Invalid header name: {e}")))?;
        let value = HeaderValue::from_str(value)
            .map_err(|e| Error::invalid_argument(format!("Invalid header value: {e}")))?;
        headers.insert(name, value);
    }

    let options = request.request_options();
    let connect = connect_async_with_config(
        http_request,
        request.client_config().cloned(),
        options.disable_nagle,
    );

    let (ws_stream, response) = match options.connect_timeout {
        Some(limit) => timeout(limit, connect)
            .await
            .map_err(|_| Error::connection_timeout(limit.as_millis() as u64))??,
        None => connect.await?,
    };

    if !request.protocols().is_empty() {
        let selected = response
            .headers()
            .get(SEC_WEBSOCKET_PROTOCOL)
            .and_then(|v| v.to_str().ok());

        match selected {
            Some(protocol) if request.protocols().iter().any(|p| p == protocol) => {
                debug!(protocol, "Subprotocol selected");
            }
            other => {
                return Err(Error::connection(format!(
                    "Server did not select a requested subprotocol (got {other:?})"
                )));
            }
        }
    }

    Ok(ws_stream)
}

/// Resolves once the adapter asks to close or drops its handle.
async fn wait_for_close(driver: &mut TransportDriver) {
    loop {
        match driver.next_command().await {
            Some(TransportCommand::Close) | None => return,
            Some(TransportCommand::Send(_)) => {
                warn!("Dropping frame sent before the connection opened");
            }
        }
    }
}

/// Pumps frames between the socket and the driver until either side closes.
async fn run_event_loop(ws_stream: ClientStream, mut driver: TransportDriver) {
    let (mut ws_write, mut ws_read) = ws_stream.split();

    loop {
        tokio::select! {
            // Incoming frames from the peer
            message = ws_read.next() => {
                match message {
                    Some(Ok(Message::Text(text))) => {
                        trace!(len = text.len(), "Text frame received");
                        driver.message(text.as_str());
                    }

                    Some(Ok(Message::Binary(data))) => {
                        warn!(len = data.len(), "Ignoring binary frame");
                    }

                    Some(Ok(Message::Close(frame))) => {
                        let (code, reason) = frame
                            .map(|f| (Some(u16::from(f.code)), f.reason.as_str().to_owned()))
                            .unwrap_or((None, String::new()));

                        debug!(?code, %reason, "WebSocket closed by remote");

                        // Flushes the queued close reply.
                        let _ = ws_write.close().await;
                        driver.closed(true, code, reason);
                        break;
                    }

                    Some(Err(e)) => {
                        warn!(error = %e, "WebSocket error");
                        let reason = e.to_string();
                        driver.error(Error::WebSocket(e));
                        driver.closed(false, None, reason);
                        break;
                    }

                    None => {
                        debug!("WebSocket stream ended");
                        driver.closed(false, None, "connection dropped");
                        break;
                    }

                    // Ping, Pong and raw frames are handled by tungstenite
                    _ => {}
                }
            }

            // Commands from the adapter
            command = driver.next_command() => {
                match command {
                    Some(TransportCommand::Send(text)) => {
                        if let Err(e) = ws_write.send(Message::Text(text.into())).await {
                            warn!(error = %e, "Failed to send frame");
                            let reason = e.to_string();
                            driver.error(Error::WebSocket(e));
                            driver.closed(false, None, reason);
                            break;
                        }
                        trace!("Frame sent");
                    }

                    Some(TransportCommand::Close) | None => {
                        debug!("Close requested locally");
                        let _ = ws_write.close().await;
                        break;
                    }
                }
            }
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use std::time::Duration;

    use tokio::net::TcpListener;
    use tokio::sync::oneshot;
    use tokio_tungstenite::tungstenite::handshake::server::{ErrorResponse, Request, Response};
    use tokio_tungstenite::tungstenite::protocol::CloseFrame;
    use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;

    use crate::transport::TransportEvent;

    const TEST_TIMEOUT: Duration = Duration::from_secs(5);

    async fn bind() -> (TcpListener, String) {
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind should succeed");
        let port = listener.local_addr().expect("local addr").port();
        (listener, format!("ws://127.0.0.1:{port}"))
    }

    async fn next_event(handle: &mut TransportHandle) -> TransportEvent {
        timeout(TEST_TIMEOUT, handle.next_event())
            .await
            .expect("event should arrive")
            .expect("transport should not vanish")
    }

    /// Echoes text frames; closes normally when it receives "bye".
    async fn echo_server(listener: TcpListener) {
        let (stream, _) = listener.accept().await.expect("accept");
        let mut ws = tokio_tungstenite::accept_async(stream)
            .await
            .expect("upgrade");

        while let Some(Ok(message)) = ws.next().await {
            match message {
                Message::Text(text) if text.as_str() == "bye" => {
                    let frame = CloseFrame {
                        code: CloseCode::Normal,
                        reason: "done".into(),
                    };
                    let _ = ws.close(Some(frame)).await;
                }
                Message::Text(text) => {
                    let _ = ws.send(Message::Text(text)).await;
                }
                _ => {}
            }
        }
    }

    #[tokio::test]
    async fn test_echo_and_clean_close() {
        let (listener, url) = bind().await;
        tokio::spawn(echo_server(listener));

        let request = ConnectionRequest::new(url).unwrap();
        let mut handle = WebSocketConnector::new().connect(&request);
        let control = handle.control();

        assert!(matches!(next_event(&mut handle).await, TransportEvent::Open));

        control.send(r#"{"a":1}"#.to_string()).unwrap();
        assert!(matches!(
            next_event(&mut handle).await,
            TransportEvent::Message(text) if text == r#"{"a":1}"#
        ));

        control.send("bye".to_string()).unwrap();
        match next_event(&mut handle).await {
            TransportEvent::Closed {
                clean,
                code,
                reason,
            } => {
                assert!(clean);
                assert_eq!(code, Some(1000));
                assert_eq!(reason, "done");
            }
            other => panic!("expected close, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_handshake_sends_protocols_origin_and_headers() {
        let (listener, url) = bind().await;
        let (seen_tx, seen_rx) = oneshot::channel();

        tokio::spawn(async move {
            let (stream, _) = listener.accept().await.expect("accept");
            let callback = move |req: &Request,
                                 mut response: Response|
                  -> std::result::Result<Response, ErrorResponse> {
                let header = |name: &str| {
                    req.headers()
                        .get(name)
                        .and_then(|v| v.to_str().ok())
                        .map(str::to_owned)
                };
                let _ = seen_tx.send((
                    header("sec-websocket-protocol"),
                    header("origin"),
                    header("x-client"),
                ));
                response
                    .headers_mut()
                    .insert(SEC_WEBSOCKET_PROTOCOL, HeaderValue::from_static("chat.v1"));
                Ok(response)
            };
            let mut ws = tokio_tungstenite::accept_hdr_async(stream, callback)
                .await
                .expect("upgrade");
            while ws.next().await.is_some() {}
        });

        let request = ConnectionRequest::builder(url)
            .protocols(["chat.v2", "chat.v1"])
            .origin("https://example.com")
            .header("X-Client", "rx")
            .build()
            .unwrap();
        let mut handle = WebSocketConnector::new().connect(&request);

        assert!(matches!(next_event(&mut handle).await, TransportEvent::Open));

        let (protocols, origin, client) = seen_rx.await.expect("headers captured");
        assert_eq!(protocols.as_deref(), Some("chat.v2, chat.v1"));
        assert_eq!(origin.as_deref(), Some("https://example.com"));
        assert_eq!(client.as_deref(), Some("rx"));
    }

    #[tokio::test]
    async fn test_refused_connection_reports_error_then_unclean_close() {
        let (listener, url) = bind().await;
        drop(listener);

        let request = ConnectionRequest::new(url).unwrap();
        let mut handle = WebSocketConnector::new().connect(&request);

        assert!(matches!(next_event(&mut handle).await, TransportEvent::Error(_)));
        assert!(matches!(
            next_event(&mut handle).await,
            TransportEvent::Closed { clean: false, .. }
        ));
    }

    #[tokio::test]
    async fn test_local_close_reaches_server() {
        let (listener, url) = bind().await;
        let (closed_tx, closed_rx) = oneshot::channel();

        tokio::spawn(async move {
            let (stream, _) = listener.accept().await.expect("accept");
            let mut ws = tokio_tungstenite::accept_async(stream)
                .await
                .expect("upgrade");
            while let Some(Ok(message)) = ws.next().await {
                if message.is_close() {
                    let _ = closed_tx.send(());
                    break;
                }
            }
        });

        let request = ConnectionRequest::new(url).unwrap();
        let mut handle = WebSocketConnector::new().connect(&request);
        assert!(matches!(next_event(&mut handle).await, TransportEvent::Open));

        handle.control().close();

        timeout(TEST_TIMEOUT, closed_rx)
            .await
            .expect("server should see close")
            .expect("server task alive");
    }

    #[tokio::test]
    async fn test_abrupt_disconnect_is_unclean() {
        let (listener, url) = bind().await;

        tokio::spawn(async move {
            let (stream, _) = listener.accept().await.expect("accept");
            let ws = tokio_tungstenite::accept_async(stream)
                .await
                .expect("upgrade");
            drop(ws);
        });

        let request = ConnectionRequest::new(url).unwrap();
        let mut handle = WebSocketConnector::new().connect(&request);
        assert!(matches!(next_event(&mut handle).await, TransportEvent::Open));

        loop {
            match next_event(&mut handle).await {
                TransportEvent::Closed { clean, .. } => {
                    assert!(!clean);
                    break;
                }
                TransportEvent::Error(_) => {}
                other => panic!("unexpected event {other:?}"),
            }
        }
    }
}
