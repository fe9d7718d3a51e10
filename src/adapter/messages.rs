//! Cold inbound message stream.
//!
//! [`Messages`] does nothing until [`Messages::subscribe`] is called. Each
//! call opens its own transport connection and returns a [`Subscription`]
//! that owns it.
//!
//! # Subscription Lifecycle
//!
//! 1. `subscribe` asks the connector for a new transport connection
//! 2. On `Open`: subscribe to the outbound source, then increment the status
//! 3. On `Message`: decode and yield
//! 4. On `Error`: decrement (once), yield the error, end
//! 5. On `Closed`: decrement (once), end; unclean closes yield an error first
//! 6. On drop: decrement (once), request close, stop forwarding

// ============================================================================
// Imports
// ============================================================================

use std::marker::PhantomData;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use futures_util::stream::BoxStream;
use futures_util::{Stream, StreamExt};
use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, trace, warn};

use crate::codec;
use crate::config::ConnectionRequest;
use crate::error::{Error, Result};
use crate::identifiers::SubscriptionId;
use crate::status::{ConnectionStatus, Lifecycle};
use crate::transport::{Connector, TransportControl, TransportEvent};

use super::outbound::FrameSource;

// ============================================================================
// Messages
// ============================================================================

/// Everything a subscription needs, shared by all clones of [`Messages`].
struct Shared {
    request: ConnectionRequest,
    connector: Arc<dyn Connector>,
    outbound: Arc<dyn FrameSource>,
    status: ConnectionStatus,
}

/// Cold, restartable stream of inbound messages.
///
/// Cloning is cheap; clones subscribe independently.
pub struct Messages<I = Value> {
    shared: Arc<Shared>,
    _item: PhantomData<fn() -> I>,
}

impl<I> Clone for Messages<I> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
            _item: PhantomData,
        }
    }
}

impl<I> std::fmt::Debug for Messages<I> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Messages")
            .field("address", &self.shared.request.address().as_str())
            .finish_non_exhaustive()
    }
}

impl<I> Messages<I> {
    pub(crate) fn new(
        request: ConnectionRequest,
        connector: Arc<dyn Connector>,
        outbound: Arc<dyn FrameSource>,
        status: ConnectionStatus,
    ) -> Self {
        Self {
            shared: Arc::new(Shared {
                request,
                connector,
                outbound,
                status,
            }),
            _item: PhantomData,
        }
    }

    /// Returns the request every subscription connects with.
    #[inline]
    #[must_use]
    pub fn request(&self) -> &ConnectionRequest {
        &self.shared.request
    }
}

impl<I> Messages<I>
where
    I: DeserializeOwned + Send + 'static,
{
    /// Opens a new transport connection and streams its messages.
    ///
    /// Must be called from within a tokio runtime.
    #[must_use = "dropping the subscription closes the connection"]
    pub fn subscribe(&self) -> Subscription<I> {
        let id = SubscriptionId::generate();
        debug!(%id, address = %self.shared.request.address(), "Subscribing to messages");

        let handle = self.shared.connector.connect(&self.shared.request);
        let (control, events) = handle.into_parts();
        let lifecycle = Arc::new(Mutex::new(Lifecycle::new()));
        let (items_tx, items_rx) = mpsc::unbounded_channel();

        let task = SubscriptionTask {
            id,
            events,
            control: control.clone(),
            outbound: Arc::clone(&self.shared.outbound),
            status: self.shared.status.clone(),
            lifecycle: Arc::clone(&lifecycle),
            items: items_tx,
        };

        Subscription {
            id,
            items: items_rx,
            control,
            lifecycle,
            task: tokio::spawn(task.run()),
        }
    }
}

// ============================================================================
// Subscription
// ============================================================================

/// One active subscription to a [`Messages`] stream.
///
/// Yields `Ok` per inbound message. A failure is yielded as a final `Err`
/// before the stream ends; a clean close just ends it.
///
/// Dropping the subscription releases the connection.
#[derive(Debug)]
pub struct Subscription<I = Value> {
    id: SubscriptionId,
    items: mpsc::UnboundedReceiver<Result<I>>,
    control: TransportControl,
    lifecycle: Arc<Mutex<Lifecycle>>,
    task: JoinHandle<()>,
}

impl<I> Subscription<I> {
    /// Returns this subscription's ID.
    #[inline]
    #[must_use]
    pub const fn id(&self) -> SubscriptionId {
        self.id
    }

    /// Returns `true` while the transport is open.
    #[inline]
    #[must_use]
    pub fn is_open(&self) -> bool {
        self.lifecycle.lock().is_open()
    }
}

impl<I> Stream for Subscription<I> {
    type Item = Result<I>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.items.poll_recv(cx)
    }
}

impl<I> Drop for Subscription<I> {
    fn drop(&mut self) {
        self.task.abort();

        if self.lifecycle.lock().closed() {
            debug!(id = %self.id, "Connection released by unsubscribe");
        }

        self.control.close();
    }
}

// ============================================================================
// SubscriptionTask
// ============================================================================

/// Background half of a [`Subscription`].
struct SubscriptionTask<I> {
    id: SubscriptionId,
    events: mpsc::UnboundedReceiver<TransportEvent>,
    control: TransportControl,
    outbound: Arc<dyn FrameSource>,
    status: ConnectionStatus,
    lifecycle: Arc<Mutex<Lifecycle>>,
    items: mpsc::UnboundedSender<Result<I>>,
}

impl<I> SubscriptionTask<I>
where
    I: DeserializeOwned + Send + 'static,
{
    async fn run(mut self) {
        let mut outbound: Option<BoxStream<'static, Result<String>>> = None;

        loop {
            tokio::select! {
                // Events from the transport
                event = self.events.recv() => {
                    match event {
                        Some(TransportEvent::Open) => {
                            if self.lifecycle.lock().is_open() {
                                warn!(id = %self.id, "Duplicate open event ignored");
                                continue;
                            }
                            outbound = Some(self.outbound.frames());
                            self.lifecycle.lock().opened(&self.status);
                            debug!(id = %self.id, "Transport open");
                        }

                        Some(TransportEvent::Message(text)) => {
                            match codec::decode::<I>(&text) {
                                Ok(item) => {
                                    trace!(id = %self.id, len = text.len(), "Message received");
                                    let _ = self.items.send(Ok(item));
                                }
                                Err(e) => {
                                    warn!(id = %self.id, error = %e, "Undecodable message");
                                    self.fail(e);
                                    break;
                                }
                            }
                        }

                        Some(TransportEvent::Error(e)) => {
                            debug!(id = %self.id, error = %e, "Transport error");
                            self.fail(e);
                            break;
                        }

                        Some(TransportEvent::Closed { clean, code, reason }) => {
                            self.lifecycle.lock().closed();
                            if clean {
                                debug!(id = %self.id, ?code, "Transport closed cleanly");
                            } else {
                                debug!(id = %self.id, ?code, %reason, "Transport closed uncleanly");
                                let _ = self.items.send(Err(Error::unclean_close(code, reason)));
                            }
                            break;
                        }

                        None => {
                            debug!(id = %self.id, "Transport vanished without closing");
                            self.fail(Error::ConnectionClosed);
                            break;
                        }
                    }
                }

                // Outbound frames, only after open
                frame = next_frame(&mut outbound), if outbound.is_some() => {
                    match frame {
                        Some(Ok(text)) => {
                            trace!(id = %self.id, len = text.len(), "Forwarding outbound message");
                            if self.control.send(text).is_err() {
                                debug!(id = %self.id, "Transport gone, outbound message dropped");
                            }
                        }
                        Some(Err(e)) => {
                            warn!(id = %self.id, error = %e, "Unencodable outbound message");
                            self.fail(e);
                            break;
                        }
                        None => {
                            debug!(id = %self.id, "Outbound source completed");
                            outbound = None;
                        }
                    }
                }
            }
        }

        self.lifecycle.lock().closed();
        self.control.close();
        trace!(id = %self.id, "Subscription task finished");
    }

    /// Records the close and yields `error` as the final item.
    fn fail(&self, error: Error) {
        self.lifecycle.lock().closed();
        let _ = self.items.send(Err(error));
    }
}

/// Next frame from the outbound stream; pending forever when there is none.
async fn next_frame(
    outbound: &mut Option<BoxStream<'static, Result<String>>>,
) -> Option<Result<String>> {
    match outbound {
        Some(frames) => frames.next().await,
        None => std::future::pending().await,
    }
}

// ============================================================================
// Tests
// ============================================================================
