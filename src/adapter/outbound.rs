//! Outbound message sources.
//!
//! A source is subscribed once per message-stream subscription, at the
//! moment that subscription's transport opens. Anything the source
//! produced before then is not seen by that subscription.
//!
//! # Implementations
//!
//! | Source | Behavior |
//! |--------|----------|
//! | [`broadcast::Sender`] | Hot: items sent with no attached subscription are lost |
//! | [`from_fn`] | Calls a factory for a fresh stream per subscription |
//! | [`silent`] | Never sends anything |

// ============================================================================
// Imports
// ============================================================================

use std::marker::PhantomData;

use futures_util::stream::{self, BoxStream};
use futures_util::{Stream, StreamExt};
use serde::Serialize;
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::RecvError;
use tracing::warn;

use crate::codec;
use crate::error::Result;

// ============================================================================
// OutboundSource
// ============================================================================

/// A subscribable sequence of outbound messages.
pub trait OutboundSource: Send + Sync + 'static {
    /// Message type; encoded as one JSON text frame per item.
    type Item: Serialize + Send + 'static;

    /// Starts a new subscription.
    ///
    /// Dropping the returned stream ends the subscription.
    fn subscribe(&self) -> BoxStream<'static, Self::Item>;
}

impl<T> OutboundSource for broadcast::Sender<T>
where
    T: Serialize + Clone + Send + 'static,
{
    type Item = T;

    fn subscribe(&self) -> BoxStream<'static, T> {
        let rx = broadcast::Sender::subscribe(self);

        stream::unfold(rx, |mut rx| async move {
            loop {
                match rx.recv().await {
                    Ok(item) => return Some((item, rx)),
                    Err(RecvError::Lagged(skipped)) => {
                        warn!(skipped, "Outbound subscriber lagged, messages skipped");
                    }
                    Err(RecvError::Closed) => return None,
                }
            }
        })
        .boxed()
    }
}

// ============================================================================
// FromFn
// ============================================================================

/// Source that builds a fresh stream per subscription.
///
/// Created by [`from_fn`].
#[derive(Debug, Clone)]
pub struct FromFn<F> {
    factory: F,
}

/// Creates a source from a stream factory.
///
/// # Example
///
/// ```ignore
/// use futures_util::stream;
/// use serde_json::json;
///
/// let hello = rx_websocket::outbound::from_fn(|| stream::iter([json!({"type": "hello"})]));
/// ```
#[inline]
#[must_use]
pub fn from_fn<F, S>(factory: F) -> FromFn<F>
where
    F: Fn() -> S + Send + Sync + 'static,
    S: Stream + Send + 'static,
    S::Item: Serialize + Send + 'static,
{
    FromFn { factory }
}

impl<F, S> OutboundSource for FromFn<F>
where
    F: Fn() -> S + Send + Sync + 'static,
    S: Stream + Send + 'static,
    S::Item: Serialize + Send + 'static,
{
    type Item = S::Item;

    fn subscribe(&self) -> BoxStream<'static, S::Item> {
        (self.factory)().boxed()
    }
}

// ============================================================================
// Silent
// ============================================================================

/// Source that never produces anything.
///
/// Created by [`silent`].
#[derive(Debug)]
pub struct Silent<T> {
    _item: PhantomData<fn() -> T>,
}

/// Creates a source for receive-only connections.
#[inline]
#[must_use]
pub fn silent<T>() -> Silent<T> {
    Silent { _item: PhantomData }
}

impl<T> OutboundSource for Silent<T>
where
    T: Serialize + Send + 'static,
{
    type Item = T;

    fn subscribe(&self) -> BoxStream<'static, T> {
        stream::pending().boxed()
    }
}

// ============================================================================
// FrameSource
// ============================================================================

/// Type-erased source of encoded text frames.
pub(crate) trait FrameSource: Send + Sync + 'static {
    fn frames(&self) -> BoxStream<'static, Result<String>>;
}

impl<O: OutboundSource> FrameSource for O {
    fn frames(&self) -> BoxStream<'static, Result<String>> {
        self.subscribe().map(|item| codec::encode(&item)).boxed()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use serde_json::{Value, json};

    #[tokio::test]
    async fn test_broadcast_drops_items_sent_before_subscribe() {
        let (tx, _) = broadcast::channel::<Value>(16);
        assert!(tx.send(json!(1)).is_err());

        let mut frames = tx.frames();
        tx.send(json!(2)).unwrap();
        drop(tx);

        assert_eq!(frames.next().await.unwrap().unwrap(), "2");
        assert!(frames.next().await.is_none());
    }

    #[tokio::test]
    async fn test_broadcast_subscriptions_are_independent() {
        let (tx, _) = broadcast::channel::<Value>(16);
        let mut first = tx.frames();
        let mut second = tx.frames();

        tx.send(json!({"k": "v"})).unwrap();

        assert_eq!(first.next().await.unwrap().unwrap(), r#"{"k":"v"}"#);
        assert_eq!(second.next().await.unwrap().unwrap(), r#"{"k":"v"}"#);
    }

    #[tokio::test]
    async fn test_from_fn_restarts_per_subscription() {
        let source = from_fn(|| stream::iter([json!("a"), json!("b")]));

        let first: Vec<_> = source.frames().collect().await;
        let second: Vec<_> = source.frames().collect().await;

        assert_eq!(first.len(), 2);
        assert_eq!(second.len(), 2);
        assert_eq!(first[0].as_deref().unwrap(), r#""a""#);
    }

    #[tokio::test]
    async fn test_silent_never_yields() {
        let source = silent::<Value>();
        let mut frames = source.frames();
        let next = tokio::time::timeout(std::time::Duration::from_millis(20), frames.next()).await;
        assert!(next.is_err());
    }
}
