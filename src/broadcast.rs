//! Fan-out of a single event feed to independently paced subscribers.
//!
//! Every [`Subscription`] owns a private unbounded queue. Publishing never waits on a
//! subscriber, so a slow consumer only grows its own queue. A subscription sees the items
//! published after it was created, in publication order; there is no replay.
use std::pin::Pin;
use std::task::{Context, Poll};

use tokio::sync::mpsc;

use crate::container::LifecycleEvent;

pub use tokio::sync::mpsc::error::TryRecvError;

/// The producer side of the fan-out.
///
/// Holds only the sending half of each subscriber queue. A subscription that was dropped or
/// closed is removed on the next [`subscribe`](Distributor::subscribe) or
/// [`publish`](Distributor::publish).
#[derive(Debug)]
pub struct Distributor<T = LifecycleEvent> {
    subscribers: Vec<mpsc::UnboundedSender<T>>,
}

impl<T> Default for Distributor<T> {
    fn default() -> Self {
        Self {
            subscribers: Vec::new(),
        }
    }
}

impl<T: Clone> Distributor<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attaches a new subscriber that receives every item published from now on.
    pub fn subscribe(&mut self) -> Subscription<T> {
        self.subscribers.retain(|tx| !tx.is_closed());

        let (tx, rx) = mpsc::unbounded_channel();
        self.subscribers.push(tx);
        Subscription { rx }
    }

    /// Delivers `item` to every attached subscriber.
    ///
    /// Returns the number of subscribers the item was queued for.
    pub fn publish(&mut self, item: T) -> usize {
        self.subscribers.retain(|tx| tx.send(item.clone()).is_ok());
        self.subscribers.len()
    }

    /// Number of subscribers that are still attached.
    pub fn subscriber_count(&self) -> usize {
        self.subscribers.iter().filter(|tx| !tx.is_closed()).count()
    }
}

/// A consumer's private view of the feed.
///
/// Dropping the subscription detaches it. [`close`](Subscription::close) detaches it while
/// keeping already queued items available.
#[derive(Debug)]
pub struct Subscription<T = LifecycleEvent> {
    rx: mpsc::UnboundedReceiver<T>,
}

impl<T> Subscription<T> {
    /// Receives the next item.
    ///
    /// Returns `None` once the subscription is closed and drained, or once the producer is
    /// gone.
    pub async fn recv(&mut self) -> Option<T> {
        self.rx.recv().await
    }

    /// Receives the next item if one is already queued.
    pub fn try_recv(&mut self) -> Result<T, TryRecvError> {
        self.rx.try_recv()
    }

    /// Stops receiving new items. Items queued before the call can still be received.
    pub fn close(&mut self) {
        self.rx.close();
    }

    /// Number of items queued and not yet received.
    pub fn len(&self) -> usize {
        self.rx.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rx.is_empty()
    }
}

impl<T> futures::Stream for Subscription<T> {
    type Item = T;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<T>> {
        self.rx.poll_recv(cx)
    }
}
