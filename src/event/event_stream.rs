// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Multicast stream for broadcasting reader events.

use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::mpsc;

pub use tokio::sync::mpsc::error::TryRecvError;

use super::ReaderEvent;

/// Multicast channel carrying [`ReaderEvent`]s to every current subscriber.
///
/// Each subscriber owns an unbounded queue, so publishing never blocks and
/// never applies backpressure to the native driver thread that publishes.
/// There is no replay: a subscriber only sees events published after it
/// subscribed.
///
/// Once [`close`](Self::close) has been called, publishing is a silent no-op
/// and every receiver reports end-of-stream after draining what it already
/// holds.
///
/// # Examples
///
/// ```
/// use phidget_rfid::event::{EventStream, ReaderEvent};
///
/// # #[tokio::main]
/// # async fn main() {
/// let stream = EventStream::new();
/// let mut rx = stream.subscribe();
///
/// stream.publish(ReaderEvent::Attached);
/// assert_eq!(rx.recv().await, Some(ReaderEvent::Attached));
///
/// stream.close();
/// assert_eq!(rx.recv().await, None);
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct EventStream {
    // `None` once closed.
    subscribers: Arc<Mutex<Option<Vec<mpsc::UnboundedSender<ReaderEvent>>>>>,
}

impl EventStream {
    /// Creates an open stream with no subscribers.
    #[must_use]
    pub fn new() -> Self {
        Self {
            subscribers: Arc::new(Mutex::new(Some(Vec::new()))),
        }
    }

    /// Subscribes to reader events.
    ///
    /// Subscribing to a closed stream returns a receiver that is already
    /// at end-of-stream.
    #[must_use]
    pub fn subscribe(&self) -> EventReceiver {
        let (tx, rx) = mpsc::unbounded_channel();
        if let Some(subscribers) = self.subscribers.lock().as_mut() {
            subscribers.push(tx);
        }
        EventReceiver { rx }
    }

    /// Returns the number of live subscribers.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.subscribers
            .lock()
            .as_ref()
            .map_or(0, |subscribers| {
                subscribers.iter().filter(|tx| !tx.is_closed()).count()
            })
    }

    /// Publishes an event to all subscribers.
    ///
    /// Returns `false` if the stream is closed. With no subscribers the event
    /// is dropped and `true` is still returned.
    pub fn publish(&self, event: ReaderEvent) -> bool {
        self.deliver(event).is_some()
    }

    /// Publishes an event and returns the number of subscribers that got it.
    ///
    /// Returns 0 if the stream is closed or nobody is listening.
    #[must_use]
    pub fn publish_counted(&self, event: ReaderEvent) -> usize {
        self.deliver(event).unwrap_or(0)
    }

    fn deliver(&self, event: ReaderEvent) -> Option<usize> {
        let mut guard = self.subscribers.lock();
        let subscribers = guard.as_mut()?;

        // Receivers that were dropped are pruned here.
        subscribers.retain(|tx| tx.send(event.clone()).is_ok());
        Some(subscribers.len())
    }

    /// Closes the stream.
    ///
    /// Returns `true` only for the call that actually closed it.
    pub fn close(&self) -> bool {
        self.subscribers.lock().take().is_some()
    }

    /// Returns `true` once [`close`](Self::close) has been called.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.subscribers.lock().is_none()
    }
}

impl Default for EventStream {
    fn default() -> Self {
        Self::new()
    }
}

/// A subscription to an [`EventStream`].
#[derive(Debug)]
pub struct EventReceiver {
    rx: mpsc::UnboundedReceiver<ReaderEvent>,
}

impl EventReceiver {
    /// Waits for the next event.
    ///
    /// Returns `None` once the stream is closed and every queued event has
    /// been received.
    pub async fn recv(&mut self) -> Option<ReaderEvent> {
        self.rx.recv().await
    }

    /// Takes the next queued event without waiting.
    ///
    /// # Errors
    ///
    /// Returns [`TryRecvError::Empty`] if nothing is queued and
    /// [`TryRecvError::Disconnected`] once the stream is closed and drained.
    pub fn try_recv(&mut self) -> Result<ReaderEvent, TryRecvError> {
        self.rx.try_recv()
    }
}
