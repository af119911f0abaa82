//! # Signal Plumbing Module
//!
//! The three fan-in / fan-out channels that sit between the actors and the
//! outside world. None of them ever blocks a producer.
//!
//! ## Channels
//!
//! - **Redraw notifier**: many producers, one consumer (the render loop).
//!   A pending, unconsumed redraw absorbs any further requests.
//! - **Player position feed**: one producer (the map owner), one receiver per
//!   enemy. Single slot, the newest position overwrites the previous one.
//! - **Status line**: the latest human-readable message for the status bar.

use tokio::sync::{mpsc, watch};

use crate::types::Position;

/// Producer side of the coalesced redraw signal.
///
/// Cloned into every actor that changes visible state. `notify` never waits:
/// if a redraw is already queued the request is dropped, since the pending
/// redraw will read the newest state anyway.
#[derive(Clone, Debug)]
pub struct RedrawNotifier {
    tx: mpsc::Sender<()>,
}

impl RedrawNotifier {
    /// Requests a redraw without blocking.
    ///
    /// A full slot means a redraw is already pending, and a closed channel
    /// means nobody renders any more; both are silently ignored.
    pub fn notify(&self) {
        let _ = self.tx.try_send(());
    }
}

/// Consumer side of the redraw signal, owned by the render loop.
#[derive(Debug)]
pub struct RedrawSignal {
    rx: mpsc::Receiver<()>,
}

impl RedrawSignal {
    /// Waits for the next redraw request.
    ///
    /// Returns `false` once every notifier has been dropped.
    pub async fn wait(&mut self) -> bool {
        self.rx.recv().await.is_some()
    }

    /// Consumes a pending request, if any, without waiting.
    pub fn try_take(&mut self) -> bool {
        self.rx.try_recv().is_ok()
    }
}

/// Creates the redraw notifier / signal pair.
///
/// # Examples
///
/// ```rust
/// use trapdoor::signal::redraw_channel;
///
/// let (notifier, mut signal) = redraw_channel();
/// notifier.notify();
/// notifier.notify(); // coalesced into the first one
/// assert!(signal.try_take());
/// assert!(!signal.try_take());
/// ```
pub fn redraw_channel() -> (RedrawNotifier, RedrawSignal) {
    // NOTE - Capacity 1 is what makes the signal coalesce
    let (tx, rx) = mpsc::channel(1);
    (RedrawNotifier { tx }, RedrawSignal { rx })
}

/// Publisher of the player's position, held by the map owner.
#[derive(Debug)]
pub struct PositionFeed {
    tx: watch::Sender<Position>,
}

impl PositionFeed {
    pub fn new(start: Position) -> Self {
        let (tx, _) = watch::channel(start);
        Self { tx }
    }

    /// Overwrites the slot and wakes every inbox. Never blocks and never
    /// fails, even with no subscribers.
    pub fn publish(&self, position: Position) {
        self.tx.send_replace(position);
    }

    /// A fresh inbox for one enemy. The current value counts as unseen so the
    /// enemy reacts to where the player stands when it starts.
    pub fn subscribe(&self) -> PositionInbox {
        let mut rx = self.tx.subscribe();
        rx.mark_changed();
        PositionInbox { rx }
    }
}

/// One enemy's single-slot inbox of the player's latest position.
#[derive(Clone, Debug)]
pub struct PositionInbox {
    rx: watch::Receiver<Position>,
}

impl PositionInbox {
    /// Waits for a position newer than the last one taken.
    ///
    /// Intermediate positions published in between are skipped. Returns
    /// `None` when the feed is gone.
    pub async fn next(&mut self) -> Option<Position> {
        self.rx.changed().await.ok()?;
        Some(*self.rx.borrow_and_update())
    }

    pub fn latest(&self) -> Position {
        *self.rx.borrow()
    }
}

/// Writer side of the status bar message.
#[derive(Clone, Debug)]
pub struct StatusLine {
    tx: watch::Sender<String>,
}

impl StatusLine {
    pub fn channel() -> (Self, watch::Receiver<String>) {
        let (tx, rx) = watch::channel(String::new());
        (Self { tx }, rx)
    }

    pub fn set(&self, message: impl Into<String>) {
        self.tx.send_replace(message.into());
    }

    pub fn current(&self) -> String {
        self.tx.borrow().clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn redraw_requests_coalesce() {
        let (notifier, mut signal) = redraw_channel();
        let other = notifier.clone();
        for _ in 0..5 {
            notifier.notify();
            other.notify();
        }
        assert!(signal.wait().await);
        assert!(!signal.try_take());

        drop(notifier);
        drop(other);
        assert!(!signal.wait().await);
    }

    #[tokio::test]
    async fn position_inbox_keeps_only_the_latest() {
        let feed = PositionFeed::new(Position::new(0, 0));
        let mut inbox = feed.subscribe();

        assert_eq!(inbox.next().await, Some(Position::new(0, 0)));

        feed.publish(Position::new(1, 0));
        feed.publish(Position::new(2, 0));
        feed.publish(Position::new(3, 0));
        assert_eq!(inbox.next().await, Some(Position::new(3, 0)));

        drop(feed);
        assert_eq!(inbox.next().await, None);
    }

    #[test]
    fn publish_without_subscribers() {
        let feed = PositionFeed::new(Position::new(0, 0));
        feed.publish(Position::new(4, 4));
        assert_eq!(feed.subscribe().latest(), Position::new(4, 4));
    }

    #[test]
    fn status_line_overwrites() {
        let (status, rx) = StatusLine::channel();
        status.set("first");
        status.set(String::from("second"));
        assert_eq!(*rx.borrow(), "second");
        assert_eq!(status.current(), "second");
    }
}
