//! Snapshot subscriptions
//!
//! A [`SnapshotFeed`] is the receiving half of a subscription: every item is a
//! full snapshot of the subscribed collection. Dropping the feed is the
//! unsubscribe; the publishing side notices through [`FeedSender::send`]
//! returning `false` and prunes the subscriber.

use tokio::sync::mpsc;

/// Publishing half of a subscription.
#[derive(Debug)]
pub struct FeedSender<T> {
    tx: mpsc::UnboundedSender<T>,
}

impl<T> Clone for FeedSender<T> {
    fn clone(&self) -> Self {
        Self {
            tx: self.tx.clone(),
        }
    }
}

impl<T> FeedSender<T> {
    /// Deliver a snapshot. Returns `false` once the subscriber is gone.
    pub fn send(&self, snapshot: T) -> bool {
        self.tx.send(snapshot).is_ok()
    }

    /// Whether the subscriber dropped its feed.
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

/// Receiving half of a subscription.
#[derive(Debug)]
pub struct SnapshotFeed<T> {
    rx: mpsc::UnboundedReceiver<T>,
}

impl<T> SnapshotFeed<T> {
    /// Create a connected sender/feed pair.
    pub fn channel() -> (FeedSender<T>, SnapshotFeed<T>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (FeedSender { tx }, SnapshotFeed { rx })
    }

    /// Wait for the next snapshot. `None` once the publisher is gone.
    pub async fn next(&mut self) -> Option<T> {
        self.rx.recv().await
    }

    /// Take a snapshot if one is already queued.
    pub fn try_next(&mut self) -> Option<T> {
        self.rx.try_recv().ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn dropping_feed_closes_sender() {
        let (tx, mut feed) = SnapshotFeed::channel();
        assert!(tx.send(1));
        assert_eq!(feed.next().await, Some(1));
        drop(feed);
        assert!(tx.is_closed());
        assert!(!tx.send(2));
    }

    #[tokio::test]
    async fn feed_ends_when_all_senders_drop() {
        let (tx, mut feed) = SnapshotFeed::<u8>::channel();
        drop(tx);
        assert_eq!(feed.next().await, None);
    }
}
