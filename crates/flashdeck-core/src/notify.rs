//! Same-device change notifications
//!
//! Several views of the same device may each run an engine over the same
//! local storage. While anonymous there is no remote subscription to tell
//! them about each other's writes, so every mutation is announced on a
//! process-wide [`ChangeChannel`] and anonymous engines re-read local
//! storage when another observer announces a change.

use std::fmt;

use tokio::sync::broadcast;
use uuid::Uuid;

/// Default number of undelivered events kept per receiver.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 64;

/// What kind of data changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChangeTopic {
    /// Card lists
    Cards,
    /// Progress record
    Progress,
}

/// Identity of one observer (one engine instance).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObserverId(Uuid);

impl ObserverId {
    /// Fresh random observer id.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ObserverId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ObserverId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One change announcement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChangeEvent {
    /// What changed
    pub topic: ChangeTopic,
    /// Who changed it
    pub source: ObserverId,
}

/// Process-wide fire-and-forget broadcast of change events.
///
/// Cloning shares the channel.
#[derive(Clone)]
pub struct ChangeChannel {
    sender: broadcast::Sender<ChangeEvent>,
}

impl ChangeChannel {
    /// Channel keeping up to `capacity` undelivered events per receiver.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Announce a change. Nobody listening is not an error.
    pub fn notify(&self, topic: ChangeTopic, source: ObserverId) {
        let delivered = self.sender.send(ChangeEvent { topic, source }).unwrap_or(0);
        tracing::trace!(?topic, %source, delivered, "change announced");
    }

    /// Start receiving announcements made from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<ChangeEvent> {
        self.sender.subscribe()
    }

    /// Number of live receivers.
    pub fn receiver_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for ChangeChannel {
    fn default() -> Self {
        Self::new(DEFAULT_CHANNEL_CAPACITY)
    }
}

impl fmt::Debug for ChangeChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChangeChannel")
            .field("receivers", &self.sender.receiver_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn subscribers_receive_announcements() {
        let channel = ChangeChannel::default();
        let mut rx = channel.subscribe();
        let me = ObserverId::new();
        channel.notify(ChangeTopic::Progress, me);
        let event = rx.recv().await.unwrap();
        assert_eq!(event.topic, ChangeTopic::Progress);
        assert_eq!(event.source, me);
    }

    #[test]
    fn notify_without_receivers_is_silent() {
        let channel = ChangeChannel::new(4);
        channel.notify(ChangeTopic::Cards, ObserverId::new());
        assert_eq!(channel.receiver_count(), 0);
    }
}
