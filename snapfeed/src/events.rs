//! Cross-view change notifications.
//!
//! Delivery is best-effort: events published with no subscriber are dropped,
//! and a subscriber that falls more than the channel capacity behind skips
//! the oldest events.

use tokio::sync::broadcast::{self, error::TryRecvError};

const DEFAULT_CAPACITY: usize = 64;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeedEvent {
    CommentCountChanged { post_id: String, delta: i64 },
    PostCreated { post_id: String },
    PostDeleted { post_id: String },
}

#[derive(Debug, Clone)]
pub struct EventBus {
    sender: broadcast::Sender<FeedEvent>,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    pub fn publish(&self, event: FeedEvent) {
        if self.sender.send(event).is_err() {
            log::debug!("feed event dropped: no subscribers");
        }
    }

    pub fn subscribe(&self) -> EventReceiver {
        EventReceiver {
            receiver: self.sender.subscribe(),
        }
    }
}

pub struct EventReceiver {
    receiver: broadcast::Receiver<FeedEvent>,
}

impl EventReceiver {
    /// Take every event received so far without waiting.
    pub fn drain(&mut self) -> Vec<FeedEvent> {
        let mut events = Vec::new();
        loop {
            match self.receiver.try_recv() {
                Ok(event) => events.push(event),
                Err(TryRecvError::Lagged(skipped)) => {
                    log::warn!("feed events lagged, skipped {skipped}");
                }
                Err(TryRecvError::Empty | TryRecvError::Closed) => break,
            }
        }
        events
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn changed(post_id: &str, delta: i64) -> FeedEvent {
        FeedEvent::CommentCountChanged {
            post_id: post_id.to_string(),
            delta,
        }
    }

    #[test]
    fn subscribers_see_events_published_after_subscribing() {
        let bus = EventBus::default();
        bus.publish(changed("before", 1));
        let mut receiver = bus.subscribe();
        bus.publish(changed("p1", 1));
        bus.publish(changed("p1", -1));
        assert_eq!(receiver.drain(), vec![changed("p1", 1), changed("p1", -1)]);
        assert!(receiver.drain().is_empty());
    }

    #[test]
    fn lagging_subscriber_keeps_newest_events() {
        let bus = EventBus::new(2);
        let mut receiver = bus.subscribe();
        for delta in 1..=5 {
            bus.publish(changed("p1", delta));
        }
        assert_eq!(receiver.drain(), vec![changed("p1", 4), changed("p1", 5)]);
    }
}
