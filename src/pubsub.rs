//! Pub/Sub Module
//!
//! Topic fan-out with a bounded delivery queue per subscriber.
//!
//! A publisher never blocks on a subscriber: a full queue rejects the new
//! message for that subscriber only, and a subscriber whose receiver is gone
//! is unregistered on the next publish to its topic.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use crossbeam::channel::{self, Receiver, RecvTimeoutError, Sender, TrySendError};
use parking_lot::RwLock;

/// Identifies one subscription
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(pub u64);

/// A message delivered to a subscriber
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub topic: String,
    pub body: String,
}

impl Message {
    /// Wire form pushed to subscribed connections
    pub fn to_line(&self) -> String {
        format!("[PUB][{}] {}\n", self.topic, self.body)
    }
}

/// Receiving end of a subscription
#[derive(Debug)]
pub struct Subscription {
    id: SubscriptionId,
    topic: String,
    receiver: Receiver<Message>,
}

impl Subscription {
    pub fn id(&self) -> SubscriptionId {
        self.id
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }

    pub fn receiver(&self) -> &Receiver<Message> {
        &self.receiver
    }

    /// Block until a message arrives; `None` once the broker dropped us
    pub fn recv(&self) -> Option<Message> {
        self.receiver.recv().ok()
    }

    /// Wait up to `timeout`; `None` on timeout or disconnect
    pub fn recv_timeout(&self, timeout: Duration) -> Option<Message> {
        match self.receiver.recv_timeout(timeout) {
            Ok(message) => Some(message),
            Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => None,
        }
    }

    pub fn try_recv(&self) -> Option<Message> {
        self.receiver.try_recv().ok()
    }
}

struct Subscriber {
    id: SubscriptionId,
    sender: Sender<Message>,
}

/// Topic broker
pub struct PubSub {
    /// Subscribers by topic
    topics: RwLock<HashMap<String, Vec<Subscriber>>>,

    /// Counter for generating subscription IDs
    next_id: AtomicU64,

    /// Capacity of each subscriber's queue
    queue_capacity: usize,
}

impl PubSub {
    pub fn new(queue_capacity: usize) -> Self {
        Self {
            topics: RwLock::new(HashMap::new()),
            next_id: AtomicU64::new(1),
            queue_capacity: queue_capacity.max(1),
        }
    }

    /// Register interest in `topic`
    pub fn subscribe(&self, topic: &str) -> Subscription {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::SeqCst));
        let (sender, receiver) = channel::bounded(self.queue_capacity);

        self.topics
            .write()
            .entry(topic.to_string())
            .or_default()
            .push(Subscriber { id, sender });

        tracing::debug!("Subscription {} registered for topic {}", id.0, topic);

        Subscription {
            id,
            topic: topic.to_string(),
            receiver,
        }
    }

    /// Remove a subscription (no-op if already gone)
    pub fn unsubscribe(&self, id: SubscriptionId) {
        let mut topics = self.topics.write();
        topics.retain(|_, subscribers| {
            subscribers.retain(|s| s.id != id);
            !subscribers.is_empty()
        });
    }

    /// Hand `body` to every subscriber of `topic`
    ///
    /// Returns how many subscribers accepted the message.
    pub fn publish(&self, topic: &str, body: &str) -> usize {
        let mut delivered = 0;
        let mut disconnected = Vec::new();

        {
            let topics = self.topics.read();
            let Some(subscribers) = topics.get(topic) else {
                return 0;
            };

            for subscriber in subscribers {
                let message = Message {
                    topic: topic.to_string(),
                    body: body.to_string(),
                };
                match subscriber.sender.try_send(message) {
                    Ok(()) => delivered += 1,
                    Err(TrySendError::Full(_)) => {
                        tracing::debug!(
                            "Subscriber {} queue full, dropping message on {}",
                            subscriber.id.0,
                            topic
                        );
                    }
                    Err(TrySendError::Disconnected(_)) => disconnected.push(subscriber.id),
                }
            }
        }

        for id in disconnected {
            self.unsubscribe(id);
        }

        delivered
    }

    /// Number of live subscribers on `topic`
    pub fn subscriber_count(&self, topic: &str) -> usize {
        self.topics.read().get(topic).map_or(0, Vec::len)
    }

    /// Number of topics with at least one subscriber
    pub fn topic_count(&self) -> usize {
        self.topics.read().len()
    }
}

impl Default for PubSub {
    fn default() -> Self {
        Self::new(256)
    }
}
