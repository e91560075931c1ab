//! Subscriber registry.
//!
//! Tracks change-feed subscribers by topic and fans events out to their
//! queues. Shared by the PocketBase realtime reader and the in-memory backend.

use basket_engine::ChangeEvent;
use dashmap::DashMap;

use crate::api::{EventSender, SubscriptionId};

/// A single registered subscriber.
#[derive(Debug)]
pub struct Subscriber {
    /// Unique identifier for this subscription
    pub id: SubscriptionId,
    /// Topic the subscriber listens on
    pub topic: String,
    /// Queue events are pushed to
    pub sender: EventSender,
}

/// Manages active change-feed subscribers.
///
/// Thread-safe and can be shared via `Arc`.
#[derive(Debug, Default)]
pub struct SubscriberRegistry {
    /// All subscribers, keyed by subscription ID.
    subscribers: DashMap<SubscriptionId, Subscriber>,
    /// Index of subscription IDs by topic.
    by_topic: DashMap<String, Vec<SubscriptionId>>,
}

impl SubscriberRegistry {
    pub fn new() -> Self {
        Self {
            subscribers: DashMap::new(),
            by_topic: DashMap::new(),
        }
    }

    /// Register a subscriber on a topic.
    ///
    /// Returns the subscription ID.
    pub fn register(&self, topic: impl Into<String>, sender: EventSender) -> SubscriptionId {
        let topic = topic.into();
        let id = uuid::Uuid::new_v4().to_string();

        self.subscribers.insert(
            id.clone(),
            Subscriber {
                id: id.clone(),
                topic: topic.clone(),
                sender,
            },
        );

        self.by_topic
            .entry(topic.clone())
            .or_default()
            .push(id.clone());

        tracing::debug!(subscription = %id, topic = %topic, "Subscriber registered");

        id
    }

    /// Unregister a subscriber, dropping its sender.
    ///
    /// Returns whether the subscription existed.
    pub fn unregister(&self, id: &str) -> bool {
        let Some((_, subscriber)) = self.subscribers.remove(id) else {
            return false;
        };

        if let Some(mut ids) = self.by_topic.get_mut(&subscriber.topic) {
            ids.retain(|existing| existing != id);
        }
        self.by_topic
            .remove_if(&subscriber.topic, |_, ids| ids.is_empty());

        tracing::debug!(subscription = %id, topic = %subscriber.topic, "Subscriber unregistered");
        true
    }

    /// Push an event to every subscriber of `topic`.
    ///
    /// Subscribers whose queue is closed are unregistered. Returns the number
    /// of queues that accepted the event.
    pub fn dispatch(&self, topic: &str, event: &ChangeEvent) -> usize {
        let ids = match self.by_topic.get(topic) {
            Some(ids) => ids.value().clone(),
            None => return 0,
        };

        let mut delivered = 0;
        let mut closed = Vec::new();

        for id in ids {
            if let Some(subscriber) = self.subscribers.get(&id) {
                if subscriber.sender.send(event.clone()).is_ok() {
                    delivered += 1;
                } else {
                    closed.push(id);
                }
            }
        }

        for id in closed {
            self.unregister(&id);
        }

        tracing::trace!(topic = %topic, recipients = delivered, "Dispatched change event");

        delivered
    }

    /// Topics with at least one subscriber, sorted.
    pub fn topics(&self) -> Vec<String> {
        let mut topics: Vec<String> = self.by_topic.iter().map(|e| e.key().clone()).collect();
        topics.sort();
        topics
    }

    /// Topic a subscription is registered on.
    pub fn topic_of(&self, id: &str) -> Option<String> {
        self.subscribers.get(id).map(|s| s.topic.clone())
    }

    pub fn subscription_count(&self) -> usize {
        self.subscribers.len()
    }

    /// Number of subscriptions on one topic.
    pub fn topic_subscription_count(&self, topic: &str) -> usize {
        self.by_topic.get(topic).map_or(0, |ids| ids.len())
    }

    pub fn topic_count(&self) -> usize {
        self.by_topic.len()
    }

    pub fn is_empty(&self) -> bool {
        self.subscribers.is_empty()
    }
}
