use std::collections::{HashMap, HashSet};
use std::sync::{Arc, RwLock};

use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tracing::{debug, warn};
use uuid::Uuid;

use parley_types::models::Message;

/// Per-subscription delivery queue depth. When a subscriber falls this far
/// behind, further messages are dropped for it; the search API is the
/// recovery path, not a replay buffer here.
const SUBSCRIPTION_BUFFER: usize = 1024;

struct Subscription {
    channel_ids: HashSet<String>,
    tx: mpsc::Sender<Message>,
}

struct BroadcasterInner {
    subscriptions: RwLock<HashMap<Uuid, Subscription>>,
}

/// Publish/subscribe hub for newly posted messages.
///
/// Each subscription declares a channel-id filter set and gets its own
/// bounded queue. `publish` is synchronous and never blocks: a full queue
/// means that one subscriber misses the message, nothing else stalls.
#[derive(Clone)]
pub struct Broadcaster {
    inner: Arc<BroadcasterInner>,
}

impl Broadcaster {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(BroadcasterInner {
                subscriptions: RwLock::new(HashMap::new()),
            }),
        }
    }

    /// Register a listener for messages posted to any of `channel_ids`.
    /// An empty set is legal and simply never matches anything.
    pub fn subscribe(&self, channel_ids: impl IntoIterator<Item = String>) -> SubscriptionHandle {
        self.subscribe_with_capacity(channel_ids, SUBSCRIPTION_BUFFER)
    }

    fn subscribe_with_capacity(
        &self,
        channel_ids: impl IntoIterator<Item = String>,
        capacity: usize,
    ) -> SubscriptionHandle {
        let id = Uuid::new_v4();
        let (tx, rx) = mpsc::channel(capacity);
        let channel_ids: HashSet<String> = channel_ids.into_iter().collect();

        debug!("subscription {} registered for {} channels", id, channel_ids.len());

        self.inner
            .subscriptions
            .write()
            .expect("subscription lock poisoned")
            .insert(id, Subscription { channel_ids, tx });

        SubscriptionHandle {
            id,
            rx,
            broadcaster: self.clone(),
        }
    }

    /// Deliver `message` to every subscription whose filter set contains its
    /// channel id. Fire-and-forget per subscriber: full queues drop, closed
    /// receivers are swept out of the registry after the pass.
    pub fn publish(&self, message: &Message) {
        let mut closed = Vec::new();

        {
            let subscriptions = self
                .inner
                .subscriptions
                .read()
                .expect("subscription lock poisoned");

            for (id, sub) in subscriptions.iter() {
                if !sub.channel_ids.contains(&message.channel_id) {
                    continue;
                }
                match sub.tx.try_send(message.clone()) {
                    Ok(()) => {}
                    Err(TrySendError::Full(_)) => {
                        warn!(
                            "subscription {} queue full, dropping message {}",
                            id, message.id
                        );
                    }
                    Err(TrySendError::Closed(_)) => closed.push(*id),
                }
            }
        }

        if !closed.is_empty() {
            let mut subscriptions = self
                .inner
                .subscriptions
                .write()
                .expect("subscription lock poisoned");
            for id in closed {
                subscriptions.remove(&id);
            }
        }
    }

    /// Remove a subscription. Idempotent; messages already queued to the
    /// handle may still be drained, but nothing new is delivered.
    pub fn unsubscribe(&self, id: Uuid) {
        let removed = self
            .inner
            .subscriptions
            .write()
            .expect("subscription lock poisoned")
            .remove(&id);
        if removed.is_some() {
            debug!("subscription {} removed", id);
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.inner
            .subscriptions
            .read()
            .expect("subscription lock poisoned")
            .len()
    }
}

impl Default for Broadcaster {
    fn default() -> Self {
        Self::new()
    }
}

/// Receiving end of a subscription. Dropping the handle unsubscribes, so a
/// closed connection cleans up after itself.
pub struct SubscriptionHandle {
    id: Uuid,
    rx: mpsc::Receiver<Message>,
    broadcaster: Broadcaster,
}

impl SubscriptionHandle {
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Next delivered message; `None` once unsubscribed and drained.
    pub async fn recv(&mut self) -> Option<Message> {
        self.rx.recv().await
    }
}

impl Drop for SubscriptionHandle {
    fn drop(&mut self) {
        self.broadcaster.unsubscribe(self.id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn message(id: &str, channel_id: &str, text: &str) -> Message {
        Message {
            id: id.into(),
            channel_id: channel_id.into(),
            author_id: "u1".into(),
            date: chrono::Utc::now(),
            text: text.into(),
        }
    }

    #[tokio::test]
    async fn test_delivers_only_matching_channels() {
        let broadcaster = Broadcaster::new();
        let mut handle = broadcaster.subscribe(vec!["c1".to_string()]);

        broadcaster.publish(&message("m1", "c1", "for us"));
        broadcaster.publish(&message("m2", "c2", "not for us"));
        broadcaster.publish(&message("m3", "c1", "for us too"));

        assert_eq!(handle.recv().await.unwrap().id, "m1");
        assert_eq!(handle.recv().await.unwrap().id, "m3");
    }

    #[tokio::test]
    async fn test_two_subscribers_each_get_everything_in_order() {
        let broadcaster = Broadcaster::new();
        let mut fast = broadcaster.subscribe(vec!["c1".to_string()]);
        let mut slow = broadcaster.subscribe(vec!["c1".to_string()]);

        for i in 0..5 {
            broadcaster.publish(&message(&format!("m{}", i), "c1", "hi"));
        }

        // The fast subscriber drains everything before the slow one starts.
        for i in 0..5 {
            assert_eq!(fast.recv().await.unwrap().id, format!("m{}", i));
        }
        for i in 0..5 {
            assert_eq!(slow.recv().await.unwrap().id, format!("m{}", i));
        }
    }

    #[tokio::test]
    async fn test_unsubscribe_stops_delivery_and_is_idempotent() {
        let broadcaster = Broadcaster::new();
        let mut handle = broadcaster.subscribe(vec!["c1".to_string()]);
        let id = handle.id();

        broadcaster.publish(&message("m1", "c1", "before"));
        broadcaster.unsubscribe(id);
        broadcaster.unsubscribe(id); // no-op
        broadcaster.publish(&message("m2", "c1", "after"));

        // Queued delivery still drains, then the stream ends.
        assert_eq!(handle.recv().await.unwrap().id, "m1");
        assert!(handle.recv().await.is_none());
    }

    #[tokio::test]
    async fn test_full_queue_drops_without_blocking_publish() {
        let broadcaster = Broadcaster::new();
        let mut handle = broadcaster.subscribe_with_capacity(vec!["c1".to_string()], 2);

        broadcaster.publish(&message("m1", "c1", "kept"));
        broadcaster.publish(&message("m2", "c1", "kept"));
        broadcaster.publish(&message("m3", "c1", "dropped"));

        assert_eq!(handle.recv().await.unwrap().id, "m1");
        assert_eq!(handle.recv().await.unwrap().id, "m2");

        // m3 was dropped; the next publish shows the queue moved on.
        broadcaster.publish(&message("m4", "c1", "kept"));
        assert_eq!(handle.recv().await.unwrap().id, "m4");
    }

    #[tokio::test]
    async fn test_empty_filter_set_never_delivers() {
        let broadcaster = Broadcaster::new();
        let handle = broadcaster.subscribe(Vec::new());

        broadcaster.publish(&message("m1", "c1", "hello"));
        broadcaster.publish(&message("m2", "c2", "hello"));

        drop(handle);
        assert_eq!(broadcaster.subscriber_count(), 0);
    }

    #[tokio::test]
    async fn test_dropping_handle_unsubscribes() {
        let broadcaster = Broadcaster::new();
        let handle = broadcaster.subscribe(vec!["c1".to_string()]);
        assert_eq!(broadcaster.subscriber_count(), 1);

        drop(handle);
        assert_eq!(broadcaster.subscriber_count(), 0);

        // Publishing to nobody is fine.
        broadcaster.publish(&message("m1", "c1", "void"));
    }

    #[tokio::test]
    async fn test_closed_receivers_are_swept_on_publish() {
        let broadcaster = Broadcaster::new();
        let mut handle = broadcaster.subscribe(vec!["c1".to_string()]);
        handle.rx.close();

        broadcaster.publish(&message("m1", "c1", "sweeps"));
        assert_eq!(broadcaster.subscriber_count(), 0);
    }
}
