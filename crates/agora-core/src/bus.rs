//! Topic-keyed publish/subscribe fan-out for live updates.
//!
//! The bus is transport-agnostic: it validates and broadcasts
//! [`ForumEvent`]s, and each transport (`WebSocket` iterator, SSE stream)
//! holds its own [`broadcast::Receiver`] and applies its connection's
//! [`EventFilter`](agora_types::EventFilter) before writing frames.
//!
//! Publishing is best-effort and decoupled from the triggering mutation:
//! zero receivers is success, a slow receiver lags and skips, and a dead
//! receiver affects nobody else. Dropping a receiver is the deregistration
//! -- a closed connection cannot leak a listener.
//!
//! The bus is process-wide shared state with an explicit lifecycle: built
//! once at startup, constructor-injected into every service, torn down by
//! dropping the last clone. Tests build isolated instances per case.

use tokio::sync::broadcast;
use tracing::{debug, warn};

use agora_types::ForumEvent;

/// Capacity of the broadcast channel.
///
/// A subscriber that falls more than this many events behind receives
/// [`broadcast::error::RecvError::Lagged`] and resumes from the newest
/// event -- live views tolerate gaps, so skipping is the right behavior.
const BUS_CAPACITY: usize = 256;

/// The process-wide event fan-out bus.
#[derive(Debug, Clone)]
pub struct EventBus {
    tx: broadcast::Sender<ForumEvent>,
}

impl EventBus {
    /// Create a bus with the default capacity.
    pub fn new() -> Self {
        Self::with_capacity(BUS_CAPACITY)
    }

    /// Create a bus with an explicit channel capacity.
    pub fn with_capacity(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    /// Subscribe to every published event.
    ///
    /// Filtering happens at the transport: receivers see the full stream
    /// and drop events their connection's filter rejects.
    pub fn subscribe(&self) -> broadcast::Receiver<ForumEvent> {
        self.tx.subscribe()
    }

    /// Validate and broadcast one event.
    ///
    /// Returns the number of receivers the event was delivered to. A
    /// structurally inconsistent payload is logged and dropped (returns 0)
    /// rather than fanned out -- it would match the wrong filters. Zero
    /// receivers is not an error, and no failure here ever propagates to
    /// the mutation that triggered the publish.
    pub fn publish(&self, event: ForumEvent) -> usize {
        if let Err(reason) = event.validate() {
            warn!(kind = event.kind(), %reason, "dropping invalid event");
            return 0;
        }
        let kind = event.kind();
        // send returns Err only when there are zero receivers, which is
        // normal when no live clients are connected.
        let delivered = self.tx.send(event).unwrap_or(0);
        debug!(kind, delivered, "published event");
        delivered
    }

    /// Number of currently registered receivers.
    pub fn receiver_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use agora_types::events::PostChanged;
    use agora_types::{EventFilter, PostId, TopicId, UserId};
    use chrono::Utc;

    use super::*;

    fn post_event(post_id: PostId) -> ForumEvent {
        ForumEvent::PostUpdated(PostChanged {
            post: agora_types::Post {
                id: post_id,
                author_id: UserId::new(),
                topic_id: TopicId::new(),
                title: String::from("t"),
                body: String::from("b"),
                pinned: false,
                locked: false,
                view_count: 0,
                created_at: Utc::now(),
                updated_at: Utc::now(),
                deleted_at: None,
            },
        })
    }

    #[tokio::test]
    async fn publish_with_no_receivers_is_success() {
        let bus = EventBus::new();
        assert_eq!(bus.publish(post_event(PostId::new())), 0);
    }

    #[tokio::test]
    async fn events_reach_all_subscribers() {
        let bus = EventBus::new();
        let mut first = bus.subscribe();
        let mut second = bus.subscribe();
        let post_id = PostId::new();
        assert_eq!(bus.publish(post_event(post_id)), 2);

        for rx in [&mut first, &mut second] {
            let event = rx.recv().await.ok();
            assert!(matches!(event, Some(ForumEvent::PostUpdated(_))));
        }
    }

    #[tokio::test]
    async fn dropped_receiver_deregisters() {
        let bus = EventBus::new();
        let rx = bus.subscribe();
        assert_eq!(bus.receiver_count(), 1);
        drop(rx);
        assert_eq!(bus.receiver_count(), 0);
        assert_eq!(bus.publish(post_event(PostId::new())), 0);
    }

    #[tokio::test]
    async fn filters_isolate_posts_across_subscribers() {
        let bus = EventBus::new();
        let mut rx = bus.subscribe();
        let watched = PostId::new();
        let other = PostId::new();
        let filter = EventFilter::for_post(watched);

        bus.publish(post_event(other));
        bus.publish(post_event(watched));

        let mut delivered = Vec::new();
        while let Ok(event) = rx.try_recv() {
            if event.matches(&filter) {
                delivered.push(event);
            }
        }
        assert_eq!(delivered.len(), 1);
    }
}
