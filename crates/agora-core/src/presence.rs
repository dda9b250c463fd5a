//! Ephemeral "who is typing" presence with TTL expiry.
//!
//! Nothing here touches storage: the roster is a per-post in-memory map of
//! `(user -> last signal)` entries, refreshed by typing signals, expired
//! after a fixed idle window, and swept on a fixed period. Best-effort,
//! last-write-wins state -- no persistence, no replay, no ordering
//! guarantee.
//!
//! Reads never trust the map blindly: a request arriving just before a
//! sweep must not see entries that are already past the idle window, so
//! [`TypingTracker::typing_users`] re-checks freshness at query time.
//!
//! The tracker is a constructor-injected service with an explicit
//! lifecycle: spawn [`TypingTracker::run_sweeper`] at startup, call
//! [`TypingTracker::shutdown`] at teardown. Tests build isolated instances
//! with short windows and drive the paused tokio clock.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tokio::sync::{Notify, RwLock};
use tokio::time::Instant;
use tracing::debug;

use agora_types::{ForumEvent, PostId, TypingUser, UserId, events::TypingChanged};

use crate::bus::EventBus;

/// How long a typing entry stays visible without a fresh signal.
pub const TYPING_IDLE: Duration = Duration::from_secs(5);

/// How often the background sweep runs.
pub const SWEEP_PERIOD: Duration = Duration::from_secs(2);

/// One user's presence on one post.
#[derive(Debug, Clone)]
struct TypingEntry {
    display_name: String,
    last_signal: Instant,
}

/// Tracks who is typing on which post right now.
pub struct TypingTracker {
    bus: Arc<EventBus>,
    idle: Duration,
    sweep_period: Duration,
    entries: RwLock<HashMap<PostId, HashMap<UserId, TypingEntry>>>,
    stopped: AtomicBool,
    stop_notify: Notify,
}

impl TypingTracker {
    /// Build a tracker with the reference timing (5 s idle, 2 s sweep).
    pub fn new(bus: Arc<EventBus>) -> Self {
        Self::with_timing(bus, TYPING_IDLE, SWEEP_PERIOD)
    }

    /// Build a tracker with explicit timing. Tests use short windows.
    pub fn with_timing(bus: Arc<EventBus>, idle: Duration, sweep_period: Duration) -> Self {
        Self {
            bus,
            idle,
            sweep_period,
            entries: RwLock::new(HashMap::new()),
            stopped: AtomicBool::new(false),
            stop_notify: Notify::new(),
        }
    }

    /// Record a typing signal and immediately broadcast the new roster.
    /// Upserts: a repeated signal refreshes the entry's freshness.
    pub async fn start_typing(&self, post_id: PostId, user_id: UserId, display_name: &str) {
        let roster = {
            let mut entries = self.entries.write().await;
            let post_entries = entries.entry(post_id).or_default();
            post_entries.insert(
                user_id,
                TypingEntry {
                    display_name: display_name.to_owned(),
                    last_signal: Instant::now(),
                },
            );
            fresh_roster(post_entries, self.idle)
        };
        self.publish_roster(post_id, roster);
    }

    /// Remove a user's entry and broadcast the shrunken roster.
    pub async fn stop_typing(&self, post_id: PostId, user_id: UserId) {
        let roster = {
            let mut entries = self.entries.write().await;
            let Some(post_entries) = entries.get_mut(&post_id) else {
                return;
            };
            if post_entries.remove(&user_id).is_none() {
                return;
            }
            let roster = fresh_roster(post_entries, self.idle);
            if post_entries.is_empty() {
                entries.remove(&post_id);
            }
            roster
        };
        self.publish_roster(post_id, roster);
    }

    /// Everyone currently typing on a post.
    ///
    /// Entries past the idle window are filtered out here even if the
    /// sweep has not caught up with them yet.
    pub async fn typing_users(&self, post_id: PostId) -> Vec<TypingUser> {
        let entries = self.entries.read().await;
        entries
            .get(&post_id)
            .map(|post_entries| fresh_roster(post_entries, self.idle))
            .unwrap_or_default()
    }

    /// Number of posts with a tracked roster. Sweeps drop empty per-post
    /// maps so this stays bounded under post churn.
    pub async fn tracked_posts(&self) -> usize {
        self.entries.read().await.len()
    }

    /// Run the periodic sweep until [`TypingTracker::shutdown`].
    pub async fn run_sweeper(self: Arc<Self>) {
        loop {
            tokio::select! {
                () = tokio::time::sleep(self.sweep_period) => {
                    if self.stopped.load(Ordering::SeqCst) {
                        break;
                    }
                    self.sweep().await;
                }
                () = self.stop_notify.notified() => break,
            }
        }
        debug!("typing sweeper stopped");
    }

    /// Stop the sweeper task.
    pub fn shutdown(&self) {
        self.stopped.store(true, Ordering::SeqCst);
        self.stop_notify.notify_waiters();
    }

    /// Drop idle entries and empty per-post maps, broadcasting the roster
    /// of every post that changed.
    async fn sweep(&self) {
        let mut changed: Vec<(PostId, Vec<TypingUser>)> = Vec::new();
        {
            let mut entries = self.entries.write().await;
            entries.retain(|post_id, post_entries| {
                let before = post_entries.len();
                post_entries.retain(|_, entry| entry.last_signal.elapsed() <= self.idle);
                if post_entries.len() < before {
                    changed.push((*post_id, fresh_roster(post_entries, self.idle)));
                }
                !post_entries.is_empty()
            });
        }
        for (post_id, roster) in changed {
            self.publish_roster(post_id, roster);
        }
    }

    fn publish_roster(&self, post_id: PostId, users: Vec<TypingUser>) {
        self.bus
            .publish(ForumEvent::UserTyping(TypingChanged { post_id, users }));
    }
}

/// The entries still within the idle window, as wire-shaped roster items.
fn fresh_roster(post_entries: &HashMap<UserId, TypingEntry>, idle: Duration) -> Vec<TypingUser> {
    post_entries
        .iter()
        .filter(|(_, entry)| entry.last_signal.elapsed() <= idle)
        .map(|(user_id, entry)| TypingUser {
            user_id: *user_id,
            display_name: entry.display_name.clone(),
        })
        .collect()
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    fn tracker(idle_ms: u64, sweep_ms: u64) -> Arc<TypingTracker> {
        Arc::new(TypingTracker::with_timing(
            Arc::new(EventBus::new()),
            Duration::from_millis(idle_ms),
            Duration::from_millis(sweep_ms),
        ))
    }

    #[tokio::test(start_paused = true)]
    async fn fresh_signals_are_visible() {
        let tracker = tracker(5_000, 2_000);
        let post = PostId::new();
        let user = UserId::new();
        tracker.start_typing(post, user, "Ada").await;

        let roster = tracker.typing_users(post).await;
        assert_eq!(roster.len(), 1);
        assert_eq!(roster.first().map(|u| u.user_id), Some(user));
    }

    #[tokio::test(start_paused = true)]
    async fn stale_entries_are_invisible_before_the_sweep() {
        let tracker = tracker(5_000, 2_000);
        let post = PostId::new();
        tracker.start_typing(post, UserId::new(), "Ada").await;

        // Past the idle window but before any sweep ran: the read must
        // filter the entry out on its own.
        tokio::time::advance(Duration::from_millis(5_001)).await;
        assert!(tracker.typing_users(post).await.is_empty());
        assert_eq!(tracker.tracked_posts().await, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn repeated_signals_refresh_freshness() {
        let tracker = tracker(5_000, 2_000);
        let post = PostId::new();
        let user = UserId::new();
        tracker.start_typing(post, user, "Ada").await;

        tokio::time::advance(Duration::from_millis(4_000)).await;
        tracker.start_typing(post, user, "Ada").await;
        tokio::time::advance(Duration::from_millis(4_000)).await;

        // 8 s after the first signal but only 4 s after the refresh.
        assert_eq!(tracker.typing_users(post).await.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn stop_typing_removes_the_entry_and_the_empty_map() {
        let tracker = tracker(5_000, 2_000);
        let post = PostId::new();
        let user = UserId::new();
        tracker.start_typing(post, user, "Ada").await;
        tracker.stop_typing(post, user).await;

        assert!(tracker.typing_users(post).await.is_empty());
        assert_eq!(tracker.tracked_posts().await, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn sweeper_drops_idle_entries_and_empty_maps() {
        let tracker = tracker(100, 40);
        let handle = tokio::spawn(Arc::clone(&tracker).run_sweeper());

        let post = PostId::new();
        tracker.start_typing(post, UserId::new(), "Ada").await;
        assert_eq!(tracker.tracked_posts().await, 1);

        // Paused-clock sleeps auto-advance time; several sweep periods
        // elapse and the expired roster is dropped entirely.
        tokio::time::sleep(Duration::from_millis(500)).await;
        assert_eq!(tracker.tracked_posts().await, 0);

        tracker.shutdown();
        let _ = handle.await;
    }

    #[tokio::test(start_paused = true)]
    async fn roster_changes_are_broadcast() {
        let bus = Arc::new(EventBus::new());
        let tracker = TypingTracker::with_timing(
            Arc::clone(&bus),
            Duration::from_millis(5_000),
            Duration::from_millis(2_000),
        );
        let mut rx = bus.subscribe();
        let post = PostId::new();
        let user = UserId::new();

        tracker.start_typing(post, user, "Ada").await;
        tracker.stop_typing(post, user).await;

        let first = rx.try_recv().ok();
        let second = rx.try_recv().ok();
        match (first, second) {
            (
                Some(ForumEvent::UserTyping(start)),
                Some(ForumEvent::UserTyping(stop)),
            ) => {
                assert_eq!(start.post_id, post);
                assert_eq!(start.users.len(), 1);
                assert!(stop.users.is_empty());
            }
            other => panic!("expected two typing events, got {other:?}"),
        }
    }
}
