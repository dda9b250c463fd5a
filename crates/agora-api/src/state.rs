//! Shared application state for the API server.
//!
//! [`AppState`] wires every service to one store and one bus. It is built
//! once at startup, wrapped in [`Arc`], and injected via Axum's `State`
//! extractor. The one thing that is **not** shared is the batch loader
//! cache: [`AppState::loaders`] builds a fresh bundle per request so
//! memoized lookups never leak between unrelated callers.

use std::sync::Arc;

use agora_core::bookmarks::BookmarkService;
use agora_core::bus::EventBus;
use agora_core::comments::CommentService;
use agora_core::feeds::FeedService;
use agora_core::follows::FollowService;
use agora_core::loader::Loaders;
use agora_core::notifications::NotificationService;
use agora_core::posts::PostService;
use agora_core::presence::TypingTracker;
use agora_core::store::Store;
use agora_core::topics::TopicService;
use agora_core::votes::VoteService;

/// Everything the handlers need, shared across requests.
pub struct AppState {
    /// The storage backend.
    pub store: Arc<dyn Store>,
    /// The process-wide fan-out bus.
    pub bus: Arc<EventBus>,
    /// The typing presence tracker (its sweeper runs as a background task).
    pub typing: Arc<TypingTracker>,
    /// Post lifecycle operations.
    pub posts: PostService,
    /// Comment hierarchy operations.
    pub comments: CommentService,
    /// Vote casting/removal and aggregates.
    pub votes: VoteService,
    /// Bookmark operations.
    pub bookmarks: BookmarkService,
    /// Cursor-paginated feeds.
    pub feeds: FeedService,
    /// Topics and subscriptions.
    pub topics: TopicService,
    /// Follow edges.
    pub follows: FollowService,
    /// Notification reads and acknowledgements.
    pub notifications: NotificationService,
}

impl AppState {
    /// Wire all services to one store, bus, and typing tracker.
    pub fn new(store: Arc<dyn Store>, bus: Arc<EventBus>, typing: Arc<TypingTracker>) -> Self {
        Self {
            posts: PostService::new(Arc::clone(&store), Arc::clone(&bus)),
            comments: CommentService::new(Arc::clone(&store), Arc::clone(&bus)),
            votes: VoteService::new(Arc::clone(&store), Arc::clone(&bus)),
            bookmarks: BookmarkService::new(Arc::clone(&store)),
            feeds: FeedService::new(Arc::clone(&store)),
            topics: TopicService::new(Arc::clone(&store)),
            follows: FollowService::new(Arc::clone(&store), Arc::clone(&bus)),
            notifications: NotificationService::new(Arc::clone(&store)),
            store,
            bus,
            typing,
        }
    }

    /// A fresh batch loader bundle scoped to one request.
    pub fn loaders(&self) -> Loaders {
        Loaders::new(&self.store)
    }
}
