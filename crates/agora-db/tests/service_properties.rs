//! End-to-end property tests for the core services over [`MemoryStore`].
//!
//! These cover the behavioral contract of the consistency layer: vote
//! uniqueness and live-sum aggregates, the no-op repeat vote, the
//! remove-vote/unbookmark asymmetry, the comment depth bound and same-post
//! parenting, no-skip/no-dup pagination under duplicate timestamps, page
//! size clamping, and cross-post event isolation.

// Test code panics on failure by design.
#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::missing_panics_doc,
    clippy::too_many_lines,
    clippy::indexing_slicing,
    clippy::arithmetic_side_effects
)]

use std::sync::Arc;

use chrono::{TimeZone, Utc};

use agora_core::bookmarks::BookmarkService;
use agora_core::bus::EventBus;
use agora_core::comments::{CommentService, child_path};
use agora_core::error::CoreError;
use agora_core::feeds::FeedService;
use agora_core::follows::FollowService;
use agora_core::posts::{PostDraft, PostService};
use agora_core::store::Store;
use agora_core::topics::TopicService;
use agora_core::votes::VoteService;
use agora_db::MemoryStore;
use agora_types::{
    Comment, CommentId, CommentOrder, NotificationKind, Post, PostId, TargetKind, Topic, TopicId,
    User, UserId, VoteDirection,
};

/// Everything a test needs: one isolated store, bus, and service set.
struct Fixture {
    store: Arc<dyn Store>,
    bus: Arc<EventBus>,
    posts: PostService,
    comments: CommentService,
    votes: VoteService,
    bookmarks: BookmarkService,
    feeds: FeedService,
    topics: TopicService,
    follows: FollowService,
    topic: Topic,
}

impl Fixture {
    async fn new() -> Self {
        let store: Arc<dyn Store> = Arc::new(MemoryStore::new());
        let bus = Arc::new(EventBus::new());
        let topic = Topic {
            id: TopicId::new(),
            slug: String::from("general"),
            name: String::from("General"),
            subscriber_count: 0,
            created_at: Utc::now(),
        };
        store.insert_topic(topic.clone()).await.unwrap();
        Self {
            posts: PostService::new(Arc::clone(&store), Arc::clone(&bus)),
            comments: CommentService::new(Arc::clone(&store), Arc::clone(&bus)),
            votes: VoteService::new(Arc::clone(&store), Arc::clone(&bus)),
            bookmarks: BookmarkService::new(Arc::clone(&store)),
            feeds: FeedService::new(Arc::clone(&store)),
            topics: TopicService::new(Arc::clone(&store)),
            follows: FollowService::new(Arc::clone(&store), Arc::clone(&bus)),
            store,
            bus,
            topic,
        }
    }

    async fn user(&self, name: &str) -> User {
        let user = User {
            id: UserId::new(),
            username: name.to_lowercase(),
            display_name: name.to_owned(),
            reputation: 0,
            verified: false,
            admin: false,
            active: true,
            created_at: Utc::now(),
        };
        self.store.insert_user(user.clone()).await.unwrap();
        user
    }

    async fn post(&self, author: &User, title: &str) -> Post {
        self.posts
            .create_post(
                author,
                PostDraft {
                    topic_id: self.topic.id,
                    title: title.to_owned(),
                    body: String::from("body"),
                },
            )
            .await
            .unwrap()
    }

    async fn reputation_of(&self, user: UserId) -> i64 {
        self.store.user_by_id(user).await.unwrap().unwrap().reputation
    }
}

// ---------------------------------------------------------------------------
// Votes
// ---------------------------------------------------------------------------

#[tokio::test]
async fn vote_count_always_equals_the_live_sum() {
    let fx = Fixture::new().await;
    let author = fx.user("Author").await;
    let (u2, u3) = (fx.user("U2").await, fx.user("U3").await);
    let post = fx.post(&author, "hello").await;
    let target = post.id.into_inner();

    let up = fx
        .votes
        .cast_vote(&u2, target, TargetKind::Post, VoteDirection::Up)
        .await
        .unwrap();
    assert_eq!(up.vote_count, 1);

    let down = fx
        .votes
        .cast_vote(&u3, target, TargetKind::Post, VoteDirection::Down)
        .await
        .unwrap();
    assert_eq!(down.vote_count, 0);

    // U2 flips: still one row per (user, target), sum moves by 2.
    let flipped = fx
        .votes
        .cast_vote(&u2, target, TargetKind::Post, VoteDirection::Down)
        .await
        .unwrap();
    assert_eq!(flipped.vote_count, -2);

    let rows = fx
        .store
        .votes_by_keys(&[(u2.id, target, TargetKind::Post)])
        .await
        .unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].direction, VoteDirection::Down);

    let removed = fx
        .votes
        .remove_vote(&u2, target, TargetKind::Post)
        .await
        .unwrap();
    assert_eq!(removed.vote_count, -1);
    assert_eq!(removed.user_vote, None);
}

#[tokio::test]
async fn casting_the_same_direction_twice_changes_nothing() {
    let fx = Fixture::new().await;
    let author = fx.user("Author").await;
    let voter = fx.user("Voter").await;
    let post = fx.post(&author, "hello").await;
    let target = post.id.into_inner();

    let first = fx
        .votes
        .cast_vote(&voter, target, TargetKind::Post, VoteDirection::Up)
        .await
        .unwrap();
    let row_before = fx
        .store
        .vote_by_key(voter.id, target, TargetKind::Post)
        .await
        .unwrap()
        .unwrap();

    let second = fx
        .votes
        .cast_vote(&voter, target, TargetKind::Post, VoteDirection::Up)
        .await
        .unwrap();
    let row_after = fx
        .store
        .vote_by_key(voter.id, target, TargetKind::Post)
        .await
        .unwrap()
        .unwrap();

    // No toggle, no new row, identical aggregate.
    assert_eq!(first.vote_count, second.vote_count);
    assert_eq!(row_before, row_after);
}

#[tokio::test]
async fn remove_vote_and_unbookmark_disagree_about_absence() {
    let fx = Fixture::new().await;
    let author = fx.user("Author").await;
    let caller = fx.user("Caller").await;
    let post = fx.post(&author, "hello").await;

    let removal = fx
        .votes
        .remove_vote(&caller, post.id.into_inner(), TargetKind::Post)
        .await;
    assert!(matches!(removal, Err(CoreError::NotFound(_))));

    // The same absence is an idempotent success for bookmarks.
    let unbookmarked = fx.bookmarks.unbookmark_post(caller.id, post.id).await;
    assert!(matches!(unbookmarked, Ok(true)));
}

#[tokio::test]
async fn vote_scenario_drives_reputation_through_the_live_sum() {
    let fx = Fixture::new().await;
    let u1 = fx.user("U1").await;
    let (u2, u3) = (fx.user("U2").await, fx.user("U3").await);
    let post = fx.post(&u1, "scenario").await;
    let target = post.id.into_inner();

    fx.votes
        .cast_vote(&u2, target, TargetKind::Post, VoteDirection::Up)
        .await
        .unwrap();
    let outcome = fx
        .votes
        .cast_vote(&u3, target, TargetKind::Post, VoteDirection::Down)
        .await
        .unwrap();
    assert_eq!(outcome.vote_count, 0);
    assert_eq!(fx.reputation_of(u1.id).await, 0);

    let outcome = fx
        .votes
        .remove_vote(&u2, target, TargetKind::Post)
        .await
        .unwrap();
    assert_eq!(outcome.vote_count, -1);

    // Reputation is recomputed from rows, so it matches the same net total
    // across all of U1's content.
    assert_eq!(fx.reputation_of(u1.id).await, -1);
}

#[tokio::test]
async fn first_vote_notifies_the_author_but_repeat_and_self_votes_do_not() {
    let fx = Fixture::new().await;
    let author = fx.user("Author").await;
    let voter = fx.user("Voter").await;
    let post = fx.post(&author, "hello").await;
    let target = post.id.into_inner();

    fx.votes
        .cast_vote(&voter, target, TargetKind::Post, VoteDirection::Up)
        .await
        .unwrap();
    fx.votes
        .cast_vote(&voter, target, TargetKind::Post, VoteDirection::Down)
        .await
        .unwrap();
    fx.votes
        .cast_vote(&author, target, TargetKind::Post, VoteDirection::Up)
        .await
        .unwrap();

    let inbox = fx.store.list_notifications(author.id, 50).await.unwrap();
    assert_eq!(inbox.len(), 1);
    assert_eq!(inbox[0].kind, NotificationKind::Vote);
}

// ---------------------------------------------------------------------------
// Comment hierarchy
// ---------------------------------------------------------------------------

#[tokio::test]
async fn comment_depth_is_bounded_at_five() {
    let fx = Fixture::new().await;
    let author = fx.user("Author").await;
    let post = fx.post(&author, "thread").await;

    // Build a chain down to depth 5.
    let mut parent: Option<CommentId> = None;
    let mut last = None;
    for expected_depth in 0..=5_i16 {
        let comment = fx
            .comments
            .create_comment(&author, post.id, parent, "reply")
            .await
            .unwrap();
        assert_eq!(comment.depth, expected_depth);
        parent = Some(comment.id);
        last = Some(comment);
    }

    // The parent at depth 5 rejects a child; its own parent (depth 4)
    // accepted one -- exactly the boundary.
    let too_deep = fx
        .comments
        .create_comment(&author, post.id, parent, "too deep")
        .await;
    assert!(matches!(too_deep, Err(CoreError::Validation(_))));

    let last = last.unwrap();
    assert_eq!(last.depth, 5);
    assert_eq!(last.path.split('.').count(), 6);
}

#[tokio::test]
async fn parenting_across_posts_is_rejected() {
    let fx = Fixture::new().await;
    let author = fx.user("Author").await;
    let post_a = fx.post(&author, "a").await;
    let post_b = fx.post(&author, "b").await;

    let parent = fx
        .comments
        .create_comment(&author, post_a.id, None, "root")
        .await
        .unwrap();
    let crossed = fx
        .comments
        .create_comment(&author, post_b.id, Some(parent.id), "crossed")
        .await;
    assert!(matches!(crossed, Err(CoreError::Validation(_))));
}

#[tokio::test]
async fn locked_posts_reject_new_comments() {
    let fx = Fixture::new().await;
    let admin = User {
        admin: true,
        ..fx.user("Admin").await
    };
    fx.store.insert_user(admin.clone()).await.unwrap();
    let post = fx.post(&admin, "locked").await;
    fx.posts
        .update_post(
            &admin,
            post.id,
            agora_core::posts::PostPatch {
                locked: Some(true),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    let rejected = fx
        .comments
        .create_comment(&admin, post.id, None, "nope")
        .await;
    assert!(matches!(rejected, Err(CoreError::Conflict(_))));
}

#[tokio::test]
async fn deleting_a_comment_keeps_its_children_addressable() {
    let fx = Fixture::new().await;
    let author = fx.user("Author").await;
    let post = fx.post(&author, "thread").await;

    let root = fx
        .comments
        .create_comment(&author, post.id, None, "root")
        .await
        .unwrap();
    let child = fx
        .comments
        .create_comment(&author, post.id, Some(root.id), "child")
        .await
        .unwrap();

    fx.comments.delete_comment(&author, root.id).await.unwrap();

    // No cascade: the child is still live and still carries the full path.
    let still_there = fx.store.comment_by_id(child.id).await.unwrap().unwrap();
    assert_eq!(still_there.path, child_path(Some(&root.path), child.id));

    let subtree = fx.comments.subtree(child.id).await.unwrap();
    assert_eq!(subtree.len(), 1);
}

#[tokio::test]
async fn replies_notify_the_parent_author() {
    let fx = Fixture::new().await;
    let op = fx.user("Op").await;
    let replier = fx.user("Replier").await;
    let post = fx.post(&op, "thread").await;

    // Top-level comment notifies the post author; self-replies do not.
    fx.comments
        .create_comment(&replier, post.id, None, "hi")
        .await
        .unwrap();
    fx.comments
        .create_comment(&op, post.id, None, "self")
        .await
        .unwrap();

    let inbox = fx.store.list_notifications(op.id, 50).await.unwrap();
    assert_eq!(inbox.len(), 1);
    assert_eq!(inbox[0].kind, NotificationKind::Reply);
}

// ---------------------------------------------------------------------------
// Pagination
// ---------------------------------------------------------------------------

/// Insert a comment row directly, with a forced timestamp. The service
/// stamps `now()`, so duplicate-timestamp scenarios seed the store
/// directly.
async fn seed_comment(fx: &Fixture, post: PostId, author: UserId, at: i64) -> Comment {
    let id = CommentId::new();
    let comment = Comment {
        id,
        post_id: post,
        author_id: author,
        parent_id: None,
        content: format!("comment {id}"),
        depth: 0,
        path: child_path(None, id),
        created_at: Utc.timestamp_opt(at, 0).single().unwrap(),
        deleted_at: None,
    };
    fx.store.insert_comment(comment.clone()).await.unwrap();
    comment
}

#[tokio::test]
async fn paging_never_skips_or_repeats_under_duplicate_timestamps() {
    let fx = Fixture::new().await;
    let author = fx.user("Author").await;
    let post = fx.post(&author, "dup").await;

    // Two of the four comments share one creation second.
    seed_comment(&fx, post.id, author.id, 1_000).await;
    seed_comment(&fx, post.id, author.id, 2_000).await;
    seed_comment(&fx, post.id, author.id, 2_000).await;
    seed_comment(&fx, post.id, author.id, 3_000).await;

    for order in [CommentOrder::Oldest, CommentOrder::Newest, CommentOrder::Top] {
        let mut seen: Vec<CommentId> = Vec::new();
        let mut after: Option<String> = None;
        loop {
            let page = fx
                .feeds
                .comments(post.id, order, Some(2), after.as_deref())
                .await
                .unwrap();
            for edge in &page.edges {
                assert!(
                    !seen.contains(&edge.node.id),
                    "row repeated across pages in {order:?}"
                );
                seen.push(edge.node.id);
            }
            if !page.page_info.has_next_page {
                break;
            }
            after = page.page_info.end_cursor.clone();
        }
        assert_eq!(seen.len(), 4, "row skipped in {order:?}");
    }
}

#[tokio::test]
async fn page_sizes_clamp_into_one_to_fifty() {
    let fx = Fixture::new().await;
    let author = fx.user("Author").await;
    for i in 0..55 {
        fx.post(&author, &format!("post {i}")).await;
    }

    let one = fx
        .feeds
        .posts(agora_types::PostOrder::Newest, Some(0), None)
        .await
        .unwrap();
    assert_eq!(one.edges.len(), 1);

    let also_one = fx
        .feeds
        .posts(agora_types::PostOrder::Newest, Some(-1), None)
        .await
        .unwrap();
    assert_eq!(also_one.edges.len(), 1);

    let fifty = fx
        .feeds
        .posts(agora_types::PostOrder::Newest, Some(1000), None)
        .await
        .unwrap();
    assert_eq!(fifty.edges.len(), 50);
    assert!(fifty.page_info.has_next_page);
}

#[tokio::test]
async fn top_comments_order_is_shallow_then_newest() {
    let fx = Fixture::new().await;
    let author = fx.user("Author").await;
    let post = fx.post(&author, "thread").await;

    let old_root = seed_comment(&fx, post.id, author.id, 1_000).await;
    let new_root = seed_comment(&fx, post.id, author.id, 2_000).await;
    let reply = {
        let id = CommentId::new();
        let comment = Comment {
            id,
            post_id: post.id,
            author_id: author.id,
            parent_id: Some(old_root.id),
            content: String::from("nested"),
            depth: 1,
            path: child_path(Some(&old_root.path), id),
            created_at: Utc.timestamp_opt(3_000, 0).single().unwrap(),
            deleted_at: None,
        };
        fx.store.insert_comment(comment.clone()).await.unwrap();
        comment
    };

    let page = fx
        .feeds
        .comments(post.id, CommentOrder::Top, Some(10), None)
        .await
        .unwrap();
    let ids: Vec<CommentId> = page.edges.iter().map(|edge| edge.node.id).collect();
    // Depth 0 first (newest leading), the depth-1 reply last even though
    // it is the most recent row.
    assert_eq!(ids, vec![new_root.id, old_root.id, reply.id]);
}

#[tokio::test]
async fn bookmark_feed_pages_by_bookmark_time() {
    let fx = Fixture::new().await;
    let author = fx.user("Author").await;
    let reader = fx.user("Reader").await;
    let mut posts = Vec::new();
    for i in 0..3 {
        let post = fx.post(&author, &format!("post {i}")).await;
        fx.bookmarks.bookmark_post(reader.id, post.id).await.unwrap();
        posts.push(post);
    }

    let first_page = fx.feeds.bookmarks(reader.id, Some(2), None).await.unwrap();
    assert_eq!(first_page.edges.len(), 2);
    assert!(first_page.page_info.has_next_page);

    let second_page = fx
        .feeds
        .bookmarks(
            reader.id,
            Some(2),
            first_page.page_info.end_cursor.as_deref(),
        )
        .await
        .unwrap();
    assert_eq!(second_page.edges.len(), 1);
    assert!(second_page.page_info.has_previous_page);

    let mut seen: Vec<PostId> = first_page
        .edges
        .iter()
        .chain(second_page.edges.iter())
        .map(|edge| edge.node.1.id)
        .collect();
    seen.sort();
    let mut expected: Vec<PostId> = posts.iter().map(|post| post.id).collect();
    expected.sort();
    assert_eq!(seen, expected);
}

// ---------------------------------------------------------------------------
// Engagement
// ---------------------------------------------------------------------------

#[tokio::test]
async fn duplicate_bookmarks_conflict() {
    let fx = Fixture::new().await;
    let author = fx.user("Author").await;
    let reader = fx.user("Reader").await;
    let post = fx.post(&author, "hello").await;

    fx.bookmarks.bookmark_post(reader.id, post.id).await.unwrap();
    let duplicate = fx.bookmarks.bookmark_post(reader.id, post.id).await;
    assert!(matches!(duplicate, Err(CoreError::Conflict(_))));
}

#[tokio::test]
async fn subscriber_counter_tracks_subscription_rows() {
    let fx = Fixture::new().await;
    let (a, b) = (fx.user("A").await, fx.user("B").await);
    let topic_id = fx.topic.id;

    fx.topics.subscribe(a.id, topic_id).await.unwrap();
    fx.topics.subscribe(b.id, topic_id).await.unwrap();
    let duplicate = fx.topics.subscribe(a.id, topic_id).await;
    assert!(matches!(duplicate, Err(CoreError::Conflict(_))));
    assert_eq!(fx.topics.topic(topic_id).await.unwrap().subscriber_count, 2);

    fx.topics.unsubscribe(a.id, topic_id).await.unwrap();
    assert_eq!(fx.topics.topic(topic_id).await.unwrap().subscriber_count, 1);

    let absent = fx.topics.unsubscribe(a.id, topic_id).await;
    assert!(matches!(absent, Err(CoreError::NotFound(_))));
}

#[tokio::test]
async fn follows_validate_and_notify() {
    let fx = Fixture::new().await;
    let (a, b) = (fx.user("A").await, fx.user("B").await);

    assert!(matches!(
        fx.follows.follow(&a, a.id).await,
        Err(CoreError::Validation(_))
    ));

    fx.follows.follow(&a, b.id).await.unwrap();
    assert!(matches!(
        fx.follows.follow(&a, b.id).await,
        Err(CoreError::Conflict(_))
    ));

    let inbox = fx.store.list_notifications(b.id, 50).await.unwrap();
    assert_eq!(inbox.len(), 1);
    assert_eq!(inbox[0].kind, NotificationKind::Follow);
}

// ---------------------------------------------------------------------------
// Event isolation
// ---------------------------------------------------------------------------

#[tokio::test]
async fn events_for_one_post_never_reach_another_posts_listener() {
    let fx = Fixture::new().await;
    let author = fx.user("Author").await;
    let voter = fx.user("Voter").await;
    let post_a = fx.post(&author, "a").await;
    let post_b = fx.post(&author, "b").await;

    let mut rx = fx.bus.subscribe();
    let filter_a = agora_types::EventFilter::for_post(post_a.id);
    let filter_b = agora_types::EventFilter::for_post(post_b.id);

    // Every event kind that carries a post scope, all on post A.
    let comment = fx
        .comments
        .create_comment(&voter, post_a.id, None, "hi")
        .await
        .unwrap();
    fx.votes
        .cast_vote(&voter, post_a.id.into_inner(), TargetKind::Post, VoteDirection::Up)
        .await
        .unwrap();
    fx.votes
        .cast_vote(
            &author,
            comment.id.into_inner(),
            TargetKind::Comment,
            VoteDirection::Up,
        )
        .await
        .unwrap();
    fx.comments.delete_comment(&voter, comment.id).await.unwrap();
    fx.posts
        .update_post(
            &author,
            post_a.id,
            agora_core::posts::PostPatch {
                body: Some(String::from("edited")),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    let mut for_a = 0;
    while let Ok(event) = rx.try_recv() {
        assert!(
            !event.matches(&filter_b),
            "{} for post A leaked to post B",
            event.kind()
        );
        if event.matches(&filter_a) {
            for_a = for_a + 1;
        }
    }
    // commentAdded, voteUpdated (post), voteUpdated (comment, post-scoped),
    // commentDeleted, postUpdated.
    assert_eq!(for_a, 5);
}
