//! The tagged event union published on the fan-out bus.
//!
//! Every mutation that live clients care about publishes exactly one
//! [`ForumEvent`]. The union is a sum type with a typed payload per kind --
//! there is no untyped "body" field -- and payload invariants are checked at
//! publish time via [`ForumEvent::validate`].
//!
//! Serialization uses adjacent tagging so a frame is exactly
//! `{"type": "commentAdded", "data": {...}}`, which both live transports
//! forward verbatim.
//!
//! Subscribers do not receive everything: each connection carries an
//! [`EventFilter`] and only events for which [`ForumEvent::matches`] returns
//! `true` are delivered.

use serde::{Deserialize, Serialize};
use ts_rs::TS;
use uuid::Uuid;

use crate::enums::TargetKind;
use crate::ids::{CommentId, PostId, UserId};
use crate::models::{Comment, Notification, Post, TypingUser};

// ---------------------------------------------------------------------------
// Payloads
// ---------------------------------------------------------------------------

/// Payload for [`ForumEvent::CommentAdded`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
#[serde(rename_all = "camelCase")]
pub struct CommentAdded {
    /// The post the comment belongs to.
    pub post_id: PostId,
    /// The freshly created comment.
    pub comment: Comment,
}

/// Payload for [`ForumEvent::CommentDeleted`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
#[serde(rename_all = "camelCase")]
pub struct CommentDeleted {
    /// The post the comment belonged to.
    pub post_id: PostId,
    /// The tombstoned comment.
    pub comment_id: CommentId,
}

/// Payload for [`ForumEvent::PostCreated`] and [`ForumEvent::PostUpdated`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
#[serde(rename_all = "camelCase")]
pub struct PostChanged {
    /// The post after the mutation.
    pub post: Post,
}

/// Payload for [`ForumEvent::VoteUpdated`].
///
/// `post_id` is the post-scope of the vote: the target itself for post
/// votes, the comment's parent post for comment votes. Post-scoped
/// listeners match on it so votes on comments inside the post they watch
/// still reach them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
#[serde(rename_all = "camelCase")]
pub struct VoteUpdated {
    /// The post or comment whose score changed.
    pub target_id: Uuid,
    /// Whether the target is a post or a comment.
    pub target_kind: TargetKind,
    /// Post scope of the target (equals `target_id` for post votes).
    pub post_id: PostId,
    /// The recomputed net score of the target.
    pub vote_count: i64,
}

/// Payload for [`ForumEvent::UserTyping`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
#[serde(rename_all = "camelCase")]
pub struct TypingChanged {
    /// The post whose typing roster changed.
    pub post_id: PostId,
    /// Everyone currently typing on the post. Unordered; presence is
    /// best-effort, last-write-wins state.
    pub users: Vec<TypingUser>,
}

/// Payload for [`ForumEvent::NotificationReceived`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
#[serde(rename_all = "camelCase")]
pub struct NotificationReceived {
    /// The freshly issued notification; `notification.user_id` is the
    /// recipient the event is filtered on.
    pub notification: Notification,
}

// ---------------------------------------------------------------------------
// The union
// ---------------------------------------------------------------------------

/// A domain event broadcast to live listeners.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
#[serde(tag = "type", content = "data", rename_all = "camelCase")]
pub enum ForumEvent {
    /// A comment was created.
    CommentAdded(CommentAdded),
    /// A comment was tombstoned.
    CommentDeleted(CommentDeleted),
    /// A post was created.
    PostCreated(PostChanged),
    /// A post was edited, pinned, locked, or tombstoned.
    PostUpdated(PostChanged),
    /// A vote was cast, changed, or removed.
    VoteUpdated(VoteUpdated),
    /// A post's typing roster changed.
    UserTyping(TypingChanged),
    /// A notification was issued to a user.
    NotificationReceived(NotificationReceived),
}

impl ForumEvent {
    /// Check the payload's internal consistency.
    ///
    /// The bus rejects events that fail here instead of fanning them out;
    /// a mismatched payload would make post-scoped filtering deliver the
    /// event to the wrong connections.
    pub fn validate(&self) -> Result<(), String> {
        match self {
            Self::CommentAdded(payload) => {
                if payload.comment.post_id == payload.post_id {
                    Ok(())
                } else {
                    Err(format!(
                        "comment {} belongs to post {}, not post {}",
                        payload.comment.id, payload.comment.post_id, payload.post_id
                    ))
                }
            }
            Self::VoteUpdated(payload) => match payload.target_kind {
                TargetKind::Post if payload.target_id != payload.post_id.into_inner() => {
                    Err(format!(
                        "post vote target {} disagrees with post scope {}",
                        payload.target_id, payload.post_id
                    ))
                }
                TargetKind::Comment if payload.target_id == payload.post_id.into_inner() => {
                    Err(String::from(
                        "comment vote must carry the parent post id, not the target id",
                    ))
                }
                TargetKind::Post | TargetKind::Comment => Ok(()),
            },
            Self::CommentDeleted(_)
            | Self::PostCreated(_)
            | Self::PostUpdated(_)
            | Self::UserTyping(_)
            | Self::NotificationReceived(_) => Ok(()),
        }
    }

    /// Whether this event should be delivered to a subscriber with the
    /// given filter.
    ///
    /// Matching is per-event-kind: comment, typing, and post events match
    /// on post id; vote events match on `(target id, target kind)` or on
    /// the carried post scope; notification events match on recipient.
    pub fn matches(&self, filter: &EventFilter) -> bool {
        match self {
            Self::CommentAdded(CommentAdded { post_id, .. })
            | Self::CommentDeleted(CommentDeleted { post_id, .. })
            | Self::UserTyping(TypingChanged { post_id, .. }) => {
                filter.post_id == Some(*post_id)
            }
            Self::PostCreated(PostChanged { post }) | Self::PostUpdated(PostChanged { post }) => {
                filter.post_id == Some(post.id)
            }
            Self::VoteUpdated(payload) => {
                filter.target == Some((payload.target_id, payload.target_kind))
                    || filter.post_id == Some(payload.post_id)
            }
            Self::NotificationReceived(payload) => {
                filter.recipient == Some(payload.notification.user_id)
            }
        }
    }

    /// Short event-kind label for logging.
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::CommentAdded(_) => "commentAdded",
            Self::CommentDeleted(_) => "commentDeleted",
            Self::PostCreated(_) => "postCreated",
            Self::PostUpdated(_) => "postUpdated",
            Self::VoteUpdated(_) => "voteUpdated",
            Self::UserTyping(_) => "userTyping",
            Self::NotificationReceived(_) => "notificationReceived",
        }
    }
}

// ---------------------------------------------------------------------------
// Subscriber filters
// ---------------------------------------------------------------------------

/// What a live connection is interested in.
///
/// A connection watching a post page sets `post_id` (and `recipient` when
/// authenticated, so its own notifications arrive on the same connection).
/// Unset criteria never match -- an empty filter receives nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct EventFilter {
    /// Deliver comment, typing, post, and post-scoped vote events for this
    /// post.
    pub post_id: Option<PostId>,
    /// Deliver vote events for exactly this target.
    pub target: Option<(Uuid, TargetKind)>,
    /// Deliver notification events addressed to this user.
    pub recipient: Option<UserId>,
}

impl EventFilter {
    /// Filter for everything scoped to one post.
    pub const fn for_post(post_id: PostId) -> Self {
        Self {
            post_id: Some(post_id),
            target: None,
            recipient: None,
        }
    }

    /// Attach a notification recipient to the filter.
    #[must_use]
    pub const fn with_recipient(mut self, user_id: UserId) -> Self {
        self.recipient = Some(user_id);
        self
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;
    use crate::enums::NotificationKind;
    use crate::ids::NotificationId;

    fn comment(post_id: PostId) -> Comment {
        let id = CommentId::new();
        Comment {
            id,
            post_id,
            author_id: UserId::new(),
            parent_id: None,
            content: String::from("hi"),
            depth: 0,
            path: format!("c{}", id.into_inner().simple()),
            created_at: Utc::now(),
            deleted_at: None,
        }
    }

    #[test]
    fn frame_shape_is_type_plus_data() {
        let post_id = PostId::new();
        let event = ForumEvent::CommentAdded(CommentAdded {
            post_id,
            comment: comment(post_id),
        });
        let json = serde_json::to_value(&event).unwrap_or_default();
        assert_eq!(
            json.get("type").and_then(serde_json::Value::as_str),
            Some("commentAdded")
        );
        assert!(json.get("data").and_then(|d| d.get("postId")).is_some());
    }

    #[test]
    fn comment_events_are_post_scoped() {
        let post_a = PostId::new();
        let post_b = PostId::new();
        let event = ForumEvent::CommentAdded(CommentAdded {
            post_id: post_a,
            comment: comment(post_a),
        });
        assert!(event.matches(&EventFilter::for_post(post_a)));
        assert!(!event.matches(&EventFilter::for_post(post_b)));
        assert!(!event.matches(&EventFilter::default()));
    }

    #[test]
    fn comment_votes_reach_post_scoped_listeners() {
        let post_id = PostId::new();
        let comment_id = CommentId::new();
        let event = ForumEvent::VoteUpdated(VoteUpdated {
            target_id: comment_id.into_inner(),
            target_kind: TargetKind::Comment,
            post_id,
            vote_count: 3,
        });
        // Target-scoped listener.
        let by_target = EventFilter {
            target: Some((comment_id.into_inner(), TargetKind::Comment)),
            ..EventFilter::default()
        };
        assert!(event.matches(&by_target));
        // Post-scoped listener sees votes on comments within the post.
        assert!(event.matches(&EventFilter::for_post(post_id)));
        // Same target id under the wrong kind does not match.
        let wrong_kind = EventFilter {
            target: Some((comment_id.into_inner(), TargetKind::Post)),
            ..EventFilter::default()
        };
        assert!(!event.matches(&wrong_kind));
    }

    #[test]
    fn notifications_match_recipient_only() {
        let recipient = UserId::new();
        let event = ForumEvent::NotificationReceived(NotificationReceived {
            notification: Notification {
                id: NotificationId::new(),
                user_id: recipient,
                kind: NotificationKind::Reply,
                payload: serde_json::json!({}),
                read: false,
                created_at: Utc::now(),
            },
        });
        assert!(event.matches(&EventFilter::default().with_recipient(recipient)));
        assert!(!event.matches(&EventFilter::default().with_recipient(UserId::new())));
        assert!(!event.matches(&EventFilter::for_post(PostId::new())));
    }

    #[test]
    fn mismatched_comment_payload_fails_validation() {
        let post_a = PostId::new();
        let post_b = PostId::new();
        let event = ForumEvent::CommentAdded(CommentAdded {
            post_id: post_b,
            comment: comment(post_a),
        });
        assert!(event.validate().is_err());
    }

    #[test]
    fn comment_vote_carrying_target_as_scope_fails_validation() {
        let comment_id = CommentId::new();
        let event = ForumEvent::VoteUpdated(VoteUpdated {
            target_id: comment_id.into_inner(),
            target_kind: TargetKind::Comment,
            post_id: PostId::from(comment_id.into_inner()),
            vote_count: 0,
        });
        assert!(event.validate().is_err());
    }
}
