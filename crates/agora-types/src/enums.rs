//! Enumeration types for the Agora forum backend.
//!
//! Wire representations are lowercase strings (`"up"`, `"post"`, `"newest"`)
//! so query parameters and JSON bodies read naturally from the frontend.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

// ---------------------------------------------------------------------------
// Vote direction
// ---------------------------------------------------------------------------

/// The direction of a vote on a post or comment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
#[serde(rename_all = "lowercase")]
pub enum VoteDirection {
    /// Counts +1 toward the target's net score.
    Up,
    /// Counts -1 toward the target's net score.
    Down,
}

impl VoteDirection {
    /// The contribution of one vote in this direction to a net score.
    pub const fn score(self) -> i64 {
        match self {
            Self::Up => 1,
            Self::Down => -1,
        }
    }

    /// Database string representation (`"up"` / `"down"`).
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Up => "up",
            Self::Down => "down",
        }
    }
}

// ---------------------------------------------------------------------------
// Vote target kind
// ---------------------------------------------------------------------------

/// What kind of entity a vote points at.
///
/// A target is always a post or a comment; the `(user, target_id,
/// target_kind)` triple is unique in the vote table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
#[serde(rename_all = "lowercase")]
pub enum TargetKind {
    /// The vote is on a post.
    Post,
    /// The vote is on a comment.
    Comment,
}

impl TargetKind {
    /// Database string representation (`"post"` / `"comment"`).
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Post => "post",
            Self::Comment => "comment",
        }
    }
}

// ---------------------------------------------------------------------------
// Feed orderings
// ---------------------------------------------------------------------------

/// Ordering modes for the post feed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
#[serde(rename_all = "lowercase")]
pub enum PostOrder {
    /// Creation time descending, id descending.
    #[default]
    Newest,
    /// Creation time ascending, id ascending.
    Oldest,
    /// Net score descending, id descending.
    Top,
}

/// Ordering modes for comment listings within a post.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
#[serde(rename_all = "lowercase")]
pub enum CommentOrder {
    /// Creation time ascending, id ascending. The default for threads.
    #[default]
    Oldest,
    /// Creation time descending, id descending.
    Newest,
    /// Depth ascending, then creation time descending, then id descending
    /// (shallow, newest-first).
    Top,
}

// ---------------------------------------------------------------------------
// Notification kinds
// ---------------------------------------------------------------------------

/// Why a notification was issued.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
#[serde(rename_all = "lowercase")]
pub enum NotificationKind {
    /// Someone replied to the recipient's post or comment.
    Reply,
    /// Someone voted on the recipient's post or comment.
    Vote,
    /// Someone started following the recipient.
    Follow,
}

impl NotificationKind {
    /// Database string representation.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Reply => "reply",
            Self::Vote => "vote",
            Self::Follow => "follow",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vote_direction_scores() {
        assert_eq!(VoteDirection::Up.score(), 1);
        assert_eq!(VoteDirection::Down.score(), -1);
    }

    #[test]
    fn enums_serialize_lowercase() {
        assert_eq!(
            serde_json::to_string(&VoteDirection::Up).ok(),
            Some(String::from("\"up\""))
        );
        assert_eq!(
            serde_json::to_string(&TargetKind::Comment).ok(),
            Some(String::from("\"comment\""))
        );
        assert_eq!(
            serde_json::to_string(&PostOrder::Top).ok(),
            Some(String::from("\"top\""))
        );
    }

    #[test]
    fn order_defaults() {
        assert_eq!(PostOrder::default(), PostOrder::Newest);
        assert_eq!(CommentOrder::default(), CommentOrder::Oldest);
    }
}
