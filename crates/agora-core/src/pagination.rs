//! Cursor codec and connection assembly for infinite-scroll feeds.
//!
//! A cursor is an opaque token combining the sort key's value and the row's
//! unique id: `"<sort-key>|<id>"`. The id is the mandatory tie-break -- a
//! timestamp-only cursor skips or repeats rows when two rows share a
//! creation timestamp, so every page query uses the compound predicate
//! `(key < cursor.key) OR (key = cursor.key AND id < cursor.id)` (mirrored
//! for ascending orders, extended to three keys for the comment "top"
//! order).
//!
//! Decoding is order-aware: the caller states which feed order the cursor
//! belongs to and a token of the wrong shape is a validation failure, not a
//! silent fallback to page one.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::error::CoreError;

/// Hard upper bound on page size, applied regardless of what the caller
/// requests.
pub const MAX_PAGE_SIZE: i64 = 50;

/// Page size used when the caller does not send `first`.
pub const DEFAULT_PAGE_SIZE: i64 = 20;

/// Clamp a requested page size into `[1, MAX_PAGE_SIZE]`.
///
/// Zero and negative requests clamp up to 1; oversized requests clamp down
/// to [`MAX_PAGE_SIZE`]; an absent request gets [`DEFAULT_PAGE_SIZE`].
pub fn clamp_page_size(requested: Option<i64>) -> i64 {
    requested.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE)
}

// ---------------------------------------------------------------------------
// Cursor
// ---------------------------------------------------------------------------

/// The sort-key half of a cursor. Which variant applies is fixed by the
/// feed order the cursor was minted for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CursorKey {
    /// Creation timestamp (newest/oldest feeds).
    Time(DateTime<Utc>),
    /// Net score (top posts feed).
    Score(i64),
    /// Depth, then creation timestamp (top comments listing).
    DepthTime(i16, DateTime<Utc>),
}

/// A decoded pagination cursor: sort key plus tie-break id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cursor {
    /// The sort key's value at the cursor row.
    pub key: CursorKey,
    /// The cursor row's unique id -- the deterministic tie-break.
    pub id: Uuid,
}

impl Cursor {
    /// Cursor for a row sorted by creation time.
    pub const fn at_time(created_at: DateTime<Utc>, id: Uuid) -> Self {
        Self {
            key: CursorKey::Time(created_at),
            id,
        }
    }

    /// Cursor for a row sorted by net score.
    pub const fn at_score(score: i64, id: Uuid) -> Self {
        Self {
            key: CursorKey::Score(score),
            id,
        }
    }

    /// Cursor for a comment row in the depth-then-recency order.
    pub const fn at_depth_time(depth: i16, created_at: DateTime<Utc>, id: Uuid) -> Self {
        Self {
            key: CursorKey::DepthTime(depth, created_at),
            id,
        }
    }

    /// Encode to the opaque wire token.
    pub fn encode(&self) -> String {
        match self.key {
            CursorKey::Time(at) => {
                format!("{}|{}", at.to_rfc3339_opts(SecondsFormat::Micros, true), self.id)
            }
            CursorKey::Score(score) => format!("{score}|{}", self.id),
            CursorKey::DepthTime(depth, at) => format!(
                "{depth}~{}|{}",
                at.to_rfc3339_opts(SecondsFormat::Micros, true),
                self.id
            ),
        }
    }

    /// Decode a token minted for a time-ordered feed.
    pub fn decode_time(token: &str) -> Result<Self, CoreError> {
        let (key, id) = split(token)?;
        let at = DateTime::parse_from_rfc3339(key)
            .map_err(|_| bad_cursor(token))?
            .with_timezone(&Utc);
        Ok(Self::at_time(at, id))
    }

    /// Decode a token minted for the score-ordered post feed.
    pub fn decode_score(token: &str) -> Result<Self, CoreError> {
        let (key, id) = split(token)?;
        let score: i64 = key.parse().map_err(|_| bad_cursor(token))?;
        Ok(Self::at_score(score, id))
    }

    /// Decode a token minted for the depth-then-recency comment order.
    pub fn decode_depth_time(token: &str) -> Result<Self, CoreError> {
        let (key, id) = split(token)?;
        let (depth_part, time_part) = key.split_once('~').ok_or_else(|| bad_cursor(token))?;
        let depth: i16 = depth_part.parse().map_err(|_| bad_cursor(token))?;
        let at = DateTime::parse_from_rfc3339(time_part)
            .map_err(|_| bad_cursor(token))?
            .with_timezone(&Utc);
        Ok(Self::at_depth_time(depth, at, id))
    }
}

fn split(token: &str) -> Result<(&str, Uuid), CoreError> {
    let (key, id_part) = token.rsplit_once('|').ok_or_else(|| bad_cursor(token))?;
    let id = Uuid::parse_str(id_part).map_err(|_| bad_cursor(token))?;
    Ok((key, id))
}

fn bad_cursor(token: &str) -> CoreError {
    CoreError::Validation(format!("malformed cursor: {token:?}"))
}

// ---------------------------------------------------------------------------
// Connections
// ---------------------------------------------------------------------------

/// Pagination metadata for one page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PageInfo {
    /// Whether another page exists after this one. Derived by fetching one
    /// row beyond the page size, so no second count query is needed.
    pub has_next_page: bool,
    /// Approximated as "a cursor was supplied". This is a documented
    /// limitation: predecessor existence is not re-verified.
    pub has_previous_page: bool,
    /// Cursor of the first returned row, if any.
    pub start_cursor: Option<String>,
    /// Cursor of the last returned row, if any. Never derived from the
    /// peeked extra row.
    pub end_cursor: Option<String>,
}

/// One row of a page together with its resume cursor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Edge<T> {
    /// The row itself.
    pub node: T,
    /// Token that resumes the feed immediately after this row.
    pub cursor: String,
}

/// A page of rows plus pagination metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Connection<T> {
    /// The returned rows, in feed order.
    pub edges: Vec<Edge<T>>,
    /// Metadata for fetching the neighboring pages.
    pub page_info: PageInfo,
}

impl<T> Connection<T> {
    /// Assemble a connection from up to `page_size + 1` fetched rows.
    ///
    /// The extra peeked row (if present) only sets `has_next_page`; it is
    /// dropped before cursors are derived.
    pub fn assemble(
        mut rows: Vec<T>,
        page_size: i64,
        cursor_supplied: bool,
        mut cursor_of: impl FnMut(&T) -> Cursor,
    ) -> Self {
        let page = usize::try_from(page_size).unwrap_or(0).max(1);
        let has_next_page = rows.len() > page;
        rows.truncate(page);

        let edges: Vec<Edge<T>> = rows
            .into_iter()
            .map(|node| {
                let cursor = cursor_of(&node).encode();
                Edge { node, cursor }
            })
            .collect();

        let page_info = PageInfo {
            has_next_page,
            has_previous_page: cursor_supplied,
            start_cursor: edges.first().map(|edge| edge.cursor.clone()),
            end_cursor: edges.last().map(|edge| edge.cursor.clone()),
        };

        Self { edges, page_info }
    }

    /// Map the node type while keeping edges and metadata intact.
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Connection<U> {
        let mut f = f;
        Connection {
            edges: self
                .edges
                .into_iter()
                .map(|edge| Edge {
                    node: f(edge.node),
                    cursor: edge.cursor,
                })
                .collect(),
            page_info: self.page_info,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_size_clamps_into_bounds() {
        assert_eq!(clamp_page_size(Some(0)), 1);
        assert_eq!(clamp_page_size(Some(-1)), 1);
        assert_eq!(clamp_page_size(Some(1000)), MAX_PAGE_SIZE);
        assert_eq!(clamp_page_size(Some(7)), 7);
        assert_eq!(clamp_page_size(None), DEFAULT_PAGE_SIZE);
    }

    #[test]
    fn time_cursor_round_trips() {
        let cursor = Cursor::at_time(Utc::now(), Uuid::now_v7());
        let decoded = Cursor::decode_time(&cursor.encode()).unwrap_or(Cursor::at_time(
            DateTime::<Utc>::MIN_UTC,
            Uuid::nil(),
        ));
        assert_eq!(decoded, cursor);
    }

    #[test]
    fn score_cursor_round_trips_negative_scores() {
        let cursor = Cursor::at_score(-17, Uuid::now_v7());
        assert_eq!(Cursor::decode_score(&cursor.encode()).ok(), Some(cursor));
    }

    #[test]
    fn depth_time_cursor_round_trips() {
        let cursor = Cursor::at_depth_time(3, Utc::now(), Uuid::now_v7());
        assert_eq!(Cursor::decode_depth_time(&cursor.encode()).ok(), Some(cursor));
    }

    #[test]
    fn wrong_shape_is_a_validation_failure() {
        let time_token = Cursor::at_time(Utc::now(), Uuid::now_v7()).encode();
        assert!(matches!(
            Cursor::decode_score(&time_token),
            Err(CoreError::Validation(_))
        ));
        assert!(matches!(
            Cursor::decode_time("not-a-cursor"),
            Err(CoreError::Validation(_))
        ));
        assert!(matches!(
            Cursor::decode_depth_time(&time_token),
            Err(CoreError::Validation(_))
        ));
    }

    #[test]
    fn assemble_peeks_without_leaking_the_extra_row() {
        let rows = vec![1_i64, 2, 3];
        let connection =
            Connection::assemble(rows, 2, false, |row| Cursor::at_score(*row, Uuid::nil()));
        assert_eq!(connection.edges.len(), 2);
        assert!(connection.page_info.has_next_page);
        assert!(!connection.page_info.has_previous_page);
        // End cursor comes from the last *returned* row, not the peeked one.
        assert_eq!(
            connection.page_info.end_cursor.as_deref(),
            Some(format!("2|{}", Uuid::nil()).as_str())
        );
    }

    #[test]
    fn assemble_marks_previous_page_from_cursor_presence() {
        let connection =
            Connection::assemble(vec![5_i64], 2, true, |row| Cursor::at_score(*row, Uuid::nil()));
        assert!(connection.page_info.has_previous_page);
        assert!(!connection.page_info.has_next_page);
    }

    #[test]
    fn empty_page_has_no_cursors() {
        let connection =
            Connection::assemble(Vec::<i64>::new(), 2, false, |row| {
                Cursor::at_score(*row, Uuid::nil())
            });
        assert!(connection.edges.is_empty());
        assert_eq!(connection.page_info.start_cursor, None);
        assert_eq!(connection.page_info.end_cursor, None);
    }
}
