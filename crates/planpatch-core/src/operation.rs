//! Typed edit operations.
//!
//! Offsets stored on an operation are relative to the *original* base
//! document, not to whatever the buffer looks like by the time the
//! operation is replayed. They are signed because stored rows are not
//! trusted to be in range; the patcher clamps them.
//!
//! ## Learning: Making Invalid States Unrepresentable
//!
//! A stored delete may carry a range, a single position, both or neither.
//! Instead of re-checking four optional fields every time the delete is
//! replayed, [`DeleteTarget::resolve`] collapses them once into an enum
//! with exactly one case per meaning.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::PatchError;

/// Opaque identifier of a recorded edit, used only in diagnostics.
///
/// Stored edit rows carry either numeric or textual ids, so both
/// deserialize into the same string form.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "RawOperationId")]
pub struct OperationId(String);

impl OperationId {
    /// Wraps an existing identifier.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Creates a fresh random identifier.
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for OperationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for OperationId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<u64> for OperationId {
    fn from(id: u64) -> Self {
        Self(id.to_string())
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawOperationId {
    Text(String),
    Signed(i64),
    Unsigned(u64),
}

impl From<RawOperationId> for OperationId {
    fn from(raw: RawOperationId) -> Self {
        match raw {
            RawOperationId::Text(s) => Self(s),
            RawOperationId::Signed(n) => Self(n.to_string()),
            RawOperationId::Unsigned(n) => Self(n.to_string()),
        }
    }
}

/// The kind tag of a recorded edit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EditKind {
    Insert,
    Delete,
    Replace,
}

impl FromStr for EditKind {
    type Err = PatchError;

    /// Parses an action tag, ignoring case and surrounding whitespace.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "insert" => Ok(Self::Insert),
            "delete" => Ok(Self::Delete),
            "replace" => Ok(Self::Replace),
            _ => Err(PatchError::UnknownOperationKind(s.to_string())),
        }
    }
}

impl fmt::Display for EditKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Insert => "insert",
            Self::Delete => "delete",
            Self::Replace => "replace",
        };
        f.write_str(name)
    }
}

/// What a delete operation points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteTarget {
    /// Remove `[start, end)`. Only produced when `end > start`.
    Range { start: i64, end: i64 },
    /// Remove the single character at this offset. Never negative.
    Position(i64),
    /// Neither a usable range nor a position was recorded.
    Missing,
}

impl DeleteTarget {
    /// Picks the delete target from the recorded fields.
    ///
    /// A valid range wins over a position; a negative position counts
    /// as absent.
    pub fn resolve(start: Option<i64>, end: Option<i64>, position: Option<i64>) -> Self {
        match (start, end, position) {
            (Some(start), Some(end), _) if end > start => Self::Range { start, end },
            (_, _, Some(position)) if position >= 0 => Self::Position(position),
            _ => Self::Missing,
        }
    }
}

/// A single decoded change to a lesson plan document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditOperation {
    /// Insert `text` at `position`, or append when no position was recorded.
    Insert { position: Option<i64>, text: String },
    Delete(DeleteTarget),
    /// Replace `[start, end)` with `text`.
    Replace { start: i64, end: i64, text: String },
}

impl EditOperation {
    pub fn kind(&self) -> EditKind {
        match self {
            Self::Insert { .. } => EditKind::Insert,
            Self::Delete(_) => EditKind::Delete,
            Self::Replace { .. } => EditKind::Replace,
        }
    }
}

/// An operation together with the id it was recorded under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Edit {
    pub id: OperationId,
    pub op: EditOperation,
}

impl Edit {
    pub fn new(id: impl Into<OperationId>, op: EditOperation) -> Self {
        Self { id: id.into(), op }
    }

    /// Insert at a position in the original document.
    pub fn insert(id: impl Into<OperationId>, position: i64, text: impl Into<String>) -> Self {
        Self::new(
            id,
            EditOperation::Insert {
                position: Some(position),
                text: text.into(),
            },
        )
    }

    /// Append to the end of the current document.
    pub fn append(id: impl Into<OperationId>, text: impl Into<String>) -> Self {
        Self::new(
            id,
            EditOperation::Insert {
                position: None,
                text: text.into(),
            },
        )
    }

    /// Delete `[start, end)` of the original document.
    pub fn delete_range(id: impl Into<OperationId>, start: i64, end: i64) -> Self {
        Self::new(
            id,
            EditOperation::Delete(DeleteTarget::resolve(Some(start), Some(end), None)),
        )
    }

    /// Delete the single character at `position` of the original document.
    pub fn delete_at(id: impl Into<OperationId>, position: i64) -> Self {
        Self::new(
            id,
            EditOperation::Delete(DeleteTarget::resolve(None, None, Some(position))),
        )
    }

    pub fn replace(
        id: impl Into<OperationId>,
        start: i64,
        end: i64,
        text: impl Into<String>,
    ) -> Self {
        Self::new(
            id,
            EditOperation::Replace {
                start,
                end,
                text: text.into(),
            },
        )
    }
}
