//! # Planpatch Core
//!
//! Rebuilds a lesson plan document from its base content and the ordered
//! list of incremental edits recorded against it.
//!
//! ## Pipeline
//!
//! ```text
//!  stored rows ──► EditRecord ──decode──► Edit ──► PatchApplier ──► PatchOutcome
//!                       │                              │
//!                       └────────── Diagnostic ◄───────┘
//! ```
//!
//! Every stored offset refers to the *original* base document. While the
//! edits are replayed, the patcher tracks the net length change so far
//! (the drift) and shifts each offset by it before touching the buffer.
//! Nothing in this crate fails a whole replay: a bad edit is skipped and
//! reported, and the rest still apply.

pub mod config;
pub mod operation;
pub mod patcher;
pub mod record;

pub use config::{Config, ConfigError, IngestMode, OutputConfig, PatchConfig};
pub use operation::{DeleteTarget, Edit, EditKind, EditOperation, OperationId};
pub use patcher::{PatchApplier, PatchOutcome, Patcher};
pub use record::{EditRecord, Ingested, ingest};

use planpatch_buffer::BufferError;

/// Why a single edit was skipped.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PatchError {
    #[error("unknown action `{0}`")]
    UnknownOperationKind(String),

    #[error("malformed operation payload: {0}")]
    MalformedOperationPayload(String),

    #[error("cannot delete from an empty document")]
    DeleteOnEmptyDocument,

    #[error("delete range {start}..{end} is empty after adjustment (length {len})")]
    InvalidDeleteRange { start: usize, end: usize, len: usize },

    #[error("delete position {position} is out of range (length {len})")]
    InvalidDeletePosition { position: i64, len: usize },

    #[error("missing delete position")]
    MissingDeletePosition,

    #[error("invalid replace range {start}..{end} (length {len})")]
    InvalidReplaceRange { start: i64, end: i64, len: usize },

    #[error("buffer error: {0}")]
    Buffer(#[from] BufferError),
}

/// A skipped edit, identified by its place in the input and its id.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("edit #{index} ({operation}): {error}")]
pub struct Diagnostic {
    /// Zero-based position of the edit in the input sequence
    pub index: usize,
    pub operation: OperationId,
    pub error: PatchError,
}

/// A record list refused as a whole by strict ingestion.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("edit #{index} ({operation}) rejected: {error}")]
pub struct IngestError {
    pub index: usize,
    pub operation: OperationId,
    pub error: PatchError,
}
