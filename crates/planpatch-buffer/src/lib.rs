//! # Planpatch Buffer
//!
//! Mutable document buffer for replaying recorded edits.
//!
//! Every index accepted or returned by this crate is a character
//! (Unicode scalar value) index. Byte offsets never leak out, so a
//! position can never land inside a multi-byte sequence.

mod buffer;

pub use buffer::TextBuffer;

/// Result type for buffer operations
pub type BufferResult<T> = Result<T, BufferError>;

/// Errors that can occur during buffer operations
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BufferError {
    #[error("Invalid character index: {index} (length {len})")]
    InvalidCharIndex { index: usize, len: usize },

    #[error("Invalid character range: {start}..{end} (length {len})")]
    InvalidRange { start: usize, end: usize, len: usize },
}
