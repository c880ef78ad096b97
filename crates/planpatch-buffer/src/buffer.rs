//! Rope-backed text buffer.
//!
//! Edits are replayed one at a time against a document that can be a
//! few hundred kilobytes long. A rope keeps each insertion and removal
//! at O(log n) instead of shifting the whole tail of a `String`, and it
//! indexes by character natively.

use ropey::Rope;
use std::borrow::Cow;
use std::ops::Range;

use crate::{BufferError, BufferResult};

/// A text buffer addressed by character index.
///
/// Every mutation is bounds-checked and reported as a [`BufferError`]
/// rather than a panic, so callers can keep going after a bad edit.
#[derive(Debug, Clone, Default)]
pub struct TextBuffer {
    rope: Rope,
}

impl TextBuffer {
    /// Creates a new empty buffer.
    ///
    /// # Example
    /// ```
    /// use planpatch_buffer::TextBuffer;
    ///
    /// let buffer = TextBuffer::new();
    /// assert!(buffer.is_empty());
    /// ```
    pub fn new() -> Self {
        Self { rope: Rope::new() }
    }

    // ==================== Text Access ====================

    /// Returns the entire text content.
    ///
    /// Borrows when the rope fits in a single chunk and allocates otherwise.
    #[inline]
    pub fn text(&self) -> Cow<'_, str> {
        self.rope.slice(..).into()
    }

    /// Returns a slice of text by character range.
    pub fn slice(&self, range: Range<usize>) -> BufferResult<Cow<'_, str>> {
        self.check_range(&range)?;
        Ok(self.rope.slice(range).into())
    }

    /// Returns the character at `char_idx`.
    pub fn char_at(&self, char_idx: usize) -> BufferResult<char> {
        if char_idx >= self.len_chars() {
            return Err(BufferError::InvalidCharIndex {
                index: char_idx,
                len: self.len_chars(),
            });
        }
        Ok(self.rope.char(char_idx))
    }

    // ==================== Measurements ====================

    /// Returns true if the buffer is empty.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.rope.len_chars() == 0
    }

    /// Returns the number of characters in the buffer.
    #[inline]
    pub fn len_chars(&self) -> usize {
        self.rope.len_chars()
    }

    /// Returns the number of bytes in the buffer.
    #[inline]
    pub fn len_bytes(&self) -> usize {
        self.rope.len_bytes()
    }

    // ==================== Mutations ====================

    /// Inserts text at a character index.
    ///
    /// `char_idx == len_chars()` appends.
    pub fn insert(&mut self, char_idx: usize, text: &str) -> BufferResult<()> {
        if char_idx > self.len_chars() {
            return Err(BufferError::InvalidCharIndex {
                index: char_idx,
                len: self.len_chars(),
            });
        }
        self.rope.insert(char_idx, text);
        Ok(())
    }

    /// Deletes text in a character range and returns what was removed.
    pub fn delete(&mut self, range: Range<usize>) -> BufferResult<String> {
        self.check_range(&range)?;
        let deleted: String = self.rope.slice(range.clone()).into();
        self.rope.remove(range);
        Ok(deleted)
    }

    /// Deletes the single character at `char_idx`.
    pub fn delete_char(&mut self, char_idx: usize) -> BufferResult<char> {
        let ch = self.char_at(char_idx)?;
        self.rope.remove(char_idx..char_idx + 1);
        Ok(ch)
    }

    /// Replaces text in a range with new text, returning the removed text.
    ///
    /// The range is validated before anything is touched, so a failed
    /// replace leaves the buffer unchanged.
    pub fn replace(&mut self, range: Range<usize>, text: &str) -> BufferResult<String> {
        self.check_range(&range)?;
        let start = range.start;
        let deleted = self.delete(range)?;
        self.rope.insert(start, text);
        Ok(deleted)
    }

    /// Consumes the buffer and returns its content.
    pub fn into_string(self) -> String {
        self.rope.to_string()
    }

    fn check_range(&self, range: &Range<usize>) -> BufferResult<()> {
        let len = self.len_chars();
        if range.start > range.end || range.end > len {
            return Err(BufferError::InvalidRange {
                start: range.start,
                end: range.end,
                len,
            });
        }
        Ok(())
    }
}

impl From<&str> for TextBuffer {
    fn from(s: &str) -> Self {
        Self {
            rope: Rope::from_str(s),
        }
    }
}

impl From<String> for TextBuffer {
    fn from(s: String) -> Self {
        Self::from(s.as_str())
    }
}
