//! Sequential replay of edits against a working buffer.
//!
//! ## Learning: Signed Arithmetic at the Boundary
//!
//! Buffer indices are `usize`, but a shifted offset can be negative
//! (a stored position minus a large negative drift). All drift math is
//! done in `i64` with saturating adds, then clamped, and only the
//! clamped value is cast back to `usize`.

use planpatch_buffer::TextBuffer;

use crate::config::PatchConfig;
use crate::operation::{DeleteTarget, Edit, EditOperation, OperationId};
use crate::record::EditRecord;
use crate::{Diagnostic, PatchError};

/// Working state of one replay: the buffer and the accumulated drift.
///
/// Invariant: `drift() == len_chars() - <base length>` after every step,
/// whether the step applied or failed. A failed step changes nothing.
#[derive(Debug, Clone)]
pub struct Patcher {
    buffer: TextBuffer,
    drift: i64,
}

impl Patcher {
    pub fn new(base: &str) -> Self {
        Self {
            buffer: TextBuffer::from(base),
            drift: 0,
        }
    }

    /// Net length change, in characters, of every edit applied so far.
    pub fn drift(&self) -> i64 {
        self.drift
    }

    pub fn len_chars(&self) -> usize {
        self.buffer.len_chars()
    }

    pub fn text(&self) -> std::borrow::Cow<'_, str> {
        self.buffer.text()
    }

    pub fn finish(self) -> String {
        self.buffer.into_string()
    }

    /// Applies one edit and returns its net length delta.
    pub fn apply_one(&mut self, edit: &Edit) -> Result<i64, PatchError> {
        let delta = match &edit.op {
            EditOperation::Insert { position, text } => self.insert(*position, text)?,
            EditOperation::Delete(target) => self.delete(*target)?,
            EditOperation::Replace { start, end, text } => self.replace(*start, *end, text)?,
        };
        self.drift += delta;
        Ok(delta)
    }

    fn len(&self) -> i64 {
        self.buffer.len_chars() as i64
    }

    /// Shifts an original-document offset by the drift and clamps it
    /// into `[lo, len]`.
    fn locate(&self, offset: i64, lo: usize) -> usize {
        let shifted = offset.saturating_add(self.drift);
        shifted.clamp(lo as i64, self.len()) as usize
    }

    fn insert(&mut self, position: Option<i64>, text: &str) -> Result<i64, PatchError> {
        let at = match position {
            Some(position) => self.locate(position, 0),
            None => self.buffer.len_chars(),
        };
        self.buffer.insert(at, text)?;
        Ok(text.chars().count() as i64)
    }

    fn delete(&mut self, target: DeleteTarget) -> Result<i64, PatchError> {
        match target {
            DeleteTarget::Range { start, end } => {
                if self.buffer.is_empty() {
                    return Err(PatchError::DeleteOnEmptyDocument);
                }
                let start = self.locate(start, 0);
                let end = self.locate(end, start);
                if start >= end {
                    return Err(PatchError::InvalidDeleteRange {
                        start,
                        end,
                        len: self.buffer.len_chars(),
                    });
                }
                self.buffer.delete(start..end)?;
                Ok(-((end - start) as i64))
            }
            DeleteTarget::Position(position) => {
                if self.buffer.is_empty() {
                    return Err(PatchError::DeleteOnEmptyDocument);
                }
                let at = position.saturating_add(self.drift).min(self.len() - 1);
                if at < 0 {
                    return Err(PatchError::InvalidDeletePosition {
                        position: at,
                        len: self.buffer.len_chars(),
                    });
                }
                self.buffer.delete_char(at as usize)?;
                Ok(-1)
            }
            DeleteTarget::Missing => Err(PatchError::MissingDeletePosition),
        }
    }

    fn replace(&mut self, start: i64, end: i64, text: &str) -> Result<i64, PatchError> {
        let start = start.saturating_add(self.drift).max(0);
        let end = end.saturating_add(self.drift).min(self.len());
        if start > end {
            return Err(PatchError::InvalidReplaceRange {
                start,
                end,
                len: self.buffer.len_chars(),
            });
        }
        self.buffer.replace(start as usize..end as usize, text)?;
        Ok(text.chars().count() as i64 - (end - start))
    }
}

/// The rebuilt document and everything that was skipped on the way.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatchOutcome {
    pub document: String,
    pub diagnostics: Vec<Diagnostic>,
    /// Final drift, equal to the document's length change in characters
    pub drift: i64,
    /// Number of edits that were applied
    pub applied: usize,
}

impl PatchOutcome {
    /// Returns true if no edit was skipped.
    pub fn is_clean(&self) -> bool {
        self.diagnostics.is_empty()
    }

    pub fn skipped(&self) -> usize {
        self.diagnostics.len()
    }
}

/// Replays edit sequences.
///
/// The applier itself holds only configuration; each call owns a fresh
/// [`Patcher`], so one applier can serve any number of documents.
#[derive(Debug, Clone, Default)]
pub struct PatchApplier {
    config: PatchConfig,
}

impl PatchApplier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: PatchConfig) -> Self {
        Self { config }
    }

    /// Applies `edits` in order to `base`.
    ///
    /// # Example
    /// ```
    /// use planpatch_core::{Edit, PatchApplier};
    ///
    /// let outcome = PatchApplier::new().apply("hello", &[Edit::insert(1u64, 5, " world")]);
    /// assert_eq!(outcome.document, "hello world");
    /// assert!(outcome.is_clean());
    /// ```
    pub fn apply(&self, base: &str, edits: &[Edit]) -> PatchOutcome {
        let mut run = PatchRun::new(&self.config, base);
        for (index, edit) in edits.iter().enumerate() {
            run.step(index, edit);
        }
        run.finish()
    }

    /// Decodes and applies stored records in order.
    ///
    /// Records that fail to decode are reported at their own index and
    /// skipped; this path is always lenient.
    pub fn apply_records(&self, base: &str, records: &[EditRecord]) -> PatchOutcome {
        let mut run = PatchRun::new(&self.config, base);
        for (index, record) in records.iter().enumerate() {
            match record.decode() {
                Ok(edit) => run.step(index, &edit),
                Err(error) => run.skip(index, &record.id, error),
            }
        }
        run.finish()
    }
}

struct PatchRun<'a> {
    config: &'a PatchConfig,
    patcher: Patcher,
    diagnostics: Vec<Diagnostic>,
    applied: usize,
    seen: usize,
}

impl<'a> PatchRun<'a> {
    fn new(config: &'a PatchConfig, base: &str) -> Self {
        Self {
            config,
            patcher: Patcher::new(base),
            diagnostics: Vec::new(),
            applied: 0,
            seen: 0,
        }
    }

    fn step(&mut self, index: usize, edit: &Edit) {
        self.seen += 1;
        match self.patcher.apply_one(edit) {
            Ok(delta) => {
                self.applied += 1;
                tracing::debug!(
                    operation = %edit.id,
                    kind = %edit.op.kind(),
                    delta,
                    drift = self.patcher.drift(),
                    "Applied edit #{}",
                    index
                );
            }
            Err(error) => self.record(index, &edit.id, error),
        }
    }

    fn skip(&mut self, index: usize, operation: &OperationId, error: PatchError) {
        self.seen += 1;
        self.record(index, operation, error);
    }

    fn record(&mut self, index: usize, operation: &OperationId, error: PatchError) {
        let diagnostic = Diagnostic {
            index,
            operation: operation.clone(),
            error,
        };
        if self.config.log_diagnostics {
            tracing::warn!("Skipping {}", diagnostic);
        }
        self.diagnostics.push(diagnostic);
    }

    fn finish(self) -> PatchOutcome {
        let drift = self.patcher.drift();
        tracing::info!(
            "Applied {} of {} edits ({} skipped, drift {})",
            self.applied,
            self.seen,
            self.diagnostics.len(),
            drift
        );
        PatchOutcome {
            document: self.patcher.finish(),
            diagnostics: self.diagnostics,
            drift,
            applied: self.applied,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn apply(base: &str, edits: &[Edit]) -> PatchOutcome {
        PatchApplier::new().apply(base, edits)
    }

    #[test]
    fn test_empty_edit_list_is_identity() {
        let outcome = apply("lesson 1: fractions", &[]);
        assert_eq!(outcome.document, "lesson 1: fractions");
        assert_eq!(outcome.drift, 0);
        assert!(outcome.is_clean());
    }

    #[test]
    fn test_insert_at_end() {
        let outcome = apply("hello", &[Edit::insert(1u64, 5, " world")]);
        assert_eq!(outcome.document, "hello world");
        assert_eq!(outcome.drift, 6);
    }

    #[test]
    fn test_delete_range() {
        let outcome = apply("hello world", &[Edit::delete_range(1u64, 5, 11)]);
        assert_eq!(outcome.document, "hello");
        assert_eq!(outcome.drift, -6);
    }

    #[test]
    fn test_delete_position_shifted_by_drift() {
        let outcome = apply(
            "hello",
            &[Edit::insert(1u64, 0, "say: "), Edit::delete_at(2u64, 0)],
        );
        assert_eq!(outcome.document, "say: ello");
        assert_eq!(outcome.drift, 4);
        assert_eq!(outcome.applied, 2);
    }

    #[test]
    fn test_replace() {
        let outcome = apply("abcdef", &[Edit::replace(1u64, 1, 3, "XYZ")]);
        assert_eq!(outcome.document, "aXYZdef");
        assert_eq!(outcome.drift, 1);
    }

    #[test]
    fn test_delete_on_empty_document_is_skipped() {
        let outcome = apply("", &[Edit::delete_range(1u64, 0, 1)]);
        assert_eq!(outcome.document, "");
        assert_eq!(outcome.diagnostics[0].error, PatchError::DeleteOnEmptyDocument);
    }

    #[test]
    fn test_inverted_replace_is_skipped() {
        let outcome = apply("abc", &[Edit::replace(1u64, 5, 2, "Z")]);
        assert_eq!(outcome.document, "abc");
        assert_eq!(
            outcome.diagnostics[0].error,
            PatchError::InvalidReplaceRange {
                start: 5,
                end: 2,
                len: 3
            }
        );
    }

    #[test]
    fn test_replace_end_clamped_to_length() {
        let outcome = apply("abc", &[Edit::replace(1u64, 1, 99, "Z")]);
        assert_eq!(outcome.document, "aZ");
        assert!(outcome.is_clean());
    }

    #[test]
    fn test_append_without_position() {
        let outcome = apply("plan", &[Edit::append(1u64, "!"), Edit::append(2u64, "?")]);
        assert_eq!(outcome.document, "plan!?");
    }

    #[test]
    fn test_append_ignores_negative_drift() {
        let outcome = apply(
            "abcdef",
            &[Edit::delete_range(1u64, 0, 3), Edit::append(2u64, "!")],
        );
        assert_eq!(outcome.document, "def!");
        assert_eq!(outcome.drift, -2);
    }

    #[test]
    fn test_insert_clamps_out_of_range_positions() {
        let outcome = apply(
            "abc",
            &[Edit::insert(1u64, -10, "<"), Edit::insert(2u64, 100, ">")],
        );
        assert_eq!(outcome.document, "<abc>");
    }

    #[test]
    fn test_delete_range_collapsed_after_clamp() {
        let outcome = apply("abc", &[Edit::delete_range(1u64, 10, 20)]);
        assert_eq!(outcome.document, "abc");
        assert_eq!(
            outcome.diagnostics[0].error,
            PatchError::InvalidDeleteRange {
                start: 3,
                end: 3,
                len: 3
            }
        );
    }

    #[test]
    fn test_delete_position_past_end_removes_last_char() {
        let outcome = apply("abc", &[Edit::delete_at(1u64, 50)]);
        assert_eq!(outcome.document, "ab");
    }

    #[test]
    fn test_delete_position_before_start_after_drift() {
        let outcome = apply(
            "abcdef",
            &[Edit::delete_range(1u64, 0, 4), Edit::delete_at(2u64, 1)],
        );
        assert_eq!(outcome.document, "ef");
        assert_eq!(
            outcome.diagnostics[0].error,
            PatchError::InvalidDeletePosition {
                position: -3,
                len: 2
            }
        );
    }

    #[test]
    fn test_missing_delete_position() {
        let edit = Edit::new(7u64, EditOperation::Delete(DeleteTarget::Missing));
        let outcome = apply("abc", &[edit]);
        assert_eq!(outcome.document, "abc");
        assert_eq!(outcome.diagnostics[0].error, PatchError::MissingDeletePosition);
        assert_eq!(outcome.diagnostics[0].operation.as_str(), "7");
    }

    #[test]
    fn test_failed_step_leaves_state_untouched() {
        let mut patcher = Patcher::new("abc");
        patcher.apply_one(&Edit::insert(1u64, 0, "xy")).unwrap();
        let before = (patcher.text().into_owned(), patcher.drift());
        assert!(patcher.apply_one(&Edit::replace(2u64, 4, 0, "Z")).is_err());
        assert_eq!((patcher.text().into_owned(), patcher.drift()), before);
    }

    #[test]
    fn test_multibyte_offsets_are_characters() {
        let outcome = apply("naïve café", &[Edit::replace(1u64, 6, 10, "bistro")]);
        assert_eq!(outcome.document, "naïve bistro");
    }

    #[test]
    fn test_apply_records_reports_unknown_and_continues() {
        let records = vec![
            EditRecord::new(1u64, "frobnicate", json!({ "position": 0, "text": "!" })),
            EditRecord::new(2u64, "insert", json!({ "position": 3, "text": "d" })),
            EditRecord::new(3u64, "insert", "{broken".into()),
        ];
        let outcome = PatchApplier::new().apply_records("abc", &records);
        assert_eq!(outcome.document, "abcd");
        assert_eq!(outcome.applied, 1);
        assert_eq!(outcome.skipped(), 2);
        assert_eq!(outcome.diagnostics[0].index, 0);
        assert!(matches!(
            outcome.diagnostics[1].error,
            PatchError::MalformedOperationPayload(_)
        ));
        assert_eq!(outcome.diagnostics[1].index, 2);
    }

    #[test]
    fn test_quiet_config_still_collects_diagnostics() {
        let applier = PatchApplier::with_config(PatchConfig {
            log_diagnostics: false,
            ..PatchConfig::default()
        });
        let outcome = applier.apply("", &[Edit::delete_at(1u64, 0)]);
        assert_eq!(outcome.skipped(), 1);
    }
}
