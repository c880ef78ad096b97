//! Stored edit records and their ingestion into typed operations.
//!
//! A record is what the edit log persists for each change:
//!
//! ```json
//! { "id": 17, "action": "replace", "data": { "start": 4, "end": 9, "text": "quiz" } }
//! ```
//!
//! `data` may also arrive as a JSON-encoded string, which is how the
//! payload column is stored. Records are decoded exactly once; a record
//! that cannot be decoded becomes a [`Diagnostic`] instead of an [`Edit`].

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::config::IngestMode;
use crate::operation::{DeleteTarget, Edit, EditKind, EditOperation, OperationId};
use crate::{Diagnostic, IngestError, PatchError};

/// One persisted edit, as read from storage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EditRecord {
    #[serde(default = "OperationId::generate")]
    pub id: OperationId,

    /// Kind tag: `insert`, `delete` or `replace`.
    #[serde(default)]
    pub action: String,

    /// Kind-specific fields, as an object or a JSON-encoded string.
    #[serde(default)]
    pub data: Value,
}

/// Union of every field any kind of edit may carry.
#[derive(Debug, Default, Deserialize)]
struct EditPayload {
    position: Option<i64>,
    text: Option<String>,
    #[serde(rename = "char")]
    single_char: Option<String>,
    start: Option<i64>,
    end: Option<i64>,
}

impl EditPayload {
    fn parse(data: &Value) -> Result<Self, PatchError> {
        let parsed = match data {
            Value::Null => return Ok(Self::default()),
            Value::String(encoded) => serde_json::from_str(encoded),
            other => Self::deserialize(other),
        };
        parsed.map_err(|e| PatchError::MalformedOperationPayload(e.to_string()))
    }
}

impl EditRecord {
    pub fn new(id: impl Into<OperationId>, action: impl Into<String>, data: Value) -> Self {
        Self {
            id: id.into(),
            action: action.into(),
            data,
        }
    }

    /// Decodes this record into a typed edit.
    pub fn decode(&self) -> Result<Edit, PatchError> {
        let kind: EditKind = self.action.parse()?;
        let payload = EditPayload::parse(&self.data)?;

        let op = match kind {
            EditKind::Insert => EditOperation::Insert {
                position: payload.position,
                text: payload.text.or(payload.single_char).unwrap_or_default(),
            },
            EditKind::Delete => EditOperation::Delete(DeleteTarget::resolve(
                payload.start,
                payload.end,
                payload.position,
            )),
            EditKind::Replace => match (payload.start, payload.end) {
                (Some(start), Some(end)) => EditOperation::Replace {
                    start,
                    end,
                    text: payload.text.unwrap_or_default(),
                },
                _ => {
                    return Err(PatchError::MalformedOperationPayload(
                        "replace requires both `start` and `end`".to_string(),
                    ));
                }
            },
        };

        Ok(Edit {
            id: self.id.clone(),
            op,
        })
    }
}

/// Edits that survived ingestion, plus what was dropped along the way.
#[derive(Debug, Clone, Default)]
pub struct Ingested {
    pub edits: Vec<Edit>,
    pub diagnostics: Vec<Diagnostic>,
}

/// Decodes an ordered list of records.
///
/// In [`IngestMode::Lenient`] undecodable records are dropped with a
/// diagnostic and the rest keep their relative order. In
/// [`IngestMode::Strict`] the first undecodable record, or a delete that
/// names no position at all, rejects the whole list.
pub fn ingest(records: &[EditRecord], mode: IngestMode) -> Result<Ingested, IngestError> {
    let mut ingested = Ingested::default();

    for (index, record) in records.iter().enumerate() {
        let decoded = record.decode().and_then(|edit| match (mode, &edit.op) {
            (IngestMode::Strict, EditOperation::Delete(DeleteTarget::Missing)) => {
                Err(PatchError::MissingDeletePosition)
            }
            _ => Ok(edit),
        });

        match decoded {
            Ok(edit) => ingested.edits.push(edit),
            Err(error) if mode == IngestMode::Strict => {
                return Err(IngestError {
                    index,
                    operation: record.id.clone(),
                    error,
                });
            }
            Err(error) => ingested.diagnostics.push(Diagnostic {
                index,
                operation: record.id.clone(),
                error,
            }),
        }
    }

    Ok(ingested)
}
