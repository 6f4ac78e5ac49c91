//! The record-reader boundary.
//!
//! A reader turns one tick's raw response (a list of byte blobs, one per
//! backend message) into a [`RecordSet`].  Readers are stateless; the action
//! layer above never sees raw bytes.

use serde_json::Value;

use crate::error::{ProtocolError, ProtocolResult};
use crate::record::{Record, RecordKind};
use crate::record_set::RecordSet;

/// Decodes a raw response batch into typed records.
pub trait RecordReader {
    fn read(&self, raw: &[Vec<u8>]) -> ProtocolResult<RecordSet>;
}

/// Reads records encoded as JSON.
///
/// Each raw element is one JSON document holding either a single record
/// object or an array of them.  Every record carries a `"$type"` tag.
#[derive(Clone, Debug, Default)]
pub struct JsonRecordReader {
    /// Reject records whose `"$type"` is not a known [`RecordKind`].
    /// When `false` they are skipped.
    pub strict: bool,
}

impl JsonRecordReader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn strict() -> Self {
        Self { strict: true }
    }

    fn read_value(&self, value: Value, out: &mut RecordSet) -> ProtocolResult<()> {
        match value {
            Value::Array(items) => {
                for item in items {
                    self.read_value(item, out)?;
                }
                Ok(())
            }
            Value::Object(map) => {
                let tag = map
                    .get("$type")
                    .and_then(Value::as_str)
                    .ok_or(ProtocolError::MissingTag)?;
                if RecordKind::from_type_name(tag).is_none() {
                    if self.strict {
                        return Err(ProtocolError::UnknownRecord(tag.to_owned()));
                    }
                    return Ok(());
                }
                out.push(serde_json::from_value::<Record>(Value::Object(map))?);
                Ok(())
            }
            _ => Err(ProtocolError::MissingTag),
        }
    }
}

impl RecordReader for JsonRecordReader {
    fn read(&self, raw: &[Vec<u8>]) -> ProtocolResult<RecordSet> {
        let mut set = RecordSet::new();
        for blob in raw {
            let value: Value = serde_json::from_slice(blob)?;
            self.read_value(value, &mut set)?;
        }
        Ok(set)
    }
}

/// Encode records as a single JSON array document, the inverse of
/// [`JsonRecordReader`] for one element.
pub fn encode_records<'a>(records: impl IntoIterator<Item = &'a Record>) -> ProtocolResult<Vec<u8>> {
    let records: Vec<&Record> = records.into_iter().collect();
    Ok(serde_json::to_vec(&records)?)
}
