use rustc_hash::FxHashMap;
use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};

use crate::message_types::MessageType;

/// A scalar field value extracted from a decoded frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Number(f64),
    Text(String),
}

/// One decoded telemetry frame after field extraction and timestamp
/// normalization. Immutable once built.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Record {
    /// Seconds since boot or epoch, whichever the decoder provides.
    /// 0.0 when the decoder supplied none.
    pub timestamp: f64,
    #[serde(flatten)]
    pub fields: FxHashMap<String, FieldValue>,
}

impl Record {
    pub fn new(timestamp: f64) -> Self {
        Self {
            timestamp,
            fields: FxHashMap::default(),
        }
    }

    pub fn with_num(mut self, name: &str, value: f64) -> Self {
        self.fields
            .insert(name.to_string(), FieldValue::Number(value));
        self
    }

    pub fn with_text(mut self, name: &str, value: &str) -> Self {
        self.fields
            .insert(name.to_string(), FieldValue::Text(value.to_string()));
        self
    }

    /// Numeric field value, `None` when absent or non-numeric.
    pub fn num(&self, name: &str) -> Option<f64> {
        match self.fields.get(name) {
            Some(FieldValue::Number(v)) => Some(*v),
            _ => None,
        }
    }

    /// Numeric field read with an explicit fallback. Anomaly rules and the
    /// context digest use this so the default is visible at the call site.
    pub fn num_or(&self, name: &str, default: f64) -> f64 {
        self.num(name).unwrap_or(default)
    }
}

/// Per-type ordered storage for one flight log.
///
/// Every tracked [`MessageType`] is present from construction, possibly with
/// an empty sequence. Records of unknown types never enter the store.
#[derive(Debug, Clone)]
pub struct RecordStore {
    records: FxHashMap<MessageType, Vec<Record>>,
}

impl RecordStore {
    pub fn new() -> Self {
        let mut records = FxHashMap::default();
        for msg_type in MessageType::ALL {
            records.insert(msg_type, Vec::new());
        }
        Self { records }
    }

    pub fn push(&mut self, msg_type: MessageType, record: Record) {
        // Every tracked type is inserted in new(), so the entry always exists.
        self.records.entry(msg_type).or_default().push(record);
    }

    pub fn records(&self, msg_type: MessageType) -> &[Record] {
        self.records
            .get(&msg_type)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Number of stored records of one type.
    pub fn count(&self, msg_type: MessageType) -> usize {
        self.records(msg_type).len()
    }

    /// Per-type record counts for the types that hold any data.
    pub fn counts(&self) -> Vec<(MessageType, usize)> {
        MessageType::ALL
            .iter()
            .filter_map(|&t| {
                let n = self.count(t);
                (n > 0).then_some((t, n))
            })
            .collect()
    }

    pub fn total_records(&self) -> usize {
        self.records.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.total_records() == 0
    }

    /// Drop every record older than `cutoff`, per type. Returns how many
    /// records each type lost. Idempotent: a second trim at the same cutoff
    /// removes nothing.
    pub fn trim_before(&mut self, cutoff: f64) -> Vec<(MessageType, usize)> {
        let mut removed = Vec::new();
        for msg_type in MessageType::ALL {
            if let Some(seq) = self.records.get_mut(&msg_type) {
                let before = seq.len();
                seq.retain(|r| r.timestamp >= cutoff);
                let dropped = before - seq.len();
                if dropped > 0 {
                    removed.push((msg_type, dropped));
                }
            }
        }
        removed
    }
}

impl Default for RecordStore {
    fn default() -> Self {
        Self::new()
    }
}

// Serialized as `tag -> array of records` in MessageType::ALL order, the
// shape the upload endpoint returns to the frontend.
impl Serialize for RecordStore {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut map = serializer.serialize_map(Some(MessageType::ALL.len()))?;
        for msg_type in MessageType::ALL {
            map.serialize_entry(msg_type.as_str(), self.records(msg_type))?;
        }
        map.end()
    }
}
