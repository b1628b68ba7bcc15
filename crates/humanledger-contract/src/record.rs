//! Records and the codec that turns them into ledger payloads.
//!
//! A record is a flat JSON object: a `docType` discriminant plus string
//! fields, e.g. `{"birthday":"19900101","docType":"human","name":"Tanaka"}`.
//! Encoding is deterministic: object keys are written in ascending order.

use std::collections::BTreeMap;

use serde::Deserialize;
use serde_json::{Map, Value};

use crate::error::DecodeFailure;

/// Discriminant for human records.
pub const DOC_TYPE_HUMAN: &str = "human";

/// JSON key holding the discriminant.
pub const DOC_TYPE_KEY: &str = "docType";

/// One domain entity: a schema discriminant plus named string fields.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Record {
    #[serde(rename = "docType")]
    doc_type: String,
    #[serde(flatten)]
    fields: BTreeMap<String, String>,
}

impl Record {
    pub fn new(doc_type: impl Into<String>) -> Self {
        Self { doc_type: doc_type.into(), fields: BTreeMap::new() }
    }

    pub fn with_field(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.set_field(name, value);
        self
    }

    /// Set a field. Setting `docType` replaces the discriminant.
    pub fn set_field(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        if name == DOC_TYPE_KEY {
            self.doc_type = value.into();
        } else {
            self.fields.insert(name, value.into());
        }
    }

    pub fn doc_type(&self) -> &str {
        &self.doc_type
    }

    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(String::as_str)
    }

    /// Fields other than `docType`, in name order.
    pub fn fields(&self) -> &BTreeMap<String, String> {
        &self.fields
    }

    /// The record as a JSON object, `docType` included.
    pub fn to_json(&self) -> Value {
        let mut map = Map::new();
        map.insert(DOC_TYPE_KEY.to_string(), Value::String(self.doc_type.clone()));
        for (name, value) in &self.fields {
            map.insert(name.clone(), Value::String(value.clone()));
        }
        Value::Object(map)
    }
}

/// Converts records to and from opaque ledger payloads.
pub struct RecordCodec;

impl RecordCodec {
    /// Serialize a record. Identical records always produce identical bytes.
    pub fn encode(record: &Record) -> Vec<u8> {
        record.to_json().to_string().into_bytes()
    }

    /// Parse a payload back into a record.
    ///
    /// Anything other than a JSON object with a string `docType` and only
    /// string-valued fields is a `DecodeFailure` carrying the original bytes.
    pub fn decode(bytes: &[u8]) -> Result<Record, DecodeFailure> {
        serde_json::from_slice(bytes).map_err(|e| DecodeFailure {
            raw: bytes.to_vec(),
            reason: e.to_string(),
        })
    }
}

/// Typed view of a `human` record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Human {
    pub name: String,
    pub birthday: String,
}

impl Human {
    pub fn new(name: impl Into<String>, birthday: impl Into<String>) -> Self {
        Self { name: name.into(), birthday: birthday.into() }
    }

    pub fn to_record(&self) -> Record {
        Record::new(DOC_TYPE_HUMAN)
            .with_field("name", self.name.as_str())
            .with_field("birthday", self.birthday.as_str())
    }

    /// None unless the record is a `human` with both fields present.
    pub fn from_record(record: &Record) -> Option<Self> {
        if record.doc_type() != DOC_TYPE_HUMAN {
            return None;
        }
        Some(Self::new(record.field("name")?, record.field("birthday")?))
    }
}
