//! # Documents and Writes
//!
//! A [`Document`] is what the store hands back: an id plus a JSON object.
//! A [`DocumentWrite`] is what we hand the store: a JSON object plus the
//! names of fields the store must fill with its own clock.
//!
//! ## Server Timestamps
//! ```text
//!   client                               store
//!   ──────                               ─────
//!   DocumentWrite {                      {
//!     fields: { name, paperLevel },  ──►   name, paperLevel,
//!     server_timestamps: [createdAt]       createdAt: <store clock>
//!   }                                    }
//! ```
//! The client never writes its own clock into `createdAt`, `importedAt` or
//! `timestamp`; ordering across terminals relies on a single clock.

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};

use crate::error::{StoreError, StoreResult};

/// Field the document id is exposed under when decoding.
pub const ID_FIELD: &str = "id";

// =============================================================================
// Document
// =============================================================================

/// A stored document.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub id: String,
    pub fields: Map<String, Value>,
}

impl Document {
    pub fn new(id: impl Into<String>, fields: Map<String, Value>) -> Self {
        Self {
            id: id.into(),
            fields,
        }
    }

    /// Reads a field.
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }

    /// Decodes the document into `T`.
    ///
    /// The document id is injected as `"id"` unless the payload already
    /// carries one, so record types can declare an `id` field.
    pub fn decode<T: DeserializeOwned>(&self) -> StoreResult<T> {
        let mut fields = self.fields.clone();
        fields
            .entry(ID_FIELD)
            .or_insert_with(|| Value::String(self.id.clone()));

        serde_json::from_value(Value::Object(fields)).map_err(|e| StoreError::InvalidDocument {
            id: self.id.clone(),
            reason: e.to_string(),
        })
    }
}

// =============================================================================
// Document Write
// =============================================================================

/// Payload of a create, set, merge or batch write.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DocumentWrite {
    pub fields: Map<String, Value>,
    /// Fields the store stamps with its own time on commit.
    pub server_timestamps: Vec<String>,
}

impl DocumentWrite {
    /// Creates an empty write.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a write from any serializable record.
    ///
    /// ## Errors
    /// `InvalidDocument` if `record` does not serialize to a JSON object.
    pub fn from_record<T: Serialize>(record: &T) -> StoreResult<Self> {
        match serde_json::to_value(record)? {
            Value::Object(fields) => Ok(Self {
                fields,
                server_timestamps: Vec::new(),
            }),
            other => Err(StoreError::InvalidDocument {
                id: String::new(),
                reason: format!("expected a JSON object, got {other}"),
            }),
        }
    }

    /// Sets one field.
    pub fn set(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(field.into(), value.into());
        self
    }

    /// Drops a field from the payload (e.g. an id that belongs in the path).
    pub fn without(mut self, field: &str) -> Self {
        self.fields.remove(field);
        self
    }

    /// Asks the store to stamp `field` with server time.
    pub fn with_server_timestamp(mut self, field: impl Into<String>) -> Self {
        let field = field.into();
        self.fields.remove(&field);
        if !self.server_timestamps.contains(&field) {
            self.server_timestamps.push(field);
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use serde_json::json;

    #[derive(Debug, Serialize, Deserialize, PartialEq)]
    #[serde(rename_all = "camelCase")]
    struct Probe {
        id: String,
        paper_level: u8,
    }

    fn object(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => panic!("not an object"),
        }
    }

    #[test]
    fn test_decode_injects_id() {
        let doc = Document::new("t-1", object(json!({ "paperLevel": 40 })));
        let probe: Probe = doc.decode().unwrap();
        assert_eq!(probe.id, "t-1");
        assert_eq!(probe.paper_level, 40);
    }

    #[test]
    fn test_decode_failure_names_document() {
        let doc = Document::new("t-2", object(json!({ "paperLevel": "full" })));
        let err = doc.decode::<Probe>().unwrap_err();
        assert!(matches!(err, StoreError::InvalidDocument { ref id, .. } if id == "t-2"));
    }

    #[test]
    fn test_server_timestamp_replaces_client_value() {
        let write = DocumentWrite::new()
            .set("importedAt", Value::Null)
            .set("code", "ABC123")
            .with_server_timestamp("importedAt")
            .with_server_timestamp("importedAt");
        assert!(!write.fields.contains_key("importedAt"));
        assert_eq!(write.server_timestamps, vec!["importedAt".to_string()]);
    }

    #[test]
    fn test_from_record_rejects_scalars() {
        assert!(DocumentWrite::from_record(&42).is_err());
        let write = DocumentWrite::from_record(&Probe {
            id: "x".into(),
            paper_level: 1,
        })
        .unwrap()
        .without("id");
        assert_eq!(write.fields.get("paperLevel"), Some(&json!(1)));
        assert!(!write.fields.contains_key("id"));
    }
}
