use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A vendor record mapped onto local field names, ready to upsert.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizedRecord {
    /// Vendor-issued identifier, unique per tenant and entity.
    pub external_id: String,
    /// Mapped local fields.
    pub fields: Map<String, Value>,
    /// Untouched vendor payload kept for audit and re-processing.
    pub raw_payload: Value,
    /// Vendor-side modification time, when the payload carries one.
    pub source_updated_at: Option<DateTime<Utc>>,
    /// External id of the parent record for tree-shaped entities.
    pub parent_external_id: Option<String>,
    pub lines: Vec<NormalizedLine>,
}

impl NormalizedRecord {
    #[must_use]
    pub fn new(
        external_id: impl Into<String>,
        fields: Map<String, Value>,
        raw_payload: Value,
    ) -> Self {
        Self {
            external_id: external_id.into(),
            fields,
            raw_payload,
            source_updated_at: None,
            parent_external_id: None,
            lines: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_updated_at(mut self, updated_at: Option<DateTime<Utc>>) -> Self {
        self.source_updated_at = updated_at;
        self
    }

    #[must_use]
    pub fn with_parent(mut self, parent_external_id: Option<String>) -> Self {
        self.parent_external_id = parent_external_id.filter(|p| !p.is_empty());
        self
    }

    #[must_use]
    pub fn with_lines(mut self, lines: Vec<NormalizedLine>) -> Self {
        self.lines = lines;
        self
    }

    /// Mapped value of `key`, or `None` when absent.
    #[must_use]
    pub fn field(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }
}

/// One child line item of a [`NormalizedRecord`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizedLine {
    pub external_id: Option<String>,
    pub fields: Map<String, Value>,
    pub raw_payload: Value,
}
