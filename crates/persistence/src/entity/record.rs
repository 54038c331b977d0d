//! Stored entity records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::lifecycle::{LifecycleEnvelope, LifecycleState};

/// A record of some entity type, as stored in a tenant's database.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityRecord {
    /// Record id, unique per entity type within a tenant.
    pub id: String,
    /// Entity type (table) name.
    pub entity: String,
    /// Entity fields; always a JSON object.
    pub data: Value,
    /// Lifecycle flags and their audits.
    pub envelope: LifecycleEnvelope,
    /// When the record was created.
    pub created_at: DateTime<Utc>,
    /// When the record or its envelope last changed.
    pub updated_at: DateTime<Utc>,
}

impl EntityRecord {
    /// Label used in audit stamps: `data[label_field]` when it is a non-empty
    /// string, otherwise the id.
    pub fn label(&self, label_field: &str) -> String {
        match self.data.get(label_field) {
            Some(Value::String(s)) if !s.trim().is_empty() => s.clone(),
            Some(Value::Number(n)) => n.to_string(),
            _ => self.id.clone(),
        }
    }

    /// The record's coarse lifecycle state.
    pub fn state(&self) -> LifecycleState {
        self.envelope.state()
    }
}
