//! The lifecycle envelope carried by every entity record.
//!
//! Two independent flags govern a record's visibility: `hidden` removes it
//! from normal listings, `trashed` moves it to the trash bin. Each flag has an
//! audit record that is present exactly when the flag is set.

use std::fmt;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::de::Error as _;
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};

/// Stored value of a set flag.
pub const FLAG_SET: &str = "s";
/// Stored value of a cleared flag.
pub const FLAG_CLEAR: &str = "n";

/// Encodes a flag for storage.
pub fn flag_to_sql(flag: bool) -> &'static str {
    if flag { FLAG_SET } else { FLAG_CLEAR }
}

/// Decodes a stored flag. Anything other than `'s'` reads as cleared.
pub fn flag_from_sql(value: &str) -> bool {
    value == FLAG_SET
}

/// The coarse state of a record, derived from its envelope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LifecycleState {
    /// Visible in normal listings.
    Active,
    /// Hidden but not trashed.
    Hidden,
    /// In the trash bin, whether or not it is also hidden.
    Trashed,
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LifecycleState::Active => write!(f, "active"),
            LifecycleState::Hidden => write!(f, "hidden"),
            LifecycleState::Trashed => write!(f, "trashed"),
        }
    }
}

/// Which flag an audit record belongs to.
///
/// The verb prefixes the audit JSON keys (`excluidopor`, `deletado_data`, ...).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AuditVerb {
    /// Audit of the `hidden` flag.
    Hidden,
    /// Audit of the `trashed` flag.
    Trashed,
}

impl AuditVerb {
    /// The key prefix used in the serialized audit record.
    pub fn key_prefix(&self) -> &'static str {
        match self {
            AuditVerb::Hidden => "excluido",
            AuditVerb::Trashed => "deletado",
        }
    }

    /// Name of the operation that stamps this verb.
    pub fn operation(&self) -> &'static str {
        match self {
            AuditVerb::Hidden => "hide",
            AuditVerb::Trashed => "move to trash",
        }
    }
}

/// Who changed a flag, when, from where, and on which record.
///
/// Serialized as
/// `{"<verb>por": actor, "<verb>_data": timestamp, "tab": table, "nome": label}`
/// with optional `"ip"` and `"motivo"` keys.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuditRecord {
    /// The flag this record audits.
    pub verb: AuditVerb,
    /// Acting user id.
    pub actor: String,
    /// When the flag was set.
    pub timestamp: DateTime<Utc>,
    /// Table of the audited record.
    pub table: String,
    /// Human-readable label of the audited record.
    pub entity_label: String,
    /// Client IP address.
    pub ip: Option<String>,
    /// Free-text reason supplied by the actor.
    pub reason: Option<String>,
}

impl AuditRecord {
    /// Serializes to the stored JSON form.
    pub fn to_json(&self) -> Value {
        let prefix = self.verb.key_prefix();
        let mut map = Map::new();
        map.insert(format!("{prefix}por"), Value::String(self.actor.clone()));
        map.insert(
            format!("{prefix}_data"),
            Value::String(self.timestamp.to_rfc3339_opts(SecondsFormat::Secs, true)),
        );
        map.insert("tab".to_string(), Value::String(self.table.clone()));
        map.insert("nome".to_string(), Value::String(self.entity_label.clone()));
        if let Some(ip) = &self.ip {
            map.insert("ip".to_string(), Value::String(ip.clone()));
        }
        if let Some(reason) = &self.reason {
            map.insert("motivo".to_string(), Value::String(reason.clone()));
        }
        Value::Object(map)
    }

    /// Parses the stored JSON form. The verb is inferred from the keys.
    pub fn from_json(value: &Value) -> Result<Self, String> {
        let map = value
            .as_object()
            .ok_or_else(|| "audit record must be a JSON object".to_string())?;

        let verb = if map.contains_key("deletadopor") {
            AuditVerb::Trashed
        } else if map.contains_key("excluidopor") {
            AuditVerb::Hidden
        } else {
            return Err("audit record has no actor key".to_string());
        };
        let prefix = verb.key_prefix();

        let text = |key: &str| -> Result<String, String> {
            map.get(key)
                .and_then(Value::as_str)
                .map(str::to_string)
                .ok_or_else(|| format!("audit record is missing '{key}'"))
        };
        let optional = |key: &str| map.get(key).and_then(Value::as_str).map(str::to_string);

        let timestamp = DateTime::parse_from_rfc3339(&text(&format!("{prefix}_data"))?)
            .map_err(|e| format!("invalid audit timestamp: {e}"))?
            .with_timezone(&Utc);

        Ok(Self {
            verb,
            actor: text(&format!("{prefix}por"))?,
            timestamp,
            table: text("tab")?,
            entity_label: text("nome")?,
            ip: optional("ip"),
            reason: optional("motivo"),
        })
    }
}

impl Serialize for AuditRecord {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self.to_json() {
            Value::Object(map) => {
                let mut out = serializer.serialize_map(Some(map.len()))?;
                for (key, value) in &map {
                    out.serialize_entry(key, value)?;
                }
                out.end()
            }
            other => other.serialize(serializer),
        }
    }
}

impl<'de> Deserialize<'de> for AuditRecord {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        AuditRecord::from_json(&value).map_err(D::Error::custom)
    }
}

/// Lifecycle metadata attached to an entity record.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LifecycleEnvelope {
    /// Invisible in normal listings.
    pub hidden: bool,
    /// In the trash bin.
    pub trashed: bool,
    /// Present iff `hidden`.
    pub hidden_audit: Option<AuditRecord>,
    /// Present iff `trashed`.
    pub trashed_audit: Option<AuditRecord>,
}

impl LifecycleEnvelope {
    /// Returns the record's coarse state. Trashed wins over hidden.
    pub fn state(&self) -> LifecycleState {
        if self.trashed {
            LifecycleState::Trashed
        } else if self.hidden {
            LifecycleState::Hidden
        } else {
            LifecycleState::Active
        }
    }

    /// Returns `true` if the record shows up in normal listings.
    pub fn is_visible(&self) -> bool {
        !self.hidden && !self.trashed
    }

    /// Returns `true` if each flag agrees with the presence of its audit.
    pub fn is_consistent(&self) -> bool {
        self.hidden == self.hidden_audit.is_some() && self.trashed == self.trashed_audit.is_some()
    }
}
