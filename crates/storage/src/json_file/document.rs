//! On-disk shape of the single-file document store.
//!
//! Field names follow the document written by earlier versions of the app
//! (`protocolId`, `addedDate`, `progressHistory`, ...). Anything this crate
//! does not model, such as account fields, preferences, or the retired scalar
//! `progress` object, lands in `extra` and is written back untouched.
//!
//! Modelled fields are read leniently: a value of the wrong JSON type counts
//! as absent, and a list element that cannot be read is dropped with a
//! warning, so one bad record never makes the whole document unreadable.

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use wall_core::model::{
    CompletionEntry, ProtocolDetails, ProtocolId, TrackedProtocol, UserId,
};

use crate::repository::StorageError;

#[derive(Debug, Default, Serialize, Deserialize)]
pub(crate) struct WallDocument {
    #[serde(default, deserialize_with = "lenient::list")]
    pub users: Vec<UserDocument>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct UserDocument {
    #[serde(default, deserialize_with = "lenient::text")]
    pub id: String,
    #[serde(default, deserialize_with = "lenient::list")]
    pub protocols: Vec<ProtocolDocument>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ProtocolDocument {
    #[serde(default, deserialize_with = "lenient::text")]
    pub protocol_id: String,
    #[serde(default, deserialize_with = "lenient::opt_text")]
    pub title: Option<String>,
    #[serde(
        default,
        deserialize_with = "lenient::opt_text",
        skip_serializing_if = "Option::is_none"
    )]
    pub description: Option<String>,
    #[serde(
        default,
        deserialize_with = "lenient::opt_text",
        skip_serializing_if = "Option::is_none"
    )]
    pub category: Option<String>,
    #[serde(
        default,
        deserialize_with = "lenient::opt_text",
        skip_serializing_if = "Option::is_none"
    )]
    pub difficulty: Option<String>,
    #[serde(
        default,
        deserialize_with = "lenient::opt_text",
        skip_serializing_if = "Option::is_none"
    )]
    pub time_required: Option<String>,
    #[serde(
        default,
        deserialize_with = "lenient::opt_text",
        skip_serializing_if = "Option::is_none"
    )]
    pub frequency: Option<String>,
    #[serde(default, deserialize_with = "lenient::texts")]
    pub benefits: Vec<String>,
    #[serde(default, deserialize_with = "lenient::texts")]
    pub instructions: Vec<String>,
    #[serde(default, deserialize_with = "lenient::opt_text")]
    pub added_date: Option<String>,
    #[serde(default, alias = "completionHistory", deserialize_with = "lenient::list")]
    pub progress_history: Vec<EntryDocument>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// One completion as stored. `date` is kept as raw JSON so that legacy
/// non-string values are written back unchanged; a null date is dropped
/// from the output like a missing one.
#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct EntryDocument {
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub date: Value,
    #[serde(default, deserialize_with = "lenient::opt_text")]
    pub notes: Option<String>,
}

impl EntryDocument {
    /// The date as the domain sees it.
    fn date_text(&self) -> String {
        match &self.date {
            Value::String(s) => s.clone(),
            Value::Null => String::new(),
            other => other.to_string(),
        }
    }
}

mod lenient {
    use super::{Deserialize, DeserializeOwned, Deserializer, Value};

    fn scalar_text(value: Value) -> Option<String> {
        match value {
            Value::String(s) => Some(s),
            Value::Number(n) => Some(n.to_string()),
            Value::Bool(b) => Some(b.to_string()),
            _ => None,
        }
    }

    pub fn text<'de, D: Deserializer<'de>>(d: D) -> Result<String, D::Error> {
        Ok(scalar_text(Value::deserialize(d)?).unwrap_or_default())
    }

    pub fn opt_text<'de, D: Deserializer<'de>>(d: D) -> Result<Option<String>, D::Error> {
        Ok(scalar_text(Value::deserialize(d)?))
    }

    pub fn texts<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<String>, D::Error> {
        Ok(match Value::deserialize(d)? {
            Value::Array(items) => items.into_iter().filter_map(scalar_text).collect(),
            _ => Vec::new(),
        })
    }

    pub fn list<'de, D, T>(d: D) -> Result<Vec<T>, D::Error>
    where
        D: Deserializer<'de>,
        T: DeserializeOwned,
    {
        let Value::Array(items) = Value::deserialize(d)? else {
            return Ok(Vec::new());
        };
        Ok(items
            .into_iter()
            .filter_map(|item| match serde_json::from_value(item) {
                Ok(parsed) => Some(parsed),
                Err(e) => {
                    tracing::warn!(error = %e, "dropping unreadable record");
                    None
                }
            })
            .collect())
    }
}

impl WallDocument {
    pub fn user(&self, user: &UserId) -> Option<&UserDocument> {
        self.users.iter().find(|u| u.id == user.as_str())
    }

    pub fn user_mut(&mut self, user: &UserId) -> Option<&mut UserDocument> {
        self.users.iter_mut().find(|u| u.id == user.as_str())
    }

    /// The user's document, created empty if this is their first write.
    pub fn user_or_insert(&mut self, user: &UserId) -> &mut UserDocument {
        let idx = match self.users.iter().position(|u| u.id == user.as_str()) {
            Some(idx) => idx,
            None => {
                self.users.push(UserDocument {
                    id: user.as_str().to_owned(),
                    protocols: Vec::new(),
                    extra: Map::new(),
                });
                self.users.len() - 1
            }
        };
        &mut self.users[idx]
    }
}

impl UserDocument {
    pub fn protocol_mut(&mut self, id: &ProtocolId) -> Option<&mut ProtocolDocument> {
        self.protocols
            .iter_mut()
            .find(|p| p.protocol_id == id.as_str())
    }
}

impl ProtocolDocument {
    pub fn from_domain(protocol: &TrackedProtocol) -> Self {
        let mut doc = Self {
            protocol_id: protocol.protocol_id().as_str().to_owned(),
            title: None,
            description: None,
            category: None,
            difficulty: None,
            time_required: None,
            frequency: None,
            benefits: Vec::new(),
            instructions: Vec::new(),
            added_date: None,
            progress_history: Vec::new(),
            extra: Map::new(),
        };
        doc.apply(protocol);
        doc
    }

    /// Overwrite every modelled field from the domain value, keeping `extra`.
    pub fn apply(&mut self, protocol: &TrackedProtocol) {
        let details = protocol.details();
        self.title = Some(details.title.clone());
        self.description.clone_from(&details.description);
        self.category.clone_from(&details.category);
        self.difficulty.clone_from(&details.difficulty);
        self.time_required.clone_from(&details.time_required);
        self.frequency.clone_from(&details.frequency);
        self.benefits.clone_from(&details.benefits);
        self.instructions.clone_from(&details.instructions);
        self.added_date = Some(protocol.added_date().to_rfc3339());
        let mut previous = std::mem::take(&mut self.progress_history);
        self.progress_history = protocol
            .completion_history()
            .iter()
            .map(|entry| {
                let date = previous
                    .iter()
                    .position(|old| old.date_text() == entry.date_raw())
                    .map_or_else(
                        || Value::String(entry.date_raw().to_owned()),
                        |idx| previous.remove(idx).date,
                    );
                EntryDocument {
                    date,
                    notes: Some(entry.notes().unwrap_or_default().to_owned()),
                }
            })
            .collect();
    }

    pub fn to_domain(&self) -> Result<TrackedProtocol, StorageError> {
        let id = ProtocolId::new(self.protocol_id.clone())
            .map_err(|e| StorageError::Serialization(e.to_string()))?;

        let added_date = self
            .added_date
            .as_deref()
            .and_then(|raw| DateTime::parse_from_rfc3339(raw).ok())
            .map_or_else(
                || {
                    tracing::warn!(protocol = %id, "missing or malformed addedDate");
                    DateTime::<Utc>::UNIX_EPOCH
                },
                |at| at.with_timezone(&Utc),
            );

        let details = ProtocolDetails {
            title: self.title.clone().unwrap_or_default(),
            description: self.description.clone(),
            category: self.category.clone(),
            difficulty: self.difficulty.clone(),
            time_required: self.time_required.clone(),
            frequency: self.frequency.clone(),
            benefits: self.benefits.clone(),
            instructions: self.instructions.clone(),
        };

        let history = self
            .progress_history
            .iter()
            .map(|entry| CompletionEntry::from_persisted(entry.date_text(), entry.notes.clone()))
            .collect();

        Ok(TrackedProtocol::from_persisted(id, details, added_date, history))
    }
}
