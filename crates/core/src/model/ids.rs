use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use thiserror::Error;

/// Error type for parsing an identifier from a string.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind} must not be empty")]
pub struct IdError {
    kind: &'static str,
}

fn normalize(kind: &'static str, raw: impl Into<String>) -> Result<String, IdError> {
    let raw = raw.into();
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(IdError { kind });
    }
    if trimmed.len() == raw.len() {
        Ok(raw)
    } else {
        Ok(trimmed.to_owned())
    }
}

/// Identifier of a user owning a wall.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct UserId(String);

impl UserId {
    /// Creates a new `UserId` from a non-blank string.
    ///
    /// # Errors
    ///
    /// Returns `IdError` if the value is empty after trimming.
    pub fn new(id: impl Into<String>) -> Result<Self, IdError> {
        normalize("UserId", id).map(Self)
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Stable identifier of a protocol, shared between the catalog and walls.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ProtocolId(String);

impl ProtocolId {
    /// Creates a new `ProtocolId` from a non-blank string.
    ///
    /// # Errors
    ///
    /// Returns `IdError` if the value is empty after trimming.
    pub fn new(id: impl Into<String>) -> Result<Self, IdError> {
        normalize("ProtocolId", id).map(Self)
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "UserId({})", self.0)
    }
}

impl fmt::Debug for ProtocolId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ProtocolId({})", self.0)
    }
}

// ─── Display Implementations ───────────────────────────────────────────────────

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Display for ProtocolId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ─── Conversions ───────────────────────────────────────────────────────────────

impl FromStr for UserId {
    type Err = IdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl FromStr for ProtocolId {
    type Err = IdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for UserId {
    type Error = IdError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl TryFrom<String> for ProtocolId {
    type Error = IdError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<UserId> for String {
    fn from(value: UserId) -> Self {
        value.0
    }
}

impl From<ProtocolId> for String {
    fn from(value: ProtocolId) -> Self {
        value.0
    }
}

// ─── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn protocol_id_display() {
        let id = ProtocolId::new("morning-light").unwrap();
        assert_eq!(id.to_string(), "morning-light");
    }

    #[test]
    fn ids_are_trimmed() {
        let id: UserId = "  42 ".parse().unwrap();
        assert_eq!(id.as_str(), "42");
    }

    #[test]
    fn blank_ids_are_rejected() {
        let err = "   ".parse::<ProtocolId>().unwrap_err();
        assert_eq!(err.to_string(), "ProtocolId must not be empty");
        assert!(UserId::new("").is_err());
    }

    #[test]
    fn try_from_string_validates() {
        assert!(ProtocolId::try_from(String::from("\t")).is_err());
        let id = UserId::try_from(String::from("user-1")).unwrap();
        assert_eq!(String::from(id), "user-1");
    }
}
