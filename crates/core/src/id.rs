//! Strongly-typed identifiers used across the domain.
//!
//! Animal identifiers and report names are only unique inside one owner's
//! scope; every lookup pairs them with an [`OwnerId`].

use core::str::FromStr;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::DomainError;

/// Identifier of an owner (the tenant boundary for animals and reports).
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OwnerId(Uuid);

impl OwnerId {
    /// Create a new identifier.
    ///
    /// Uses UUIDv7 (time-ordered). Prefer passing IDs explicitly in tests
    /// for determinism.
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for OwnerId {
    fn default() -> Self {
        Self::new()
    }
}

impl core::fmt::Display for OwnerId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

impl From<Uuid> for OwnerId {
    fn from(value: Uuid) -> Self {
        Self(value)
    }
}

impl From<OwnerId> for Uuid {
    fn from(value: OwnerId) -> Self {
        value.0
    }
}

impl FromStr for OwnerId {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let uuid = Uuid::from_str(s)
            .map_err(|e| DomainError::invalid_input(format!("OwnerId: {e}")))?;
        Ok(Self(uuid))
    }
}

/// Owner-scoped animal identifier (ear tag, registration number, ...).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct AnimalId(String);

/// Owner-scoped report name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ReportName(String);

macro_rules! impl_name_newtype {
    ($t:ty, $name:literal) => {
        impl $t {
            /// Parse an identifier, trimming surrounding whitespace.
            ///
            /// Empty or whitespace-only values are rejected.
            pub fn parse(raw: impl AsRef<str>) -> Result<Self, DomainError> {
                let trimmed = raw.as_ref().trim();
                if trimmed.is_empty() {
                    return Err(DomainError::invalid_input(concat!($name, " is required")));
                }
                Ok(Self(trimmed.to_string()))
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl core::fmt::Display for $t {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl FromStr for $t {
            type Err = DomainError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Self::parse(s)
            }
        }

        impl TryFrom<String> for $t {
            type Error = DomainError;

            fn try_from(value: String) -> Result<Self, Self::Error> {
                Self::parse(value)
            }
        }

        impl From<$t> for String {
            fn from(value: $t) -> Self {
                value.0
            }
        }
    };
}

impl_name_newtype!(AnimalId, "animal identifier");
impl_name_newtype!(ReportName, "report name");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_are_trimmed() {
        let id = AnimalId::parse("  A-17 ").unwrap();
        assert_eq!(id.as_str(), "A-17");
        assert_eq!(id.to_string(), "A-17");
    }

    #[test]
    fn blank_names_are_rejected() {
        assert!(matches!(
            AnimalId::parse("   "),
            Err(DomainError::InvalidInput(_))
        ));
        assert!(matches!(
            "".parse::<ReportName>(),
            Err(DomainError::InvalidInput(_))
        ));
    }

    #[test]
    fn names_deserialize_through_validation() {
        let ok: ReportName = serde_json::from_str("\"Spring weigh-in\"").unwrap();
        assert_eq!(ok.as_str(), "Spring weigh-in");
        assert!(serde_json::from_str::<AnimalId>("\"  \"").is_err());
    }

    #[test]
    fn owner_id_round_trips_through_display() {
        let owner = OwnerId::new();
        let parsed: OwnerId = owner.to_string().parse().unwrap();
        assert_eq!(owner, parsed);
        assert!(matches!(
            "not-a-uuid".parse::<OwnerId>(),
            Err(DomainError::InvalidInput(_))
        ));
    }
}
