// Resource type identifiers

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::TypesError;

/// Maximum length of a resource name in bytes
pub const MAX_RESOURCE_NAME_LEN: usize = 32;

/// Name of a fungible resource such as `wood` or `iron_ore`.
///
/// Names are 1 to 32 bytes of `[a-z0-9_-]`; input is lowercased before
/// validation. Whether a well-formed name is actually tradeable is decided
/// by the external resource type registry.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ResourceType(String);

impl ResourceType {
    pub fn new(name: &str) -> Result<Self, TypesError> {
        let normalized = name.to_ascii_lowercase();
        let well_formed = !normalized.is_empty()
            && normalized.len() <= MAX_RESOURCE_NAME_LEN
            && normalized
                .bytes()
                .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'_' || b == b'-');

        if !well_formed {
            return Err(TypesError::InvalidResourceName(name.to_string()));
        }
        Ok(Self(normalized))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ResourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for ResourceType {
    type Err = TypesError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl Serialize for ResourceType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for ResourceType {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        ResourceType::new(&raw).map_err(serde::de::Error::custom)
    }
}
