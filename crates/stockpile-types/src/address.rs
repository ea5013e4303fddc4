// Address format and parsing utilities
//
// Addresses identify callers, ledgers, registries and asset collections.
// They are 20-byte values written as `0x`-prefixed hex and always
// displayed lowercase.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::TypesError;

/// Length of an address in bytes
pub const ADDRESS_LENGTH: usize = 20;

/// Address represents an identity in the system, such as a player, an
/// operator, or a contract component.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Address {
    bytes: [u8; ADDRESS_LENGTH],
}

impl Address {
    /// The all-zero address
    pub const ZERO: Address = Address { bytes: [0u8; ADDRESS_LENGTH] };

    /// Create an address from raw bytes
    pub const fn from_bytes(bytes: [u8; ADDRESS_LENGTH]) -> Self {
        Self { bytes }
    }

    /// Parse an address from `0x`-prefixed (or bare) 40-digit hex
    pub fn parse(input: &str) -> Result<Self, TypesError> {
        let digits = input
            .strip_prefix("0x")
            .or_else(|| input.strip_prefix("0X"))
            .unwrap_or(input);

        if digits.len() != ADDRESS_LENGTH * 2 {
            return Err(TypesError::InvalidAddress(input.to_string()));
        }

        let mut bytes = [0u8; ADDRESS_LENGTH];
        hex::decode_to_slice(digits, &mut bytes)
            .map_err(|_| TypesError::InvalidAddress(input.to_string()))?;

        Ok(Self { bytes })
    }

    /// Deterministic address whose low 8 bytes hold `value`.
    ///
    /// Handy for fixtures and local simulations.
    pub fn from_low_u64(value: u64) -> Self {
        let mut bytes = [0u8; ADDRESS_LENGTH];
        bytes[ADDRESS_LENGTH - 8..].copy_from_slice(&value.to_be_bytes());
        Self { bytes }
    }

    /// Get the byte representation of the address
    pub fn as_bytes(&self) -> &[u8; ADDRESS_LENGTH] {
        &self.bytes
    }

    /// Whether this is the zero address
    pub fn is_zero(&self) -> bool {
        self.bytes == [0u8; ADDRESS_LENGTH]
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.bytes))
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({})", self)
    }
}

impl FromStr for Address {
    type Err = TypesError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Serialize for Address {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Address::parse(&raw).map_err(serde::de::Error::custom)
    }
}
