// Fixed-point resource amounts
//
// All balances and capacities are unsigned integers scaled by 10^18.
// Arithmetic is checked; overflow and underflow surface as errors rather
// than wrapping.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::TypesError;

/// Number of fractional decimal digits
pub const DECIMALS: u32 = 18;

/// Unsigned 18-decimal fixed-point amount
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Amount(u128);

impl Amount {
    /// The zero amount
    pub const ZERO: Amount = Amount(0);

    /// One whole unit (10^18 raw)
    pub const ONE: Amount = Amount(10u128.pow(DECIMALS));

    /// The largest representable amount
    pub const MAX: Amount = Amount(u128::MAX);

    /// Wrap a raw scaled value
    pub const fn from_raw(raw: u128) -> Self {
        Self(raw)
    }

    /// Build an amount from a number of whole units
    pub const fn from_whole(units: u64) -> Self {
        // u64::MAX * 10^18 fits comfortably in u128
        Self(units as u128 * Self::ONE.0)
    }

    /// Raw scaled value
    pub const fn raw(&self) -> u128 {
        self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }

    pub fn checked_add(self, other: Amount) -> Option<Amount> {
        self.0.checked_add(other.0).map(Amount)
    }

    pub fn checked_sub(self, other: Amount) -> Option<Amount> {
        self.0.checked_sub(other.0).map(Amount)
    }

    pub fn saturating_sub(self, other: Amount) -> Amount {
        Amount(self.0.saturating_sub(other.0))
    }

    /// Checked addition reporting overflow as a typed error
    pub fn try_add(self, other: Amount) -> Result<Amount, TypesError> {
        self.checked_add(other).ok_or(TypesError::AmountOverflow)
    }

    /// Sum an iterator of amounts, failing on overflow
    pub fn try_sum<I>(amounts: I) -> Result<Amount, TypesError>
    where
        I: IntoIterator<Item = Amount>,
    {
        amounts.into_iter().try_fold(Amount::ZERO, Amount::try_add)
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let whole = self.0 / Self::ONE.0;
        let fraction = self.0 % Self::ONE.0;
        if fraction == 0 {
            return write!(f, "{}", whole);
        }
        let digits = format!("{:018}", fraction);
        write!(f, "{}.{}", whole, digits.trim_end_matches('0'))
    }
}

impl FromStr for Amount {
    type Err = TypesError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || TypesError::InvalidAmount(s.to_string());
        let (whole, fraction) = match s.split_once('.') {
            Some((whole, fraction)) => (whole, fraction),
            None => (s, ""),
        };

        if whole.is_empty() || !whole.bytes().all(|b| b.is_ascii_digit()) {
            return Err(invalid());
        }
        if fraction.len() > DECIMALS as usize || !fraction.bytes().all(|b| b.is_ascii_digit()) {
            return Err(invalid());
        }

        let whole: u128 = whole.parse().map_err(|_| invalid())?;
        let mut scaled_fraction: u128 = 0;
        if !fraction.is_empty() {
            let padded = format!("{:0<width$}", fraction, width = DECIMALS as usize);
            scaled_fraction = padded.parse().map_err(|_| invalid())?;
        }

        whole
            .checked_mul(Self::ONE.0)
            .and_then(|raw| raw.checked_add(scaled_fraction))
            .map(Amount)
            .ok_or(TypesError::AmountOverflow)
    }
}

// TOML has no 128-bit integers, so amounts travel as decimal strings
impl Serialize for Amount {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Amount {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}
