//! 20-byte account identifiers.

use alloc::collections::BTreeSet;
use alloc::string::String;
use alloc::vec::Vec;
use core::fmt;
use core::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddressError {
    MissingPrefix,
    InvalidLength(usize),
    InvalidCharacter,
}

impl fmt::Display for AddressError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AddressError::MissingPrefix => write!(f, "address must start with 0x"),
            AddressError::InvalidLength(len) => {
                write!(f, "expected 40 hex characters, got {len}")
            }
            AddressError::InvalidCharacter => write!(f, "address contains non-hex characters"),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for AddressError {}

/// An account address. Equality and ordering are on the raw bytes, so two
/// spellings that differ only in letter case are the same address.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Address([u8; 20]);

impl Address {
    pub const ZERO: Address = Address([0u8; 20]);

    pub const fn new(bytes: [u8; 20]) -> Self {
        Self(bytes)
    }

    /// Parses `0x` followed by exactly 40 hex digits of either case.
    /// Surrounding whitespace is ignored; anything else is rejected.
    pub fn parse_strict(value: &str) -> Result<Self, AddressError> {
        let trimmed = value.trim();
        let digits = trimmed
            .strip_prefix("0x")
            .ok_or(AddressError::MissingPrefix)?;
        Self::decode_digits(digits)
    }

    /// Same as [`Address::parse_strict`] but the `0x` prefix is optional.
    pub fn parse_lenient(value: &str) -> Result<Self, AddressError> {
        let trimmed = value.trim();
        let digits = trimmed.strip_prefix("0x").unwrap_or(trimmed);
        Self::decode_digits(digits)
    }

    fn decode_digits(digits: &str) -> Result<Self, AddressError> {
        if digits.len() != 40 {
            return Err(AddressError::InvalidLength(digits.len()));
        }
        let mut bytes = [0u8; 20];
        hex::decode_to_slice(digits, &mut bytes).map_err(|_| AddressError::InvalidCharacter)?;
        Ok(Self(bytes))
    }

    pub fn as_bytes(&self) -> &[u8; 20] {
        &self.0
    }

    pub fn into_bytes(self) -> [u8; 20] {
        self.0
    }

    /// Canonical lower-case form, `0x` + 40 hex digits.
    pub fn to_lower_hex(&self) -> String {
        let mut out = String::with_capacity(42);
        out.push_str("0x");
        out.push_str(&hex::encode(self.0));
        out
    }

    /// Shortened form for display, e.g. `0xabcd...ef01`.
    pub fn short(&self) -> String {
        let full = self.to_lower_hex();
        let mut out = String::with_capacity(13);
        out.push_str(&full[..6]);
        out.push_str("...");
        out.push_str(&full[38..]);
        out
    }
}

impl From<[u8; 20]> for Address {
    fn from(bytes: [u8; 20]) -> Self {
        Self(bytes)
    }
}

impl FromStr for Address {
    type Err = AddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse_strict(s)
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("0x")?;
        for byte in self.0 {
            write!(f, "{byte:02x}")?;
        }
        Ok(())
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({self})")
    }
}

#[cfg(feature = "serde")]
impl serde::Serialize for Address {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_lower_hex())
    }
}

#[cfg(feature = "serde")]
impl<'de> serde::Deserialize<'de> for Address {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = alloc::borrow::Cow::<'de, str>::deserialize(deserializer)?;
        Address::parse_strict(&raw).map_err(serde::de::Error::custom)
    }
}

/// Collapses case variants and repeats, keeping the first occurrence of each
/// address in input order.
pub fn normalize_addresses<I>(addresses: I) -> Vec<Address>
where
    I: IntoIterator<Item = Address>,
{
    let mut seen = BTreeSet::new();
    addresses
        .into_iter()
        .filter(|address| seen.insert(*address))
        .collect()
}
