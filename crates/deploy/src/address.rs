//! Validated on-chain account identifiers.

use std::{fmt, str::FromStr};

use alloy_core::{dyn_abi::DynSolValue, primitives::Address};
use serde::{Deserialize, Serialize};

/// Why a string was rejected as an address.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AddressError {
    #[error("expected 0x-prefixed 40 hex chars, got '{0}'")]
    Format(String),
    #[error("checksum mismatch for '{0}'")]
    Checksum(String),
}

/// A 20-byte account or contract identifier that passed format validation.
///
/// Strings only become addresses through [`ChainAddress::parse`], which
/// accepts all-lowercase, all-uppercase, or EIP-55 checksummed input.
/// Mixed-case input must carry a correct checksum.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, derive_more::Deref,
)]
#[serde(try_from = "String", into = "String")]
pub struct ChainAddress(Address);

impl ChainAddress {
    pub fn parse(raw: &str) -> Result<Self, AddressError> {
        let raw = raw.trim();
        let digits = raw
            .strip_prefix("0x")
            .filter(|digits| digits.len() == 40 && digits.chars().all(|c| c.is_ascii_hexdigit()))
            .ok_or_else(|| AddressError::Format(raw.to_string()))?;

        let address = Address::from_str(raw).map_err(|_| AddressError::Format(raw.to_string()))?;

        let mixed_case = digits.chars().any(|c| c.is_ascii_lowercase())
            && digits.chars().any(|c| c.is_ascii_uppercase());
        if mixed_case && address.to_checksum(None) != raw {
            return Err(AddressError::Checksum(raw.to_string()));
        }

        Ok(Self(address))
    }

    /// Wrap an address that was decoded from chain data (receipts, RPC results).
    pub const fn from_chain(address: Address) -> Self {
        Self(address)
    }

    pub const fn into_inner(self) -> Address {
        self.0
    }
}

impl fmt::Display for ChainAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.to_checksum(None))
    }
}

impl FromStr for ChainAddress {
    type Err = AddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for ChainAddress {
    type Error = AddressError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<ChainAddress> for String {
    fn from(address: ChainAddress) -> Self {
        address.to_string()
    }
}

impl From<ChainAddress> for DynSolValue {
    fn from(address: ChainAddress) -> Self {
        DynSolValue::Address(address.0)
    }
}
