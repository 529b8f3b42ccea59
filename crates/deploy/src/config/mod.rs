//! Config resolution: raw strings in, typed values out.
//!
//! The resolver never reads the process environment itself. Callers collect a
//! [`RawConfig`] (see [`RawConfig::load`]) and pass it in.

mod source;

use std::time::Duration;

pub use source::{CONFIG_FILENAME, KNOWN_KEYS, RawConfig};

use crate::{
    address::ChainAddress,
    amount::{self, Amount},
    error::ConfigError,
};

/// Literal tokens accepted for boolean values. Matching is case-sensitive.
const TRUTHY: &str = "true";
const FALSY: &str = "false";

/// The type a raw value is resolved into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigKind {
    Address,
    /// A decimal amount scaled to `decimals` places.
    Amount { decimals: u8 },
    Boolean,
    /// A whole number of seconds.
    Duration,
}

/// A resolved configuration value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypedValue {
    Address(ChainAddress),
    Amount(Amount),
    Boolean(bool),
    Duration(Duration),
}

/// Resolve a single raw value.
///
/// Addresses are lenient: an invalid address falls back to `default` just like
/// an absent one. Every other kind only falls back when the value is absent; a
/// value that is present but unparsable is always [`ConfigError::Malformed`].
pub fn resolve(
    name: &str,
    raw: Option<&str>,
    kind: ConfigKind,
    default: Option<TypedValue>,
) -> Result<TypedValue, ConfigError> {
    let raw = raw.map(str::trim).filter(|raw| !raw.is_empty());
    let missing = || ConfigError::MissingRequired {
        name: name.to_string(),
    };

    let Some(raw) = raw else {
        return default.ok_or_else(missing);
    };

    match kind {
        ConfigKind::Address => match ChainAddress::parse(raw) {
            Ok(address) => Ok(TypedValue::Address(address)),
            Err(err) => {
                tracing::debug!(name, error = %err, "Ignoring invalid address");
                default.ok_or_else(missing)
            }
        },
        ConfigKind::Amount { decimals } => Amount::parse_units(raw, decimals)
            .map(TypedValue::Amount)
            .map_err(|err| ConfigError::malformed(name, raw, err)),
        ConfigKind::Boolean => match raw {
            TRUTHY => Ok(TypedValue::Boolean(true)),
            FALSY => Ok(TypedValue::Boolean(false)),
            _ => Err(ConfigError::malformed(
                name,
                raw,
                format!("expected `{TRUTHY}` or `{FALSY}`"),
            )),
        },
        ConfigKind::Duration => amount::is_digits(raw)
            .then(|| raw.parse::<u64>().ok())
            .flatten()
            .map(|secs| TypedValue::Duration(Duration::from_secs(secs)))
            .ok_or_else(|| ConfigError::malformed(name, raw, "expected a whole number of seconds")),
    }
}

/// Typed accessors over a [`RawConfig`].
#[derive(Debug, Clone, Copy)]
pub struct ConfigResolver<'a> {
    raw: &'a RawConfig,
}

impl<'a> ConfigResolver<'a> {
    pub fn new(raw: &'a RawConfig) -> Self {
        Self { raw }
    }

    pub fn address(
        &self,
        name: &str,
        default: Option<ChainAddress>,
    ) -> Result<ChainAddress, ConfigError> {
        match self.resolve(name, ConfigKind::Address, default.map(TypedValue::Address))? {
            TypedValue::Address(address) => Ok(address),
            other => unreachable!("address kind resolved to {other:?}"),
        }
    }

    /// An address that is allowed to be absent. Invalid values are logged and dropped.
    pub fn optional_address(&self, name: &str) -> Option<ChainAddress> {
        let raw = self.raw.get(name)?;
        match ChainAddress::parse(raw) {
            Ok(address) => Some(address),
            Err(err) => {
                tracing::warn!(name, error = %err, "Ignoring invalid address");
                None
            }
        }
    }

    /// An amount at `decimals`, with `default` given in the same human-readable form.
    pub fn amount(&self, name: &str, decimals: u8, default: &str) -> Result<Amount, ConfigError> {
        let default = Amount::parse_units(default, decimals)
            .map_err(|err| ConfigError::malformed(name, default, err))?;
        match self.resolve(
            name,
            ConfigKind::Amount { decimals },
            Some(TypedValue::Amount(default)),
        )? {
            TypedValue::Amount(amount) => Ok(amount),
            other => unreachable!("amount kind resolved to {other:?}"),
        }
    }

    pub fn boolean(&self, name: &str, default: Option<bool>) -> Result<bool, ConfigError> {
        match self.resolve(name, ConfigKind::Boolean, default.map(TypedValue::Boolean))? {
            TypedValue::Boolean(value) => Ok(value),
            other => unreachable!("boolean kind resolved to {other:?}"),
        }
    }

    pub fn duration(&self, name: &str, default: Option<Duration>) -> Result<Duration, ConfigError> {
        match self.resolve(name, ConfigKind::Duration, default.map(TypedValue::Duration))? {
            TypedValue::Duration(value) => Ok(value),
            other => unreachable!("duration kind resolved to {other:?}"),
        }
    }

    /// Free-form text, trimmed, with a default for absent or blank values.
    pub fn text(&self, name: &str, default: &str) -> String {
        self.raw.get(name).unwrap_or(default).to_string()
    }

    /// The raw trimmed value, if any.
    pub fn raw(&self, name: &str) -> Option<&'a str> {
        self.raw.get(name)
    }

    fn resolve(
        &self,
        name: &str,
        kind: ConfigKind,
        default: Option<TypedValue>,
    ) -> Result<TypedValue, ConfigError> {
        resolve(name, self.raw.get(name), kind, default)
    }
}
