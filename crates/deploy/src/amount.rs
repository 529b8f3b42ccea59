//! Fixed-point token amounts.

use std::fmt;

use alloy_core::{dyn_abi::DynSolValue, primitives::U256};
use serde::{Deserialize, Serialize};

use crate::error::ArithmeticError;

/// Why a decimal string could not be read as an [`Amount`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseAmountError {
    #[error("expected a non-negative decimal number")]
    InvalidDigit,
    #[error("more than {max} fractional digits")]
    TooManyDecimals { max: u8 },
    #[error("value does not fit in 256 bits")]
    Overflow,
}

/// An unsigned integer scaled by a token's decimal precision.
///
/// Two amounts only combine when their scales match; use [`Amount::rescale`]
/// to convert explicitly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Amount {
    raw: U256,
    decimals: u8,
}

impl Amount {
    pub const fn from_raw(raw: U256, decimals: u8) -> Self {
        Self { raw, decimals }
    }

    /// `units` whole tokens at the given scale.
    pub fn whole(units: u64, decimals: u8) -> Result<Self, ArithmeticError> {
        let raw = U256::from(units)
            .checked_mul(scale_factor(decimals)?)
            .ok_or(ArithmeticError::Overflow)?;
        Ok(Self { raw, decimals })
    }

    /// Parse a human-readable decimal such as `"0.5"` into base units.
    pub fn parse_units(value: &str, decimals: u8) -> Result<Self, ParseAmountError> {
        let (whole, fraction) = match value.split_once('.') {
            Some((whole, fraction)) => (whole, fraction),
            None => (value, ""),
        };

        if !is_digits(whole) || (value.contains('.') && !is_digits(fraction)) {
            return Err(ParseAmountError::InvalidDigit);
        }
        if fraction.len() > usize::from(decimals) {
            return Err(ParseAmountError::TooManyDecimals { max: decimals });
        }

        let padded = format!("{whole}{fraction:0<width$}", width = usize::from(decimals));
        let raw = U256::from_str_radix(&padded, 10).map_err(|_| ParseAmountError::Overflow)?;
        Ok(Self { raw, decimals })
    }

    pub const fn raw(&self) -> U256 {
        self.raw
    }

    pub const fn decimals(&self) -> u8 {
        self.decimals
    }

    pub fn checked_add(self, other: Self) -> Result<Self, ArithmeticError> {
        self.ensure_same_scale(&other)?;
        let raw = self
            .raw
            .checked_add(other.raw)
            .ok_or(ArithmeticError::Overflow)?;
        Ok(Self { raw, ..self })
    }

    pub fn checked_sub(self, other: Self) -> Result<Self, ArithmeticError> {
        self.ensure_same_scale(&other)?;
        let raw = self
            .raw
            .checked_sub(other.raw)
            .ok_or(ArithmeticError::Overflow)?;
        Ok(Self { raw, ..self })
    }

    /// Convert to another scale. Reducing precision truncates toward zero.
    pub fn rescale(self, decimals: u8) -> Result<Self, ArithmeticError> {
        let raw = if decimals >= self.decimals {
            self.raw
                .checked_mul(scale_factor(decimals - self.decimals)?)
                .ok_or(ArithmeticError::Overflow)?
        } else {
            self.raw / scale_factor(self.decimals - decimals)?
        };
        Ok(Self { raw, decimals })
    }

    fn ensure_same_scale(&self, other: &Self) -> Result<(), ArithmeticError> {
        if self.decimals != other.decimals {
            return Err(ArithmeticError::ScaleMismatch {
                left: self.decimals,
                right: other.decimals,
            });
        }
        Ok(())
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // 10^255 does not fit; fall back to base units for absurd scales.
        let Ok(factor) = scale_factor(self.decimals) else {
            return write!(f, "{} (1e-{})", self.raw, self.decimals);
        };
        let whole = self.raw / factor;
        let fraction = self.raw % factor;
        if fraction.is_zero() {
            return write!(f, "{whole}");
        }
        let fraction = format!(
            "{:0>width$}",
            fraction.to_string(),
            width = usize::from(self.decimals)
        );
        write!(f, "{whole}.{}", fraction.trim_end_matches('0'))
    }
}

impl From<Amount> for DynSolValue {
    fn from(amount: Amount) -> Self {
        DynSolValue::Uint(amount.raw, 256)
    }
}

/// Non-empty and ASCII digits only. Signs and whitespace are rejected.
pub(crate) fn is_digits(value: &str) -> bool {
    !value.is_empty() && value.bytes().all(|b| b.is_ascii_digit())
}

fn scale_factor(decimals: u8) -> Result<U256, ArithmeticError> {
    U256::from(10u8)
        .checked_pow(U256::from(decimals))
        .ok_or(ArithmeticError::Overflow)
}
