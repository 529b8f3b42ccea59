//! Derived deployment parameters.
//!
//! Rates are computed with integer floor division at the amount's native
//! scale. The remainder is dropped, so paying out `per_second` for a whole
//! period under-pays by `shortfall` every period. That loss compounds over
//! many periods and is reproduced exactly; callers must not round up.

use std::time::Duration;

use alloy_core::primitives::U256;
use serde::{Deserialize, Serialize};

use crate::{amount::Amount, error::ArithmeticError};

/// Rounding applied when a rate is derived.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum::Display)]
#[strum(serialize_all = "kebab-case")]
pub enum Rounding {
    /// Truncate toward zero.
    Floor,
}

/// A per-second rate derived from a total over a period.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DerivedRate {
    /// Base units paid per second.
    pub per_second: U256,
    /// Scale of `per_second`, inherited from the total.
    pub decimals: u8,
    /// Length of the period the total was spread over.
    pub period_secs: u64,
    /// Base units lost to rounding over one full period.
    pub shortfall: U256,
    pub rounding: Rounding,
}

impl DerivedRate {
    /// The rate as an amount at its native scale.
    pub const fn as_amount(&self) -> Amount {
        Amount::from_raw(self.per_second, self.decimals)
    }

    /// Base units accrued after `elapsed` at this rate.
    pub fn accrued(&self, elapsed: Duration) -> Result<U256, ArithmeticError> {
        self.per_second
            .checked_mul(U256::from(elapsed.as_secs()))
            .ok_or(ArithmeticError::Overflow)
    }
}

/// Spread `total` evenly over `period_secs` seconds, rounding down.
pub fn derive_rate(total: Amount, period_secs: u64) -> Result<DerivedRate, ArithmeticError> {
    if period_secs == 0 {
        return Err(ArithmeticError::DivisionByZero);
    }
    let period = U256::from(period_secs);
    let (per_second, shortfall) = total.raw().div_rem(period);

    Ok(DerivedRate {
        per_second,
        decimals: total.decimals(),
        period_secs,
        shortfall,
        rounding: Rounding::Floor,
    })
}
