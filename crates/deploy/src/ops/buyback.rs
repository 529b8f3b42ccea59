//! Triggering the buy-and-burn module.

use alloy_core::dyn_abi::DynSolValue;

use super::call;
use crate::{
    address::ChainAddress,
    amount::Amount,
    config::{ConfigResolver, RawConfig},
    error::{ConfigError, OperationError},
    executor::{Receipt, TransactionExecutor},
    manifest::DeploymentManifest,
    planner::StageName,
};

/// Buyback amounts are denominated in the base token.
pub const AMOUNT_DECIMALS: u8 = 6;
pub const DEFAULT_AMOUNT: &str = "1000";
pub const DEFAULT_BURN: bool = true;

const PERFORM: &str = "perform(uint256,bool)";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuybackParams {
    pub buyback: ChainAddress,
    pub amount: Amount,
    /// Burn the purchased tokens instead of keeping them.
    pub burn: bool,
}

impl BuybackParams {
    /// The buyback address defaults to the `buyback` entry of `manifest`.
    pub fn resolve(
        raw: &RawConfig,
        manifest: Option<&DeploymentManifest>,
    ) -> Result<Self, ConfigError> {
        let config = ConfigResolver::new(raw);
        let deployed = manifest.and_then(|m| m.address_of(StageName::Buyback.as_str()));

        Ok(Self {
            buyback: config.address("buyback", deployed)?,
            amount: config.amount("amount", AMOUNT_DECIMALS, DEFAULT_AMOUNT)?,
            burn: config.boolean("burn", Some(DEFAULT_BURN))?,
        })
    }
}

/// Spend `amount` of the base token buying back the deployed token.
pub async fn trigger_buyback<E: TransactionExecutor>(
    executor: &E,
    params: &BuybackParams,
) -> Result<Receipt, OperationError> {
    tracing::info!(buyback = %params.buyback, amount = %params.amount, burn = params.burn, "Triggering buyback");
    call(
        executor,
        "perform buyback",
        params.buyback,
        PERFORM,
        &[params.amount.into(), DynSolValue::Bool(params.burn)],
    )
    .await
}
