//! Resolved inputs for a full deployment.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::{
    address::ChainAddress,
    amount::Amount,
    config::{ConfigResolver, RawConfig},
    derive::{DerivedRate, derive_rate},
    error::{ConfigError, PlanError},
};

/// Decimals of the deployed token.
pub const TOKEN_DECIMALS: u8 = 18;
pub const DEFAULT_TOKEN_NAME: &str = "PaiasCoin";
pub const DEFAULT_TOKEN_SYMBOL: &str = "PAI";
/// Whole tokens minted to the admin at deployment.
pub const INITIAL_SUPPLY_TOKENS: u64 = 1_000_000_000;
/// Staking rewards, in tokens per staked token per [`REWARD_PERIOD`].
pub const REWARD_PER_PERIOD: &str = "0.5";
pub const REWARD_PERIOD: Duration = Duration::from_secs(24 * 60 * 60);
pub const STAKING_LOCK: Duration = Duration::from_secs(30 * 24 * 60 * 60);

/// Addresses the buy-and-burn module needs. Both must be valid to deploy it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuybackDeps {
    pub base_token: ChainAddress,
    pub router: ChainAddress,
}

/// Everything the stage planner needs, already validated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeployParams {
    pub admin: ChainAddress,
    pub token_name: String,
    pub token_symbol: String,
    pub initial_supply: Amount,
    pub reward_rate: DerivedRate,
    pub staking_lock: Duration,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub buyback: Option<BuybackDeps>,
}

impl DeployParams {
    /// Resolve parameters from raw config. `deployer` is the sending account
    /// and stands in for the admin when none is configured.
    ///
    /// Fails before anything touches the chain.
    pub fn resolve(raw: &RawConfig, deployer: ChainAddress) -> Result<Self, PlanError> {
        let config = ConfigResolver::new(raw);

        let admin = config.address("admin_multisig", Some(deployer))?;
        if admin == deployer {
            tracing::info!(admin = %admin, "Using deployer as admin");
        }

        let reward_rate = reward_rate(REWARD_PER_PERIOD, REWARD_PERIOD)?;

        let base_token = config.optional_address("base_token");
        let router = config.optional_address("router");
        let buyback = match (base_token, router) {
            (Some(base_token), Some(router)) => Some(BuybackDeps { base_token, router }),
            _ => None,
        };

        Ok(Self {
            admin,
            token_name: config.text("token_name", DEFAULT_TOKEN_NAME),
            token_symbol: config.text("token_symbol", DEFAULT_TOKEN_SYMBOL),
            initial_supply: Amount::whole(INITIAL_SUPPLY_TOKENS, TOKEN_DECIMALS)?,
            reward_rate,
            staking_lock: STAKING_LOCK,
            buyback,
        })
    }
}

/// Per-second reward rate for paying `per_period` tokens every `period`.
fn reward_rate(per_period: &str, period: Duration) -> Result<DerivedRate, PlanError> {
    let total = Amount::parse_units(per_period, TOKEN_DECIMALS)
        .map_err(|err| ConfigError::malformed("reward_per_period", per_period, err))?;
    Ok(derive_rate(total, period.as_secs())?)
}
