//! Seeding a Uniswap-V2-style pool with token and base-token liquidity.

use std::time::Duration;

use alloy_core::{dyn_abi::DynSolValue, primitives::U256};

use super::call;
use crate::{
    address::ChainAddress,
    amount::Amount,
    config::{ConfigResolver, RawConfig},
    error::{ConfigError, OperationError},
    executor::{Receipt, TransactionExecutor},
    manifest::DeploymentManifest,
    params::TOKEN_DECIMALS,
    planner::StageName,
};

/// Decimals of the base token paired against the deployed token.
pub const BASE_TOKEN_DECIMALS: u8 = 6;
pub const DEFAULT_AMOUNT_TOKEN: &str = "1000000";
pub const DEFAULT_AMOUNT_BASE: &str = "10000";
/// How long the router accepts the liquidity request after it is built.
pub const DEADLINE_WINDOW: Duration = Duration::from_secs(15 * 60);

const APPROVE: &str = "approve(address,uint256)";
const ADD_LIQUIDITY: &str =
    "addLiquidity(address,address,uint256,uint256,uint256,uint256,address,uint256)";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LiquidityParams {
    pub router: ChainAddress,
    pub token: ChainAddress,
    pub base_token: ChainAddress,
    pub amount_token: Amount,
    pub amount_base: Amount,
    /// Receives the pool's LP tokens.
    pub recipient: ChainAddress,
}

impl LiquidityParams {
    /// The token address defaults to the `token` entry of `manifest`.
    pub fn resolve(
        raw: &RawConfig,
        manifest: Option<&DeploymentManifest>,
        recipient: ChainAddress,
    ) -> Result<Self, ConfigError> {
        let config = ConfigResolver::new(raw);
        let deployed_token = manifest.and_then(|m| m.address_of(StageName::Token.as_str()));

        Ok(Self {
            router: config.address("router", None)?,
            token: config.address("pai", deployed_token)?,
            base_token: config.address("base_token", None)?,
            amount_token: config.amount("amount_pai", TOKEN_DECIMALS, DEFAULT_AMOUNT_TOKEN)?,
            amount_base: config.amount("amount_base", BASE_TOKEN_DECIMALS, DEFAULT_AMOUNT_BASE)?,
            recipient,
        })
    }
}

/// Receipts of the three transactions that seed a pool.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LiquidityReceipts {
    pub token_approval: Receipt,
    pub base_approval: Receipt,
    pub liquidity: Receipt,
    /// Unix timestamp after which the router would have rejected the request.
    pub deadline: u64,
}

/// Approve both tokens for the router, then add liquidity at exactly the
/// given amounts (minimums equal the desired amounts).
pub async fn seed_liquidity<E: TransactionExecutor>(
    executor: &E,
    params: &LiquidityParams,
    now_unix: u64,
) -> Result<LiquidityReceipts, OperationError> {
    let token_approval = call(
        executor,
        "approve token",
        params.token,
        APPROVE,
        &[params.router.into(), params.amount_token.into()],
    )
    .await?;

    let base_approval = call(
        executor,
        "approve base token",
        params.base_token,
        APPROVE,
        &[params.router.into(), params.amount_base.into()],
    )
    .await?;

    let deadline = now_unix + DEADLINE_WINDOW.as_secs();
    let liquidity = call(
        executor,
        "add liquidity",
        params.router,
        ADD_LIQUIDITY,
        &[
            params.token.into(),
            params.base_token.into(),
            params.amount_token.into(),
            params.amount_base.into(),
            params.amount_token.into(),
            params.amount_base.into(),
            params.recipient.into(),
            DynSolValue::Uint(U256::from(deadline), 256),
        ],
    )
    .await?;

    tracing::info!(
        token = %params.token,
        base_token = %params.base_token,
        amount_token = %params.amount_token,
        amount_base = %params.amount_base,
        "Liquidity seeded"
    );

    Ok(LiquidityReceipts {
        token_approval,
        base_approval,
        liquidity,
        deadline,
    })
}
