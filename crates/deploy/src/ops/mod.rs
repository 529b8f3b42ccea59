//! Post-deployment operational actions.
//!
//! Each action follows the same shape as a deployment stage: resolve its
//! config, build call arguments, and hand them to an executor.

pub mod buyback;
pub mod liquidity;
pub mod verify;

use alloy_core::dyn_abi::DynSolValue;

use crate::{
    address::ChainAddress,
    error::OperationError,
    executor::{Receipt, TransactionExecutor},
};

/// Submit one call and attach `step` to any failure.
async fn call<E: TransactionExecutor>(
    executor: &E,
    step: &'static str,
    target: ChainAddress,
    method: &str,
    args: &[DynSolValue],
) -> Result<Receipt, OperationError> {
    tracing::info!(step, target = %target, method, "Submitting call");
    let receipt = executor
        .submit_call(target, method, args)
        .await
        .map_err(|source| OperationError::Execution {
            step,
            target,
            source,
        })?;
    tracing::info!(step, tx_hash = %receipt.transaction_hash, block = receipt.block_number, "Call confirmed");
    Ok(receipt)
}
