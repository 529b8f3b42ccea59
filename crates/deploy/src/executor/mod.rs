//! Transaction submission and confirmation.

mod node;

use std::future::Future;

use alloy_core::{dyn_abi::DynSolValue, primitives::B256};
use serde::Deserialize;

pub use node::{ConfirmationPolicy, RpcExecutor};

use crate::{address::ChainAddress, error::ExecutionError, rpc::deserialize_u64_from_hex};

/// The receipt of a confirmed transaction.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Receipt {
    pub transaction_hash: B256,
    #[serde(deserialize_with = "deserialize_u64_from_hex")]
    pub block_number: u64,
    #[serde(deserialize_with = "deserialize_u64_from_hex")]
    pub gas_used: u64,
    /// Set for contract-creation transactions.
    #[serde(default)]
    pub contract_address: Option<ChainAddress>,
    /// `1` on success, `0` if the transaction reverted.
    #[serde(deserialize_with = "deserialize_u64_from_hex")]
    pub status: u64,
}

impl Receipt {
    pub fn succeeded(&self) -> bool {
        self.status == 1
    }
}

/// Submits transactions and waits until they are confirmed.
///
/// Each call is independent: it submits, blocks until the chain confirms or a
/// bounded wait elapses, and returns. Implementations never retry a
/// submission; a failed call is reported as-is.
pub trait TransactionExecutor: Send + Sync {
    /// The account transactions are sent from.
    fn sender(&self) -> ChainAddress;

    /// Deploy the contract built from `artifact` with constructor `args`.
    fn submit_deployment(
        &self,
        stage: &str,
        artifact: &str,
        args: &[DynSolValue],
    ) -> impl Future<Output = Result<ChainAddress, ExecutionError>> + Send;

    /// Call `method` (a signature such as `perform(uint256,bool)`) on `target`.
    fn submit_call(
        &self,
        target: ChainAddress,
        method: &str,
        args: &[DynSolValue],
    ) -> impl Future<Output = Result<Receipt, ExecutionError>> + Send;
}
