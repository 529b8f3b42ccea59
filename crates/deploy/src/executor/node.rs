//! Executor backed by a node's JSON-RPC endpoint.
//!
//! Transactions are sent with `eth_sendTransaction`, so the sender must be an
//! account the node can sign for (a local dev node, or a signing proxy).

use std::time::Duration;

use alloy_core::{
    dyn_abi::DynSolValue,
    primitives::{B256, Bytes},
};
use anyhow::{Context, Result};
use backon::{ConstantBuilder, Retryable};
use serde_json::json;
use url::Url;

use super::{Receipt, TransactionExecutor};
use crate::{
    abi,
    address::ChainAddress,
    artifacts::ArtifactStore,
    error::ExecutionError,
    rpc::{self, RpcError},
};

/// How long to wait for a transaction to be included.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConfirmationPolicy {
    pub timeout: Duration,
    pub poll_interval: Duration,
}

impl Default for ConfirmationPolicy {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(120),
            poll_interval: Duration::from_secs(2),
        }
    }
}

impl ConfirmationPolicy {
    /// Number of polls after the first one before giving up.
    pub fn max_polls(&self) -> usize {
        let interval = self.poll_interval.as_millis().max(1);
        (self.timeout.as_millis() / interval).max(1) as usize
    }
}

/// Why a receipt poll did not produce a receipt.
#[derive(Debug)]
enum ReceiptPoll {
    Pending,
    Rpc(RpcError),
}

/// Sends transactions through a JSON-RPC node and polls for receipts.
#[derive(Debug, Clone)]
pub struct RpcExecutor {
    client: reqwest::Client,
    rpc_url: Url,
    sender: ChainAddress,
    chain_id: u64,
    artifacts: ArtifactStore,
    confirmation: ConfirmationPolicy,
}

impl RpcExecutor {
    /// Connect to `rpc_url`, read the chain id, and pick the sender.
    ///
    /// Without an explicit `sender` the node's first account is used.
    pub async fn connect(
        rpc_url: Url,
        sender: Option<ChainAddress>,
        artifacts: ArtifactStore,
        confirmation: ConfirmationPolicy,
    ) -> Result<Self> {
        let client = rpc::create_client(rpc::DEFAULT_REQUEST_TIMEOUT)?;

        let chain_id: String = rpc::json_rpc_call(&client, &rpc_url, "eth_chainId", vec![])
            .await
            .with_context(|| format!("Failed to reach node at {rpc_url}"))?;
        let chain_id = rpc::parse_quantity("eth_chainId", &chain_id)?;

        let sender = match sender {
            Some(sender) => sender,
            None => {
                let accounts: Vec<ChainAddress> =
                    rpc::json_rpc_call(&client, &rpc_url, "eth_accounts", vec![])
                        .await
                        .context("Failed to list node accounts")?;
                accounts
                    .into_iter()
                    .next()
                    .context("Node has no unlocked accounts; pass a sender explicitly")?
            }
        };

        tracing::info!(rpc_url = %rpc_url, chain_id, sender = %sender, "Connected to node");

        Ok(Self {
            client,
            rpc_url,
            sender,
            chain_id,
            artifacts,
            confirmation,
        })
    }

    pub fn chain_id(&self) -> u64 {
        self.chain_id
    }

    pub fn artifacts(&self) -> &ArtifactStore {
        &self.artifacts
    }

    async fn send_transaction(
        &self,
        to: Option<ChainAddress>,
        data: Bytes,
    ) -> Result<B256, ExecutionError> {
        let mut tx = json!({
            "from": self.sender,
            "data": data,
        });
        if let Some(to) = to {
            tx["to"] = json!(to);
        }

        rpc::json_rpc_call(&self.client, &self.rpc_url, "eth_sendTransaction", vec![tx])
            .await
            .map_err(|err| match err {
                RpcError::Rpc { message, .. } => ExecutionError::Reverted { reason: message },
                other => ExecutionError::NotConfirmed {
                    reason: other.to_string(),
                },
            })
    }

    async fn fetch_receipt(&self, tx_hash: B256) -> Result<Receipt, ReceiptPoll> {
        let receipt: Option<Receipt> = rpc::json_rpc_call(
            &self.client,
            &self.rpc_url,
            "eth_getTransactionReceipt",
            vec![json!(tx_hash)],
        )
        .await
        .map_err(ReceiptPoll::Rpc)?;
        receipt.ok_or(ReceiptPoll::Pending)
    }

    /// Poll until `tx_hash` is included or the confirmation timeout elapses.
    async fn wait_for_receipt(&self, tx_hash: B256) -> Result<Receipt, ExecutionError> {
        let this = self;
        let backoff = ConstantBuilder::default()
            .with_delay(self.confirmation.poll_interval)
            .with_max_times(self.confirmation.max_polls());

        let receipt = (move || async move { this.fetch_receipt(tx_hash).await })
            .retry(backoff)
            .sleep(tokio::time::sleep)
            .when(|poll| {
                matches!(
                    poll,
                    ReceiptPoll::Pending | ReceiptPoll::Rpc(RpcError::Transport { .. })
                )
            })
            .notify(|poll, after| {
                tracing::trace!(tx_hash = %tx_hash, ?poll, ?after, "Receipt not available yet");
            })
            .await
            .map_err(|poll| ExecutionError::NotConfirmed {
                reason: match poll {
                    ReceiptPoll::Pending => format!(
                        "{tx_hash} not included within {}s",
                        self.confirmation.timeout.as_secs()
                    ),
                    ReceiptPoll::Rpc(err) => err.to_string(),
                },
            })?;

        if !receipt.succeeded() {
            return Err(ExecutionError::Reverted {
                reason: format!("{tx_hash} reverted in block {}", receipt.block_number),
            });
        }

        tracing::debug!(
            tx_hash = %tx_hash,
            block = receipt.block_number,
            gas_used = receipt.gas_used,
            "Transaction confirmed"
        );
        Ok(receipt)
    }
}

impl TransactionExecutor for RpcExecutor {
    fn sender(&self) -> ChainAddress {
        self.sender
    }

    async fn submit_deployment(
        &self,
        stage: &str,
        artifact: &str,
        args: &[DynSolValue],
    ) -> Result<ChainAddress, ExecutionError> {
        let artifact = self
            .artifacts
            .load(artifact)
            .map_err(|err| ExecutionError::Artifact {
                reason: format!("{err:#}"),
            })?;
        let data = abi::encode_constructor(&artifact.bytecode, artifact.constructor_inputs(), args)?;

        let tx_hash = self.send_transaction(None, data).await?;
        tracing::info!(stage, contract = %artifact.contract_name, tx_hash = %tx_hash, "Waiting for deployment to be confirmed");

        let receipt = self.wait_for_receipt(tx_hash).await?;
        receipt
            .contract_address
            .ok_or_else(|| ExecutionError::Reverted {
                reason: format!("{tx_hash} created no contract"),
            })
    }

    async fn submit_call(
        &self,
        target: ChainAddress,
        method: &str,
        args: &[DynSolValue],
    ) -> Result<Receipt, ExecutionError> {
        let data = abi::encode_call(method, args)?;

        let tx_hash = self.send_transaction(Some(target), data).await?;
        tracing::info!(target = %target, method, tx_hash = %tx_hash, "Waiting for call to be confirmed");

        self.wait_for_receipt(tx_hash).await
    }
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use alloy_core::primitives::U256;
    use serde_json::{Value, json};
    use tempdir::TempDir;
    use tokio::{
        io::{AsyncReadExt, AsyncWriteExt},
        net::{TcpListener, TcpStream},
    };

    use super::*;
    use crate::artifacts::fixtures;

    const SENDER: &str = "0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266";
    const TARGET: &str = "0x5FbDB2315678afecb367f032d93F642f64180aa3";
    const TX_HASH: &str = "0x88df016429689c079f3b2f6ad39fa052532c56795b733da78a91ebe6a713944b";
    const VESTING_ABI: &str = r#"[{"type":"constructor","stateMutability":"nonpayable","inputs":[{"name":"admin","type":"address"},{"name":"token","type":"address"}]}]"#;

    /// What the fake node answers to one method.
    enum Reply {
        Result(Value),
        Error(&'static str),
        /// A body that is not JSON at all.
        Garbage,
    }

    type Script = fn(&str) -> Reply;

    /// Serve `script` over HTTP on a local port, one request per connection.
    async fn spawn_node(script: Script) -> Url {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = Url::parse(&format!("http://{}", listener.local_addr().unwrap())).unwrap();
        tokio::spawn(async move {
            while let Ok((stream, _)) = listener.accept().await {
                tokio::spawn(serve(stream, script));
            }
        });
        url
    }

    async fn serve(mut stream: TcpStream, script: Script) {
        let mut request = Vec::new();
        let mut chunk = [0u8; 4096];
        let body = loop {
            let Ok(read) = stream.read(&mut chunk).await else {
                return;
            };
            if read == 0 {
                return;
            }
            request.extend_from_slice(&chunk[..read]);

            let Some(end) = request.windows(4).position(|w| w == b"\r\n\r\n") else {
                continue;
            };
            let headers = String::from_utf8_lossy(&request[..end]).to_ascii_lowercase();
            let length = headers
                .lines()
                .find_map(|line| line.strip_prefix("content-length:"))
                .and_then(|value| value.trim().parse::<usize>().ok())
                .unwrap_or(0);
            let start = end + 4;
            if request.len() >= start + length {
                break request[start..start + length].to_vec();
            }
        };

        let call: Value = serde_json::from_slice(&body).unwrap();
        let payload = match script(call["method"].as_str().unwrap()) {
            Reply::Result(result) => json!({"jsonrpc": "2.0", "id": 1, "result": result}).to_string(),
            Reply::Error(message) => json!({
                "jsonrpc": "2.0",
                "id": 1,
                "error": {"code": -32000, "message": message}
            })
            .to_string(),
            Reply::Garbage => "<html>502 Bad Gateway</html>".to_string(),
        };
        let response = format!(
            "HTTP/1.1 200 OK\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{payload}",
            payload.len()
        );
        let _ = stream.write_all(response.as_bytes()).await;
        let _ = stream.shutdown().await;
    }

    fn receipt(status: &str, contract: Option<&str>) -> Value {
        json!({
            "transactionHash": TX_HASH,
            "blockNumber": "0x1",
            "gasUsed": "0x5208",
            "contractAddress": contract,
            "status": status,
        })
    }

    fn fast_policy() -> ConfirmationPolicy {
        ConfirmationPolicy {
            timeout: Duration::from_millis(50),
            poll_interval: Duration::from_millis(10),
        }
    }

    async fn connect(script: Script, artifacts: &Path, sender: Option<&str>) -> RpcExecutor {
        let url = spawn_node(script).await;
        let sender = sender.map(|raw| ChainAddress::parse(raw).unwrap());
        RpcExecutor::connect(url, sender, ArtifactStore::new(artifacts), fast_policy())
            .await
            .unwrap()
    }

    async fn approve(executor: &RpcExecutor) -> Result<Receipt, ExecutionError> {
        let target = ChainAddress::parse(TARGET).unwrap();
        executor
            .submit_call(
                target,
                "approve(address,uint256)",
                &[target.into(), DynSolValue::Uint(U256::from(1), 256)],
            )
            .await
    }

    #[test]
    fn test_max_polls() {
        let policy = ConfirmationPolicy::default();
        assert_eq!(policy.max_polls(), 60);

        let tiny = ConfirmationPolicy {
            timeout: Duration::from_millis(10),
            poll_interval: Duration::from_secs(1),
        };
        assert_eq!(tiny.max_polls(), 1);

        let zero_interval = ConfirmationPolicy {
            timeout: Duration::from_secs(1),
            poll_interval: Duration::ZERO,
        };
        assert_eq!(zero_interval.max_polls(), 1000);
    }

    #[tokio::test]
    async fn test_connect_defaults_to_first_account() {
        let dir = TempDir::new("paias-node").unwrap();
        let executor = connect(
            |method| match method {
                "eth_chainId" => Reply::Result(json!("0x7a69")),
                "eth_accounts" => Reply::Result(json!([SENDER.to_lowercase()])),
                _ => Reply::Error("unexpected method"),
            },
            dir.path(),
            None,
        )
        .await;

        assert_eq!(executor.chain_id(), 31337);
        assert_eq!(executor.sender(), ChainAddress::parse(SENDER).unwrap());
    }

    #[tokio::test]
    async fn test_call_confirmed() {
        let dir = TempDir::new("paias-node").unwrap();
        let executor = connect(
            |method| match method {
                "eth_chainId" => Reply::Result(json!("0x7a69")),
                "eth_sendTransaction" => Reply::Result(json!(TX_HASH)),
                "eth_getTransactionReceipt" => Reply::Result(receipt("0x1", None)),
                _ => Reply::Error("unexpected method"),
            },
            dir.path(),
            Some(SENDER),
        )
        .await;

        let receipt = approve(&executor).await.unwrap();
        assert!(receipt.succeeded());
        assert_eq!(receipt.gas_used, 21_000);
    }

    #[tokio::test]
    async fn test_node_error_on_send_is_reverted() {
        let dir = TempDir::new("paias-node").unwrap();
        let executor = connect(
            |method| match method {
                "eth_chainId" => Reply::Result(json!("0x7a69")),
                "eth_sendTransaction" => Reply::Error("insufficient funds for gas"),
                _ => Reply::Error("unexpected method"),
            },
            dir.path(),
            Some(SENDER),
        )
        .await;

        assert_eq!(
            approve(&executor).await,
            Err(ExecutionError::Reverted {
                reason: "insufficient funds for gas".to_string()
            })
        );
    }

    #[tokio::test]
    async fn test_failed_receipt_is_reverted() {
        let dir = TempDir::new("paias-node").unwrap();
        let executor = connect(
            |method| match method {
                "eth_chainId" => Reply::Result(json!("0x7a69")),
                "eth_sendTransaction" => Reply::Result(json!(TX_HASH)),
                "eth_getTransactionReceipt" => Reply::Result(receipt("0x0", None)),
                _ => Reply::Error("unexpected method"),
            },
            dir.path(),
            Some(SENDER),
        )
        .await;

        let err = approve(&executor).await.unwrap_err();
        assert!(
            matches!(&err, ExecutionError::Reverted { reason } if reason.contains("reverted in block 1")),
            "{err}"
        );
    }

    #[tokio::test]
    async fn test_missing_receipt_is_not_confirmed() {
        let dir = TempDir::new("paias-node").unwrap();
        let executor = connect(
            |method| match method {
                "eth_chainId" => Reply::Result(json!("0x7a69")),
                "eth_sendTransaction" => Reply::Result(json!(TX_HASH)),
                "eth_getTransactionReceipt" => Reply::Result(Value::Null),
                _ => Reply::Error("unexpected method"),
            },
            dir.path(),
            Some(SENDER),
        )
        .await;

        let err = approve(&executor).await.unwrap_err();
        assert!(
            matches!(&err, ExecutionError::NotConfirmed { reason } if reason.contains("not included")),
            "{err}"
        );
    }

    #[tokio::test]
    async fn test_transport_failure_is_not_confirmed() {
        let dir = TempDir::new("paias-node").unwrap();
        let executor = connect(
            |method| match method {
                "eth_chainId" => Reply::Result(json!("0x7a69")),
                _ => Reply::Garbage,
            },
            dir.path(),
            Some(SENDER),
        )
        .await;

        let err = approve(&executor).await.unwrap_err();
        assert_eq!(err.kind(), "not-confirmed", "{err}");
    }

    #[tokio::test]
    async fn test_deployment_returns_contract_address() {
        let dir = TempDir::new("paias-node").unwrap();
        fixtures::write_artifact(dir.path(), "Vesting", VESTING_ABI, "0x6080");
        let executor = connect(
            |method| match method {
                "eth_chainId" => Reply::Result(json!("0x7a69")),
                "eth_sendTransaction" => Reply::Result(json!(TX_HASH)),
                "eth_getTransactionReceipt" => Reply::Result(receipt("0x1", Some(TARGET))),
                _ => Reply::Error("unexpected method"),
            },
            dir.path(),
            Some(SENDER),
        )
        .await;

        let sender = ChainAddress::parse(SENDER).unwrap();
        let address = executor
            .submit_deployment("vesting", "Vesting", &[sender.into(), sender.into()])
            .await
            .unwrap();
        assert_eq!(address, ChainAddress::parse(TARGET).unwrap());
    }

    #[tokio::test]
    async fn test_deployment_without_contract_address_is_reverted() {
        let dir = TempDir::new("paias-node").unwrap();
        fixtures::write_artifact(dir.path(), "Vesting", VESTING_ABI, "0x6080");
        let executor = connect(
            |method| match method {
                "eth_chainId" => Reply::Result(json!("0x7a69")),
                "eth_sendTransaction" => Reply::Result(json!(TX_HASH)),
                "eth_getTransactionReceipt" => Reply::Result(receipt("0x1", None)),
                _ => Reply::Error("unexpected method"),
            },
            dir.path(),
            Some(SENDER),
        )
        .await;

        let sender = ChainAddress::parse(SENDER).unwrap();
        let err = executor
            .submit_deployment("vesting", "Vesting", &[sender.into(), sender.into()])
            .await
            .unwrap_err();
        assert!(
            matches!(&err, ExecutionError::Reverted { reason } if reason.contains("created no contract")),
            "{err}"
        );
    }
}
