//! Shared utilities for Ethereum JSON-RPC endpoints.

use std::time::Duration;

use anyhow::Context;
use serde::{Deserialize, de::DeserializeOwned};
use serde_json::Value;
use url::Url;

/// Default timeout for a single RPC request.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Failure of a single JSON-RPC request.
#[derive(Debug, thiserror::Error)]
pub enum RpcError {
    /// The request never got a well-formed answer.
    #[error("failed to call {method}: {source}")]
    Transport {
        method: String,
        #[source]
        source: reqwest::Error,
    },
    /// The node answered with a JSON-RPC error object.
    #[error("{method} returned error {code}: {message}")]
    Rpc {
        method: String,
        code: i64,
        message: String,
    },
    /// The answer did not have the expected shape.
    #[error("unexpected {method} response: {reason}")]
    Decode { method: String, reason: String },
}

/// Create an HTTP client configured for JSON-RPC requests.
pub fn create_client(timeout: Duration) -> Result<reqwest::Client, anyhow::Error> {
    reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .context("Failed to create HTTP client")
}

/// Make a JSON-RPC call and deserialize the result.
///
/// A `null` result deserializes into `Option::None` when `T` is an `Option`.
pub async fn json_rpc_call<T: DeserializeOwned>(
    client: &reqwest::Client,
    url: &Url,
    method: &str,
    params: Vec<Value>,
) -> Result<T, RpcError> {
    let transport = |source| RpcError::Transport {
        method: method.to_string(),
        source,
    };
    let decode = |reason: String| RpcError::Decode {
        method: method.to_string(),
        reason,
    };

    let response: Value = client
        .post(url.clone())
        .json(&serde_json::json!({
            "jsonrpc": "2.0",
            "method": method,
            "params": params,
            "id": 1
        }))
        .send()
        .await
        .map_err(transport)?
        .json()
        .await
        .map_err(transport)?;

    if let Some(error) = response.get("error") {
        return Err(RpcError::Rpc {
            method: method.to_string(),
            code: error.get("code").and_then(Value::as_i64).unwrap_or_default(),
            message: error
                .get("message")
                .and_then(Value::as_str)
                .unwrap_or("unknown")
                .to_string(),
        });
    }

    let result = response
        .get("result")
        .cloned()
        .ok_or_else(|| decode("no result in response".to_string()))?;

    serde_json::from_value(result).map_err(|err| decode(err.to_string()))
}

/// Deserialize a u64 from a hex quantity (with 0x prefix).
pub(crate) fn deserialize_u64_from_hex<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let s: String = Deserialize::deserialize(deserializer)?;
    u64::from_str_radix(s.trim_start_matches("0x"), 16).map_err(serde::de::Error::custom)
}

/// Parse a hex quantity returned by the node.
pub(crate) fn parse_quantity(method: &str, value: &str) -> Result<u64, RpcError> {
    u64::from_str_radix(value.trim_start_matches("0x"), 16).map_err(|err| RpcError::Decode {
        method: method.to_string(),
        reason: format!("'{value}' is not a hex quantity: {err}"),
    })
}
