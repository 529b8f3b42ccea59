//! Publishing contract source to an Etherscan-compatible explorer.
//!
//! The request carries the compiler's standard-JSON input, the fully
//! qualified contract name, the exact compiler version, and the
//! ABI-encoded constructor arguments the contract was deployed with.

use alloy_core::{dyn_abi::DynSolValue, primitives::Bytes};
use backon::{ConstantBuilder, Retryable};
use serde::Deserialize;
use serde_json::Value;
use url::Url;

use crate::{
    abi,
    address::ChainAddress,
    artifacts::{Artifact, BuildInfo},
    config::{ConfigResolver, RawConfig},
    error::{ConfigError, ExecutionError},
    executor::ConfirmationPolicy,
};

/// Errors raised while publishing a verification.
#[derive(Debug, thiserror::Error, strum::IntoStaticStr)]
#[strum(serialize_all = "kebab-case")]
pub enum VerificationError {
    #[error("invalid constructor arguments: {0}")]
    Arguments(#[source] ExecutionError),

    #[error("explorer request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("explorer rejected the submission: {reason}")]
    Rejected { reason: String },

    #[error("verification failed: {reason}")]
    Failed { reason: String },

    #[error("verification {guid} still pending after {attempts} checks")]
    Timeout { guid: String, attempts: usize },
}

impl VerificationError {
    pub fn kind(&self) -> &'static str {
        self.into()
    }
}

/// Which deployed contract to verify, and the arguments it was built with.
#[derive(Debug, Clone, PartialEq)]
pub struct VerifyParams {
    pub address: ChainAddress,
    /// Constructor arguments as loosely typed JSON.
    pub args: Vec<Value>,
}

impl VerifyParams {
    /// Reads `contract` (required) and `args` (a JSON array, default `[]`).
    pub fn resolve(raw: &RawConfig) -> Result<Self, ConfigError> {
        let config = ConfigResolver::new(raw);
        let address = config.address("contract", None)?;
        let args = match config.raw("args") {
            None => Vec::new(),
            Some(text) => serde_json::from_str::<Vec<Value>>(text)
                .map_err(|err| ConfigError::malformed("args", text, err))?,
        };
        Ok(Self { address, args })
    }
}

/// Everything an explorer needs to reproduce a deployment's bytecode.
#[derive(Debug, Clone, PartialEq)]
pub struct VerificationRequest {
    pub address: ChainAddress,
    /// e.g. `contracts/Coin.sol:Coin`
    pub contract_name: String,
    /// e.g. `v0.8.20+commit.a1b79de6`
    pub compiler_version: String,
    pub source: Value,
    pub constructor_args: Bytes,
}

impl VerificationRequest {
    pub fn build(
        address: ChainAddress,
        artifact: &Artifact,
        build_info: &BuildInfo,
        args: &[Value],
    ) -> Result<Self, VerificationError> {
        let values = abi::coerce_args(artifact.constructor_inputs(), args)
            .map_err(VerificationError::Arguments)?;
        let constructor_args = DynSolValue::Tuple(values).abi_encode_params();

        Ok(Self {
            address,
            contract_name: artifact.qualified_name(),
            compiler_version: format!("v{}", build_info.solc_long_version),
            source: build_info.input.clone(),
            constructor_args: constructor_args.into(),
        })
    }
}

/// Result of handing a request to the explorer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Submission {
    Queued { guid: String },
    AlreadyVerified,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VerificationStatus {
    Pending,
    Verified,
    Failed { reason: String },
}

/// How the verification ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "kebab-case")]
pub enum VerificationOutcome {
    Verified,
    AlreadyVerified,
}

/// An explorer that accepts source verification requests.
pub trait VerificationBackend: Send + Sync {
    fn submit(
        &self,
        request: &VerificationRequest,
    ) -> impl Future<Output = Result<Submission, VerificationError>> + Send;

    fn status(
        &self,
        guid: &str,
    ) -> impl Future<Output = Result<VerificationStatus, VerificationError>> + Send;
}

/// Client for the Etherscan `contract` API module.
#[derive(Debug, Clone)]
pub struct EtherscanClient {
    client: reqwest::Client,
    api_url: Url,
    api_key: String,
}

#[derive(Debug, Deserialize)]
struct ApiResponse {
    status: String,
    result: String,
}

impl EtherscanClient {
    pub fn new(client: reqwest::Client, api_url: Url, api_key: impl Into<String>) -> Self {
        Self {
            client,
            api_url,
            api_key: api_key.into(),
        }
    }
}

impl VerificationBackend for EtherscanClient {
    async fn submit(&self, request: &VerificationRequest) -> Result<Submission, VerificationError> {
        let address = request.address.to_string();
        let source = request.source.to_string();
        let constructor_args = hex::encode(&request.constructor_args);
        let form = [
            ("apikey", self.api_key.as_str()),
            ("module", "contract"),
            ("action", "verifysourcecode"),
            ("contractaddress", address.as_str()),
            ("sourceCode", source.as_str()),
            ("codeformat", "solidity-standard-json-input"),
            ("contractname", request.contract_name.as_str()),
            ("compilerversion", request.compiler_version.as_str()),
            // Misspelling is part of the explorer API.
            ("constructorArguements", constructor_args.as_str()),
        ];

        let response: ApiResponse = self
            .client
            .post(self.api_url.clone())
            .form(&form)
            .send()
            .await?
            .json()
            .await?;
        classify_submission(response)
    }

    async fn status(&self, guid: &str) -> Result<VerificationStatus, VerificationError> {
        let response: ApiResponse = self
            .client
            .get(self.api_url.clone())
            .query(&[
                ("apikey", self.api_key.as_str()),
                ("module", "contract"),
                ("action", "checkverifystatus"),
                ("guid", guid),
            ])
            .send()
            .await?
            .json()
            .await?;
        Ok(classify_status(response))
    }
}

fn is_already_verified(result: &str) -> bool {
    result.to_lowercase().contains("already verified")
}

fn classify_submission(response: ApiResponse) -> Result<Submission, VerificationError> {
    if response.status == "1" {
        Ok(Submission::Queued {
            guid: response.result,
        })
    } else if is_already_verified(&response.result) {
        Ok(Submission::AlreadyVerified)
    } else {
        Err(VerificationError::Rejected {
            reason: response.result,
        })
    }
}

fn classify_status(response: ApiResponse) -> VerificationStatus {
    let result = response.result;
    if result.to_lowercase().contains("pending") {
        VerificationStatus::Pending
    } else if response.status == "1" || is_already_verified(&result) {
        VerificationStatus::Verified
    } else {
        VerificationStatus::Failed { reason: result }
    }
}

/// Why a status poll did not settle.
#[derive(Debug)]
enum StatusPoll {
    Pending,
    Error(VerificationError),
}

/// Submit `request` and poll the explorer until it settles.
pub async fn publish_verification<B: VerificationBackend>(
    backend: &B,
    request: &VerificationRequest,
    policy: ConfirmationPolicy,
) -> Result<VerificationOutcome, VerificationError> {
    tracing::info!(
        address = %request.address,
        contract = %request.contract_name,
        compiler = %request.compiler_version,
        "Submitting verification"
    );

    let guid = match backend.submit(request).await? {
        Submission::AlreadyVerified => {
            tracing::info!(address = %request.address, "Contract is already verified");
            return Ok(VerificationOutcome::AlreadyVerified);
        }
        Submission::Queued { guid } => guid,
    };
    tracing::info!(guid = %guid, "Verification queued");

    let attempts = policy.max_polls();
    let backoff = ConstantBuilder::default()
        .with_delay(policy.poll_interval)
        .with_max_times(attempts);
    let guid_ref = guid.as_str();

    let status = (move || async move {
        match backend.status(guid_ref).await {
            Ok(VerificationStatus::Pending) => Err(StatusPoll::Pending),
            Ok(settled) => Ok(settled),
            Err(err) => Err(StatusPoll::Error(err)),
        }
    })
    .retry(backoff)
    .sleep(tokio::time::sleep)
    .when(|poll| matches!(poll, StatusPoll::Pending))
    .notify(|_, after| {
        tracing::debug!(guid = %guid_ref, ?after, "Verification pending");
    })
    .await
    .map_err(|poll| match poll {
        StatusPoll::Pending => VerificationError::Timeout {
            guid: guid.clone(),
            attempts,
        },
        StatusPoll::Error(err) => err,
    })?;

    match status {
        VerificationStatus::Verified => {
            tracing::info!(address = %request.address, guid = %guid, "Contract verified");
            Ok(VerificationOutcome::Verified)
        }
        VerificationStatus::Failed { reason } => Err(VerificationError::Failed { reason }),
        VerificationStatus::Pending => unreachable!("pending status is retried"),
    }
}
