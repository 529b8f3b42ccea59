use std::{path::PathBuf, time::Duration};

use clap::{Parser, Subcommand};
use paias_deploy::{ChainAddress, ConfirmationPolicy, artifacts::DEFAULT_ARTIFACTS_DIR};
use tracing::level_filters::LevelFilter;
use url::Url;

/// The default node endpoint (a local dev node).
const DEFAULT_RPC_URL: &str = "http://127.0.0.1:8545";
/// The default directory manifests are written under, one subdirectory per chain.
const DEFAULT_DEPLOYMENTS_DIR: &str = "deployments";

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// The verbosity level.
    #[arg(short, long, env = "PAIAS_VERBOSITY", default_value_t = LevelFilter::INFO, global = true)]
    pub verbosity: LevelFilter,

    /// TOML file with deployment inputs. Environment variables override it.
    #[arg(short, long, env = "PAIAS_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// JSON-RPC endpoint of the target chain.
    #[arg(long, alias = "rpc", env = "PAIAS_RPC_URL", default_value = DEFAULT_RPC_URL, global = true)]
    pub rpc_url: Url,

    /// Account to send transactions from. Must be unlocked on the node.
    /// Defaults to the node's first account.
    #[arg(long, env = "PAIAS_FROM", global = true)]
    pub from: Option<ChainAddress>,

    /// Hardhat artifacts directory.
    #[arg(long, env = "PAIAS_ARTIFACTS", default_value = DEFAULT_ARTIFACTS_DIR, global = true)]
    pub artifacts: PathBuf,

    /// Directory for deployment manifests.
    #[arg(long, env = "PAIAS_DEPLOYMENTS", default_value = DEFAULT_DEPLOYMENTS_DIR, global = true)]
    pub deployments: PathBuf,

    /// Seconds to wait for each transaction to be confirmed.
    #[arg(long, env = "PAIAS_CONFIRMATION_TIMEOUT", default_value_t = 120, global = true)]
    pub confirmation_timeout: u64,

    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    pub fn confirmation_policy(&self) -> ConfirmationPolicy {
        ConfirmationPolicy {
            timeout: Duration::from_secs(self.confirmation_timeout),
            ..Default::default()
        }
    }
}

#[derive(Subcommand)]
pub enum Command {
    /// Deploy the token, staking, vesting and (when configured) buyback contracts.
    Deploy {
        /// Continue from the manifest of a previous run on the same chain.
        #[arg(long, env = "PAIAS_RESUME", default_value_t = false)]
        resume: bool,
    },

    /// Approve the router and add token/base-token liquidity to the pool.
    SeedLiquidity,

    /// Trigger a buyback on the deployed buyback module.
    Buyback,

    /// Publish a deployed contract's source to a block explorer.
    Verify {
        /// Artifact name of the contract, e.g. `Staking`.
        #[arg(long)]
        contract_name: String,

        /// Etherscan-compatible API endpoint.
        #[arg(long, env = "PAIAS_EXPLORER_API_URL")]
        explorer_api_url: Url,

        #[arg(long, env = "PAIAS_EXPLORER_API_KEY", hide_env_values = true)]
        explorer_api_key: String,
    },
}
