//! paias is the operator CLI for deploying and operating the PaiasCoin contracts.

mod cli;

use std::{
    process::ExitCode,
    time::{SystemTime, UNIX_EPOCH},
};

use anyhow::{Context, Result};
use clap::Parser;

use cli::{Cli, Command};
use paias_deploy::{
    ArtifactStore, DeployParams, ManifestStore, Orchestrator, RawConfig, RpcExecutor,
    TransactionExecutor,
    ops::{
        buyback::{BuybackParams, trigger_buyback},
        liquidity::{LiquidityParams, seed_liquidity},
        verify::{EtherscanClient, VerificationRequest, VerifyParams, publish_verification},
    },
    plan, rpc,
};

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    // Initialize the logger.
    tracing_subscriber::fmt()
        .with_max_level(cli.verbosity)
        .init();

    let raw = RawConfig::load(cli.config.as_deref())?;
    let artifacts = ArtifactStore::new(&cli.artifacts);

    match &cli.command {
        Command::Deploy { resume } => {
            let (executor, store) = connect(&cli, artifacts).await?;
            deploy(executor, store, &raw, *resume).await
        }
        Command::SeedLiquidity => {
            let (executor, store) = connect(&cli, artifacts).await?;
            let manifest = store.load()?;
            let params = LiquidityParams::resolve(&raw, manifest.as_ref(), executor.sender())?;
            let receipts = seed_liquidity(&executor, &params, now_unix()?).await?;
            tracing::info!(
                tx_hash = %receipts.liquidity.transaction_hash,
                deadline = receipts.deadline,
                "Liquidity added"
            );
            Ok(ExitCode::SUCCESS)
        }
        Command::Buyback => {
            let (executor, store) = connect(&cli, artifacts).await?;
            let manifest = store.load()?;
            let params = BuybackParams::resolve(&raw, manifest.as_ref())?;
            let receipt = trigger_buyback(&executor, &params).await?;
            tracing::info!(tx_hash = %receipt.transaction_hash, "Buyback executed");
            Ok(ExitCode::SUCCESS)
        }
        Command::Verify {
            contract_name,
            explorer_api_url,
            explorer_api_key,
        } => {
            let params = VerifyParams::resolve(&raw)?;
            let artifact = artifacts.load(contract_name)?;
            let build_info = artifacts.load_build_info(contract_name)?;
            let request =
                VerificationRequest::build(params.address, &artifact, &build_info, &params.args)?;

            let client = rpc::create_client(rpc::DEFAULT_REQUEST_TIMEOUT)?;
            let backend =
                EtherscanClient::new(client, explorer_api_url.clone(), explorer_api_key.as_str());
            let outcome =
                publish_verification(&backend, &request, cli.confirmation_policy()).await?;
            println!("{}: {outcome}", request.address);
            Ok(ExitCode::SUCCESS)
        }
    }
}

/// Connect to the node and open the manifest store for its chain.
async fn connect(cli: &Cli, artifacts: ArtifactStore) -> Result<(RpcExecutor, ManifestStore)> {
    let executor = RpcExecutor::connect(
        cli.rpc_url.clone(),
        cli.from,
        artifacts,
        cli.confirmation_policy(),
    )
    .await?;
    let store = ManifestStore::new(&cli.deployments, executor.chain_id());
    Ok((executor, store))
}

async fn deploy(
    executor: RpcExecutor,
    store: ManifestStore,
    raw: &RawConfig,
    resume: bool,
) -> Result<ExitCode> {
    let prior = if resume {
        store.load()?.unwrap_or_default()
    } else {
        if store.exists() {
            anyhow::bail!(
                "A deployment already exists at {}; pass --resume to continue it",
                store.manifest_path().display()
            );
        }
        Default::default()
    };

    let params = DeployParams::resolve(raw, executor.sender())?;
    let params_path = store.save_params(&params)?;
    tracing::info!(
        admin = %params.admin,
        token = %params.token_symbol,
        reward_rate = %params.reward_rate.per_second,
        shortfall = %params.reward_rate.shortfall,
        buyback = params.buyback.is_some(),
        path = %params_path.display(),
        "Deployment parameters resolved"
    );

    let stages = plan(&params);
    let report = Orchestrator::new(executor)
        .with_store(store)
        .resume(&stages, prior)
        .await;

    println!("{}", report.render());
    Ok(ExitCode::from(report.state().exit_code()))
}

fn now_unix() -> Result<u64> {
    Ok(SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .context("System clock is before the Unix epoch")?
        .as_secs())
}
