//! End-to-end tests for planning, orchestration and operational actions.
//!
//! A scripted executor stands in for the chain: it hands out sequential
//! addresses, records every submission, and fails on request.
//! Run with: cargo test --test integration_test

use std::sync::{Arc, Mutex};

use alloy_core::{
    dyn_abi::DynSolValue,
    primitives::{Address, B256, U256},
};
use paias_deploy::{
    ChainAddress, DeployParams, DeploymentManifest, ExecutionError, ManifestStore,
    OperationError, Orchestrator, RawConfig, Receipt, RunState, StageName, StageStatus,
    TransactionExecutor,
    ops::{
        buyback::{BuybackParams, trigger_buyback},
        liquidity::{DEADLINE_WINDOW, LiquidityParams, seed_liquidity},
    },
    orchestrator::UNMET_PRECONDITION,
    plan,
    planner::BUYBACK_UNMET,
};
use tempdir::TempDir;

const DEPLOYER: &str = "0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266";
const MULTISIG: &str = "0x70997970C51812dc3A010C7d01b50e0d17dc79C8";
const BASE: &str = "0x3C44CdDdB6a900fa2b585dd299e03d12FA4293BC";
const ROUTER: &str = "0x90F79bf6EB2c4f870365E785982E1f101E93b906";

fn addr(raw: &str) -> ChainAddress {
    ChainAddress::parse(raw).unwrap()
}

/// A submission seen by the scripted executor.
#[derive(Debug, Clone, PartialEq)]
enum Submitted {
    Deployment {
        stage: String,
        artifact: String,
        args: Vec<DynSolValue>,
    },
    Call {
        target: ChainAddress,
        method: String,
        args: Vec<DynSolValue>,
    },
}

#[derive(Debug, Default)]
struct ScriptedExecutor {
    fail_stage: Option<(&'static str, ExecutionError)>,
    fail_method: Option<&'static str>,
    submitted: Mutex<Vec<Submitted>>,
}

impl ScriptedExecutor {
    fn failing_at(stage: &'static str, error: ExecutionError) -> Self {
        Self {
            fail_stage: Some((stage, error)),
            ..Default::default()
        }
    }

    fn submitted(&self) -> Vec<Submitted> {
        self.submitted.lock().unwrap().clone()
    }

    fn deployed_stages(&self) -> Vec<String> {
        self.submitted()
            .into_iter()
            .filter_map(|submission| match submission {
                Submitted::Deployment { stage, .. } => Some(stage),
                Submitted::Call { .. } => None,
            })
            .collect()
    }

    fn next_index(&self) -> u8 {
        self.submitted.lock().unwrap().len() as u8
    }
}

/// Contract addresses handed out by the executor: 0x...01, 0x...02, ...
fn deployed_address(index: u8) -> ChainAddress {
    ChainAddress::from_chain(Address::with_last_byte(index))
}

impl TransactionExecutor for ScriptedExecutor {
    fn sender(&self) -> ChainAddress {
        addr(DEPLOYER)
    }

    async fn submit_deployment(
        &self,
        stage: &str,
        artifact: &str,
        args: &[DynSolValue],
    ) -> Result<ChainAddress, ExecutionError> {
        if let Some((failing, error)) = &self.fail_stage {
            if *failing == stage {
                return Err(error.clone());
            }
        }
        let index = self.next_index() + 1;
        self.submitted.lock().unwrap().push(Submitted::Deployment {
            stage: stage.to_string(),
            artifact: artifact.to_string(),
            args: args.to_vec(),
        });
        Ok(deployed_address(index))
    }

    async fn submit_call(
        &self,
        target: ChainAddress,
        method: &str,
        args: &[DynSolValue],
    ) -> Result<Receipt, ExecutionError> {
        if self.fail_method.is_some_and(|failing| method.starts_with(failing)) {
            return Err(ExecutionError::Reverted {
                reason: "execution reverted".to_string(),
            });
        }
        let index = self.next_index();
        self.submitted.lock().unwrap().push(Submitted::Call {
            target,
            method: method.to_string(),
            args: args.to_vec(),
        });
        Ok(Receipt {
            transaction_hash: B256::with_last_byte(index),
            block_number: u64::from(index) + 1,
            gas_used: 21_000,
            contract_address: None,
            status: 1,
        })
    }
}

fn default_plan() -> Vec<paias_deploy::StageSpec> {
    let params = DeployParams::resolve(&RawConfig::new(), addr(DEPLOYER)).unwrap();
    plan(&params)
}

fn full_plan() -> Vec<paias_deploy::StageSpec> {
    let raw = RawConfig::new()
        .with("admin_multisig", MULTISIG)
        .with("base_token", BASE)
        .with("router", ROUTER);
    plan(&DeployParams::resolve(&raw, addr(DEPLOYER)).unwrap())
}

/// Captures formatted log output for the current thread.
#[derive(Clone, Default)]
struct LogBuffer(Arc<Mutex<Vec<u8>>>);

impl std::io::Write for LogBuffer {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

impl LogBuffer {
    fn contents(&self) -> String {
        String::from_utf8(self.0.lock().unwrap().clone()).unwrap()
    }
}

#[tokio::test]
async fn test_default_deployment_skips_buyback() {
    let logs = LogBuffer::default();
    let writer = logs.clone();
    let subscriber = tracing_subscriber::fmt()
        .with_ansi(false)
        .with_max_level(tracing::Level::WARN)
        .with_writer(move || writer.clone())
        .finish();
    let _guard = tracing::subscriber::set_default(subscriber);

    let executor = ScriptedExecutor::default();
    let report = Orchestrator::new(executor).run(&default_plan()).await;

    assert_eq!(*report.state(), RunState::Completed);
    assert_eq!(report.state().exit_code(), 0);

    let manifest = report.manifest();
    assert_eq!(manifest.len(), 3);
    assert_eq!(manifest.address_of("token"), Some(deployed_address(1)));
    assert_eq!(manifest.address_of("staking"), Some(deployed_address(2)));
    assert_eq!(manifest.address_of("vesting"), Some(deployed_address(3)));
    assert!(!manifest.contains("buyback"));

    assert_eq!(
        report.outcome(StageName::Buyback).unwrap().status,
        StageStatus::Skipped {
            reason: BUYBACK_UNMET.to_string()
        }
    );

    let logs = logs.contents();
    assert!(logs.contains("WARN"), "{logs}");
    assert!(logs.contains("Skipping Buyback deploy"), "{logs}");
    assert!(logs.contains(BUYBACK_UNMET), "{logs}");
    assert!(report.render().contains(BUYBACK_UNMET));
}

#[tokio::test]
async fn test_default_deployment_arguments() {
    let orchestrator = Orchestrator::new(ScriptedExecutor::default());
    orchestrator.run(&default_plan()).await;

    let submitted = orchestrator.executor().submitted();
    let deployer: DynSolValue = addr(DEPLOYER).into();
    let token: DynSolValue = deployed_address(1).into();
    let supply = U256::from(1_000_000_000u64) * U256::from(10u64).pow(U256::from(18));

    assert_eq!(
        submitted,
        vec![
            Submitted::Deployment {
                stage: "token".to_string(),
                artifact: "Coin".to_string(),
                args: vec![
                    DynSolValue::String("PaiasCoin".to_string()),
                    DynSolValue::String("PAI".to_string()),
                    deployer.clone(),
                    DynSolValue::Uint(supply, 256),
                ],
            },
            Submitted::Deployment {
                stage: "staking".to_string(),
                artifact: "Staking".to_string(),
                args: vec![
                    deployer.clone(),
                    token.clone(),
                    token.clone(),
                    DynSolValue::Uint(U256::from(5_787_037_037_037u64), 256),
                    DynSolValue::Uint(U256::from(2_592_000u64), 256),
                ],
            },
            Submitted::Deployment {
                stage: "vesting".to_string(),
                artifact: "Vesting".to_string(),
                args: vec![deployer, token],
            },
        ]
    );
}

#[tokio::test]
async fn test_full_deployment_wires_buyback() {
    let orchestrator = Orchestrator::new(ScriptedExecutor::default());
    let report = orchestrator.run(&full_plan()).await;

    assert!(report.state().is_completed());
    assert_eq!(
        orchestrator.executor().deployed_stages(),
        ["token", "staking", "vesting", "buyback"]
    );
    assert_eq!(report.manifest().address_of("buyback"), Some(deployed_address(4)));

    let Some(Submitted::Deployment { args, .. }) = orchestrator.executor().submitted().pop()
    else {
        panic!("buyback was not deployed last");
    };
    let token: DynSolValue = deployed_address(1).into();
    let base: DynSolValue = addr(BASE).into();
    assert_eq!(
        args,
        vec![
            addr(MULTISIG).into(),
            base.clone(),
            token.clone(),
            addr(ROUTER).into(),
            DynSolValue::Array(vec![base, token]),
        ]
    );
}

#[tokio::test]
async fn test_required_failure_aborts_run() {
    let executor = ScriptedExecutor::failing_at(
        "staking",
        ExecutionError::Reverted {
            reason: "execution reverted".to_string(),
        },
    );
    let orchestrator = Orchestrator::new(executor);
    let report = orchestrator.run(&full_plan()).await;

    assert_eq!(
        *report.state(),
        RunState::Aborted {
            stage: StageName::Staking,
            kind: "reverted",
            reason: "transaction reverted: execution reverted".to_string(),
        }
    );
    assert_eq!(report.state().exit_code(), 1);

    // Token stays deployed; nothing after staking is attempted.
    assert_eq!(report.manifest().len(), 1);
    assert!(report.manifest().contains("token"));
    assert_eq!(orchestrator.executor().deployed_stages(), ["token"]);
    assert_eq!(
        report.outcome(StageName::Vesting).unwrap().status,
        StageStatus::Pending
    );
    assert_eq!(
        report.outcome(StageName::Buyback).unwrap().status,
        StageStatus::Pending
    );
}

#[tokio::test]
async fn test_optional_failure_does_not_abort() {
    let executor = ScriptedExecutor::failing_at(
        "buyback",
        ExecutionError::NotConfirmed {
            reason: "timed out".to_string(),
        },
    );
    let report = Orchestrator::new(executor).run(&full_plan()).await;

    assert!(report.state().is_completed());
    assert_eq!(report.manifest().len(), 3);
    assert!(matches!(
        report.outcome(StageName::Buyback).unwrap().status,
        StageStatus::Failed {
            kind: "not-confirmed",
            ..
        }
    ));
}

#[tokio::test]
async fn test_required_stage_with_unmet_precondition_aborts() {
    let mut stages = default_plan();
    stages[1].readiness = paias_deploy::planner::Readiness::Unmet {
        reason: "rewards not funded".to_string(),
    };

    let orchestrator = Orchestrator::new(ScriptedExecutor::default());
    let report = orchestrator.run(&stages).await;

    assert!(matches!(
        report.state(),
        RunState::Aborted {
            stage: StageName::Staking,
            kind: UNMET_PRECONDITION,
            ..
        }
    ));
    assert_eq!(orchestrator.executor().deployed_stages(), ["token"]);
}

#[tokio::test]
async fn test_resume_reuses_recorded_stages() {
    let root = TempDir::new("paias-resume").unwrap();
    let store = ManifestStore::new(root.path(), 31337);

    let failing = ScriptedExecutor::failing_at(
        "vesting",
        ExecutionError::NotConfirmed {
            reason: "node went away".to_string(),
        },
    );
    let report = Orchestrator::new(failing)
        .with_store(store.clone())
        .run(&default_plan())
        .await;
    assert!(!report.state().is_completed());

    let prior = store.load().unwrap().unwrap();
    assert_eq!(prior.len(), 2);

    let orchestrator = Orchestrator::new(ScriptedExecutor::default()).with_store(store.clone());
    let report = orchestrator.resume(&default_plan(), prior.clone()).await;

    assert!(report.state().is_completed());
    assert_eq!(orchestrator.executor().deployed_stages(), ["vesting"]);
    assert_eq!(
        report.outcome(StageName::Token).unwrap().status,
        StageStatus::Succeeded {
            address: prior.address_of("token").unwrap(),
            reused: true,
        }
    );

    // Vesting receives the token address from the first run.
    let Some(Submitted::Deployment { args, .. }) = orchestrator.executor().submitted().pop()
    else {
        panic!("vesting was not deployed");
    };
    assert_eq!(args[1], DynSolValue::from(prior.address_of("token").unwrap()));

    let stored = store.load().unwrap().unwrap();
    assert_eq!(stored.len(), 3);
    assert_eq!(stored, *report.manifest());
}

#[tokio::test]
async fn test_render_report() {
    let report = Orchestrator::new(ScriptedExecutor::default())
        .run(&default_plan())
        .await;
    let rendered = report.render();

    assert!(rendered.contains("Coin"));
    assert!(rendered.contains(&deployed_address(1).to_string()));
    assert!(rendered.contains("skipped"));
    assert!(rendered.ends_with("Deployment completed"));
}

fn deployed_manifest() -> DeploymentManifest {
    let mut manifest = DeploymentManifest::new();
    manifest.record("token", deployed_address(1));
    manifest.record("buyback", deployed_address(4));
    manifest
}

#[tokio::test]
async fn test_seed_liquidity() {
    let raw = RawConfig::new()
        .with("router", ROUTER)
        .with("base_token", BASE)
        .with("amount_pai", "500")
        .with("amount_base", "25.5");
    let params =
        LiquidityParams::resolve(&raw, Some(&deployed_manifest()), addr(DEPLOYER)).unwrap();

    let executor = ScriptedExecutor::default();
    let now = 1_700_000_000;
    let receipts = seed_liquidity(&executor, &params, now).await.unwrap();
    assert_eq!(receipts.deadline, now + DEADLINE_WINDOW.as_secs());

    let amount_token = DynSolValue::Uint(U256::from(500u64) * U256::from(10u64).pow(U256::from(18)), 256);
    let amount_base = DynSolValue::Uint(U256::from(25_500_000u64), 256);
    let token = deployed_address(1);

    assert_eq!(
        executor.submitted(),
        vec![
            Submitted::Call {
                target: token,
                method: "approve(address,uint256)".to_string(),
                args: vec![addr(ROUTER).into(), amount_token.clone()],
            },
            Submitted::Call {
                target: addr(BASE),
                method: "approve(address,uint256)".to_string(),
                args: vec![addr(ROUTER).into(), amount_base.clone()],
            },
            Submitted::Call {
                target: addr(ROUTER),
                method: "addLiquidity(address,address,uint256,uint256,uint256,uint256,address,uint256)"
                    .to_string(),
                args: vec![
                    token.into(),
                    addr(BASE).into(),
                    amount_token.clone(),
                    amount_base.clone(),
                    amount_token,
                    amount_base,
                    addr(DEPLOYER).into(),
                    DynSolValue::Uint(U256::from(now + 900), 256),
                ],
            },
        ]
    );
}

#[tokio::test]
async fn test_seed_liquidity_stops_at_failed_approval() {
    let raw = RawConfig::new()
        .with("router", ROUTER)
        .with("base_token", BASE)
        .with("pai", DEPLOYER);
    let params = LiquidityParams::resolve(&raw, None, addr(DEPLOYER)).unwrap();

    let executor = ScriptedExecutor {
        fail_method: Some("approve"),
        ..Default::default()
    };
    let err = seed_liquidity(&executor, &params, 0).await.unwrap_err();

    assert!(matches!(
        err,
        OperationError::Execution {
            step: "approve token",
            ..
        }
    ));
    assert!(executor.submitted().is_empty());
}

#[tokio::test]
async fn test_trigger_buyback() {
    let raw = RawConfig::new().with("amount", "250").with("burn", "false");
    let params = BuybackParams::resolve(&raw, Some(&deployed_manifest())).unwrap();

    let executor = ScriptedExecutor::default();
    trigger_buyback(&executor, &params).await.unwrap();

    assert_eq!(
        executor.submitted(),
        vec![Submitted::Call {
            target: deployed_address(4),
            method: "perform(uint256,bool)".to_string(),
            args: vec![
                DynSolValue::Uint(U256::from(250_000_000u64), 256),
                DynSolValue::Bool(false),
            ],
        }]
    );
}

#[tokio::test]
async fn test_invalid_config_fails_before_submission() {
    let raw = RawConfig::new().with("amount", "1.0000001");
    let err = BuybackParams::resolve(&raw, Some(&deployed_manifest())).unwrap_err();
    assert_eq!(err.kind(), "malformed");

    let raw = RawConfig::new().with("admin_multisig", "0xnot-an-address");
    let params = DeployParams::resolve(&raw, addr(DEPLOYER)).unwrap();
    assert_eq!(params.admin, addr(DEPLOYER));
}
