//! Drives planned stages through an executor, one at a time.
//!
//! Each stage moves `Pending -> Running -> Succeeded | Skipped | Failed`.
//! The run is forward-only: contracts deployed before a failure stay on chain
//! and stay in the manifest, which is persisted after every stage so an
//! operator can resume from where the run stopped.

use std::fmt;

use comfy_table::Table;

use crate::{
    address::ChainAddress,
    executor::TransactionExecutor,
    manifest::DeploymentManifest,
    planner::{Readiness, StageName, StageSpec},
    store::ManifestStore,
};

/// Kind label for a required stage whose preconditions do not hold.
pub const UNMET_PRECONDITION: &str = "unmet-precondition";

/// Where a stage is in its lifecycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StageStatus {
    Pending,
    Running,
    /// `reused` is set when the address came from a previous run's manifest.
    Succeeded { address: ChainAddress, reused: bool },
    Skipped { reason: String },
    Failed { kind: &'static str, reason: String },
}

impl StageStatus {
    pub fn label(&self) -> &'static str {
        match self {
            StageStatus::Pending => "not attempted",
            StageStatus::Running => "running",
            StageStatus::Succeeded { reused: false, .. } => "deployed",
            StageStatus::Succeeded { reused: true, .. } => "reused",
            StageStatus::Skipped { .. } => "skipped",
            StageStatus::Failed { .. } => "failed",
        }
    }

    fn detail(&self) -> String {
        match self {
            StageStatus::Pending | StageStatus::Running => String::new(),
            StageStatus::Succeeded { address, .. } => address.to_string(),
            StageStatus::Skipped { reason } => reason.clone(),
            StageStatus::Failed { kind, reason } => format!("{kind}: {reason}"),
        }
    }
}

/// Final status of one stage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageOutcome {
    pub name: StageName,
    pub artifact: &'static str,
    pub required: bool,
    pub status: StageStatus,
}

/// Terminal state of a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunState {
    /// Every required stage succeeded; optional ones succeeded, failed or were skipped.
    Completed,
    /// A required stage failed and no later stage was attempted.
    Aborted {
        stage: StageName,
        kind: &'static str,
        reason: String,
    },
}

impl RunState {
    pub fn is_completed(&self) -> bool {
        matches!(self, RunState::Completed)
    }

    /// Process exit code for this state.
    pub fn exit_code(&self) -> u8 {
        match self {
            RunState::Completed => 0,
            RunState::Aborted { .. } => 1,
        }
    }
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunState::Completed => f.write_str("completed"),
            RunState::Aborted {
                stage,
                kind,
                reason,
            } => write!(f, "aborted at `{stage}` ({kind}): {reason}"),
        }
    }
}

/// Everything a finished run produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunReport {
    state: RunState,
    stages: Vec<StageOutcome>,
    manifest: DeploymentManifest,
}

impl RunReport {
    pub fn state(&self) -> &RunState {
        &self.state
    }

    pub fn stages(&self) -> &[StageOutcome] {
        &self.stages
    }

    pub fn outcome(&self, name: StageName) -> Option<&StageOutcome> {
        self.stages.iter().find(|outcome| outcome.name == name)
    }

    pub fn manifest(&self) -> &DeploymentManifest {
        &self.manifest
    }

    pub fn into_manifest(self) -> DeploymentManifest {
        self.manifest
    }

    /// Human-readable table of every stage, followed by the run state.
    pub fn render(&self) -> String {
        let mut table = Table::new();
        table.set_header(vec!["Stage", "Contract", "Status", "Address / reason"]);
        for outcome in &self.stages {
            table.add_row(vec![
                outcome.name.to_string(),
                outcome.artifact.to_string(),
                outcome.status.label().to_string(),
                outcome.status.detail(),
            ]);
        }
        format!("{table}\nDeployment {}", self.state)
    }
}

/// Runs stages strictly in order against a [`TransactionExecutor`].
#[derive(Debug)]
pub struct Orchestrator<E> {
    executor: E,
    store: Option<ManifestStore>,
}

impl<E: TransactionExecutor> Orchestrator<E> {
    pub fn new(executor: E) -> Self {
        Self {
            executor,
            store: None,
        }
    }

    /// Persist the manifest to `store` after every stage.
    pub fn with_store(mut self, store: ManifestStore) -> Self {
        self.store = Some(store);
        self
    }

    pub fn executor(&self) -> &E {
        &self.executor
    }

    /// Run `stages` from scratch.
    pub async fn run(&self, stages: &[StageSpec]) -> RunReport {
        self.resume(stages, DeploymentManifest::new()).await
    }

    /// Run `stages`, reusing addresses already recorded in `prior`.
    pub async fn resume(&self, stages: &[StageSpec], prior: DeploymentManifest) -> RunReport {
        let mut manifest = prior;
        let mut outcomes: Vec<StageOutcome> = stages
            .iter()
            .map(|stage| StageOutcome {
                name: stage.name,
                artifact: stage.artifact,
                required: stage.required,
                status: StageStatus::Pending,
            })
            .collect();
        let mut state = RunState::Completed;

        for (stage, outcome) in stages.iter().zip(outcomes.iter_mut()) {
            let name = stage.name.as_str();

            if let Some(address) = manifest.address_of(name) {
                tracing::info!(stage = name, address = %address, "Already deployed, reusing");
                outcome.status = StageStatus::Succeeded {
                    address,
                    reused: true,
                };
                continue;
            }

            if let Readiness::Unmet { reason } = &stage.readiness {
                if stage.required {
                    tracing::error!(stage = name, reason = %reason, "Required stage is not ready");
                    outcome.status = StageStatus::Failed {
                        kind: UNMET_PRECONDITION,
                        reason: reason.clone(),
                    };
                    state = RunState::Aborted {
                        stage: stage.name,
                        kind: UNMET_PRECONDITION,
                        reason: reason.clone(),
                    };
                    break;
                }
                tracing::warn!(stage = name, reason = %reason, "Skipping {} deploy", stage.artifact);
                outcome.status = StageStatus::Skipped {
                    reason: reason.clone(),
                };
                continue;
            }

            outcome.status = StageStatus::Running;
            tracing::info!(stage = name, contract = stage.artifact, "Deploying...");

            let args = stage.build_args(&manifest);
            match self
                .executor
                .submit_deployment(name, stage.artifact, &args)
                .await
            {
                Ok(address) => {
                    tracing::info!(stage = name, address = %address, "{}: {}", stage.artifact, address);
                    manifest.record(name, address);
                    outcome.status = StageStatus::Succeeded {
                        address,
                        reused: false,
                    };
                    self.persist(&manifest);
                }
                Err(err) if stage.required => {
                    tracing::error!(stage = name, kind = err.kind(), error = %err, "Stage failed, aborting");
                    outcome.status = StageStatus::Failed {
                        kind: err.kind(),
                        reason: err.to_string(),
                    };
                    state = RunState::Aborted {
                        stage: stage.name,
                        kind: err.kind(),
                        reason: err.to_string(),
                    };
                    break;
                }
                Err(err) => {
                    tracing::warn!(stage = name, kind = err.kind(), error = %err, "Optional stage failed");
                    outcome.status = StageStatus::Failed {
                        kind: err.kind(),
                        reason: err.to_string(),
                    };
                }
            }
        }

        match &state {
            RunState::Completed => tracing::info!(contracts = manifest.len(), "✓ Deployment complete!"),
            RunState::Aborted { stage, kind, .. } => {
                tracing::error!(stage = %stage, kind, contracts = manifest.len(), "Deployment aborted")
            }
        }

        RunReport {
            state,
            stages: outcomes,
            manifest,
        }
    }

    fn persist(&self, manifest: &DeploymentManifest) {
        let Some(store) = &self.store else {
            return;
        };
        // Write failures do not stop the run.
        if let Err(err) = store.save(manifest) {
            tracing::error!(error = %format!("{err:#}"), "Failed to persist manifest");
        }
    }
}
