//! paias-deploy - Deployment orchestration for the PaiasCoin contract suite.
//!
//! Resolves operator config into deployment parameters, plans the
//! token → staking → vesting → buyback sequence, and drives it through a
//! [`TransactionExecutor`]. The [`ops`] module holds the follow-up actions
//! run against a finished deployment.

pub mod abi;
pub mod address;
pub mod amount;
pub mod artifacts;
pub mod config;
pub mod derive;
pub mod error;
pub mod executor;
pub mod manifest;
pub mod ops;
pub mod orchestrator;
pub mod params;
pub mod planner;
pub mod rpc;
pub mod store;

pub use address::ChainAddress;
pub use amount::Amount;
pub use artifacts::{Artifact, ArtifactStore, BuildInfo};
pub use config::{ConfigResolver, RawConfig};
pub use derive::{DerivedRate, derive_rate};
pub use error::{ArithmeticError, ConfigError, ExecutionError, OperationError, PlanError};
pub use executor::{ConfirmationPolicy, Receipt, RpcExecutor, TransactionExecutor};
pub use manifest::DeploymentManifest;
pub use orchestrator::{Orchestrator, RunReport, RunState, StageOutcome, StageStatus};
pub use params::DeployParams;
pub use planner::{StageName, StageSpec, plan};
pub use store::ManifestStore;
