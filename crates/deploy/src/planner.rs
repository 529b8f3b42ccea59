//! Deployment stages and their fixed order.
//!
//! The order is token -> staking -> vesting -> buyback. Staking, vesting and
//! buyback all take the token address, so the token always goes first; the
//! optional buyback always goes last.

use alloy_core::{dyn_abi::DynSolValue, primitives::U256};

use crate::{manifest::DeploymentManifest, params::DeployParams};

/// A deployable unit of the suite.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    strum::Display,
    strum::EnumString,
    strum::IntoStaticStr,
)]
#[strum(serialize_all = "kebab-case")]
pub enum StageName {
    Token,
    Staking,
    Vesting,
    Buyback,
}

impl StageName {
    /// Key under which the stage's address is recorded in the manifest.
    pub fn as_str(&self) -> &'static str {
        self.into()
    }

    /// Contract artifact the stage deploys.
    pub fn artifact(&self) -> &'static str {
        match self {
            StageName::Token => "Coin",
            StageName::Staking => "Staking",
            StageName::Vesting => "Vesting",
            StageName::Buyback => "Buyback",
        }
    }
}

/// Why the buyback stage is skipped when its dependencies are not configured.
pub const BUYBACK_UNMET: &str = "base_token/router not set or invalid";

/// One constructor argument of a stage.
#[derive(Debug, Clone, PartialEq)]
pub enum StageInput {
    /// A value known at planning time.
    Literal(DynSolValue),
    /// The address produced by an earlier stage.
    Output(StageName),
    /// An `address[]` built from other inputs.
    AddressArray(Vec<StageInput>),
}

impl StageInput {
    fn resolve(&self, stage: StageName, manifest: &DeploymentManifest) -> DynSolValue {
        match self {
            StageInput::Literal(value) => value.clone(),
            StageInput::Output(dependency) => manifest
                .address_of(dependency.as_str())
                .unwrap_or_else(|| {
                    panic!(
                        "stage `{stage}` depends on `{dependency}`, which has not been deployed; \
                         stages must run in planned order"
                    )
                })
                .into(),
            StageInput::AddressArray(items) => DynSolValue::Array(
                items
                    .iter()
                    .map(|item| item.resolve(stage, manifest))
                    .collect(),
            ),
        }
    }

    fn collect_dependencies(&self, out: &mut Vec<StageName>) {
        match self {
            StageInput::Literal(_) => {}
            StageInput::Output(dependency) => {
                if !out.contains(dependency) {
                    out.push(*dependency);
                }
            }
            StageInput::AddressArray(items) => {
                items.iter().for_each(|item| item.collect_dependencies(out));
            }
        }
    }
}

/// Whether a stage's own preconditions hold.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Readiness {
    Ready,
    Unmet { reason: String },
}

/// Immutable description of one deployable unit.
#[derive(Debug, Clone, PartialEq)]
pub struct StageSpec {
    pub name: StageName,
    pub artifact: &'static str,
    pub inputs: Vec<StageInput>,
    /// A required stage aborts the run when it cannot complete; an optional
    /// one is skipped when its preconditions are unmet.
    pub required: bool,
    pub readiness: Readiness,
}

impl StageSpec {
    fn required(name: StageName, inputs: Vec<StageInput>) -> Self {
        Self {
            name,
            artifact: name.artifact(),
            inputs,
            required: true,
            readiness: Readiness::Ready,
        }
    }

    /// Earlier stages whose addresses this stage consumes.
    pub fn dependencies(&self) -> Vec<StageName> {
        let mut out = Vec::new();
        self.inputs
            .iter()
            .for_each(|input| input.collect_dependencies(&mut out));
        out
    }

    pub fn is_ready(&self) -> bool {
        self.readiness == Readiness::Ready
    }

    /// Constructor arguments, with dependency addresses taken from `manifest`.
    ///
    /// # Panics
    ///
    /// If a dependency is missing from the manifest. The planner orders stages
    /// topologically, so this only happens when stages are run out of order.
    pub fn build_args(&self, manifest: &DeploymentManifest) -> Vec<DynSolValue> {
        self.inputs
            .iter()
            .map(|input| input.resolve(self.name, manifest))
            .collect()
    }
}

/// The ordered stages for a full deployment.
pub fn plan(params: &DeployParams) -> Vec<StageSpec> {
    use StageInput::{AddressArray, Literal, Output};

    let admin = Literal(params.admin.into());
    let token = Output(StageName::Token);

    let token_stage = StageSpec::required(
        StageName::Token,
        vec![
            Literal(DynSolValue::String(params.token_name.clone())),
            Literal(DynSolValue::String(params.token_symbol.clone())),
            admin.clone(),
            Literal(params.initial_supply.into()),
        ],
    );

    let staking_stage = StageSpec::required(
        StageName::Staking,
        vec![
            admin.clone(),
            token.clone(),
            token.clone(),
            Literal(params.reward_rate.as_amount().into()),
            Literal(DynSolValue::Uint(U256::from(params.staking_lock.as_secs()), 256)),
        ],
    );

    let vesting_stage = StageSpec::required(StageName::Vesting, vec![admin.clone(), token.clone()]);

    let buyback_stage = match params.buyback {
        Some(deps) => StageSpec {
            required: false,
            ..StageSpec::required(
                StageName::Buyback,
                vec![
                    admin,
                    Literal(deps.base_token.into()),
                    token.clone(),
                    Literal(deps.router.into()),
                    AddressArray(vec![Literal(deps.base_token.into()), token]),
                ],
            )
        },
        None => StageSpec {
            name: StageName::Buyback,
            artifact: StageName::Buyback.artifact(),
            inputs: Vec::new(),
            required: false,
            readiness: Readiness::Unmet {
                reason: BUYBACK_UNMET.to_string(),
            },
        },
    };

    vec![token_stage, staking_stage, vesting_stage, buyback_stage]
}
