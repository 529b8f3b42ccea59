//! Error taxonomy for planning, deploying and operating the contract suite.
//!
//! Config and arithmetic errors are raised before any transaction is submitted.
//! Execution errors come from the chain and may leave earlier stages deployed.

use crate::address::ChainAddress;

/// A configuration value was absent or could not be parsed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error, strum::IntoStaticStr)]
#[strum(serialize_all = "kebab-case")]
pub enum ConfigError {
    #[error("missing required config value `{name}`")]
    MissingRequired { name: String },
    #[error("malformed config value `{name}` = '{value}': {reason}")]
    Malformed {
        name: String,
        value: String,
        reason: String,
    },
}

impl ConfigError {
    /// Short label used in operator reports.
    pub fn kind(&self) -> &'static str {
        self.into()
    }

    pub(crate) fn malformed(name: &str, value: &str, reason: impl ToString) -> Self {
        Self::Malformed {
            name: name.to_string(),
            value: value.to_string(),
            reason: reason.to_string(),
        }
    }
}

/// A derived parameter could not be computed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error, strum::IntoStaticStr)]
#[strum(serialize_all = "kebab-case")]
pub enum ArithmeticError {
    #[error("division by zero")]
    DivisionByZero,
    #[error("amount scales differ: {left} vs {right} decimals")]
    ScaleMismatch { left: u8, right: u8 },
    #[error("arithmetic overflow")]
    Overflow,
}

impl ArithmeticError {
    pub fn kind(&self) -> &'static str {
        self.into()
    }
}

/// Submitting or confirming a transaction failed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error, strum::IntoStaticStr)]
#[strum(serialize_all = "kebab-case")]
pub enum ExecutionError {
    /// The transaction was not confirmed in time, or the node could not be reached.
    #[error("transaction not confirmed: {reason}")]
    NotConfirmed { reason: String },
    /// The chain rejected the transaction or it reverted on inclusion.
    #[error("transaction reverted: {reason}")]
    Reverted { reason: String },
    /// The arguments do not fit the target signature.
    #[error("cannot encode arguments: {reason}")]
    Encoding { reason: String },
    /// The contract artifact is missing or unusable.
    #[error("contract artifact unavailable: {reason}")]
    Artifact { reason: String },
}

impl ExecutionError {
    pub fn kind(&self) -> &'static str {
        self.into()
    }
}

/// Errors that stop a deployment before anything is submitted.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PlanError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Arithmetic(#[from] ArithmeticError),
}

impl PlanError {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Config(err) => err.kind(),
            Self::Arithmetic(err) => err.kind(),
        }
    }
}

/// Errors raised by the post-deployment operational actions.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum OperationError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("{step} on {target} failed: {source}")]
    Execution {
        step: &'static str,
        target: ChainAddress,
        #[source]
        source: ExecutionError,
    },
}

impl OperationError {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Config(err) => err.kind(),
            Self::Execution { source, .. } => source.kind(),
        }
    }
}
