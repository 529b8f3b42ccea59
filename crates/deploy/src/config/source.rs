//! Raw configuration values, collected from a TOML file and the environment.

use std::{collections::BTreeMap, path::Path};

use anyhow::{Context, Result};
use figment::{
    Figment,
    providers::{Env, Format, Toml},
};
use serde::Deserialize;

/// The default name for the deployment configuration file.
pub const CONFIG_FILENAME: &str = "Paias.toml";

/// Every key read from the environment. Keys are matched case-insensitively
/// and stored lowercase.
pub const KNOWN_KEYS: &[&str] = &[
    "admin_multisig",
    "token_name",
    "token_symbol",
    "base_token",
    "router",
    "pai",
    "amount_pai",
    "amount_base",
    "buyback",
    "amount",
    "burn",
    "contract",
    "args",
];

/// Scalar as read from the TOML file.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Scalar {
    Bool(bool),
    Unsigned(u64),
    Signed(i64),
    /// Rejected on load: the literal's digits are lost once parsed.
    Float(f64),
    Text(String),
    /// Arrays are kept as JSON text (constructor `args`).
    List(Vec<serde_json::Value>),
}

impl Scalar {
    fn into_text(self, name: &str) -> Result<String> {
        Ok(match self {
            Scalar::Bool(value) => value.to_string(),
            Scalar::Unsigned(value) => value.to_string(),
            Scalar::Signed(value) => value.to_string(),
            Scalar::Float(value) => anyhow::bail!(
                "`{name}` = {value} is a float literal; quote decimal values, e.g. {name} = \"{value}\""
            ),
            Scalar::Text(value) => value,
            Scalar::List(items) => serde_json::Value::Array(items).to_string(),
        })
    }
}

/// Untyped configuration: name to raw string, passed explicitly to the resolver.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawConfig {
    values: BTreeMap<String, String>,
}

impl RawConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert, mostly for tests and programmatic callers.
    pub fn with(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert(name, value);
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.values
            .insert(name.into().to_ascii_lowercase(), value.into());
    }

    /// The trimmed value for `name`; blank values count as absent.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.values
            .get(name)
            .map(|value| value.trim())
            .filter(|value| !value.is_empty())
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Load the TOML file (if present) overlaid with known environment variables.
    ///
    /// Environment values are taken verbatim, never type-guessed.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        Self::load_from(path, Env::raw().only(KNOWN_KEYS))
    }

    fn load_from(path: Option<&Path>, env: Env) -> Result<Self> {
        let path = path.unwrap_or(Path::new(CONFIG_FILENAME));
        let mut config = Self::from_figment(&Figment::from(Toml::file(path)))
            .with_context(|| format!("Failed to load configuration (file: {})", path.display()))?;
        for (name, value) in env.iter() {
            config.insert(name.as_str(), value);
        }
        tracing::debug!(keys = config.len(), "Configuration loaded");
        Ok(config)
    }

    fn from_figment(figment: &Figment) -> Result<Self> {
        let values: BTreeMap<String, Scalar> = figment
            .extract()
            .context("Configuration values must be scalars")?;

        values
            .into_iter()
            .try_fold(Self::new(), |config, (name, value)| {
                let text = value.into_text(&name)?;
                Ok(config.with(name, text))
            })
    }
}
