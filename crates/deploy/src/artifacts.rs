//! Hardhat compilation artifacts.
//!
//! Layout under the artifacts root:
//! - `contracts/<Name>.sol/<Name>.json`: ABI and creation bytecode
//! - `contracts/<Name>.sol/<Name>.dbg.json`: pointer to the build-info file
//! - `build-info/<hash>.json`: compiler version and standard-JSON input

use std::path::{Path, PathBuf};

use alloy_core::{
    json_abi::{JsonAbi, Param},
    primitives::Bytes,
};
use anyhow::{Context, Result};
use serde::{Deserialize, de::DeserializeOwned};
use serde_json::Value;

/// The default artifacts directory of a Hardhat project.
pub const DEFAULT_ARTIFACTS_DIR: &str = "artifacts";

/// A compiled contract.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Artifact {
    pub contract_name: String,
    /// Source path relative to the project root, e.g. `contracts/Coin.sol`.
    pub source_name: String,
    pub abi: JsonAbi,
    /// Creation bytecode.
    pub bytecode: Bytes,
}

impl Artifact {
    /// Fully qualified name as block explorers expect it, e.g. `contracts/Coin.sol:Coin`.
    pub fn qualified_name(&self) -> String {
        format!("{}:{}", self.source_name, self.contract_name)
    }

    pub fn constructor_inputs(&self) -> &[Param] {
        self.abi
            .constructor
            .as_ref()
            .map(|constructor| constructor.inputs.as_slice())
            .unwrap_or_default()
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DebugFile {
    build_info: PathBuf,
}

/// Compiler input and version for a compilation job.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildInfo {
    /// Full compiler version, e.g. `0.8.20+commit.a1b79de6`.
    pub solc_long_version: String,
    /// Standard-JSON compiler input.
    pub input: Value,
}

/// Looks up artifacts by contract name.
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    root: PathBuf,
}

impl ArtifactStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn contract_dir(&self, name: &str) -> PathBuf {
        self.root.join("contracts").join(format!("{name}.sol"))
    }

    /// Load the artifact for `name`. Abstract contracts and interfaces are rejected.
    pub fn load(&self, name: &str) -> Result<Artifact> {
        let path = self.contract_dir(name).join(format!("{name}.json"));
        let artifact: Artifact = read_json(&path)?;
        if artifact.bytecode.is_empty() {
            anyhow::bail!("Artifact {} has no creation bytecode", path.display());
        }
        Ok(artifact)
    }

    /// Load the build info the artifact for `name` was compiled in.
    pub fn load_build_info(&self, name: &str) -> Result<BuildInfo> {
        let dir = self.contract_dir(name);
        let debug: DebugFile = read_json(&dir.join(format!("{name}.dbg.json")))?;
        read_json(&dir.join(debug.build_info))
    }
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&content).with_context(|| format!("Failed to parse {}", path.display()))
}
