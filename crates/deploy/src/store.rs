//! On-disk persistence of the manifest and the parameters it was deployed with.
//!
//! Layout: `<root>/<chain-id>/manifest.json` and `<root>/<chain-id>/params.toml`.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::{manifest::DeploymentManifest, params::DeployParams};

pub const MANIFEST_FILENAME: &str = "manifest.json";
pub const PARAMS_FILENAME: &str = "params.toml";

/// Contents of `manifest.json`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestFile {
    pub chain_id: u64,
    /// RFC 3339 timestamp of the last write.
    pub updated_at: String,
    pub contracts: DeploymentManifest,
}

/// Reads and writes the manifest of one chain.
#[derive(Debug, Clone)]
pub struct ManifestStore {
    dir: PathBuf,
    chain_id: u64,
}

impl ManifestStore {
    pub fn new(root: impl AsRef<Path>, chain_id: u64) -> Self {
        Self {
            dir: root.as_ref().join(chain_id.to_string()),
            chain_id,
        }
    }

    pub fn manifest_path(&self) -> PathBuf {
        self.dir.join(MANIFEST_FILENAME)
    }

    pub fn params_path(&self) -> PathBuf {
        self.dir.join(PARAMS_FILENAME)
    }

    pub fn exists(&self) -> bool {
        self.manifest_path().exists()
    }

    /// Overwrite `manifest.json` with the current manifest.
    pub fn save(&self, manifest: &DeploymentManifest) -> Result<PathBuf> {
        let file = ManifestFile {
            chain_id: self.chain_id,
            updated_at: chrono::Utc::now().to_rfc3339(),
            contracts: manifest.clone(),
        };
        let content =
            serde_json::to_string_pretty(&file).context("Failed to serialize manifest")?;
        self.write(self.manifest_path(), content)
    }

    /// Load the stored manifest, or `None` if nothing was deployed on this chain yet.
    pub fn load(&self) -> Result<Option<DeploymentManifest>> {
        let path = self.manifest_path();
        if !path.exists() {
            return Ok(None);
        }

        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let file: ManifestFile = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse {}", path.display()))?;

        if file.chain_id != self.chain_id {
            anyhow::bail!(
                "Manifest {} belongs to chain {}, expected {}",
                path.display(),
                file.chain_id,
                self.chain_id
            );
        }

        tracing::info!(path = %path.display(), contracts = file.contracts.len(), "Manifest loaded");
        Ok(Some(file.contracts))
    }

    /// Save the resolved deployment parameters as TOML.
    pub fn save_params(&self, params: &DeployParams) -> Result<PathBuf> {
        let content = toml::to_string_pretty(params)
            .context("Failed to serialize deployment parameters to TOML")?;
        self.write(self.params_path(), content)
    }

    fn write(&self, path: PathBuf, content: String) -> Result<PathBuf> {
        std::fs::create_dir_all(&self.dir)
            .with_context(|| format!("Failed to create {}", self.dir.display()))?;
        std::fs::write(&path, content)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        tracing::debug!(path = %path.display(), "Saved");
        Ok(path)
    }
}
