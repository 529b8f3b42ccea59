//! The record of what a deployment run has put on chain.

use serde::{Deserialize, Serialize};

use crate::address::ChainAddress;

/// One deployed contract.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestEntry {
    pub stage: String,
    pub address: ChainAddress,
}

/// Stage name to deployed address, in the order the stages succeeded.
///
/// Entries are only ever appended. Contracts already on chain cannot be
/// undeployed, so there is no removal.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DeploymentManifest {
    entries: Vec<ManifestEntry>,
}

impl DeploymentManifest {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append the address produced by `stage`.
    ///
    /// # Panics
    ///
    /// If `stage` is already recorded.
    pub fn record(&mut self, stage: impl Into<String>, address: ChainAddress) {
        let stage = stage.into();
        assert!(
            !self.contains(&stage),
            "stage `{stage}` is already recorded in the manifest"
        );
        self.entries.push(ManifestEntry { stage, address });
    }

    pub fn address_of(&self, stage: &str) -> Option<ChainAddress> {
        self.entries
            .iter()
            .find(|entry| entry.stage == stage)
            .map(|entry| entry.address)
    }

    pub fn contains(&self, stage: &str) -> bool {
        self.address_of(stage).is_some()
    }

    pub fn entries(&self) -> &[ManifestEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
