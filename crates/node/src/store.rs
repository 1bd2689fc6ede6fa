//! File-backed exchange of provider batches with the request discovery component.

use anyhow::{Context, Result};
use oracle_core::{
    cycle::CycleReport,
    types::{ProviderBatch, RequestKind},
};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Pending provider batches stored as a JSON array.
pub struct RequestStore {
    path: PathBuf,
}

impl RequestStore {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads the current batches. A missing file means there is no work.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load(&self) -> Result<Vec<ProviderBatch>> {
        if !self.path.exists() {
            debug!(path = %self.path.display(), "request file not found, nothing to process");
            return Ok(Vec::new());
        }
        let raw = std::fs::read(&self.path)
            .with_context(|| format!("failed to read {}", self.path.display()))?;
        serde_json::from_slice(&raw)
            .with_context(|| format!("failed to parse {}", self.path.display()))
    }

    /// Writes a cycle's batches back, with deferred requests returned to their provider.
    ///
    /// The file is replaced atomically.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written.
    pub fn save(&self, report: &CycleReport) -> Result<()> {
        let batches = merge_deferred(report);
        let json = serde_json::to_vec_pretty(&batches)?;

        let tmp = self.path.with_extension("json.tmp");
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
        std::fs::write(&tmp, json).with_context(|| format!("failed to write {}", tmp.display()))?;
        std::fs::rename(&tmp, &self.path)
            .with_context(|| format!("failed to replace {}", self.path.display()))?;
        Ok(())
    }
}

fn merge_deferred(report: &CycleReport) -> Vec<ProviderBatch> {
    let mut batches = report.batches.clone();
    for request in &report.deferred {
        let index = match batches.iter().position(|batch| {
            batch.chain_id == request.chain_id && batch.provider_name == request.provider_name
        }) {
            Some(index) => index,
            None => {
                batches.push(ProviderBatch::new(request.chain_id, request.provider_name.clone()));
                batches.len() - 1
            }
        };
        match request.kind {
            RequestKind::ApiCall => batches[index].api_calls.push(request.clone()),
            RequestKind::Withdrawal => batches[index].withdrawals.push(request.clone()),
        }
    }
    batches
}
