//! Shared pieces of the `gpreg` binary.
//!
//! The binary wires a [`DirectorySource`] into the reconciler. Policy is
//! laid out on disk as:
//!
//! ```text
//! <root>/machine.json        GPOs applying to the machine
//! <root>/users/<SID>.json    GPOs applying to one user
//! ```
//!
//! Each file is a JSON array of [`GpoRecord`]s. A missing file means no GPO
//! applies; a missing root means the source is unreachable.

use async_trait::async_trait;
use gpreg_reconcile::{PolicySource, ReconcileReport, ScopeOutcome, SourceError};
use gpreg_store::RegistryStore;
use gpreg_types::{GpoRecord, Principal};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Policy source reading GPO lists from JSON files.
#[derive(Debug, Clone)]
pub struct DirectorySource {
    root: PathBuf,
}

impl DirectorySource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// File holding the GPO list for a principal.
    pub fn path_for(&self, principal: &Principal) -> PathBuf {
        match principal {
            Principal::Machine => self.root.join("machine.json"),
            Principal::User(sid) => self.root.join("users").join(format!("{sid}.json")),
        }
    }
}

#[async_trait]
impl PolicySource for DirectorySource {
    async fn fetch(&self, principal: &Principal) -> Result<Vec<GpoRecord>, SourceError> {
        if !tokio::fs::try_exists(&self.root).await? {
            return Err(SourceError::Unreachable(format!(
                "policy directory {} does not exist",
                self.root.display()
            )));
        }

        let path = self.path_for(principal);
        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!("No policy file for {} at {}", principal, path.display());
                return Ok(Vec::new());
            }
            Err(e) => return Err(e.into()),
        };

        serde_json::from_slice(&bytes)
            .map_err(|e| SourceError::Invalid(format!("{}: {}", path.display(), e)))
    }
}

/// Renders a principal's entries under `prefix` as JSON lines.
pub fn entry_lines(
    store: &RegistryStore,
    principal: &Principal,
    prefix: &str,
) -> serde_json::Result<Vec<String>> {
    store
        .filter_entries(principal, prefix)
        .into_iter()
        .map(serde_json::to_string)
        .collect()
}

/// One human-readable line per principal.
pub fn summarize(report: &ReconcileReport) -> Vec<String> {
    report
        .scopes()
        .map(|scope| {
            let outcome = match &scope.outcome {
                ScopeOutcome::Applied { entries } => format!("applied {entries} entries"),
                ScopeOutcome::Kept(e) => format!("kept previous snapshot ({e})"),
                ScopeOutcome::Failed(e) => format!("FAILED ({e})"),
            };
            if scope.skipped.is_empty() {
                format!("{}: {}", scope.principal, outcome)
            } else {
                format!(
                    "{}: {}, {} malformed entries skipped",
                    scope.principal,
                    outcome,
                    scope.skipped.len()
                )
            }
        })
        .collect()
}
