//! Error types for reconciliation.

use gpreg_merge::{EntryParseError, SkippedEntry};
use gpreg_store::StoreError;
use gpreg_types::{Principal, Scope};
use thiserror::Error;

/// Result type for reconciliation operations.
pub type ReconcileResult<T> = Result<T, ReconcileError>;

/// Errors raised while reconciling one principal.
///
/// None of these abort a whole run. Precedence conflicts are not errors;
/// the merge resolves them deterministically.
#[derive(Debug, Error)]
pub enum ReconcileError {
    /// The policy source could not be reached. The principal's previous
    /// snapshot is kept.
    #[error("policy source unavailable for {principal}: {reason}")]
    SourceUnavailable { principal: Principal, reason: String },

    /// One raw entry was malformed and skipped.
    #[error("skipped {scope} entry in GPO {gpo} at {key}\\{value_name}: {source}")]
    EntryParse {
        gpo: String,
        scope: Scope,
        key: String,
        value_name: String,
        source: EntryParseError,
    },

    /// Persisting the principal's snapshot failed; its previous snapshot is
    /// intact.
    #[error("failed to persist {principal}: {source}")]
    StoreIo {
        principal: Principal,
        source: StoreError,
    },
}

impl From<SkippedEntry> for ReconcileError {
    fn from(skipped: SkippedEntry) -> Self {
        Self::EntryParse {
            gpo: skipped.gpo,
            scope: skipped.scope,
            key: skipped.key,
            value_name: skipped.value_name,
            source: skipped.error,
        }
    }
}
