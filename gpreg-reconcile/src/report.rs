//! Per-run reconciliation reports.

use crate::error::ReconcileError;
use gpreg_types::Principal;

/// What happened to one principal's hive during a run.
#[derive(Debug)]
pub enum ScopeOutcome {
    /// The hive was rewritten with `entries` resolved values.
    Applied { entries: usize },
    /// The source was unavailable; the previous snapshot was kept untouched.
    Kept(ReconcileError),
    /// Persisting failed; the previous snapshot was kept and the error is
    /// surfaced here.
    Failed(ReconcileError),
}

/// Result for one principal.
#[derive(Debug)]
pub struct ScopeReport {
    pub principal: Principal,
    pub outcome: ScopeOutcome,
    /// Raw entries that were malformed and left out.
    pub skipped: Vec<ReconcileError>,
}

impl ScopeReport {
    pub(crate) fn new(principal: Principal, outcome: ScopeOutcome) -> Self {
        Self {
            principal,
            outcome,
            skipped: Vec::new(),
        }
    }

    /// Returns true if the hive was rewritten.
    pub fn is_applied(&self) -> bool {
        matches!(self.outcome, ScopeOutcome::Applied { .. })
    }
}

/// Result of one reconciliation run.
#[derive(Debug)]
pub struct ReconcileReport {
    pub machine: ScopeReport,
    pub users: Vec<ScopeReport>,
}

impl ReconcileReport {
    /// All scope reports, machine first.
    pub fn scopes(&self) -> impl Iterator<Item = &ScopeReport> {
        std::iter::once(&self.machine).chain(self.users.iter())
    }

    /// Returns the report for one principal.
    pub fn scope(&self, principal: &Principal) -> Option<&ScopeReport> {
        self.scopes().find(|s| &s.principal == principal)
    }

    /// True if any principal kept a stale snapshot because its source was
    /// unavailable.
    pub fn is_degraded(&self) -> bool {
        self.scopes()
            .any(|s| matches!(s.outcome, ScopeOutcome::Kept(_)))
    }

    /// True if any principal failed to persist.
    pub fn has_failures(&self) -> bool {
        self.scopes()
            .any(|s| matches!(s.outcome, ScopeOutcome::Failed(_)))
    }

    /// Every error recorded in the run, including skipped entries.
    pub fn errors(&self) -> impl Iterator<Item = &ReconcileError> {
        self.scopes().flat_map(|s| {
            let outcome = match &s.outcome {
                ScopeOutcome::Kept(e) | ScopeOutcome::Failed(e) => Some(e),
                ScopeOutcome::Applied { .. } => None,
            };
            outcome.into_iter().chain(s.skipped.iter())
        })
    }
}
