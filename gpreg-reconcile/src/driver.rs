//! Reconciliation driver.
//!
//! One run walks the machine hive and then each requested user, strictly one
//! principal at a time: fetch → normalize and merge → persist. The store is
//! only touched once a principal's new snapshot is fully resolved, and each
//! hive is rewritten in a single transaction.

use crate::error::ReconcileError;
use crate::report::{ReconcileReport, ScopeOutcome, ScopeReport};
use crate::source::PolicySource;
use chrono::Utc;
use gpreg_merge::{normalize_gpo_scope, resolve};
use gpreg_store::{HostInfo, RegistryStore, StoreResult};
use gpreg_types::{GpoRecord, Principal, ResolvedSnapshot, Sid};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Configuration for the reconciliation driver.
#[derive(Debug, Clone)]
pub struct ReconcileConfig {
    /// Upper bound for one `PolicySource::fetch` call.
    pub fetch_timeout: Duration,
    /// Host metadata persisted alongside the machine hive.
    pub host: HostInfo,
}

impl Default for ReconcileConfig {
    fn default() -> Self {
        Self {
            fetch_timeout: Duration::from_secs(30),
            host: HostInfo::default(),
        }
    }
}

/// Driver lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriverState {
    /// No snapshot has been produced yet.
    Idle,
    FetchingPolicies,
    Merging,
    Persisting,
    /// At least one snapshot is committed and readable.
    Ready,
}

/// Orchestrates fetch, merge and persist for every principal.
pub struct Reconciler {
    store: RegistryStore,
    source: Arc<dyn PolicySource>,
    config: ReconcileConfig,
    state: DriverState,
}

impl Reconciler {
    /// Creates a driver over an opened store.
    ///
    /// A store that already holds a machine hive or user hives starts
    /// `Ready`: its snapshot is what appliers read until a run replaces it.
    pub fn new(store: RegistryStore, source: Arc<dyn PolicySource>, config: ReconcileConfig) -> Self {
        let has_snapshot = !store.filter_entries(&Principal::Machine, "").is_empty()
            || store.users().next().is_some()
            || store.host_info().last_update.is_some();
        Self {
            store,
            source,
            config,
            state: if has_snapshot {
                DriverState::Ready
            } else {
                DriverState::Idle
            },
        }
    }

    /// Returns the current state.
    pub fn state(&self) -> DriverState {
        self.state
    }

    /// Read-only access to the store for appliers.
    pub fn store(&self) -> &RegistryStore {
        &self.store
    }

    /// Returns the configuration.
    pub fn config(&self) -> &ReconcileConfig {
        &self.config
    }

    /// Consumes the driver, returning the store.
    pub fn into_store(self) -> RegistryStore {
        self.store
    }

    /// Runs one reconciliation for the machine and the given users.
    ///
    /// Never fails as a whole: each principal's outcome is in the report.
    pub async fn reconcile(&mut self, users: &[Sid]) -> ReconcileReport {
        let resting = self.state;
        info!("Starting reconciliation for machine and {} user(s)", users.len());

        let machine = self.reconcile_principal(Principal::Machine).await;

        let mut user_reports = Vec::with_capacity(users.len());
        for sid in users {
            user_reports.push(self.reconcile_principal(Principal::User(sid.clone())).await);
        }

        let report = ReconcileReport {
            machine,
            users: user_reports,
        };

        let next = if report.scopes().any(ScopeReport::is_applied) {
            DriverState::Ready
        } else {
            resting
        };
        self.transition(next);

        if report.is_degraded() {
            warn!("Reconciliation finished degraded; stale snapshots kept where the source was unavailable");
        } else {
            info!("Reconciliation finished");
        }
        report
    }

    async fn reconcile_principal(&mut self, principal: Principal) -> ScopeReport {
        let resting = self.state;

        self.transition(DriverState::FetchingPolicies);
        let records = match self.fetch(&principal).await {
            Ok(records) => records,
            Err(error) => {
                warn!("Keeping previous {} snapshot (degraded): {}", principal, error);
                self.transition(resting);
                return ScopeReport::new(principal, ScopeOutcome::Kept(error));
            }
        };

        self.transition(DriverState::Merging);
        let (snapshot, skipped) = merge_records(&records, &principal);

        self.transition(DriverState::Persisting);
        let outcome = match self.persist(&principal, &snapshot) {
            Ok(()) => {
                info!("Applied {} entries to {} hive", snapshot.len(), principal);
                ScopeOutcome::Applied {
                    entries: snapshot.len(),
                }
            }
            Err(source) => {
                warn!("Failed to persist {}: {}; previous snapshot kept", principal, source);
                ScopeOutcome::Failed(ReconcileError::StoreIo {
                    principal: principal.clone(),
                    source,
                })
            }
        };
        self.transition(resting);

        let mut report = ScopeReport::new(principal, outcome);
        report.skipped = skipped;
        report
    }

    async fn fetch(&self, principal: &Principal) -> Result<Vec<GpoRecord>, ReconcileError> {
        let unavailable = |reason: String| ReconcileError::SourceUnavailable {
            principal: principal.clone(),
            reason,
        };

        match tokio::time::timeout(self.config.fetch_timeout, self.source.fetch(principal)).await {
            Ok(Ok(records)) => {
                debug!("Fetched {} GPO(s) for {}", records.len(), principal);
                Ok(records)
            }
            Ok(Err(e)) => Err(unavailable(e.to_string())),
            Err(_) => Err(unavailable(format!(
                "fetch timed out after {:?}",
                self.config.fetch_timeout
            ))),
        }
    }

    fn persist(&mut self, principal: &Principal, snapshot: &ResolvedSnapshot) -> StoreResult<()> {
        let host = (principal == &Principal::Machine).then(|| HostInfo {
            last_update: Some(Utc::now()),
            ..self.config.host.clone()
        });

        let mut writer = self.store.begin(principal.clone())?;
        writer.wipe()?;
        for entry in snapshot.iter() {
            writer.upsert(entry)?;
        }
        if let Some(host) = &host {
            writer.set_host_info(host)?;
        }
        writer.commit()
    }

    fn transition(&mut self, next: DriverState) {
        if self.state != next {
            debug!("Driver state {:?} -> {:?}", self.state, next);
            self.state = next;
        }
    }
}

/// Normalizes the records for the principal's scope and resolves them.
fn merge_records(
    records: &[GpoRecord],
    principal: &Principal,
) -> (ResolvedSnapshot, Vec<ReconcileError>) {
    let scope = principal.scope();
    let mut skipped = Vec::new();
    let gpos: Vec<_> = records
        .iter()
        .map(|record| {
            let normalized = normalize_gpo_scope(record, scope);
            skipped.extend(normalized.skipped.into_iter().map(ReconcileError::from));
            normalized.gpo
        })
        .collect();

    (resolve(&gpos, scope), skipped)
}
