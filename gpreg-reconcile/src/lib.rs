//! Reconciliation driver for gpreg.
//!
//! Brings the registry store in line with the GPOs a [`PolicySource`] reports
//! for the machine and for each logged-in user.
//!
//! # Process
//!
//! 1. **Fetch**: ask the source for the principal's GPO list, bounded by
//!    [`ReconcileConfig::fetch_timeout`]
//! 2. **Merge**: normalize each GPO's raw entries for the principal's scope
//!    and resolve them by precedence
//! 3. **Persist**: wipe and rewrite the principal's hive in one transaction
//!
//! A principal whose source is unavailable keeps its previous snapshot and
//! the run is reported as degraded. A principal whose persist fails keeps its
//! previous snapshot too; other principals are unaffected either way.
//!
//! # Example
//!
//! ```no_run
//! use gpreg_reconcile::{PolicySource, ReconcileConfig, Reconciler, SourceError};
//! use gpreg_store::RegistryStore;
//! use gpreg_types::{GpoRecord, Principal};
//! use std::sync::Arc;
//!
//! struct Empty;
//!
//! #[async_trait::async_trait]
//! impl PolicySource for Empty {
//!     async fn fetch(&self, _: &Principal) -> Result<Vec<GpoRecord>, SourceError> {
//!         Ok(Vec::new())
//!     }
//! }
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let store = RegistryStore::open("/var/cache/gpreg/registry.sqlite")?;
//! let mut reconciler = Reconciler::new(store, Arc::new(Empty), ReconcileConfig::default());
//! let report = reconciler.reconcile(&[]).await;
//! assert!(!report.is_degraded());
//! # Ok(())
//! # }
//! ```

mod driver;
mod error;
mod report;
mod source;

pub use driver::{DriverState, ReconcileConfig, Reconciler};
pub use error::{ReconcileError, ReconcileResult};
pub use report::{ReconcileReport, ScopeOutcome, ScopeReport};
pub use source::{PolicySource, SourceError};
