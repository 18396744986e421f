//! SQLite-backed registry store for gpreg.
//!
//! Holds the resolved snapshot of every hive: one machine hive (HKLM analog)
//! and one hive per user SID (HKCU analog), plus a little host metadata that
//! appliers read alongside the settings.
//!
//! # Architecture
//!
//! - Each hive is a table of rows keyed by `(key path, value name)`, folded
//!   to lower case so lookups follow registry case-insensitivity
//! - On open, every row is loaded into an in-memory ordered index; reads
//!   never touch SQLite
//! - Writes go through a [`HiveWriter`], which stages changes in one SQLite
//!   transaction and in a copy of the hive's index. Nothing becomes visible
//!   until `commit`; dropping the writer rolls both back
//! - A store is a plain value: no process-wide caches, one writer at a time
//!   enforced by `&mut self`

mod error;
mod info;
mod registry;
mod schema;
mod writer;

pub use error::{StoreError, StoreResult};
pub use info::HostInfo;
pub use registry::RegistryStore;
pub use writer::HiveWriter;
