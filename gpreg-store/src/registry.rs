//! The registry store and its query API.

use crate::error::StoreResult;
use crate::info::HostInfo;
use crate::schema::{init_schema, load_index};
use crate::writer::HiveWriter;
use gpreg_types::{Principal, RegistryKey, ResolvedEntry, ResolvedSnapshot, Sid, normalize_path};
use rusqlite::Connection;
use std::collections::BTreeMap;
use std::path::Path;
use tracing::{debug, info};

/// Committed in-memory view of the tables.
#[derive(Debug, Default)]
pub(crate) struct Index {
    pub(crate) machine: ResolvedSnapshot,
    pub(crate) users: BTreeMap<Sid, ResolvedSnapshot>,
    pub(crate) info: HostInfo,
}

impl Index {
    pub(crate) fn hive(&self, principal: &Principal) -> Option<&ResolvedSnapshot> {
        match principal {
            Principal::Machine => Some(&self.machine),
            Principal::User(sid) => self.users.get(sid),
        }
    }
}

/// Persistent store for resolved hives.
///
/// Single writer: every mutation takes `&mut self`. Readers borrow `&self`
/// and only ever see committed state.
pub struct RegistryStore {
    conn: Connection,
    index: Index,
}

impl RegistryStore {
    /// Opens (or creates) a store at the given path and loads its index.
    pub fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        let path = path.as_ref();
        let conn = Connection::open(path)?;
        let store = Self::from_connection(conn)?;
        info!(
            "Opened registry store {} ({} machine entries, {} user hives)",
            path.display(),
            store.index.machine.len(),
            store.index.users.len()
        );
        Ok(store)
    }

    /// Opens an in-memory store (for testing).
    pub fn open_in_memory() -> StoreResult<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> StoreResult<Self> {
        init_schema(&conn)?;
        let index = load_index(&conn)?;
        Ok(Self { conn, index })
    }

    // ── Writes ───────────────────────────────────────────────────

    /// Starts a transaction on one principal's hive.
    pub fn begin(&mut self, principal: Principal) -> StoreResult<HiveWriter<'_>> {
        let tx = self.conn.transaction()?;
        Ok(HiveWriter::new(tx, &mut self.index, principal))
    }

    /// Deletes all machine-scope entries.
    pub fn wipe_machine(&mut self) -> StoreResult<()> {
        let mut writer = self.begin(Principal::Machine)?;
        writer.wipe()?;
        writer.commit()
    }

    /// Deletes all entries of one user.
    pub fn wipe_user(&mut self, sid: &Sid) -> StoreResult<()> {
        let mut writer = self.begin(Principal::User(sid.clone()))?;
        writer.wipe()?;
        writer.commit()
    }

    /// Inserts or overwrites one entry by natural key.
    pub fn upsert(&mut self, principal: &Principal, entry: &ResolvedEntry) -> StoreResult<()> {
        let mut writer = self.begin(principal.clone())?;
        writer.upsert(entry)?;
        writer.commit()
    }

    /// Atomically replaces a hive with a snapshot.
    ///
    /// Either the whole new snapshot is committed or the previous one is
    /// left untouched.
    pub fn replace_snapshot(
        &mut self,
        principal: &Principal,
        snapshot: &ResolvedSnapshot,
    ) -> StoreResult<()> {
        let mut writer = self.begin(principal.clone())?;
        writer.wipe()?;
        for entry in snapshot.iter() {
            writer.upsert(entry)?;
        }
        writer.commit()?;
        debug!("Replaced {} hive with {} entries", principal, snapshot.len());
        Ok(())
    }

    // ── Queries ──────────────────────────────────────────────────

    /// Looks up one value. Key path and value name match case-insensitively.
    pub fn get_entry(
        &self,
        principal: &Principal,
        key: &str,
        value_name: &str,
    ) -> Option<&ResolvedEntry> {
        let key = RegistryKey::new(key).ok()?;
        self.index.hive(principal)?.get(&key, value_name)
    }

    /// Returns entries whose key path starts with `prefix`, ordered by key
    /// path then value name. An empty prefix returns the whole hive.
    pub fn filter_entries(&self, principal: &Principal, prefix: &str) -> Vec<&ResolvedEntry> {
        self.index
            .hive(principal)
            .map(|hive| hive.filter_prefix(prefix).collect())
            .unwrap_or_default()
    }

    /// Returns the values directly under exactly one key path.
    pub fn filter_exact(&self, principal: &Principal, key: &str) -> Vec<&ResolvedEntry> {
        let folded = normalize_path(key).to_lowercase();
        self.filter_entries(principal, key)
            .into_iter()
            .filter(|entry| entry.key.folded() == folded)
            .collect()
    }

    /// Returns a copy of a principal's committed hive.
    pub fn snapshot(&self, principal: &Principal) -> ResolvedSnapshot {
        self.index.hive(principal).cloned().unwrap_or_default()
    }

    /// SIDs that currently have a non-empty hive.
    pub fn users(&self) -> impl Iterator<Item = &Sid> {
        self.index.users.keys()
    }

    // ── Host metadata ────────────────────────────────────────────

    /// Returns all host metadata.
    pub fn host_info(&self) -> &HostInfo {
        &self.index.info
    }

    pub fn machine_sid(&self) -> Option<&Sid> {
        self.index.info.machine_sid.as_ref()
    }

    pub fn domain(&self) -> Option<&str> {
        self.index.info.domain.as_deref()
    }

    pub fn cache_dir(&self) -> Option<&Path> {
        self.index.info.cache_dir.as_deref()
    }
}
