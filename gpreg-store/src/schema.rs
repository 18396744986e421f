//! Table layout and row codecs.

use crate::error::{StoreError, StoreResult};
use crate::info::HostInfo;
use crate::registry::Index;
use gpreg_types::{DataType, RegistryKey, RegistryValue, ResolvedEntry, Sid};
use rusqlite::{Connection, Row, params};
use tracing::warn;

pub(crate) const HKLM: &str = "hklm";
pub(crate) const HKCU: &str = "hkcu";

pub(crate) fn init_schema(conn: &Connection) -> StoreResult<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS hklm (
            key_fold TEXT NOT NULL,
            value_fold TEXT NOT NULL,
            hive_key TEXT NOT NULL,
            value_name TEXT NOT NULL,
            value_type INTEGER NOT NULL,
            data TEXT NOT NULL,
            policy_name TEXT NOT NULL,
            PRIMARY KEY (key_fold, value_fold)
        );

        CREATE TABLE IF NOT EXISTS hkcu (
            sid TEXT NOT NULL,
            key_fold TEXT NOT NULL,
            value_fold TEXT NOT NULL,
            hive_key TEXT NOT NULL,
            value_name TEXT NOT NULL,
            value_type INTEGER NOT NULL,
            data TEXT NOT NULL,
            policy_name TEXT NOT NULL,
            PRIMARY KEY (sid, key_fold, value_fold)
        );

        CREATE TABLE IF NOT EXISTS info (
            name TEXT PRIMARY KEY,
            value TEXT NOT NULL
        );
        ",
    )?;
    Ok(())
}

/// An entry as stored, before decoding.
struct StoredRow {
    hive_key: String,
    value_name: String,
    value_type: u32,
    data: String,
    policy_name: String,
}

impl StoredRow {
    fn read(row: &Row<'_>, offset: usize) -> rusqlite::Result<Self> {
        Ok(Self {
            hive_key: row.get(offset)?,
            value_name: row.get(offset + 1)?,
            value_type: row.get(offset + 2)?,
            data: row.get(offset + 3)?,
            policy_name: row.get(offset + 4)?,
        })
    }

    fn decode(self, table: &'static str) -> StoreResult<ResolvedEntry> {
        let corrupt = |detail: String| StoreError::Corrupt { table, detail };
        let at = |e: gpreg_types::Error| format!("{}\\{}: {e}", self.hive_key, self.value_name);
        let key = RegistryKey::new(&self.hive_key).map_err(|e| corrupt(at(e)))?;
        let data_type = DataType::from_code(self.value_type).map_err(|e| corrupt(at(e)))?;
        let value = RegistryValue::from_stored(data_type, &self.data)
            .map_err(|e| corrupt(at(e)))?;
        Ok(ResolvedEntry {
            key,
            value_name: self.value_name,
            value,
            origin_policy: self.policy_name,
        })
    }
}

/// Loads every persisted row into a fresh index.
///
/// A row that no longer decodes is logged and left out of its hive; every
/// other row and hive still loads. The next rewrite of that hive deletes it.
pub(crate) fn load_index(conn: &Connection) -> StoreResult<Index> {
    let mut index = Index::default();

    let mut stmt =
        conn.prepare("SELECT hive_key, value_name, value_type, data, policy_name FROM hklm")?;
    let rows = stmt.query_map([], |row| StoredRow::read(row, 0))?;
    for row in rows {
        match row?.decode(HKLM) {
            Ok(entry) => {
                index.machine.insert(entry);
            }
            Err(e) => warn!("Skipping unreadable machine row: {}", e),
        }
    }

    let mut stmt = conn.prepare(
        "SELECT sid, hive_key, value_name, value_type, data, policy_name FROM hkcu",
    )?;
    let rows = stmt.query_map([], |row| {
        let sid: String = row.get(0)?;
        Ok((sid, StoredRow::read(row, 1)?))
    })?;
    for row in rows {
        let (raw_sid, stored) = row?;
        let sid = match Sid::parse(&raw_sid) {
            Ok(sid) => sid,
            Err(e) => {
                warn!("Skipping {} row at {}: {}", HKCU, stored.hive_key, e);
                continue;
            }
        };
        match stored.decode(HKCU) {
            Ok(entry) => {
                index.users.entry(sid).or_default().insert(entry);
            }
            Err(e) => warn!("Skipping unreadable row of user {}: {}", sid, e),
        }
    }

    let mut stmt = conn.prepare("SELECT name, value FROM info")?;
    let rows = stmt
        .query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)))?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    index.info = HostInfo::from_rows(rows);

    Ok(index)
}

pub(crate) fn insert_machine(conn: &Connection, entry: &ResolvedEntry) -> StoreResult<()> {
    let nk = entry.natural_key();
    conn.execute(
        "INSERT OR REPLACE INTO hklm
            (key_fold, value_fold, hive_key, value_name, value_type, data, policy_name)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            nk.key,
            nk.value_name,
            entry.key.as_str(),
            entry.value_name,
            entry.value.data_type().code(),
            entry.value.to_stored()?,
            entry.origin_policy,
        ],
    )?;
    Ok(())
}

pub(crate) fn insert_user(conn: &Connection, sid: &Sid, entry: &ResolvedEntry) -> StoreResult<()> {
    let nk = entry.natural_key();
    conn.execute(
        "INSERT OR REPLACE INTO hkcu
            (sid, key_fold, value_fold, hive_key, value_name, value_type, data, policy_name)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        params![
            sid.as_str(),
            nk.key,
            nk.value_name,
            entry.key.as_str(),
            entry.value_name,
            entry.value.data_type().code(),
            entry.value.to_stored()?,
            entry.origin_policy,
        ],
    )?;
    Ok(())
}

pub(crate) fn delete_machine(conn: &Connection) -> StoreResult<usize> {
    Ok(conn.execute("DELETE FROM hklm", [])?)
}

pub(crate) fn delete_user(conn: &Connection, sid: &Sid) -> StoreResult<usize> {
    Ok(conn.execute("DELETE FROM hkcu WHERE sid = ?1", params![sid.as_str()])?)
}

pub(crate) fn write_info(conn: &Connection, info: &HostInfo) -> StoreResult<()> {
    conn.execute("DELETE FROM info", [])?;
    for (name, value) in info.to_rows() {
        conn.execute(
            "INSERT INTO info (name, value) VALUES (?1, ?2)",
            params![name, value],
        )?;
    }
    Ok(())
}
