//! Transactional writes to one hive.

use crate::error::StoreResult;
use crate::info::HostInfo;
use crate::registry::Index;
use crate::schema::{delete_machine, delete_user, insert_machine, insert_user, write_info};
use gpreg_types::{Principal, ResolvedEntry, ResolvedSnapshot};
use rusqlite::Transaction;
use tracing::debug;

/// Pending changes to one principal's hive.
///
/// Changes are written into an open SQLite transaction and mirrored into a
/// staged copy of the hive. [`HiveWriter::commit`] makes both visible;
/// dropping the writer discards both and the committed hive stays as it was.
pub struct HiveWriter<'a> {
    tx: Transaction<'a>,
    index: &'a mut Index,
    principal: Principal,
    staged: ResolvedSnapshot,
    info: Option<HostInfo>,
}

impl<'a> HiveWriter<'a> {
    pub(crate) fn new(tx: Transaction<'a>, index: &'a mut Index, principal: Principal) -> Self {
        let staged = index.hive(&principal).cloned().unwrap_or_default();
        Self {
            tx,
            index,
            principal,
            staged,
            info: None,
        }
    }

    /// The principal this writer targets.
    pub fn principal(&self) -> &Principal {
        &self.principal
    }

    /// Removes every entry of the hive.
    pub fn wipe(&mut self) -> StoreResult<()> {
        let removed = match &self.principal {
            Principal::Machine => delete_machine(&self.tx)?,
            Principal::User(sid) => delete_user(&self.tx, sid)?,
        };
        self.staged = ResolvedSnapshot::new();
        debug!("Wiped {} rows from {} hive", removed, self.principal);
        Ok(())
    }

    /// Inserts or overwrites one entry. Writing the same natural key twice
    /// keeps the last write.
    pub fn upsert(&mut self, entry: &ResolvedEntry) -> StoreResult<()> {
        match &self.principal {
            Principal::Machine => insert_machine(&self.tx, entry)?,
            Principal::User(sid) => insert_user(&self.tx, sid, entry)?,
        }
        self.staged.insert(entry.clone());
        Ok(())
    }

    /// Replaces the host metadata as part of this transaction.
    pub fn set_host_info(&mut self, info: &HostInfo) -> StoreResult<()> {
        write_info(&self.tx, info)?;
        self.info = Some(info.clone());
        Ok(())
    }

    /// Number of entries the hive will hold after commit.
    pub fn staged_len(&self) -> usize {
        self.staged.len()
    }

    /// Commits the transaction, then publishes the staged hive.
    pub fn commit(self) -> StoreResult<()> {
        let Self {
            tx,
            index,
            principal,
            staged,
            info,
        } = self;

        tx.commit()?;

        match principal {
            Principal::Machine => index.machine = staged,
            Principal::User(sid) if staged.is_empty() => {
                index.users.remove(&sid);
            }
            Principal::User(sid) => {
                index.users.insert(sid, staged);
            }
        }
        if let Some(info) = info {
            index.info = info;
        }
        Ok(())
    }
}
