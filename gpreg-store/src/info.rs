//! Host metadata kept next to the resolved hives.

use chrono::{DateTime, Utc};
use gpreg_types::Sid;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::warn;

/// Process-wide facts appliers need alongside resolved settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostInfo {
    pub machine_sid: Option<Sid>,
    pub machine_name: Option<String>,
    pub domain: Option<String>,
    pub cache_dir: Option<PathBuf>,
    /// When the machine hive was last rewritten.
    pub last_update: Option<DateTime<Utc>>,
}

pub(crate) const MACHINE_SID: &str = "machine_sid";
pub(crate) const MACHINE_NAME: &str = "machine_name";
pub(crate) const DOMAIN: &str = "domain";
pub(crate) const CACHE_DIR: &str = "cache_dir";
pub(crate) const LAST_UPDATE: &str = "last_update";

impl HostInfo {
    /// Flattens into `(name, value)` rows for the `info` table.
    pub(crate) fn to_rows(&self) -> Vec<(&'static str, String)> {
        let mut rows = Vec::new();
        if let Some(sid) = &self.machine_sid {
            rows.push((MACHINE_SID, sid.to_string()));
        }
        if let Some(name) = &self.machine_name {
            rows.push((MACHINE_NAME, name.clone()));
        }
        if let Some(domain) = &self.domain {
            rows.push((DOMAIN, domain.clone()));
        }
        if let Some(dir) = &self.cache_dir {
            rows.push((CACHE_DIR, dir.to_string_lossy().into_owned()));
        }
        if let Some(ts) = &self.last_update {
            rows.push((LAST_UPDATE, ts.to_rfc3339()));
        }
        rows
    }

    /// Rebuilds from `info` rows. Unknown names are ignored; unreadable
    /// values are logged and left unset.
    pub(crate) fn from_rows(rows: impl IntoIterator<Item = (String, String)>) -> Self {
        let mut info = Self::default();
        for (name, value) in rows {
            match name.as_str() {
                MACHINE_SID => match Sid::parse(&value) {
                    Ok(sid) => info.machine_sid = Some(sid),
                    Err(e) => warn!("Ignoring stored {}: {}", MACHINE_SID, e),
                },
                MACHINE_NAME => info.machine_name = Some(value),
                DOMAIN => info.domain = Some(value),
                CACHE_DIR => info.cache_dir = Some(PathBuf::from(value)),
                LAST_UPDATE => match DateTime::parse_from_rfc3339(&value) {
                    Ok(ts) => info.last_update = Some(ts.with_timezone(&Utc)),
                    Err(e) => warn!("Ignoring stored {} {:?}: {}", LAST_UPDATE, value, e),
                },
                _ => {}
            }
        }
        info
    }
}
