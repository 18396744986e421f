//! Policy entries and resolved snapshots.

use crate::key::{NaturalKey, RegistryKey, normalize_path};
use crate::value::RegistryValue;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// What an entry does to the value it names.
///
/// Decided once when a raw record is normalized; downstream code never looks
/// at value-name prefixes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", content = "value", rename_all = "snake_case")]
pub enum EntryAction {
    /// Set or overwrite the value.
    Set(RegistryValue),
    /// Set the value only if nothing processed earlier has set it.
    SoftSet(RegistryValue),
    /// Remove the named value.
    Delete,
    /// Remove each listed value under the key.
    DeleteValues(Vec<String>),
    /// Remove every value directly under the key.
    DeleteAllValues,
}

impl EntryAction {
    /// Returns true for the tombstone variants.
    #[must_use]
    pub fn is_delete(&self) -> bool {
        matches!(
            self,
            Self::Delete | Self::DeleteValues(_) | Self::DeleteAllValues
        )
    }
}

/// One normalized setting contributed by a GPO.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyEntry {
    pub key: RegistryKey,
    /// Target value name. Empty for the key's default value and for
    /// key-wide actions.
    pub value_name: String,
    pub action: EntryAction,
    /// Name of the GPO this entry came from.
    pub origin_policy: String,
}

impl PolicyEntry {
    /// Creates a `Set` entry.
    pub fn set(
        key: RegistryKey,
        value_name: impl Into<String>,
        value: RegistryValue,
        origin_policy: impl Into<String>,
    ) -> Self {
        Self {
            key,
            value_name: value_name.into(),
            action: EntryAction::Set(value),
            origin_policy: origin_policy.into(),
        }
    }

    /// Creates a `Delete` tombstone for one value.
    pub fn delete(
        key: RegistryKey,
        value_name: impl Into<String>,
        origin_policy: impl Into<String>,
    ) -> Self {
        Self {
            key,
            value_name: value_name.into(),
            action: EntryAction::Delete,
            origin_policy: origin_policy.into(),
        }
    }

    /// Returns the natural key of the value this entry targets.
    #[must_use]
    pub fn natural_key(&self) -> NaturalKey {
        NaturalKey::new(&self.key, &self.value_name)
    }
}

/// A value that survived the merge; the unit the store persists.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedEntry {
    pub key: RegistryKey,
    pub value_name: String,
    pub value: RegistryValue,
    pub origin_policy: String,
}

impl ResolvedEntry {
    #[must_use]
    pub fn natural_key(&self) -> NaturalKey {
        NaturalKey::new(&self.key, &self.value_name)
    }
}

/// The resolved state of one hive, ordered by natural key.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolvedSnapshot {
    entries: BTreeMap<NaturalKey, ResolvedEntry>,
}

impl ResolvedSnapshot {
    /// Creates an empty snapshot.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or overwrites an entry, returning the one it replaced.
    pub fn insert(&mut self, entry: ResolvedEntry) -> Option<ResolvedEntry> {
        self.entries.insert(entry.natural_key(), entry)
    }

    /// Removes an entry by natural key.
    pub fn remove(&mut self, key: &NaturalKey) -> Option<ResolvedEntry> {
        self.entries.remove(key)
    }

    /// Removes every value directly under `key`. Returns how many were removed.
    pub fn remove_key_values(&mut self, key: &RegistryKey) -> usize {
        let folded = key.folded();
        let before = self.entries.len();
        self.entries.retain(|nk, _| nk.key != folded);
        before - self.entries.len()
    }

    /// Returns true if the natural key is present.
    #[must_use]
    pub fn contains(&self, key: &NaturalKey) -> bool {
        self.entries.contains_key(key)
    }

    /// Looks up a value by key path and value name.
    #[must_use]
    pub fn get(&self, key: &RegistryKey, value_name: &str) -> Option<&ResolvedEntry> {
        self.entries.get(&NaturalKey::new(key, value_name))
    }

    /// Iterates entries in natural-key order.
    pub fn iter(&self) -> impl Iterator<Item = &ResolvedEntry> {
        self.entries.values()
    }

    /// Iterates entries whose key path starts with `prefix`, in natural-key order.
    pub fn filter_prefix<'a>(&'a self, prefix: &str) -> impl Iterator<Item = &'a ResolvedEntry> + 'a {
        let folded = normalize_path(prefix).to_lowercase();
        self.entries
            .iter()
            .filter(move |(nk, _)| nk.has_prefix(&folded))
            .map(|(_, entry)| entry)
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if there are no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl FromIterator<ResolvedEntry> for ResolvedSnapshot {
    fn from_iter<I: IntoIterator<Item = ResolvedEntry>>(iter: I) -> Self {
        let mut snapshot = Self::new();
        for entry in iter {
            snapshot.insert(entry);
        }
        snapshot
    }
}

impl IntoIterator for ResolvedSnapshot {
    type Item = ResolvedEntry;
    type IntoIter = std::collections::btree_map::IntoValues<NaturalKey, ResolvedEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_values()
    }
}
