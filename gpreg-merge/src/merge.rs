//! Precedence merge.
//!
//! Machine scope folds every GPO's machine entries in increasing precedence.
//! User scope does the same unless the highest-precedence GPO asks for
//! `Replace`, in which case only that GPO's user entries count.
//!
//! Input is stable-sorted by precedence before folding, so the processing
//! order never depends on how a backend happened to order its list. GPOs
//! with equal precedence keep their input order.

use gpreg_types::{
    EntryAction, GroupPolicyObject, NaturalKey, PolicyEntry, RegistryValue, ResolvedEntry,
    ResolvedSnapshot, Scope, UserPolicyMode,
};
use tracing::{debug, warn};

/// Resolves the machine hive.
pub fn resolve_machine(gpos: &[GroupPolicyObject]) -> ResolvedSnapshot {
    resolve(gpos, Scope::Machine)
}

/// Resolves a user hive.
pub fn resolve_user(gpos: &[GroupPolicyObject]) -> ResolvedSnapshot {
    resolve(gpos, Scope::User)
}

/// Resolves one scope from a GPO list.
pub fn resolve(gpos: &[GroupPolicyObject], scope: Scope) -> ResolvedSnapshot {
    let ordered = by_precedence(gpos);

    let contributing: &[&GroupPolicyObject] = match scope {
        Scope::User if effective_user_mode(gpos) == UserPolicyMode::Replace => {
            // Replace: only the winning GPO's user settings are considered.
            let last = ordered.len() - 1;
            debug!("User policy mode Replace set by GPO {}", ordered[last].name);
            &ordered[last..]
        }
        _ => &ordered,
    };

    let mut snapshot = ResolvedSnapshot::new();
    for gpo in contributing {
        let Some(entries) = gpo.entries(scope) else {
            warn!("GPO {} has no reachable {} policy, skipping", gpo.name, scope);
            continue;
        };
        for entry in entries {
            apply_entry(&mut snapshot, entry);
        }
        debug!(
            "Folded {} {} entries from GPO {} (precedence {})",
            entries.len(),
            scope,
            gpo.name,
            gpo.precedence
        );
    }
    snapshot
}

/// Returns the user policy mode of the highest-precedence GPO.
///
/// An empty list is `NotConfigured`. Ties on precedence resolve to the GPO
/// listed last.
pub fn effective_user_mode(gpos: &[GroupPolicyObject]) -> UserPolicyMode {
    by_precedence(gpos)
        .last()
        .map_or(UserPolicyMode::NotConfigured, |gpo| gpo.user_policy_mode)
}

/// Applies one entry to a working snapshot.
///
/// Sets overwrite, soft sets only fill gaps, tombstones remove whatever an
/// earlier GPO put there. Removing something absent is a no-op.
pub fn apply_entry(snapshot: &mut ResolvedSnapshot, entry: &PolicyEntry) {
    match &entry.action {
        EntryAction::Set(value) => {
            snapshot.insert(resolved(entry, value.clone()));
        }
        EntryAction::SoftSet(value) => {
            if !snapshot.contains(&entry.natural_key()) {
                snapshot.insert(resolved(entry, value.clone()));
            }
        }
        EntryAction::Delete => {
            if snapshot.remove(&entry.natural_key()).is_some() {
                debug!(
                    "GPO {} deleted {}\\{}",
                    entry.origin_policy, entry.key, entry.value_name
                );
            }
        }
        EntryAction::DeleteValues(names) => {
            for name in names {
                snapshot.remove(&NaturalKey::new(&entry.key, name));
            }
        }
        EntryAction::DeleteAllValues => {
            let removed = snapshot.remove_key_values(&entry.key);
            debug!(
                "GPO {} cleared {} values under {}",
                entry.origin_policy, removed, entry.key
            );
        }
    }
}

fn resolved(entry: &PolicyEntry, value: RegistryValue) -> ResolvedEntry {
    ResolvedEntry {
        key: entry.key.clone(),
        value_name: entry.value_name.clone(),
        value,
        origin_policy: entry.origin_policy.clone(),
    }
}

fn by_precedence(gpos: &[GroupPolicyObject]) -> Vec<&GroupPolicyObject> {
    let mut ordered: Vec<&GroupPolicyObject> = gpos.iter().collect();
    ordered.sort_by_key(|gpo| gpo.precedence);
    ordered
}
