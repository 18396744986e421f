//! Raw record normalization.
//!
//! PReg encodes deletions and soft sets as prefixes on the value name:
//!
//! | value name            | action                         |
//! |-----------------------|--------------------------------|
//! | `**del.<name>`        | delete `<name>`                |
//! | `**delvals.`          | delete every value in the key  |
//! | `**deletevalues`      | delete the `;`-listed values   |
//! | `**soft.<name>`       | set `<name>` unless already set|
//!
//! Markers are matched case-insensitively. Any other `**` marker is
//! reported as unsupported and the record is skipped.

use crate::error::{EntryParseError, EntryParseResult};
use gpreg_types::{
    DataType, EntryAction, GpoRecord, GroupPolicyObject, PolicyEntry, RawPolicyEntry, RegistryKey,
    RegistryValue, Scope,
};
use tracing::{debug, warn};

const DEL_PREFIX: &str = "**del.";
const DELVALS_PREFIX: &str = "**delvals.";
const DELETEVALUES: &str = "**deletevalues";
const SOFT_PREFIX: &str = "**soft.";

/// A raw record that could not be normalized.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedEntry {
    pub gpo: String,
    pub scope: Scope,
    pub key: String,
    pub value_name: String,
    pub error: EntryParseError,
}

/// A normalized GPO plus the raw records that were skipped.
#[derive(Debug, Clone)]
pub struct NormalizedGpo {
    pub gpo: GroupPolicyObject,
    pub skipped: Vec<SkippedEntry>,
}

/// Normalizes both scopes of a backend GPO record.
///
/// Bad records are logged with the GPO name and key path, collected, and
/// dropped. A scope with no reachable content stays `None`.
pub fn normalize_gpo(record: &GpoRecord) -> NormalizedGpo {
    normalize_scopes(record, &[Scope::Machine, Scope::User])
}

/// Normalizes only one scope; the other scope is left `None`.
pub fn normalize_gpo_scope(record: &GpoRecord, scope: Scope) -> NormalizedGpo {
    normalize_scopes(record, &[scope])
}

fn normalize_scopes(record: &GpoRecord, scopes: &[Scope]) -> NormalizedGpo {
    let mut skipped = Vec::new();
    let mut normalize_scope = |scope: Scope| {
        if !scopes.contains(&scope) {
            return None;
        }
        let raw_entries = match scope {
            Scope::Machine => record.machine.as_ref(),
            Scope::User => record.user.as_ref(),
        }?;
        let entries = raw_entries
            .iter()
            .filter_map(|raw| match normalize_entry(&record.name, raw) {
                Ok(entry) => Some(entry),
                Err(error) => {
                    warn!(
                        "Skipping {} entry in GPO {} at {}\\{}: {}",
                        scope, record.name, raw.key, raw.value_name, error
                    );
                    skipped.push(SkippedEntry {
                        gpo: record.name.clone(),
                        scope,
                        key: raw.key.clone(),
                        value_name: raw.value_name.clone(),
                        error,
                    });
                    None
                }
            })
            .collect::<Vec<_>>();
        Some(entries)
    };

    let machine_entries = normalize_scope(Scope::Machine);
    let user_entries = normalize_scope(Scope::User);

    debug!(
        "Normalized GPO {} (precedence {}): {} machine, {} user, {} skipped",
        record.name,
        record.precedence,
        machine_entries.as_ref().map_or(0, Vec::len),
        user_entries.as_ref().map_or(0, Vec::len),
        skipped.len()
    );

    NormalizedGpo {
        gpo: GroupPolicyObject {
            name: record.name.clone(),
            display_name: if record.display_name.is_empty() {
                record.name.clone()
            } else {
                record.display_name.clone()
            },
            precedence: record.precedence,
            user_policy_mode: record.user_policy_mode,
            machine_entries,
            user_entries,
        },
        skipped,
    }
}

/// Converts one raw record into a policy entry.
pub fn normalize_entry(origin_policy: &str, raw: &RawPolicyEntry) -> EntryParseResult<PolicyEntry> {
    let key = RegistryKey::new(&raw.key).map_err(|_| EntryParseError::MissingKeyPath)?;
    let (value_name, action) = classify(raw)?;

    Ok(PolicyEntry {
        key,
        value_name,
        action,
        origin_policy: origin_policy.to_string(),
    })
}

fn classify(raw: &RawPolicyEntry) -> EntryParseResult<(String, EntryAction)> {
    let name = raw.value_name.as_str();
    let lower = name.to_ascii_lowercase();

    if !lower.starts_with("**") {
        return Ok((name.to_string(), EntryAction::Set(decode(raw)?)));
    }

    if lower.starts_with(DELVALS_PREFIX) {
        Ok((String::new(), EntryAction::DeleteAllValues))
    } else if lower.starts_with(DEL_PREFIX) {
        Ok((name[DEL_PREFIX.len()..].to_string(), EntryAction::Delete))
    } else if lower == DELETEVALUES {
        let names = match decode(raw)? {
            RegistryValue::String(list) | RegistryValue::ExpandString(list) => list
                .split(';')
                .map(str::trim)
                .filter(|n| !n.is_empty())
                .map(str::to_string)
                .collect(),
            RegistryValue::MultiString(list) => list,
            other => {
                return Err(EntryParseError::MalformedData {
                    data_type: other.data_type(),
                    detail: "value list must be a string".to_string(),
                });
            }
        };
        Ok((String::new(), EntryAction::DeleteValues(names)))
    } else if lower.starts_with(SOFT_PREFIX) {
        Ok((
            name[SOFT_PREFIX.len()..].to_string(),
            EntryAction::SoftSet(decode(raw)?),
        ))
    } else {
        Err(EntryParseError::UnsupportedMarker(name.to_string()))
    }
}

fn decode(raw: &RawPolicyEntry) -> EntryParseResult<RegistryValue> {
    let data_type =
        DataType::from_code(raw.type_code).map_err(|_| EntryParseError::UnrecognizedType(raw.type_code))?;
    let bytes = raw.data.as_slice();
    let malformed = |detail: &str| EntryParseError::MalformedData {
        data_type,
        detail: detail.to_string(),
    };

    Ok(match data_type {
        DataType::Sz => RegistryValue::String(first_string(data_type, bytes)?),
        DataType::ExpandSz => RegistryValue::ExpandString(first_string(data_type, bytes)?),
        DataType::Link => RegistryValue::Link(first_string(data_type, bytes)?),
        DataType::MultiSz => RegistryValue::MultiString(string_list(data_type, bytes)?),
        DataType::Dword => {
            let raw: [u8; 4] = bytes.try_into().map_err(|_| malformed("expected 4 bytes"))?;
            RegistryValue::Dword(u32::from_le_bytes(raw))
        }
        DataType::DwordBigEndian => {
            let raw: [u8; 4] = bytes.try_into().map_err(|_| malformed("expected 4 bytes"))?;
            RegistryValue::DwordBigEndian(u32::from_be_bytes(raw))
        }
        DataType::Qword => {
            let raw: [u8; 8] = bytes.try_into().map_err(|_| malformed("expected 8 bytes"))?;
            RegistryValue::Qword(u64::from_le_bytes(raw))
        }
        DataType::Binary => RegistryValue::Binary(bytes.to_vec()),
        DataType::None => RegistryValue::None(bytes.to_vec()),
    })
}

fn utf16_units(data_type: DataType, bytes: &[u8]) -> EntryParseResult<Vec<u16>> {
    if bytes.len() % 2 != 0 {
        return Err(EntryParseError::MalformedData {
            data_type,
            detail: format!("odd UTF-16 payload length {}", bytes.len()),
        });
    }
    Ok(bytes
        .chunks_exact(2)
        .map(|pair| u16::from_le_bytes([pair[0], pair[1]]))
        .collect())
}

fn utf16_string(data_type: DataType, units: &[u16]) -> EntryParseResult<String> {
    String::from_utf16(units).map_err(|e| EntryParseError::MalformedData {
        data_type,
        detail: e.to_string(),
    })
}

/// Decodes a NUL-terminated string; anything after the first NUL is ignored.
fn first_string(data_type: DataType, bytes: &[u8]) -> EntryParseResult<String> {
    let units = utf16_units(data_type, bytes)?;
    let end = units.iter().position(|&u| u == 0).unwrap_or(units.len());
    utf16_string(data_type, &units[..end])
}

/// Decodes a NUL-separated list, dropping the empty items of the terminator.
fn string_list(data_type: DataType, bytes: &[u8]) -> EntryParseResult<Vec<String>> {
    let units = utf16_units(data_type, bytes)?;
    let mut items = units
        .split(|&u| u == 0)
        .map(|chunk| utf16_string(data_type, chunk))
        .collect::<EntryParseResult<Vec<_>>>()?;
    while items.last().is_some_and(String::is_empty) {
        items.pop();
    }
    Ok(items)
}
