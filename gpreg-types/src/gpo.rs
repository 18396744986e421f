//! Group Policy Object records.
//!
//! A backend hands over [`GpoRecord`]s carrying the parser's raw entries.
//! Normalization turns them into [`GroupPolicyObject`]s, which is what the
//! merge engine consumes.

use crate::entry::PolicyEntry;
use crate::principal::Scope;
use serde::{Deserialize, Serialize};

/// How a GPO's user settings combine with lower-precedence GPOs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UserPolicyMode {
    #[default]
    #[serde(alias = "notconfigured")]
    NotConfigured,
    Merge,
    Replace,
}

/// One registry record as produced by the PReg parser.
///
/// `value_name` still carries any `**del.`-style marker; `data` is the raw
/// little-endian payload for `type_code`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawPolicyEntry {
    pub key: String,
    #[serde(default)]
    pub value_name: String,
    pub type_code: u32,
    #[serde(with = "hex::serde", default)]
    pub data: Vec<u8>,
}

impl RawPolicyEntry {
    /// Builds a `REG_SZ` record, encoding the string as NUL-terminated UTF-16LE.
    pub fn string(key: impl Into<String>, value_name: impl Into<String>, value: &str) -> Self {
        let mut data: Vec<u8> = value.encode_utf16().flat_map(u16::to_le_bytes).collect();
        data.extend_from_slice(&[0, 0]);
        Self {
            key: key.into(),
            value_name: value_name.into(),
            type_code: 1,
            data,
        }
    }

    /// Builds a `REG_DWORD` record.
    pub fn dword(key: impl Into<String>, value_name: impl Into<String>, value: u32) -> Self {
        Self {
            key: key.into(),
            value_name: value_name.into(),
            type_code: 4,
            data: value.to_le_bytes().to_vec(),
        }
    }

    /// Builds a `**del.<value_name>` marker record.
    pub fn delete(key: impl Into<String>, value_name: &str) -> Self {
        Self::string(key, format!("**del.{value_name}"), " ")
    }
}

/// A GPO as returned by a policy backend, before normalization.
///
/// `machine` and `user` are `None` when the backend could not reach policy
/// content for that scope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GpoRecord {
    pub name: String,
    #[serde(default)]
    pub display_name: String,
    pub precedence: i32,
    #[serde(default)]
    pub user_policy_mode: UserPolicyMode,
    #[serde(default)]
    pub machine: Option<Vec<RawPolicyEntry>>,
    #[serde(default)]
    pub user: Option<Vec<RawPolicyEntry>>,
}

/// A GPO with normalized entries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupPolicyObject {
    pub name: String,
    pub display_name: String,
    /// Processing order: lower precedence is processed first, the highest
    /// precedence is processed last and wins.
    pub precedence: i32,
    pub user_policy_mode: UserPolicyMode,
    pub machine_entries: Option<Vec<PolicyEntry>>,
    pub user_entries: Option<Vec<PolicyEntry>>,
}

impl GroupPolicyObject {
    /// Creates a GPO with no content for either scope.
    pub fn new(name: impl Into<String>, precedence: i32) -> Self {
        let name = name.into();
        Self {
            display_name: name.clone(),
            name,
            precedence,
            user_policy_mode: UserPolicyMode::NotConfigured,
            machine_entries: None,
            user_entries: None,
        }
    }

    /// Sets the machine entries.
    #[must_use]
    pub fn with_machine_entries(mut self, entries: Vec<PolicyEntry>) -> Self {
        self.machine_entries = Some(entries);
        self
    }

    /// Sets the user entries.
    #[must_use]
    pub fn with_user_entries(mut self, entries: Vec<PolicyEntry>) -> Self {
        self.user_entries = Some(entries);
        self
    }

    /// Sets the user policy mode.
    #[must_use]
    pub fn with_user_policy_mode(mut self, mode: UserPolicyMode) -> Self {
        self.user_policy_mode = mode;
        self
    }

    /// Returns the entries for a scope, or `None` if the scope had no
    /// reachable content.
    #[must_use]
    pub fn entries(&self, scope: Scope) -> Option<&[PolicyEntry]> {
        match scope {
            Scope::Machine => self.machine_entries.as_deref(),
            Scope::User => self.user_entries.as_deref(),
        }
    }
}
