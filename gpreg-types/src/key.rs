//! Registry key paths and natural keys.

use crate::Error;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A normalized registry key path such as `Software\Policies\Mozilla\Firefox`.
///
/// Forward slashes become backslashes, repeated separators collapse and
/// leading/trailing separators are dropped. The original letter case is kept
/// for display; comparisons go through [`RegistryKey::folded`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RegistryKey(String);

impl RegistryKey {
    /// Normalizes and validates a key path.
    pub fn new(path: &str) -> Result<Self, Error> {
        let normalized = normalize_path(path);
        if normalized.is_empty() {
            return Err(Error::EmptyKeyPath);
        }
        Ok(Self(normalized))
    }

    /// Returns the key path as written by the policy that set it.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns the case-folded path used for identity and ordering.
    #[must_use]
    pub fn folded(&self) -> String {
        self.0.to_lowercase()
    }
}

impl fmt::Display for RegistryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for RegistryKey {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for RegistryKey {
    type Error = Error;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(&s)
    }
}

impl From<RegistryKey> for String {
    fn from(key: RegistryKey) -> Self {
        key.0
    }
}

/// Normalizes a key path or prefix. An empty input yields an empty string.
#[must_use]
pub fn normalize_path(path: &str) -> String {
    path.split(['\\', '/'])
        .filter(|segment| !segment.is_empty())
        .collect::<Vec<_>>()
        .join("\\")
}

/// Identity of a value inside one hive: folded key path plus folded value name.
///
/// Ordering is lexicographic by key path, then value name, which is the
/// iteration order appliers observe.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NaturalKey {
    pub key: String,
    pub value_name: String,
}

impl NaturalKey {
    /// Builds the natural key for a key path and value name.
    #[must_use]
    pub fn new(key: &RegistryKey, value_name: &str) -> Self {
        Self {
            key: key.folded(),
            value_name: value_name.to_lowercase(),
        }
    }

    /// Returns true if this key lives under the given folded, normalized prefix.
    #[must_use]
    pub fn has_prefix(&self, folded_prefix: &str) -> bool {
        self.key.starts_with(folded_prefix)
    }
}

impl fmt::Display for NaturalKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}\\{}", self.key, self.value_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_separators() {
        let key = RegistryKey::new("/Software//Policies/Mozilla\\").unwrap();
        assert_eq!(key.as_str(), "Software\\Policies\\Mozilla");
    }

    #[test]
    fn rejects_empty_path() {
        assert!(RegistryKey::new("\\\\").is_err());
        assert!(RegistryKey::new("").is_err());
    }

    #[test]
    fn natural_key_ignores_case() {
        let a = NaturalKey::new(&RegistryKey::new("Control\\X").unwrap(), "Value");
        let b = NaturalKey::new(&RegistryKey::new("control\\x").unwrap(), "VALUE");
        assert_eq!(a, b);
    }

    #[test]
    fn natural_key_folds_non_ascii() {
        let a = NaturalKey::new(&RegistryKey::new("Software\\Политика").unwrap(), "Значение");
        let b = NaturalKey::new(&RegistryKey::new("software\\ПОЛИТИКА").unwrap(), "значение");
        assert_eq!(a, b);
        assert!(a.has_prefix("software\\полит"));
    }
}
