//! Principals that own a registry hive.
//!
//! The machine hive (HKLM analog) is a singleton; user hives (HKCU analog)
//! are keyed by the user's Security Identifier.

use crate::Error;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A Windows Security Identifier, e.g. `S-1-5-21-3623811015-3361044348-30300820-1013`.
///
/// Validated on construction and stored with an upper-case `S` prefix so two
/// spellings of the same SID compare equal.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Sid(String);

impl Sid {
    /// Parses and validates a SID string.
    pub fn parse(s: &str) -> Result<Self, Error> {
        let s = s.trim();
        let mut parts = s.split('-');
        match parts.next() {
            Some(prefix) if prefix.eq_ignore_ascii_case("s") => {}
            _ => return Err(Error::InvalidSid(s.to_string())),
        }

        let components: Vec<&str> = parts.collect();
        // revision, identifier authority, at least one sub-authority
        if components.len() < 3 {
            return Err(Error::InvalidSid(s.to_string()));
        }
        if components
            .iter()
            .any(|c| c.is_empty() || !c.bytes().all(|b| b.is_ascii_digit()))
        {
            return Err(Error::InvalidSid(s.to_string()));
        }

        Ok(Self(format!("S-{}", components.join("-"))))
    }

    /// Returns the canonical string form.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Sid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for Sid {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for Sid {
    type Error = Error;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::parse(&s)
    }
}

impl From<Sid> for String {
    fn from(sid: Sid) -> Self {
        sid.0
    }
}

/// Which partition of the registry an entry belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Scope {
    Machine,
    User,
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Machine => f.write_str("machine"),
            Self::User => f.write_str("user"),
        }
    }
}

/// The owner of one hive.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(tag = "scope", content = "sid", rename_all = "lowercase")]
pub enum Principal {
    Machine,
    User(Sid),
}

impl Principal {
    /// Returns the scope this principal's hive belongs to.
    #[must_use]
    pub fn scope(&self) -> Scope {
        match self {
            Self::Machine => Scope::Machine,
            Self::User(_) => Scope::User,
        }
    }

    /// Returns the SID for a user principal.
    #[must_use]
    pub fn sid(&self) -> Option<&Sid> {
        match self {
            Self::Machine => None,
            Self::User(sid) => Some(sid),
        }
    }
}

impl From<Sid> for Principal {
    fn from(sid: Sid) -> Self {
        Self::User(sid)
    }
}

impl fmt::Display for Principal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Machine => f.write_str("machine"),
            Self::User(sid) => write!(f, "user {sid}"),
        }
    }
}
