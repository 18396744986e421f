//! Typed registry values.

use crate::Error;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Registry value types, with their PReg wire codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DataType {
    None,
    Sz,
    ExpandSz,
    Binary,
    Dword,
    DwordBigEndian,
    Link,
    MultiSz,
    Qword,
}

impl DataType {
    /// Maps a PReg type code to a data type.
    pub fn from_code(code: u32) -> Result<Self, Error> {
        Ok(match code {
            0 => Self::None,
            1 => Self::Sz,
            2 => Self::ExpandSz,
            3 => Self::Binary,
            4 => Self::Dword,
            5 => Self::DwordBigEndian,
            6 => Self::Link,
            7 => Self::MultiSz,
            11 => Self::Qword,
            other => return Err(Error::UnknownDataType(other)),
        })
    }

    /// Returns the PReg type code.
    #[must_use]
    pub const fn code(self) -> u32 {
        match self {
            Self::None => 0,
            Self::Sz => 1,
            Self::ExpandSz => 2,
            Self::Binary => 3,
            Self::Dword => 4,
            Self::DwordBigEndian => 5,
            Self::Link => 6,
            Self::MultiSz => 7,
            Self::Qword => 11,
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::None => "REG_NONE",
            Self::Sz => "REG_SZ",
            Self::ExpandSz => "REG_EXPAND_SZ",
            Self::Binary => "REG_BINARY",
            Self::Dword => "REG_DWORD",
            Self::DwordBigEndian => "REG_DWORD_BIG_ENDIAN",
            Self::Link => "REG_LINK",
            Self::MultiSz => "REG_MULTI_SZ",
            Self::Qword => "REG_QWORD",
        };
        f.write_str(name)
    }
}

/// A decoded registry value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum RegistryValue {
    None(#[serde(with = "hex::serde")] Vec<u8>),
    String(String),
    ExpandString(String),
    Binary(#[serde(with = "hex::serde")] Vec<u8>),
    Dword(u32),
    DwordBigEndian(u32),
    Link(String),
    MultiString(Vec<String>),
    Qword(u64),
}

impl RegistryValue {
    /// Returns the registry type of this value.
    #[must_use]
    pub fn data_type(&self) -> DataType {
        match self {
            Self::None(_) => DataType::None,
            Self::String(_) => DataType::Sz,
            Self::ExpandString(_) => DataType::ExpandSz,
            Self::Binary(_) => DataType::Binary,
            Self::Dword(_) => DataType::Dword,
            Self::DwordBigEndian(_) => DataType::DwordBigEndian,
            Self::Link(_) => DataType::Link,
            Self::MultiString(_) => DataType::MultiSz,
            Self::Qword(_) => DataType::Qword,
        }
    }

    /// Returns the value as a string, for the string-like types.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) | Self::ExpandString(s) | Self::Link(s) => Some(s),
            _ => None,
        }
    }

    /// Returns the value as an integer, for the numeric types.
    #[must_use]
    pub fn as_u64(&self) -> Option<u64> {
        match self {
            Self::Dword(v) | Self::DwordBigEndian(v) => Some(u64::from(*v)),
            Self::Qword(v) => Some(*v),
            _ => None,
        }
    }

    /// Encodes the value as the text stored in the registry tables.
    ///
    /// Strings are stored verbatim, integers in decimal, multi-strings as a
    /// JSON array and byte blobs as lowercase hex.
    pub fn to_stored(&self) -> Result<String, Error> {
        Ok(match self {
            Self::String(s) | Self::ExpandString(s) | Self::Link(s) => s.clone(),
            Self::Dword(v) | Self::DwordBigEndian(v) => v.to_string(),
            Self::Qword(v) => v.to_string(),
            Self::MultiString(items) => serde_json::to_string(items)?,
            Self::None(bytes) | Self::Binary(bytes) => hex::encode(bytes),
        })
    }

    /// Decodes text produced by [`RegistryValue::to_stored`].
    pub fn from_stored(data_type: DataType, text: &str) -> Result<Self, Error> {
        let malformed = |detail: String| Error::MalformedStoredValue { data_type, detail };
        Ok(match data_type {
            DataType::Sz => Self::String(text.to_string()),
            DataType::ExpandSz => Self::ExpandString(text.to_string()),
            DataType::Link => Self::Link(text.to_string()),
            DataType::Dword => Self::Dword(text.parse().map_err(|e| malformed(format!("{e}")))?),
            DataType::DwordBigEndian => {
                Self::DwordBigEndian(text.parse().map_err(|e| malformed(format!("{e}")))?)
            }
            DataType::Qword => Self::Qword(text.parse().map_err(|e| malformed(format!("{e}")))?),
            DataType::MultiSz => Self::MultiString(serde_json::from_str(text)?),
            DataType::Binary => Self::Binary(hex::decode(text).map_err(|e| malformed(format!("{e}")))?),
            DataType::None => Self::None(hex::decode(text).map_err(|e| malformed(format!("{e}")))?),
        })
    }
}

impl fmt::Display for RegistryValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::String(s) | Self::ExpandString(s) | Self::Link(s) => f.write_str(s),
            Self::Dword(v) | Self::DwordBigEndian(v) => write!(f, "{v}"),
            Self::Qword(v) => write!(f, "{v}"),
            Self::MultiString(items) => f.write_str(&items.join(";")),
            Self::None(bytes) | Self::Binary(bytes) => f.write_str(&hex::encode(bytes)),
        }
    }
}
