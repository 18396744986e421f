//! Policy entry model for gpreg.
//!
//! This crate defines the types shared by every layer of the registry
//! resolution engine:
//! - Principals (the machine hive and per-SID user hives)
//! - Normalized registry key paths and the natural key of a value
//! - Typed registry values and their persisted text form
//! - Policy entries with a tagged set/delete action
//! - Group Policy Object records, raw (as a backend returns them) and
//!   normalized (as the merge engine consumes them)
//!
//! Nothing here performs I/O.

mod entry;
mod gpo;
mod key;
mod principal;
mod value;

pub use entry::{EntryAction, PolicyEntry, ResolvedEntry, ResolvedSnapshot};
pub use gpo::{GpoRecord, GroupPolicyObject, RawPolicyEntry, UserPolicyMode};
pub use key::{NaturalKey, RegistryKey, normalize_path};
pub use principal::{Principal, Scope, Sid};
pub use value::{DataType, RegistryValue};

/// Result type alias using the crate's error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur constructing model types.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("invalid SID: {0}")]
    InvalidSid(String),

    #[error("empty registry key path")]
    EmptyKeyPath,

    #[error("unknown registry type code: {0}")]
    UnknownDataType(u32),

    #[error("stored value for {data_type} is malformed: {detail}")]
    MalformedStoredValue { data_type: DataType, detail: String },

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
