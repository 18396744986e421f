//! Error types for entry normalization.

use gpreg_types::DataType;
use thiserror::Error;

/// Result type for normalization.
pub type EntryParseResult<T> = Result<T, EntryParseError>;

/// Reasons a raw record cannot become a policy entry.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EntryParseError {
    /// Key path is empty after normalization.
    #[error("missing key path")]
    MissingKeyPath,

    /// Type code is not a known registry type.
    #[error("unrecognized registry type code {0}")]
    UnrecognizedType(u32),

    /// Payload does not decode as the declared type.
    #[error("malformed {data_type} data: {detail}")]
    MalformedData { data_type: DataType, detail: String },

    /// A `**` marker this engine does not act on.
    #[error("unsupported value marker {0:?}")]
    UnsupportedMarker(String),
}
