//! Policy source abstraction.
//!
//! A source is whatever fetches GPOs for a principal: an LDAP/SMB backend,
//! a local cache, a directory of files. The driver only sees this trait.

use async_trait::async_trait;
use gpreg_types::{GpoRecord, Principal};
use thiserror::Error;

/// Errors a policy source can report.
#[derive(Debug, Error)]
pub enum SourceError {
    /// The backend could not be reached.
    #[error("unreachable: {0}")]
    Unreachable(String),

    /// The backend answered with something unusable.
    #[error("invalid response: {0}")]
    Invalid(String),

    /// IO error reading cached policy.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Fetches the GPO list applicable to a principal.
///
/// Implementations need not be safe for concurrent use with different
/// identities; the driver calls `fetch` for one principal at a time.
#[async_trait]
pub trait PolicySource: Send + Sync {
    /// Returns the GPOs that apply to `principal`, in any order.
    async fn fetch(&self, principal: &Principal) -> Result<Vec<GpoRecord>, SourceError>;
}
