//! Entry normalization and precedence merge for gpreg.
//!
//! Two stages, both pure:
//!
//! - **Normalize**: turn the parser's raw records into [`PolicyEntry`]s.
//!   Deletion and soft-set markers on the value name become tagged
//!   [`EntryAction`] variants here and nowhere else. A malformed record is
//!   skipped and logged; it never aborts the rest of its GPO.
//!
//! - **Merge**: fold an ordered list of GPOs into one [`ResolvedSnapshot`]
//!   for a scope. GPOs are processed in increasing precedence, so the
//!   highest precedence is processed last and wins. Every run recomputes
//!   from scratch; the same input always yields the same snapshot.
//!
//! Feature-enablement switches that appliers honour are not evaluated here.
//! The snapshot is what policy says, not whether this host acts on it.
//!
//! [`PolicyEntry`]: gpreg_types::PolicyEntry
//! [`EntryAction`]: gpreg_types::EntryAction
//! [`ResolvedSnapshot`]: gpreg_types::ResolvedSnapshot

mod error;
mod merge;
mod normalize;

pub use error::{EntryParseError, EntryParseResult};
pub use merge::{apply_entry, effective_user_mode, resolve, resolve_machine, resolve_user};
pub use normalize::{NormalizedGpo, SkippedEntry, normalize_entry, normalize_gpo, normalize_gpo_scope};
