// ABOUTME: Validated domain newtypes shared across the crate.
// ABOUTME: Revisions name release directories; version specs pin the runtime.

mod revision;
mod version_spec;

pub use revision::{Revision, RevisionError};
pub use version_spec::{VersionSpec, VersionSpecError};
