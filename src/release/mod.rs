// ABOUTME: Filesystem abstraction over the deploy tree.
// ABOUTME: Owns the releases directory, the current pointer, and the marker file.

mod repository;

pub use repository::{MARKER_FILENAME, ReleaseError, ReleaseRepository};
