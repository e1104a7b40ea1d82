// ABOUTME: Production collaborator implementations that shell out to the host.
// ABOUTME: git for source control, a version-manager CLI, chown, and commands.

mod exec;
mod git;
mod system;
mod version_manager;

pub use git::GitSource;
pub use system::{CommandNotifier, KeepLatest, SystemHost};
pub use version_manager::VersionManagerCli;
