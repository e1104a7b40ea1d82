// ABOUTME: Names for the pipeline's ordered provisioning units.
// ABOUTME: A failed deployment reports the originating step by this name.

use crate::hooks::HookPoint;
use std::fmt;

/// One unit of the fixed provisioning sequence. Steps have no identity
/// beyond their position; the name exists for logs and error reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    EnforceOwnership,
    VerifyDirectories,
    UpdateCachedRepo,
    MaterializeRelease,
    WriteLoadPaths,
    WriteVersionMarker,
    ProvisionNamespace,
    InstallDependencies,
    SymlinksBeforeMigrate,
    Migrate,
    PrecompileAssets,
    Cutover,
    Restart,
    Notify,
    RetentionCleanup,
    Hook(HookPoint),
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Step::EnforceOwnership => "enforce-ownership",
            Step::VerifyDirectories => "verify-directories",
            Step::UpdateCachedRepo => "update-cached-repo",
            Step::MaterializeRelease => "materialize-release",
            Step::WriteLoadPaths => "write-load-paths",
            Step::WriteVersionMarker => "write-version-marker",
            Step::ProvisionNamespace => "provision-namespace",
            Step::InstallDependencies => "install-dependencies",
            Step::SymlinksBeforeMigrate => "symlinks-before-migrate",
            Step::Migrate => "migrate",
            Step::PrecompileAssets => "precompile-assets",
            Step::Cutover => "cutover",
            Step::Restart => "restart",
            Step::Notify => "notify",
            Step::RetentionCleanup => "retention-cleanup",
            Step::Hook(point) => return write!(f, "hook:{point}"),
        };
        f.write_str(name)
    }
}
