// ABOUTME: Rollback of a failed pipeline attempt.
// ABOUTME: Restores the prior pointer; deletes only attempt-created releases.

use crate::release::ReleaseRepository;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Snapshot of pointer state taken before a pipeline attempt, used to undo
/// the attempt if any step fails.
///
/// Invariant: rollback only ever deletes a release directory that the failed
/// attempt created. A failed in-place redeploy leaves its (possibly partially
/// reprovisioned) release on disk for operator review; the pointer is still
/// restored.
#[derive(Debug)]
pub struct RollbackGuard<'a> {
    repo: &'a ReleaseRepository,
    prior_current: Option<PathBuf>,
    release: PathBuf,
    created_release: bool,
}

impl<'a> RollbackGuard<'a> {
    /// Capture the pointer state before the pipeline touches anything.
    pub fn prepare(
        repo: &'a ReleaseRepository,
        release: &Path,
        created_release: bool,
    ) -> Result<Self, crate::deploy::DeployError> {
        let prior_current = repo.current()?;
        Ok(Self {
            repo,
            prior_current,
            release: release.to_path_buf(),
            created_release,
        })
    }

    /// Undo a failed attempt. Cleanup is best-effort: failures here are
    /// logged, and the caller keeps the original step error.
    pub fn unwind(&self) {
        match &self.prior_current {
            Some(prior) => {
                if let Err(e) = self.repo.set_current(prior) {
                    tracing::error!(
                        error = %e,
                        prior = %prior.display(),
                        "rollback could not restore the current pointer"
                    );
                } else {
                    tracing::info!(prior = %prior.display(), "restored current pointer");
                }
            }
            None => {
                if let Err(e) = self.repo.clear_current() {
                    tracing::error!(error = %e, "rollback could not clear the current pointer");
                }
            }
        }

        if self.created_release {
            match fs::remove_dir_all(&self.release) {
                Ok(()) => {
                    tracing::info!(release = %self.release.display(), "removed failed release");
                }
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(e) => {
                    tracing::error!(
                        error = %e,
                        release = %self.release.display(),
                        "rollback could not remove the failed release"
                    );
                }
            }
        } else {
            tracing::warn!(
                release = %self.release.display(),
                "in-place redeploy failed; release left on disk for review"
            );
        }
    }
}
