// ABOUTME: Classifies the deploy target against on-disk state.
// ABOUTME: Selects skip, full-deploy, force-redeploy, or rollback-to-existing.

use super::error::DeployError;
use crate::config::Config;
use crate::release::ReleaseRepository;

/// Where the target revision's release directory stands relative to the
/// current pointer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReleaseState {
    /// No release directory exists for the target revision.
    Absent,
    /// The target's release directory exists and is the live release.
    Current,
    /// The target's release directory exists but something else is live.
    Stale,
}

/// The action a deployment invocation will take.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// Target is already live with a matching runtime version.
    Skip,
    /// Provision a new release directory and run the full pipeline.
    FullDeploy,
    /// Re-run the pipeline in place against the live release to correct
    /// runtime-version drift.
    ForceRedeploy,
    /// Repoint `current` at the existing release; no pipeline steps.
    RollbackToExisting,
}

/// Evaluate the state of the target revision's release directory.
pub fn release_state(
    repo: &ReleaseRepository,
    config: &Config,
) -> Result<ReleaseState, DeployError> {
    let release = repo.release_path(&config.revision);
    if !release.is_dir() {
        return Ok(ReleaseState::Absent);
    }

    // A dangling pointer is surfaced here rather than masked as Stale.
    match repo.current()? {
        Some(current) if current == release => Ok(ReleaseState::Current),
        _ => Ok(ReleaseState::Stale),
    }
}

/// Decide the action: release state crossed with runtime-version match.
pub fn classify(repo: &ReleaseRepository, config: &Config) -> Result<Action, DeployError> {
    let state = release_state(repo, config)?;
    let release = repo.release_path(&config.revision);

    match state {
        ReleaseState::Absent => Ok(Action::FullDeploy),
        ReleaseState::Stale => Ok(Action::RollbackToExisting),
        ReleaseState::Current => match repo.recorded_version(&release) {
            Ok(recorded) if recorded.matches_version(&config.runtime) => {
                tracing::debug!(revision = %config.revision, "release is already live");
                Ok(Action::Skip)
            }
            Ok(recorded) => {
                tracing::info!(
                    recorded = %recorded,
                    desired = %config.runtime,
                    "runtime version drift on live release"
                );
                Ok(Action::ForceRedeploy)
            }
            // An unreadable marker must never pass as a match; redeploy
            // rewrites it.
            Err(e) => {
                tracing::warn!(error = %e, "runtime-version marker unreadable, forcing redeploy");
                Ok(Action::ForceRedeploy)
            }
        },
    }
}
