// ABOUTME: Deployment orchestration: decide what is needed, then do it.
// ABOUTME: Exports the decision, pipeline, rollback, and lock machinery.

mod decision;
mod error;
mod lock;
mod pipeline;
mod rollback;
mod step;

pub use decision::{Action, ReleaseState, classify, release_state};
pub use error::{DeployError, StepError};
pub use lock::{DeployLock, LockInfo};
pub use pipeline::Pipeline;
pub use rollback::RollbackGuard;
pub use step::Step;

use crate::collab::Collaborators;
use crate::config::Config;
use crate::hooks::HookRegistry;
use crate::release::{ReleaseError, ReleaseRepository};
use crate::types::VersionSpec;
use std::path::PathBuf;

/// What a deployment invocation ended up doing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Target already live with a matching runtime version; nothing ran.
    Skipped,
    /// A new release was provisioned and cut over.
    Deployed,
    /// The live release was reprovisioned in place.
    Redeployed,
    /// The pointer was switched to an existing release; no pipeline ran.
    SwitchedBack,
}

impl Outcome {
    pub fn describe(&self) -> &'static str {
        match self {
            Outcome::Skipped => "already deployed, nothing to do",
            Outcome::Deployed => "deployed new release",
            Outcome::Redeployed => "redeployed live release in place",
            Outcome::SwitchedBack => "switched back to existing release",
        }
    }
}

/// Snapshot of a deploy target for status reporting.
#[derive(Debug)]
pub struct StatusReport {
    pub current: Option<PathBuf>,
    pub recorded: Option<VersionSpec>,
    pub releases: Vec<PathBuf>,
}

/// Top-level deployment entry point: serializes against the target, consults
/// the decision logic, and dispatches to the pipeline or the pointer switch.
pub struct Deployer<'a> {
    config: &'a Config,
    repo: ReleaseRepository,
    collab: &'a Collaborators,
    hooks: &'a HookRegistry,
}

impl<'a> Deployer<'a> {
    pub fn new(config: &'a Config, collab: &'a Collaborators, hooks: &'a HookRegistry) -> Self {
        Self {
            config,
            repo: ReleaseRepository::new(&config.deploy_to),
            collab,
            hooks,
        }
    }

    pub fn repository(&self) -> &ReleaseRepository {
        &self.repo
    }

    pub async fn deploy(&self, force_lock: bool) -> Result<Outcome, DeployError> {
        let lock = DeployLock::acquire(self.repo.deploy_to(), force_lock)?;
        let result = self.deploy_locked().await;
        lock.release();
        result
    }

    async fn deploy_locked(&self) -> Result<Outcome, DeployError> {
        let pipeline = Pipeline::new(self.config, &self.repo, self.collab, self.hooks);

        match classify(&self.repo, self.config)? {
            Action::Skip => Ok(Outcome::Skipped),
            Action::FullDeploy => {
                pipeline.run(false).await?;
                Ok(Outcome::Deployed)
            }
            Action::ForceRedeploy => {
                pipeline.run(true).await?;
                Ok(Outcome::Redeployed)
            }
            Action::RollbackToExisting => {
                let release = self.repo.release_path(&self.config.revision);
                self.repo.set_current(&release)?;
                tracing::info!(release = %release.display(), "switched to existing release");
                Ok(Outcome::SwitchedBack)
            }
        }
    }

    /// Manual rollback: repoint `current` at the release preceding the live
    /// one. No pipeline steps run.
    pub async fn rollback(&self, force_lock: bool) -> Result<PathBuf, DeployError> {
        let lock = DeployLock::acquire(self.repo.deploy_to(), force_lock)?;
        let result = self.rollback_locked();
        lock.release();
        result
    }

    fn rollback_locked(&self) -> Result<PathBuf, DeployError> {
        let current = self.repo.current()?.ok_or(DeployError::NoPreviousRelease)?;
        let releases = self.repo.releases()?;

        let position = releases
            .iter()
            .position(|r| *r == current)
            .ok_or_else(|| DeployError::MissingRelease(current.clone()))?;

        if position == 0 {
            return Err(DeployError::NoPreviousRelease);
        }

        let previous = releases[position - 1].clone();
        self.repo.set_current(&previous)?;
        tracing::info!(release = %previous.display(), "rolled back");
        Ok(previous)
    }

    pub fn status(&self) -> Result<StatusReport, DeployError> {
        let current = self.repo.current()?;
        let recorded = match &current {
            Some(release) => match self.repo.recorded_version(release) {
                Ok(spec) => Some(spec),
                // A live release without a readable marker is still worth
                // reporting; the next deploy will reprovision it anyway.
                Err(ReleaseError::MarkerMissing(_)) | Err(ReleaseError::MarkerInvalid { .. }) => {
                    None
                }
                Err(e) => return Err(e.into()),
            },
            None => None,
        };

        Ok(StatusReport {
            current,
            recorded,
            releases: self.repo.releases()?,
        })
    }
}
