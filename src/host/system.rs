// ABOUTME: Host-level collaborators: ownership, restart, notify, retention.
// ABOUTME: All shell-command based; retention prunes old release directories.

use super::exec::run_checked;
use crate::collab::{DeployNotice, HostError, HostOps, Notifier, Retention};
use crate::release::ReleaseRepository;
use async_trait::async_trait;
use std::path::Path;
use tokio::process::Command;

/// Ownership enforcement and process restart via host commands.
pub struct SystemHost {
    restart_command: Option<String>,
}

impl SystemHost {
    pub fn new(restart_command: Option<String>) -> Self {
        Self { restart_command }
    }
}

#[async_trait]
impl HostOps for SystemHost {
    async fn chown_recursive(&self, path: &Path, user: &str) -> Result<(), HostError> {
        let mut cmd = Command::new("chown");
        cmd.arg("-R").arg(user).arg(path);
        run_checked(cmd, &format!("chown -R {} {}", user, path.display())).await?;
        Ok(())
    }

    async fn restart(&self, release: &Path) -> Result<(), HostError> {
        let Some(command) = &self.restart_command else {
            tracing::debug!("no restart command configured, skipping restart");
            return Ok(());
        };

        let mut cmd = Command::new("sh");
        cmd.arg("-c")
            .arg(command)
            .current_dir(release)
            .env("CUTOVER_RELEASE_PATH", release);
        run_checked(cmd, command).await?;
        Ok(())
    }
}

/// Runs a configured notification command with the deploy details in its
/// environment. The pipeline swallows any failure from this collaborator.
pub struct CommandNotifier {
    command: Option<String>,
}

impl CommandNotifier {
    pub fn new(command: Option<String>) -> Self {
        Self { command }
    }
}

#[async_trait]
impl Notifier for CommandNotifier {
    async fn notify(&self, notice: &DeployNotice) -> Result<(), HostError> {
        let Some(command) = &self.command else {
            return Ok(());
        };

        let mut cmd = Command::new("sh");
        cmd.arg("-c")
            .arg(command)
            .env("CUTOVER_REVISION", &notice.revision)
            .env("CUTOVER_REPO", &notice.repo)
            .env("CUTOVER_ENVIRONMENT", &notice.environment)
            .env("CUTOVER_USER", &notice.user);
        run_checked(cmd, command).await?;
        Ok(())
    }
}

/// Retention policy keeping the newest `keep` releases. The live release is
/// never removed, whatever its age.
pub struct KeepLatest {
    keep: usize,
}

impl KeepLatest {
    pub fn new(keep: usize) -> Self {
        Self { keep }
    }
}

#[async_trait]
impl Retention for KeepLatest {
    async fn cleanup(&self, repo: &ReleaseRepository) -> Result<(), HostError> {
        let releases = repo
            .releases()
            .map_err(|e| HostError::Io(std::io::Error::other(e.to_string())))?;
        let current = repo
            .current()
            .map_err(|e| HostError::Io(std::io::Error::other(e.to_string())))?;

        let disposable: Vec<_> = releases
            .iter()
            .filter(|r| current.as_deref() != Some(r.as_path()))
            .collect();

        // `keep` counts the live release; the remainder may stay on disk.
        let budget = self.keep.saturating_sub(usize::from(current.is_some()));
        let excess = disposable.len().saturating_sub(budget);

        for release in disposable.into_iter().take(excess) {
            tracing::info!(release = %release.display(), "removing old release");
            std::fs::remove_dir_all(release)?;
        }

        Ok(())
    }
}
