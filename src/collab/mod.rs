// ABOUTME: Collaborator seams the pipeline delegates its steps to.
// ABOUTME: One trait per external concern, with its error type alongside.

use crate::release::ReleaseRepository;
use crate::types::{Revision, VersionSpec};
use async_trait::async_trait;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Failure of an external command a collaborator ran.
#[derive(Debug, Error)]
pub enum CommandError {
    #[error("`{command}` exited with status {status}: {stderr}")]
    Failed {
        command: String,
        status: i32,
        stderr: String,
    },

    #[error("failed to spawn `{command}`: {source}")]
    Spawn {
        command: String,
        source: std::io::Error,
    },
}

#[derive(Debug, Error)]
pub enum SourceError {
    #[error(transparent)]
    Command(#[from] CommandError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error(transparent)]
    Command(#[from] CommandError),

    #[error("unparsable environment line from version manager: {0:?}")]
    MalformedEnv(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Error)]
pub enum HostError {
    #[error(transparent)]
    Command(#[from] CommandError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Source-control fetch and checkout.
#[async_trait]
pub trait SourceControl: Send + Sync {
    /// Refresh the locally cached copy of the repository under `shared`,
    /// returning the cache path.
    async fn update_cached_repo(&self, repo: &str, shared: &Path)
    -> Result<PathBuf, SourceError>;

    /// Produce the release tree at `release` from the cached checkout,
    /// positioned at `revision`.
    async fn materialize(
        &self,
        cached: &Path,
        revision: &Revision,
        release: &Path,
    ) -> Result<(), SourceError>;
}

/// Environment handle produced by binding a runtime-version specifier.
/// Carried through dependency install, migration, and asset precompilation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimeEnv {
    pub spec: VersionSpec,
    pub vars: HashMap<String, String>,
}

/// Runtime-version manager and its dependency installer.
#[async_trait]
pub trait RuntimeManager: Send + Sync {
    /// Create the isolated dependency namespace for `version`.
    async fn create_namespace(&self, version: &str, namespace: &str) -> Result<(), RuntimeError>;

    /// Bind the specifier and return its environment. Binding forces
    /// environment initialization even when nothing else will run.
    async fn bind(&self, spec: &VersionSpec) -> Result<RuntimeEnv, RuntimeError>;

    /// Path holding the namespace's dependency set, for ownership fixes.
    fn namespace_path(&self, spec: &VersionSpec) -> PathBuf;

    /// Install the release's dependencies. With `offline` set the install
    /// must not touch the network and uses the vendored cache instead.
    async fn install_dependencies(
        &self,
        release: &Path,
        env: &RuntimeEnv,
        offline: bool,
    ) -> Result<(), RuntimeError>;

    /// Run a project command from the release root under the bound
    /// environment, with `vars` layered on top.
    async fn run_command(
        &self,
        release: &Path,
        env: &RuntimeEnv,
        command: &str,
        vars: &HashMap<String, String>,
    ) -> Result<(), RuntimeError>;
}

/// Host-level operations: ownership and the process supervisor.
#[async_trait]
pub trait HostOps: Send + Sync {
    async fn chown_recursive(&self, path: &Path, user: &str) -> Result<(), HostError>;

    async fn restart(&self, release: &Path) -> Result<(), HostError>;
}

/// Payload of the best-effort deploy notification.
#[derive(Debug, Clone)]
pub struct DeployNotice {
    pub revision: String,
    pub repo: String,
    pub environment: String,
    pub user: String,
}

/// External error-reporting/notification service. Failures are telemetry
/// loss, never a deployment gate.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, notice: &DeployNotice) -> Result<(), HostError>;
}

/// Release retention cleanup, run at the tail of a successful deploy.
#[async_trait]
pub trait Retention: Send + Sync {
    async fn cleanup(&self, repo: &ReleaseRepository) -> Result<(), HostError>;
}

/// The full set of collaborators a deployment runs against.
pub struct Collaborators {
    pub source: Box<dyn SourceControl>,
    pub runtime: Box<dyn RuntimeManager>,
    pub host: Box<dyn HostOps>,
    pub notifier: Box<dyn Notifier>,
    pub retention: Box<dyn Retention>,
}
