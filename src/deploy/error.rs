// ABOUTME: Error types for deployment orchestration.
// ABOUTME: Step failures carry the originating step; lock and state errors too.

use super::step::Step;
use crate::collab::{HostError, RuntimeError, SourceError};
use crate::hooks::HookError;
use crate::release::ReleaseError;
use chrono::{DateTime, Utc};
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DeployError {
    /// A pipeline step failed. The attempt has already been rolled back by
    /// the time this reaches the caller.
    #[error("step `{step}` failed: {source}")]
    Step {
        step: Step,
        #[source]
        source: StepError,
    },

    /// On-disk state contradicts itself (dangling pointer, broken marker)
    /// outside of a running pipeline step.
    #[error("inconsistent deploy state: {0}")]
    Inconsistent(#[from] ReleaseError),

    #[error("deploy lock held by {holder} (pid {pid}) since {since}")]
    LockHeld {
        holder: String,
        pid: u32,
        since: DateTime<Utc>,
    },

    #[error("failed to manage deploy lock: {0}")]
    Lock(String),

    #[error("no previous release to roll back to")]
    NoPreviousRelease,

    #[error("release directory not found: {0}")]
    MissingRelease(PathBuf),
}

/// Cause of a single step's failure, by collaborator domain.
#[derive(Debug, Error)]
pub enum StepError {
    #[error(transparent)]
    Source(#[from] SourceError),

    #[error(transparent)]
    Runtime(#[from] RuntimeError),

    #[error(transparent)]
    Host(#[from] HostError),

    #[error(transparent)]
    Hook(#[from] HookError),

    #[error(transparent)]
    Release(#[from] ReleaseError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
