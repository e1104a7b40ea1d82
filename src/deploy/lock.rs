// ABOUTME: Advisory deploy lock keyed by the deploy target directory.
// ABOUTME: Atomic create-new acquisition with holder info stored as JSON.

use super::error::DeployError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

const LOCK_FILENAME: &str = ".cutover.lock";

/// Information about who holds a deploy lock.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LockInfo {
    /// Hostname of the machine that holds the lock.
    pub holder: String,
    /// Process ID of the lock holder.
    pub pid: u32,
    /// When the lock was acquired.
    pub started_at: DateTime<Utc>,
}

impl LockInfo {
    pub fn new() -> Self {
        Self {
            holder: gethostname::gethostname().to_string_lossy().into_owned(),
            pid: std::process::id(),
            started_at: Utc::now(),
        }
    }

    /// Check if this lock is stale (older than 1 hour).
    pub fn is_stale(&self) -> bool {
        let age = Utc::now() - self.started_at;
        age.num_hours() >= 1
    }
}

impl Default for LockInfo {
    fn default() -> Self {
        Self::new()
    }
}

/// A held deploy lock. Serializes deployments against one target.
#[derive(Debug)]
pub struct DeployLock {
    path: PathBuf,
}

impl DeployLock {
    pub fn path_for(deploy_to: &Path) -> PathBuf {
        deploy_to.join(LOCK_FILENAME)
    }

    /// Acquire the lock for `deploy_to`.
    ///
    /// Uses `create_new` for atomic acquisition (no TOCTOU race). A stale
    /// lock (>1 hour) or a corrupted lock file is broken with a warning;
    /// `force` breaks a live lock.
    pub fn acquire(deploy_to: &Path, force: bool) -> Result<Self, DeployError> {
        std::fs::create_dir_all(deploy_to)
            .map_err(|e| DeployError::Lock(format!("cannot create {}: {e}", deploy_to.display())))?;

        let path = Self::path_for(deploy_to);
        let info = LockInfo::new();

        if Self::try_create(&path, &info)? {
            return Ok(Self { path });
        }

        if !Self::should_break(&path, force)? {
            let existing = Self::read_info(&path)?;
            return match existing {
                Some(existing) => Err(DeployError::LockHeld {
                    holder: existing.holder,
                    pid: existing.pid,
                    since: existing.started_at,
                }),
                None => Err(DeployError::Lock("lock held by another process".to_string())),
            };
        }

        tracing::debug!(path = %path.display(), "removing stale/forced lock");
        let _ = std::fs::remove_file(&path);

        if Self::try_create(&path, &info)? {
            Ok(Self { path })
        } else {
            Err(DeployError::Lock(
                "lock acquired by another process during break".to_string(),
            ))
        }
    }

    fn try_create(path: &Path, info: &LockInfo) -> Result<bool, DeployError> {
        let json = serde_json::to_vec(info)
            .map_err(|e| DeployError::Lock(format!("failed to serialize lock: {e}")))?;

        match OpenOptions::new().write(true).create_new(true).open(path) {
            Ok(mut file) => {
                file.write_all(&json)
                    .map_err(|e| DeployError::Lock(format!("failed to write lock: {e}")))?;
                Ok(true)
            }
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => Ok(false),
            Err(e) => Err(DeployError::Lock(format!("failed to acquire lock: {e}"))),
        }
    }

    fn read_info(path: &Path) -> Result<Option<LockInfo>, DeployError> {
        match std::fs::read_to_string(path) {
            Ok(content) => Ok(serde_json::from_str(&content).ok()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(DeployError::Lock(format!("failed to read lock info: {e}"))),
        }
    }

    /// Whether an existing lock should be broken (stale, forced, corrupted).
    fn should_break(path: &Path, force: bool) -> Result<bool, DeployError> {
        match Self::read_info(path)? {
            Some(existing) => {
                if force {
                    tracing::warn!(
                        holder = existing.holder,
                        pid = existing.pid,
                        since = %existing.started_at,
                        "breaking live deploy lock"
                    );
                    Ok(true)
                } else if existing.is_stale() {
                    tracing::warn!(
                        holder = existing.holder,
                        pid = existing.pid,
                        since = %existing.started_at,
                        "auto-breaking stale deploy lock"
                    );
                    Ok(true)
                } else {
                    Ok(false)
                }
            }
            None => {
                tracing::warn!("lock info unreadable, breaking lock");
                Ok(true)
            }
        }
    }

    /// Release the lock.
    pub fn release(self) {
        if let Err(e) = std::fs::remove_file(&self.path) {
            tracing::debug!(error = %e, "failed to remove lock file");
        }
    }
}
