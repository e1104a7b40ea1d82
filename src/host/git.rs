// ABOUTME: SourceControl implementation backed by the git CLI.
// ABOUTME: Keeps a mirror clone under shared/ and clones releases from it.

use super::exec::run_checked;
use crate::collab::{SourceControl, SourceError};
use crate::types::Revision;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::process::Command;

/// Directory under `shared/` holding the mirror clone.
const CACHED_COPY: &str = "cached-copy";

#[derive(Debug, Default)]
pub struct GitSource;

impl GitSource {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl SourceControl for GitSource {
    async fn update_cached_repo(
        &self,
        repo: &str,
        shared: &Path,
    ) -> Result<PathBuf, SourceError> {
        let cached = shared.join(CACHED_COPY);

        if cached.is_dir() {
            let mut cmd = Command::new("git");
            cmd.arg("-C").arg(&cached).args(["fetch", "--prune"]);
            run_checked(cmd, &format!("git -C {} fetch --prune", cached.display())).await?;
        } else {
            let mut cmd = Command::new("git");
            cmd.args(["clone", "--mirror", repo]).arg(&cached);
            run_checked(
                cmd,
                &format!("git clone --mirror {} {}", repo, cached.display()),
            )
            .await?;
        }

        Ok(cached)
    }

    async fn materialize(
        &self,
        cached: &Path,
        revision: &Revision,
        release: &Path,
    ) -> Result<(), SourceError> {
        let mut clone = Command::new("git");
        clone.arg("clone").arg(cached).arg(release);
        run_checked(
            clone,
            &format!("git clone {} {}", cached.display(), release.display()),
        )
        .await?;

        let mut checkout = Command::new("git");
        checkout
            .arg("-C")
            .arg(release)
            .args(["checkout", "--detach", revision.as_str()]);
        run_checked(
            checkout,
            &format!(
                "git -C {} checkout --detach {}",
                release.display(),
                revision
            ),
        )
        .await?;

        Ok(())
    }
}
