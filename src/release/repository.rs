// ABOUTME: ReleaseRepository - layout, current-pointer, and marker operations.
// ABOUTME: The current pointer is replaced atomically via symlink-then-rename.

use crate::types::{Revision, VersionSpec, VersionSpecError};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Marker file recording the runtime-version specifier a release was built
/// against, one line, written by the pipeline and read by the decision logic.
pub const MARKER_FILENAME: &str = ".runtime-version";

const RELEASES_DIR: &str = "releases";
const SHARED_DIR: &str = "shared";
const CURRENT_LINK: &str = "current";
const CURRENT_STAGING: &str = "current.new";

#[derive(Debug, Error)]
pub enum ReleaseError {
    /// The current pointer references a release directory that does not exist.
    #[error("current pointer references missing release: {0}")]
    DanglingCurrent(PathBuf),

    #[error("runtime-version marker missing in {0}")]
    MarkerMissing(PathBuf),

    #[error("invalid runtime-version marker in {path}: {source}")]
    MarkerInvalid {
        path: PathBuf,
        source: VersionSpecError,
    },

    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        source: io::Error,
    },
}

impl ReleaseError {
    fn io(path: &Path, source: io::Error) -> Self {
        ReleaseError::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// Filesystem view of one deploy target:
///
/// ```text
/// <deploy_to>/releases/<revision>/   one directory per release
/// <deploy_to>/current                symlink to the live release
/// <deploy_to>/shared/                cross-release persistent storage
/// ```
#[derive(Debug, Clone)]
pub struct ReleaseRepository {
    deploy_to: PathBuf,
}

impl ReleaseRepository {
    pub fn new(deploy_to: impl Into<PathBuf>) -> Self {
        Self {
            deploy_to: deploy_to.into(),
        }
    }

    pub fn deploy_to(&self) -> &Path {
        &self.deploy_to
    }

    pub fn releases_dir(&self) -> PathBuf {
        self.deploy_to.join(RELEASES_DIR)
    }

    pub fn shared_dir(&self) -> PathBuf {
        self.deploy_to.join(SHARED_DIR)
    }

    pub fn current_link(&self) -> PathBuf {
        self.deploy_to.join(CURRENT_LINK)
    }

    pub fn release_path(&self, revision: &Revision) -> PathBuf {
        self.releases_dir().join(revision.as_str())
    }

    pub fn release_exists(&self, revision: &Revision) -> bool {
        self.release_path(revision).is_dir()
    }

    /// Create the directory structure the pipeline relies on.
    pub fn ensure_layout(&self) -> Result<(), ReleaseError> {
        for dir in [
            self.deploy_to.clone(),
            self.releases_dir(),
            self.shared_dir(),
            self.shared_dir().join("config"),
        ] {
            fs::create_dir_all(&dir).map_err(|e| ReleaseError::io(&dir, e))?;
        }
        Ok(())
    }

    /// The release the current pointer resolves to, or `None` when no release
    /// is live. A pointer at a missing directory is an inconsistency and is
    /// reported, never treated as "nothing deployed".
    pub fn current(&self) -> Result<Option<PathBuf>, ReleaseError> {
        let link = self.current_link();
        let target = match fs::read_link(&link) {
            Ok(target) => target,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(ReleaseError::io(&link, e)),
        };

        let resolved = if target.is_absolute() {
            target
        } else {
            self.deploy_to.join(target)
        };

        if !resolved.is_dir() {
            return Err(ReleaseError::DanglingCurrent(resolved));
        }

        Ok(Some(resolved))
    }

    /// Atomically repoint `current` at `release`.
    ///
    /// A staging symlink is created and renamed over the pointer, so an
    /// observer sees either the old target or the new one, never a missing
    /// or half-written pointer.
    pub fn set_current(&self, release: &Path) -> Result<(), ReleaseError> {
        let staging = self.deploy_to.join(CURRENT_STAGING);

        match fs::remove_file(&staging) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => return Err(ReleaseError::io(&staging, e)),
        }

        std::os::unix::fs::symlink(release, &staging)
            .map_err(|e| ReleaseError::io(&staging, e))?;

        let link = self.current_link();
        fs::rename(&staging, &link).map_err(|e| ReleaseError::io(&link, e))
    }

    /// Remove the current pointer. Used only by rollback when no release was
    /// live before the failed attempt.
    pub fn clear_current(&self) -> Result<(), ReleaseError> {
        let link = self.current_link();
        match fs::remove_file(&link) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(ReleaseError::io(&link, e)),
        }
    }

    /// On-disk releases, oldest first. Ties on modification time are broken
    /// by name so the order is stable.
    pub fn releases(&self) -> Result<Vec<PathBuf>, ReleaseError> {
        let dir = self.releases_dir();
        let entries = match fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(ReleaseError::io(&dir, e)),
        };

        let mut releases = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| ReleaseError::io(&dir, e))?;
            let path = entry.path();
            if !path.is_dir() {
                continue;
            }
            let modified = entry
                .metadata()
                .and_then(|m| m.modified())
                .map_err(|e| ReleaseError::io(&path, e))?;
            releases.push((modified, path));
        }

        releases.sort_by(|a, b| a.0.cmp(&b.0).then_with(|| a.1.cmp(&b.1)));
        Ok(releases.into_iter().map(|(_, path)| path).collect())
    }

    pub fn write_marker(&self, release: &Path, spec: &VersionSpec) -> Result<(), ReleaseError> {
        let path = release.join(MARKER_FILENAME);
        fs::write(&path, format!("{}\n", spec.marker_line()))
            .map_err(|e| ReleaseError::io(&path, e))
    }

    /// Read the runtime-version specifier recorded in a release. A missing or
    /// unparsable marker is an error; callers decide whether that means
    /// "mismatch" (decision logic) or "inconsistent state" (status reporting).
    pub fn recorded_version(&self, release: &Path) -> Result<VersionSpec, ReleaseError> {
        let path = release.join(MARKER_FILENAME);
        let line = match fs::read_to_string(&path) {
            Ok(line) => line,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(ReleaseError::MarkerMissing(release.to_path_buf()));
            }
            Err(e) => return Err(ReleaseError::io(&path, e)),
        };

        VersionSpec::from_marker(&line).map_err(|source| ReleaseError::MarkerInvalid {
            path,
            source,
        })
    }

    /// Whether the release ships a vendored dependency cache, enabling an
    /// offline dependency install.
    pub fn has_vendored_cache(&self, release: &Path) -> bool {
        release.join("vendor").join("cache").is_dir()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn repo() -> (tempfile::TempDir, ReleaseRepository) {
        let dir = tempfile::tempdir().unwrap();
        let repo = ReleaseRepository::new(dir.path());
        repo.ensure_layout().unwrap();
        (dir, repo)
    }

    fn make_release(repo: &ReleaseRepository, rev: &str) -> PathBuf {
        let path = repo.release_path(&Revision::new(rev).unwrap());
        fs::create_dir_all(&path).unwrap();
        path
    }

    #[test]
    fn layout_paths() {
        let repo = ReleaseRepository::new("/srv/app");
        assert_eq!(repo.releases_dir(), PathBuf::from("/srv/app/releases"));
        assert_eq!(repo.current_link(), PathBuf::from("/srv/app/current"));
        assert_eq!(
            repo.release_path(&Revision::new("abc").unwrap()),
            PathBuf::from("/srv/app/releases/abc")
        );
    }

    #[test]
    fn current_is_none_before_first_deploy() {
        let (_dir, repo) = repo();
        assert_eq!(repo.current().unwrap(), None);
    }

    #[test]
    fn set_current_replaces_existing_pointer() {
        let (_dir, repo) = repo();
        let r1 = make_release(&repo, "r1");
        let r2 = make_release(&repo, "r2");

        repo.set_current(&r1).unwrap();
        assert_eq!(repo.current().unwrap(), Some(r1));

        repo.set_current(&r2).unwrap();
        assert_eq!(repo.current().unwrap(), Some(r2));
    }

    #[test]
    fn dangling_pointer_is_reported_not_ignored() {
        let (_dir, repo) = repo();
        let r1 = make_release(&repo, "r1");
        repo.set_current(&r1).unwrap();
        fs::remove_dir_all(&r1).unwrap();

        assert!(matches!(
            repo.current(),
            Err(ReleaseError::DanglingCurrent(_))
        ));
    }

    #[test]
    fn clear_current_is_idempotent() {
        let (_dir, repo) = repo();
        let r1 = make_release(&repo, "r1");
        repo.set_current(&r1).unwrap();

        repo.clear_current().unwrap();
        repo.clear_current().unwrap();
        assert_eq!(repo.current().unwrap(), None);
    }

    #[test]
    fn marker_round_trip() {
        let (_dir, repo) = repo();
        let r1 = make_release(&repo, "r1");
        let spec = VersionSpec::parse("3.2.0@app").unwrap();

        repo.write_marker(&r1, &spec).unwrap();
        assert_eq!(repo.recorded_version(&r1).unwrap(), spec);
    }

    #[test]
    fn missing_marker_is_an_error() {
        let (_dir, repo) = repo();
        let r1 = make_release(&repo, "r1");
        assert!(matches!(
            repo.recorded_version(&r1),
            Err(ReleaseError::MarkerMissing(_))
        ));
    }

    #[test]
    fn garbage_marker_is_an_error() {
        let (_dir, repo) = repo();
        let r1 = make_release(&repo, "r1");
        fs::write(r1.join(MARKER_FILENAME), "not a marker\n").unwrap();
        assert!(matches!(
            repo.recorded_version(&r1),
            Err(ReleaseError::MarkerInvalid { .. })
        ));
    }

    #[test]
    fn releases_listed_oldest_first() {
        let (_dir, repo) = repo();
        let r1 = make_release(&repo, "r1");
        let r2 = make_release(&repo, "r2");

        assert_eq!(repo.releases().unwrap(), vec![r1, r2]);
    }

    #[test]
    fn releases_empty_when_dir_missing() {
        let dir = tempfile::tempdir().unwrap();
        let repo = ReleaseRepository::new(dir.path().join("nonexistent"));
        assert!(repo.releases().unwrap().is_empty());
    }

    #[test]
    fn vendored_cache_detection() {
        let (_dir, repo) = repo();
        let r1 = make_release(&repo, "r1");
        assert!(!repo.has_vendored_cache(&r1));

        fs::create_dir_all(r1.join("vendor").join("cache")).unwrap();
        assert!(repo.has_vendored_cache(&r1));
    }
}
