// ABOUTME: The fixed, ordered provisioning pipeline for one release.
// ABOUTME: Steps run strictly in sequence; failure routes through rollback.

use super::error::{DeployError, StepError};
use super::rollback::RollbackGuard;
use super::step::Step;
use crate::collab::{Collaborators, DeployNotice, RuntimeEnv};
use crate::config::Config;
use crate::hooks::{HookContext, HookPoint, HookRegistry};
use crate::release::ReleaseRepository;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Shared file bootstrapping the release's load paths; linked into every
/// release before migration.
const LOAD_PATHS_FILE: &str = "config/load-paths";

fn step<T, E>(step: Step, result: Result<T, E>) -> Result<T, DeployError>
where
    E: Into<StepError>,
{
    result.map_err(|e| DeployError::Step {
        step,
        source: e.into(),
    })
}

/// Runs the provisioning sequence against a release directory.
///
/// The order is load-bearing: later steps assume filesystem and ownership
/// state established by earlier ones, so nothing here is parallelized or
/// reordered. The one asymmetry is the deploy notification, which is
/// best-effort telemetry and never aborts the deployment.
pub struct Pipeline<'a> {
    config: &'a Config,
    repo: &'a ReleaseRepository,
    collab: &'a Collaborators,
    hooks: &'a HookRegistry,
}

impl<'a> Pipeline<'a> {
    pub fn new(
        config: &'a Config,
        repo: &'a ReleaseRepository,
        collab: &'a Collaborators,
        hooks: &'a HookRegistry,
    ) -> Self {
        Self {
            config,
            repo,
            collab,
            hooks,
        }
    }

    /// Run the full sequence. With `in_place` set the target release
    /// directory already exists and is reprovisioned where it stands (no
    /// materialization); this is how runtime-version drift on the live
    /// release is corrected without duplicating it.
    pub async fn run(&self, in_place: bool) -> Result<PathBuf, DeployError> {
        let release = self.repo.release_path(&self.config.revision);
        let guard = RollbackGuard::prepare(self.repo, &release, !in_place)?;

        match self.run_steps(&release, in_place).await {
            Ok(()) => {
                tracing::info!(
                    release = %release.display(),
                    revision = %self.config.revision,
                    "deployed"
                );
                Ok(release)
            }
            Err(e) => {
                tracing::error!(error = %e, "deployment failed, rolling back");
                guard.unwind();
                Err(e)
            }
        }
    }

    async fn run_steps(&self, release: &Path, in_place: bool) -> Result<(), DeployError> {
        let cfg = self.config;
        let c = self.collab;
        let deploy_to = self.repo.deploy_to();

        step(
            Step::EnforceOwnership,
            c.host.chown_recursive(deploy_to, &cfg.user).await,
        )?;
        step(Step::VerifyDirectories, self.repo.ensure_layout())?;

        let cached = step(
            Step::UpdateCachedRepo,
            c.source
                .update_cached_repo(&cfg.repo, &self.repo.shared_dir())
                .await,
        )?;

        if !in_place {
            step(
                Step::MaterializeRelease,
                c.source.materialize(&cached, &cfg.revision, release).await,
            )?;
        }

        step(Step::WriteLoadPaths, self.write_load_paths())?;
        step(
            Step::WriteVersionMarker,
            self.repo.write_marker(release, &cfg.runtime),
        )?;

        let env = step(Step::ProvisionNamespace, self.provision_namespace().await)?;

        let offline = self.repo.has_vendored_cache(release);
        if offline {
            tracing::info!("vendored dependency cache present, installing offline");
        }
        step(
            Step::InstallDependencies,
            c.runtime.install_dependencies(release, &env, offline).await,
        )?;

        step(
            Step::EnforceOwnership,
            c.host.chown_recursive(deploy_to, &cfg.user).await,
        )?;

        let ctx = self.hook_context(release);
        step(
            Step::Hook(HookPoint::BeforeMigrate),
            self.hooks.run_all(HookPoint::BeforeMigrate, &ctx).await,
        )?;

        step(Step::SymlinksBeforeMigrate, self.link_before_migrate(release))?;
        if cfg.migrate {
            step(
                Step::EnforceOwnership,
                c.host.chown_recursive(deploy_to, &cfg.user).await,
            )?;
            step(
                Step::Migrate,
                c.runtime
                    .run_command(release, &env, &cfg.migration_command, &cfg.environment)
                    .await,
            )?;
        }

        if cfg.precompile_assets {
            step(
                Step::PrecompileAssets,
                c.runtime
                    .run_command(release, &env, &cfg.precompile_command, &cfg.environment)
                    .await,
            )?;
        }

        step(
            Step::Hook(HookPoint::BeforeSymlink),
            self.hooks.run_all(HookPoint::BeforeSymlink, &ctx).await,
        )?;

        step(Step::Cutover, self.repo.set_current(release))?;
        tracing::info!(release = %release.display(), "cutover complete");

        step(
            Step::Hook(HookPoint::BeforeRestart),
            self.hooks.run_all(HookPoint::BeforeRestart, &ctx).await,
        )?;

        step(Step::Restart, c.host.restart(release).await)?;

        // Best-effort: telemetry loss is not a deployment failure.
        let notice = DeployNotice {
            revision: cfg.revision.to_string(),
            repo: cfg.repo.clone(),
            environment: cfg.environment_name().to_string(),
            user: cfg.user.clone(),
        };
        if let Err(e) = c.notifier.notify(&notice).await {
            tracing::warn!(error = %e, "deploy notification failed, continuing");
        }

        step(
            Step::Hook(HookPoint::AfterRestart),
            self.hooks.run_all(HookPoint::AfterRestart, &ctx).await,
        )?;

        step(Step::RetentionCleanup, c.retention.cleanup(self.repo).await)?;

        Ok(())
    }

    /// Create the namespace when the specifier requests one, bind the
    /// environment (which initializes it even when nothing else runs), and
    /// hand namespace ownership to the deploy user.
    async fn provision_namespace(&self) -> Result<RuntimeEnv, StepError> {
        let spec = &self.config.runtime;

        if let Some(namespace) = spec.namespace() {
            self.collab
                .runtime
                .create_namespace(spec.version(), namespace)
                .await?;
        }

        let env = self.collab.runtime.bind(spec).await?;

        if spec.namespace().is_some() {
            let path = self.collab.runtime.namespace_path(spec);
            self.collab
                .host
                .chown_recursive(&path, &self.config.user)
                .await?;
        }

        Ok(env)
    }

    /// Write the shared load-path bootstrap file. It is linked into the
    /// release with the other before-migrate symlinks.
    fn write_load_paths(&self) -> Result<(), io::Error> {
        let path = self.repo.shared_dir().join(LOAD_PATHS_FILE);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(
            &path,
            format!(
                "# Managed by cutover; sourced before the application boots.\nruntime={}\n",
                self.config.runtime
            ),
        )
    }

    /// Link shared entries into the release before migration runs. The
    /// load-path bootstrap is always included alongside configured entries.
    fn link_before_migrate(&self, release: &Path) -> Result<(), io::Error> {
        let shared = self.repo.shared_dir();
        let load_paths = (LOAD_PATHS_FILE.to_string(), LOAD_PATHS_FILE.to_string());

        for (shared_rel, release_rel) in self
            .config
            .symlinks_before_migrate
            .iter()
            .map(|(s, r)| (s.clone(), r.clone()))
            .chain(std::iter::once(load_paths))
        {
            let target = shared.join(&shared_rel);
            let link = release.join(&release_rel);

            if let Some(parent) = link.parent() {
                fs::create_dir_all(parent)?;
            }
            match fs::remove_file(&link) {
                Ok(()) => {}
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(e) => return Err(e),
            }
            std::os::unix::fs::symlink(&target, &link)?;
        }

        Ok(())
    }

    fn hook_context(&self, release: &Path) -> HookContext {
        HookContext {
            release_path: release.to_path_buf(),
            shared_path: self.repo.shared_dir(),
            revision: self.config.revision.to_string(),
            environment: self.config.environment.clone(),
        }
    }
}
