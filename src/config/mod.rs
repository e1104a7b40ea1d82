// ABOUTME: Configuration types and parsing for cutover.yml.
// ABOUTME: Describes one deployment target: where, what revision, which runtime.

use crate::error::{Error, Result};
use crate::types::{Revision, VersionSpec};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

pub const CONFIG_FILENAME: &str = "cutover.yml";
pub const CONFIG_FILENAME_ALT: &str = "cutover.yaml";
pub const CONFIG_FILENAME_DIR: &str = ".cutover/config.yml";

/// Environment-map key naming the runtime environment, used to parameterize
/// the deploy notification.
pub const ENVIRONMENT_NAME_KEY: &str = "APP_ENV";

const DEFAULT_ENVIRONMENT_NAME: &str = "production";

/// The deployment target: immutable for the duration of one invocation.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Root of the deploy tree (`releases/`, `current`, `shared/`).
    pub deploy_to: PathBuf,

    /// Source repository location, handed to the source-control collaborator.
    pub repo: String,

    #[serde(deserialize_with = "deserialize_revision")]
    pub revision: Revision,

    /// Desired runtime-version specifier, `<version>[@<namespace>]`.
    #[serde(rename = "runtime", deserialize_with = "deserialize_version_spec")]
    pub runtime: VersionSpec,

    /// Owner of the deploy tree and of any provisioned namespace.
    pub user: String,

    #[serde(default)]
    pub environment: HashMap<String, String>,

    #[serde(default = "default_true")]
    pub migrate: bool,

    #[serde(default = "default_migration_command")]
    pub migration_command: String,

    #[serde(default = "default_true")]
    pub precompile_assets: bool,

    #[serde(default = "default_precompile_command")]
    pub precompile_command: String,

    /// Entries linked from `shared/` into the release before migration runs,
    /// keyed by shared-relative path, valued by release-relative path.
    #[serde(default)]
    pub symlinks_before_migrate: HashMap<String, String>,

    #[serde(default)]
    pub hooks: HookScripts,

    /// Version-manager CLI binary invoked for namespace/bind/install work.
    #[serde(default = "default_version_manager")]
    pub version_manager: String,

    /// Root path of the version manager, used to compute the namespace
    /// ownership path. Threaded explicitly rather than looked up ambiently.
    #[serde(default = "default_runtime_root")]
    pub runtime_root: PathBuf,

    /// Command that restarts the application process, run from the release.
    #[serde(default)]
    pub restart_command: Option<String>,

    /// Best-effort deploy notification command; failures never gate a deploy.
    #[serde(default)]
    pub notify_command: Option<String>,

    /// Number of newest releases kept by retention cleanup.
    #[serde(default = "default_keep_releases")]
    pub keep_releases: usize,
}

/// Hook scripts bound to the named pipeline extension points, in order.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct HookScripts {
    #[serde(default)]
    pub before_migrate: Vec<PathBuf>,

    #[serde(default)]
    pub before_symlink: Vec<PathBuf>,

    #[serde(default)]
    pub before_restart: Vec<PathBuf>,

    #[serde(default)]
    pub after_restart: Vec<PathBuf>,
}

fn default_true() -> bool {
    true
}

fn default_migration_command() -> String {
    "bin/migrate".to_string()
}

fn default_precompile_command() -> String {
    "bin/precompile-assets".to_string()
}

fn default_version_manager() -> String {
    "rvm".to_string()
}

fn default_runtime_root() -> PathBuf {
    PathBuf::from("/usr/local/rvm")
}

fn default_keep_releases() -> usize {
    5
}

impl Config {
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        serde_yaml::from_str(yaml).map_err(Error::from)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    pub fn discover(dir: &Path) -> Result<Self> {
        let candidates = [
            dir.join(CONFIG_FILENAME),
            dir.join(CONFIG_FILENAME_ALT),
            dir.join(CONFIG_FILENAME_DIR),
        ];

        for path in &candidates {
            if path.exists() {
                return Self::load(path);
            }
        }

        Err(Error::ConfigNotFound(dir.to_path_buf()))
    }

    /// Name of the runtime environment for notifications, read from the
    /// conventional environment-map entry.
    pub fn environment_name(&self) -> &str {
        self.environment
            .get(ENVIRONMENT_NAME_KEY)
            .map(String::as_str)
            .unwrap_or(DEFAULT_ENVIRONMENT_NAME)
    }

    pub fn template() -> Self {
        Config {
            deploy_to: PathBuf::from("/srv/my-app"),
            repo: "git@example.com:org/my-app.git".to_string(),
            revision: Revision::new("main").unwrap(),
            runtime: VersionSpec::parse("3.2.0@my-app").unwrap(),
            user: "deploy".to_string(),
            environment: HashMap::new(),
            migrate: true,
            migration_command: default_migration_command(),
            precompile_assets: true,
            precompile_command: default_precompile_command(),
            symlinks_before_migrate: HashMap::new(),
            hooks: HookScripts::default(),
            version_manager: default_version_manager(),
            runtime_root: default_runtime_root(),
            restart_command: None,
            notify_command: None,
            keep_releases: default_keep_releases(),
        }
    }
}

pub fn init_config(dir: &Path, force: bool) -> Result<()> {
    let config_path = dir.join(CONFIG_FILENAME);

    if config_path.exists() && !force {
        return Err(Error::AlreadyExists(config_path));
    }

    let config = Config::template();
    std::fs::write(&config_path, generate_template_yaml(&config))?;

    Ok(())
}

fn generate_template_yaml(config: &Config) -> String {
    format!(
        r#"deploy_to: {}
repo: {}
revision: {}
runtime: "{}"
user: {}
migrate: true
migration_command: {}
precompile_assets: true
environment:
  APP_ENV: production
"#,
        config.deploy_to.display(),
        config.repo,
        config.revision,
        config.runtime,
        config.user,
        config.migration_command,
    )
}

// Custom deserializers

fn deserialize_revision<'de, D>(deserializer: D) -> std::result::Result<Revision, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    Revision::new(&s).map_err(serde::de::Error::custom)
}

fn deserialize_version_spec<'de, D>(deserializer: D) -> std::result::Result<VersionSpec, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    VersionSpec::parse(&s).map_err(serde::de::Error::custom)
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r#"
deploy_to: /srv/app
repo: git@example.com:org/app.git
revision: 4a1f9c0d
runtime: "3.2.0@app"
user: deploy
"#;

    #[test]
    fn parses_minimal_config_with_defaults() {
        let config = Config::from_yaml(MINIMAL).unwrap();

        assert_eq!(config.deploy_to, PathBuf::from("/srv/app"));
        assert_eq!(config.revision.as_str(), "4a1f9c0d");
        assert_eq!(config.runtime.version(), "3.2.0");
        assert_eq!(config.runtime.namespace(), Some("app"));
        assert!(config.migrate);
        assert!(config.precompile_assets);
        assert_eq!(config.keep_releases, 5);
        assert!(config.restart_command.is_none());
    }

    #[test]
    fn rejects_invalid_revision() {
        let yaml = MINIMAL.replace("4a1f9c0d", "../escape");
        assert!(Config::from_yaml(&yaml).is_err());
    }

    #[test]
    fn rejects_invalid_runtime_spec() {
        let yaml = MINIMAL.replace("3.2.0@app", "@app");
        assert!(Config::from_yaml(&yaml).is_err());
    }

    #[test]
    fn environment_name_defaults_to_production() {
        let config = Config::from_yaml(MINIMAL).unwrap();
        assert_eq!(config.environment_name(), "production");
    }

    #[test]
    fn environment_name_reads_conventional_key() {
        let yaml = format!("{MINIMAL}environment:\n  APP_ENV: staging\n");
        let config = Config::from_yaml(&yaml).unwrap();
        assert_eq!(config.environment_name(), "staging");
    }

    #[test]
    fn parses_hook_script_lists() {
        let yaml = format!(
            "{MINIMAL}hooks:\n  before_migrate:\n    - deploy/seed.sh\n    - deploy/warm.sh\n"
        );
        let config = Config::from_yaml(&yaml).unwrap();
        assert_eq!(config.hooks.before_migrate.len(), 2);
        assert!(config.hooks.after_restart.is_empty());
    }

    #[test]
    fn discover_finds_dotdir_config() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join(".cutover")).unwrap();
        std::fs::write(dir.path().join(CONFIG_FILENAME_DIR), MINIMAL).unwrap();

        let config = Config::discover(dir.path()).unwrap();
        assert_eq!(config.user, "deploy");
    }

    #[test]
    fn discover_reports_missing_config() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            Config::discover(dir.path()),
            Err(Error::ConfigNotFound(_))
        ));
    }

    #[test]
    fn init_refuses_to_clobber_without_force() {
        let dir = tempfile::tempdir().unwrap();
        init_config(dir.path(), false).unwrap();
        assert!(matches!(
            init_config(dir.path(), false),
            Err(Error::AlreadyExists(_))
        ));
        init_config(dir.path(), true).unwrap();
    }

    #[test]
    fn template_yaml_round_trips() {
        let yaml = generate_template_yaml(&Config::template());
        let config = Config::from_yaml(&yaml).unwrap();
        assert_eq!(config.runtime.namespace(), Some("my-app"));
    }
}
