// ABOUTME: RuntimeManager implementation wrapping an rvm-style CLI.
// ABOUTME: Binding captures `<bin> env <spec>` output as the step environment.

use super::exec::run_checked;
use crate::collab::{RuntimeEnv, RuntimeError, RuntimeManager};
use crate::types::VersionSpec;
use async_trait::async_trait;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tokio::process::Command;

const DEFAULT_INSTALL_COMMAND: &str = "bundle install";

/// Wraps a version-manager binary (`rvm` in the reference setup). The manager
/// is expected to support `namespace create <version> <namespace>` and
/// `env <spec>` (printing `KEY=VALUE` lines for the bound environment).
pub struct VersionManagerCli {
    binary: String,
    root: PathBuf,
    install_command: String,
}

impl VersionManagerCli {
    pub fn new(binary: impl Into<String>, root: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
            root: root.into(),
            install_command: DEFAULT_INSTALL_COMMAND.to_string(),
        }
    }

    pub fn with_install_command(mut self, command: impl Into<String>) -> Self {
        self.install_command = command.into();
        self
    }

    async fn shell(
        &self,
        release: &Path,
        env: &RuntimeEnv,
        command: &str,
        vars: &HashMap<String, String>,
    ) -> Result<(), RuntimeError> {
        let mut cmd = Command::new("sh");
        cmd.arg("-c")
            .arg(command)
            .current_dir(release)
            .envs(&env.vars)
            .envs(vars);
        run_checked(cmd, command).await?;
        Ok(())
    }
}

/// Parse the `KEY=VALUE` lines printed by `<bin> env <spec>`.
fn parse_env_output(output: &str) -> Result<HashMap<String, String>, RuntimeError> {
    let mut vars = HashMap::new();
    for line in output.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let (key, value) = line
            .split_once('=')
            .ok_or_else(|| RuntimeError::MalformedEnv(line.to_string()))?;
        vars.insert(key.to_string(), value.to_string());
    }
    Ok(vars)
}

#[async_trait]
impl RuntimeManager for VersionManagerCli {
    async fn create_namespace(&self, version: &str, namespace: &str) -> Result<(), RuntimeError> {
        let mut cmd = Command::new(&self.binary);
        cmd.args(["namespace", "create", version, namespace]);
        run_checked(
            cmd,
            &format!("{} namespace create {} {}", self.binary, version, namespace),
        )
        .await?;
        Ok(())
    }

    async fn bind(&self, spec: &VersionSpec) -> Result<RuntimeEnv, RuntimeError> {
        let mut cmd = Command::new(&self.binary);
        cmd.args(["env", &spec.to_string()]);
        let output = run_checked(cmd, &format!("{} env {}", self.binary, spec)).await?;

        let vars = parse_env_output(&String::from_utf8_lossy(&output.stdout))?;
        Ok(RuntimeEnv {
            spec: spec.clone(),
            vars,
        })
    }

    fn namespace_path(&self, spec: &VersionSpec) -> PathBuf {
        self.root.join("deps").join(spec.to_string())
    }

    async fn install_dependencies(
        &self,
        release: &Path,
        env: &RuntimeEnv,
        offline: bool,
    ) -> Result<(), RuntimeError> {
        let command = if offline {
            format!("{} --local", self.install_command)
        } else {
            self.install_command.clone()
        };
        self.shell(release, env, &command, &HashMap::new()).await
    }

    async fn run_command(
        &self,
        release: &Path,
        env: &RuntimeEnv,
        command: &str,
        vars: &HashMap<String, String>,
    ) -> Result<(), RuntimeError> {
        self.shell(release, env, command, vars).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_env_lines() {
        let vars = parse_env_output("PATH=/opt/runtime/bin\nDEPS_HOME=/opt/deps\n\n").unwrap();
        assert_eq!(vars.get("PATH"), Some(&"/opt/runtime/bin".to_string()));
        assert_eq!(vars.get("DEPS_HOME"), Some(&"/opt/deps".to_string()));
    }

    #[test]
    fn rejects_lines_without_separator() {
        assert!(matches!(
            parse_env_output("not-an-assignment"),
            Err(RuntimeError::MalformedEnv(_))
        ));
    }

    #[test]
    fn namespace_path_is_under_configured_root() {
        let manager = VersionManagerCli::new("rvm", "/usr/local/rvm");
        let spec = VersionSpec::parse("3.2.0@app").unwrap();
        assert_eq!(
            manager.namespace_path(&spec),
            PathBuf::from("/usr/local/rvm/deps/3.2.0@app")
        );
    }
}
