// ABOUTME: Hook system for the pipeline's named extension points.
// ABOUTME: Ordered lists of handlers run at each point; scripts via ShellHook.

use crate::config::HookScripts;
use async_trait::async_trait;
use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;
use std::process::Stdio;
use tokio::process::Command;

/// Extension points at fixed positions in the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HookPoint {
    /// After dependency install, before the migration phase.
    BeforeMigrate,
    /// After provisioning, immediately before cutover.
    BeforeSymlink,
    /// After cutover, before the process restart.
    BeforeRestart,
    /// After the restart and the deploy notification.
    AfterRestart,
}

impl HookPoint {
    pub fn name(&self) -> &'static str {
        match self {
            HookPoint::BeforeMigrate => "before_migrate",
            HookPoint::BeforeSymlink => "before_symlink",
            HookPoint::BeforeRestart => "before_restart",
            HookPoint::AfterRestart => "after_restart",
        }
    }
}

impl fmt::Display for HookPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Context passed to hooks; exported to scripts as environment variables.
#[derive(Debug, Clone)]
pub struct HookContext {
    pub release_path: PathBuf,
    pub shared_path: PathBuf,
    pub revision: String,
    pub environment: HashMap<String, String>,
}

impl HookContext {
    pub fn to_env(&self) -> HashMap<String, String> {
        let mut env = self.environment.clone();
        env.insert(
            "CUTOVER_RELEASE_PATH".to_string(),
            self.release_path.display().to_string(),
        );
        env.insert(
            "CUTOVER_SHARED_PATH".to_string(),
            self.shared_path.display().to_string(),
        );
        env.insert("CUTOVER_REVISION".to_string(), self.revision.clone());
        env
    }
}

#[derive(Debug, thiserror::Error)]
pub enum HookError {
    #[error("hook `{name}` exited with status {status}: {stderr}")]
    Failed {
        name: String,
        status: i32,
        stderr: String,
    },

    #[error("failed to execute hook `{name}`: {source}")]
    Io {
        name: String,
        source: std::io::Error,
    },
}

/// One invocable handler bound to an extension point.
#[async_trait]
pub trait Hook: Send + Sync {
    fn name(&self) -> &str;

    async fn run(&self, ctx: &HookContext) -> Result<(), HookError>;
}

/// Hook that executes an external script with the context in its environment.
pub struct ShellHook {
    name: String,
    script: PathBuf,
}

impl ShellHook {
    pub fn new(script: impl Into<PathBuf>) -> Self {
        let script = script.into();
        let name = script
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| script.display().to_string());
        Self { name, script }
    }
}

#[async_trait]
impl Hook for ShellHook {
    fn name(&self) -> &str {
        &self.name
    }

    async fn run(&self, ctx: &HookContext) -> Result<(), HookError> {
        let output = Command::new(&self.script)
            .envs(ctx.to_env())
            .current_dir(&ctx.release_path)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|source| HookError::Io {
                name: self.name.clone(),
                source,
            })?;

        if !output.status.success() {
            return Err(HookError::Failed {
                name: self.name.clone(),
                status: output.status.code().unwrap_or(-1),
                stderr: String::from_utf8_lossy(&output.stderr).trim_end().to_string(),
            });
        }

        Ok(())
    }
}

/// Zero or more handlers per extension point, invoked in registration order.
#[derive(Default)]
pub struct HookRegistry {
    handlers: HashMap<HookPoint, Vec<Box<dyn Hook>>>,
}

impl HookRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a registry from configured hook script lists.
    pub fn from_scripts(scripts: &HookScripts) -> Self {
        let mut registry = Self::new();
        let points = [
            (HookPoint::BeforeMigrate, &scripts.before_migrate),
            (HookPoint::BeforeSymlink, &scripts.before_symlink),
            (HookPoint::BeforeRestart, &scripts.before_restart),
            (HookPoint::AfterRestart, &scripts.after_restart),
        ];
        for (point, scripts) in points {
            for script in scripts {
                registry.register(point, Box::new(ShellHook::new(script)));
            }
        }
        registry
    }

    pub fn register(&mut self, point: HookPoint, hook: Box<dyn Hook>) {
        self.handlers.entry(point).or_default().push(hook);
    }

    pub fn is_empty(&self, point: HookPoint) -> bool {
        self.handlers.get(&point).is_none_or(Vec::is_empty)
    }

    /// Run every handler bound to `point`, in order, stopping at the first
    /// failure.
    pub async fn run_all(&self, point: HookPoint, ctx: &HookContext) -> Result<(), HookError> {
        let Some(hooks) = self.handlers.get(&point) else {
            return Ok(());
        };

        for hook in hooks {
            tracing::info!(hook = hook.name(), point = %point, "running hook");
            hook.run(ctx).await?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    struct Recorder {
        name: String,
        log: Arc<Mutex<Vec<String>>>,
        fail: bool,
    }

    #[async_trait]
    impl Hook for Recorder {
        fn name(&self) -> &str {
            &self.name
        }

        async fn run(&self, _ctx: &HookContext) -> Result<(), HookError> {
            self.log.lock().unwrap().push(self.name.clone());
            if self.fail {
                return Err(HookError::Failed {
                    name: self.name.clone(),
                    status: 1,
                    stderr: String::new(),
                });
            }
            Ok(())
        }
    }

    fn ctx() -> HookContext {
        HookContext {
            release_path: PathBuf::from("/srv/app/releases/r1"),
            shared_path: PathBuf::from("/srv/app/shared"),
            revision: "r1".to_string(),
            environment: HashMap::from([("APP_ENV".to_string(), "staging".to_string())]),
        }
    }

    fn recorder(log: &Arc<Mutex<Vec<String>>>, name: &str, fail: bool) -> Box<dyn Hook> {
        Box::new(Recorder {
            name: name.to_string(),
            log: Arc::clone(log),
            fail,
        })
    }

    #[test]
    fn hook_point_names() {
        assert_eq!(HookPoint::BeforeMigrate.name(), "before_migrate");
        assert_eq!(HookPoint::AfterRestart.name(), "after_restart");
    }

    #[test]
    fn context_env_includes_deploy_details() {
        let env = ctx().to_env();
        assert_eq!(
            env.get("CUTOVER_RELEASE_PATH"),
            Some(&"/srv/app/releases/r1".to_string())
        );
        assert_eq!(env.get("CUTOVER_REVISION"), Some(&"r1".to_string()));
        assert_eq!(env.get("APP_ENV"), Some(&"staging".to_string()));
    }

    #[tokio::test]
    async fn handlers_run_in_registration_order() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut registry = HookRegistry::new();
        registry.register(HookPoint::BeforeMigrate, recorder(&log, "first", false));
        registry.register(HookPoint::BeforeMigrate, recorder(&log, "second", false));
        registry.register(HookPoint::AfterRestart, recorder(&log, "other", false));

        registry
            .run_all(HookPoint::BeforeMigrate, &ctx())
            .await
            .unwrap();

        assert_eq!(*log.lock().unwrap(), vec!["first", "second"]);
    }

    #[tokio::test]
    async fn failure_stops_remaining_handlers() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut registry = HookRegistry::new();
        registry.register(HookPoint::BeforeRestart, recorder(&log, "boom", true));
        registry.register(HookPoint::BeforeRestart, recorder(&log, "after", false));

        let result = registry.run_all(HookPoint::BeforeRestart, &ctx()).await;

        assert!(matches!(result, Err(HookError::Failed { .. })));
        assert_eq!(*log.lock().unwrap(), vec!["boom"]);
    }

    #[tokio::test]
    async fn unbound_point_is_a_no_op() {
        let registry = HookRegistry::new();
        registry
            .run_all(HookPoint::BeforeSymlink, &ctx())
            .await
            .unwrap();
        assert!(registry.is_empty(HookPoint::BeforeSymlink));
    }
}
