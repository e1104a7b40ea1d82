// ABOUTME: Shared helper for running external commands with captured output.
// ABOUTME: Maps non-zero exits and spawn failures into CommandError.

use crate::collab::CommandError;
use std::process::{Output, Stdio};
use tokio::process::Command;

/// Run `cmd`, capturing output. `rendered` is the human-readable command
/// line used in errors and logs.
pub(crate) async fn run_checked(mut cmd: Command, rendered: &str) -> Result<Output, CommandError> {
    tracing::debug!(command = rendered, "running command");

    let output = cmd
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()
        .await
        .map_err(|source| CommandError::Spawn {
            command: rendered.to_string(),
            source,
        })?;

    if !output.status.success() {
        return Err(CommandError::Failed {
            command: rendered.to_string(),
            status: output.status.code().unwrap_or(-1),
            stderr: String::from_utf8_lossy(&output.stderr).trim_end().to_string(),
        });
    }

    Ok(output)
}
