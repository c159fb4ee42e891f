//! Command runner - runs an external tool with a time budget

use std::process::Stdio;
use std::time::Duration;
use themer_common::{ThemerError, ThemerResult};
use tokio::process::Command;
use tracing::debug;

/// Captured result of a finished command
#[derive(Debug, Clone)]
pub struct CommandOutput {
    pub success: bool,
    pub code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

/// Run `program args..` and wait at most `timeout` for it.
///
/// The child is killed when the budget runs out. A non-zero exit is not an
/// error here; callers decide what a status means.
pub async fn run(program: &str, args: &[&str], timeout: Duration) -> ThemerResult<CommandOutput> {
    debug!("  Executing: {} {:?}", program, args);

    let child = Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .output();

    let output = tokio::time::timeout(timeout, child)
        .await
        .map_err(|_| ThemerError::Timeout {
            program: program.to_string(),
            timeout,
        })?
        .map_err(|source| ThemerError::Spawn {
            program: program.to_string(),
            source,
        })?;

    Ok(CommandOutput {
        success: output.status.success(),
        code: output.status.code(),
        stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
        stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
    })
}

/// Like [`run`], but a non-zero exit becomes [`ThemerError::CommandFailed`]
pub async fn run_checked(program: &str, args: &[&str], timeout: Duration) -> ThemerResult<String> {
    let output = run(program, args, timeout).await?;
    if !output.success {
        return Err(ThemerError::CommandFailed {
            program: program.to_string(),
            status: output
                .code
                .map(|c| format!("status {}", c))
                .unwrap_or_else(|| "signal".to_string()),
            stderr: output.stderr,
        });
    }
    Ok(output.stdout)
}
