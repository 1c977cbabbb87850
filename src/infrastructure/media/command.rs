//! Process boundary for external media tools.

use std::process::Stdio;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::debug;

use super::error::{MediaError, MediaResult};

/// Runs an external program to completion.
#[async_trait]
pub trait CommandRunner: Send + Sync {
    /// Returns the combined stdout/stderr on a zero exit status; any other
    /// outcome is `MediaError::TranscodeFailed` carrying that output.
    async fn run(&self, program: &str, args: &[String]) -> MediaResult<String>;
}

/// Forks the real binary.
#[derive(Debug, Default, Clone, Copy)]
pub struct ExecCommandRunner;

#[async_trait]
impl CommandRunner for ExecCommandRunner {
    async fn run(&self, program: &str, args: &[String]) -> MediaResult<String> {
        debug!("Running: {} {}", program, args.join(" "));

        let output = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| MediaError::transcode_failed(program, None, format!("spawn: {e}")))?;

        let mut combined = String::from_utf8_lossy(&output.stdout).into_owned();
        combined.push_str(&String::from_utf8_lossy(&output.stderr));

        if output.status.success() {
            Ok(combined)
        } else {
            Err(MediaError::transcode_failed(
                program,
                output.status.code(),
                combined,
            ))
        }
    }
}
