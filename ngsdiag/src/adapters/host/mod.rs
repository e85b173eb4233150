// SPDX-License-Identifier: AGPL-3.0-only
// Copyright (C) 2026 Alex Sizykh

use std::io;
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;

use crate::app::errors::{AppError, AppErrorKind, AppResult, codes};
use crate::app::ports::{CommandOutput, LocalCommandPort};

/// Upper bound for a single helper invocation. sshfs can hang on an
/// unreachable host long after its own connect timeout.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// Runs helper programs on the control host with tokio's process support.
#[derive(Clone)]
pub struct LocalCommandRunner {
    timeout: Duration,
}

impl Default for LocalCommandRunner {
    fn default() -> Self {
        Self::new()
    }
}

impl LocalCommandRunner {
    pub fn new() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn with_timeout(timeout: Duration) -> Self {
        Self { timeout }
    }
}

fn spawn_error(program: &str, err: io::Error) -> AppError {
    if err.kind() == io::ErrorKind::NotFound {
        AppError::with_message(
            AppErrorKind::ToolUnavailable,
            codes::TOOL_UNAVAILABLE,
            format!("{program} is not installed or not on PATH"),
        )
    } else {
        AppError::with_message(
            AppErrorKind::Internal,
            codes::LOCAL_ERROR,
            format!("failed to run {program}: {err}"),
        )
    }
}

#[async_trait]
impl LocalCommandPort for LocalCommandRunner {
    #[tracing::instrument(name = "mount", level = "debug", skip(self, args), fields(op = "run", program = program))]
    async fn run(&self, program: &str, args: &[String]) -> AppResult<CommandOutput> {
        let child = tokio::process::Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|err| spawn_error(program, err))?;

        let output = match tokio::time::timeout(self.timeout, child.wait_with_output()).await {
            Ok(result) => result.map_err(|err| spawn_error(program, err))?,
            Err(_) => {
                return Err(AppError::with_message(
                    AppErrorKind::Timeout,
                    codes::TIMEOUT,
                    format!("{program} timed out after {}s", self.timeout.as_secs()),
                ));
            }
        };
        tracing::debug!(status = ?output.status, "{program} finished");
        Ok(CommandOutput {
            success: output.status.success(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}
