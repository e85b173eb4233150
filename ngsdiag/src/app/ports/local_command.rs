// SPDX-License-Identifier: AGPL-3.0-only
// Copyright (C) 2026 Alex Sizykh

use async_trait::async_trait;

use crate::app::errors::AppResult;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    pub success: bool,
    pub stdout: String,
    pub stderr: String,
}

#[async_trait]
/// Runs helper programs on the control host (mount table, sshfs, fusermount).
/// A non-zero exit is reported in `CommandOutput`; only a failure to spawn
/// the program is an error.
pub trait LocalCommandPort: Send + Sync {
    async fn run(&self, program: &str, args: &[String]) -> AppResult<CommandOutput>;
}
