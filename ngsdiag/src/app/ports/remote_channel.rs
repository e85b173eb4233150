// SPDX-License-Identifier: AGPL-3.0-only
// Copyright (C) 2026 Alex Sizykh

use async_trait::async_trait;

use crate::app::errors::AppResult;
use crate::app::types::DirEntry;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExecCapture {
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
    pub exit_code: i32,
}

impl ExecCapture {
    pub fn stdout_text(&self) -> String {
        String::from_utf8_lossy(&self.stdout).into_owned()
    }

    pub fn stderr_text(&self) -> String {
        String::from_utf8_lossy(&self.stderr).into_owned()
    }

    pub fn success(&self) -> bool {
        self.exit_code == 0
    }
}

#[async_trait]
/// Remote command and file-transfer boundary.
/// Every call opens its own authenticated session and closes it before
/// returning, whether the operation succeeded or not.
pub trait RemoteChannelPort: Send + Sync {
    async fn exec_capture(&self, command: &str) -> AppResult<ExecCapture>;

    async fn read_directory(&self, path: &str) -> AppResult<Vec<DirEntry>>;

    async fn read_file(&self, path: &str) -> AppResult<Vec<u8>>;

    async fn write_file(&self, path: &str, contents: &[u8]) -> AppResult<()>;

    async fn exists(&self, path: &str) -> AppResult<bool>;

    /// Opens and closes a session without doing anything else.
    async fn test_connection(&self) -> AppResult<()>;
}
