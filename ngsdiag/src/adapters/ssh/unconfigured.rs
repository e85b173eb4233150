// SPDX-License-Identifier: AGPL-3.0-only
// Copyright (C) 2026 Alex Sizykh

use async_trait::async_trait;

use crate::app::errors::{AppError, AppResult};
use crate::app::ports::{ExecCapture, RemoteChannelPort};
use crate::app::types::DirEntry;

/// Stand-in channel when the connection settings are incomplete. Local-only
/// commands keep working; anything remote fails with the configuration problem.
pub struct UnconfiguredChannel {
    reason: String,
}

impl UnconfiguredChannel {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }

    fn refuse<T>(&self) -> AppResult<T> {
        Err(AppError::invalid_argument(format!(
            "remote host is not configured: {}",
            self.reason
        )))
    }
}

#[async_trait]
impl RemoteChannelPort for UnconfiguredChannel {
    async fn exec_capture(&self, _command: &str) -> AppResult<ExecCapture> {
        self.refuse()
    }

    async fn read_directory(&self, _path: &str) -> AppResult<Vec<DirEntry>> {
        self.refuse()
    }

    async fn read_file(&self, _path: &str) -> AppResult<Vec<u8>> {
        self.refuse()
    }

    async fn write_file(&self, _path: &str, _contents: &[u8]) -> AppResult<()> {
        self.refuse()
    }

    async fn exists(&self, _path: &str) -> AppResult<bool> {
        self.refuse()
    }

    async fn test_connection(&self) -> AppResult<()> {
        self.refuse()
    }
}
