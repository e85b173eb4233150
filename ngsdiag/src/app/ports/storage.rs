// SPDX-License-Identifier: AGPL-3.0-only
// Copyright (C) 2026 Alex Sizykh

use async_trait::async_trait;

use crate::app::errors::{AppError, AppErrorKind, AppResult, codes};
use crate::app::types::DirEntry;

#[async_trait]
/// Uniform file access to the remote host's filesystem.
/// Paths are always given in their remote-canonical form.
pub trait StoragePort: Send + Sync {
    async fn list(&self, path: &str) -> AppResult<Vec<DirEntry>>;
    async fn read(&self, path: &str) -> AppResult<Vec<u8>>;
    async fn write(&self, path: &str, contents: &[u8]) -> AppResult<()>;
    async fn mkdir(&self, path: &str) -> AppResult<()>;
    async fn remove(&self, path: &str) -> AppResult<()>;
    async fn exists(&self, path: &str) -> AppResult<bool>;

    /// Reads a file that must hold UTF-8 text.
    async fn read_text(&self, path: &str) -> AppResult<String> {
        let bytes = self.read(path).await?;
        String::from_utf8(bytes).map_err(|err| {
            AppError::with_message(
                AppErrorKind::Internal,
                codes::INVALID_UTF8,
                format!("{path} is not valid UTF-8 text: {}", err.utf8_error()),
            )
        })
    }

    async fn write_text(&self, path: &str, contents: &str) -> AppResult<()> {
        self.write(path, contents.as_bytes()).await
    }
}
