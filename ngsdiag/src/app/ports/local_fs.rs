// SPDX-License-Identifier: AGPL-3.0-only
// Copyright (C) 2026 Alex Sizykh

use std::path::Path;

use async_trait::async_trait;

use crate::app::errors::AppResult;
use crate::app::types::DirEntry;

#[async_trait]
/// Local filesystem boundary used by mounted storage and the mount manager.
/// Maps io errors onto the shared taxonomy.
pub trait LocalFilesystemPort: Send + Sync {
    async fn read_dir(&self, path: &Path) -> AppResult<Vec<DirEntry>>;
    async fn read(&self, path: &Path) -> AppResult<Vec<u8>>;
    async fn write(&self, path: &Path, contents: &[u8]) -> AppResult<()>;
    async fn create_dir_all(&self, path: &Path) -> AppResult<()>;
    async fn remove_all(&self, path: &Path) -> AppResult<()>;
    async fn exists(&self, path: &Path) -> AppResult<bool>;
}
