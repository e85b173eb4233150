// SPDX-License-Identifier: AGPL-3.0-only
// Copyright (C) 2026 Alex Sizykh

use std::io;
use std::path::Path;
use std::time::UNIX_EPOCH;

use async_trait::async_trait;

use crate::app::errors::{AppError, AppErrorKind, AppResult, codes};
use crate::app::ports::LocalFilesystemPort;
use crate::app::types::DirEntry;

#[derive(Clone, Default)]
pub struct LocalFilesystem;

impl LocalFilesystem {
    pub fn new() -> Self {
        Self
    }
}

fn map_io(op: &str, path: &Path, err: io::Error) -> AppError {
    let message = format!("failed to {op} {}: {err}", path.display());
    match err.kind() {
        io::ErrorKind::NotFound => {
            AppError::with_message(AppErrorKind::RemoteNotFound, codes::NOT_FOUND, message)
        }
        io::ErrorKind::PermissionDenied => AppError::with_message(
            AppErrorKind::PermissionDenied,
            codes::PERMISSION_DENIED,
            message,
        ),
        _ => AppError::with_message(AppErrorKind::Internal, codes::LOCAL_ERROR, message),
    }
}

fn mtime_secs(meta: &std::fs::Metadata) -> u64 {
    meta.modified()
        .ok()
        .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

#[async_trait]
impl LocalFilesystemPort for LocalFilesystem {
    #[tracing::instrument(name = "fs", level = "debug", skip(self, path), fields(op = "read_dir", path = %path.display()))]
    async fn read_dir(&self, path: &Path) -> AppResult<Vec<DirEntry>> {
        let mut dir = tokio::fs::read_dir(path)
            .await
            .map_err(|err| map_io("list", path, err))?;
        let mut entries = Vec::new();
        while let Some(entry) = dir
            .next_entry()
            .await
            .map_err(|err| map_io("list", path, err))?
        {
            // Entries can vanish between listing and stat on a network mount.
            let meta = match entry.metadata().await {
                Ok(meta) => meta,
                Err(err) => {
                    tracing::debug!("skipping {}: {err}", entry.path().display());
                    continue;
                }
            };
            entries.push(DirEntry {
                name: entry.file_name().to_string_lossy().into_owned(),
                size: meta.len(),
                mtime: mtime_secs(&meta),
                is_dir: meta.is_dir(),
            });
        }
        Ok(entries)
    }

    #[tracing::instrument(name = "fs", level = "debug", skip(self, path), fields(op = "read", path = %path.display()))]
    async fn read(&self, path: &Path) -> AppResult<Vec<u8>> {
        tokio::fs::read(path)
            .await
            .map_err(|err| map_io("read", path, err))
    }

    #[tracing::instrument(name = "fs", level = "debug", skip(self, path, contents), fields(op = "write", path = %path.display(), bytes = contents.len()))]
    async fn write(&self, path: &Path, contents: &[u8]) -> AppResult<()> {
        tokio::fs::write(path, contents)
            .await
            .map_err(|err| map_io("write", path, err))
    }

    #[tracing::instrument(name = "fs", level = "debug", skip(self, path), fields(op = "create_dir_all", path = %path.display()))]
    async fn create_dir_all(&self, path: &Path) -> AppResult<()> {
        tokio::fs::create_dir_all(path)
            .await
            .map_err(|err| map_io("create", path, err))
    }

    /// Removes a file or a whole tree. A missing path is not an error.
    #[tracing::instrument(name = "fs", level = "debug", skip(self, path), fields(op = "remove_all", path = %path.display()))]
    async fn remove_all(&self, path: &Path) -> AppResult<()> {
        let meta = match tokio::fs::symlink_metadata(path).await {
            Ok(meta) => meta,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(()),
            Err(err) => return Err(map_io("remove", path, err)),
        };
        let result = if meta.is_dir() {
            tokio::fs::remove_dir_all(path).await
        } else {
            tokio::fs::remove_file(path).await
        };
        match result {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(map_io("remove", path, err)),
        }
    }

    #[tracing::instrument(name = "fs", level = "debug", skip(self, path), fields(op = "exists", path = %path.display()))]
    async fn exists(&self, path: &Path) -> AppResult<bool> {
        tokio::fs::try_exists(path)
            .await
            .map_err(|err| map_io("stat", path, err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn lists_files_and_directories() {
        let tmp = TempDir::new().unwrap();
        std::fs::create_dir(tmp.path().join("sub")).unwrap();
        std::fs::write(tmp.path().join("reads.fastq"), b"@r1\nACGT\n").unwrap();

        let fs = LocalFilesystem::new();
        let mut entries = fs.read_dir(tmp.path()).await.unwrap();
        entries.sort_by(|a, b| a.name.cmp(&b.name));
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].name, "reads.fastq");
        assert_eq!(entries[0].size, 9);
        assert!(!entries[0].is_dir);
        assert!(entries[0].mtime > 0);
        assert_eq!(entries[1].name, "sub");
        assert!(entries[1].is_dir);
    }

    #[tokio::test]
    async fn missing_directory_is_not_found() {
        let tmp = TempDir::new().unwrap();
        let err = LocalFilesystem::new()
            .read_dir(&tmp.path().join("absent"))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), AppErrorKind::RemoteNotFound);
        assert_eq!(err.code(), codes::NOT_FOUND);
    }

    #[tokio::test]
    async fn remove_all_handles_files_trees_and_missing_paths() {
        let tmp = TempDir::new().unwrap();
        let fs = LocalFilesystem::new();
        let file = tmp.path().join("one.txt");
        let tree = tmp.path().join("a/b/c");
        fs.write(&file, b"x").await.unwrap();
        fs.create_dir_all(&tree).await.unwrap();

        fs.remove_all(&file).await.unwrap();
        fs.remove_all(&tmp.path().join("a")).await.unwrap();
        fs.remove_all(&tmp.path().join("never-existed")).await.unwrap();

        assert!(!fs.exists(&file).await.unwrap());
        assert!(!fs.exists(&tmp.path().join("a")).await.unwrap());
    }

    #[tokio::test]
    async fn write_into_missing_parent_fails() {
        let tmp = TempDir::new().unwrap();
        let err = LocalFilesystem::new()
            .write(&tmp.path().join("no/such/dir/file"), b"data")
            .await
            .unwrap_err();
        assert_eq!(err.kind(), AppErrorKind::RemoteNotFound);
    }
}
