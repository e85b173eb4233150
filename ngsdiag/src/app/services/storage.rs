// SPDX-License-Identifier: AGPL-3.0-only
// Copyright (C) 2026 Alex Sizykh

use std::sync::Arc;

use async_trait::async_trait;

use crate::app::errors::{AppError, AppErrorKind, AppResult, codes};
use crate::app::ports::{ExecCapture, LocalFilesystemPort, RemoteChannelPort, StoragePort};
use crate::app::types::{
    CreatedProject, DirEntry, RemoteProject, StorageInfo, StorageMode, StorageSettings,
};

use super::paths::{PathTranslator, normalize_path};
use super::shell::{remote_file_name, remote_join, sh_escape};

/// Every file operation is its own remote round trip.
pub struct OnDemandStorage {
    channel: Arc<dyn RemoteChannelPort>,
}

impl OnDemandStorage {
    pub fn new(channel: Arc<dyn RemoteChannelPort>) -> Self {
        Self { channel }
    }

    async fn run_checked(&self, op: &str, path: &str, command: &str) -> AppResult<()> {
        let capture = self.channel.exec_capture(command).await?;
        if capture.success() {
            Ok(())
        } else {
            Err(shell_failure(op, path, &capture))
        }
    }
}

fn shell_failure(op: &str, path: &str, capture: &ExecCapture) -> AppError {
    let stderr = capture.stderr_text();
    let detail = stderr.trim();
    if detail.contains("Permission denied") || detail.contains("Operation not permitted") {
        return AppError::with_message(
            AppErrorKind::PermissionDenied,
            codes::PERMISSION_DENIED,
            format!("{op} {path}: permission denied"),
        );
    }
    if detail.contains("No such file or directory") {
        return AppError::with_message(
            AppErrorKind::RemoteNotFound,
            codes::NOT_FOUND,
            format!("{op} {path}: no such file or directory"),
        );
    }
    AppError::with_message(
        AppErrorKind::Internal,
        codes::REMOTE_ERROR,
        format!(
            "{op} {path} failed with exit code {}: {detail}",
            capture.exit_code
        ),
    )
}

#[async_trait]
impl StoragePort for OnDemandStorage {
    async fn list(&self, path: &str) -> AppResult<Vec<DirEntry>> {
        self.channel.read_directory(path).await
    }

    async fn read(&self, path: &str) -> AppResult<Vec<u8>> {
        self.channel.read_file(path).await
    }

    async fn write(&self, path: &str, contents: &[u8]) -> AppResult<()> {
        self.channel.write_file(path, contents).await
    }

    async fn mkdir(&self, path: &str) -> AppResult<()> {
        self.run_checked("mkdir", path, &format!("mkdir -p {}", sh_escape(path)))
            .await
    }

    async fn remove(&self, path: &str) -> AppResult<()> {
        self.run_checked("rm", path, &format!("rm -rf {}", sh_escape(path)))
            .await
    }

    async fn exists(&self, path: &str) -> AppResult<bool> {
        self.channel.exists(path).await
    }
}

/// File operations through the local sshfs mount.
pub struct MountedStorage {
    fs: Arc<dyn LocalFilesystemPort>,
    translator: PathTranslator,
}

impl MountedStorage {
    pub fn new(fs: Arc<dyn LocalFilesystemPort>, translator: PathTranslator) -> Self {
        Self { fs, translator }
    }

    pub fn translator(&self) -> &PathTranslator {
        &self.translator
    }
}

#[async_trait]
impl StoragePort for MountedStorage {
    async fn list(&self, path: &str) -> AppResult<Vec<DirEntry>> {
        self.fs.read_dir(&self.translator.to_local_path(path)).await
    }

    async fn read(&self, path: &str) -> AppResult<Vec<u8>> {
        self.fs.read(&self.translator.to_local_path(path)).await
    }

    async fn write(&self, path: &str, contents: &[u8]) -> AppResult<()> {
        let local = self.translator.to_local_path(path);
        if let Some(parent) = local.parent().filter(|p| !p.as_os_str().is_empty()) {
            self.fs.create_dir_all(parent).await?;
        }
        self.fs.write(&local, contents).await
    }

    async fn mkdir(&self, path: &str) -> AppResult<()> {
        self.fs
            .create_dir_all(&self.translator.to_local_path(path))
            .await
    }

    async fn remove(&self, path: &str) -> AppResult<()> {
        self.fs.remove_all(&self.translator.to_local_path(path)).await
    }

    async fn exists(&self, path: &str) -> AppResult<bool> {
        self.fs.exists(&self.translator.to_local_path(path)).await
    }
}

/// Picks the storage implementation for the configured mode.
pub fn build_storage(
    settings: &StorageSettings,
    channel: Arc<dyn RemoteChannelPort>,
    fs: Arc<dyn LocalFilesystemPort>,
) -> Arc<dyn StoragePort> {
    match settings.mode {
        StorageMode::OnDemand => Arc::new(OnDemandStorage::new(channel)),
        StorageMode::Mounted => Arc::new(MountedStorage::new(
            fs,
            PathTranslator::new(&settings.remote_base_path, &settings.mount_point),
        )),
    }
}

pub fn storage_info(settings: &StorageSettings) -> StorageInfo {
    StorageInfo {
        mode: settings.mode,
        mount_point: settings.mount_point.clone(),
        remote_base_path: settings.remote_base_path.clone(),
    }
}

/// Project directories under `base_project_path`, most recently modified first.
pub async fn list_projects(
    storage: &dyn StoragePort,
    base_project_path: &str,
) -> AppResult<Vec<RemoteProject>> {
    if base_project_path.trim().is_empty() {
        return Err(AppError::invalid_argument(
            "base_project_path is not configured",
        ));
    }
    let entries = storage.list(base_project_path).await?;
    let mut projects: Vec<RemoteProject> = entries
        .into_iter()
        .filter(|entry| entry.is_dir && !entry.name.starts_with('.'))
        .map(|entry| RemoteProject {
            path: remote_join(base_project_path, &entry.name),
            name: entry.name,
            modified_at: entry.mtime,
        })
        .collect();
    projects.sort_by(|a, b| {
        b.modified_at
            .cmp(&a.modified_at)
            .then_with(|| a.name.cmp(&b.name))
    });
    Ok(projects)
}

/// Absolute project path for `project`. A bare name is placed under
/// `base_project_path`.
pub fn resolve_project_path(base_project_path: &str, project: &str) -> AppResult<String> {
    let project = project.trim();
    if project.is_empty() {
        return Err(AppError::invalid_argument("project path must not be empty"));
    }
    if project.starts_with('/') {
        return Ok(normalize_path(project));
    }
    if base_project_path.trim().is_empty() {
        return Err(AppError::invalid_argument(format!(
            "'{project}' is not absolute and base_project_path is not configured"
        )));
    }
    Ok(normalize_path(&remote_join(base_project_path, project)))
}

/// Creates `<path>`, `<path>/raw` and `<path>/results`. An existing path is
/// refused so a running project is never mixed with a new one.
pub async fn create_project(storage: &dyn StoragePort, path: &str) -> AppResult<CreatedProject> {
    if path == "/" {
        return Err(AppError::invalid_argument("project path must not be /"));
    }
    if storage.exists(path).await? {
        return Err(AppError::with_message(
            AppErrorKind::AlreadyExists,
            codes::ALREADY_EXISTS,
            format!("project directory already exists: {path}"),
        ));
    }
    let project = CreatedProject {
        name: remote_file_name(path).to_string(),
        path: path.to_string(),
        raw_directory: remote_join(path, "raw"),
        results_directory: remote_join(path, "results"),
    };
    storage.mkdir(&project.path).await?;
    storage.mkdir(&project.raw_directory).await?;
    storage.mkdir(&project.results_directory).await?;
    tracing::info!(path = %project.path, "created project directories");
    Ok(project)
}
