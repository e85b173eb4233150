// SPDX-License-Identifier: AGPL-3.0-only
// Copyright (C) 2026 Alex Sizykh

use std::sync::Arc;

use crate::app::errors::AppResult;
use crate::app::ports::{
    ClockPort, ExecCapture, LocalCommandPort, LocalFilesystemPort, RemoteChannelPort, StoragePort,
    TelemetryEvent, TelemetryPort,
};
use crate::app::services::launcher::JobLauncher;
use crate::app::services::mount::MountManager;
use crate::app::services::pipeline::{PipelineSettings, build_pipeline_command};
use crate::app::services::status::JobStatusResolver;
use crate::app::services::storage::{
    build_storage, create_project, list_projects, resolve_project_path, storage_info,
};
use crate::app::types::{
    CreatedProject, DirEntry, JobLogs, JobStatusReport, LaunchResult, LaunchSettings,
    MountOutcome, MountSettings, MountStatus, RemoteProject, StorageInfo, StorageSettings,
};

/// Settings the use cases need beyond the ports themselves.
#[derive(Debug, Clone)]
pub struct UseCaseSettings {
    pub storage: StorageSettings,
    pub mount: MountSettings,
    pub launch: LaunchSettings,
    pub base_project_path: String,
    pub pipeline_path: String,
}

#[derive(Clone)]
pub struct UseCases {
    pub(crate) channel: Arc<dyn RemoteChannelPort>,
    pub(crate) storage: Arc<dyn StoragePort>,
    pub(crate) launcher: Arc<JobLauncher>,
    pub(crate) resolver: Arc<JobStatusResolver>,
    pub(crate) mounts: Arc<MountManager>,
    pub(crate) telemetry: Arc<dyn TelemetryPort>,
    pub(crate) storage_settings: StorageSettings,
    pub(crate) base_project_path: String,
    pub(crate) pipeline_path: String,
}

impl UseCases {
    pub fn new(
        channel: Arc<dyn RemoteChannelPort>,
        local_fs: Arc<dyn LocalFilesystemPort>,
        local_commands: Arc<dyn LocalCommandPort>,
        clock: Arc<dyn ClockPort>,
        telemetry: Arc<dyn TelemetryPort>,
        settings: UseCaseSettings,
    ) -> Self {
        let storage = build_storage(&settings.storage, channel.clone(), local_fs.clone());
        let launcher = JobLauncher::new(channel.clone(), clock, settings.launch);
        let resolver = JobStatusResolver::new(channel.clone(), settings.base_project_path.clone());
        let mounts = MountManager::new(local_commands, local_fs, settings.mount);
        Self {
            channel,
            storage,
            launcher: Arc::new(launcher),
            resolver: Arc::new(resolver),
            mounts: Arc::new(mounts),
            telemetry,
            storage_settings: settings.storage,
            base_project_path: settings.base_project_path,
            pipeline_path: settings.pipeline_path,
        }
    }

    pub async fn test_connection(&self) -> AppResult<()> {
        self.channel.test_connection().await
    }

    pub async fn exec(&self, command: &str) -> AppResult<ExecCapture> {
        self.channel.exec_capture(command).await
    }

    pub async fn list(&self, path: &str) -> AppResult<Vec<DirEntry>> {
        self.storage.list(path).await
    }

    pub async fn read(&self, path: &str) -> AppResult<Vec<u8>> {
        self.storage.read(path).await
    }

    pub async fn write(&self, path: &str, contents: &[u8]) -> AppResult<()> {
        self.storage.write(path, contents).await
    }

    pub async fn mkdir(&self, path: &str) -> AppResult<()> {
        self.storage.mkdir(path).await
    }

    pub async fn remove(&self, path: &str) -> AppResult<()> {
        self.storage.remove(path).await
    }

    pub async fn exists(&self, path: &str) -> AppResult<bool> {
        self.storage.exists(path).await
    }

    pub async fn list_projects(&self) -> AppResult<Vec<RemoteProject>> {
        list_projects(self.storage.as_ref(), &self.base_project_path).await
    }

    /// Creates a project directory with its `raw` and `results` folders.
    /// A bare name is placed under `base_project_path`.
    pub async fn create_project(&self, project: &str) -> AppResult<CreatedProject> {
        let path = resolve_project_path(&self.base_project_path, project)?;
        create_project(self.storage.as_ref(), &path).await
    }

    pub fn storage_info(&self) -> StorageInfo {
        storage_info(&self.storage_settings)
    }

    pub async fn submit(&self, working_directory: &str, command: &str) -> AppResult<LaunchResult> {
        let result = self.launcher.launch(working_directory, command).await?;
        self.telemetry.event(
            "job_submitted",
            TelemetryEvent {
                job_id: Some(result.job_id.clone()),
                working_directory: Some(result.descriptor.working_directory.clone()),
                ..Default::default()
            },
        );
        Ok(result)
    }

    /// Builds the pipeline command for `project_path` and launches it there.
    pub async fn submit_pipeline(
        &self,
        project_path: &str,
        settings: &PipelineSettings,
    ) -> AppResult<LaunchResult> {
        let command = build_pipeline_command(&self.pipeline_path, project_path, settings)?;
        tracing::debug!(command = %command, "resolved pipeline command");
        self.submit(project_path, &command).await
    }

    pub async fn job_status(
        &self,
        job_ids: &[String],
        working_directory: Option<&str>,
    ) -> AppResult<Vec<JobStatusReport>> {
        self.resolver.resolve_many(job_ids, working_directory).await
    }

    pub async fn job_logs(&self, job_id: &str, working_directory: Option<&str>) -> AppResult<JobLogs> {
        self.resolver.job_logs(job_id, working_directory).await
    }

    pub async fn cancel_job(&self, job_id: &str) -> AppResult<bool> {
        let sent = self.resolver.cancel(job_id).await?;
        self.telemetry.event(
            "job_cancelled",
            TelemetryEvent {
                job_id: Some(job_id.to_string()),
                outcome: Some(if sent { "sent" } else { "not_sent" }.to_string()),
                ..Default::default()
            },
        );
        Ok(sent)
    }

    pub async fn mount(&self) -> AppResult<MountOutcome> {
        let outcome = self.mounts.mount().await?;
        self.mount_event("mount", outcome);
        Ok(outcome)
    }

    pub async fn unmount(&self) -> AppResult<MountOutcome> {
        let outcome = self.mounts.unmount().await?;
        self.mount_event("unmount", outcome);
        Ok(outcome)
    }

    pub async fn mount_status(&self) -> AppResult<MountStatus> {
        self.mounts.status().await
    }

    pub async fn auto_mount_if_enabled(&self) {
        if let Some(outcome) = self.mounts.auto_mount_if_enabled().await {
            self.mount_event("mount", outcome);
        }
    }

    fn mount_event(&self, name: &'static str, outcome: MountOutcome) {
        let outcome = match outcome {
            MountOutcome::Mounted => "mounted",
            MountOutcome::AlreadyMounted => "already_mounted",
            MountOutcome::Unmounted => "unmounted",
            MountOutcome::AlreadyUnmounted => "already_unmounted",
        };
        self.telemetry.event(
            name,
            TelemetryEvent {
                mount_point: Some(self.mounts.settings().mount_point.clone()),
                outcome: Some(outcome.to_string()),
                ..Default::default()
            },
        );
    }
}
