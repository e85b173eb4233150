// SPDX-License-Identifier: AGPL-3.0-only
// Copyright (C) 2026 Alex Sizykh

use std::path::Path;
use std::sync::Arc;

use crate::app::errors::{AppError, AppErrorKind, AppResult, codes};
use crate::app::ports::{LocalCommandPort, LocalFilesystemPort};
use crate::app::types::{MountOutcome, MountSettings, MountState, MountStatus, StorageMode};

const SSHFS: &str = "sshfs";

/// True when the `mount` listing has an entry whose target is exactly `mount_point`.
pub fn mount_table_contains(table: &str, mount_point: &str) -> bool {
    let target = normalize_mount_point(mount_point);
    table.lines().any(|line| {
        line.split_once(" on ")
            .and_then(|(_, rest)| rest.split(" type ").next())
            .and_then(|listed| listed.split(" (").next())
            .map(|listed| normalize_mount_point(listed.trim()) == target)
            .unwrap_or(false)
    })
}

fn normalize_mount_point(mount_point: &str) -> &str {
    let trimmed = mount_point.trim_end_matches('/');
    if trimmed.is_empty() { "/" } else { trimmed }
}

/// Arguments passed to `sshfs` for the configured target.
pub fn sshfs_args(settings: &MountSettings) -> Vec<String> {
    let mut args = vec![
        format!(
            "{}@{}:{}",
            settings.username, settings.host, settings.remote_base_path
        ),
        settings.mount_point.clone(),
        "-o".to_string(),
        "reconnect".to_string(),
        "-o".to_string(),
        "ServerAliveInterval=15".to_string(),
        "-o".to_string(),
        "ServerAliveCountMax=3".to_string(),
        "-o".to_string(),
        format!("Port={}", settings.port),
    ];
    if let Some(identity) = settings.identity_path.as_deref().filter(|p| !p.is_empty()) {
        args.push("-o".to_string());
        args.push(format!("IdentityFile={identity}"));
    }
    args
}

/// Attaches and detaches the local sshfs mount. The system mount table is
/// consulted on every call; nothing about the mount is cached here.
pub struct MountManager {
    commands: Arc<dyn LocalCommandPort>,
    fs: Arc<dyn LocalFilesystemPort>,
    settings: MountSettings,
}

impl MountManager {
    pub fn new(
        commands: Arc<dyn LocalCommandPort>,
        fs: Arc<dyn LocalFilesystemPort>,
        settings: MountSettings,
    ) -> Self {
        Self {
            commands,
            fs,
            settings,
        }
    }

    pub fn settings(&self) -> &MountSettings {
        &self.settings
    }

    pub async fn is_mounted(&self, mount_point: &str) -> AppResult<bool> {
        let output = self.commands.run("mount", &[]).await?;
        if !output.success {
            tracing::warn!(stderr = %output.stderr.trim(), "reading the mount table failed");
            return Ok(false);
        }
        Ok(mount_table_contains(&output.stdout, mount_point))
    }

    pub async fn is_tool_available(&self) -> bool {
        match self.commands.run("which", &[SSHFS.to_string()]).await {
            Ok(output) => output.success,
            Err(err) => {
                tracing::debug!(error = %err, "which is not available");
                false
            }
        }
    }

    pub async fn ensure_mount_point(&self, mount_point: &str) -> AppResult<()> {
        self.fs.create_dir_all(Path::new(mount_point)).await
    }

    #[tracing::instrument(name = "mount", skip(self), fields(op = "mount", mount_point = %self.settings.mount_point))]
    pub async fn mount(&self) -> AppResult<MountOutcome> {
        let settings = &self.settings;
        if settings.host.trim().is_empty() || settings.username.trim().is_empty() {
            return Err(AppError::invalid_argument(
                "SSH host and username are required for mounting",
            ));
        }
        if !self.is_tool_available().await {
            return Err(AppError::with_message(
                AppErrorKind::ToolUnavailable,
                codes::TOOL_UNAVAILABLE,
                "sshfs is not installed (apt install sshfs or dnf install fuse-sshfs)",
            ));
        }
        if self.is_mounted(&settings.mount_point).await? {
            tracing::info!("already mounted");
            return Ok(MountOutcome::AlreadyMounted);
        }

        self.ensure_mount_point(&settings.mount_point).await?;
        let output = self.commands.run(SSHFS, &sshfs_args(settings)).await?;
        if !output.success {
            return Err(AppError::with_message(
                AppErrorKind::Internal,
                codes::LOCAL_ERROR,
                format!("sshfs failed: {}", output.stderr.trim()),
            ));
        }
        tracing::info!(
            remote = %format!("{}:{}", settings.host, settings.remote_base_path),
            "mounted"
        );
        Ok(MountOutcome::Mounted)
    }

    #[tracing::instrument(name = "mount", skip(self), fields(op = "unmount", mount_point = %self.settings.mount_point))]
    pub async fn unmount(&self) -> AppResult<MountOutcome> {
        let mount_point = &self.settings.mount_point;
        if !self.is_mounted(mount_point).await? {
            tracing::info!("not mounted");
            return Ok(MountOutcome::AlreadyUnmounted);
        }

        let args = vec!["-u".to_string(), mount_point.clone()];
        match self.commands.run("fusermount", &args).await {
            Ok(output) if output.success => return Ok(MountOutcome::Unmounted),
            Ok(output) => {
                tracing::debug!(stderr = %output.stderr.trim(), "fusermount failed, trying umount")
            }
            Err(err) => tracing::debug!(error = %err, "fusermount unavailable, trying umount"),
        }

        let output = self.commands.run("umount", &[mount_point.clone()]).await?;
        if output.success {
            Ok(MountOutcome::Unmounted)
        } else {
            Err(AppError::with_message(
                AppErrorKind::Internal,
                codes::LOCAL_ERROR,
                format!("failed to unmount {mount_point}: {}", output.stderr.trim()),
            ))
        }
    }

    pub async fn state(&self) -> AppResult<MountState> {
        let mount_point = &self.settings.mount_point;
        Ok(MountState {
            mount_point: mount_point.clone(),
            remote_base_path: self.settings.remote_base_path.clone(),
            is_mounted: self.is_mounted(mount_point).await?,
            tool_available: self.is_tool_available().await,
        })
    }

    pub async fn status(&self) -> AppResult<MountStatus> {
        Ok(MountStatus {
            mode: self.settings.mode,
            auto_mount: self.auto_mount_enabled(),
            state: self.state().await?,
        })
    }

    pub fn auto_mount_enabled(&self) -> bool {
        self.settings.mode == StorageMode::Mounted && self.settings.auto_mount
    }

    /// Startup hook; a failed mount is logged and otherwise ignored.
    pub async fn auto_mount_if_enabled(&self) -> Option<MountOutcome> {
        if !self.auto_mount_enabled() {
            return None;
        }
        tracing::info!(mount_point = %self.settings.mount_point, "auto-mount enabled, mounting");
        match self.mount().await {
            Ok(outcome) => Some(outcome),
            Err(err) => {
                tracing::error!(error = %err, "auto-mount failed");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::fs::LocalFilesystem;
    use crate::app::ports::CommandOutput;
    use async_trait::async_trait;
    use std::sync::Mutex;
    use tempfile::TempDir;

    /// Emulates the mount table and the sshfs/fusermount/umount helpers.
    struct FakeHost {
        mounted: Mutex<bool>,
        has_sshfs: bool,
        fusermount_works: bool,
        calls: Mutex<Vec<String>>,
        mount_point: String,
    }

    impl FakeHost {
        fn new(mount_point: &str) -> Self {
            Self {
                mounted: Mutex::new(false),
                has_sshfs: true,
                fusermount_works: true,
                calls: Mutex::new(Vec::new()),
                mount_point: mount_point.to_string(),
            }
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().expect("calls lock").clone()
        }
    }

    fn ok(stdout: &str) -> CommandOutput {
        CommandOutput {
            success: true,
            stdout: stdout.to_string(),
            stderr: String::new(),
        }
    }

    fn failed(stderr: &str) -> CommandOutput {
        CommandOutput {
            success: false,
            stdout: String::new(),
            stderr: stderr.to_string(),
        }
    }

    #[async_trait]
    impl LocalCommandPort for FakeHost {
        async fn run(&self, program: &str, args: &[String]) -> AppResult<CommandOutput> {
            let mut line = program.to_string();
            for arg in args {
                line.push(' ');
                line.push_str(arg);
            }
            self.calls.lock().expect("calls lock").push(line);
            let mut mounted = self.mounted.lock().expect("mounted lock");
            Ok(match program {
                "mount" => {
                    let mut table = String::from("proc on /proc type proc (rw,nosuid)\n");
                    if *mounted {
                        table.push_str(&format!(
                            "alice@hpc:/remote/base on {} type fuse.sshfs (rw,nosuid,nodev)\n",
                            self.mount_point
                        ));
                    }
                    ok(&table)
                }
                "which" if self.has_sshfs => ok("/usr/bin/sshfs\n"),
                "which" => failed(""),
                "sshfs" => {
                    *mounted = true;
                    ok("")
                }
                "fusermount" if self.fusermount_works => {
                    *mounted = false;
                    ok("")
                }
                "fusermount" => failed("fusermount: entry not found"),
                "umount" => {
                    *mounted = false;
                    ok("")
                }
                other => panic!("unexpected program {other}"),
            })
        }
    }

    fn settings(mount_point: &str) -> MountSettings {
        MountSettings {
            mode: StorageMode::Mounted,
            auto_mount: true,
            mount_point: mount_point.to_string(),
            remote_base_path: "/remote/base".into(),
            host: "hpc".into(),
            username: "alice".into(),
            port: 2222,
            identity_path: Some("/home/alice/.ssh/id_ed25519".into()),
        }
    }

    fn manager(host: Arc<FakeHost>, settings: MountSettings) -> MountManager {
        MountManager::new(host, Arc::new(LocalFilesystem::new()), settings)
    }

    #[test]
    fn mount_table_matches_exact_targets_only() {
        let table = "alice@hpc:/data on /mnt/hpc type fuse.sshfs (rw)\n\
                     /dev/sda1 on /mnt/hpc2 type ext4 (rw)\n";
        assert!(mount_table_contains(table, "/mnt/hpc"));
        assert!(mount_table_contains(table, "/mnt/hpc/"));
        assert!(!mount_table_contains(table, "/mnt"));
        assert!(!mount_table_contains(table, "/mnt/hp"));
        assert!(!mount_table_contains("", "/mnt/hpc"));
    }

    #[test]
    fn sshfs_arguments() {
        let args = sshfs_args(&settings("/mnt/hpc"));
        assert_eq!(
            args.join(" "),
            "alice@hpc:/remote/base /mnt/hpc -o reconnect -o ServerAliveInterval=15 \
             -o ServerAliveCountMax=3 -o Port=2222 -o IdentityFile=/home/alice/.ssh/id_ed25519"
        );
        let mut no_key = settings("/mnt/hpc");
        no_key.identity_path = None;
        assert!(!sshfs_args(&no_key).join(" ").contains("IdentityFile"));
    }

    #[tokio::test]
    async fn mount_twice_then_unmount_twice() {
        let tmp = TempDir::new().unwrap();
        let mount_point = tmp.path().join("hpc").to_string_lossy().into_owned();
        let host = Arc::new(FakeHost::new(&mount_point));
        let manager = manager(host.clone(), settings(&mount_point));

        assert_eq!(manager.mount().await.unwrap(), MountOutcome::Mounted);
        assert!(tmp.path().join("hpc").is_dir());
        assert_eq!(manager.mount().await.unwrap(), MountOutcome::AlreadyMounted);
        assert!(manager.is_mounted(&mount_point).await.unwrap());

        assert_eq!(manager.unmount().await.unwrap(), MountOutcome::Unmounted);
        assert_eq!(manager.unmount().await.unwrap(), MountOutcome::AlreadyUnmounted);
        assert!(!manager.is_mounted(&mount_point).await.unwrap());

        let sshfs_calls = host.calls().iter().filter(|c| c.starts_with("sshfs ")).count();
        assert_eq!(sshfs_calls, 1);
    }

    #[tokio::test]
    async fn unmount_falls_back_to_umount() {
        let tmp = TempDir::new().unwrap();
        let mount_point = tmp.path().to_string_lossy().into_owned();
        let mut host = FakeHost::new(&mount_point);
        host.fusermount_works = false;
        let host = Arc::new(host);
        *host.mounted.lock().unwrap() = true;
        let manager = manager(host.clone(), settings(&mount_point));

        assert_eq!(manager.unmount().await.unwrap(), MountOutcome::Unmounted);
        let calls = host.calls();
        assert!(calls.contains(&format!("fusermount -u {mount_point}")));
        assert!(calls.contains(&format!("umount {mount_point}")));
    }

    #[tokio::test]
    async fn missing_tool_is_reported() {
        let tmp = TempDir::new().unwrap();
        let mount_point = tmp.path().to_string_lossy().into_owned();
        let mut host = FakeHost::new(&mount_point);
        host.has_sshfs = false;
        let manager = manager(Arc::new(host), settings(&mount_point));
        let err = manager.mount().await.unwrap_err();
        assert_eq!(err.kind(), AppErrorKind::ToolUnavailable);

        let status = manager.status().await.unwrap();
        assert!(!status.state.tool_available);
        assert!(!status.state.is_mounted);
        assert!(status.auto_mount);
    }

    #[tokio::test]
    async fn mount_requires_host_and_username() {
        let host = Arc::new(FakeHost::new("/mnt/hpc"));
        let mut settings = settings("/mnt/hpc");
        settings.username.clear();
        let err = manager(host.clone(), settings).mount().await.unwrap_err();
        assert_eq!(err.kind(), AppErrorKind::InvalidArgument);
        assert!(host.calls().is_empty());
    }

    #[tokio::test]
    async fn auto_mount_only_in_mounted_mode() {
        let tmp = TempDir::new().unwrap();
        let mount_point = tmp.path().to_string_lossy().into_owned();
        let host = Arc::new(FakeHost::new(&mount_point));
        let mut on_demand = settings(&mount_point);
        on_demand.mode = StorageMode::OnDemand;
        assert_eq!(manager(host.clone(), on_demand).auto_mount_if_enabled().await, None);
        assert!(host.calls().is_empty());

        let outcome = manager(host.clone(), settings(&mount_point))
            .auto_mount_if_enabled()
            .await;
        assert_eq!(outcome, Some(MountOutcome::Mounted));
    }

    #[tokio::test]
    async fn auto_mount_failure_is_swallowed() {
        let mut host = FakeHost::new("/mnt/hpc");
        host.has_sshfs = false;
        let manager = manager(Arc::new(host), settings("/mnt/hpc"));
        assert_eq!(manager.auto_mount_if_enabled().await, None);
    }
}
