// SPDX-License-Identifier: AGPL-3.0-only
// Copyright (C) 2026 Alex Sizykh

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use serde::Serialize;

/// How the SSH session proves who we are.
#[derive(Clone, PartialEq, Eq)]
pub enum SshAuth {
    Key {
        identity_path: String,
        passphrase: Option<String>,
    },
    Password(String),
}

impl fmt::Debug for SshAuth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SshAuth::Key { identity_path, .. } => f
                .debug_struct("Key")
                .field("identity_path", identity_path)
                .finish_non_exhaustive(),
            SshAuth::Password(_) => f.write_str("Password(<redacted>)"),
        }
    }
}

/// Everything needed to open one channel to the remote host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SshConfig {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub auth: SshAuth,
    pub known_hosts_path: Option<PathBuf>,
    pub connect_timeout: Duration,
    pub ready_timeout: Duration,
    pub command_timeout: Duration,
    pub keepalive_secs: u64,
}

/// One directory entry, identical in shape for both storage modes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DirEntry {
    pub name: String,
    pub size: u64,
    /// Seconds since the unix epoch.
    pub mtime: u64,
    pub is_dir: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum StorageMode {
    OnDemand,
    Mounted,
}

impl StorageMode {
    pub fn as_str(self) -> &'static str {
        match self {
            StorageMode::OnDemand => "on-demand",
            StorageMode::Mounted => "mounted",
        }
    }
}

impl FromStr for StorageMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sftp" | "on-demand" | "ondemand" => Ok(StorageMode::OnDemand),
            "mount" | "mounted" => Ok(StorageMode::Mounted),
            other => Err(format!(
                "unknown storage mode '{other}' (expected 'sftp' or 'mount')"
            )),
        }
    }
}

/// Storage settings fixed once at startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageSettings {
    pub mode: StorageMode,
    pub mount_point: String,
    pub remote_base_path: String,
}

/// Settings for attaching the remote filesystem through sshfs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MountSettings {
    pub mode: StorageMode,
    pub auto_mount: bool,
    pub mount_point: String,
    pub remote_base_path: String,
    pub host: String,
    pub username: String,
    pub port: u16,
    pub identity_path: Option<String>,
}

/// Live view of the mount point; never cached.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MountState {
    pub mount_point: String,
    pub remote_base_path: String,
    pub is_mounted: bool,
    pub tool_available: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MountStatus {
    pub mode: StorageMode,
    pub auto_mount: bool,
    #[serde(flatten)]
    pub state: MountState,
}

/// Result of a mount or unmount request. Both "already" variants are successes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MountOutcome {
    Mounted,
    AlreadyMounted,
    Unmounted,
    AlreadyUnmounted,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchSettings {
    /// Conda environment activated by the runner script, if any.
    pub execution_environment: Option<String>,
    pub settle_delay: Duration,
}

/// Paths of every artifact written for one job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct JobDescriptor {
    pub job_id: String,
    pub working_directory: String,
    pub log_file: String,
    pub pid_file: String,
    pub command_record: String,
    pub error_capture: String,
    pub launcher_script: String,
    pub runner_script: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LaunchResult {
    pub job_id: String,
    pub descriptor: JobDescriptor,
    pub pid: Option<u32>,
    /// Immediate, non-authoritative view of the launch.
    pub diagnostic_output: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum JobState {
    Queued,
    Running,
    Completed,
    Failed,
    Cancelled,
    Unknown,
}

impl JobState {
    pub fn as_str(self) -> &'static str {
        match self {
            JobState::Queued => "queued",
            JobState::Running => "running",
            JobState::Completed => "completed",
            JobState::Failed => "failed",
            JobState::Cancelled => "cancelled",
            JobState::Unknown => "unknown",
        }
    }
}

impl fmt::Display for JobState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct JobStatusReport {
    pub job_id: String,
    pub state: JobState,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct JobLogs {
    pub job_id: String,
    pub state: JobState,
    pub pid: Option<u32>,
    pub log_file: String,
    pub log_tail: String,
    pub nextflow_log_tail: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RemoteProject {
    pub name: String,
    pub path: String,
    /// Seconds since the unix epoch.
    pub modified_at: u64,
}

/// Directory layout created for a new project.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CreatedProject {
    pub name: String,
    pub path: String,
    pub raw_directory: String,
    pub results_directory: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StorageInfo {
    pub mode: StorageMode,
    pub mount_point: String,
    pub remote_base_path: String,
}
