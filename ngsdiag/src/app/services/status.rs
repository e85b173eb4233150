// SPDX-License-Identifier: AGPL-3.0-only
// Copyright (C) 2026 Alex Sizykh

use std::sync::Arc;

use crate::app::errors::{AppError, AppErrorKind, AppResult, codes};
use crate::app::ports::{ExecCapture, RemoteChannelPort};
use crate::app::types::{JobLogs, JobState, JobStatusReport};

use super::job_id::validate_job_id;
use super::launcher::describe_job;
use super::shell::{remote_join, sh_escape, trim_dir};
use super::slurm::{
    map_slurm_state, parse_squeue_state, sacct_job_state, sacct_state_command,
    scancel_command, squeue_state_command,
};

const SUCCESS_MARKERS: [&str; 3] = [
    "Pipeline completed successfully",
    "Succeeded",
    "Workflow finished",
];
const FAILURE_MARKERS: [&str; 2] = ["Error", "FAILED"];

const STATUS_TAIL_LINES: usize = 50;
const LOGS_TAIL_LINES: usize = 200;
const NEXTFLOW_TAIL_LINES: usize = 100;

pub fn pid_alive_command(pid: u32) -> String {
    format!("ps -p {pid} -o stat=")
}

/// Reads the answer to [`pid_alive_command`]. A zombie has exited and
/// only waits to be reaped, so it counts as gone.
pub fn process_alive(capture: &ExecCapture) -> bool {
    let stdout = capture.stdout_text();
    let stat = stdout.trim();
    capture.success() && !stat.is_empty() && !stat.starts_with('Z')
}

/// First line of a pid file as a process id; empty or garbage is `None`.
pub fn parse_pid(text: &str) -> Option<u32> {
    text.lines()
        .next()
        .and_then(|line| line.trim().parse::<u32>().ok())
        .filter(|pid| *pid > 0)
}

/// Outcome of a finished job judged from the end of its log.
/// Without any marker the job is assumed to have completed.
pub fn classify_log_tail(tail: &str) -> JobState {
    if SUCCESS_MARKERS.iter().any(|m| tail.contains(m)) {
        JobState::Completed
    } else if FAILURE_MARKERS.iter().any(|m| tail.contains(m)) {
        JobState::Failed
    } else {
        JobState::Completed
    }
}

fn sibling(path: &str, from: &str, to: &str) -> String {
    match path.strip_suffix(from) {
        Some(stem) => format!("{stem}{to}"),
        None => path.to_string(),
    }
}

fn parent_dir(path: &str) -> Option<&str> {
    path.rsplit_once('/')
        .map(|(dir, _)| if dir.is_empty() { "/" } else { dir })
}

/// Infers job state from the artifacts left on the remote host, falling
/// back to the scheduler. Never writes anything.
pub struct JobStatusResolver {
    channel: Arc<dyn RemoteChannelPort>,
    base_project_path: String,
}

impl JobStatusResolver {
    pub fn new(channel: Arc<dyn RemoteChannelPort>, base_project_path: impl Into<String>) -> Self {
        Self {
            channel,
            base_project_path: base_project_path.into(),
        }
    }

    pub async fn resolve(&self, job_id: &str, working_directory: Option<&str>) -> AppResult<JobState> {
        validate_job_id(job_id)?;

        let pid_file = self
            .locate_artifact(job_id, working_directory, ".pid")
            .await?;
        if let Some(pid_file) = pid_file {
            if let Some(pid) = self.read_pid(&pid_file).await? {
                if self.is_alive(pid).await? {
                    return Ok(JobState::Running);
                }
                let log_file = sibling(&pid_file, ".pid", ".log");
                let tail = self.tail(&log_file, STATUS_TAIL_LINES).await?.unwrap_or_default();
                let state = classify_log_tail(&tail);
                tracing::debug!(job_id, pid, state = %state, "process gone, judged from log");
                return Ok(state);
            }
        }

        let squeue = self.channel.exec_capture(&squeue_state_command(job_id)).await?;
        if let Some(state) = parse_squeue_state(&squeue.stdout_text()).and_then(|s| map_slurm_state(&s)) {
            return Ok(state);
        }

        let sacct = self.channel.exec_capture(&sacct_state_command(job_id)).await?;
        if let Some(state) = sacct_job_state(&sacct.stdout_text()) {
            return Ok(state);
        }

        tracing::debug!(job_id, "no evidence found, assuming completed");
        Ok(JobState::Completed)
    }

    pub async fn resolve_many(
        &self,
        job_ids: &[String],
        working_directory: Option<&str>,
    ) -> AppResult<Vec<JobStatusReport>> {
        let mut reports = Vec::with_capacity(job_ids.len());
        for job_id in job_ids {
            let state = self.resolve(job_id, working_directory).await?;
            reports.push(JobStatusReport {
                job_id: job_id.clone(),
                state,
            });
        }
        Ok(reports)
    }

    /// Sends `scancel`; the answer only says whether the request went out.
    pub async fn cancel(&self, job_id: &str) -> AppResult<bool> {
        validate_job_id(job_id)?;
        match self.channel.exec_capture(&scancel_command(job_id)).await {
            Ok(capture) => {
                if !capture.success() {
                    tracing::warn!(job_id, stderr = %capture.stderr_text().trim(), "scancel rejected");
                }
                Ok(capture.success())
            }
            Err(err) => {
                tracing::warn!(job_id, error = %err, "scancel could not be sent");
                Ok(false)
            }
        }
    }

    pub async fn job_logs(&self, job_id: &str, working_directory: Option<&str>) -> AppResult<JobLogs> {
        validate_job_id(job_id)?;
        let Some(log_file) = self
            .locate_artifact(job_id, working_directory, ".log")
            .await?
        else {
            return Err(AppError::with_message(
                AppErrorKind::UnknownJob,
                codes::UNKNOWN_JOB,
                format!("no log found for job {job_id}"),
            ));
        };

        let log_tail = self.tail(&log_file, LOGS_TAIL_LINES).await?.unwrap_or_default();
        let pid = self.read_pid(&sibling(&log_file, ".log", ".pid")).await?;
        let directory = working_directory.or_else(|| parent_dir(&log_file));
        let state = self.resolve(job_id, directory).await?;
        let nextflow_log_tail = match directory {
            Some(dir) => {
                self.tail(&remote_join(dir, ".nextflow.log"), NEXTFLOW_TAIL_LINES)
                    .await?
            }
            None => None,
        };

        Ok(JobLogs {
            job_id: job_id.to_string(),
            state,
            pid,
            log_file,
            log_tail,
            nextflow_log_tail,
        })
    }

    /// Path of `ngsdiag_<id><suffix>`, looked up directly when the working
    /// directory is known and by a linear `find` otherwise.
    async fn locate_artifact(
        &self,
        job_id: &str,
        working_directory: Option<&str>,
        suffix: &str,
    ) -> AppResult<Option<String>> {
        if let Some(dir) = working_directory.filter(|d| !d.trim().is_empty()) {
            let descriptor = describe_job(job_id, trim_dir(dir.trim()));
            let path = if suffix == ".pid" {
                descriptor.pid_file
            } else {
                descriptor.log_file
            };
            let capture = self
                .channel
                .exec_capture(&format!("test -f {}", sh_escape(&path)))
                .await?;
            return Ok(capture.success().then_some(path));
        }

        if self.base_project_path.trim().is_empty() {
            return Ok(None);
        }
        let command = format!(
            "find {} -name {} -type f 2>/dev/null | head -n 1",
            sh_escape(&self.base_project_path),
            sh_escape(&format!("ngsdiag_{job_id}{suffix}"))
        );
        let capture = self.channel.exec_capture(&command).await?;
        let found = capture.stdout_text().trim().to_string();
        Ok((!found.is_empty()).then_some(found))
    }

    async fn read_pid(&self, pid_file: &str) -> AppResult<Option<u32>> {
        let capture = self
            .channel
            .exec_capture(&format!("cat {} 2>/dev/null", sh_escape(pid_file)))
            .await?;
        Ok(parse_pid(&capture.stdout_text()))
    }

    async fn is_alive(&self, pid: u32) -> AppResult<bool> {
        let capture = self.channel.exec_capture(&pid_alive_command(pid)).await?;
        Ok(process_alive(&capture))
    }

    async fn tail(&self, path: &str, lines: usize) -> AppResult<Option<String>> {
        let capture = self
            .channel
            .exec_capture(&format!("tail -n {lines} {} 2>/dev/null", sh_escape(path)))
            .await?;
        Ok(capture.success().then(|| capture.stdout_text()))
    }
}
