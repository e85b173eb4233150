// SPDX-License-Identifier: AGPL-3.0-only
// Copyright (C) 2026 Alex Sizykh

use std::sync::Arc;

use time::format_description::well_known::Rfc3339;

use crate::app::errors::{AppError, AppErrorKind, AppResult, codes};
use crate::app::ports::{ClockPort, RemoteChannelPort};
use crate::app::types::{JobDescriptor, LaunchResult, LaunchSettings};

use super::job_id::JobIdGenerator;
use super::scripts::{JobScripts, render_job_scripts};
use super::shell::{remote_join, sh_escape, trim_dir};
use super::status::{parse_pid, pid_alive_command, process_alive};

/// Artifact paths for `job_id` inside `working_directory`.
pub fn describe_job(job_id: &str, working_directory: &str) -> JobDescriptor {
    let artifact = |suffix: &str| remote_join(working_directory, &format!("ngsdiag_{job_id}{suffix}"));
    JobDescriptor {
        job_id: job_id.to_string(),
        working_directory: working_directory.to_string(),
        log_file: artifact(".log"),
        pid_file: artifact(".pid"),
        command_record: artifact(".cmd"),
        error_capture: artifact(".err"),
        launcher_script: artifact("_launcher.sh"),
        runner_script: artifact(".sh"),
    }
}

/// Starts detached remote processes that outlive the channel used to start them.
pub struct JobLauncher {
    channel: Arc<dyn RemoteChannelPort>,
    clock: Arc<dyn ClockPort>,
    ids: JobIdGenerator,
    settings: LaunchSettings,
}

impl JobLauncher {
    pub fn new(
        channel: Arc<dyn RemoteChannelPort>,
        clock: Arc<dyn ClockPort>,
        settings: LaunchSettings,
    ) -> Self {
        Self {
            channel,
            clock,
            ids: JobIdGenerator::new(),
            settings,
        }
    }

    /// Writes the job artifacts, fires the launcher and returns once the
    /// settle delay has passed.
    ///
    /// Only a failure to reach the host or to write and fire the scripts is
    /// an error. Whatever the job does afterwards shows up in its log.
    pub async fn launch(&self, working_directory: &str, command: &str) -> AppResult<LaunchResult> {
        let working_directory = trim_dir(working_directory.trim());
        if !working_directory.starts_with('/') {
            return Err(AppError::invalid_argument(format!(
                "working directory must be an absolute remote path, got '{working_directory}'"
            )));
        }
        if command.trim().is_empty() {
            return Err(AppError::invalid_argument("command must not be empty"));
        }

        let now = self.clock.now_utc();
        let job_id = self.ids.next(now);
        let descriptor = describe_job(&job_id, working_directory);
        let submitted_at = now
            .format(&Rfc3339)
            .map_err(|err| AppError::internal(format!("failed to format timestamp: {err}")))?;
        let scripts = render_job_scripts(
            &descriptor,
            command,
            &submitted_at,
            self.settings.execution_environment.as_deref(),
        )?;

        let launcher_output = self
            .fire(&descriptor, &scripts)
            .await
            .map_err(AppError::launcher)?;
        tracing::info!(
            job_id = %job_id,
            working_directory = %descriptor.working_directory,
            "launched detached job"
        );

        if !self.settings.settle_delay.is_zero() {
            tokio::time::sleep(self.settings.settle_delay).await;
        }
        let (pid, diagnostic_output) = self.diagnostics(&descriptor, &launcher_output).await;

        Ok(LaunchResult {
            job_id,
            descriptor,
            pid,
            diagnostic_output,
        })
    }

    async fn fire(&self, descriptor: &JobDescriptor, scripts: &JobScripts) -> AppResult<String> {
        self.exec_checked(&format!("mkdir -p {}", sh_escape(&descriptor.working_directory)))
            .await?;
        self.channel
            .write_file(&descriptor.command_record, scripts.command_record.as_bytes())
            .await?;
        self.channel
            .write_file(&descriptor.runner_script, scripts.runner.as_bytes())
            .await?;
        self.channel
            .write_file(&descriptor.launcher_script, scripts.launcher.as_bytes())
            .await?;
        self.exec_checked(&format!(
            "chmod +x {} {}",
            sh_escape(&descriptor.runner_script),
            sh_escape(&descriptor.launcher_script)
        ))
        .await?;
        self.exec_checked(&format!("bash {}", sh_escape(&descriptor.launcher_script)))
            .await
    }

    async fn exec_checked(&self, command: &str) -> AppResult<String> {
        let capture = self.channel.exec_capture(command).await?;
        if !capture.success() {
            return Err(AppError::with_message(
                AppErrorKind::Internal,
                codes::REMOTE_ERROR,
                format!(
                    "`{command}` exited with {}: {}",
                    capture.exit_code,
                    capture.stderr_text().trim()
                ),
            ));
        }
        Ok(capture.stdout_text())
    }

    async fn diagnostics(&self, descriptor: &JobDescriptor, launcher_output: &str) -> (Option<u32>, String) {
        let mut lines = vec![format!("Launcher output: {}", launcher_output.trim())];

        let pid = match self.channel.read_file(&descriptor.pid_file).await {
            Ok(bytes) => {
                let pid = parse_pid(&String::from_utf8_lossy(&bytes));
                lines.push(format!(
                    "PID file: {}",
                    pid.map_or_else(|| "empty".to_string(), |p| p.to_string())
                ));
                pid
            }
            Err(err) => {
                tracing::warn!(job_id = %descriptor.job_id, error = %err, "could not read pid file");
                lines.push(format!("PID file: unavailable ({err})"));
                None
            }
        }
        .or_else(|| parse_pid(launcher_output));

        if let Some(pid) = pid {
            match self.channel.exec_capture(&pid_alive_command(pid)).await {
                Ok(capture) => {
                    let alive = process_alive(&capture);
                    lines.push(format!("Process alive: {}", if alive { "yes" } else { "no" }));
                }
                Err(err) => {
                    tracing::warn!(job_id = %descriptor.job_id, error = %err, "liveness check failed");
                    lines.push(format!("Process alive: unknown ({err})"));
                }
            }
        }

        match self.channel.read_file(&descriptor.error_capture).await {
            Ok(bytes) => {
                let text = String::from_utf8_lossy(&bytes);
                let text = text.trim_end();
                lines.push("Error capture:".to_string());
                lines.push(if text.is_empty() { "(empty)".to_string() } else { text.to_string() });
            }
            Err(err) => {
                tracing::warn!(job_id = %descriptor.job_id, error = %err, "could not read error capture");
                lines.push(format!("Error capture: unavailable ({err})"));
            }
        }

        (pid, lines.join("\n"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::services::testing::{FakeChannel, FixedClock, capture, failed_capture};
    use std::time::Duration;

    fn launcher(channel: Arc<FakeChannel>) -> JobLauncher {
        JobLauncher::new(
            channel,
            Arc::new(FixedClock::default()),
            LaunchSettings {
                execution_environment: Some("metanextviro".into()),
                settle_delay: Duration::ZERO,
            },
        )
    }

    const WD: &str = "/data/projects/run1";
    const ID: &str = "1767323045678";

    #[test]
    fn descriptor_names_every_artifact() {
        let d = describe_job(ID, WD);
        assert_eq!(d.log_file, "/data/projects/run1/ngsdiag_1767323045678.log");
        assert_eq!(d.pid_file, "/data/projects/run1/ngsdiag_1767323045678.pid");
        assert_eq!(d.command_record, "/data/projects/run1/ngsdiag_1767323045678.cmd");
        assert_eq!(d.error_capture, "/data/projects/run1/ngsdiag_1767323045678.err");
        assert_eq!(d.runner_script, "/data/projects/run1/ngsdiag_1767323045678.sh");
        assert_eq!(
            d.launcher_script,
            "/data/projects/run1/ngsdiag_1767323045678_launcher.sh"
        );
    }

    #[tokio::test]
    async fn launch_writes_scripts_and_fires_launcher() {
        let channel = Arc::new(FakeChannel::new());
        channel.respond("bash '", capture("4242\n", 0));
        channel.respond("ps -p", capture("S\n", 0));
        channel.put_file(&format!("{WD}/ngsdiag_{ID}.pid"), b"4242\n");
        channel.put_file(&format!("{WD}/ngsdiag_{ID}.err"), b"");

        let result = launcher(channel.clone())
            .launch(WD, "sleep 2 && echo done")
            .await
            .unwrap();

        assert_eq!(result.job_id, ID);
        assert_eq!(result.pid, Some(4242));
        assert!(result.diagnostic_output.contains("Process alive: yes"));
        assert!(result.diagnostic_output.contains("(empty)"));

        let record = channel.file(&result.descriptor.command_record).unwrap();
        assert!(String::from_utf8(record).unwrap().contains("sleep 2 && echo done"));
        let runner = String::from_utf8(channel.file(&result.descriptor.runner_script).unwrap()).unwrap();
        assert!(runner.contains("conda activate 'metanextviro'"));
        assert!(channel.file(&result.descriptor.launcher_script).is_some());

        let commands = channel.commands();
        assert_eq!(commands[0], "mkdir -p '/data/projects/run1'");
        assert_eq!(
            commands[1],
            format!("chmod +x '{WD}/ngsdiag_{ID}.sh' '{WD}/ngsdiag_{ID}_launcher.sh'")
        );
        assert_eq!(commands[2], format!("bash '{WD}/ngsdiag_{ID}_launcher.sh'"));
        assert_eq!(commands[3], "ps -p 4242 -o stat=");
    }

    #[tokio::test]
    async fn unreachable_host_is_a_launcher_error() {
        let channel = Arc::new(FakeChannel::new());
        channel.fail_with(AppError::with_message(
            AppErrorKind::Connection,
            codes::CONNECTION_FAILURE,
            "connection refused",
        ));
        let err = launcher(channel).launch(WD, "true").await.unwrap_err();
        assert_eq!(err.kind(), AppErrorKind::Launcher);
        assert_eq!(err.context(), Some(codes::CONNECTION_FAILURE));
    }

    #[tokio::test]
    async fn failing_launcher_script_is_a_launcher_error() {
        let channel = Arc::new(FakeChannel::new());
        channel.respond("bash '", failed_capture("cd: no such directory\n", 1));
        let err = launcher(channel).launch(WD, "true").await.unwrap_err();
        assert_eq!(err.kind(), AppErrorKind::Launcher);
        assert_eq!(err.context(), Some(codes::REMOTE_ERROR));
    }

    #[tokio::test]
    async fn missing_diagnostics_are_not_raised() {
        let channel = Arc::new(FakeChannel::new());
        channel.respond("bash '", capture("", 0));
        let result = launcher(channel).launch(WD, "true").await.unwrap();
        assert_eq!(result.pid, None);
        assert!(result.diagnostic_output.contains("PID file: unavailable"));
        assert!(result.diagnostic_output.contains("Error capture: unavailable"));
    }

    #[tokio::test]
    async fn dead_process_is_reported_in_diagnostics() {
        let channel = Arc::new(FakeChannel::new());
        channel.respond("bash '", capture("77\n", 0));
        channel.respond("ps -p", capture("", 1));
        channel.put_file(&format!("{WD}/ngsdiag_{ID}.err"), b"nohup: failed to run\n");
        let result = launcher(channel).launch(WD, "true").await.unwrap();
        assert_eq!(result.pid, Some(77));
        assert!(result.diagnostic_output.contains("Process alive: no"));
        assert!(result.diagnostic_output.contains("nohup: failed to run"));
    }

    #[tokio::test]
    async fn consecutive_launches_get_distinct_ids() {
        let channel = Arc::new(FakeChannel::new());
        let launcher = launcher(channel);
        let a = launcher.launch(WD, "true").await.unwrap();
        let b = launcher.launch(WD, "true").await.unwrap();
        assert_ne!(a.job_id, b.job_id);
    }

    #[tokio::test]
    async fn root_working_directory_is_kept() {
        let channel = Arc::new(FakeChannel::new());
        let result = launcher(channel.clone()).launch("/", "true").await.unwrap();
        assert_eq!(result.descriptor.working_directory, "/");
        assert_eq!(result.descriptor.log_file, format!("/ngsdiag_{ID}.log"));
        assert_eq!(channel.commands()[0], "mkdir -p '/'");
    }

    #[tokio::test]
    async fn rejects_relative_working_directory_and_empty_command() {
        let launcher = launcher(Arc::new(FakeChannel::new()));
        let err = launcher.launch("relative/dir", "true").await.unwrap_err();
        assert_eq!(err.kind(), AppErrorKind::InvalidArgument);
        let err = launcher.launch(WD, "   ").await.unwrap_err();
        assert_eq!(err.kind(), AppErrorKind::InvalidArgument);
    }

    /// Jobs launched for real through `bash` on this machine.
    #[cfg(unix)]
    mod detached {
        use super::*;
        use crate::app::services::status::{JobStatusResolver, parse_pid};
        use crate::app::services::testing::{FixedClock, LocalShellChannel};
        use std::sync::Arc;
        use std::time::Duration;
        use crate::app::types::JobState;
        use tempfile::TempDir;

        fn local_launcher(environment: Option<&str>) -> JobLauncher {
            JobLauncher::new(
                Arc::new(LocalShellChannel::new()),
                Arc::new(FixedClock::default()),
                LaunchSettings {
                    execution_environment: environment.map(str::to_string),
                    settle_delay: Duration::ZERO,
                },
            )
        }

        fn workdir(tmp: &TempDir) -> String {
            tmp.path().to_string_lossy().into_owned()
        }

        async fn wait_for_exit(resolver: &JobStatusResolver, job_id: &str, wd: &str) -> JobState {
            let deadline = tokio::time::Instant::now() + Duration::from_secs(30);
            loop {
                let state = resolver.resolve(job_id, Some(wd)).await.unwrap();
                if state != JobState::Running || tokio::time::Instant::now() >= deadline {
                    return state;
                }
                tokio::time::sleep(Duration::from_millis(200)).await;
            }
        }

        async fn launch_and_wait(environment: Option<&str>, command: &str) -> (JobState, String) {
            let tmp = TempDir::new().unwrap();
            let wd = workdir(&tmp);
            let result = local_launcher(environment).launch(&wd, command).await.unwrap();
            let resolver = JobStatusResolver::new(Arc::new(LocalShellChannel::new()), wd.clone());
            let state = wait_for_exit(&resolver, &result.job_id, &wd).await;
            let log = std::fs::read_to_string(&result.descriptor.log_file).unwrap();
            (state, log)
        }

        #[tokio::test]
        async fn launched_job_outlives_its_channel() {
            let tmp = TempDir::new().unwrap();
            let wd = workdir(&tmp);
            let result = {
                let launcher = local_launcher(None);
                launcher.launch(&wd, "sleep 2 && echo done").await.unwrap()
            };

            let pid = result.pid.expect("launcher reports a pid");
            let pid_file = std::fs::read_to_string(&result.descriptor.pid_file).unwrap();
            assert_eq!(parse_pid(&pid_file), Some(pid));
            assert!(
                result
                    .diagnostic_output
                    .contains(&format!("Launcher output: {pid}"))
            );
            assert!(result.diagnostic_output.contains("Process alive: yes"));

            let resolver = JobStatusResolver::new(Arc::new(LocalShellChannel::new()), wd.clone());
            assert_eq!(
                resolver.resolve(&result.job_id, Some(&wd)).await.unwrap(),
                JobState::Running
            );
            assert_eq!(
                wait_for_exit(&resolver, &result.job_id, &wd).await,
                JobState::Completed
            );

            let log = std::fs::read_to_string(&result.descriptor.log_file).unwrap();
            assert!(log.contains("=== ngsdiag job started ==="));
            assert!(log.contains("\ndone\n"));
            assert!(log.contains("Exit Code: 0"));

            let by_search = JobStatusResolver::new(Arc::new(LocalShellChannel::new()), wd.clone());
            assert_eq!(
                by_search.resolve(&result.job_id, None).await.unwrap(),
                JobState::Completed
            );
        }

        #[tokio::test]
        async fn non_zero_exit_without_marker_is_completed() {
            let (state, log) = launch_and_wait(None, "echo partial; exit 1").await;
            assert!(log.contains("partial"));
            assert!(log.contains("Exit Code: 1"));
            assert_eq!(state, JobState::Completed);
        }

        #[tokio::test]
        async fn failed_environment_activation_is_a_failed_job() {
            let (state, log) = launch_and_wait(Some("no_such_env_xyz"), "echo never").await;
            assert!(log.contains("Environment activation FAILED: no_such_env_xyz"));
            assert!(!log.contains("\nnever\n"));
            assert_eq!(state, JobState::Failed);
        }
    }
}
