// SPDX-License-Identifier: AGPL-3.0-only
// Copyright (C) 2026 Alex Sizykh

use serde::Serialize;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

use crate::app::errors::{AppError, codes};
use crate::app::types::{
    CreatedProject, DirEntry, JobLogs, JobStatusReport, LaunchResult, MountOutcome, MountStatus,
    RemoteProject, StorageInfo,
};

pub fn to_json<T: Serialize + ?Sized>(value: &T) -> anyhow::Result<String> {
    Ok(serde_json::to_string_pretty(value)?)
}

fn str_width(value: &str) -> usize {
    value.chars().count()
}

fn timestamp(secs: u64) -> String {
    i64::try_from(secs)
        .ok()
        .and_then(|secs| OffsetDateTime::from_unix_timestamp(secs).ok())
        .and_then(|ts| ts.format(&Rfc3339).ok())
        .unwrap_or_else(|| "-".to_string())
}

/// Left-aligned columns separated by two spaces.
fn table(headers: &[&str], rows: &[Vec<String>]) -> String {
    let mut widths: Vec<usize> = headers.iter().map(|h| str_width(h)).collect();
    for row in rows {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(str_width(cell));
        }
    }
    let render = |cells: Vec<&str>| {
        let line = cells
            .iter()
            .zip(&widths)
            .map(|(cell, width)| format!("{cell:<width$}", width = *width))
            .collect::<Vec<_>>()
            .join("  ");
        format!("{}\n", line.trim_end())
    };
    let mut output = render(headers.to_vec());
    for row in rows {
        output.push_str(&render(row.iter().map(String::as_str).collect()));
    }
    output
}

pub fn format_entries(entries: &[DirEntry]) -> String {
    let mut sorted: Vec<&DirEntry> = entries.iter().collect();
    sorted.sort_by(|a, b| b.is_dir.cmp(&a.is_dir).then_with(|| a.name.cmp(&b.name)));
    let rows: Vec<Vec<String>> = sorted
        .into_iter()
        .map(|entry| {
            let name = if entry.is_dir {
                format!("{}/", entry.name)
            } else {
                entry.name.clone()
            };
            vec![name, entry.size.to_string(), timestamp(entry.mtime)]
        })
        .collect();
    table(&["name", "size", "modified"], &rows)
}

pub fn format_projects(projects: &[RemoteProject]) -> String {
    let rows: Vec<Vec<String>> = projects
        .iter()
        .map(|p| vec![p.name.clone(), p.path.clone(), timestamp(p.modified_at)])
        .collect();
    table(&["name", "path", "modified"], &rows)
}

pub fn format_created_project(project: &CreatedProject) -> String {
    format!(
        "created project {}\n  {}\n  {}\n  {}\n",
        project.name, project.path, project.raw_directory, project.results_directory
    )
}

pub fn format_statuses(reports: &[JobStatusReport]) -> String {
    let rows: Vec<Vec<String>> = reports
        .iter()
        .map(|r| vec![r.job_id.clone(), r.state.to_string()])
        .collect();
    table(&["job_id", "state"], &rows)
}

pub fn format_launch(result: &LaunchResult) -> String {
    let pid = result
        .pid
        .map(|pid| pid.to_string())
        .unwrap_or_else(|| "unknown".to_string());
    let mut output = format!(
        "job_id: {}\nworking_directory: {}\nlog_file: {}\npid: {pid}\n",
        result.job_id, result.descriptor.working_directory, result.descriptor.log_file
    );
    if !result.diagnostic_output.trim().is_empty() {
        output.push('\n');
        output.push_str(result.diagnostic_output.trim_end());
        output.push('\n');
    }
    output
}

pub fn format_logs(logs: &JobLogs) -> String {
    let pid = logs
        .pid
        .map(|pid| pid.to_string())
        .unwrap_or_else(|| "unknown".to_string());
    let mut output = format!(
        "job_id: {}\nstate: {}\npid: {pid}\nlog_file: {}\n\n{}",
        logs.job_id, logs.state, logs.log_file, logs.log_tail
    );
    if let Some(nextflow) = &logs.nextflow_log_tail {
        output.push_str("\n--- .nextflow.log ---\n");
        output.push_str(nextflow);
    }
    if !output.ends_with('\n') {
        output.push('\n');
    }
    output
}

pub fn format_mount_outcome(outcome: MountOutcome, mount_point: &str) -> String {
    match outcome {
        MountOutcome::Mounted => format!("mounted at {mount_point}\n"),
        MountOutcome::AlreadyMounted => format!("already mounted at {mount_point}\n"),
        MountOutcome::Unmounted => format!("unmounted {mount_point}\n"),
        MountOutcome::AlreadyUnmounted => format!("{mount_point} is not mounted\n"),
    }
}

pub fn format_mount_status(status: &MountStatus) -> String {
    format!(
        "mode: {}\nauto_mount: {}\nmount_point: {}\nremote_base_path: {}\nmounted: {}\nsshfs_available: {}\n",
        status.mode.as_str(),
        status.auto_mount,
        status.state.mount_point,
        status.state.remote_base_path,
        status.state.is_mounted,
        status.state.tool_available,
    )
}

pub fn format_storage_info(info: &StorageInfo) -> String {
    format!(
        "mode: {}\nmount_point: {}\nremote_base_path: {}\n",
        info.mode.as_str(),
        info.mount_point,
        info.remote_base_path
    )
}

fn describe_error_code(code: &str) -> Option<&'static str> {
    match code {
        codes::AUTHENTICATION_FAILURE => {
            Some("Authentication failed. Check the username, SSH key or password.")
        }
        codes::CONNECTION_FAILURE => Some("Could not establish an SSH connection to the host."),
        codes::TIMEOUT => Some("The remote host did not answer in time."),
        codes::NOT_FOUND => Some("Remote path not found."),
        codes::PERMISSION_DENIED => Some("Permission denied on the remote host."),
        codes::TOOL_UNAVAILABLE => Some("sshfs is not installed on this machine."),
        codes::UNKNOWN_JOB => Some("No artifacts found for this job id."),
        codes::LAUNCH_FAILED => Some("The job could not be launched."),
        codes::INVALID_ARGUMENT => Some("Invalid input; check the command arguments."),
        codes::ALREADY_EXISTS => Some("The target already exists on the remote host."),
        codes::INVALID_UTF8 => Some("The remote file is not UTF-8 text."),
        _ => None,
    }
}

/// Human readable rendering of a command failure.
pub fn format_error(err: &anyhow::Error) -> String {
    match err.downcast_ref::<AppError>() {
        Some(app) => match describe_error_code(app.code()) {
            Some(summary) => format!("{summary}\n  {}: {app}", app.code()),
            None => format!("{}: {app}", app.code()),
        },
        None => format!("{err:#}"),
    }
}

/// Machine readable rendering of a command failure for `--json`.
pub fn format_error_json(err: &anyhow::Error) -> String {
    let value = match err.downcast_ref::<AppError>() {
        Some(app) => serde_json::json!({
            "error": {
                "kind": app.kind().as_str(),
                "code": app.code(),
                "message": app.message(),
                "context": app.context(),
            }
        }),
        None => serde_json::json!({
            "error": { "kind": "internal", "message": format!("{err:#}") }
        }),
    };
    serde_json::to_string_pretty(&value).unwrap_or_else(|_| format!("{err:#}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::errors::AppErrorKind;
    use crate::app::types::JobState;

    #[test]
    fn table_pads_columns_to_widest_cell() {
        let out = table(
            &["a", "bb"],
            &[vec!["long-value".into(), "x".into()], vec!["s".into(), "yy".into()]],
        );
        assert_eq!(out, "a           bb\nlong-value  x\ns           yy\n");
    }

    #[test]
    fn directories_are_listed_first_with_slash() {
        let entry = |name: &str, is_dir| DirEntry {
            name: name.into(),
            size: 4,
            mtime: 0,
            is_dir,
        };
        let out = format_entries(&[entry("z.txt", false), entry("data", true)]);
        let lines: Vec<_> = out.lines().collect();
        assert!(lines[1].starts_with("data/"));
        assert!(lines[2].starts_with("z.txt"));
        assert!(lines[1].contains("1970-01-01T00:00:00Z"));
    }

    #[test]
    fn statuses_render_lowercase_states() {
        let out = format_statuses(&[JobStatusReport {
            job_id: "1767323045678".into(),
            state: JobState::Running,
        }]);
        assert!(out.contains("1767323045678  running"));
    }

    #[test]
    fn app_errors_get_a_summary() {
        let err = anyhow::Error::from(AppError::with_message(
            AppErrorKind::UnknownJob,
            codes::UNKNOWN_JOB,
            "no log file for job 42",
        ));
        let text = format_error(&err);
        assert!(text.starts_with("No artifacts found"));
        assert!(text.contains("unknown_job: no log file for job 42"));
    }

    #[test]
    fn json_errors_carry_kind_and_code() {
        let err = anyhow::Error::from(AppError::invalid_argument("job id must be numeric"));
        let value: serde_json::Value = serde_json::from_str(&format_error_json(&err)).unwrap();
        assert_eq!(value["error"]["kind"], "invalid_argument");
        assert_eq!(value["error"]["code"], codes::INVALID_ARGUMENT);
        assert_eq!(value["error"]["message"], "job id must be numeric");
    }

    #[test]
    fn other_errors_show_their_chain() {
        let err = anyhow::anyhow!("inner").context("outer");
        assert_eq!(format_error(&err), "outer: inner");
    }
}
