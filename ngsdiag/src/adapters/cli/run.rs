// SPDX-License-Identifier: AGPL-3.0-only
// Copyright (C) 2026 Alex Sizykh

use std::io::Write;
use std::process::ExitCode;

use anyhow::Context;
use serde_json::json;

use crate::app::services::pipeline::PipelineSettings;
use crate::app::services::shell::shell_word;
use crate::app::usecases::UseCases;

use super::Cmd;
use super::format::{
    format_created_project, format_entries, format_launch, format_logs, format_mount_outcome,
    format_mount_status, format_projects, format_statuses, format_storage_info, to_json,
};

fn emit(text: &str) -> anyhow::Result<()> {
    let mut stdout = std::io::stdout().lock();
    stdout.write_all(text.as_bytes())?;
    stdout.flush()?;
    Ok(())
}

fn emit_json<T: serde::Serialize + ?Sized>(value: &T) -> anyhow::Result<()> {
    emit(&format!("{}\n", to_json(value)?))
}

/// Remote command line from CLI words. One word is taken as a complete
/// command string; several words are quoted so each stays one argument.
fn command_line(words: &[String]) -> String {
    match words {
        [single] => single.clone(),
        _ => words
            .iter()
            .map(|word| shell_word(word))
            .collect::<Vec<_>>()
            .join(" "),
    }
}

/// Remote exit status as a process exit byte; signals and out-of-range
/// values become 1.
fn exit_status_byte(code: i32) -> u8 {
    u8::try_from(code).unwrap_or(1)
}

/// Executes one subcommand against the use cases and prints its result.
pub async fn run(usecases: &UseCases, cmd: Cmd, json: bool) -> anyhow::Result<ExitCode> {
    match cmd {
        Cmd::TestConnection => {
            usecases.test_connection().await?;
            if json {
                emit_json(&json!({ "connected": true }))?;
            } else {
                emit("connection ok\n")?;
            }
        }
        Cmd::Exec(args) => {
            let capture = usecases.exec(&command_line(&args.command)).await?;
            if json {
                emit_json(&json!({
                    "stdout": capture.stdout_text(),
                    "stderr": capture.stderr_text(),
                    "exit_code": capture.exit_code,
                }))?;
            } else {
                std::io::stdout().lock().write_all(&capture.stdout)?;
                std::io::stderr().lock().write_all(&capture.stderr)?;
            }
            return Ok(ExitCode::from(exit_status_byte(capture.exit_code)));
        }
        Cmd::Ls(args) => {
            let entries = usecases.list(&args.path).await?;
            if json {
                emit_json(&entries)?;
            } else {
                emit(&format_entries(&entries))?;
            }
        }
        Cmd::Cat(args) => {
            let bytes = usecases.read(&args.path).await?;
            let mut stdout = std::io::stdout().lock();
            stdout.write_all(&bytes)?;
            stdout.flush()?;
        }
        Cmd::Put(args) => {
            let contents = tokio::fs::read(&args.local)
                .await
                .with_context(|| format!("failed to read {}", args.local.display()))?;
            usecases.write(&args.remote, &contents).await?;
            if json {
                emit_json(&json!({ "path": args.remote, "bytes": contents.len() }))?;
            } else {
                emit(&format!("wrote {} bytes to {}\n", contents.len(), args.remote))?;
            }
        }
        Cmd::Get(args) => {
            let contents = usecases.read(&args.remote).await?;
            tokio::fs::write(&args.local, &contents)
                .await
                .with_context(|| format!("failed to write {}", args.local.display()))?;
            if json {
                emit_json(&json!({
                    "path": args.local.display().to_string(),
                    "bytes": contents.len(),
                }))?;
            } else {
                emit(&format!(
                    "wrote {} bytes to {}\n",
                    contents.len(),
                    args.local.display()
                ))?;
            }
        }
        Cmd::Mkdir(args) => {
            usecases.mkdir(&args.path).await?;
            if json {
                emit_json(&json!({ "path": args.path, "created": true }))?;
            }
        }
        Cmd::Rm(args) => {
            usecases.remove(&args.path).await?;
            if json {
                emit_json(&json!({ "path": args.path, "removed": true }))?;
            }
        }
        Cmd::Exists(args) => {
            let exists = usecases.exists(&args.path).await?;
            if json {
                emit_json(&json!({ "path": args.path, "exists": exists }))?;
            } else {
                emit(&format!("{exists}\n"))?;
            }
            if !exists {
                return Ok(ExitCode::FAILURE);
            }
        }
        Cmd::Projects => {
            let projects = usecases.list_projects().await?;
            if json {
                emit_json(&projects)?;
            } else {
                emit(&format_projects(&projects))?;
            }
        }
        Cmd::CreateProject(args) => {
            let project = usecases.create_project(&args.project).await?;
            if json {
                emit_json(&project)?;
            } else {
                emit(&format_created_project(&project))?;
            }
        }
        Cmd::Submit(args) => {
            let result = match &args.pipeline {
                Some(path) => {
                    let settings = PipelineSettings::load(path)?;
                    usecases.submit_pipeline(&args.workdir, &settings).await?
                }
                None => {
                    usecases
                        .submit(&args.workdir, &command_line(&args.command))
                        .await?
                }
            };
            if json {
                emit_json(&result)?;
            } else {
                emit(&format_launch(&result))?;
            }
        }
        Cmd::Status(args) => {
            let reports = usecases
                .job_status(&args.job_ids, args.workdir.as_deref())
                .await?;
            if json {
                emit_json(&reports)?;
            } else {
                emit(&format_statuses(&reports))?;
            }
        }
        Cmd::Logs(args) => {
            let logs = usecases
                .job_logs(&args.job_id, args.workdir.as_deref())
                .await?;
            if json {
                emit_json(&logs)?;
            } else {
                emit(&format_logs(&logs))?;
            }
        }
        Cmd::Cancel(args) => {
            let sent = usecases.cancel_job(&args.job_id).await?;
            if json {
                emit_json(&json!({ "job_id": args.job_id, "sent": sent }))?;
            } else if sent {
                emit(&format!("cancellation requested for job {}\n", args.job_id))?;
            } else {
                emit(&format!("scheduler did not accept cancellation of job {}\n", args.job_id))?;
            }
            if !sent {
                return Ok(ExitCode::FAILURE);
            }
        }
        Cmd::Mount => {
            let outcome = usecases.mount().await?;
            if json {
                emit_json(&json!({ "outcome": outcome }))?;
            } else {
                emit(&format_mount_outcome(
                    outcome,
                    &usecases.storage_info().mount_point,
                ))?;
            }
        }
        Cmd::Unmount => {
            let outcome = usecases.unmount().await?;
            if json {
                emit_json(&json!({ "outcome": outcome }))?;
            } else {
                emit(&format_mount_outcome(
                    outcome,
                    &usecases.storage_info().mount_point,
                ))?;
            }
        }
        Cmd::MountStatus => {
            let status = usecases.mount_status().await?;
            if json {
                emit_json(&status)?;
            } else {
                emit(&format_mount_status(&status))?;
            }
        }
        Cmd::StorageInfo => {
            let info = usecases.storage_info();
            if json {
                emit_json(&info)?;
            } else {
                emit(&format_storage_info(&info))?;
            }
        }
    }
    Ok(ExitCode::SUCCESS)
}
