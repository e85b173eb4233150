// SPDX-License-Identifier: AGPL-3.0-only
// Copyright (C) 2026 Alex Sizykh

//! Remote artifact templates for a launched job.
//!
//! Every script is a `tera` template with named slots. Path slots are
//! shell-quoted before rendering; the command slot is inserted verbatim.

use tera::Context;

use crate::app::errors::{AppError, AppResult};
use crate::app::types::JobDescriptor;

use super::shell::{remote_file_name, sh_escape};

const COMMAND_RECORD_TEMPLATE: &str = r#"# ngsdiag pipeline command
# Job ID: {{ job_id }}
# Submitted: {{ submitted_at }}
# Working directory: {{ working_directory_display }}

# Command:
{{ command }}

# To run manually:
# cd {{ working_directory }} && bash {{ runner_name }}
"#;

const RUNNER_TEMPLATE: &str = r#"#!/bin/bash
# ngsdiag runner script
# Job ID: {{ job_id }}

LOG_FILE={{ log_file }}

if [ -f /etc/profile ]; then
    . /etc/profile
fi
if [ -f "$HOME/.bash_profile" ]; then
    . "$HOME/.bash_profile"
elif [ -f "$HOME/.profile" ]; then
    . "$HOME/.profile"
fi
if [ -f "$HOME/.bashrc" ]; then
    . "$HOME/.bashrc"
fi

if command -v module >/dev/null 2>&1; then
    module load slurm 2>/dev/null || true
    module load scheduler 2>/dev/null || true
fi
if ! command -v sbatch >/dev/null 2>&1; then
    export PATH="/usr/local/slurm/bin:/opt/slurm/bin:/usr/bin:$PATH"
fi

{{ activation }}

cd {{ working_directory }} || {
    printf 'Cannot enter working directory %s, FAILED\n' {{ working_directory }} >> "$LOG_FILE"
    exit 1
}

{
    echo "=== ngsdiag job started ==="
    echo "Job ID: {{ job_id }}"
    echo "Start Time: $(date)"
    echo "Working Directory: $(pwd)"
    echo "Environment: ${CONDA_DEFAULT_ENV:-none}"
    echo "sbatch: $(command -v sbatch 2>/dev/null || echo 'not found')"
    echo "PATH: $PATH"
    echo "================================"
    echo ""
} >> "$LOG_FILE"

(
{{ command }}
) >> "$LOG_FILE" 2>&1
EXIT_CODE=$?

{
    echo ""
    echo "================================"
    echo "End Time: $(date)"
    echo "Exit Code: $EXIT_CODE"
} >> "$LOG_FILE"

exit "$EXIT_CODE"
"#;

const ACTIVATION_TEMPLATE: &str = r#"for conda_sh in "$HOME/miniconda3/etc/profile.d/conda.sh" "$HOME/anaconda3/etc/profile.d/conda.sh" /opt/conda/etc/profile.d/conda.sh; do
    if [ -f "$conda_sh" ]; then
        . "$conda_sh"
        break
    fi
done
if ! conda activate {{ environment }} >> "$LOG_FILE" 2>&1; then
    printf 'Environment activation FAILED: %s\n' {{ environment }} >> "$LOG_FILE"
    echo "End Time: $(date)" >> "$LOG_FILE"
    echo "Exit Code: 1" >> "$LOG_FILE"
    exit 1
fi"#;

const NO_ACTIVATION: &str = "# no execution environment configured";

const LAUNCHER_TEMPLATE: &str = r#"#!/bin/bash
# ngsdiag launcher script
# Job ID: {{ job_id }}
cd {{ working_directory }} || exit 1
nohup bash {{ runner_script }} </dev/null >/dev/null 2>{{ error_capture }} &
PID=$!
echo "$PID" > {{ pid_file }}
disown "$PID" 2>/dev/null || true
echo "$PID"
"#;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobScripts {
    pub command_record: String,
    pub runner: String,
    pub launcher: String,
}

/// Renders one template with the given named slots.
pub fn render_script(template: &str, slots: &[(&str, &str)]) -> AppResult<String> {
    let mut context = Context::new();
    for (name, value) in slots {
        context.insert(*name, value);
    }
    tera::Tera::one_off(template, &context, false)
        .map_err(|err| AppError::internal(format!("script template render failed: {err}")))
}

pub fn render_job_scripts(
    descriptor: &JobDescriptor,
    command: &str,
    submitted_at: &str,
    environment: Option<&str>,
) -> AppResult<JobScripts> {
    let working_directory = sh_escape(&descriptor.working_directory);
    let runner_name = sh_escape(remote_file_name(&descriptor.runner_script));

    let command_record = render_script(
        COMMAND_RECORD_TEMPLATE,
        &[
            ("job_id", &descriptor.job_id),
            ("submitted_at", submitted_at),
            ("working_directory_display", &descriptor.working_directory),
            ("working_directory", &working_directory),
            ("command", command),
            ("runner_name", &runner_name),
        ],
    )?;

    let activation = match environment.map(str::trim).filter(|env| !env.is_empty()) {
        Some(env) => render_script(ACTIVATION_TEMPLATE, &[("environment", &sh_escape(env))])?,
        None => NO_ACTIVATION.to_string(),
    };
    let runner = render_script(
        RUNNER_TEMPLATE,
        &[
            ("job_id", &descriptor.job_id),
            ("log_file", &sh_escape(&descriptor.log_file)),
            ("activation", &activation),
            ("working_directory", &working_directory),
            ("command", command),
        ],
    )?;

    let launcher = render_script(
        LAUNCHER_TEMPLATE,
        &[
            ("job_id", &descriptor.job_id),
            ("working_directory", &working_directory),
            ("runner_script", &sh_escape(&descriptor.runner_script)),
            ("error_capture", &sh_escape(&descriptor.error_capture)),
            ("pid_file", &sh_escape(&descriptor.pid_file)),
        ],
    )?;

    Ok(JobScripts {
        command_record,
        runner,
        launcher,
    })
}
