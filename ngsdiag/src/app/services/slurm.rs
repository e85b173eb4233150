// SPDX-License-Identifier: AGPL-3.0-only
// Copyright (C) 2026 Alex Sizykh

use crate::app::types::JobState;

use super::shell::sh_escape;

pub fn squeue_state_command(job_id: &str) -> String {
    format!("squeue -j {} -h -o %T 2>/dev/null", sh_escape(job_id))
}

pub fn sacct_state_command(job_id: &str) -> String {
    format!("sacct -j {} -n -P -o State 2>/dev/null", sh_escape(job_id))
}

pub fn scancel_command(job_id: &str) -> String {
    format!("scancel {}", sh_escape(job_id))
}

/// First non-empty state token printed by `squeue -h -o %T`.
pub fn parse_squeue_state(output: &str) -> Option<String> {
    output
        .lines()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .map(normalize_slurm_state)
}

pub fn parse_sacct_states(output: &str) -> Vec<String> {
    output
        .lines()
        .filter_map(|line| {
            let line = line.trim();
            if line.is_empty() {
                return None;
            }
            let state = line.split('|').next().unwrap_or(line).trim();
            if state.is_empty() {
                None
            } else {
                Some(state.to_string())
            }
        })
        .collect()
}

/// Maps one scheduler state onto the local vocabulary.
///
/// Every terminal state other than `COMPLETED` (cancelled, timeout, node
/// failure, ...) collapses to `Failed`.
pub fn map_slurm_state(state: &str) -> Option<JobState> {
    let state = normalize_slurm_state(state);
    match state.as_str() {
        "COMPLETED" => Some(JobState::Completed),
        "PENDING" | "REQUEUED" | "REQUEUE_HOLD" | "REQUEUE_FED" | "RESV_DEL_HOLD"
        | "CONFIGURING" | "RESIZING" => Some(JobState::Queued),
        s if is_slurm_state_active(s) => Some(JobState::Running),
        s if is_slurm_state_terminal(s) => Some(JobState::Failed),
        _ => None,
    }
}

/// Collapses the per-step lines printed by `sacct` into one state.
///
/// Any still-active step wins; otherwise all-`COMPLETED` is completed and
/// anything else terminal is a failure.
pub fn sacct_job_state(output: &str) -> Option<JobState> {
    let states = parse_sacct_states(output);
    if states.is_empty() {
        return None;
    }
    let mut all_completed = true;
    let mut any_terminal = false;
    for state in &states {
        match map_slurm_state(state) {
            Some(JobState::Queued) => return Some(JobState::Queued),
            Some(JobState::Running) => return Some(JobState::Running),
            Some(JobState::Completed) => any_terminal = true,
            Some(_) => {
                any_terminal = true;
                all_completed = false;
            }
            None => {}
        }
    }
    match (any_terminal, all_completed) {
        (false, _) => None,
        (true, true) => Some(JobState::Completed),
        (true, false) => Some(JobState::Failed),
    }
}

fn normalize_slurm_state(state: &str) -> String {
    let token = state
        .split(['+', ':', '(', ' '])
        .next()
        .unwrap_or(state)
        .trim();
    token.to_ascii_uppercase()
}

fn is_slurm_state_active(state: &str) -> bool {
    matches!(
        state,
        "PENDING"
            | "RUNNING"
            | "CONFIGURING"
            | "COMPLETING"
            | "SUSPENDED"
            | "RESIZING"
            | "REQUEUED"
            | "STAGE_OUT"
            | "STAGE_IN"
            | "SIGNALING"
    )
}

fn is_slurm_state_terminal(state: &str) -> bool {
    matches!(
        state,
        "COMPLETED"
            | "CANCELLED"
            | "FAILED"
            | "TIMEOUT"
            | "NODE_FAIL"
            | "PREEMPTED"
            | "BOOT_FAIL"
            | "OUT_OF_MEMORY"
            | "DEADLINE"
            | "SPECIAL_EXIT"
            | "REVOKED"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn squeue_states_map_to_local_vocabulary() {
        assert_eq!(map_slurm_state("PENDING"), Some(JobState::Queued));
        assert_eq!(map_slurm_state("RUNNING"), Some(JobState::Running));
        assert_eq!(map_slurm_state("COMPLETING"), Some(JobState::Running));
        assert_eq!(map_slurm_state("COMPLETED"), Some(JobState::Completed));
        assert_eq!(map_slurm_state("FAILED"), Some(JobState::Failed));
        assert_eq!(map_slurm_state("CANCELLED by 1000"), Some(JobState::Failed));
        assert_eq!(map_slurm_state("TIMEOUT"), Some(JobState::Failed));
        assert_eq!(map_slurm_state("UNKNOWN"), None);
    }

    #[test]
    fn parses_first_squeue_line() {
        assert_eq!(parse_squeue_state("\n running \n"), Some("RUNNING".to_string()));
        assert_eq!(parse_squeue_state(""), None);
    }

    #[test]
    fn sacct_running_step_wins() {
        assert_eq!(sacct_job_state("RUNNING\nCOMPLETED\n"), Some(JobState::Running));
    }

    #[test]
    fn sacct_failure_beats_completion() {
        assert_eq!(sacct_job_state("COMPLETED\nFAILED\n"), Some(JobState::Failed));
        assert_eq!(sacct_job_state("CANCELLED+\n"), Some(JobState::Failed));
    }

    #[test]
    fn sacct_all_completed() {
        assert_eq!(sacct_job_state("COMPLETED|\nCOMPLETED|\n"), Some(JobState::Completed));
    }

    #[test]
    fn sacct_empty_is_inconclusive() {
        assert_eq!(sacct_job_state(""), None);
        assert_eq!(sacct_job_state("\n  \n"), None);
    }

    #[test]
    fn commands_quote_the_job_id() {
        assert_eq!(squeue_state_command("42"), "squeue -j '42' -h -o %T 2>/dev/null");
        assert_eq!(sacct_state_command("42"), "sacct -j '42' -n -P -o State 2>/dev/null");
        assert_eq!(scancel_command("42"), "scancel '42'");
    }
}
