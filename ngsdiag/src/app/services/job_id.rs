// SPDX-License-Identifier: AGPL-3.0-only
// Copyright (C) 2026 Alex Sizykh

use std::sync::atomic::{AtomicU64, Ordering};

use time::OffsetDateTime;

use crate::app::errors::{AppError, AppResult};

/// Hands out job ids derived from wall-clock milliseconds.
///
/// Ids never repeat within one generator: when the clock has not advanced
/// past the last id, the previous value plus one is used instead. Two
/// separate control processes can still collide.
#[derive(Debug, Default)]
pub struct JobIdGenerator {
    last: AtomicU64,
}

impl JobIdGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next(&self, now: OffsetDateTime) -> String {
        let millis = u64::try_from(now.unix_timestamp_nanos() / 1_000_000).unwrap_or(0);
        let mut prev = self.last.load(Ordering::Relaxed);
        loop {
            let candidate = millis.max(prev + 1);
            match self
                .last
                .compare_exchange_weak(prev, candidate, Ordering::AcqRel, Ordering::Relaxed)
            {
                Ok(_) => return candidate.to_string(),
                Err(actual) => prev = actual,
            }
        }
    }
}

/// Job ids end up inside remote shell commands; keep them to a safe alphabet.
/// Scheduler ids (`1234`, `1234_5`, `1234.batch`) fit the same alphabet.
pub fn validate_job_id(job_id: &str) -> AppResult<()> {
    let valid = !job_id.is_empty()
        && job_id.len() <= 64
        && job_id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-'))
        && !job_id.starts_with('-');
    if valid {
        Ok(())
    } else {
        Err(AppError::invalid_argument(format!(
            "invalid job id '{job_id}'"
        )))
    }
}
