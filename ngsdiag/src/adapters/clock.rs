// SPDX-License-Identifier: AGPL-3.0-only
// Copyright (C) 2026 Alex Sizykh

use time::OffsetDateTime;

use crate::app::ports::ClockPort;

/// Wall clock at millisecond resolution, the granularity of job ids.
/// The `Submitted:` stamp in a command record then names the same instant
/// as the id it belongs to.
#[derive(Clone, Default)]
pub struct SystemClock;

impl SystemClock {
    pub fn new() -> Self {
        Self
    }
}

fn truncate_to_millis(ts: OffsetDateTime) -> OffsetDateTime {
    ts.replace_nanosecond(u32::from(ts.millisecond()) * 1_000_000)
        .unwrap_or(ts)
}

impl ClockPort for SystemClock {
    fn now_utc(&self) -> OffsetDateTime {
        truncate_to_millis(OffsetDateTime::now_utc())
    }
}
