// SPDX-License-Identifier: AGPL-3.0-only
// Copyright (C) 2026 Alex Sizykh

use crate::app::ports::{TelemetryEvent, TelemetryPort};

/// Emits lifecycle events (submissions, cancellations, mount changes) as
/// structured log records.
#[derive(Clone, Default)]
pub struct TracingTelemetry;

impl TracingTelemetry {
    pub fn new() -> Self {
        Self
    }
}

impl TelemetryPort for TracingTelemetry {
    fn event(&self, name: &'static str, fields: TelemetryEvent) {
        let TelemetryEvent {
            job_id,
            working_directory,
            state,
            mount_point,
            outcome,
        } = fields;

        tracing::info!(
            target: "ngsdiag::telemetry",
            event = name,
            job_id = job_id.as_deref(),
            working_directory = working_directory.as_deref(),
            state = state.as_deref(),
            mount_point = mount_point.as_deref(),
            outcome = outcome.as_deref(),
        );
    }
}
