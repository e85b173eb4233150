// SPDX-License-Identifier: AGPL-3.0-only
// Copyright (C) 2026 Alex Sizykh

#[derive(Clone, Debug, Default)]
pub struct TelemetryEvent {
    pub job_id: Option<String>,
    pub working_directory: Option<String>,
    pub state: Option<String>,
    pub mount_point: Option<String>,
    pub outcome: Option<String>,
}

pub trait TelemetryPort: Send + Sync {
    fn event(&self, name: &'static str, fields: TelemetryEvent);
}
