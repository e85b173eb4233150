// SPDX-License-Identifier: AGPL-3.0-only
// Copyright (C) 2026 Alex Sizykh

pub mod cli;
pub mod clock;
pub mod fs;
pub mod host;
pub mod ssh;
pub mod telemetry;
