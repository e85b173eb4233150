// SPDX-License-Identifier: AGPL-3.0-only
// Copyright (C) 2026 Alex Sizykh

pub mod clock;
pub mod local_command;
pub mod local_fs;
pub mod remote_channel;
pub mod storage;
pub mod telemetry;

pub use clock::ClockPort;
pub use local_command::{CommandOutput, LocalCommandPort};
pub use local_fs::LocalFilesystemPort;
pub use remote_channel::{ExecCapture, RemoteChannelPort};
pub use storage::StoragePort;
pub use telemetry::{TelemetryEvent, TelemetryPort};
