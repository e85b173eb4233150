// SPDX-License-Identifier: AGPL-3.0-only
// Copyright (C) 2026 Alex Sizykh

pub mod job_id;
pub mod launcher;
pub mod mount;
pub mod paths;
pub mod pipeline;
pub mod scripts;
pub mod shell;
pub mod slurm;
pub mod status;
pub mod storage;
#[cfg(test)]
pub(crate) mod testing;
