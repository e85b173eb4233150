// SPDX-License-Identifier: AGPL-3.0-only
// Copyright (C) 2026 Alex Sizykh

//! Remote execution and storage layer for running NGS pipelines on an HPC
//! host reached over SSH.

pub mod adapters;
pub mod app;
pub mod config;
pub mod logging;
