// SPDX-License-Identifier: AGPL-3.0-only
// Copyright (C) 2026 Alex Sizykh

use thiserror::Error as ThisError;

#[derive(Debug, ThisError)]
#[error("authentication_failure")]
pub struct AuthenticationFailure;

/// One of the bounded SSH phases ran past its deadline.
#[derive(Debug, ThisError)]
#[error("{phase} timed out after {secs}s")]
pub struct SshTimeout {
    pub phase: &'static str,
    pub secs: u64,
}
