// SPDX-License-Identifier: AGPL-3.0-only
// Copyright (C) 2026 Alex Sizykh

use std::fmt;

pub mod codes {
    pub const CONNECTION_FAILURE: &str = "connection_failure";
    pub const AUTHENTICATION_FAILURE: &str = "authentication_failure";
    pub const TIMEOUT: &str = "timeout";
    pub const NOT_FOUND: &str = "not_found";
    pub const PERMISSION_DENIED: &str = "permission_denied";
    pub const TOOL_UNAVAILABLE: &str = "tool_unavailable";
    pub const UNKNOWN_JOB: &str = "unknown_job";
    pub const LAUNCH_FAILED: &str = "launch_failed";
    pub const INVALID_ARGUMENT: &str = "invalid_argument";
    pub const ALREADY_EXISTS: &str = "already_exists";
    pub const INVALID_UTF8: &str = "invalid_utf8";
    pub const INTERNAL_ERROR: &str = "internal_error";
    pub const REMOTE_ERROR: &str = "remote_error";
    pub const LOCAL_ERROR: &str = "local_error";
}

/// Caller-facing error taxonomy shared by every component.
///
/// Mount and unmount report "already in the desired state" as an outcome,
/// so it has no kind here.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppErrorKind {
    Connection,
    Authentication,
    Timeout,
    RemoteNotFound,
    PermissionDenied,
    ToolUnavailable,
    UnknownJob,
    Launcher,
    AlreadyExists,
    InvalidArgument,
    Internal,
}

impl AppErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            AppErrorKind::Connection => "connection",
            AppErrorKind::Authentication => "authentication",
            AppErrorKind::Timeout => "timeout",
            AppErrorKind::RemoteNotFound => "remote_not_found",
            AppErrorKind::PermissionDenied => "permission_denied",
            AppErrorKind::ToolUnavailable => "tool_unavailable",
            AppErrorKind::UnknownJob => "unknown_job",
            AppErrorKind::Launcher => "launcher",
            AppErrorKind::AlreadyExists => "already_exists",
            AppErrorKind::InvalidArgument => "invalid_argument",
            AppErrorKind::Internal => "internal",
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppError {
    kind: AppErrorKind,
    code: &'static str,
    message: String,
    context: Option<String>,
}

impl AppError {
    pub fn with_message(
        kind: AppErrorKind,
        code: &'static str,
        message: impl Into<String>,
    ) -> Self {
        Self {
            kind,
            code,
            message: message.into(),
            context: None,
        }
    }

    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }

    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::with_message(
            AppErrorKind::InvalidArgument,
            codes::INVALID_ARGUMENT,
            message,
        )
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::with_message(AppErrorKind::Internal, codes::INTERNAL_ERROR, message)
    }

    /// Wraps a failure that kept a job from being launched at all.
    /// The underlying code is kept as context so callers can still tell a
    /// refused connection from a failed script write.
    pub fn launcher(cause: AppError) -> Self {
        Self::with_message(
            AppErrorKind::Launcher,
            codes::LAUNCH_FAILED,
            format!("job launch could not start: {}", cause.message),
        )
        .with_context(cause.code)
    }

    pub fn kind(&self) -> AppErrorKind {
        self.kind
    }

    pub fn code(&self) -> &'static str {
        self.code
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn context(&self) -> Option<&str> {
        self.context.as_deref()
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(ctx) = &self.context {
            write!(f, "{} ({})", self.message, ctx)
        } else {
            write!(f, "{}", self.message)
        }
    }
}

impl std::error::Error for AppError {}

pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_includes_context_when_present() {
        let err = AppError::with_message(
            AppErrorKind::RemoteNotFound,
            codes::NOT_FOUND,
            "remote path missing: /data/x",
        )
        .with_context("sftp");
        assert_eq!(err.to_string(), "remote path missing: /data/x (sftp)");
    }

    #[test]
    fn launcher_error_keeps_cause_code() {
        let cause = AppError::with_message(
            AppErrorKind::Connection,
            codes::CONNECTION_FAILURE,
            "connection refused",
        );
        let err = AppError::launcher(cause);
        assert_eq!(err.kind(), AppErrorKind::Launcher);
        assert_eq!(err.code(), codes::LAUNCH_FAILED);
        assert_eq!(err.context(), Some(codes::CONNECTION_FAILURE));
        assert!(err.message().contains("connection refused"));
    }
}
