// SPDX-License-Identifier: AGPL-3.0-only
// Copyright (C) 2026 Alex Sizykh

use async_trait::async_trait;

use crate::app::errors::{AppError, AppErrorKind, AppResult, codes};
use crate::app::ports::{ExecCapture, RemoteChannelPort};
use crate::app::types::{DirEntry, SshConfig};

mod error;
mod session;
mod unconfigured;

pub use error::{AuthenticationFailure, SshTimeout};
pub use unconfigured::UnconfiguredChannel;

use session::RemoteSession;

/// Remote channel over SSH. Holds only configuration; every call opens its
/// own session and disconnects it before returning.
#[derive(Clone)]
pub struct SshChannel {
    config: SshConfig,
}

impl SshChannel {
    pub fn new(config: SshConfig) -> Self {
        Self { config }
    }

    async fn open(&self) -> AppResult<RemoteSession> {
        RemoteSession::open(&self.config)
            .await
            .map_err(map_connect_error)
    }
}

/// Closes the session whatever the outcome, then maps the operation result.
async fn finish<T>(session: RemoteSession, result: anyhow::Result<T>) -> AppResult<T> {
    session.close().await;
    result.map_err(map_operation_error)
}

fn timeout_of(err: &anyhow::Error) -> Option<&SshTimeout> {
    err.chain().find_map(|cause| cause.downcast_ref::<SshTimeout>())
}

fn map_connect_error(err: anyhow::Error) -> AppError {
    if err.chain().any(|cause| cause.is::<AuthenticationFailure>()) {
        return AppError::with_message(
            AppErrorKind::Authentication,
            codes::AUTHENTICATION_FAILURE,
            format!("ssh authentication failed: {err:#}"),
        );
    }
    if let Some(timeout) = timeout_of(&err) {
        return AppError::with_message(
            AppErrorKind::Timeout,
            codes::TIMEOUT,
            format!("ssh {timeout}"),
        );
    }
    AppError::with_message(
        AppErrorKind::Connection,
        codes::CONNECTION_FAILURE,
        format!("ssh connect failed: {err:#}"),
    )
}

fn sftp_status(err: &anyhow::Error) -> Option<russh_sftp::protocol::StatusCode> {
    err.chain().find_map(|cause| match cause.downcast_ref::<russh_sftp::client::error::Error>() {
        Some(russh_sftp::client::error::Error::Status(status)) => Some(status.status_code),
        _ => None,
    })
}

fn map_operation_error(err: anyhow::Error) -> AppError {
    use russh_sftp::protocol::StatusCode;

    if let Some(timeout) = timeout_of(&err) {
        return AppError::with_message(
            AppErrorKind::Timeout,
            codes::TIMEOUT,
            format!("ssh {timeout}"),
        );
    }
    match sftp_status(&err) {
        Some(StatusCode::NoSuchFile) => AppError::with_message(
            AppErrorKind::RemoteNotFound,
            codes::NOT_FOUND,
            format!("{err:#}"),
        ),
        Some(StatusCode::PermissionDenied) => AppError::with_message(
            AppErrorKind::PermissionDenied,
            codes::PERMISSION_DENIED,
            format!("{err:#}"),
        ),
        _ => AppError::with_message(
            AppErrorKind::Internal,
            codes::REMOTE_ERROR,
            format!("ssh operation failed: {err:#}"),
        ),
    }
}

#[async_trait]
impl RemoteChannelPort for SshChannel {
    #[tracing::instrument(
        name = "ssh",
        level = "debug",
        skip(self, command),
        fields(op = "exec_capture", host = %self.config.host, user = %self.config.username, port = self.config.port)
    )]
    async fn exec_capture(&self, command: &str) -> AppResult<ExecCapture> {
        let session = self.open().await?;
        let result = session.exec_capture(command).await;
        let (stdout, stderr, exit_code) = finish(session, result).await?;
        Ok(ExecCapture {
            stdout,
            stderr,
            exit_code,
        })
    }

    #[tracing::instrument(
        name = "sftp",
        level = "debug",
        skip(self),
        fields(op = "read_directory", host = %self.config.host)
    )]
    async fn read_directory(&self, path: &str) -> AppResult<Vec<DirEntry>> {
        let session = self.open().await?;
        let result = session.read_dir(path).await;
        finish(session, result).await
    }

    #[tracing::instrument(
        name = "sftp",
        level = "debug",
        skip(self),
        fields(op = "read_file", host = %self.config.host)
    )]
    async fn read_file(&self, path: &str) -> AppResult<Vec<u8>> {
        let session = self.open().await?;
        let result = session.read_file(path).await;
        finish(session, result).await
    }

    #[tracing::instrument(
        name = "sftp",
        level = "debug",
        skip(self, contents),
        fields(op = "write_file", host = %self.config.host, bytes = contents.len())
    )]
    async fn write_file(&self, path: &str, contents: &[u8]) -> AppResult<()> {
        let session = self.open().await?;
        let result = session.write_file(path, contents).await;
        finish(session, result).await
    }

    #[tracing::instrument(
        name = "sftp",
        level = "debug",
        skip(self),
        fields(op = "exists", host = %self.config.host)
    )]
    async fn exists(&self, path: &str) -> AppResult<bool> {
        let session = self.open().await?;
        let result = session.exists(path).await;
        finish(session, result).await
    }

    #[tracing::instrument(
        name = "ssh",
        level = "debug",
        skip(self),
        fields(op = "test_connection", host = %self.config.host, user = %self.config.username, port = self.config.port)
    )]
    async fn test_connection(&self) -> AppResult<()> {
        let session = self.open().await?;
        session.close().await;
        Ok(())
    }
}
