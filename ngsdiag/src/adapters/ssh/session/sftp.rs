// SPDX-License-Identifier: AGPL-3.0-only
// Copyright (C) 2026 Alex Sizykh

use anyhow::{Context, Result};
use russh_sftp::client::SftpSession;
use russh_sftp::protocol::OpenFlags;
use tokio::io::{AsyncReadExt, AsyncWriteExt};

use crate::app::types::DirEntry;

use super::{RemoteSession, bounded};

fn is_listed(name: &str) -> bool {
    name != "." && name != ".."
}

impl RemoteSession {
    async fn sftp(&self) -> Result<SftpSession> {
        let channel = self
            .handle
            .channel_open_session()
            .await
            .context("open sftp channel")?;
        channel.request_subsystem(true, "sftp").await?;
        let sftp = SftpSession::new(channel.into_stream()).await?;
        Ok(sftp)
    }

    pub(crate) async fn read_dir(&self, path: &str) -> Result<Vec<DirEntry>> {
        bounded("command", self.command_timeout, async {
            let sftp = self.sftp().await?;
            let entries = sftp
                .read_dir(path)
                .await
                .with_context(|| format!("read_dir {path}"))?
                .filter(|entry| is_listed(&entry.file_name()))
                .map(|entry| {
                    let meta = entry.metadata();
                    DirEntry {
                        name: entry.file_name(),
                        size: meta.size.unwrap_or(0),
                        mtime: u64::from(meta.mtime.unwrap_or(0)),
                        is_dir: meta.is_dir(),
                    }
                })
                .collect();
            let _ = sftp.close().await;
            Ok(entries)
        })
        .await
    }

    pub(crate) async fn read_file(&self, path: &str) -> Result<Vec<u8>> {
        bounded("command", self.command_timeout, async {
            let sftp = self.sftp().await?;
            let mut file = sftp
                .open(path)
                .await
                .with_context(|| format!("open remote {path}"))?;
            let mut buf = Vec::new();
            file.read_to_end(&mut buf)
                .await
                .with_context(|| format!("read remote {path}"))?;
            let _ = file.shutdown().await;
            let _ = sftp.close().await;
            Ok(buf)
        })
        .await
    }

    pub(crate) async fn write_file(&self, path: &str, contents: &[u8]) -> Result<()> {
        bounded("command", self.command_timeout, async {
            let sftp = self.sftp().await?;
            let flags = OpenFlags::CREATE | OpenFlags::TRUNCATE | OpenFlags::WRITE;
            let mut file = sftp
                .open_with_flags(path, flags)
                .await
                .with_context(|| format!("create remote {path}"))?;
            file.write_all(contents)
                .await
                .with_context(|| format!("write remote {path}"))?;
            file.flush().await?;
            file.shutdown().await?;
            let _ = sftp.close().await;
            Ok(())
        })
        .await
    }

    pub(crate) async fn exists(&self, path: &str) -> Result<bool> {
        bounded("command", self.command_timeout, async {
            let sftp = self.sftp().await?;
            let exists = sftp
                .try_exists(path)
                .await
                .with_context(|| format!("stat remote {path}"))?;
            let _ = sftp.close().await;
            Ok(exists)
        })
        .await
    }
}
