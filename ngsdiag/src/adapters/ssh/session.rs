// SPDX-License-Identifier: AGPL-3.0-only
// Copyright (C) 2026 Alex Sizykh

use std::future::Future;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use russh::Disconnect;
use russh::client::{Config, Handle};
use russh::keys::known_hosts::{learn_known_hosts, learn_known_hosts_path};
use tokio::net::TcpStream;

use crate::app::types::SshConfig;

use super::error::SshTimeout;

mod auth;
mod exec;
mod sftp;

#[derive(Clone, Debug)]
pub(super) struct ClientHandler {
    host: String,
    addr: SocketAddr,
    known_hosts_path: Option<PathBuf>,
}

impl ClientHandler {
    fn new(host: String, addr: SocketAddr, known_hosts_path: Option<PathBuf>) -> Self {
        Self {
            host,
            addr,
            known_hosts_path,
        }
    }
}

impl russh::client::Handler for ClientHandler {
    type Error = anyhow::Error;
    async fn check_server_key(
        &mut self,
        server_public_key: &russh::keys::ssh_key::PublicKey,
    ) -> std::result::Result<bool, Self::Error> {
        verify_server_key(
            &self.host,
            self.addr,
            server_public_key,
            self.known_hosts_path.as_deref(),
        )
    }
}

fn check_known_hosts_for(
    host: &str,
    port: u16,
    key: &russh::keys::ssh_key::PublicKey,
    known_hosts_path: Option<&Path>,
) -> std::result::Result<bool, russh::keys::Error> {
    match known_hosts_path {
        Some(path) => russh::keys::check_known_hosts_path(host, port, key, path),
        None => russh::keys::check_known_hosts(host, port, key),
    }
}

fn learn_known_hosts_for(
    host: &str,
    port: u16,
    key: &russh::keys::ssh_key::PublicKey,
    known_hosts_path: Option<&Path>,
) -> std::result::Result<(), russh::keys::Error> {
    match known_hosts_path {
        Some(path) => learn_known_hosts_path(host, port, key, path),
        None => learn_known_hosts(host, port, key),
    }
}

/// Accepts keys already in known_hosts (by name, then by address) and
/// records unknown ones. A changed key is rejected.
fn verify_server_key(
    host: &str,
    addr: SocketAddr,
    key: &russh::keys::ssh_key::PublicKey,
    known_hosts_path: Option<&Path>,
) -> std::result::Result<bool, anyhow::Error> {
    let port = addr.port();
    let ip_host = addr.ip().to_string();
    let mut candidates = vec![host.to_string()];
    if ip_host != host {
        candidates.push(ip_host);
    }
    for candidate in &candidates {
        match check_known_hosts_for(candidate, port, key, known_hosts_path) {
            Ok(true) => return Ok(true),
            Ok(false) => {}
            Err(err) => {
                log::warn!("server key validation failed for {host}:{port}: {err}");
                return Err(anyhow!(
                    "server key validation failed for {host}:{port}: {err}"
                ));
            }
        }
    }

    log::info!(
        "server key for {host}:{port} is not present in known_hosts (tried {}); learning",
        candidates.join(", ")
    );
    learn_known_hosts_for(host, port, key, known_hosts_path).map_err(|err| {
        log::warn!("failed to learn server key for {host}:{port}: {err}");
        anyhow!("failed to learn server key for {host}:{port}: {err}")
    })?;
    Ok(true)
}

fn client_config(config: &SshConfig) -> Config {
    Config {
        inactivity_timeout: Some(config.command_timeout + Duration::from_secs(30)),
        keepalive_interval: (config.keepalive_secs > 0)
            .then(|| Duration::from_secs(config.keepalive_secs)),
        window_size: 1024 * 1024,
        ..Default::default()
    }
}

/// Runs `fut` under `limit`, turning an elapsed deadline into [`SshTimeout`].
pub(super) async fn bounded<T>(
    phase: &'static str,
    limit: Duration,
    fut: impl Future<Output = Result<T>>,
) -> Result<T> {
    match tokio::time::timeout(limit, fut).await {
        Ok(result) => result,
        Err(_) => Err(SshTimeout {
            phase,
            secs: limit.as_secs(),
        }
        .into()),
    }
}

/// One authenticated connection, used for a single operation and then closed.
pub(super) struct RemoteSession {
    handle: Handle<ClientHandler>,
    command_timeout: Duration,
}

impl RemoteSession {
    pub(super) async fn open(config: &SshConfig) -> Result<Self> {
        let target = format!("{}@{}:{}", config.username, config.host, config.port);
        let (addr, stream) = bounded("connect", config.connect_timeout, async {
            let addr = tokio::net::lookup_host((config.host.as_str(), config.port))
                .await
                .with_context(|| format!("failed to resolve {}", config.host))?
                .next()
                .ok_or_else(|| anyhow!("no address found for {}", config.host))?;
            let stream = TcpStream::connect(addr)
                .await
                .with_context(|| format!("tcp connect to {addr} failed"))?;
            Ok((addr, stream))
        })
        .await?;
        log::debug!("tcp connection to {target} established");

        let handler = ClientHandler::new(config.host.clone(), addr, config.known_hosts_path.clone());
        let ssh_config = Arc::new(client_config(config));
        let handle = bounded("ready", config.ready_timeout, async {
            let mut handle = russh::client::connect_stream(ssh_config, stream, handler)
                .await
                .context("SSH handshake failed")?;
            auth::authenticate(&mut handle, &config.username, &config.auth).await?;
            Ok(handle)
        })
        .await?;
        log::debug!("authenticated as {target}");

        Ok(Self {
            handle,
            command_timeout: config.command_timeout,
        })
    }

    pub(super) async fn close(self) {
        if let Err(err) = self
            .handle
            .disconnect(Disconnect::ByApplication, "", "en")
            .await
        {
            log::debug!("error while disconnecting: {err}");
        }
    }
}
