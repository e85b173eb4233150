// SPDX-License-Identifier: AGPL-3.0-only
// Copyright (C) 2026 Alex Sizykh

use anyhow::{Context, Result};
use serde::Deserialize;
use std::{
    fs,
    path::{Path, PathBuf},
    time::Duration,
};

use crate::app::types::{
    LaunchSettings, MountSettings, SshAuth, SshConfig, StorageMode, StorageSettings,
};
use crate::app::usecases::UseCaseSettings;

const APP_DIR_NAME: &str = "ngsdiag";
const CONFIG_FILE_NAME: &str = "ngsdiag.toml";
const CONFIG_ENV_VAR: &str = "NGSDIAG_CONFIG_PATH";
const PASSWORD_ENV_VAR: &str = "NGSDIAG_SSH_PASSWORD";
const DEFAULT_PORT: u16 = 22;
const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 30;
const DEFAULT_READY_TIMEOUT_SECS: u64 = 30;
const DEFAULT_COMMAND_TIMEOUT_SECS: u64 = 120;
const DEFAULT_KEEPALIVE_SECS: u64 = 10;
const DEFAULT_MOUNT_POINT: &str = "/mnt/hpc";
const DEFAULT_LAUNCH_SETTLE_SECS: u64 = 2;

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct FileConfig {
    host: Option<String>,
    port: Option<u16>,
    username: Option<String>,
    identity_path: Option<String>,
    password: Option<String>,
    key_passphrase: Option<String>,
    known_hosts_path: Option<String>,
    connect_timeout_secs: Option<u64>,
    ready_timeout_secs: Option<u64>,
    command_timeout_secs: Option<u64>,
    keepalive_secs: Option<u64>,
    storage_mode: Option<String>,
    mount_point: Option<String>,
    remote_base_path: Option<String>,
    auto_mount: Option<bool>,
    base_project_path: Option<String>,
    pipeline_path: Option<String>,
    execution_environment: Option<String>,
    launch_settle_secs: Option<u64>,
    verbose: Option<bool>,
}

#[derive(Debug)]
pub struct Config {
    pub host: Option<String>,
    pub port: u16,
    pub username: Option<String>,
    pub identity_path: Option<PathBuf>,
    pub password: Option<String>,
    pub key_passphrase: Option<String>,
    pub known_hosts_path: Option<PathBuf>,
    pub connect_timeout_secs: u64,
    pub ready_timeout_secs: u64,
    pub command_timeout_secs: u64,
    pub keepalive_secs: u64,
    pub storage_mode: StorageMode,
    pub mount_point: String,
    pub remote_base_path: String,
    pub auto_mount: bool,
    pub base_project_path: String,
    pub pipeline_path: String,
    pub execution_environment: Option<String>,
    pub launch_settle_secs: u64,
    pub verbose: bool,
    pub config_path: Option<PathBuf>,
}

impl Config {
    fn require<'a>(value: &'a Option<String>, key: &str) -> Result<&'a str> {
        value
            .as_deref()
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .with_context(|| format!("`{key}` is not configured; set it in the config file or pass it as a flag"))
    }

    /// Connection settings for the remote channel. A key wins over a password
    /// when both are configured.
    pub fn ssh_config(&self) -> Result<SshConfig> {
        let host = Self::require(&self.host, "host")?;
        let username = Self::require(&self.username, "username")?;
        let auth = match (&self.identity_path, &self.password) {
            (Some(path), _) => SshAuth::Key {
                identity_path: path.to_string_lossy().into_owned(),
                passphrase: self.key_passphrase.clone(),
            },
            (None, Some(password)) => SshAuth::Password(password.clone()),
            (None, None) => anyhow::bail!(
                "no ssh credentials configured; set `identity_path`, `password` or {PASSWORD_ENV_VAR}"
            ),
        };
        Ok(SshConfig {
            host: host.to_string(),
            port: self.port,
            username: username.to_string(),
            auth,
            known_hosts_path: self.known_hosts_path.clone(),
            connect_timeout: Duration::from_secs(self.connect_timeout_secs),
            ready_timeout: Duration::from_secs(self.ready_timeout_secs),
            command_timeout: Duration::from_secs(self.command_timeout_secs),
            keepalive_secs: self.keepalive_secs,
        })
    }

    pub fn usecase_settings(&self) -> UseCaseSettings {
        UseCaseSettings {
            storage: StorageSettings {
                mode: self.storage_mode,
                mount_point: self.mount_point.clone(),
                remote_base_path: self.remote_base_path.clone(),
            },
            mount: MountSettings {
                mode: self.storage_mode,
                auto_mount: self.auto_mount,
                mount_point: self.mount_point.clone(),
                remote_base_path: self.remote_base_path.clone(),
                host: self.host.clone().unwrap_or_default(),
                username: self.username.clone().unwrap_or_default(),
                port: self.port,
                identity_path: self
                    .identity_path
                    .as_ref()
                    .map(|p| p.to_string_lossy().into_owned()),
            },
            launch: LaunchSettings {
                execution_environment: self.execution_environment.clone(),
                settle_delay: Duration::from_secs(self.launch_settle_secs),
            },
            base_project_path: self.base_project_path.clone(),
            pipeline_path: self.pipeline_path.clone(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigSource {
    Override,
    Env,
    ConfigFile,
    Default,
}

impl ConfigSource {
    pub fn as_str(self) -> &'static str {
        match self {
            ConfigSource::Override => "override",
            ConfigSource::Env => "env",
            ConfigSource::ConfigFile => "config",
            ConfigSource::Default => "default",
        }
    }
}

#[derive(Debug)]
pub struct ConfigValue<T> {
    pub value: T,
    pub source: ConfigSource,
}

/// Where each startup-relevant value came from. Secrets are reported by
/// source only.
#[derive(Debug)]
pub struct ConfigReport {
    pub config_path: Option<PathBuf>,
    pub config_path_source: Option<ConfigSource>,
    pub config_file_present: bool,
    pub host: ConfigValue<Option<String>>,
    pub port: ConfigValue<u16>,
    pub username: ConfigValue<Option<String>>,
    pub identity_path: ConfigValue<Option<PathBuf>>,
    pub password: Option<ConfigSource>,
    pub storage_mode: ConfigValue<StorageMode>,
    pub mount_point: ConfigValue<String>,
    pub auto_mount: ConfigValue<bool>,
    pub verbose: ConfigValue<bool>,
}

#[derive(Debug)]
pub struct LoadResult {
    pub config: Config,
    pub report: ConfigReport,
}

#[derive(Debug, Default)]
pub struct Overrides {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub username: Option<String>,
    pub identity_path: Option<PathBuf>,
    pub storage_mode: Option<StorageMode>,
    pub verbose: Option<bool>,
}

fn layered<T>(flag: Option<T>, file: Option<T>, default: T) -> (T, ConfigSource) {
    match flag {
        Some(value) => (value, ConfigSource::Override),
        None => match file {
            Some(value) => (value, ConfigSource::ConfigFile),
            None => (default, ConfigSource::Default),
        },
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

pub fn load_with_report(
    config_path_override: Option<PathBuf>,
    overrides: Overrides,
) -> Result<LoadResult> {
    let (config_path, config_path_source, required) = match config_path_override {
        Some(path) => (Some(expand_path(path)), Some(ConfigSource::Override), true),
        None => match config_path_from_env()? {
            Some(path) => (Some(expand_path(path)), Some(ConfigSource::Env), true),
            None => match default_config_path().ok() {
                Some(path) => (Some(path), Some(ConfigSource::Default), false),
                None => (None, None, false),
            },
        },
    };
    let config_file_present = config_path
        .as_deref()
        .map(|path| path.exists())
        .unwrap_or(false);

    let file_config = match config_path.as_deref() {
        Some(path) => read_config_file(path, required)?,
        None => FileConfig::default(),
    };
    let base_dir = config_path.as_deref().and_then(|path| path.parent());

    let (host, host_source) = layered(
        non_empty(overrides.host).map(Some),
        non_empty(file_config.host).map(Some),
        None,
    );
    let (port, port_source) = layered(overrides.port, file_config.port, DEFAULT_PORT);
    if port == 0 {
        anyhow::bail!("port must be between 1 and 65535");
    }
    let (username, username_source) = layered(
        non_empty(overrides.username).map(Some),
        non_empty(file_config.username).map(Some),
        None,
    );
    let (identity_path, identity_source) = layered(
        overrides.identity_path.map(|p| Some(expand_path(p))),
        non_empty(file_config.identity_path).map(|raw| Some(resolve_path(&raw, base_dir))),
        None,
    );

    let (password, password_source) = match non_empty(std::env::var(PASSWORD_ENV_VAR).ok()) {
        Some(password) => (Some(password), Some(ConfigSource::Env)),
        None => match file_config.password.filter(|p| !p.is_empty()) {
            Some(password) => (Some(password), Some(ConfigSource::ConfigFile)),
            None => (None, None),
        },
    };

    let file_mode = file_config
        .storage_mode
        .as_deref()
        .map(|raw| raw.parse::<StorageMode>())
        .transpose()
        .map_err(anyhow::Error::msg)
        .context("invalid `storage_mode` in config file")?;
    let (storage_mode, storage_mode_source) =
        layered(overrides.storage_mode, file_mode, StorageMode::OnDemand);

    let (mount_point, mount_point_source) = layered(
        None,
        non_empty(file_config.mount_point).map(|raw| shellexpand::tilde(&raw).into_owned()),
        DEFAULT_MOUNT_POINT.to_string(),
    );
    let remote_base_path = non_empty(file_config.remote_base_path).unwrap_or_default();
    if storage_mode == StorageMode::Mounted && remote_base_path.is_empty() {
        anyhow::bail!("`remote_base_path` is required when storage_mode is mount");
    }
    let (auto_mount, auto_mount_source) = layered(None, file_config.auto_mount, false);
    let (verbose, verbose_source) = layered(overrides.verbose, file_config.verbose, false);

    let config = Config {
        host,
        port,
        username,
        identity_path,
        password,
        key_passphrase: file_config.key_passphrase.filter(|p| !p.is_empty()),
        known_hosts_path: non_empty(file_config.known_hosts_path)
            .map(|raw| resolve_path(&raw, base_dir)),
        connect_timeout_secs: file_config
            .connect_timeout_secs
            .unwrap_or(DEFAULT_CONNECT_TIMEOUT_SECS),
        ready_timeout_secs: file_config
            .ready_timeout_secs
            .unwrap_or(DEFAULT_READY_TIMEOUT_SECS),
        command_timeout_secs: file_config
            .command_timeout_secs
            .unwrap_or(DEFAULT_COMMAND_TIMEOUT_SECS),
        keepalive_secs: file_config.keepalive_secs.unwrap_or(DEFAULT_KEEPALIVE_SECS),
        storage_mode,
        mount_point,
        remote_base_path,
        auto_mount,
        base_project_path: non_empty(file_config.base_project_path).unwrap_or_default(),
        pipeline_path: non_empty(file_config.pipeline_path).unwrap_or_default(),
        execution_environment: non_empty(file_config.execution_environment),
        launch_settle_secs: file_config
            .launch_settle_secs
            .unwrap_or(DEFAULT_LAUNCH_SETTLE_SECS),
        verbose,
        config_path: config_path.clone(),
    };
    for (key, secs) in [
        ("connect_timeout_secs", config.connect_timeout_secs),
        ("ready_timeout_secs", config.ready_timeout_secs),
        ("command_timeout_secs", config.command_timeout_secs),
    ] {
        if secs == 0 {
            anyhow::bail!("`{key}` must be greater than zero");
        }
    }

    let report = ConfigReport {
        config_path,
        config_path_source,
        config_file_present,
        host: ConfigValue {
            value: config.host.clone(),
            source: host_source,
        },
        port: ConfigValue {
            value: config.port,
            source: port_source,
        },
        username: ConfigValue {
            value: config.username.clone(),
            source: username_source,
        },
        identity_path: ConfigValue {
            value: config.identity_path.clone(),
            source: identity_source,
        },
        password: password_source,
        storage_mode: ConfigValue {
            value: config.storage_mode,
            source: storage_mode_source,
        },
        mount_point: ConfigValue {
            value: config.mount_point.clone(),
            source: mount_point_source,
        },
        auto_mount: ConfigValue {
            value: config.auto_mount,
            source: auto_mount_source,
        },
        verbose: ConfigValue {
            value: config.verbose,
            source: verbose_source,
        },
    };

    Ok(LoadResult { config, report })
}

fn read_config_file(path: &Path, required: bool) -> Result<FileConfig> {
    if !path.exists() {
        if required {
            anyhow::bail!("config file not found at {}", path.display());
        }
        return Ok(FileConfig::default());
    }

    let contents = fs::read_to_string(path)
        .with_context(|| format!("failed to read config file {}", path.display()))?;
    toml::from_str(&contents)
        .with_context(|| format!("failed to parse config file {}", path.display()))
}

fn resolve_path(raw: &str, base_dir: Option<&Path>) -> PathBuf {
    let expanded = shellexpand::tilde(raw);
    let path = PathBuf::from(expanded.as_ref());
    if path.is_absolute() {
        return path;
    }
    match base_dir {
        Some(dir) => dir.join(path),
        None => path,
    }
}

fn expand_path(path: PathBuf) -> PathBuf {
    let path_string = path.to_string_lossy().to_string();
    let expanded = shellexpand::tilde(&path_string);
    PathBuf::from(expanded.as_ref())
}

fn config_path_from_env() -> Result<Option<PathBuf>> {
    match std::env::var_os(CONFIG_ENV_VAR) {
        Some(value) => {
            if value.is_empty() {
                anyhow::bail!("{CONFIG_ENV_VAR} is set but empty");
            }
            Ok(Some(PathBuf::from(value)))
        }
        None => Ok(None),
    }
}

fn default_config_path() -> Result<PathBuf> {
    let base = dirs::config_dir().context("failed to resolve config directory")?;
    Ok(base.join(APP_DIR_NAME).join(CONFIG_FILE_NAME))
}
