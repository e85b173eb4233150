// SPDX-License-Identifier: AGPL-3.0-only
// Copyright (C) 2026 Alex Sizykh

use std::process::ExitCode;
use std::sync::Arc;

use ngsdiag::adapters;
use ngsdiag::app::ports::RemoteChannelPort;
use ngsdiag::app::usecases::UseCases;
use ngsdiag::config;
use ngsdiag::logging;

fn log_config_report(report: &config::ConfigReport) {
    match (&report.config_path, report.config_path_source) {
        (Some(path), Some(source)) => {
            tracing::info!(
                "config path: {} (source={}, present={})",
                path.display(),
                source.as_str(),
                report.config_file_present
            );
        }
        (Some(path), None) => {
            tracing::info!(
                "config path: {} (present={})",
                path.display(),
                report.config_file_present
            );
        }
        (None, _) => {
            tracing::info!("config path: (none)");
        }
    }
    tracing::info!(
        "config host: {} (source={})",
        report.host.value.as_deref().unwrap_or("(unset)"),
        report.host.source.as_str()
    );
    tracing::info!(
        "config port: {} (source={})",
        report.port.value,
        report.port.source.as_str()
    );
    tracing::info!(
        "config username: {} (source={})",
        report.username.value.as_deref().unwrap_or("(unset)"),
        report.username.source.as_str()
    );
    match &report.identity_path.value {
        Some(path) => tracing::info!(
            "config identity_path: {} (source={})",
            path.display(),
            report.identity_path.source.as_str()
        ),
        None => tracing::info!("config identity_path: (unset)"),
    }
    tracing::info!(
        "config password: {}",
        report
            .password
            .map(|source| format!("set (source={})", source.as_str()))
            .unwrap_or_else(|| "(unset)".to_string())
    );
    tracing::info!(
        "config storage_mode: {} (source={})",
        report.storage_mode.value.as_str(),
        report.storage_mode.source.as_str()
    );
    tracing::info!(
        "config mount_point: {} (source={})",
        report.mount_point.value,
        report.mount_point.source.as_str()
    );
    tracing::info!(
        "config auto_mount: {} (source={})",
        report.auto_mount.value,
        report.auto_mount.source.as_str()
    );
    tracing::info!(
        "config verbose: {} (source={})",
        report.verbose.value,
        report.verbose.source.as_str()
    );
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let parsed = adapters::cli::parse_opts();
    let opts = parsed.opts;
    let config::LoadResult { config, report } = config::load_with_report(
        opts.config,
        config::Overrides {
            host: opts.host,
            port: opts.port,
            username: opts.username,
            identity_path: opts.identity_path,
            storage_mode: opts.storage_mode,
            verbose: parsed.verbose_override,
        },
    )?;
    logging::init(config.verbose);
    log_config_report(&report);

    let channel: Arc<dyn RemoteChannelPort> = match config.ssh_config() {
        Ok(ssh) => Arc::new(adapters::ssh::SshChannel::new(ssh)),
        Err(err) => {
            tracing::debug!("remote channel unavailable: {err:#}");
            Arc::new(adapters::ssh::UnconfiguredChannel::new(format!("{err:#}")))
        }
    };
    let usecases = UseCases::new(
        channel,
        Arc::new(adapters::fs::LocalFilesystem::new()),
        Arc::new(adapters::host::LocalCommandRunner::new()),
        Arc::new(adapters::clock::SystemClock::new()),
        Arc::new(adapters::telemetry::TracingTelemetry::new()),
        config.usecase_settings(),
    );
    if !opts.cmd.manages_mount() {
        usecases.auto_mount_if_enabled().await;
    }

    match adapters::cli::run(&usecases, opts.cmd, opts.json).await {
        Ok(code) => Ok(code),
        Err(err) => {
            tracing::debug!("command failed: {err:?}");
            if opts.json {
                eprintln!("{}", adapters::cli::format_error_json(&err));
            } else {
                eprintln!("{}", adapters::cli::format_error(&err));
            }
            Ok(ExitCode::FAILURE)
        }
    }
}
