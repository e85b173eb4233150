// SPDX-License-Identifier: AGPL-3.0-only
// Copyright (C) 2026 Alex Sizykh

use std::path::PathBuf;

use clap::{ArgGroup, Args, CommandFactory, FromArgMatches, Parser, Subcommand};

use crate::app::types::StorageMode;

mod format;
mod run;

pub use format::{format_error, format_error_json};
pub use run::run;

#[derive(Parser, Debug)]
#[command(
    name = "ngsdiag",
    version,
    about = "Submit NGS pipeline jobs to a remote HPC host and work with its filesystem",
    long_about = None,
    after_help = "Configuration precedence: defaults < config file < command-line flags.\n\
Config path precedence: NGSDIAG_CONFIG_PATH < --config.\n\
If neither is given, ngsdiag reads the default config file location when it exists.\n\
The SSH password can be supplied through NGSDIAG_SSH_PASSWORD."
)]
pub struct Opts {
    #[arg(
        short,
        long,
        value_name = "PATH",
        global = true,
        help = "Path to a TOML config file. When omitted, ngsdiag uses NGSDIAG_CONFIG_PATH if set, otherwise the default config file location if available."
    )]
    pub config: Option<PathBuf>,
    #[arg(long, value_name = "HOST", global = true, help = "Remote host. Overrides `host` from the config file.")]
    pub host: Option<String>,
    #[arg(long, value_name = "PORT", global = true, help = "SSH port. Overrides `port` from the config file.")]
    pub port: Option<u16>,
    #[arg(
        short,
        long = "user",
        value_name = "USER",
        global = true,
        help = "Remote user name. Overrides `username` from the config file."
    )]
    pub username: Option<String>,
    #[arg(
        short,
        long = "identity",
        value_name = "PATH",
        global = true,
        help = "Private key used for authentication. Overrides `identity_path` from the config file."
    )]
    pub identity_path: Option<PathBuf>,
    #[arg(
        long,
        value_name = "MODE",
        global = true,
        help = "Storage mode: `sftp` (per-call sessions) or `mount` (sshfs mount point). Overrides `storage_mode` from the config file."
    )]
    pub storage_mode: Option<StorageMode>,
    #[arg(
        short,
        long,
        global = true,
        action = clap::ArgAction::SetTrue,
        help = "Enable debug logging and include logs from dependencies. Overrides `verbose` from the config file."
    )]
    pub verbose: bool,
    #[arg(long, global = true, help = "Print results as JSON.")]
    pub json: bool,
    #[command(subcommand)]
    pub cmd: Cmd,
}

#[derive(Subcommand, Debug)]
pub enum Cmd {
    /// Open and close one SSH session.
    TestConnection,
    /// Run a shell command on the remote host.
    Exec(ExecArgs),
    /// List a remote directory.
    Ls(PathArg),
    /// Print a remote file.
    Cat(PathArg),
    /// Upload a local file.
    Put(PutArgs),
    /// Download a remote file.
    Get(GetArgs),
    /// Create a remote directory and its parents.
    Mkdir(PathArg),
    /// Remove a remote file or directory tree.
    Rm(PathArg),
    /// Check whether a remote path exists.
    Exists(PathArg),
    /// List project directories under `base_project_path`.
    Projects,
    /// Create a project directory with `raw` and `results` folders.
    CreateProject(ProjectArgs),
    /// Launch a detached job in a remote working directory.
    Submit(SubmitArgs),
    /// Resolve the state of one or more jobs.
    Status(StatusArgs),
    /// Show the log tail of a job.
    Logs(LogsArgs),
    /// Ask the scheduler to cancel a job.
    Cancel(CancelArgs),
    /// Attach the remote filesystem at the configured mount point.
    Mount,
    /// Detach the mount point.
    Unmount,
    /// Show whether the mount point is attached.
    MountStatus,
    /// Show the configured storage mode and paths.
    StorageInfo,
}

impl Cmd {
    /// Commands that change or inspect the mount themselves skip auto-mount.
    pub fn manages_mount(&self) -> bool {
        matches!(self, Cmd::Mount | Cmd::Unmount | Cmd::MountStatus)
    }
}

#[derive(Args, Debug)]
pub struct PathArg {
    /// Remote path.
    pub path: String,
}

#[derive(Args, Debug)]
pub struct ExecArgs {
    /// Command to run. A single argument is passed to the remote shell as
    /// written; several arguments are quoted word by word.
    #[arg(required = true, trailing_var_arg = true, allow_hyphen_values = true)]
    pub command: Vec<String>,
}

#[derive(Args, Debug)]
pub struct ProjectArgs {
    /// Absolute remote path, or a name placed under `base_project_path`.
    pub project: String,
}

#[derive(Args, Debug)]
pub struct PutArgs {
    pub local: PathBuf,
    pub remote: String,
}

#[derive(Args, Debug)]
pub struct GetArgs {
    pub remote: String,
    pub local: PathBuf,
}

#[derive(Args, Debug)]
#[command(group(ArgGroup::new("job").required(true).args(["command", "pipeline"])))]
pub struct SubmitArgs {
    /// Absolute remote working directory (the project directory for --pipeline).
    #[arg(long, value_name = "DIR")]
    pub workdir: String,
    /// TOML file with pipeline settings; launches the configured pipeline.
    #[arg(long, value_name = "FILE", conflicts_with = "command")]
    pub pipeline: Option<PathBuf>,
    /// Command to launch, given after `--`. Quoting follows `exec`.
    #[arg(last = true, value_name = "COMMAND")]
    pub command: Vec<String>,
}

#[derive(Args, Debug)]
pub struct StatusArgs {
    #[arg(required = true, value_name = "JOB_ID")]
    pub job_ids: Vec<String>,
    /// Working directory the jobs were launched in, if known.
    #[arg(long, value_name = "DIR")]
    pub workdir: Option<String>,
}

#[derive(Args, Debug)]
pub struct LogsArgs {
    pub job_id: String,
    #[arg(long, value_name = "DIR")]
    pub workdir: Option<String>,
}

#[derive(Args, Debug)]
pub struct CancelArgs {
    pub job_id: String,
}

pub struct ParsedOpts {
    pub opts: Opts,
    pub verbose_override: Option<bool>,
}

pub fn cli_command() -> clap::Command {
    Opts::command()
}

pub fn parse_opts() -> ParsedOpts {
    let matches = cli_command().get_matches();
    let opts = Opts::from_arg_matches(&matches).unwrap_or_else(|err| err.exit());
    // An absent -v must not override `verbose = true` from the config file.
    let verbose_override = opts.verbose.then_some(true);
    ParsedOpts {
        opts,
        verbose_override,
    }
}
