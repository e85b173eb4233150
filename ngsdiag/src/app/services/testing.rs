// SPDX-License-Identifier: AGPL-3.0-only
// Copyright (C) 2026 Alex Sizykh

//! In-memory port fakes shared by the service tests.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use time::OffsetDateTime;
use time::macros::datetime;

use crate::adapters::fs::LocalFilesystem;
use crate::adapters::host::LocalCommandRunner;
use crate::app::errors::{AppError, AppErrorKind, AppResult, codes};
use crate::app::ports::{
    ClockPort, ExecCapture, LocalCommandPort, LocalFilesystemPort, RemoteChannelPort,
};
use crate::app::types::DirEntry;

pub fn capture(stdout: &str, exit_code: i32) -> ExecCapture {
    ExecCapture {
        stdout: stdout.as_bytes().to_vec(),
        stderr: Vec::new(),
        exit_code,
    }
}

pub fn failed_capture(stderr: &str, exit_code: i32) -> ExecCapture {
    ExecCapture {
        stdout: Vec::new(),
        stderr: stderr.as_bytes().to_vec(),
        exit_code,
    }
}

#[derive(Default)]
struct FakeState {
    files: BTreeMap<String, Vec<u8>>,
    dirs: BTreeMap<String, Vec<DirEntry>>,
    responses: Vec<(String, ExecCapture)>,
    commands: Vec<String>,
    failure: Option<AppError>,
}

/// Remote channel backed by a file map and scripted command responses.
///
/// A command receives the response of the first registered pattern it
/// contains; unmatched commands succeed with empty output.
#[derive(Default)]
pub struct FakeChannel {
    state: Mutex<FakeState>,
}

impl FakeChannel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers or replaces the response for commands containing `pattern`.
    pub fn respond(&self, pattern: &str, response: ExecCapture) {
        let mut state = self.state.lock().expect("fake channel lock");
        if let Some(slot) = state.responses.iter_mut().find(|(p, _)| p == pattern) {
            slot.1 = response;
        } else {
            state.responses.push((pattern.to_string(), response));
        }
    }

    pub fn put_file(&self, path: &str, contents: &[u8]) {
        let mut state = self.state.lock().expect("fake channel lock");
        state.files.insert(path.to_string(), contents.to_vec());
    }

    pub fn put_dir(&self, path: &str, entries: Vec<DirEntry>) {
        let mut state = self.state.lock().expect("fake channel lock");
        state.dirs.insert(path.to_string(), entries);
    }

    pub fn file(&self, path: &str) -> Option<Vec<u8>> {
        let state = self.state.lock().expect("fake channel lock");
        state.files.get(path).cloned()
    }

    pub fn commands(&self) -> Vec<String> {
        self.state.lock().expect("fake channel lock").commands.clone()
    }

    /// Makes every subsequent call fail with `err`.
    pub fn fail_with(&self, err: AppError) {
        self.state.lock().expect("fake channel lock").failure = Some(err);
    }

    fn check_failure(&self) -> AppResult<()> {
        match &self.state.lock().expect("fake channel lock").failure {
            Some(err) => Err(err.clone()),
            None => Ok(()),
        }
    }
}

fn not_found(path: &str) -> AppError {
    AppError::with_message(
        AppErrorKind::RemoteNotFound,
        codes::NOT_FOUND,
        format!("remote path not found: {path}"),
    )
}

#[async_trait]
impl RemoteChannelPort for FakeChannel {
    async fn exec_capture(&self, command: &str) -> AppResult<ExecCapture> {
        self.check_failure()?;
        let mut state = self.state.lock().expect("fake channel lock");
        state.commands.push(command.to_string());
        let response = state
            .responses
            .iter()
            .find(|(pattern, _)| command.contains(pattern.as_str()))
            .map(|(_, response)| response.clone())
            .unwrap_or_default();
        Ok(response)
    }

    async fn read_directory(&self, path: &str) -> AppResult<Vec<DirEntry>> {
        self.check_failure()?;
        let state = self.state.lock().expect("fake channel lock");
        state.dirs.get(path).cloned().ok_or_else(|| not_found(path))
    }

    async fn read_file(&self, path: &str) -> AppResult<Vec<u8>> {
        self.check_failure()?;
        let state = self.state.lock().expect("fake channel lock");
        state.files.get(path).cloned().ok_or_else(|| not_found(path))
    }

    async fn write_file(&self, path: &str, contents: &[u8]) -> AppResult<()> {
        self.check_failure()?;
        self.put_file(path, contents);
        Ok(())
    }

    async fn exists(&self, path: &str) -> AppResult<bool> {
        self.check_failure()?;
        let state = self.state.lock().expect("fake channel lock");
        Ok(state.files.contains_key(path) || state.dirs.contains_key(path))
    }

    async fn test_connection(&self) -> AppResult<()> {
        self.check_failure()
    }
}

/// Remote channel whose "remote host" is this machine: commands go to
/// `bash -c` and files to the local filesystem. Each call is independent,
/// so dropping one instance and creating another behaves like reconnecting.
pub struct LocalShellChannel {
    runner: LocalCommandRunner,
    fs: LocalFilesystem,
}

impl LocalShellChannel {
    pub fn new() -> Self {
        Self {
            runner: LocalCommandRunner::with_timeout(Duration::from_secs(30)),
            fs: LocalFilesystem::new(),
        }
    }
}

#[async_trait]
impl RemoteChannelPort for LocalShellChannel {
    async fn exec_capture(&self, command: &str) -> AppResult<ExecCapture> {
        let output = self
            .runner
            .run("bash", &["-c".to_string(), command.to_string()])
            .await?;
        Ok(ExecCapture {
            stdout: output.stdout.into_bytes(),
            stderr: output.stderr.into_bytes(),
            exit_code: if output.success { 0 } else { 1 },
        })
    }

    async fn read_directory(&self, path: &str) -> AppResult<Vec<DirEntry>> {
        self.fs.read_dir(Path::new(path)).await
    }

    async fn read_file(&self, path: &str) -> AppResult<Vec<u8>> {
        self.fs.read(Path::new(path)).await
    }

    async fn write_file(&self, path: &str, contents: &[u8]) -> AppResult<()> {
        self.fs.write(Path::new(path), contents).await
    }

    async fn exists(&self, path: &str) -> AppResult<bool> {
        self.fs.exists(Path::new(path)).await
    }

    async fn test_connection(&self) -> AppResult<()> {
        Ok(())
    }
}

pub struct FixedClock(pub OffsetDateTime);

impl Default for FixedClock {
    fn default() -> Self {
        Self(datetime!(2026-01-02 03:04:05.678 UTC))
    }
}

impl ClockPort for FixedClock {
    fn now_utc(&self) -> OffsetDateTime {
        self.0
    }
}
