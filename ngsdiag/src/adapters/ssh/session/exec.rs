// SPDX-License-Identifier: AGPL-3.0-only
// Copyright (C) 2026 Alex Sizykh

use anyhow::{Context, Result};
use russh::ChannelMsg;

use super::{RemoteSession, bounded};

/// Folds one channel message into the capture; true once the channel closed.
fn handle_capture_message(
    msg: &ChannelMsg,
    out: &mut Vec<u8>,
    err: &mut Vec<u8>,
    code: &mut i32,
) -> bool {
    match msg {
        ChannelMsg::Data { data } => {
            out.extend_from_slice(data);
            false
        }
        ChannelMsg::ExtendedData { data, ext: 1 } => {
            err.extend_from_slice(data);
            false
        }
        ChannelMsg::ExitStatus { exit_status } => {
            *code = *exit_status as i32;
            false
        }
        ChannelMsg::ExitSignal { signal_name, .. } => {
            log::debug!("remote command killed by signal {signal_name:?}");
            *code = -1;
            false
        }
        ChannelMsg::Close => true,
        _ => false,
    }
}

impl RemoteSession {
    /// Runs `cmd` and returns stdout, stderr and the exit code.
    pub(crate) async fn exec_capture(&self, cmd: &str) -> Result<(Vec<u8>, Vec<u8>, i32)> {
        bounded("command", self.command_timeout, async {
            let mut chan = self
                .handle
                .channel_open_session()
                .await
                .context("open session")?;
            log::debug!("executing '{cmd}'");
            chan.exec(true, cmd).await.context("exec request")?;

            let mut out = Vec::new();
            let mut err = Vec::new();
            let mut code: i32 = 0;
            while let Some(msg) = chan.wait().await {
                if handle_capture_message(&msg, &mut out, &mut err, &mut code) {
                    break;
                }
            }
            let _ = chan.close().await;
            Ok((out, err, code))
        })
        .await
    }
}
