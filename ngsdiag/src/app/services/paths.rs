// SPDX-License-Identifier: AGPL-3.0-only
// Copyright (C) 2026 Alex Sizykh

use std::path::PathBuf;

/// Rewrites paths between their remote-canonical form and the local mount.
///
/// A path is "under" a base when it equals the base or continues it with a
/// `/`, after syntactic normalization. Paths outside the base are returned
/// untouched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathTranslator {
    remote_base: String,
    mount_point: String,
}

impl PathTranslator {
    pub fn new(remote_base: &str, mount_point: &str) -> Self {
        Self {
            remote_base: normalize_base(remote_base),
            mount_point: normalize_base(mount_point),
        }
    }

    pub fn remote_base(&self) -> &str {
        &self.remote_base
    }

    pub fn mount_point(&self) -> &str {
        &self.mount_point
    }

    pub fn to_local(&self, remote_path: &str) -> String {
        swap_prefix(remote_path, &self.remote_base, &self.mount_point)
    }

    pub fn to_remote(&self, local_path: &str) -> String {
        swap_prefix(local_path, &self.mount_point, &self.remote_base)
    }

    pub fn to_local_path(&self, remote_path: &str) -> PathBuf {
        PathBuf::from(self.to_local(remote_path))
    }
}

fn normalize_base(base: &str) -> String {
    let trimmed = base.trim();
    if trimmed.is_empty() {
        return String::new();
    }
    normalize_path(trimmed)
}

fn swap_prefix(path: &str, from: &str, to: &str) -> String {
    if from.is_empty() || to.is_empty() {
        return path.to_string();
    }
    let normalized = normalize_path(path);
    match strip_base(&normalized, from) {
        Some(rest) if to == "/" => {
            if rest.is_empty() {
                "/".to_string()
            } else {
                rest.to_string()
            }
        }
        Some(rest) => format!("{to}{rest}"),
        None => path.to_string(),
    }
}

/// Returns the remainder after `base`, either empty or starting with `/`.
fn strip_base<'a>(path: &'a str, base: &str) -> Option<&'a str> {
    if base == "/" {
        return path
            .strip_prefix('/')
            .map(|_| if path == "/" { "" } else { path });
    }
    let rest = path.strip_prefix(base)?;
    if rest.is_empty() || rest.starts_with('/') {
        Some(rest)
    } else {
        None
    }
}

/// Normalize a slash-separated path syntactically
/// - drops empty and `.` segments
/// - resolves `..` where possible, never above an absolute root
/// - keeps a leading `/` if present
pub fn normalize_path(p: &str) -> String {
    let absolute = p.starts_with('/');
    let mut out: Vec<&str> = Vec::new();
    for seg in p.split('/') {
        match seg {
            "" | "." => {}
            ".." => match out.last() {
                Some(&last) if last != ".." => {
                    out.pop();
                }
                _ if absolute => {}
                _ => out.push(".."),
            },
            other => out.push(other),
        }
    }
    let joined = out.join("/");
    if absolute {
        format!("/{joined}")
    } else if joined.is_empty() {
        ".".to_string()
    } else {
        joined
    }
}
