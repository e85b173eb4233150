// SPDX-License-Identifier: AGPL-3.0-only
// Copyright (C) 2026 Alex Sizykh

use std::sync::Arc;

use anyhow::{Context, Result};
use russh::client::{AuthResult, Handle};
use russh::keys::PrivateKeyWithHashAlg;

use crate::adapters::ssh::AuthenticationFailure;
use crate::app::types::SshAuth;

use super::ClientHandler;

fn auth_succeeded(result: &AuthResult) -> bool {
    match result {
        AuthResult::Success => true,
        AuthResult::Failure {
            remaining_methods,
            partial_success,
        } => {
            log::debug!(
                "authentication failed (partial_success={partial_success}, remaining={remaining_methods:?})"
            );
            false
        }
    }
}

pub(super) async fn authenticate(
    handle: &mut Handle<ClientHandler>,
    username: &str,
    auth: &SshAuth,
) -> Result<()> {
    let result = match auth {
        SshAuth::Key {
            identity_path,
            passphrase,
        } => {
            let path = shellexpand::tilde(identity_path);
            let key = russh::keys::load_secret_key(path.as_ref(), passphrase.as_deref())
                .with_context(|| format!("failed to load secret key at {path}"))?;
            // Prefer SHA-256 for RSA keys; ignored for other key types.
            let key = PrivateKeyWithHashAlg::new(
                Arc::new(key),
                handle.best_supported_rsa_hash().await?.flatten(),
            );
            handle.authenticate_publickey(username, key).await?
        }
        SshAuth::Password(password) => {
            handle
                .authenticate_password(username, password.as_str())
                .await?
        }
    };
    if auth_succeeded(&result) {
        Ok(())
    } else {
        Err(AuthenticationFailure.into())
    }
}

#[cfg(test)]
mod tests {
    use super::auth_succeeded;
    use russh::client::AuthResult;
    use russh::{MethodKind, MethodSet};

    #[test]
    fn success_is_accepted() {
        assert!(auth_succeeded(&AuthResult::Success));
    }

    #[test]
    fn partial_success_is_still_a_failure() {
        let methods = [MethodKind::KeyboardInteractive];
        assert!(!auth_succeeded(&AuthResult::Failure {
            remaining_methods: MethodSet::from(methods.as_slice()),
            partial_success: true,
        }));
    }

    #[test]
    fn rejected_key_is_a_failure() {
        let methods = [MethodKind::Password];
        assert!(!auth_succeeded(&AuthResult::Failure {
            remaining_methods: MethodSet::from(methods.as_slice()),
            partial_success: false,
        }));
    }
}
