use std::sync::Arc;

use crate::core::errors::{ErrorKind, PgpError};
use crate::core::models::operation_result::OperationResult;
use crate::core::services::key_registry::fetch_keys;
use crate::core::services::key_resolver::KeyResolver;
use crate::core::traits::backend::{BackendSession, CryptoBackend, Protocol, TrustPolicy};

/// Performs one encrypt or decrypt call against the backend and packages
/// the outcome as an `OperationResult`.
///
/// Calls never return `Err` and never retry. Each call opens its own
/// session, which is dropped on every exit path.
pub struct CryptoOperations<B: CryptoBackend> {
    backend: Arc<B>,
}

impl<B: CryptoBackend> CryptoOperations<B> {
    pub fn new(backend: Arc<B>) -> Self {
        Self { backend }
    }

    /// Open a session producing armored text.
    fn text_session(&self) -> Result<B::Session, String> {
        let mut session = self
            .backend
            .open_session(Protocol::OpenPgp)
            .map_err(|e| format!("could not open {} session: {e}", self.backend.name()))?;
        session.set_armor(true);
        session.set_text_mode(true);
        Ok(session)
    }

    /// Decrypt armored `input` with the key identified by `fingerprint`.
    ///
    /// The key is looked up directly by exact fingerprint before the
    /// backend is asked to decrypt. The plaintext is decoded as UTF-8,
    /// with invalid sequences replaced.
    pub fn decrypt(&self, input: &str, fingerprint: &str) -> OperationResult {
        let mut result = OperationResult::new();

        let mut session = match self.text_session() {
            Ok(session) => session,
            Err(e) => return result.fail(ErrorKind::BackendUnavailable, e),
        };

        if let Err(e) = session.key(fingerprint) {
            tracing::debug!(fingerprint, "decryption key lookup failed: {e}");
            return result.fail_key_not_found(
                fingerprint,
                format!("Error finding key '{fingerprint}': {}", e.message),
            );
        }
        result.mark_key_found();

        match session.decrypt(input.as_bytes()) {
            Ok(plaintext) => {
                tracing::debug!(fingerprint, bytes = plaintext.len(), "decrypted");
                result.succeed(String::from_utf8_lossy(&plaintext).into_owned())
            }
            Err(e) => result.fail(ErrorKind::DecryptionFailed, &e.message),
        }
    }

    /// Encrypt `input` to the key identified by `fingerprint`, or with a
    /// passphrase when `symmetric` is set.
    ///
    /// The asymmetric path lists keys matching `recipient_mail` and takes the
    /// first whose fingerprint matches exactly. If none does, the call fails
    /// with `KeyNotFound` without reaching the backend; a listing that cannot
    /// start fails with `KeyListingFailed`. Recipients are encrypted to with
    /// `TrustPolicy::AlwaysTrust`.
    ///
    /// The symmetric path never resolves a key, so `key_found` stays false
    /// even on success.
    pub fn encrypt(
        &self,
        input: &str,
        fingerprint: &str,
        recipient_mail: &str,
        symmetric: bool,
    ) -> OperationResult {
        if symmetric {
            return self.encrypt_symmetric(input);
        }

        let mut result = OperationResult::new();

        let candidates = match fetch_keys(self.backend.as_ref(), recipient_mail, false) {
            Ok(keys) => keys,
            Err(e) => {
                tracing::warn!(recipient_mail, "recipient listing failed: {e}");
                let reason = match e {
                    PgpError::KeyListingFailed { reason } => reason,
                    other => other.to_string(),
                };
                return result.fail(ErrorKind::KeyListingFailed, reason);
            }
        };
        let Some(recipient) = KeyResolver::find_by_fingerprint(candidates, fingerprint) else {
            return result.fail_key_not_found(
                fingerprint,
                format!(
                    "No key with fingerprint '{fingerprint}' matches recipient \
                     '{recipient_mail}'"
                ),
            );
        };
        result.mark_key_found();

        let mut session = match self.text_session() {
            Ok(session) => session,
            Err(e) => return result.fail(ErrorKind::BackendUnavailable, e),
        };

        match session.encrypt(
            std::slice::from_ref(&recipient),
            input.as_bytes(),
            TrustPolicy::AlwaysTrust,
        ) {
            Ok(ciphertext) => {
                tracing::debug!(fingerprint, bytes = ciphertext.len(), "encrypted");
                result.succeed(String::from_utf8_lossy(&ciphertext).into_owned())
            }
            Err(e) => result.fail(ErrorKind::EncryptionFailed, &e.message),
        }
    }

    fn encrypt_symmetric(&self, input: &str) -> OperationResult {
        let result = OperationResult::new();

        let mut session = match self.text_session() {
            Ok(session) => session,
            Err(e) => return result.fail(ErrorKind::BackendUnavailable, e),
        };

        match session.encrypt_symmetric(input.as_bytes()) {
            Ok(ciphertext) => {
                tracing::debug!(bytes = ciphertext.len(), "encrypted symmetrically");
                result.succeed(String::from_utf8_lossy(&ciphertext).into_owned())
            }
            Err(e) => result.fail(
                ErrorKind::EncryptionFailed,
                format!("symmetric encryption: {}", e.message),
            ),
        }
    }
}
