use crate::core::errors::{ErrorKind, PgpError};

/// Terminal report of one encrypt or decrypt call.
///
/// Built fresh per call and handed back by value. Callers can only read it;
/// the mutators are crate-private.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OperationResult {
    payload: String,
    key_found: bool,
    success: bool,
    error_message: String,
    error_kind: Option<ErrorKind>,
    missing_fingerprint: Option<String>,
}

impl OperationResult {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Armored ciphertext or decrypted plaintext. Empty on failure.
    pub fn payload(&self) -> &str {
        &self.payload
    }

    /// Whether a key matching the requested fingerprint was resolved.
    /// Always false on the symmetric path, which never looks one up.
    pub fn key_found(&self) -> bool {
        self.key_found
    }

    /// Whether the cryptographic step itself succeeded.
    pub fn success(&self) -> bool {
        self.success
    }

    pub fn error_message(&self) -> &str {
        &self.error_message
    }

    pub fn error_kind(&self) -> Option<ErrorKind> {
        self.error_kind
    }

    /// Convert the report into a `Result` for `?`-style callers.
    pub fn into_result(self) -> Result<String, PgpError> {
        if self.success {
            return Ok(self.payload);
        }
        let reason = self.error_message;
        Err(match self.error_kind {
            Some(ErrorKind::KeyNotFound) => PgpError::KeyNotFound {
                fingerprint: self.missing_fingerprint.unwrap_or_default(),
            },
            Some(ErrorKind::KeyListingFailed) => PgpError::KeyListingFailed { reason },
            Some(ErrorKind::DecryptionFailed) => PgpError::DecryptionFailed { reason },
            Some(ErrorKind::BackendUnavailable) => PgpError::BackendUnavailable { detail: reason },
            _ => PgpError::EncryptionFailed { reason },
        })
    }

    pub(crate) fn mark_key_found(&mut self) {
        self.key_found = true;
    }

    pub(crate) fn succeed(mut self, payload: String) -> Self {
        self.success = true;
        self.payload = payload;
        self
    }

    /// Record that no key matched `fingerprint`.
    pub(crate) fn fail_key_not_found(mut self, fingerprint: &str, message: impl AsRef<str>) -> Self {
        self.key_found = false;
        self.missing_fingerprint = Some(fingerprint.to_string());
        self.fail(ErrorKind::KeyNotFound, message)
    }

    /// Record a failure. Messages accumulate, one per line.
    pub(crate) fn fail(mut self, kind: ErrorKind, message: impl AsRef<str>) -> Self {
        self.success = false;
        self.payload.clear();
        self.error_kind = Some(kind);
        if !self.error_message.is_empty() {
            self.error_message.push('\n');
        }
        self.error_message.push_str(message.as_ref());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_result_is_neither_found_nor_successful() {
        let result = OperationResult::new();
        assert!(!result.key_found());
        assert!(!result.success());
        assert!(result.payload().is_empty());
        assert!(result.error_kind().is_none());
    }

    #[test]
    fn failures_accumulate_messages() {
        let result = OperationResult::new()
            .fail(ErrorKind::KeyNotFound, "first")
            .fail(ErrorKind::DecryptionFailed, "second");
        assert_eq!(result.error_message(), "first\nsecond");
        assert_eq!(result.error_kind(), Some(ErrorKind::DecryptionFailed));
    }

    #[test]
    fn into_result_maps_kind() {
        let ok = OperationResult::new().succeed("plain".into());
        assert_eq!(ok.into_result().unwrap(), "plain");

        let err = OperationResult::new()
            .fail(ErrorKind::DecryptionFailed, "bad packet")
            .into_result()
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DecryptionFailed);
    }

    #[test]
    fn missing_key_keeps_fingerprint() {
        let err = OperationResult::new()
            .fail_key_not_found("ABCD1234", "no key for ABCD1234")
            .into_result()
            .unwrap_err();
        match err {
            PgpError::KeyNotFound { fingerprint } => assert_eq!(fingerprint, "ABCD1234"),
            other => panic!("unexpected error: {other}"),
        }
    }
}
