/// All domain errors for pgpmate.
///
/// Each variant carries enough context to diagnose the issue
/// without needing a debugger.
#[derive(Debug, thiserror::Error)]
pub enum PgpError {
    #[error("Key listing failed: {reason}")]
    KeyListingFailed { reason: String },

    #[error(
        "No key found for fingerprint '{fingerprint}'\n\n  \
         Run 'pgpmate keys' to see the fingerprints available on this host."
    )]
    KeyNotFound { fingerprint: String },

    #[error("Decryption failed: {reason}")]
    DecryptionFailed { reason: String },

    #[error("Encryption failed: {reason}")]
    EncryptionFailed { reason: String },

    #[error(
        "No keys found matching '{pattern}'\n\n  \
         Import a key with 'gpg --import' or widen the search pattern."
    )]
    NoKeysFound { pattern: String },

    #[error("Key index {index} is out of range ({available} key(s) loaded)")]
    InvalidSelection { index: usize, available: usize },

    #[error("Invalid configuration: {detail}")]
    InvalidConfig { detail: String },

    #[error(
        "OpenPGP backend unavailable: {detail}\n\n  \
         Solutions:\n    \
         → Install GnuPG and make sure 'gpg' is in PATH\n    \
         → Or point to the binary: pgpmate --gpg /path/to/gpg"
    )]
    BackendUnavailable { detail: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl PgpError {
    /// The failure category of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            PgpError::KeyListingFailed { .. } => ErrorKind::KeyListingFailed,
            PgpError::KeyNotFound { .. } => ErrorKind::KeyNotFound,
            PgpError::DecryptionFailed { .. } => ErrorKind::DecryptionFailed,
            PgpError::EncryptionFailed { .. } => ErrorKind::EncryptionFailed,
            PgpError::NoKeysFound { .. } => ErrorKind::NoKeysFound,
            PgpError::InvalidSelection { .. } => ErrorKind::InvalidSelection,
            PgpError::InvalidConfig { .. } => ErrorKind::InvalidConfig,
            PgpError::BackendUnavailable { .. } => ErrorKind::BackendUnavailable,
            PgpError::Io(_) => ErrorKind::Io,
        }
    }
}

/// Copyable failure category, carried by `OperationResult`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    KeyListingFailed,
    KeyNotFound,
    DecryptionFailed,
    EncryptionFailed,
    NoKeysFound,
    InvalidSelection,
    InvalidConfig,
    BackendUnavailable,
    Io,
}

/// Structured error reported by a `CryptoBackend`: a numeric code
/// plus the backend's human-readable message.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message} (code {code})")]
pub struct BackendError {
    pub code: i32,
    pub message: String,
}

impl BackendError {
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, PgpError>;
