use crate::core::errors::BackendError;
use crate::core::models::key::Key;

/// Protocol a backend session is scoped to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Protocol {
    OpenPgp,
}

/// Recipient validity policy for asymmetric encryption.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TrustPolicy {
    /// Defer to the backend's trust model.
    #[default]
    Default,
    /// Encrypt to recipients regardless of their calculated validity.
    AlwaysTrust,
}

/// Stream of keys produced by a listing. An `Err` item ends the listing.
pub type KeyListing<'a> = Box<dyn Iterator<Item = Result<Key, BackendError>> + 'a>;

/// Port for the OpenPGP engine.
///
/// Implementations live in `adapters::cipher`. The core only depends on this
/// trait. Every operation runs inside a session obtained from `open_session`;
/// callers open one session per call and drop it on every exit path.
pub trait CryptoBackend: Send + Sync {
    type Session: BackendSession;

    /// Create a fresh session. Sessions are never shared between calls.
    fn open_session(&self, protocol: Protocol) -> Result<Self::Session, BackendError>;

    /// Human-readable name of this backend (e.g. "gpg").
    fn name(&self) -> &str;
}

/// One backend session. Buffers are borrowed for the duration of a call only.
pub trait BackendSession {
    /// Produce ASCII-armored output.
    fn set_armor(&mut self, armor: bool);

    /// Treat input as canonical text.
    fn set_text_mode(&mut self, text_mode: bool);

    /// Start listing keys matching `pattern` (empty = all keys).
    ///
    /// An `Err` here means the listing never started. Errors after the start
    /// arrive as items of the returned stream.
    fn start_key_listing(
        &mut self,
        pattern: &str,
        secret_only: bool,
    ) -> Result<KeyListing<'_>, BackendError>;

    /// Look up a single key by its exact fingerprint.
    fn key(&mut self, fingerprint: &str) -> Result<Key, BackendError>;

    /// Encrypt with a passphrase instead of a recipient key.
    fn encrypt_symmetric(&mut self, plaintext: &[u8]) -> Result<Vec<u8>, BackendError>;

    /// Encrypt to the given recipient keys.
    fn encrypt(
        &mut self,
        recipients: &[Key],
        plaintext: &[u8],
        trust: TrustPolicy,
    ) -> Result<Vec<u8>, BackendError>;

    fn decrypt(&mut self, ciphertext: &[u8]) -> Result<Vec<u8>, BackendError>;
}
