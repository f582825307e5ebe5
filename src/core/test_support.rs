//! In-memory `CryptoBackend` used by the unit tests.
//!
//! "Ciphertext" is an armored envelope holding the recipient fingerprint
//! (or `SYMMETRIC`) and the plaintext as hex. Every backend call is
//! recorded so tests can assert on what the services did.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use crate::core::errors::BackendError;
use crate::core::models::key::Key;
use crate::core::traits::backend::{
    BackendSession, CryptoBackend, KeyListing, Protocol, TrustPolicy,
};

const BEGIN: &str = "-----BEGIN PGP MESSAGE-----";
const END: &str = "-----END PGP MESSAGE-----";
const SYMMETRIC: &str = "SYMMETRIC";

#[derive(Default)]
struct State {
    keys: Mutex<Vec<Key>>,
    calls: Mutex<Vec<String>>,
    open_sessions: AtomicUsize,
    sessions_opened: AtomicUsize,
    fail_listing_start: bool,
    fail_listing_after: Option<usize>,
    passphrase: bool,
    fail_encrypt: bool,
}

#[derive(Clone, Default)]
pub struct MemoryBackend {
    state: Arc<State>,
}

impl MemoryBackend {
    pub fn new(keys: Vec<Key>) -> Self {
        Self::builder(keys).build()
    }

    pub fn empty() -> Self {
        Self::new(Vec::new())
    }

    pub fn builder(keys: Vec<Key>) -> MemoryBackendBuilder {
        MemoryBackendBuilder {
            state: State {
                keys: Mutex::new(keys),
                passphrase: true,
                ..State::default()
            },
        }
    }

    pub fn calls(&self) -> Vec<String> {
        self.state.calls.lock().unwrap().clone()
    }

    pub fn open_sessions(&self) -> usize {
        self.state.open_sessions.load(Ordering::SeqCst)
    }

    pub fn sessions_opened(&self) -> usize {
        self.state.sessions_opened.load(Ordering::SeqCst)
    }

    pub fn remove_key(&self, fingerprint: &str) {
        self.state
            .keys
            .lock()
            .unwrap()
            .retain(|k| k.fingerprint != fingerprint);
    }
}

pub struct MemoryBackendBuilder {
    state: State,
}

impl MemoryBackendBuilder {
    pub fn fail_listing_start(mut self) -> Self {
        self.state.fail_listing_start = true;
        self
    }

    pub fn fail_listing_after(mut self, n: usize) -> Self {
        self.state.fail_listing_after = Some(n);
        self
    }

    pub fn without_passphrase(mut self) -> Self {
        self.state.passphrase = false;
        self
    }

    pub fn fail_encrypt(mut self) -> Self {
        self.state.fail_encrypt = true;
        self
    }

    pub fn build(self) -> MemoryBackend {
        MemoryBackend {
            state: Arc::new(self.state),
        }
    }
}

/// Key with a secret part, usable for round trips.
pub fn secret_key(fingerprint: &str, user_ids: &[&str]) -> Key {
    let mut key = Key::new(fingerprint, user_ids);
    key.has_secret = true;
    key
}

impl CryptoBackend for MemoryBackend {
    type Session = MemorySession;

    fn open_session(&self, _protocol: Protocol) -> Result<Self::Session, BackendError> {
        self.state.open_sessions.fetch_add(1, Ordering::SeqCst);
        self.state.sessions_opened.fetch_add(1, Ordering::SeqCst);
        Ok(MemorySession {
            state: Arc::clone(&self.state),
            armor: false,
        })
    }

    fn name(&self) -> &str {
        "memory"
    }
}

pub struct MemorySession {
    state: Arc<State>,
    armor: bool,
}

impl MemorySession {
    fn record(&self, call: String) {
        self.state.calls.lock().unwrap().push(call);
    }

    fn seal(&self, subject: &str, plaintext: &[u8]) -> Vec<u8> {
        let hex: String = plaintext.iter().map(|b| format!("{b:02x}")).collect();
        if !self.armor {
            return format!("{subject}\n{hex}").into_bytes();
        }
        format!("{BEGIN}\n{subject}\n{hex}\n{END}\n").into_bytes()
    }
}

impl Drop for MemorySession {
    fn drop(&mut self) {
        self.state.open_sessions.fetch_sub(1, Ordering::SeqCst);
    }
}

impl BackendSession for MemorySession {
    fn set_armor(&mut self, armor: bool) {
        self.armor = armor;
    }

    fn set_text_mode(&mut self, _text_mode: bool) {}

    fn start_key_listing(
        &mut self,
        pattern: &str,
        secret_only: bool,
    ) -> Result<KeyListing<'_>, BackendError> {
        self.record(format!("list:{pattern}"));
        if self.state.fail_listing_start {
            return Err(BackendError::new(1, "keybox locked"));
        }

        let matching: Vec<Key> = self
            .state
            .keys
            .lock()
            .unwrap()
            .iter()
            .filter(|k| !secret_only || k.has_secret)
            .filter(|k| {
                pattern.is_empty()
                    || k.fingerprint.contains(pattern)
                    || k.user_ids.iter().any(|u| u.raw.contains(pattern))
            })
            .cloned()
            .collect();

        let mut items: Vec<Result<Key, BackendError>> = matching.into_iter().map(Ok).collect();
        if let Some(n) = self.state.fail_listing_after {
            items.truncate(n);
            items.push(Err(BackendError::new(2, "listing interrupted")));
        }
        Ok(Box::new(items.into_iter()))
    }

    fn key(&mut self, fingerprint: &str) -> Result<Key, BackendError> {
        self.record(format!("key:{fingerprint}"));
        self.state
            .keys
            .lock()
            .unwrap()
            .iter()
            .find(|k| k.fingerprint == fingerprint)
            .cloned()
            .ok_or_else(|| BackendError::new(9, "No public key"))
    }

    fn encrypt_symmetric(&mut self, plaintext: &[u8]) -> Result<Vec<u8>, BackendError> {
        self.record("encrypt_symmetric".into());
        if !self.state.passphrase {
            return Err(BackendError::new(2, "No passphrase given"));
        }
        Ok(self.seal(SYMMETRIC, plaintext))
    }

    fn encrypt(
        &mut self,
        recipients: &[Key],
        plaintext: &[u8],
        trust: TrustPolicy,
    ) -> Result<Vec<u8>, BackendError> {
        let fprs: Vec<&str> = recipients.iter().map(|k| k.fingerprint.as_str()).collect();
        self.record(format!("encrypt:{}:{trust:?}", fprs.join(",")));
        if self.state.fail_encrypt {
            return Err(BackendError::new(2, "Unusable public key"));
        }
        if recipients.is_empty() {
            return Err(BackendError::new(2, "No valid addressees"));
        }
        Ok(self.seal(&fprs.join(","), plaintext))
    }

    fn decrypt(&mut self, ciphertext: &[u8]) -> Result<Vec<u8>, BackendError> {
        self.record("decrypt".into());
        let text = String::from_utf8_lossy(ciphertext);
        let mut lines = text.lines();
        if lines.next() != Some(BEGIN) {
            return Err(BackendError::new(58, "No data"));
        }
        let subject = lines.next().unwrap_or_default();
        let hex = lines.next().unwrap_or_default();

        let can_open = if subject == SYMMETRIC {
            self.state.passphrase
        } else {
            let keys = self.state.keys.lock().unwrap();
            subject
                .split(',')
                .any(|fp| keys.iter().any(|k| k.fingerprint == fp && k.has_secret))
        };
        if !can_open {
            return Err(BackendError::new(17, "No secret key"));
        }

        (0..hex.len())
            .step_by(2)
            .map(|i| u8::from_str_radix(&hex[i..i + 2], 16))
            .collect::<Result<Vec<u8>, _>>()
            .map_err(|_| BackendError::new(58, "Bad data"))
    }
}
