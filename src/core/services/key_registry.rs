use std::sync::Arc;

use crate::core::errors::{PgpError, Result};
use crate::core::models::key::Key;
use crate::core::models::key_details::KeyDetails;
use crate::core::traits::backend::{BackendSession, CryptoBackend, Protocol};
use crate::core::traits::key_details_loader::KeyDetailsLoader;

/// Run one listing in its own session and drain it.
///
/// A listing that fails to start is an error. A listing that fails part way
/// through returns the keys collected before the failure. Keys without a
/// fingerprint are skipped.
pub fn fetch_keys<B: CryptoBackend>(
    backend: &B,
    pattern: &str,
    secret_only: bool,
) -> Result<Vec<Key>> {
    let mut session = backend
        .open_session(Protocol::OpenPgp)
        .map_err(|e| PgpError::KeyListingFailed {
            reason: format!("could not open {} session: {e}", backend.name()),
        })?;

    let listing = session
        .start_key_listing(pattern, secret_only)
        .map_err(|e| PgpError::KeyListingFailed {
            reason: e.to_string(),
        })?;

    let mut keys = Vec::new();
    for item in listing {
        match item {
            Ok(key) if key.fingerprint.is_empty() => {
                tracing::debug!(pattern, key_id = %key.key_id, "skipping key without fingerprint");
            }
            Ok(key) => keys.push(key),
            Err(e) => {
                tracing::debug!(
                    pattern,
                    collected = keys.len(),
                    "key listing ended early: {e}"
                );
                break;
            }
        }
    }
    Ok(keys)
}

/// Holds the keys discovered on the host as `KeyDetails`.
///
/// The snapshot is replaced wholesale by every `load_keys` call. Mutation
/// takes `&mut self`; share a registry across threads behind a lock.
pub struct KeyRegistry<B: CryptoBackend, L: KeyDetailsLoader> {
    backend: Arc<B>,
    loader: L,
    keys: Vec<KeyDetails>,
    selected_key_index: Option<usize>,
    last_load_error: Option<PgpError>,
}

impl<B: CryptoBackend, L: KeyDetailsLoader> KeyRegistry<B, L> {
    /// Create a registry and run an unfiltered discovery pass.
    ///
    /// This blocks until the backend has listed every key on the host. A
    /// failed pass does not fail construction; see `last_load_error`.
    pub fn new(backend: Arc<B>, loader: L) -> Self {
        let mut registry = Self {
            backend,
            loader,
            keys: Vec::new(),
            selected_key_index: None,
            last_load_error: None,
        };
        // Recorded in `last_load_error`.
        let _ = registry.load_keys("");
        registry
    }

    /// List keys matching `pattern` (empty = all keys).
    ///
    /// A listing that fails to start is logged and yields no keys. Use
    /// `try_list_keys` to tell the two apart.
    pub fn list_keys(&self, pattern: &str) -> Vec<Key> {
        self.try_list_keys(pattern).unwrap_or_else(|e| {
            tracing::warn!(pattern, "key listing failed: {e}");
            Vec::new()
        })
    }

    pub fn try_list_keys(&self, pattern: &str) -> Result<Vec<Key>> {
        fetch_keys(self.backend.as_ref(), pattern, false)
    }

    /// List only keys whose secret part is available.
    pub fn list_secret_keys(&self, pattern: &str) -> Result<Vec<Key>> {
        fetch_keys(self.backend.as_ref(), pattern, true)
    }

    /// Replace the snapshot with the keys matching `pattern`.
    ///
    /// Returns the number of keys loaded. When nothing is found the
    /// snapshot is left empty and the error is also kept in
    /// `last_load_error`.
    pub fn load_keys(&mut self, pattern: &str) -> Result<usize> {
        self.keys.clear();
        self.last_load_error = None;

        let keys = match self.try_list_keys(pattern) {
            Ok(keys) if keys.is_empty() => {
                return Err(self.record_load_error(PgpError::NoKeysFound {
                    pattern: pattern.to_string(),
                }));
            }
            Ok(keys) => keys,
            Err(e) => return Err(self.record_load_error(e)),
        };

        self.keys = keys.iter().map(|k| self.loader.load(k)).collect();
        tracing::info!(pattern, count = self.keys.len(), "loaded keys");
        Ok(self.keys.len())
    }

    fn record_load_error(&mut self, err: PgpError) -> PgpError {
        tracing::warn!("key load failed: {err}");
        let returned = match &err {
            PgpError::NoKeysFound { pattern } => PgpError::NoKeysFound {
                pattern: pattern.clone(),
            },
            PgpError::KeyListingFailed { reason } => PgpError::KeyListingFailed {
                reason: reason.clone(),
            },
            other => PgpError::KeyListingFailed {
                reason: other.to_string(),
            },
        };
        self.last_load_error = Some(err);
        returned
    }

    pub fn keys(&self) -> &[KeyDetails] {
        &self.keys
    }

    pub fn num_keys(&self) -> usize {
        self.keys.len()
    }

    /// Error from the most recent `load_keys`, if it failed.
    pub fn last_load_error(&self) -> Option<&PgpError> {
        self.last_load_error.as_ref()
    }

    pub fn find_by_fingerprint(&self, fingerprint: &str) -> Option<&KeyDetails> {
        self.keys.iter().find(|d| d.fingerprint() == fingerprint)
    }

    /// The raw cursor, which may be stale after a reload.
    pub fn selected_key_index(&self) -> Option<usize> {
        self.selected_key_index
    }

    /// Point the cursor at a loaded key. Out-of-range indices are rejected.
    pub fn set_selected_key_index(&mut self, index: usize) -> Result<()> {
        if index >= self.keys.len() {
            return Err(PgpError::InvalidSelection {
                index,
                available: self.keys.len(),
            });
        }
        self.selected_key_index = Some(index);
        Ok(())
    }

    pub fn clear_selection(&mut self) {
        self.selected_key_index = None;
    }

    /// The selected key, checked against the current snapshot.
    pub fn selected_key(&self) -> Option<&KeyDetails> {
        self.selected_key_index.and_then(|i| self.keys.get(i))
    }
}
