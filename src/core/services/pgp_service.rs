use std::sync::Arc;

use crate::core::errors::Result;
use crate::core::models::key::Key;
use crate::core::models::key_details::KeyDetails;
use crate::core::models::operation_result::OperationResult;
use crate::core::services::crypto_operations::CryptoOperations;
use crate::core::services::key_registry::KeyRegistry;
use crate::core::services::key_resolver::KeyResolver;
use crate::core::traits::backend::CryptoBackend;
use crate::core::traits::key_details_loader::KeyDetailsLoader;

/// Caller-facing surface: key discovery, selection and text encryption
/// over one backend.
pub struct PgpService<B: CryptoBackend, L: KeyDetailsLoader> {
    registry: KeyRegistry<B, L>,
    operations: CryptoOperations<B>,
}

impl<B: CryptoBackend, L: KeyDetailsLoader> PgpService<B, L> {
    /// Build the service and load every key on the host. Blocks until the
    /// backend has finished listing.
    pub fn new(backend: B, loader: L) -> Self {
        let backend = Arc::new(backend);
        Self {
            operations: CryptoOperations::new(Arc::clone(&backend)),
            registry: KeyRegistry::new(backend, loader),
        }
    }

    pub fn registry(&self) -> &KeyRegistry<B, L> {
        &self.registry
    }

    pub fn list_keys(&self, pattern: &str) -> Vec<Key> {
        self.registry.list_keys(pattern)
    }

    pub fn list_secret_keys(&self, pattern: &str) -> Result<Vec<Key>> {
        self.registry.list_secret_keys(pattern)
    }

    pub fn load_keys(&mut self, pattern: &str) -> Result<usize> {
        self.registry.load_keys(pattern)
    }

    pub fn keys(&self) -> &[KeyDetails] {
        self.registry.keys()
    }

    pub fn num_keys(&self) -> usize {
        self.registry.num_keys()
    }

    pub fn is_preferred_key(&self, details: &KeyDetails, mail_address: &str) -> bool {
        KeyResolver::is_preferred_key(details, mail_address)
    }

    pub fn selected_key_index(&self) -> Option<usize> {
        self.registry.selected_key_index()
    }

    pub fn set_selected_key_index(&mut self, index: usize) -> Result<()> {
        self.registry.set_selected_key_index(index)
    }

    pub fn selected_key(&self) -> Option<&KeyDetails> {
        self.registry.selected_key()
    }

    pub fn decrypt(&self, input: &str, fingerprint: &str) -> OperationResult {
        self.operations.decrypt(input, fingerprint)
    }

    pub fn encrypt(
        &self,
        input: &str,
        fingerprint: &str,
        recipient_mail: &str,
        symmetric: bool,
    ) -> OperationResult {
        self.operations
            .encrypt(input, fingerprint, recipient_mail, symmetric)
    }
}
