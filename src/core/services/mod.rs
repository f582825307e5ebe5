pub mod crypto_operations;
pub mod key_registry;
pub mod key_resolver;
pub mod pgp_service;
