//! Discover the OpenPGP keys on a host and encrypt or decrypt text with them.
//!
//! [`PgpService`] is the entry point. It owns a [`KeyRegistry`] of the keys
//! found on the host and runs encrypt/decrypt calls through a
//! [`CryptoBackend`], reporting every outcome as an [`OperationResult`].
//!
//! ```no_run
//! use pgpmate::adapters::cipher::gpg_backend::GpgBackend;
//! use pgpmate::adapters::loaders::uid_loader::UidKeyDetailsLoader;
//! use pgpmate::PgpService;
//!
//! let service = PgpService::new(GpgBackend::new(), UidKeyDetailsLoader);
//! for key in service.keys() {
//!     println!("{key}");
//! }
//! let sealed = service.encrypt("hello", "", "", true);
//! assert!(sealed.success(), "{}", sealed.error_message());
//! ```

pub mod adapters;
pub mod config;
pub mod core;

pub use crate::core::errors::{ErrorKind, PgpError, Result};
pub use crate::core::models::key_details::KeyDetails;
pub use crate::core::models::operation_result::OperationResult;
pub use crate::core::services::key_registry::KeyRegistry;
pub use crate::core::services::pgp_service::PgpService;
pub use crate::core::traits::backend::CryptoBackend;
