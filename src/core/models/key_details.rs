use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::core::models::key::KeyValidity;

/// Backend-independent snapshot of one key, built once per discovery
/// cycle by a `KeyDetailsLoader`. Immutable after construction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct KeyDetails {
    fingerprint: String,
    key_id: String,
    user_ids: Vec<String>,
    mail_addresses: Vec<String>,
    created: Option<DateTime<Utc>>,
    expires: Option<DateTime<Utc>>,
    validity: KeyValidity,
    algorithm: Option<u32>,
    length: Option<u32>,
    has_secret: bool,
}

impl KeyDetails {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        fingerprint: String,
        key_id: String,
        user_ids: Vec<String>,
        mail_addresses: Vec<String>,
        created: Option<DateTime<Utc>>,
        expires: Option<DateTime<Utc>>,
        validity: KeyValidity,
        has_secret: bool,
    ) -> Self {
        Self {
            fingerprint,
            key_id,
            user_ids,
            mail_addresses,
            created,
            expires,
            validity,
            algorithm: None,
            length: None,
            has_secret,
        }
    }

    /// Attach the public key algorithm id and key length in bits.
    pub fn with_algorithm(mut self, algorithm: Option<u32>, length: Option<u32>) -> Self {
        self.algorithm = algorithm;
        self.length = length;
        self
    }

    pub fn fingerprint(&self) -> &str {
        &self.fingerprint
    }

    pub fn key_id(&self) -> &str {
        &self.key_id
    }

    /// Raw user id strings, in backend order.
    pub fn user_ids(&self) -> &[String] {
        &self.user_ids
    }

    /// Mail addresses extracted from the user ids, in backend order.
    pub fn mail_addresses(&self) -> &[String] {
        &self.mail_addresses
    }

    pub fn created(&self) -> Option<DateTime<Utc>> {
        self.created
    }

    pub fn expires(&self) -> Option<DateTime<Utc>> {
        self.expires
    }

    pub fn validity(&self) -> KeyValidity {
        self.validity
    }

    /// OpenPGP public key algorithm id (RFC 4880 section 9.1).
    pub fn algorithm(&self) -> Option<u32> {
        self.algorithm
    }

    pub fn length(&self) -> Option<u32> {
        self.length
    }

    pub fn has_secret(&self) -> bool {
        self.has_secret
    }
}

impl std::fmt::Display for KeyDetails {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.user_ids.first() {
            Some(uid) => write!(f, "{} ({})", self.fingerprint, uid),
            None => write!(f, "{}", self.fingerprint),
        }
    }
}
