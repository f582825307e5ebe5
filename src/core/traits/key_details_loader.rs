use crate::core::models::key::Key;
use crate::core::models::key_details::KeyDetails;

/// Port that turns one backend key into a client-facing snapshot.
pub trait KeyDetailsLoader: Send + Sync {
    fn load(&self, key: &Key) -> KeyDetails;
}
