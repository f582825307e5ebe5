use crate::core::models::key::Key;
use crate::core::models::key_details::KeyDetails;
use crate::core::traits::key_details_loader::KeyDetailsLoader;

/// Builds `KeyDetails` from a key's user ids.
///
/// Mail addresses come from the `<mail>` part of each user id, or from user
/// ids that are a bare address. Order follows the backend and duplicates
/// are dropped.
#[derive(Debug, Clone, Copy, Default)]
pub struct UidKeyDetailsLoader;

impl KeyDetailsLoader for UidKeyDetailsLoader {
    fn load(&self, key: &Key) -> KeyDetails {
        let user_ids = key.user_ids.iter().map(|u| u.raw.clone()).collect();

        let mut mail_addresses: Vec<String> = Vec::new();
        for email in key.user_ids.iter().filter_map(|u| u.email.as_ref()) {
            if !mail_addresses.contains(email) {
                mail_addresses.push(email.clone());
            }
        }

        KeyDetails::new(
            key.fingerprint.clone(),
            key.key_id.clone(),
            user_ids,
            mail_addresses,
            key.created,
            key.expires,
            key.validity,
            key.has_secret,
        )
        .with_algorithm(key.algorithm, key.length)
    }
}
