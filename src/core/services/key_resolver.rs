use crate::core::models::key::Key;
use crate::core::models::key_details::KeyDetails;

/// Selects the one key that matches caller-supplied criteria.
///
/// Matching is literal: no case folding, no whitespace trimming. Scans run
/// in whatever order the backend listed the keys and stop at the first hit.
pub struct KeyResolver;

impl KeyResolver {
    /// True iff `mail_address` is a substring of at least one of the key's
    /// mail addresses. Always false for a key without mail addresses.
    pub fn is_preferred_key(details: &KeyDetails, mail_address: &str) -> bool {
        details
            .mail_addresses()
            .iter()
            .any(|mail| mail.contains(mail_address))
    }

    /// All keys preferred for `mail_address`, in listing order.
    pub fn preferred_keys<'a>(
        keys: &'a [KeyDetails],
        mail_address: &'a str,
    ) -> impl Iterator<Item = &'a KeyDetails> + 'a {
        keys.iter()
            .filter(move |d| Self::is_preferred_key(d, mail_address))
    }

    /// First key whose primary fingerprint equals `fingerprint` exactly.
    pub fn find_by_fingerprint(keys: Vec<Key>, fingerprint: &str) -> Option<Key> {
        keys.into_iter().find(|k| k.fingerprint == fingerprint)
    }
}
