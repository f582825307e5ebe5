use std::sync::LazyLock;

use chrono::{DateTime, Utc};
use regex::Regex;

/// `Name (Comment) <mail>` with every part optional.
static UID_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*(?P<name>[^(<]*?)\s*(?:\((?P<comment>[^)]*)\))?\s*(?:<(?P<email>[^>]*)>)?\s*$")
        .expect("user id pattern is valid")
});

static BARE_EMAIL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[^\s@<>()]+@[^\s@<>()]+$").expect("email pattern is valid")
});

/// One OpenPGP key as reported by the backend.
///
/// Values are moved out of the backend session that produced them;
/// nothing here borrows from a live session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Key {
    pub fingerprint: String,
    pub key_id: String,
    pub user_ids: Vec<UserIdentity>,
    pub created: Option<DateTime<Utc>>,
    pub expires: Option<DateTime<Utc>>,
    pub validity: KeyValidity,
    pub algorithm: Option<u32>,
    pub length: Option<u32>,
    /// True when the backend holds the secret part of this key.
    pub has_secret: bool,
}

impl Key {
    /// Minimal key with a fingerprint and raw user ids.
    pub fn new(fingerprint: impl Into<String>, user_ids: &[&str]) -> Self {
        let fingerprint = fingerprint.into();
        let key_id = short_key_id(&fingerprint);
        Self {
            fingerprint,
            key_id,
            user_ids: user_ids.iter().map(|u| UserIdentity::parse(u)).collect(),
            created: None,
            expires: None,
            validity: KeyValidity::Unknown,
            algorithm: None,
            length: None,
            has_secret: false,
        }
    }
}

/// The 64-bit key id: the last 16 hex digits of a fingerprint.
pub fn short_key_id(fingerprint: &str) -> String {
    let start = fingerprint.len().saturating_sub(16);
    fingerprint.get(start..).unwrap_or_default().to_string()
}

/// A user id attached to a key, split into its conventional parts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserIdentity {
    pub raw: String,
    pub name: Option<String>,
    pub comment: Option<String>,
    pub email: Option<String>,
}

impl UserIdentity {
    pub fn parse(raw: &str) -> Self {
        let non_empty = |s: &str| {
            let t = s.trim();
            (!t.is_empty()).then(|| t.to_string())
        };

        if BARE_EMAIL.is_match(raw.trim()) {
            return Self {
                raw: raw.to_string(),
                name: None,
                comment: None,
                email: non_empty(raw),
            };
        }

        match UID_PATTERN.captures(raw) {
            Some(caps) => Self {
                raw: raw.to_string(),
                name: caps.name("name").and_then(|m| non_empty(m.as_str())),
                comment: caps.name("comment").and_then(|m| non_empty(m.as_str())),
                email: caps.name("email").and_then(|m| non_empty(m.as_str())),
            },
            // Unstructured user id: keep it whole as the name.
            None => Self {
                raw: raw.to_string(),
                name: non_empty(raw),
                comment: None,
                email: None,
            },
        }
    }
}

impl std::fmt::Display for UserIdentity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.raw)
    }
}

/// Calculated validity, as GnuPG reports it in field 2 of a colon listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KeyValidity {
    #[default]
    Unknown,
    Invalid,
    Disabled,
    Revoked,
    Expired,
    Never,
    Marginal,
    Full,
    Ultimate,
}

impl KeyValidity {
    pub fn from_code(code: &str) -> Self {
        match code.chars().next() {
            Some('i') => KeyValidity::Invalid,
            Some('d') => KeyValidity::Disabled,
            Some('r') => KeyValidity::Revoked,
            Some('e') => KeyValidity::Expired,
            Some('n') => KeyValidity::Never,
            Some('m') => KeyValidity::Marginal,
            Some('f') => KeyValidity::Full,
            Some('u') => KeyValidity::Ultimate,
            _ => KeyValidity::Unknown,
        }
    }

    /// Revoked, expired, disabled and invalid keys cannot be used to encrypt.
    pub fn is_usable(self) -> bool {
        !matches!(
            self,
            KeyValidity::Invalid | KeyValidity::Disabled | KeyValidity::Revoked | KeyValidity::Expired
        )
    }
}
