use std::io::BufRead;

use chrono::{DateTime, NaiveDateTime, Utc};

use crate::core::errors::BackendError;
use crate::core::models::key::{Key, KeyValidity, UserIdentity};

/// Streaming parser for `gpg --with-colons --fixed-list-mode` key listings.
///
/// Yields one `Key` per `pub`/`sec` record once the next key (or the end of
/// input) is reached. Only the `fpr` record directly following the primary
/// key is used; subkey fingerprints are skipped. Keys that never received a
/// fingerprint are dropped.
///
/// GnuPG passes 8-bit user id bytes through unescaped, so records are read
/// as bytes and decoded lossily.
pub struct ColonKeyReader<R: BufRead> {
    reader: R,
    line: Vec<u8>,
    current: Option<PendingKey>,
    done: bool,
}

struct PendingKey {
    key: Key,
    in_subkey: bool,
}

impl<R: BufRead> ColonKeyReader<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            line: Vec::new(),
            current: None,
            done: false,
        }
    }

    /// Next raw record without its line terminator, or `None` at the end.
    fn read_record(&mut self) -> std::io::Result<Option<String>> {
        self.line.clear();
        if self.reader.read_until(b'\n', &mut self.line)? == 0 {
            return Ok(None);
        }
        while matches!(self.line.last(), Some(b'\n' | b'\r')) {
            self.line.pop();
        }
        Ok(Some(String::from_utf8_lossy(&self.line).into_owned()))
    }

    /// Finish the pending key, if it is complete.
    fn take_current(&mut self) -> Option<Key> {
        self.current
            .take()
            .map(|p| p.key)
            .filter(|k| !k.fingerprint.is_empty())
    }

    /// Feed one record. Returns a key when the record closes the previous one.
    fn feed(&mut self, line: &str) -> Option<Key> {
        let fields: Vec<&str> = line.split(':').collect();
        let field = |i: usize| fields.get(i).copied().unwrap_or_default();

        match field(0) {
            kind @ ("pub" | "sec") => {
                let finished = self.take_current();
                let mut key = Key::new("", &[]);
                key.validity = KeyValidity::from_code(field(1));
                key.length = field(2).parse().ok();
                key.algorithm = field(3).parse().ok();
                key.key_id = field(4).to_string();
                key.created = parse_timestamp(field(5));
                key.expires = parse_timestamp(field(6));
                key.has_secret = kind == "sec";
                self.current = Some(PendingKey {
                    key,
                    in_subkey: false,
                });
                finished
            }
            "fpr" => {
                if let Some(pending) = self.current.as_mut() {
                    if !pending.in_subkey && pending.key.fingerprint.is_empty() {
                        pending.key.fingerprint = field(9).to_string();
                    }
                }
                None
            }
            "uid" => {
                if let Some(pending) = self.current.as_mut() {
                    let raw = unescape(field(9));
                    pending.key.user_ids.push(UserIdentity::parse(&raw));
                }
                None
            }
            "sub" | "ssb" => {
                if let Some(pending) = self.current.as_mut() {
                    pending.in_subkey = true;
                }
                None
            }
            _ => None,
        }
    }
}

impl<R: BufRead> Iterator for ColonKeyReader<R> {
    type Item = Result<Key, BackendError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        loop {
            match self.read_record() {
                Ok(Some(line)) => {
                    if let Some(key) = self.feed(&line) {
                        return Some(Ok(key));
                    }
                }
                Err(e) => {
                    self.done = true;
                    return Some(Err(BackendError::new(
                        -1,
                        format!("reading key listing: {e}"),
                    )));
                }
                Ok(None) => {
                    self.done = true;
                    return self.take_current().map(Ok);
                }
            }
        }
    }
}

/// Parse every key in a complete listing.
pub fn parse_colon_listing(output: &str) -> Vec<Key> {
    ColonKeyReader::new(output.as_bytes())
        .filter_map(|item| item.ok())
        .collect()
}

/// Dates are seconds since the epoch, or ISO 8601 basic format in some
/// GnuPG configurations. Empty means "none".
fn parse_timestamp(field: &str) -> Option<DateTime<Utc>> {
    if field.is_empty() {
        return None;
    }
    if let Ok(secs) = field.parse::<i64>() {
        return DateTime::from_timestamp(secs, 0);
    }
    NaiveDateTime::parse_from_str(field, "%Y%m%dT%H%M%S")
        .ok()
        .map(|naive| naive.and_utc())
}

/// Undo GnuPG's `\xHH` escaping of user ids.
fn unescape(field: &str) -> String {
    let bytes = field.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'\\' && bytes.get(i + 1) == Some(&b'x') {
            let decoded = field
                .get(i + 2..i + 4)
                .and_then(|hex| u8::from_str_radix(hex, 16).ok());
            if let Some(byte) = decoded {
                out.push(byte);
                i += 4;
                continue;
            }
        }
        out.push(bytes[i]);
        i += 1;
    }
    String::from_utf8_lossy(&out).into_owned()
}
