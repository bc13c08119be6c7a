//! Case-insensitive header mappings.
//!
//! [`Headers`] stores every key lower-cased, so `"Content-Type"` and
//! `"content-type"` address the same entry. Values are kept exactly as given.
//! [`parse_headers`] turns a raw `name: value` block (as returned by a
//! transport) into a [`Headers`] mapping.

use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;

/// A string-to-string header mapping with case-insensitive keys.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Headers(BTreeMap<String, String>);

pub(crate) static EMPTY_HEADERS: Headers = Headers::new();

impl Headers {
    /// Creates an empty mapping.
    #[must_use]
    pub const fn new() -> Self {
        Self(BTreeMap::new())
    }

    /// Returns the value stored under `key`, ignoring case.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(&key.to_ascii_lowercase()).map(String::as_str)
    }

    /// Sets `key` to `value`, replacing any entry stored under a different
    /// casing of the same key.
    pub fn set(&mut self, key: impl AsRef<str>, value: impl Into<String>) {
        self.0.insert(key.as_ref().to_ascii_lowercase(), value.into());
    }

    /// Removes the entry under `key`, ignoring case.
    pub fn remove(&mut self, key: &str) -> Option<String> {
        self.0.remove(&key.to_ascii_lowercase())
    }

    /// Returns `true` if an entry exists for `key`, ignoring case.
    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.0.contains_key(&key.to_ascii_lowercase())
    }

    /// Iterates over the (lower-cased) keys and their values.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Returns the number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns `true` if there are no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns the `content-type` value, if any.
    #[must_use]
    pub fn content_type(&self) -> Option<&str> {
        self.get("content-type")
    }
}

impl<K: AsRef<str>, V: Into<String>> FromIterator<(K, V)> for Headers {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut headers = Self::new();
        headers.extend(iter);
        headers
    }
}

impl<K: AsRef<str>, V: Into<String>> Extend<(K, V)> for Headers {
    fn extend<I: IntoIterator<Item = (K, V)>>(&mut self, iter: I) {
        for (key, value) in iter {
            self.set(key, value);
        }
    }
}

impl<K: AsRef<str>, V: Into<String>, const N: usize> From<[(K, V); N]> for Headers {
    fn from(pairs: [(K, V); N]) -> Self {
        pairs.into_iter().collect()
    }
}

/// Renders the mapping as a raw header block, one `name: value` per line.
impl fmt::Display for Headers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (key, value) in self.iter() {
            write!(f, "{key}: {value}\r\n")?;
        }
        Ok(())
    }
}

/// Parses a raw header block into a [`Headers`] mapping.
///
/// Lines are split on the first `:`, keys and values are trimmed and keys are
/// lower-cased. Lines without a colon or with an empty key are skipped. When a
/// key repeats, the last occurrence wins.
#[must_use]
pub fn parse_headers(raw: &str) -> Headers {
    raw.lines()
        .filter_map(|line| line.split_once(':'))
        .map(|(key, value)| (key.trim(), value.trim()))
        .filter(|(key, _)| !key.is_empty())
        .collect()
}
