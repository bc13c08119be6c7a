//! Request URL composition.
//!
//! [`Query`] is an ordered list of query parameters. [`compose_url`] appends a
//! query to a base URL without touching any query string the URL already has.

use std::fmt::Display;

use serde::Serialize;
use snafu::prelude::*;

/// Ordered query-string parameters.
///
/// Values are stored as strings; numbers, booleans and other scalars are
/// converted with [`ToString`] when they are appended.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Query(Vec<(String, String)>);

impl Query {
    /// Creates an empty query.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a parameter, keeping insertion order.
    pub fn append(&mut self, key: impl Into<String>, value: impl Display) {
        self.0.push((key.into(), value.to_string()));
    }

    /// Appends a parameter and returns the query, for chaining.
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Display) -> Self {
        self.append(key, value);
        self
    }

    /// Returns `true` if there are no parameters.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterates over the parameters in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Encodes the parameters as `application/x-www-form-urlencoded`.
    ///
    /// # Errors
    ///
    /// Returns an error if the encoder rejects the parameters.
    pub fn encode(&self) -> Result<String, QueryEncodeError> {
        serde_html_form::to_string(&self.0).context(QueryEncodeSnafu)
    }
}

impl<K: Into<String>, V: Display> FromIterator<(K, V)> for Query {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut query = Self::new();
        for (key, value) in iter {
            query.append(key, value);
        }
        query
    }
}

impl<K: Into<String>, V: Display, const N: usize> From<[(K, V); N]> for Query {
    fn from(pairs: [(K, V); N]) -> Self {
        pairs.into_iter().collect()
    }
}

/// The query parameters could not be encoded.
#[derive(Debug, Snafu)]
#[snafu(display("Failed to encode query parameters"))]
pub struct QueryEncodeError {
    source: serde_html_form::ser::Error,
}

/// Appends `query` to `url`.
///
/// An absent or empty query returns `url` unchanged. Otherwise the encoded
/// query is joined with `?`, or with `&` when `url` already carries a query
/// string. A trailing `#fragment` stays at the end of the result.
///
/// # Errors
///
/// Returns an error if the query parameters cannot be encoded.
pub fn compose_url(url: &str, query: Option<&Query>) -> Result<String, QueryEncodeError> {
    let Some(query) = query.filter(|q| !q.is_empty()) else {
        return Ok(url.to_owned());
    };
    let encoded = query.encode()?;
    if encoded.is_empty() {
        return Ok(url.to_owned());
    }

    let (base, fragment) = match url.split_once('#') {
        Some((base, fragment)) => (base, Some(fragment)),
        None => (url, None),
    };
    let separator = match base.split_once('?') {
        Some((_, "")) => "",
        Some((_, existing)) if existing.ends_with('&') => "",
        Some(_) => "&",
        None => "?",
    };

    let mut composed = format!("{base}{separator}{encoded}");
    if let Some(fragment) = fragment {
        composed.push('#');
        composed.push_str(fragment);
    }
    Ok(composed)
}
