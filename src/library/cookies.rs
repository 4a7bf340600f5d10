//! Session cookie parsing and allow-list filtering.
//!
//! Library sites hand out a pile of cookies during login. Only a handful
//! of them identify the session; the rest (analytics, A/B buckets, consent
//! flags) are unstable and must not be replayed against the catalog API.

use std::fmt;

/// An ordered list of cookie `name=value` pairs.
///
/// Order of first appearance is preserved. A later value for an existing
/// name replaces the earlier one in place, mirroring how a browser applies
/// successive `Set-Cookie` headers. Values are redacted in `Debug` output.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct SessionCookies {
    pairs: Vec<(String, String)>,
}

impl SessionCookies {
    /// Creates an empty cookie list.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses a `Cookie` request header (`a=1; b=2`).
    ///
    /// Segments without `=` or with an empty name are ignored.
    #[must_use]
    pub fn parse_header(raw: &str) -> Self {
        let mut cookies = Self::new();
        for segment in raw.split(';') {
            if let Some((name, value)) = split_pair(segment) {
                cookies.insert(name, value);
            }
        }
        cookies
    }

    /// Collects the leading `name=value` pair of each `Set-Cookie` header.
    ///
    /// Attributes such as `Path`, `Expires` or `HttpOnly` are dropped.
    #[must_use]
    pub fn from_set_cookie_headers<'a>(headers: impl IntoIterator<Item = &'a str>) -> Self {
        let mut cookies = Self::new();
        for header in headers {
            let first = header.split(';').next().unwrap_or_default();
            if let Some((name, value)) = split_pair(first) {
                cookies.insert(name, value);
            }
        }
        cookies
    }

    /// Inserts or replaces a cookie.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        if let Some(existing) = self.pairs.iter_mut().find(|(n, _)| *n == name) {
            existing.1 = value;
        } else {
            self.pairs.push((name, value));
        }
    }

    /// Returns a copy holding only cookies whose name is in `allowed`.
    #[must_use]
    pub fn retain_allowed(&self, allowed: &[&str]) -> Self {
        Self {
            pairs: self
                .pairs
                .iter()
                .filter(|(name, _)| allowed.contains(&name.as_str()))
                .cloned()
                .collect(),
        }
    }

    /// Returns the value of the named cookie.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.pairs
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, value)| value.as_str())
    }

    /// Returns cookie names in order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.pairs.iter().map(|(name, _)| name.as_str())
    }

    /// Renders the list as a `Cookie` request header value.
    #[must_use]
    pub fn to_header(&self) -> String {
        self.pairs
            .iter()
            .map(|(name, value)| format!("{name}={value}"))
            .collect::<Vec<_>>()
            .join("; ")
    }

    /// Number of cookies held.
    #[must_use]
    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    /// Returns true if no cookies are held.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }
}

impl fmt::Debug for SessionCookies {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionCookies")
            .field("names", &self.names().collect::<Vec<_>>())
            .field("values", &"[REDACTED]")
            .finish()
    }
}

fn split_pair(segment: &str) -> Option<(&str, &str)> {
    let (name, value) = segment.split_once('=')?;
    let name = name.trim();
    if name.is_empty() {
        return None;
    }
    Some((name, value.trim()))
}
