//! Synthetic ISBNs for checkouts whose catalog entry has none.

use chrono::Utc;
use rand::Rng;
use rand::distributions::Alphanumeric;

const PLACEHOLDER_PREFIX: &str = "placeholder-";
const SUFFIX_LEN: usize = 12;

/// Generates `placeholder-{unix_millis}-{12 random alphanumerics}`.
///
/// The random suffix keeps values created within the same millisecond apart.
#[must_use]
pub fn placeholder_isbn() -> String {
    let suffix: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(SUFFIX_LEN)
        .map(char::from)
        .collect();
    format!(
        "{PLACEHOLDER_PREFIX}{}-{suffix}",
        Utc::now().timestamp_millis()
    )
}

/// True for values produced by [`placeholder_isbn`].
#[must_use]
pub fn is_placeholder_isbn(isbn: &str) -> bool {
    isbn.starts_with(PLACEHOLDER_PREFIX)
}
