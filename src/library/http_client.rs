//! Shared HTTP client construction policy for library adapters.
//!
//! Every adapter talks to its site through a client built here so timeouts,
//! user-agent, compression and redirect handling stay consistent. The client
//! carries no cookie store: session cookies are filtered and forwarded
//! explicitly by each adapter.

use std::sync::RwLock;
use std::time::Duration;

use reqwest::Client;
use reqwest::redirect::Policy;
use tracing::debug;

use crate::user_agent;

use super::LibraryError;

/// Default connect timeout for library requests.
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;

/// Default read timeout for library requests.
pub const DEFAULT_READ_TIMEOUT_SECS: u64 = 30;

/// Timeout settings applied to library HTTP clients.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LibraryHttpTimeouts {
    /// TCP/TLS connect timeout in seconds.
    pub connect_timeout_secs: u64,
    /// Whole-request timeout in seconds.
    pub read_timeout_secs: u64,
}

impl Default for LibraryHttpTimeouts {
    fn default() -> Self {
        Self {
            connect_timeout_secs: DEFAULT_CONNECT_TIMEOUT_SECS,
            read_timeout_secs: DEFAULT_READ_TIMEOUT_SECS,
        }
    }
}

static LIBRARY_HTTP_TIMEOUTS: RwLock<LibraryHttpTimeouts> = RwLock::new(LibraryHttpTimeouts {
    connect_timeout_secs: DEFAULT_CONNECT_TIMEOUT_SECS,
    read_timeout_secs: DEFAULT_READ_TIMEOUT_SECS,
});

/// Configures timeouts used by library client builders.
///
/// Intended for CLI/runtime configuration before adapters are constructed.
pub fn configure_library_http_timeouts(connect_timeout_secs: u64, read_timeout_secs: u64) {
    if let Ok(mut guard) = LIBRARY_HTTP_TIMEOUTS.write() {
        *guard = LibraryHttpTimeouts {
            connect_timeout_secs,
            read_timeout_secs,
        };
    }
}

/// Returns the currently configured timeouts.
#[must_use]
pub fn library_http_timeouts() -> LibraryHttpTimeouts {
    LIBRARY_HTTP_TIMEOUTS
        .read()
        .map(|guard| *guard)
        .unwrap_or_default()
}

/// Builds an HTTP client for the named library system.
///
/// Redirects are not followed so that `Set-Cookie` headers on login
/// responses are visible to the caller.
///
/// # Errors
///
/// Returns [`LibraryError::Network`] when client construction fails.
pub fn build_library_http_client(system: &str) -> Result<Client, LibraryError> {
    let timeouts = library_http_timeouts();
    debug!(
        system,
        connect_timeout_secs = timeouts.connect_timeout_secs,
        read_timeout_secs = timeouts.read_timeout_secs,
        "Building library HTTP client"
    );

    Client::builder()
        .connect_timeout(Duration::from_secs(timeouts.connect_timeout_secs))
        .timeout(Duration::from_secs(timeouts.read_timeout_secs))
        .user_agent(user_agent::default_library_user_agent())
        .redirect(Policy::none())
        .gzip(true)
        .build()
        .map_err(|error| LibraryError::network(system, &error))
}
