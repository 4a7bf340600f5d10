//! External library session emulation and checkout listing.
//!
//! A library system is reached through two capabilities: a
//! [`SessionAcquirer`] that turns a card number and PIN into a short-lived
//! [`LibrarySession`], and a [`CatalogClient`] that uses that session to list
//! the card's current checkouts as [`CheckoutRecord`]s. Each supported
//! [`LibrarySystem`] registers one pair of these in the [`AdapterRegistry`].
//!
//! # Architecture
//!
//! - [`LibrarySystem`] - Tagged identifier of a supported library system
//! - [`LibraryAdapter`] - The (acquirer, catalog) pair for one system
//! - [`AdapterRegistry`] - Lookup from system identifier to adapter
//! - [`SessionCookies`] - Ordered, allow-list filtered session cookies
//! - [`NwplSessionAcquirer`] / [`NwplCatalogClient`] - New Westminster
//!   Public Library adapter
//!
//! # Example
//!
//! ```no_run
//! use libtrack_core::library::{NwplEndpoints, build_default_adapter_registry};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let registry = build_default_adapter_registry(&NwplEndpoints::default());
//! let adapter = registry.resolve("nwpl")?;
//! let checkouts = adapter.fetch_checkouts("12345", "6789").await?;
//! println!("{} checkouts", checkouts.len());
//! # Ok(())
//! # }
//! ```

mod cookies;
mod error;
mod html;
mod http_client;
mod nwpl;
mod registry;

pub use cookies::SessionCookies;
pub use error::LibraryError;
pub use http_client::{
    DEFAULT_CONNECT_TIMEOUT_SECS, DEFAULT_READ_TIMEOUT_SECS, LibraryHttpTimeouts,
    build_library_http_client, configure_library_http_timeouts, library_http_timeouts,
};
pub use nwpl::{
    AccountIdDerivation, NWPL_SESSION_COOKIES, NwplCatalogClient, NwplEndpoints,
    NwplSessionAcquirer, derive_account_id,
};
pub use registry::{AdapterRegistry, build_default_adapter_registry};

use std::fmt;
use std::str::FromStr;

use async_trait::async_trait;
use chrono::NaiveDate;
use serde::Serialize;
use tracing::{debug, instrument};

/// A library system the tool knows how to log in to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LibrarySystem {
    /// New Westminster Public Library (`BiblioCommons`).
    Nwpl,
}

impl LibrarySystem {
    /// All supported systems.
    pub const ALL: [Self; 1] = [Self::Nwpl];

    /// Returns the stored identifier.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Nwpl => "nwpl",
        }
    }

    /// Identifiers of all supported systems.
    #[must_use]
    pub fn supported_ids() -> Vec<&'static str> {
        Self::ALL.iter().map(Self::as_str).collect()
    }
}

impl fmt::Display for LibrarySystem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for LibrarySystem {
    type Err = LibraryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "nwpl" => Ok(Self::Nwpl),
            _ => Err(LibraryError::unsupported_system(s, &Self::supported_ids())),
        }
    }
}

/// An authenticated connection to a library site, valid for one catalog
/// call sequence.
///
/// Deliberately not `Clone`: a session belongs to exactly one sync of one
/// card and is dropped afterwards.
pub struct LibrarySession {
    /// Allow-listed session cookies.
    pub cookies: SessionCookies,
    /// Opaque session identifier taken from the cookie jar.
    pub session_id: String,
    /// Opaque access token taken from the cookie jar.
    pub access_token: String,
    /// Numeric account identifier scoping catalog queries.
    pub account_id: String,
}

impl fmt::Debug for LibrarySession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LibrarySession")
            .field("cookies", &self.cookies)
            .field("session_id", &"[REDACTED]")
            .field("access_token", &"[REDACTED]")
            .field("account_id", &self.account_id)
            .finish()
    }
}

/// One active loan as reported by a library catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutRecord {
    /// Title, with `": subtitle"` appended when the catalog has one.
    pub title: String,
    /// First ISBN listed for the item, if any.
    pub isbn: Option<String>,
    /// Date the loan is due back.
    pub due_date: NaiveDate,
    /// Cover image URL, if any.
    pub cover_image_url: Option<String>,
}

/// Performs a library system's login handshake.
///
/// Uses `async_trait` so adapters can be stored as `Box<dyn SessionAcquirer>`.
#[async_trait]
pub trait SessionAcquirer: Send + Sync {
    /// Logs in with the card credentials and returns a fresh session.
    ///
    /// # Errors
    ///
    /// Returns [`LibraryError::Authentication`] when no session id/access
    /// token pair can be obtained, [`LibraryError::Protocol`] when the login
    /// page lacks expected markup.
    async fn acquire(&self, card_number: &str, pin: &str) -> Result<LibrarySession, LibraryError>;
}

/// Lists current checkouts for an authenticated session.
#[async_trait]
pub trait CatalogClient: Send + Sync {
    /// Returns the checkouts visible to `session`; an empty list is not an error.
    ///
    /// # Errors
    ///
    /// Returns [`LibraryError::Upstream`] on a non-success HTTP status.
    async fn list_checkouts(
        &self,
        session: &LibrarySession,
    ) -> Result<Vec<CheckoutRecord>, LibraryError>;
}

/// The pair of capabilities that make up one library system.
pub struct LibraryAdapter {
    system: LibrarySystem,
    acquirer: Box<dyn SessionAcquirer>,
    catalog: Box<dyn CatalogClient>,
}

impl LibraryAdapter {
    /// Bundles an acquirer and catalog client for `system`.
    #[must_use]
    pub fn new(
        system: LibrarySystem,
        acquirer: Box<dyn SessionAcquirer>,
        catalog: Box<dyn CatalogClient>,
    ) -> Self {
        Self {
            system,
            acquirer,
            catalog,
        }
    }

    /// The system this adapter serves.
    #[must_use]
    pub fn system(&self) -> LibrarySystem {
        self.system
    }

    /// Logs in and lists checkouts; the session does not outlive this call.
    ///
    /// # Errors
    ///
    /// Propagates any [`LibraryError`] from either step.
    #[instrument(skip(self, card_number, pin), fields(system = %self.system))]
    pub async fn fetch_checkouts(
        &self,
        card_number: &str,
        pin: &str,
    ) -> Result<Vec<CheckoutRecord>, LibraryError> {
        let session = self.acquirer.acquire(card_number, pin).await?;
        debug!(account_id = %session.account_id, "Library session acquired");
        self.catalog.list_checkouts(&session).await
    }
}

impl fmt::Debug for LibraryAdapter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LibraryAdapter")
            .field("system", &self.system)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_library_system_parse_is_case_insensitive() {
        assert_eq!("nwpl".parse::<LibrarySystem>().unwrap(), LibrarySystem::Nwpl);
        assert_eq!("NWPL".parse::<LibrarySystem>().unwrap(), LibrarySystem::Nwpl);
        assert_eq!(" Nwpl ".parse::<LibrarySystem>().unwrap(), LibrarySystem::Nwpl);
    }

    #[test]
    fn test_library_system_parse_unknown_fails() {
        let err = "vpl".parse::<LibrarySystem>().unwrap_err();
        assert!(matches!(err, LibraryError::UnsupportedSystem { .. }));
    }

    #[test]
    fn test_library_system_display() {
        assert_eq!(LibrarySystem::Nwpl.to_string(), "nwpl");
        assert_eq!(LibrarySystem::supported_ids(), ["nwpl"]);
    }

    #[test]
    fn test_library_session_debug_redacts_tokens() {
        let session = LibrarySession {
            cookies: SessionCookies::parse_header("session_id=sess-secret"),
            session_id: "sess-secret".to_string(),
            access_token: "token-secret".to_string(),
            account_id: "78".to_string(),
        };
        let debug = format!("{session:?}");
        assert!(!debug.contains("sess-secret"));
        assert!(!debug.contains("token-secret"));
        assert!(debug.contains("78"));
    }

    #[test]
    fn test_checkout_record_serializes_camel_case() {
        let record = CheckoutRecord {
            title: "Dune".to_string(),
            isbn: Some("9780441013593".to_string()),
            due_date: NaiveDate::from_ymd_opt(2026, 5, 20).unwrap(),
            cover_image_url: None,
        };
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["dueDate"], "2026-05-20");
        assert_eq!(json["coverImageUrl"], serde_json::Value::Null);
    }
}
