//! Error types for library session and catalog operations.
//!
//! Every variant carries enough context to explain what failed against the
//! upstream library site and how to fix it, following the What/Why/Fix
//! pattern used across the project.

use thiserror::Error;

/// Errors that can occur while talking to an external library system.
#[derive(Debug, Clone, Error)]
pub enum LibraryError {
    /// Login handshake did not yield a usable session.
    #[error("authentication failed for {system}: {reason}\n  Suggestion: {suggestion}")]
    Authentication {
        /// Library system the handshake ran against
        system: String,
        /// Why authentication failed
        reason: String,
        /// How to fix the issue
        suggestion: String,
    },

    /// Expected markup or payload field was absent or malformed.
    #[error(
        "unexpected response from {system}: {reason}\n  Suggestion: The library site may have changed its page or API format"
    )]
    Protocol {
        /// Library system that returned the unexpected payload
        system: String,
        /// What was missing or malformed
        reason: String,
    },

    /// The library-system identifier is not registered.
    #[error(
        "unsupported library system '{system}'\n  Suggestion: Use one of the supported systems: {supported}"
    )]
    UnsupportedSystem {
        /// The identifier that could not be resolved
        system: String,
        /// Comma-separated list of supported identifiers
        supported: String,
    },

    /// Catalog endpoint answered with a non-success HTTP status.
    #[error("{system} returned HTTP {status} for {endpoint}\n  Suggestion: Retry on the next sync run")]
    Upstream {
        /// Library system that answered
        system: String,
        /// Endpoint that was called
        endpoint: String,
        /// HTTP status code
        status: u16,
    },

    /// Request could not be sent or the response body could not be read.
    #[error("network error talking to {system}: {message}\n  Suggestion: Check connectivity and retry")]
    Network {
        /// Library system being contacted
        system: String,
        /// Transport error text
        message: String,
    },
}

impl LibraryError {
    /// Creates an `Authentication` error.
    #[must_use]
    pub fn authentication(system: &str, reason: &str) -> Self {
        Self::Authentication {
            system: system.to_string(),
            reason: reason.to_string(),
            suggestion: "Check the card number and PIN, or whether the account is locked"
                .to_string(),
        }
    }

    /// Creates a `Protocol` error.
    #[must_use]
    pub fn protocol(system: &str, reason: &str) -> Self {
        Self::Protocol {
            system: system.to_string(),
            reason: reason.to_string(),
        }
    }

    /// Creates an `UnsupportedSystem` error listing the known identifiers.
    #[must_use]
    pub fn unsupported_system(system: &str, supported: &[&str]) -> Self {
        Self::UnsupportedSystem {
            system: system.to_string(),
            supported: supported.join(", "),
        }
    }

    /// Creates an `Upstream` error for a non-success HTTP status.
    #[must_use]
    pub fn upstream(system: &str, endpoint: &str, status: u16) -> Self {
        Self::Upstream {
            system: system.to_string(),
            endpoint: endpoint.to_string(),
            status,
        }
    }

    /// Creates a `Network` error from a transport failure.
    #[must_use]
    pub fn network(system: &str, error: &reqwest::Error) -> Self {
        Self::Network {
            system: system.to_string(),
            message: error.to_string(),
        }
    }

    /// Returns true when the failure is attributable to the card's credentials.
    #[must_use]
    pub fn is_authentication(&self) -> bool {
        matches!(self, Self::Authentication { .. })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_library_error_authentication_message() {
        let err = LibraryError::authentication("nwpl", "session tokens missing");
        let msg = err.to_string();
        assert!(msg.contains("nwpl"));
        assert!(msg.contains("session tokens missing"));
        assert!(msg.contains("PIN"), "suggestion should mention PIN");
        assert!(err.is_authentication());
    }

    #[test]
    fn test_library_error_protocol_message() {
        let err = LibraryError::protocol("nwpl", "CSRF token not found");
        let msg = err.to_string();
        assert!(msg.contains("CSRF token not found"));
        assert!(msg.contains("Suggestion"));
        assert!(!err.is_authentication());
    }

    #[test]
    fn test_library_error_unsupported_system_lists_known() {
        let err = LibraryError::unsupported_system("vpl", &["nwpl"]);
        let msg = err.to_string();
        assert!(msg.contains("'vpl'"));
        assert!(msg.contains("nwpl"));
    }

    #[test]
    fn test_library_error_upstream_message() {
        let err = LibraryError::upstream("nwpl", "checkouts", 503);
        let msg = err.to_string();
        assert!(msg.contains("503"));
        assert!(msg.contains("checkouts"));
    }
}
