//! Per-card sync failures.

use thiserror::Error;

use crate::library::LibraryError;
use crate::store::StoreError;

/// Why one card's sync stopped. Rendered into the batch report's error list.
#[derive(Debug, Clone, Error)]
pub enum CardSyncError {
    /// Card lacks a number or PIN; nothing was attempted.
    #[error("Library card {card_id} is missing card number or PIN")]
    MissingCredentials {
        /// Card that was skipped
        card_id: String,
    },

    /// Login or checkout listing failed.
    #[error("Error processing library card {card_id}: {source}")]
    Library {
        card_id: String,
        #[source]
        source: LibraryError,
    },

    /// Reading or writing a book failed.
    #[error("Error processing library card {card_id}: {source}")]
    Store {
        card_id: String,
        #[source]
        source: StoreError,
    },
}

impl CardSyncError {
    #[must_use]
    pub fn missing_credentials(card_id: &str) -> Self {
        Self::MissingCredentials {
            card_id: card_id.to_string(),
        }
    }

    #[must_use]
    pub fn library(card_id: &str, source: LibraryError) -> Self {
        Self::Library {
            card_id: card_id.to_string(),
            source,
        }
    }

    #[must_use]
    pub fn store(card_id: &str, source: StoreError) -> Self {
        Self::Store {
            card_id: card_id.to_string(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_credentials_message() {
        let err = CardSyncError::missing_credentials("c1");
        assert_eq!(
            err.to_string(),
            "Library card c1 is missing card number or PIN"
        );
    }

    #[test]
    fn test_library_error_message_wraps_cause() {
        let err = CardSyncError::library(
            "c1",
            LibraryError::upstream("nwpl", "checkouts", 500),
        );
        let msg = err.to_string();
        assert!(msg.starts_with("Error processing library card c1: "));
        assert!(msg.contains("500"));
    }
}
