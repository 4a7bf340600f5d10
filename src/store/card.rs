//! Library card records.

use std::fmt;

use serde::Serialize;
use sqlx::FromRow;

/// A library card account owned by a user.
///
/// `number` and `pin` are kept verbatim: the remote login needs them in
/// clear form. The pin never leaves the process through serialization or
/// `Debug`.
#[derive(Clone, PartialEq, Eq, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct LibraryCard {
    /// Generated identifier.
    pub id: String,
    /// Card number as printed on the card.
    pub number: String,
    /// Card PIN.
    #[serde(skip)]
    pub pin: String,
    /// Label chosen by the user.
    pub display_name: String,
    /// Symbolic library system identifier (e.g. `nwpl`).
    pub system: String,
    /// Owning user.
    pub user_id: Option<String>,
}

impl LibraryCard {
    /// True when both credentials needed for a login are present.
    #[must_use]
    pub fn has_credentials(&self) -> bool {
        !self.number.trim().is_empty() && !self.pin.trim().is_empty()
    }
}

impl fmt::Debug for LibraryCard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LibraryCard")
            .field("id", &self.id)
            .field("number", &self.number)
            .field("pin", &"[REDACTED]")
            .field("display_name", &self.display_name)
            .field("system", &self.system)
            .field("user_id", &self.user_id)
            .finish()
    }
}

/// Input for registering a card.
#[derive(Clone, Default)]
pub struct NewLibraryCard {
    pub number: String,
    pub pin: String,
    pub display_name: String,
    /// Defaults to `nwpl` when `None`.
    pub system: Option<String>,
}

impl fmt::Debug for NewLibraryCard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NewLibraryCard")
            .field("number", &self.number)
            .field("pin", &"[REDACTED]")
            .field("display_name", &self.display_name)
            .field("system", &self.system)
            .finish()
    }
}

/// Partial card update; `None` fields are left unchanged.
#[derive(Clone, Default)]
pub struct CardUpdate {
    pub number: Option<String>,
    pub pin: Option<String>,
    pub display_name: Option<String>,
}

impl CardUpdate {
    /// True when no field would change.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.number.is_none() && self.pin.is_none() && self.display_name.is_none()
    }
}

impl fmt::Debug for CardUpdate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CardUpdate")
            .field("number", &self.number)
            .field("pin", &self.pin.as_ref().map(|_| "[REDACTED]"))
            .field("display_name", &self.display_name)
            .finish()
    }
}
