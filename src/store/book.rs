//! Book records and their lifecycle states.

use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use tracing::warn;
use uuid::Uuid;

/// Where a tracked book currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BookState {
    /// Known to the user but not on loan (default for manual entries).
    Found,
    /// On loan and not yet due.
    CheckedOut,
    /// Given back.
    Returned,
    /// On loan past its due date.
    Overdue,
}

impl BookState {
    /// Returns the database string representation.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Found => "found",
            Self::CheckedOut => "checked_out",
            Self::Returned => "returned",
            Self::Overdue => "overdue",
        }
    }

    /// State of a loan due on `due_date` as seen on `today`.
    ///
    /// A book due today is still checked out.
    #[must_use]
    pub fn for_loan(due_date: NaiveDate, today: NaiveDate) -> Self {
        if due_date < today {
            Self::Overdue
        } else {
            Self::CheckedOut
        }
    }
}

impl fmt::Display for BookState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for BookState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "found" => Ok(Self::Found),
            "checked_out" => Ok(Self::CheckedOut),
            "returned" => Ok(Self::Returned),
            "overdue" => Ok(Self::Overdue),
            _ => Err(format!(
                "invalid book state: {s} (expected found, checked_out, returned or overdue)"
            )),
        }
    }
}

/// A book tracked for a user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Book {
    /// Generated identifier.
    pub id: String,
    /// Real ISBN, or a placeholder when the source had none.
    pub isbn: String,
    /// Display title.
    pub title: String,
    /// Cover image URL.
    pub picture_url: Option<String>,
    /// Current state.
    pub state: BookState,
    /// Due date of the current loan.
    pub due_date: Option<NaiveDate>,
    /// Card whose account produced the loan.
    pub library_card_id: Option<String>,
    /// Owning user.
    pub user_id: Option<String>,
}

impl Book {
    /// Creates an unsaved book in the `Found` state with a fresh id.
    #[must_use]
    pub fn new(isbn: impl Into<String>, title: impl Into<String>, picture_url: Option<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            isbn: isbn.into(),
            title: title.into(),
            picture_url,
            state: BookState::Found,
            due_date: None,
            library_card_id: None,
            user_id: None,
        }
    }
}

/// Raw `book` row; states and dates are stored as text.
#[derive(Debug, Clone, FromRow)]
pub(crate) struct BookRow {
    pub id: String,
    pub isbn: String,
    pub title: String,
    pub picture_url: Option<String>,
    #[sqlx(rename = "state")]
    pub state_str: String,
    pub due_date: Option<String>,
    pub library_card_id: Option<String>,
    pub user_id: Option<String>,
}

impl From<BookRow> for Book {
    fn from(row: BookRow) -> Self {
        let state = row.state_str.parse().unwrap_or_else(|_| {
            warn!(id = %row.id, state = %row.state_str, "Unknown stored book state; treating as found");
            BookState::Found
        });
        let due_date = row.due_date.as_deref().and_then(|raw| {
            NaiveDate::parse_from_str(raw, DATE_FORMAT)
                .inspect_err(|_| warn!(id = %row.id, due_date = raw, "Unreadable stored due date"))
                .ok()
        });

        Self {
            id: row.id,
            isbn: row.isbn,
            title: row.title,
            picture_url: row.picture_url,
            state,
            due_date,
            library_card_id: row.library_card_id,
            user_id: row.user_id,
        }
    }
}

/// Storage format of due dates.
pub(crate) const DATE_FORMAT: &str = "%Y-%m-%d";

/// Input for manually adding a book.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewBook {
    /// ISBN of the book.
    pub isbn: String,
    /// Title of the book.
    pub title: String,
    /// Optional cover image URL.
    pub picture_url: Option<String>,
}

/// One entry of a batch state update.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct BookStateUpdate {
    /// Book to update.
    pub id: String,
    /// New state.
    pub state: BookState,
}
