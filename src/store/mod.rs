//! `SQLite`-backed persistence for users, library cards and books.
//!
//! # Overview
//!
//! - [`Store`] - Main interface; every card and book operation is scoped by
//!   an [`AuthUser`] principal
//! - [`BookRepository`] / [`LibraryCardRepository`] - The narrow seams the
//!   sync engine depends on
//! - [`Book`] / [`BookState`] - Tracked books and their lifecycle
//! - [`LibraryCard`] - Card credentials (PIN never serialized)
//! - [`StoreError`] - Operation error types
//!
//! # Example
//!
//! ```no_run
//! use libtrack_core::Database;
//! use libtrack_core::store::{AuthUser, BookState, Store};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let db = Database::new_in_memory().await?;
//! let store = Store::new(db);
//! let user: AuthUser = store.create_user("Ada").await?.into();
//! let overdue = store.list_books(&user, &[BookState::Overdue]).await?;
//! println!("{} overdue", overdue.len());
//! # Ok(())
//! # }
//! ```

mod book;
mod card;
mod error;
mod repository;
mod user;

pub use book::{Book, BookState, BookStateUpdate, NewBook};
pub use card::{CardUpdate, LibraryCard, NewLibraryCard};
pub use error::{StoreDbErrorKind, StoreError};
pub use repository::{BookRepository, LibraryCardRepository};
pub use user::{AuthUser, User};

use book::{BookRow, DATE_FORMAT};
use sqlx::{QueryBuilder, Sqlite};
use tracing::{debug, instrument, warn};
use uuid::Uuid;

use crate::db::Database;
use crate::library::LibrarySystem;

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;

const BOOK_COLUMNS: &str =
    "id, isbn, title, picture_url, state, due_date, library_card_id, user_id";
const CARD_COLUMNS: &str = "id, number, pin, display_name, system, user_id";

fn check_affected(entity: &'static str, id: &str, rows_affected: u64) -> Result<()> {
    if rows_affected == 0 {
        Err(StoreError::not_found(entity, id))
    } else {
        Ok(())
    }
}

fn require_non_empty(field: &'static str, value: &str) -> Result<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(StoreError::validation(field, "must not be empty"));
    }
    Ok(trimmed.to_string())
}

/// Store manager over a shared [`Database`].
#[derive(Debug, Clone)]
pub struct Store {
    db: Database,
}

impl Store {
    /// Wraps an open [`Database`].
    #[must_use]
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    // ==================== Users ====================

    /// Creates a user.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Validation`] for a blank name, or
    /// [`StoreError::Database`] if the insert fails.
    #[instrument(skip(self))]
    pub async fn create_user(&self, name: &str) -> Result<User> {
        let user = User {
            id: Uuid::new_v4().to_string(),
            name: require_non_empty("name", name)?,
        };
        sqlx::query("INSERT INTO app_user (id, name) VALUES (?, ?)")
            .bind(&user.id)
            .bind(&user.name)
            .execute(self.db.pool())
            .await?;
        debug!(id = %user.id, "User created");
        Ok(user)
    }

    /// Lists all users in creation order.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Database`] if the query fails.
    pub async fn list_users(&self) -> Result<Vec<User>> {
        let users =
            sqlx::query_as::<_, User>("SELECT id, name FROM app_user ORDER BY created_at, rowid")
                .fetch_all(self.db.pool())
                .await?;
        Ok(users)
    }

    /// Looks up a user by id.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] if no such user exists.
    pub async fn find_user(&self, id: &str) -> Result<User> {
        sqlx::query_as::<_, User>("SELECT id, name FROM app_user WHERE id = ?")
            .bind(id)
            .fetch_optional(self.db.pool())
            .await?
            .ok_or_else(|| StoreError::not_found("user", id))
    }

    // ==================== Library cards ====================

    /// Registers a card for `user`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Validation`] when number, PIN or display name is
    /// blank or the system is unknown.
    #[instrument(skip(self, user, card), fields(user_id = %user.id))]
    pub async fn create_card(&self, user: &AuthUser, card: NewLibraryCard) -> Result<LibraryCard> {
        let system = match card.system.as_deref() {
            Some(raw) => raw
                .parse::<LibrarySystem>()
                .map_err(|error| StoreError::validation("system", error.to_string()))?,
            None => LibrarySystem::Nwpl,
        };
        let card = LibraryCard {
            id: Uuid::new_v4().to_string(),
            number: require_non_empty("number", &card.number)?,
            pin: require_non_empty("pin", &card.pin)?,
            display_name: require_non_empty("display name", &card.display_name)?,
            system: system.as_str().to_string(),
            user_id: Some(user.id.clone()),
        };

        sqlx::query(
            r"INSERT INTO library_card (id, number, pin, display_name, system, user_id)
              VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(&card.id)
        .bind(&card.number)
        .bind(&card.pin)
        .bind(&card.display_name)
        .bind(&card.system)
        .bind(&card.user_id)
        .execute(self.db.pool())
        .await?;

        debug!(card_id = %card.id, system = %card.system, "Library card created");
        Ok(card)
    }

    /// Lists the cards owned by `user`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Database`] if the query fails.
    pub async fn list_cards_for(&self, user: &AuthUser) -> Result<Vec<LibraryCard>> {
        let cards = sqlx::query_as::<_, LibraryCard>(&format!(
            "SELECT {CARD_COLUMNS} FROM library_card WHERE user_id = ? ORDER BY created_at, rowid"
        ))
        .bind(&user.id)
        .fetch_all(self.db.pool())
        .await?;
        Ok(cards)
    }

    /// Lists every card regardless of owner (batch sync input).
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Database`] if the query fails.
    pub async fn list_all_cards(&self) -> Result<Vec<LibraryCard>> {
        let cards = sqlx::query_as::<_, LibraryCard>(&format!(
            "SELECT {CARD_COLUMNS} FROM library_card ORDER BY created_at, rowid"
        ))
        .fetch_all(self.db.pool())
        .await?;
        Ok(cards)
    }

    /// Fetches one of `user`'s cards.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] if the card does not exist or belongs
    /// to someone else.
    pub async fn get_card(&self, user: &AuthUser, id: &str) -> Result<LibraryCard> {
        sqlx::query_as::<_, LibraryCard>(&format!(
            "SELECT {CARD_COLUMNS} FROM library_card WHERE id = ? AND user_id = ?"
        ))
        .bind(id)
        .bind(&user.id)
        .fetch_optional(self.db.pool())
        .await?
        .ok_or_else(|| StoreError::not_found("library card", id))
    }

    /// Applies a partial update to one of `user`'s cards.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Validation`] for a provided-but-blank field and
    /// [`StoreError::NotFound`] for an unknown or foreign card.
    #[instrument(skip(self, user, update), fields(user_id = %user.id))]
    pub async fn update_card(
        &self,
        user: &AuthUser,
        id: &str,
        update: CardUpdate,
    ) -> Result<LibraryCard> {
        if update.is_empty() {
            return self.get_card(user, id).await;
        }
        let number = update
            .number
            .as_deref()
            .map(|v| require_non_empty("number", v))
            .transpose()?;
        let pin = update
            .pin
            .as_deref()
            .map(|v| require_non_empty("pin", v))
            .transpose()?;
        let display_name = update
            .display_name
            .as_deref()
            .map(|v| require_non_empty("display name", v))
            .transpose()?;

        let result = sqlx::query(
            r"UPDATE library_card
              SET number = COALESCE(?, number),
                  pin = COALESCE(?, pin),
                  display_name = COALESCE(?, display_name)
              WHERE id = ? AND user_id = ?",
        )
        .bind(number)
        .bind(pin)
        .bind(display_name)
        .bind(id)
        .bind(&user.id)
        .execute(self.db.pool())
        .await?;
        check_affected("library card", id, result.rows_affected())?;

        self.get_card(user, id).await
    }

    /// Deletes one of `user`'s cards; its books keep existing without a card.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] for an unknown or foreign card.
    #[instrument(skip(self, user), fields(user_id = %user.id))]
    pub async fn delete_card(&self, user: &AuthUser, id: &str) -> Result<()> {
        let result = sqlx::query("DELETE FROM library_card WHERE id = ? AND user_id = ?")
            .bind(id)
            .bind(&user.id)
            .execute(self.db.pool())
            .await?;
        check_affected("library card", id, result.rows_affected())
    }

    // ==================== Books ====================

    /// Lists `user`'s books, optionally restricted to `states`.
    ///
    /// An empty `states` slice means no filter.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Database`] if the query fails.
    pub async fn list_books(&self, user: &AuthUser, states: &[BookState]) -> Result<Vec<Book>> {
        let mut query: QueryBuilder<'_, Sqlite> =
            QueryBuilder::new(format!("SELECT {BOOK_COLUMNS} FROM book WHERE user_id = "));
        query.push_bind(user.id.clone());
        if !states.is_empty() {
            query.push(" AND state IN (");
            let mut separated = query.separated(", ");
            for state in states {
                separated.push_bind(state.as_str());
            }
            separated.push_unseparated(")");
        }
        query.push(" ORDER BY title, rowid");

        let rows = query
            .build_query_as::<BookRow>()
            .fetch_all(self.db.pool())
            .await?;
        Ok(rows.into_iter().map(Book::from).collect())
    }

    /// Fetches one of `user`'s books.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] for an unknown or foreign book.
    pub async fn get_book(&self, user: &AuthUser, id: &str) -> Result<Book> {
        sqlx::query_as::<_, BookRow>(&format!(
            "SELECT {BOOK_COLUMNS} FROM book WHERE id = ? AND user_id = ?"
        ))
        .bind(id)
        .bind(&user.id)
        .fetch_optional(self.db.pool())
        .await?
        .map(Book::from)
        .ok_or_else(|| StoreError::not_found("book", id))
    }

    /// Sets the state of several books; ids that are unknown or foreign are
    /// skipped. Returns the books that were updated.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Database`] if any update fails.
    #[instrument(skip(self, user, updates), fields(user_id = %user.id, count = updates.len()))]
    pub async fn update_book_states(
        &self,
        user: &AuthUser,
        updates: &[BookStateUpdate],
    ) -> Result<Vec<Book>> {
        let mut updated = Vec::with_capacity(updates.len());
        for update in updates {
            let result = sqlx::query(
                r"UPDATE book SET state = ?, updated_at = datetime('now')
                  WHERE id = ? AND user_id = ?",
            )
            .bind(update.state.as_str())
            .bind(&update.id)
            .bind(&user.id)
            .execute(self.db.pool())
            .await?;

            if result.rows_affected() == 0 {
                warn!(book_id = %update.id, "Skipping state update for unknown book");
                continue;
            }
            updated.push(self.get_book(user, &update.id).await?);
        }
        Ok(updated)
    }

    /// Adds a book by hand in the `Found` state.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Validation`] for a blank ISBN or title.
    #[instrument(skip(self, user, book), fields(user_id = %user.id))]
    pub async fn create_book(&self, user: &AuthUser, book: NewBook) -> Result<Book> {
        let mut created = Book::new(
            require_non_empty("isbn", &book.isbn)?,
            require_non_empty("title", &book.title)?,
            book.picture_url.filter(|url| !url.trim().is_empty()),
        );
        created.user_id = Some(user.id.clone());
        self.save_book(&created).await
    }

    /// Deletes one of `user`'s books.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] for an unknown or foreign book.
    #[instrument(skip(self, user), fields(user_id = %user.id))]
    pub async fn delete_book(&self, user: &AuthUser, id: &str) -> Result<()> {
        let result = sqlx::query("DELETE FROM book WHERE id = ? AND user_id = ?")
            .bind(id)
            .bind(&user.id)
            .execute(self.db.pool())
            .await?;
        check_affected("book", id, result.rows_affected())
    }

    /// Finds the first book with `isbn` owned by `user_id` (NULL-safe).
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Database`] if the query fails.
    pub async fn find_book_by_isbn(&self, isbn: &str, user_id: Option<&str>) -> Result<Option<Book>> {
        let row = sqlx::query_as::<_, BookRow>(&format!(
            "SELECT {BOOK_COLUMNS} FROM book WHERE isbn = ? AND user_id IS ? ORDER BY rowid LIMIT 1"
        ))
        .bind(isbn)
        .bind(user_id)
        .fetch_optional(self.db.pool())
        .await?;
        Ok(row.map(Book::from))
    }

    /// Inserts the book, or overwrites every field of the row with the same id.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Database`] on failure (including a dangling
    /// card or user reference).
    #[instrument(skip(self, book), fields(book_id = %book.id, state = %book.state))]
    pub async fn save_book(&self, book: &Book) -> Result<Book> {
        let due_date = book
            .due_date
            .map(|date| date.format(DATE_FORMAT).to_string());

        sqlx::query(
            r"INSERT INTO book
                (id, isbn, title, picture_url, state, due_date, library_card_id, user_id)
              VALUES (?, ?, ?, ?, ?, ?, ?, ?)
              ON CONFLICT(id) DO UPDATE SET
                isbn = excluded.isbn,
                title = excluded.title,
                picture_url = excluded.picture_url,
                state = excluded.state,
                due_date = excluded.due_date,
                library_card_id = excluded.library_card_id,
                user_id = excluded.user_id,
                updated_at = datetime('now')",
        )
        .bind(&book.id)
        .bind(&book.isbn)
        .bind(&book.title)
        .bind(&book.picture_url)
        .bind(book.state.as_str())
        .bind(due_date)
        .bind(&book.library_card_id)
        .bind(&book.user_id)
        .execute(self.db.pool())
        .await?;

        Ok(book.clone())
    }
}
