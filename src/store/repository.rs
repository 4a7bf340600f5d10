//! Repository seams used by the sync engine.
//!
//! [`Store`] is the production implementation; tests may swap in their own.

use async_trait::async_trait;

use super::{Book, LibraryCard, Result, Store};

/// Book lookup and persistence used during reconciliation.
#[async_trait]
pub trait BookRepository: Send + Sync {
    /// Finds a book by ISBN for the given owner (`None` matches unowned books).
    async fn find_by_isbn(&self, isbn: &str, user_id: Option<&str>) -> Result<Option<Book>>;

    /// Creates or replaces the book with `book.id`; repeated saves are idempotent.
    async fn save(&self, book: &Book) -> Result<Book>;
}

/// Source of the cards to sync.
#[async_trait]
pub trait LibraryCardRepository: Send + Sync {
    /// Returns every stored card.
    async fn list_cards(&self) -> Result<Vec<LibraryCard>>;
}

#[async_trait]
impl BookRepository for Store {
    async fn find_by_isbn(&self, isbn: &str, user_id: Option<&str>) -> Result<Option<Book>> {
        Store::find_book_by_isbn(self, isbn, user_id).await
    }

    async fn save(&self, book: &Book) -> Result<Book> {
        Store::save_book(self, book).await
    }
}

#[async_trait]
impl LibraryCardRepository for Store {
    async fn list_cards(&self) -> Result<Vec<LibraryCard>> {
        Store::list_all_cards(self).await
    }
}
