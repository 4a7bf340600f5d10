//! Reconciliation of fetched checkouts into the book store.
//!
//! [`SyncEngine`] processes one card at a time: resolve the card's adapter,
//! log in, list checkouts, then create or update one [`Book`] per checkout.
//! A card's failure is recorded in its [`CardSyncResult`] and never stops
//! the batch.
//!
//! Books that no longer appear in a checkout list are left untouched.

mod error;
mod placeholder;

pub use error::CardSyncError;
pub use placeholder::{is_placeholder_isbn, placeholder_isbn};

use chrono::{NaiveDate, Utc};
use serde::Serialize;
use tracing::{debug, info, instrument, warn};

use crate::library::{AdapterRegistry, CheckoutRecord, LibraryError};
use crate::store::{Book, BookRepository, BookState, LibraryCard, LibraryCardRepository, StoreError};

/// Outcome of syncing a single card.
#[derive(Debug, Clone, Default)]
pub struct CardSyncResult {
    /// Books created or updated for this card.
    pub updated_count: usize,
    /// Failures for this card (at most one today).
    pub errors: Vec<CardSyncError>,
}

/// Aggregate outcome of a batch run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncReport {
    /// Cards considered, including ones that failed.
    pub processed_cards: usize,
    /// Books created or updated across all cards.
    pub updated_books: usize,
    /// One message per failed card.
    pub errors: Vec<String>,
}

impl SyncReport {
    fn absorb(&mut self, result: CardSyncResult) {
        self.updated_books += result.updated_count;
        self.errors
            .extend(result.errors.iter().map(ToString::to_string));
    }
}

/// Drives reconciliation against the adapters in a registry.
#[derive(Debug, Clone, Copy)]
pub struct SyncEngine<'a> {
    registry: &'a AdapterRegistry,
}

impl<'a> SyncEngine<'a> {
    /// Creates an engine that resolves adapters from `registry`.
    #[must_use]
    pub fn new(registry: &'a AdapterRegistry) -> Self {
        Self { registry }
    }

    /// Syncs one card using today's UTC date for the overdue check.
    pub async fn sync_card(&self, card: &LibraryCard, books: &dyn BookRepository) -> CardSyncResult {
        self.sync_card_on(card, books, Utc::now().date_naive()).await
    }

    /// Syncs one card as of `today`.
    ///
    /// Never fails: errors end up in the returned result. Books saved before
    /// a mid-card failure stay saved and are counted.
    #[instrument(skip(self, card, books), fields(card_id = %card.id, system = %card.system))]
    pub async fn sync_card_on(
        &self,
        card: &LibraryCard,
        books: &dyn BookRepository,
        today: NaiveDate,
    ) -> CardSyncResult {
        let mut result = CardSyncResult::default();

        if !card.has_credentials() {
            warn!("Skipping card without number or PIN");
            result.errors.push(CardSyncError::missing_credentials(&card.id));
            return result;
        }

        let checkouts = match self.fetch(card).await {
            Ok(checkouts) => checkouts,
            Err(error) => {
                warn!(error = %error, "Checkout fetch failed");
                result.errors.push(CardSyncError::library(&card.id, error));
                return result;
            }
        };
        debug!(count = checkouts.len(), "Retrieved checkouts");

        for checkout in &checkouts {
            match reconcile_checkout(card, checkout, books, today).await {
                Ok(book) => {
                    debug!(book_id = %book.id, state = %book.state, "Book reconciled");
                    result.updated_count += 1;
                }
                Err(error) => {
                    warn!(error = %error, "Saving book failed; abandoning card");
                    result.errors.push(CardSyncError::store(&card.id, error));
                    break;
                }
            }
        }

        result
    }

    async fn fetch(&self, card: &LibraryCard) -> Result<Vec<CheckoutRecord>, LibraryError> {
        let adapter = self.registry.resolve(&card.system)?;
        adapter.fetch_checkouts(&card.number, &card.pin).await
    }

    /// Syncs `cards` one after another as of today.
    pub async fn sync_cards(&self, cards: &[LibraryCard], books: &dyn BookRepository) -> SyncReport {
        self.sync_cards_on(cards, books, Utc::now().date_naive()).await
    }

    /// Syncs `cards` one after another as of `today`.
    #[instrument(skip(self, cards, books), fields(cards = cards.len()))]
    pub async fn sync_cards_on(
        &self,
        cards: &[LibraryCard],
        books: &dyn BookRepository,
        today: NaiveDate,
    ) -> SyncReport {
        let mut report = SyncReport {
            processed_cards: cards.len(),
            ..SyncReport::default()
        };
        for card in cards {
            let result = self.sync_card_on(card, books, today).await;
            report.absorb(result);
        }
        info!(
            processed_cards = report.processed_cards,
            updated_books = report.updated_books,
            errors = report.errors.len(),
            "Book sync finished"
        );
        report
    }

    /// Loads every card from `cards` and syncs them.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] only when the card list itself cannot be read.
    pub async fn sync_all(
        &self,
        cards: &dyn LibraryCardRepository,
        books: &dyn BookRepository,
    ) -> Result<SyncReport, StoreError> {
        let cards = cards.list_cards().await?;
        info!(count = cards.len(), "Processing library cards");
        Ok(self.sync_cards(&cards, books).await)
    }
}

/// Folds one checkout into the store and returns the saved book.
///
/// The due date and loan state are overwritten on every run, including for
/// books the user marked returned.
async fn reconcile_checkout(
    card: &LibraryCard,
    checkout: &CheckoutRecord,
    books: &dyn BookRepository,
    today: NaiveDate,
) -> Result<Book, StoreError> {
    let existing = match checkout.isbn.as_deref() {
        Some(isbn) => books.find_by_isbn(isbn, card.user_id.as_deref()).await?,
        None => None,
    };

    let mut book = match existing {
        Some(book) => book,
        None => {
            let isbn = checkout.isbn.clone().unwrap_or_else(placeholder_isbn);
            let mut book = Book::new(isbn, &checkout.title, checkout.cover_image_url.clone());
            book.user_id.clone_from(&card.user_id);
            book
        }
    };

    book.due_date = Some(checkout.due_date);
    book.state = BookState::for_loan(checkout.due_date, today);
    book.library_card_id = Some(card.id.clone());

    books.save(&book).await
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::{Arc, Mutex};

    use async_trait::async_trait;

    use super::*;
    use crate::Database;
    use crate::library::{
        CatalogClient, LibraryAdapter, LibrarySession, LibrarySystem, SessionAcquirer,
        SessionCookies,
    };
    use crate::store::{AuthUser, NewLibraryCard, Store};

    struct FakeAcquirer {
        fail_with: Option<LibraryError>,
    }

    #[async_trait]
    impl SessionAcquirer for FakeAcquirer {
        async fn acquire(&self, _card_number: &str, _pin: &str) -> Result<LibrarySession, LibraryError> {
            if let Some(error) = &self.fail_with {
                return Err(error.clone());
            }
            Ok(LibrarySession {
                cookies: SessionCookies::new(),
                session_id: "sess-1".to_string(),
                access_token: "at-1".to_string(),
                account_id: "2".to_string(),
            })
        }
    }

    struct FakeCatalog {
        checkouts: Arc<Mutex<Vec<CheckoutRecord>>>,
    }

    #[async_trait]
    impl CatalogClient for FakeCatalog {
        async fn list_checkouts(
            &self,
            _session: &LibrarySession,
        ) -> Result<Vec<CheckoutRecord>, LibraryError> {
            Ok(self.checkouts.lock().unwrap().clone())
        }
    }

    fn registry_with(checkouts: Vec<CheckoutRecord>, fail_with: Option<LibraryError>) -> AdapterRegistry {
        let mut registry = AdapterRegistry::new();
        registry.register(LibraryAdapter::new(
            LibrarySystem::Nwpl,
            Box::new(FakeAcquirer { fail_with }),
            Box::new(FakeCatalog {
                checkouts: Arc::new(Mutex::new(checkouts)),
            }),
        ));
        registry
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn today() -> NaiveDate {
        date(2026, 10, 16)
    }

    fn checkout(title: &str, isbn: Option<&str>, due: NaiveDate) -> CheckoutRecord {
        CheckoutRecord {
            title: title.to_string(),
            isbn: isbn.map(str::to_string),
            due_date: due,
            cover_image_url: None,
        }
    }

    async fn setup() -> (Store, AuthUser, LibraryCard) {
        let store = Store::new(Database::new_in_memory().await.unwrap());
        let user: AuthUser = store.create_user("Ada").await.unwrap().into();
        let card = store
            .create_card(
                &user,
                NewLibraryCard {
                    number: "12345".to_string(),
                    pin: "6789".to_string(),
                    display_name: "Main".to_string(),
                    system: None,
                },
            )
            .await
            .unwrap();
        (store, user, card)
    }

    #[tokio::test]
    async fn test_sync_card_sets_overdue_and_checked_out() {
        let (store, user, card) = setup().await;
        let registry = registry_with(
            vec![
                checkout("Late", Some("111"), date(2026, 10, 15)),
                checkout("Today", Some("222"), today()),
                checkout("Later", Some("333"), date(2026, 11, 1)),
            ],
            None,
        );

        let result = SyncEngine::new(&registry)
            .sync_card_on(&card, &store, today())
            .await;

        assert_eq!(result.updated_count, 3);
        assert!(result.errors.is_empty());
        let books = store.list_books(&user, &[]).await.unwrap();
        let state_of = |title: &str| books.iter().find(|b| b.title == title).unwrap().state;
        assert_eq!(state_of("Late"), BookState::Overdue);
        assert_eq!(state_of("Today"), BookState::CheckedOut);
        assert_eq!(state_of("Later"), BookState::CheckedOut);
        assert!(books.iter().all(|b| b.library_card_id.as_deref() == Some(card.id.as_str())));
    }

    #[tokio::test]
    async fn test_sync_card_is_idempotent_for_stable_isbn() {
        let (store, user, card) = setup().await;
        let registry = registry_with(vec![checkout("Dune", Some("9780441013593"), today())], None);
        let engine = SyncEngine::new(&registry);

        engine.sync_card_on(&card, &store, today()).await;
        let first = store.list_books(&user, &[]).await.unwrap();
        engine.sync_card_on(&card, &store, today()).await;
        let second = store.list_books(&user, &[]).await.unwrap();

        assert_eq!(first.len(), 1);
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_sync_card_without_isbn_creates_new_book_each_run() {
        let (store, user, card) = setup().await;
        let registry = registry_with(vec![checkout("Zine", None, today())], None);
        let engine = SyncEngine::new(&registry);

        for _ in 0..3 {
            let result = engine.sync_card_on(&card, &store, today()).await;
            assert_eq!(result.updated_count, 1);
        }

        let books = store.list_books(&user, &[]).await.unwrap();
        assert_eq!(books.len(), 3);
        assert!(books.iter().all(|b| is_placeholder_isbn(&b.isbn)));
        let mut isbns: Vec<_> = books.iter().map(|b| b.isbn.clone()).collect();
        isbns.sort();
        isbns.dedup();
        assert_eq!(isbns.len(), 3);
    }

    #[tokio::test]
    async fn test_sync_card_resurrects_returned_book() {
        let (store, user, card) = setup().await;
        let registry = registry_with(vec![checkout("Dune", Some("123"), date(2026, 11, 1))], None);
        let engine = SyncEngine::new(&registry);
        engine.sync_card_on(&card, &store, today()).await;

        let book = store.list_books(&user, &[]).await.unwrap().remove(0);
        store
            .update_book_states(
                &user,
                &[crate::store::BookStateUpdate {
                    id: book.id.clone(),
                    state: BookState::Returned,
                }],
            )
            .await
            .unwrap();

        engine.sync_card_on(&card, &store, today()).await;
        let book = store.get_book(&user, &book.id).await.unwrap();
        assert_eq!(book.state, BookState::CheckedOut);
    }

    #[tokio::test]
    async fn test_sync_card_updates_due_date_on_renewal() {
        let (store, user, card) = setup().await;
        let checkouts = Arc::new(Mutex::new(vec![checkout("Dune", Some("123"), date(2026, 10, 10))]));
        let mut registry = AdapterRegistry::new();
        registry.register(LibraryAdapter::new(
            LibrarySystem::Nwpl,
            Box::new(FakeAcquirer { fail_with: None }),
            Box::new(FakeCatalog {
                checkouts: Arc::clone(&checkouts),
            }),
        ));
        let engine = SyncEngine::new(&registry);

        engine.sync_card_on(&card, &store, today()).await;
        assert_eq!(
            store.list_books(&user, &[]).await.unwrap()[0].state,
            BookState::Overdue
        );

        checkouts.lock().unwrap()[0].due_date = date(2026, 10, 30);
        engine.sync_card_on(&card, &store, today()).await;

        let books = store.list_books(&user, &[]).await.unwrap();
        assert_eq!(books.len(), 1);
        assert_eq!(books[0].state, BookState::CheckedOut);
        assert_eq!(books[0].due_date, Some(date(2026, 10, 30)));
    }

    #[tokio::test]
    async fn test_sync_card_records_library_failure() {
        let (store, _user, card) = setup().await;
        let registry = registry_with(
            vec![],
            Some(LibraryError::authentication("nwpl", "missing session tokens")),
        );

        let result = SyncEngine::new(&registry)
            .sync_card_on(&card, &store, today())
            .await;

        assert_eq!(result.updated_count, 0);
        assert_eq!(result.errors.len(), 1);
        assert!(
            result.errors[0]
                .to_string()
                .starts_with(&format!("Error processing library card {}", card.id))
        );
    }

    #[tokio::test]
    async fn test_sync_cards_continues_past_bad_card() {
        let (store, _user, card) = setup().await;
        let mut incomplete = card.clone();
        incomplete.id = "no-pin".to_string();
        incomplete.pin = String::new();
        let mut unnumbered = card.clone();
        unnumbered.id = "no-number".to_string();
        unnumbered.number = "  ".to_string();
        let mut unsupported = card.clone();
        unsupported.id = "elsewhere".to_string();
        unsupported.system = "vpl".to_string();

        let registry = registry_with(vec![checkout("Dune", Some("123"), today())], None);
        let report = SyncEngine::new(&registry)
            .sync_cards_on(&[incomplete, unnumbered, unsupported, card], &store, today())
            .await;

        assert_eq!(report.processed_cards, 4);
        assert_eq!(report.updated_books, 1);
        assert_eq!(report.errors.len(), 3);
        assert_eq!(
            report.errors[0],
            "Library card no-pin is missing card number or PIN"
        );
        assert_eq!(
            report.errors[1],
            "Library card no-number is missing card number or PIN"
        );
        assert!(report.errors[2].contains("elsewhere"));
    }

    #[tokio::test]
    async fn test_sync_all_reads_cards_from_repository() {
        let (store, _user, _card) = setup().await;
        let registry = registry_with(vec![checkout("Dune", Some("123"), today())], None);

        let report = SyncEngine::new(&registry)
            .sync_all(&store, &store)
            .await
            .unwrap();

        assert_eq!(report.processed_cards, 1);
        assert_eq!(report.updated_books, 1);
        assert!(report.errors.is_empty());
    }

    #[test]
    fn test_sync_report_serializes_camel_case() {
        let report = SyncReport {
            processed_cards: 2,
            updated_books: 1,
            errors: vec!["boom".to_string()],
        };
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["processedCards"], 2);
        assert_eq!(json["updatedBooks"], 1);
        assert_eq!(json["errors"][0], "boom");
    }
}
