//! Libtrack Core Library
//!
//! Tracks library books a user has borrowed across one or more library card
//! accounts, refreshing loan status by logging in to each library's web
//! catalog and reconciling the reported checkouts with the stored books.
//!
//! # Architecture
//!
//! The library is organized into the following modules:
//! - [`db`] - Database connection and schema management
//! - [`library`] - Session emulation and checkout listing per library system
//! - [`store`] - Users, library cards and books
//! - [`sync`] - Reconciliation of fetched checkouts into the store

// Clippy lints - strict for library code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod db;
pub mod library;
pub mod store;
pub mod sync;
pub mod user_agent;

// Re-export commonly used types
pub use db::{Database, DbError};
pub use library::{
    AdapterRegistry, CheckoutRecord, LibraryError, LibrarySystem, NwplEndpoints,
    build_default_adapter_registry,
};
pub use store::{AuthUser, Book, BookState, LibraryCard, Store, StoreError};
pub use sync::{CardSyncError, SyncEngine, SyncReport};
