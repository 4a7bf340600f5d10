//! CLI command handlers.
//!
//! Every handler writes JSON to stdout; logs go to stderr.

mod book;
mod card;
mod fetch;
mod sync;
mod user;

pub use book::run_book_command;
pub use card::run_card_command;
pub use fetch::run_fetch_command;
pub use sync::run_sync_command;
pub use user::run_user_command;

use anyhow::Result;
use libtrack_core::store::{AuthUser, Store};
use serde::Serialize;

/// Pretty-prints `value` as JSON on stdout.
fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Looks up the acting user; card and book commands run as this principal.
async fn principal(store: &Store, user_id: &str) -> Result<AuthUser> {
    Ok(store.find_user(user_id).await?.into())
}
