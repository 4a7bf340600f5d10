//! Book command handlers.

use anyhow::{Result, anyhow};
use libtrack_core::store::{BookState, BookStateUpdate, NewBook, Store};
use serde_json::json;
use tracing::warn;

use super::{principal, print_json};
use crate::cli::BookCommand;

fn parse_state(raw: &str) -> Result<BookState> {
    raw.trim()
        .to_ascii_lowercase()
        .parse()
        .map_err(|message: String| anyhow!(message))
}

pub async fn run_book_command(store: &Store, command: BookCommand) -> Result<()> {
    match command {
        BookCommand::List { scope, states } => {
            let user = principal(store, &scope.user).await?;
            let states = states
                .iter()
                .filter(|raw| !raw.trim().is_empty())
                .map(|raw| parse_state(raw))
                .collect::<Result<Vec<_>>>()?;
            print_json(&store.list_books(&user, &states).await?)
        }
        BookCommand::Add {
            scope,
            isbn,
            title,
            picture_url,
        } => {
            let user = principal(store, &scope.user).await?;
            let book = store
                .create_book(
                    &user,
                    NewBook {
                        isbn,
                        title,
                        picture_url,
                    },
                )
                .await?;
            print_json(&book)
        }
        BookCommand::SetState { scope, state, ids } => {
            let user = principal(store, &scope.user).await?;
            let state = parse_state(&state)?;
            let updates: Vec<BookStateUpdate> = ids
                .into_iter()
                .map(|id| BookStateUpdate { id, state })
                .collect();
            let updated = store.update_book_states(&user, &updates).await?;
            if updated.len() < updates.len() {
                warn!(
                    requested = updates.len(),
                    updated = updated.len(),
                    "Some books were not found"
                );
            }
            print_json(&updated)
        }
        BookCommand::Remove { scope, id } => {
            let user = principal(store, &scope.user).await?;
            store.delete_book(&user, &id).await?;
            print_json(&json!({ "deleted": id }))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_state_accepts_mixed_case() {
        assert_eq!(parse_state("Overdue").unwrap(), BookState::Overdue);
        assert_eq!(parse_state(" checked_out ").unwrap(), BookState::CheckedOut);
    }

    #[test]
    fn test_parse_state_rejects_unknown() {
        let err = parse_state("lost").unwrap_err();
        assert!(err.to_string().contains("invalid book state"));
    }
}
