//! Card command handlers. PINs go in, never out.

use anyhow::Result;
use libtrack_core::store::{CardUpdate, NewLibraryCard, Store};
use serde_json::json;

use super::{principal, print_json};
use crate::cli::CardCommand;

pub async fn run_card_command(store: &Store, command: CardCommand) -> Result<()> {
    match command {
        CardCommand::Add {
            scope,
            number,
            pin,
            name,
            system,
        } => {
            let user = principal(store, &scope.user).await?;
            let card = store
                .create_card(
                    &user,
                    NewLibraryCard {
                        number,
                        pin,
                        display_name: name,
                        system: Some(system),
                    },
                )
                .await?;
            print_json(&card)
        }
        CardCommand::List { scope } => {
            let user = principal(store, &scope.user).await?;
            print_json(&store.list_cards_for(&user).await?)
        }
        CardCommand::Update {
            scope,
            id,
            number,
            pin,
            name,
        } => {
            let user = principal(store, &scope.user).await?;
            let update = CardUpdate {
                number,
                pin,
                display_name: name,
            };
            print_json(&store.update_card(&user, &id, update).await?)
        }
        CardCommand::Remove { scope, id } => {
            let user = principal(store, &scope.user).await?;
            store.delete_card(&user, &id).await?;
            print_json(&json!({ "deleted": id }))
        }
    }
}
