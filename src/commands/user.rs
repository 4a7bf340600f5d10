use anyhow::Result;
use libtrack_core::store::Store;

use super::print_json;
use crate::cli::UserCommand;

pub async fn run_user_command(store: &Store, command: UserCommand) -> Result<()> {
    match command {
        UserCommand::Add { name } => print_json(&store.create_user(&name).await?),
        UserCommand::List => print_json(&store.list_users().await?),
    }
}
