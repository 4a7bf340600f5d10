//! Sync command handler: refresh checkouts for stored cards.

use anyhow::Result;
use libtrack_core::store::Store;
use libtrack_core::{AdapterRegistry, SyncEngine, SyncReport};
use serde::Serialize;
use tracing::info;

use super::{principal, print_json};

#[derive(Debug, Serialize)]
struct SyncOutput<'a> {
    success: bool,
    message: &'a str,
    results: &'a SyncReport,
}

pub async fn run_sync_command(
    store: &Store,
    registry: &AdapterRegistry,
    user_id: Option<&str>,
) -> Result<()> {
    info!("Starting book sync");
    let engine = SyncEngine::new(registry);

    let report = match user_id {
        Some(user_id) => {
            let user = principal(store, user_id).await?;
            let cards = store.list_cards_for(&user).await?;
            engine.sync_cards(&cards, store).await
        }
        None => engine.sync_all(store, store).await?,
    };

    print_json(&SyncOutput {
        success: true,
        message: "Book sync completed",
        results: &report,
    })
}
