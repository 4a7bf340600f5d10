//! Fetch command handler: list a card's checkouts without persisting them.

use anyhow::Result;
use libtrack_core::AdapterRegistry;
use tracing::info;

use super::print_json;

pub async fn run_fetch_command(
    registry: &AdapterRegistry,
    number: &str,
    pin: &str,
    system: &str,
) -> Result<()> {
    let adapter = registry.resolve(system)?;
    let checkouts = adapter.fetch_checkouts(number, pin).await?;
    info!(count = checkouts.len(), system = %adapter.system(), "Fetched checkouts");
    print_json(&checkouts)
}
