//! Quotes a pair against a live node.
//!
//! RPC_HTTP_URL=... FACTORY_ADDRESS=... cargo run --example quote -- <token_a> <token_b> <amount>

use alloy_primitives::{Address, U256};
use eyre::{Result, eyre};
use smardex_sync::{BlockTag, SwapSide, SyncConfig, VenueRegistry};
use std::str::FromStr;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt().with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))).init();
    dotenvy::dotenv().ok();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let [token_a, token_b, amount] = args.as_slice() else {
        return Err(eyre!("usage: quote <token_a> <token_b> <amount>"));
    };
    let token_a = Address::from_str(token_a)?;
    let token_b = Address::from_str(token_b)?;
    let amount = U256::from_str(amount)?;

    let config = SyncConfig::from_env()?;
    let registry = VenueRegistry::from_config(&config)?;

    let Some(venue) = registry.resolve_identity(token_a, token_b).await? else {
        info!("No venue for {:?}/{:?}", token_a, token_b);
        return Ok(());
    };

    let synchronizer = registry.synchronizer(venue);
    let (block, state) = synchronizer.generate_state(BlockTag::Latest).await?;
    synchronizer.set_state(state, block);

    for side in [SwapSide::Sell, SwapSide::Buy] {
        match registry.get_prices_volume(token_a, token_b, &[amount], side, block, None).await? {
            Some(prices) => info!("Block {}: {} {} -> {:?} ({})", block, side, amount, prices.prices, prices.identifier),
            None => info!("Block {}: {} has no route", block, side),
        }
    }

    Ok(())
}
