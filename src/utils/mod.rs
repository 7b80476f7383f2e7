pub mod cache;
pub mod config_loader;

pub use cache::{CacheItem, CacheStats, EmptyLiquiditySource, LiquidityCache, LiquiditySource};
pub use config_loader::*;
