use alloy_primitives::{Address, address};

/// Canonical Multicall3 deployment, same address on most EVM chains.
pub const MULTICALL3: Address = address!("0xcA11bde05977b3631167028862bE2a173976CA11");

/// Fees are expressed in parts of this base.
pub const FEES_BASE: u64 = 1_000_000;

/// Window over which the price average converges to the fictive price.
pub const MAX_BLOCK_DIFF_SECONDS: u64 = 300;

/// Relative tolerance of `APPROX_PRECISION / APPROX_PRECISION_BASE` used when
/// comparing the fictive price with the price average.
pub const APPROX_PRECISION: u64 = 1;
pub const APPROX_PRECISION_BASE: u64 = 1_000_000;

pub const DEFAULT_SWAP_GAS_COST: u64 = 150_000;

pub const DEFAULT_VENUE_KEY: &str = "smardex";
