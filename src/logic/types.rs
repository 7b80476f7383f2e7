use alloy_primitives::{Address, U256};
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};

/// Which side of the trade the requested amounts fix.
#[derive(Copy, Clone, Debug, Display, PartialEq, Eq, Hash, EnumString, Serialize, Deserialize)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SwapSide {
    /// Amounts are inputs, quotes are outputs.
    Sell,
    /// Amounts are outputs, quotes are inputs.
    Buy,
}

/// Quotes of one venue for a list of requested amounts.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct VenuePrices {
    pub identifier: String,
    pub venue: Address,
    /// One entry per requested amount, zero where the venue cannot fill it.
    pub prices: Vec<U256>,
    pub gas_cost: u64,
}

impl VenuePrices {
    pub fn fillable_count(&self) -> usize {
        self.prices.iter().filter(|price| !price.is_zero()).count()
    }
}

/// Ranking entry served from the liquidity cache.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct VenueLiquidity {
    pub venue: Address,
    pub connector_token: Address,
    pub liquidity_usd: f64,
}
