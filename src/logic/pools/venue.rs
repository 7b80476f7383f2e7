use alloy_primitives::{Address, U256};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

/// Token pair in canonical order plus the venue contract that trades it.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct VenueIdentity {
    pub address: Address,
    pub token0: Address,
    pub token1: Address,
}

impl VenueIdentity {
    pub fn new(address: Address, token_a: Address, token_b: Address) -> Self {
        let (token0, token1) = sort_tokens(token_a, token_b);
        Self { address, token0, token1 }
    }

    pub fn contains(&self, token: Address) -> bool {
        self.token0 == token || self.token1 == token
    }

    pub fn is_token0(&self, token: Address) -> bool {
        self.token0 == token
    }

    pub fn other_token(&self, token: Address) -> Option<Address> {
        if token == self.token0 {
            Some(self.token1)
        } else if token == self.token1 {
            Some(self.token0)
        } else {
            None
        }
    }
}

impl Display for VenueIdentity {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}/{:?}@{:?}", self.token0, self.token1, self.address)
    }
}

/// Orders a pair by numeric address value, the same rule the factory applies.
pub fn sort_tokens(token_a: Address, token_b: Address) -> (Address, Address) {
    if token_a < token_b { (token_a, token_b) } else { (token_b, token_a) }
}

/// Liquidity state of one venue at one block.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VenueState {
    pub reserve0: U256,
    pub reserve1: U256,
    pub fictive_reserve0: U256,
    pub fictive_reserve1: U256,
    pub price_average0: U256,
    pub price_average1: U256,
    pub price_average_last_timestamp: U256,
    pub fees_lp: U256,
    pub fees_pool: U256,
}

impl VenueState {
    /// Degenerate states cannot be priced.
    pub fn is_degenerate(&self) -> bool {
        self.reserve0.is_zero() || self.reserve1.is_zero() || self.fictive_reserve0.is_zero() || self.fictive_reserve1.is_zero()
    }

    /// Same state with only the fee schedule replaced.
    pub fn with_fees(&self, fees_lp: U256, fees_pool: U256) -> Self {
        Self { fees_lp, fees_pool, ..self.clone() }
    }

    pub fn reserves(&self) -> (U256, U256) {
        (self.reserve0, self.reserve1)
    }

    pub fn fictive_reserves(&self) -> (U256, U256) {
        (self.fictive_reserve0, self.fictive_reserve1)
    }
}
