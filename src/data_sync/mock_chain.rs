//! In-memory chain answering Multicall3 `aggregate` requests from per-block venue states.

use crate::data_sync::codec::{ISmardexFactory, ISmardexPair, Multicall3};
use crate::data_sync::logs::LogEntry;
use crate::data_sync::transport::{BlockTag, RemoteReader};
use crate::logic::pools::{VenueIdentity, VenueState, sort_tokens};
use alloy_primitives::{Address, Bytes, U256};
use alloy_sol_types::{SolCall, SolEvent, SolValue};
use async_trait::async_trait;
use dashmap::DashMap;
use eyre::{Result, eyre};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};

pub(crate) struct MockChain {
    multicall: Address,
    factory: Address,
    latest: AtomicU64,
    next_venue: AtomicU64,
    pairs: DashMap<(Address, Address), Address>,
    venues: DashMap<Address, VenueIdentity>,
    states: DashMap<Address, BTreeMap<u64, VenueState>>,
    round_trips: AtomicU64,
    discovery_reads: AtomicU64,
    failures_left: AtomicU64,
    truncations_left: AtomicU64,
}

/// Distinct, non-degenerate state per seed.
pub(crate) fn sample_state(seed: u64) -> VenueState {
    let e17 = U256::from(100_000_000_000_000_000u64);
    let seed = U256::from(seed);
    VenueState {
        reserve0: e17 * U256::from(10) + seed,
        reserve1: e17 * U256::from(20) + seed,
        fictive_reserve0: e17 * U256::from(5) + seed,
        fictive_reserve1: e17 * U256::from(10) + seed,
        price_average0: e17 * U256::from(5),
        price_average1: e17 * U256::from(10),
        price_average_last_timestamp: U256::from(1_700_000_000u64) + seed,
        fees_lp: U256::from(700),
        fees_pool: U256::from(200),
    }
}

impl MockChain {
    pub(crate) fn new(latest: u64) -> Self {
        Self {
            multicall: Address::repeat_byte(0xca),
            factory: Address::repeat_byte(0xfa),
            latest: AtomicU64::new(latest),
            next_venue: AtomicU64::new(1),
            pairs: DashMap::new(),
            venues: DashMap::new(),
            states: DashMap::new(),
            round_trips: AtomicU64::new(0),
            discovery_reads: AtomicU64::new(0),
            failures_left: AtomicU64::new(0),
            truncations_left: AtomicU64::new(0),
        }
    }

    pub(crate) fn multicall_address(&self) -> Address {
        self.multicall
    }

    pub(crate) fn factory_address(&self) -> Address {
        self.factory
    }

    /// Deploys a pair for the two tokens.
    pub(crate) fn add_venue(&self, token_a: Address, token_b: Address) -> VenueIdentity {
        let mut bytes = [0xeeu8; 20];
        bytes[12..].copy_from_slice(&self.next_venue.fetch_add(1, Ordering::SeqCst).to_be_bytes());
        let venue = VenueIdentity::new(Address::from(bytes), token_a, token_b);

        self.pairs.insert(sort_tokens(token_a, token_b), venue.address);
        self.venues.insert(venue.address, venue);
        venue
    }

    /// State of `pair` from `block` on, until a later block overrides it.
    pub(crate) fn set_state(&self, pair: Address, block: u64, state: VenueState) {
        self.states.entry(pair).or_default().insert(block, state);
    }

    pub(crate) fn fail_next_calls(&self, count: u64) {
        self.failures_left.store(count, Ordering::SeqCst);
    }

    /// Next `count` answers lose their last result.
    pub(crate) fn truncate_next_answers(&self, count: u64) {
        self.truncations_left.store(count, Ordering::SeqCst);
    }

    pub(crate) fn round_trips(&self) -> u64 {
        self.round_trips.load(Ordering::SeqCst)
    }

    pub(crate) fn discovery_reads(&self) -> u64 {
        self.discovery_reads.load(Ordering::SeqCst)
    }

    pub(crate) fn sync_log(block: u64, pair: Address, state: &VenueState) -> LogEntry {
        let data = (
            state.reserve0,
            state.reserve1,
            state.fictive_reserve0,
            state.fictive_reserve1,
            state.price_average0,
            state.price_average1,
        )
            .abi_encode_params();
        LogEntry::new(block, pair, vec![ISmardexPair::Sync::SIGNATURE_HASH], data.into())
    }

    pub(crate) fn fees_changed_log(block: u64, pair: Address, fees_lp: u64, fees_pool: u64) -> LogEntry {
        let data = (U256::from(fees_lp), U256::from(fees_pool)).abi_encode_params();
        LogEntry::new(block, pair, vec![ISmardexPair::FeesChanged::SIGNATURE_HASH], data.into())
    }

    fn state_at(&self, pair: Address, block: u64) -> Option<VenueState> {
        self.states.get(&pair).and_then(|history| history.range(..=block).next_back().map(|(_, state)| state.clone()))
    }

    fn take_one(counter: &AtomicU64) -> bool {
        counter.fetch_update(Ordering::SeqCst, Ordering::SeqCst, |left| left.checked_sub(1)).is_ok()
    }

    fn answer(&self, call: &Multicall3::Call, block: u64) -> Result<Bytes> {
        let selector: [u8; 4] = call
            .callData
            .get(..4)
            .and_then(|prefix| prefix.try_into().ok())
            .ok_or_else(|| eyre!("calldata too short"))?;

        if call.target == self.factory {
            if selector != ISmardexFactory::getPairCall::SELECTOR {
                return Err(eyre!("execution reverted: unknown factory selector"));
            }
            self.discovery_reads.fetch_add(1, Ordering::SeqCst);
            let args = ISmardexFactory::getPairCall::abi_decode(&call.callData)?;
            let pair = self.pairs.get(&sort_tokens(args.tokenA, args.tokenB)).map(|entry| *entry.value()).unwrap_or(Address::ZERO);
            return Ok(pair.abi_encode().into());
        }

        if !self.venues.contains_key(&call.target) {
            return Err(eyre!("execution reverted: no contract"));
        }
        let state = self.state_at(call.target, block).ok_or_else(|| eyre!("execution reverted: no state at {}", block))?;
        let encoded = if selector == ISmardexPair::getReservesCall::SELECTOR {
            (state.reserve0, state.reserve1).abi_encode_params()
        } else if selector == ISmardexPair::getFictiveReservesCall::SELECTOR {
            (state.fictive_reserve0, state.fictive_reserve1).abi_encode_params()
        } else if selector == ISmardexPair::getPriceAverageCall::SELECTOR {
            (state.price_average0, state.price_average1, state.price_average_last_timestamp).abi_encode_params()
        } else if selector == ISmardexPair::getPairFeesCall::SELECTOR {
            (state.fees_lp.to::<u128>(), state.fees_pool.to::<u128>()).abi_encode_params()
        } else {
            return Err(eyre!("execution reverted: unknown selector"));
        };
        Ok(encoded.into())
    }
}

#[async_trait]
impl RemoteReader for MockChain {
    async fn call(&self, to: Address, data: Bytes, block: BlockTag) -> Result<Bytes> {
        self.round_trips.fetch_add(1, Ordering::SeqCst);
        if Self::take_one(&self.failures_left) {
            return Err(eyre!("connection reset by peer"));
        }
        if to != self.multicall {
            return Err(eyre!("execution reverted: not a multicall"));
        }

        let request = Multicall3::aggregateCall::abi_decode(&data)?;
        let block_number = block.number().unwrap_or_else(|| self.latest.load(Ordering::SeqCst));

        let mut return_data = Vec::with_capacity(request.calls.len());
        for call in &request.calls {
            return_data.push(self.answer(call, block_number)?);
        }
        if Self::take_one(&self.truncations_left) {
            return_data.pop();
        }

        Ok((U256::from(block_number), return_data).abi_encode_params().into())
    }
}
