use crate::data_sync::codec;
use crate::data_sync::config::SyncConfig;
use crate::data_sync::logs::LogEntry;
use crate::data_sync::multicall::{Aggregator, BatchedCall};
use crate::data_sync::synchronizer::Synchronizer;
use crate::data_sync::transport::{BlockTag, HttpTransport, RemoteReader};
use crate::logic::pools::{CurveKind, VenueCurve, VenueIdentity, sort_tokens};
use crate::logic::types::{SwapSide, VenueLiquidity, VenuePrices};
use crate::sync_error::SyncError;
use crate::utils::cache::{EmptyLiquiditySource, LiquidityCache, LiquiditySource};
use ahash::{HashMap, HashMapExt, HashSet, HashSetExt, RandomState};
use alloy_primitives::{Address, U256};
use dashmap::DashMap;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::{debug, info, warn};

pub fn unix_now() -> u64 {
    SystemTime::now().duration_since(UNIX_EPOCH).map(|elapsed| elapsed.as_secs()).unwrap_or_default()
}

/// Outcome of a [`VenueRegistry::catch_up`].
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CatchUpReport {
    pub block_number: u64,
    /// Pairs without a venue
    pub missing: usize,
    /// Venues whose cached state already covered the block
    pub fresh: usize,
    pub refreshed: usize,
    pub failed: usize,
}

/// Outcome of a [`VenueRegistry::handle_logs`].
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LogReport {
    pub updated: usize,
    pub failed: usize,
}

/// Venue discovery, synchronizer lifecycle and the quoting entry points.
///
/// Identities are memoized for the life of the registry, including pairs
/// without a venue. Synchronizers are created on first use and never removed.
pub struct VenueRegistry {
    aggregator: Arc<Aggregator>,
    factory: Address,
    curve: CurveKind,
    venue_key: String,
    swap_gas_cost: u64,
    max_snapshots: usize,
    identities: DashMap<(Address, Address), Option<VenueIdentity>, RandomState>,
    synchronizers: DashMap<Address, Arc<Synchronizer>, RandomState>,
    liquidity: LiquidityCache,
    clock: fn() -> u64,
}

impl VenueRegistry {
    /// Registry reading over HTTP as configured.
    pub fn from_config(config: &SyncConfig) -> eyre::Result<Self> {
        config.validate()?;
        let transport = HttpTransport::new(config.rpc_http_url.clone(), config.http_timeout())?;
        VenueRegistryBuilder::new(Arc::new(transport)).with_config(config.clone()).build()
    }

    pub fn builder(reader: Arc<dyn RemoteReader>) -> VenueRegistryBuilder {
        VenueRegistryBuilder::new(reader)
    }

    pub fn aggregator(&self) -> &Arc<Aggregator> {
        &self.aggregator
    }

    pub fn identifier(&self, venue: &VenueIdentity) -> String {
        format!("{}_{:#x}", self.venue_key, venue.address).to_lowercase()
    }

    /// Venue for the unordered pair, `None` when there is none. Each pair is
    /// looked up at most once, identical tokens never.
    pub async fn resolve_identity(&self, token_a: Address, token_b: Address) -> Result<Option<VenueIdentity>, SyncError> {
        let mut resolved = self.resolve_identities(&[(token_a, token_b)]).await?;
        Ok(resolved.pop().flatten())
    }

    /// Batched form of [`Self::resolve_identity`], one discovery request for all unknown pairs.
    pub async fn resolve_identities(&self, pairs: &[(Address, Address)]) -> Result<Vec<Option<VenueIdentity>>, SyncError> {
        let keys: Vec<(Address, Address)> = pairs.iter().map(|(token_a, token_b)| sort_tokens(*token_a, *token_b)).collect();

        let mut unresolved = Vec::new();
        for key in &keys {
            if key.0 == key.1 {
                self.identities.entry(*key).or_insert(None);
            } else if !self.identities.contains_key(key) && !unresolved.contains(key) {
                unresolved.push(*key);
            }
        }

        if !unresolved.is_empty() {
            let calls: Vec<BatchedCall> =
                unresolved.iter().map(|(token0, token1)| codec::get_pair_call(self.factory, *token0, *token1)).collect();
            let answer = self.aggregator.aggregate(&calls, BlockTag::Latest).await?;

            for (key, result) in unresolved.iter().zip(answer.results.iter()) {
                match codec::decode_pair_address(result) {
                    Ok(pair) => {
                        let identity = pair.map(|address| VenueIdentity::new(address, key.0, key.1));
                        if identity.is_none() {
                            debug!("No venue for {:?}/{:?}", key.0, key.1);
                        }
                        self.identities.insert(*key, identity);
                    }
                    Err(e) => warn!("Discovery of {:?}/{:?} returned undecodable data: {}", key.0, key.1, e),
                }
            }
        }

        Ok(keys.iter().map(|key| self.identities.get(key).and_then(|entry| *entry.value())).collect())
    }

    /// Synchronizer of `venue`, created on first use.
    pub fn synchronizer(&self, venue: VenueIdentity) -> Arc<Synchronizer> {
        self.synchronizers
            .entry(venue.address)
            .or_insert_with(|| Arc::new(Synchronizer::new(venue, self.curve, self.aggregator.clone(), self.max_snapshots)))
            .value()
            .clone()
    }

    pub fn existing_synchronizer(&self, venue_address: Address) -> Option<Arc<Synchronizer>> {
        self.synchronizers.get(&venue_address).map(|entry| entry.value().clone())
    }

    /// Union of every synchronizer's subscriptions.
    pub fn subscribed_addresses(&self) -> Vec<Address> {
        self.synchronizers.iter().flat_map(|entry| entry.value().subscriptions()).collect()
    }

    /// Brings every pair's venue to `block` with a single state request for
    /// all venues whose cached state does not cover it.
    pub async fn catch_up(&self, pairs: &[(Address, Address)], block: u64) -> Result<CatchUpReport, SyncError> {
        let identities = self.resolve_identities(pairs).await?;
        let mut report = CatchUpReport { block_number: block, ..CatchUpReport::default() };

        let mut seen = HashSet::new();
        let mut stale = Vec::new();
        for identity in identities {
            let Some(identity) = identity else {
                report.missing += 1;
                continue;
            };
            if !seen.insert(identity.address) {
                continue;
            }
            let synchronizer = self.synchronizer(identity);
            if synchronizer.cached_state(block).is_some() {
                report.fresh += 1;
            } else {
                stale.push(synchronizer);
            }
        }

        if stale.is_empty() {
            return Ok(report);
        }

        let mut calls = Vec::new();
        let mut spans = Vec::with_capacity(stale.len());
        for synchronizer in &stale {
            let venue_calls = synchronizer.curve().state_calls(synchronizer.identity());
            spans.push(calls.len()..calls.len() + venue_calls.len());
            calls.extend(venue_calls);
        }

        let answer = self.aggregator.aggregate(&calls, BlockTag::Number(block)).await?;
        for (synchronizer, span) in stale.iter().zip(spans) {
            match synchronizer.curve().decode_state(&answer.results[span]) {
                Ok(state) => {
                    synchronizer.set_state(state, answer.block_number);
                    report.refreshed += 1;
                }
                Err(e) => {
                    warn!("Block {}: venue {} not refreshed: {}", block, synchronizer.identity(), e);
                    report.failed += 1;
                }
            }
        }

        info!("Block {}: catch-up refreshed {} venues, {} already fresh", block, report.refreshed, report.fresh);
        Ok(report)
    }

    /// Routes all of a block's logs to the venues subscribed to their
    /// addresses. Venues without logs in `block` are marked synced through it.
    /// A failing venue is left stale and does not affect the others.
    pub async fn handle_logs(&self, block: u64, logs: &[LogEntry]) -> LogReport {
        let mut by_venue: HashMap<Address, Vec<LogEntry>> = HashMap::new();
        for log in logs.iter().filter(|log| log.block_number == block) {
            by_venue.entry(log.address).or_default().push(log.clone());
        }

        let synchronizers: Vec<Arc<Synchronizer>> = self.synchronizers.iter().map(|entry| entry.value().clone()).collect();
        let mut report = LogReport::default();
        for synchronizer in synchronizers {
            let venue_logs = by_venue.remove(&synchronizer.identity().address).unwrap_or_default();
            match synchronizer.apply_logs(block, &venue_logs).await {
                Ok(Some(_)) => report.updated += 1,
                Ok(None) => {}
                Err(e) => {
                    warn!("Block {}: venue {} left stale: {}", block, synchronizer.identity(), e);
                    report.failed += 1;
                }
            }
        }
        report
    }

    /// Forgets every snapshot above `block`.
    pub fn handle_reorg(&self, block: u64) -> usize {
        let dropped: usize = self.synchronizers.iter().map(|entry| entry.value().rollback_to(block)).sum();
        if dropped > 0 {
            warn!("Reorg to block {}: dropped {} snapshots", block, dropped);
        }
        dropped
    }

    /// Zero or one identifier, identifiers do not depend on the block.
    pub async fn get_pool_identifiers(&self, token_a: Address, token_b: Address, _block: u64) -> Result<Vec<String>, SyncError> {
        Ok(self.resolve_identity(token_a, token_b).await?.map(|venue| self.identifier(&venue)).into_iter().collect())
    }

    /// Quotes every amount against one state valid at `block`, read from the
    /// chain only when the cached snapshots do not cover it. `None` when there
    /// is no route or `limit_to_venues` excludes the venue.
    pub async fn get_prices_volume(
        &self,
        from: Address,
        to: Address,
        amounts: &[U256],
        side: SwapSide,
        block: u64,
        limit_to_venues: Option<&[String]>,
    ) -> Result<Option<VenuePrices>, SyncError> {
        if from == to {
            return Ok(None);
        }
        let Some(venue) = self.resolve_identity(from, to).await? else {
            return Ok(None);
        };

        let identifier = self.identifier(&venue);
        if let Some(allowed) = limit_to_venues {
            if !allowed.iter().any(|candidate| candidate.eq_ignore_ascii_case(&identifier)) {
                return Ok(None);
            }
        }

        let synchronizer = self.synchronizer(venue);
        let state = synchronizer.ensure_state(block).await?;
        if state.is_degenerate() {
            debug!("Block {}: venue {} has no liquidity", block, venue);
            return Ok(None);
        }

        let now = (self.clock)();
        let from_is_token0 = venue.is_token0(from);
        let curve = synchronizer.curve();
        let prices = amounts
            .iter()
            .map(|amount| {
                let quote = match side {
                    SwapSide::Sell => curve.quote_given_input(&state, *amount, from_is_token0, now),
                    SwapSide::Buy => curve.quote_given_output(&state, *amount, !from_is_token0, now),
                };
                quote.unwrap_or(U256::ZERO)
            })
            .collect();

        Ok(Some(VenuePrices { identifier, venue: venue.address, prices, gas_cost: self.swap_gas_cost }))
    }

    /// Best-effort ranking from the liquidity cache.
    pub async fn get_top_venues_for_token(&self, token: Address, limit: usize) -> Vec<VenueLiquidity> {
        self.liquidity.top_venues(token, limit).await
    }
}

pub struct VenueRegistryBuilder {
    reader: Arc<dyn RemoteReader>,
    config: SyncConfig,
    liquidity_source: Arc<dyn LiquiditySource>,
    clock: fn() -> u64,
}

impl VenueRegistryBuilder {
    pub fn new(reader: Arc<dyn RemoteReader>) -> Self {
        Self { reader, config: SyncConfig::default(), liquidity_source: Arc::new(EmptyLiquiditySource), clock: unix_now }
    }

    pub fn with_config(mut self, config: SyncConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_liquidity_source(mut self, source: Arc<dyn LiquiditySource>) -> Self {
        self.liquidity_source = source;
        self
    }

    /// Seconds since the epoch used for price averages.
    pub fn with_clock(mut self, clock: fn() -> u64) -> Self {
        self.clock = clock;
        self
    }

    pub fn build(self) -> eyre::Result<VenueRegistry> {
        let multicall = self.config.multicall()?;
        let factory = self.config.factory()?;
        let aggregator = Arc::new(Aggregator::new(self.reader, multicall, self.config.max_calls_per_batch));
        let liquidity = LiquidityCache::new(self.liquidity_source, self.config.liquidity_cache_ttl());

        Ok(VenueRegistry {
            aggregator,
            factory,
            curve: CurveKind::FictiveReserve,
            venue_key: self.config.venue_key,
            swap_gas_cost: self.config.swap_gas_cost,
            max_snapshots: self.config.max_snapshots_per_venue,
            identities: DashMap::with_hasher(RandomState::new()),
            synchronizers: DashMap::with_hasher(RandomState::new()),
            liquidity,
            clock: self.clock,
        })
    }
}
