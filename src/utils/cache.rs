use crate::logic::types::VenueLiquidity;
use ahash::RandomState;
use alloy_primitives::Address;
use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Cached value with its insertion time.
#[derive(Clone, Debug)]
pub struct CacheItem<T> {
    pub data: T,
    pub timestamp: Instant,
    pub ttl: Duration,
}

impl<T> CacheItem<T> {
    pub fn new(data: T, ttl: Duration) -> Self {
        Self { data, timestamp: Instant::now(), ttl }
    }

    pub fn is_expired(&self) -> bool {
        self.timestamp.elapsed() > self.ttl
    }
}

#[derive(Debug, Default)]
pub struct CacheStats {
    pub hits: AtomicU64,
    pub misses: AtomicU64,
    pub evictions: AtomicU64,
}

impl CacheStats {
    pub fn hit_rate(&self) -> f64 {
        let hits = self.hits.load(Ordering::Relaxed);
        let misses = self.misses.load(Ordering::Relaxed);
        let total = hits + misses;
        if total == 0 { 0.0 } else { hits as f64 / total as f64 }
    }
}

/// Off-chain liquidity figures used for ranking venues.
#[async_trait]
pub trait LiquiditySource: Send + Sync {
    async fn venues_for_token(&self, token: Address) -> eyre::Result<Vec<VenueLiquidity>>;
}

/// Source that knows no venues.
#[derive(Debug, Default, Clone, Copy)]
pub struct EmptyLiquiditySource;

#[async_trait]
impl LiquiditySource for EmptyLiquiditySource {
    async fn venues_for_token(&self, _token: Address) -> eyre::Result<Vec<VenueLiquidity>> {
        Ok(Vec::new())
    }
}

/// TTL cache of per-token venue rankings. Best effort, never used for pricing.
pub struct LiquidityCache {
    entries: DashMap<Address, CacheItem<Vec<VenueLiquidity>>, RandomState>,
    source: Arc<dyn LiquiditySource>,
    pub stats: CacheStats,
    default_ttl: Duration,
}

impl LiquidityCache {
    pub fn new(source: Arc<dyn LiquiditySource>, default_ttl: Duration) -> Self {
        Self { entries: DashMap::with_hasher(RandomState::new()), source, stats: CacheStats::default(), default_ttl }
    }

    /// Venues trading `token`, highest liquidity first. Source failures yield an empty ranking.
    pub async fn top_venues(&self, token: Address, limit: usize) -> Vec<VenueLiquidity> {
        if let Some(mut venues) = self.get(token) {
            venues.truncate(limit);
            return venues;
        }

        match self.source.venues_for_token(token).await {
            Ok(venues) => {
                let mut venues = self.set(token, venues);
                debug!("Liquidity ranking for {:?} refreshed, {} venues", token, venues.len());
                venues.truncate(limit);
                venues
            }
            Err(e) => {
                warn!("Liquidity source failed for {:?}: {}", token, e);
                Vec::new()
            }
        }
    }

    pub fn get(&self, token: Address) -> Option<Vec<VenueLiquidity>> {
        if let Some(item) = self.entries.get(&token) {
            if !item.is_expired() {
                self.stats.hits.fetch_add(1, Ordering::Relaxed);
                return Some(item.data.clone());
            }
        }
        if self.entries.remove_if(&token, |_, item| item.is_expired()).is_some() {
            self.stats.evictions.fetch_add(1, Ordering::Relaxed);
        }
        self.stats.misses.fetch_add(1, Ordering::Relaxed);
        None
    }

    /// Stores the ranking sorted by liquidity and returns the sorted copy.
    pub fn set(&self, token: Address, mut venues: Vec<VenueLiquidity>) -> Vec<VenueLiquidity> {
        venues.sort_by(|a, b| b.liquidity_usd.total_cmp(&a.liquidity_usd));
        self.entries.insert(token, CacheItem::new(venues.clone(), self.default_ttl));
        venues
    }

    pub fn cleanup_expired(&self) {
        let now = Instant::now();
        self.entries.retain(|_, item| {
            let expired = now.duration_since(item.timestamp) > item.ttl;
            if expired {
                self.stats.evictions.fetch_add(1, Ordering::Relaxed);
            }
            !expired
        });
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&self) {
        self.entries.clear();
    }
}
