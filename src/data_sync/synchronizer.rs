use crate::data_sync::logs::{EventKind, LogEntry};
use crate::data_sync::multicall::Aggregator;
use crate::data_sync::transport::BlockTag;
use crate::logic::pools::{CurveKind, VenueCurve, VenueIdentity, VenueState};
use crate::sync_error::SyncError;
use ahash::RandomState;
use alloy_primitives::Address;
use dashmap::DashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, PoisonError, RwLock};
use strum_macros::Display;
use tracing::{debug, error};

#[derive(Copy, Clone, Debug, Display, PartialEq, Eq)]
pub enum SyncPhase {
    Unsubscribed,
    Bootstrapping,
    Live,
}

/// Contiguous run of blocks whose logs have all been applied. Any block in
/// the run is priced from the newest snapshot at or before it.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct SyncedRange {
    pub from: u64,
    pub through: u64,
}

impl SyncedRange {
    pub fn contains(&self, block: u64) -> bool {
        self.from <= block && block <= self.through
    }
}

/// Block-indexed mirror of one venue's state.
///
/// Snapshots are written last-write-wins. Two writers racing on the same block
/// both derived their value from reads at that block, so no lock is held
/// across a fetch. Only the newest `max_snapshots` blocks are retained.
///
/// Every stored snapshot is exact for its block. Blocks without a snapshot are
/// served from an earlier one only inside the synced range.
pub struct Synchronizer {
    identity: VenueIdentity,
    curve: CurveKind,
    aggregator: Arc<Aggregator>,
    snapshots: DashMap<u64, VenueState, RandomState>,
    synced: RwLock<Option<SyncedRange>>,
    bootstrapping: AtomicBool,
    max_snapshots: usize,
}

impl Synchronizer {
    pub fn new(identity: VenueIdentity, curve: CurveKind, aggregator: Arc<Aggregator>, max_snapshots: usize) -> Self {
        Self {
            identity,
            curve,
            aggregator,
            snapshots: DashMap::with_hasher(RandomState::new()),
            synced: RwLock::new(None),
            bootstrapping: AtomicBool::new(false),
            max_snapshots: max_snapshots.max(1),
        }
    }

    pub fn identity(&self) -> &VenueIdentity {
        &self.identity
    }

    pub fn curve(&self) -> CurveKind {
        self.curve
    }

    /// Addresses whose logs this venue reacts to.
    pub fn subscriptions(&self) -> Vec<Address> {
        vec![self.identity.address]
    }

    pub fn is_subscribed(&self, address: Address) -> bool {
        self.identity.address == address
    }

    pub fn phase(&self) -> SyncPhase {
        if !self.snapshots.is_empty() {
            SyncPhase::Live
        } else if self.bootstrapping.load(Ordering::Acquire) {
            SyncPhase::Bootstrapping
        } else {
            SyncPhase::Unsubscribed
        }
    }

    pub fn is_live(&self) -> bool {
        self.phase() == SyncPhase::Live
    }

    /// Reads the full state at `block`. Does not touch the snapshot map.
    pub async fn generate_state(&self, block: BlockTag) -> Result<(u64, VenueState), SyncError> {
        self.curve.generate_state(&self.aggregator, &self.identity, block).await
    }

    /// State after applying `log` on top of `prior`. `None` for logs from other
    /// addresses or with topics this venue does not track.
    pub async fn process_log(&self, prior: &VenueState, log: &LogEntry) -> Result<Option<VenueState>, SyncError> {
        if !self.is_subscribed(log.address) {
            return Ok(None);
        }
        self.curve.process_log(&self.aggregator, prior, log).await
    }

    pub fn get_state(&self, block: u64) -> Option<VenueState> {
        self.snapshots.get(&block).map(|entry| entry.value().clone())
    }

    /// Stores an exact snapshot and extends the synced range with `block`.
    pub fn set_state(&self, state: VenueState, block: u64) {
        self.snapshots.insert(block, state);
        self.evict_oldest();
        self.mark_synced(block);
    }

    pub fn synced_range(&self) -> Option<SyncedRange> {
        *self.synced.read().unwrap_or_else(PoisonError::into_inner)
    }

    /// State valid at `block` without any remote read: the snapshot at
    /// `block`, or the newest earlier one when no logs were missed since.
    pub fn cached_state(&self, block: u64) -> Option<VenueState> {
        if let Some(state) = self.get_state(block) {
            return Some(state);
        }
        let range = self.synced_range().filter(|range| range.contains(block))?;
        self.state_at_or_before(block).filter(|(height, _)| *height >= range.from).map(|(_, state)| state)
    }

    pub fn latest_state(&self) -> Option<(u64, VenueState)> {
        self.snapshots.iter().max_by_key(|entry| *entry.key()).map(|entry| (*entry.key(), entry.value().clone()))
    }

    /// Newest snapshot not after `block`.
    pub fn state_at_or_before(&self, block: u64) -> Option<(u64, VenueState)> {
        self.snapshots
            .iter()
            .filter(|entry| *entry.key() <= block)
            .max_by_key(|entry| *entry.key())
            .map(|entry| (*entry.key(), entry.value().clone()))
    }

    pub fn snapshot_count(&self) -> usize {
        self.snapshots.len()
    }

    /// State at `block`, bootstrapping and storing it when not cached.
    pub async fn ensure_state(&self, block: u64) -> Result<VenueState, SyncError> {
        if let Some(state) = self.cached_state(block) {
            return Ok(state);
        }

        self.bootstrapping.store(true, Ordering::Release);
        let generated = self.generate_state(BlockTag::Number(block)).await;
        self.bootstrapping.store(false, Ordering::Release);

        let (block_number, state) = generated?;
        debug!("Block {}: bootstrapped venue {}", block_number, self.identity);
        self.set_state(state.clone(), block_number);
        Ok(state)
    }

    /// Applies this venue's logs of `block`, in order, on top of the state at
    /// `block - 1` and stores the result under `block`. An empty `logs` still
    /// marks `block` as synced when the previous block was.
    ///
    /// When `block - 1` is not synced only a `Sync` event yields an exact
    /// state, anything else is dropped. A fee patch without any prior state
    /// is dropped on its own and the remaining logs still apply.
    pub async fn apply_logs(&self, block: u64, logs: &[LogEntry]) -> Result<Option<VenueState>, SyncError> {
        let previous = block.checked_sub(1);
        let contiguous = previous.is_some_and(|previous| self.synced_range().is_some_and(|range| range.contains(previous)));
        let mut current = previous.and_then(|previous| self.state_at_or_before(previous)).map(|(_, state)| state);
        let mut changed = false;
        let mut reset = false;

        for log in logs.iter().filter(|log| log.block_number == block && self.is_subscribed(log.address)) {
            let Some(kind) = EventKind::from_log(log) else {
                continue;
            };

            let prior = match (&current, kind.is_self_sufficient()) {
                (Some(state), _) => state.clone(),
                (None, true) => VenueState::default(),
                (None, false) => {
                    error!("Block {}: {} event for venue {} without a prior state, update dropped", block, kind, self.identity);
                    continue;
                }
            };

            if let Some(next) = self.process_log(&prior, log).await? {
                current = Some(next);
                changed = true;
                reset |= kind.is_self_sufficient();
            }
        }

        match current {
            Some(state) if changed && (contiguous || reset) => {
                self.set_state(state.clone(), block);
                Ok(Some(state))
            }
            _ if changed => {
                debug!("Block {}: venue {} missed earlier logs, update dropped", block, self.identity);
                Ok(None)
            }
            _ => {
                if contiguous {
                    self.mark_synced(block);
                }
                Ok(None)
            }
        }
    }

    /// Drops snapshots above `block`, returns how many were removed.
    pub fn rollback_to(&self, block: u64) -> usize {
        let before = self.snapshots.len();
        self.snapshots.retain(|height, _| *height <= block);

        let mut synced = self.synced.write().unwrap_or_else(PoisonError::into_inner);
        *synced = match *synced {
            Some(range) if range.from <= block => Some(SyncedRange { from: range.from, through: range.through.min(block) }),
            _ => None,
        };
        before - self.snapshots.len()
    }

    fn mark_synced(&self, block: u64) {
        let mut synced = self.synced.write().unwrap_or_else(PoisonError::into_inner);
        *synced = match *synced {
            Some(range) if range.from <= block && block <= range.through.saturating_add(1) => {
                Some(SyncedRange { from: range.from, through: range.through.max(block) })
            }
            // historical snapshot, the live range is unaffected
            Some(range) if block < range.from => Some(range),
            _ => Some(SyncedRange { from: block, through: block }),
        };
    }

    fn evict_oldest(&self) {
        let excess = self.snapshots.len().saturating_sub(self.max_snapshots);
        if excess == 0 {
            return;
        }

        let mut heights: Vec<u64> = self.snapshots.iter().map(|entry| *entry.key()).collect();
        heights.sort_unstable();
        for height in heights.into_iter().take(excess) {
            self.snapshots.remove(&height);
        }
    }
}
