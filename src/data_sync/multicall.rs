use crate::data_sync::codec::Multicall3;
use crate::data_sync::transport::{BlockTag, RemoteReader};
use crate::sync_error::SyncError;
use alloy_primitives::{Address, Bytes};
use alloy_sol_types::SolCall;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;
use tracing::{debug, warn};

/// One read inside an aggregate request. Position is the only correlation key.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BatchedCall {
    pub target: Address,
    pub call_data: Bytes,
}

impl BatchedCall {
    pub fn new<C: SolCall>(target: Address, call: &C) -> Self {
        Self { target, call_data: call.abi_encode().into() }
    }
}

impl From<&BatchedCall> for Multicall3::Call {
    fn from(call: &BatchedCall) -> Self {
        Multicall3::Call { target: call.target, callData: call.call_data.clone() }
    }
}

/// Raw return data, in call order, read at `block_number`.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AggregateResult {
    pub block_number: u64,
    pub results: Vec<Bytes>,
}

#[derive(Debug, Default)]
pub struct AggregatorStats {
    pub round_trips: AtomicU64,
    pub calls: AtomicU64,
    pub failures: AtomicU64,
}

impl AggregatorStats {
    pub fn round_trips(&self) -> u64 {
        self.round_trips.load(Ordering::Relaxed)
    }

    pub fn calls(&self) -> u64 {
        self.calls.load(Ordering::Relaxed)
    }

    pub fn failures(&self) -> u64 {
        self.failures.load(Ordering::Relaxed)
    }
}

/// Collapses many reads into Multicall3 `aggregate` round trips pinned to one block.
///
/// `aggregate` reverts as a whole when any inner call reverts, so a request
/// either yields every result or fails.
pub struct Aggregator {
    reader: Arc<dyn RemoteReader>,
    multicall_address: Address,
    max_calls_per_batch: usize,
    stats: AggregatorStats,
}

impl Aggregator {
    pub fn new(reader: Arc<dyn RemoteReader>, multicall_address: Address, max_calls_per_batch: usize) -> Self {
        Self { reader, multicall_address, max_calls_per_batch: max_calls_per_batch.max(1), stats: AggregatorStats::default() }
    }

    pub fn stats(&self) -> &AggregatorStats {
        &self.stats
    }

    pub fn multicall_address(&self) -> Address {
        self.multicall_address
    }

    /// Results come back in request order. Requests larger than one batch are
    /// split, every chunk after the first is pinned to the block the first one
    /// was answered at. Empty input returns without a round trip, reporting the
    /// requested block or 0 for `Latest`.
    pub async fn aggregate(&self, calls: &[BatchedCall], block: BlockTag) -> Result<AggregateResult, SyncError> {
        if calls.is_empty() {
            return Ok(AggregateResult { block_number: block.number().unwrap_or_default(), results: Vec::new() });
        }

        let start_time = Instant::now();
        let mut pinned = block;
        let mut block_number = block.number();
        let mut results = Vec::with_capacity(calls.len());

        for (batch_idx, chunk) in calls.chunks(self.max_calls_per_batch).enumerate() {
            let (answered_at, chunk_results) = match self.aggregate_chunk(chunk, pinned).await {
                Ok(answer) => answer,
                Err(e) => {
                    self.stats.failures.fetch_add(1, Ordering::Relaxed);
                    warn!("Block {}: aggregate batch {} ({} calls) failed: {}", pinned, batch_idx + 1, chunk.len(), e);
                    return Err(e);
                }
            };

            if let Some(expected) = block_number {
                if expected != answered_at {
                    self.stats.failures.fetch_add(1, Ordering::Relaxed);
                    return Err(SyncError::BlockMismatch { expected, got: answered_at });
                }
            }
            block_number = Some(answered_at);
            pinned = BlockTag::Number(answered_at);
            results.extend(chunk_results);
        }

        let block_number = block_number.unwrap_or_default();
        debug!("Block {}: aggregated {} calls in {:?}", block_number, calls.len(), start_time.elapsed());

        Ok(AggregateResult { block_number, results })
    }

    async fn aggregate_chunk(&self, chunk: &[BatchedCall], block: BlockTag) -> Result<(u64, Vec<Bytes>), SyncError> {
        let calls: Vec<Multicall3::Call> = chunk.iter().map(Multicall3::Call::from).collect();
        let multicall_data = Multicall3::aggregateCall { calls }.abi_encode();

        self.stats.round_trips.fetch_add(1, Ordering::Relaxed);
        self.stats.calls.fetch_add(chunk.len() as u64, Ordering::Relaxed);

        let response = self.reader.call(self.multicall_address, multicall_data.into(), block).await?;
        let decoded = Multicall3::aggregateCall::abi_decode_returns(&response)?;

        if decoded.returnData.len() != chunk.len() {
            return Err(SyncError::ResultCountMismatch { expected: chunk.len(), got: decoded.returnData.len() });
        }

        let block_number =
            u64::try_from(decoded.blockNumber).map_err(|_| SyncError::OutOfRange(format!("block number {}", decoded.blockNumber)))?;

        Ok((block_number, decoded.returnData))
    }
}
