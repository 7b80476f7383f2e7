/// Data Synchronization Layer
///
/// Keeps a block-indexed local mirror of venue state:
///
/// - Multicall3 based batched reads pinned to one block
/// - Contract ABI and payload decoding
/// - Per-venue synchronizers applying logs on top of bootstrapped snapshots
///
/// Reads go through the `RemoteReader` trait so any transport can be plugged in.

pub mod codec;
pub mod config;
pub mod logs;
pub mod multicall;
pub mod synchronizer;
pub mod transport;

#[cfg(test)]
pub(crate) mod mock_chain;

// Tests
#[cfg(test)]
mod tests;

pub use config::SyncConfig;
pub use logs::{EventKind, LogEntry};
pub use multicall::{AggregateResult, Aggregator, AggregatorStats, BatchedCall};
pub use synchronizer::{SyncPhase, SyncedRange, Synchronizer};
pub use transport::{BlockTag, HttpTransport, RemoteReader};
