// Two-Layer Architecture
pub mod data_sync; // Data Layer: batched reads, log application, snapshots
pub mod logic; // Logic Layer: pricing, venue registry

// Common utilities and types
pub mod constants;
pub mod sync_error;
pub mod utils;

// Re-export key components from each layer
pub use data_sync::{
    AggregateResult, Aggregator, AggregatorStats, BatchedCall, BlockTag, EventKind, HttpTransport, LogEntry, RemoteReader,
    SyncConfig, SyncPhase, SyncedRange, Synchronizer,
};
pub use logic::{
    CatchUpReport, CurveKind, LogReport, SwapOutcome, SwapParams, SwapSide, VenueCurve, VenueIdentity, VenueLiquidity,
    VenuePrices, VenueRegistry, VenueRegistryBuilder, VenueState,
};
pub use sync_error::SyncError;
pub use utils::{LiquidityCache, LiquiditySource};
