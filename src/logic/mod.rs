/// Logic Layer
///
/// Pricing over venue snapshots and the registry owning venue discovery and
/// synchronizer lifecycle.

pub mod pools;
pub mod registry;
pub mod types;

pub use pools::{CurveKind, SwapOutcome, SwapParams, VenueCurve, VenueIdentity, VenueState, sort_tokens};
pub use registry::{CatchUpReport, LogReport, VenueRegistry, VenueRegistryBuilder, unix_now};
pub use types::{SwapSide, VenueLiquidity, VenuePrices};
