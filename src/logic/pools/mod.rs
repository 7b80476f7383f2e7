pub mod curve;
pub mod fictive_math;
pub mod fictive_pool;
pub mod venue;

pub use curve::{CurveKind, VenueCurve};
pub use fictive_math::{SwapOutcome, SwapParams};
pub use venue::{VenueIdentity, VenueState, sort_tokens};
