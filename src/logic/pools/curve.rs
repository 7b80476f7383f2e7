use crate::data_sync::codec;
use crate::data_sync::logs::LogEntry;
use crate::data_sync::multicall::{Aggregator, BatchedCall};
use crate::data_sync::transport::BlockTag;
use crate::logic::pools::fictive_pool;
use crate::logic::pools::venue::{VenueIdentity, VenueState};
use crate::sync_error::SyncError;
use alloy_primitives::{Bytes, U256};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumIter, EnumString, VariantNames};

/// What every curve family has to provide to be synchronized and priced.
#[async_trait]
pub trait VenueCurve: Send + Sync {
    fn quote_given_input(&self, state: &VenueState, amount_in: U256, input_is_token0: bool, now: u64) -> Option<U256>;

    fn quote_given_output(&self, state: &VenueState, amount_out: U256, output_is_token0: bool, now: u64) -> Option<U256>;

    /// Reads making up a full state, so many venues can share one aggregate request.
    fn state_calls(&self, venue: &VenueIdentity) -> Vec<BatchedCall>;

    fn decode_state(&self, results: &[Bytes]) -> Result<VenueState, SyncError>;

    async fn generate_state(
        &self,
        aggregator: &Aggregator,
        venue: &VenueIdentity,
        block: BlockTag,
    ) -> Result<(u64, VenueState), SyncError>;

    async fn process_log(&self, aggregator: &Aggregator, prior: &VenueState, log: &LogEntry) -> Result<Option<VenueState>, SyncError>;
}

#[derive(Copy, Clone, Debug, Display, PartialEq, Eq, Hash, EnumString, VariantNames, EnumIter, Default, Serialize, Deserialize)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CurveKind {
    /// Real plus fictive reserves with a time-weighted price average.
    #[default]
    FictiveReserve,
}

#[async_trait]
impl VenueCurve for CurveKind {
    fn quote_given_input(&self, state: &VenueState, amount_in: U256, input_is_token0: bool, now: u64) -> Option<U256> {
        match self {
            CurveKind::FictiveReserve => fictive_pool::quote_given_input(state, amount_in, input_is_token0, now),
        }
    }

    fn quote_given_output(&self, state: &VenueState, amount_out: U256, output_is_token0: bool, now: u64) -> Option<U256> {
        match self {
            CurveKind::FictiveReserve => fictive_pool::quote_given_output(state, amount_out, output_is_token0, now),
        }
    }

    fn state_calls(&self, venue: &VenueIdentity) -> Vec<BatchedCall> {
        match self {
            CurveKind::FictiveReserve => codec::state_calls(venue.address),
        }
    }

    fn decode_state(&self, results: &[Bytes]) -> Result<VenueState, SyncError> {
        match self {
            CurveKind::FictiveReserve => codec::decode_state(results),
        }
    }

    async fn generate_state(
        &self,
        aggregator: &Aggregator,
        venue: &VenueIdentity,
        block: BlockTag,
    ) -> Result<(u64, VenueState), SyncError> {
        match self {
            CurveKind::FictiveReserve => fictive_pool::fetch_state(aggregator, venue, block).await,
        }
    }

    async fn process_log(&self, aggregator: &Aggregator, prior: &VenueState, log: &LogEntry) -> Result<Option<VenueState>, SyncError> {
        match self {
            CurveKind::FictiveReserve => fictive_pool::apply_event(aggregator, prior, log).await,
        }
    }
}
