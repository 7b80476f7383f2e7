use crate::data_sync::codec::{self, ISmardexPair};
use crate::data_sync::logs::{EventKind, LogEntry};
use crate::data_sync::multicall::Aggregator;
use crate::data_sync::transport::BlockTag;
use crate::logic::pools::fictive_math::{SwapParams, get_amount_in, get_amount_out};
use crate::logic::pools::venue::{VenueIdentity, VenueState};
use crate::sync_error::SyncError;
use alloy_primitives::U256;

pub fn quote_given_input(state: &VenueState, amount_in: U256, input_is_token0: bool, now: u64) -> Option<U256> {
    if amount_in.is_zero() {
        return Some(U256::ZERO);
    }
    if state.is_degenerate() {
        return None;
    }
    let params = SwapParams::from_state(state, amount_in, input_is_token0);
    get_amount_out(&params, state.price_average_last_timestamp, U256::from(now)).map(|outcome| outcome.amount)
}

pub fn quote_given_output(state: &VenueState, amount_out: U256, output_is_token0: bool, now: u64) -> Option<U256> {
    if amount_out.is_zero() {
        return Some(U256::ZERO);
    }
    if state.is_degenerate() {
        return None;
    }
    let params = SwapParams::from_state(state, amount_out, !output_is_token0);
    get_amount_in(&params, state.price_average_last_timestamp, U256::from(now)).map(|outcome| outcome.amount)
}

/// Full read of every state field in one aggregate request.
pub async fn fetch_state(aggregator: &Aggregator, venue: &VenueIdentity, block: BlockTag) -> Result<(u64, VenueState), SyncError> {
    let answer = aggregator.aggregate(&codec::state_calls(venue.address), block).await?;
    let state = codec::decode_state(&answer.results)?;
    Ok((answer.block_number, state))
}

/// State after `log`, or `None` for events this venue does not track.
///
/// A `Sync` carries reserves, fictive reserves and price averages. The price
/// average timestamp and the fees are refetched at the log's block. A
/// `FeesChanged` patches the fees on top of `prior`.
pub async fn apply_event(aggregator: &Aggregator, prior: &VenueState, log: &LogEntry) -> Result<Option<VenueState>, SyncError> {
    let Some(kind) = EventKind::from_log(log) else {
        return Ok(None);
    };

    match kind {
        EventKind::Sync => {
            let event: ISmardexPair::Sync = log.decode()?;
            let answer =
                aggregator.aggregate(&codec::price_and_fee_calls(log.address), BlockTag::Number(log.block_number)).await?;
            let refreshed = codec::decode_price_and_fees(&answer.results)?;

            Ok(Some(VenueState {
                reserve0: event.reserve0,
                reserve1: event.reserve1,
                fictive_reserve0: event.fictiveReserve0,
                fictive_reserve1: event.fictiveReserve1,
                price_average0: event.priceAverage0,
                price_average1: event.priceAverage1,
                price_average_last_timestamp: refreshed.price_average_last_timestamp,
                fees_lp: refreshed.fees_lp,
                fees_pool: refreshed.fees_pool,
            }))
        }
        EventKind::FeesChanged => {
            let event: ISmardexPair::FeesChanged = log.decode()?;
            Ok(Some(prior.with_fees(event.feesLP, event.feesPool)))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state() -> VenueState {
        VenueState {
            reserve0: U256::from(1_000_000_000u64),
            reserve1: U256::from(2_000_000_000u64),
            fictive_reserve0: U256::from(1_000_000_000u64),
            fictive_reserve1: U256::from(2_000_000_000u64),
            price_average0: U256::from(1_000_000_000u64),
            price_average1: U256::from(2_000_000_000u64),
            price_average_last_timestamp: U256::from(100),
            fees_lp: U256::ZERO,
            fees_pool: U256::ZERO,
        }
    }

    #[test]
    fn test_zero_amount_skips_curve() {
        assert_eq!(quote_given_input(&state(), U256::ZERO, true, 100), Some(U256::ZERO));
        assert_eq!(quote_given_output(&state(), U256::ZERO, false, 100), Some(U256::ZERO));
        // even on a degenerate state
        assert_eq!(quote_given_input(&VenueState::default(), U256::ZERO, true, 100), Some(U256::ZERO));
    }

    #[test]
    fn test_degenerate_state_has_no_route() {
        assert_eq!(quote_given_input(&VenueState::default(), U256::from(1), true, 100), None);
        assert_eq!(quote_given_output(&VenueState::default(), U256::from(1), true, 100), None);
    }

    #[test]
    fn test_quote_directions() {
        let sell = quote_given_input(&state(), U256::from(100_000_000u64), true, 100).unwrap();
        assert_eq!(sell, U256::from(166_666_666u64));

        // buying token1 with token0 is the same trade direction
        let buy = quote_given_output(&state(), sell, false, 100).unwrap();
        assert_eq!(buy, U256::from(100_000_000u64));
    }
}
