use crate::data_sync::multicall::BatchedCall;
use crate::logic::pools::VenueState;
use crate::sync_error::SyncError;
use alloy_primitives::{Address, Bytes, U256};
use alloy_sol_types::{SolCall, sol};

sol! {
    /// Multicall3, only the reverting `aggregate` entry point is used.
    contract Multicall3 {
        struct Call {
            address target;
            bytes callData;
        }

        function aggregate(Call[] calldata calls) public payable returns (uint256 blockNumber, bytes[] memory returnData);
    }

    /// Fictive-reserve pair
    interface ISmardexPair {
        event Sync(
            uint256 reserve0,
            uint256 reserve1,
            uint256 fictiveReserve0,
            uint256 fictiveReserve1,
            uint256 priceAverage0,
            uint256 priceAverage1
        );
        event FeesChanged(uint256 feesLP, uint256 feesPool);

        function token0() external view returns (address);
        function token1() external view returns (address);
        function getReserves() external view returns (uint256 reserve0_, uint256 reserve1_);
        function getFictiveReserves() external view returns (uint256 fictiveReserve0_, uint256 fictiveReserve1_);
        function getPriceAverage() external view returns (uint256 priceAverage0_, uint256 priceAverage1_, uint256 priceAverageLastTimestamp_);
        function getPairFees() external view returns (uint128 feesLP_, uint128 feesPool_);
    }

    /// Pair discovery
    interface ISmardexFactory {
        function getPair(address tokenA, address tokenB) external view returns (address pair);
    }
}

/// Reads needed for a full state, see [`decode_state`].
pub const STATE_CALLS_PER_VENUE: usize = 4;

/// Reads refetched alongside a reserve sync, see [`decode_price_and_fees`].
pub const PRICE_AND_FEE_CALLS_PER_VENUE: usize = 2;

/// Price average and fee reads. A `Sync` event carries the averages but not
/// their timestamp, and no event carries the fees reliably.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PriceAndFees {
    pub price_average0: U256,
    pub price_average1: U256,
    pub price_average_last_timestamp: U256,
    pub fees_lp: U256,
    pub fees_pool: U256,
}

pub fn state_calls(pair: Address) -> Vec<BatchedCall> {
    vec![
        BatchedCall::new(pair, &ISmardexPair::getReservesCall {}),
        BatchedCall::new(pair, &ISmardexPair::getFictiveReservesCall {}),
        BatchedCall::new(pair, &ISmardexPair::getPriceAverageCall {}),
        BatchedCall::new(pair, &ISmardexPair::getPairFeesCall {}),
    ]
}

pub fn decode_state(results: &[Bytes]) -> Result<VenueState, SyncError> {
    if results.len() != STATE_CALLS_PER_VENUE {
        return Err(SyncError::ResultCountMismatch { expected: STATE_CALLS_PER_VENUE, got: results.len() });
    }

    let reserves = ISmardexPair::getReservesCall::abi_decode_returns(&results[0])?;
    let fictive = ISmardexPair::getFictiveReservesCall::abi_decode_returns(&results[1])?;
    let price_and_fees = decode_price_and_fees(&results[2..])?;

    Ok(VenueState {
        reserve0: reserves.reserve0_,
        reserve1: reserves.reserve1_,
        fictive_reserve0: fictive.fictiveReserve0_,
        fictive_reserve1: fictive.fictiveReserve1_,
        price_average0: price_and_fees.price_average0,
        price_average1: price_and_fees.price_average1,
        price_average_last_timestamp: price_and_fees.price_average_last_timestamp,
        fees_lp: price_and_fees.fees_lp,
        fees_pool: price_and_fees.fees_pool,
    })
}

pub fn price_and_fee_calls(pair: Address) -> Vec<BatchedCall> {
    vec![
        BatchedCall::new(pair, &ISmardexPair::getPriceAverageCall {}),
        BatchedCall::new(pair, &ISmardexPair::getPairFeesCall {}),
    ]
}

pub fn decode_price_and_fees(results: &[Bytes]) -> Result<PriceAndFees, SyncError> {
    if results.len() != PRICE_AND_FEE_CALLS_PER_VENUE {
        return Err(SyncError::ResultCountMismatch { expected: PRICE_AND_FEE_CALLS_PER_VENUE, got: results.len() });
    }

    let average = ISmardexPair::getPriceAverageCall::abi_decode_returns(&results[0])?;
    let fees = ISmardexPair::getPairFeesCall::abi_decode_returns(&results[1])?;

    Ok(PriceAndFees {
        price_average0: average.priceAverage0_,
        price_average1: average.priceAverage1_,
        price_average_last_timestamp: average.priceAverageLastTimestamp_,
        fees_lp: U256::from(fees.feesLP_),
        fees_pool: U256::from(fees.feesPool_),
    })
}

pub fn get_pair_call(factory: Address, token_a: Address, token_b: Address) -> BatchedCall {
    BatchedCall::new(factory, &ISmardexFactory::getPairCall { tokenA: token_a, tokenB: token_b })
}

/// Zero address means the factory knows no pair.
pub fn decode_pair_address(result: &Bytes) -> Result<Option<Address>, SyncError> {
    let pair = ISmardexFactory::getPairCall::abi_decode_returns(result)?;
    Ok((!pair.is_zero()).then_some(pair))
}

/// `value * 10^decimals`, for turning human amounts into raw token units.
pub fn to_raw_units(value: u64, decimals: u8) -> Result<U256, SyncError> {
    U256::from(10u64)
        .checked_pow(U256::from(decimals))
        .and_then(|unit| unit.checked_mul(U256::from(value)))
        .ok_or_else(|| SyncError::OutOfRange(format!("{} with {} decimals", value, decimals)))
}
