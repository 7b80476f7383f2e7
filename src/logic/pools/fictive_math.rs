//! Fictive-reserve bonding curve.
//!
//! Every function mirrors the integer arithmetic of the on-chain pair, division
//! truncating at the same points. A `None` result is what the contract would
//! revert on: overflow, underflow, division by zero or an unfillable amount.

use crate::constants::{APPROX_PRECISION, APPROX_PRECISION_BASE, FEES_BASE, MAX_BLOCK_DIFF_SECONDS};
use crate::logic::pools::venue::VenueState;
use alloy_primitives::U256;

/// One trade direction of a venue, oriented input -> output.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SwapParams {
    pub amount: U256,
    pub reserve_in: U256,
    pub reserve_out: U256,
    pub fictive_reserve_in: U256,
    pub fictive_reserve_out: U256,
    pub price_average_in: U256,
    pub price_average_out: U256,
    pub fees_lp: U256,
    pub fees_pool: U256,
}

impl SwapParams {
    pub fn from_state(state: &VenueState, amount: U256, zero_for_one: bool) -> Self {
        if zero_for_one {
            Self {
                amount,
                reserve_in: state.reserve0,
                reserve_out: state.reserve1,
                fictive_reserve_in: state.fictive_reserve0,
                fictive_reserve_out: state.fictive_reserve1,
                price_average_in: state.price_average0,
                price_average_out: state.price_average1,
                fees_lp: state.fees_lp,
                fees_pool: state.fees_pool,
            }
        } else {
            Self {
                amount,
                reserve_in: state.reserve1,
                reserve_out: state.reserve0,
                fictive_reserve_in: state.fictive_reserve1,
                fictive_reserve_out: state.fictive_reserve0,
                price_average_in: state.price_average1,
                price_average_out: state.price_average0,
                fees_lp: state.fees_lp,
                fees_pool: state.fees_pool,
            }
        }
    }

    fn with_amount(&self, amount: U256) -> Self {
        Self { amount, ..self.clone() }
    }

    fn with_reserves(&self, outcome: &SwapOutcome) -> Self {
        Self {
            reserve_in: outcome.reserve_in,
            reserve_out: outcome.reserve_out,
            fictive_reserve_in: outcome.fictive_reserve_in,
            fictive_reserve_out: outcome.fictive_reserve_out,
            ..self.clone()
        }
    }
}

/// Computed amount of a simulated swap together with the post-trade reserves.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SwapOutcome {
    pub amount: U256,
    pub reserve_in: U256,
    pub reserve_out: U256,
    pub fictive_reserve_in: U256,
    pub fictive_reserve_out: U256,
}

fn fees_base() -> U256 {
    U256::from(FEES_BASE)
}

/// Price average as the pair would see it at `now`.
pub fn updated_price_average(
    fictive_reserve_in: U256,
    fictive_reserve_out: U256,
    last_timestamp: U256,
    price_average_in: U256,
    price_average_out: U256,
    now: U256,
) -> Option<(U256, U256)> {
    if last_timestamp.is_zero() {
        return Some((fictive_reserve_in, fictive_reserve_out));
    }
    if last_timestamp == now {
        return Some((price_average_in, price_average_out));
    }

    let window = U256::from(MAX_BLOCK_DIFF_SECONDS);
    let elapsed = now.saturating_sub(last_timestamp).min(window);

    let new_average_in = fictive_reserve_in;
    let carried = (window - elapsed)
        .checked_mul(price_average_out)?
        .checked_mul(new_average_in)?
        .checked_div(price_average_in)?;
    let new_average_out = carried.checked_add(elapsed.checked_mul(fictive_reserve_out)?)?.checked_div(window)?;

    Some((new_average_in, new_average_out))
}

pub fn approx_eq(x: U256, y: U256) -> Option<bool> {
    let precision = U256::from(APPROX_PRECISION);
    let base = U256::from(APPROX_PRECISION_BASE);
    if x > y {
        Some(x < y.checked_add(y.checked_mul(precision)? / base)?)
    } else {
        Some(y < x.checked_add(x.checked_mul(precision)? / base)?)
    }
}

pub fn ratio_approx_eq(x_num: U256, x_den: U256, y_num: U256, y_den: U256) -> Option<bool> {
    approx_eq(x_num.checked_mul(y_den)?, x_den.checked_mul(y_num)?)
}

/// Re-anchors fictive reserves on the real ones. `None` when either fictive
/// reserve is zero.
pub fn compute_fictive_reserves(
    reserve_in: U256,
    reserve_out: U256,
    fictive_reserve_in: U256,
    fictive_reserve_out: U256,
) -> Option<(U256, U256)> {
    if fictive_reserve_in.is_zero() || fictive_reserve_out.is_zero() {
        return None;
    }
    let (new_in, new_out) = if reserve_out.checked_mul(fictive_reserve_in)? < reserve_in.checked_mul(fictive_reserve_out)? {
        let temp = reserve_out
            .checked_mul(reserve_out)?
            .checked_div(fictive_reserve_out)?
            .checked_mul(fictive_reserve_in)?
            .checked_div(reserve_in)?;
        let new_in = temp
            .checked_mul(fictive_reserve_in)?
            .checked_div(fictive_reserve_out)?
            .checked_add(reserve_out.checked_mul(fictive_reserve_in)?.checked_div(fictive_reserve_out)?)?;
        let new_out = reserve_out.checked_add(temp)?;
        (new_in, new_out)
    } else {
        let new_in = fictive_reserve_in
            .checked_mul(reserve_out)?
            .checked_div(fictive_reserve_out)?
            .checked_add(reserve_in)?;
        let new_out = reserve_in
            .checked_mul(fictive_reserve_out)?
            .checked_div(fictive_reserve_in)?
            .checked_add(reserve_out)?;
        (new_in, new_out)
    };

    Some((new_in / U256::from(4), new_out / U256::from(4)))
}

/// Input amount that brings the fictive price onto the price average. The rest
/// of the trade, if any, is priced after re-anchoring the fictive reserves.
pub fn first_trade_qty_in(param: &SwapParams) -> Option<U256> {
    let mut first_amount_in = param.amount;

    let toward_average = param.fictive_reserve_out.checked_mul(param.price_average_in)?
        > param.fictive_reserve_in.checked_mul(param.price_average_out)?;
    if toward_average {
        let base = fees_base();
        let two = U256::from(2);
        let without_pool = base.checked_sub(param.fees_pool)?;
        let without_fees = without_pool.checked_sub(param.fees_lp)?;

        let to_sub = param
            .fictive_reserve_in
            .checked_mul(base.checked_mul(two)?.checked_sub(param.fees_pool.checked_mul(two)?)?.checked_sub(param.fees_lp)?)?;
        let to_div = without_pool.checked_mul(two)?;
        let in_sqrt = param
            .fictive_reserve_in
            .checked_mul(param.fictive_reserve_out)?
            .checked_mul(U256::from(4))?
            .checked_div(param.price_average_out)?
            .checked_mul(param.price_average_in)?
            .checked_mul(without_fees.checked_mul(without_pool)?)?
            .checked_add(
                param
                    .fictive_reserve_in
                    .checked_mul(param.fictive_reserve_in)?
                    .checked_mul(param.fees_lp.checked_mul(param.fees_lp)?)?,
            )?;
        let compare = to_sub.checked_add(param.amount.checked_mul(to_div)?)?;

        if in_sqrt < compare.checked_mul(compare)? {
            first_amount_in = in_sqrt.root(2).checked_sub(to_sub)?.checked_div(to_div)?;
        }
    }

    Some(first_amount_in)
}

/// Output-side counterpart of [`first_trade_qty_in`].
pub fn first_trade_qty_out(param: &SwapParams) -> Option<U256> {
    let mut first_amount_out = param.amount;

    let toward_average = param.fictive_reserve_out.checked_mul(param.price_average_in)?
        > param.fictive_reserve_in.checked_mul(param.price_average_out)?;
    if toward_average {
        let base = fees_base();
        let two = U256::from(2);
        let without_pool = base.checked_sub(param.fees_pool)?;
        let reverse_fees = without_pool.checked_sub(param.fees_lp)?;

        let in_per_out = param
            .fictive_reserve_in
            .checked_mul(param.price_average_out)?
            .checked_div(param.price_average_in)?;
        let predicted = param
            .fictive_reserve_in
            .checked_mul(param.fees_lp)?
            .checked_mul(param.price_average_out)?
            .checked_div(param.price_average_in)?;

        let to_add = param.fictive_reserve_out.checked_mul(reverse_fees)?.checked_mul(two)?.checked_add(predicted)?;
        let to_div = reverse_fees.checked_mul(two)?;
        // predicted / fees_lp is 0 / 0 without an LP fee, take its limit instead
        let scaled = if param.fees_lp.is_zero() {
            param.fictive_reserve_out.checked_mul(in_per_out)?.checked_mul(U256::from(4))?.checked_mul(reverse_fees.checked_mul(without_pool)?)?
        } else {
            param
                .fictive_reserve_out
                .checked_mul(predicted)?
                .checked_mul(U256::from(4))?
                .checked_mul(reverse_fees.checked_mul(without_pool)?)?
                .checked_div(param.fees_lp)?
        };
        let in_sqrt = scaled.checked_add(predicted.checked_mul(predicted)?)?;
        let compare = to_add.checked_sub(param.amount.checked_mul(to_div)?)?;

        if in_sqrt > compare.checked_mul(compare)? {
            first_amount_out = to_add.checked_sub(in_sqrt.root(2))?.checked_div(to_div)?;
        }
    }

    Some(first_amount_out)
}

/// Constant product on fictive reserves for a known input.
pub fn apply_k_const_rule_out(param: &SwapParams) -> Option<SwapOutcome> {
    let base = fees_base();
    let without_fees = base.checked_sub(param.fees_lp)?.checked_sub(param.fees_pool)?;

    let amount_in_with_fees = param.amount.checked_mul(without_fees)?;
    let denominator = param.fictive_reserve_in.checked_mul(base)?.checked_add(amount_in_with_fees)?;
    let amount_out = amount_in_with_fees.checked_mul(param.fictive_reserve_out)?.checked_div(denominator)?;
    if amount_out >= param.reserve_out {
        return None;
    }

    let amount_in_lp = amount_in_with_fees.checked_add(param.amount.checked_mul(param.fees_lp)?)? / base;

    Some(SwapOutcome {
        amount: amount_out,
        reserve_in: param.reserve_in.checked_add(amount_in_lp)?,
        reserve_out: param.reserve_out - amount_out,
        fictive_reserve_in: param.fictive_reserve_in.checked_add(amount_in_lp)?,
        fictive_reserve_out: param.fictive_reserve_out.checked_sub(amount_out)?,
    })
}

/// Constant product on fictive reserves for a known output, rounded up.
pub fn apply_k_const_rule_in(param: &SwapParams) -> Option<SwapOutcome> {
    let base = fees_base();
    let without_pool = base.checked_sub(param.fees_pool)?;
    let without_fees = without_pool.checked_sub(param.fees_lp)?;

    let denominator = param.fictive_reserve_out.checked_sub(param.amount)?.checked_mul(without_fees)?;
    let amount_in = param
        .fictive_reserve_in
        .checked_mul(param.amount)?
        .checked_mul(base)?
        .checked_div(denominator)?
        .checked_add(U256::from(1))?;
    if param.amount >= param.reserve_out {
        return None;
    }

    let amount_in_lp = amount_in.checked_mul(without_pool)? / base;

    Some(SwapOutcome {
        amount: amount_in,
        reserve_in: param.reserve_in.checked_add(amount_in_lp)?,
        reserve_out: param.reserve_out - param.amount,
        fictive_reserve_in: param.fictive_reserve_in.checked_add(amount_in_lp)?,
        fictive_reserve_out: param.fictive_reserve_out - param.amount,
    })
}

fn has_liquidity(param: &SwapParams) -> bool {
    !(param.reserve_in.is_zero()
        || param.reserve_out.is_zero()
        || param.fictive_reserve_in.is_zero()
        || param.fictive_reserve_out.is_zero())
}

/// Simulates a swap of `param.amount` input tokens.
pub fn get_amount_out(param: &SwapParams, last_timestamp: U256, now: U256) -> Option<SwapOutcome> {
    if param.amount.is_zero() || !has_liquidity(param) {
        return None;
    }

    let (price_average_in, price_average_out) = updated_price_average(
        param.fictive_reserve_in,
        param.fictive_reserve_out,
        last_timestamp,
        param.price_average_in,
        param.price_average_out,
        now,
    )?;
    let mut current = SwapParams { price_average_in, price_average_out, ..param.clone() };

    let first_amount_in = first_trade_qty_in(&current)?;
    if first_amount_in == param.amount
        && ratio_approx_eq(current.fictive_reserve_in, current.fictive_reserve_out, price_average_in, price_average_out)?
    {
        let (fictive_in, fictive_out) = compute_fictive_reserves(
            current.reserve_in,
            current.reserve_out,
            current.fictive_reserve_in,
            current.fictive_reserve_out,
        )?;
        current.fictive_reserve_in = fictive_in;
        current.fictive_reserve_out = fictive_out;
    }

    let first = apply_k_const_rule_out(&current.with_amount(first_amount_in))?;
    if first_amount_in >= param.amount {
        return Some(first);
    }

    let mut second_leg = current.with_reserves(&first).with_amount(param.amount - first_amount_in);
    let (fictive_in, fictive_out) =
        compute_fictive_reserves(first.reserve_in, first.reserve_out, first.fictive_reserve_in, first.fictive_reserve_out)?;
    second_leg.fictive_reserve_in = fictive_in;
    second_leg.fictive_reserve_out = fictive_out;

    let second = apply_k_const_rule_out(&second_leg)?;
    Some(SwapOutcome { amount: first.amount.checked_add(second.amount)?, ..second })
}

/// Simulates a swap producing `param.amount` output tokens.
pub fn get_amount_in(param: &SwapParams, last_timestamp: U256, now: U256) -> Option<SwapOutcome> {
    if param.amount.is_zero() || !has_liquidity(param) {
        return None;
    }
    if param.amount >= param.fictive_reserve_out || param.amount >= param.reserve_out {
        return None;
    }

    let (price_average_in, price_average_out) = updated_price_average(
        param.fictive_reserve_in,
        param.fictive_reserve_out,
        last_timestamp,
        param.price_average_in,
        param.price_average_out,
        now,
    )?;
    let mut current = SwapParams { price_average_in, price_average_out, ..param.clone() };

    let first_amount_out = first_trade_qty_out(&current)?;
    if first_amount_out == param.amount
        && ratio_approx_eq(current.fictive_reserve_in, current.fictive_reserve_out, price_average_in, price_average_out)?
    {
        let (fictive_in, fictive_out) = compute_fictive_reserves(
            current.reserve_in,
            current.reserve_out,
            current.fictive_reserve_in,
            current.fictive_reserve_out,
        )?;
        current.fictive_reserve_in = fictive_in;
        current.fictive_reserve_out = fictive_out;
    }

    let first = apply_k_const_rule_in(&current.with_amount(first_amount_out))?;
    if first_amount_out >= param.amount {
        return Some(first);
    }

    let mut second_leg = current.with_reserves(&first).with_amount(param.amount - first_amount_out);
    let (fictive_in, fictive_out) =
        compute_fictive_reserves(first.reserve_in, first.reserve_out, first.fictive_reserve_in, first.fictive_reserve_out)?;
    second_leg.fictive_reserve_in = fictive_in;
    second_leg.fictive_reserve_out = fictive_out;

    let second = apply_k_const_rule_in(&second_leg)?;
    Some(SwapOutcome { amount: first.amount.checked_add(second.amount)?, ..second })
}
