use anchor_lang::prelude::*;

use crate::{
    state::{Pool, SwapRequest, SwapResult},
    utils::{amount_after_fee, to_u64},
    ErrorCode,
};

/// Constant-product output for `amount_in` against the given reserves.
///
/// The fee is taken off the input before it touches the curve:
///
/// ```text
/// in'      = amount_in * (10000 - fee_bps) / 10000
/// k        = reserve_in * reserve_out
/// out      = reserve_out - k / (reserve_in + in')
/// ```
///
/// Both divisions floor. Only integers are used so every implementation
/// lands on the same result bit for bit.
pub fn swap(
    amount_in: u64,
    reserve_in: u64,
    reserve_out: u64,
    fee_bps: u16,
) -> Result<SwapResult> {
    require!(amount_in > 0, ErrorCode::InvalidAmount);
    require!(
        reserve_in > 0 && reserve_out > 0,
        ErrorCode::InsufficientLiquidity
    );

    let amount_in_after_fee = amount_after_fee(amount_in, fee_bps).ok_or(ErrorCode::Overflow)?;

    // k = x * y
    let k = u128::from(reserve_in)
        .checked_mul(u128::from(reserve_out))
        .ok_or(ErrorCode::Overflow)?;
    let new_reserve_in = u128::from(reserve_in)
        .checked_add(amount_in_after_fee)
        .ok_or(ErrorCode::Overflow)?;
    let new_reserve_out = k
        .checked_div(new_reserve_in)
        .ok_or(ErrorCode::Overflow)?;
    let amount_out = u128::from(reserve_out)
        .checked_sub(new_reserve_out)
        .ok_or(ErrorCode::Overflow)?;

    require!(amount_out > 0, ErrorCode::InsufficientOutput);
    // the curve never hands out the whole output side
    require!(new_reserve_out > 0, ErrorCode::InsufficientLiquidity);

    let amount_in_after_fee = to_u64(amount_in_after_fee).ok_or(ErrorCode::Overflow)?;
    Ok(SwapResult {
        amount_in,
        amount_in_after_fee,
        amount_out: to_u64(amount_out).ok_or(ErrorCode::Overflow)?,
        fee: amount_in
            .checked_sub(amount_in_after_fee)
            .ok_or(ErrorCode::Overflow)?,
        new_reserve_in: to_u64(new_reserve_in).ok_or(ErrorCode::Overflow)?,
        new_reserve_out: to_u64(new_reserve_out).ok_or(ErrorCode::Overflow)?,
    })
}

/// Prices `request` against `pool` and enforces the caller's minimum output.
///
/// Has no effects; [`crate::Amm::swap`] commits the same numbers.
pub fn quote(pool: &Pool, request: &SwapRequest) -> Result<SwapResult> {
    let (reserve_in, reserve_out) = if request.a_to_b {
        (pool.reserve_a, pool.reserve_b)
    } else {
        (pool.reserve_b, pool.reserve_a)
    };

    let result = swap(request.amount_in, reserve_in, reserve_out, pool.fee_bps)?;

    require_gte!(
        result.amount_out,
        request.minimum_out,
        ErrorCode::SlippageExceeded
    );

    Ok(result)
}
