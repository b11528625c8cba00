//! Liquidity operations for the pool
//!
//! Share math for bootstrapping, proportional deposits and withdrawals.
//! Every division floors, so the pool never takes more than the caller
//! authorized and never pays out more than the shares are worth.
use anchor_lang::prelude::*;

use crate::{
    state::{DepositRequest, DepositResult, Pool, WithdrawRequest, WithdrawResult},
    utils::{floor_div, isqrt, to_u64},
    ErrorCode,
};

/// Shares minted for the first deposit: `floor(sqrt(amount_a * amount_b))`.
pub fn initial_lp(amount_a: u64, amount_b: u64) -> Result<u64> {
    require!(amount_a > 0 && amount_b > 0, ErrorCode::InvalidAmount);
    let product = u128::from(amount_a)
        .checked_mul(u128::from(amount_b))
        .ok_or(ErrorCode::Overflow)?;
    let lp_amount = to_u64(isqrt(product)).ok_or(ErrorCode::Overflow)?;
    Ok(lp_amount)
}

/// Calculate the shares to mint and the amounts to take for a deposit
///
/// # Arguments
/// * `amount_a_desired` - Most token A the caller is willing to deposit
/// * `amount_b_desired` - Most token B the caller is willing to deposit
/// * `total_lp_supply` - Current total supply of LP shares
/// * `token_a_reserve` - Current reserve of token A in the pool
/// * `token_b_reserve` - Current reserve of token B in the pool
///
/// A drained pool (`total_lp_supply == 0`) is re-seeded like a fresh one:
/// both desired amounts are taken whole.
pub fn deposit_lp(
    amount_a_desired: u64,
    amount_b_desired: u64,
    total_lp_supply: u64,
    token_a_reserve: u64,
    token_b_reserve: u64,
) -> Result<DepositResult> {
    require!(
        amount_a_desired > 0 && amount_b_desired > 0,
        ErrorCode::InvalidAmount
    );

    if total_lp_supply == 0 {
        return Ok(DepositResult {
            amount_a: amount_a_desired,
            amount_b: amount_b_desired,
            lp_minted: initial_lp(amount_a_desired, amount_b_desired)?,
        });
    }

    require!(
        token_a_reserve > 0 && token_b_reserve > 0,
        ErrorCode::InsufficientLiquidity
    );

    let supply = u128::from(total_lp_supply);
    let lp_for_a = floor_div(
        u128::from(amount_a_desired),
        supply,
        u128::from(token_a_reserve),
    )
    .ok_or(ErrorCode::Overflow)?;
    let lp_for_b = floor_div(
        u128::from(amount_b_desired),
        supply,
        u128::from(token_b_reserve),
    )
    .ok_or(ErrorCode::Overflow)?;

    // the scarcer side sets the share count; excess on the other is left behind
    let lp_minted = lp_for_a.min(lp_for_b);
    require!(lp_minted > 0, ErrorCode::InsufficientOutput);

    let amount_a = floor_div(lp_minted, u128::from(token_a_reserve), supply)
        .ok_or(ErrorCode::Overflow)?;
    let amount_b = floor_div(lp_minted, u128::from(token_b_reserve), supply)
        .ok_or(ErrorCode::Overflow)?;

    Ok(DepositResult {
        amount_a: to_u64(amount_a).ok_or(ErrorCode::Overflow)?,
        amount_b: to_u64(amount_b).ok_or(ErrorCode::Overflow)?,
        lp_minted: to_u64(lp_minted).ok_or(ErrorCode::Overflow)?,
    })
}

/// Calculate the amount of tokens to return for a withdrawal
///
/// Returns `(token_a_amount, token_b_amount)`. Burning the whole supply
/// returns the reserves exactly.
pub fn withdraw_lp(
    lp_tokens: u64,
    total_lp_supply: u64,
    token_a_reserve: u64,
    token_b_reserve: u64,
) -> Result<(u64, u64)> {
    require!(
        lp_tokens > 0 && lp_tokens <= total_lp_supply,
        ErrorCode::InvalidAmount
    );

    let supply = u128::from(total_lp_supply);
    let token_a_amount = floor_div(u128::from(lp_tokens), u128::from(token_a_reserve), supply)
        .ok_or(ErrorCode::Overflow)?;
    let token_b_amount = floor_div(u128::from(lp_tokens), u128::from(token_b_reserve), supply)
        .ok_or(ErrorCode::Overflow)?;

    require!(
        token_a_amount > 0 || token_b_amount > 0,
        ErrorCode::InsufficientOutput
    );

    Ok((
        to_u64(token_a_amount).ok_or(ErrorCode::Overflow)?,
        to_u64(token_b_amount).ok_or(ErrorCode::Overflow)?,
    ))
}

/// Prices a deposit against `pool` with its accrued fees folded into the
/// reserves, so new shares buy into the fees at the same price as the rest.
pub fn quote_deposit(pool: &Pool, request: &DepositRequest) -> Result<DepositResult> {
    let pool = pool.with_fees_folded()?;
    let result = deposit_lp(
        request.amount_a_desired,
        request.amount_b_desired,
        pool.lp_supply,
        pool.reserve_a,
        pool.reserve_b,
    )?;
    require_gte!(
        result.lp_minted,
        request.minimum_lp_out,
        ErrorCode::SlippageExceeded
    );
    Ok(result)
}

/// Prices a withdrawal; the payout includes the shares' slice of the
/// accrued swap fees.
pub fn quote_withdraw(pool: &Pool, request: &WithdrawRequest) -> Result<WithdrawResult> {
    let pool = pool.with_fees_folded()?;
    let (amount_a, amount_b) = withdraw_lp(
        request.lp_amount_in,
        pool.lp_supply,
        pool.reserve_a,
        pool.reserve_b,
    )?;
    require!(
        amount_a >= request.minimum_a_out && amount_b >= request.minimum_b_out,
        ErrorCode::SlippageExceeded
    );
    Ok(WithdrawResult {
        amount_a,
        amount_b,
        lp_burned: request.lp_amount_in,
    })
}
