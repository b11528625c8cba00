use crate::BPS_DENOMINATOR;

pub fn floor_div(token_amount: u128, numerator: u128, denominator: u128) -> Option<u128> {
    token_amount.checked_mul(numerator)?.checked_div(denominator)
}

/// Amount left after taking `fee_bps` basis points off the input, rounded down.
pub fn amount_after_fee(amount: u64, fee_bps: u16) -> Option<u128> {
    let keep = BPS_DENOMINATOR.checked_sub(u64::from(fee_bps))?;
    floor_div(
        u128::from(amount),
        u128::from(keep),
        u128::from(BPS_DENOMINATOR),
    )
}

/// Floor of the square root, integer-only (Newton iteration from above).
pub fn isqrt(value: u128) -> u128 {
    if value < 2 {
        return value;
    }
    let bits = 128 - value.leading_zeros();
    let mut x = 1u128 << ((bits + 1) / 2);
    loop {
        let y = (x + value / x) >> 1;
        if y >= x {
            return x;
        }
        x = y;
    }
}

/// Narrows an intermediate back to the on-chain width.
pub fn to_u64(value: u128) -> Option<u64> {
    u64::try_from(value).ok()
}
