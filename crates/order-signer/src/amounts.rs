//! Fixed-point amount encoding for signed orders.
//!
//! The venue settles in 6-decimal fixed point. Precision differs per side:
//! the stablecoin leg carries at most 4 decimals, the token leg at most 2.
//! The size is rounded first and the stablecoin amount derived from the
//! rounded size, which keeps `maker/taker` on the configured price within
//! venue tolerance.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;

use crate::error::SignerError;

/// Smallest price increment the venue accepts.
pub const TICK: Decimal = Decimal::from_parts(1, 0, 0, false, 3); // 0.001

const MICRO: Decimal = Decimal::from_parts(1_000_000, 0, 0, false, 0);

/// Round a price down to the 0.001 grid and clamp into `[0.001, 0.999]`.
///
/// Exactly 0 and 1 are the prices of resolved markets; orders there are
/// meaningless, so the clamp keeps one tick of distance from both ends.
pub fn clamp_price_to_grid(price: Decimal) -> Decimal {
    let floored = price.trunc_with_scale(3);
    let max = Decimal::ONE - TICK;
    floored.clamp(TICK, max)
}

/// Rounded `(stable_amount, token_amount)` in 6-decimal fixed point.
///
/// `size` is in shares, `price` in dollars per share. The caller maps the
/// pair onto maker/taker according to the order side.
pub fn order_amounts(size: Decimal, price: Decimal) -> Result<(u128, u128), SignerError> {
    if size <= Decimal::ZERO || price <= Decimal::ZERO {
        return Err(SignerError::InvalidAmount { size, price });
    }

    // floor(size * 100) / 100
    let rounded_size = size.trunc_with_scale(2);
    if rounded_size.is_zero() {
        return Err(SignerError::InvalidAmount { size, price });
    }

    // floor(rounded * price * 10_000) / 10_000, then scale to micro-units
    let stable = (rounded_size * price).trunc_with_scale(4);

    let token_amount = to_micro(rounded_size)?;
    let stable_amount = to_micro(stable)?;
    Ok((stable_amount, token_amount))
}

fn to_micro(value: Decimal) -> Result<u128, SignerError> {
    (value * MICRO)
        .round()
        .to_u128()
        .ok_or(SignerError::AmountOverflow)
}
