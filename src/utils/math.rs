//! Decimal helpers and token base-unit conversion

use alloy::primitives::U256;
use rust_decimal::prelude::*;
use rust_decimal_macros::dec;

use crate::errors::{KeeperError, KeeperResult};

pub fn pow10(n: i32) -> Decimal {
    match n {
        0 => dec!(1),
        6 => dec!(1_000_000),
        18 => dec!(1_000_000_000_000_000_000),
        _ => {
            let mut result = dec!(1);
            if n > 0 {
                for _ in 0..n {
                    result *= dec!(10);
                }
            } else {
                for _ in 0..(-n) {
                    result /= dec!(10);
                }
            }
            result
        }
    }
}

/// `amount` in whole tokens to integer base units, truncating extra precision.
pub fn to_base_units(amount: Decimal, decimals: u32) -> KeeperResult<U256> {
    if amount.is_sign_negative() {
        return Err(conversion_error(format!("negative amount {amount}")));
    }
    let scaled = amount
        .checked_mul(pow10(decimals as i32))
        .ok_or_else(|| conversion_error(format!("{amount} overflows at {decimals} decimals")))?
        .trunc();
    let raw = scaled
        .to_u128()
        .ok_or_else(|| conversion_error(format!("{scaled} does not fit in u128")))?;
    Ok(U256::from(raw))
}

/// Integer base units to whole tokens.
pub fn from_base_units(value: U256, decimals: u32) -> KeeperResult<Decimal> {
    let raw = u128::try_from(value)
        .ok()
        .and_then(|v| i128::try_from(v).ok())
        .ok_or_else(|| conversion_error(format!("{value} does not fit in a decimal")))?;
    Decimal::try_from_i128_with_scale(raw, decimals)
        .map(|d| d.normalize())
        .map_err(|e| conversion_error(format!("{value} at {decimals} decimals: {e}")))
}

/// Rounds toward zero to the precision a token can represent.
pub fn round_to_decimals(amount: Decimal, decimals: u32) -> Decimal {
    amount.round_dp_with_strategy(decimals, RoundingStrategy::ToZero)
}

fn conversion_error(message: String) -> KeeperError {
    KeeperError::parsing("base unit conversion", anyhow::anyhow!(message))
}
