//! ERC-20 token metadata and Uniswap V3 fee tiers

use alloy::primitives::{Address, aliases::U24};
use rust_decimal::prelude::*;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use super::Symbol;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Token {
    pub address: Address,
    pub symbol: Symbol,
    pub decimals: u32,
}

/// Token metadata keyed by symbol.
#[derive(Debug, Clone, Default)]
pub struct TokenSet {
    tokens: HashMap<Symbol, Token>,
}

impl TokenSet {
    pub fn new(tokens: impl IntoIterator<Item = Token>) -> Self {
        Self {
            tokens: tokens.into_iter().map(|t| (t.symbol, t)).collect(),
        }
    }

    pub fn get(&self, symbol: Symbol) -> Option<&Token> {
        self.tokens.get(&symbol)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Token> {
        self.tokens.values()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UniswapFee {
    Low,
    Medium,
    High,
}

impl UniswapFee {
    /// Fee in hundredths of a basis point, as the pool contracts expect it.
    pub fn pips(&self) -> u32 {
        match self {
            UniswapFee::Low => 500,
            UniswapFee::Medium => 3000,
            UniswapFee::High => 10000,
        }
    }

    pub fn as_u24(&self) -> U24 {
        U24::from(self.pips())
    }

    /// Maps a fractional fee (0.0005, 0.003, 0.01) to the closest tier.
    pub fn from_fraction(fee: Decimal) -> Self {
        if fee <= dec!(0.0005) {
            UniswapFee::Low
        } else if fee <= dec!(0.003) {
            UniswapFee::Medium
        } else {
            UniswapFee::High
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fee_tiers_from_config_fraction() {
        assert_eq!(UniswapFee::from_fraction(dec!(0.01)).pips(), 10000);
        assert_eq!(UniswapFee::from_fraction(dec!(0.003)).pips(), 3000);
        assert_eq!(UniswapFee::from_fraction(dec!(0.0005)).pips(), 500);
    }
}
