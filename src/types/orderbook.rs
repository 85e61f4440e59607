//! Order book snapshots and volume-weighted pricing

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::Side;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PriceLevel {
    pub price: Decimal,
    pub amount: Decimal,
}

impl PriceLevel {
    pub fn new(price: Decimal, amount: Decimal) -> Self {
        Self { price, amount }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OrderBook {
    /// Best (lowest) ask first.
    pub asks: Vec<PriceLevel>,
    /// Best (highest) bid first.
    pub bids: Vec<PriceLevel>,
}

impl OrderBook {
    /// Volume-weighted average price for filling `qty` as a taker on `side`.
    ///
    /// Buying walks the asks, selling walks the bids. Returns zero when the
    /// book is not deep enough to fill the whole quantity.
    pub fn average_price(&self, side: Side, qty: Decimal) -> Decimal {
        let levels = match side {
            Side::Buy => &self.asks,
            Side::Sell => &self.bids,
        };

        let mut filled = Decimal::ZERO;
        let mut notional = Decimal::ZERO;
        for level in levels {
            if level.amount + filled < qty {
                filled += level.amount;
                notional += level.amount * level.price;
            } else {
                let remaining = qty - filled;
                notional += remaining * level.price;
                filled = qty;
                break;
            }
        }

        if filled != qty || filled.is_zero() {
            return Decimal::ZERO;
        }
        notional / filled
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rust_decimal_macros::dec;

    fn book() -> OrderBook {
        OrderBook {
            asks: vec![
                PriceLevel::new(dec!(100), dec!(2)),
                PriceLevel::new(dec!(110), dec!(3)),
            ],
            bids: vec![
                PriceLevel::new(dec!(99), dec!(1)),
                PriceLevel::new(dec!(95), dec!(4)),
            ],
        }
    }

    #[test]
    fn buy_walks_asks_with_partial_last_level() {
        // 2 @ 100 + 1 @ 110
        assert_eq!(book().average_price(Side::Buy, dec!(3)), dec!(310) / dec!(3));
    }

    #[test]
    fn sell_walks_bids() {
        assert_eq!(book().average_price(Side::Sell, dec!(1)), dec!(99));
        assert_eq!(book().average_price(Side::Sell, dec!(5)), dec!(479) / dec!(5));
    }

    #[test]
    fn too_shallow_book_prices_at_zero() {
        assert_eq!(book().average_price(Side::Buy, dec!(6)), Decimal::ZERO);
        assert_eq!(OrderBook::default().average_price(Side::Sell, dec!(1)), Decimal::ZERO);
    }

    proptest! {
        #[test]
        fn average_stays_within_touched_levels(qty in 1u32..=5) {
            let qty = Decimal::from(qty);
            let avg = book().average_price(Side::Buy, qty);
            prop_assert!(avg >= dec!(100) && avg <= dec!(110));
        }
    }
}
