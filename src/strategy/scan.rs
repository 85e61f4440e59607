//! Quantity scan shared by both strategy directions

use async_trait::async_trait;
use rust_decimal::Decimal;
use tracing::{debug, Span};

use super::{ArbitrageOpportunity, MarketsData, OrderCandidate, StrategyConfig};
use crate::errors::{KeeperError, KeeperResult};
use crate::types::Symbol;

/// Prices one leg of each venue for a given quantity.
#[async_trait]
pub trait LegPricing: Send + Sync {
    fn name(&self) -> &str;

    async fn dex_candidate(&self, markets: &MarketsData, qty: Decimal)
        -> KeeperResult<OrderCandidate>;

    async fn cex_candidate(&self, markets: &MarketsData, qty: Decimal)
        -> KeeperResult<OrderCandidate>;
}

/// Walks `start_qty, start_qty + step_qty, ..` up to `end_qty` and keeps the
/// most profitable pairing of legs.
///
/// A quantity one venue rejects as too small is skipped. The first quantity
/// that exceeds a balance ends the walk, since larger ones would too. The best
/// candidate is returned only if its profit is positive and reaches the
/// configured threshold.
pub async fn find_best_opportunity(
    pricing: &dyn LegPricing,
    markets: &MarketsData,
    config: &StrategyConfig,
    end_qty: Decimal,
    span: &Span,
) -> KeeperResult<Option<ArbitrageOpportunity>> {
    if config.step_qty <= Decimal::ZERO {
        return Err(KeeperError::InvalidAmount {
            symbol: Symbol::Dai,
            amount: config.step_qty,
            reason: "step quantity must be positive".to_string(),
        });
    }

    let name = pricing.name().to_string();
    let mut best: Option<ArbitrageOpportunity> = None;
    let mut qty = config.start_qty;

    while qty <= end_qty {
        let dex_leg = match pricing.dex_candidate(markets, qty).await {
            Ok(leg) => leg,
            Err(e) if e.is_insufficient_balance() => {
                debug!(parent: span, %qty, error = %e, "Scan stopped at dex balance");
                break;
            }
            Err(e) if e.is_invalid_amount() => {
                qty += config.step_qty;
                continue;
            }
            Err(e) => return Err(e.in_strategy(&name, "price dex leg")),
        };

        let cex_leg = match pricing.cex_candidate(markets, qty).await {
            Ok(leg) => leg,
            Err(e) if e.is_insufficient_balance() => {
                debug!(parent: span, %qty, error = %e, "Scan stopped at exchange balance");
                break;
            }
            Err(e) if e.is_invalid_amount() => {
                qty += config.step_qty;
                continue;
            }
            Err(e) => return Err(e.in_strategy(&name, "price cex leg")),
        };

        let candidate = ArbitrageOpportunity {
            strategy: name.clone(),
            quantity: qty,
            dex_leg,
            cex_leg,
        };
        let profit = candidate.estimated_profit();
        if best
            .as_ref()
            .is_none_or(|b| profit > b.estimated_profit())
        {
            best = Some(candidate);
        }
        qty += config.step_qty;
    }

    Ok(best.filter(|b| {
        let profit = b.estimated_profit();
        profit > Decimal::ZERO && profit >= config.profit_threshold
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::strategy::{Cost, MarketPair, Venue};
    use crate::types::Side;
    use proptest::prelude::*;
    use rust_decimal_macros::dec;

    /// Profit per leg is linear in quantity; DAI balance caps the dex leg.
    struct LinearPricing {
        dex_margin: Decimal,
        cex_margin: Decimal,
        dai_balance: Decimal,
    }

    fn leg(venue: Venue, qty: Decimal, profit: Decimal) -> OrderCandidate {
        OrderCandidate {
            side: Side::Buy,
            pair: MarketPair::DaiZar,
            venue,
            amount_in: qty,
            amount_out: qty,
            min_out: qty,
            estimated_cost: Cost::default(),
            estimated_revenue: profit,
        }
    }

    #[async_trait]
    impl LegPricing for LinearPricing {
        fn name(&self) -> &str {
            "linear"
        }

        async fn dex_candidate(&self, _: &MarketsData, qty: Decimal) -> KeeperResult<OrderCandidate> {
            if qty > self.dai_balance {
                return Err(KeeperError::InsufficientBalance {
                    symbol: Symbol::Dai,
                    required: qty,
                    available: self.dai_balance,
                });
            }
            Ok(leg(Venue::UniswapV3, qty, qty * self.dex_margin))
        }

        async fn cex_candidate(&self, _: &MarketsData, qty: Decimal) -> KeeperResult<OrderCandidate> {
            Ok(leg(Venue::Nobitex, qty, qty * self.cex_margin))
        }
    }

    fn config(threshold: Decimal) -> StrategyConfig {
        StrategyConfig {
            start_qty: dec!(1),
            step_qty: dec!(1),
            profit_threshold: threshold,
            slippage: dec!(0.001),
        }
    }

    #[tokio::test]
    async fn balance_cap_ends_scan() {
        let pricing = LinearPricing {
            dex_margin: dec!(10),
            cex_margin: dec!(-2),
            dai_balance: dec!(7),
        };
        let best = find_best_opportunity(
            &pricing,
            &MarketsData::default(),
            &config(Decimal::ZERO),
            dec!(100),
            &Span::none(),
        )
        .await
        .unwrap()
        .unwrap();

        assert_eq!(best.quantity, dec!(7));
        assert_eq!(best.estimated_profit(), dec!(56));
    }

    #[tokio::test]
    async fn any_positive_profit_clears_default_threshold() {
        let scan = |dex_margin| async move {
            let pricing = LinearPricing {
                dex_margin,
                cex_margin: dec!(0),
                dai_balance: dec!(1),
            };
            find_best_opportunity(
                &pricing,
                &MarketsData::default(),
                &config(Decimal::ZERO),
                dec!(1),
                &Span::none(),
            )
            .await
            .unwrap()
        };

        let marginal = scan(dec!(0.01)).await.unwrap();
        assert_eq!(marginal.estimated_profit(), dec!(0.01));
        assert!(scan(dec!(0)).await.is_none());
    }

    proptest! {
        #[test]
        fn never_returns_unprofitable_opportunity(
            dex in -50i64..50,
            cex in -50i64..50,
            balance in 0u32..30,
            threshold in 0i64..500,
        ) {
            let pricing = LinearPricing {
                dex_margin: Decimal::from(dex),
                cex_margin: Decimal::from(cex),
                dai_balance: Decimal::from(balance),
            };
            let config = config(Decimal::from(threshold));
            let best = tokio_test::block_on(find_best_opportunity(
                &pricing,
                &MarketsData::default(),
                &config,
                dec!(20),
                &Span::none(),
            ))
            .unwrap();

            if let Some(best) = best {
                prop_assert!(best.estimated_profit() > Decimal::ZERO);
                prop_assert!(best.estimated_profit() >= config.profit_threshold);
                prop_assert!(best.quantity <= Decimal::from(balance));
            }
        }
    }
}
