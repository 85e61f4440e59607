//! Sell DAI for ZAR on Uniswap, buy USDT with toman on Nobitex

use async_trait::async_trait;
use rust_decimal::Decimal;
use tracing::{info, Span};

use super::{
    find_best_opportunity, snapshot, ArbitrageOpportunity, ArbitrageStrategy, Cost, LegPricing,
    MarketPair, MarketsData, OrderCandidate, StrategyConfig, Venue, Venues,
};
use crate::{
    config::TOMAN_PER_ZAR,
    errors::{KeeperError, KeeperResult},
    types::{FeeType, Side, Symbol},
    utils::round_to_decimals,
};

pub const SELL_DEX_BUY_CEX: &str = "sell-dex-buy-cex";

pub struct SellDexBuyCex {
    venues: Venues,
    config: StrategyConfig,
    markets: Option<MarketsData>,
    span: Span,
}

impl SellDexBuyCex {
    pub fn new(venues: Venues, config: StrategyConfig, span: Span) -> Self {
        Self {
            venues,
            config,
            markets: None,
            span,
        }
    }

    pub fn markets(&self) -> Option<&MarketsData> {
        self.markets.as_ref()
    }
}

#[async_trait]
impl LegPricing for SellDexBuyCex {
    fn name(&self) -> &str {
        SELL_DEX_BUY_CEX
    }

    /// Exact-input swap of `qty` DAI into ZAR.
    async fn dex_candidate(
        &self,
        markets: &MarketsData,
        qty: Decimal,
    ) -> KeeperResult<OrderCandidate> {
        let dai = self.venues.token(Symbol::Dai)?;
        let zar = self.venues.token(Symbol::Zar)?;
        let fee = self.venues.pool_fee;

        let dai_balance = markets.uniswap.balance(Symbol::Dai);
        if qty > dai_balance {
            return Err(KeeperError::InsufficientBalance {
                symbol: Symbol::Dai,
                required: qty,
                available: dai_balance,
            });
        }

        let zar_out = self
            .venues
            .quoter
            .quote_exact_input(dai, zar, fee, qty)
            .await?;
        if zar_out <= Decimal::ZERO {
            return Err(KeeperError::InvalidPrice {
                context: format!("ZAR out for {qty} DAI"),
                price: zar_out,
            });
        }

        let min_out =
            round_to_decimals(zar_out * (Decimal::ONE - self.config.slippage), zar.decimals);
        let gas_eth = self
            .venues
            .dex_trader
            .estimate_trade_gas_fee(dai, zar, fee, qty, min_out)
            .await
            .map_err(|e| match e {
                KeeperError::InsufficientBalance { .. } => KeeperError::InsufficientBalance {
                    symbol: Symbol::Dai,
                    required: qty,
                    available: dai_balance,
                },
                other => other,
            })?;

        let eth_price = markets.nobitex.price(Symbol::Eth)?;
        let usdt_price = markets.nobitex.price(Symbol::Usdt)?;

        Ok(OrderCandidate {
            side: Side::Sell,
            pair: MarketPair::DaiZar,
            venue: Venue::UniswapV3,
            amount_in: qty,
            amount_out: zar_out,
            min_out,
            estimated_cost: Cost {
                network_fee: gas_eth * eth_price,
                outgoing_value: qty * usdt_price,
            },
            estimated_revenue: zar_out * TOMAN_PER_ZAR,
        })
    }

    /// Market buy of `qty` USDT from the ask side, paid in toman.
    async fn cex_candidate(
        &self,
        markets: &MarketsData,
        qty: Decimal,
    ) -> KeeperResult<OrderCandidate> {
        let avg_price = markets.usdt_book_price(Side::Buy, qty);
        if avg_price <= Decimal::ZERO {
            return Err(KeeperError::InvalidPrice {
                context: format!("USDT asks for {qty}"),
                price: avg_price,
            });
        }

        let required = avg_price * qty;
        if required <= self.venues.exchange.minimum_order_toman() {
            return Err(KeeperError::InvalidAmount {
                symbol: Symbol::Tmn,
                amount: required,
                reason: "order value below exchange minimum".to_string(),
            });
        }

        let toman_balance = markets.nobitex.balance(Symbol::Tmn);
        if required > toman_balance {
            return Err(KeeperError::InsufficientBalance {
                symbol: Symbol::Tmn,
                required,
                available: toman_balance,
            });
        }

        let usdt_price = markets.nobitex.price(Symbol::Usdt)?;
        let taker_fee = self.venues.exchange.fees(FeeType::Taker);

        Ok(OrderCandidate {
            side: Side::Buy,
            pair: MarketPair::UsdtTmn,
            venue: Venue::Nobitex,
            amount_in: required,
            amount_out: qty,
            min_out: qty,
            estimated_cost: Cost {
                network_fee: Decimal::ZERO,
                outgoing_value: required,
            },
            estimated_revenue: qty * (Decimal::ONE - taker_fee) * usdt_price,
        })
    }
}

#[async_trait]
impl ArbitrageStrategy for SellDexBuyCex {
    fn name(&self) -> &str {
        SELL_DEX_BUY_CEX
    }

    async fn setup(&mut self) -> KeeperResult<&MarketsData> {
        let markets = self.venues.collect_market_data().await?;
        Ok(self.markets.insert(markets))
    }

    async fn evaluate(&self) -> KeeperResult<Option<ArbitrageOpportunity>> {
        let markets = snapshot(&self.markets, SELL_DEX_BUY_CEX)?;
        let end_qty = markets.uniswap.balance(Symbol::Dai);

        let best = find_best_opportunity(self, markets, &self.config, end_qty, &self.span).await?;
        if let Some(opportunity) = &best {
            info!(
                parent: &self.span,
                quantity = %opportunity.quantity,
                profit = %opportunity.estimated_profit(),
                "💡 Found {} opportunity",
                SELL_DEX_BUY_CEX
            );
        }
        Ok(best)
    }

    fn teardown(&mut self) {
        self.markets = None;
    }
}
