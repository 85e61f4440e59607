//! Buy DAI with ZAR on Uniswap, sell USDT for toman on Nobitex

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

pub const BUY_DEX_SELL_CEX: &str = "buy-dex-sell-cex";

pub struct BuyDexSellCex {
    venues: Venues,
    config: StrategyConfig,
    markets: Option<MarketsData>,
    span: Span,
}

impl BuyDexSellCex {
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
impl LegPricing for BuyDexSellCex {
    fn name(&self) -> &str {
        BUY_DEX_SELL_CEX
    }

    /// Exact-output swap of ZAR into `qty` DAI.
    async fn dex_candidate(
        &self,
        markets: &MarketsData,
        qty: Decimal,
    ) -> KeeperResult<OrderCandidate> {
        let zar = self.venues.token(Symbol::Zar)?;
        let dai = self.venues.token(Symbol::Dai)?;
        let fee = self.venues.pool_fee;

        let zar_in = self
            .venues
            .quoter
            .quote_exact_output(zar, dai, fee, qty)
            .await?;
        if zar_in <= Decimal::ZERO {
            return Err(KeeperError::InvalidPrice {
                context: format!("ZAR in for {qty} DAI"),
                price: zar_in,
            });
        }

        let zar_balance = markets.uniswap.balance(Symbol::Zar);
        if zar_in > zar_balance {
            return Err(KeeperError::InsufficientBalance {
                symbol: Symbol::Zar,
                required: zar_in,
                available: zar_balance,
            });
        }

        let min_out = round_to_decimals(qty * (Decimal::ONE - self.config.slippage), dai.decimals);
        let gas_eth = self
            .venues
            .dex_trader
            .estimate_trade_gas_fee(zar, dai, fee, zar_in, min_out)
            .await
            .map_err(|e| match e {
                KeeperError::InsufficientBalance { .. } => KeeperError::InsufficientBalance {
                    symbol: Symbol::Zar,
                    required: zar_in,
                    available: zar_balance,
                },
                other => other,
            })?;

        let eth_price = markets.nobitex.price(Symbol::Eth)?;
        let usdt_price = markets.nobitex.price(Symbol::Usdt)?;

        Ok(OrderCandidate {
            side: Side::Buy,
            pair: MarketPair::DaiZar,
            venue: Venue::UniswapV3,
            amount_in: zar_in,
            amount_out: qty,
            min_out,
            estimated_cost: Cost {
                network_fee: gas_eth * eth_price,
                outgoing_value: zar_in * TOMAN_PER_ZAR,
            },
            estimated_revenue: qty * usdt_price,
        })
    }

    /// Market sell of `qty` USDT into the bid side.
    async fn cex_candidate(
        &self,
        markets: &MarketsData,
        qty: Decimal,
    ) -> KeeperResult<OrderCandidate> {
        let usdt_price = markets.nobitex.price(Symbol::Usdt)?;
        let value = qty * usdt_price;
        if value <= self.venues.exchange.minimum_order_toman() {
            return Err(KeeperError::InvalidAmount {
                symbol: Symbol::Usdt,
                amount: qty,
                reason: format!("order value {value} TMN below exchange minimum"),
            });
        }

        let usdt_balance = markets.nobitex.balance(Symbol::Usdt);
        if usdt_balance < qty {
            return Err(KeeperError::InsufficientBalance {
                symbol: Symbol::Usdt,
                required: qty,
                available: usdt_balance,
            });
        }

        let avg_price = markets.usdt_book_price(Side::Sell, qty);
        if avg_price <= Decimal::ZERO {
            return Err(KeeperError::InvalidPrice {
                context: format!("USDT bids for {qty}"),
                price: avg_price,
            });
        }

        let taker_fee = self.venues.exchange.fees(FeeType::Taker);
        let toman_out = avg_price * qty * (Decimal::ONE - taker_fee);

        Ok(OrderCandidate {
            side: Side::Sell,
            pair: MarketPair::UsdtTmn,
            venue: Venue::Nobitex,
            amount_in: qty,
            amount_out: toman_out,
            min_out: toman_out,
            estimated_cost: Cost {
                network_fee: Decimal::ZERO,
                outgoing_value: value,
            },
            estimated_revenue: toman_out,
        })
    }
}

#[async_trait]
impl ArbitrageStrategy for BuyDexSellCex {
    fn name(&self) -> &str {
        BUY_DEX_SELL_CEX
    }

    async fn setup(&mut self) -> KeeperResult<&MarketsData> {
        let markets = self.venues.collect_market_data().await?;
        Ok(self.markets.insert(markets))
    }

    async fn evaluate(&self) -> KeeperResult<Option<ArbitrageOpportunity>> {
        let markets = snapshot(&self.markets, BUY_DEX_SELL_CEX)?;
        // Bought DAI is matched by USDT sold, so both balances cap the size.
        let end_qty = markets
            .nobitex
            .balance(Symbol::Usdt)
            .min(markets.uniswap.balance(Symbol::Dai));

        let best = find_best_opportunity(self, markets, &self.config, end_qty, &self.span).await?;
        if let Some(opportunity) = &best {
            info!(
                parent: &self.span,
                quantity = %opportunity.quantity,
                profit = %opportunity.estimated_profit(),
                "💡 Found {} opportunity",
                BUY_DEX_SELL_CEX
            );
        }
        Ok(best)
    }

    fn teardown(&mut self) {
        self.markets = None;
    }
}
