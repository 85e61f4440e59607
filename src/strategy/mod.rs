//! Arbitrage strategies between the DAI/ZAR pool and the USDT/TMN book

pub mod buy_dex_sell_cex;
pub mod scan;
pub mod sell_dex_buy_cex;
pub mod types;

pub use buy_dex_sell_cex::*;
pub use scan::*;
pub use sell_dex_buy_cex::*;
pub use types::*;

use async_trait::async_trait;
use rust_decimal::Decimal;
use std::sync::Arc;
use tracing::debug;

use crate::{
    cex::Exchange,
    config::RIAL_PER_TOMAN,
    dex::{DexTrader, Quoter},
    errors::{KeeperError, KeeperResult},
    types::{Balance, Symbol, Token, TokenSet, UniswapFee},
};

/// Lifecycle driven by the executor: setup, evaluate, teardown.
#[async_trait]
pub trait ArbitrageStrategy: Send + Sync {
    fn name(&self) -> &str;

    /// Collects the market snapshot that `evaluate` works from.
    async fn setup(&mut self) -> KeeperResult<&MarketsData>;

    /// Best opportunity worth executing, if any.
    async fn evaluate(&self) -> KeeperResult<Option<ArbitrageOpportunity>>;

    /// Drops the snapshot so the next run starts fresh.
    fn teardown(&mut self);
}

/// Venue clients a strategy prices against.
#[derive(Clone)]
pub struct Venues {
    pub exchange: Arc<dyn Exchange>,
    pub quoter: Arc<dyn Quoter>,
    pub dex_trader: Arc<dyn DexTrader>,
    pub tokens: TokenSet,
    pub pool_fee: UniswapFee,
}

impl Venues {
    pub fn token(&self, symbol: Symbol) -> KeeperResult<&Token> {
        self.tokens
            .get(symbol)
            .ok_or_else(|| KeeperError::MarketDataUnavailable {
                context: format!("{symbol} token not configured"),
            })
    }

    /// Balances on both venues, ETH and USDT prices in toman, and the USDT book.
    pub async fn collect_market_data(&self) -> KeeperResult<MarketsData> {
        let (dex_balances, cex_balances, eth_rate, usdt_rate, order_book) = futures::try_join!(
            self.dex_trader.token_balances(),
            self.exchange.balances(),
            self.exchange.exchange_rate(Symbol::Eth, Symbol::Irt),
            self.exchange.exchange_rate(Symbol::Usdt, Symbol::Irt),
            self.exchange.order_book(Symbol::Usdt, Symbol::Irt),
        )?;

        let uniswap = MarketData::from_balances(&dex_balances);
        let mut nobitex = MarketData::from_balances(&cex_balances);
        nobitex.balances.insert(Symbol::Tmn, toman_balance(&cex_balances));
        nobitex.prices.insert(Symbol::Eth, eth_rate / RIAL_PER_TOMAN);
        nobitex.prices.insert(Symbol::Usdt, usdt_rate / RIAL_PER_TOMAN);

        debug!(
            eth_toman = %(eth_rate / RIAL_PER_TOMAN),
            usdt_toman = %(usdt_rate / RIAL_PER_TOMAN),
            asks = order_book.asks.len(),
            bids = order_book.bids.len(),
            "Market data collected"
        );

        Ok(MarketsData {
            uniswap,
            nobitex,
            order_book,
        })
    }
}

/// Exchange wallets hold rial; toman is derived.
fn toman_balance(balances: &[Balance]) -> Decimal {
    balances
        .iter()
        .find(|b| b.symbol == Symbol::Rls)
        .map(|b| b.balance / RIAL_PER_TOMAN)
        .unwrap_or_default()
}

pub(crate) fn snapshot<'a>(
    markets: &'a Option<MarketsData>,
    strategy: &str,
) -> KeeperResult<&'a MarketsData> {
    markets
        .as_ref()
        .ok_or_else(|| KeeperError::MarketDataUnavailable {
            context: format!("{strategy} evaluated before setup"),
        })
}
