//! Opportunity model shared by all strategies

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use uuid::Uuid;

use crate::{
    config::RIAL_PER_TOMAN,
    errors::{KeeperError, KeeperResult},
    types::{Balance, OrderBook, Side, Symbol},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Venue {
    UniswapV3,
    Nobitex,
}

impl fmt::Display for Venue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Venue::UniswapV3 => f.write_str("UniswapV3"),
            Venue::Nobitex => f.write_str("Nobitex"),
        }
    }
}

/// Markets the keeper trades. `token0` is the base asset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MarketPair {
    DaiZar,
    UsdtTmn,
}

impl MarketPair {
    pub fn token0(&self) -> Symbol {
        match self {
            MarketPair::DaiZar => Symbol::Dai,
            MarketPair::UsdtTmn => Symbol::Usdt,
        }
    }

    pub fn token1(&self) -> Symbol {
        match self {
            MarketPair::DaiZar => Symbol::Zar,
            MarketPair::UsdtTmn => Symbol::Tmn,
        }
    }
}

impl fmt::Display for MarketPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.token0(), self.token1())
    }
}

/// Costs in toman.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Cost {
    pub network_fee: Decimal,
    pub outgoing_value: Decimal,
}

impl Cost {
    pub fn total(&self) -> Decimal {
        self.network_fee + self.outgoing_value
    }
}

/// One leg of a prospective trade. Monetary estimates are in toman.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderCandidate {
    pub side: Side,
    pub pair: MarketPair,
    pub venue: Venue,
    pub amount_in: Decimal,
    pub amount_out: Decimal,
    pub min_out: Decimal,
    pub estimated_cost: Cost,
    pub estimated_revenue: Decimal,
}

impl OrderCandidate {
    pub fn estimated_profit(&self) -> Decimal {
        self.estimated_revenue - self.estimated_cost.total()
    }

    /// Token the venue is told to trade from. On Uniswap this is the swap input;
    /// on Nobitex it is the order's base currency (`srcCurrency`) for either side.
    pub fn source(&self) -> Symbol {
        match (self.venue, self.side) {
            (Venue::Nobitex, _) => self.pair.token0(),
            (Venue::UniswapV3, Side::Buy) => self.pair.token1(),
            (Venue::UniswapV3, Side::Sell) => self.pair.token0(),
        }
    }

    /// Counterpart of [`Self::source`]: swap output, or the Nobitex quote currency.
    pub fn destination(&self) -> Symbol {
        match (self.venue, self.side) {
            (Venue::Nobitex, _) => self.pair.token1(),
            (Venue::UniswapV3, Side::Buy) => self.pair.token0(),
            (Venue::UniswapV3, Side::Sell) => self.pair.token1(),
        }
    }

    /// Order size in the units the venue expects.
    pub fn amount(&self) -> Decimal {
        match self.side {
            Side::Buy => self.min_out,
            Side::Sell => self.amount_in,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArbitrageOpportunity {
    pub strategy: String,
    pub quantity: Decimal,
    pub dex_leg: OrderCandidate,
    pub cex_leg: OrderCandidate,
}

impl ArbitrageOpportunity {
    pub fn estimated_profit(&self) -> Decimal {
        self.dex_leg.estimated_profit() + self.cex_leg.estimated_profit()
    }

    pub fn total_cost(&self) -> Decimal {
        self.dex_leg.estimated_cost.total() + self.cex_leg.estimated_cost.total()
    }
}

/// Audit form of an opportunity, with the derived figures spelled out.
#[derive(Debug, Serialize)]
pub struct OpportunityRecord<'a> {
    pub id: Uuid,
    pub cycle_id: i64,
    pub estimated_profit: Decimal,
    pub total_cost: Decimal,
    #[serde(flatten)]
    pub opportunity: &'a ArbitrageOpportunity,
}

impl<'a> OpportunityRecord<'a> {
    pub fn new(cycle_id: i64, opportunity: &'a ArbitrageOpportunity) -> Self {
        Self {
            id: Uuid::new_v4(),
            cycle_id,
            estimated_profit: opportunity.estimated_profit(),
            total_cost: opportunity.total_cost(),
            opportunity,
        }
    }
}

#[derive(Debug, Clone)]
pub struct StrategyConfig {
    pub start_qty: Decimal,
    pub step_qty: Decimal,
    /// Minimum total profit, in toman, worth executing.
    pub profit_threshold: Decimal,
    pub slippage: Decimal,
}

/// Prices (toman per unit) and balances on one venue.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MarketData {
    pub prices: HashMap<Symbol, Decimal>,
    pub balances: HashMap<Symbol, Decimal>,
}

impl MarketData {
    pub fn from_balances(balances: &[Balance]) -> Self {
        Self {
            prices: HashMap::new(),
            balances: balances.iter().map(|b| (b.symbol, b.balance)).collect(),
        }
    }

    pub fn price(&self, symbol: Symbol) -> KeeperResult<Decimal> {
        match self.prices.get(&symbol) {
            Some(price) if *price > Decimal::ZERO => Ok(*price),
            Some(price) => Err(KeeperError::InvalidPrice {
                context: format!("{symbol} price"),
                price: *price,
            }),
            None => Err(KeeperError::MarketDataUnavailable {
                context: format!("no {symbol} price"),
            }),
        }
    }

    pub fn balance(&self, symbol: Symbol) -> Decimal {
        self.balances.get(&symbol).copied().unwrap_or_default()
    }
}

/// Snapshot of both venues taken at the start of a run.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MarketsData {
    pub uniswap: MarketData,
    pub nobitex: MarketData,
    /// USDT/IRT book, prices in rial.
    pub order_book: OrderBook,
}

impl MarketsData {
    /// Volume-weighted toman price for taking `qty` USDT on `side`.
    pub fn usdt_book_price(&self, side: Side, qty: Decimal) -> Decimal {
        self.order_book.average_price(side, qty) / RIAL_PER_TOMAN
    }
}
