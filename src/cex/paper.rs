//! Simulated exchange for testnet runs
//!
//! Keeps balances in memory and fills market orders immediately at the
//! volume-weighted price of the current book. Market data can come from a live
//! client so that testnet cycles see real prices.

use async_trait::async_trait;
use chrono::Utc;
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::info;

use super::Exchange;
use crate::{
    config::{NOBITEX_MAKER_FEE, NOBITEX_TAKER_FEE, RIAL_PER_TOMAN},
    errors::{KeeperError, KeeperResult},
    types::{Balance, FeeType, Order, OrderBook, OrderState, PlacedOrder, Side, Symbol},
};

#[derive(Default)]
struct PaperState {
    balances: HashMap<Symbol, Decimal>,
    books: HashMap<(Symbol, Symbol), OrderBook>,
    rates: HashMap<(Symbol, Symbol), Decimal>,
    orders: Vec<Order>,
    next_id: i64,
}

pub struct PaperExchange {
    market: Option<Arc<dyn Exchange>>,
    minimum_order_toman: Decimal,
    state: Mutex<PaperState>,
}

impl PaperExchange {
    pub fn new(minimum_order_toman: Decimal) -> Self {
        Self {
            market: None,
            minimum_order_toman,
            state: Mutex::new(PaperState::default()),
        }
    }

    /// Prices and books are read from `market`; balances and orders stay local.
    pub fn with_market_data(market: Arc<dyn Exchange>, minimum_order_toman: Decimal) -> Self {
        Self {
            market: Some(market),
            ..Self::new(minimum_order_toman)
        }
    }

    pub async fn set_balance(&self, symbol: Symbol, amount: Decimal) {
        self.state.lock().await.balances.insert(symbol, amount);
    }

    /// Opening wallet for a paper session. Toman is held in the rial wallet.
    pub async fn fund(&self, usdt: Decimal, toman: Decimal) {
        let mut state = self.state.lock().await;
        state.balances.insert(Symbol::Usdt, usdt);
        state.balances.insert(Symbol::Rls, toman * RIAL_PER_TOMAN);
    }

    pub async fn set_order_book(&self, src: Symbol, dst: Symbol, book: OrderBook) {
        self.state.lock().await.books.insert((src, dst), book);
    }

    pub async fn set_rate(&self, src: Symbol, dst: Symbol, rate: Decimal) {
        self.state.lock().await.rates.insert((src, dst), rate);
    }

    pub async fn balance(&self, symbol: Symbol) -> Decimal {
        self.state
            .lock()
            .await
            .balances
            .get(&symbol)
            .copied()
            .unwrap_or_default()
    }
}

/// Rial-quoted books settle into the rial wallet.
fn settlement_symbol(symbol: Symbol) -> Symbol {
    match symbol {
        Symbol::Tmn | Symbol::Irt => Symbol::Rls,
        other => other,
    }
}

fn market_symbol(symbol: Symbol) -> Symbol {
    match symbol {
        Symbol::Tmn | Symbol::Rls => Symbol::Irt,
        other => other,
    }
}

#[async_trait]
impl Exchange for PaperExchange {
    async fn order_book(&self, src: Symbol, dst: Symbol) -> KeeperResult<OrderBook> {
        if let Some(market) = &self.market {
            return market.order_book(src, dst).await;
        }
        Ok(self
            .state
            .lock()
            .await
            .books
            .get(&(src, dst))
            .cloned()
            .unwrap_or_default())
    }

    async fn exchange_rate(&self, src: Symbol, dst: Symbol) -> KeeperResult<Decimal> {
        if let Some(market) = &self.market {
            return market.exchange_rate(src, dst).await;
        }
        self.state
            .lock()
            .await
            .rates
            .get(&(src, dst))
            .copied()
            .ok_or_else(|| KeeperError::Exchange {
                context: "paper exchange rate".to_string(),
                status: "missing".to_string(),
                message: format!("no rate for {src}/{dst}"),
            })
    }

    async fn balances(&self) -> KeeperResult<Vec<Balance>> {
        Ok(self
            .state
            .lock()
            .await
            .balances
            .iter()
            .map(|(symbol, balance)| Balance {
                symbol: *symbol,
                balance: *balance,
            })
            .collect())
    }

    async fn place_order(&self, order: &Order) -> KeeperResult<PlacedOrder> {
        let book = self
            .order_book(order.src_currency, market_symbol(order.dst_currency))
            .await?;
        let rial_price = book.average_price(order.side, order.amount);
        if rial_price <= Decimal::ZERO {
            return Err(KeeperError::InvalidPrice {
                context: format!("paper fill of {} {}", order.amount, order.src_currency),
                price: rial_price,
            });
        }

        let base = order.src_currency;
        let quote = settlement_symbol(order.dst_currency);
        let notional = rial_price * order.amount;
        let fee = notional * NOBITEX_TAKER_FEE;

        let mut state = self.state.lock().await;
        let (debit_symbol, debit, credit_symbol, credit) = match order.side {
            Side::Buy => (quote, notional + fee, base, order.amount),
            Side::Sell => (base, order.amount, quote, notional - fee),
        };
        let available = state.balances.get(&debit_symbol).copied().unwrap_or_default();
        if available < debit {
            return Err(KeeperError::InsufficientBalance {
                symbol: debit_symbol,
                required: debit,
                available,
            });
        }
        *state.balances.entry(debit_symbol).or_default() -= debit;
        *state.balances.entry(credit_symbol).or_default() += credit;

        state.next_id += 1;
        let created_at = Utc::now();
        let filled = Order {
            venue_order_id: state.next_id,
            dst_currency: quote,
            price: rial_price,
            total_price: notional,
            total_order_price: notional,
            matched_amount: order.amount,
            unmatched_amount: Decimal::ZERO,
            fee: fee / RIAL_PER_TOMAN,
            status: OrderState::Filled,
            created_at: Some(created_at),
            ..order.clone()
        };
        state.orders.push(filled);

        info!(
            venue_order_id = state.next_id,
            side = %order.side,
            amount = %order.amount,
            price = %rial_price,
            "📝 Paper order filled"
        );
        Ok(PlacedOrder {
            venue_order_id: state.next_id,
            created_at,
        })
    }

    async fn order_status(&self, venue_order_id: i64) -> KeeperResult<Order> {
        self.state
            .lock()
            .await
            .orders
            .iter()
            .find(|o| o.venue_order_id == venue_order_id)
            .cloned()
            .ok_or_else(|| KeeperError::Exchange {
                context: "paper order status".to_string(),
                status: "not_found".to_string(),
                message: format!("order {venue_order_id} not found"),
            })
    }

    fn fees(&self, fee_type: FeeType) -> Decimal {
        match fee_type {
            FeeType::Maker => NOBITEX_MAKER_FEE,
            FeeType::Taker => NOBITEX_TAKER_FEE,
        }
    }

    fn minimum_order_toman(&self) -> Decimal {
        self.minimum_order_toman
    }
}
