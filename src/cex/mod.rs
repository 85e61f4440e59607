//! Centralized venue: the Nobitex order-book exchange

pub mod nobitex;
pub mod paper;
pub mod responses;

pub use nobitex::*;
pub use paper::*;

use async_trait::async_trait;
use rust_decimal::Decimal;

use crate::{
    errors::KeeperResult,
    types::{Balance, FeeType, Order, OrderBook, PlacedOrder, Symbol},
};

#[async_trait]
pub trait Exchange: Send + Sync {
    async fn order_book(&self, src: Symbol, dst: Symbol) -> KeeperResult<OrderBook>;

    /// Latest traded price of `src` in `dst`.
    async fn exchange_rate(&self, src: Symbol, dst: Symbol) -> KeeperResult<Decimal>;

    async fn balances(&self) -> KeeperResult<Vec<Balance>>;

    async fn place_order(&self, order: &Order) -> KeeperResult<PlacedOrder>;

    async fn order_status(&self, venue_order_id: i64) -> KeeperResult<Order>;

    fn fees(&self, fee_type: FeeType) -> Decimal;

    /// Smallest order value the exchange accepts, in toman.
    fn minimum_order_toman(&self) -> Decimal;
}
