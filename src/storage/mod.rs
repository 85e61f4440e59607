//! Persistence of trades, cycles and opportunity audits

pub mod journal;
pub mod memory;

pub use journal::*;
pub use memory::*;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::{
    errors::KeeperResult,
    strategy::ArbitrageOpportunity,
    types::{Cycle, CycleStatus, OnChainTransaction, Order, OrderUpdate, Pair, TransactionUpdate},
};

#[async_trait]
pub trait Store: Send + Sync {
    async fn create_transaction(&self, tx: &OnChainTransaction) -> KeeperResult<i64>;

    async fn update_transaction(&self, id: i64, update: &TransactionUpdate) -> KeeperResult<()>;

    async fn create_order(&self, order: &Order) -> KeeperResult<i64>;

    async fn update_order(&self, id: i64, update: &OrderUpdate) -> KeeperResult<()>;

    async fn create_trade(
        &self,
        pair_id: i64,
        order_id: i64,
        transaction_id: i64,
    ) -> KeeperResult<i64>;

    /// Id of the existing pair with the same assets, or of a new one.
    async fn create_pair_if_not_exist(&self, pair: &Pair) -> KeeperResult<i64>;

    async fn create_cycle(&self, cycle: &Cycle) -> KeeperResult<()>;

    async fn update_cycle(&self, id: i64, end: DateTime<Utc>, status: CycleStatus)
        -> KeeperResult<()>;

    /// Zero when no cycle has run yet.
    async fn last_cycle_id(&self) -> KeeperResult<i64>;

    async fn create_arbitrage_opportunity(
        &self,
        cycle_id: i64,
        opportunity: &ArbitrageOpportunity,
    ) -> KeeperResult<i64>;
}
