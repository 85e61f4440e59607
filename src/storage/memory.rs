//! In-process store with an optional JSONL journal

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::RwLock;
use tracing::warn;

use super::{Journal, Store};
use crate::{
    errors::{KeeperError, KeeperResult},
    strategy::{ArbitrageOpportunity, OpportunityRecord},
    types::{
        Cycle, CycleStatus, OnChainTransaction, Order, OrderUpdate, Pair, Trade,
        TransactionUpdate,
    },
};

#[derive(Debug, Clone, PartialEq)]
pub struct StoredOpportunity {
    pub id: i64,
    pub cycle_id: i64,
    pub opportunity: ArbitrageOpportunity,
}

#[derive(Default)]
struct Tables {
    transactions: Vec<OnChainTransaction>,
    orders: Vec<Order>,
    pairs: Vec<Pair>,
    trades: Vec<Trade>,
    cycles: Vec<Cycle>,
    opportunities: Vec<StoredOpportunity>,
}

/// Ids are 1-based row positions.
#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
    journal: Option<Journal>,
}

#[derive(Serialize)]
struct JournalEntry<'a, T: Serialize> {
    action: &'static str,
    id: i64,
    record: &'a T,
}

fn next_id(len: usize) -> i64 {
    len as i64 + 1
}

fn not_found(kind: &str, id: i64) -> KeeperError {
    KeeperError::Store {
        context: format!("{kind} {id} not found"),
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_journal(journal: Journal) -> Self {
        Self {
            tables: RwLock::default(),
            journal: Some(journal),
        }
    }

    /// Journal failures never fail the write they describe.
    fn record<T: Serialize>(&self, stream: &str, action: &'static str, id: i64, record: &T) {
        if let Some(journal) = &self.journal {
            if let Err(e) = journal.append(stream, &JournalEntry { action, id, record }) {
                warn!(stream, id, error = %e, "Failed to journal store write");
            }
        }
    }

    pub async fn transactions(&self) -> Vec<OnChainTransaction> {
        self.tables.read().await.transactions.clone()
    }

    pub async fn orders(&self) -> Vec<Order> {
        self.tables.read().await.orders.clone()
    }

    pub async fn trades(&self) -> Vec<Trade> {
        self.tables.read().await.trades.clone()
    }

    pub async fn cycles(&self) -> Vec<Cycle> {
        self.tables.read().await.cycles.clone()
    }

    pub async fn opportunities(&self) -> Vec<StoredOpportunity> {
        self.tables.read().await.opportunities.clone()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn create_transaction(&self, tx: &OnChainTransaction) -> KeeperResult<i64> {
        let mut tables = self.tables.write().await;
        let id = next_id(tables.transactions.len());
        let row = OnChainTransaction { id, ..tx.clone() };
        self.record("transactions", "create", id, &row);
        tables.transactions.push(row);
        Ok(id)
    }

    async fn update_transaction(&self, id: i64, update: &TransactionUpdate) -> KeeperResult<()> {
        let mut tables = self.tables.write().await;
        let row = tables
            .transactions
            .iter_mut()
            .find(|t| t.id == id)
            .ok_or_else(|| not_found("transaction", id))?;
        row.gas_used = Some(update.gas_used);
        row.block_number = Some(update.block_number);
        row.confirmed_at = Some(update.timestamp);
        row.status = update.status;
        self.record("transactions", "update", id, update);
        Ok(())
    }

    async fn create_order(&self, order: &Order) -> KeeperResult<i64> {
        let mut tables = self.tables.write().await;
        let id = next_id(tables.orders.len());
        let row = Order { id, ..order.clone() };
        self.record("orders", "create", id, &row);
        tables.orders.push(row);
        Ok(id)
    }

    async fn update_order(&self, id: i64, update: &OrderUpdate) -> KeeperResult<()> {
        let mut tables = self.tables.write().await;
        let row = tables
            .orders
            .iter_mut()
            .find(|o| o.id == id)
            .ok_or_else(|| not_found("order", id))?;
        row.status = update.status;
        row.price = update.price;
        row.total_price = update.total_price;
        row.total_order_price = update.total_order_price;
        row.fee = update.fee;
        row.matched_amount = update.matched_amount;
        row.unmatched_amount = update.unmatched_amount;
        if update.created_at.is_some() {
            row.created_at = update.created_at;
        }
        self.record("orders", "update", id, update);
        Ok(())
    }

    async fn create_trade(
        &self,
        pair_id: i64,
        order_id: i64,
        transaction_id: i64,
    ) -> KeeperResult<i64> {
        let mut tables = self.tables.write().await;
        let id = next_id(tables.trades.len());
        let row = Trade {
            id,
            pair_id,
            order_id,
            transaction_id,
            created_at: Utc::now(),
        };
        self.record("trades", "create", id, &row);
        tables.trades.push(row);
        Ok(id)
    }

    async fn create_pair_if_not_exist(&self, pair: &Pair) -> KeeperResult<i64> {
        let mut tables = self.tables.write().await;
        if let Some(existing) = tables
            .pairs
            .iter()
            .find(|p| p.base_asset == pair.base_asset && p.quote_asset == pair.quote_asset)
        {
            return Ok(existing.id);
        }
        let id = next_id(tables.pairs.len());
        let row = Pair { id, ..pair.clone() };
        self.record("pairs", "create", id, &row);
        tables.pairs.push(row);
        Ok(id)
    }

    async fn create_cycle(&self, cycle: &Cycle) -> KeeperResult<()> {
        let mut tables = self.tables.write().await;
        if tables.cycles.iter().any(|c| c.id == cycle.id) {
            return Err(KeeperError::Store {
                context: format!("cycle {} already exists", cycle.id),
            });
        }
        self.record("cycles", "create", cycle.id, cycle);
        tables.cycles.push(cycle.clone());
        Ok(())
    }

    async fn update_cycle(
        &self,
        id: i64,
        end: DateTime<Utc>,
        status: CycleStatus,
    ) -> KeeperResult<()> {
        let mut tables = self.tables.write().await;
        let row = tables
            .cycles
            .iter_mut()
            .find(|c| c.id == id)
            .ok_or_else(|| not_found("cycle", id))?;
        row.end = Some(end);
        row.status = status;
        let snapshot = row.clone();
        self.record("cycles", "update", id, &snapshot);
        Ok(())
    }

    async fn last_cycle_id(&self) -> KeeperResult<i64> {
        Ok(self
            .tables
            .read()
            .await
            .cycles
            .iter()
            .map(|c| c.id)
            .max()
            .unwrap_or(0))
    }

    async fn create_arbitrage_opportunity(
        &self,
        cycle_id: i64,
        opportunity: &ArbitrageOpportunity,
    ) -> KeeperResult<i64> {
        let mut tables = self.tables.write().await;
        let id = next_id(tables.opportunities.len());
        if let Some(journal) = &self.journal {
            if let Err(e) = journal.save_opportunity(&OpportunityRecord::new(cycle_id, opportunity)) {
                warn!(cycle_id, error = %e, "Failed to write opportunity audit record");
            }
        }
        tables.opportunities.push(StoredOpportunity {
            id,
            cycle_id,
            opportunity: opportunity.clone(),
        });
        Ok(id)
    }
}
