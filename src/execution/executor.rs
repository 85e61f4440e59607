//! Runs strategies and executes both legs of the chosen opportunity

use chrono::Utc;
use rust_decimal::Decimal;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{error, info, warn, Span};

use crate::{
    cex::Exchange,
    chain::IndexerHandle,
    dex::DexTrader,
    errors::{KeeperError, KeeperResult},
    network::poll_until,
    storage::Store,
    strategy::{ArbitrageOpportunity, ArbitrageStrategy, OrderCandidate},
    types::{
        Cycle, CycleStatus, OnChainTransaction, Order, OrderState, OrderUpdate, Token, TokenSet,
        TransactionStatus, TransactionUpdate, UniswapFee,
    },
    utils::print_arbitrage_opportunity,
};

#[derive(Debug, Clone)]
pub struct ExecutorSettings {
    pub pair_id: i64,
    pub pool_fee: UniswapFee,
    pub receipt_timeout: Duration,
    pub order_poll_interval: Duration,
    pub order_retry_timeout: Duration,
    /// Shared budget for a strategy's setup and evaluate.
    pub evaluation_timeout: Duration,
}

#[derive(Debug, Clone, PartialEq)]
pub enum RunOutcome {
    NoOpportunity,
    Executed {
        trade_id: i64,
        estimated_profit: Decimal,
    },
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CycleReport {
    pub executed: usize,
    pub idle: usize,
    pub failed: Vec<String>,
}

impl CycleReport {
    pub fn succeeded(&self) -> bool {
        self.failed.is_empty()
    }
}

pub struct Executor {
    strategies: Vec<Box<dyn ArbitrageStrategy>>,
    store: Arc<dyn Store>,
    exchange: Arc<dyn Exchange>,
    dex_trader: Arc<dyn DexTrader>,
    receipts: IndexerHandle,
    tokens: TokenSet,
    settings: ExecutorSettings,
    cycle_id: i64,
    span: Span,
}

impl Executor {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        store: Arc<dyn Store>,
        strategies: Vec<Box<dyn ArbitrageStrategy>>,
        exchange: Arc<dyn Exchange>,
        dex_trader: Arc<dyn DexTrader>,
        receipts: IndexerHandle,
        tokens: TokenSet,
        settings: ExecutorSettings,
        span: Span,
    ) -> Self {
        Self {
            strategies,
            store,
            exchange,
            dex_trader,
            receipts,
            tokens,
            settings,
            cycle_id: 0,
            span,
        }
    }

    pub fn set_cycle_id(&mut self, cycle_id: i64) {
        self.cycle_id = cycle_id;
    }

    pub fn cycle_id(&self) -> i64 {
        self.cycle_id
    }

    /// Opens a cycle row, runs every strategy and closes the row.
    pub async fn run_cycle(&mut self) -> KeeperResult<CycleReport> {
        let id = self.store.last_cycle_id().await? + 1;
        self.store
            .create_cycle(&Cycle {
                id,
                start: Utc::now(),
                end: None,
                status: CycleStatus::Running,
            })
            .await?;
        self.set_cycle_id(id);
        info!(parent: &self.span, cycle_id = id, "🔄 Cycle started");

        let report = self.run_all().await;
        let status = if report.succeeded() {
            CycleStatus::Success
        } else {
            CycleStatus::Failed
        };
        self.store.update_cycle(id, Utc::now(), status).await?;

        info!(
            parent: &self.span,
            cycle_id = id,
            executed = report.executed,
            idle = report.idle,
            failed = report.failed.len(),
            "Cycle finished"
        );
        Ok(report)
    }

    /// Runs each strategy in turn. One strategy failing does not stop the rest.
    pub async fn run_all(&mut self) -> CycleReport {
        let mut strategies = std::mem::take(&mut self.strategies);
        let mut report = CycleReport::default();

        for strategy in strategies.iter_mut() {
            let name = strategy.name().to_string();
            match self.run(strategy.as_mut()).await {
                Ok(RunOutcome::Executed { .. }) => report.executed += 1,
                Ok(RunOutcome::NoOpportunity) => report.idle += 1,
                Err(e) => {
                    error!(parent: &self.span, strategy = %name, "❌ Strategy run failed: {}", e);
                    report.failed.push(name);
                }
            }
        }

        self.strategies = strategies;
        report
    }

    /// Setup, evaluate and execute one strategy. Teardown runs whatever the outcome.
    pub async fn run(&self, strategy: &mut dyn ArbitrageStrategy) -> KeeperResult<RunOutcome> {
        let result = self.run_strategy(strategy).await;
        strategy.teardown();
        result
    }

    async fn run_strategy(&self, strategy: &mut dyn ArbitrageStrategy) -> KeeperResult<RunOutcome> {
        let name = strategy.name().to_string();

        let deadline = Instant::now() + self.settings.evaluation_timeout;
        tokio::time::timeout_at(deadline, strategy.setup())
            .await
            .map_err(|_| self.evaluation_overrun(&name, "setup"))?
            .map_err(|e| e.in_strategy(&name, "setup"))?;

        let evaluated = tokio::time::timeout_at(deadline, strategy.evaluate())
            .await
            .map_err(|_| self.evaluation_overrun(&name, "evaluate"))?;
        let opportunity = match evaluated {
            Ok(Some(opportunity)) => opportunity,
            Ok(None) => {
                info!(parent: &self.span, strategy = %name, "No profitable opportunity");
                return Ok(RunOutcome::NoOpportunity);
            }
            Err(e) if e.is_insufficient_balance() => {
                info!(parent: &self.span, strategy = %name, "Skipping: {}", e);
                return Ok(RunOutcome::NoOpportunity);
            }
            Err(e) => return Err(e.in_strategy(&name, "evaluate")),
        };

        print_arbitrage_opportunity(&opportunity);
        self.execute(&name, &opportunity).await
    }

    fn evaluation_overrun(&self, name: &str, phase: &'static str) -> KeeperError {
        KeeperError::DeadlineExceeded {
            context: format!("{phase} of {name}"),
            after: self.settings.evaluation_timeout,
        }
        .in_strategy(name, phase)
    }

    async fn execute(
        &self,
        name: &str,
        opportunity: &ArbitrageOpportunity,
    ) -> KeeperResult<RunOutcome> {
        let transaction_id = self
            .execute_dex(&opportunity.dex_leg)
            .await
            .map_err(|e| e.in_strategy(name, "execute dex leg"))?;

        let order_id = self.execute_cex(&opportunity.cex_leg).await.map_err(|e| {
            error!(
                parent: &self.span,
                strategy = %name,
                transaction_id,
                "🚨 DEX leg settled but CEX leg failed, position is unhedged"
            );
            e.in_strategy(name, "execute cex leg")
        })?;

        let trade_id = self
            .store
            .create_trade(self.settings.pair_id, order_id, transaction_id)
            .await?;
        self.store
            .create_arbitrage_opportunity(self.cycle_id, opportunity)
            .await?;

        let estimated_profit = opportunity.estimated_profit();
        info!(
            parent: &self.span,
            strategy = %name,
            trade_id,
            transaction_id,
            order_id,
            profit = %estimated_profit,
            "✅ Arbitrage executed"
        );
        Ok(RunOutcome::Executed {
            trade_id,
            estimated_profit,
        })
    }

    fn token(&self, symbol: crate::types::Symbol) -> KeeperResult<&Token> {
        self.tokens
            .get(symbol)
            .ok_or_else(|| KeeperError::MarketDataUnavailable {
                context: format!("{symbol} token not configured"),
            })
    }

    /// Submits the swap, records it as pending and waits for its receipt.
    ///
    /// When the receipt never arrives the pending row is left untouched.
    /// Returns the stored transaction id.
    pub async fn execute_dex(&self, leg: &OrderCandidate) -> KeeperResult<i64> {
        let token_in = self.token(leg.source())?;
        let token_out = self.token(leg.destination())?;

        let submitted = self
            .dex_trader
            .trade(token_in, token_out, self.settings.pool_fee, leg.amount_in, leg.min_out)
            .await?;
        info!(
            parent: &self.span,
            tx_hash = %submitted.tx_hash,
            amount_in = %leg.amount_in,
            min_out = %leg.min_out,
            "📤 Swap submitted"
        );

        let transaction_id = self
            .store
            .create_transaction(&OnChainTransaction::pending(&submitted))
            .await?;

        let (receipt, header) = self
            .receipts
            .wait_for_receipt(submitted.tx_hash, self.settings.receipt_timeout)
            .await?;

        let status = TransactionStatus::from_receipt(receipt.success);
        self.store
            .update_transaction(
                transaction_id,
                &TransactionUpdate {
                    gas_used: receipt.gas_used,
                    block_number: receipt.block_number,
                    timestamp: header.time(),
                    status,
                },
            )
            .await?;

        if !receipt.success {
            return Err(KeeperError::Contract {
                contract: self.dex_trader.address(),
                context: format!("trade {} reverted", submitted.tx_hash),
                source: anyhow::anyhow!("receipt status failed in block {}", receipt.block_number),
            });
        }

        info!(
            parent: &self.span,
            tx_hash = %submitted.tx_hash,
            block = receipt.block_number,
            gas_used = receipt.gas_used,
            "⛓️ Swap confirmed"
        );
        Ok(transaction_id)
    }

    /// Places a market order and polls it to a terminal state.
    ///
    /// Filled and partially filled orders succeed; a canceled order is
    /// persisted and then reported as an error. Returns the stored order id.
    pub async fn execute_cex(&self, leg: &OrderCandidate) -> KeeperResult<i64> {
        let mut order = Order::market_draft(leg.side, leg.source(), leg.destination(), leg.amount());
        let placed = self.exchange.place_order(&order).await?;

        order.venue_order_id = placed.venue_order_id;
        order.created_at = Some(placed.created_at);
        order.status = OrderState::Open;
        let order_id = self.store.create_order(&order).await?;
        info!(
            parent: &self.span,
            venue_order_id = placed.venue_order_id,
            side = %order.side,
            amount = %order.amount,
            "📤 Order placed"
        );

        let venue_order_id = placed.venue_order_id;
        let exchange = &self.exchange;
        let span = &self.span;
        let deadline = Instant::now() + self.settings.order_retry_timeout;
        let settled = poll_until(
            self.settings.order_poll_interval,
            deadline,
            &format!("order {venue_order_id} fill"),
            move || async move {
                match exchange.order_status(venue_order_id).await {
                    Ok(status) if status.status.is_terminal() => Ok(Some(status)),
                    Ok(_) => Ok(None),
                    Err(e) => {
                        warn!(parent: span, venue_order_id, "Order status lookup failed: {}", e);
                        Ok(None)
                    }
                }
            },
        )
        .await?;

        self.store
            .update_order(order_id, &OrderUpdate::from(&settled))
            .await?;

        if settled.status == OrderState::Canceled {
            return Err(KeeperError::OrderCanceled {
                order_id: venue_order_id,
            });
        }

        info!(
            parent: &self.span,
            venue_order_id,
            status = ?settled.status,
            matched = %settled.matched_amount,
            "💱 Order settled"
        );
        Ok(order_id)
    }
}
