#![allow(dead_code)]

use alloy::primitives::{Address, B256, U256};
use async_trait::async_trait;
use chrono::Utc;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::Span;

use zarban_arb_keeper::{
    cex::{Exchange, PaperExchange},
    chain::{ChainClient, Checkpoint, IndexerSettings, PollingIndexer},
    dex::{DexTrader, Quoter},
    errors::{KeeperError, KeeperResult},
    strategy::{StrategyConfig, Venues},
    types::*,
};

pub const GENESIS_TIME: u64 = 1_700_000_000;

pub fn block_hash(number: u64) -> B256 {
    B256::from(U256::from(number))
}

pub fn header(number: u64) -> BlockHeader {
    BlockHeader {
        number,
        hash: block_hash(number),
        timestamp: GENESIS_TIME + number,
    }
}

#[derive(Default)]
struct ChainState {
    txs: HashMap<u64, Vec<B256>>,
    logs: HashMap<u64, Vec<ChainLog>>,
    receipts: HashMap<B256, TxReceipt>,
    failing_block: Option<u64>,
}

/// Synthetic chain: every block up to the head exists.
pub struct MockChain {
    head: AtomicU64,
    reverting: AtomicBool,
    state: Mutex<ChainState>,
}

impl MockChain {
    pub fn new(head: u64) -> Arc<Self> {
        Arc::new(Self {
            head: AtomicU64::new(head),
            reverting: AtomicBool::new(false),
            state: Mutex::new(ChainState::default()),
        })
    }

    pub fn head(&self) -> u64 {
        self.head.load(Ordering::SeqCst)
    }

    pub fn set_head(&self, head: u64) {
        self.head.store(head, Ordering::SeqCst);
    }

    /// Receipts of transactions mined from now on report a revert.
    pub fn revert_mined_txs(&self) {
        self.reverting.store(true, Ordering::SeqCst);
    }

    /// Includes `tx_hash` in `block`; the receipt succeeds unless reverting.
    pub fn mine(&self, block: u64, tx_hash: B256) {
        let success = !self.reverting.load(Ordering::SeqCst);
        let mut state = self.state.lock().unwrap();
        state.txs.entry(block).or_default().push(tx_hash);
        state.receipts.insert(
            tx_hash,
            TxReceipt {
                transaction_hash: tx_hash,
                block_number: block,
                gas_used: 180_000,
                effective_gas_price: 10_000_000,
                success,
            },
        );
    }

    pub fn add_log(&self, log: ChainLog) {
        let mut state = self.state.lock().unwrap();
        state.logs.entry(log.block_number).or_default().push(log);
    }

    pub fn fail_block(&self, number: u64) {
        self.state.lock().unwrap().failing_block = Some(number);
    }
}

#[async_trait]
impl ChainClient for MockChain {
    async fn block_number(&self) -> KeeperResult<u64> {
        Ok(self.head())
    }

    async fn block_by_number(&self, number: u64) -> KeeperResult<Option<BlockInfo>> {
        let state = self.state.lock().unwrap();
        if state.failing_block == Some(number) {
            return Err(KeeperError::chain(
                format!("get block {number}"),
                anyhow::anyhow!("connection reset"),
            ));
        }
        if number > self.head() {
            return Ok(None);
        }
        Ok(Some(BlockInfo {
            header: header(number),
            transactions: state.txs.get(&number).cloned().unwrap_or_default(),
        }))
    }

    async fn logs_in_block(&self, number: u64) -> KeeperResult<Vec<ChainLog>> {
        Ok(self
            .state
            .lock()
            .unwrap()
            .logs
            .get(&number)
            .cloned()
            .unwrap_or_default())
    }

    async fn transaction_receipt(&self, tx_hash: B256) -> KeeperResult<Option<TxReceipt>> {
        Ok(self.state.lock().unwrap().receipts.get(&tx_hash).cloned())
    }
}

/// Checkpoint that remembers every update.
pub struct RecordingCheckpoint {
    value: AtomicU64,
    updates: Mutex<Vec<u64>>,
}

impl RecordingCheckpoint {
    pub fn at(value: u64) -> Arc<Self> {
        Arc::new(Self {
            value: AtomicU64::new(value),
            updates: Mutex::new(Vec::new()),
        })
    }

    pub fn updates(&self) -> Vec<u64> {
        self.updates.lock().unwrap().clone()
    }
}

#[async_trait]
impl Checkpoint for RecordingCheckpoint {
    async fn exists(&self) -> KeeperResult<bool> {
        Ok(true)
    }

    async fn create(&self) -> KeeperResult<()> {
        Ok(())
    }

    async fn read(&self) -> KeeperResult<u64> {
        Ok(self.value.load(Ordering::SeqCst))
    }

    async fn update(&self, value: u64) -> KeeperResult<()> {
        self.value.store(value, Ordering::SeqCst);
        self.updates.lock().unwrap().push(value);
        Ok(())
    }
}

pub fn indexer(
    chain: Arc<MockChain>,
    checkpoint: Arc<dyn Checkpoint>,
    batch_size: u64,
) -> PollingIndexer {
    PollingIndexer::new(
        chain,
        checkpoint,
        IndexerSettings {
            batch_size,
            pool_size: 4,
            poll_interval: Duration::from_millis(200),
        },
        Span::none(),
    )
}

/// Prices every quantity with the same closure and records what was asked.
pub struct MockQuoter {
    price: Box<dyn Fn(Decimal) -> Decimal + Send + Sync>,
    quoted: Mutex<Vec<Decimal>>,
}

impl MockQuoter {
    pub fn new(price: impl Fn(Decimal) -> Decimal + Send + Sync + 'static) -> Arc<Self> {
        Arc::new(Self {
            price: Box::new(price),
            quoted: Mutex::new(Vec::new()),
        })
    }

    pub fn max_quoted(&self) -> Option<Decimal> {
        self.quoted.lock().unwrap().iter().copied().max()
    }

    fn quote(&self, amount: Decimal) -> Decimal {
        self.quoted.lock().unwrap().push(amount);
        (self.price)(amount)
    }
}

#[async_trait]
impl Quoter for MockQuoter {
    async fn quote_exact_input(
        &self,
        _token_in: &Token,
        _token_out: &Token,
        _fee: UniswapFee,
        amount_in: Decimal,
    ) -> KeeperResult<Decimal> {
        Ok(self.quote(amount_in))
    }

    async fn quote_exact_output(
        &self,
        _token_in: &Token,
        _token_out: &Token,
        _fee: UniswapFee,
        amount_out: Decimal,
    ) -> KeeperResult<Decimal> {
        Ok(self.quote(amount_out))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RecordedTrade {
    pub token_in: Symbol,
    pub token_out: Symbol,
    pub amount_in: Decimal,
    pub min_out: Decimal,
}

/// Trades are mined into the chain's head block when a chain is attached.
pub struct MockDexTrader {
    pub gas_fee_eth: Decimal,
    balances: Vec<Balance>,
    chain: Option<Arc<MockChain>>,
    trades: Mutex<Vec<RecordedTrade>>,
    nonce: AtomicUsize,
}

impl MockDexTrader {
    pub fn new(zar: Decimal, dai: Decimal) -> Self {
        Self {
            gas_fee_eth: dec!(0.00001),
            balances: vec![
                Balance {
                    symbol: Symbol::Zar,
                    balance: zar,
                },
                Balance {
                    symbol: Symbol::Dai,
                    balance: dai,
                },
            ],
            chain: None,
            trades: Mutex::new(Vec::new()),
            nonce: AtomicUsize::new(0),
        }
    }

    pub fn mining_on(mut self, chain: Arc<MockChain>) -> Self {
        self.chain = Some(chain);
        self
    }

    pub fn trades(&self) -> Vec<RecordedTrade> {
        self.trades.lock().unwrap().clone()
    }
}

#[async_trait]
impl DexTrader for MockDexTrader {
    fn address(&self) -> Address {
        Address::repeat_byte(0xde)
    }

    async fn trade(
        &self,
        token_in: &Token,
        token_out: &Token,
        _fee: UniswapFee,
        amount_in: Decimal,
        min_out: Decimal,
    ) -> KeeperResult<SubmittedTx> {
        self.trades.lock().unwrap().push(RecordedTrade {
            token_in: token_in.symbol,
            token_out: token_out.symbol,
            amount_in,
            min_out,
        });

        let nonce = self.nonce.fetch_add(1, Ordering::SeqCst) as u8;
        let tx_hash = B256::repeat_byte(0xa0 + nonce);
        if let Some(chain) = &self.chain {
            chain.mine(chain.head(), tx_hash);
        }

        Ok(SubmittedTx {
            tx_hash,
            from: Address::repeat_byte(0x01),
            to: self.address(),
            value: U256::ZERO,
            gas_price: 10_000_000,
            gas_limit: 250_000,
        })
    }

    async fn estimate_trade_gas_fee(
        &self,
        _token_in: &Token,
        _token_out: &Token,
        _fee: UniswapFee,
        _amount_in: Decimal,
        _min_out: Decimal,
    ) -> KeeperResult<Decimal> {
        Ok(self.gas_fee_eth)
    }

    async fn token_balances(&self) -> KeeperResult<Vec<Balance>> {
        Ok(self.balances.clone())
    }
}

/// Accepts orders that never fill: they stay Open unless `canceling`.
#[derive(Default)]
pub struct StuckExchange {
    pub status_calls: AtomicUsize,
    canceling: bool,
}

impl StuckExchange {
    pub fn canceling() -> Self {
        Self {
            canceling: true,
            ..Self::default()
        }
    }
}

#[async_trait]
impl Exchange for StuckExchange {
    async fn order_book(&self, _src: Symbol, _dst: Symbol) -> KeeperResult<OrderBook> {
        Ok(OrderBook::default())
    }

    async fn exchange_rate(&self, _src: Symbol, _dst: Symbol) -> KeeperResult<Decimal> {
        Ok(dec!(600000))
    }

    async fn balances(&self) -> KeeperResult<Vec<Balance>> {
        Ok(Vec::new())
    }

    async fn place_order(&self, _order: &Order) -> KeeperResult<PlacedOrder> {
        Ok(PlacedOrder {
            venue_order_id: 77,
            created_at: Utc::now(),
        })
    }

    async fn order_status(&self, venue_order_id: i64) -> KeeperResult<Order> {
        self.status_calls.fetch_add(1, Ordering::SeqCst);
        let mut order = Order::market_draft(Side::Sell, Symbol::Usdt, Symbol::Tmn, dec!(50));
        order.venue_order_id = venue_order_id;
        order.status = if self.canceling {
            OrderState::Canceled
        } else {
            OrderState::Open
        };
        Ok(order)
    }

    fn fees(&self, _fee_type: FeeType) -> Decimal {
        dec!(0.0025)
    }

    fn minimum_order_toman(&self) -> Decimal {
        dec!(300000)
    }
}

pub fn tokens() -> TokenSet {
    TokenSet::new([
        Token {
            address: ZAR_ARBITRUM,
            symbol: Symbol::Zar,
            decimals: TOKEN_DECIMALS,
        },
        Token {
            address: DAI_ARBITRUM,
            symbol: Symbol::Dai,
            decimals: TOKEN_DECIMALS,
        },
    ])
}

/// USDT at 60,000 TMN (600,000 IRR) with deep books on both sides, ETH at 1e8 TMN.
pub async fn paper_exchange(usdt: Decimal, rial: Decimal) -> Arc<PaperExchange> {
    let paper = PaperExchange::new(dec!(300000));
    paper.set_rate(Symbol::Eth, Symbol::Irt, dec!(1000000000)).await;
    paper.set_rate(Symbol::Usdt, Symbol::Irt, dec!(600000)).await;
    paper
        .set_order_book(
            Symbol::Usdt,
            Symbol::Irt,
            OrderBook {
                asks: vec![PriceLevel::new(dec!(610000), dec!(10000))],
                bids: vec![PriceLevel::new(dec!(600000), dec!(10000))],
            },
        )
        .await;
    paper.set_balance(Symbol::Usdt, usdt).await;
    paper.set_balance(Symbol::Rls, rial).await;
    Arc::new(paper)
}

pub fn venues(
    exchange: Arc<dyn Exchange>,
    quoter: Arc<dyn Quoter>,
    dex_trader: Arc<dyn DexTrader>,
) -> Venues {
    Venues {
        exchange,
        quoter,
        dex_trader,
        tokens: tokens(),
        pool_fee: UniswapFee::High,
    }
}

pub fn strategy_config(profit_threshold: Decimal) -> StrategyConfig {
    StrategyConfig {
        start_qty: dec!(1),
        step_qty: dec!(1),
        profit_threshold,
        slippage: dec!(0.001),
    }
}

/// 58 ZAR per DAI up to 50 DAI, 62 beyond.
pub fn stepped_pool(qty: Decimal) -> Decimal {
    if qty <= dec!(50) {
        qty * dec!(58)
    } else {
        qty * dec!(62)
    }
}
