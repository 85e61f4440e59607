mod common;

use alloy::primitives::{aliases::U24, Address, B256, U256};
use alloy::sol_types::SolEvent;
use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use common::*;
use zarban_arb_keeper::{
    chain::{EventHandler, IndexerState, LogHandler, TxHandler},
    dex::IDexTrader::Trade,
    errors::KeeperResult,
    types::{BlockHeader, ChainLog, TxReceipt},
};

fn trade_log(address: Address, block_number: u64) -> ChainLog {
    let encoded = Trade {
        token0: Address::repeat_byte(0x0a),
        token1: Address::repeat_byte(0x0b),
        fee: U24::from(10000),
        amountIn: U256::from(1_000u64),
        amountOut: U256::from(990u64),
    }
    .encode_log_data();
    ChainLog {
        address,
        topics: encoded.topics().to_vec(),
        data: encoded.data.clone(),
        block_number,
        transaction_hash: Some(B256::repeat_byte(0x77)),
        log_index: Some(0),
    }
}

struct CountingTxHandler {
    tx_hash: B256,
    calls: AtomicUsize,
}

#[async_trait]
impl TxHandler for CountingTxHandler {
    fn tx_hash(&self) -> B256 {
        self.tx_hash
    }

    async fn handle(&self, header: &BlockHeader, receipt: &TxReceipt) -> KeeperResult<()> {
        assert_eq!(header.number, receipt.block_number);
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[tokio::test]
async fn catch_up_advances_checkpoint_per_batch() {
    let chain = MockChain::new(150);
    let checkpoint = RecordingCheckpoint::at(100);
    let mut indexer = indexer(chain, checkpoint.clone(), 20);

    indexer.init(Duration::from_millis(50)).await.unwrap();
    assert_eq!(indexer.state(), IndexerState::Initialized);
    indexer.start().await.unwrap();

    assert_eq!(checkpoint.updates(), vec![120, 140, 150]);
    assert_eq!(indexer.ptr(), 150);
    assert_eq!(indexer.state(), IndexerState::LiveTailing);
}

#[tokio::test]
async fn failed_batch_keeps_checkpoint() {
    let chain = MockChain::new(150);
    chain.fail_block(125);
    let checkpoint = RecordingCheckpoint::at(100);
    let mut indexer = indexer(chain, checkpoint.clone(), 20);

    indexer.init(Duration::from_millis(50)).await.unwrap();
    let err = indexer.start().await.unwrap_err();

    assert!(!err.is_fatal());
    assert_eq!(checkpoint.updates(), vec![120]);
    assert_eq!(indexer.ptr(), 120);
}

#[tokio::test]
async fn logs_are_dispatched_only_for_registered_addresses() {
    let watched = Address::repeat_byte(0x11);
    let chain = MockChain::new(120);
    chain.add_log(trade_log(watched, 105));
    chain.add_log(trade_log(Address::repeat_byte(0x22), 106));
    chain.add_log(ChainLog {
        topics: vec![B256::repeat_byte(0x99)],
        ..trade_log(watched, 107)
    });

    let seen = Arc::new(AtomicUsize::new(0));
    let counter = seen.clone();
    let handler: Arc<dyn LogHandler> = Arc::new(EventHandler::<Trade>::new(move |header, _, event| {
        assert_eq!(header.number, 105);
        assert_eq!(event.amountOut, U256::from(990u64));
        counter.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }));

    let mut indexer = indexer(chain, RecordingCheckpoint::at(100), 10);
    indexer.register_event_handlers([handler]);
    indexer.register_addresses([watched]);
    indexer.init(Duration::from_millis(50)).await.unwrap();
    indexer.start().await.unwrap();

    assert_eq!(seen.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn watched_transaction_is_handled_once() {
    let tx_hash = B256::repeat_byte(0x42);
    let chain = MockChain::new(130);
    chain.mine(112, tx_hash);

    let mut indexer = indexer(chain.clone(), RecordingCheckpoint::at(100), 10);
    let handle = indexer.handle();
    let handler = Arc::new(CountingTxHandler {
        tx_hash,
        calls: AtomicUsize::new(0),
    });
    handle.watch_tx(handler.clone()).await;
    assert!(handle.is_watching(&tx_hash).await);

    indexer.init(Duration::from_millis(50)).await.unwrap();
    indexer.start().await.unwrap();

    assert_eq!(handler.calls.load(Ordering::SeqCst), 1);
    assert!(!handle.is_watching(&tx_hash).await);
    assert!(!handle.unwatch_tx(&tx_hash).await);
}

#[tokio::test]
async fn wait_for_receipt_resolves_block_header() {
    let tx_hash = B256::repeat_byte(0x43);
    let chain = MockChain::new(200);
    chain.mine(188, tx_hash);

    let indexer = indexer(chain, RecordingCheckpoint::at(100), 10);
    let (receipt, header) = indexer
        .handle()
        .wait_for_receipt(tx_hash, Duration::from_secs(1))
        .await
        .unwrap();

    assert_eq!(receipt.block_number, 188);
    assert_eq!(header, common::header(188));
}

#[tokio::test(start_paused = true)]
async fn wait_for_receipt_gives_up_at_deadline() {
    let indexer = indexer(MockChain::new(200), RecordingCheckpoint::at(100), 10);
    let err = indexer
        .handle()
        .wait_for_receipt(B256::repeat_byte(0x44), Duration::from_secs(2))
        .await
        .unwrap_err();

    assert!(err.is_deadline_exceeded());
}
