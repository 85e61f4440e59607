//! Log and transaction handlers dispatched by the indexer

use alloy::primitives::B256;
use alloy::sol_types::SolEvent;
use async_trait::async_trait;
use std::marker::PhantomData;
use std::sync::Arc;

use crate::{
    errors::{KeeperError, KeeperResult},
    types::{BlockHeader, ChainLog, TxReceipt},
};

/// Handles every log whose first topic equals [`LogHandler::topic`].
///
/// Handlers may see the same log more than once when a batch is retried, so
/// `handle` must be idempotent.
#[async_trait]
pub trait LogHandler: Send + Sync {
    fn topic(&self) -> B256;

    async fn handle(&self, header: &BlockHeader, log: &ChainLog) -> KeeperResult<()>;
}

/// Fires once when the watched transaction is seen in a processed block.
#[async_trait]
pub trait TxHandler: Send + Sync {
    fn tx_hash(&self) -> B256;

    async fn handle(&self, header: &BlockHeader, receipt: &TxReceipt) -> KeeperResult<()>;
}

pub type EventCallback<E> = Arc<dyn Fn(&BlockHeader, &ChainLog, E) -> KeeperResult<()> + Send + Sync>;

/// Decodes logs into a `sol!` event type and forwards them to a callback.
pub struct EventHandler<E> {
    callback: EventCallback<E>,
    _event: PhantomData<fn() -> E>,
}

impl<E: SolEvent> EventHandler<E> {
    pub fn new(
        callback: impl Fn(&BlockHeader, &ChainLog, E) -> KeeperResult<()> + Send + Sync + 'static,
    ) -> Self {
        Self {
            callback: Arc::new(callback),
            _event: PhantomData,
        }
    }

    pub fn decode(&self, log: &ChainLog) -> KeeperResult<E> {
        E::decode_raw_log(log.topics.iter().copied(), &log.data, true).map_err(|e| {
            KeeperError::parsing(
                format!("decode {} at block {}", E::SIGNATURE, log.block_number),
                e,
            )
        })
    }
}

#[async_trait]
impl<E: SolEvent + Send + 'static> LogHandler for EventHandler<E> {
    fn topic(&self) -> B256 {
        E::SIGNATURE_HASH
    }

    async fn handle(&self, header: &BlockHeader, log: &ChainLog) -> KeeperResult<()> {
        let event = self.decode(log)?;
        (self.callback)(header, log, event)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dex::IDexTrader::Trade;
    use alloy::primitives::{Address, U256, address, aliases::U24};
    use std::sync::Mutex;

    fn trade_log() -> (Trade, ChainLog) {
        let event = Trade {
            token0: address!("d946188a614a0d9d0685a60f541bba1e8cc421ae"),
            token1: address!("da10009cbd5d07dd0cecc66161fc93d7c9000da1"),
            fee: U24::from(10000),
            amountIn: U256::from(1_000u64),
            amountOut: U256::from(990u64),
        };
        let encoded = event.encode_log_data();
        let log = ChainLog {
            address: Address::repeat_byte(0x11),
            topics: encoded.topics().to_vec(),
            data: encoded.data.clone(),
            block_number: 42,
            transaction_hash: None,
            log_index: Some(0),
        };
        (event, log)
    }

    #[test]
    fn decoding_is_a_pure_function_of_the_log() {
        let (event, log) = trade_log();
        let handler = EventHandler::<Trade>::new(|_, _, _| Ok(()));

        let first = handler.decode(&log).unwrap();
        let second = handler.decode(&log).unwrap();
        assert_eq!(first, second);
        assert_eq!(first, event);
        assert_eq!(handler.topic(), log.topics[0]);
    }

    #[tokio::test]
    async fn callback_receives_decoded_event() {
        let (_, log) = trade_log();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let handler = EventHandler::<Trade>::new(move |header, _, event| {
            sink.lock().unwrap().push((header.number, event.amountOut));
            Ok(())
        });

        let header = BlockHeader {
            number: 42,
            hash: B256::ZERO,
            timestamp: 0,
        };
        handler.handle(&header, &log).await.unwrap();

        assert_eq!(*seen.lock().unwrap(), vec![(42, U256::from(990u64))]);
    }

    #[test]
    fn garbage_data_is_a_parsing_error() {
        let (_, mut log) = trade_log();
        log.data = vec![1u8, 2, 3].into();
        let handler = EventHandler::<Trade>::new(|_, _, _| Ok(()));
        assert!(matches!(
            handler.decode(&log),
            Err(KeeperError::DataParsing { .. })
        ));
    }
}
