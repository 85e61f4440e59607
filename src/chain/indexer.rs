//! Block-polling indexer
//!
//! Walks the chain from the checkpoint to the current head in fixed-size
//! batches. Blocks inside a batch are processed concurrently by a bounded
//! worker pool; the checkpoint only moves once the whole batch has succeeded,
//! so a failed batch is retried from its first block and log handlers must
//! tolerate seeing the same log twice.

use alloy::primitives::{Address, B256};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, Semaphore, watch};
use tokio::task::{JoinError, JoinHandle, JoinSet};
use tokio::time::Instant;
use tracing::{Instrument, Span, debug, info, warn};

use super::{BlockCache, ChainClient, Checkpoint, LogHandler, TxHandler, spawn_head_tracker};
use crate::{
    errors::{KeeperError, KeeperResult},
    network::poll_until,
    types::{BlockHeader, BlockInfo, ChainLog, TxReceipt},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexerState {
    Uninitialized,
    Initialized,
    CatchingUp,
    LiveTailing,
}

#[derive(Debug, Clone)]
pub struct IndexerSettings {
    pub batch_size: u64,
    pub pool_size: usize,
    /// Head polling period; also bounds the processing time of each block.
    pub poll_interval: Duration,
}

#[derive(Clone, Default)]
struct HandlerRegistry {
    handlers: HashMap<B256, Arc<dyn LogHandler>>,
    addresses: HashSet<Address>,
}

type WatchList = Arc<Mutex<HashMap<B256, Arc<dyn TxHandler>>>>;

pub struct PollingIndexer {
    client: Arc<dyn ChainClient>,
    checkpoint: Arc<dyn Checkpoint>,
    cache: Arc<BlockCache>,
    registry: Arc<HandlerRegistry>,
    watch_list: WatchList,
    settings: IndexerSettings,
    workers: Arc<Semaphore>,
    ptr: u64,
    state: IndexerState,
    head: Option<watch::Receiver<u64>>,
    head_task: Option<JoinHandle<()>>,
    span: Span,
}

impl PollingIndexer {
    pub fn new(
        client: Arc<dyn ChainClient>,
        checkpoint: Arc<dyn Checkpoint>,
        settings: IndexerSettings,
        span: Span,
    ) -> Self {
        let settings = IndexerSettings {
            batch_size: settings.batch_size.max(1),
            pool_size: settings.pool_size.max(1),
            ..settings
        };

        Self {
            cache: Arc::new(BlockCache::new(client.clone())),
            workers: Arc::new(Semaphore::new(settings.pool_size)),
            client,
            checkpoint,
            registry: Arc::new(HandlerRegistry::default()),
            watch_list: Arc::new(Mutex::new(HashMap::new())),
            settings,
            ptr: 0,
            state: IndexerState::Uninitialized,
            head: None,
            head_task: None,
            span,
        }
    }

    /// Registrations are only possible while no batch is running.
    pub fn register_event_handlers(
        &mut self,
        handlers: impl IntoIterator<Item = Arc<dyn LogHandler>>,
    ) {
        let registry = Arc::make_mut(&mut self.registry);
        for handler in handlers {
            registry.handlers.insert(handler.topic(), handler);
        }
    }

    pub fn register_addresses(&mut self, addresses: impl IntoIterator<Item = Address>) {
        Arc::make_mut(&mut self.registry).addresses.extend(addresses);
    }

    pub fn handle(&self) -> IndexerHandle {
        IndexerHandle {
            client: self.client.clone(),
            cache: self.cache.clone(),
            watch_list: self.watch_list.clone(),
            poll_interval: self.settings.poll_interval,
        }
    }

    pub fn ptr(&self) -> u64 {
        self.ptr
    }

    pub fn state(&self) -> IndexerState {
        self.state
    }

    /// Loads the checkpoint, creating it at the start block on first run, and
    /// starts tracking the chain head.
    pub async fn init(&mut self, poll_interval: Duration) -> KeeperResult<()> {
        if !self.checkpoint.exists().await? {
            self.checkpoint.create().await?;
        }
        self.ptr = self.checkpoint.read().await?;

        let (head, task) = spawn_head_tracker(self.client.clone(), poll_interval, self.span.clone());
        if let Some(previous) = self.head_task.replace(task) {
            previous.abort();
        }
        self.head = Some(head);
        self.state = IndexerState::Initialized;

        info!(parent: &self.span, ptr = self.ptr, "📍 Indexer initialized from checkpoint");
        Ok(())
    }

    /// Waits for the next chain head and indexes every block below it.
    ///
    /// Safe to call repeatedly; each call catches up to the newest head seen.
    pub async fn start(&mut self) -> KeeperResult<()> {
        let head = self.next_head().await?;

        if self.ptr < head {
            self.state = IndexerState::CatchingUp;
            debug!(parent: &self.span, from = self.ptr, head, "Catching up");
        }

        while self.ptr < head {
            let from = self.ptr;
            let to = (from + self.settings.batch_size).min(head);
            let started = Instant::now();

            self.process_batch(from, to).await?;
            self.checkpoint.update(to).await?;
            self.ptr = to;
            self.cache.clear().await;

            info!(
                parent: &self.span,
                from,
                to,
                head,
                elapsed_ms = started.elapsed().as_millis() as u64,
                "Indexed block batch"
            );
        }

        self.state = IndexerState::LiveTailing;
        Ok(())
    }

    /// Keeps indexing until a fatal error. Failed batches are retried from the
    /// same checkpoint on the next head.
    pub async fn run(&mut self) -> KeeperResult<()> {
        loop {
            match self.start().await {
                Ok(()) => {}
                Err(e) if e.is_fatal() => return Err(e),
                Err(e) => {
                    warn!(parent: &self.span, ptr = self.ptr, "⚠️ Batch failed, will retry: {}", e);
                    tokio::time::sleep(self.settings.poll_interval).await;
                }
            }
        }
    }

    async fn next_head(&mut self) -> KeeperResult<u64> {
        let head = self.head.as_mut().ok_or(KeeperError::HeadTrackerClosed)?;
        head.changed()
            .await
            .map_err(|_| KeeperError::HeadTrackerClosed)?;
        let value = *head.borrow_and_update();
        Ok(value)
    }

    /// Processes `[from, to)`; the first failing block aborts the batch.
    async fn process_batch(&self, from: u64, to: u64) -> KeeperResult<()> {
        let mut tasks = JoinSet::new();

        for number in from..to {
            let permit = self
                .workers
                .clone()
                .acquire_owned()
                .await
                .map_err(|_| KeeperError::TaskJoin {
                    context: "indexer worker pool closed".to_string(),
                })?;

            let worker = BlockWorker {
                client: self.client.clone(),
                cache: self.cache.clone(),
                registry: self.registry.clone(),
                watch_list: self.watch_list.clone(),
                timeout: self.settings.poll_interval,
            };
            tasks.spawn(
                async move {
                    let _permit = permit;
                    worker.process(number).await
                }
                .instrument(self.span.clone()),
            );

            while let Some(joined) = tasks.try_join_next() {
                if let Err(e) = flatten(joined) {
                    tasks.abort_all();
                    return Err(e);
                }
            }
        }

        while let Some(joined) = tasks.join_next().await {
            if let Err(e) = flatten(joined) {
                tasks.abort_all();
                return Err(e);
            }
        }
        Ok(())
    }
}

impl Drop for PollingIndexer {
    fn drop(&mut self) {
        if let Some(task) = self.head_task.take() {
            task.abort();
        }
    }
}

fn flatten(joined: Result<KeeperResult<()>, JoinError>) -> KeeperResult<()> {
    joined.map_err(|e| KeeperError::TaskJoin {
        context: e.to_string(),
    })?
}

struct BlockWorker {
    client: Arc<dyn ChainClient>,
    cache: Arc<BlockCache>,
    registry: Arc<HandlerRegistry>,
    watch_list: WatchList,
    timeout: Duration,
}

impl BlockWorker {
    async fn process(self, number: u64) -> KeeperResult<()> {
        let started = Instant::now();
        tokio::time::timeout(self.timeout, self.process_inner(number))
            .await
            .map_err(|_| KeeperError::DeadlineExceeded {
                context: format!("processing block {number}"),
                after: started.elapsed(),
            })?
    }

    async fn process_inner(&self, number: u64) -> KeeperResult<()> {
        let block = self.cache.block_by_number(number).await?;
        let logs = if self.registry.handlers.is_empty() {
            Vec::new()
        } else {
            self.client.logs_in_block(number).await?
        };

        self.dispatch_transactions(&block).await?;
        self.dispatch_logs(&block.header, &logs).await
    }

    async fn dispatch_transactions(&self, block: &BlockInfo) -> KeeperResult<()> {
        let watched: Vec<(B256, Arc<dyn TxHandler>)> = {
            let list = self.watch_list.lock().await;
            if list.is_empty() {
                return Ok(());
            }
            block
                .transactions
                .iter()
                .filter_map(|hash| list.get(hash).map(|h| (*hash, h.clone())))
                .collect()
        };

        for (tx_hash, handler) in watched {
            let receipt = self
                .client
                .transaction_receipt(tx_hash)
                .await?
                .ok_or_else(|| {
                    KeeperError::chain(
                        format!("receipt for {tx_hash}"),
                        anyhow::anyhow!("transaction mined in block {} has no receipt", block.header.number),
                    )
                })?;

            handler.handle(&block.header, &receipt).await?;
            self.watch_list.lock().await.remove(&tx_hash);
            debug!(%tx_hash, block = block.header.number, "Watched transaction handled");
        }
        Ok(())
    }

    async fn dispatch_logs(&self, header: &BlockHeader, logs: &[ChainLog]) -> KeeperResult<()> {
        for log in logs {
            if !self.registry.addresses.contains(&log.address) {
                continue;
            }
            let Some(handler) = log
                .primary_topic()
                .and_then(|topic| self.registry.handlers.get(topic))
            else {
                continue;
            };
            handler.handle(header, log).await?;
        }
        Ok(())
    }
}

/// Shareable view of the indexer for callers that wait on transactions while
/// the indexing loop owns the indexer itself.
#[derive(Clone)]
pub struct IndexerHandle {
    client: Arc<dyn ChainClient>,
    cache: Arc<BlockCache>,
    watch_list: WatchList,
    poll_interval: Duration,
}

impl IndexerHandle {
    pub async fn watch_tx(&self, handler: Arc<dyn TxHandler>) {
        self.watch_list.lock().await.insert(handler.tx_hash(), handler);
    }

    pub async fn unwatch_tx(&self, tx_hash: &B256) -> bool {
        self.watch_list.lock().await.remove(tx_hash).is_some()
    }

    pub async fn is_watching(&self, tx_hash: &B256) -> bool {
        self.watch_list.lock().await.contains_key(tx_hash)
    }

    /// Polls for the receipt of `tx_hash` and resolves its block header.
    ///
    /// RPC errors while polling are treated as "not yet"; only the deadline
    /// ends the wait unsuccessfully.
    pub async fn wait_for_receipt(
        &self,
        tx_hash: B256,
        timeout: Duration,
    ) -> KeeperResult<(TxReceipt, BlockHeader)> {
        let deadline = Instant::now() + timeout;
        let context = format!("receipt for {tx_hash}");

        let client = &self.client;
        let receipt = poll_until(self.poll_interval, deadline, &context, move || async move {
            match client.transaction_receipt(tx_hash).await {
                Ok(receipt) => Ok(receipt),
                Err(e) => {
                    debug!(%tx_hash, "Receipt lookup failed: {}", e);
                    Ok(None)
                }
            }
        })
        .await?;

        let header = tokio::time::timeout_at(
            deadline,
            self.cache.header_by_number(receipt.block_number),
        )
        .await
        .map_err(|_| KeeperError::DeadlineExceeded {
            context: format!("header of block {}", receipt.block_number),
            after: timeout,
        })??;

        Ok((receipt, header))
    }
}
