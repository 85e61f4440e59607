//! Chain access capability used by the indexer

use alloy::{
    eips::BlockNumberOrTag,
    network::ReceiptResponse,
    primitives::B256,
    providers::Provider,
    rpc::types::{BlockTransactionsKind, Filter},
};
use async_trait::async_trait;

use crate::{
    ConcreteProvider,
    errors::{KeeperError, KeeperResult},
    types::{BlockHeader, BlockInfo, ChainLog, TxReceipt},
};

#[async_trait]
pub trait ChainClient: Send + Sync {
    async fn block_number(&self) -> KeeperResult<u64>;

    async fn block_by_number(&self, number: u64) -> KeeperResult<Option<BlockInfo>>;

    async fn header_by_number(&self, number: u64) -> KeeperResult<Option<BlockHeader>> {
        Ok(self.block_by_number(number).await?.map(|b| b.header))
    }

    /// All logs emitted in a single block, in the order the node returns them.
    async fn logs_in_block(&self, number: u64) -> KeeperResult<Vec<ChainLog>>;

    async fn transaction_receipt(&self, tx_hash: B256) -> KeeperResult<Option<TxReceipt>>;
}

#[async_trait]
impl ChainClient for ConcreteProvider {
    async fn block_number(&self) -> KeeperResult<u64> {
        self.get_block_number()
            .await
            .map_err(|e| KeeperError::chain("get_block_number", e))
    }

    async fn block_by_number(&self, number: u64) -> KeeperResult<Option<BlockInfo>> {
        let block = self
            .get_block_by_number(
                BlockNumberOrTag::Number(number),
                BlockTransactionsKind::Hashes,
            )
            .await
            .map_err(|e| KeeperError::chain(format!("get_block_by_number({number})"), e))?;

        Ok(block.map(|block| BlockInfo {
            header: BlockHeader {
                number: block.header.number,
                hash: block.header.hash,
                timestamp: block.header.timestamp,
            },
            transactions: block.transactions.hashes().collect(),
        }))
    }

    async fn logs_in_block(&self, number: u64) -> KeeperResult<Vec<ChainLog>> {
        let filter = Filter::new().from_block(number).to_block(number);
        let logs = self
            .get_logs(&filter)
            .await
            .map_err(|e| KeeperError::chain(format!("get_logs({number})"), e))?;

        Ok(logs
            .into_iter()
            .map(|log| ChainLog {
                address: log.address(),
                topics: log.topics().to_vec(),
                data: log.data().data.clone(),
                block_number: log.block_number.unwrap_or(number),
                transaction_hash: log.transaction_hash,
                log_index: log.log_index,
            })
            .collect())
    }

    async fn transaction_receipt(&self, tx_hash: B256) -> KeeperResult<Option<TxReceipt>> {
        let receipt = self
            .get_transaction_receipt(tx_hash)
            .await
            .map_err(|e| KeeperError::chain(format!("get_transaction_receipt({tx_hash})"), e))?;

        Ok(receipt.map(|r| TxReceipt {
            transaction_hash: r.transaction_hash,
            block_number: r.block_number.unwrap_or_default(),
            gas_used: u64::try_from(r.gas_used).unwrap_or(u64::MAX),
            effective_gas_price: r.effective_gas_price,
            success: r.status(),
        }))
    }
}
