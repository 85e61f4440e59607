//! Memoized block and header lookups for one indexing pass

use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;

use super::ChainClient;
use crate::{
    errors::{KeeperError, KeeperResult},
    types::{BlockHeader, BlockInfo},
};

#[derive(Default)]
struct CacheMaps {
    blocks: HashMap<u64, BlockInfo>,
    headers: HashMap<u64, BlockHeader>,
}

pub struct BlockCache {
    client: Arc<dyn ChainClient>,
    maps: Mutex<CacheMaps>,
}

impl BlockCache {
    pub fn new(client: Arc<dyn ChainClient>) -> Self {
        Self {
            client,
            maps: Mutex::new(CacheMaps::default()),
        }
    }

    pub async fn block_by_number(&self, number: u64) -> KeeperResult<BlockInfo> {
        if let Some(block) = self.maps.lock().await.blocks.get(&number) {
            return Ok(block.clone());
        }

        let block = self
            .client
            .block_by_number(number)
            .await?
            .ok_or_else(|| missing_block(number))?;

        let mut maps = self.maps.lock().await;
        maps.headers.insert(number, block.header);
        maps.blocks.insert(number, block.clone());
        Ok(block)
    }

    pub async fn header_by_number(&self, number: u64) -> KeeperResult<BlockHeader> {
        {
            let maps = self.maps.lock().await;
            if let Some(header) = maps.headers.get(&number) {
                return Ok(*header);
            }
        }

        let header = self
            .client
            .header_by_number(number)
            .await?
            .ok_or_else(|| missing_block(number))?;

        self.maps.lock().await.headers.insert(number, header);
        Ok(header)
    }

    /// Drops everything cached so far; called after each completed batch.
    pub async fn clear(&self) {
        let mut maps = self.maps.lock().await;
        maps.blocks.clear();
        maps.headers.clear();
    }

    pub async fn len(&self) -> usize {
        self.maps.lock().await.blocks.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

fn missing_block(number: u64) -> KeeperError {
    KeeperError::chain(
        format!("block {number}"),
        anyhow::anyhow!("block {number} not available from node"),
    )
}
