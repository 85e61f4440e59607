//! Chain provider setup

use alloy::providers::{Provider, ProviderBuilder};
use anyhow::Result;
use std::sync::Arc;
use tracing::{info, warn};

use crate::{
    ConcreteProvider,
    errors::KeeperError,
    network::retry::{RetryConfig, retry_with_backoff},
};

pub async fn setup_chain_provider(rpc_url: &str) -> Result<Arc<ConcreteProvider>> {
    let provider: Arc<ConcreteProvider> =
        Arc::new(ProviderBuilder::new().on_http(rpc_url.parse()?).boxed());

    info!("🔗 Testing connection to Arbitrum...");
    let block = retry_with_backoff(
        || async {
            provider
                .get_block_number()
                .await
                .map_err(|e| KeeperError::chain("get_block_number", e))
        },
        &RetryConfig {
            max_attempts: 5,
            initial_delay_ms: 500,
            max_delay_ms: 10000,
            exponential_base: 2.0,
        },
        "Arbitrum connection",
    )
    .await
    .map_err(|e| {
        warn!("⚠️ Network connection attempt failed: {}", e);
        anyhow::anyhow!("Network connection failed: {}", e)
    })?;

    info!("✅ Connected to Arbitrum at block {}", block);
    Ok(provider)
}
