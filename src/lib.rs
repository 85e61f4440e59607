//! Zarban arbitrage keeper
//!
//! Looks for price gaps between the DAI/ZAR pool on Uniswap V3 (Arbitrum) and
//! the USDT/TMN order book on Nobitex, and closes them by trading both venues.
//! A block-polling indexer follows the chain so swap receipts and contract
//! events can be observed as blocks land.

pub mod cex;
pub mod chain;
pub mod config;
pub mod dex;
pub mod errors;
pub mod execution;
pub mod network;
pub mod storage;
pub mod strategy;
pub mod types;
pub mod utils;

// Re-export commonly used items
pub use config::{Config, CONFIG};
pub use errors::{KeeperError, KeeperResult};
pub use types::*;

// Type alias for our concrete provider
pub type ConcreteProvider = alloy::providers::RootProvider<alloy::transports::BoxTransport>;
