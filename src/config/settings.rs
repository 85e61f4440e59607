//! Keeper configuration settings and environment variable handling

use alloy::primitives::Address;
use rust_decimal::prelude::*;
use rust_decimal_macros::dec;
use std::env;
use std::str::FromStr;
use std::time::Duration;

use crate::types::{
    DAI_ARBITRUM, DEFAULT_START_BLOCK, Symbol, TOKEN_DECIMALS, Token, TokenSet, UNISWAP_V3_QUOTER,
    UniswapFee, ZAR_ARBITRUM,
};

// Configuration constants
pub const MAX_SLIPPAGE: Decimal = dec!(0.05);
pub const MIN_STEP_QTY: Decimal = dec!(0.000001);
pub const MIN_BLOCK_INTERVAL_MS: u64 = 100;
pub const MAX_INDEXER_POOL_SIZE: usize = 64;
pub const BATCH_SIZE_PER_WORKER: u64 = 10;

// Currency conversion
pub const RIAL_PER_TOMAN: Decimal = dec!(10);
pub const TOMAN_PER_ZAR: Decimal = dec!(1000);

// Nobitex fee schedule
pub const NOBITEX_MAKER_FEE: Decimal = dec!(0.002);
pub const NOBITEX_TAKER_FEE: Decimal = dec!(0.0025);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    Mainnet,
    Testnet,
}

impl FromStr for Environment {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "mainnet" => Ok(Environment::Mainnet),
            "testnet" => Ok(Environment::Testnet),
            other => Err(format!("unknown environment {other}")),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub environment: Environment,
    pub log_level: String,
    pub output_dir: String,
    // Market maker
    pub start_qty: Decimal,
    pub step_qty: Decimal,
    pub profit_threshold: Decimal,
    pub cycle_interval: Duration,
    pub evaluation_timeout: Duration,
    pub slippage: Decimal,
    // Chain
    pub chain_url: Option<String>,
    pub block_interval: Duration,
    pub private_key: Option<String>,
    pub receipt_timeout: Duration,
    // Tokens and pools
    pub zar_address: Address,
    pub dai_address: Address,
    pub token_decimals: u32,
    pub pool_fee: UniswapFee,
    // Nobitex
    pub nobitex_url: String,
    pub nobitex_key: Option<String>,
    pub nobitex_minimum_order_toman: Decimal,
    pub nobitex_timeout: Duration,
    pub nobitex_order_status_interval: Duration,
    pub nobitex_retry_timeout: Duration,
    // Testnet paper wallet
    pub paper_usdt_balance: Decimal,
    pub paper_toman_balance: Decimal,
    // Contracts
    pub dex_trader_address: Option<Address>,
    pub uniswap_v3_quoter: Address,
    // Indexer
    pub indexer_start_block: u64,
    pub indexer_pool_size: usize,
    pub checkpoint_path: String,
}

fn env_parse<T: FromStr>(key: &str) -> Option<T> {
    env::var(key).ok().and_then(|s| s.trim().parse().ok())
}

impl Config {
    pub fn load() -> Self {
        let output_dir = env::var("OUTPUT_DIR").unwrap_or_else(|_| "output".to_string());

        Self {
            environment: env_parse("ENVIRONMENT").unwrap_or(Environment::Mainnet),
            log_level: env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            // Market maker defaults
            start_qty: env_parse("START_QTY")
                .unwrap_or(dec!(1))
                .max(MIN_STEP_QTY),
            step_qty: env_parse("STEP_QTY").unwrap_or(dec!(1)).max(MIN_STEP_QTY),
            profit_threshold: env_parse("PROFIT_THRESHOLD").unwrap_or(Decimal::ZERO),
            cycle_interval: Duration::from_secs(env_parse("CYCLE_INTERVAL_SECS").unwrap_or(600)),
            evaluation_timeout: Duration::from_secs(
                env_parse("EVALUATION_TIMEOUT_SECS").unwrap_or(120),
            ),
            slippage: env_parse("SLIPPAGE")
                .unwrap_or(dec!(0.001))
                .max(Decimal::ZERO)
                .min(MAX_SLIPPAGE),
            // Chain
            chain_url: env::var("CHAIN_URL").ok(),
            block_interval: Duration::from_millis(
                env_parse("BLOCK_INTERVAL_MS")
                    .unwrap_or(500)
                    .max(MIN_BLOCK_INTERVAL_MS),
            ),
            private_key: env::var("PRIVATE_KEY").ok(),
            receipt_timeout: Duration::from_secs(env_parse("RECEIPT_TIMEOUT_SECS").unwrap_or(300)),
            // Tokens
            zar_address: env_parse("ZAR_ADDRESS").unwrap_or(ZAR_ARBITRUM),
            dai_address: env_parse("DAI_ADDRESS").unwrap_or(DAI_ARBITRUM),
            token_decimals: TOKEN_DECIMALS,
            pool_fee: UniswapFee::from_fraction(env_parse("POOL_FEE").unwrap_or(dec!(0.01))),
            // Nobitex
            nobitex_url: env::var("NOBITEX_URL")
                .unwrap_or_else(|_| "https://api.nobitex.ir".to_string()),
            nobitex_key: env::var("NOBITEX_KEY").ok(),
            nobitex_minimum_order_toman: env_parse("NOBITEX_MINIMUM_ORDER_TOMAN")
                .unwrap_or(dec!(300000)),
            nobitex_timeout: Duration::from_secs(env_parse("NOBITEX_TIMEOUT_SECS").unwrap_or(60)),
            nobitex_order_status_interval: Duration::from_millis(
                env_parse("NOBITEX_ORDER_STATUS_INTERVAL_MS").unwrap_or(2000),
            ),
            nobitex_retry_timeout: Duration::from_secs(
                env_parse("NOBITEX_RETRY_TIMEOUT_SECS").unwrap_or(360),
            ),
            // Testnet paper wallet
            paper_usdt_balance: env_parse("PAPER_USDT_BALANCE").unwrap_or(dec!(1000)),
            paper_toman_balance: env_parse("PAPER_TOMAN_BALANCE").unwrap_or(dec!(60000000)),
            // Contracts
            dex_trader_address: env_parse("DEX_TRADER_ADDRESS"),
            uniswap_v3_quoter: env_parse("UNISWAP_V3_QUOTER").unwrap_or(UNISWAP_V3_QUOTER),
            // Indexer
            indexer_start_block: env_parse("INDEXER_START_BLOCK").unwrap_or(DEFAULT_START_BLOCK),
            indexer_pool_size: env_parse("INDEXER_POOL_SIZE")
                .unwrap_or(4)
                .clamp(1, MAX_INDEXER_POOL_SIZE),
            checkpoint_path: env::var("CHECKPOINT_PATH")
                .unwrap_or_else(|_| format!("{output_dir}/checkpoint/block_ptr")),
            output_dir,
        }
    }

    pub fn tokens(&self) -> TokenSet {
        TokenSet::new([
            Token {
                address: self.zar_address,
                symbol: Symbol::Zar,
                decimals: self.token_decimals,
            },
            Token {
                address: self.dai_address,
                symbol: Symbol::Dai,
                decimals: self.token_decimals,
            },
        ])
    }

    pub fn indexer_batch_size(&self) -> u64 {
        self.indexer_pool_size as u64 * BATCH_SIZE_PER_WORKER
    }
}
