//! Arbitrum One deployments used by default

use alloy::primitives::{Address, address};

// Tokens
pub const ZAR_ARBITRUM: Address = address!("d946188a614a0d9d0685a60f541bba1e8cc421ae");
pub const DAI_ARBITRUM: Address = address!("da10009cbd5d07dd0cecc66161fc93d7c9000da1");
pub const TOKEN_DECIMALS: u32 = 18;

// Uniswap V3
pub const UNISWAP_V3_QUOTER: Address = address!("b27308f9F90D607463bb33eA1BeBb41C27CE5AB6");

/// First block the keeper indexes when no checkpoint exists.
pub const DEFAULT_START_BLOCK: u64 = 247_010_149;
