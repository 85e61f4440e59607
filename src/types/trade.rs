//! Settlement records and currency pairs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::Symbol;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FeeType {
    Maker,
    Taker,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pair {
    pub id: i64,
    pub base_asset: Symbol,
    pub quote_asset: Symbol,
}

impl Pair {
    pub fn new(base_asset: Symbol, quote_asset: Symbol) -> Self {
        Self {
            id: 0,
            base_asset,
            quote_asset,
        }
    }
}

/// Links one exchange order and one on-chain transaction that settled together.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Trade {
    pub id: i64,
    pub pair_id: i64,
    pub order_id: i64,
    pub transaction_id: i64,
    pub created_at: DateTime<Utc>,
}
