//! On-chain trade transactions

use alloy::primitives::{Address, B256, U256};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Pending -> {Success, Failed}
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransactionStatus {
    Pending,
    Success,
    Failed,
}

impl TransactionStatus {
    pub fn from_receipt(success: bool) -> Self {
        if success {
            TransactionStatus::Success
        } else {
            TransactionStatus::Failed
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OnChainTransaction {
    pub id: i64,
    pub tx_hash: B256,
    pub from: Address,
    pub to: Address,
    pub value: U256,
    pub gas_price: u128,
    pub gas_limit: u64,
    pub gas_used: Option<u64>,
    /// Set only once the transaction is confirmed.
    pub block_number: Option<u64>,
    pub confirmed_at: Option<DateTime<Utc>>,
    pub status: TransactionStatus,
}

impl OnChainTransaction {
    pub fn pending(submitted: &SubmittedTx) -> Self {
        Self {
            id: 0,
            tx_hash: submitted.tx_hash,
            from: submitted.from,
            to: submitted.to,
            value: submitted.value,
            gas_price: submitted.gas_price,
            gas_limit: submitted.gas_limit,
            gas_used: None,
            block_number: None,
            confirmed_at: None,
            status: TransactionStatus::Pending,
        }
    }
}

/// What the trading client knows right after broadcasting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubmittedTx {
    pub tx_hash: B256,
    pub from: Address,
    pub to: Address,
    pub value: U256,
    pub gas_price: u128,
    pub gas_limit: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionUpdate {
    pub gas_used: u64,
    pub block_number: u64,
    pub timestamp: DateTime<Utc>,
    pub status: TransactionStatus,
}
