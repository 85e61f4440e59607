//! Error taxonomy for the keeper

use alloy::primitives::Address;
use rust_decimal::Decimal;
use std::time::Duration;
use thiserror::Error;

use crate::types::Symbol;

#[derive(Error, Debug)]
pub enum KeeperError {
    #[error("Insufficient {symbol} balance: required {required}, available {available}")]
    InsufficientBalance {
        symbol: Symbol,
        required: Decimal,
        available: Decimal,
    },

    #[error("Invalid {symbol} amount {amount}: {reason}")]
    InvalidAmount {
        symbol: Symbol,
        amount: Decimal,
        reason: String,
    },

    #[error("Invalid price {price} for {context}")]
    InvalidPrice { context: String, price: Decimal },

    #[error("Chain RPC error: {context}")]
    Chain {
        context: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("Contract interaction failed: {contract} - {context}")]
    Contract {
        contract: Address,
        context: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("HTTP request failed: {context}")]
    Http {
        context: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("Exchange error on {context}: status {status}, {message}")]
    Exchange {
        context: String,
        status: String,
        message: String,
    },

    #[error("Data parsing error: {context}")]
    DataParsing {
        context: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("Market data unavailable: {context}")]
    MarketDataUnavailable { context: String },

    #[error("Deadline exceeded after {after:?}: {context}")]
    DeadlineExceeded { context: String, after: Duration },

    #[error("Order {order_id} was canceled by the exchange")]
    OrderCanceled { order_id: i64 },

    #[error("Checkpoint failure: {context}")]
    Checkpoint {
        context: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Head tracker stopped publishing chain heads")]
    HeadTrackerClosed,

    #[error("Store error: {context}")]
    Store { context: String },

    #[error("Worker task failed: {context}")]
    TaskJoin { context: String },

    #[error("{strategy} failed during {phase}")]
    Strategy {
        strategy: String,
        phase: &'static str,
        #[source]
        source: Box<KeeperError>,
    },
}

pub type KeeperResult<T> = Result<T, KeeperError>;

impl KeeperError {
    pub fn chain(context: impl Into<String>, source: impl Into<anyhow::Error>) -> Self {
        KeeperError::Chain {
            context: context.into(),
            source: source.into(),
        }
    }

    pub fn contract(
        contract: Address,
        context: impl Into<String>,
        source: impl Into<anyhow::Error>,
    ) -> Self {
        KeeperError::Contract {
            contract,
            context: context.into(),
            source: source.into(),
        }
    }

    pub fn parsing(context: impl Into<String>, source: impl Into<anyhow::Error>) -> Self {
        KeeperError::DataParsing {
            context: context.into(),
            source: source.into(),
        }
    }

    pub fn in_strategy(self, strategy: &str, phase: &'static str) -> Self {
        KeeperError::Strategy {
            strategy: strategy.to_string(),
            phase,
            source: Box::new(self),
        }
    }

    /// Strips strategy context wrappers.
    pub fn root(&self) -> &KeeperError {
        match self {
            KeeperError::Strategy { source, .. } => source.root(),
            other => other,
        }
    }

    pub fn is_insufficient_balance(&self) -> bool {
        matches!(self.root(), KeeperError::InsufficientBalance { .. })
    }

    pub fn is_invalid_amount(&self) -> bool {
        matches!(self.root(), KeeperError::InvalidAmount { .. })
    }

    pub fn is_deadline_exceeded(&self) -> bool {
        matches!(self.root(), KeeperError::DeadlineExceeded { .. })
    }

    /// Conditions the indexing process cannot recover from without a restart.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self.root(),
            KeeperError::Checkpoint { .. } | KeeperError::HeadTrackerClosed
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn classification_sees_through_strategy_context() {
        let err = KeeperError::InsufficientBalance {
            symbol: Symbol::Zar,
            required: dec!(10),
            available: dec!(1),
        }
        .in_strategy("buy-dex-sell-cex", "evaluate");

        assert!(err.is_insufficient_balance());
        assert!(!err.is_fatal());
        assert!(err.to_string().contains("evaluate"));
    }

    #[test]
    fn checkpoint_errors_are_fatal() {
        let err = KeeperError::Checkpoint {
            context: "read".into(),
            source: std::io::Error::other("disk gone"),
        };
        assert!(err.is_fatal());
        assert!(KeeperError::HeadTrackerClosed.is_fatal());
    }
}
