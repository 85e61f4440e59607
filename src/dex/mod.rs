//! Decentralized venue: Uniswap V3 quoting and trading through the DexTrader contract

pub mod contracts;
pub mod quoter;
pub mod trader;

pub use contracts::*;
pub use quoter::*;
pub use trader::*;

use alloy::primitives::Address;
use async_trait::async_trait;
use rust_decimal::Decimal;

use crate::{
    errors::KeeperResult,
    types::{Balance, SubmittedTx, Token, UniswapFee},
};

/// Price discovery against a single Uniswap V3 pool. Amounts are whole tokens.
#[async_trait]
pub trait Quoter: Send + Sync {
    /// Output received for exactly `amount_in` of `token_in`.
    async fn quote_exact_input(
        &self,
        token_in: &Token,
        token_out: &Token,
        fee: UniswapFee,
        amount_in: Decimal,
    ) -> KeeperResult<Decimal>;

    /// Input required to receive exactly `amount_out` of `token_out`.
    async fn quote_exact_output(
        &self,
        token_in: &Token,
        token_out: &Token,
        fee: UniswapFee,
        amount_out: Decimal,
    ) -> KeeperResult<Decimal>;
}

#[async_trait]
pub trait DexTrader: Send + Sync {
    fn address(&self) -> Address;

    async fn trade(
        &self,
        token_in: &Token,
        token_out: &Token,
        fee: UniswapFee,
        amount_in: Decimal,
        min_out: Decimal,
    ) -> KeeperResult<SubmittedTx>;

    /// Network fee of the trade in ETH. A simulated `transferFrom` failure is
    /// reported as [`KeeperError::InsufficientBalance`](crate::errors::KeeperError).
    async fn estimate_trade_gas_fee(
        &self,
        token_in: &Token,
        token_out: &Token,
        fee: UniswapFee,
        amount_in: Decimal,
        min_out: Decimal,
    ) -> KeeperResult<Decimal>;

    /// Token balances held by the trading contract.
    async fn token_balances(&self) -> KeeperResult<Vec<Balance>>;
}
