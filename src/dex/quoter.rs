//! Uniswap V3 quoter over `eth_call`

use alloy::{
    primitives::{Address, aliases::U160},
    providers::Provider,
    rpc::types::eth::TransactionRequest,
    sol_types::SolCall,
};
use async_trait::async_trait;
use rust_decimal::Decimal;
use std::sync::Arc;
use tracing::debug;

use super::{IQuoter, Quoter};
use crate::{
    ConcreteProvider,
    errors::{KeeperError, KeeperResult},
    types::{Token, UniswapFee},
    utils::{from_base_units, to_base_units},
};

pub struct UniswapV3Quoter {
    provider: Arc<ConcreteProvider>,
    address: Address,
}

impl UniswapV3Quoter {
    pub fn new(provider: Arc<ConcreteProvider>, address: Address) -> Self {
        Self { provider, address }
    }

    async fn call(&self, data: Vec<u8>, context: &str) -> KeeperResult<alloy::primitives::Bytes> {
        let tx = TransactionRequest::default()
            .to(self.address)
            .input(data.into());
        self.provider
            .call(&tx)
            .await
            .map_err(|e| KeeperError::contract(self.address, context, e))
    }
}

#[async_trait]
impl Quoter for UniswapV3Quoter {
    async fn quote_exact_input(
        &self,
        token_in: &Token,
        token_out: &Token,
        fee: UniswapFee,
        amount_in: Decimal,
    ) -> KeeperResult<Decimal> {
        let call = IQuoter::quoteExactInputSingleCall {
            tokenIn: token_in.address,
            tokenOut: token_out.address,
            fee: fee.as_u24(),
            amountIn: to_base_units(amount_in, token_in.decimals)?,
            sqrtPriceLimitX96: U160::ZERO,
        };
        let raw = self.call(call.abi_encode(), "quoteExactInputSingle").await?;
        let out = IQuoter::quoteExactInputSingleCall::abi_decode_returns(&raw, true)
            .map_err(|e| KeeperError::contract(self.address, "decode quoteExactInputSingle", e))?
            .amountOut;

        let amount_out = from_base_units(out, token_out.decimals)?;
        debug!(
            token_in = %token_in.symbol,
            token_out = %token_out.symbol,
            %amount_in,
            %amount_out,
            "Quoted exact input"
        );
        Ok(amount_out)
    }

    async fn quote_exact_output(
        &self,
        token_in: &Token,
        token_out: &Token,
        fee: UniswapFee,
        amount_out: Decimal,
    ) -> KeeperResult<Decimal> {
        let call = IQuoter::quoteExactOutputSingleCall {
            tokenIn: token_in.address,
            tokenOut: token_out.address,
            fee: fee.as_u24(),
            amountOut: to_base_units(amount_out, token_out.decimals)?,
            sqrtPriceLimitX96: U160::ZERO,
        };
        let raw = self.call(call.abi_encode(), "quoteExactOutputSingle").await?;
        let amount_in = IQuoter::quoteExactOutputSingleCall::abi_decode_returns(&raw, true)
            .map_err(|e| KeeperError::contract(self.address, "decode quoteExactOutputSingle", e))?
            .amountIn;

        from_base_units(amount_in, token_in.decimals)
    }
}
