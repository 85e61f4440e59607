//! DexTrader contract client: gas estimation, signed trade submission, balances

use alloy::{
    eips::eip2718::Encodable2718,
    network::{EthereumWallet, TransactionBuilder},
    primitives::{Address, U256},
    providers::Provider,
    rpc::types::eth::TransactionRequest,
    signers::local::PrivateKeySigner,
    sol_types::SolCall,
};
use async_trait::async_trait;
use rust_decimal::Decimal;
use std::sync::Arc;
use tracing::{debug, info};

use super::{DexTrader, IDexTrader, IERC20};
use crate::{
    ConcreteProvider,
    errors::{KeeperError, KeeperResult},
    types::{Balance, SubmittedTx, Token, TokenSet, UniswapFee},
    utils::{from_base_units, to_base_units},
};

const NATIVE_DECIMALS: u32 = 18;

/// Revert reason Uniswap's TransferHelper raises when `transferFrom` fails.
const STF_REVERT: &str = "STF";

pub struct DexTraderClient {
    provider: Arc<ConcreteProvider>,
    address: Address,
    tokens: TokenSet,
    sender: Address,
    wallet: EthereumWallet,
}

impl DexTraderClient {
    pub fn new(
        provider: Arc<ConcreteProvider>,
        address: Address,
        tokens: TokenSet,
        signer: PrivateKeySigner,
    ) -> Self {
        Self {
            provider,
            address,
            tokens,
            sender: signer.address(),
            wallet: EthereumWallet::from(signer),
        }
    }

    fn trade_request(
        &self,
        token_in: &Token,
        token_out: &Token,
        fee: UniswapFee,
        amount_in: Decimal,
        min_out: Decimal,
    ) -> KeeperResult<TransactionRequest> {
        let call = IDexTrader::tradeCall {
            token0: token_in.address,
            token1: token_out.address,
            poolFee: fee.as_u24(),
            amountIn: to_base_units(amount_in, token_in.decimals)?,
            amountOutMinimum: to_base_units(min_out, token_out.decimals)?,
        };

        Ok(TransactionRequest::default()
            .with_from(self.sender)
            .with_to(self.address)
            .with_input(call.abi_encode()))
    }

    fn estimate_error(&self, e: impl std::fmt::Display, token_in: &Token, amount_in: Decimal) -> KeeperError {
        let message = e.to_string();
        if message.contains(STF_REVERT) {
            KeeperError::InsufficientBalance {
                symbol: token_in.symbol,
                required: amount_in,
                available: Decimal::ZERO,
            }
        } else {
            KeeperError::contract(self.address, "estimate trade gas", anyhow::anyhow!(message))
        }
    }
}

#[async_trait]
impl DexTrader for DexTraderClient {
    fn address(&self) -> Address {
        self.address
    }

    async fn trade(
        &self,
        token_in: &Token,
        token_out: &Token,
        fee: UniswapFee,
        amount_in: Decimal,
        min_out: Decimal,
    ) -> KeeperResult<SubmittedTx> {
        let request = self.trade_request(token_in, token_out, fee, amount_in, min_out)?;

        let gas_limit = self
            .provider
            .estimate_gas(&request)
            .await
            .map_err(|e| self.estimate_error(e, token_in, amount_in))?;
        let gas_price = self
            .provider
            .get_gas_price()
            .await
            .map_err(|e| KeeperError::chain("get_gas_price", e))?;
        let nonce = self
            .provider
            .get_transaction_count(self.sender)
            .await
            .map_err(|e| KeeperError::chain("get_transaction_count", e))?;
        let chain_id = self
            .provider
            .get_chain_id()
            .await
            .map_err(|e| KeeperError::chain("get_chain_id", e))?;

        let envelope = request
            .with_nonce(nonce)
            .with_chain_id(chain_id)
            .with_gas_limit(gas_limit)
            .with_gas_price(gas_price)
            .build(&self.wallet)
            .await
            .map_err(|e| KeeperError::contract(self.address, "sign trade", e))?;

        let pending = self
            .provider
            .send_raw_transaction(&envelope.encoded_2718())
            .await
            .map_err(|e| KeeperError::contract(self.address, "send trade", e))?;
        let tx_hash = *pending.tx_hash();

        info!(
            %tx_hash,
            token_in = %token_in.symbol,
            token_out = %token_out.symbol,
            %amount_in,
            %min_out,
            "📤 Submitted DexTrader trade"
        );

        Ok(SubmittedTx {
            tx_hash,
            from: self.sender,
            to: self.address,
            value: U256::ZERO,
            gas_price,
            gas_limit,
        })
    }

    async fn estimate_trade_gas_fee(
        &self,
        token_in: &Token,
        token_out: &Token,
        fee: UniswapFee,
        amount_in: Decimal,
        min_out: Decimal,
    ) -> KeeperResult<Decimal> {
        let request = self.trade_request(token_in, token_out, fee, amount_in, min_out)?;
        let gas = self
            .provider
            .estimate_gas(&request)
            .await
            .map_err(|e| self.estimate_error(e, token_in, amount_in))?;
        let gas_price = self
            .provider
            .get_gas_price()
            .await
            .map_err(|e| KeeperError::chain("get_gas_price", e))?;

        let fee_wei = U256::from(gas) * U256::from(gas_price);
        let fee_eth = from_base_units(fee_wei, NATIVE_DECIMALS)?;
        debug!(gas, gas_price, %fee_eth, "Estimated trade gas fee");
        Ok(fee_eth)
    }

    async fn token_balances(&self) -> KeeperResult<Vec<Balance>> {
        let mut balances = Vec::new();
        for token in self.tokens.iter() {
            let call = IERC20::balanceOfCall {
                account: self.address,
            };
            let tx = TransactionRequest::default()
                .to(token.address)
                .input(call.abi_encode().into());
            let raw = self
                .provider
                .call(&tx)
                .await
                .map_err(|e| KeeperError::contract(token.address, "balanceOf", e))?;
            let balance = IERC20::balanceOfCall::abi_decode_returns(&raw, true)
                .map_err(|e| KeeperError::contract(token.address, "decode balanceOf", e))?
                ._0;

            balances.push(Balance {
                symbol: token.symbol,
                balance: from_base_units(balance, token.decimals)?,
            });
        }
        Ok(balances)
    }
}
