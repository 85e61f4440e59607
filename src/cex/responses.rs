//! Nobitex REST payloads and their conversion into domain types

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer};
use std::collections::HashMap;
use std::str::FromStr;
use tracing::debug;

use crate::{
    errors::{KeeperError, KeeperResult},
    types::{Balance, Execution, Order, OrderBook, OrderState, PriceLevel, Side, Symbol},
};

/// Every Nobitex response carries `status`, plus `code`/`message` on failure.
#[derive(Debug, Deserialize)]
pub struct Envelope<T> {
    pub status: String,
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(flatten)]
    pub body: T,
}

impl<T> Envelope<T> {
    pub fn into_result(self, context: &str) -> KeeperResult<T> {
        if self.status.eq_ignore_ascii_case("failed") {
            return Err(KeeperError::Exchange {
                context: context.to_string(),
                status: self.code.unwrap_or_else(|| self.status.clone()),
                message: self.message.unwrap_or_default(),
            });
        }
        Ok(self.body)
    }
}

/// Nobitex mixes numeric strings and bare numbers; blanks decode as zero.
fn lenient_decimal<'de, D>(deserializer: D) -> Result<Decimal, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(serde_json::Value::String(s)) if !s.trim().is_empty() => {
            Decimal::from_str(s.trim()).map_err(serde::de::Error::custom)?
        }
        Some(serde_json::Value::Number(n)) => {
            Decimal::from_str(&n.to_string()).map_err(serde::de::Error::custom)?
        }
        _ => Decimal::ZERO,
    })
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderBookResponse {
    #[serde(default)]
    pub last_update: i64,
    #[serde(default)]
    pub bids: Vec<Vec<String>>,
    #[serde(default)]
    pub asks: Vec<Vec<String>>,
}

fn parse_levels(levels: &[Vec<String>]) -> KeeperResult<Vec<PriceLevel>> {
    levels
        .iter()
        .map(|level| match level.as_slice() {
            [price, amount, ..] => {
                let price = Decimal::from_str(price)
                    .map_err(|e| KeeperError::parsing("order book price", e))?;
                let amount = Decimal::from_str(amount)
                    .map_err(|e| KeeperError::parsing("order book amount", e))?;
                Ok(PriceLevel::new(price, amount))
            }
            _ => Err(KeeperError::parsing(
                "order book level",
                anyhow::anyhow!("expected [price, amount], got {:?}", level),
            )),
        })
        .collect()
}

impl OrderBookResponse {
    pub fn into_order_book(self) -> KeeperResult<OrderBook> {
        Ok(OrderBook {
            asks: parse_levels(&self.asks)?,
            bids: parse_levels(&self.bids)?,
        })
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Wallet {
    pub currency: String,
    #[serde(deserialize_with = "lenient_decimal", default)]
    pub active_balance: Decimal,
}

#[derive(Debug, Deserialize)]
pub struct WalletsResponse {
    #[serde(default)]
    pub wallets: Vec<Wallet>,
}

impl WalletsResponse {
    pub fn into_balances(self) -> Vec<Balance> {
        self.wallets
            .into_iter()
            .filter_map(|wallet| match Symbol::from_str(&wallet.currency) {
                Ok(symbol) => Some(Balance {
                    symbol,
                    balance: wallet.active_balance,
                }),
                Err(e) => {
                    debug!("Skipping wallet: {}", e);
                    None
                }
            })
            .collect()
    }
}

#[derive(Debug, Deserialize)]
pub struct MarketStat {
    #[serde(deserialize_with = "lenient_decimal", default)]
    pub latest: Decimal,
}

#[derive(Debug, Deserialize)]
pub struct StatsResponse {
    #[serde(alias = "Stats", default)]
    pub stats: HashMap<String, MarketStat>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderPayload {
    pub id: i64,
    #[serde(rename = "type", default)]
    pub side: Option<String>,
    #[serde(default)]
    pub execution: Option<String>,
    #[serde(default)]
    pub src_currency: Option<String>,
    #[serde(default)]
    pub dst_currency: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub partial: bool,
    #[serde(deserialize_with = "lenient_decimal", default)]
    pub amount: Decimal,
    #[serde(deserialize_with = "lenient_decimal", default)]
    pub price: Decimal,
    #[serde(deserialize_with = "lenient_decimal", default)]
    pub average_price: Decimal,
    #[serde(deserialize_with = "lenient_decimal", default)]
    pub total_price: Decimal,
    #[serde(deserialize_with = "lenient_decimal", default)]
    pub total_order_price: Decimal,
    #[serde(deserialize_with = "lenient_decimal", default)]
    pub matched_amount: Decimal,
    #[serde(deserialize_with = "lenient_decimal", default)]
    pub unmatched_amount: Decimal,
    #[serde(deserialize_with = "lenient_decimal", default)]
    pub fee: Decimal,
    #[serde(rename = "created_at", alias = "createdAt", default)]
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
pub struct OrderResponse {
    pub order: OrderPayload,
}

fn required_symbol(raw: &Option<String>, field: &str) -> KeeperResult<Symbol> {
    let raw = raw.as_deref().unwrap_or_default();
    Symbol::from_str(raw).map_err(|e| KeeperError::parsing(format!("order {field}"), e))
}

impl OrderPayload {
    pub fn into_order(self) -> KeeperResult<Order> {
        let side = self
            .side
            .as_deref()
            .unwrap_or_default()
            .parse::<Side>()
            .map_err(|e| KeeperError::parsing("order side", anyhow::anyhow!(e)))?;
        let raw_status = self.status.as_deref().unwrap_or_default();
        let status = OrderState::from_exchange(raw_status, self.partial).ok_or_else(|| {
            KeeperError::parsing(
                "order status",
                anyhow::anyhow!("unknown order status {raw_status:?}"),
            )
        })?;
        let execution = match self.execution.as_deref() {
            Some("limit") => Execution::Limit,
            Some("stop_market") => Execution::StopMarket,
            Some("stop_limit") => Execution::StopLimit,
            _ => Execution::Market,
        };
        let price = if self.average_price.is_zero() {
            self.price
        } else {
            self.average_price
        };

        Ok(Order {
            id: 0,
            venue_order_id: self.id,
            side,
            execution,
            src_currency: required_symbol(&self.src_currency, "srcCurrency")?,
            dst_currency: required_symbol(&self.dst_currency, "dstCurrency")?,
            fee_currency: Symbol::Tmn,
            price,
            amount: self.amount,
            total_price: self.total_price,
            total_order_price: self.total_order_price,
            matched_amount: self.matched_amount,
            unmatched_amount: self.unmatched_amount,
            fee: self.fee,
            partial: self.partial,
            status,
            created_at: self.created_at,
        })
    }
}
