//! Nobitex REST client

use async_trait::async_trait;
use chrono::Utc;
use reqwest::{Method, RequestBuilder};
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::{debug, info};

use super::{
    Exchange,
    responses::{Envelope, OrderBookResponse, OrderResponse, StatsResponse, WalletsResponse},
};
use crate::{
    config::{NOBITEX_MAKER_FEE, NOBITEX_TAKER_FEE},
    errors::{KeeperError, KeeperResult},
    network::{RetryConfig, retry_with_backoff},
    types::{Balance, FeeType, Order, OrderBook, PlacedOrder, Symbol},
};

#[derive(Debug, Clone)]
pub struct NobitexSettings {
    pub base_url: String,
    pub api_key: Option<String>,
    pub timeout: Duration,
    pub minimum_order_toman: Decimal,
}

pub struct NobitexClient {
    http: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
    minimum_order_toman: Decimal,
    read_retry: RetryConfig,
}

impl NobitexClient {
    pub fn new(settings: NobitexSettings) -> KeeperResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(settings.timeout)
            .build()
            .map_err(|e| KeeperError::Http {
                context: "build Nobitex HTTP client".to_string(),
                source: e,
            })?;

        Ok(Self {
            http,
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            api_key: settings.api_key,
            minimum_order_toman: settings.minimum_order_toman,
            read_retry: RetryConfig {
                max_attempts: 3,
                initial_delay_ms: 200,
                ..Default::default()
            },
        })
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let builder = self.http.request(method, format!("{}{}", self.base_url, path));
        match &self.api_key {
            Some(key) => builder.header("Authorization", format!("Token {key}")),
            None => builder,
        }
    }

    async fn send<T: DeserializeOwned>(&self, builder: RequestBuilder, context: &str) -> KeeperResult<T> {
        let response = builder.send().await.map_err(|e| KeeperError::Http {
            context: context.to_string(),
            source: e,
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(KeeperError::Exchange {
                context: context.to_string(),
                status: status.as_u16().to_string(),
                message: body,
            });
        }

        let envelope: Envelope<T> = response.json().await.map_err(|e| KeeperError::Http {
            context: format!("decode {context}"),
            source: e,
        })?;
        envelope.into_result(context)
    }

    /// Reads are idempotent and retried with backoff.
    async fn get<T: DeserializeOwned>(&self, path: &str, context: &str) -> KeeperResult<T> {
        retry_with_backoff(
            || self.send(self.request(Method::GET, path), context),
            &self.read_retry,
            context,
        )
        .await
    }
}

#[async_trait]
impl Exchange for NobitexClient {
    async fn order_book(&self, src: Symbol, dst: Symbol) -> KeeperResult<OrderBook> {
        let path = format!("/v2/orderbook/{}{}", src, dst);
        let response: OrderBookResponse = self.get(&path, "order book").await?;
        debug!(%src, %dst, last_update = response.last_update, "Fetched order book");
        response.into_order_book()
    }

    async fn exchange_rate(&self, src: Symbol, dst: Symbol) -> KeeperResult<Decimal> {
        let path = format!(
            "/market/stats?srcCurrency={}&dstCurrency={}",
            src.lowercase(),
            dst.lowercase()
        );
        let response: StatsResponse = self.get(&path, "market stats").await?;
        let key = format!("{}-{}", src.lowercase(), dst.lowercase());
        response
            .stats
            .get(&key)
            .map(|stat| stat.latest)
            .ok_or_else(|| KeeperError::Exchange {
                context: "market stats".to_string(),
                status: "missing".to_string(),
                message: format!("no stats for {key}"),
            })
    }

    async fn balances(&self) -> KeeperResult<Vec<Balance>> {
        let response: WalletsResponse = self.get("/users/wallets/list", "wallets").await?;
        Ok(response.into_balances())
    }

    async fn place_order(&self, order: &Order) -> KeeperResult<PlacedOrder> {
        let dst = match order.dst_currency {
            Symbol::Tmn => Symbol::Rls,
            other => other,
        };
        let price = self.exchange_rate(order.src_currency, dst).await?;

        let body = serde_json::json!({
            "type": order.side.as_str(),
            "execution": order.execution.as_str(),
            "srcCurrency": order.src_currency.lowercase(),
            "dstCurrency": dst.lowercase(),
            "amount": order.amount.to_f64(),
            "price": price.to_f64(),
        });
        let builder = self.request(Method::POST, "/market/orders/add").json(&body);
        let response: OrderResponse = self.send(builder, "place order").await?;

        info!(
            venue_order_id = response.order.id,
            side = %order.side,
            amount = %order.amount,
            %price,
            "📤 Placed Nobitex order"
        );
        Ok(PlacedOrder {
            venue_order_id: response.order.id,
            created_at: response.order.created_at.unwrap_or_else(Utc::now),
        })
    }

    async fn order_status(&self, venue_order_id: i64) -> KeeperResult<Order> {
        let body = serde_json::json!({ "id": venue_order_id });
        let builder = self.request(Method::POST, "/market/orders/status").json(&body);
        let response: OrderResponse = self.send(builder, "order status").await?;
        response.order.into_order()
    }

    fn fees(&self, fee_type: FeeType) -> Decimal {
        match fee_type {
            FeeType::Maker => NOBITEX_MAKER_FEE,
            FeeType::Taker => NOBITEX_TAKER_FEE,
        }
    }

    fn minimum_order_toman(&self) -> Decimal {
        self.minimum_order_toman
    }
}
