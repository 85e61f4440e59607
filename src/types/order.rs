//! Centralized exchange orders

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::Symbol;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Buy,
    Sell,
}

impl Side {
    pub fn as_str(&self) -> &'static str {
        match self {
            Side::Buy => "buy",
            Side::Sell => "sell",
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Side {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "buy" => Ok(Side::Buy),
            "sell" => Ok(Side::Sell),
            other => Err(format!("unknown order side {other}")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Execution {
    Market,
    Limit,
    StopMarket,
    StopLimit,
}

impl Execution {
    pub fn as_str(&self) -> &'static str {
        match self {
            Execution::Market => "market",
            Execution::Limit => "limit",
            Execution::StopMarket => "stop_market",
            Execution::StopLimit => "stop_limit",
        }
    }
}

/// Draft -> Open -> {Filled, PartiallyFilled, Canceled}
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderState {
    Draft,
    Open,
    Filled,
    PartiallyFilled,
    Canceled,
}

impl OrderState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            OrderState::Filled | OrderState::PartiallyFilled | OrderState::Canceled
        )
    }

    /// Maps the exchange's `status`/`partial` pair onto the order state machine.
    pub fn from_exchange(status: &str, partial: bool) -> Option<Self> {
        match status.to_ascii_lowercase().as_str() {
            "open" | "active" => Some(OrderState::Open),
            "done" if partial => Some(OrderState::PartiallyFilled),
            "done" => Some(OrderState::Filled),
            "closed" | "canceled" => Some(OrderState::Canceled),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    /// Surrogate id assigned by the store; zero until persisted.
    pub id: i64,
    /// Id assigned by the exchange; zero while the order is a draft.
    pub venue_order_id: i64,
    pub side: Side,
    pub execution: Execution,
    pub src_currency: Symbol,
    pub dst_currency: Symbol,
    pub fee_currency: Symbol,
    pub price: Decimal,
    pub amount: Decimal,
    pub total_price: Decimal,
    pub total_order_price: Decimal,
    pub matched_amount: Decimal,
    pub unmatched_amount: Decimal,
    pub fee: Decimal,
    pub partial: bool,
    pub status: OrderState,
    pub created_at: Option<DateTime<Utc>>,
}

impl Order {
    pub fn market_draft(side: Side, src: Symbol, dst: Symbol, amount: Decimal) -> Self {
        Self {
            id: 0,
            venue_order_id: 0,
            side,
            execution: Execution::Market,
            src_currency: src,
            dst_currency: dst,
            fee_currency: Symbol::Tmn,
            price: Decimal::ZERO,
            amount,
            total_price: Decimal::ZERO,
            total_order_price: Decimal::ZERO,
            matched_amount: Decimal::ZERO,
            unmatched_amount: amount,
            fee: Decimal::ZERO,
            partial: false,
            status: OrderState::Draft,
            created_at: None,
        }
    }
}

/// Acknowledgement returned when the exchange accepts an order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlacedOrder {
    pub venue_order_id: i64,
    pub created_at: DateTime<Utc>,
}

/// Final figures persisted once an order leaves the Open state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderUpdate {
    pub status: OrderState,
    pub price: Decimal,
    pub total_price: Decimal,
    pub total_order_price: Decimal,
    pub fee: Decimal,
    pub matched_amount: Decimal,
    pub unmatched_amount: Decimal,
    pub created_at: Option<DateTime<Utc>>,
}

impl From<&Order> for OrderUpdate {
    fn from(order: &Order) -> Self {
        Self {
            status: order.status,
            price: order.price,
            total_price: order.total_price,
            total_order_price: order.total_order_price,
            fee: order.fee,
            matched_amount: order.matched_amount,
            unmatched_amount: order.unmatched_amount,
            created_at: order.created_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exchange_states_map_onto_lifecycle() {
        assert_eq!(OrderState::from_exchange("open", false), Some(OrderState::Open));
        assert_eq!(OrderState::from_exchange("Done", false), Some(OrderState::Filled));
        assert_eq!(
            OrderState::from_exchange("done", true),
            Some(OrderState::PartiallyFilled)
        );
        assert_eq!(OrderState::from_exchange("closed", false), Some(OrderState::Canceled));
        assert_eq!(OrderState::from_exchange("weird", false), None);
        assert!(!OrderState::Open.is_terminal());
    }
}
