// ============================================================================
// Order Book View
// The externally visible projection of ledger orders
// ============================================================================

use crate::numeric::Amount;
use serde::{Deserialize, Serialize};

use super::Order;

/// One order as shown to market participants. Ledger-internal fields (id,
/// fill state, counterparty, creator) are deliberately absent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderBookEntry {
    pub sender_pk: String,
    pub receiver_pk: String,
    pub buy_currency: String,
    pub sell_currency: String,
    pub buy_amount: Amount,
    pub sell_amount: Amount,
    pub signature: Option<String>,
}

impl From<&Order> for OrderBookEntry {
    fn from(order: &Order) -> Self {
        Self {
            sender_pk: order.sender_pk.clone(),
            receiver_pk: order.receiver_pk.clone(),
            buy_currency: order.buy_currency.clone(),
            sell_currency: order.sell_currency.clone(),
            buy_amount: order.buy_amount(),
            sell_amount: order.sell_amount(),
            signature: order.signature.clone(),
        }
    }
}

/// `{ "data": [ ... ] }`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OrderBookSnapshot {
    pub data: Vec<OrderBookEntry>,
}

impl OrderBookSnapshot {
    pub fn from_orders<'a>(orders: impl IntoIterator<Item = &'a Order>) -> Self {
        Self {
            data: orders.into_iter().map(OrderBookEntry::from).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}
