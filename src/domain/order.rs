// ============================================================================
// Order Domain Model
// ============================================================================

use crate::numeric::{exchange_rate, Amount, NumericResult};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

// ============================================================================
// Value Objects
// ============================================================================

/// Ledger-assigned order identifier. Monotonic, starting at 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrderId(u64);

impl OrderId {
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    pub fn value(&self) -> u64 {
        self.0
    }

    pub(crate) fn next(&self) -> Self {
        Self(self.0 + 1)
    }
}

impl fmt::Display for OrderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// The settled half of an order. `filled_at` and `counterparty_id` only ever
/// exist together, so they live in one value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Fill {
    pub filled_at: DateTime<Utc>,
    pub counterparty_id: OrderId,
}

// ============================================================================
// Unpersisted Order
// ============================================================================

/// Order terms before the ledger assigns an id.
///
/// The exchange rate is computed here, from the amounts, and nowhere else.
#[derive(Debug, Clone, PartialEq)]
pub struct NewOrder {
    pub sender_pk: String,
    pub receiver_pk: String,
    pub buy_currency: String,
    pub sell_currency: String,
    buy_amount: Amount,
    sell_amount: Amount,
    exchange_rate: Decimal,
    pub platform: String,
    pub signature: Option<String>,
    pub creator_id: Option<OrderId>,
}

impl NewOrder {
    pub fn new(
        sender_pk: impl Into<String>,
        receiver_pk: impl Into<String>,
        buy_currency: impl Into<String>,
        sell_currency: impl Into<String>,
        buy_amount: Amount,
        sell_amount: Amount,
        platform: impl Into<String>,
    ) -> NumericResult<Self> {
        Ok(Self {
            sender_pk: sender_pk.into(),
            receiver_pk: receiver_pk.into(),
            buy_currency: buy_currency.into(),
            sell_currency: sell_currency.into(),
            buy_amount,
            sell_amount,
            exchange_rate: exchange_rate(buy_amount, sell_amount)?,
            platform: platform.into(),
            signature: None,
            creator_id: None,
        })
    }

    pub fn with_signature(mut self, signature: impl Into<String>) -> Self {
        self.signature = Some(signature.into());
        self
    }

    /// Mark these terms as the unmet remainder of `parent`.
    pub fn derived_from(mut self, parent: OrderId) -> Self {
        self.creator_id = Some(parent);
        self
    }

    pub fn buy_amount(&self) -> Amount {
        self.buy_amount
    }

    pub fn sell_amount(&self) -> Amount {
        self.sell_amount
    }

    pub fn exchange_rate(&self) -> Decimal {
        self.exchange_rate
    }
}

// ============================================================================
// Order Entity
// ============================================================================

/// A persisted order. Only the ledger creates these and only the ledger
/// performs the single resting -> filled transition.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Order {
    pub id: OrderId,
    pub sender_pk: String,
    pub receiver_pk: String,
    pub buy_currency: String,
    pub sell_currency: String,
    buy_amount: Amount,
    sell_amount: Amount,
    exchange_rate: Decimal,
    pub platform: String,
    pub signature: Option<String>,
    fill: Option<Fill>,
    pub creator_id: Option<OrderId>,
    pub created_at: DateTime<Utc>,
}

impl Order {
    pub(crate) fn from_new(id: OrderId, new: NewOrder, created_at: DateTime<Utc>) -> Self {
        Self {
            id,
            sender_pk: new.sender_pk,
            receiver_pk: new.receiver_pk,
            buy_currency: new.buy_currency,
            sell_currency: new.sell_currency,
            buy_amount: new.buy_amount,
            sell_amount: new.sell_amount,
            exchange_rate: new.exchange_rate,
            platform: new.platform,
            signature: new.signature,
            fill: None,
            creator_id: new.creator_id,
            created_at,
        }
    }

    // ========================================================================
    // Getters
    // ========================================================================

    pub fn buy_amount(&self) -> Amount {
        self.buy_amount
    }

    pub fn sell_amount(&self) -> Amount {
        self.sell_amount
    }

    /// Always `buy_amount / sell_amount`.
    pub fn exchange_rate(&self) -> Decimal {
        self.exchange_rate
    }

    pub fn fill(&self) -> Option<Fill> {
        self.fill
    }

    pub fn filled_at(&self) -> Option<DateTime<Utc>> {
        self.fill.map(|fill| fill.filled_at)
    }

    pub fn counterparty_id(&self) -> Option<OrderId> {
        self.fill.map(|fill| fill.counterparty_id)
    }

    pub fn is_resting(&self) -> bool {
        self.fill.is_none()
    }

    pub fn is_derived(&self) -> bool {
        self.creator_id.is_some()
    }

    // ========================================================================
    // Ledger-only transitions
    // ========================================================================

    /// Resting -> filled. Returns false if the order was already filled.
    pub(crate) fn mark_filled(&mut self, fill: Fill) -> bool {
        if self.fill.is_some() {
            return false;
        }
        self.fill = Some(fill);
        true
    }

    /// Undo of `mark_filled`, used by transaction rollback only.
    pub(crate) fn clear_fill(&mut self) {
        self.fill = None;
    }
}
