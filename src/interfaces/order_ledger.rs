// ============================================================================
// Order Ledger Interface
// Defines the contract for the transactional order store
// ============================================================================

use crate::domain::{NewOrder, Order, OrderId};
use crate::error::LedgerResult;
use crate::numeric::{exchange_rate, rate_not_above, Amount, NumericResult};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

/// Typed crossing search: which resting orders could trade against an
/// incoming order with these terms.
///
/// A resting order qualifies when its currencies mirror the incoming ones and
/// `resting.exchange_rate <= sell_amount / buy_amount`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrossingQuery {
    pub buy_currency: String,
    pub sell_currency: String,
    pub buy_amount: Amount,
    pub sell_amount: Amount,
}

impl CrossingQuery {
    pub fn for_order(order: &Order) -> Self {
        Self {
            buy_currency: order.buy_currency.clone(),
            sell_currency: order.sell_currency.clone(),
            buy_amount: order.buy_amount(),
            sell_amount: order.sell_amount(),
        }
    }

    /// Highest resting exchange rate that still crosses.
    pub fn max_rate(&self) -> NumericResult<Decimal> {
        exchange_rate(self.sell_amount, self.buy_amount)
    }

    pub fn admits(&self, resting: &Order) -> bool {
        resting.is_resting()
            && resting.sell_currency == self.buy_currency
            && resting.buy_currency == self.sell_currency
            && rate_not_above(
                resting.buy_amount(),
                resting.sell_amount(),
                self.sell_amount,
                self.buy_amount,
            )
    }
}

/// Everything one trade writes, applied all-or-nothing.
#[derive(Debug, Clone, PartialEq)]
pub struct Settlement {
    pub incoming: OrderId,
    pub resting: OrderId,
    pub filled_at: DateTime<Utc>,
    /// Unmet remainder of whichever side was larger
    pub remainder: Option<NewOrder>,
}

impl Settlement {
    pub fn pair(incoming: OrderId, resting: OrderId, filled_at: DateTime<Utc>) -> Self {
        Self {
            incoming,
            resting,
            filled_at,
            remainder: None,
        }
    }

    pub fn with_remainder(mut self, remainder: Option<NewOrder>) -> Self {
        self.remainder = remainder;
        self
    }
}

/// State of the three affected orders after a committed settlement.
#[derive(Debug, Clone, PartialEq)]
pub struct SettlementReceipt {
    pub incoming: Order,
    pub resting: Order,
    pub derived: Option<Order>,
}

/// Transactional order store
///
/// Every mutation is atomic: a concurrent reader sees either none or all of
/// its effects.
pub trait OrderLedger: Send + Sync {
    /// Persist a new resting order and assign its id
    fn create(&self, order: NewOrder) -> LedgerResult<Order>;

    /// Fill both orders against each other and insert the remainder, if any.
    /// Fails with `AlreadyFilled` leaving everything unchanged if either order
    /// has been filled in the meantime.
    fn settle(&self, settlement: Settlement) -> LedgerResult<SettlementReceipt>;

    /// Undo the `create` of an order that has not traded. Fails with
    /// `AlreadyFilled` once the order is settled; settled orders are never
    /// removed.
    fn withdraw(&self, id: OrderId) -> LedgerResult<Order>;

    /// Resting orders that cross `query`, lowest id first
    fn find_crossing(&self, query: &CrossingQuery) -> LedgerResult<Vec<Order>>;

    fn get(&self, id: OrderId) -> LedgerResult<Option<Order>>;

    /// Every order, resting and settled, in id order
    fn list_all(&self) -> LedgerResult<Vec<Order>>;

    /// Fill two orders against each other with no remainder
    fn atomic_pair_fill(
        &self,
        a: OrderId,
        b: OrderId,
        filled_at: DateTime<Utc>,
    ) -> LedgerResult<()> {
        self.settle(Settlement::pair(a, b, filled_at)).map(|_| ())
    }

    fn list_resting(&self) -> LedgerResult<Vec<Order>> {
        Ok(self
            .list_all()?
            .into_iter()
            .filter(Order::is_resting)
            .collect())
    }
}
