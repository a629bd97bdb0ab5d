// ============================================================================
// Ledger Transaction
// Scoped write access with commit-or-rollback
// ============================================================================

use super::memory::LedgerState;
use crate::domain::{Fill, NewOrder, Order, OrderId};
use crate::error::{LedgerError, LedgerResult};
use chrono::{DateTime, Utc};
use parking_lot::RwLockWriteGuard;

/// Inverse of one applied mutation
#[derive(Debug)]
enum Undo {
    /// Also rewinds the id counter to `id`
    Insert { id: OrderId },
    Fill { id: OrderId },
    Remove { order: Box<Order> },
}

/// Exclusive handle over the ledger state.
///
/// Every mutation is journaled. `commit` discards the journal; any other exit
/// (an early `?`, a dropped handle, a panic unwinding through the owner)
/// replays it backwards so the ledger looks untouched. The write lock is held
/// for the handle's whole lifetime, so no reader ever sees a half-applied
/// transaction.
pub struct LedgerTransaction<'a> {
    state: RwLockWriteGuard<'a, LedgerState>,
    max_orders: Option<usize>,
    journal: Vec<Undo>,
    committed: bool,
}

impl<'a> LedgerTransaction<'a> {
    pub(crate) fn new(state: RwLockWriteGuard<'a, LedgerState>, max_orders: Option<usize>) -> Self {
        Self {
            state,
            max_orders,
            journal: Vec::with_capacity(3),
            committed: false,
        }
    }

    /// Insert a resting order, assigning the next id.
    pub fn insert(&mut self, order: NewOrder, created_at: DateTime<Utc>) -> LedgerResult<Order> {
        if let Some(limit) = self.max_orders {
            if self.state.orders.len() >= limit {
                return Err(LedgerError::CapacityExceeded { limit });
            }
        }
        if order.buy_currency == order.sell_currency {
            return Err(LedgerError::Constraint(format!(
                "buy and sell currency are both {}",
                order.buy_currency
            )));
        }
        if let Some(creator) = order.creator_id {
            if !self.state.orders.contains_key(&creator) {
                return Err(LedgerError::Constraint(format!(
                    "creator {creator} does not exist"
                )));
            }
        }

        let id = self.state.next_id;
        let order = Order::from_new(id, order, created_at);
        self.state.next_id = id.next();
        self.state
            .index_resting(id, &order.buy_currency, &order.sell_currency);
        self.state.orders.insert(id, order.clone());
        self.journal.push(Undo::Insert { id });
        Ok(order)
    }

    /// Fill `a` and `b` against each other. Both are checked before either is
    /// touched.
    pub fn pair_fill(&mut self, a: OrderId, b: OrderId, filled_at: DateTime<Utc>) -> LedgerResult<()> {
        if a == b {
            return Err(LedgerError::SelfMatch { id: a });
        }
        for id in [a, b] {
            if !self.order(id)?.is_resting() {
                return Err(LedgerError::AlreadyFilled { id });
            }
        }

        self.fill(a, Fill { filled_at, counterparty_id: b })?;
        self.fill(b, Fill { filled_at, counterparty_id: a })
    }

    fn fill(&mut self, id: OrderId, fill: Fill) -> LedgerResult<()> {
        let order = self
            .state
            .orders
            .get_mut(&id)
            .ok_or(LedgerError::NotFound { id })?;
        if !order.mark_filled(fill) {
            return Err(LedgerError::AlreadyFilled { id });
        }
        let (buy, sell) = (order.buy_currency.clone(), order.sell_currency.clone());
        self.state.unindex_resting(id, &buy, &sell);
        self.journal.push(Undo::Fill { id });
        Ok(())
    }

    /// Delete a resting order. Settled orders are permanent.
    pub fn remove(&mut self, id: OrderId) -> LedgerResult<Order> {
        if !self.order(id)?.is_resting() {
            return Err(LedgerError::AlreadyFilled { id });
        }
        let order = self
            .state
            .orders
            .remove(&id)
            .ok_or(LedgerError::NotFound { id })?;
        self.state
            .unindex_resting(id, &order.buy_currency, &order.sell_currency);
        self.journal.push(Undo::Remove {
            order: Box::new(order.clone()),
        });
        Ok(order)
    }

    /// Current state of `id`, including this transaction's own writes.
    pub fn order(&self, id: OrderId) -> LedgerResult<&Order> {
        self.state.orders.get(&id).ok_or(LedgerError::NotFound { id })
    }

    pub fn commit(mut self) {
        self.journal.clear();
        self.committed = true;
    }

    fn rollback(&mut self) {
        while let Some(undo) = self.journal.pop() {
            match undo {
                Undo::Insert { id } => {
                    if let Some(order) = self.state.orders.remove(&id) {
                        self.state
                            .unindex_resting(id, &order.buy_currency, &order.sell_currency);
                    }
                    self.state.next_id = id;
                }
                Undo::Fill { id } => {
                    let pair = self.state.orders.get_mut(&id).map(|order| {
                        order.clear_fill();
                        (order.buy_currency.clone(), order.sell_currency.clone())
                    });
                    if let Some((buy, sell)) = pair {
                        self.state.index_resting(id, &buy, &sell);
                    }
                }
                Undo::Remove { order } => {
                    self.state
                        .index_resting(order.id, &order.buy_currency, &order.sell_currency);
                    self.state.orders.insert(order.id, *order);
                }
            }
        }
    }
}

impl Drop for LedgerTransaction<'_> {
    fn drop(&mut self) {
        if !self.committed && !self.journal.is_empty() {
            tracing::debug!(writes = self.journal.len(), "rolling back ledger transaction");
            self.rollback();
        }
    }
}
