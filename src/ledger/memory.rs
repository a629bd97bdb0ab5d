// ============================================================================
// In-Memory Order Ledger
// RwLock-guarded order table with a resting-order index per currency pair
// ============================================================================

use super::transaction::LedgerTransaction;
use crate::domain::{NewOrder, Order, OrderId};
use crate::error::{LedgerError, LedgerResult};
use crate::interfaces::{CrossingQuery, OrderLedger, Settlement, SettlementReceipt};
use chrono::Utc;
use parking_lot::RwLock;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};

/// Raw table behind the lock. Only `LedgerTransaction` writes it.
#[derive(Debug)]
pub(crate) struct LedgerState {
    pub(crate) next_id: OrderId,
    pub(crate) orders: BTreeMap<OrderId, Order>,
    /// (buy_currency, sell_currency) -> ids of resting orders, ascending
    resting: HashMap<(String, String), BTreeSet<OrderId>>,
}

impl LedgerState {
    fn new() -> Self {
        Self {
            next_id: OrderId::new(1),
            orders: BTreeMap::new(),
            resting: HashMap::new(),
        }
    }

    pub(crate) fn index_resting(&mut self, id: OrderId, buy: &str, sell: &str) {
        self.resting
            .entry((buy.to_string(), sell.to_string()))
            .or_default()
            .insert(id);
    }

    pub(crate) fn unindex_resting(&mut self, id: OrderId, buy: &str, sell: &str) {
        let key = (buy.to_string(), sell.to_string());
        if let Some(ids) = self.resting.get_mut(&key) {
            ids.remove(&id);
            if ids.is_empty() {
                self.resting.remove(&key);
            }
        }
    }

    /// Resting orders buying `buy` with `sell`, ascending id
    fn resting_in(&self, buy: &str, sell: &str) -> impl Iterator<Item = &Order> {
        self.resting
            .get(&(buy.to_string(), sell.to_string()))
            .into_iter()
            .flatten()
            .filter_map(move |id| self.orders.get(id))
    }
}

/// Process-local ledger.
///
/// Reads take the shared lock for one snapshot copy; every write goes through
/// a `LedgerTransaction` holding the exclusive lock.
pub struct InMemoryLedger {
    state: RwLock<LedgerState>,
    max_orders: Option<usize>,
    available: AtomicBool,
}

impl InMemoryLedger {
    pub fn new() -> Self {
        Self {
            state: RwLock::new(LedgerState::new()),
            max_orders: None,
            available: AtomicBool::new(true),
        }
    }

    /// Refuse inserts once `limit` orders (resting and settled) are stored.
    pub fn with_capacity_limit(limit: usize) -> Self {
        Self {
            max_orders: Some(limit),
            ..Self::new()
        }
    }

    /// Take the ledger offline or bring it back. While offline every
    /// operation fails with `LedgerError::Unavailable`.
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::Release);
    }

    pub fn len(&self) -> usize {
        self.state.read().orders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn ensure_available(&self) -> LedgerResult<()> {
        if self.available.load(Ordering::Acquire) {
            Ok(())
        } else {
            Err(LedgerError::Unavailable)
        }
    }

    /// Open a write transaction. Dropping it without `commit` undoes it.
    pub fn begin(&self) -> LedgerResult<LedgerTransaction<'_>> {
        self.ensure_available()?;
        Ok(LedgerTransaction::new(self.state.write(), self.max_orders))
    }

    /// Run `body` in a transaction, committing only if it returns `Ok`.
    pub fn transaction<T, F>(&self, body: F) -> LedgerResult<T>
    where
        F: FnOnce(&mut LedgerTransaction<'_>) -> LedgerResult<T>,
    {
        let mut txn = self.begin()?;
        let value = body(&mut txn)?;
        txn.commit();
        Ok(value)
    }
}

impl Default for InMemoryLedger {
    fn default() -> Self {
        Self::new()
    }
}

impl OrderLedger for InMemoryLedger {
    fn create(&self, order: NewOrder) -> LedgerResult<Order> {
        self.transaction(|txn| txn.insert(order, Utc::now()))
    }

    fn settle(&self, settlement: Settlement) -> LedgerResult<SettlementReceipt> {
        let Settlement {
            incoming,
            resting,
            filled_at,
            remainder,
        } = settlement;

        self.transaction(|txn| {
            txn.pair_fill(incoming, resting, filled_at)?;
            let derived = match remainder {
                Some(terms) => Some(txn.insert(terms, filled_at)?),
                None => None,
            };
            Ok(SettlementReceipt {
                incoming: txn.order(incoming)?.clone(),
                resting: txn.order(resting)?.clone(),
                derived,
            })
        })
    }

    fn withdraw(&self, id: OrderId) -> LedgerResult<Order> {
        self.transaction(|txn| txn.remove(id))
    }

    fn find_crossing(&self, query: &CrossingQuery) -> LedgerResult<Vec<Order>> {
        self.ensure_available()?;
        let state = self.state.read();
        let crossing = state
            .resting_in(&query.sell_currency, &query.buy_currency)
            .filter(|order| query.admits(order))
            .cloned()
            .collect();
        Ok(crossing)
    }

    fn get(&self, id: OrderId) -> LedgerResult<Option<Order>> {
        self.ensure_available()?;
        Ok(self.state.read().orders.get(&id).cloned())
    }

    fn list_all(&self) -> LedgerResult<Vec<Order>> {
        self.ensure_available()?;
        Ok(self.state.read().orders.values().cloned().collect())
    }

    fn list_resting(&self) -> LedgerResult<Vec<Order>> {
        self.ensure_available()?;
        let state = self.state.read();
        let mut ids: Vec<OrderId> = state.resting.values().flatten().copied().collect();
        ids.sort_unstable();
        let resting = ids
            .into_iter()
            .filter_map(|id| state.orders.get(&id).cloned())
            .collect();
        Ok(resting)
    }
}
