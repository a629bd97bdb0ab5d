// ============================================================================
// Matching Engine
// Validates, authenticates, persists and settles signed orders
// ============================================================================

use super::settlement::derive_remainder;
use crate::domain::{
    NewOrder, Order, OrderBookSnapshot, OrderId, SignedOrder, SubmissionState,
    SubmissionTransition, Trade, DEFAULT_MAX_SETTLEMENT_ATTEMPTS,
};
use crate::error::{ExchangeError, ExchangeResult, LedgerError, ShapeError};
use crate::interfaces::{
    AuditLog, CrossingQuery, EventHandler, ExchangeEvent, LogEntry, OrderLedger, Settlement,
    SettlementReceipt,
};
use crate::signing::SignatureVerifier;
use chrono::{DateTime, Utc};
use serde_json::Value;
use smallvec::SmallVec;
use std::sync::Arc;
use uuid::Uuid;

/// Per-call event buffer. A submission emits at most a handful of events.
type Events = SmallVec<[ExchangeEvent; 4]>;

/// What happened to an accepted submission
#[derive(Debug, Clone, PartialEq)]
pub enum Submission {
    /// Nothing crossed; the order is resting in the ledger
    Resting { order: Order },

    /// The order settled against the lowest-id crossing resting order
    Settled {
        trade: Trade,
        receipt: SettlementReceipt,
    },

    /// Another submission settled against this order before it could settle
    /// on its own
    TakenConcurrently { order_id: OrderId },
}

impl Submission {
    /// Id the ledger assigned to the submitted order
    pub fn order_id(&self) -> OrderId {
        match self {
            Submission::Resting { order } => order.id,
            Submission::Settled { trade, .. } => trade.taker_order_id,
            Submission::TakenConcurrently { order_id } => *order_id,
        }
    }

    pub fn trade(&self) -> Option<&Trade> {
        match self {
            Submission::Settled { trade, .. } => Some(trade),
            _ => None,
        }
    }

    pub fn derived_order(&self) -> Option<&Order> {
        match self {
            Submission::Settled { receipt, .. } => receipt.derived.as_ref(),
            _ => None,
        }
    }
}

/// Signed-order matching engine
///
/// Stateless between calls: every submission is processed independently and
/// the ledger is the only shared state. Safe to share across threads behind
/// an `Arc`.
pub struct MatchingEngine {
    /// Platform signature schemes
    verifier: SignatureVerifier,

    /// Transactional order store
    ledger: Arc<dyn OrderLedger>,

    /// Sink for refused submissions
    audit_log: Arc<dyn AuditLog>,

    /// Event handler for processing events
    event_handler: Arc<dyn EventHandler>,

    max_settlement_attempts: usize,
}

impl MatchingEngine {
    /// Create a new matching engine
    pub fn new(
        verifier: SignatureVerifier,
        ledger: Arc<dyn OrderLedger>,
        audit_log: Arc<dyn AuditLog>,
        event_handler: Arc<dyn EventHandler>,
    ) -> Self {
        Self {
            verifier,
            ledger,
            audit_log,
            event_handler,
            max_settlement_attempts: DEFAULT_MAX_SETTLEMENT_ATTEMPTS,
        }
    }

    /// Bound the crossing re-searches after lost settlement races (minimum 1)
    pub fn with_max_settlement_attempts(mut self, attempts: usize) -> Self {
        self.max_settlement_attempts = attempts.max(1);
        self
    }

    /// Submit an order request. `true` if it was accepted (resting or
    /// settled), `false` if it was refused or a storage fault occurred.
    pub fn submit(&self, request: &Value) -> bool {
        self.process(request).is_ok()
    }

    /// `submit` for a raw request body. Unparseable bodies are refused and
    /// audited verbatim.
    pub fn submit_json(&self, body: &str) -> bool {
        self.process_json(body).is_ok()
    }

    /// Submit an order request and report what happened to it
    pub fn process(&self, request: &Value) -> ExchangeResult<Submission> {
        self.observe(
            || request.to_string(),
            |submission_id, state, events| self.run(submission_id, request, state, events),
        )
    }

    pub fn process_json(&self, body: &str) -> ExchangeResult<Submission> {
        match serde_json::from_str::<Value>(body) {
            Ok(request) => self.process(&request),
            Err(e) => self.observe(
                || body.to_string(),
                |_, state, _| {
                    advance(state, SubmissionTransition::RejectShape);
                    Err(ShapeError::InvalidJson(e.to_string()).into())
                },
            ),
        }
    }

    /// Every order, resting and settled, in id order
    pub fn order_book(&self) -> ExchangeResult<OrderBookSnapshot> {
        let orders = self.ledger.list_all()?;
        Ok(OrderBookSnapshot::from_orders(&orders))
    }

    /// Resting orders only, in id order
    pub fn open_orders(&self) -> ExchangeResult<Vec<Order>> {
        Ok(self.ledger.list_resting()?)
    }

    pub fn get_order(&self, id: OrderId) -> ExchangeResult<Option<Order>> {
        Ok(self.ledger.get(id)?)
    }

    pub fn verifier(&self) -> &SignatureVerifier {
        &self.verifier
    }

    pub fn max_settlement_attempts(&self) -> usize {
        self.max_settlement_attempts
    }

    // ========================================================================
    // Private methods
    // ========================================================================

    /// Runs `body` inside a submission span, audits a refusal and emits the
    /// collected events, ending with the submission's terminal state.
    fn observe<R, B>(&self, raw_request: R, body: B) -> ExchangeResult<Submission>
    where
        R: FnOnce() -> String,
        B: FnOnce(Uuid, &mut SubmissionState, &mut Events) -> ExchangeResult<Submission>,
    {
        let submission_id = Uuid::new_v4();
        let received_at = Utc::now();
        let span = tracing::info_span!("submission", %submission_id);
        let _entered = span.enter();

        let mut events = Events::new();
        events.push(ExchangeEvent::SubmissionReceived {
            submission_id,
            timestamp: received_at,
        });

        let mut state = SubmissionState::Received;
        let outcome = body(submission_id, &mut state, &mut events);
        if let Err(error) = &outcome {
            if !state.is_terminal() {
                advance(&mut state, SubmissionTransition::Fail);
            }
            self.record_failure(submission_id, received_at, error, raw_request, &mut events);
        }

        tracing::debug!(?state, "submission completed");
        events.push(ExchangeEvent::SubmissionCompleted {
            submission_id,
            state,
            timestamp: Utc::now(),
        });
        self.event_handler.on_events(events.into_vec());
        outcome
    }

    fn record_failure<R: FnOnce() -> String>(
        &self,
        submission_id: Uuid,
        received_at: DateTime<Utc>,
        error: &ExchangeError,
        raw_request: R,
        events: &mut Events,
    ) {
        let reason = error.reason();
        if error.is_rejection() {
            tracing::warn!(?reason, %error, "submission rejected");
            self.audit_log
                .append(LogEntry::new(raw_request(), reason, received_at));
        } else {
            tracing::warn!(%error, "submission failed");
        }
        events.push(ExchangeEvent::SubmissionRejected {
            submission_id,
            reason,
            detail: error.to_string(),
            timestamp: Utc::now(),
        });
    }

    fn run(
        &self,
        submission_id: Uuid,
        request: &Value,
        state: &mut SubmissionState,
        events: &mut Events,
    ) -> ExchangeResult<Submission> {
        let (signed, terms) = match parse_request(request) {
            Ok(parsed) => parsed,
            Err(e) => {
                advance(state, SubmissionTransition::RejectShape);
                return Err(e.into());
            }
        };
        advance(state, SubmissionTransition::Validate);

        if let Err(e) = self.verifier.authenticate(&signed) {
            advance(state, SubmissionTransition::RejectAuth);
            return Err(e);
        }
        advance(state, SubmissionTransition::Authenticate);
        tracing::debug!(platform = %signed.payload.platform, "signature verified");

        let incoming = self.ledger.create(terms)?;
        advance(state, SubmissionTransition::Persist);
        tracing::debug!(order_id = %incoming.id, "order resting");
        events.push(ExchangeEvent::OrderRested {
            submission_id,
            order_id: incoming.id,
            timestamp: incoming.created_at,
        });

        let outcome = match self.settle(submission_id, &incoming, events) {
            Ok(outcome) => outcome,
            Err(fault) => self.withdraw(submission_id, &incoming, fault, events)?,
        };
        advance(
            state,
            match outcome {
                Submission::Resting { .. } => SubmissionTransition::NoCrossing,
                _ => SubmissionTransition::Settle,
            },
        );
        Ok(outcome)
    }

    /// Crossing search and settlement, re-searching after lost races.
    fn settle(
        &self,
        submission_id: Uuid,
        incoming: &Order,
        events: &mut Events,
    ) -> ExchangeResult<Submission> {
        let query = CrossingQuery::for_order(incoming);

        for attempt in 1..=self.max_settlement_attempts {
            // Tie-break: lowest id
            let Some(matched) = self.ledger.find_crossing(&query)?.into_iter().next() else {
                return self.resting_outcome(incoming);
            };

            let filled_at = Utc::now();
            let remainder = derive_remainder(incoming, &matched)?;
            let settlement =
                Settlement::pair(incoming.id, matched.id, filled_at).with_remainder(remainder);

            match self.ledger.settle(settlement) {
                Ok(receipt) => {
                    let derived_id = receipt.derived.as_ref().map(|order| order.id);
                    let trade = Trade::new(matched.id, incoming.id, filled_at, derived_id);
                    tracing::info!(
                        maker = %trade.maker_order_id,
                        taker = %trade.taker_order_id,
                        derived = ?derived_id,
                        "orders settled"
                    );

                    events.push(ExchangeEvent::OrdersSettled {
                        submission_id,
                        trade: trade.clone(),
                        timestamp: filled_at,
                    });
                    if let Some(derived) = &receipt.derived {
                        events.push(ExchangeEvent::RemainderCreated {
                            submission_id,
                            order_id: derived.id,
                            creator_id: derived.creator_id.unwrap_or(incoming.id),
                            timestamp: filled_at,
                        });
                    }
                    return Ok(Submission::Settled { trade, receipt });
                }
                Err(LedgerError::AlreadyFilled { id }) if id == incoming.id => {
                    tracing::debug!(order_id = %incoming.id, "order was settled by another submission");
                    return Ok(Submission::TakenConcurrently {
                        order_id: incoming.id,
                    });
                }
                Err(LedgerError::AlreadyFilled { id }) => {
                    tracing::debug!(resting = %id, attempt, "lost settlement race; searching again");
                    events.push(ExchangeEvent::SettlementConflict {
                        submission_id,
                        resting_order_id: id,
                        timestamp: Utc::now(),
                    });
                }
                Err(e) => return Err(e.into()),
            }
        }

        tracing::warn!(
            order_id = %incoming.id,
            attempts = self.max_settlement_attempts,
            "settlement attempts exhausted; order left resting"
        );
        self.resting_outcome(incoming)
    }

    /// Current copy of an order that found nothing to settle against. Another
    /// submission may have traded against it in the meantime.
    fn resting_outcome(&self, incoming: &Order) -> ExchangeResult<Submission> {
        match self.ledger.get(incoming.id)? {
            Some(order) if order.is_resting() => Ok(Submission::Resting { order }),
            Some(_) => {
                tracing::debug!(order_id = %incoming.id, "order was settled by another submission");
                Ok(Submission::TakenConcurrently {
                    order_id: incoming.id,
                })
            }
            None => Err(LedgerError::NotFound { id: incoming.id }.into()),
        }
    }

    /// Undo the insert of an order whose settlement failed. An order that
    /// another submission already traded against stays, and the submission
    /// counts as accepted.
    fn withdraw(
        &self,
        submission_id: Uuid,
        incoming: &Order,
        fault: ExchangeError,
        events: &mut Events,
    ) -> ExchangeResult<Submission> {
        match self.ledger.withdraw(incoming.id) {
            Ok(_) => {
                tracing::debug!(order_id = %incoming.id, "order withdrawn after failed settlement");
                events.push(ExchangeEvent::OrderWithdrawn {
                    submission_id,
                    order_id: incoming.id,
                    timestamp: Utc::now(),
                });
                Err(fault)
            }
            Err(LedgerError::AlreadyFilled { .. }) => {
                tracing::debug!(order_id = %incoming.id, error = %fault, "order was settled by another submission");
                Ok(Submission::TakenConcurrently {
                    order_id: incoming.id,
                })
            }
            Err(e) => {
                tracing::error!(order_id = %incoming.id, error = %e, "cannot withdraw order after failed settlement");
                Err(fault)
            }
        }
    }
}

/// Shape validation, including the terms the ledger will store.
fn parse_request(request: &Value) -> Result<(SignedOrder, NewOrder), ShapeError> {
    let signed = SignedOrder::from_value(request)?;
    let terms = signed.to_new_order()?;
    Ok((signed, terms))
}

fn advance(state: &mut SubmissionState, transition: SubmissionTransition) {
    match state.transition(transition) {
        Ok(next) => {
            tracing::trace!(from = ?state, to = ?next, "submission state");
            *state = next;
        }
        Err(e) => tracing::error!("{}", e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::MemoryAuditLog;
    use crate::error::{LedgerResult, RejectReason};
    use crate::interfaces::{NoOpEventHandler, RecordingEventHandler};
    use crate::ledger::InMemoryLedger;
    use crate::numeric::Amount;
    use crate::testing::EthereumWallet;
    use rust_decimal::Decimal;
    use serde_json::json;

    struct Harness {
        engine: MatchingEngine,
        ledger: Arc<InMemoryLedger>,
        audit: Arc<MemoryAuditLog>,
        events: Arc<RecordingEventHandler>,
    }

    fn harness() -> Harness {
        harness_with(InMemoryLedger::new())
    }

    fn harness_with(ledger: InMemoryLedger) -> Harness {
        let ledger = Arc::new(ledger);
        let audit = Arc::new(MemoryAuditLog::new());
        let events = Arc::new(RecordingEventHandler::new());
        let engine = MatchingEngine::new(
            SignatureVerifier::with_default_schemes(),
            ledger.clone(),
            audit.clone(),
            events.clone(),
        );
        Harness {
            engine,
            ledger,
            audit,
            events,
        }
    }

    #[test]
    fn test_resting_submission() {
        let h = harness();
        let alice = EthereumWallet::from_seed(1);

        let outcome = h.engine.process(&alice.order("X", "Y", 100, 50)).unwrap();

        assert!(matches!(outcome, Submission::Resting { .. }));
        assert_eq!(h.events.completed_states(), vec![SubmissionState::StillResting]);
        assert_eq!(outcome.order_id(), OrderId::new(1));
        assert!(outcome.trade().is_none());
        assert_eq!(h.engine.open_orders().unwrap().len(), 1);
        assert!(h.audit.is_empty());
    }

    #[test]
    fn test_settlement_emits_events() {
        let h = harness();
        let alice = EthereumWallet::from_seed(1);
        let bob = EthereumWallet::from_seed(2);

        assert!(h.engine.submit(&alice.order("Y", "X", 40, 80)));
        let outcome = h.engine.process(&bob.order("X", "Y", 100, 50)).unwrap();

        let trade = outcome.trade().unwrap();
        assert_eq!(trade.maker_order_id, OrderId::new(1));
        assert_eq!(trade.taker_order_id, OrderId::new(2));
        assert_eq!(trade.derived_order_id, Some(OrderId::new(3)));

        let derived = outcome.derived_order().unwrap();
        assert_eq!(derived.buy_amount().as_decimal(), Decimal::from(20));
        assert_eq!(derived.sell_amount().as_decimal(), Decimal::from(10));
        assert_eq!(derived.sender_pk, bob.address());

        assert_eq!(h.events.trades(), vec![trade.clone()]);
        assert!(h
            .events
            .events()
            .iter()
            .any(|e| matches!(e, ExchangeEvent::RemainderCreated { creator_id, .. } if *creator_id == OrderId::new(2))));
    }

    #[test]
    fn test_shape_rejection_is_audited_with_raw_request() {
        let h = harness();
        let request = json!({ "payload": { "sender_pk": "0xA" } });

        assert!(!h.engine.submit(&request));

        let entries = h.audit.entries();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].reason, RejectReason::Shape);
        assert_eq!(
            serde_json::from_str::<Value>(&entries[0].message).unwrap(),
            request
        );
        assert!(h.ledger.is_empty());
    }

    #[test]
    fn test_unparseable_body_is_audited_verbatim() {
        let h = harness();
        assert!(!h.engine.submit_json("{not json"));

        let entries = h.audit.entries();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].message, "{not json");
        assert_eq!(entries[0].reason, RejectReason::Shape);
    }

    #[test]
    fn test_tampered_payload_fails_authentication() {
        let h = harness();
        let alice = EthereumWallet::from_seed(1);
        let mut request = alice.order("X", "Y", 100, 50);
        request["payload"]["buy_amount"] = json!(1000);

        let err = h.engine.process(&request).unwrap_err();

        assert_eq!(err.reason(), RejectReason::Authentication);
        assert_eq!(h.audit.count(RejectReason::Authentication), 1);
        assert!(h.ledger.is_empty());
    }

    #[test]
    fn test_storage_fault_is_not_audited() {
        let h = harness();
        let alice = EthereumWallet::from_seed(1);
        h.ledger.set_available(false);

        let err = h.engine.process(&alice.order("X", "Y", 100, 50)).unwrap_err();

        assert_eq!(err, ExchangeError::Storage(LedgerError::Unavailable));
        assert!(h.audit.is_empty());
        assert!(h.events.events().iter().any(|e| matches!(
            e,
            ExchangeEvent::SubmissionRejected {
                reason: RejectReason::Fault,
                ..
            }
        )));
    }

    #[test]
    fn test_attempt_bound_has_a_floor() {
        let engine = MatchingEngine::new(
            SignatureVerifier::new(),
            Arc::new(InMemoryLedger::new()),
            Arc::new(MemoryAuditLog::new()),
            Arc::new(NoOpEventHandler),
        )
        .with_max_settlement_attempts(0);
        assert_eq!(engine.max_settlement_attempts(), 1);
    }

    #[test]
    fn test_terminal_states_are_reported() {
        let h = harness();
        let alice = EthereumWallet::from_seed(1);
        let bob = EthereumWallet::from_seed(2);
        let mut forged = alice.order("X", "Y", 1, 1);
        forged["payload"]["sell_amount"] = json!(2);

        assert!(h.engine.submit(&alice.order("Y", "X", 50, 100)));
        assert!(h.engine.submit(&bob.order("X", "Y", 100, 50)));
        assert!(!h.engine.submit(&json!({ "sig": "0x" })));
        assert!(!h.engine.submit(&forged));
        h.ledger.set_available(false);
        assert!(!h.engine.submit(&alice.order("X", "Y", 1, 1)));

        assert_eq!(
            h.events.completed_states(),
            vec![
                SubmissionState::StillResting,
                SubmissionState::Settled,
                SubmissionState::RejectedShape,
                SubmissionState::RejectedAuth,
                SubmissionState::Failed,
            ]
        );
    }

    #[test]
    fn test_settlement_fault_withdraws_the_incoming_order() {
        // room for two orders: the remainder of a partial fill does not fit
        let h = harness_with(InMemoryLedger::with_capacity_limit(2));
        let alice = EthereumWallet::from_seed(1);
        let bob = EthereumWallet::from_seed(2);
        let carol = EthereumWallet::from_seed(3);

        assert!(h.engine.submit(&alice.order("Y", "X", 40, 80)));
        let err = h.engine.process(&bob.order("X", "Y", 100, 50)).unwrap_err();

        assert_eq!(
            err,
            ExchangeError::Storage(LedgerError::CapacityExceeded { limit: 2 })
        );
        let open: Vec<OrderId> = h.engine.open_orders().unwrap().iter().map(|o| o.id).collect();
        assert_eq!(open, vec![OrderId::new(1)]);
        assert_eq!(h.ledger.len(), 1);
        assert!(h.audit.is_empty());
        assert!(h
            .events
            .events()
            .iter()
            .any(|e| matches!(e, ExchangeEvent::OrderWithdrawn { order_id, .. } if *order_id == OrderId::new(2))));
        assert_eq!(h.events.completed_states()[1], SubmissionState::Failed);

        // the withdrawn order never trades; alice's order still does
        let outcome = h.engine.process(&carol.order("X", "Y", 80, 40)).unwrap();
        let trade = outcome.trade().unwrap();
        assert_eq!(trade.maker_order_id, OrderId::new(1));
        assert!(trade.is_exact_fill());
        assert_eq!(h.engine.get_order(OrderId::new(2)).unwrap(), None);
    }

    /// Ledger that lets another party act right before the first crossing
    /// search, the way a concurrent submission would.
    struct InterleavedLedger {
        inner: InMemoryLedger,
        before_search: parking_lot::Mutex<Option<Box<dyn FnOnce(&InMemoryLedger) + Send>>>,
    }

    impl OrderLedger for InterleavedLedger {
        fn create(&self, order: NewOrder) -> LedgerResult<Order> {
            self.inner.create(order)
        }

        fn settle(&self, settlement: Settlement) -> LedgerResult<SettlementReceipt> {
            self.inner.settle(settlement)
        }

        fn withdraw(&self, id: OrderId) -> LedgerResult<Order> {
            self.inner.withdraw(id)
        }

        fn find_crossing(&self, query: &CrossingQuery) -> LedgerResult<Vec<Order>> {
            let action = self.before_search.lock().take();
            if let Some(action) = action {
                action(&self.inner);
            }
            self.inner.find_crossing(query)
        }

        fn get(&self, id: OrderId) -> LedgerResult<Option<Order>> {
            self.inner.get(id)
        }

        fn list_all(&self) -> LedgerResult<Vec<Order>> {
            self.inner.list_all()
        }
    }

    #[test]
    fn test_order_taken_before_its_own_search_is_not_reported_resting() {
        // another submission fills order 1 before its own crossing search runs
        let interleave: Box<dyn FnOnce(&InMemoryLedger) + Send> = Box::new(|ledger| {
            let taker = NewOrder::new(
                "0xC",
                "0xC",
                "Y",
                "X",
                Amount::from_integer(50).unwrap(),
                Amount::from_integer(100).unwrap(),
                "Ethereum",
            )
            .unwrap();
            let taker = ledger.create(taker).unwrap();
            ledger
                .atomic_pair_fill(taker.id, OrderId::new(1), Utc::now())
                .unwrap();
        });
        let ledger = Arc::new(InterleavedLedger {
            inner: InMemoryLedger::new(),
            before_search: parking_lot::Mutex::new(Some(interleave)),
        });
        let events = Arc::new(RecordingEventHandler::new());
        let engine = MatchingEngine::new(
            SignatureVerifier::with_default_schemes(),
            ledger.clone(),
            Arc::new(MemoryAuditLog::new()),
            events.clone(),
        );

        let outcome = engine
            .process(&EthereumWallet::from_seed(1).order("X", "Y", 100, 50))
            .unwrap();

        assert_eq!(
            outcome,
            Submission::TakenConcurrently {
                order_id: OrderId::new(1)
            }
        );
        assert_eq!(events.completed_states(), vec![SubmissionState::Settled]);
        assert!(ledger.list_resting().unwrap().is_empty());
    }
}
