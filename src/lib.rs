// ============================================================================
// Signed-Order Exchange Library
// Matching core for a peer-to-peer exchange of cryptographically signed orders
// ============================================================================

//! # Signed-Order Exchange
//!
//! Matching core for a peer-to-peer exchange where every order is signed by
//! its sender's blockchain key.
//!
//! ## Features
//!
//! - **Per-platform signature schemes**: Ethereum (secp256k1 recovery over
//!   EIP-191 messages) and Algorand (Ed25519), behind one registry
//! - **Exact crossing**: exchange rates compared by cross-multiplication
//! - **Atomic settlement**: both fills and the partial-fill remainder commit
//!   together or not at all
//! - **Audit trail** of every refused submission, raw request included
//! - **Observer events** and `tracing` spans per submission
//!
//! ## Example
//!
//! ```rust
//! use signed_order_exchange::prelude::*;
//! use signed_order_exchange::testing::EthereumWallet;
//!
//! let engine = ExchangeBuilder::new().build().unwrap();
//! let alice = EthereumWallet::from_seed(1);
//! let bob = EthereumWallet::from_seed(2);
//!
//! // Alice buys 50 Y for 100 X; Bob buys 100 X for 50 Y
//! assert!(engine.submit(&alice.order("Y", "X", 50, 100)));
//! assert!(engine.submit(&bob.order("X", "Y", 100, 50)));
//!
//! // Both orders settled against each other
//! assert!(engine.open_orders().unwrap().is_empty());
//! println!("{}", engine.order_book().unwrap().to_json().unwrap());
//! ```

pub mod audit;
pub mod domain;
pub mod engine;
pub mod error;
pub mod interfaces;
pub mod ledger;
pub mod numeric;
pub mod signing;
pub mod testing;
pub mod utils;

// Re-exports for convenience
pub mod prelude {
    pub use crate::audit::{FileAuditLog, MemoryAuditLog};
    pub use crate::domain::{
        ExchangeConfig, NewOrder, Order, OrderBookEntry, OrderBookSnapshot, OrderId,
        SignedOrder, SubmissionState, Trade, ALGORAND, ETHEREUM,
    };
    pub use crate::engine::{create_from_config, ExchangeBuilder, MatchingEngine, Submission};
    pub use crate::error::{ExchangeError, LedgerError, RejectReason, ShapeError};
    pub use crate::interfaces::{
        AuditLog, CrossingQuery, EventHandler, ExchangeEvent, LogEntry, LoggingEventHandler,
        NoOpEventHandler, OrderLedger, SignatureScheme,
    };
    pub use crate::ledger::InMemoryLedger;
    pub use crate::numeric::Amount;
    pub use crate::signing::{AlgorandScheme, EthereumScheme, SignatureVerifier};
}

#[cfg(test)]
mod integration_tests {
    use super::prelude::*;
    use crate::interfaces::RecordingEventHandler;
    use crate::testing::{order_payload, sign_ethereum, AlgorandWallet, EthereumWallet};
    use proptest::prelude::*;
    use rust_decimal::Decimal;
    use serde_json::{json, Value};
    use std::sync::Arc;
    use std::thread;

    struct Exchange {
        engine: MatchingEngine,
        audit: Arc<MemoryAuditLog>,
        events: Arc<RecordingEventHandler>,
    }

    fn exchange() -> Exchange {
        let audit = Arc::new(MemoryAuditLog::new());
        let events = Arc::new(RecordingEventHandler::new());
        let engine = ExchangeBuilder::new()
            .with_audit_log(audit.clone())
            .with_event_handler(events.clone())
            .build()
            .unwrap();
        Exchange {
            engine,
            audit,
            events,
        }
    }

    fn order(engine: &MatchingEngine, id: u64) -> Order {
        engine.get_order(OrderId::new(id)).unwrap().unwrap()
    }

    fn dec(value: i64) -> Decimal {
        Decimal::from(value)
    }

    #[test]
    fn test_scenario_a_first_order_rests() {
        let ex = exchange();
        let alice = EthereumWallet::from_seed(1);

        assert!(ex.engine.submit(&alice.order("X", "Y", 100, 50)));

        let book = ex.engine.order_book().unwrap();
        assert_eq!(book.len(), 1);
        assert_eq!(book.data[0].buy_amount.as_decimal(), dec(100));
        assert_eq!(book.data[0].sell_amount.as_decimal(), dec(50));

        let resting = order(&ex.engine, 1);
        assert!(resting.is_resting());
        assert_eq!(resting.creator_id, None);
        assert_eq!(resting.exchange_rate(), dec(2));
        assert!(ex.audit.is_empty());
    }

    #[test]
    fn test_scenario_b_exact_settlement() {
        let ex = exchange();
        let alice = EthereumWallet::from_seed(1);
        let bob = EthereumWallet::from_seed(2);

        assert!(ex.engine.submit(&alice.order("Y", "X", 50, 100)));
        assert!(ex.engine.submit(&bob.order("X", "Y", 100, 50)));

        let resting = order(&ex.engine, 1);
        let incoming = order(&ex.engine, 2);
        assert_eq!(resting.counterparty_id(), Some(incoming.id));
        assert_eq!(incoming.counterparty_id(), Some(resting.id));
        assert!(resting.filled_at().is_some());
        assert_eq!(resting.filled_at(), incoming.filled_at());

        // no derived order
        assert_eq!(ex.engine.order_book().unwrap().len(), 2);
        assert!(ex.engine.open_orders().unwrap().is_empty());
        assert!(ex.events.trades()[0].is_exact_fill());
    }

    #[test]
    fn test_scenario_c_partial_fill_derives_remainder() {
        let ex = exchange();
        let alice = EthereumWallet::from_seed(1);
        let bob = EthereumWallet::from_seed(2);

        assert!(ex.engine.submit(&alice.order("Y", "X", 40, 80)));
        assert!(ex.engine.submit(&bob.order("X", "Y", 100, 50)));

        let derived = order(&ex.engine, 3);
        assert_eq!(derived.buy_amount().as_decimal(), dec(20));
        assert_eq!(derived.sell_amount().as_decimal(), dec(10));
        assert_eq!(derived.buy_currency, "X");
        assert_eq!(derived.sell_currency, "Y");
        assert_eq!(derived.sender_pk, bob.address());
        assert_eq!(derived.creator_id, Some(OrderId::new(2)));
        assert_eq!(derived.exchange_rate(), dec(2));
        assert!(derived.is_resting());

        let open = ex.engine.open_orders().unwrap();
        assert_eq!(open.len(), 1);
        assert_eq!(open[0].id, derived.id);
    }

    #[test]
    fn test_scenario_d_unknown_platform() {
        let ex = exchange();
        let alice = EthereumWallet::from_seed(1);
        let request = sign_ethereum(
            alice.secret_key(),
            order_payload(alice.address(), alice.address(), "X", "Y", 100, 50, "Unknown"),
        );

        assert!(!ex.engine.submit(&request));
        assert_eq!(ex.audit.len(), 1);
        assert_eq!(ex.audit.entries()[0].reason, RejectReason::UnknownPlatform);
        assert!(ex.engine.order_book().unwrap().is_empty());
    }

    #[test]
    fn test_matched_side_remainder() {
        let ex = exchange();
        let alice = EthereumWallet::from_seed(1);
        let bob = EthereumWallet::from_seed(2);

        // Alice offers 120 X, Bob only wants 100
        assert!(ex.engine.submit(&alice.order("Y", "X", 60, 120)));
        assert!(ex.engine.submit(&bob.order("X", "Y", 100, 50)));

        let derived = order(&ex.engine, 3);
        assert_eq!(derived.creator_id, Some(OrderId::new(1)));
        assert_eq!(derived.sender_pk, alice.address());
        assert_eq!(derived.buy_amount().as_decimal(), dec(10));
        assert_eq!(derived.sell_amount().as_decimal(), dec(20));
        assert_eq!(derived.signature, None);
    }

    #[test]
    fn test_remainder_trades_on_later_submission() {
        let ex = exchange();
        let alice = EthereumWallet::from_seed(1);
        let bob = EthereumWallet::from_seed(2);
        let carol = EthereumWallet::from_seed(3);

        assert!(ex.engine.submit(&alice.order("Y", "X", 40, 80)));
        assert!(ex.engine.submit(&bob.order("X", "Y", 100, 50)));
        // remainder #3: buy 20 X for 10 Y
        assert!(ex.engine.submit(&carol.order("Y", "X", 10, 20)));

        let remainder = order(&ex.engine, 3);
        assert_eq!(remainder.counterparty_id(), Some(OrderId::new(4)));
        assert!(ex.engine.open_orders().unwrap().is_empty());
    }

    #[test]
    fn test_tie_break_prefers_lowest_id() {
        let ex = exchange();
        let bob = EthereumWallet::from_seed(2);

        // #1 is too expensive, #2 and #3 both cross
        assert!(ex.engine.submit(&EthereumWallet::from_seed(10).order("Y", "X", 60, 100)));
        assert!(ex.engine.submit(&EthereumWallet::from_seed(11).order("Y", "X", 50, 100)));
        assert!(ex.engine.submit(&EthereumWallet::from_seed(12).order("Y", "X", 40, 100)));
        assert!(ex.engine.submit(&bob.order("X", "Y", 100, 50)));

        assert_eq!(order(&ex.engine, 4).counterparty_id(), Some(OrderId::new(2)));
        assert!(order(&ex.engine, 1).is_resting());
        assert!(order(&ex.engine, 3).is_resting());
    }

    #[test]
    fn test_non_crossing_rate_stays_resting() {
        let ex = exchange();
        assert!(ex.engine.submit(&EthereumWallet::from_seed(1).order("Y", "X", 60, 100)));
        assert!(ex.engine.submit(&EthereumWallet::from_seed(2).order("X", "Y", 100, 50)));
        assert_eq!(ex.engine.open_orders().unwrap().len(), 2);
    }

    #[test]
    fn test_cross_platform_settlement() {
        let ex = exchange();
        let eth = EthereumWallet::from_seed(1);
        let algo = AlgorandWallet::from_seed(1);

        assert!(ex.engine.submit(&eth.order("ALGO", "ETH", 1000, 1)));
        assert!(ex.engine.submit(&algo.order("ETH", "ALGO", 1, 1000)));

        assert_eq!(order(&ex.engine, 2).platform, ALGORAND);
        assert_eq!(order(&ex.engine, 2).counterparty_id(), Some(OrderId::new(1)));
    }

    #[test]
    fn test_missing_fields_are_audited_once_each() {
        let alice = EthereumWallet::from_seed(1);
        let valid = alice.order("X", "Y", 100, 50);

        let mut requests = vec![
            json!({ "payload": valid["payload"].clone() }),
            json!({ "sig": valid["sig"].clone() }),
        ];
        for field in crate::domain::PAYLOAD_FIELDS {
            let mut request = valid.clone();
            request["payload"].as_object_mut().unwrap().remove(field);
            requests.push(request);
        }

        for request in &requests {
            let ex = exchange();
            assert!(!ex.engine.submit(request));
            assert_eq!(ex.audit.len(), 1);
            assert_eq!(ex.audit.count(RejectReason::Shape), 1);
            assert!(ex.engine.order_book().unwrap().is_empty());
        }
    }

    #[test]
    fn test_forged_signature_is_audited() {
        let ex = exchange();
        let alice = EthereumWallet::from_seed(1);
        let mallory = EthereumWallet::from_seed(9);

        // Mallory signs an order claiming to be Alice
        let forged = sign_ethereum(
            mallory.secret_key(),
            order_payload(alice.address(), alice.address(), "X", "Y", 100, 50, ETHEREUM),
        );

        assert!(!ex.engine.submit(&forged));
        assert_eq!(ex.audit.count(RejectReason::Authentication), 1);
        assert!(ex.engine.order_book().unwrap().is_empty());

        let logged: Value = serde_json::from_str(&ex.audit.entries()[0].message).unwrap();
        assert_eq!(logged, forged);
    }

    #[test]
    fn test_order_book_json_shape() {
        let ex = exchange();
        let alice = EthereumWallet::from_seed(1);
        let request = alice.order("X", "Y", 100, 50.5);
        assert!(ex.engine.submit(&request));

        let json: Value =
            serde_json::from_str(&ex.engine.order_book().unwrap().to_json().unwrap()).unwrap();
        let entry = &json["data"][0];

        assert_eq!(entry["buy_amount"], json!(100.0));
        assert_eq!(entry["sell_amount"], json!(50.5));
        assert_eq!(entry["signature"], request["sig"]);
        assert_eq!(entry["sender_pk"], json!(alice.address()));
        assert!(entry.get("id").is_none());
        assert!(entry.get("filled_at").is_none());
    }

    #[test]
    fn test_concurrent_submissions_settle_one_resting_order_once() {
        let ex = exchange();
        let engine = Arc::new(ex.engine);
        assert!(engine.submit(&EthereumWallet::from_seed(1).order("Y", "X", 50, 100)));

        let requests: Vec<Value> = (2..10)
            .map(|seed| EthereumWallet::from_seed(seed).order("X", "Y", 100, 50))
            .collect();

        let handles: Vec<_> = requests
            .into_iter()
            .map(|request| {
                let engine = Arc::clone(&engine);
                thread::spawn(move || engine.submit(&request))
            })
            .collect();
        for handle in handles {
            assert!(handle.join().unwrap());
        }

        let trades = ex.events.trades();
        assert_eq!(trades.len(), 1);
        assert_eq!(trades[0].maker_order_id, OrderId::new(1));

        let resting = order(&engine, 1);
        assert_eq!(resting.counterparty_id(), Some(trades[0].taker_order_id));
        assert_eq!(engine.open_orders().unwrap().len(), 7);
        assert!(ex.audit.is_empty());
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(24))]

        #[test]
        fn prop_every_stored_rate_is_buy_over_sell(
            orders in prop::collection::vec((any::<bool>(), 1i64..500, 1i64..500), 1..8)
        ) {
            let ex = exchange();
            for (seed, (flip, buy, sell)) in orders.into_iter().enumerate() {
                let wallet = EthereumWallet::from_seed(seed as u8);
                let (buy_ccy, sell_ccy) = if flip { ("X", "Y") } else { ("Y", "X") };
                // rounding may leave a remainder with nothing to carry
                let _ = ex.engine.process(&wallet.order(buy_ccy, sell_ccy, buy, sell));
            }

            for stored in ex.engine.open_orders().unwrap() {
                prop_assert_eq!(
                    stored.exchange_rate(),
                    stored.buy_amount().as_decimal() / stored.sell_amount().as_decimal()
                );
            }
            for trade in ex.events.trades() {
                let maker = order(&ex.engine, trade.maker_order_id.value());
                let taker = order(&ex.engine, trade.taker_order_id.value());
                prop_assert_eq!(maker.counterparty_id(), Some(taker.id));
                prop_assert_eq!(taker.counterparty_id(), Some(maker.id));
            }
        }
    }
}
