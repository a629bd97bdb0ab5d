// ============================================================================
// Basic Usage Example
// ============================================================================

use signed_order_exchange::prelude::*;
use signed_order_exchange::testing::{order_payload, sign_ethereum, EthereumWallet};
use std::sync::Arc;

fn print_book(engine: &MatchingEngine) {
    match engine.order_book().and_then(|book| {
        book.to_json()
            .map_err(|e| ExchangeError::Config(e.to_string()))
    }) {
        Ok(json) => println!("Order book: {}\n", json),
        Err(e) => println!("Order book unavailable: {}\n", e),
    }
}

fn main() {
    println!("=== Signed-Order Exchange Example ===\n");

    let audit = Arc::new(MemoryAuditLog::new());
    let engine = ExchangeBuilder::new()
        .with_audit_log(audit.clone())
        .with_event_handler(Arc::new(LoggingEventHandler))
        .build()
        .expect("default configuration is valid");

    let alice = EthereumWallet::from_seed(1);
    let bob = EthereumWallet::from_seed(2);
    let carol = EthereumWallet::from_seed(3);

    // Scenario A: first order rests
    println!("Alice: buy 100 X for 50 Y");
    println!("  accepted: {}", engine.submit(&alice.order("X", "Y", 100, 50)));
    print_book(&engine);

    // Scenario B: exact counter-order settles both
    println!("Bob: buy 50 Y for 100 X");
    println!("  accepted: {}", engine.submit(&bob.order("Y", "X", 50, 100)));
    print_book(&engine);

    // Scenario C: partial fill leaves a remainder
    println!("Carol: buy 40 Y for 80 X");
    println!("  accepted: {}", engine.submit(&carol.order("Y", "X", 40, 80)));
    println!("Alice: buy 100 X for 50 Y");
    match engine.process(&alice.order("X", "Y", 100, 50)) {
        Ok(outcome) => {
            if let Some(derived) = outcome.derived_order() {
                println!(
                    "  remainder #{}: buy {} {} for {} {}",
                    derived.id.value(),
                    derived.buy_amount(),
                    derived.buy_currency,
                    derived.sell_amount(),
                    derived.sell_currency
                );
            }
        }
        Err(e) => println!("  refused: {}", e),
    }
    print_book(&engine);

    // Refused: unknown platform
    let unknown = sign_ethereum(
        alice.secret_key(),
        order_payload(alice.address(), alice.address(), "X", "Y", 1, 1, "Unknown"),
    );
    println!("Order on an unknown platform");
    println!("  accepted: {}", engine.submit(&unknown));
    println!("  audit entries: {}", audit.len());

    match engine.open_orders() {
        Ok(open) => println!("\nOpen orders: {}", open.len()),
        Err(e) => println!("\nOpen orders unavailable: {}", e),
    }
}
