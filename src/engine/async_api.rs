// ============================================================================
// Async Submission API
// Runs blocking submissions off the tokio reactor threads
// ============================================================================

use super::MatchingEngine;
use serde_json::Value;
use std::sync::Arc;

/// `MatchingEngine::submit` on tokio's blocking pool.
///
/// Signature recovery and ledger locks are blocking work; transports built on
/// tokio should submit through here rather than call `submit` on a reactor
/// thread.
pub async fn submit_async(engine: Arc<MatchingEngine>, request: Value) -> bool {
    match tokio::task::spawn_blocking(move || engine.submit(&request)).await {
        Ok(accepted) => accepted,
        Err(e) => {
            tracing::error!(error = %e, "submission task failed");
            false
        }
    }
}

/// `MatchingEngine::submit_json` on tokio's blocking pool
pub async fn submit_json_async(engine: Arc<MatchingEngine>, body: String) -> bool {
    match tokio::task::spawn_blocking(move || engine.submit_json(&body)).await {
        Ok(accepted) => accepted,
        Err(e) => {
            tracing::error!(error = %e, "submission task failed");
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::ExchangeBuilder;
    use crate::testing::EthereumWallet;

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_concurrent_async_submissions() {
        let engine = Arc::new(ExchangeBuilder::new().build().unwrap());
        let seller = EthereumWallet::from_seed(1);
        assert!(submit_async(Arc::clone(&engine), seller.order("Y", "X", 50, 100)).await);

        let tasks: Vec<_> = (2..6)
            .map(|seed| {
                let engine = Arc::clone(&engine);
                let request = EthereumWallet::from_seed(seed).order("X", "Y", 100, 50);
                tokio::spawn(submit_async(engine, request))
            })
            .collect();

        for task in tasks {
            assert!(task.await.unwrap());
        }

        // one buyer took the seller's order, the other three rest
        assert_eq!(engine.open_orders().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_invalid_body() {
        let engine = Arc::new(ExchangeBuilder::new().build().unwrap());
        assert!(!submit_json_async(engine, "[]".to_string()).await);
    }
}
