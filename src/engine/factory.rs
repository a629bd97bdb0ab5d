// ============================================================================
// Exchange Factory
// Creates matching engines with proper configuration
// ============================================================================

use crate::audit::{FileAuditLog, MemoryAuditLog};
use crate::domain::ExchangeConfig;
use crate::engine::MatchingEngine;
use crate::error::{ExchangeError, ExchangeResult};
use crate::interfaces::{AuditLog, EventHandler, NoOpEventHandler, OrderLedger, SignatureScheme};
use crate::ledger::InMemoryLedger;
use crate::signing::SignatureVerifier;
use std::path::PathBuf;
use std::sync::Arc;

// ============================================================================
// Factory Functions
// ============================================================================

/// Creates a matching engine from configuration
///
/// The ledger is in memory (capped at `max_orders` if set); the audit log is
/// a JSON-lines file when `audit_log_path` is set and in memory otherwise.
///
/// # Example
/// ```
/// use signed_order_exchange::prelude::*;
/// use std::sync::Arc;
///
/// let config = ExchangeConfig::ethereum_only();
/// let engine = create_from_config(config, Arc::new(NoOpEventHandler)).unwrap();
/// assert_eq!(engine.verifier().platforms(), vec!["Ethereum"]);
/// ```
pub fn create_from_config(
    config: ExchangeConfig,
    event_handler: Arc<dyn EventHandler>,
) -> ExchangeResult<MatchingEngine> {
    ExchangeBuilder::from_config(config)
        .with_event_handler(event_handler)
        .build()
}

fn create_audit_log(path: Option<&PathBuf>) -> ExchangeResult<Arc<dyn AuditLog>> {
    match path {
        Some(path) => {
            let log = FileAuditLog::open(path).map_err(|e| {
                ExchangeError::Config(format!(
                    "cannot open audit log {}: {}",
                    path.display(),
                    e
                ))
            })?;
            Ok(Arc::new(log))
        }
        None => Ok(Arc::new(MemoryAuditLog::new())),
    }
}

// ============================================================================
// Builder Pattern for Advanced Configuration
// ============================================================================

/// Builder for creating matching engines with fluent API
///
/// # Example
/// ```
/// use signed_order_exchange::prelude::*;
/// use std::sync::Arc;
///
/// let audit = Arc::new(MemoryAuditLog::new());
/// let engine = ExchangeBuilder::new()
///     .with_audit_log(audit.clone())
///     .max_settlement_attempts(4)
///     .build()
///     .unwrap();
///
/// assert!(!engine.submit_json("{}"));
/// assert_eq!(audit.len(), 1);
/// ```
pub struct ExchangeBuilder {
    config: ExchangeConfig,
    verifier: SignatureVerifier,
    ledger: Option<Arc<dyn OrderLedger>>,
    audit_log: Option<Arc<dyn AuditLog>>,
    event_handler: Arc<dyn EventHandler>,
}

impl ExchangeBuilder {
    /// Ethereum and Algorand, in-memory ledger and audit log, no event handler
    pub fn new() -> Self {
        Self::from_config(ExchangeConfig::default())
    }

    pub fn from_config(config: ExchangeConfig) -> Self {
        Self {
            config,
            verifier: SignatureVerifier::with_default_schemes(),
            ledger: None,
            audit_log: None,
            event_handler: Arc::new(NoOpEventHandler),
        }
    }

    // ========================================================================
    // Platform Configuration
    // ========================================================================

    /// Accept only these platform tags
    pub fn platforms<I, S>(mut self, platforms: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.config.platforms = platforms.into_iter().map(Into::into).collect();
        self
    }

    /// Register an additional scheme and accept its platform
    pub fn with_scheme<S: SignatureScheme + 'static>(mut self, scheme: S) -> Self {
        let platform = scheme.platform().to_string();
        self.verifier.register(scheme);
        if !self.config.platforms.contains(&platform) {
            self.config.platforms.push(platform);
        }
        self
    }

    // ========================================================================
    // Collaborators
    // ========================================================================

    /// Use this ledger instead of a fresh in-memory one. `max_orders` is then
    /// the ledger's own business.
    pub fn with_ledger(mut self, ledger: Arc<dyn OrderLedger>) -> Self {
        self.ledger = Some(ledger);
        self
    }

    /// Use this audit sink instead of the configured one
    pub fn with_audit_log(mut self, audit_log: Arc<dyn AuditLog>) -> Self {
        self.audit_log = Some(audit_log);
        self
    }

    pub fn with_event_handler(mut self, event_handler: Arc<dyn EventHandler>) -> Self {
        self.event_handler = event_handler;
        self
    }

    // ========================================================================
    // Limits
    // ========================================================================

    pub fn max_settlement_attempts(mut self, attempts: usize) -> Self {
        self.config.max_settlement_attempts = attempts;
        self
    }

    pub fn max_orders(mut self, limit: usize) -> Self {
        self.config.max_orders = Some(limit);
        self
    }

    pub fn audit_log_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.audit_log_path = Some(path.into());
        self
    }

    /// Validate the configuration and build the engine
    pub fn build(self) -> ExchangeResult<MatchingEngine> {
        self.config.validate()?;
        let verifier = self.verifier.restricted_to(&self.config.platforms)?;

        let ledger = match self.ledger {
            Some(ledger) => ledger,
            None => match self.config.max_orders {
                Some(limit) => Arc::new(InMemoryLedger::with_capacity_limit(limit)),
                None => Arc::new(InMemoryLedger::new()),
            },
        };

        let audit_log = match self.audit_log {
            Some(audit_log) => audit_log,
            None => create_audit_log(self.config.audit_log_path.as_ref())?,
        };

        tracing::debug!(
            platforms = ?verifier.platforms(),
            max_settlement_attempts = self.config.max_settlement_attempts,
            "matching engine configured"
        );

        Ok(
            MatchingEngine::new(verifier, ledger, audit_log, self.event_handler)
                .with_max_settlement_attempts(self.config.max_settlement_attempts),
        )
    }
}

impl Default for ExchangeBuilder {
    fn default() -> Self {
        Self::new()
    }
}
