// ============================================================================
// Exchange Configuration
// Platforms, settlement retry bound, ledger limits and audit destination
// ============================================================================

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::error::ExchangeError;

/// Platform tag for the secp256k1 account-recovery scheme
pub const ETHEREUM: &str = "Ethereum";

/// Platform tag for the Ed25519 direct-verification scheme
pub const ALGORAND: &str = "Algorand";

/// Crossing searches a submission may run after losing settlement races
pub const DEFAULT_MAX_SETTLEMENT_ATTEMPTS: usize = 16;

// ============================================================================
// Complete Exchange Configuration
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExchangeConfig {
    /// Platform tags accepted for signature verification. Each must have a
    /// scheme registered with the verifier.
    pub platforms: Vec<String>,

    /// How many times a submission re-runs the crossing search after losing a
    /// settlement race before it is left resting
    pub max_settlement_attempts: usize,

    /// Optional: Upper bound on stored orders (resting and settled)
    /// None means unlimited
    pub max_orders: Option<usize>,

    /// Optional: JSON-lines file receiving audit entries
    /// None keeps the audit log in memory
    pub audit_log_path: Option<PathBuf>,
}

impl Default for ExchangeConfig {
    fn default() -> Self {
        Self {
            platforms: vec![ETHEREUM.to_string(), ALGORAND.to_string()],
            max_settlement_attempts: DEFAULT_MAX_SETTLEMENT_ATTEMPTS,
            max_orders: None,
            audit_log_path: None,
        }
    }
}

impl ExchangeConfig {
    pub fn new(platforms: Vec<String>) -> Self {
        Self {
            platforms,
            ..Self::default()
        }
    }

    /// Builder method: Set settlement retry bound
    pub fn with_max_settlement_attempts(mut self, attempts: usize) -> Self {
        self.max_settlement_attempts = attempts;
        self
    }

    /// Builder method: Cap the number of stored orders
    pub fn with_max_orders(mut self, limit: usize) -> Self {
        self.max_orders = Some(limit);
        self
    }

    /// Builder method: Write audit entries to a file
    pub fn with_audit_log_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.audit_log_path = Some(path.into());
        self
    }

    pub fn from_json_str(text: &str) -> Result<Self, ExchangeError> {
        let config: Self =
            serde_json::from_str(text).map_err(|e| ExchangeError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ExchangeError> {
        if self.platforms.is_empty() {
            return Err(ExchangeError::Config(
                "at least one platform must be enabled".to_string(),
            ));
        }

        if let Some(blank) = self.platforms.iter().find(|p| p.trim().is_empty()) {
            return Err(ExchangeError::Config(format!(
                "platform tag {:?} is blank",
                blank
            )));
        }

        if self.max_settlement_attempts == 0 {
            return Err(ExchangeError::Config(
                "max_settlement_attempts must be at least 1".to_string(),
            ));
        }

        if self.max_orders == Some(0) {
            return Err(ExchangeError::Config(
                "max_orders must be positive when set".to_string(),
            ));
        }

        Ok(())
    }
}

// ============================================================================
// Preset Configurations (Factory Methods)
// ============================================================================

impl ExchangeConfig {
    /// Only secp256k1-signed orders
    pub fn ethereum_only() -> Self {
        Self::new(vec![ETHEREUM.to_string()])
    }

    /// Only Ed25519-signed orders
    pub fn algorand_only() -> Self {
        Self::new(vec![ALGORAND.to_string()])
    }
}
