// ============================================================================
// Signing Module
// Canonical payload encoding and per-platform signature schemes
// ============================================================================

pub mod algorand;
pub mod canonical;
pub mod ethereum;
mod verifier;

pub use algorand::AlgorandScheme;
pub use ethereum::EthereumScheme;
pub use verifier::SignatureVerifier;
