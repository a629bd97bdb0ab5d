// ============================================================================
// Signature Scheme Interface
// Defines the contract for per-platform signature verification
// ============================================================================

/// Strategy pattern interface for signature verification
/// Implementations: EthereumScheme (key recovery), AlgorandScheme (direct Ed25519)
pub trait SignatureScheme: Send + Sync {
    /// Platform tag this scheme answers for (e.g. "Ethereum")
    fn platform(&self) -> &str;

    /// Check that `signature` over `message` was produced by `claimed_sender`
    ///
    /// # Arguments
    /// * `message` - Canonical payload bytes, exactly as signed
    /// * `signature` - Signature in the platform's text encoding
    /// * `claimed_sender` - Sender key/address in the platform's text encoding
    ///
    /// # Returns
    /// `false` for any malformed input or mismatch; never panics
    fn verify(&self, message: &[u8], signature: &str, claimed_sender: &str) -> bool;
}
