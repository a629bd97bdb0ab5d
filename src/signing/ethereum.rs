// ============================================================================
// Ethereum Signature Scheme
// secp256k1 key recovery over EIP-191 personal messages
// ============================================================================

use crate::domain::ETHEREUM;
use crate::interfaces::SignatureScheme;
use secp256k1::ecdsa::{RecoverableSignature, RecoveryId};
use secp256k1::{Message, PublicKey, Secp256k1, SecretKey, VerifyOnly};
use sha3::{Digest, Keccak256};

/// Account-recovery verification.
///
/// The signer's public key is recovered from `r || s || v` and the message
/// digest, reduced to a 20-byte account address, and compared with the
/// claimed sender. No public key ever travels with the order.
///
/// # Example
/// ```text
/// digest    = keccak256("\x19Ethereum Signed Message:\n" + len(payload) + payload)
/// signature = 0x + hex(r[32] s[32] v[1]),  v in {0, 1, 27, 28}
/// sender_pk = 0x + hex(keccak256(uncompressed_pubkey[1..])[12..])
/// ```
pub struct EthereumScheme {
    secp: Secp256k1<VerifyOnly>,
}

impl EthereumScheme {
    pub fn new() -> Self {
        Self {
            secp: Secp256k1::verification_only(),
        }
    }

    fn recover_address(&self, message: &[u8], signature: &str) -> Option<[u8; 20]> {
        let signature = parse_signature(signature)?;
        let digest = Message::from_digest(personal_message_hash(message));
        let public_key = self.secp.recover_ecdsa(&digest, &signature).ok()?;
        Some(address_of(&public_key))
    }
}

impl Default for EthereumScheme {
    fn default() -> Self {
        Self::new()
    }
}

impl SignatureScheme for EthereumScheme {
    fn platform(&self) -> &str {
        ETHEREUM
    }

    fn verify(&self, message: &[u8], signature: &str, claimed_sender: &str) -> bool {
        let Some(claimed) = parse_address(claimed_sender) else {
            tracing::debug!(claimed_sender, "malformed ethereum address");
            return false;
        };
        match self.recover_address(message, signature) {
            Some(recovered) => recovered == claimed,
            None => {
                tracing::debug!("ethereum signature could not be recovered");
                false
            }
        }
    }
}

// ============================================================================
// Encoding helpers
// ============================================================================

/// EIP-191 version 0x45 digest of `message`.
pub fn personal_message_hash(message: &[u8]) -> [u8; 32] {
    let mut hasher = Keccak256::new();
    hasher.update(format!("\x19Ethereum Signed Message:\n{}", message.len()).as_bytes());
    hasher.update(message);
    hasher.finalize().into()
}

fn address_of(public_key: &PublicKey) -> [u8; 20] {
    let uncompressed = public_key.serialize_uncompressed();
    let hash = Keccak256::digest(&uncompressed[1..]);
    let mut address = [0u8; 20];
    address.copy_from_slice(&hash[12..]);
    address
}

/// `0x`-prefixed lowercase account address of a public key.
pub fn address_from_public_key(public_key: &PublicKey) -> String {
    format!("0x{}", hex::encode(address_of(public_key)))
}

fn strip_hex_prefix(text: &str) -> &str {
    text.strip_prefix("0x")
        .or_else(|| text.strip_prefix("0X"))
        .unwrap_or(text)
}

// Hex digits are case-insensitive, so checksummed (EIP-55) and lowercase
// forms of the same address compare equal.
fn parse_address(text: &str) -> Option<[u8; 20]> {
    hex::decode(strip_hex_prefix(text.trim()))
        .ok()?
        .try_into()
        .ok()
}

fn parse_signature(text: &str) -> Option<RecoverableSignature> {
    let bytes = hex::decode(strip_hex_prefix(text.trim())).ok()?;
    if bytes.len() != 65 {
        return None;
    }
    let v = match bytes[64] {
        v @ (0 | 1) => v,
        v @ (27 | 28) => v - 27,
        _ => return None,
    };
    let recovery_id = RecoveryId::from_i32(i32::from(v)).ok()?;
    RecoverableSignature::from_compact(&bytes[..64], recovery_id).ok()
}

/// Sign `message` as an Ethereum personal message, returning the `0x` hex
/// `r || s || v` string (v in {27, 28}). Used by tests, demos and benches.
pub fn sign_personal_message(secret_key: &SecretKey, message: &[u8]) -> String {
    let secp = Secp256k1::signing_only();
    let digest = Message::from_digest(personal_message_hash(message));
    let (recovery_id, compact) = secp
        .sign_ecdsa_recoverable(&digest, secret_key)
        .serialize_compact();
    let mut bytes = compact.to_vec();
    bytes.push(27 + recovery_id.to_i32() as u8);
    format!("0x{}", hex::encode(bytes))
}

/// Account address owned by `secret_key`.
pub fn address_from_secret_key(secret_key: &SecretKey) -> String {
    let secp = Secp256k1::signing_only();
    address_from_public_key(&PublicKey::from_secret_key(&secp, secret_key))
}
