// ============================================================================
// Algorand Signature Scheme
// Direct Ed25519 verification against a checksummed base32 address
// ============================================================================

use crate::domain::ALGORAND;
use crate::interfaces::SignatureScheme;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use data_encoding::BASE32_NOPAD;
use ed25519_dalek::{Signature, Signer, SigningKey, VerifyingKey};
use sha2::{Digest, Sha512_256};

/// Domain-separation prefix prepended to arbitrary signed bytes.
const BYTES_PREFIX: &[u8] = b"MX";

const PUBLIC_KEY_LEN: usize = 32;
const CHECKSUM_LEN: usize = 4;

/// Direct verification: the public key is carried in the sender address, so
/// there is no recovery step.
///
/// ```text
/// sender_pk = base32(pubkey[32] || sha512_256(pubkey)[28..32])   (58 chars)
/// signature = base64(ed25519_sign("MX" || payload))
/// ```
#[derive(Debug, Default, Clone, Copy)]
pub struct AlgorandScheme;

impl AlgorandScheme {
    pub fn new() -> Self {
        Self
    }
}

impl SignatureScheme for AlgorandScheme {
    fn platform(&self) -> &str {
        ALGORAND
    }

    fn verify(&self, message: &[u8], signature: &str, claimed_sender: &str) -> bool {
        let Some(public_key) = decode_address(claimed_sender) else {
            tracing::debug!(claimed_sender, "malformed algorand address");
            return false;
        };
        let Some(signature) = decode_signature(signature) else {
            tracing::debug!("malformed algorand signature");
            return false;
        };

        let mut prefixed = Vec::with_capacity(BYTES_PREFIX.len() + message.len());
        prefixed.extend_from_slice(BYTES_PREFIX);
        prefixed.extend_from_slice(message);
        public_key.verify_strict(&prefixed, &signature).is_ok()
    }
}

// ============================================================================
// Address & signature codecs
// ============================================================================

fn checksum(public_key: &[u8; PUBLIC_KEY_LEN]) -> [u8; CHECKSUM_LEN] {
    let digest = Sha512_256::digest(public_key);
    let mut out = [0u8; CHECKSUM_LEN];
    out.copy_from_slice(&digest[digest.len() - CHECKSUM_LEN..]);
    out
}

/// Address for raw public-key bytes.
pub fn address_from_bytes(public_key: &[u8; PUBLIC_KEY_LEN]) -> String {
    let mut bytes = Vec::with_capacity(PUBLIC_KEY_LEN + CHECKSUM_LEN);
    bytes.extend_from_slice(public_key);
    bytes.extend_from_slice(&checksum(public_key));
    BASE32_NOPAD.encode(&bytes)
}

pub fn address_from_public_key(public_key: &VerifyingKey) -> String {
    address_from_bytes(public_key.as_bytes())
}

/// Raw public-key bytes inside `address`. `None` unless the address is
/// canonical unpadded base32 of exactly key plus checksum, and the checksum
/// matches.
pub fn address_key_bytes(address: &str) -> Option<[u8; PUBLIC_KEY_LEN]> {
    let bytes = BASE32_NOPAD.decode(address.trim().as_bytes()).ok()?;
    if bytes.len() != PUBLIC_KEY_LEN + CHECKSUM_LEN {
        return None;
    }
    let (key, sum) = bytes.split_at(PUBLIC_KEY_LEN);
    let key: [u8; PUBLIC_KEY_LEN] = key.try_into().ok()?;
    (checksum(&key) == sum).then_some(key)
}

/// Public key inside `address`, if the address is well-formed, its checksum
/// matches and the bytes are a valid curve point.
pub fn decode_address(address: &str) -> Option<VerifyingKey> {
    VerifyingKey::from_bytes(&address_key_bytes(address)?).ok()
}

fn decode_signature(text: &str) -> Option<Signature> {
    let bytes = STANDARD.decode(text.trim()).ok()?;
    let bytes: [u8; 64] = bytes.try_into().ok()?;
    Some(Signature::from_bytes(&bytes))
}

/// Sign `message` with the `MX` prefix, returning base64. Used by tests,
/// demos and benches.
pub fn sign_bytes(signing_key: &SigningKey, message: &[u8]) -> String {
    let mut prefixed = Vec::with_capacity(BYTES_PREFIX.len() + message.len());
    prefixed.extend_from_slice(BYTES_PREFIX);
    prefixed.extend_from_slice(message);
    STANDARD.encode(signing_key.sign(&prefixed).to_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;
    use quickcheck::quickcheck;

    fn key(byte: u8) -> SigningKey {
        SigningKey::from_bytes(&[byte; 32])
    }

    #[test]
    fn test_zero_address_vector() {
        assert_eq!(
            address_from_bytes(&[0u8; 32]),
            "AAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAY5HFKQ"
        );
    }

    #[test]
    fn test_verifies_signed_bytes() {
        let scheme = AlgorandScheme::new();
        let signer = key(7);
        let address = address_from_public_key(&signer.verifying_key());
        let signature = sign_bytes(&signer, b"payload");

        assert_eq!(address.len(), 58);
        assert!(scheme.verify(b"payload", &signature, &address));
        assert!(!scheme.verify(b"payload!", &signature, &address));
    }

    #[test]
    fn test_rejects_other_key() {
        let scheme = AlgorandScheme::new();
        let signature = sign_bytes(&key(7), b"payload");
        let other = address_from_public_key(&key(8).verifying_key());

        assert!(!scheme.verify(b"payload", &signature, &other));
    }

    #[test]
    fn test_prefix_is_required() {
        let scheme = AlgorandScheme::new();
        let signer = key(7);
        let bare = STANDARD.encode(signer.sign(b"payload").to_bytes());
        let address = address_from_public_key(&signer.verifying_key());

        assert!(!scheme.verify(b"payload", &bare, &address));
    }

    #[test]
    fn test_checksum_is_enforced() {
        let address = address_from_public_key(&key(7).verifying_key());
        let mut corrupted: Vec<char> = address.chars().collect();
        let last = corrupted.len() - 1;
        corrupted[last] = if corrupted[last] == 'A' { 'B' } else { 'A' };
        let corrupted: String = corrupted.into_iter().collect();

        assert!(decode_address(&address).is_some());
        assert!(decode_address(&corrupted).is_none());
        assert!(decode_address("lowercase-not-base32").is_none());
    }

    #[test]
    fn test_malformed_signature_returns_false() {
        let scheme = AlgorandScheme::new();
        let address = address_from_public_key(&key(7).verifying_key());

        assert!(!scheme.verify(b"m", "!!!", &address));
        assert!(!scheme.verify(b"m", &STANDARD.encode([0u8; 10]), &address));
    }

    #[test]
    fn test_non_canonical_encodings_are_rejected() {
        let zero = address_from_bytes(&[0u8; 32]);
        assert!(address_key_bytes(&zero).is_some());

        // last symbol carries three unused bits; they must be zero
        let dirty_tail = format!("{}R", &zero[..zero.len() - 1]);
        assert!(address_key_bytes(&dirty_tail).is_none());

        assert!(address_key_bytes(&format!("{zero}======")).is_none());
        assert!(address_key_bytes("A").is_none());
        assert!(address_key_bytes(&zero.to_lowercase()).is_none());
    }

    quickcheck! {
        fn prop_address_carries_the_key(seed: Vec<u8>) -> bool {
            let mut key = [0u8; 32];
            for (slot, byte) in key.iter_mut().zip(seed) {
                *slot = byte;
            }
            let address = address_from_bytes(&key);
            address.len() == 58 && address_key_bytes(&address) == Some(key)
        }
    }
}
