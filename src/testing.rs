// ============================================================================
// Test Fixtures
// Deterministic wallets that produce correctly signed order requests
// ============================================================================
//
// Used by the unit tests, the integration tests, the benchmark and the demo.

use crate::domain::{SignedOrder, ALGORAND, ETHEREUM};
use crate::signing::{algorand, ethereum};
use ed25519_dalek::SigningKey;
use secp256k1::SecretKey;
use serde_json::{json, Value};

/// Payload object with the seven signed fields
pub fn order_payload(
    sender_pk: &str,
    receiver_pk: &str,
    buy_currency: &str,
    sell_currency: &str,
    buy_amount: impl Into<Value>,
    sell_amount: impl Into<Value>,
    platform: &str,
) -> Value {
    let (buy_amount, sell_amount): (Value, Value) = (buy_amount.into(), sell_amount.into());
    json!({
        "sender_pk": sender_pk,
        "receiver_pk": receiver_pk,
        "buy_currency": buy_currency,
        "sell_currency": sell_currency,
        "buy_amount": buy_amount,
        "sell_amount": sell_amount,
        "platform": platform,
    })
}

/// Bytes a sender signs for `payload`. Payloads that would fail shape
/// validation fall back to their plain JSON text.
pub fn signing_bytes(payload: &Value) -> Vec<u8> {
    let envelope = json!({ "sig": "", "payload": payload });
    SignedOrder::from_value(&envelope)
        .ok()
        .and_then(|signed| signed.payload.canonical_json().ok())
        .unwrap_or_else(|| payload.to_string())
        .into_bytes()
}

/// `{ "sig", "payload" }` request signed with an Ethereum key
pub fn sign_ethereum(secret_key: &SecretKey, payload: Value) -> Value {
    let sig = ethereum::sign_personal_message(secret_key, &signing_bytes(&payload));
    json!({ "sig": sig, "payload": payload })
}

/// `{ "sig", "payload" }` request signed with an Algorand key
pub fn sign_algorand(signing_key: &SigningKey, payload: Value) -> Value {
    let sig = algorand::sign_bytes(signing_key, &signing_bytes(&payload));
    json!({ "sig": sig, "payload": payload })
}

pub struct EthereumWallet {
    secret_key: SecretKey,
    address: String,
}

impl EthereumWallet {
    pub fn new(secret_key: SecretKey) -> Self {
        let address = ethereum::address_from_secret_key(&secret_key);
        Self {
            secret_key,
            address,
        }
    }

    /// Key `0x1111..11{seed}`. Always a valid scalar.
    pub fn from_seed(seed: u8) -> Self {
        let mut bytes = [0x11u8; 32];
        bytes[31] = seed;
        match SecretKey::from_slice(&bytes) {
            Ok(secret_key) => Self::new(secret_key),
            Err(_) => unreachable!("0x11-prefixed scalar is below the curve order"),
        }
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    pub fn secret_key(&self) -> &SecretKey {
        &self.secret_key
    }

    /// Signed request to buy `buy` of `buy_currency` for `sell` of
    /// `sell_currency`, receiving at the wallet's own address
    pub fn order(
        &self,
        buy_currency: &str,
        sell_currency: &str,
        buy: impl Into<Value>,
        sell: impl Into<Value>,
    ) -> Value {
        sign_ethereum(
            &self.secret_key,
            order_payload(
                &self.address,
                &self.address,
                buy_currency,
                sell_currency,
                buy,
                sell,
                ETHEREUM,
            ),
        )
    }
}

pub struct AlgorandWallet {
    signing_key: SigningKey,
    address: String,
}

impl AlgorandWallet {
    pub fn new(signing_key: SigningKey) -> Self {
        let address = algorand::address_from_public_key(&signing_key.verifying_key());
        Self {
            signing_key,
            address,
        }
    }

    pub fn from_seed(seed: u8) -> Self {
        Self::new(SigningKey::from_bytes(&[seed; 32]))
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    pub fn order(
        &self,
        buy_currency: &str,
        sell_currency: &str,
        buy: impl Into<Value>,
        sell: impl Into<Value>,
    ) -> Value {
        sign_algorand(
            &self.signing_key,
            order_payload(
                &self.address,
                &self.address,
                buy_currency,
                sell_currency,
                buy,
                sell,
                ALGORAND,
            ),
        )
    }
}
