// ============================================================================
// Signature Verifier
// Dispatches a submission to the scheme registered for its platform
// ============================================================================

use crate::domain::SignedOrder;
use crate::error::ExchangeError;
use crate::interfaces::SignatureScheme;
use crate::signing::{AlgorandScheme, EthereumScheme};
use std::collections::HashMap;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

/// Registry of platform schemes keyed by platform tag.
///
/// Adding a platform means registering another `SignatureScheme`; nothing in
/// here knows about individual platforms.
#[derive(Clone, Default)]
pub struct SignatureVerifier {
    schemes: HashMap<String, Arc<dyn SignatureScheme>>,
}

impl SignatureVerifier {
    /// Verifier with no schemes: every platform is unknown.
    pub fn new() -> Self {
        Self::default()
    }

    /// Ethereum and Algorand.
    pub fn with_default_schemes() -> Self {
        let mut verifier = Self::new();
        verifier.register(EthereumScheme::new());
        verifier.register(AlgorandScheme::new());
        verifier
    }

    /// Register `scheme` under its own platform tag, replacing any previous one.
    pub fn register<S: SignatureScheme + 'static>(&mut self, scheme: S) -> &mut Self {
        self.register_shared(Arc::new(scheme))
    }

    pub fn register_shared(&mut self, scheme: Arc<dyn SignatureScheme>) -> &mut Self {
        self.schemes.insert(scheme.platform().to_string(), scheme);
        self
    }

    pub fn supports(&self, platform: &str) -> bool {
        self.schemes.contains_key(platform)
    }

    /// Registered platform tags, sorted.
    pub fn platforms(&self) -> Vec<&str> {
        let mut platforms: Vec<&str> = self.schemes.keys().map(String::as_str).collect();
        platforms.sort_unstable();
        platforms
    }

    /// Keep only `platforms`. Each must already be registered.
    pub fn restricted_to(&self, platforms: &[String]) -> Result<Self, ExchangeError> {
        let mut schemes = HashMap::with_capacity(platforms.len());
        for platform in platforms {
            let scheme = self.schemes.get(platform).ok_or_else(|| {
                ExchangeError::Config(format!(
                    "platform {platform:?} has no registered signature scheme"
                ))
            })?;
            schemes.insert(platform.clone(), Arc::clone(scheme));
        }
        Ok(Self { schemes })
    }

    /// `true` only if a scheme exists for `platform` and accepts the signature.
    ///
    /// A panicking scheme counts as a rejection.
    pub fn verify(
        &self,
        platform: &str,
        payload: &[u8],
        signature: &str,
        claimed_sender: &str,
    ) -> bool {
        let Some(scheme) = self.schemes.get(platform) else {
            return false;
        };
        panic::catch_unwind(AssertUnwindSafe(|| {
            scheme.verify(payload, signature, claimed_sender)
        }))
        .unwrap_or_else(|_| {
            tracing::error!(platform, "signature scheme panicked during verification");
            false
        })
    }

    /// Classified verification of a shape-valid submission.
    pub fn authenticate(&self, order: &SignedOrder) -> Result<(), ExchangeError> {
        let platform = &order.payload.platform;
        if !self.supports(platform) {
            return Err(ExchangeError::UnknownPlatform {
                platform: platform.clone(),
            });
        }

        let message = match order.payload.canonical_json() {
            Ok(message) => message,
            Err(e) => {
                tracing::warn!(%platform, error = %e, "cannot encode payload for verification");
                return Err(ExchangeError::Authentication {
                    platform: platform.clone(),
                });
            }
        };
        if self.verify(
            platform,
            message.as_bytes(),
            &order.signature,
            &order.payload.sender_pk,
        ) {
            Ok(())
        } else {
            Err(ExchangeError::Authentication {
                platform: platform.clone(),
            })
        }
    }
}

impl std::fmt::Debug for SignatureVerifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SignatureVerifier")
            .field("platforms", &self.platforms())
            .finish()
    }
}
