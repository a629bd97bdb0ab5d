// ============================================================================
// Submission Domain Model
// Wire shape of a signed order and its per-submission state machine
// ============================================================================

use crate::domain::NewOrder;
use crate::error::ShapeError;
use crate::numeric::Amount;
use crate::signing::canonical;
use serde_json::{Map, Number, Value};

/// Top-level fields every submission must carry.
pub const REQUIRED_FIELDS: [&str; 2] = ["sig", "payload"];

/// Payload fields every submission must carry, in canonical signing order.
pub const PAYLOAD_FIELDS: [&str; 7] = [
    "sender_pk",
    "receiver_pk",
    "buy_currency",
    "sell_currency",
    "buy_amount",
    "sell_amount",
    "platform",
];

// ============================================================================
// Wire Types
// ============================================================================

/// An amount as it arrived: the JSON number text (which is what was signed)
/// and its parsed value.
#[derive(Debug, Clone, PartialEq)]
pub struct WireAmount {
    pub text: Number,
    pub value: Amount,
}

/// The signed portion of a submission.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderPayload {
    pub sender_pk: String,
    pub receiver_pk: String,
    pub buy_currency: String,
    pub sell_currency: String,
    pub buy_amount: WireAmount,
    pub sell_amount: WireAmount,
    pub platform: String,
}

impl OrderPayload {
    /// The exact bytes the sender signed.
    pub fn canonical_json(&self) -> serde_json::Result<String> {
        canonical::encode_payload(self)
    }

    pub fn to_new_order(&self, signature: &str) -> Result<NewOrder, ShapeError> {
        NewOrder::new(
            self.sender_pk.clone(),
            self.receiver_pk.clone(),
            self.buy_currency.clone(),
            self.sell_currency.clone(),
            self.buy_amount.value,
            self.sell_amount.value,
            self.platform.clone(),
        )
        .map(|order| order.with_signature(signature))
        .map_err(|e| ShapeError::RateOutOfRange(e.to_string()))
    }
}

/// A submission that passed shape validation.
#[derive(Debug, Clone, PartialEq)]
pub struct SignedOrder {
    pub signature: String,
    pub payload: OrderPayload,
}

impl SignedOrder {
    /// Shape validation: presence first (in field order), then types and
    /// value constraints.
    pub fn from_value(request: &Value) -> Result<Self, ShapeError> {
        let root = request.as_object().ok_or(ShapeError::NotAnObject("request"))?;
        for field in REQUIRED_FIELDS {
            if !root.contains_key(field) {
                return Err(ShapeError::MissingField(field));
            }
        }

        let payload = root["payload"]
            .as_object()
            .ok_or(ShapeError::NotAnObject("payload"))?;
        for field in PAYLOAD_FIELDS {
            if !payload.contains_key(field) {
                return Err(ShapeError::MissingField(field));
            }
        }

        let signature = string_field(root, "sig")?;
        let payload = OrderPayload {
            sender_pk: string_field(payload, "sender_pk")?,
            receiver_pk: string_field(payload, "receiver_pk")?,
            buy_currency: string_field(payload, "buy_currency")?,
            sell_currency: string_field(payload, "sell_currency")?,
            buy_amount: amount_field(payload, "buy_amount")?,
            sell_amount: amount_field(payload, "sell_amount")?,
            platform: string_field(payload, "platform")?,
        };

        if payload.buy_currency == payload.sell_currency {
            return Err(ShapeError::InvalidField {
                field: "sell_currency",
                reason: "must differ from buy_currency".to_string(),
            });
        }

        Ok(Self { signature, payload })
    }

    pub fn from_json_str(body: &str) -> Result<Self, ShapeError> {
        let value: Value =
            serde_json::from_str(body).map_err(|e| ShapeError::InvalidJson(e.to_string()))?;
        Self::from_value(&value)
    }

    pub fn to_new_order(&self) -> Result<NewOrder, ShapeError> {
        self.payload.to_new_order(&self.signature)
    }
}

fn string_field(object: &Map<String, Value>, field: &'static str) -> Result<String, ShapeError> {
    match &object[field] {
        Value::String(s) => Ok(s.clone()),
        other => Err(ShapeError::InvalidField {
            field,
            reason: format!("expected a string, got {}", json_type(other)),
        }),
    }
}

fn amount_field(object: &Map<String, Value>, field: &'static str) -> Result<WireAmount, ShapeError> {
    match &object[field] {
        Value::Number(n) => {
            let value = Amount::from_json_number(n).map_err(|e| ShapeError::InvalidField {
                field,
                reason: e.to_string(),
            })?;
            Ok(WireAmount {
                text: n.clone(),
                value,
            })
        }
        other => Err(ShapeError::InvalidField {
            field,
            reason: format!("expected a number, got {}", json_type(other)),
        }),
    }
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

// ============================================================================
// Submission State Machine
// ============================================================================

pub mod state {
    use serde::{Deserialize, Serialize};

    /// Where a single submission is in its processing. Nothing here outlives
    /// the call that processes it; the ledger is the only persistent state.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
    #[repr(u8)]
    pub enum SubmissionState {
        Received = 0,
        Validated = 1,
        Authenticated = 2,
        Resting = 3,
        Settled = 4,
        StillResting = 5,
        RejectedShape = 6,
        RejectedAuth = 7,
        /// Storage fault after authentication; nothing was kept
        Failed = 8,
    }

    impl SubmissionState {
        pub fn is_terminal(&self) -> bool {
            matches!(
                self,
                SubmissionState::Settled
                    | SubmissionState::StillResting
                    | SubmissionState::RejectedShape
                    | SubmissionState::RejectedAuth
                    | SubmissionState::Failed
            )
        }

        pub fn is_rejected(&self) -> bool {
            matches!(
                self,
                SubmissionState::RejectedShape | SubmissionState::RejectedAuth
            )
        }
    }

    /// Valid transitions for the submission state machine
    #[derive(Debug, Clone, Copy)]
    pub enum SubmissionTransition {
        Validate,
        RejectShape,
        Authenticate,
        RejectAuth,
        Persist,
        Settle,
        NoCrossing,
        Fail,
    }

    impl SubmissionState {
        pub fn transition(
            &self,
            transition: SubmissionTransition,
        ) -> Result<SubmissionState, String> {
            match (self, transition) {
                (SubmissionState::Received, SubmissionTransition::Validate) => {
                    Ok(SubmissionState::Validated)
                },
                (SubmissionState::Received, SubmissionTransition::RejectShape) => {
                    Ok(SubmissionState::RejectedShape)
                },

                (SubmissionState::Validated, SubmissionTransition::Authenticate) => {
                    Ok(SubmissionState::Authenticated)
                },
                (SubmissionState::Validated, SubmissionTransition::RejectAuth) => {
                    Ok(SubmissionState::RejectedAuth)
                },

                (SubmissionState::Authenticated, SubmissionTransition::Persist) => {
                    Ok(SubmissionState::Resting)
                },

                (SubmissionState::Resting, SubmissionTransition::Settle) => {
                    Ok(SubmissionState::Settled)
                },
                (SubmissionState::Resting, SubmissionTransition::NoCrossing) => {
                    Ok(SubmissionState::StillResting)
                },

                (SubmissionState::Authenticated | SubmissionState::Resting, SubmissionTransition::Fail) => {
                    Ok(SubmissionState::Failed)
                },

                _ => Err(format!(
                    "Invalid transition from {:?} via {:?}",
                    self, transition
                )),
            }
        }
    }
}
