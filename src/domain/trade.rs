// ============================================================================
// Trade Domain Model
// ============================================================================

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::OrderId;

/// Record of one settlement between an incoming order and a resting one
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trade {
    /// Unique trade identifier
    pub id: Uuid,

    /// Order ID of the passive order (resting in the ledger)
    pub maker_order_id: OrderId,

    /// Order ID of the aggressive order (the submission being processed)
    pub taker_order_id: OrderId,

    /// Timestamp written to both orders' `filled_at`
    pub filled_at: DateTime<Utc>,

    /// Remainder order created by this settlement, if the fill was partial
    pub derived_order_id: Option<OrderId>,
}

impl Trade {
    pub fn new(
        maker_order_id: OrderId,
        taker_order_id: OrderId,
        filled_at: DateTime<Utc>,
        derived_order_id: Option<OrderId>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            maker_order_id,
            taker_order_id,
            filled_at,
            derived_order_id,
        }
    }

    pub fn is_exact_fill(&self) -> bool {
        self.derived_order_id.is_none()
    }

    pub fn involves(&self, order_id: OrderId) -> bool {
        self.maker_order_id == order_id || self.taker_order_id == order_id
    }
}
