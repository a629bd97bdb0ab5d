// ============================================================================
// Event Handler Interface
// Defines the contract for observing submission and settlement events
// ============================================================================

use crate::domain::{OrderId, SubmissionState, Trade};
use crate::error::RejectReason;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Events emitted by the matching engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ExchangeEvent {
    /// Submission entered the engine
    SubmissionReceived {
        submission_id: Uuid,
        timestamp: DateTime<Utc>,
    },

    /// Submission refused, or failed on a storage fault
    SubmissionRejected {
        submission_id: Uuid,
        reason: RejectReason,
        detail: String,
        timestamp: DateTime<Utc>,
    },

    /// Order persisted as resting
    OrderRested {
        submission_id: Uuid,
        order_id: OrderId,
        timestamp: DateTime<Utc>,
    },

    /// Two orders settled against each other
    OrdersSettled {
        submission_id: Uuid,
        trade: Trade,
        timestamp: DateTime<Utc>,
    },

    /// Remainder of a partial fill persisted as a new resting order
    RemainderCreated {
        submission_id: Uuid,
        order_id: OrderId,
        creator_id: OrderId,
        timestamp: DateTime<Utc>,
    },

    /// Order removed again because its settlement failed
    OrderWithdrawn {
        submission_id: Uuid,
        order_id: OrderId,
        timestamp: DateTime<Utc>,
    },

    /// Last event of every submission
    SubmissionCompleted {
        submission_id: Uuid,
        state: SubmissionState,
        timestamp: DateTime<Utc>,
    },

    /// Lost a settlement race; the crossing search will be re-run
    SettlementConflict {
        submission_id: Uuid,
        resting_order_id: OrderId,
        timestamp: DateTime<Utc>,
    },
}

/// Observer of submission outcomes
///
/// Called synchronously at the end of each submission with the events it
/// produced, in order. Must not call back into the engine.
pub trait EventHandler: Send + Sync {
    fn on_event(&self, event: ExchangeEvent);

    /// All events of one submission
    fn on_events(&self, events: Vec<ExchangeEvent>) {
        for event in events {
            self.on_event(event);
        }
    }
}

/// Discards every event
pub struct NoOpEventHandler;

impl EventHandler for NoOpEventHandler {
    fn on_event(&self, _event: ExchangeEvent) {}
}

/// Writes each event as a `tracing` debug record
pub struct LoggingEventHandler;

impl EventHandler for LoggingEventHandler {
    fn on_event(&self, event: ExchangeEvent) {
        tracing::debug!(?event, "exchange event");
    }
}

/// Keeps every event in memory, in emission order
#[derive(Default)]
pub struct RecordingEventHandler {
    events: Mutex<Vec<ExchangeEvent>>,
}

impl RecordingEventHandler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<ExchangeEvent> {
        self.events.lock().clone()
    }

    pub fn trades(&self) -> Vec<Trade> {
        self.events
            .lock()
            .iter()
            .filter_map(|event| match event {
                ExchangeEvent::OrdersSettled { trade, .. } => Some(trade.clone()),
                _ => None,
            })
            .collect()
    }

    /// Terminal state of each completed submission, in completion order
    pub fn completed_states(&self) -> Vec<SubmissionState> {
        self.events
            .lock()
            .iter()
            .filter_map(|event| match event {
                ExchangeEvent::SubmissionCompleted { state, .. } => Some(*state),
                _ => None,
            })
            .collect()
    }
}

impl EventHandler for RecordingEventHandler {
    fn on_event(&self, event: ExchangeEvent) {
        self.events.lock().push(event);
    }

    fn on_events(&self, events: Vec<ExchangeEvent>) {
        self.events.lock().extend(events);
    }
}
