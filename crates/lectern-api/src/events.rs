//! Event types for lecternd -> client streaming

use chrono::{DateTime, Local};
use lectern_util::PresentationId;
use serde::{Deserialize, Serialize};

use crate::{Presentation, StatusChange, API_VERSION};

/// Event envelope
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub api_version: u32,
    pub timestamp: DateTime<Local>,
    pub payload: EventPayload,
}

impl Event {
    pub fn new(payload: EventPayload) -> Self {
        Self {
            api_version: API_VERSION,
            timestamp: lectern_util::now(),
            payload,
        }
    }
}

/// All possible events from the service to clients
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EventPayload {
    /// Full collection snapshot, sent after every change so views can re-render
    PresentationsChanged { presentations: Vec<Presentation> },

    PresentationCreated { presentation: Presentation },

    PresentationUpdated { presentation: Presentation },

    PresentationDeleted { id: PresentationId },

    /// One or more statuses moved because time passed or a window was edited
    StatusesRefreshed { changes: Vec<StatusChange> },

    /// Service is shutting down
    Shutdown,
}
