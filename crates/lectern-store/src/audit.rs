//! Audit event types

use chrono::{DateTime, Local};
use lectern_api::PresentationStatus;
use lectern_util::PresentationId;
use serde::{Deserialize, Serialize};

/// Types of audit events
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AuditEventType {
    ServiceStarted,

    ServiceStopped,

    /// Configuration loaded at startup
    ConfigLoaded { seed_count: usize },

    PresentationCreated {
        id: PresentationId,
        project_name: String,
        status: PresentationStatus,
    },

    PresentationUpdated {
        id: PresentationId,
        status: PresentationStatus,
    },

    PresentationDeleted { id: PresentationId },

    /// A refresh or a window write moved at least one status
    StatusesRefreshed { changed: usize },

    ClientConnected {
        client_id: String,
        uid: Option<u32>,
    },

    ClientDisconnected { client_id: String },
}

/// Full audit event with metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEvent {
    /// Unique event ID
    pub id: i64,

    /// Event timestamp
    pub timestamp: DateTime<Local>,

    /// Event type and details
    pub event: AuditEventType,
}

impl AuditEvent {
    pub fn new(event: AuditEventType) -> Self {
        Self {
            id: 0, // Will be set by store
            timestamp: lectern_util::now(),
            event,
        }
    }
}
