//! Core events emitted by the presentation book

use lectern_api::{Presentation, StatusChange};
use lectern_util::PresentationId;

/// Events emitted by the core
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CoreEvent {
    PresentationCreated { presentation: Presentation },

    PresentationUpdated { presentation: Presentation },

    PresentationDeleted { id: PresentationId },

    /// Statuses moved without the records' windows being edited
    StatusesRefreshed { changes: Vec<StatusChange> },
}
