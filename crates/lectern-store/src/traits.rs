//! Store trait definitions

use lectern_api::{Presentation, PresentationStatus};
use lectern_util::PresentationId;

use crate::{AuditEvent, StoreResult};

/// Main store trait
pub trait Store: Send + Sync {
    // Presentations

    /// All presentations, ordered by start time
    fn list_presentations(&self) -> StoreResult<Vec<Presentation>>;

    fn get_presentation(&self, id: &PresentationId) -> StoreResult<Option<Presentation>>;

    fn insert_presentation(&self, presentation: &Presentation) -> StoreResult<()>;

    /// Overwrite every field of an existing presentation.
    /// Returns `false` if no record has this id.
    fn update_presentation(&self, presentation: &Presentation) -> StoreResult<bool>;

    /// Returns `false` if no record has this id.
    fn delete_presentation(&self, id: &PresentationId) -> StoreResult<bool>;

    /// Atomically replace the whole collection
    fn replace_presentations(&self, presentations: &[Presentation]) -> StoreResult<()>;

    /// Write a batch of derived statuses in one transaction
    fn update_statuses(&self, statuses: &[(PresentationId, PresentationStatus)]) -> StoreResult<()>;

    // Audit log

    /// Append an audit event
    fn append_audit(&self, event: AuditEvent) -> StoreResult<()>;

    /// Get recent audit events, newest first
    fn get_recent_audits(&self, limit: usize) -> StoreResult<Vec<AuditEvent>>;

    // Health

    /// Check if store is healthy
    fn is_healthy(&self) -> bool;
}
