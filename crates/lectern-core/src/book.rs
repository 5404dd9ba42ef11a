//! The presentation book
//!
//! Owns the live collection of presentations. Every write is validated,
//! persisted through the [`Store`], and then published to subscribers as one
//! complete snapshot.

use chrono::{DateTime, Local};
use lectern_api::{Presentation, PresentationDraft, PresentationPatch, PresentationStatus, StatusFilter};
use lectern_store::{AuditEvent, AuditEventType, Store};
use lectern_util::{Clock, LecternError, PresentationId, Result};
use std::cmp::Ordering;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, info};

use crate::{CoreEvent, compute_status, refresh_all, refresh_changes, validate_window};

/// A published, immutable view of every presentation, ordered by start time
pub type Snapshot = Arc<[Presentation]>;

/// The record store facade over a [`Store`] and a [`Clock`]
pub struct PresentationBook {
    store: Arc<dyn Store>,
    clock: Arc<dyn Clock>,
    snapshot_tx: watch::Sender<Snapshot>,
}

impl PresentationBook {
    /// Load the persisted collection and bring its statuses up to date
    pub fn open(store: Arc<dyn Store>, clock: Arc<dyn Clock>) -> Result<Self> {
        let stored = store.list_presentations()?;
        let now = clock.now();
        let current = refresh_all(&stored, now);

        let changes = refresh_changes(&stored, &current);
        if !changes.is_empty() {
            let statuses: Vec<_> = changes.iter().map(|c| (c.id.clone(), c.to)).collect();
            store.update_statuses(&statuses)?;
        }

        info!(
            presentation_count = current.len(),
            stale_statuses = changes.len(),
            "Presentation book opened"
        );

        let (snapshot_tx, _) = watch::channel(Snapshot::from(sorted_by_start(current)));

        Ok(Self {
            store,
            clock,
            snapshot_tx,
        })
    }

    /// Insert `drafts` if the book holds no presentations yet.
    /// Returns how many were inserted.
    pub fn seed_if_empty(&mut self, drafts: &[PresentationDraft]) -> Result<usize> {
        if !self.list().is_empty() || drafts.is_empty() {
            return Ok(0);
        }

        let now = self.clock.now();
        let mut seeded = Vec::with_capacity(drafts.len());
        for draft in drafts {
            let presentation = build(draft.clone(), now)?;
            seeded.push(presentation);
        }

        self.store.replace_presentations(&seeded)?;
        for presentation in &seeded {
            self.audit_created(presentation);
        }

        info!(count = seeded.len(), "Seeded presentations");
        let count = seeded.len();
        self.publish(seeded);

        Ok(count)
    }

    /// Current snapshot, ordered by start time
    pub fn list(&self) -> Snapshot {
        self.snapshot_tx.borrow().clone()
    }

    /// Presentations matching `filter`, in display order
    pub fn list_filtered(&self, filter: StatusFilter) -> Vec<Presentation> {
        let mut matching: Vec<Presentation> = self
            .list()
            .iter()
            .filter(|p| filter.matches(p.status))
            .cloned()
            .collect();
        matching.sort_by(display_order);
        matching
    }

    pub fn get(&self, id: &PresentationId) -> Option<Presentation> {
        self.list().iter().find(|p| &p.id == id).cloned()
    }

    /// Schedule a new presentation
    pub fn create(&mut self, draft: PresentationDraft) -> Result<CoreEvent> {
        let now = self.clock.now();
        let presentation = build(draft, now)?;
        self.store.insert_presentation(&presentation)?;
        self.audit_created(&presentation);

        info!(
            presentation_id = %presentation.id,
            project = %presentation.project_name,
            status = %presentation.status,
            "Presentation created"
        );

        let mut records = self.list().to_vec();
        records.push(presentation.clone());
        self.settle(records, now)?;

        Ok(CoreEvent::PresentationCreated { presentation })
    }

    /// Apply a partial edit. When the window moves, every status is
    /// re-derived against the same `now`.
    pub fn update(&mut self, id: &PresentationId, patch: PresentationPatch) -> Result<CoreEvent> {
        let current = self
            .get(id)
            .ok_or_else(|| LecternError::PresentationNotFound(id.clone()))?;

        let reschedule = patch.touches_window();
        let mut updated = apply_patch(current, patch);
        validate_window(updated.start_time, updated.end_time)?;

        let now = reschedule.then(|| self.clock.now());
        if let Some(now) = now {
            updated.status = compute_status(updated.start_time, updated.end_time, now);
        }

        if !self.store.update_presentation(&updated)? {
            return Err(LecternError::PresentationNotFound(id.clone()));
        }

        let _ = self.store.append_audit(AuditEvent::new(AuditEventType::PresentationUpdated {
            id: updated.id.clone(),
            status: updated.status,
        }));

        info!(
            presentation_id = %updated.id,
            status = %updated.status,
            rescheduled = reschedule,
            "Presentation updated"
        );

        let records = self
            .list()
            .iter()
            .map(|p| if &p.id == id { updated.clone() } else { p.clone() })
            .collect();
        match now {
            Some(now) => self.settle(records, now)?,
            None => self.publish(records),
        }

        Ok(CoreEvent::PresentationUpdated {
            presentation: updated,
        })
    }

    pub fn delete(&mut self, id: &PresentationId) -> Result<CoreEvent> {
        if !self.store.delete_presentation(id)? {
            return Err(LecternError::PresentationNotFound(id.clone()));
        }

        let _ = self
            .store
            .append_audit(AuditEvent::new(AuditEventType::PresentationDeleted { id: id.clone() }));

        info!(presentation_id = %id, "Presentation deleted");

        let records = self.list().iter().filter(|p| &p.id != id).cloned().collect();
        self.publish(records);

        Ok(CoreEvent::PresentationDeleted { id: id.clone() })
    }

    /// Swap the whole collection at once.
    ///
    /// Every window is checked before anything is written, and statuses
    /// are derived afresh rather than taken from `records`.
    pub fn replace_all(&mut self, records: Vec<Presentation>) -> Result<Snapshot> {
        for record in &records {
            validate_window(record.start_time, record.end_time)?;
        }

        let refreshed = refresh_all(&records, self.clock.now());
        self.store.replace_presentations(&refreshed)?;

        info!(count = refreshed.len(), "Presentations replaced");
        self.publish(refreshed);

        Ok(self.list())
    }

    /// Re-derive every status against the clock's current time
    pub fn refresh(&mut self) -> Result<Option<CoreEvent>> {
        let now = self.clock.now();
        self.refresh_at(now)
    }

    /// Re-derive every status against `now`.
    /// Returns an event only if at least one status moved.
    pub fn refresh_at(&mut self, now: DateTime<Local>) -> Result<Option<CoreEvent>> {
        let before = self.list();
        let after = refresh_all(&before, now);
        let changes = refresh_changes(&before, &after);

        if changes.is_empty() {
            debug!("Refresh found no status changes");
            return Ok(None);
        }

        let statuses: Vec<_> = changes.iter().map(|c| (c.id.clone(), c.to)).collect();
        self.store.update_statuses(&statuses)?;

        let _ = self.store.append_audit(AuditEvent::new(AuditEventType::StatusesRefreshed {
            changed: changes.len(),
        }));

        for change in &changes {
            info!(
                presentation_id = %change.id,
                from = %change.from,
                to = %change.to,
                "Presentation status changed"
            );
        }

        self.publish(after);

        Ok(Some(CoreEvent::StatusesRefreshed { changes }))
    }

    /// Watch for new snapshots
    pub fn subscribe(&self) -> watch::Receiver<Snapshot> {
        self.snapshot_tx.subscribe()
    }

    pub fn is_healthy(&self) -> bool {
        self.store.is_healthy()
    }

    /// Bring every status in `records` up to `now`, persist the ones that
    /// moved in one batch, then publish
    fn settle(&self, records: Vec<Presentation>, now: DateTime<Local>) -> Result<()> {
        let refreshed = refresh_all(&records, now);
        let changes = refresh_changes(&records, &refreshed);

        if !changes.is_empty() {
            let statuses: Vec<_> = changes.iter().map(|c| (c.id.clone(), c.to)).collect();
            self.store.update_statuses(&statuses)?;

            let _ = self.store.append_audit(AuditEvent::new(AuditEventType::StatusesRefreshed {
                changed: changes.len(),
            }));

            debug!(changed = changes.len(), "Statuses moved alongside write");
        }

        self.publish(refreshed);
        Ok(())
    }

    fn publish(&self, records: Vec<Presentation>) {
        let snapshot = Snapshot::from(sorted_by_start(records));
        debug!(count = snapshot.len(), "Publishing snapshot");
        self.snapshot_tx.send_replace(snapshot);
    }

    fn audit_created(&self, presentation: &Presentation) {
        let _ = self.store.append_audit(AuditEvent::new(AuditEventType::PresentationCreated {
            id: presentation.id.clone(),
            project_name: presentation.project_name.clone(),
            status: presentation.status,
        }));
    }
}

/// Display ordering: everything not yet completed by start time (soonest
/// first), followed by completed presentations by end time (most recent first)
pub fn display_order(a: &Presentation, b: &Presentation) -> Ordering {
    let a_done = a.status == PresentationStatus::Completed;
    let b_done = b.status == PresentationStatus::Completed;

    match (a_done, b_done) {
        (false, false) => a.start_time.cmp(&b.start_time),
        (true, true) => b.end_time.cmp(&a.end_time),
        (false, true) => Ordering::Less,
        (true, false) => Ordering::Greater,
    }
}

fn build(draft: PresentationDraft, now: DateTime<Local>) -> Result<Presentation> {
    validate_window(draft.start_time, draft.end_time)?;

    Ok(Presentation {
        id: PresentationId::new(),
        status: compute_status(draft.start_time, draft.end_time, now),
        project_id: draft.project_id,
        project_name: draft.project_name,
        description: draft.description,
        group_id: draft.group_id,
        start_time: draft.start_time,
        end_time: draft.end_time,
    })
}

fn apply_patch(mut presentation: Presentation, patch: PresentationPatch) -> Presentation {
    if let Some(project_id) = patch.project_id {
        presentation.project_id = project_id;
    }
    if let Some(project_name) = patch.project_name {
        presentation.project_name = project_name;
    }
    if let Some(description) = patch.description {
        presentation.description = description;
    }
    if let Some(group_id) = patch.group_id {
        presentation.group_id = group_id;
    }
    if let Some(start_time) = patch.start_time {
        presentation.start_time = start_time;
    }
    if let Some(end_time) = patch.end_time {
        presentation.end_time = end_time;
    }
    presentation
}

fn sorted_by_start(mut records: Vec<Presentation>) -> Vec<Presentation> {
    records.sort_by(|a, b| a.start_time.cmp(&b.start_time));
    records
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use lectern_store::SqliteStore;
    use lectern_util::{ManualClock, ProjectId};

    fn at(h: u32, m: u32) -> DateTime<Local> {
        Local.with_ymd_and_hms(2024, 3, 20, h, m, 0).unwrap()
    }

    fn draft(name: &str, start: DateTime<Local>, end: DateTime<Local>) -> PresentationDraft {
        PresentationDraft {
            project_id: ProjectId::new("1"),
            project_name: name.into(),
            description: String::new(),
            group_id: "group-1".into(),
            start_time: start,
            end_time: end,
        }
    }

    fn make_book(now: DateTime<Local>) -> (PresentationBook, Arc<ManualClock>, Arc<dyn Store>) {
        let store: Arc<dyn Store> = Arc::new(SqliteStore::in_memory().unwrap());
        let clock = Arc::new(ManualClock::new(now));
        let book = PresentationBook::open(store.clone(), clock.clone()).unwrap();
        (book, clock, store)
    }

    fn created(event: CoreEvent) -> Presentation {
        match event {
            CoreEvent::PresentationCreated { presentation } => presentation,
            other => panic!("Expected PresentationCreated, got {:?}", other),
        }
    }

    #[test]
    fn create_assigns_id_and_status() {
        let (mut book, _, store) = make_book(at(9, 0));

        let p = created(book.create(draft("E-commerce Platform", at(10, 0), at(11, 0))).unwrap());
        assert_eq!(p.status, PresentationStatus::Upcoming);
        assert_eq!(book.list().len(), 1);
        assert_eq!(book.get(&p.id), Some(p.clone()));
        assert_eq!(store.get_presentation(&p.id).unwrap(), Some(p));
    }

    #[test]
    fn create_rejects_backwards_window() {
        let (mut book, _, store) = make_book(at(9, 0));

        let result = book.create(draft("Backwards", at(11, 0), at(10, 0)));
        assert!(matches!(result, Err(LecternError::InvalidWindow { .. })));

        let result = book.create(draft("Empty", at(10, 0), at(10, 0)));
        assert!(matches!(result, Err(LecternError::InvalidWindow { .. })));

        assert!(book.list().is_empty());
        assert!(store.list_presentations().unwrap().is_empty());
    }

    #[test]
    fn update_recomputes_when_window_moves() {
        let (mut book, _, _) = make_book(at(12, 0));
        let p = created(book.create(draft("Task Manager", at(10, 0), at(11, 0))).unwrap());
        assert_eq!(p.status, PresentationStatus::Completed);

        // Moving only the end is enough to trigger a recompute
        let patch = PresentationPatch {
            end_time: Some(at(13, 0)),
            ..Default::default()
        };
        let event = book.update(&p.id, patch).unwrap();
        let CoreEvent::PresentationUpdated { presentation } = event else {
            panic!("Expected PresentationUpdated");
        };
        assert_eq!(presentation.status, PresentationStatus::Ongoing);

        // Completed can legally move back to upcoming
        let patch = PresentationPatch {
            start_time: Some(at(14, 0)),
            end_time: Some(at(15, 0)),
            ..Default::default()
        };
        book.update(&p.id, patch).unwrap();
        assert_eq!(book.get(&p.id).unwrap().status, PresentationStatus::Upcoming);
    }

    #[test]
    fn window_writes_bring_other_statuses_up_to_date() {
        let (mut book, clock, store) = make_book(at(9, 0));
        let a = created(book.create(draft("Early", at(9, 30), at(10, 0))).unwrap());
        assert_eq!(a.status, PresentationStatus::Upcoming);

        // Creating another presentation re-derives the rest
        clock.set(at(9, 45));
        let b = created(book.create(draft("Late", at(11, 0), at(12, 0))).unwrap());
        assert_eq!(book.get(&a.id).unwrap().status, PresentationStatus::Ongoing);
        assert_eq!(
            store.get_presentation(&a.id).unwrap().unwrap().status,
            PresentationStatus::Ongoing
        );

        // So does rescheduling one
        clock.set(at(10, 15));
        let patch = PresentationPatch {
            end_time: Some(at(12, 30)),
            ..Default::default()
        };
        book.update(&b.id, patch).unwrap();
        assert_eq!(book.get(&a.id).unwrap().status, PresentationStatus::Completed);
        assert_eq!(book.get(&b.id).unwrap().status, PresentationStatus::Upcoming);
        assert_eq!(
            store.get_presentation(&a.id).unwrap().unwrap().status,
            PresentationStatus::Completed
        );

        let refreshes = store
            .get_recent_audits(20)
            .unwrap()
            .into_iter()
            .filter(|e| matches!(e.event, AuditEventType::StatusesRefreshed { changed: 1 }))
            .count();
        assert_eq!(refreshes, 2);
    }

    #[test]
    fn update_without_window_keeps_status() {
        let (mut book, clock, _) = make_book(at(9, 0));
        let p = created(book.create(draft("Task Manager", at(10, 0), at(11, 0))).unwrap());

        clock.set(at(10, 30));
        let patch = PresentationPatch {
            description: Some("Now with kanban boards".into()),
            ..Default::default()
        };
        book.update(&p.id, patch).unwrap();

        let after = book.get(&p.id).unwrap();
        assert_eq!(after.description, "Now with kanban boards");
        assert_eq!(after.status, PresentationStatus::Upcoming);
    }

    #[test]
    fn update_rejects_invalid_merged_window() {
        let (mut book, _, store) = make_book(at(9, 0));
        let p = created(book.create(draft("Task Manager", at(10, 0), at(11, 0))).unwrap());

        let patch = PresentationPatch {
            start_time: Some(at(11, 30)),
            ..Default::default()
        };
        let result = book.update(&p.id, patch);
        assert!(matches!(result, Err(LecternError::InvalidWindow { .. })));

        assert_eq!(book.get(&p.id), Some(p.clone()));
        assert_eq!(store.get_presentation(&p.id).unwrap(), Some(p));
    }

    #[test]
    fn unknown_id_is_not_found() {
        let (mut book, _, _) = make_book(at(9, 0));
        let missing = PresentationId::new();

        assert!(matches!(
            book.update(&missing, PresentationPatch::default()),
            Err(LecternError::PresentationNotFound(_))
        ));
        assert!(matches!(
            book.delete(&missing),
            Err(LecternError::PresentationNotFound(_))
        ));
    }

    #[test]
    fn delete_removes_from_snapshot_and_store() {
        let (mut book, _, store) = make_book(at(9, 0));
        let p = created(book.create(draft("Task Manager", at(10, 0), at(11, 0))).unwrap());

        let event = book.delete(&p.id).unwrap();
        assert_eq!(event, CoreEvent::PresentationDeleted { id: p.id.clone() });
        assert!(book.get(&p.id).is_none());
        assert!(store.get_presentation(&p.id).unwrap().is_none());
    }

    #[test]
    fn refresh_reports_only_changes() {
        let (mut book, clock, store) = make_book(at(9, 0));
        let early = created(book.create(draft("Early", at(9, 0), at(10, 0))).unwrap());
        book.create(draft("Running", at(9, 0), at(12, 0))).unwrap();
        book.create(draft("Later", at(13, 0), at(14, 0))).unwrap();

        assert!(book.refresh().unwrap().is_none());

        clock.set(at(10, 30));
        let event = book.refresh().unwrap().unwrap();
        let CoreEvent::StatusesRefreshed { changes } = event else {
            panic!("Expected StatusesRefreshed");
        };
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].id, early.id);
        assert_eq!(changes[0].to, PresentationStatus::Completed);

        assert_eq!(
            store.get_presentation(&early.id).unwrap().unwrap().status,
            PresentationStatus::Completed
        );

        // Same instant again: nothing to report
        assert!(book.refresh().unwrap().is_none());
    }

    #[test]
    fn subscribers_see_every_write() {
        let (mut book, clock, _) = make_book(at(9, 0));
        let mut rx = book.subscribe();
        assert!(!rx.has_changed().unwrap());

        let p = created(book.create(draft("Task Manager", at(10, 0), at(11, 0))).unwrap());
        assert!(rx.has_changed().unwrap());
        assert_eq!(rx.borrow_and_update().len(), 1);

        clock.advance(Duration::minutes(90));
        book.refresh().unwrap();
        assert!(rx.has_changed().unwrap());
        assert_eq!(rx.borrow_and_update()[0].status, PresentationStatus::Ongoing);

        let patch = PresentationPatch {
            project_name: Some("Task Manager Pro".into()),
            ..Default::default()
        };
        book.update(&p.id, patch).unwrap();
        assert!(rx.has_changed().unwrap());
        assert_eq!(rx.borrow_and_update()[0].project_name, "Task Manager Pro");

        book.delete(&p.id).unwrap();
        assert!(rx.has_changed().unwrap());
        assert!(rx.borrow_and_update().is_empty());
    }

    #[test]
    fn snapshot_is_ordered_by_start() {
        let (mut book, _, _) = make_book(at(8, 0));
        book.create(draft("Third", at(14, 0), at(15, 0))).unwrap();
        book.create(draft("First", at(9, 0), at(10, 0))).unwrap();
        book.create(draft("Second", at(11, 0), at(12, 0))).unwrap();

        let names: Vec<_> = book.list().iter().map(|p| p.project_name.clone()).collect();
        assert_eq!(names, vec!["First", "Second", "Third"]);
    }

    #[test]
    fn filtered_list_uses_display_order() {
        let (mut book, _, _) = make_book(at(12, 30));
        book.create(draft("Done early", at(8, 0), at(9, 0))).unwrap();
        book.create(draft("Done late", at(10, 0), at(11, 0))).unwrap();
        book.create(draft("Later", at(15, 0), at(16, 0))).unwrap();
        book.create(draft("Now", at(12, 0), at(13, 0))).unwrap();

        let names: Vec<_> = book
            .list_filtered(StatusFilter::All)
            .into_iter()
            .map(|p| p.project_name)
            .collect();
        assert_eq!(names, vec!["Now", "Later", "Done late", "Done early"]);

        let completed = book.list_filtered(StatusFilter::Completed);
        assert_eq!(completed.len(), 2);
        assert_eq!(completed[0].project_name, "Done late");

        let ongoing = book.list_filtered(StatusFilter::Ongoing);
        assert_eq!(ongoing.len(), 1);
        assert_eq!(ongoing[0].project_name, "Now");
    }

    #[test]
    fn seed_only_into_empty_book() {
        let (mut book, _, _) = make_book(at(9, 0));
        let seeds = vec![
            draft("E-commerce Platform", at(10, 0), at(11, 0)),
            draft("Task Manager", at(14, 30), at(15, 30)),
        ];

        assert_eq!(book.seed_if_empty(&seeds).unwrap(), 2);
        assert_eq!(book.list().len(), 2);

        assert_eq!(book.seed_if_empty(&seeds).unwrap(), 0);
        assert_eq!(book.list().len(), 2);
    }

    #[test]
    fn replace_all_is_all_or_nothing() {
        let (mut book, _, store) = make_book(at(9, 0));
        let kept = created(book.create(draft("Kept", at(10, 0), at(11, 0))).unwrap());

        let mut bad = kept.clone();
        bad.id = PresentationId::new();
        bad.end_time = bad.start_time;
        let result = book.replace_all(vec![bad]);
        assert!(matches!(result, Err(LecternError::InvalidWindow { .. })));
        assert_eq!(store.list_presentations().unwrap(), vec![kept.clone()]);

        let mut replacement = kept.clone();
        replacement.id = PresentationId::new();
        replacement.start_time = at(8, 0);
        replacement.end_time = at(8, 30);
        // Status is derived, whatever the caller claims
        replacement.status = PresentationStatus::Ongoing;

        let snapshot = book.replace_all(vec![replacement.clone()]).unwrap();
        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot[0].id, replacement.id);
        assert_eq!(snapshot[0].status, PresentationStatus::Completed);
        assert!(book.get(&kept.id).is_none());
    }

    #[test]
    fn open_brings_stale_statuses_up_to_date() {
        let store: Arc<dyn Store> = Arc::new(SqliteStore::in_memory().unwrap());
        let clock = Arc::new(ManualClock::new(at(9, 0)));

        let p = {
            let mut book = PresentationBook::open(store.clone(), clock.clone()).unwrap();
            created(book.create(draft("Task Manager", at(10, 0), at(11, 0))).unwrap())
        };
        assert_eq!(p.status, PresentationStatus::Upcoming);

        clock.set(at(10, 15));
        let book = PresentationBook::open(store.clone(), clock).unwrap();
        assert_eq!(book.get(&p.id).unwrap().status, PresentationStatus::Ongoing);
        assert_eq!(
            store.get_presentation(&p.id).unwrap().unwrap().status,
            PresentationStatus::Ongoing
        );
    }

    #[test]
    fn writes_are_audited() {
        let (mut book, _, store) = make_book(at(9, 0));
        let p = created(book.create(draft("Task Manager", at(10, 0), at(11, 0))).unwrap());
        book.delete(&p.id).unwrap();

        let audits = store.get_recent_audits(10).unwrap();
        assert_eq!(audits.len(), 2);
        assert!(matches!(audits[0].event, AuditEventType::PresentationDeleted { .. }));
        assert!(matches!(audits[1].event, AuditEventType::PresentationCreated { .. }));
    }
}
