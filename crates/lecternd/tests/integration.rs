//! Integration tests for lecternd
//!
//! These tests verify the end-to-end behavior of the service components:
//! configuration, persistence, the presentation book and the refresh ticker.

use chrono::{DateTime, Duration as ChronoDuration, Local, TimeZone};
use lectern_api::{PresentationDraft, PresentationPatch, PresentationStatus, StatusFilter};
use lectern_config::parse_config;
use lectern_core::{CoreEvent, PresentationBook, RefreshTicker};
use lectern_store::{AuditEventType, SqliteStore, Store};
use lectern_util::{LecternError, ManualClock, ProjectId};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, mpsc};
use tokio::time::timeout;

const SEED_CONFIG: &str = r#"
    config_version = 1

    [service]
    refresh_interval_seconds = 60

    [[presentations]]
    project_id = "1"
    project_name = "E-commerce Platform"
    description = "Core features and architecture walkthrough"
    group_id = "group-1"
    start_time = "2024-03-20T10:00:00"
    end_time = "2024-03-20T11:00:00"

    [[presentations]]
    project_id = "2"
    project_name = "Task Manager"
    description = "Team collaboration tool"
    group_id = "group-2"
    start_time = "2024-03-21T14:30:00"
    end_time = "2024-03-21T15:30:00"
"#;

fn at(day: u32, h: u32, m: u32) -> DateTime<Local> {
    Local.with_ymd_and_hms(2024, 3, day, h, m, 0).unwrap()
}

fn draft(name: &str, start: DateTime<Local>, end: DateTime<Local>) -> PresentationDraft {
    PresentationDraft {
        project_id: ProjectId::new("3"),
        project_name: name.into(),
        description: String::new(),
        group_id: "group-3".into(),
        start_time: start,
        end_time: end,
    }
}

fn memory_book(now: DateTime<Local>) -> (PresentationBook, Arc<ManualClock>, Arc<dyn Store>) {
    let store: Arc<dyn Store> = Arc::new(SqliteStore::in_memory().unwrap());
    let clock = Arc::new(ManualClock::new(now));
    let book = PresentationBook::open(store.clone(), clock.clone()).unwrap();
    (book, clock, store)
}

#[test]
fn test_seed_from_config_and_reopen() {
    let config = parse_config(SEED_CONFIG).unwrap();
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("lecternd.db");
    let clock = Arc::new(ManualClock::new(at(20, 10, 30)));

    {
        let store: Arc<dyn Store> = Arc::new(SqliteStore::open(&db_path).unwrap());
        let mut book = PresentationBook::open(store, clock.clone()).unwrap();
        assert_eq!(book.seed_if_empty(&config.seed_presentations).unwrap(), 2);

        let snapshot = book.list();
        assert_eq!(snapshot[0].project_name, "E-commerce Platform");
        assert_eq!(snapshot[0].status, PresentationStatus::Ongoing);
        assert_eq!(snapshot[1].status, PresentationStatus::Upcoming);
    }

    // A day later the first presentation is over; nothing is seeded twice
    clock.set(at(21, 9, 0));
    let store: Arc<dyn Store> = Arc::new(SqliteStore::open(&db_path).unwrap());
    let mut book = PresentationBook::open(store, clock).unwrap();
    assert_eq!(book.seed_if_empty(&config.seed_presentations).unwrap(), 0);

    let snapshot = book.list();
    assert_eq!(snapshot.len(), 2);
    assert_eq!(snapshot[0].status, PresentationStatus::Completed);
    assert_eq!(snapshot[1].status, PresentationStatus::Upcoming);
}

#[test]
fn test_status_follows_the_clock() {
    let (mut book, clock, _) = memory_book(at(20, 9, 0));
    let event = book
        .create(draft("Scenario", at(20, 10, 0), at(20, 11, 0)))
        .unwrap();
    let CoreEvent::PresentationCreated { presentation } = event else {
        panic!("Expected PresentationCreated");
    };
    assert_eq!(presentation.status, PresentationStatus::Upcoming);

    clock.set(at(20, 10, 30));
    book.refresh().unwrap();
    assert_eq!(book.get(&presentation.id).unwrap().status, PresentationStatus::Ongoing);

    clock.set(at(20, 12, 0));
    book.refresh().unwrap();
    assert_eq!(book.get(&presentation.id).unwrap().status, PresentationStatus::Completed);
}

#[test]
fn test_one_elapsed_window_between_ticks() {
    let (mut book, clock, _) = memory_book(at(20, 9, 0));
    let short = book.create(draft("Short", at(20, 9, 0), at(20, 9, 30))).unwrap();
    book.create(draft("Long", at(20, 9, 0), at(20, 12, 0))).unwrap();
    book.create(draft("Afternoon", at(20, 14, 0), at(20, 15, 0))).unwrap();

    let CoreEvent::PresentationCreated { presentation: short } = short else {
        panic!("Expected PresentationCreated");
    };

    clock.advance(ChronoDuration::minutes(45));
    let Some(CoreEvent::StatusesRefreshed { changes }) = book.refresh().unwrap() else {
        panic!("Expected a status change");
    };

    assert_eq!(changes.len(), 1);
    assert_eq!(changes[0].id, short.id);
    assert_eq!(changes[0].from, PresentationStatus::Ongoing);
    assert_eq!(changes[0].to, PresentationStatus::Completed);
}

#[test]
fn test_rejected_write_leaves_store_untouched() {
    let (mut book, _, store) = memory_book(at(20, 9, 0));
    let CoreEvent::PresentationCreated { presentation } = book
        .create(draft("Kept", at(20, 10, 0), at(20, 11, 0)))
        .unwrap()
    else {
        panic!("Expected PresentationCreated");
    };

    let before = store.list_presentations().unwrap();

    let result = book.update(
        &presentation.id,
        PresentationPatch {
            end_time: Some(at(20, 9, 30)),
            ..Default::default()
        },
    );
    assert!(matches!(result, Err(LecternError::InvalidWindow { .. })));

    let result = book.create(draft("Backwards", at(20, 11, 0), at(20, 10, 0)));
    assert!(matches!(result, Err(LecternError::InvalidWindow { .. })));

    assert_eq!(store.list_presentations().unwrap(), before);
    assert_eq!(book.list().len(), 1);
}

#[test]
fn test_display_order_across_statuses() {
    let (mut book, _, _) = memory_book(at(20, 12, 0));
    book.create(draft("Morning", at(20, 8, 0), at(20, 9, 0))).unwrap();
    book.create(draft("Late morning", at(20, 10, 0), at(20, 11, 0))).unwrap();
    book.create(draft("Tomorrow", at(21, 10, 0), at(21, 11, 0))).unwrap();
    book.create(draft("Lunch", at(20, 11, 30), at(20, 12, 30))).unwrap();

    let names: Vec<_> = book
        .list_filtered(StatusFilter::All)
        .into_iter()
        .map(|p| p.project_name)
        .collect();
    assert_eq!(names, vec!["Lunch", "Tomorrow", "Late morning", "Morning"]);
}

#[test]
fn test_audit_trail() {
    let (mut book, clock, store) = memory_book(at(20, 9, 0));
    let CoreEvent::PresentationCreated { presentation } = book
        .create(draft("Audited", at(20, 10, 0), at(20, 11, 0)))
        .unwrap()
    else {
        panic!("Expected PresentationCreated");
    };

    clock.set(at(20, 10, 15));
    book.refresh().unwrap();
    book.delete(&presentation.id).unwrap();

    let audits = store.get_recent_audits(10).unwrap();
    assert_eq!(audits.len(), 3);
    assert!(matches!(audits[0].event, AuditEventType::PresentationDeleted { .. }));
    assert!(matches!(
        audits[1].event,
        AuditEventType::StatusesRefreshed { changed: 1 }
    ));
    assert!(matches!(audits[2].event, AuditEventType::PresentationCreated { .. }));
}

#[tokio::test]
async fn test_ticker_publishes_snapshots() {
    let (mut book, clock, _) = memory_book(at(20, 9, 0));
    book.create(draft("Ticked", at(20, 10, 0), at(20, 11, 0))).unwrap();

    let mut snapshots = book.subscribe();
    let book = Arc::new(Mutex::new(book));
    let (tx, mut rx) = mpsc::unbounded_channel();
    let mut ticker = RefreshTicker::start(book.clone(), Duration::from_millis(10), tx);

    clock.set(at(20, 10, 5));

    let event = timeout(Duration::from_secs(2), rx.recv())
        .await
        .unwrap()
        .unwrap();
    assert!(matches!(event, CoreEvent::StatusesRefreshed { .. }));

    timeout(Duration::from_secs(2), snapshots.changed())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(
        snapshots.borrow_and_update()[0].status,
        PresentationStatus::Ongoing
    );

    ticker.cancel();
    clock.set(at(20, 12, 0));

    // No more refreshes once cancelled
    assert!(timeout(Duration::from_secs(2), rx.recv()).await.unwrap().is_none());
    assert_eq!(
        book.lock().await.list()[0].status,
        PresentationStatus::Ongoing
    );
}
