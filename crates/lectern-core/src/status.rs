//! Status derivation
//!
//! A presentation's status is never stored as a source of truth: it is a pure
//! function of its `[start_time, end_time]` window and the current time.

use chrono::{DateTime, Local};
use lectern_api::{Presentation, PresentationStatus, StatusChange};
use lectern_util::{LecternError, PresentationId, Result};
use std::collections::HashMap;

/// Derive the status of a window at `now`.
///
/// First match wins:
/// 1. `now < start_time` is upcoming
/// 2. `now > end_time` is completed
/// 3. anything else is ongoing, so both boundaries count as ongoing
///
/// Writers guarantee `end_time > start_time`. A degenerate window that gets
/// here anyway is upcoming before `start_time` and completed from then on.
pub fn compute_status(
    start_time: DateTime<Local>,
    end_time: DateTime<Local>,
    now: DateTime<Local>,
) -> PresentationStatus {
    if now < start_time {
        PresentationStatus::Upcoming
    } else if end_time <= start_time || now > end_time {
        PresentationStatus::Completed
    } else {
        PresentationStatus::Ongoing
    }
}

/// Reject windows that don't end strictly after they start
pub fn validate_window(start_time: DateTime<Local>, end_time: DateTime<Local>) -> Result<()> {
    if end_time <= start_time {
        return Err(LecternError::invalid_window(start_time, end_time));
    }
    Ok(())
}

/// Recompute every record's status against a single `now`.
///
/// Returns a new collection; `records` is left untouched.
pub fn refresh_all(records: &[Presentation], now: DateTime<Local>) -> Vec<Presentation> {
    records
        .iter()
        .map(|p| Presentation {
            status: compute_status(p.start_time, p.end_time, now),
            ..p.clone()
        })
        .collect()
}

/// Status moves between two versions of the same collection, matched by id
pub fn refresh_changes(before: &[Presentation], after: &[Presentation]) -> Vec<StatusChange> {
    let previous: HashMap<&PresentationId, PresentationStatus> =
        before.iter().map(|p| (&p.id, p.status)).collect();

    after
        .iter()
        .filter_map(|new| {
            let old = *previous.get(&new.id)?;
            (old != new.status).then(|| StatusChange {
                id: new.id.clone(),
                from: old,
                to: new.status,
            })
        })
        .collect()
}
