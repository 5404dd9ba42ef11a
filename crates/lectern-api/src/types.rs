//! Shared types for the lecternd API

use chrono::{DateTime, Local};
use lectern_util::{PresentationId, ProjectId};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Lifecycle status of a presentation, derived from its window and the current time
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PresentationStatus {
    Upcoming,
    Ongoing,
    Completed,
}

impl PresentationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PresentationStatus::Upcoming => "upcoming",
            PresentationStatus::Ongoing => "ongoing",
            PresentationStatus::Completed => "completed",
        }
    }
}

impl fmt::Display for PresentationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PresentationStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "upcoming" => Ok(PresentationStatus::Upcoming),
            "ongoing" => Ok(PresentationStatus::Ongoing),
            "completed" => Ok(PresentationStatus::Completed),
            other => Err(format!("Unknown presentation status: {}", other)),
        }
    }
}

/// A scheduled project presentation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Presentation {
    pub id: PresentationId,
    pub project_id: ProjectId,
    pub project_name: String,
    pub description: String,
    pub group_id: String,
    pub start_time: DateTime<Local>,
    pub end_time: DateTime<Local>,
    /// Derived from the window; never set by clients
    pub status: PresentationStatus,
}

/// Fields a client supplies to schedule a new presentation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PresentationDraft {
    pub project_id: ProjectId,
    pub project_name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub group_id: String,
    pub start_time: DateTime<Local>,
    pub end_time: DateTime<Local>,
}

/// Partial edit of a presentation. Absent fields are left unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PresentationPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_id: Option<ProjectId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_time: Option<DateTime<Local>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_time: Option<DateTime<Local>>,
}

impl PresentationPatch {
    /// Whether this patch sets either end of the time window
    pub fn touches_window(&self) -> bool {
        self.start_time.is_some() || self.end_time.is_some()
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// Status filter for list views
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatusFilter {
    #[default]
    All,
    Upcoming,
    Ongoing,
    Completed,
}

impl StatusFilter {
    pub fn matches(&self, status: PresentationStatus) -> bool {
        match self {
            StatusFilter::All => true,
            StatusFilter::Upcoming => status == PresentationStatus::Upcoming,
            StatusFilter::Ongoing => status == PresentationStatus::Ongoing,
            StatusFilter::Completed => status == PresentationStatus::Completed,
        }
    }
}

/// A status transition observed during a refresh
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusChange {
    pub id: PresentationId,
    pub from: PresentationStatus,
    pub to: PresentationStatus,
}

/// Health status
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthStatus {
    pub live: bool,
    pub ready: bool,
    pub store_ok: bool,
    pub presentation_count: usize,
}
