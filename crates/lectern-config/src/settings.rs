//! Validated configuration structures

use crate::schema::{RawConfig, RawPresentation, RawServiceConfig};
use crate::validation::parse_timestamp;
use lectern_api::PresentationDraft;
use lectern_util::{ProjectId, default_data_dir, default_socket_path};
use std::path::PathBuf;
use std::time::Duration;

/// Refresh cadence used when the config doesn't set one
pub const DEFAULT_REFRESH_INTERVAL: Duration = Duration::from_secs(60);

/// Validated configuration ready for use by the service
#[derive(Debug, Clone, Default)]
pub struct LecternConfig {
    pub service: ServiceConfig,

    /// Presentations to insert into an empty store
    pub seed_presentations: Vec<PresentationDraft>,
}

impl LecternConfig {
    /// Convert from raw config (after validation)
    pub fn from_raw(raw: RawConfig) -> Self {
        let seed_presentations = raw
            .presentations
            .into_iter()
            .filter_map(convert_presentation)
            .collect();

        Self {
            service: ServiceConfig::from_raw(raw.service),
            seed_presentations,
        }
    }
}

/// Service configuration
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub socket_path: PathBuf,
    pub data_dir: PathBuf,
    pub refresh_interval: Duration,
}

impl ServiceConfig {
    fn from_raw(raw: RawServiceConfig) -> Self {
        Self {
            socket_path: raw.socket_path.unwrap_or_else(default_socket_path),
            data_dir: raw.data_dir.unwrap_or_else(default_data_dir),
            refresh_interval: raw
                .refresh_interval_seconds
                .map(Duration::from_secs)
                .unwrap_or(DEFAULT_REFRESH_INTERVAL),
        }
    }
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            socket_path: default_socket_path(),
            data_dir: default_data_dir(),
            refresh_interval: DEFAULT_REFRESH_INTERVAL,
        }
    }
}

// Timestamps were checked by validation; anything unparseable here is skipped
fn convert_presentation(raw: RawPresentation) -> Option<PresentationDraft> {
    let start_time = parse_timestamp(&raw.start_time).ok()?;
    let end_time = parse_timestamp(&raw.end_time).ok()?;

    Some(PresentationDraft {
        project_id: ProjectId::new(raw.project_id),
        project_name: raw.project_name,
        description: raw.description.unwrap_or_default(),
        group_id: raw.group_id.unwrap_or_default(),
        start_time,
        end_time,
    })
}
