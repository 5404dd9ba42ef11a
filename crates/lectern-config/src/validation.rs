//! Configuration validation

use crate::schema::{RawConfig, RawPresentation};
use chrono::{DateTime, Local};
use lectern_util::parse_local_datetime;
use thiserror::Error;

/// Validation error
#[derive(Debug, Clone, Error)]
pub enum ValidationError {
    #[error("Presentation #{index}: {message}")]
    PresentationError { index: usize, message: String },

    #[error("Invalid timestamp '{value}': {message}")]
    InvalidTimestamp { value: String, message: String },

    #[error("Presentation #{index}: end_time '{end}' must be after start_time '{start}'")]
    InvalidWindow {
        index: usize,
        start: String,
        end: String,
    },

    #[error("Global config error: {0}")]
    GlobalError(String),
}

/// Validate a raw configuration
pub fn validate_config(config: &RawConfig) -> Vec<ValidationError> {
    let mut errors = Vec::new();

    if config.service.refresh_interval_seconds == Some(0) {
        errors.push(ValidationError::GlobalError(
            "refresh_interval_seconds must be greater than 0".into(),
        ));
    }

    for (index, presentation) in config.presentations.iter().enumerate() {
        errors.extend(validate_presentation(index, presentation));
    }

    errors
}

fn validate_presentation(index: usize, raw: &RawPresentation) -> Vec<ValidationError> {
    let mut errors = Vec::new();

    if raw.project_id.trim().is_empty() {
        errors.push(ValidationError::PresentationError {
            index,
            message: "project_id cannot be empty".into(),
        });
    }

    if raw.project_name.trim().is_empty() {
        errors.push(ValidationError::PresentationError {
            index,
            message: "project_name cannot be empty".into(),
        });
    }

    let start = parse_timestamp(&raw.start_time);
    let end = parse_timestamp(&raw.end_time);

    match (start, end) {
        (Ok(start), Ok(end)) => {
            if end <= start {
                errors.push(ValidationError::InvalidWindow {
                    index,
                    start: raw.start_time.clone(),
                    end: raw.end_time.clone(),
                });
            }
        }
        (start, end) => {
            errors.extend(start.err());
            errors.extend(end.err());
        }
    }

    errors
}

/// Parse a configured timestamp as local time
pub fn parse_timestamp(s: &str) -> Result<DateTime<Local>, ValidationError> {
    parse_local_datetime(s).ok_or_else(|| ValidationError::InvalidTimestamp {
        value: s.to_string(),
        message: "Expected YYYY-MM-DDTHH:MM[:SS] or RFC 3339".into(),
    })
}
