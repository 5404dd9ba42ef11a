//! Error types for lecternd

use chrono::{DateTime, Local};
use thiserror::Error;

use crate::PresentationId;

/// Core error type for lecternd operations
#[derive(Debug, Error)]
pub enum LecternError {
    #[error("Invalid time window: end {end} is not after start {start}")]
    InvalidWindow {
        start: DateTime<Local>,
        end: DateTime<Local>,
    },

    #[error("Presentation not found: {0}")]
    PresentationNotFound(PresentationId),

    #[error("Store error: {0}")]
    StoreError(String),
}

impl LecternError {
    pub fn invalid_window(start: DateTime<Local>, end: DateTime<Local>) -> Self {
        Self::InvalidWindow { start, end }
    }

    pub fn store(msg: impl Into<String>) -> Self {
        Self::StoreError(msg.into())
    }
}

pub type Result<T> = std::result::Result<T, LecternError>;
