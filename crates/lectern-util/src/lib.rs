//! Shared utilities for lecternd
//!
//! This crate provides:
//! - ID types (PresentationId, ProjectId, ClientId)
//! - Time utilities (the `Clock` seam, mock time, timestamp parsing)
//! - Error types
//! - Default paths for socket, config, and data directories

mod error;
mod ids;
mod paths;
mod time;

pub use error::*;
pub use ids::*;
pub use paths::*;
pub use time::*;
