//! Protocol types for lecternd
//!
//! This crate defines the stable API between lecternd and clients:
//! - Presentation records and their derived status
//! - Commands (requests from clients)
//! - Responses
//! - Events (service -> clients)
//! - Versioning

mod commands;
mod events;
mod types;

pub use commands::*;
pub use events::*;
pub use types::*;

/// Current API version
pub const API_VERSION: u32 = 1;
