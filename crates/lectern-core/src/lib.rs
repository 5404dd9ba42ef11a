//! Core presentation engine for lecternd
//!
//! This crate is the heart of lecternd, containing:
//! - Status derivation (Upcoming -> Ongoing -> Completed) from a time window and "now"
//! - The presentation book: validated writes, atomic snapshots, subscriptions
//! - The refresh ticker that re-derives statuses as time passes

mod book;
mod events;
mod status;
mod ticker;

pub use book::*;
pub use events::*;
pub use status::*;
pub use ticker::*;
