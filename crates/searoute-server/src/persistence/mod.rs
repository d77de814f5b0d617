//! Persistence layer.
//!
//! SQLite-backed, append-only storage of route segment versions.

pub mod db;
pub mod segments;

pub use db::{init_database, Database};
pub use segments::{load_active_segment, load_segment_history, save_segment, save_segment_at, save_segment_once, SaveOutcome};
