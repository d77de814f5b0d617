//! Version numbering and creation-time resolution for saved segments.
//!
//! The store reads the active row, the max version, and the first-ever row,
//! then hands them here. Keeping the rules pure lets them be tested without
//! a database.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Creation-time fields of one stored version.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VersionSnapshot {
    pub version: i64,
    /// Parsed `created_at` column; `None` if null or unparseable.
    pub created_at: Option<DateTime<Utc>>,
    /// `createdAt` found inside the row's metadata blob.
    pub metadata_created_at: Option<DateTime<Utc>>,
}

/// Which rule produced the resolved `created_at`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CreatedAtSource {
    CallerMetadata,
    FirstVersionColumn,
    FirstVersionMetadata,
    ActiveVersion,
    Now,
}

/// `max + 1`, or 1 when there is no positive prior version.
pub fn next_version(max_version: Option<i64>) -> i64 {
    match max_version {
        Some(max) if max > 0 => max + 1,
        _ => 1,
    }
}

/// Resolve the `created_at` for a new version. First match wins:
///
/// 1. caller-supplied `createdAt` in metadata
/// 2. first version's `created_at` column
/// 3. first version's metadata `createdAt`
/// 4. current active version's `created_at` (column, then metadata)
/// 5. `now`, only meaningful when no prior version exists
pub fn resolve_created_at(
    caller: Option<DateTime<Utc>>,
    first: Option<&VersionSnapshot>,
    active: Option<&VersionSnapshot>,
    now: DateTime<Utc>,
) -> (DateTime<Utc>, CreatedAtSource) {
    if let Some(ts) = caller {
        return (ts, CreatedAtSource::CallerMetadata);
    }
    if let Some(first) = first {
        if let Some(ts) = first.created_at {
            return (ts, CreatedAtSource::FirstVersionColumn);
        }
        if let Some(ts) = first.metadata_created_at {
            return (ts, CreatedAtSource::FirstVersionMetadata);
        }
    }
    if let Some(ts) = active.and_then(|a| a.created_at.or(a.metadata_created_at)) {
        return (ts, CreatedAtSource::ActiveVersion);
    }
    (now, CreatedAtSource::Now)
}
