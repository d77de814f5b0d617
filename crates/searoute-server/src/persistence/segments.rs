//! Route segment version store.
//!
//! Saves never update a row in place except to clear `is_active` on the
//! version being superseded. The partial unique index on active rows backs
//! the single-active-version rule if two writers interleave.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use searoute_core::models::{GeoPoint, Port};
use searoute_core::segment::{parse_timestamp, RouteType, SegmentCandidate, SegmentMetadata, SegmentRecord};
use searoute_core::versioning::{next_version, resolve_created_at, CreatedAtSource, VersionSnapshot};
use serde::Serialize;
use sqlx::SqlitePool;

const SEGMENT_COLUMNS: &str = "segment_id, origin_port, destination_port, route_coordinates, route_type, \
     distance_nm, distance_km, created_by, is_active, version, created_at, updated_at, metadata";

/// What a successful save reports back to the caller.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveOutcome {
    pub segment_id: String,
    pub version: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// `None` when the save replayed an earlier commit.
    pub created_at_source: Option<CreatedAtSource>,
    /// True when `client_request_id` matched a version already stored.
    pub replayed: bool,
}

/// Save a new version of a segment, stamped with the current time.
pub async fn save_segment(pool: &SqlitePool, candidate: &SegmentCandidate) -> Result<SaveOutcome> {
    save_segment_at(pool, candidate, Utc::now()).await
}

/// Save with a caller-chosen request id. Resubmitting the same id for the
/// same segment returns the version it already created instead of adding one.
pub async fn save_segment_once(
    pool: &SqlitePool,
    candidate: &SegmentCandidate,
    client_request_id: &str,
) -> Result<SaveOutcome> {
    save(pool, candidate, Some(client_request_id), Utc::now()).await
}

/// Save a new version of a segment with an explicit save time.
///
/// Runs in one transaction: read the active row, the max version and the
/// first version, resolve `created_at`, deactivate the old active row, then
/// insert the new one.
pub async fn save_segment_at(
    pool: &SqlitePool,
    candidate: &SegmentCandidate,
    now: DateTime<Utc>,
) -> Result<SaveOutcome> {
    save(pool, candidate, None, now).await
}

async fn save(
    pool: &SqlitePool,
    candidate: &SegmentCandidate,
    client_request_id: Option<&str>,
    now: DateTime<Utc>,
) -> Result<SaveOutcome> {
    let segment_id = candidate.segment_id.as_str();
    let mut tx = pool.begin().await?;

    if let Some(request_id) = client_request_id {
        let earlier = sqlx::query_as::<_, ReplayRow>(
            "SELECT version, created_at, updated_at FROM route_segments \
             WHERE segment_id = ?1 AND client_request_id = ?2",
        )
        .bind(segment_id)
        .bind(request_id)
        .fetch_optional(&mut *tx)
        .await?;
        if let Some(row) = earlier {
            tx.rollback().await?;
            tracing::info!(segment_id = %segment_id, version = row.version, "Replayed route segment save");
            return row.into_outcome(segment_id);
        }
    }

    let active = sqlx::query_as::<_, SnapshotRow>(
        "SELECT version, created_at, metadata FROM route_segments \
         WHERE segment_id = ?1 AND is_active = 1 ORDER BY version DESC LIMIT 1",
    )
    .bind(segment_id)
    .fetch_optional(&mut *tx)
    .await?
    .map(VersionSnapshot::from);

    let max_version: Option<i64> =
        sqlx::query_scalar("SELECT MAX(version) FROM route_segments WHERE segment_id = ?1")
            .bind(segment_id)
            .fetch_one(&mut *tx)
            .await?;
    let version = next_version(max_version);

    let first = sqlx::query_as::<_, SnapshotRow>(
        "SELECT version, created_at, metadata FROM route_segments \
         WHERE segment_id = ?1 ORDER BY version ASC LIMIT 1",
    )
    .bind(segment_id)
    .fetch_optional(&mut *tx)
    .await?
    .map(VersionSnapshot::from);

    let (created_at, created_at_source) = resolve_created_at(
        candidate.metadata.created_at,
        first.as_ref(),
        active.as_ref(),
        now,
    );

    if let Some(active) = &active {
        sqlx::query("UPDATE route_segments SET is_active = 0 WHERE segment_id = ?1 AND is_active = 1")
            .bind(segment_id)
            .execute(&mut *tx)
            .await?;
        tracing::debug!("Deactivated {} version {}", segment_id, active.version);
    }

    let coordinates: Vec<[f64; 2]> = candidate
        .route_coordinates
        .iter()
        .map(GeoPoint::to_lon_lat)
        .collect();

    sqlx::query(
        r#"
        INSERT INTO route_segments (segment_id, origin_port, destination_port, route_coordinates, route_type,
            distance_nm, distance_km, created_by, is_active, version, created_at, updated_at, metadata,
            client_request_id)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, 1, ?9, ?10, ?11, ?12, ?13)
        "#,
    )
    .bind(segment_id)
    .bind(serde_json::to_string(&candidate.origin_port)?)
    .bind(serde_json::to_string(&candidate.destination_port)?)
    .bind(serde_json::to_string(&coordinates)?)
    .bind(candidate.route_type.as_str())
    .bind(candidate.distance_nautical_miles)
    .bind(candidate.distance_km)
    .bind(&candidate.created_by)
    .bind(version)
    .bind(created_at.to_rfc3339())
    .bind(now.to_rfc3339())
    .bind(serde_json::to_string(&candidate.metadata)?)
    .bind(client_request_id)
    .execute(&mut *tx)
    .await
    .with_context(|| format!("insert {} version {}", segment_id, version))?;

    tx.commit().await?;

    tracing::info!(
        segment_id = %segment_id,
        version,
        created_at_source = ?created_at_source,
        "Saved route segment"
    );

    Ok(SaveOutcome {
        segment_id: segment_id.to_string(),
        version,
        created_at,
        updated_at: now,
        created_at_source: Some(created_at_source),
        replayed: false,
    })
}

/// Current version of a segment.
///
/// Normally the active row. If a save was interrupted after deactivation,
/// no row is active and the highest version (then latest update) wins.
pub async fn load_active_segment(pool: &SqlitePool, segment_id: &str) -> Result<Option<SegmentRecord>> {
    let row = sqlx::query_as::<_, SegmentRow>(&format!(
        "SELECT {} FROM route_segments WHERE segment_id = ?1 \
         ORDER BY is_active DESC, version DESC, updated_at DESC LIMIT 1",
        SEGMENT_COLUMNS
    ))
    .bind(segment_id)
    .fetch_optional(pool)
    .await?;

    let Some(row) = row else {
        return Ok(None);
    };
    if !row.is_active {
        tracing::warn!(
            "Segment {} has no active version, using version {}",
            segment_id,
            row.version
        );
    }
    Ok(Some(row.try_into()?))
}

/// Every stored version of a segment, oldest first.
pub async fn load_segment_history(pool: &SqlitePool, segment_id: &str) -> Result<Vec<SegmentRecord>> {
    let rows = sqlx::query_as::<_, SegmentRow>(&format!(
        "SELECT {} FROM route_segments WHERE segment_id = ?1 ORDER BY version ASC",
        SEGMENT_COLUMNS
    ))
    .bind(segment_id)
    .fetch_all(pool)
    .await?;

    rows.into_iter().map(SegmentRecord::try_from).collect()
}

#[derive(sqlx::FromRow)]
struct SnapshotRow {
    version: i64,
    created_at: Option<String>,
    metadata: Option<String>,
}

impl From<SnapshotRow> for VersionSnapshot {
    fn from(row: SnapshotRow) -> Self {
        VersionSnapshot {
            version: row.version,
            created_at: row.created_at.as_deref().and_then(parse_timestamp),
            metadata_created_at: row
                .metadata
                .as_deref()
                .map(SegmentMetadata::from_json_lenient)
                .and_then(|m| m.created_at),
        }
    }
}

#[derive(sqlx::FromRow)]
struct ReplayRow {
    version: i64,
    created_at: Option<String>,
    updated_at: String,
}

impl ReplayRow {
    fn into_outcome(self, segment_id: &str) -> Result<SaveOutcome> {
        let updated_at = parse_timestamp(&self.updated_at)
            .with_context(|| format!("updated_at of {} v{}", segment_id, self.version))?;
        Ok(SaveOutcome {
            segment_id: segment_id.to_string(),
            version: self.version,
            created_at: self.created_at.as_deref().and_then(parse_timestamp).unwrap_or(updated_at),
            updated_at,
            created_at_source: None,
            replayed: true,
        })
    }
}

// Internal row type for SQLx
#[derive(sqlx::FromRow)]
struct SegmentRow {
    segment_id: String,
    origin_port: String,
    destination_port: String,
    route_coordinates: String,
    route_type: String,
    distance_nm: f64,
    distance_km: f64,
    created_by: String,
    is_active: bool,
    version: i64,
    created_at: Option<String>,
    updated_at: String,
    metadata: Option<String>,
}

impl TryFrom<SegmentRow> for SegmentRecord {
    type Error = anyhow::Error;

    fn try_from(row: SegmentRow) -> Result<Self> {
        let origin_port: Port = serde_json::from_str(&row.origin_port)
            .with_context(|| format!("origin_port of {} v{}", row.segment_id, row.version))?;
        let destination_port: Port = serde_json::from_str(&row.destination_port)
            .with_context(|| format!("destination_port of {} v{}", row.segment_id, row.version))?;
        let pairs: Vec<[f64; 2]> = serde_json::from_str(&row.route_coordinates)
            .with_context(|| format!("route_coordinates of {} v{}", row.segment_id, row.version))?;
        let route_coordinates = pairs
            .into_iter()
            .map(GeoPoint::from_lon_lat)
            .collect::<Result<Vec<_>, _>>()?;

        let metadata = row
            .metadata
            .as_deref()
            .map(SegmentMetadata::from_json_lenient)
            .unwrap_or_default();
        let updated_at = parse_timestamp(&row.updated_at)
            .with_context(|| format!("updated_at of {} v{}", row.segment_id, row.version))?;
        let created_at = row
            .created_at
            .as_deref()
            .and_then(parse_timestamp)
            .or(metadata.created_at)
            .unwrap_or(updated_at);

        Ok(SegmentRecord {
            segment_id: row.segment_id,
            origin_port,
            destination_port,
            route_coordinates,
            route_type: RouteType::parse(&row.route_type),
            distance_nautical_miles: row.distance_nm,
            distance_km: row.distance_km,
            created_by: row.created_by,
            is_active: row.is_active,
            version: row.version,
            created_at,
            updated_at,
            metadata,
        })
    }
}
