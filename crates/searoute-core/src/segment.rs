//! Saved route segments: request shape, validated candidate, stored record.

use crate::error::InputError;
use crate::models::{parse_lat_lng_pairs, GeoPoint, Port};
use crate::spatial::{total_distance_km, total_distance_nm};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// How the stored polyline was produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RouteType {
    Generated,
    Manual,
    Edited,
}

impl RouteType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Generated => "generated",
            Self::Manual => "manual",
            Self::Edited => "edited",
        }
    }

    pub fn parse(value: &str) -> Self {
        match value {
            "generated" => Self::Generated,
            "edited" => Self::Edited,
            _ => Self::Manual,
        }
    }
}

/// Segment metadata. `created_at` is the typed form of the `createdAt` key
/// callers and older rows put in the blob; everything else is opaque.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SegmentMetadata {
    #[serde(
        default,
        rename = "createdAt",
        alias = "created_at",
        deserialize_with = "lenient_timestamp",
        skip_serializing_if = "Option::is_none"
    )]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl SegmentMetadata {
    /// Parse a stored blob; a corrupt blob reads as empty metadata.
    pub fn from_json_lenient(raw: &str) -> Self {
        serde_json::from_str(raw).unwrap_or_default()
    }
}

/// Accept RFC 3339 strings or epoch milliseconds; anything else is `None`.
fn lenient_timestamp<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(value.and_then(|v| parse_timestamp_value(&v)))
}

pub(crate) fn parse_timestamp_value(value: &serde_json::Value) -> Option<DateTime<Utc>> {
    match value {
        serde_json::Value::String(s) => parse_timestamp(s),
        serde_json::Value::Number(n) => n.as_i64().and_then(DateTime::<Utc>::from_timestamp_millis),
        _ => None,
    }
}

/// Parse an RFC 3339 timestamp, or `None` if blank or malformed.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .ok()
}

/// Request header carrying a client-chosen id for a save. A resubmitted save
/// with the same id returns the version it already created.
pub const IDEMPOTENCY_KEY_HEADER: &str = "idempotency-key";

/// Build the segment key from two port ids.
pub fn segment_id(origin_port_id: &str, destination_port_id: &str) -> String {
    format!("{}-{}", origin_port_id, destination_port_id)
}

/// Segment save request as received from a client.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SegmentSaveRequest {
    pub origin_port: Port,
    pub destination_port: Port,
    /// `[lat, lng]` pairs
    pub route_coordinates: Vec<[f64; 2]>,
    pub route_type: RouteType,
    #[serde(default)]
    pub distance_nautical_miles: Option<f64>,
    #[serde(default)]
    pub distance_km: Option<f64>,
    #[serde(default)]
    pub created_by: Option<String>,
    #[serde(default)]
    pub metadata: SegmentMetadata,
}

/// A save request that passed validation. Retrying a failed save reuses this
/// value as-is.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SegmentCandidate {
    pub segment_id: String,
    pub origin_port: Port,
    pub destination_port: Port,
    pub route_coordinates: Vec<GeoPoint>,
    pub route_type: RouteType,
    pub distance_nautical_miles: f64,
    pub distance_km: f64,
    pub created_by: String,
    pub metadata: SegmentMetadata,
}

const DEFAULT_CREATED_BY: &str = "system";

fn validate_distance(value: Option<f64>, field: &'static str) -> Result<Option<f64>, InputError> {
    match value {
        Some(d) if !d.is_finite() => Err(InputError::NonFinite { field }),
        Some(d) if d < 0.0 => Err(InputError::NegativeDistance { field }),
        other => Ok(other),
    }
}

impl SegmentSaveRequest {
    /// Validate without touching storage.
    ///
    /// Checks run in a fixed order: port ids, identical ports, coordinate
    /// count, coordinate values, distances.
    pub fn validate(self) -> Result<SegmentCandidate, InputError> {
        let origin_id = self.origin_port.id.trim();
        let destination_id = self.destination_port.id.trim();
        if origin_id.is_empty() {
            return Err(InputError::MissingField {
                field: "origin_port_id",
            });
        }
        if destination_id.is_empty() {
            return Err(InputError::MissingField {
                field: "destination_port_id",
            });
        }
        if origin_id == destination_id {
            return Err(InputError::IdenticalEndpoints);
        }
        if self.route_coordinates.len() < 2 {
            return Err(InputError::TooFewCoordinates {
                field: "route_coordinates",
                required: 2,
                actual: self.route_coordinates.len(),
            });
        }

        let route_coordinates = parse_lat_lng_pairs(&self.route_coordinates, "route_coordinates")?;
        self.origin_port
            .position()
            .map_err(|e| e.with_field("origin_port"))?;
        self.destination_port
            .position()
            .map_err(|e| e.with_field("destination_port"))?;

        let distance_nautical_miles = validate_distance(self.distance_nautical_miles, "distance_nautical_miles")?
            .unwrap_or_else(|| total_distance_nm(&route_coordinates));
        let distance_km = validate_distance(self.distance_km, "distance_km")?
            .unwrap_or_else(|| total_distance_km(&route_coordinates));

        let created_by = self
            .created_by
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .unwrap_or(DEFAULT_CREATED_BY)
            .to_string();

        Ok(SegmentCandidate {
            segment_id: segment_id(origin_id, destination_id),
            origin_port: self.origin_port,
            destination_port: self.destination_port,
            route_coordinates,
            route_type: self.route_type,
            distance_nautical_miles,
            distance_km,
            created_by,
            metadata: self.metadata,
        })
    }
}

impl From<&SegmentCandidate> for SegmentSaveRequest {
    /// Wire form of an already-validated candidate, used to resend a save.
    fn from(candidate: &SegmentCandidate) -> Self {
        SegmentSaveRequest {
            origin_port: candidate.origin_port.clone(),
            destination_port: candidate.destination_port.clone(),
            route_coordinates: candidate.route_coordinates.iter().map(GeoPoint::to_lat_lng).collect(),
            route_type: candidate.route_type,
            distance_nautical_miles: Some(candidate.distance_nautical_miles),
            distance_km: Some(candidate.distance_km),
            created_by: Some(candidate.created_by.clone()),
            metadata: candidate.metadata.clone(),
        }
    }
}

/// A persisted version of a segment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SegmentRecord {
    pub segment_id: String,
    pub origin_port: Port,
    pub destination_port: Port,
    pub route_coordinates: Vec<GeoPoint>,
    pub route_type: RouteType,
    pub distance_nautical_miles: f64,
    pub distance_km: f64,
    pub created_by: String,
    pub is_active: bool,
    pub version: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub metadata: SegmentMetadata,
}

/// Body of a successful save.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveSegmentResponse {
    pub segment_id: String,
    pub version: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SegmentHistoryResponse {
    pub segment_id: String,
    pub versions: Vec<SegmentRecord>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn request(origin: &str, destination: &str, coords: Vec<[f64; 2]>) -> SegmentSaveRequest {
        SegmentSaveRequest {
            origin_port: Port::new(origin, "Origin", 25.7617, -80.1918),
            destination_port: Port::new(destination, "Destination", 25.0343, -77.3554),
            route_coordinates: coords,
            route_type: RouteType::Manual,
            distance_nautical_miles: None,
            distance_km: None,
            created_by: None,
            metadata: SegmentMetadata::default(),
        }
    }

    #[test]
    fn valid_request_builds_candidate() {
        let candidate = request("miami", "nassau", vec![[25.7617, -80.1918], [25.4, -78.8], [25.0343, -77.3554]])
            .validate()
            .unwrap();
        assert_eq!(candidate.segment_id, "miami-nassau");
        assert_eq!(candidate.route_coordinates.len(), 3);
        assert_eq!(candidate.created_by, "system");
        assert!(candidate.distance_nautical_miles > 150.0);
    }

    #[test]
    fn candidate_converts_back_to_an_equivalent_request() {
        let candidate = request("miami", "nassau", vec![[25.7617, -80.1918], [25.0343, -77.3554]])
            .validate()
            .unwrap();
        let resent = SegmentSaveRequest::from(&candidate).validate().unwrap();
        assert_eq!(resent, candidate);
    }

    #[test]
    fn identical_ports_rejected() {
        let err = request("miami", "miami", vec![[25.0, -80.0], [25.1, -79.0]])
            .validate()
            .unwrap_err();
        assert_eq!(err, InputError::IdenticalEndpoints);
    }

    #[test]
    fn missing_ids_rejected() {
        let err = request(" ", "nassau", vec![[25.0, -80.0], [25.1, -79.0]])
            .validate()
            .unwrap_err();
        assert_eq!(err.field(), "origin_port_id");
    }

    #[test]
    fn too_few_coordinates_rejected() {
        let err = request("miami", "nassau", vec![[25.0, -80.0]]).validate().unwrap_err();
        assert!(matches!(err, InputError::TooFewCoordinates { actual: 1, .. }));
        assert_eq!(err.field(), "route_coordinates");
    }

    #[test]
    fn out_of_range_coordinate_names_field() {
        let err = request("miami", "nassau", vec![[25.0, -80.0], [125.0, -79.0]])
            .validate()
            .unwrap_err();
        assert_eq!(err.field(), "route_coordinates");
    }

    #[test]
    fn negative_distance_rejected() {
        let mut req = request("miami", "nassau", vec![[25.0, -80.0], [25.1, -79.0]]);
        req.distance_km = Some(-1.0);
        assert_eq!(req.validate().unwrap_err().field(), "distance_km");
    }

    #[test]
    fn metadata_created_at_is_typed_and_extra_is_kept() {
        let meta: SegmentMetadata = serde_json::from_value(json!({
            "createdAt": "2024-01-02T03:04:05Z",
            "editor": "chart-room",
        }))
        .unwrap();
        assert_eq!(meta.created_at, parse_timestamp("2024-01-02T03:04:05Z"));
        assert_eq!(meta.extra["editor"], json!("chart-room"));

        let round = serde_json::to_value(&meta).unwrap();
        assert_eq!(round["createdAt"], json!("2024-01-02T03:04:05Z"));
    }

    #[test]
    fn garbage_created_at_reads_as_none() {
        let meta: SegmentMetadata = serde_json::from_value(json!({ "createdAt": "yesterday" })).unwrap();
        assert!(meta.created_at.is_none());
        assert_eq!(SegmentMetadata::from_json_lenient("not json"), SegmentMetadata::default());
    }

    #[test]
    fn epoch_millis_created_at_is_accepted() {
        let meta: SegmentMetadata = serde_json::from_value(json!({ "created_at": 1_700_000_000_000_i64 })).unwrap();
        assert_eq!(meta.created_at.unwrap().timestamp(), 1_700_000_000);
    }
}
