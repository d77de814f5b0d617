//! Core data models for maritime routing.

use crate::error::InputError;
use serde::{Deserialize, Serialize};

/// A validated WGS84 position in decimal degrees.
///
/// Construction always goes through [`GeoPoint::new`] (or serde, which calls
/// it), so every point held by the core is finite and in range.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawGeoPoint")]
pub struct GeoPoint {
    lat: f64,
    lon: f64,
}

#[derive(Deserialize)]
struct RawGeoPoint {
    lat: f64,
    #[serde(alias = "lng")]
    lon: f64,
}

impl TryFrom<RawGeoPoint> for GeoPoint {
    type Error = InputError;

    fn try_from(raw: RawGeoPoint) -> Result<Self, Self::Error> {
        GeoPoint::new(raw.lat, raw.lon)
    }
}

impl std::fmt::Display for GeoPoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({:.6}, {:.6})", self.lat, self.lon)
    }
}

impl GeoPoint {
    pub fn new(lat: f64, lon: f64) -> Result<Self, InputError> {
        const FIELD: &str = "coordinate";
        if !lat.is_finite() || !lon.is_finite() {
            return Err(InputError::NonFinite { field: FIELD });
        }
        if !(-90.0..=90.0).contains(&lat) {
            return Err(InputError::LatitudeOutOfRange {
                field: FIELD,
                value: lat,
            });
        }
        if !(-180.0..=180.0).contains(&lon) {
            return Err(InputError::LongitudeOutOfRange {
                field: FIELD,
                value: lon,
            });
        }
        Ok(Self { lat, lon })
    }

    /// GeoJSON order: `[lon, lat]`.
    pub fn from_lon_lat(pair: [f64; 2]) -> Result<Self, InputError> {
        Self::new(pair[1], pair[0])
    }

    /// Display order used by the segment save request: `[lat, lng]`.
    pub fn from_lat_lng(pair: [f64; 2]) -> Result<Self, InputError> {
        Self::new(pair[0], pair[1])
    }

    pub fn lat(&self) -> f64 {
        self.lat
    }

    pub fn lon(&self) -> f64 {
        self.lon
    }

    pub fn to_lon_lat(&self) -> [f64; 2] {
        [self.lon, self.lat]
    }

    pub fn to_lat_lng(&self) -> [f64; 2] {
        [self.lat, self.lon]
    }

    /// Build a point from computed values, clamping latitude and wrapping
    /// longitude back into range. Only for outputs of trusted math.
    pub(crate) fn normalized(lat: f64, lon: f64) -> Self {
        let lat = if lat.is_finite() { lat.clamp(-90.0, 90.0) } else { 0.0 };
        let lon = if lon.is_finite() {
            let wrapped = (lon + 180.0).rem_euclid(360.0) - 180.0;
            if wrapped == -180.0 && lon > 0.0 {
                180.0
            } else {
                wrapped
            }
        } else {
            0.0
        };
        Self { lat, lon }
    }

    /// True when both components agree to within `tolerance_deg`.
    pub fn approx_eq(&self, other: &GeoPoint, tolerance_deg: f64) -> bool {
        (self.lat - other.lat).abs() <= tolerance_deg && (self.lon - other.lon).abs() <= tolerance_deg
    }
}

/// Parse a polyline given as `[lat, lng]` pairs, naming `field` on failure.
pub fn parse_lat_lng_pairs(pairs: &[[f64; 2]], field: &'static str) -> Result<Vec<GeoPoint>, InputError> {
    pairs
        .iter()
        .map(|pair| GeoPoint::from_lat_lng(*pair).map_err(|err| err.with_field(field)))
        .collect()
}

/// Port reference data, owned by an external catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Port {
    /// Blank when missing; save validation reports it by field name.
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    pub latitude: f64,
    pub longitude: f64,
}

impl Port {
    pub fn new(id: impl Into<String>, name: impl Into<String>, latitude: f64, longitude: f64) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            code: None,
            latitude,
            longitude,
        }
    }

    pub fn position(&self) -> Result<GeoPoint, InputError> {
        GeoPoint::new(self.latitude, self.longitude)
    }
}

/// Rendering hint for a route segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SegmentStyle {
    Solid,
    Dotted,
}

/// One leg between two consecutive route coordinates.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouteSegment {
    pub start: GeoPoint,
    pub end: GeoPoint,
    pub crosses_land: bool,
    pub distance_nm: f64,
    pub distance_km: f64,
    pub style: SegmentStyle,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RouteKind {
    /// No segment touches a reference landmass
    SeaOnly,
    /// At least one segment is flagged as crossing land
    Mixed,
}

/// Output of route synthesis. Transient until explicitly saved.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MaritimeRoute {
    pub coordinates: Vec<GeoPoint>,
    pub segments: Vec<RouteSegment>,
    pub total_distance_nm: f64,
    pub total_distance_km: f64,
    pub kind: RouteKind,
    pub estimated_days: u32,
    pub estimated_duration: String,
}

impl MaritimeRoute {
    /// Coordinates in GeoJSON order.
    pub fn lon_lat_coordinates(&self) -> Vec<[f64; 2]> {
        self.coordinates.iter().map(GeoPoint::to_lon_lat).collect()
    }
}

// === Request/Response types ===

/// Unit for the headline `distance` of a route response.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DistanceUnits {
    Kilometers,
    #[default]
    NauticalMiles,
}

/// Loose `{lat, lng}` pair as sent by map clients; validated on use.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LatLng {
    pub lat: f64,
    #[serde(alias = "lon")]
    pub lng: f64,
}

impl LatLng {
    pub fn to_point(&self, field: &'static str) -> Result<GeoPoint, InputError> {
        GeoPoint::new(self.lat, self.lng).map_err(|e| e.with_field(field))
    }
}

impl From<GeoPoint> for LatLng {
    fn from(point: GeoPoint) -> Self {
        Self {
            lat: point.lat(),
            lng: point.lon(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerateRouteRequest {
    pub origin: LatLng,
    pub destination: LatLng,
    #[serde(default)]
    pub units: DistanceUnits,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub origin_port_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub destination_port_id: Option<String>,
}

impl GenerateRouteRequest {
    /// Validated endpoints. Matching port ids count as identical endpoints
    /// even if the coordinates differ.
    pub fn endpoints(&self) -> Result<(GeoPoint, GeoPoint), InputError> {
        let origin = self.origin.to_point("origin")?;
        let destination = self.destination.to_point("destination")?;
        if let (Some(a), Some(b)) = (&self.origin_port_id, &self.destination_port_id) {
            if !a.trim().is_empty() && a.trim() == b.trim() {
                return Err(InputError::IdenticalEndpoints);
            }
        }
        if origin == destination {
            return Err(InputError::IdenticalEndpoints);
        }
        Ok((origin, destination))
    }
}

/// Route as returned over the wire. `coordinates` are GeoJSON `[lon, lat]`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouteResponse {
    pub coordinates: Vec<[f64; 2]>,
    pub segments: Vec<RouteSegment>,
    pub distance: f64,
    pub units: DistanceUnits,
    pub total_distance_nm: f64,
    pub total_distance_km: f64,
    pub kind: RouteKind,
    pub estimated_days: u32,
    pub estimated_duration: String,
}

impl RouteResponse {
    pub fn from_route(route: MaritimeRoute, units: DistanceUnits) -> Self {
        let distance = match units {
            DistanceUnits::Kilometers => route.total_distance_km,
            DistanceUnits::NauticalMiles => route.total_distance_nm,
        };
        Self {
            coordinates: route.lon_lat_coordinates(),
            segments: route.segments,
            distance,
            units,
            total_distance_nm: route.total_distance_nm,
            total_distance_km: route.total_distance_km,
            kind: route.kind,
            estimated_days: route.estimated_days,
            estimated_duration: route.estimated_duration,
        }
    }

    /// Coordinates flipped to `[lat, lng]` for display and for saving.
    pub fn lat_lng_coordinates(&self) -> Vec<[f64; 2]> {
        self.coordinates.iter().map(|c| [c[1], c[0]]).collect()
    }
}

/// Polyline to smooth, as `[lat, lng]` pairs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SmoothRequest {
    pub vertices: Vec<[f64; 2]>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SmoothResponse {
    pub vertices: Vec<[f64; 2]>,
}
