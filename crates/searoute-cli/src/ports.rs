//! Port lookup for command line arguments.

use searoute_core::models::Port;
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum PortParseError {
    #[error("unknown port '{0}' (use a catalog id or id:lat,lon)")]
    Unknown(String),
    #[error("bad coordinates in '{0}', expected id:lat,lon")]
    BadCoordinates(String),
}

/// id, name, latitude, longitude
const CATALOG: &[(&str, &str, f64, f64)] = &[
    ("miami", "Miami", 25.7617, -80.1918),
    ("nassau", "Nassau", 25.0343, -77.3554),
    ("new-york", "New York", 40.6892, -74.0445),
    ("rotterdam", "Rotterdam", 51.9244, 4.4777),
    ("lisbon", "Lisbon", 38.7223, -9.1393),
    ("dakar", "Dakar", 14.7167, -17.4677),
    ("mombasa", "Mombasa", -4.0435, 39.6682),
    ("singapore", "Singapore", 1.2644, 103.8200),
];

pub fn catalog() -> Vec<Port> {
    CATALOG
        .iter()
        .map(|(id, name, lat, lon)| Port::new(*id, *name, *lat, *lon))
        .collect()
}

/// Accept a catalog id (case-insensitive) or an ad-hoc `id:lat,lon`.
pub fn parse_port(arg: &str) -> Result<Port, PortParseError> {
    let arg = arg.trim();
    if let Some((id, coords)) = arg.split_once(':') {
        let (lat, lon) = coords
            .split_once(',')
            .ok_or_else(|| PortParseError::BadCoordinates(arg.to_string()))?;
        let lat: f64 = lat
            .trim()
            .parse()
            .map_err(|_| PortParseError::BadCoordinates(arg.to_string()))?;
        let lon: f64 = lon
            .trim()
            .parse()
            .map_err(|_| PortParseError::BadCoordinates(arg.to_string()))?;
        let id = id.trim();
        return Ok(Port::new(id, id, lat, lon));
    }

    catalog()
        .into_iter()
        .find(|port| port.id.eq_ignore_ascii_case(arg))
        .ok_or_else(|| PortParseError::Unknown(arg.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn catalog_ids_resolve() {
        let port = parse_port("Miami").unwrap();
        assert_eq!(port.id, "miami");
        assert_eq!(port.latitude, 25.7617);
    }

    #[test]
    fn ad_hoc_ports_parse() {
        let port = parse_port("buoy-7: 30.5, -40.25").unwrap();
        assert_eq!(port.id, "buoy-7");
        assert_eq!(port.longitude, -40.25);
    }

    #[test]
    fn bad_input_is_reported() {
        assert_eq!(parse_port("atlantis"), Err(PortParseError::Unknown("atlantis".to_string())));
        assert!(matches!(parse_port("x:1"), Err(PortParseError::BadCoordinates(_))));
        assert!(matches!(parse_port("x:a,b"), Err(PortParseError::BadCoordinates(_))));
    }

    #[test]
    fn catalog_positions_are_valid() {
        for port in catalog() {
            assert!(port.position().is_ok(), "{}", port.id);
        }
    }
}
