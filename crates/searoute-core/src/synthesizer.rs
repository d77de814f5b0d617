//! Port-to-port route synthesis.
//!
//! Unobstructed pairs get a discretized great-circle path. Pairs whose
//! straight leg crosses a reference landmass get one waypoint displaced
//! perpendicular to the leg, and the dogleg is rounded off with a Bezier.

use crate::error::InputError;
use crate::landmass::{crosses_land, first_obstruction, reference_landmasses, Landmass};
use crate::models::{GeoPoint, MaritimeRoute, Port, RouteKind, RouteSegment, SegmentStyle};
use crate::smoothing::bezier_through;
use crate::spatial::{bearing, destination_point, distance_km, distance_nm, midpoint, total_distance_km, total_distance_nm};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SynthesizerConfig {
    /// Perpendicular displacement of the detour waypoint
    pub detour_offset_km: f64,
    /// Lower bound on discretization steps
    pub min_steps: usize,
    /// One step per this many kilometers of direct distance
    pub km_per_step: f64,
    /// Assumed average speed for the duration estimate
    pub cruise_speed_knots: f64,
}

impl Default for SynthesizerConfig {
    fn default() -> Self {
        Self {
            detour_offset_km: 200.0,
            min_steps: 10,
            km_per_step: 100.0,
            cruise_speed_knots: 20.0,
        }
    }
}

/// Builds [`MaritimeRoute`]s against a fixed set of landmasses.
#[derive(Debug, Clone)]
pub struct RouteSynthesizer {
    landmasses: Vec<Landmass>,
    config: SynthesizerConfig,
}

impl Default for RouteSynthesizer {
    fn default() -> Self {
        Self::new(reference_landmasses(), SynthesizerConfig::default())
    }
}

impl RouteSynthesizer {
    pub fn new(landmasses: Vec<Landmass>, config: SynthesizerConfig) -> Self {
        Self { landmasses, config }
    }

    pub fn config(&self) -> &SynthesizerConfig {
        &self.config
    }

    pub fn landmasses(&self) -> &[Landmass] {
        &self.landmasses
    }

    /// Synthesize a route between two catalog ports.
    pub fn synthesize(&self, origin: &Port, destination: &Port) -> Result<MaritimeRoute, InputError> {
        if origin.id == destination.id {
            return Err(InputError::IdenticalEndpoints);
        }
        let from = origin.position().map_err(|e| e.with_field("origin"))?;
        let to = destination.position().map_err(|e| e.with_field("destination"))?;
        self.synthesize_points(&from, &to)
    }

    /// Synthesize a route between two raw positions.
    pub fn synthesize_points(&self, origin: &GeoPoint, destination: &GeoPoint) -> Result<MaritimeRoute, InputError> {
        if origin == destination {
            return Err(InputError::IdenticalEndpoints);
        }

        let coordinates = if crosses_land(origin, destination, &self.landmasses) {
            tracing::debug!(
                "direct leg {} -> {} blocked by {}",
                origin,
                destination,
                first_obstruction(origin, destination, &self.landmasses).unwrap_or("land")
            );
            self.detour_path(origin, destination)
        } else {
            self.direct_path(origin, destination)
        };

        Ok(self.assemble(coordinates))
    }

    fn step_count(&self, origin: &GeoPoint, destination: &GeoPoint) -> usize {
        let km = distance_km(origin, destination);
        let by_distance = (km / self.config.km_per_step.max(1.0)).floor() as usize;
        by_distance.max(self.config.min_steps).max(1)
    }

    /// Great-circle path: repeated destination-point calls along the initial
    /// bearing. The final point is pinned to `destination`.
    fn direct_path(&self, origin: &GeoPoint, destination: &GeoPoint) -> Vec<GeoPoint> {
        let steps = self.step_count(origin, destination);
        let total_km = distance_km(origin, destination);
        let initial_bearing = bearing(origin, destination);

        let mut path = Vec::with_capacity(steps + 1);
        path.push(*origin);
        for i in 1..steps {
            let fraction = i as f64 / steps as f64;
            path.push(destination_point(origin, total_km * fraction, initial_bearing));
        }
        path.push(*destination);
        path
    }

    fn detour_path(&self, origin: &GeoPoint, destination: &GeoPoint) -> Vec<GeoPoint> {
        let steps = self.step_count(origin, destination);
        let mid = midpoint(origin, destination);
        let perpendicular = (bearing(origin, destination) + 90.0).rem_euclid(360.0);
        let waypoint = destination_point(&mid, self.config.detour_offset_km, perpendicular);
        bezier_through(origin, &waypoint, destination, steps)
    }

    fn assemble(&self, coordinates: Vec<GeoPoint>) -> MaritimeRoute {
        let segments: Vec<RouteSegment> = coordinates
            .windows(2)
            .map(|pair| {
                let crosses = crosses_land(&pair[0], &pair[1], &self.landmasses);
                RouteSegment {
                    start: pair[0],
                    end: pair[1],
                    crosses_land: crosses,
                    distance_nm: distance_nm(&pair[0], &pair[1]),
                    distance_km: distance_km(&pair[0], &pair[1]),
                    style: if crosses {
                        SegmentStyle::Dotted
                    } else {
                        SegmentStyle::Solid
                    },
                }
            })
            .collect();

        let kind = if segments.iter().any(|s| s.crosses_land) {
            RouteKind::Mixed
        } else {
            RouteKind::SeaOnly
        };

        let total_distance_nm = total_distance_nm(&coordinates);
        let total_distance_km = total_distance_km(&coordinates);
        let estimated_days = estimate_days(total_distance_nm, self.config.cruise_speed_knots);

        MaritimeRoute {
            coordinates,
            segments,
            total_distance_nm,
            total_distance_km,
            kind,
            estimated_days,
            estimated_duration: format_duration(estimated_days),
        }
    }
}

/// `ceil(distance_nm / (knots * 24))` whole days at sea.
pub fn estimate_days(distance_nm: f64, cruise_speed_knots: f64) -> u32 {
    let per_day = cruise_speed_knots.max(f64::EPSILON) * 24.0;
    let days = (distance_nm / per_day).ceil();
    if days.is_finite() && days > 0.0 {
        days as u32
    } else {
        0
    }
}

fn format_duration(days: u32) -> String {
    if days == 1 {
        "1 day".to_string()
    } else {
        format!("{days} days")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn miami() -> Port {
        Port::new("miami", "Miami", 25.7617, -80.1918)
    }

    fn nassau() -> Port {
        Port::new("nassau", "Nassau", 25.0343, -77.3554)
    }

    fn p(lat: f64, lon: f64) -> GeoPoint {
        GeoPoint::new(lat, lon).unwrap()
    }

    #[test]
    fn miami_to_nassau_is_direct() {
        let synth = RouteSynthesizer::default();
        let route = synth.synthesize(&miami(), &nassau()).unwrap();

        assert_eq!(route.kind, RouteKind::SeaOnly);
        assert!(route.coordinates.len() >= 10);
        // Haversine for these coordinates is ~159.9 nm
        assert!((route.total_distance_nm - 159.9).abs() < 159.9 * 0.05);
        assert_eq!(route.estimated_days, 1);
        assert_eq!(route.estimated_duration, "1 day");
    }

    #[test]
    fn short_direct_route_is_still_discretized() {
        let synth = RouteSynthesizer::default();
        let route = synth.synthesize_points(&p(30.0, -40.0), &p(30.1, -40.1)).unwrap();
        assert_eq!(route.coordinates.len(), 11);
        assert_ne!(route.coordinates.len(), 2);
    }

    #[test]
    fn long_direct_route_scales_steps_with_distance() {
        let synth = RouteSynthesizer::default();
        let a = p(40.0, -50.0);
        let b = p(30.0, -30.0);
        let km = distance_km(&a, &b);
        let route = synth.synthesize_points(&a, &b).unwrap();
        assert_eq!(route.coordinates.len(), (km / 100.0).floor() as usize + 1);
    }

    #[test]
    fn direct_path_follows_the_great_circle() {
        let synth = RouteSynthesizer::default();
        let a = p(40.0, -50.0);
        let b = p(30.0, -30.0);
        let route = synth.synthesize_points(&a, &b).unwrap();
        let direct = distance_km(&a, &b);
        assert!((route.total_distance_km - direct).abs() < 1e-6 * direct);
    }

    #[test]
    fn trans_pacific_pair_is_direct() {
        let synth = RouteSynthesizer::default();
        let a = p(35.0, 145.0);
        let b = p(45.0, -135.0);
        let route = synth.synthesize_points(&a, &b).unwrap();
        assert_eq!(route.kind, RouteKind::SeaOnly);
        let direct = distance_km(&a, &b);
        assert!((route.total_distance_km - direct).abs() < 1e-6 * direct);
    }

    #[test]
    fn detour_across_antimeridian_bends_the_short_way() {
        let synth = RouteSynthesizer::default();
        let a = p(52.0, 170.0);
        let b = p(58.0, -150.0);
        assert!(crosses_land(&a, &b, synth.landmasses()));

        let route = synth.synthesize_points(&a, &b).unwrap();
        let direct = distance_km(&a, &b);
        assert!(route.total_distance_km < direct * 1.1);
        for point in &route.coordinates {
            assert!(point.lon().abs() >= 150.0 - 1e-9, "{point} is on the wrong side of the globe");
        }
    }

    #[test]
    fn endpoints_are_preserved() {
        let synth = RouteSynthesizer::default();
        for (a, b) in [(p(25.7617, -80.1918), p(25.0343, -77.3554)), (p(0.0, -20.0), p(0.0, 60.0))] {
            let route = synth.synthesize_points(&a, &b).unwrap();
            assert!(route.coordinates[0].approx_eq(&a, 1e-9));
            assert!(route.coordinates.last().unwrap().approx_eq(&b, 1e-9));
        }
    }

    #[test]
    fn segments_partition_the_route() {
        let synth = RouteSynthesizer::default();
        for (a, b) in [(p(25.7617, -80.1918), p(25.0343, -77.3554)), (p(0.0, -20.0), p(0.0, 60.0))] {
            let route = synth.synthesize_points(&a, &b).unwrap();
            assert_eq!(route.segments.len(), route.coordinates.len() - 1);
            for (i, seg) in route.segments.iter().enumerate() {
                assert_eq!(seg.start, route.coordinates[i]);
                assert_eq!(seg.end, route.coordinates[i + 1]);
                assert!(seg.distance_nm >= 0.0);
            }
            let sum: f64 = route.segments.iter().map(|s| s.distance_nm).sum();
            assert!((sum - route.total_distance_nm).abs() < 1e-6);
        }
    }

    #[test]
    fn blocked_leg_takes_a_detour() {
        let synth = RouteSynthesizer::default();
        let a = p(0.0, -20.0);
        let b = p(0.0, 60.0);
        let route = synth.synthesize_points(&a, &b).unwrap();

        // Bearing is due east, so the waypoint is displaced due south.
        assert!(route.coordinates.iter().any(|c| c.lat() < -1.0));
        assert!(route.total_distance_km > distance_km(&a, &b));
        // Coarse outlines: a single 200 km displacement does not clear Africa.
        assert_eq!(route.kind, RouteKind::Mixed);
        assert!(route
            .segments
            .iter()
            .any(|s| s.crosses_land && s.style == SegmentStyle::Dotted));
    }

    #[test]
    fn identical_ports_are_rejected() {
        let synth = RouteSynthesizer::default();
        let err = synth.synthesize(&miami(), &miami()).unwrap_err();
        assert_eq!(err, InputError::IdenticalEndpoints);

        let same_spot = Port::new("miami-2", "Miami again", 25.7617, -80.1918);
        assert!(synth.synthesize(&miami(), &same_spot).is_err());
    }

    #[test]
    fn invalid_port_coordinates_fail_fast() {
        let synth = RouteSynthesizer::default();
        let broken = Port::new("x", "Broken", 123.0, 0.0);
        let err = synth.synthesize(&broken, &nassau()).unwrap_err();
        assert_eq!(err.field(), "origin");
    }

    #[test]
    fn duration_rounds_up_whole_days() {
        assert_eq!(estimate_days(0.0, 20.0), 0);
        assert_eq!(estimate_days(480.0, 20.0), 1);
        assert_eq!(estimate_days(481.0, 20.0), 2);
    }
}
