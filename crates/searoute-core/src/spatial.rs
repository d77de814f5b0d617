//! Spherical navigation math for route synthesis and distance metadata.
//!
//! All functions take and return degrees unless noted. Inputs are
//! [`GeoPoint`]s, which are range-checked at construction, so nothing here
//! can produce NaN from bad coordinates.

use crate::models::GeoPoint;

/// Mean Earth radius in nautical miles.
pub const EARTH_RADIUS_NM: f64 = 3440.065;
/// Mean Earth radius in kilometers.
pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// Central angle between two points (radians) using the Haversine formula.
///
/// `a` is clamped into [0, 1] so antipodal inputs cannot push `sqrt(1 - a)`
/// negative through rounding.
fn central_angle(a: &GeoPoint, b: &GeoPoint) -> f64 {
    let phi1 = a.lat().to_radians();
    let phi2 = b.lat().to_radians();
    let dphi = (b.lat() - a.lat()).to_radians();
    let dlambda = (b.lon() - a.lon()).to_radians();
    let h = (dphi / 2.0).sin().powi(2) + phi1.cos() * phi2.cos() * (dlambda / 2.0).sin().powi(2);
    let h = h.clamp(0.0, 1.0);
    2.0 * h.sqrt().atan2((1.0 - h).sqrt())
}

/// Great-circle distance in nautical miles.
pub fn distance_nm(a: &GeoPoint, b: &GeoPoint) -> f64 {
    EARTH_RADIUS_NM * central_angle(a, b)
}

/// Great-circle distance in kilometers.
pub fn distance_km(a: &GeoPoint, b: &GeoPoint) -> f64 {
    EARTH_RADIUS_KM * central_angle(a, b)
}

/// Sum of consecutive pairwise distances in nautical miles.
pub fn total_distance_nm(coordinates: &[GeoPoint]) -> f64 {
    coordinates.windows(2).map(|pair| distance_nm(&pair[0], &pair[1])).sum()
}

/// Sum of consecutive pairwise distances in kilometers.
pub fn total_distance_km(coordinates: &[GeoPoint]) -> f64 {
    coordinates.windows(2).map(|pair| distance_km(&pair[0], &pair[1])).sum()
}

/// Initial bearing from `a` to `b`, degrees in [0, 360), 0 = north.
pub fn bearing(a: &GeoPoint, b: &GeoPoint) -> f64 {
    let phi1 = a.lat().to_radians();
    let phi2 = b.lat().to_radians();
    let delta_lambda = (b.lon() - a.lon()).to_radians();

    let x = delta_lambda.sin() * phi2.cos();
    let y = phi1.cos() * phi2.sin() - phi1.sin() * phi2.cos() * delta_lambda.cos();

    x.atan2(y).to_degrees().rem_euclid(360.0)
}

/// Point reached by travelling `distance_km` from `origin` on `bearing_deg`.
pub fn destination_point(origin: &GeoPoint, distance_km: f64, bearing_deg: f64) -> GeoPoint {
    if distance_km.abs() <= f64::EPSILON {
        return *origin;
    }

    let lat1 = origin.lat().to_radians();
    let lon1 = origin.lon().to_radians();
    let bearing_rad = bearing_deg.to_radians();
    let angular_distance = distance_km / EARTH_RADIUS_KM;

    let sin_lat1 = lat1.sin();
    let cos_lat1 = lat1.cos();
    let sin_ad = angular_distance.sin();
    let cos_ad = angular_distance.cos();

    let sin_lat2 = sin_lat1 * cos_ad + cos_lat1 * sin_ad * bearing_rad.cos();
    let lat2 = sin_lat2.clamp(-1.0, 1.0).asin();

    let y = bearing_rad.sin() * sin_ad * cos_lat1;
    let x = cos_ad - sin_lat1 * sin_lat2;
    let lon2 = lon1 + y.atan2(x);

    GeoPoint::normalized(lat2.to_degrees(), lon2.to_degrees())
}

/// Great-circle midpoint of `a` and `b`.
pub fn midpoint(a: &GeoPoint, b: &GeoPoint) -> GeoPoint {
    let phi1 = a.lat().to_radians();
    let phi2 = b.lat().to_radians();
    let lambda1 = a.lon().to_radians();
    let delta_lambda = (b.lon() - a.lon()).to_radians();

    let bx = phi2.cos() * delta_lambda.cos();
    let by = phi2.cos() * delta_lambda.sin();
    let phi_m = (phi1.sin() + phi2.sin()).atan2(((phi1.cos() + bx).powi(2) + by * by).sqrt());
    let lambda_m = lambda1 + by.atan2(phi1.cos() + bx);

    GeoPoint::normalized(phi_m.to_degrees(), lambda_m.to_degrees())
}

/// `lon` shifted by a whole turn so it lies within 180 degrees of `reference`.
///
/// Planar work on a leg that crosses the antimeridian has to run in this
/// unwrapped frame; results go back through `GeoPoint::normalized`.
pub fn unwrap_lon(reference: f64, lon: f64) -> f64 {
    let delta = lon - reference;
    if (-180.0..=180.0).contains(&delta) {
        lon
    } else {
        lon - 360.0 * (delta / 360.0).round()
    }
}

/// Planar segment intersection test (touches and collinear overlaps count).
///
/// Works on any 2D frame; the land classifier feeds it `(lon, lat)` pairs.
pub fn segments_intersect_2d(a1: (f64, f64), a2: (f64, f64), b1: (f64, f64), b2: (f64, f64)) -> bool {
    const EPS: f64 = 1e-12;

    fn orient(p: (f64, f64), q: (f64, f64), r: (f64, f64)) -> f64 {
        (q.0 - p.0) * (r.1 - p.1) - (q.1 - p.1) * (r.0 - p.0)
    }

    fn within(a: f64, b: f64, value: f64) -> bool {
        let min = a.min(b) - EPS;
        let max = a.max(b) + EPS;
        value >= min && value <= max
    }

    fn on_segment(p: (f64, f64), q: (f64, f64), r: (f64, f64)) -> bool {
        within(p.0, q.0, r.0) && within(p.1, q.1, r.1)
    }

    let o1 = orient(a1, a2, b1);
    let o2 = orient(a1, a2, b2);
    let o3 = orient(b1, b2, a1);
    let o4 = orient(b1, b2, a2);

    if o1.abs() <= EPS && on_segment(a1, a2, b1) {
        return true;
    }
    if o2.abs() <= EPS && on_segment(a1, a2, b2) {
        return true;
    }
    if o3.abs() <= EPS && on_segment(b1, b2, a1) {
        return true;
    }
    if o4.abs() <= EPS && on_segment(b1, b2, a2) {
        return true;
    }

    let a_crosses = (o1 > EPS && o2 < -EPS) || (o1 < -EPS && o2 > EPS);
    let b_crosses = (o3 > EPS && o4 < -EPS) || (o3 < -EPS && o4 > EPS);
    a_crosses && b_crosses
}

#[cfg(test)]
mod tests {
    use super::*;

    fn p(lat: f64, lon: f64) -> GeoPoint {
        GeoPoint::new(lat, lon).unwrap()
    }

    #[test]
    fn test_haversine_known_distance() {
        // one degree of latitude is ~111.19 km / ~60.04 nm
        let d_km = distance_km(&p(0.0, 0.0), &p(1.0, 0.0));
        assert!((d_km - 111.195).abs() < 0.01);
        let d_nm = distance_nm(&p(0.0, 0.0), &p(1.0, 0.0));
        assert!((d_nm - 60.04).abs() < 0.01);
    }

    #[test]
    fn test_haversine_same_point() {
        let a = p(25.7617, -80.1918);
        assert_eq!(distance_nm(&a, &a), 0.0);
        assert_eq!(distance_km(&a, &a), 0.0);
    }

    #[test]
    fn distance_is_symmetric() {
        let pairs = [
            (p(25.7617, -80.1918), p(25.0343, -77.3554)),
            (p(-33.9, 18.4), p(1.29, 103.85)),
            (p(60.0, -170.0), p(-45.0, 170.0)),
        ];
        for (a, b) in pairs {
            assert_eq!(distance_nm(&a, &b), distance_nm(&b, &a));
            assert_eq!(distance_km(&a, &b), distance_km(&b, &a));
        }
    }

    #[test]
    fn antipodal_points_are_half_circumference() {
        let d = distance_km(&p(0.0, 0.0), &p(0.0, 180.0));
        assert!((d - std::f64::consts::PI * EARTH_RADIUS_KM).abs() < 1e-6);
        let d = distance_nm(&p(90.0, 0.0), &p(-90.0, 0.0));
        assert!(d.is_finite());
        assert!((d - std::f64::consts::PI * EARTH_RADIUS_NM).abs() < 1e-6);
    }

    #[test]
    fn bearing_cardinal_directions() {
        assert!((bearing(&p(0.0, 0.0), &p(1.0, 0.0)) - 0.0).abs() < 1e-9);
        assert!((bearing(&p(0.0, 0.0), &p(0.0, 1.0)) - 90.0).abs() < 1e-9);
        assert!((bearing(&p(0.0, 0.0), &p(-1.0, 0.0)) - 180.0).abs() < 1e-9);
        assert!((bearing(&p(0.0, 0.0), &p(0.0, -1.0)) - 270.0).abs() < 1e-9);
    }

    #[test]
    fn destination_point_round_trips_distance_and_bearing() {
        let origin = p(25.7617, -80.1918);
        let target = destination_point(&origin, 250.0, 100.0);
        assert!((distance_km(&origin, &target) - 250.0).abs() < 1e-6);
        assert!((bearing(&origin, &target) - 100.0).abs() < 1e-6);
        assert_eq!(destination_point(&origin, 0.0, 45.0), origin);
    }

    #[test]
    fn midpoint_is_equidistant() {
        let a = p(25.7617, -80.1918);
        let b = p(25.0343, -77.3554);
        let m = midpoint(&a, &b);
        assert!((distance_km(&a, &m) - distance_km(&m, &b)).abs() < 1e-6);
        assert!((distance_km(&a, &m) * 2.0 - distance_km(&a, &b)).abs() < 1e-6);
    }

    #[test]
    fn total_distance_sums_legs() {
        let coords = [p(0.0, 0.0), p(1.0, 0.0), p(1.0, 1.0)];
        let expected = distance_nm(&coords[0], &coords[1]) + distance_nm(&coords[1], &coords[2]);
        assert!((total_distance_nm(&coords) - expected).abs() < 1e-9);
        assert_eq!(total_distance_km(&coords[..1]), 0.0);
    }

    #[test]
    fn segments_intersect_detects_crossing_and_touching() {
        assert!(segments_intersect_2d((0.0, 0.0), (1.0, 1.0), (0.0, 1.0), (1.0, 0.0)));
        assert!(segments_intersect_2d((0.0, 0.0), (1.0, 0.0), (1.0, 0.0), (1.0, 1.0)));
        assert!(!segments_intersect_2d((0.0, 0.0), (1.0, 0.0), (0.0, 1.0), (1.0, 1.0)));
    }

    #[test]
    fn unwrap_lon_picks_the_short_way_round() {
        assert_eq!(unwrap_lon(145.0, -135.0), 225.0);
        assert_eq!(unwrap_lon(-170.0, 175.0), -185.0);
        assert_eq!(unwrap_lon(10.0, 40.0), 40.0);
        assert_eq!(unwrap_lon(530.0, 175.0), 535.0);
    }
}
