//! Coarse land-crossing classification.
//!
//! The reference landmasses are hand-drawn outlines with a few dozen vertices
//! each, not coastlines. They only answer "does this leg need a detour", and
//! saved routes were classified against exactly these boundaries. Changing a
//! vertex changes which routes count as safe, so any refinement needs its own
//! tests.
//!
//! Tests run in the planar (lon, lat) frame. A leg's far endpoint is unwrapped
//! to within 180 degrees of its near one, and each outline is also tested one
//! turn east and west, so legs across the antimeridian take the short way.

use crate::models::GeoPoint;
use crate::spatial::{segments_intersect_2d, unwrap_lon};
use serde::{Deserialize, Serialize};

const TURN_SHIFTS: [f64; 3] = [0.0, -360.0, 360.0];

/// A closed outline of `(lon, lat)` vertices; the closing edge is implicit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Landmass {
    pub name: String,
    pub outline: Vec<[f64; 2]>,
}

impl Landmass {
    pub fn new(name: impl Into<String>, outline: &[[f64; 2]]) -> Self {
        Self {
            name: name.into(),
            outline: outline.to_vec(),
        }
    }

    /// Ray casting point-in-polygon test.
    pub fn contains(&self, point: &GeoPoint) -> bool {
        self.contains_xy(point.lon(), point.lat(), 0.0)
    }

    /// Point test against the outline moved `shift` degrees of longitude.
    fn contains_xy(&self, x: f64, y: f64, shift: f64) -> bool {
        let n = self.outline.len();
        if n < 3 {
            return false;
        }

        let x = x - shift;
        let mut inside = false;
        let mut j = n - 1;
        for i in 0..n {
            let [xi, yi] = self.outline[i];
            let [xj, yj] = self.outline[j];

            if ((yi > y) != (yj > y)) && (x < (xj - xi) * (y - yi) / (yj - yi) + xi) {
                inside = !inside;
            }
            j = i;
        }

        inside
    }

    /// True when the leg touches the outline or lies inside it.
    pub fn intersects_segment(&self, a: &GeoPoint, b: &GeoPoint) -> bool {
        if self.outline.len() < 3 {
            return false;
        }
        let a_xy = (a.lon(), a.lat());
        let b_xy = (unwrap_lon(a.lon(), b.lon()), b.lat());
        let n = self.outline.len();

        TURN_SHIFTS.iter().any(|&shift| {
            if self.contains_xy(a_xy.0, a_xy.1, shift) || self.contains_xy(b_xy.0, b_xy.1, shift) {
                return true;
            }
            (0..n).any(|i| {
                let [x1, y1] = self.outline[i];
                let [x2, y2] = self.outline[(i + 1) % n];
                segments_intersect_2d(a_xy, b_xy, (x1 + shift, y1), (x2 + shift, y2))
            })
        })
    }
}

/// Does the straight leg `a`-`b` cross any landmass? Symmetric in `a`, `b`.
pub fn crosses_land(a: &GeoPoint, b: &GeoPoint, landmasses: &[Landmass]) -> bool {
    landmasses.iter().any(|land| land.intersects_segment(a, b))
}

/// Name of the first landmass the leg crosses, for logging.
pub fn first_obstruction<'a>(a: &GeoPoint, b: &GeoPoint, landmasses: &'a [Landmass]) -> Option<&'a str> {
    landmasses
        .iter()
        .find(|land| land.intersects_segment(a, b))
        .map(|land| land.name.as_str())
}

const NORTH_AMERICA: &[[f64; 2]] = &[
    [-168.0, 65.0],
    [-140.0, 70.0],
    [-95.0, 72.0],
    [-80.0, 63.0],
    [-65.0, 60.0],
    [-55.0, 50.0],
    [-66.0, 44.0],
    [-70.0, 41.0],
    [-76.0, 35.0],
    [-81.0, 30.0],
    [-81.5, 25.0],
    [-84.0, 30.0],
    [-90.0, 29.0],
    [-97.0, 27.0],
    [-97.0, 22.0],
    [-95.0, 18.0],
    [-90.0, 21.0],
    [-87.0, 21.0],
    [-88.0, 16.0],
    [-83.0, 15.0],
    [-83.0, 10.0],
    [-77.5, 8.0],
    [-80.0, 7.0],
    [-86.0, 11.0],
    [-92.0, 14.0],
    [-105.0, 20.0],
    [-110.0, 23.0],
    [-117.0, 32.0],
    [-124.0, 40.0],
    [-125.0, 48.0],
    [-135.0, 57.0],
    [-150.0, 59.0],
    [-165.0, 55.0],
];

const SOUTH_AMERICA: &[[f64; 2]] = &[
    [-77.0, 8.0],
    [-72.0, 12.0],
    [-62.0, 10.5],
    [-52.0, 5.0],
    [-35.0, -5.0],
    [-39.0, -15.0],
    [-48.0, -26.0],
    [-58.0, -38.0],
    [-65.0, -42.0],
    [-68.0, -55.0],
    [-75.0, -50.0],
    [-73.0, -37.0],
    [-71.0, -18.0],
    [-81.0, -5.0],
    [-80.0, 1.0],
    [-77.0, 4.0],
];

const EUROPE: &[[f64; 2]] = &[
    [-10.0, 36.0],
    [-9.5, 43.0],
    [-2.0, 43.5],
    [-4.5, 48.5],
    [2.0, 51.0],
    [5.0, 53.5],
    [8.0, 57.0],
    [5.0, 62.0],
    [15.0, 70.0],
    [30.0, 70.0],
    [40.0, 67.0],
    [40.0, 45.0],
    [28.0, 41.0],
    [22.0, 36.5],
    [18.0, 40.0],
    [15.0, 38.0],
    [12.0, 44.0],
    [9.0, 44.0],
    [3.0, 43.0],
    [0.0, 39.0],
    [-2.0, 36.7],
    [-5.5, 36.0],
];

const AFRICA: &[[f64; 2]] = &[
    [-17.0, 21.0],
    [-17.0, 14.7],
    [-12.0, 5.0],
    [-8.0, 4.5],
    [0.0, 5.5],
    [9.0, 4.0],
    [9.0, -1.0],
    [12.0, -6.0],
    [14.0, -22.0],
    [18.0, -34.5],
    [27.0, -34.0],
    [33.0, -26.0],
    [40.0, -15.0],
    [40.5, -11.0],
    [39.0, -5.0],
    [42.0, -1.0],
    [51.0, 11.0],
    [43.0, 12.0],
    [37.0, 20.0],
    [32.0, 31.0],
    [20.0, 32.5],
    [11.0, 33.0],
    [10.0, 37.0],
    [-1.0, 35.8],
    [-6.0, 35.8],
    [-10.0, 30.0],
    [-13.0, 27.0],
];

const AUSTRALIA: &[[f64; 2]] = &[
    [113.0, -22.0],
    [114.0, -34.0],
    [118.0, -35.0],
    [129.0, -32.0],
    [135.0, -35.0],
    [141.0, -38.5],
    [150.0, -37.5],
    [153.0, -28.0],
    [153.0, -25.0],
    [146.0, -19.0],
    [142.0, -10.7],
    [136.0, -12.0],
    [130.0, -11.5],
    [122.0, -17.0],
];

/// The fixed reference set used by route synthesis.
pub fn reference_landmasses() -> Vec<Landmass> {
    vec![
        Landmass::new("North America", NORTH_AMERICA),
        Landmass::new("South America", SOUTH_AMERICA),
        Landmass::new("Europe", EUROPE),
        Landmass::new("Africa", AFRICA),
        Landmass::new("Australia", AUSTRALIA),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn p(lat: f64, lon: f64) -> GeoPoint {
        GeoPoint::new(lat, lon).unwrap()
    }

    #[test]
    fn florida_strait_is_open_water() {
        // The North America outline stops west of Miami on purpose.
        let lands = reference_landmasses();
        let miami = p(25.7617, -80.1918);
        let nassau = p(25.0343, -77.3554);
        assert!(!lands.iter().any(|l| l.contains(&miami)));
        assert!(!crosses_land(&miami, &nassau, &lands));
    }

    #[test]
    fn atlantic_to_indian_ocean_crosses_africa() {
        let lands = reference_landmasses();
        let a = p(0.0, -20.0);
        let b = p(0.0, 60.0);
        assert!(crosses_land(&a, &b, &lands));
        assert_eq!(first_obstruction(&a, &b, &lands), Some("Africa"));
    }

    #[test]
    fn classification_is_symmetric() {
        let lands = reference_landmasses();
        let legs = [
            (p(0.0, -20.0), p(0.0, 60.0)),
            (p(40.0, -50.0), p(30.0, -30.0)),
            (p(25.7617, -80.1918), p(25.0343, -77.3554)),
            (p(-40.0, 100.0), p(-10.0, 160.0)),
        ];
        for (a, b) in legs {
            assert_eq!(crosses_land(&a, &b, &lands), crosses_land(&b, &a, &lands));
        }
    }

    #[test]
    fn open_ocean_leg_is_clear() {
        let lands = reference_landmasses();
        assert!(!crosses_land(&p(40.0, -50.0), &p(30.0, -30.0), &lands));
    }

    #[test]
    fn endpoint_inside_outline_counts_as_land() {
        let square = Landmass::new("square", &[[0.0, 0.0], [10.0, 0.0], [10.0, 10.0], [0.0, 10.0]]);
        assert!(square.intersects_segment(&p(5.0, 5.0), &p(6.0, 6.0)));
        assert!(!square.intersects_segment(&p(20.0, 20.0), &p(30.0, 30.0)));
    }

    #[test]
    fn degenerate_outline_never_matches() {
        let line = Landmass::new("line", &[[0.0, 0.0], [10.0, 0.0]]);
        assert!(!line.intersects_segment(&p(-1.0, 5.0), &p(1.0, 5.0)));
    }

    #[test]
    fn trans_pacific_leg_takes_the_short_way() {
        let lands = reference_landmasses();
        let tokyo_offshore = p(35.0, 145.0);
        let oregon_offshore = p(45.0, -135.0);
        assert!(!crosses_land(&tokyo_offshore, &oregon_offshore, &lands));
        assert!(!crosses_land(&oregon_offshore, &tokyo_offshore, &lands));
    }

    #[test]
    fn antimeridian_leg_still_sees_alaska() {
        let lands = reference_landmasses();
        let bering = p(60.0, 170.0);
        let inland = p(60.0, -160.0);
        assert_eq!(first_obstruction(&bering, &inland, &lands), Some("North America"));
        assert!(crosses_land(&inland, &bering, &lands));
    }
}
