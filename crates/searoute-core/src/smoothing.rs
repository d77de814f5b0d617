//! Polyline smoothing for generated detours and manual edits.
//!
//! Interpolation happens in the planar (lat, lon) degree frame, which is what
//! the drawing surface edits in. Longitudes are unwrapped along the polyline
//! first so a line across the antimeridian bends the short way; outputs are
//! wrapped back into range.

use crate::error::NeedMorePoints;
use crate::models::GeoPoint;
use crate::spatial::unwrap_lon;

const MIN_STEPS: usize = 2;
const MAX_STEPS: usize = 8;
const STEPS_PER_DEGREE: f64 = 100.0;

/// `(lat, lon)` pairs with each longitude unwrapped against the one before.
fn unwrapped(vertices: &[&GeoPoint]) -> Vec<(f64, f64)> {
    let mut out: Vec<(f64, f64)> = Vec::with_capacity(vertices.len());
    for v in vertices {
        let lon = match out.last() {
            Some(&(_, prev)) => unwrap_lon(prev, v.lon()),
            None => v.lon(),
        };
        out.push((v.lat(), lon));
    }
    out
}

fn lerp(a: (f64, f64), b: (f64, f64), t: f64) -> GeoPoint {
    GeoPoint::normalized(a.0 + (b.0 - a.0) * t, a.1 + (b.1 - a.1) * t)
}

fn catmull_rom_component(p0: f64, p1: f64, p2: f64, p3: f64, t: f64) -> f64 {
    let t2 = t * t;
    let t3 = t2 * t;
    0.5 * ((2.0 * p1)
        + (-p0 + p2) * t
        + (2.0 * p0 - 5.0 * p1 + 4.0 * p2 - p3) * t2
        + (-p0 + 3.0 * p1 - 3.0 * p2 + p3) * t3)
}

fn catmull_rom(p: [(f64, f64); 4], t: f64) -> GeoPoint {
    GeoPoint::normalized(
        catmull_rom_component(p[0].0, p[1].0, p[2].0, p[3].0, t),
        catmull_rom_component(p[0].1, p[1].1, p[2].1, p[3].1, t),
    )
}

/// Uniform Catmull-Rom point between `p1` and `p2`.
pub fn catmull_rom_point(p0: &GeoPoint, p1: &GeoPoint, p2: &GeoPoint, p3: &GeoPoint, t: f64) -> GeoPoint {
    let frame = unwrapped(&[p0, p1, p2, p3]);
    catmull_rom([frame[0], frame[1], frame[2], frame[3]], t)
}

fn steps_for_delta(a: (f64, f64), b: (f64, f64)) -> usize {
    let d = (b.0 - a.0).hypot(b.1 - a.1);
    let raw = (d * STEPS_PER_DEGREE).floor();
    if raw.is_finite() && raw > 0.0 {
        (raw as usize).clamp(MIN_STEPS, MAX_STEPS)
    } else {
        MIN_STEPS
    }
}

/// Subdivisions for one original segment: `clamp(floor(d * 100), 2, 8)` with
/// `d` the planar distance in degrees, measured the short way round.
pub fn steps_for_segment(a: &GeoPoint, b: &GeoPoint) -> usize {
    let frame = unwrapped(&[a, b]);
    steps_for_delta(frame[0], frame[1])
}

/// One refinement pass over `vertices`.
///
/// Interior segments use Catmull-Rom through their outer neighbours; the first
/// and last segments only have a neighbour on one side and are interpolated
/// linearly. Original vertices are kept, so each pass strictly grows the
/// polyline and can be applied again to its own output.
pub fn smooth(vertices: &[GeoPoint]) -> Result<Vec<GeoPoint>, NeedMorePoints> {
    let n = vertices.len();
    if n < 3 {
        return Err(NeedMorePoints {
            required: 3,
            actual: n,
        });
    }

    let frame = unwrapped(&vertices.iter().collect::<Vec<_>>());
    let mut out = Vec::with_capacity(n * MAX_STEPS);
    for i in 0..n - 1 {
        let (p1, p2) = (frame[i], frame[i + 1]);
        let steps = steps_for_delta(p1, p2);
        let interior = i > 0 && i + 2 < n;

        out.push(vertices[i]);
        for s in 1..steps {
            let t = s as f64 / steps as f64;
            let point = if interior {
                catmull_rom([frame[i - 1], p1, p2, frame[i + 2]], t)
            } else {
                lerp(p1, p2, t)
            };
            out.push(point);
        }
    }
    out.push(vertices[n - 1]);

    Ok(out)
}

/// Sample a quadratic Bezier from `start` to `end` that passes through `via`
/// at its midpoint. Used to round off a single detour waypoint.
pub fn bezier_through(start: &GeoPoint, via: &GeoPoint, end: &GeoPoint, segments: usize) -> Vec<GeoPoint> {
    let segments = segments.max(2);
    let frame = unwrapped(&[start, via, end]);
    let (s, v, e) = (frame[0], frame[1], frame[2]);
    // Control point chosen so B(0.5) == via.
    let ctrl = (2.0 * v.0 - (s.0 + e.0) / 2.0, 2.0 * v.1 - (s.1 + e.1) / 2.0);

    let mut out = Vec::with_capacity(segments + 1);
    out.push(*start);
    for i in 1..segments {
        let t = i as f64 / segments as f64;
        let u = 1.0 - t;
        let lat = u * u * s.0 + 2.0 * u * t * ctrl.0 + t * t * e.0;
        let lon = u * u * s.1 + 2.0 * u * t * ctrl.1 + t * t * e.1;
        out.push(GeoPoint::normalized(lat, lon));
    }
    out.push(*end);
    out
}
