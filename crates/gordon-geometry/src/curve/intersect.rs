//! Curve/curve intersection and closest points.
//!
//! Both curves are sampled into polylines; segment pairs whose (inflated)
//! bounding boxes touch seed a 2D Newton minimization of `|c1(s) - c2(t)|^2`.

use gordon_math::{Aabb3, Point3};
use serde::{Deserialize, Serialize};
use tracing::trace;

use super::{BSplineCurve, Curve};

/// A point where two curves meet: `u` on the first curve, `v` on the second.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CurveIntersection {
    pub u: f64,
    pub v: f64,
    pub point: Point3,
    pub distance: f64,
}

const NEWTON_ITERATIONS: usize = 50;

struct Polyline {
    params: Vec<f64>,
    points: Vec<Point3>,
}

impl Polyline {
    fn sample(curve: &BSplineCurve) -> Self {
        let params = curve.sample_params(4 * curve.degree.max(2));
        let points = params.iter().map(|&t| curve.point_at(t)).collect();
        Self { params, points }
    }

    fn segment_boxes(&self, margin: f64) -> Vec<Aabb3> {
        self.points
            .windows(2)
            .map(|w| {
                // chords deviate from the curve; inflate by half the chord length
                let sagitta = 0.5 * w[0].distance(w[1]);
                Aabb3::from_segment(w[0], w[1]).expand(margin + sagitta)
            })
            .collect()
    }
}

/// Parameters `(a, b)` in [0, 1] of the closest points of segments `p0p1` and `q0q1`.
fn segment_closest(p0: Point3, p1: Point3, q0: Point3, q1: Point3) -> (f64, f64) {
    let d1 = p1 - p0;
    let d2 = q1 - q0;
    let r = p0 - q0;
    let a = d1.length_squared();
    let e = d2.length_squared();
    let f = d2.dot(r);

    if a < 1e-300 && e < 1e-300 {
        return (0.0, 0.0);
    }
    if a < 1e-300 {
        return (0.0, (f / e).clamp(0.0, 1.0));
    }
    let c = d1.dot(r);
    if e < 1e-300 {
        return ((-c / a).clamp(0.0, 1.0), 0.0);
    }
    let b = d1.dot(d2);
    let denom = a * e - b * b;
    let mut s = if denom > 1e-300 { ((b * f - c * e) / denom).clamp(0.0, 1.0) } else { 0.0 };
    let mut t = (b * s + f) / e;
    if t < 0.0 {
        t = 0.0;
        s = (-c / a).clamp(0.0, 1.0);
    } else if t > 1.0 {
        t = 1.0;
        s = ((b - c) / a).clamp(0.0, 1.0);
    }
    (s, t)
}

/// Minimize `|c1(s) - c2(t)|^2` from `(s, t)`, clamped to both domains.
fn refine(c1: &BSplineCurve, c2: &BSplineCurve, mut s: f64, mut t: f64) -> CurveIntersection {
    let (a1, b1) = c1.domain();
    let (a2, b2) = c2.domain();

    for _ in 0..NEWTON_ITERATIONS {
        let d1 = c1.derivatives(s, 2);
        let d2 = c2.derivatives(t, 2);
        let diff = d1[0] - d2[0];

        let g_s = diff.dot(d1[1]);
        let g_t = -diff.dot(d2[1]);
        let cross = -d1[1].dot(d2[1]);
        let mut h_ss = d1[1].length_squared() + diff.dot(d1[2]);
        let mut h_tt = d2[1].length_squared() - diff.dot(d2[2]);
        if h_ss * h_tt - cross * cross <= 0.0 || h_ss <= 0.0 {
            // not convex here: fall back to Gauss-Newton
            h_ss = d1[1].length_squared();
            h_tt = d2[1].length_squared();
        }
        let det = h_ss * h_tt - cross * cross;
        if det.abs() < 1e-300 {
            break;
        }

        let ds = -(h_tt * g_s - cross * g_t) / det;
        let dt = -(h_ss * g_t - cross * g_s) / det;
        let ns = (s + ds).clamp(a1, b1);
        let nt = (t + dt).clamp(a2, b2);
        let moved = (ns - s).abs() / (b1 - a1) + (nt - t).abs() / (b2 - a2);
        s = ns;
        t = nt;
        if moved < 1e-15 {
            break;
        }
    }

    let p1 = c1.point_at(s);
    let p2 = c2.point_at(t);
    CurveIntersection {
        u: s,
        v: t,
        point: 0.5 * (p1 + p2),
        distance: p1.distance(p2),
    }
}

/// All points where `c1` and `c2` come closer than `tol` (absolute), sorted by `u`.
pub fn intersect_curves(c1: &BSplineCurve, c2: &BSplineCurve, tol: f64) -> Vec<CurveIntersection> {
    let l1 = Polyline::sample(c1);
    let l2 = Polyline::sample(c2);
    let boxes1 = l1.segment_boxes(tol);
    let boxes2 = l2.segment_boxes(tol);

    let mut found: Vec<CurveIntersection> = Vec::new();
    for (i, b1) in boxes1.iter().enumerate() {
        for (j, b2) in boxes2.iter().enumerate() {
            if !b1.intersects(b2) {
                continue;
            }
            let (a, b) = segment_closest(l1.points[i], l1.points[i + 1], l2.points[j], l2.points[j + 1]);
            let s = l1.params[i] + a * (l1.params[i + 1] - l1.params[i]);
            let t = l2.params[j] + b * (l2.params[j + 1] - l2.params[j]);
            let candidate = refine(c1, c2, s, t);
            if candidate.distance > tol {
                continue;
            }
            merge_candidate(&mut found, candidate, c1, c2, tol);
        }
    }

    found.sort_by(|a, b| a.u.total_cmp(&b.u));
    trace!(count = found.len(), "curve/curve intersections");
    found
}

fn merge_candidate(
    found: &mut Vec<CurveIntersection>,
    candidate: CurveIntersection,
    c1: &BSplineCurve,
    c2: &BSplineCurve,
    tol: f64,
) {
    let (a1, b1) = c1.domain();
    let (a2, b2) = c2.domain();
    let par_tol = 1e-7;
    let same = |x: &CurveIntersection| {
        let du = (x.u - candidate.u).abs() / (b1 - a1);
        let dv = (x.v - candidate.v).abs() / (b2 - a2);
        (du <= par_tol && dv <= par_tol) || (x.point.distance(candidate.point) <= tol && du <= 1e-3 && dv <= 1e-3)
    };
    match found.iter_mut().find(|x| same(x)) {
        Some(existing) if candidate.distance < existing.distance => *existing = candidate,
        Some(_) => {}
        None => found.push(candidate),
    }
}

/// The pair of points of minimal distance between two curves.
pub fn closest_points(c1: &BSplineCurve, c2: &BSplineCurve) -> CurveIntersection {
    let l1 = Polyline::sample(c1);
    let l2 = Polyline::sample(c2);

    // best partner on the second polyline for every sample of the first
    let mut pairs: Vec<(f64, usize, usize)> = l1
        .points
        .iter()
        .enumerate()
        .filter_map(|(i, p)| {
            l2.points
                .iter()
                .enumerate()
                .map(|(j, q)| (p.distance_squared(*q), i, j))
                .min_by(|a, b| a.0.total_cmp(&b.0))
        })
        .collect();
    pairs.sort_by(|a, b| a.0.total_cmp(&b.0));

    pairs
        .iter()
        .take(4)
        .map(|&(_, i, j)| refine(c1, c2, l1.params[i], l2.params[j]))
        .min_by(|a, b| a.distance.total_cmp(&b.distance))
        .unwrap_or_else(|| refine(c1, c2, c1.first_param(), c2.first_param()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::curve::{Circle, Line};
    use gordon_math::DVec3;

    #[test]
    fn test_segment_closest() {
        let (a, b) = segment_closest(
            DVec3::new(-1.0, 0.0, 0.0),
            DVec3::new(1.0, 0.0, 0.0),
            DVec3::new(0.5, -1.0, 1.0),
            DVec3::new(0.5, 1.0, 1.0),
        );
        assert!((a - 0.75).abs() < 1e-12);
        assert!((b - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_line_crosses_circle_twice() {
        let circle = Circle::new(DVec3::ZERO, DVec3::Z, 1.0).to_bspline().unwrap();
        let line = Line::new(DVec3::new(-2.0, 0.5, 0.0), DVec3::new(2.0, 0.5, 0.0))
            .to_bspline()
            .unwrap();
        let hits = intersect_curves(&line, &circle, 1e-7);
        assert_eq!(hits.len(), 2, "{:?}", hits);
        let x = 0.75f64.sqrt();
        assert!((line.point_at(hits[0].u) - DVec3::new(-x, 0.5, 0.0)).length() < 1e-9);
        assert!((line.point_at(hits[1].u) - DVec3::new(x, 0.5, 0.0)).length() < 1e-9);
        for h in &hits {
            assert!(circle.point_at(h.v).distance(h.point) < 1e-9);
        }
    }

    #[test]
    fn test_skew_lines_have_no_intersection_but_closest_points() {
        let l1 = Line::new(DVec3::new(-1.0, 0.0, 0.0), DVec3::new(1.0, 0.0, 0.0)).to_bspline().unwrap();
        let l2 = Line::new(DVec3::new(0.5, -1.0, 0.01), DVec3::new(0.5, 1.0, 0.01)).to_bspline().unwrap();
        assert!(intersect_curves(&l1, &l2, 1e-6).is_empty());
        let cp = closest_points(&l1, &l2);
        assert!((cp.distance - 0.01).abs() < 1e-12);
        assert!((cp.u - 0.75).abs() < 1e-9);
        assert!((cp.v - 0.5).abs() < 1e-9);
    }
}
