//! Nearest-point projection onto a curve.

use gordon_math::Point3;
use serde::{Deserialize, Serialize};

use super::{BSplineCurve, Curve};

/// Result of projecting a point onto a curve.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Projection {
    pub distance: f64,
    pub point: Point3,
    pub parameter: f64,
}

const NEWTON_ITERATIONS: usize = 30;
const SEEDS: usize = 3;

impl BSplineCurve {
    /// Parameters of a dense sampling, refined per non-empty knot span.
    pub fn sample_params(&self, per_span: usize) -> Vec<f64> {
        let mut params = Vec::new();
        let distinct: Vec<f64> = {
            let mut k = self.knots[self.degree..=self.ncp()].to_vec();
            k.dedup();
            k
        };
        for w in distinct.windows(2) {
            for i in 0..per_span {
                params.push(w[0] + (w[1] - w[0]) * i as f64 / per_span as f64);
            }
        }
        params.push(self.last_param());
        params
    }

    /// Nearest point on the curve to `point`.
    pub fn project(&self, point: Point3) -> Projection {
        let per_span = 4 * self.degree.max(2);
        let mut samples: Vec<(f64, f64)> = self
            .sample_params(per_span)
            .into_iter()
            .map(|t| (self.point_at(t).distance_squared(point), t))
            .collect();
        samples.sort_by(|a, b| a.0.total_cmp(&b.0));

        samples
            .iter()
            .take(SEEDS)
            .map(|&(_, t)| self.project_from(point, t))
            .min_by(|a, b| a.distance.total_cmp(&b.distance))
            .unwrap_or_else(|| {
                let t = self.first_param();
                let p = self.point_at(t);
                Projection {
                    distance: p.distance(point),
                    point: p,
                    parameter: t,
                }
            })
    }

    /// Newton iteration on `C'(t) . (C(t) - P) = 0` starting at `t0`, clamped to the domain.
    pub fn project_from(&self, point: Point3, t0: f64) -> Projection {
        let (a, b) = self.domain();
        let eps = 1e-15 * (b - a).max(1.0);
        let mut t = t0.clamp(a, b);

        for _ in 0..NEWTON_ITERATIONS {
            let d = self.derivatives(t, 2);
            let diff = d[0] - point;
            let f = d[1].dot(diff);
            let df = d[2].dot(diff) + d[1].length_squared();
            if df.abs() < 1e-300 {
                break;
            }
            let next = (t - f / df).clamp(a, b);
            let step = (next - t).abs();
            t = next;
            if step <= eps {
                break;
            }
        }

        let p = self.point_at(t);
        Projection {
            distance: p.distance(point),
            point: p,
            parameter: t,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::curve::Circle;
    use gordon_math::DVec3;

    #[test]
    fn test_project_onto_circle() {
        let circle = Circle::new(DVec3::ZERO, DVec3::Z, 1.0);
        let bs = circle.to_bspline().unwrap();
        let target = DVec3::new(2.0, 2.0, 0.5);
        let proj = bs.project(target);
        let expected = DVec3::new(1.0, 1.0, 0.0).normalize();
        assert!(proj.point.distance(expected) < 1e-10, "{:?}", proj);
        assert!((proj.distance - target.distance(expected)).abs() < 1e-10);
        assert!(bs.point_at(proj.parameter).distance(proj.point) < 1e-14);
    }

    #[test]
    fn test_project_clamps_to_end() {
        let bs = BSplineCurve::new(1, vec![0.0, 0.0, 1.0, 1.0], vec![DVec3::ZERO, DVec3::X]).unwrap();
        let proj = bs.project(DVec3::new(3.0, 1.0, 0.0));
        assert_eq!(proj.parameter, 1.0);
        assert!((proj.distance - 5f64.sqrt()).abs() < 1e-12);

        let mid = bs.project(DVec3::new(0.25, 1.0, 0.0));
        assert!((mid.parameter - 0.25).abs() < 1e-12);
        assert!((mid.distance - 1.0).abs() < 1e-12);
    }
}
