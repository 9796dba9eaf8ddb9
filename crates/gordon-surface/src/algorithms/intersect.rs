use gordon_core::ToleranceConfig;
use gordon_geometry::{closest_points, intersect_curves, BSplineCurve, Curve, CurveIntersection};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::BSplineAlgorithms;

/// Where a profile and a guide meet, as parameters `(u on c1, v on c2)`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Intersection {
    /// An ordinary crossing.
    Single { u: f64, v: f64 },
    /// A crossing at the seam of a closed curve, present at both ends of its range.
    SeamDouble { first: (f64, f64), second: (f64, f64) },
    /// No crossing was found; the closest points are within tolerance.
    Projected { u: f64, v: f64, distance: f64 },
}

impl Intersection {
    /// Every parameter pair this intersection stands for.
    pub fn params(&self) -> Vec<(f64, f64)> {
        match *self {
            Intersection::Single { u, v } | Intersection::Projected { u, v, .. } => vec![(u, v)],
            Intersection::SeamDouble { first, second } => vec![first, second],
        }
    }

    pub fn is_seam(&self) -> bool {
        matches!(self, Intersection::SeamDouble { .. })
    }
}

impl BSplineAlgorithms {
    /// Intersections of `c1` and `c2`, one entry per distinct 3D point.
    ///
    /// Crossings are searched at the kernel's linear tolerance and accepted
    /// when both curves pass within `tol_3d` times the mean scale of the two
    /// curves. A crossing at the seam of a closed curve is reported with both
    /// seam parameters. When the curves do not cross but come within
    /// tolerance, the closest points are returned instead.
    pub fn intersections(&self, c1: &BSplineCurve, c2: &BSplineCurve, tol_3d: f64) -> Vec<Intersection> {
        let scale = 0.5 * (c1.scale() + c2.scale());
        let tol = tol_3d * scale;
        let kernel_tol = tol.min(ToleranceConfig::KERNEL_LINEAR * scale.max(1.0));

        let hits: Vec<CurveIntersection> = intersect_curves(c1, c2, kernel_tol)
            .into_iter()
            .filter(|h| c1.point_at(h.u).distance(c2.point_at(h.v)) <= tol)
            .collect();

        if hits.is_empty() {
            let closest = closest_points(c1, c2);
            if closest.distance > tol {
                debug!(distance = closest.distance, tolerance = tol, "curves do not intersect");
                return Vec::new();
            }
            warn!(
                u = closest.u,
                v = closest.v,
                distance = closest.distance,
                "no crossing found, using closest points"
            );
            return vec![Intersection::Projected {
                u: closest.u,
                v: closest.v,
                distance: closest.distance,
            }];
        }

        // group hits on the same 3D point; a seam shows up twice
        let mut sites: Vec<Vec<CurveIntersection>> = Vec::new();
        for hit in hits {
            match sites.iter_mut().find(|s| s[0].point.distance(hit.point) <= tol) {
                Some(site) => site.push(hit),
                None => sites.push(vec![hit]),
            }
        }

        sites
            .into_iter()
            .map(|site| self.classify(c1, c2, &site, tol))
            .collect()
    }

    fn classify(&self, c1: &BSplineCurve, c2: &BSplineCurve, site: &[CurveIntersection], tol: f64) -> Intersection {
        let best = site
            .iter()
            .min_by(|a, b| a.distance.total_cmp(&b.distance))
            .copied()
            .unwrap_or(site[0]);

        if c1.is_closed() && c1.start_point().distance(best.point) <= tol {
            return Intersection::SeamDouble {
                first: (c1.first_param(), best.v),
                second: (c1.last_param(), best.v),
            };
        }
        if c2.is_closed() && c2.start_point().distance(best.point) <= tol {
            return Intersection::SeamDouble {
                first: (best.u, c2.first_param()),
                second: (best.u, c2.last_param()),
            };
        }
        Intersection::Single { u: best.u, v: best.v }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gordon_geometry::{Circle, Line};
    use gordon_math::DVec3;

    #[test]
    fn test_single_crossing() {
        let bsa = BSplineAlgorithms::default();
        let a = Line::new(DVec3::new(0.0, 0.0, 0.0), DVec3::new(2.0, 0.0, 0.0)).to_bspline().unwrap();
        let b = Line::new(DVec3::new(0.5, -1.0, 0.0), DVec3::new(0.5, 1.0, 0.0)).to_bspline().unwrap();
        let found = bsa.intersections(&a, &b, 1e-6);
        assert_eq!(found.len(), 1);
        let (u, v) = found[0].params()[0];
        assert!((u - 0.25).abs() < 1e-10);
        assert!((v - 0.5).abs() < 1e-10);
        assert!(!found[0].is_seam());
    }

    #[test]
    fn test_seam_crossing_is_doubled() {
        let bsa = BSplineAlgorithms::default();
        let circle = Circle::new(DVec3::ZERO, DVec3::Z, 1.0);
        let ring = circle.to_bspline().unwrap();
        let start = circle.point_at(0.0);
        let meridian = Line::new(start - DVec3::Z, start + DVec3::Z).to_bspline().unwrap();

        let found = bsa.intersections(&ring, &meridian, 1e-6);
        assert_eq!(found.len(), 1, "{:?}", found);
        assert!(found[0].is_seam());
        let params = found[0].params();
        assert_eq!(params[0].0, ring.first_param());
        assert_eq!(params[1].0, ring.last_param());
        assert!((params[0].1 - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_near_miss_is_projected_and_far_miss_is_empty() {
        let bsa = BSplineAlgorithms::default();
        let a = Line::new(DVec3::new(0.0, 0.0, 0.0), DVec3::new(1.0, 0.0, 0.0)).to_bspline().unwrap();
        let near = Line::new(DVec3::new(0.5, -1.0, 1e-6), DVec3::new(0.5, 1.0, 1e-6)).to_bspline().unwrap();
        let found = bsa.intersections(&a, &near, 1e-5);
        assert_eq!(found.len(), 1);
        match found[0] {
            Intersection::Projected { u, v, distance } => {
                assert!((u - 0.5).abs() < 1e-9);
                assert!((v - 0.5).abs() < 1e-9);
                assert!((distance - 1e-6).abs() < 1e-12);
            }
            other => panic!("expected a projection, got {:?}", other),
        }

        let far = Line::new(DVec3::new(0.5, -1.0, 0.1), DVec3::new(0.5, 1.0, 0.1)).to_bspline().unwrap();
        assert!(bsa.intersections(&a, &far, 1e-5).is_empty());
    }
}
