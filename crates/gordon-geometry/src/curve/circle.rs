//! Circle curve.

use std::f64::consts::{FRAC_1_SQRT_2, PI};

use gordon_core::Result;
use gordon_math::{DVec3, Point3, Vector3};
use serde::{Deserialize, Serialize};

use super::{BSplineCurve, Curve};

/// A circle in 3D space, parameterized by angle over `[0, 2*PI]`.
///
/// The circle lies in the plane defined by `center` and `normal`,
/// with the reference direction for `t=0` computed from the normal.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Circle {
    pub center: Point3,
    pub normal: Vector3,
    pub radius: f64,
}

impl Circle {
    pub fn new(center: Point3, normal: Vector3, radius: f64) -> Self {
        Self {
            center,
            normal: normal.normalize(),
            radius,
        }
    }

    /// Orthonormal frame (u_axis, v_axis) in the circle plane.
    pub fn local_frame(&self) -> (DVec3, DVec3) {
        let n = self.normal;
        let ref_vec = if n.x.abs() < 0.9 { DVec3::X } else { DVec3::Y };
        let u = n.cross(ref_vec).normalize();
        let v = n.cross(u).normalize();
        (u, v)
    }

    /// Exact rational quadratic B-spline: four quarter arcs, knots on [0, 2*PI].
    ///
    /// The B-spline starts and ends at `point_at(0)` and passes through the
    /// quarter points at the knots, but is not angle-parameterized in between.
    pub fn to_bspline(&self) -> Result<BSplineCurve> {
        let (u, v) = self.local_frame();
        let r = self.radius;
        let poles: Vec<Point3> = (0..9)
            .map(|i| {
                let angle = i as f64 * PI / 4.0;
                let reach = if i % 2 == 0 { r } else { r * 2f64.sqrt() };
                self.center + reach * (angle.cos() * u + angle.sin() * v)
            })
            .collect();
        let weights = (0..9).map(|i| if i % 2 == 0 { 1.0 } else { FRAC_1_SQRT_2 }).collect();
        let knots = [0.0, PI / 2.0, PI, 1.5 * PI, 2.0 * PI];
        BSplineCurve::from_poles_mults_knots(poles, &[3, 2, 2, 2, 3], &knots, 2, Some(weights), true)
    }
}

impl Curve for Circle {
    fn point_at(&self, t: f64) -> Point3 {
        let (u, v) = self.local_frame();
        self.center + self.radius * (t.cos() * u + t.sin() * v)
    }

    fn tangent_at(&self, t: f64) -> Vector3 {
        let (u, v) = self.local_frame();
        self.radius * (-t.sin() * u + t.cos() * v)
    }

    fn domain(&self) -> (f64, f64) {
        (0.0, 2.0 * PI)
    }

    fn is_closed(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_circle_points_on_circle() {
        let circle = Circle::new(DVec3::ZERO, DVec3::Z, 1.0);
        for i in 0..8 {
            let t = i as f64 * PI / 4.0;
            let p = circle.point_at(t);
            assert!((p.length() - 1.0).abs() < 1e-10, "Point at t={} not on circle", t);
            assert!(p.z.abs() < 1e-10, "Point not in XY plane");
            // tangent is perpendicular to the radius
            assert!(p.dot(circle.tangent_at(t)).abs() < 1e-10);
        }
    }

    #[test]
    fn test_to_bspline_is_exact() {
        let circle = Circle::new(DVec3::new(1.0, 2.0, 3.0), DVec3::Z, 2.0);
        let bs = circle.to_bspline().unwrap();
        assert!(bs.is_closed());
        assert!(bs.periodic);
        assert!(bs.is_rational());

        let (t0, t1) = bs.domain();
        for i in 0..=64 {
            let t = t0 + (t1 - t0) * i as f64 / 64.0;
            let r = (bs.point_at(t) - circle.center).length();
            assert!((r - 2.0).abs() < 1e-12, "radius {} at t={}", r, t);
        }
        // quarter points sit at the knots
        for k in 0..4 {
            let t = k as f64 * PI / 2.0;
            assert!((bs.point_at(t) - circle.point_at(t)).length() < 1e-12);
        }
        // C1 seam
        let d0 = bs.tangent_at(t0);
        let d1 = bs.tangent_at(t1);
        assert!((d0 - d1).length() < 1e-10);
    }
}
