//! B-spline algorithms used by the curve network interpolation: family
//! compatibility, intersections, skinning and continuous reparametrization.

mod compat;
mod intersect;
mod reparam;
mod skin;

use gordon_core::{Result, ToleranceConfig};
use gordon_geometry::{BSplineCurve, BSplineSurface, Curve, KnotSpline};
use gordon_math::Point3;

pub use compat::make_geometry_compatible;
pub use intersect::Intersection;

/// Tangent turn (radians) above which a C0 knot counts as a kink.
pub const KINK_ANGLE: f64 = 6.0 * std::f64::consts::PI / 180.0;

/// Algorithms parameterized by a parametric tolerance and a relative
/// tolerance for deciding whether a family closes on itself.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BSplineAlgorithms {
    pub tol_par: f64,
    pub tol_closed: f64,
}

impl Default for BSplineAlgorithms {
    fn default() -> Self {
        Self::new(ToleranceConfig::DEFAULT_PAR)
    }
}

impl BSplineAlgorithms {
    pub fn new(tol_par: f64) -> Self {
        Self {
            tol_par,
            tol_closed: ToleranceConfig::DEFAULT_CLOSED,
        }
    }

    pub fn from_config(config: &ToleranceConfig) -> Self {
        Self::new(config.tol_par).with_closed_tolerance(config.tol_closed)
    }

    pub fn with_closed_tolerance(mut self, tol_closed: f64) -> Self {
        self.tol_closed = tol_closed;
        self
    }

    /// Largest pole spread of any curve of the family.
    pub fn scale(curves: &[BSplineCurve]) -> f64 {
        curves.iter().map(BSplineCurve::scale).fold(0.0, f64::max)
    }

    /// Largest distance of a grid point from the first point of its row.
    pub fn scale_pt_array(points: &[Vec<Point3>]) -> f64 {
        points
            .iter()
            .flat_map(|row| {
                let first = row[0];
                row.iter().skip(1).map(move |p| p.distance(first))
            })
            .fold(0.0, f64::max)
    }

    /// First and last row of the grid coincide.
    pub fn is_u_dir_closed(points: &[Vec<Point3>], tolerance: f64) -> bool {
        match (points.first(), points.last()) {
            (Some(first), Some(last)) => first.iter().zip(last).all(|(a, b)| a.distance(*b) < tolerance),
            _ => false,
        }
    }

    /// First and last column of the grid coincide.
    pub fn is_v_dir_closed(points: &[Vec<Point3>], tolerance: f64) -> bool {
        points.iter().all(|row| match (row.first(), row.last()) {
            (Some(a), Some(b)) => a.distance(*b) < tolerance,
            _ => false,
        })
    }

    /// Index of the distinct knot of `spline` within `tolerance` of `knot`.
    pub fn find_knot<S: KnotSpline + ?Sized>(spline: &S, knot: f64, tolerance: f64) -> Option<usize> {
        spline.knots().iter().position(|k| (k - knot).abs() < tolerance)
    }

    pub fn have_same_range<S: KnotSpline>(splines: &[S], tolerance: f64) -> bool {
        let Some(first) = splines.first() else {
            return true;
        };
        let (begin, end) = (first.first_param(), first.last_param());
        splines
            .iter()
            .all(|s| (s.first_param() - begin).abs() <= tolerance && (s.last_param() - end).abs() <= tolerance)
    }

    pub fn have_same_degree<S: KnotSpline>(splines: &[S]) -> bool {
        splines.windows(2).all(|w| w[0].degree() == w[1].degree())
    }

    /// Raise every curve to the highest degree of the family.
    pub fn match_degree(curves: &mut [BSplineCurve]) -> Result<()> {
        let max_degree = curves.iter().map(|c| c.degree).max().unwrap_or(0);
        for curve in curves.iter_mut() {
            curve.elevate_degree(max_degree)?;
        }
        Ok(())
    }

    pub fn flip_surface(surface: &BSplineSurface) -> BSplineSurface {
        surface.exchange_uv()
    }

    /// Map the knots of `curve` onto [umin, umax] unless it is already there.
    pub fn reparametrize_bspline(curve: &mut BSplineCurve, umin: f64, umax: f64, tolerance: f64) -> Result<()> {
        if (curve.first_param() - umin).abs() > tolerance || (curve.last_param() - umax).abs() > tolerance {
            *curve = curve.reparametrized(umin, umax)?;
        }
        Ok(())
    }

    /// Interior knots of full multiplicity where the tangent turns by more than [`KINK_ANGLE`].
    pub fn get_kink_parameters(&self, curve: &BSplineCurve) -> Vec<f64> {
        let eps = self.tol_par;
        let knots = curve.knots();
        let mults = curve.multiplicities();
        let last = knots.len().saturating_sub(1);

        knots
            .iter()
            .zip(&mults)
            .enumerate()
            .filter(|&(i, (_, &m))| i > 0 && i < last && m == curve.degree)
            .map(|(_, (&k, _))| k)
            .filter(|&k| {
                let before = curve.tangent_at(k - eps);
                let after = curve.tangent_at(k + eps);
                before.angle_between(after) > KINK_ANGLE
            })
            .collect()
    }
}

/// `n` evenly spaced values on [umin, umax] that also contain every break.
///
/// A value closer than 0.3 steps to a break is moved onto it; otherwise the
/// break is inserted next to its nearest value.
pub fn linspace_with_breaks(umin: f64, umax: f64, n: usize, breaks: &[f64]) -> Vec<f64> {
    let n = n.max(2);
    let du = (umax - umin) / (n - 1) as f64;
    let mut result: Vec<f64> = (0..n).map(|i| umin + i as f64 * du).collect();
    if let Some(last) = result.last_mut() {
        *last = umax;
    }

    for &b in breaks {
        if let Some(pos) = result.iter().position(|&x| (x - b).abs() <= 0.3 * du) {
            result[pos] = b;
            continue;
        }
        let pos = match result.iter().position(|&x| (x - b).abs() <= (0.5 + 1e-8) * du) {
            Some(pos) if result[pos] > b => pos,
            Some(pos) => pos + 1,
            None => result.partition_point(|&x| x < b),
        };
        result.insert(pos, b);
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use gordon_math::DVec3;

    #[test]
    fn test_linspace_with_breaks() {
        let plain = linspace_with_breaks(0.0, 1.0, 11, &[]);
        assert_eq!(plain.len(), 11);
        assert_eq!(plain[10], 1.0);

        // 0.31 is within 0.3 steps of 0.3 and replaces it
        let replaced = linspace_with_breaks(0.0, 1.0, 11, &[0.31]);
        assert_eq!(replaced.len(), 11);
        assert_eq!(replaced[3], 0.31);

        // 0.35 is halfway and gets inserted
        let inserted = linspace_with_breaks(0.0, 1.0, 11, &[0.35]);
        assert_eq!(inserted.len(), 12);
        assert!(inserted.windows(2).all(|w| w[0] < w[1]));
        assert!(inserted.contains(&0.35));
    }

    #[test]
    fn test_scale_and_closed_grids() {
        let grid = vec![
            vec![DVec3::ZERO, DVec3::X, DVec3::ZERO],
            vec![DVec3::Y, DVec3::new(2.0, 1.0, 0.0), DVec3::Y],
            vec![DVec3::ZERO, DVec3::X, DVec3::ZERO],
        ];
        assert!((BSplineAlgorithms::scale_pt_array(&grid) - 2.0).abs() < 1e-15);
        assert!(BSplineAlgorithms::is_u_dir_closed(&grid, 1e-9));
        assert!(BSplineAlgorithms::is_v_dir_closed(&grid, 1e-9));

        let open = vec![vec![DVec3::ZERO, DVec3::X], vec![DVec3::Y, DVec3::ONE]];
        assert!(!BSplineAlgorithms::is_u_dir_closed(&open, 1e-9));
        assert!(!BSplineAlgorithms::is_v_dir_closed(&open, 1e-9));
    }

    #[test]
    fn test_kink_detection() {
        let bsa = BSplineAlgorithms::new(1e-10);
        let kinked = BSplineCurve::new(
            2,
            vec![0.0, 0.0, 0.0, 0.5, 0.5, 1.0, 1.0, 1.0],
            vec![
                DVec3::new(-1.0, -0.3, 0.0),
                DVec3::new(-0.5, 0.0, 0.0),
                DVec3::ZERO,
                DVec3::new(0.4, 0.4, 0.0),
                DVec3::new(0.6, 1.0, 0.0),
            ],
        )
        .unwrap();
        assert_eq!(bsa.get_kink_parameters(&kinked), vec![0.5]);

        // a double knot with collinear neighbours is not a kink
        let smooth = BSplineCurve::new(
            2,
            vec![0.0, 0.0, 0.0, 0.5, 0.5, 1.0, 1.0, 1.0],
            vec![
                DVec3::ZERO,
                DVec3::new(1.0, 0.0, 0.0),
                DVec3::new(2.0, 0.0, 0.0),
                DVec3::new(3.0, 0.0, 0.0),
                DVec3::new(4.0, 1.0, 0.0),
            ],
        )
        .unwrap();
        assert!(bsa.get_kink_parameters(&smooth).is_empty());
    }

    #[test]
    fn test_reparametrize_and_match_degree() {
        let mut curves = vec![
            BSplineCurve::new(1, vec![0.0, 0.0, 2.0, 2.0], vec![DVec3::ZERO, DVec3::X]).unwrap(),
            BSplineCurve::new(
                3,
                vec![0.0, 0.0, 0.0, 0.0, 2.0, 2.0, 2.0, 2.0],
                vec![DVec3::ZERO, DVec3::Y, DVec3::ONE, DVec3::X],
            )
            .unwrap(),
        ];
        BSplineAlgorithms::match_degree(&mut curves).unwrap();
        assert!(BSplineAlgorithms::have_same_degree(&curves));
        assert_eq!(curves[0].degree, 3);

        for c in curves.iter_mut() {
            BSplineAlgorithms::reparametrize_bspline(c, 0.0, 1.0, 1e-10).unwrap();
        }
        assert!(BSplineAlgorithms::have_same_range(&curves, 1e-12));
        assert_eq!(curves[1].domain(), (0.0, 1.0));
        assert!(curves[0].point_at(0.5).distance(DVec3::new(0.5, 0.0, 0.0)) < 1e-12);

        assert_eq!(BSplineAlgorithms::find_knot(&curves[1], 1.0 - 1e-12, 1e-9), Some(1));
        assert_eq!(BSplineAlgorithms::find_knot(&curves[1], 0.5, 1e-9), None);
    }
}
