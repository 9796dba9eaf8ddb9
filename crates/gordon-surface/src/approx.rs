//! Least-squares B-spline fitting with interpolation and kink constraints.
//!
//! Points are split into approximated and interpolated sets. The control
//! points minimize the squared distance to the approximated points subject to
//! passing exactly through the interpolated ones, solved through the KKT
//! system
//!
//! ```text
//! | AᵀA  Cᵀ | | P |   | Aᵀb |
//! |  C   0  | | λ | = |  d  |
//! ```
//!
//! Closed point sequences additionally tie the seam with C1 and C2 rows (and
//! C0 when the end points are not interpolated already).

use gordon_core::{GordonError, Result};
use gordon_geometry::nurbs::{basis_matrix, parameterization, BSplineBasis, KnotVector};
use gordon_geometry::{BSplineCurve, Curve};
use gordon_math::linalg::{matrix_to_points, points_to_matrix};
use gordon_math::{solve_dense, Aabb3, DMatrix, Point3};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Distance below which a kink snaps onto an existing knot.
const KINK_KNOT_SNAP: f64 = 1e-4;

/// Relative improvement below which parameter optimization stops.
const MIN_IMPROVEMENT: f64 = 1e-6;

/// A fitted curve with its residual.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FitResult {
    pub curve: BSplineCurve,
    /// Largest distance between an approximated point and the curve.
    pub error: f64,
    /// Parameter optimization rounds after the initial solve.
    pub iterations: usize,
}

/// Fits a B-spline with a fixed number of control points to a point sequence.
#[derive(Debug, Clone)]
pub struct BSplineApproxInterp {
    points: Vec<Point3>,
    ncp: usize,
    degree: usize,
    c2_continuous: bool,
    approximated: Vec<usize>,
    interpolated: Vec<usize>,
    kinks: Vec<usize>,
}

impl BSplineApproxInterp {
    /// All points start out approximated. With `c2_continuous` a closed
    /// sequence is fitted with a C2 seam.
    pub fn new(points: Vec<Point3>, ncp: usize, degree: usize, c2_continuous: bool) -> Self {
        let approximated = (0..points.len()).collect();
        Self {
            points,
            ncp,
            degree,
            c2_continuous,
            approximated,
            interpolated: Vec::new(),
            kinks: Vec::new(),
        }
    }

    pub fn points(&self) -> &[Point3] {
        &self.points
    }

    /// Make the curve pass through point `index`; with `with_kink` the curve
    /// is only C0 there.
    pub fn interpolate_point(&mut self, index: usize, with_kink: bool) -> Result<()> {
        let pos = self.approximated.iter().position(|&i| i == index).ok_or_else(|| {
            GordonError::InvalidInput(format!(
                "point {index} is not an approximated point of {}",
                self.points.len()
            ))
        })?;
        self.approximated.remove(pos);
        self.interpolated.push(index);
        if with_kink {
            self.kinks.push(index);
        }
        Ok(())
    }

    /// Normalized parameters of the points; `alpha` 0 uniform, 0.5
    /// centripetal, 1 chord length.
    pub fn compute_parameters(&self, alpha: f64) -> Result<Vec<f64>> {
        parameterization(&self.points, alpha, false)
    }

    /// Distinct knots and multiplicities for `ncp` control points over the
    /// range of `params`, uniform inside, raised to the degree at kinks.
    pub fn compute_knots(&self, ncp: usize, params: &[f64]) -> Result<(Vec<f64>, Vec<usize>)> {
        let order = self.degree + 1;
        if ncp < order {
            return Err(GordonError::TooFewControlPoints {
                available: ncp,
                required: order,
            });
        }
        let umin = params.iter().copied().fold(f64::INFINITY, f64::min);
        let umax = params.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        if !(umax > umin) {
            return Err(GordonError::InvalidInput(format!(
                "fit parameters span an empty range [{umin}, {umax}]"
            )));
        }

        let interior = ncp - order;
        let mut knots = Vec::with_capacity(interior + 2);
        let mut mults = Vec::with_capacity(interior + 2);
        knots.push(umin);
        mults.push(order);
        for i in 1..=interior {
            knots.push(umin + (umax - umin) * i as f64 / (interior + 1) as f64);
            mults.push(1);
        }
        knots.push(umax);
        mults.push(order);

        for &k in &self.kinks {
            let kink = params[k];
            let last = knots.len() - 1;
            match knots.iter().position(|&x| (x - kink).abs() < KINK_KNOT_SNAP) {
                Some(pos) if pos == 0 || pos == last => {}
                Some(pos) => {
                    knots[pos] = kink;
                    mults[pos] = self.degree;
                }
                None => {
                    let pos = knots.partition_point(|&x| x < kink);
                    knots.insert(pos, kink);
                    mults.insert(pos, self.degree);
                }
            }
        }
        Ok((knots, mults))
    }

    fn is_closed(&self) -> bool {
        if !self.c2_continuous || self.points.len() < 2 {
            return false;
        }
        let diagonal = Aabb3::from_points(&self.points).map_or(0.0, |b| b.diagonal());
        let (first, last) = (self.points[0], self.points[self.points.len() - 1]);
        first.distance(last) < 1e-12 * diagonal
    }

    fn first_and_last_interpolated(&self) -> bool {
        let last = self.points.len().saturating_sub(1);
        self.interpolated.contains(&0) && self.interpolated.contains(&last)
    }

    /// Fit the curve for fixed parameters and knots; returns the curve and
    /// the largest distance to an approximated point.
    pub fn solve(&self, params: &[f64], knots: &[f64], mults: &[usize]) -> Result<(BSplineCurve, f64)> {
        if params.len() != self.points.len() {
            return Err(GordonError::InvalidInput(format!(
                "{} parameters for {} points",
                params.len(),
                self.points.len()
            )));
        }
        let flat = KnotVector::from_knots_mults(knots, mults)?.into_vec();
        let basis = BSplineBasis::new(self.degree, flat)?;
        let n_ctr = basis.ncp();

        let closed = self.is_closed();
        let n_cont = match (closed, self.first_and_last_interpolated()) {
            (false, _) => 0,
            (true, true) => 2,
            (true, false) => 3,
        };
        let n_interp = self.interpolated.len();
        let required = (n_interp + n_cont).max(self.degree + 1 + n_cont);
        if n_ctr < required {
            return Err(GordonError::TooFewControlPoints {
                available: n_ctr,
                required,
            });
        }
        if self.approximated.is_empty() && n_ctr != n_interp + n_cont {
            return Err(GordonError::InvalidInput(format!(
                "pure interpolation of {n_interp} points with {n_cont} seam conditions needs exactly that many \
                 control points, got {n_ctr}"
            )));
        }

        let n_vars = n_ctr + n_interp + n_cont;
        let mut lhs = DMatrix::zeros(n_vars, n_vars);
        let mut rhs = DMatrix::zeros(n_vars, 3);

        if !self.approximated.is_empty() {
            let app_params: Vec<f64> = self.approximated.iter().map(|&i| params[i]).collect();
            let app_points: Vec<Point3> = self.approximated.iter().map(|&i| self.points[i]).collect();
            let a = basis_matrix(&basis, &app_params, 0);
            let at = a.transpose();
            lhs.view_mut((0, 0), (n_ctr, n_ctr)).copy_from(&(&at * &a));
            rhs.view_mut((0, 0), (n_ctr, 3)).copy_from(&(&at * points_to_matrix(&app_points)));
        }

        if n_interp > 0 {
            let int_params: Vec<f64> = self.interpolated.iter().map(|&i| params[i]).collect();
            let int_points: Vec<Point3> = self.interpolated.iter().map(|&i| self.points[i]).collect();
            let c = basis_matrix(&basis, &int_params, 0);
            lhs.view_mut((n_ctr, 0), (n_interp, n_ctr)).copy_from(&c);
            lhs.view_mut((0, n_ctr), (n_ctr, n_interp)).copy_from(&c.transpose());
            rhs.view_mut((n_ctr, 0), (n_interp, 3)).copy_from(&points_to_matrix(&int_points));
        }

        if n_cont > 0 {
            let (t0, t1) = (params[0], params[params.len() - 1]);
            let orders: &[usize] = if n_cont == 3 { &[1, 2, 0] } else { &[1, 2] };
            let mut seam = DMatrix::zeros(n_cont, n_ctr);
            for (row, &order) in orders.iter().enumerate() {
                let start = basis.evaluate(t0, order);
                let end = basis.evaluate(t1, order);
                for col in 0..n_ctr {
                    seam[(row, col)] = start[col] - end[col];
                }
            }
            let offset = n_ctr + n_interp;
            lhs.view_mut((offset, 0), (n_cont, n_ctr)).copy_from(&seam);
            lhs.view_mut((0, offset), (n_ctr, n_cont)).copy_from(&seam.transpose());
        }

        let solution = solve_dense(lhs, &rhs, "curve approximation")?;
        let poles = matrix_to_points(&solution.rows(0, n_ctr).into_owned());
        let curve = BSplineCurve::from_poles_mults_knots(poles, mults, knots, self.degree, None, closed)?;

        let error = self
            .approximated
            .iter()
            .map(|&i| curve.point_at(params[i]).distance(self.points[i]))
            .fold(0.0, f64::max);
        Ok((curve, error))
    }

    /// Move every approximated parameter to the foot point on `curve`.
    fn optimize_parameters(&self, curve: &BSplineCurve, params: &mut [f64]) {
        for &i in &self.approximated {
            params[i] = curve.project_from(self.points[i], params[i]).parameter;
        }
    }

    /// Fit, then alternate parameter correction and refitting until the
    /// error stops improving or `max_iter` rounds are done.
    ///
    /// An empty `initial` uses centripetal parameters.
    pub fn fit_curve_optimal(&self, initial: &[f64], max_iter: usize) -> Result<FitResult> {
        let mut params = if initial.is_empty() {
            self.compute_parameters(0.5)?
        } else {
            initial.to_vec()
        };
        if params.len() != self.points.len() {
            return Err(GordonError::InvalidInput(format!(
                "{} initial parameters for {} points",
                params.len(),
                self.points.len()
            )));
        }

        let (knots, mults) = self.compute_knots(self.ncp, &params)?;
        let (mut curve, mut error) = self.solve(&params, &knots, &mults)?;
        let mut old_error = 2.0 * error;
        let mut iterations = 0;

        while error > 0.0 && (old_error - error) / error.max(MIN_IMPROVEMENT) > MIN_IMPROVEMENT && iterations < max_iter
        {
            old_error = error;
            self.optimize_parameters(&curve, &mut params);
            (curve, error) = self.solve(&params, &knots, &mults)?;
            iterations += 1;
        }

        debug!(
            points = self.points.len(),
            poles = curve.ncp(),
            kinks = self.kinks.len(),
            error,
            iterations,
            "fitted curve"
        );
        Ok(FitResult {
            curve,
            error,
            iterations,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gordon_geometry::KnotSpline;
    use gordon_math::DVec3;

    fn arc_points(n: usize, closed: bool) -> Vec<Point3> {
        let sweep = if closed { std::f64::consts::TAU } else { std::f64::consts::PI };
        (0..n)
            .map(|i| {
                let a = sweep * i as f64 / (n - 1) as f64;
                DVec3::new(a.cos(), a.sin(), 0.0)
            })
            .collect()
    }

    #[test]
    fn test_uniform_knots_and_kink_multiplicity() {
        let mut fit = BSplineApproxInterp::new(arc_points(21, false), 8, 3, false);
        let params: Vec<f64> = (0..21).map(|i| i as f64 / 20.0).collect();
        let (knots, mults) = fit.compute_knots(8, &params).unwrap();
        for (k, expected) in knots.iter().zip([0.0, 0.2, 0.4, 0.6, 0.8, 1.0]) {
            assert!((k - expected).abs() < 1e-15);
        }
        assert_eq!(mults, vec![4, 1, 1, 1, 1, 4]);

        // 0.4 already is a knot: raised in place; 0.45 is new: inserted
        fit.interpolate_point(8, true).unwrap();
        fit.interpolate_point(9, true).unwrap();
        let (knots, mults) = fit.compute_knots(8, &params).unwrap();
        assert_eq!(knots.len(), 7);
        assert_eq!(knots[2], 0.4);
        assert_eq!(knots[3], 0.45);
        assert_eq!(mults, vec![4, 1, 3, 3, 1, 1, 4]);

        assert!(matches!(
            fit.compute_knots(3, &params),
            Err(GordonError::TooFewControlPoints { available: 3, required: 4 })
        ));
    }

    #[test]
    fn test_interpolated_points_are_hit_exactly() {
        let points = arc_points(30, false);
        let mut fit = BSplineApproxInterp::new(points.clone(), 10, 3, false);
        for i in [0, 11, 29] {
            fit.interpolate_point(i, false).unwrap();
        }
        assert!(fit.interpolate_point(11, false).is_err());

        let params = fit.compute_parameters(0.5).unwrap();
        let (knots, mults) = fit.compute_knots(10, &params).unwrap();
        let (curve, error) = fit.solve(&params, &knots, &mults).unwrap();
        assert_eq!(curve.ncp(), 10);
        for i in [0, 11, 29] {
            assert!(curve.point_at(params[i]).distance(points[i]) < 1e-12);
        }
        assert!(error < 1e-4, "error {error}");
    }

    #[test]
    fn test_closed_sequence_gets_smooth_seam() {
        let points = arc_points(40, true);
        let mut fit = BSplineApproxInterp::new(points, 12, 3, true);
        fit.interpolate_point(0, false).unwrap();
        fit.interpolate_point(39, false).unwrap();

        let result = fit.fit_curve_optimal(&[], 10).unwrap();
        let curve = &result.curve;
        assert!(curve.periodic);
        let (a, b) = curve.domain();
        let d0 = curve.derivatives(a, 2);
        let d1 = curve.derivatives(b, 2);
        assert!((d0[1] - d1[1]).length() < 1e-8 * d0[1].length());
        assert!((d0[2] - d1[2]).length() < 1e-8 * d0[2].length().max(1.0));
    }

    #[test]
    fn test_too_few_poles_for_constraints() {
        let mut fit = BSplineApproxInterp::new(arc_points(10, false), 4, 3, false);
        for i in 0..5 {
            fit.interpolate_point(i, false).unwrap();
        }
        let params: Vec<f64> = (0..10).map(|i| i as f64 / 9.0).collect();
        let err = fit.fit_curve_optimal(&params, 10).unwrap_err();
        assert!(matches!(err, GordonError::TooFewControlPoints { available: 4, required: 5 }));
    }

    #[test]
    fn test_kinked_fit_is_c0_at_the_kink() {
        // an L-shaped polyline sampled densely, kinked at the corner
        let mut points: Vec<Point3> = (0..=20).map(|i| DVec3::new(i as f64 / 20.0, 0.0, 0.0)).collect();
        points.extend((1..=20).map(|i| DVec3::new(1.0, i as f64 / 20.0, 0.0)));
        let params: Vec<f64> = (0..points.len()).map(|i| i as f64 / 40.0).collect();

        let mut fit = BSplineApproxInterp::new(points, 12, 3, false);
        fit.interpolate_point(0, false).unwrap();
        fit.interpolate_point(40, false).unwrap();
        fit.interpolate_point(20, true).unwrap();
        let result = fit.fit_curve_optimal(&params, 0).unwrap();

        let curve = result.curve;
        let idx = curve.knots().iter().position(|k| (k - 0.5).abs() < 1e-12).unwrap();
        assert_eq!(curve.multiplicities()[idx], 3);
        assert!(curve.point_at(0.5).distance(DVec3::new(1.0, 0.0, 0.0)) < 1e-12);
        assert!(result.error < 1e-10, "error {}", result.error);
    }
}
