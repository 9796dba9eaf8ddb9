//! Global curve interpolation through points at prescribed parameters.
//!
//! Points are interpolated in homogeneous space, so interpolating the poles of
//! a family of rational curves yields the exact rational skin.

use gordon_core::{GordonError, Result};
use gordon_math::linalg::{hpoints_to_matrix, matrix_to_hpoints};
use gordon_math::{DMatrix, DVec4, DenseLu, Point3};

use super::BSplineCurve;
use crate::nurbs::basis::{basis_matrix, BSplineBasis};
use crate::nurbs::deboor::to_homogeneous;

/// Interpolation scheme for one parameter sequence.
///
/// Open: degree `min(3, n - 1)`, clamped, not-a-knot interior knots.
/// Periodic: cubic, a knot at every parameter and two extra equations
/// tying first and second derivatives across the seam.
pub struct Interpolation {
    pub basis: BSplineBasis,
    pub periodic: bool,
    params: Vec<f64>,
    lu: DenseLu,
}

impl Interpolation {
    pub fn new(params: &[f64], periodic: bool) -> Result<Self> {
        let n = params.len();
        let min_points = if periodic { 3 } else { 2 };
        if n < min_points {
            return Err(GordonError::InvalidInput(format!(
                "interpolation needs at least {min_points} points, got {n}"
            )));
        }
        if params.windows(2).any(|w| !(w[1] > w[0])) {
            return Err(GordonError::InvalidInput(
                "interpolation parameters must be strictly increasing".into(),
            ));
        }

        let (first, last) = (params[0], params[n - 1]);
        let (degree, interior): (usize, &[f64]) = if periodic {
            (3, &params[1..n - 1])
        } else {
            let degree = 3.min(n - 1);
            let interior = if degree == 3 { &params[2..n - 2] } else { &[] };
            (degree, interior)
        };

        let mut knots = vec![first; degree + 1];
        knots.extend_from_slice(interior);
        knots.extend(std::iter::repeat(last).take(degree + 1));
        let basis = BSplineBasis::new(degree, knots)?;

        let mut matrix = basis_matrix(&basis, params, 0);
        if periodic {
            let ncp = basis.ncp();
            let mut seam = DMatrix::zeros(2, ncp);
            for (row, order) in [(0usize, 1usize), (1, 2)] {
                let start = basis.evaluate(first, order);
                let end = basis.evaluate(last, order);
                for col in 0..ncp {
                    seam[(row, col)] = start[col] - end[col];
                }
            }
            matrix = matrix.insert_rows(n, 2, 0.0);
            matrix.rows_mut(n, 2).copy_from(&seam);
        }

        let lu = DenseLu::factor(matrix, "curve interpolation")?;
        Ok(Self {
            basis,
            periodic,
            params: params.to_vec(),
            lu,
        })
    }

    pub fn degree(&self) -> usize {
        self.basis.degree
    }

    pub fn knots(&self) -> &[f64] {
        &self.basis.knots
    }

    pub fn params(&self) -> &[f64] {
        &self.params
    }

    /// Interpolate every point row; each row must have one point per parameter.
    pub fn solve(&self, rows: &[Vec<DVec4>]) -> Result<Vec<Vec<DVec4>>> {
        let n = self.params.len();
        let dim = self.lu.dim();
        let mut rhs = DMatrix::zeros(dim, 4 * rows.len());
        for (c, row) in rows.iter().enumerate() {
            if row.len() != n {
                return Err(GordonError::InvalidInput(format!(
                    "{} points for {n} interpolation parameters",
                    row.len()
                )));
            }
            rhs.view_mut((0, 4 * c), (n, 4)).copy_from(&hpoints_to_matrix(row));
        }
        let solution = self.lu.solve(&rhs)?;
        Ok((0..rows.len())
            .map(|c| matrix_to_hpoints(&solution.columns(4 * c, 4).into_owned()))
            .collect())
    }
}

/// Interpolate homogeneous points; returns the degree, knots and poles.
pub fn interpolate_hpoints(
    points: &[DVec4],
    params: &[f64],
    periodic: bool,
) -> Result<(usize, Vec<f64>, Vec<DVec4>)> {
    let scheme = Interpolation::new(params, periodic)?;
    let poles = scheme.solve(&[points.to_vec()])?.pop().unwrap_or_default();
    Ok((scheme.degree(), scheme.basis.knots, poles))
}

impl BSplineCurve {
    /// Non-rational curve through `points` at `params`.
    pub fn interpolate(points: &[Point3], params: &[f64], periodic: bool) -> Result<Self> {
        let hpoints: Vec<DVec4> = points.iter().map(|&p| to_homogeneous(p, 1.0)).collect();
        let (degree, knots, poles) = interpolate_hpoints(&hpoints, params, periodic)?;
        Self::from_hpoints(degree, knots, &poles, periodic)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::curve::Curve;
    use gordon_math::DVec3;

    #[test]
    fn test_open_interpolation_hits_points() {
        let pts: Vec<DVec3> = (0..7)
            .map(|i| {
                let t = i as f64 * 0.5;
                DVec3::new(t.cos(), t.sin(), 0.2 * t)
            })
            .collect();
        let params: Vec<f64> = (0..7).map(|i| i as f64 / 6.0).collect();
        let c = BSplineCurve::interpolate(&pts, &params, false).unwrap();
        assert_eq!(c.degree, 3);
        assert_eq!(c.ncp(), 7);
        for (p, &t) in pts.iter().zip(&params) {
            assert!(c.point_at(t).distance(*p) < 1e-12);
        }
    }

    #[test]
    fn test_low_point_counts_lower_the_degree() {
        let pts = vec![DVec3::ZERO, DVec3::new(1.0, 1.0, 0.0), DVec3::new(2.0, 0.0, 0.0)];
        let c = BSplineCurve::interpolate(&pts, &[0.0, 0.4, 1.0], false).unwrap();
        assert_eq!(c.degree, 2);
        assert!(c.point_at(0.4).distance(pts[1]) < 1e-12);

        let line = BSplineCurve::interpolate(&pts[..2], &[0.0, 1.0], false).unwrap();
        assert_eq!(line.degree, 1);
    }

    #[test]
    fn test_periodic_interpolation_is_c2_at_seam() {
        let n = 6;
        let mut pts: Vec<DVec3> = (0..n)
            .map(|i| {
                let a = i as f64 * std::f64::consts::TAU / n as f64;
                DVec3::new(2.0 * a.cos(), a.sin(), 0.0)
            })
            .collect();
        pts.push(pts[0]);
        let params: Vec<f64> = (0..=n).map(|i| i as f64 / n as f64).collect();

        let c = BSplineCurve::interpolate(&pts, &params, true).unwrap();
        assert!(c.periodic);
        assert_eq!(c.ncp(), params.len() + 2);
        for (p, &t) in pts.iter().zip(&params) {
            assert!(c.point_at(t).distance(*p) < 1e-12);
        }
        let d0 = c.derivatives(0.0, 2);
        let d1 = c.derivatives(1.0, 2);
        assert!((d0[1] - d1[1]).length() < 1e-9);
        assert!((d0[2] - d1[2]).length() < 1e-8);
    }

    #[test]
    fn test_rejects_unsorted_parameters() {
        let pts = vec![DVec3::ZERO, DVec3::X, DVec3::Y];
        assert!(BSplineCurve::interpolate(&pts, &[0.0, 0.0, 1.0], false).is_err());
        assert!(BSplineCurve::interpolate(&pts[..1], &[0.0], false).is_err());
    }
}
