//! B-spline basis bound to a degree and knot vector.

use gordon_core::{GordonError, Result};
use gordon_math::DMatrix;
use serde::{Deserialize, Serialize};

use super::knot::{basis_functions, ders_basis_functions, find_span};

/// The B-spline basis functions N_{i,degree} of one knot vector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BSplineBasis {
    pub degree: usize,
    pub knots: Vec<f64>,
}

impl BSplineBasis {
    pub fn new(degree: usize, knots: Vec<f64>) -> Result<Self> {
        if degree == 0 || knots.len() < 2 * (degree + 1) {
            return Err(GordonError::InvalidInput(format!(
                "basis of degree {degree} needs at least {} knots, got {}",
                2 * (degree + 1),
                knots.len()
            )));
        }
        if knots.windows(2).any(|w| w[1] < w[0]) {
            return Err(GordonError::InvalidInput("knot vector is not non-decreasing".into()));
        }
        Ok(Self { degree, knots })
    }

    /// Number of basis functions (control points).
    pub fn ncp(&self) -> usize {
        self.knots.len() - self.degree - 1
    }

    pub fn domain(&self) -> (f64, f64) {
        (self.knots[self.degree], self.knots[self.ncp()])
    }

    pub fn find_span(&self, u: f64) -> usize {
        find_span(self.degree, &self.knots, self.ncp() - 1, u)
    }

    /// The `degree + 1` non-zero basis functions of `span` at `u`.
    pub fn basis_funs(&self, span: usize, u: f64) -> Vec<f64> {
        basis_functions(self.degree, &self.knots, span, u)
    }

    pub fn ders_basis_funs(&self, span: usize, u: f64, n: usize) -> Vec<Vec<f64>> {
        ders_basis_functions(self.degree, &self.knots, span, u, n)
    }

    /// The `order`-th derivative of every basis function at `u`, zero outside
    /// the support.
    pub fn evaluate(&self, u: f64, order: usize) -> Vec<f64> {
        let mut row = vec![0.0; self.ncp()];
        let span = self.find_span(u);
        let ders = self.ders_basis_funs(span, u, order);
        let first = span - self.degree;
        row[first..=span].copy_from_slice(&ders[order]);
        row
    }
}

/// Dense `params.len() x ncp` matrix of the `order`-th basis derivatives.
pub fn basis_matrix(basis: &BSplineBasis, params: &[f64], order: usize) -> DMatrix<f64> {
    let mut matrix = DMatrix::zeros(params.len(), basis.ncp());
    for (row, &u) in params.iter().enumerate() {
        let span = basis.find_span(u);
        let ders = basis.ders_basis_funs(span, u, order);
        for (k, &value) in ders[order].iter().enumerate() {
            matrix[(row, span - basis.degree + k)] = value;
        }
    }
    matrix
}
