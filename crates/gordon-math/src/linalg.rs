//! Dense linear solves for interpolation and least-squares fitting.
//!
//! Interpolation matrices are small (a few hundred rows at most) and dense
//! enough that an LU factorization with partial pivoting is the right tool.
//! A factorization is reused for every right-hand side column, so a whole
//! control polygon (x, y, z and optionally w) is solved at once.

use gordon_core::{GordonError, Result};
use nalgebra::linalg::LU;
use nalgebra::{DMatrix, Dyn};

use crate::{DVec3, DVec4};

/// Relative pivot threshold below which a system is treated as singular.
pub const SINGULAR_PIVOT: f64 = 1e-12;

/// LU factorization of a square system, checked for numerical singularity.
pub struct DenseLu {
    lu: LU<f64, Dyn, Dyn>,
}

impl DenseLu {
    /// Factor `matrix`. `context` names the system in the error message.
    pub fn factor(matrix: DMatrix<f64>, context: &str) -> Result<Self> {
        if !matrix.is_square() {
            return Err(GordonError::SingularSystem(format!(
                "{context}: matrix is {}x{}, not square",
                matrix.nrows(),
                matrix.ncols()
            )));
        }
        if matrix.nrows() == 0 {
            return Err(GordonError::SingularSystem(format!("{context}: empty system")));
        }

        let scale = matrix.amax().max(f64::MIN_POSITIVE);
        let lu = LU::new(matrix);
        let min_pivot = lu.u().diagonal().amin();
        if !(min_pivot > SINGULAR_PIVOT * scale) {
            return Err(GordonError::SingularSystem(format!(
                "{context}: pivot {min_pivot:.3e} relative to {scale:.3e}"
            )));
        }
        Ok(Self { lu })
    }

    pub fn dim(&self) -> usize {
        self.lu.u().nrows()
    }

    /// Solve for every column of `rhs`.
    pub fn solve(&self, rhs: &DMatrix<f64>) -> Result<DMatrix<f64>> {
        self.lu
            .solve(rhs)
            .ok_or_else(|| GordonError::SingularSystem("LU back-substitution failed".into()))
    }
}

/// Factor and solve `matrix * x = rhs` in one step.
pub fn solve_dense(matrix: DMatrix<f64>, rhs: &DMatrix<f64>, context: &str) -> Result<DMatrix<f64>> {
    DenseLu::factor(matrix, context)?.solve(rhs)
}

/// Stack points as the rows of an `n x 3` matrix.
pub fn points_to_matrix(points: &[DVec3]) -> DMatrix<f64> {
    DMatrix::from_fn(points.len(), 3, |i, j| points[i][j])
}

/// Stack homogeneous points as the rows of an `n x 4` matrix.
pub fn hpoints_to_matrix(points: &[DVec4]) -> DMatrix<f64> {
    DMatrix::from_fn(points.len(), 4, |i, j| points[i][j])
}

/// Read the first three columns of every row back as points.
pub fn matrix_to_points(matrix: &DMatrix<f64>) -> Vec<DVec3> {
    (0..matrix.nrows())
        .map(|i| DVec3::new(matrix[(i, 0)], matrix[(i, 1)], matrix[(i, 2)]))
        .collect()
}

/// Read the first four columns of every row back as homogeneous points.
pub fn matrix_to_hpoints(matrix: &DMatrix<f64>) -> Vec<DVec4> {
    (0..matrix.nrows())
        .map(|i| DVec4::new(matrix[(i, 0)], matrix[(i, 1)], matrix[(i, 2)], matrix[(i, 3)]))
        .collect()
}
