//! Exact degree elevation.
//!
//! Raising every distinct knot's multiplicity by the elevation count yields a
//! spline space that contains the original curve, so the elevated polygon is
//! recovered by interpolating the curve at the Greville abscissae of the new
//! knot vector. One factorization is shared by all polygons of a surface.

use gordon_core::Result;
use gordon_math::linalg::{hpoints_to_matrix, matrix_to_hpoints};
use gordon_math::{DMatrix, DVec4, DenseLu};

use super::basis::{basis_matrix, BSplineBasis};
use super::deboor::curve_hpoint;
use super::knot_vector::unique_with_mults;

/// Knot vector of the degree `degree + times` space containing the original.
pub fn elevated_knots(knots: &[f64], times: usize) -> Vec<f64> {
    unique_with_mults(knots, 0.0)
        .into_iter()
        .flat_map(|(k, m)| std::iter::repeat(k).take(m + times))
        .collect()
}

/// Greville abscissae of a degree `degree` knot vector.
pub fn greville_abscissae(degree: usize, knots: &[f64]) -> Vec<f64> {
    let ncp = knots.len() - degree - 1;
    (0..ncp)
        .map(|i| knots[i + 1..=i + degree].iter().sum::<f64>() / degree as f64)
        .collect()
}

/// Elevate every polygon (all sharing `degree` and `knots`) by `times`.
pub fn elevate_polygons(
    degree: usize,
    knots: &[f64],
    polygons: &[Vec<DVec4>],
    times: usize,
) -> Result<(Vec<f64>, Vec<Vec<DVec4>>)> {
    if times == 0 {
        return Ok((knots.to_vec(), polygons.to_vec()));
    }

    let new_degree = degree + times;
    let new_knots = elevated_knots(knots, times);
    let sites = greville_abscissae(new_degree, &new_knots);
    let basis = BSplineBasis::new(new_degree, new_knots)?;
    let lu = DenseLu::factor(basis_matrix(&basis, &sites, 0), "degree elevation")?;

    let ncp = sites.len();
    let mut rhs = DMatrix::zeros(ncp, 4 * polygons.len());
    for (c, polygon) in polygons.iter().enumerate() {
        let samples: Vec<DVec4> = sites
            .iter()
            .map(|&t| curve_hpoint(degree, knots, polygon, t))
            .collect();
        rhs.columns_mut(4 * c, 4).copy_from(&hpoints_to_matrix(&samples));
    }

    let solution = lu.solve(&rhs)?;
    let elevated = (0..polygons.len())
        .map(|c| matrix_to_hpoints(&solution.columns(4 * c, 4).into_owned()))
        .collect();

    Ok((basis.knots, elevated))
}
