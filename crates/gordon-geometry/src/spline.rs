//! Knot-level interface shared by curves and directional surface views.

use gordon_core::{GordonError, Result};
use gordon_math::DVec4;

use crate::nurbs::insert;
use crate::nurbs::knot_vector::unique_with_mults;

/// A spline seen along one parametric direction: a degree, a flat knot
/// vector and the operations that refine it without changing the geometry.
///
/// Implemented by [`crate::BSplineCurve`] and by [`crate::SurfaceView`], so
/// knot unification is written once for curves and surfaces.
pub trait KnotSpline {
    fn degree(&self) -> usize;

    /// Flat knot vector, each value repeated by its multiplicity.
    fn flat_knots(&self) -> &[f64];

    fn nb_poles(&self) -> usize;

    fn is_periodic(&self) -> bool;

    /// Insert `knot` up to multiplicity `mult`. A knot within `tol` of an
    /// existing one raises that knot instead.
    fn insert_knot(&mut self, knot: f64, mult: usize, tol: f64) -> Result<()>;

    /// Raise the multiplicity of the `index`-th distinct knot to `mult`.
    fn increase_multiplicity(&mut self, index: usize, mult: usize) -> Result<()> {
        let (knot, _) = *unique_with_mults(self.flat_knots(), 0.0)
            .get(index)
            .ok_or_else(|| GordonError::Geometry(format!("knot index {index} out of range")))?;
        self.insert_knot(knot, mult, 0.0)
    }

    /// Distinct knot values.
    fn knots(&self) -> Vec<f64> {
        unique_with_mults(self.flat_knots(), 0.0)
            .into_iter()
            .map(|(k, _)| k)
            .collect()
    }

    fn multiplicities(&self) -> Vec<usize> {
        unique_with_mults(self.flat_knots(), 0.0)
            .into_iter()
            .map(|(_, m)| m)
            .collect()
    }

    fn first_param(&self) -> f64 {
        self.flat_knots()[self.degree()]
    }

    fn last_param(&self) -> f64 {
        self.flat_knots()[self.nb_poles()]
    }
}

/// Refine a bundle of polygons sharing `degree` and `knots` by inserting `knot`
/// up to multiplicity `mult` (capped at the degree; end knots are left alone).
pub(crate) fn refine_polygons(
    degree: usize,
    knots: &[f64],
    polygons: &mut [Vec<DVec4>],
    knot: f64,
    mult: usize,
    tol: f64,
) -> Result<Vec<f64>> {
    let (first, last) = (knots[degree], knots[knots.len() - degree - 1]);
    if knot < first - tol || knot > last + tol {
        return Err(GordonError::Geometry(format!(
            "knot {knot} outside the parameter range [{first}, {last}]"
        )));
    }

    let existing = unique_with_mults(knots, 0.0)
        .into_iter()
        .find(|(k, _)| (k - knot).abs() <= tol);
    let (value, current) = existing.unwrap_or((knot, 0));
    if value <= first || value >= last {
        return Ok(knots.to_vec());
    }

    let times = mult.min(degree).saturating_sub(current);
    if times == 0 {
        return Ok(knots.to_vec());
    }

    let mut new_knots = knots.to_vec();
    for polygon in polygons.iter_mut() {
        let (k, p) = insert::insert_knot(degree, knots, polygon, value, current, times);
        new_knots = k;
        *polygon = p;
    }
    Ok(new_knots)
}
