use gordon_core::{GordonError, Result};
use gordon_geometry::{BSplineCurve, BSplineSurface, Direction, KnotSpline, SurfaceView};
use tracing::debug;

use super::BSplineAlgorithms;

/// Refine every spline of the family until all share the same knots and
/// multiplicities.
///
/// Knot values closer than `tolerance` are treated as one. Existing knots
/// are raised to the family's highest multiplicity first; knots missing from
/// a spline are inserted afterwards.
pub fn make_geometry_compatible<S: KnotSpline>(splines: &mut [S], tolerance: f64) -> Result<()> {
    if splines.is_empty() {
        return Ok(());
    }
    if !BSplineAlgorithms::have_same_range(splines, tolerance) {
        let ranges: Vec<(f64, f64)> = splines.iter().map(|s| (s.first_param(), s.last_param())).collect();
        return Err(GordonError::IncompatibleParameterRange(format!(
            "splines do not share one parameter range: {ranges:?}"
        )));
    }
    if !BSplineAlgorithms::have_same_degree(splines) {
        let degrees: Vec<usize> = splines.iter().map(KnotSpline::degree).collect();
        return Err(GordonError::IncompatibleDegree(format!(
            "splines do not share one degree: {degrees:?}"
        )));
    }

    let mut all: Vec<f64> = splines.iter().flat_map(|s| s.knots()).collect();
    all.sort_by(f64::total_cmp);
    let mut knots: Vec<f64> = Vec::with_capacity(all.len());
    let mut prev = all[0];
    knots.push(prev);
    for &k in &all[1..] {
        if (k - prev).abs() > tolerance {
            knots.push(k);
        }
        prev = k;
    }

    let mults: Vec<usize> = knots
        .iter()
        .map(|&k| {
            splines
                .iter()
                .filter_map(|s| BSplineAlgorithms::find_knot(s, k, tolerance).map(|idx| s.multiplicities()[idx]))
                .max()
                .unwrap_or(0)
        })
        .collect();

    for spline in splines.iter_mut() {
        for (&k, &m) in knots.iter().zip(&mults) {
            if let Some(idx) = BSplineAlgorithms::find_knot(&*spline, k, tolerance) {
                if spline.multiplicities()[idx] < m {
                    spline.increase_multiplicity(idx, m)?;
                }
            }
        }
        for (&k, &m) in knots.iter().zip(&mults) {
            if BSplineAlgorithms::find_knot(&*spline, k, tolerance).is_none() {
                spline.insert_knot(k, m, tolerance)?;
            }
        }
    }

    debug!(knots = knots.len(), splines = splines.len(), "unified knot vectors");
    Ok(())
}

impl BSplineAlgorithms {
    /// Compatible copies of `curves`; the input is left untouched.
    pub fn create_common_knots_vector_curves(
        &self,
        curves: &[BSplineCurve],
        tolerance: f64,
    ) -> Result<Vec<BSplineCurve>> {
        let mut copies = curves.to_vec();
        make_geometry_compatible(&mut copies, tolerance)?;
        Ok(copies)
    }

    /// Compatible copies of `surfaces`, unified in u and then in v.
    pub fn create_common_knots_vector_surfaces(
        &self,
        surfaces: &[BSplineSurface],
        tolerance: f64,
    ) -> Result<Vec<BSplineSurface>> {
        let mut copies = surfaces.to_vec();
        for direction in [Direction::U, Direction::V] {
            let mut views: Vec<SurfaceView<'_>> =
                copies.iter_mut().map(|s| SurfaceView::new(s, direction)).collect();
            make_geometry_compatible(&mut views, tolerance)?;
        }
        Ok(copies)
    }
}
