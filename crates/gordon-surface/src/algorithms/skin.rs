use gordon_core::{GordonError, Result};
use gordon_geometry::{BSplineCurve, BSplineSurface, Interpolation};
use gordon_math::{DVec4, Point3};
use tracing::debug;

use super::BSplineAlgorithms;

impl BSplineAlgorithms {
    /// Skin `curves` into a surface whose v-iso-curves at `v_params` are the curves.
    ///
    /// The curves are brought to a common degree and knot vector, then every
    /// column of poles is interpolated across the family. With
    /// `continuous_if_closed` the interpolation in v is periodic, which
    /// requires the first and last curve to coincide.
    pub fn curves_to_surface(
        &self,
        curves: &[BSplineCurve],
        v_params: &[f64],
        continuous_if_closed: bool,
    ) -> Result<BSplineSurface> {
        if curves.len() < 2 {
            return Err(GordonError::InvalidInput(format!(
                "skinning needs at least two curves, got {}",
                curves.len()
            )));
        }
        if v_params.len() != curves.len() {
            return Err(GordonError::InvalidInput(format!(
                "{} parameters for {} curves",
                v_params.len(),
                curves.len()
            )));
        }

        let mut working = curves.to_vec();
        Self::match_degree(&mut working)?;
        let compat = self.create_common_knots_vector_curves(&working, self.tol_par)?;
        let first = &compat[0];

        let scheme = Interpolation::new(v_params, continuous_if_closed)?;
        let polygons: Vec<Vec<DVec4>> = compat.iter().map(BSplineCurve::hpoints).collect();
        let columns: Vec<Vec<DVec4>> = (0..first.ncp())
            .map(|k| polygons.iter().map(|polygon| polygon[k]).collect())
            .collect();
        let grid = scheme.solve(&columns)?;

        debug!(
            curves = curves.len(),
            poles_u = first.ncp(),
            degree_v = scheme.degree(),
            closed = continuous_if_closed,
            "skinned curve family"
        );
        let surface = BSplineSurface::from_hgrid(
            first.degree,
            scheme.degree(),
            first.knots.clone(),
            scheme.knots().to_vec(),
            &grid,
        )?;
        Ok(surface.with_periodic(first.periodic, continuous_if_closed))
    }

    /// Interpolate the grid `points[u][v]` at `u_params` x `v_params`.
    ///
    /// A direction is interpolated periodically when requested and its first
    /// and last rows (or columns) coincide.
    pub fn points_to_surface(
        &self,
        points: &[Vec<Point3>],
        u_params: &[f64],
        v_params: &[f64],
        u_closed: bool,
        v_closed: bool,
    ) -> Result<BSplineSurface> {
        if points.len() != u_params.len() || points.iter().any(|row| row.len() != v_params.len()) {
            return Err(GordonError::InvalidInput(format!(
                "point grid does not match {} x {} parameters",
                u_params.len(),
                v_params.len()
            )));
        }

        let tolerance = self.tol_closed * Self::scale_pt_array(points);
        let make_u_closed = u_closed && Self::is_u_dir_closed(points, tolerance);
        let make_v_closed = v_closed && Self::is_v_dir_closed(points, tolerance);

        let u_splines = (0..v_params.len())
            .map(|j| {
                let column: Vec<Point3> = points.iter().map(|row| row[j]).collect();
                BSplineCurve::interpolate(&column, u_params, make_u_closed)
            })
            .collect::<Result<Vec<_>>>()?;

        self.curves_to_surface(&u_splines, v_params, make_v_closed)
    }
}
