use gordon_core::{GordonError, Result};
use gordon_geometry::{BSplineCurve, Curve};
use gordon_math::DVec3;
use tracing::debug;

use super::{linspace_with_breaks, BSplineAlgorithms, KINK_ANGLE};
use crate::approx::BSplineApproxInterp;

/// Parameters closer than this are the same sample.
const PAR_TOL: f64 = 1e-10;
const MIN_SAMPLES: usize = 101;
const FIT_DEGREE: usize = 3;
const FIT_ITERATIONS: usize = 10;

impl BSplineAlgorithms {
    /// Approximate `curve` by a cubic with `ncp` poles such that the new curve
    /// at `new_params[i]` is the old curve at `old_params[i]`.
    ///
    /// The curve is sampled densely through a monotone map from new to old
    /// parameters and refitted. Samples at `new_params` are interpolated and
    /// the images of the curve's kinks stay C0. A closed curve with a smooth
    /// seam is refitted with a C2 seam.
    ///
    /// A non-rational curve whose parameters already match is returned as is.
    pub fn reparametrize_bspline_continuously_approx(
        &self,
        curve: &BSplineCurve,
        old_params: &[f64],
        new_params: &[f64],
        ncp: usize,
    ) -> Result<BSplineCurve> {
        if old_params.len() != new_params.len() {
            return Err(GordonError::InvalidInput(format!(
                "{} old parameters but {} new ones",
                old_params.len(),
                new_params.len()
            )));
        }
        if new_params.len() < 2 {
            return Err(GordonError::InvalidInput(
                "reparametrization needs at least two parameters".into(),
            ));
        }
        let identity = old_params
            .iter()
            .zip(new_params)
            .all(|(a, b)| (a - b).abs() <= self.tol_par);
        if identity && !curve.is_rational() {
            return Ok(curve.clone());
        }

        // new -> old parameter map, stored in the x coordinate
        let anchors: Vec<DVec3> = old_params.iter().map(|&t| DVec3::new(t, 0.0, 0.0)).collect();
        let map = BSplineCurve::interpolate(&anchors, new_params, false)?;
        let (first, last) = (new_params[0], new_params[new_params.len() - 1]);

        let kinks: Vec<f64> = self
            .get_kink_parameters(curve)
            .into_iter()
            .map(|k| map.project(DVec3::new(k, 0.0, 0.0)).parameter)
            .collect();
        let breaks: Vec<f64> = new_params[1..new_params.len() - 1]
            .iter()
            .copied()
            .filter(|b| kinks.iter().all(|k| (b - k).abs() > PAR_TOL))
            .collect();

        let mut params = linspace_with_breaks(first, last, MIN_SAMPLES.max(2 * ncp), &breaks);
        for &kink in &kinks {
            match params.iter().position(|p| (p - kink).abs() <= PAR_TOL) {
                Some(pos) => params[pos] = kink,
                None => params.push(kink),
            }
        }
        params.sort_by(f64::total_cmp);

        let (a, b) = curve.domain();
        let points = params
            .iter()
            .map(|&s| curve.point_at(map.point_at(s).x.clamp(a, b)))
            .collect();

        let make_continuous = curve.is_closed() && curve.tangent_at(a).angle_between(curve.tangent_at(b)) < KINK_ANGLE;

        let mut fit = BSplineApproxInterp::new(points, ncp, FIT_DEGREE, make_continuous);
        let index_of = |value: f64| params.iter().position(|p| (p - value).abs() <= PAR_TOL);
        let kink_indices: Vec<usize> = kinks.iter().filter_map(|&k| index_of(k)).collect();
        let mut break_indices: Vec<usize> = std::iter::once(first)
            .chain(breaks.iter().copied())
            .chain(std::iter::once(last))
            .filter_map(index_of)
            .filter(|i| !kink_indices.contains(i))
            .collect();
        break_indices.dedup();
        for i in break_indices {
            fit.interpolate_point(i, false)?;
        }
        for i in kink_indices {
            fit.interpolate_point(i, true)?;
        }

        let result = fit.fit_curve_optimal(&params, FIT_ITERATIONS)?;
        debug!(
            samples = params.len(),
            kinks = kinks.len(),
            poles = result.curve.ncp(),
            error = result.error,
            iterations = result.iterations,
            closed = make_continuous,
            "reparametrized curve"
        );
        Ok(result.curve.with_periodic(make_continuous))
    }
}
