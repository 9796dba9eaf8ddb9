//! Curve network interpolation pipeline.
//!
//! Takes an unsorted, arbitrarily parametrized network of profiles and guides
//! and drives it through the stages that make it fit for the Gordon
//! construction:
//!
//! 1. every curve is reparametrized onto `[0, 1]`,
//! 2. every profile is intersected with every guide,
//! 3. the network is sorted and orientated,
//! 4. the intersection parameters are averaged into one `u` and one `v` grid,
//! 5. every curve is refitted so it meets the others exactly on that grid,
//! 6. the Gordon surface is built.

use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};

use gordon_core::{CurveFamily, GordonError, Result, ToleranceConfig};
use gordon_geometry::{closest_points, BSplineCurve, BSplineSurface, Curve};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::algorithms::{BSplineAlgorithms, Intersection};
use crate::gordon::GordonSurfaceBuilder;
use crate::sorter::{CurveNetworkSorter, CurveTag, SortedNetwork};

/// Fewest poles a refitted curve gets.
const MIN_CTRL_PTS: usize = 10;
/// Poles added on top of the most detailed curve of a family.
const EXTRA_CTRL_PTS: usize = 10;

/// Pipeline stage reported to the progress callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProgressStage {
    Intersections,
    Sorting,
    Reparametrization,
    Surface,
}

impl fmt::Display for ProgressStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ProgressStage::Intersections => "intersections",
            ProgressStage::Sorting => "sorting",
            ProgressStage::Reparametrization => "reparametrization",
            ProgressStage::Surface => "surface",
        };
        f.write_str(name)
    }
}

/// Called with the current stage and the completed fraction of it.
///
/// Reparametrization runs in parallel, so the callback may be invoked from
/// several threads.
pub type ProgressCallback = Box<dyn Fn(ProgressStage, f64) + Send + Sync>;

/// Interpolates a network of profiles and guides by a Gordon surface.
pub struct InterpolateCurveNetwork {
    profiles: Vec<BSplineCurve>,
    guides: Vec<BSplineCurve>,
    config: ToleranceConfig,
    progress: Option<ProgressCallback>,
}

impl fmt::Debug for InterpolateCurveNetwork {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InterpolateCurveNetwork")
            .field("profiles", &self.profiles.len())
            .field("guides", &self.guides.len())
            .field("config", &self.config)
            .field("progress", &self.progress.is_some())
            .finish()
    }
}

impl InterpolateCurveNetwork {
    pub fn new(profiles: Vec<BSplineCurve>, guides: Vec<BSplineCurve>, config: ToleranceConfig) -> Result<Self> {
        if profiles.len() < 2 || guides.len() < 2 {
            return Err(GordonError::InvalidInput(format!(
                "a curve network needs at least two profiles and two guides, got {} and {}",
                profiles.len(),
                guides.len()
            )));
        }
        let profiles_closed = profiles.iter().all(Curve::is_closed);
        let guides_closed = guides.iter().all(Curve::is_closed);
        if profiles_closed && guides_closed {
            return Err(GordonError::InvalidInput(
                "networks closed in both directions are not supported".into(),
            ));
        }

        Ok(Self {
            profiles,
            guides,
            config,
            progress: None,
        })
    }

    /// Install a progress callback.
    pub fn with_progress<F>(mut self, callback: F) -> Self
    where
        F: Fn(ProgressStage, f64) + Send + Sync + 'static,
    {
        self.progress = Some(Box::new(callback));
        self
    }

    pub fn config(&self) -> &ToleranceConfig {
        &self.config
    }

    /// Run the whole pipeline.
    pub fn perform(&self) -> Result<NetworkSurface> {
        let bsa = BSplineAlgorithms::from_config(&self.config);

        let mut profiles = self.profiles.clone();
        let mut guides = self.guides.clone();
        for curve in profiles.iter_mut().chain(guides.iter_mut()) {
            BSplineAlgorithms::reparametrize_bspline(curve, 0.0, 1.0, self.config.tol_par)?;
        }

        // the seam of closed guides may double a profile, so intersect transposed
        let (params_profiles, params_guides) = if guides.iter().all(Curve::is_closed) {
            let (m_v, m_u) = self.compute_intersections(&bsa, &guides, &mut profiles, CurveFamily::Guide)?;
            (transpose(&m_u), transpose(&m_v))
        } else {
            self.compute_intersections(&bsa, &profiles, &mut guides, CurveFamily::Profile)?
        };
        info!(
            profiles = profiles.len(),
            guides = guides.len(),
            "computed network intersections"
        );

        self.finish(&bsa, profiles, guides, params_profiles, params_guides)
    }

    fn finish(
        &self,
        bsa: &BSplineAlgorithms,
        profiles: Vec<BSplineCurve>,
        guides: Vec<BSplineCurve>,
        params_profiles: Vec<Vec<f64>>,
        params_guides: Vec<Vec<f64>>,
    ) -> Result<NetworkSurface> {
        let mut sorter = CurveNetworkSorter::new(profiles, guides, params_profiles, params_guides)?;
        sorter.perform()?;
        let SortedNetwork {
            profiles,
            guides,
            mut params_profiles,
            mut params_guides,
            profile_tags,
            guide_tags,
        } = sorter.into_network();
        info!(
            profiles = %join(&profile_tags),
            guides = %join(&guide_tags),
            "sorted curve network"
        );
        self.report(ProgressStage::Sorting, 1.0);

        let tol = self.config.tol_3d;
        snap_boundaries(&mut params_profiles, &mut params_guides, tol);

        let (n_profiles, n_guides) = (profiles.len(), guides.len());
        let mut params_u: Vec<f64> = (0..n_guides)
            .map(|j| params_profiles.iter().map(|row| row[j]).sum::<f64>() / n_profiles as f64)
            .collect();
        let mut params_v: Vec<f64> = params_guides
            .iter()
            .map(|row| row.iter().sum::<f64>() / n_guides as f64)
            .collect();
        snap_ends(&mut params_u, tol);
        snap_ends(&mut params_v, tol);
        if params_u[0] > tol || params_v[0] > tol {
            return Err(GordonError::IncompatibleParameterRange(format!(
                "the network does not start at a common corner: first parameters u = {:.3e}, v = {:.3e}",
                params_u[0], params_v[0]
            )));
        }
        debug!(?params_u, ?params_v, "averaged intersection parameters");

        let max_ctrl = self.config.max_ctrl_pts;
        let ncp_u = control_point_count(&profiles, n_guides, max_ctrl);
        let ncp_v = control_point_count(&guides, n_profiles, max_ctrl);

        let total = (n_profiles + n_guides) as f64;
        let done = AtomicUsize::new(0);
        let tick = || {
            let finished = done.fetch_add(1, Ordering::Relaxed) + 1;
            self.report(ProgressStage::Reparametrization, finished as f64 / total);
        };

        let profiles = profiles
            .par_iter()
            .zip(params_profiles.par_iter())
            .enumerate()
            .map(|(i, (curve, old))| {
                let result = bsa
                    .reparametrize_bspline_continuously_approx(curve, old, &params_u, ncp_u)
                    .map_err(|e| e.in_reparametrization(CurveFamily::Profile, i));
                tick();
                result
            })
            .collect::<Result<Vec<_>>>()?;

        let guides = guides
            .par_iter()
            .enumerate()
            .map(|(j, curve)| {
                let old: Vec<f64> = params_guides.iter().map(|row| row[j]).collect();
                let result = bsa
                    .reparametrize_bspline_continuously_approx(curve, &old, &params_v, ncp_v)
                    .map_err(|e| e.in_reparametrization(CurveFamily::Guide, j));
                tick();
                result
            })
            .collect::<Result<Vec<_>>>()?;
        info!(ncp_u, ncp_v, "reparametrized curve network");

        let builder = GordonSurfaceBuilder::new(profiles, guides, params_u, params_v, self.config)?;
        self.report(ProgressStage::Surface, 1.0);

        Ok(NetworkSurface {
            builder,
            profile_tags,
            guide_tags,
        })
    }

    /// Parameter matrices of the crossings, first on `rows` then on `columns`,
    /// both indexed `[row][column]`.
    ///
    /// When the rows are closed a column through their seam is doubled if it
    /// was given only once.
    fn compute_intersections(
        &self,
        bsa: &BSplineAlgorithms,
        rows: &[BSplineCurve],
        columns: &mut Vec<BSplineCurve>,
        row_family: CurveFamily,
    ) -> Result<(Vec<Vec<f64>>, Vec<Vec<f64>>)> {
        let tol = self.config.tol_3d;
        let mut cells = Vec::with_capacity(rows.len());
        for (i, row) in rows.iter().enumerate() {
            let mut line = Vec::with_capacity(columns.len());
            for (j, column) in columns.iter().enumerate() {
                let (profile, guide) = match row_family {
                    CurveFamily::Profile => (i, j),
                    CurveFamily::Guide => (j, i),
                };
                line.push(single_intersection(bsa, row, column, profile, guide, tol)?);
            }
            cells.push(line);
            self.report(ProgressStage::Intersections, (i + 1) as f64 / rows.len() as f64);
        }

        // only the seam of the rows is resolved; stray seams of single curves keep the lower crossing
        let rows_closed = rows.iter().all(Curve::is_closed);
        let seam_columns: Vec<usize> = (0..columns.len())
            .filter(|&j| rows_closed && cells.iter().any(|line: &Vec<Intersection>| line[j].is_seam()))
            .collect();
        let upper_seam = match seam_columns.as_slice() {
            [] => None,
            [only] => {
                columns.push(columns[*only].clone());
                for line in &mut cells {
                    let copy = line[*only];
                    line.push(copy);
                }
                debug!(column = *only, "doubled the curve through the seam");
                Some(columns.len() - 1)
            }
            [_, upper] => Some(*upper),
            more => {
                return Err(GordonError::InvalidInput(format!(
                    "{} curves pass through the seam of the closed family, expected at most two",
                    more.len()
                )))
            }
        };

        let mut on_rows = vec![vec![0.0; columns.len()]; rows.len()];
        let mut on_columns = vec![vec![0.0; columns.len()]; rows.len()];
        for (i, line) in cells.iter().enumerate() {
            for (j, cell) in line.iter().enumerate() {
                let (u, v) = match *cell {
                    Intersection::Single { u, v } | Intersection::Projected { u, v, .. } => (u, v),
                    Intersection::SeamDouble { first, second } => {
                        if upper_seam == Some(j) {
                            second
                        } else {
                            first
                        }
                    }
                };
                on_rows[i][j] = u;
                on_columns[i][j] = v;
            }
        }
        debug!(%row_family, ?on_rows, ?on_columns, "intersection parameters");
        Ok((on_rows, on_columns))
    }

    fn report(&self, stage: ProgressStage, fraction: f64) {
        if let Some(callback) = &self.progress {
            callback(stage, fraction.clamp(0.0, 1.0));
        }
    }
}

/// Result of [`InterpolateCurveNetwork::perform`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkSurface {
    builder: GordonSurfaceBuilder,
    profile_tags: Vec<CurveTag>,
    guide_tags: Vec<CurveTag>,
}

impl NetworkSurface {
    pub fn surface(&self) -> &BSplineSurface {
        self.builder.surface_gordon()
    }

    pub fn surface_profiles(&self) -> &BSplineSurface {
        self.builder.surface_profiles()
    }

    pub fn surface_guides(&self) -> &BSplineSurface {
        self.builder.surface_guides()
    }

    pub fn surface_intersections(&self) -> &BSplineSurface {
        self.builder.surface_intersections()
    }

    /// Parameters at which the profiles meet the guides.
    pub fn parameters_profiles(&self) -> &[f64] {
        self.builder.params_u()
    }

    /// Parameters at which the guides meet the profiles.
    pub fn parameters_guides(&self) -> &[f64] {
        self.builder.params_v()
    }

    /// The sorted and reparametrized curves.
    pub fn curve_network(&self) -> (&[BSplineCurve], &[BSplineCurve]) {
        self.builder.curve_network()
    }

    /// Input position and orientation of every sorted profile.
    pub fn profile_tags(&self) -> &[CurveTag] {
        &self.profile_tags
    }

    pub fn guide_tags(&self) -> &[CurveTag] {
        &self.guide_tags
    }

    pub fn into_surface(self) -> BSplineSurface {
        self.builder.into_surface()
    }
}

/// Gordon surface through `profiles` and `guides`.
pub fn interpolate_curve_network(
    profiles: Vec<BSplineCurve>,
    guides: Vec<BSplineCurve>,
    config: ToleranceConfig,
) -> Result<BSplineSurface> {
    Ok(InterpolateCurveNetwork::new(profiles, guides, config)?
        .perform()?
        .into_surface())
}

fn single_intersection(
    bsa: &BSplineAlgorithms,
    row: &BSplineCurve,
    column: &BSplineCurve,
    profile: usize,
    guide: usize,
    tol_3d: f64,
) -> Result<Intersection> {
    let mut found = bsa.intersections(row, column, tol_3d);
    match found.len() {
        0 => {
            let closest = closest_points(row, column);
            Err(GordonError::NoIntersection {
                profile,
                guide,
                distance: closest.distance,
                tolerance: tol_3d * 0.5 * (row.scale() + column.scale()),
            })
        }
        1 => Ok(found.remove(0)),
        count => Err(GordonError::TooManyIntersections {
            profile,
            guide,
            count,
        }),
    }
}

/// Poles for the refit of a family crossed by `n_crossing` curves.
fn control_point_count(curves: &[BSplineCurve], n_crossing: usize, max_ctrl_pts: usize) -> usize {
    let lower = (n_crossing + 2).max(MIN_CTRL_PTS);
    let upper = lower.max(max_ctrl_pts);
    let most = curves.iter().map(BSplineCurve::ncp).max().unwrap_or(0);
    (most + EXTRA_CTRL_PTS).min(upper).max(lower)
}

/// Snap the first and last crossing of every curve onto the domain ends.
fn snap_boundaries(params_profiles: &mut [Vec<f64>], params_guides: &mut [Vec<f64>], tol: f64) {
    for row in params_profiles.iter_mut() {
        snap_ends(row, tol);
    }
    let n_guides = params_guides.first().map_or(0, Vec::len);
    for j in 0..n_guides {
        let mut column: Vec<f64> = params_guides.iter().map(|row| row[j]).collect();
        snap_ends(&mut column, tol);
        for (row, value) in params_guides.iter_mut().zip(column) {
            row[j] = value;
        }
    }
}

fn snap_ends(values: &mut [f64], tol: f64) {
    if let Some(first) = values.first_mut() {
        if first.abs() < tol {
            *first = 0.0;
        }
    }
    if let Some(last) = values.last_mut() {
        if (*last - 1.0).abs() < tol {
            *last = 1.0;
        }
    }
}

fn transpose(matrix: &[Vec<f64>]) -> Vec<Vec<f64>> {
    let cols = matrix.first().map_or(0, Vec::len);
    (0..cols).map(|j| matrix.iter().map(|row| row[j]).collect()).collect()
}

fn join(tags: &[CurveTag]) -> String {
    tags.iter().map(ToString::to_string).collect::<Vec<_>>().join(" ")
}
