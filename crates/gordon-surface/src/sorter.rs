//! Orders and orients the curves of a network from their intersection
//! parameters.
//!
//! `params_profiles[i][j]` is the parameter on profile `i` where it meets
//! guide `j`, `params_guides[i][j]` the parameter on guide `j`. After sorting
//! profile 0 and guide 0 start at the same corner, the rows of
//! `params_profiles` and the columns of `params_guides` are ascending.

use std::fmt;

use gordon_core::{GordonError, Result};
use gordon_geometry::{BSplineCurve, Curve};
use serde::{Deserialize, Serialize};
use tracing::debug;

const SEAM_PARAM_EPS: f64 = 1e-12;

/// Original position of a curve, negated when it was reversed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CurveTag {
    pub index: usize,
    pub reversed: bool,
}

impl CurveTag {
    pub fn new(index: usize) -> Self {
        Self { index, reversed: false }
    }

    pub fn toggled(self) -> Self {
        Self {
            reversed: !self.reversed,
            ..self
        }
    }
}

impl fmt::Display for CurveTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.reversed {
            write!(f, "-{}", self.index)
        } else {
            write!(f, "{}", self.index)
        }
    }
}

/// A network after sorting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SortedNetwork {
    pub profiles: Vec<BSplineCurve>,
    pub guides: Vec<BSplineCurve>,
    pub params_profiles: Vec<Vec<f64>>,
    pub params_guides: Vec<Vec<f64>>,
    pub profile_tags: Vec<CurveTag>,
    pub guide_tags: Vec<CurveTag>,
}

#[derive(Debug, Clone)]
pub struct CurveNetworkSorter {
    profiles: Vec<BSplineCurve>,
    guides: Vec<BSplineCurve>,
    params_profiles: Vec<Vec<f64>>,
    params_guides: Vec<Vec<f64>>,
    profile_tags: Vec<CurveTag>,
    guide_tags: Vec<CurveTag>,
    performed: bool,
}

impl CurveNetworkSorter {
    pub fn new(
        profiles: Vec<BSplineCurve>,
        guides: Vec<BSplineCurve>,
        params_profiles: Vec<Vec<f64>>,
        params_guides: Vec<Vec<f64>>,
    ) -> Result<Self> {
        let (n_profiles, n_guides) = (profiles.len(), guides.len());
        if n_profiles < 2 || n_guides < 2 {
            return Err(GordonError::InvalidInput(format!(
                "a network needs at least two profiles and two guides, got {n_profiles} and {n_guides}"
            )));
        }
        for (name, matrix) in [("profile", &params_profiles), ("guide", &params_guides)] {
            if matrix.len() != n_profiles || matrix.iter().any(|row| row.len() != n_guides) {
                return Err(GordonError::InvalidInput(format!(
                    "{name} parameter matrix must be {n_profiles} x {n_guides}"
                )));
            }
        }

        Ok(Self {
            profiles,
            guides,
            params_profiles,
            params_guides,
            profile_tags: (0..n_profiles).map(CurveTag::new).collect(),
            guide_tags: (0..n_guides).map(CurveTag::new).collect(),
            performed: false,
        })
    }

    pub fn profiles(&self) -> &[BSplineCurve] {
        &self.profiles
    }

    pub fn guides(&self) -> &[BSplineCurve] {
        &self.guides
    }

    pub fn params_profiles(&self) -> &[Vec<f64>] {
        &self.params_profiles
    }

    pub fn params_guides(&self) -> &[Vec<f64>] {
        &self.params_guides
    }

    pub fn profile_tags(&self) -> &[CurveTag] {
        &self.profile_tags
    }

    pub fn guide_tags(&self) -> &[CurveTag] {
        &self.guide_tags
    }

    /// The profile and guide that start at the same corner, and whether that
    /// guide has to be reversed to start there.
    pub fn start_curve_indices(&self) -> Result<(usize, usize, bool)> {
        let n_profiles = self.profiles.len();
        for irow in 0..n_profiles {
            let jmin = min_row_index(&self.params_profiles, irow);
            if min_col_index(&self.params_guides, jmin) == irow {
                return Ok((irow, jmin, false));
            }
        }
        // a closed loop may only offer a profile start that meets a guide end
        for irow in 0..n_profiles {
            let jmin = min_row_index(&self.params_profiles, irow);
            if max_col_index(&self.params_guides, jmin) == irow {
                return Ok((irow, jmin, true));
            }
        }
        Err(GordonError::SortingFailed(
            "no profile and guide start at a common corner".into(),
        ))
    }

    pub fn perform(&mut self) -> Result<()> {
        if self.performed {
            return Ok(());
        }
        let (n_profiles, n_guides) = (self.profiles.len(), self.guides.len());

        let (prof_start, guide_start, reverse_guide) = self.start_curve_indices()?;
        self.swap_profiles(0, prof_start);
        self.swap_guides(0, guide_start);
        if reverse_guide {
            self.reverse_guide(0, false);
        }

        // guides ascending along the first profile
        for n in (2..=n_guides).rev() {
            for j in 1..n - 1 {
                if self.params_profiles[0][j] > self.params_profiles[0][j + 1] {
                    self.swap_guides(j, j + 1);
                }
            }
        }
        // profiles ascending along the first guide
        for n in (2..=n_profiles).rev() {
            for i in 1..n - 1 {
                if self.params_guides[i][0] > self.params_guides[i + 1][0] {
                    self.swap_profiles(i, i + 1);
                }
            }
        }

        // a seam-doubled closed row always runs from the seam start to the seam
        // end, so its direction is read from the interior crossings
        let seam_profiles = seam_doubled(&self.profiles, &self.params_profiles);
        for i in 1..n_profiles {
            let row = &self.params_profiles[i];
            let (a, b) = if seam_profiles { (1, n_guides - 2) } else { (0, n_guides - 1) };
            if row[a] > row[b] {
                self.reverse_profile(i, seam_profiles);
            }
        }
        let guide_columns = transpose(&self.params_guides);
        let seam_guides = seam_doubled(&self.guides, &guide_columns);
        for j in 1..n_guides {
            let (a, b) = if seam_guides { (1, n_profiles - 2) } else { (0, n_profiles - 1) };
            if self.params_guides[a][j] > self.params_guides[b][j] {
                self.reverse_guide(j, seam_guides);
            }
        }

        debug!(
            profiles = %join_tags(&self.profile_tags),
            guides = %join_tags(&self.guide_tags),
            "sorted curve network"
        );
        self.performed = true;
        Ok(())
    }

    pub fn into_network(self) -> SortedNetwork {
        SortedNetwork {
            profiles: self.profiles,
            guides: self.guides,
            params_profiles: self.params_profiles,
            params_guides: self.params_guides,
            profile_tags: self.profile_tags,
            guide_tags: self.guide_tags,
        }
    }

    fn swap_profiles(&mut self, a: usize, b: usize) {
        if a == b {
            return;
        }
        self.profiles.swap(a, b);
        self.profile_tags.swap(a, b);
        self.params_profiles.swap(a, b);
        self.params_guides.swap(a, b);
    }

    fn swap_guides(&mut self, a: usize, b: usize) {
        if a == b {
            return;
        }
        self.guides.swap(a, b);
        self.guide_tags.swap(a, b);
        for row in self.params_profiles.iter_mut().chain(self.params_guides.iter_mut()) {
            row.swap(a, b);
        }
    }

    /// Reverses profile `i`. With `keep_seam` the first and last crossings sit
    /// on the seam of a closed curve and stay where they are.
    fn reverse_profile(&mut self, i: usize, keep_seam: bool) {
        let reversed = self.profiles[i].reversed();
        let (first, last) = (reversed.first_param(), reversed.last_param());
        let row = &mut self.params_profiles[i];
        let n = row.len();
        let range = if keep_seam { 1..n - 1 } else { 0..n };
        for p in &mut row[range] {
            *p = first + last - *p;
        }
        self.profiles[i] = reversed;
        self.profile_tags[i] = self.profile_tags[i].toggled();
    }

    fn reverse_guide(&mut self, j: usize, keep_seam: bool) {
        let reversed = self.guides[j].reversed();
        let (first, last) = (reversed.first_param(), reversed.last_param());
        let n = self.params_guides.len();
        let range = if keep_seam { 1..n - 1 } else { 0..n };
        for row in &mut self.params_guides[range] {
            row[j] = first + last - row[j];
        }
        self.guides[j] = reversed;
        self.guide_tags[j] = self.guide_tags[j].toggled();
    }
}

/// Whether every curve is closed and crosses the other family at both ends
/// of its range, with at least one crossing in between.
fn seam_doubled(curves: &[BSplineCurve], params: &[Vec<f64>]) -> bool {
    curves.iter().zip(params).all(|(curve, row)| {
        let (first, last) = (curve.first_param(), curve.last_param());
        let eps = SEAM_PARAM_EPS * (last - first).abs().max(1.0);
        row.len() > 2
            && curve.is_closed()
            && (row[0] - first).abs() <= eps
            && (row[row.len() - 1] - last).abs() <= eps
    })
}

fn transpose(m: &[Vec<f64>]) -> Vec<Vec<f64>> {
    let cols = m.first().map_or(0, Vec::len);
    (0..cols).map(|j| m.iter().map(|row| row[j]).collect()).collect()
}

fn join_tags(tags: &[CurveTag]) -> String {
    tags.iter().map(ToString::to_string).collect::<Vec<_>>().join(" ")
}

/// Column of the first minimum of row `irow`.
fn min_row_index(m: &[Vec<f64>], irow: usize) -> usize {
    arg_best(m[irow].iter().copied(), |a, b| a < b)
}

/// Row of the first minimum of column `jcol`.
fn min_col_index(m: &[Vec<f64>], jcol: usize) -> usize {
    arg_best(m.iter().map(|row| row[jcol]), |a, b| a < b)
}

/// Row of the first maximum of column `jcol`.
fn max_col_index(m: &[Vec<f64>], jcol: usize) -> usize {
    arg_best(m.iter().map(|row| row[jcol]), |a, b| a > b)
}

fn arg_best(values: impl Iterator<Item = f64>, better: impl Fn(f64, f64) -> bool) -> usize {
    let mut best: Option<(usize, f64)> = None;
    for (i, v) in values.enumerate() {
        match best {
            Some((_, b)) if !better(v, b) => {}
            _ => best = Some((i, v)),
        }
    }
    best.map_or(0, |(i, _)| i)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::TAU;

    use gordon_geometry::{Circle, Curve, Line};
    use gordon_math::DVec3;

    fn line(i: usize) -> BSplineCurve {
        let x = i as f64;
        Line::new(DVec3::new(x, 0.0, 0.0), DVec3::new(x, 1.0, 0.0)).to_bspline().unwrap()
    }

    fn assert_sorted(network: &SortedNetwork) {
        for row in &network.params_profiles {
            assert!(row.windows(2).all(|w| w[0] <= w[1]), "{row:?}");
        }
        let n = network.params_guides.len();
        for j in 0..network.params_guides[0].len() {
            assert!((1..n).all(|i| network.params_guides[i - 1][j] <= network.params_guides[i][j]));
        }
    }

    #[test]
    fn test_reversed_guide_is_flipped_back() {
        let u = [0.0, 0.5, 1.0];
        let v = [0.0, 0.5, 1.0];
        let params_profiles = vec![u.to_vec(); 3];
        let params_guides: Vec<Vec<f64>> = v.iter().map(|&vi| vec![vi, 1.0 - vi, vi]).collect();
        let guides: Vec<BSplineCurve> = vec![line(0), line(1).reversed(), line(2)];

        let mut sorter =
            CurveNetworkSorter::new(vec![line(10), line(11), line(12)], guides, params_profiles, params_guides)
                .unwrap();
        sorter.perform().unwrap();
        let network = sorter.into_network();

        let tags: Vec<String> = network.guide_tags.iter().map(ToString::to_string).collect();
        assert_eq!(tags, ["0", "-1", "2"]);
        assert!(network.profile_tags.iter().all(|t| !t.reversed));
        assert_eq!(network.guides[1].start_point(), line(1).start_point());
        for (i, &vi) in v.iter().enumerate() {
            assert!((network.params_guides[i][1] - vi).abs() < 1e-15);
        }
        assert_sorted(&network);
    }

    #[test]
    fn test_shuffled_network_is_reordered() {
        // profiles supplied as [2, 0, 1], guides as [1, 2, 0] with guide 0 reversed
        let u = [0.0, 0.5, 1.0];
        let v = [0.0, 0.5, 1.0];
        let prof_order = [2, 0, 1];
        let guide_order = [1, 2, 0];
        let params_profiles: Vec<Vec<f64>> = prof_order
            .iter()
            .map(|_| guide_order.iter().map(|&g| u[g]).collect())
            .collect();
        let params_guides: Vec<Vec<f64>> = prof_order
            .iter()
            .map(|&p| {
                guide_order
                    .iter()
                    .map(|&g| if g == 0 { 1.0 - v[p] } else { v[p] })
                    .collect()
            })
            .collect();
        let profiles = prof_order.iter().map(|&p| line(10 + p)).collect();
        let guides = guide_order.iter().map(|&g| line(g)).collect();

        let mut sorter = CurveNetworkSorter::new(profiles, guides, params_profiles, params_guides).unwrap();
        assert_eq!(sorter.start_curve_indices().unwrap(), (0, 2, false));
        sorter.perform().unwrap();
        sorter.perform().unwrap();

        // tags are input positions; the corner found first makes v run from
        // profile 2 to profile 0, so the two unflipped guides get reversed
        let profile_tags: Vec<usize> = sorter.profile_tags().iter().map(|t| t.index).collect();
        assert_eq!(profile_tags, [0, 2, 1]);
        let guide_tags: Vec<String> = sorter.guide_tags().iter().map(ToString::to_string).collect();
        assert_eq!(guide_tags, ["2", "-0", "-1"]);
        assert_eq!(sorter.guides()[1].domain(), (0.0, 1.0));
        assert_sorted(&sorter.into_network());
    }

    #[test]
    fn test_reversed_closed_profile_keeps_seam_columns() {
        let ring = |z: f64| Circle::new(DVec3::new(0.0, 0.0, z), DVec3::Z, 1.0).to_bspline().unwrap();
        let profiles = vec![ring(0.0), ring(1.0).reversed(), ring(2.0)];
        // guide 4 is the seam guide again, met at the end of every ring
        let forward: Vec<f64> = (0..5).map(|k| TAU * k as f64 / 4.0).collect();
        let backward = vec![0.0, 0.75 * TAU, 0.5 * TAU, 0.25 * TAU, TAU];
        let params_profiles = vec![forward.clone(), backward, forward.clone()];
        let params_guides: Vec<Vec<f64>> = (0..3).map(|i| vec![0.5 * i as f64; 5]).collect();
        let guides = (0..5).map(line).collect();

        let mut sorter = CurveNetworkSorter::new(profiles, guides, params_profiles, params_guides).unwrap();
        sorter.perform().unwrap();
        let network = sorter.into_network();

        let tags: Vec<String> = network.profile_tags.iter().map(ToString::to_string).collect();
        assert_eq!(tags, ["0", "-1", "2"]);
        assert!(network.guide_tags.iter().all(|t| !t.reversed));
        for (p, q) in network.params_profiles[1].iter().zip(&forward) {
            assert!((p - q).abs() < 1e-12, "{:?}", network.params_profiles[1]);
        }
        assert!(network.profiles[1].start_point().distance(ring(1.0).start_point()) < 1e-12);
        let quarter = network.profiles[1].point_at(0.25 * TAU);
        assert!(quarter.distance(ring(1.0).point_at(0.25 * TAU)) < 1e-12);
        assert_sorted(&network);
    }

    #[test]
    fn test_network_without_corner_fails() {
        let params_profiles = vec![vec![0.0, 1.0, 1.0], vec![1.0, 0.0, 1.0], vec![1.0, 1.0, 0.0]];
        let params_guides = vec![vec![0.5, 1.0, 0.0], vec![0.0, 0.5, 1.0], vec![1.0, 0.0, 0.5]];
        let curves = || (0..3).map(line).collect::<Vec<_>>();
        let sorter = CurveNetworkSorter::new(curves(), curves(), params_profiles, params_guides).unwrap();
        assert!(matches!(sorter.start_curve_indices(), Err(GordonError::SortingFailed(_))));

        let err = CurveNetworkSorter::new(curves(), curves(), vec![vec![0.0; 3]; 2], vec![vec![0.0; 3]; 3])
            .unwrap_err();
        assert!(matches!(err, GordonError::InvalidInput(_)));
        assert_eq!(CurveTag::new(3).toggled().to_string(), "-3");
    }
}
