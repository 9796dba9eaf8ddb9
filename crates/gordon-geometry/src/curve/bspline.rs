//! Rational B-spline curves.

use gordon_core::traits::{BoundingBox, Validate};
use gordon_core::{GordonError, Result, ToleranceConfig};
use gordon_math::{DVec4, Point3, Vector3};
use serde::{Deserialize, Serialize};

use super::Curve;
use crate::nurbs::deboor::{self, from_homogeneous, to_homogeneous};
use crate::nurbs::elevate::elevate_polygons;
use crate::nurbs::knot_vector::{unique_with_mults, KnotVector};
use crate::spline::{refine_polygons, KnotSpline};

/// A clamped, possibly rational B-spline curve.
///
/// `periodic` marks a closed curve whose seam is at least C1; the
/// representation itself is always clamped, so the first and last poles
/// are the curve's end points.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BSplineCurve {
    pub degree: usize,
    pub knots: Vec<f64>,
    pub control_points: Vec<Point3>,
    pub weights: Vec<f64>,
    pub periodic: bool,
}

impl BSplineCurve {
    /// Non-rational curve (all weights 1).
    pub fn new(degree: usize, knots: Vec<f64>, control_points: Vec<Point3>) -> Result<Self> {
        let weights = vec![1.0; control_points.len()];
        Self::new_rational(degree, knots, control_points, weights)
    }

    pub fn new_rational(
        degree: usize,
        knots: Vec<f64>,
        control_points: Vec<Point3>,
        weights: Vec<f64>,
    ) -> Result<Self> {
        let curve = Self {
            degree,
            knots,
            control_points,
            weights,
            periodic: false,
        };
        curve.validate()?;
        Ok(curve)
    }

    /// Build from poles, distinct knots and their multiplicities.
    pub fn from_poles_mults_knots(
        poles: Vec<Point3>,
        mults: &[usize],
        knots: &[f64],
        degree: usize,
        weights: Option<Vec<f64>>,
        periodic: bool,
    ) -> Result<Self> {
        let flat = KnotVector::from_knots_mults(knots, mults)?.into_vec();
        let weights = weights.unwrap_or_else(|| vec![1.0; poles.len()]);
        let curve = Self::new_rational(degree, flat, poles, weights)?;
        Ok(curve.with_periodic(periodic))
    }

    pub(crate) fn from_hpoints(
        degree: usize,
        knots: Vec<f64>,
        hpoints: &[DVec4],
        periodic: bool,
    ) -> Result<Self> {
        let (control_points, weights) = hpoints.iter().map(|&h| from_homogeneous(h)).unzip();
        let curve = Self::new_rational(degree, knots, control_points, weights)?;
        Ok(curve.with_periodic(periodic))
    }

    /// Set the periodic flag; it only sticks on a closed curve.
    pub fn with_periodic(mut self, periodic: bool) -> Self {
        self.periodic = periodic && self.is_closed();
        self
    }

    pub fn ncp(&self) -> usize {
        self.control_points.len()
    }

    pub fn hpoints(&self) -> Vec<DVec4> {
        self.control_points
            .iter()
            .zip(&self.weights)
            .map(|(&p, &w)| to_homogeneous(p, w))
            .collect()
    }

    fn set_hpoints(&mut self, hpoints: &[DVec4]) {
        let (control_points, weights) = hpoints.iter().map(|&h| from_homogeneous(h)).unzip();
        self.control_points = control_points;
        self.weights = weights;
    }

    /// True when the weights are not all equal.
    pub fn is_rational(&self) -> bool {
        let w0 = self.weights[0];
        self.weights.iter().any(|&w| (w - w0).abs() > 1e-12)
    }

    pub fn first_param(&self) -> f64 {
        self.knots[self.degree]
    }

    pub fn last_param(&self) -> f64 {
        self.knots[self.ncp()]
    }

    pub fn start_point(&self) -> Point3 {
        self.control_points[0]
    }

    pub fn end_point(&self) -> Point3 {
        self.control_points[self.ncp() - 1]
    }

    /// Position and derivatives up to order `n` at `t`.
    pub fn derivatives(&self, t: f64, n: usize) -> Vec<Vector3> {
        deboor::nurbs_curve_derivs(self.degree, &self.knots, &self.control_points, &self.weights, t, n)
    }

    pub fn second_derivative(&self, t: f64) -> Vector3 {
        self.derivatives(t, 2)[2]
    }

    /// Replace the knot vector by one of the same length (re-scaling).
    pub fn set_knots(&mut self, knots: Vec<f64>) -> Result<()> {
        if knots.len() != self.knots.len() {
            return Err(GordonError::InvalidInput(format!(
                "expected {} knots, got {}",
                self.knots.len(),
                knots.len()
            )));
        }
        let old = std::mem::replace(&mut self.knots, knots);
        if let Err(e) = self.validate() {
            self.knots = old;
            return Err(e);
        }
        Ok(())
    }

    /// Copy with the knot vector mapped affinely onto [umin, umax].
    pub fn reparametrized(&self, umin: f64, umax: f64) -> Result<Self> {
        if !(umax > umin) {
            return Err(GordonError::InvalidInput(format!(
                "cannot reparametrize onto [{umin}, {umax}]"
            )));
        }
        let mut curve = self.clone();
        let knots = KnotVector::new(self.knots.clone())?.transpose(umin, umax)?;
        curve.set_knots(knots.into_vec())?;
        Ok(curve)
    }

    /// Raise the degree to `target`; the geometry is unchanged.
    pub fn elevate_degree(&mut self, target: usize) -> Result<()> {
        if target <= self.degree {
            return Ok(());
        }
        let (knots, mut polygons) =
            elevate_polygons(self.degree, &self.knots, &[self.hpoints()], target - self.degree)?;
        let polygon = polygons.pop().unwrap_or_default();
        self.degree = target;
        self.knots = knots;
        self.set_hpoints(&polygon);
        Ok(())
    }

    /// Trim the curve to [u1, u2].
    pub fn segment(&mut self, u1: f64, u2: f64) -> Result<()> {
        let (first, last) = (self.first_param(), self.last_param());
        if !(u1 < u2) || u1 < first || u2 > last {
            return Err(GordonError::Geometry(format!(
                "segment [{u1}, {u2}] is not inside [{first}, {last}]"
            )));
        }
        let p = self.degree;
        self.insert_knot(u1, p, 0.0)?;
        self.insert_knot(u2, p, 0.0)?;

        // u1 occupies the p knots ending at its last occurrence; u2 starts at `end`.
        let last_u1 = self.knots.iter().rposition(|&k| k == u1).unwrap_or(p);
        let start = last_u1 + 1 - p;
        let end = self.knots.iter().position(|&k| k == u2).unwrap_or(self.ncp());

        let mut knots = vec![u1; p + 1];
        knots.extend_from_slice(&self.knots[last_u1 + 1..end]);
        knots.extend(std::iter::repeat(u2).take(p + 1));
        let hpoints = self.hpoints()[start - 1..end].to_vec();

        self.knots = knots;
        self.set_hpoints(&hpoints);
        self.periodic = false;
        self.validate()
    }

    /// Replace one pole, keeping its weight.
    pub fn set_pole(&mut self, index: usize, point: Point3) -> Result<()> {
        let n = self.ncp();
        let pole = self
            .control_points
            .get_mut(index)
            .ok_or_else(|| GordonError::Geometry(format!("pole index {index} out of range 0..{n}")))?;
        *pole = point;
        Ok(())
    }

    /// The same curve traversed backwards; `t` maps to `first + last - t`.
    pub fn reversed(&self) -> Self {
        let lo = self.knots[0];
        let hi = self.knots[self.knots.len() - 1];
        Self {
            degree: self.degree,
            knots: self.knots.iter().rev().map(|&k| lo + hi - k).collect(),
            control_points: self.control_points.iter().rev().copied().collect(),
            weights: self.weights.iter().rev().copied().collect(),
            periodic: self.periodic,
        }
    }

    /// `n` points at evenly spaced parameters, both ends included.
    pub fn discretize(&self, n: usize) -> Vec<Point3> {
        let (a, b) = self.domain();
        let n = n.max(2);
        (0..n)
            .map(|i| self.point_at(a + (b - a) * i as f64 / (n - 1) as f64))
            .collect()
    }

    /// Size of the curve: maximum distance of a pole from the first pole.
    pub fn scale(&self) -> f64 {
        let first = self.control_points[0];
        self.control_points
            .iter()
            .map(|p| p.distance(first))
            .fold(0.0, f64::max)
    }
}

impl Curve for BSplineCurve {
    fn point_at(&self, t: f64) -> Point3 {
        deboor::nurbs_curve_point(self.degree, &self.knots, &self.control_points, &self.weights, t)
    }

    fn tangent_at(&self, t: f64) -> Vector3 {
        self.derivatives(t, 1)[1]
    }

    fn domain(&self) -> (f64, f64) {
        (self.first_param(), self.last_param())
    }

    fn is_closed(&self) -> bool {
        let tol = ToleranceConfig::KERNEL_LINEAR * self.scale().max(1.0);
        self.start_point().distance(self.end_point()) <= tol
    }
}

impl KnotSpline for BSplineCurve {
    fn degree(&self) -> usize {
        self.degree
    }

    fn flat_knots(&self) -> &[f64] {
        &self.knots
    }

    fn nb_poles(&self) -> usize {
        self.ncp()
    }

    fn is_periodic(&self) -> bool {
        self.periodic
    }

    fn insert_knot(&mut self, knot: f64, mult: usize, tol: f64) -> Result<()> {
        let mut polygons = [self.hpoints()];
        self.knots = refine_polygons(self.degree, &self.knots, &mut polygons, knot, mult, tol)?;
        self.set_hpoints(&polygons[0]);
        Ok(())
    }
}

impl Validate for BSplineCurve {
    fn validate(&self) -> Result<()> {
        validate_direction(self.degree, &self.knots, self.ncp())?;
        if self.weights.len() != self.ncp() {
            return Err(GordonError::InvalidInput(format!(
                "{} weights for {} poles",
                self.weights.len(),
                self.ncp()
            )));
        }
        if self.weights.iter().any(|&w| !(w > 0.0)) {
            return Err(GordonError::InvalidInput("weights must be positive".into()));
        }
        Ok(())
    }
}

impl BoundingBox for BSplineCurve {
    type Point = Point3;

    fn bounding_box(&self) -> (Point3, Point3) {
        let first = self.control_points[0];
        self.control_points
            .iter()
            .fold((first, first), |(lo, hi), &p| (lo.min(p), hi.max(p)))
    }
}

/// Structural checks shared by curves and surface directions: knot count,
/// monotonicity, clamped ends and interior multiplicities.
pub(crate) fn validate_direction(degree: usize, knots: &[f64], ncp: usize) -> Result<()> {
    if degree == 0 {
        return Err(GordonError::InvalidInput("degree must be at least 1".into()));
    }
    if ncp < degree + 1 {
        return Err(GordonError::InvalidInput(format!(
            "degree {degree} needs at least {} poles, got {ncp}",
            degree + 1
        )));
    }
    if knots.len() != ncp + degree + 1 {
        return Err(GordonError::InvalidInput(format!(
            "knot vector length must be n + p + 1, got {} knots for {ncp} poles with degree {degree}",
            knots.len()
        )));
    }
    if knots.iter().any(|k| !k.is_finite()) || knots.windows(2).any(|w| w[1] < w[0]) {
        return Err(GordonError::InvalidInput("knot vector is not non-decreasing".into()));
    }
    let groups = unique_with_mults(knots, 0.0);
    if groups.len() < 2 {
        return Err(GordonError::InvalidInput("knot vector has an empty range".into()));
    }
    let last = groups.len() - 1;
    for (i, &(k, m)) in groups.iter().enumerate() {
        let allowed = if i == 0 || i == last { degree + 1 } else { degree };
        if (i == 0 || i == last) && m != degree + 1 {
            return Err(GordonError::InvalidInput(format!(
                "end knot {k} has multiplicity {m}, clamped curves need {}",
                degree + 1
            )));
        }
        if m > allowed {
            return Err(GordonError::InvalidInput(format!(
                "interior knot {k} has multiplicity {m} above degree {degree}"
            )));
        }
    }
    Ok(())
}
