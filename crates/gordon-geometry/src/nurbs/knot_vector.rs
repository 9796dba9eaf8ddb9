//! Symbolic knot vector manipulation and point parameterization.

use gordon_core::{GordonError, Result};
use gordon_math::Point3;
use serde::{Deserialize, Serialize};

/// A non-decreasing flat knot sequence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KnotVector(Vec<f64>);

impl KnotVector {
    pub fn new(mut knots: Vec<f64>) -> Result<Self> {
        if knots.len() < 2 {
            return Err(GordonError::InvalidInput(format!(
                "knot vector needs at least 2 values, got {}",
                knots.len()
            )));
        }
        if knots.iter().any(|k| !k.is_finite()) {
            return Err(GordonError::InvalidInput("knot vector contains non-finite values".into()));
        }
        knots.sort_by(f64::total_cmp);
        Ok(Self(knots))
    }

    /// Expand distinct knots and their multiplicities into a flat sequence.
    pub fn from_knots_mults(knots: &[f64], mults: &[usize]) -> Result<Self> {
        if knots.len() != mults.len() {
            return Err(GordonError::InvalidInput(format!(
                "{} knots but {} multiplicities",
                knots.len(),
                mults.len()
            )));
        }
        if knots.windows(2).any(|w| w[1] <= w[0]) {
            return Err(GordonError::InvalidInput("distinct knots must be strictly increasing".into()));
        }
        let flat = knots
            .iter()
            .zip(mults)
            .flat_map(|(&k, &m)| std::iter::repeat(k).take(m))
            .collect();
        Self::new(flat)
    }

    /// Clamped knot vector on [0, 1] with `ncp - degree - 1` uniform interior knots.
    pub fn uniform(degree: usize, ncp: usize) -> Result<Self> {
        if degree == 0 || degree >= ncp {
            return Err(GordonError::InvalidInput(format!(
                "uniform knots need 0 < degree < ncp, got degree {degree} and {ncp} poles"
            )));
        }
        let n_inner = ncp - degree - 1;
        let mut knots = vec![0.0; degree + 1];
        knots.extend((1..=n_inner).map(|k| k as f64 / (n_inner + 1) as f64));
        knots.extend(std::iter::repeat(1.0).take(degree + 1));
        Ok(Self(knots))
    }

    /// Cumulative parameter sequence of a point list (not normalized).
    ///
    /// `alpha` is the parameterization factor: 0 uniform, 0.5 centripetal,
    /// 1 chord length. With `force_closed` the first point is appended when
    /// the sequence is open.
    pub fn from_points(points: &[Point3], alpha: f64, force_closed: bool) -> Result<Self> {
        let mut pts = points.to_vec();
        if force_closed {
            if let (Some(&first), Some(&last)) = (pts.first(), pts.last()) {
                if first.distance(last) > 1e-7 {
                    pts.push(first);
                }
            }
        }
        let mut params = Vec::with_capacity(pts.len());
        let mut acc = 0.0;
        params.push(acc);
        for w in pts.windows(2) {
            acc += w[0].distance(w[1]).powf(alpha);
            params.push(acc);
        }
        Self::new(params)
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.0
    }

    pub fn into_vec(self) -> Vec<f64> {
        self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn first(&self) -> f64 {
        self.0[0]
    }

    pub fn last(&self) -> f64 {
        self.0[self.0.len() - 1]
    }

    /// Mirror the knots inside their range: `k' = first + last - k`.
    pub fn reverse(&self) -> Self {
        let (lo, hi) = (self.first(), self.last());
        Self(self.0.iter().rev().map(|&k| hi + lo - k).collect())
    }

    /// Image of parameter `param` under [`KnotVector::reverse`].
    pub fn reversed_param(&self, param: f64) -> f64 {
        self.first() + self.last() - param
    }

    /// Affine remap onto [0, 1].
    pub fn normalize(&self) -> Result<Self> {
        self.scale(1.0)
    }

    /// Affine remap onto [0, length].
    pub fn scale(&self, length: f64) -> Result<Self> {
        if !(length > 0.0) {
            return Err(GordonError::InvalidInput(format!("cannot scale knots to length {length}")));
        }
        self.transpose(0.0, length)
    }

    /// Affine remap onto [u0, u1].
    pub fn transpose(&self, u0: f64, u1: f64) -> Result<Self> {
        if u0 > u1 {
            return Err(GordonError::InvalidInput(format!("transpose range [{u0}, {u1}] is reversed")));
        }
        let (lo, hi) = (self.first(), self.last());
        let range = hi - lo;
        if range <= 0.0 {
            return Err(GordonError::InvalidInput("knot vector has an empty range".into()));
        }
        Ok(Self(
            self.0
                .iter()
                .map(|&k| u0 + (u1 - u0) * (k - lo) / range)
                .collect(),
        ))
    }

    /// Distinct knot values and their multiplicities, clustering values closer than `tol`.
    pub fn unique_with_mults(&self, tol: f64) -> Vec<(f64, usize)> {
        unique_with_mults(&self.0, tol)
    }

    pub fn unique_knots(&self, tol: f64) -> Vec<f64> {
        self.unique_with_mults(tol).into_iter().map(|(k, _)| k).collect()
    }

    pub fn multiplicities(&self, tol: f64) -> Vec<usize> {
        self.unique_with_mults(tol).into_iter().map(|(_, m)| m).collect()
    }

    /// Locate `knot` within `tol`: index of its first occurrence and its multiplicity.
    pub fn find(&self, knot: f64, tol: f64) -> Option<(usize, usize)> {
        let start = self.0.iter().position(|&k| (k - knot).abs() <= tol)?;
        let mult = self.0[start..]
            .iter()
            .take_while(|&&k| (k - knot).abs() <= tol)
            .count();
        Some((start, mult))
    }
}

/// Distinct values of a sorted knot slice and their multiplicities.
///
/// A knot within `tol` of the previous distinct value joins its cluster.
pub fn unique_with_mults(knots: &[f64], tol: f64) -> Vec<(f64, usize)> {
    let mut out: Vec<(f64, usize)> = Vec::new();
    for &k in knots {
        match out.last_mut() {
            Some((value, mult)) if (k - *value).abs() <= tol => *mult += 1,
            _ => out.push((k, 1)),
        }
    }
    out
}

/// Normalized parameters of a point sequence, first 0 and last exactly 1.
///
/// See [`KnotVector::from_points`] for `alpha` and `force_closed`.
pub fn parameterization(points: &[Point3], alpha: f64, force_closed: bool) -> Result<Vec<f64>> {
    if points.len() < 2 {
        return Err(GordonError::InvalidInput(format!(
            "parameterization needs at least 2 points, got {}",
            points.len()
        )));
    }
    let raw = KnotVector::from_points(points, alpha, force_closed)?;
    let total = raw.last();
    let n = raw.len();
    if total <= 0.0 {
        // Coincident points: fall back to uniform spacing.
        return Ok((0..n).map(|i| i as f64 / (n - 1) as f64).collect());
    }
    let mut params: Vec<f64> = raw.as_slice().iter().map(|&p| p / total).collect();
    params[n - 1] = 1.0;
    Ok(params)
}

#[cfg(test)]
mod tests {
    use super::*;
    use gordon_math::DVec3;

    #[test]
    fn test_reverse_twice_is_identity() {
        let kv = KnotVector::new(vec![0.0, 0.0, 0.2, 0.7, 3.0, 3.0]).unwrap();
        let rev = kv.reverse();
        let expected = [0.0, 0.0, 2.3, 2.8, 3.0, 3.0];
        for (a, b) in rev.as_slice().iter().zip(expected) {
            assert!((a - b).abs() < 1e-14);
        }
        let back = rev.reverse();
        for (a, b) in back.as_slice().iter().zip(kv.as_slice()) {
            assert!((a - b).abs() < 1e-14);
        }
        assert!((kv.reversed_param(0.2) - 2.8).abs() < 1e-14);
    }

    #[test]
    fn test_scale_is_independent_of_previous_scale() {
        let kv = KnotVector::new(vec![1.0, 1.0, 2.0, 4.0, 4.0]).unwrap();
        let direct = kv.scale(5.0).unwrap();
        let chained = kv.scale(2.0).unwrap().scale(5.0).unwrap();
        for (a, b) in direct.as_slice().iter().zip(chained.as_slice()) {
            assert!((a - b).abs() < 1e-14);
        }
        assert!(kv.scale(0.0).is_err());
        let t = kv.transpose(-1.0, 1.0).unwrap();
        assert_eq!(t.first(), -1.0);
        assert_eq!(t.last(), 1.0);
        assert!(kv.transpose(1.0, 0.0).is_err());
    }

    #[test]
    fn test_uniques_and_find() {
        let kv = KnotVector::from_knots_mults(&[0.0, 0.5, 1.0], &[3, 2, 3]).unwrap();
        assert_eq!(kv.len(), 8);
        assert_eq!(kv.unique_knots(1e-10), vec![0.0, 0.5, 1.0]);
        assert_eq!(kv.multiplicities(1e-10), vec![3, 2, 3]);
        assert_eq!(kv.find(0.5 + 1e-12, 1e-10), Some((3, 2)));
        assert_eq!(kv.find(0.25, 1e-10), None);
    }

    #[test]
    fn test_uniform() {
        let kv = KnotVector::uniform(2, 5).unwrap();
        assert_eq!(kv.len(), 8);
        assert_eq!(kv.unique_knots(1e-12).len(), 4);
        assert!(KnotVector::uniform(3, 3).is_err());
    }

    #[test]
    fn test_parameterization_bounds() {
        let pts = vec![
            DVec3::new(0.0, 0.0, 0.0),
            DVec3::new(1.0, 0.0, 0.0),
            DVec3::new(1.0, 4.0, 0.0),
            DVec3::new(2.0, 4.0, 1.0),
        ];
        for &alpha in &[0.0, 0.5, 1.0] {
            let params = parameterization(&pts, alpha, false).unwrap();
            assert_eq!(params.len(), 4);
            assert_eq!(params[0], 0.0);
            assert_eq!(params[3], 1.0);
            assert!(params.windows(2).all(|w| w[1] > w[0]));
        }
        let uniform = parameterization(&pts, 0.0, false).unwrap();
        assert!((uniform[1] - 1.0 / 3.0).abs() < 1e-14);

        let closed = parameterization(&pts, 1.0, true).unwrap();
        assert_eq!(closed.len(), 5);
    }
}
