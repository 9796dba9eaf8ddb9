//! Rational tensor-product B-spline surfaces.

use gordon_core::traits::{BoundingBox, Validate};
use gordon_core::{GordonError, Result};
use gordon_math::{DVec4, Point3};
use serde::{Deserialize, Serialize};

use super::{Direction, Surface};
use crate::curve::{validate_direction, BSplineCurve};
use crate::nurbs::deboor::{self, curve_hpoint, from_homogeneous, to_homogeneous};
use crate::nurbs::elevate::elevate_polygons;
use crate::spline::refine_polygons;

/// A clamped, possibly rational B-spline surface.
///
/// `control_points[i][j]` is the control point at row `i` (u-direction) and column `j` (v-direction).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BSplineSurface {
    pub degree_u: usize,
    pub degree_v: usize,
    pub knots_u: Vec<f64>,
    pub knots_v: Vec<f64>,
    pub control_points: Vec<Vec<Point3>>,
    pub weights: Vec<Vec<f64>>,
    pub periodic_u: bool,
    pub periodic_v: bool,
}

impl BSplineSurface {
    /// Non-rational surface (all weights 1).
    pub fn new(
        degree_u: usize,
        degree_v: usize,
        knots_u: Vec<f64>,
        knots_v: Vec<f64>,
        control_points: Vec<Vec<Point3>>,
    ) -> Result<Self> {
        let weights = control_points.iter().map(|row| vec![1.0; row.len()]).collect();
        Self::new_rational(degree_u, degree_v, knots_u, knots_v, control_points, weights)
    }

    pub fn new_rational(
        degree_u: usize,
        degree_v: usize,
        knots_u: Vec<f64>,
        knots_v: Vec<f64>,
        control_points: Vec<Vec<Point3>>,
        weights: Vec<Vec<f64>>,
    ) -> Result<Self> {
        let surface = Self {
            degree_u,
            degree_v,
            knots_u,
            knots_v,
            control_points,
            weights,
            periodic_u: false,
            periodic_v: false,
        };
        surface.validate()?;
        Ok(surface)
    }

    /// Build from homogeneous poles `(w*x, w*y, w*z, w)`.
    pub fn from_hgrid(
        degree_u: usize,
        degree_v: usize,
        knots_u: Vec<f64>,
        knots_v: Vec<f64>,
        hgrid: &[Vec<DVec4>],
    ) -> Result<Self> {
        let (control_points, weights) = split_hgrid(hgrid);
        Self::new_rational(degree_u, degree_v, knots_u, knots_v, control_points, weights)
    }

    pub fn with_periodic(mut self, periodic_u: bool, periodic_v: bool) -> Self {
        self.periodic_u = periodic_u;
        self.periodic_v = periodic_v;
        self
    }

    pub fn nb_u_poles(&self) -> usize {
        self.control_points.len()
    }

    pub fn nb_v_poles(&self) -> usize {
        self.control_points.first().map_or(0, Vec::len)
    }

    pub fn degree(&self, direction: Direction) -> usize {
        match direction {
            Direction::U => self.degree_u,
            Direction::V => self.degree_v,
        }
    }

    pub fn knots(&self, direction: Direction) -> &[f64] {
        match direction {
            Direction::U => &self.knots_u,
            Direction::V => &self.knots_v,
        }
    }

    pub fn is_periodic(&self, direction: Direction) -> bool {
        match direction {
            Direction::U => self.periodic_u,
            Direction::V => self.periodic_v,
        }
    }

    pub fn is_rational(&self) -> bool {
        let w0 = self.weights[0][0];
        self.weights.iter().flatten().any(|&w| (w - w0).abs() > 1e-12)
    }

    pub fn pole(&self, i: usize, j: usize) -> Option<Point3> {
        self.control_points.get(i)?.get(j).copied()
    }

    /// Replace one pole, keeping its weight.
    pub fn set_pole(&mut self, i: usize, j: usize, point: Point3) -> Result<()> {
        let (nu, nv) = (self.nb_u_poles(), self.nb_v_poles());
        let pole = self
            .control_points
            .get_mut(i)
            .and_then(|row| row.get_mut(j))
            .ok_or_else(|| GordonError::Geometry(format!("pole ({i}, {j}) outside the {nu}x{nv} net")))?;
        *pole = point;
        Ok(())
    }

    pub fn hgrid(&self) -> Vec<Vec<DVec4>> {
        self.control_points
            .iter()
            .zip(&self.weights)
            .map(|(row, wrow)| row.iter().zip(wrow).map(|(&p, &w)| to_homogeneous(p, w)).collect())
            .collect()
    }

    fn set_hgrid(&mut self, hgrid: &[Vec<DVec4>]) {
        let (control_points, weights) = split_hgrid(hgrid);
        self.control_points = control_points;
        self.weights = weights;
    }

    /// Homogeneous control polygons running along `direction`.
    pub(crate) fn polygons(&self, direction: Direction) -> Vec<Vec<DVec4>> {
        let grid = self.hgrid();
        match direction {
            Direction::V => grid,
            Direction::U => transpose(&grid),
        }
    }

    pub(crate) fn set_polygons(&mut self, direction: Direction, polygons: &[Vec<DVec4>]) {
        match direction {
            Direction::V => self.set_hgrid(polygons),
            Direction::U => self.set_hgrid(&transpose(polygons)),
        }
    }

    fn set_knots_in(&mut self, direction: Direction, knots: Vec<f64>) {
        match direction {
            Direction::U => self.knots_u = knots,
            Direction::V => self.knots_v = knots,
        }
    }

    /// Insert `knot` in one direction up to multiplicity `mult`.
    pub fn insert_knot(&mut self, direction: Direction, knot: f64, mult: usize, tol: f64) -> Result<()> {
        let degree = self.degree(direction);
        let mut polygons = self.polygons(direction);
        let knots = refine_polygons(degree, self.knots(direction), &mut polygons, knot, mult, tol)?;
        self.set_knots_in(direction, knots);
        self.set_polygons(direction, &polygons);
        Ok(())
    }

    /// Raise the degrees to `(degree_u, degree_v)`; the geometry is unchanged.
    pub fn elevate_degree(&mut self, degree_u: usize, degree_v: usize) -> Result<()> {
        for (direction, target) in [(Direction::U, degree_u), (Direction::V, degree_v)] {
            let degree = self.degree(direction);
            if target <= degree {
                continue;
            }
            let (knots, polygons) =
                elevate_polygons(degree, self.knots(direction), &self.polygons(direction), target - degree)?;
            match direction {
                Direction::U => self.degree_u = target,
                Direction::V => self.degree_v = target,
            }
            self.set_knots_in(direction, knots);
            self.set_polygons(direction, &polygons);
        }
        Ok(())
    }

    /// The same surface with the roles of u and v swapped.
    pub fn exchange_uv(&self) -> Self {
        Self {
            degree_u: self.degree_v,
            degree_v: self.degree_u,
            knots_u: self.knots_v.clone(),
            knots_v: self.knots_u.clone(),
            control_points: transpose(&self.control_points),
            weights: transpose(&self.weights),
            periodic_u: self.periodic_v,
            periodic_v: self.periodic_u,
        }
    }

    /// Iso-curve of constant `u`, running along v.
    pub fn u_iso(&self, u: f64) -> Result<BSplineCurve> {
        let poles: Vec<DVec4> = self
            .polygons(Direction::U)
            .iter()
            .map(|polygon| curve_hpoint(self.degree_u, &self.knots_u, polygon, u))
            .collect();
        BSplineCurve::from_hpoints(self.degree_v, self.knots_v.clone(), &poles, self.periodic_v)
    }

    /// Iso-curve of constant `v`, running along u.
    pub fn v_iso(&self, v: f64) -> Result<BSplineCurve> {
        let poles: Vec<DVec4> = self
            .hgrid()
            .iter()
            .map(|polygon| curve_hpoint(self.degree_v, &self.knots_v, polygon, v))
            .collect();
        BSplineCurve::from_hpoints(self.degree_u, self.knots_u.clone(), &poles, self.periodic_u)
    }
}

fn split_hgrid(hgrid: &[Vec<DVec4>]) -> (Vec<Vec<Point3>>, Vec<Vec<f64>>) {
    hgrid
        .iter()
        .map(|row| row.iter().map(|&h| from_homogeneous(h)).unzip::<_, _, Vec<Point3>, Vec<f64>>())
        .unzip()
}

fn transpose<T: Copy>(grid: &[Vec<T>]) -> Vec<Vec<T>> {
    let cols = grid.first().map_or(0, Vec::len);
    (0..cols).map(|j| grid.iter().map(|row| row[j]).collect()).collect()
}

impl Surface for BSplineSurface {
    fn point_at(&self, u: f64, v: f64) -> Point3 {
        deboor::nurbs_surface_point(
            self.degree_u,
            self.degree_v,
            &self.knots_u,
            &self.knots_v,
            &self.control_points,
            &self.weights,
            u,
            v,
        )
    }

    fn domain_u(&self) -> (f64, f64) {
        let p = self.degree_u;
        (self.knots_u[p], self.knots_u[self.knots_u.len() - p - 1])
    }

    fn domain_v(&self) -> (f64, f64) {
        let p = self.degree_v;
        (self.knots_v[p], self.knots_v[self.knots_v.len() - p - 1])
    }
}

impl Validate for BSplineSurface {
    fn validate(&self) -> Result<()> {
        let (nu, nv) = (self.nb_u_poles(), self.nb_v_poles());
        if self.control_points.iter().any(|row| row.len() != nv) {
            return Err(GordonError::InvalidInput("control net rows differ in length".into()));
        }
        if self.weights.len() != nu || self.weights.iter().any(|row| row.len() != nv) {
            return Err(GordonError::InvalidInput("weight grid does not match the control net".into()));
        }
        if self.weights.iter().flatten().any(|&w| !(w > 0.0)) {
            return Err(GordonError::InvalidInput("weights must be positive".into()));
        }
        validate_direction(self.degree_u, &self.knots_u, nu)?;
        validate_direction(self.degree_v, &self.knots_v, nv)
    }
}

impl BoundingBox for BSplineSurface {
    type Point = Point3;

    fn bounding_box(&self) -> (Point3, Point3) {
        let first = self.control_points[0][0];
        self.control_points
            .iter()
            .flatten()
            .fold((first, first), |(lo, hi), &p| (lo.min(p), hi.max(p)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::curve::Curve;
    use gordon_math::DVec3;

    fn bilinear_surface() -> BSplineSurface {
        BSplineSurface::new(
            1,
            1,
            vec![0.0, 0.0, 1.0, 1.0],
            vec![0.0, 0.0, 1.0, 1.0],
            vec![
                vec![DVec3::new(0.0, 0.0, 0.0), DVec3::new(1.0, 0.0, 0.0)],
                vec![DVec3::new(0.0, 1.0, 0.0), DVec3::new(1.0, 1.0, 0.0)],
            ],
        )
        .unwrap()
    }

    fn wavy_surface() -> BSplineSurface {
        let knots_u = vec![0.0, 0.0, 0.0, 0.5, 1.0, 1.0, 1.0];
        let knots_v = vec![0.0, 0.0, 0.0, 0.0, 1.0, 1.0, 1.0, 1.0];
        let control_points: Vec<Vec<DVec3>> = (0..4)
            .map(|i| {
                (0..4)
                    .map(|j| DVec3::new(i as f64, j as f64, ((i * 3 + j * 5) % 4) as f64 * 0.3))
                    .collect()
            })
            .collect();
        let weights: Vec<Vec<f64>> = (0..4)
            .map(|i| (0..4).map(|j| 1.0 + 0.1 * ((i + j) % 3) as f64).collect())
            .collect();
        BSplineSurface::new_rational(2, 3, knots_u, knots_v, control_points, weights).unwrap()
    }

    fn assert_same_surface(a: &BSplineSurface, b: &BSplineSurface, tol: f64) {
        for i in 0..=10 {
            for j in 0..=10 {
                let (u, v) = (i as f64 / 10.0, j as f64 / 10.0);
                let d = a.point_at(u, v).distance(b.point_at(u, v));
                assert!(d < tol, "surfaces differ by {} at ({}, {})", d, u, v);
            }
        }
    }

    #[test]
    fn test_bspline_surface_corners() {
        let surf = bilinear_surface();
        assert!(surf.point_at(0.0, 0.0).distance(DVec3::new(0.0, 0.0, 0.0)) < 1e-10);
        assert!(surf.point_at(1.0, 0.0).distance(DVec3::new(0.0, 1.0, 0.0)) < 1e-10);
        assert!(surf.point_at(0.0, 1.0).distance(DVec3::new(1.0, 0.0, 0.0)) < 1e-10);
        assert!(surf.point_at(0.5, 0.5).distance(DVec3::new(0.5, 0.5, 0.0)) < 1e-10);
    }

    #[test]
    fn test_insert_knot_in_both_directions() {
        let original = wavy_surface();
        let mut s = original.clone();
        s.insert_knot(Direction::U, 0.25, 2, 1e-10).unwrap();
        s.insert_knot(Direction::V, 0.6, 1, 1e-10).unwrap();
        assert_eq!(s.nb_u_poles(), original.nb_u_poles() + 2);
        assert_eq!(s.nb_v_poles(), original.nb_v_poles() + 1);
        assert_same_surface(&original, &s, 1e-12);
    }

    #[test]
    fn test_elevate_degree() {
        let original = wavy_surface();
        let mut s = original.clone();
        s.elevate_degree(4, 3).unwrap();
        assert_eq!((s.degree_u, s.degree_v), (4, 3));
        assert_eq!(s.knots_v, original.knots_v);
        assert_same_surface(&original, &s, 1e-10);
    }

    #[test]
    fn test_exchange_uv_and_isos() {
        let s = wavy_surface();
        let f = s.exchange_uv();
        assert!(f.point_at(0.3, 0.7).distance(s.point_at(0.7, 0.3)) < 1e-14);

        let iso_u = s.u_iso(0.3).unwrap();
        let iso_v = s.v_iso(0.7).unwrap();
        for k in 0..=5 {
            let t = k as f64 / 5.0;
            assert!(iso_u.point_at(t).distance(s.point_at(0.3, t)) < 1e-12);
            assert!(iso_v.point_at(t).distance(s.point_at(t, 0.7)) < 1e-12);
        }
    }

    #[test]
    fn test_poles_and_validation() {
        let mut s = bilinear_surface();
        assert_eq!(s.pole(1, 1), Some(DVec3::new(1.0, 1.0, 0.0)));
        assert_eq!(s.pole(2, 0), None);
        s.set_pole(1, 1, DVec3::new(1.0, 1.0, 1.0)).unwrap();
        assert!(s.set_pole(0, 5, DVec3::ZERO).is_err());
        assert!(s.point_at(1.0, 1.0).distance(DVec3::new(1.0, 1.0, 1.0)) < 1e-12);
        let (_, hi) = s.bounding_box();
        assert_eq!(hi, DVec3::new(1.0, 1.0, 1.0));
        assert!(!s.is_rational());
        assert!(wavy_surface().is_rational());

        let bad = BSplineSurface::new(1, 1, vec![0.0, 0.0, 1.0, 1.0], vec![0.0, 0.0, 1.0], s.control_points.clone());
        assert!(bad.is_err());
    }
}
