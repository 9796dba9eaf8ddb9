use crate::{Point3, Vector3};
use serde::{Deserialize, Serialize};

/// Axis-aligned bounding box in 3D space.
///
/// Used to prune polyline segment pairs before the exact closest-point
/// computation of curve/curve intersections.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Aabb3 {
    pub min: Point3,
    pub max: Point3,
}

impl Aabb3 {
    pub fn new(min: Point3, max: Point3) -> Self {
        Self { min, max }
    }

    pub fn from_points(points: &[Point3]) -> Option<Self> {
        let (&first, rest) = points.split_first()?;
        let (min, max) = rest
            .iter()
            .fold((first, first), |(lo, hi), &p| (lo.min(p), hi.max(p)));
        Some(Self { min, max })
    }

    /// Bounds of the straight segment `a`-`b`.
    pub fn from_segment(a: Point3, b: Point3) -> Self {
        Self {
            min: a.min(b),
            max: a.max(b),
        }
    }

    pub fn extents(&self) -> Vector3 {
        self.max - self.min
    }

    /// Length of the box diagonal.
    pub fn diagonal(&self) -> f64 {
        self.extents().length()
    }

    pub fn expand(&self, amount: f64) -> Self {
        let offset = Vector3::splat(amount);
        Self {
            min: self.min - offset,
            max: self.max + offset,
        }
    }

    /// Smallest distance between any two points of the boxes (0 when they overlap).
    pub fn distance_to(&self, other: &Self) -> f64 {
        let gap = (other.min - self.max).max(self.min - other.max).max(Vector3::ZERO);
        gap.length()
    }

    pub fn intersects(&self, other: &Self) -> bool {
        self.distance_to(other) == 0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::dvec3;

    #[test]
    fn test_from_points() {
        let pts = vec![dvec3(1.0, 2.0, 3.0), dvec3(-1.0, 5.0, 0.0), dvec3(3.0, -1.0, 2.0)];
        let aabb = Aabb3::from_points(&pts).unwrap();
        assert_eq!(aabb.min, dvec3(-1.0, -1.0, 0.0));
        assert_eq!(aabb.max, dvec3(3.0, 5.0, 3.0));
        assert!(Aabb3::from_points(&[]).is_none());
    }

    #[test]
    fn test_segment_box_distance() {
        let a = Aabb3::from_segment(dvec3(0.0, 0.0, 0.0), dvec3(1.0, 0.0, 0.0));
        let b = Aabb3::from_segment(dvec3(2.0, 1.0, 0.0), dvec3(3.0, 2.0, 0.0));
        assert!((a.distance_to(&b) - 2f64.sqrt()).abs() < 1e-12);
        assert!((b.distance_to(&a) - 2f64.sqrt()).abs() < 1e-12);
        assert!(!a.intersects(&b));
        assert!(a.expand(1.0).intersects(&b));
    }

    #[test]
    fn test_diagonal() {
        let aabb = Aabb3::new(dvec3(0.0, 0.0, 0.0), dvec3(3.0, 3.0, 3.0));
        assert!((aabb.diagonal() - 27f64.sqrt()).abs() < 1e-12);
        assert_eq!(aabb.extents(), dvec3(3.0, 3.0, 3.0));
    }
}
