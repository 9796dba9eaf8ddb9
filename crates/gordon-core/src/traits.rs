use crate::error::Result;

/// Check the structural invariants of a spline (knot count, monotone knots,
/// multiplicities, positive weights).
pub trait Validate {
    fn validate(&self) -> Result<()>;

    fn is_valid(&self) -> bool {
        self.validate().is_ok()
    }
}

/// Axis-aligned bounds of a control net; a spline lies inside the bounds of its poles.
pub trait BoundingBox {
    type Point;
    fn bounding_box(&self) -> (Self::Point, Self::Point);
}
