//! Gordon geometry kernel: rational B-spline curves and surfaces.
//!
//! Everything works in homogeneous coordinates underneath so knot insertion,
//! degree elevation and interpolation are exact for rational input.

pub mod curve;
pub mod nurbs;
pub mod spline;
pub mod surface;

pub use curve::{
    closest_points, intersect_curves, BSplineCurve, Circle, Curve, CurveIntersection, Interpolation, Line,
    Projection,
};
pub use nurbs::{BSplineBasis, KnotVector};
pub use spline::KnotSpline;
pub use surface::{BSplineSurface, Direction, Surface, SurfaceView};
