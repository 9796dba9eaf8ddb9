//! Surface traits and implementations.

mod bspline;
mod view;

use gordon_math::Point3;
use serde::{Deserialize, Serialize};

pub use bspline::BSplineSurface;
pub use view::SurfaceView;

/// Parametric direction of a tensor-product surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    U,
    V,
}

/// Trait for parametric surfaces in 3D space.
pub trait Surface: Send + Sync {
    /// Evaluate the surface at parameters `(u, v)`.
    fn point_at(&self, u: f64, v: f64) -> Point3;

    /// Return the u-parameter domain `(u_min, u_max)`.
    fn domain_u(&self) -> (f64, f64);

    /// Return the v-parameter domain `(v_min, v_max)`.
    fn domain_v(&self) -> (f64, f64);
}
