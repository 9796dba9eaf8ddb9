use gordon_core::Result;

use super::{BSplineSurface, Direction};
use crate::spline::KnotSpline;

/// A surface presented as a spline along one of its directions.
pub enum SurfaceView<'a> {
    U(&'a mut BSplineSurface),
    V(&'a mut BSplineSurface),
}

impl<'a> SurfaceView<'a> {
    pub fn new(surface: &'a mut BSplineSurface, direction: Direction) -> Self {
        match direction {
            Direction::U => SurfaceView::U(surface),
            Direction::V => SurfaceView::V(surface),
        }
    }

    pub fn direction(&self) -> Direction {
        match self {
            SurfaceView::U(_) => Direction::U,
            SurfaceView::V(_) => Direction::V,
        }
    }

    pub fn surface(&self) -> &BSplineSurface {
        match self {
            SurfaceView::U(s) | SurfaceView::V(s) => s,
        }
    }

    fn surface_mut(&mut self) -> &mut BSplineSurface {
        match self {
            SurfaceView::U(s) | SurfaceView::V(s) => s,
        }
    }
}

impl KnotSpline for SurfaceView<'_> {
    fn degree(&self) -> usize {
        self.surface().degree(self.direction())
    }

    fn flat_knots(&self) -> &[f64] {
        self.surface().knots(self.direction())
    }

    fn nb_poles(&self) -> usize {
        match self {
            SurfaceView::U(s) => s.nb_u_poles(),
            SurfaceView::V(s) => s.nb_v_poles(),
        }
    }

    fn is_periodic(&self) -> bool {
        self.surface().is_periodic(self.direction())
    }

    fn insert_knot(&mut self, knot: f64, mult: usize, tol: f64) -> Result<()> {
        let direction = self.direction();
        self.surface_mut().insert_knot(direction, knot, mult, tol)
    }
}
