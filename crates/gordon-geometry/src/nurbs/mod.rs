//! NURBS core algorithms: basis functions, knot vectors, De Boor evaluation,
//! knot insertion and degree elevation.

pub mod basis;
pub mod deboor;
pub mod elevate;
pub mod insert;
pub mod knot;
pub mod knot_vector;

pub use basis::{basis_matrix, BSplineBasis};
pub use deboor::*;
pub use knot::{basis_functions, basis_functions_derivs, ders_basis_functions, find_span};
pub use knot_vector::{parameterization, unique_with_mults, KnotVector};
