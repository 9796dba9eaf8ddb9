pub mod aabb;
pub mod linalg;

pub use glam::{DVec3, DVec4};
pub use nalgebra::{DMatrix, DVector};
pub use aabb::Aabb3;
pub use linalg::{solve_dense, DenseLu};

pub type Point3 = DVec3;
pub type Vector3 = DVec3;
