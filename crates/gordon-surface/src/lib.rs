//! Gordon surface interpolation of curve networks.
//!
//! [`InterpolateCurveNetwork`] is the entry point: it sorts a network of
//! profiles and guides, refits the curves onto a shared parameter grid and
//! builds the surface through all of them with [`GordonSurfaceBuilder`].

pub mod algorithms;
pub mod approx;
pub mod gordon;
pub mod network;
pub mod sorter;

pub use algorithms::{BSplineAlgorithms, Intersection};
pub use approx::{BSplineApproxInterp, FitResult};
pub use gordon::{check_curve_network_compatibility, GordonSurfaceBuilder};
pub use network::{interpolate_curve_network, InterpolateCurveNetwork, NetworkSurface, ProgressCallback, ProgressStage};
pub use sorter::{CurveNetworkSorter, CurveTag, SortedNetwork};
