pub mod error;
pub mod tolerance;
pub mod traits;

pub use error::{CurveFamily, GordonError, Result};
pub use tolerance::ToleranceConfig;
