use std::fmt;

use thiserror::Error;

/// Which family of the curve network a curve belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum CurveFamily {
    Profile,
    Guide,
}

impl fmt::Display for CurveFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CurveFamily::Profile => write!(f, "profile"),
            CurveFamily::Guide => write!(f, "guide"),
        }
    }
}

#[derive(Debug, Error)]
pub enum GordonError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Incompatible parameter range: {0}")]
    IncompatibleParameterRange(String),

    #[error("Incompatible degree: {0}")]
    IncompatibleDegree(String),

    #[error(
        "Profile {profile} and guide {guide} do not intersect: \
         distance {distance:.3e} exceeds tolerance {tolerance:.3e}"
    )]
    NoIntersection {
        profile: usize,
        guide: usize,
        distance: f64,
        tolerance: f64,
    },

    #[error("Profile {profile} and guide {guide} meet at {count} distinct points, expected one")]
    TooManyIntersections {
        profile: usize,
        guide: usize,
        count: usize,
    },

    #[error(
        "Curve network is incompatible at profile {profile} / guide {guide}: \
         deviation {deviation:.3e} exceeds tolerance {tolerance:.3e}"
    )]
    NetworkIncompatible {
        profile: usize,
        guide: usize,
        deviation: f64,
        tolerance: f64,
    },

    #[error("Singular linear system: {0}")]
    SingularSystem(String),

    #[error("Too few control points: {available} available, {required} required")]
    TooFewControlPoints { available: usize, required: usize },

    #[error("Sorting failed: {0}")]
    SortingFailed(String),

    #[error("Geometry error: {0}")]
    Geometry(String),

    #[error("Reparametrization of {family} {index} failed: {source}")]
    Reparametrization {
        family: CurveFamily,
        index: usize,
        #[source]
        source: Box<GordonError>,
    },
}

impl GordonError {
    /// Wrap an error raised while reparametrizing a single curve of the network.
    pub fn in_reparametrization(self, family: CurveFamily, index: usize) -> Self {
        GordonError::Reparametrization {
            family,
            index,
            source: Box::new(self),
        }
    }
}

pub type Result<T> = std::result::Result<T, GordonError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_name_indices_and_tolerance() {
        let err = GordonError::NetworkIncompatible {
            profile: 2,
            guide: 5,
            deviation: 0.25,
            tolerance: 1e-5,
        };
        let msg = err.to_string();
        assert!(msg.contains("profile 2"));
        assert!(msg.contains("guide 5"));
        assert!(msg.contains("2.500e-1"));
    }

    #[test]
    fn test_reparametrization_wraps_source() {
        let err = GordonError::SingularSystem("fit".into()).in_reparametrization(CurveFamily::Guide, 3);
        assert!(err.to_string().starts_with("Reparametrization of guide 3 failed"));
        let source = std::error::Error::source(&err).map(|s| s.to_string());
        assert_eq!(source.as_deref(), Some("Singular linear system: fit"));
    }
}
