/// Tolerances for a curve network interpolation.
///
/// Passed by value through every public entry point; nothing reads tolerances
/// from global state.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ToleranceConfig {
    /// 3D tolerance, relative to the scale of the curves involved.
    pub tol_3d: f64,
    /// Parametric tolerance used when comparing knots and parameters.
    pub tol_par: f64,
    /// Relative tolerance used to decide whether a curve family closes on itself.
    pub tol_closed: f64,
    /// Upper bound of control points of a reparametrized curve.
    pub max_ctrl_pts: usize,
}

impl ToleranceConfig {
    pub const DEFAULT_3D: f64 = 1e-5;
    pub const DEFAULT_PAR: f64 = 1e-10;
    pub const DEFAULT_CLOSED: f64 = 1e-8;
    pub const DEFAULT_MAX_CTRL_PTS: usize = 80;

    /// Absolute linear tolerance of the kernel (closedness of a single curve),
    /// scaled by the size of the geometry it is applied to.
    pub const KERNEL_LINEAR: f64 = 1e-7;

    pub fn new(tol_3d: f64, tol_par: f64) -> Self {
        Self {
            tol_3d,
            tol_par,
            ..Self::default()
        }
    }

    pub fn loose() -> Self {
        Self {
            tol_3d: 1e-4,
            tol_par: 1e-8,
            ..Self::default()
        }
    }

    pub fn tight() -> Self {
        Self {
            tol_3d: 1e-7,
            tol_par: 1e-12,
            ..Self::default()
        }
    }

    pub fn with_tol_3d(mut self, tol_3d: f64) -> Self {
        self.tol_3d = tol_3d;
        self
    }

    pub fn with_tol_par(mut self, tol_par: f64) -> Self {
        self.tol_par = tol_par;
        self
    }

    pub fn with_tol_closed(mut self, tol_closed: f64) -> Self {
        self.tol_closed = tol_closed;
        self
    }

    pub fn with_max_ctrl_pts(mut self, max_ctrl_pts: usize) -> Self {
        self.max_ctrl_pts = max_ctrl_pts;
        self
    }

    /// Check if two parameters are equal within the parametric tolerance
    pub fn par_eq(self, a: f64, b: f64) -> bool {
        (a - b).abs() < self.tol_par
    }

    /// 3D tolerance scaled by the size of the geometry it applies to.
    pub fn scaled_3d(self, scale: f64) -> f64 {
        self.tol_3d * scale
    }
}

impl Default for ToleranceConfig {
    fn default() -> Self {
        Self {
            tol_3d: Self::DEFAULT_3D,
            tol_par: Self::DEFAULT_PAR,
            tol_closed: Self::DEFAULT_CLOSED,
            max_ctrl_pts: Self::DEFAULT_MAX_CTRL_PTS,
        }
    }
}
