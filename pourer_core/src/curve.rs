//! Exponential calibration model `y = a + b·e^(c·x)`.
//!
//! The fit is a two-stage linear least-squares method:
//!
//! 1. Integrating the model gives `y − y₁ = A·(x − x₁) + c·S(x)` where `S` is
//!    the running integral of `y`. Approximating `S` with the trapezoid rule
//!    over the sorted samples turns the estimate of `c` into a 2x2 linear
//!    solve.
//! 2. With `c` fixed, `y` is linear in `θ = e^(c·x)`, so `(a, b)` is a second
//!    2x2 ordinary least-squares solve.
//!
//! No iterative optimizer is involved; the cost is one sort plus two passes.

use thiserror::Error;

/// One calibration measurement in milliseconds.
///
/// `x` is trigger-to-water latency, `y` is trigger-to-release time.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SamplePoint {
    pub x: f64,
    pub y: f64,
}

impl SamplePoint {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

impl From<(f64, f64)> for SamplePoint {
    fn from((x, y): (f64, f64)) -> Self {
        Self { x, y }
    }
}

/// Model parameter selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Param {
    A,
    B,
    C,
}

impl Param {
    pub const ALL: [Self; 3] = [Self::A, Self::B, Self::C];

    pub const fn index(self) -> usize {
        match self {
            Self::A => 0,
            Self::B => 1,
            Self::C => 2,
        }
    }

    /// Single-letter label used on the display.
    pub const fn label(self) -> &'static str {
        match self {
            Self::A => "A",
            Self::B => "B",
            Self::C => "C",
        }
    }

    /// Cyclic successor A → B → C → A.
    pub const fn next(self) -> Self {
        match self {
            Self::A => Self::B,
            Self::B => Self::C,
            Self::C => Self::A,
        }
    }
}

/// Which linear solve of the fit failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FitStage {
    /// Solve for the exponent `c`.
    Exponent,
    /// Solve for offset `a` and scale `b`.
    Linear,
}

impl std::fmt::Display for FitStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Exponent => f.write_str("exponent"),
            Self::Linear => f.write_str("linear"),
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum FitError {
    #[error("need at least 2 points to fit, got {0}")]
    NotEnoughPoints(usize),
    #[error("singular {stage} system (determinant {determinant:e})")]
    Singular { stage: FitStage, determinant: f64 },
    #[error("fit produced non-finite parameters")]
    NonFinite,
}

/// Fitted exponential model.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ExpCurve {
    a: f64,
    b: f64,
    c: f64,
    fitted: bool,
}

// Determinants below this fraction of the products they are formed from are
// rounding noise of an exactly singular system.
const RELATIVE_SINGULARITY: f64 = 1e-12;

/// Solve `[[m00, m01], [m01, m11]]·[u, v] = [r0, r1]` by closed-form inverse.
fn solve_symmetric_2x2(
    m00: f64,
    m01: f64,
    m11: f64,
    r0: f64,
    r1: f64,
    stage: FitStage,
) -> Result<(f64, f64), FitError> {
    let det = m00.mul_add(m11, -(m01 * m01));
    let scale = (m00 * m11).abs() + m01 * m01;
    if !det.is_finite() || det == 0.0 || det.abs() <= scale * RELATIVE_SINGULARITY {
        return Err(FitError::Singular {
            stage,
            determinant: det,
        });
    }
    let u = (m11 * r0 - m01 * r1) / det;
    let v = (m00 * r1 - m01 * r0) / det;
    Ok((u, v))
}

impl ExpCurve {
    pub const fn new() -> Self {
        Self {
            a: 0.0,
            b: 0.0,
            c: 0.0,
            fitted: false,
        }
    }

    /// Curve with known parameters, already marked fitted.
    pub const fn with_params(a: f64, b: f64, c: f64) -> Self {
        Self {
            a,
            b,
            c,
            fitted: true,
        }
    }

    /// Fit the model to `points` (any order).
    ///
    /// On error the previous parameters and `fitted` flag are kept.
    pub fn fit(&mut self, points: &[SamplePoint]) -> Result<(), FitError> {
        let (a, b, c) = fit_params(points)?;
        self.a = a;
        self.b = b;
        self.c = c;
        self.fitted = true;
        Ok(())
    }

    /// `a + b·e^(c·x)`, or `None` before the first fit.
    pub fn estimate(&self, x: f64) -> Option<f64> {
        self.fitted.then(|| self.b.mul_add((self.c * x).exp(), self.a))
    }

    pub const fn is_fitted(&self) -> bool {
        self.fitted
    }

    pub fn set_params(&mut self, a: f64, b: f64, c: f64) {
        self.a = a;
        self.b = b;
        self.c = c;
        self.fitted = true;
    }

    /// Back to the unfitted state with all parameters zero.
    pub fn reset(&mut self) {
        *self = Self::new();
    }

    /// Positional access: 0 → a, 1 → b, 2 → c, anything else → 0.0.
    pub const fn parameter(&self, index: usize) -> f64 {
        match index {
            0 => self.a,
            1 => self.b,
            2 => self.c,
            _ => 0.0,
        }
    }

    pub const fn param(&self, which: Param) -> f64 {
        self.parameter(which.index())
    }

    pub const fn params(&self) -> (f64, f64, f64) {
        (self.a, self.b, self.c)
    }
}

#[allow(clippy::cast_precision_loss)]
fn fit_params(points: &[SamplePoint]) -> Result<(f64, f64, f64), FitError> {
    let n = points.len();
    if n < 2 {
        return Err(FitError::NotEnoughPoints(n));
    }
    if points.iter().any(|p| !p.is_finite()) {
        return Err(FitError::NonFinite);
    }

    let mut pts = points.to_vec();
    pts.sort_by(|l, r| l.x.total_cmp(&r.x));

    // Stage 1: exponent from the trapezoidal running integral.
    let first = pts[0];
    let mut s = 0.0_f64;
    let (mut sdx2, mut sdxs, mut ss2, mut sdydx, mut sdys) = (0.0, 0.0, 0.0, 0.0, 0.0);
    let mut prev = first;
    for p in &pts {
        s += 0.5 * (p.y + prev.y) * (p.x - prev.x);
        prev = *p;
        let dx = p.x - first.x;
        let dy = p.y - first.y;
        sdx2 += dx * dx;
        sdxs += dx * s;
        ss2 += s * s;
        sdydx += dy * dx;
        sdys += dy * s;
    }
    let (_, c) = solve_symmetric_2x2(sdx2, sdxs, ss2, sdydx, sdys, FitStage::Exponent)?;

    // Stage 2: offset and scale by OLS on θ = e^(c·x).
    let (mut st, mut st2, mut sy, mut syt) = (0.0, 0.0, 0.0, 0.0);
    for p in &pts {
        let theta = (c * p.x).exp();
        st += theta;
        st2 += theta * theta;
        sy += p.y;
        syt += p.y * theta;
    }
    let (a, b) = solve_symmetric_2x2(n as f64, st, st2, sy, syt, FitStage::Linear)?;

    if !(a.is_finite() && b.is_finite() && c.is_finite()) {
        return Err(FitError::NonFinite);
    }
    Ok((a, b, c))
}
