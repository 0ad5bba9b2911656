// SPDX-License-Identifier: MIT OR Apache-2.0
//! Bezier interpolation curves and presets.
//!
//! Curves use the classic motion-file convention: two inner control points
//! on a 128x128 grid, with the outer points fixed at (0, 0) and (127, 127).

use serde::{Deserialize, Serialize};

/// Largest coordinate a control point may take
pub const CONTROL_POINT_MAX: u8 = 127;

const NEWTON_ITERATIONS: usize = 16;
const BISECTION_ITERATIONS: usize = 32;
const EPSILON: f32 = 1.0e-6;

/// Inner control point of an interpolation curve
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ControlPoint {
    /// Horizontal (time) coordinate, `0..=127`
    pub x: u8,
    /// Vertical (value) coordinate, `0..=127`
    pub y: u8,
}

impl ControlPoint {
    /// Create a control point, clamping both coordinates to the grid
    pub fn new(x: u8, y: u8) -> Self {
        Self {
            x: x.min(CONTROL_POINT_MAX),
            y: y.min(CONTROL_POINT_MAX),
        }
    }

    fn normalized(self) -> (f32, f32) {
        let max = f32::from(CONTROL_POINT_MAX);
        (f32::from(self.x) / max, f32::from(self.y) / max)
    }
}

/// Cubic Bezier easing curve from (0, 0) to (127, 127)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct InterpolationCurve {
    /// First inner control point
    pub c0: ControlPoint,
    /// Second inner control point
    pub c1: ControlPoint,
}

impl InterpolationCurve {
    /// Create a curve from two control points
    pub fn new(c0: ControlPoint, c1: ControlPoint) -> Self {
        Self {
            c0: ControlPoint::new(c0.x, c0.y),
            c1: ControlPoint::new(c1.x, c1.y),
        }
    }

    /// Create a curve from raw coordinates
    pub fn from_points(x0: u8, y0: u8, x1: u8, y1: u8) -> Self {
        Self::new(ControlPoint::new(x0, y0), ControlPoint::new(x1, y1))
    }

    /// The default straight-line curve
    pub fn linear() -> Self {
        Self::from_points(20, 20, 107, 107)
    }

    /// Whether the curve maps every `t` onto itself
    pub fn is_linear(&self) -> bool {
        self.c0.x == self.c0.y && self.c1.x == self.c1.y
    }

    /// Evaluate the eased amount for a linear progress `t` in `[0, 1]`
    pub fn evaluate(&self, t: f32) -> f32 {
        if t <= 0.0 {
            return 0.0;
        }
        if t >= 1.0 {
            return 1.0;
        }
        if self.is_linear() {
            return t;
        }

        let (x0, y0) = self.c0.normalized();
        let (x1, y1) = self.c1.normalized();
        let s = solve_parameter(x0, x1, t);
        cubic(y0, y1, s)
    }
}

impl Default for InterpolationCurve {
    fn default() -> Self {
        Self::linear()
    }
}

/// One axis of the curve with fixed endpoints 0 and 1
fn cubic(p1: f32, p2: f32, s: f32) -> f32 {
    let inv = 1.0 - s;
    3.0 * inv * inv * s * p1 + 3.0 * inv * s * s * p2 + s * s * s
}

fn cubic_derivative(p1: f32, p2: f32, s: f32) -> f32 {
    let inv = 1.0 - s;
    3.0 * inv * inv * p1 + 6.0 * inv * s * (p2 - p1) + 3.0 * s * s * (1.0 - p2)
}

/// Find the curve parameter `s` with `x(s) == t`
fn solve_parameter(x0: f32, x1: f32, t: f32) -> f32 {
    let mut s = t;
    for _ in 0..NEWTON_ITERATIONS {
        let error = cubic(x0, x1, s) - t;
        if error.abs() < EPSILON {
            return s;
        }
        let slope = cubic_derivative(x0, x1, s);
        if slope.abs() < EPSILON {
            break;
        }
        s -= error / slope;
        if !(0.0..=1.0).contains(&s) {
            break;
        }
    }

    // Newton diverged or stalled on a flat tangent
    let (mut lo, mut hi) = (0.0_f32, 1.0_f32);
    s = t;
    for _ in 0..BISECTION_ITERATIONS {
        let x = cubic(x0, x1, s);
        if (x - t).abs() < EPSILON {
            break;
        }
        if x < t {
            lo = s;
        } else {
            hi = s;
        }
        s = 0.5 * (lo + hi);
    }
    s
}

/// Named easing curves offered by the interpolation dialog
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum InterpolationPreset {
    /// Constant speed
    #[default]
    Linear,
    /// Slow start and slow end
    SCurve,
    /// Fast start and fast end, slow through the middle
    ReversedSCurve,
    /// Slow start, fast end
    HalfSCurveIn,
    /// Fast start, slow end
    HalfSCurveOut,
}

impl InterpolationPreset {
    /// Every preset, in menu order
    pub fn all() -> &'static [InterpolationPreset] {
        &[
            InterpolationPreset::Linear,
            InterpolationPreset::SCurve,
            InterpolationPreset::ReversedSCurve,
            InterpolationPreset::HalfSCurveIn,
            InterpolationPreset::HalfSCurveOut,
        ]
    }

    /// Display name
    pub fn name(&self) -> &'static str {
        match self {
            Self::Linear => "Linear",
            Self::SCurve => "S-curve",
            Self::ReversedSCurve => "Reversed S-curve",
            Self::HalfSCurveIn => "Half S-curve (ease in)",
            Self::HalfSCurveOut => "Half S-curve (ease out)",
        }
    }

    /// The curve this preset stands for
    pub fn curve(&self) -> InterpolationCurve {
        match self {
            Self::Linear => InterpolationCurve::linear(),
            Self::SCurve => InterpolationCurve::from_points(64, 0, 64, 127),
            Self::ReversedSCurve => InterpolationCurve::from_points(0, 64, 127, 64),
            Self::HalfSCurveIn => InterpolationCurve::from_points(64, 0, 127, 127),
            Self::HalfSCurveOut => InterpolationCurve::from_points(0, 0, 64, 127),
        }
    }

    /// Find the preset a curve was built from, if any
    pub fn detect(curve: &InterpolationCurve) -> Option<Self> {
        if curve.is_linear() {
            return Some(Self::Linear);
        }
        Self::all().iter().copied().find(|preset| preset.curve() == *curve)
    }
}

/// Interpolation utilities
pub struct Interpolation;

impl Interpolation {
    /// Linear interpolation between two floats
    pub fn lerp(a: f32, b: f32, t: f32) -> f32 {
        a + (b - a) * t
    }

    /// Interpolate Vec3
    pub fn lerp_vec3(a: [f32; 3], b: [f32; 3], t: f32) -> [f32; 3] {
        [
            Self::lerp(a[0], b[0], t),
            Self::lerp(a[1], b[1], t),
            Self::lerp(a[2], b[2], t),
        ]
    }

    /// Interpolate Vec3 with a separate amount per component
    pub fn lerp_vec3_per_axis(a: [f32; 3], b: [f32; 3], t: [f32; 3]) -> [f32; 3] {
        [
            Self::lerp(a[0], b[0], t[0]),
            Self::lerp(a[1], b[1], t[1]),
            Self::lerp(a[2], b[2], t[2]),
        ]
    }

    /// Interpolate Vec4
    pub fn lerp_vec4(a: [f32; 4], b: [f32; 4], t: f32) -> [f32; 4] {
        [
            Self::lerp(a[0], b[0], t),
            Self::lerp(a[1], b[1], t),
            Self::lerp(a[2], b[2], t),
            Self::lerp(a[3], b[3], t),
        ]
    }

    /// Normalize a quaternion, falling back to identity for a zero vector
    pub fn normalize_quat(q: [f32; 4]) -> [f32; 4] {
        let len = (q[0] * q[0] + q[1] * q[1] + q[2] * q[2] + q[3] * q[3]).sqrt();
        if len <= f32::EPSILON {
            return [0.0, 0.0, 0.0, 1.0];
        }
        [q[0] / len, q[1] / len, q[2] / len, q[3] / len]
    }

    /// Spherical linear interpolation for quaternions (x, y, z, w)
    pub fn slerp(a: [f32; 4], b: [f32; 4], t: f32) -> [f32; 4] {
        let mut dot = a[0] * b[0] + a[1] * b[1] + a[2] * b[2] + a[3] * b[3];

        // Take the short way around
        let mut b = b;
        if dot < 0.0 {
            b = [-b[0], -b[1], -b[2], -b[3]];
            dot = -dot;
        }

        if dot > 0.9995 {
            return Self::normalize_quat(Self::lerp_vec4(a, b, t));
        }

        let theta_0 = dot.acos();
        let theta = theta_0 * t;
        let sin_theta_0 = theta_0.sin();

        let s0 = ((1.0 - t) * theta_0).sin() / sin_theta_0;
        let s1 = theta.sin() / sin_theta_0;

        [
            a[0] * s0 + b[0] * s1,
            a[1] * s0 + b[1] * s1,
            a[2] * s0 + b[2] * s1,
            a[3] * s0 + b[3] * s1,
        ]
    }
}
