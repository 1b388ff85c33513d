//! Colormap definitions and application logic.

use crate::util::f64_to_u8;
use serde::{Deserialize, Serialize};

/// Channel breakpoints `(position, intensity)` of the `jet` palette.
const JET_RED: [(f64, f64); 5] = [(0.0, 0.0), (0.35, 0.0), (0.66, 1.0), (0.89, 1.0), (1.0, 0.5)];
const JET_GREEN: [(f64, f64); 6] = [
    (0.0, 0.0),
    (0.125, 0.0),
    (0.375, 1.0),
    (0.64, 1.0),
    (0.91, 0.0),
    (1.0, 0.0),
];
const JET_BLUE: [(f64, f64); 5] = [(0.0, 0.5), (0.11, 1.0), (0.34, 1.0), (0.65, 0.0), (1.0, 0.0)];

/// Viridis sampled at quarter steps.
const VIRIDIS: [[u8; 3]; 5] = [
    [68, 1, 84],
    [59, 82, 139],
    [33, 145, 140],
    [94, 201, 98],
    [253, 231, 37],
];

/// Available colormaps for image panels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Colormap {
    /// Jet - dark blue to cyan to yellow to dark red.
    Jet,
    /// Viridis - purple to teal to yellow. The backend default.
    #[default]
    Viridis,
    /// Grayscale - black to white.
    Grayscale,
}

impl std::fmt::Display for Colormap {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Colormap::Jet => write!(f, "jet"),
            Colormap::Viridis => write!(f, "viridis"),
            Colormap::Grayscale => write!(f, "gray"),
        }
    }
}

impl Colormap {
    /// Apply the colormap to a normalized value [0, 1] and return RGBA bytes.
    ///
    /// Values outside [0, 1] are clamped; NaN renders fully transparent.
    #[must_use]
    pub fn apply(self, val: f64) -> [u8; 4] {
        if val.is_nan() {
            return [0, 0, 0, 0];
        }
        let val = val.clamp(0.0, 1.0);
        match self {
            Colormap::Jet => [
                f64_to_u8(piecewise(&JET_RED, val) * 255.0),
                f64_to_u8(piecewise(&JET_GREEN, val) * 255.0),
                f64_to_u8(piecewise(&JET_BLUE, val) * 255.0),
                255,
            ],
            Colormap::Viridis => {
                let scaled = val * 4.0;
                let lower = scaled.floor().min(3.0);
                let frac = scaled - lower;
                #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
                let i = lower as usize;
                let (a, b) = (VIRIDIS[i], VIRIDIS[i + 1]);
                let mix = |c: usize| {
                    f64_to_u8(f64::from(a[c]) + (f64::from(b[c]) - f64::from(a[c])) * frac)
                };
                [mix(0), mix(1), mix(2), 255]
            }
            Colormap::Grayscale => {
                let v = f64_to_u8(val * 255.0);
                [v, v, v, 255]
            }
        }
    }
}

/// Linear interpolation through sorted breakpoints.
fn piecewise(points: &[(f64, f64)], val: f64) -> f64 {
    for pair in points.windows(2) {
        let ((x0, y0), (x1, y1)) = (pair[0], pair[1]);
        if val <= x1 {
            return y0 + (y1 - y0) * (val - x0) / (x1 - x0);
        }
    }
    points.last().map_or(0.0, |&(_, y)| y)
}
