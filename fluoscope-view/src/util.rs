//! Numeric conversion utilities for rendering.
//!
//! These functions handle conversions between numeric types with explicit
//! handling of precision loss and bounds checking.

/// Convert usize to f64 with allowed precision loss.
#[allow(clippy::cast_precision_loss)]
pub fn usize_to_f64(value: usize) -> f64 {
    value as f64
}

/// Convert u32 to f64.
pub fn u32_to_f64(value: u32) -> f64 {
    f64::from(value)
}

/// Convert f64 to u8 with clamping to [0, 255].
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn f64_to_u8(value: f64) -> u8 {
    let clamped = value.clamp(0.0, 255.0);
    clamped.round() as u8
}

/// Convert f64 to u32 with clamping to `[0, max]`. Non-finite values map to 0.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn f64_to_u32_clamped(value: f64, max: u32) -> u32 {
    if !value.is_finite() {
        return 0;
    }
    value.clamp(0.0, u32_to_f64(max)) as u32
}

/// Convert f64 to usize with bounds checking.
///
/// Returns `None` if the value is not finite, negative, or >= `max_exclusive`.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn f64_to_usize_bounded(value: f64, max_exclusive: usize) -> Option<usize> {
    if !value.is_finite() || value < 0.0 {
        return None;
    }
    if value >= usize_to_f64(max_exclusive) {
        return None;
    }
    Some(value as usize)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_f64_to_u8_clamps() {
        assert_eq!(f64_to_u8(-3.0), 0);
        assert_eq!(f64_to_u8(127.6), 128);
        assert_eq!(f64_to_u8(300.0), 255);
    }

    #[test]
    fn test_bounded_conversions() {
        assert_eq!(f64_to_usize_bounded(2.9, 3), Some(2));
        assert_eq!(f64_to_usize_bounded(3.0, 3), None);
        assert_eq!(f64_to_usize_bounded(-0.5, 3), None);
        assert_eq!(f64_to_usize_bounded(f64::NAN, 3), None);
        assert_eq!(f64_to_u32_clamped(12.7, 10), 10);
        assert_eq!(f64_to_u32_clamped(f64::INFINITY, 10), 0);
    }
}
