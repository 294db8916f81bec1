//! Soft-thresholding, the proximal operator of the L1 norm.

use recon_core::Real;

/// Shrink `value` toward zero by `threshold`, clamping to zero inside the
/// threshold band.
pub fn soft_threshold(value: Real, threshold: Real) -> Real {
    if value > threshold {
        value - threshold
    } else if value < -threshold {
        value + threshold
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shrinks_toward_zero() {
        assert_eq!(soft_threshold(3.0, 1.0), 2.0);
        assert_eq!(soft_threshold(-3.0, 1.0), -2.0);
    }

    #[test]
    fn clamps_inside_the_band() {
        assert_eq!(soft_threshold(0.5, 1.0), 0.0);
        assert_eq!(soft_threshold(-0.5, 1.0), 0.0);
        assert_eq!(soft_threshold(1.0, 1.0), 0.0);
    }

    #[test]
    fn zero_threshold_is_identity() {
        assert_eq!(soft_threshold(2.5, 0.0), 2.5);
        assert_eq!(soft_threshold(-2.5, 0.0), -2.5);
    }

    #[test]
    fn preserves_sign() {
        for v in [-4.0, -0.1, 0.1, 4.0] {
            let s = soft_threshold(v, 0.05);
            assert!(s == 0.0 || s.signum() == v.signum());
        }
    }
}
