//! Mosaic sampling operator.
//!
//! For each captured pixel the sensor records exactly one colour channel,
//! chosen by the repeating 2x2 CFA tile. The operator is a 0/1 selection
//! matrix from the per-pixel channel stack to the mosaiced plane.

use recon_core::{CfaPattern, CooMat, ImageGeometry};

/// Build the mosaic operator for a `height x width` captured rectangle.
///
/// Rows: one per captured pixel. Columns: `pixels * channels`, band-planar.
/// The pattern must already be shifted for the rectangle's corner offset
/// (see [`CfaPattern::shifted`]).
pub fn mosaic_operator(height: usize, width: usize, pattern: &CfaPattern) -> CooMat {
    let geom = ImageGeometry::new(height, width, pattern.num_channels());
    let mut op = CooMat::zeros(geom.num_pixels(), geom.num_values());
    for row in 0..height {
        for col in 0..width {
            let channel = pattern.channel_at(row, col);
            op.push(geom.pixel_index(row, col), geom.value_index(row, col, channel), 1.0);
        }
    }
    op
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::DVector;
    use recon_core::Real;

    #[test]
    fn selects_one_channel_per_site() {
        let pattern = CfaPattern::rggb();
        let op = mosaic_operator(2, 2, &pattern);
        assert_eq!(op.nrows(), 4);
        assert_eq!(op.ncols(), 12);
        assert_eq!(op.nnz(), 4);

        // channel stack: r plane = 10s, g plane = 20s, b plane = 30s
        let x = DVector::<Real>::from_iterator(
            12,
            (0..12).map(|i| (10 * (i / 4 + 1)) as Real),
        );
        let y = op.matvec(&x);
        assert_eq!(y.as_slice(), &[10.0, 20.0, 20.0, 30.0]);
    }

    #[test]
    fn shifted_pattern_moves_the_tile() {
        let pattern = CfaPattern::rggb().shifted(0, 1);
        let op = mosaic_operator(2, 2, &pattern);
        let x = DVector::<Real>::from_iterator(
            12,
            (0..12).map(|i| (10 * (i / 4 + 1)) as Real),
        );
        let y = op.matvec(&x);
        // grbg layout
        assert_eq!(y.as_slice(), &[20.0, 10.0, 30.0, 20.0]);
    }
}
