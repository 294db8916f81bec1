//! Finite-difference regularization operators.
//!
//! [`spatial_gradient_operator`] stacks forward differences along both image
//! axes, per band. [`spectral_spatial_operator`] is the band difference of
//! the spatial gradient (a second-order mixed term): it is small where
//! neighbouring bands share edge structure, which is the usual prior for
//! spectral data.

use recon_core::{CooMat, ImageGeometry};

/// Rows of the spatial gradient for one band plane.
fn gradient_rows_per_band(geom: &ImageGeometry) -> usize {
    geom.height * (geom.width - 1) + (geom.height - 1) * geom.width
}

/// First-order spatial gradient, per band.
///
/// Row layout per band: all horizontal differences (row-major over pixel
/// pairs), then all vertical ones. Boundary pixels simply contribute no row,
/// so a `1 x 1` image yields an empty operator.
pub fn spatial_gradient_operator(geom: &ImageGeometry) -> CooMat {
    let per_band = gradient_rows_per_band(geom);
    let mut op = CooMat::zeros(per_band * geom.bands, geom.num_values());
    for band in 0..geom.bands {
        let mut row_idx = band * per_band;
        for r in 0..geom.height {
            for c in 0..geom.width - 1 {
                op.push(row_idx, geom.value_index(r, c + 1, band), 1.0);
                op.push(row_idx, geom.value_index(r, c, band), -1.0);
                row_idx += 1;
            }
        }
        for r in 0..geom.height - 1 {
            for c in 0..geom.width {
                op.push(row_idx, geom.value_index(r + 1, c, band), 1.0);
                op.push(row_idx, geom.value_index(r, c, band), -1.0);
                row_idx += 1;
            }
        }
    }
    op
}

/// Band difference composed with the spatial gradient.
///
/// One row per spatial-gradient row and adjacent band pair; the row value is
/// `grad(band + 1) - grad(band)` for the same pixel pair.
pub fn spectral_spatial_operator(geom: &ImageGeometry) -> CooMat {
    if geom.bands < 2 {
        return CooMat::zeros(0, geom.num_values());
    }
    let per_band = gradient_rows_per_band(geom);
    let mut op = CooMat::zeros(per_band * (geom.bands - 1), geom.num_values());
    let mut row_idx = 0;
    for band in 0..geom.bands - 1 {
        let mut emit = |hi: (usize, usize), lo: (usize, usize), op: &mut CooMat, row_idx: &mut usize| {
            op.push(*row_idx, geom.value_index(hi.0, hi.1, band + 1), 1.0);
            op.push(*row_idx, geom.value_index(lo.0, lo.1, band + 1), -1.0);
            op.push(*row_idx, geom.value_index(hi.0, hi.1, band), -1.0);
            op.push(*row_idx, geom.value_index(lo.0, lo.1, band), 1.0);
            *row_idx += 1;
        };
        for r in 0..geom.height {
            for c in 0..geom.width - 1 {
                emit((r, c + 1), (r, c), &mut op, &mut row_idx);
            }
        }
        for r in 0..geom.height - 1 {
            for c in 0..geom.width {
                emit((r + 1, c), (r, c), &mut op, &mut row_idx);
            }
        }
    }
    op
}
