//! Dispersion operator dimension contract.
//!
//! The dispersion operator itself is fitted by an external collaborator and
//! arrives here as a sparse matrix. One row per captured-frame band pixel;
//! the nonzero entries of a row are interpolation weights over latent-frame
//! band pixels. This module only enforces the shape contract: rows must
//! equal captured pixels times bands, columns latent pixels times bands.

use crate::error::OperatorError;
use recon_core::{CooMat, ImageGeometry};

/// Check the dispersion operator against the captured and latent frames.
///
/// `captured` carries the captured rectangle's spatial sampling; the band
/// count on both sides is the latent band count, since dispersion warps each
/// latent band plane into the captured frame before channel conversion.
pub fn validate_dispersion(
    dispersion: &CooMat,
    captured: &ImageGeometry,
    latent: &ImageGeometry,
) -> Result<(), OperatorError> {
    let expected_rows = captured.num_pixels() * latent.bands;
    let expected_cols = latent.num_values();
    if dispersion.nrows() != expected_rows || dispersion.ncols() != expected_cols {
        return Err(OperatorError::DispersionShape {
            rows: dispersion.nrows(),
            cols: dispersion.ncols(),
            expected_rows,
            expected_cols,
        });
    }
    Ok(())
}
