use recon_core::{Real, SparseError};
use thiserror::Error;

/// Fatal configuration errors detected while assembling operators.
#[derive(Debug, Error)]
pub enum OperatorError {
    #[error(
        "dispersion operator is {rows}x{cols}, expected {expected_rows} rows \
         (captured pixels x bands) and {expected_cols} cols (latent pixels x bands)"
    )]
    DispersionShape {
        rows: usize,
        cols: usize,
        expected_rows: usize,
        expected_cols: usize,
    },
    #[error(
        "captured frame has {captured_pixels} pixels but latent frame has \
         {latent_pixels}; they must match when no dispersion operator is supplied"
    )]
    CapturedLatentMismatch {
        captured_pixels: usize,
        latent_pixels: usize,
    },
    #[error("mosaic pattern addresses {pattern_channels} channels but the model has {channels}")]
    ChannelMismatch {
        pattern_channels: usize,
        channels: usize,
    },
    #[error("sensitivity matrix covers {sensitivity_bands} bands but the latent frame has {latent_bands}")]
    BandMismatch {
        sensitivity_bands: usize,
        latent_bands: usize,
    },
    #[error("wavelength list has {got} entries, expected one per band ({expected})")]
    WavelengthCount { expected: usize, got: usize },
    #[error("regularization weight for {kind} is negative ({weight})")]
    NegativeWeight { kind: &'static str, weight: Real },
    #[error(transparent)]
    Sparse(#[from] SparseError),
}
