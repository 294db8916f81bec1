//! Sparse operator builders for the reconstruction core.
//!
//! Given image geometry and calibration data this crate assembles the
//! composed forward operator
//! `A_fwd = Mosaic * ChannelConversion * Dispersion`
//! (omitting absent factors) together with the enabled regularization
//! operators, all in the band-planar vectorization defined by `recon-core`.
//!
//! Regularization weights are pre-normalized at build time by the ratio of
//! forward-operator rows to regularizer rows, so weights stay comparable in
//! magnitude across operators of very different row counts.

/// Anti-mosaic second-order operator.
pub mod antimosaic;
/// Spectral-to-channel conversion with optional wavelength quadrature.
pub mod conversion;
/// Dispersion-operator dimension contract.
pub mod dispersion;
mod error;
/// Forward-model composition and regularizer setup.
pub mod forward;
/// First-order spatial and mixed spectral-spatial gradients.
pub mod gradient;
/// Mosaic (CFA sampling) operator.
pub mod mosaic;

pub use antimosaic::anti_mosaic_operator;
pub use conversion::{channel_conversion_operator, IntegrationMode, SpectralSensitivity};
pub use dispersion::validate_dispersion;
pub use error::OperatorError;
pub use forward::{ForwardModel, RegConfig, RegKind, RegNorm, Regularizer};
pub use gradient::{spatial_gradient_operator, spectral_spatial_operator};
pub use mosaic::mosaic_operator;
