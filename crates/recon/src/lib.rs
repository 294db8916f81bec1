//! High-level entry crate for the `mosaic-recon` reconstruction toolbox.
//!
//! The toolbox recovers a latent multi-band image from a mosaiced or
//! multi-channel capture through a sparse forward model (color-filter-array
//! mosaic, spectral-to-channel conversion, dispersion warp) and a
//! regularized ADMM solve, tiled into independent padded patches for
//! full-resolution images.
//!
//! ## Tiled reconstruction
//!
//! ```no_run
//! use recon::prelude::*;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let latent = ImageGeometry::new(64, 64, 3);
//! let pattern = CfaPattern::rggb();
//! let captured = CapturedImage::Mosaiced(
//!     /* load the sensor plane */
//! #   ImageBuffer::zeros(ImageGeometry::new(64, 64, 1)),
//! );
//!
//! let mut config = TiledSolveConfig::default();
//! config.reg.weights = [0.05, 0.0, 0.01];
//! config.admm.nonneg = true;
//!
//! let output = reconstruct_tiled(&captured, Some(&pattern), None, None, &latent, &config)?;
//! println!(
//!     "{} patches, converged: {}",
//!     output.report.patches, output.report.all_converged
//! );
//! # Ok(())
//! # }
//! ```
//!
//! ## Single-patch workflows
//!
//! For custom tiling or diagnostics, build a [`operators::ForwardModel`]
//! directly and call [`admm::solve_admm`] on it; the per-term norms in the
//! returned report support external regularization-weight selection.
//!
//! ## Module Organization
//!
//! - **[`core`]**: Geometry, CFA patterns, image buffers, sparse matrices
//! - **[`operators`]**: Forward-model factors and regularization operators
//! - **[`admm`]**: The regularized solver core
//! - **[`pipeline`]**: Patch planning, parallel scheduling and stitching
//! - **[`prelude`]**: Convenient re-exports for common use cases
//!
//! ## Stability
//!
//! The `recon` crate is the public compatibility boundary. Lower-level
//! crates are intended for advanced usage and may evolve more quickly.

/// Geometry, CFA patterns, band-planar image buffers and sparse matrices.
pub mod core {
    pub use recon_core::*;
}

/// Forward-model factors (mosaic, conversion, dispersion) and the
/// regularization operators.
pub mod operators {
    pub use recon_operators::*;
}

/// The regularized ADMM solver core.
pub mod admm {
    pub use recon_admm::*;
}

/// Patch planning, parallel scheduling and stitching.
pub mod pipeline {
    pub use recon_pipeline::*;
}

/// Convenient re-exports for common use cases.
///
/// Import with `use recon::prelude::*;` to get started quickly.
pub mod prelude {
    // Common types
    pub use crate::core::{
        CapturedImage, CfaPattern, CooMat, ImageBuffer, ImageGeometry, PixelRect, Real,
    };

    // Forward-model configuration
    pub use crate::operators::{
        ForwardModel, IntegrationMode, RegConfig, RegKind, RegNorm, SpectralSensitivity,
    };

    // Solver entry points and options
    pub use crate::admm::{solve_admm, AdmmOptions, AdmmReport};

    // Tiled pipeline
    pub use crate::pipeline::{
        reconstruct_tiled, reconstruct_whole, PatchSpec, TiledSolveConfig, TiledSolveOutput,
        TiledSolveReport,
    };
}
