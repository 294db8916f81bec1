//! Core primitives for the `mosaic-recon` toolbox.
//!
//! This crate contains:
//! - image sampling geometry and the band-planar vectorization rule
//!   (`ImageGeometry`, `ImageBuffer`),
//! - the 2x2 colour-filter-array pattern descriptor (`CfaPattern`),
//! - a COO sparse-matrix type with the composition, Gram and slicing
//!   operations the operator pipeline needs (`CooMat`),
//! - the arena-style global/local index map used for patch-local
//!   operator slicing (`IndexMap`).
//!
//! Vectorization convention: a latent image of `H x W` pixels and `B` bands
//! is stacked band-planar, `index(row, col, band) = band * H * W + row * W + col`.
//! Every sparse operator in the toolbox follows this convention on both
//! sides.

/// CFA pattern descriptor and the tile-offset rule.
pub mod cfa;
/// Image sampling geometry, rectangles and index maps.
pub mod geometry;
/// Band-planar image buffers and the captured-image variants.
pub mod image;
/// COO sparse matrices and conversion to a factorizable layout.
pub mod sparse;

pub use cfa::{CfaError, CfaPattern};
pub use geometry::{ImageGeometry, IndexMap, PixelRect, Real};
pub use image::{CapturedImage, ImageBuffer, ImageError};
pub use sparse::{CooMat, SparseError};
