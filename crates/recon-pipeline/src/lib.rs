//! Patch partitioning, scheduling and stitching.
//!
//! A full-resolution reconstruction is tiled into a regular grid of output
//! patches. Each patch is solved independently against its own slice of the
//! captured data and of the dispersion operator, with padding around the
//! patch to suppress boundary artifacts; the padding is trimmed before the
//! result is written into the shared output image. Patches share only
//! read-only inputs, so the grid runs as a rayon fork-join.

/// Patch planning: padded rectangles, dispersion-aware bounding boxes,
/// index remaps and trim rectangles.
pub mod patch;
/// The tiled solve: grid iteration, per-patch solves, stitching.
pub mod scheduler;

pub use patch::{plan_patch, DispersionIndex, PatchPlan, PatchSpec};
pub use scheduler::{
    reconstruct_tiled, reconstruct_whole, TiledSolveConfig, TiledSolveOutput, TiledSolveReport,
};
