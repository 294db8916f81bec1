//! Image sampling geometry and index arithmetic.
//!
//! All operators in the toolbox agree on the band-planar vectorization
//! defined here; patch-local solves build an [`IndexMap`] per frame to
//! translate between full-image and patch-local linear indices.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Scalar type used throughout the toolbox (currently `f64`).
pub type Real = f64;

/// Spatial sampling plus band count of an image frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageGeometry {
    /// Number of pixel rows.
    pub height: usize,
    /// Number of pixel columns.
    pub width: usize,
    /// Number of spectral bands or colour channels.
    pub bands: usize,
}

impl ImageGeometry {
    pub fn new(height: usize, width: usize, bands: usize) -> Self {
        Self {
            height,
            width,
            bands,
        }
    }

    /// Pixels per band plane.
    pub fn num_pixels(&self) -> usize {
        self.height * self.width
    }

    /// Total entries of the stacked vector (`pixels * bands`).
    pub fn num_values(&self) -> usize {
        self.num_pixels() * self.bands
    }

    /// Linear pixel index within one band plane (row-major).
    pub fn pixel_index(&self, row: usize, col: usize) -> usize {
        row * self.width + col
    }

    /// Inverse of [`pixel_index`](Self::pixel_index).
    pub fn pixel_coords(&self, pixel: usize) -> (usize, usize) {
        (pixel / self.width, pixel % self.width)
    }

    /// Index into the band-planar stacked vector.
    pub fn value_index(&self, row: usize, col: usize, band: usize) -> usize {
        band * self.num_pixels() + self.pixel_index(row, col)
    }

    /// Same spatial sampling with a different band count.
    pub fn with_bands(&self, bands: usize) -> Self {
        Self { bands, ..*self }
    }

    /// Geometry of a rectangular sub-window, keeping the band count.
    pub fn window(&self, rect: &PixelRect) -> Self {
        Self {
            height: rect.height,
            width: rect.width,
            bands: self.bands,
        }
    }
}

/// A rectangle of pixels, `[row, row + height) x [col, col + width)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PixelRect {
    pub row: usize,
    pub col: usize,
    pub height: usize,
    pub width: usize,
}

impl PixelRect {
    pub fn new(row: usize, col: usize, height: usize, width: usize) -> Self {
        Self {
            row,
            col,
            height,
            width,
        }
    }

    /// One past the last row.
    pub fn end_row(&self) -> usize {
        self.row + self.height
    }

    /// One past the last column.
    pub fn end_col(&self) -> usize {
        self.col + self.width
    }

    pub fn area(&self) -> usize {
        self.height * self.width
    }

    pub fn contains(&self, row: usize, col: usize) -> bool {
        row >= self.row && row < self.end_row() && col >= self.col && col < self.end_col()
    }

    /// Whether the rectangle lies fully inside an `height x width` image.
    pub fn fits_in(&self, height: usize, width: usize) -> bool {
        self.end_row() <= height && self.end_col() <= width
    }

    /// Grow by `pad` on every side, then clip to an `height x width` image.
    ///
    /// Padding that would extend past an image edge is dropped on that side,
    /// never wrapped or mirrored.
    pub fn grow_clipped(&self, pad: usize, height: usize, width: usize) -> PixelRect {
        let row = self.row.saturating_sub(pad);
        let col = self.col.saturating_sub(pad);
        let end_row = (self.end_row() + pad).min(height);
        let end_col = (self.end_col() + pad).min(width);
        PixelRect {
            row,
            col,
            height: end_row - row,
            width: end_col - col,
        }
    }
}

/// Arena-style bidirectional map between global and local linear indices.
///
/// Built per patch from the set of global indices the patch touches, used to
/// slice full-image sparse operators down to patch-local ones, and discarded
/// when the patch solve returns.
#[derive(Debug, Clone, Default)]
pub struct IndexMap {
    globals: Vec<usize>,
    locals: HashMap<usize, usize>,
}

impl IndexMap {
    /// Build from the ordered list of global indices; local index `i` maps
    /// to `globals[i]`.
    pub fn from_globals(globals: Vec<usize>) -> Self {
        let locals = globals
            .iter()
            .copied()
            .enumerate()
            .map(|(local, global)| (global, local))
            .collect();
        Self { globals, locals }
    }

    pub fn len(&self) -> usize {
        self.globals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.globals.is_empty()
    }

    pub fn to_local(&self, global: usize) -> Option<usize> {
        self.locals.get(&global).copied()
    }

    pub fn to_global(&self, local: usize) -> Option<usize> {
        self.globals.get(local).copied()
    }

    pub fn globals(&self) -> &[usize] {
        &self.globals
    }
}
