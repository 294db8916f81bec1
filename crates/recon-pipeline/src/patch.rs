//! Patch planning.
//!
//! For one requested output patch this module computes the padded latent
//! rectangle (clipped at image bounds, with padding dropped rather than
//! mirrored), the captured-frame rectangle actually referenced through the
//! dispersion operator's sparsity pattern (which can spill outside the
//! padded patch), the local/global index remaps for both frames, the
//! patch-local slice of the dispersion operator, and the trim rectangle
//! that recovers exactly the requested unpadded output region.

use anyhow::{bail, ensure, Result};
use recon_core::{CooMat, ImageGeometry, IndexMap, PixelRect, Real};
use serde::{Deserialize, Serialize};

/// A requested output patch: corner, size and padding radius.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatchSpec {
    pub row: usize,
    pub col: usize,
    pub height: usize,
    pub width: usize,
    pub pad: usize,
}

impl PatchSpec {
    /// The unpadded output rectangle.
    pub fn rect(&self) -> PixelRect {
        PixelRect::new(self.row, self.col, self.height, self.width)
    }
}

/// Everything the scheduler needs to solve one patch.
#[derive(Debug, Clone)]
pub struct PatchPlan {
    pub spec: PatchSpec,
    /// Padded latent rectangle, clipped at image bounds.
    pub padded: PixelRect,
    /// Captured-frame rectangle to load.
    pub captured_rect: PixelRect,
    /// Global latent value indices covered by `padded`, in local band-planar
    /// order.
    pub latent_map: IndexMap,
    /// Global captured value indices covered by `captured_rect`, in local
    /// band-planar order.
    pub captured_map: IndexMap,
    /// Patch-local slice of the dispersion operator, if one was supplied.
    pub local_dispersion: Option<CooMat>,
    /// Rectangle within `padded` (local coordinates) selecting exactly the
    /// requested output region.
    pub trim: PixelRect,
}

/// Value-level index map of a pixel rectangle, local band-planar order.
fn rect_value_map(geom: &ImageGeometry, rect: &PixelRect) -> IndexMap {
    let mut globals = Vec::with_capacity(rect.area() * geom.bands);
    for band in 0..geom.bands {
        for r in rect.row..rect.end_row() {
            for c in rect.col..rect.end_col() {
                globals.push(geom.value_index(r, c, band));
            }
        }
    }
    IndexMap::from_globals(globals)
}

/// Dispersion triplets bucketed by the latent pixel of their column index.
///
/// Built once per tiled solve; per-patch planning then visits only the
/// entries touching the patch's padded rectangle instead of rescanning the
/// full triplet list for every patch.
#[derive(Debug)]
pub struct DispersionIndex<'a> {
    op: &'a CooMat,
    latent: ImageGeometry,
    by_pixel: Vec<Vec<usize>>,
}

impl<'a> DispersionIndex<'a> {
    pub fn build(op: &'a CooMat, latent: &ImageGeometry) -> Self {
        let latent_pixels = latent.num_pixels();
        let mut by_pixel: Vec<Vec<usize>> = vec![Vec::new(); latent_pixels];
        for (idx, &(_, col, _)) in op.triplets().iter().enumerate() {
            by_pixel[col % latent_pixels].push(idx);
        }
        Self {
            op,
            latent: *latent,
            by_pixel,
        }
    }

    pub fn operator(&self) -> &CooMat {
        self.op
    }

    /// Visit every triplet whose latent column pixel lies inside `rect`.
    fn entries_in(&self, rect: &PixelRect, mut visit: impl FnMut(usize, usize, Real)) {
        for r in rect.row..rect.end_row() {
            for c in rect.col..rect.end_col() {
                for &idx in &self.by_pixel[self.latent.pixel_index(r, c)] {
                    let (row, col, value) = self.op.triplets()[idx];
                    visit(row, col, value);
                }
            }
        }
    }
}

/// Bounding box of the captured pixels referenced by the dispersion rows
/// that touch the padded latent rectangle.
fn captured_bounding_rect(
    index: &DispersionIndex<'_>,
    captured: &ImageGeometry,
    padded: &PixelRect,
) -> Option<PixelRect> {
    let captured_pixels = captured.num_pixels();
    let mut min_row = usize::MAX;
    let mut min_col = usize::MAX;
    let mut max_row = 0usize;
    let mut max_col = 0usize;
    let mut found = false;
    index.entries_in(padded, |row, _, _| {
        let (r, c) = captured.pixel_coords(row % captured_pixels);
        min_row = min_row.min(r);
        min_col = min_col.min(c);
        max_row = max_row.max(r);
        max_col = max_col.max(c);
        found = true;
    });
    found.then(|| PixelRect::new(min_row, min_col, max_row - min_row + 1, max_col - min_col + 1))
}

/// Compute the patch plan for one requested output patch.
///
/// `captured_height`/`captured_width` are the captured frame's full spatial
/// sampling. Without a dispersion operator the captured rectangle is the
/// padded latent rectangle itself (the frames must then share their
/// sampling).
pub fn plan_patch(
    latent: &ImageGeometry,
    captured_height: usize,
    captured_width: usize,
    dispersion: Option<&DispersionIndex<'_>>,
    spec: &PatchSpec,
) -> Result<PatchPlan> {
    ensure!(
        spec.height > 0 && spec.width > 0,
        "patch size must be positive"
    );
    let rect = spec.rect();
    ensure!(
        rect.fits_in(latent.height, latent.width),
        "patch {}+{} x {}+{} exceeds the {}x{} latent image",
        spec.row,
        spec.height,
        spec.col,
        spec.width,
        latent.height,
        latent.width
    );

    let padded = rect.grow_clipped(spec.pad, latent.height, latent.width);
    let latent_map = rect_value_map(latent, &padded);
    let captured_geom = ImageGeometry::new(captured_height, captured_width, latent.bands);

    let captured_rect = match dispersion {
        None => {
            ensure!(
                captured_height == latent.height && captured_width == latent.width,
                "captured frame is {}x{} but latent frame is {}x{}; without a \
                 dispersion operator they must match",
                captured_height,
                captured_width,
                latent.height,
                latent.width
            );
            padded
        }
        Some(index) => match captured_bounding_rect(index, &captured_geom, &padded) {
            Some(rect) => rect,
            None => bail!(
                "dispersion operator references no captured pixels for the patch at ({}, {})",
                spec.row,
                spec.col
            ),
        },
    };

    let captured_map = rect_value_map(&captured_geom, &captured_rect);
    let local_dispersion = dispersion.map(|index| {
        let mut local = CooMat::zeros(captured_map.len(), latent_map.len());
        index.entries_in(&padded, |row, col, value| {
            if let (Some(lr), Some(lc)) = (captured_map.to_local(row), latent_map.to_local(col)) {
                local.push(lr, lc, value);
            }
        });
        local
    });

    let trim = PixelRect::new(
        spec.row - padded.row,
        spec.col - padded.col,
        spec.height,
        spec.width,
    );

    Ok(PatchPlan {
        spec: *spec,
        padded,
        captured_rect,
        latent_map,
        captured_map,
        local_dispersion,
        trim,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spec(row: usize, col: usize, size: usize, pad: usize) -> PatchSpec {
        PatchSpec {
            row,
            col,
            height: size,
            width: size,
            pad,
        }
    }

    #[test]
    fn corner_patches_keep_the_requested_output_size() {
        let latent = ImageGeometry::new(10, 10, 2);
        for &(row, col) in &[(0, 0), (0, 6), (6, 0), (6, 6)] {
            let plan = plan_patch(&latent, 10, 10, None, &spec(row, col, 4, 3)).unwrap();
            assert_eq!(plan.trim.height, 4);
            assert_eq!(plan.trim.width, 4);
            // trim, applied to the padded window, lands on the requested rect
            assert_eq!(plan.padded.row + plan.trim.row, row);
            assert_eq!(plan.padded.col + plan.trim.col, col);
            assert!(plan.padded.fits_in(10, 10));
        }
    }

    #[test]
    fn interior_patch_gets_symmetric_padding() {
        let latent = ImageGeometry::new(12, 12, 1);
        let plan = plan_patch(&latent, 12, 12, None, &spec(4, 4, 4, 2)).unwrap();
        assert_eq!(plan.padded, PixelRect::new(2, 2, 8, 8));
        assert_eq!(plan.trim, PixelRect::new(2, 2, 4, 4));
        assert_eq!(plan.latent_map.len(), 64);
    }

    #[test]
    fn latent_map_is_band_planar_local_order() {
        let latent = ImageGeometry::new(4, 4, 2);
        let plan = plan_patch(&latent, 4, 4, None, &spec(1, 1, 2, 0)).unwrap();
        // local index 0 is (1,1,band 0); local 4 is (1,1,band 1)
        assert_eq!(plan.latent_map.to_global(0), Some(latent.value_index(1, 1, 0)));
        assert_eq!(plan.latent_map.to_global(4), Some(latent.value_index(1, 1, 1)));
    }

    #[test]
    fn dispersion_spill_enlarges_the_captured_rect() {
        // one-band 6x6; dispersion shifts every latent pixel one column left
        // into the captured frame: captured(r, c) = latent(r, c + 1)
        let latent = ImageGeometry::new(6, 6, 1);
        let mut d = CooMat::zeros(36, 36);
        for r in 0..6 {
            for c in 0..5 {
                d.push(latent.pixel_index(r, c), latent.pixel_index(r, c + 1), 1.0);
            }
        }

        let index = DispersionIndex::build(&d, &latent);
        let plan = plan_patch(&latent, 6, 6, Some(&index), &spec(2, 2, 2, 0)).unwrap();
        // latent cols 2..4 are referenced by captured cols 1..3
        assert_eq!(plan.captured_rect, PixelRect::new(2, 1, 2, 2));
        let local = plan.local_dispersion.unwrap();
        assert_eq!(local.nrows(), plan.captured_map.len());
        assert_eq!(local.ncols(), plan.latent_map.len());
        assert_eq!(local.nnz(), 4);
    }

    #[test]
    fn dispersion_index_collects_all_bands_of_a_pixel() {
        let latent = ImageGeometry::new(4, 4, 2);
        let d = CooMat::identity(latent.num_values());
        let index = DispersionIndex::build(&d, &latent);

        let plan = plan_patch(&latent, 4, 4, Some(&index), &spec(1, 1, 2, 0)).unwrap();
        assert_eq!(plan.captured_rect, PixelRect::new(1, 1, 2, 2));
        let local = plan.local_dispersion.unwrap();
        // 4 pixels x 2 bands, one diagonal entry each
        assert_eq!(local.nnz(), 8);
        assert_eq!(local.nrows(), 8);
        assert_eq!(local.ncols(), 8);
    }

    #[test]
    fn out_of_bounds_patch_is_rejected() {
        let latent = ImageGeometry::new(8, 8, 1);
        assert!(plan_patch(&latent, 8, 8, None, &spec(6, 6, 4, 0)).is_err());
    }
}
