//! Band-planar image buffers.
//!
//! Storage is a flat `Vec<Real>` in band-planar order: the full plane of
//! band 0, then band 1, and so on. [`ImageBuffer::as_vector`] therefore
//! yields exactly the stacked vector every sparse operator acts on.

use crate::geometry::{ImageGeometry, PixelRect, Real};
use nalgebra::DVector;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ImageError {
    #[error("data length {got} does not match geometry ({expected} values)")]
    DataLength { expected: usize, got: usize },
    #[error("window {row}+{height} x {col}+{width} exceeds image bounds {image_height}x{image_width}")]
    WindowOutOfBounds {
        row: usize,
        col: usize,
        height: usize,
        width: usize,
        image_height: usize,
        image_width: usize,
    },
    #[error("band count mismatch: image has {expected} bands, window data has {got}")]
    BandMismatch { expected: usize, got: usize },
}

/// A multi-band image with band-planar flat storage.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageBuffer {
    geometry: ImageGeometry,
    data: Vec<Real>,
}

impl ImageBuffer {
    /// All-zero image of the given geometry.
    pub fn zeros(geometry: ImageGeometry) -> Self {
        Self {
            data: vec![0.0; geometry.num_values()],
            geometry,
        }
    }

    /// Wrap existing band-planar data.
    pub fn from_data(geometry: ImageGeometry, data: Vec<Real>) -> Result<Self, ImageError> {
        if data.len() != geometry.num_values() {
            return Err(ImageError::DataLength {
                expected: geometry.num_values(),
                got: data.len(),
            });
        }
        Ok(Self { geometry, data })
    }

    pub fn geometry(&self) -> &ImageGeometry {
        &self.geometry
    }

    pub fn data(&self) -> &[Real] {
        &self.data
    }

    pub fn get(&self, row: usize, col: usize, band: usize) -> Real {
        self.data[self.geometry.value_index(row, col, band)]
    }

    pub fn set(&mut self, row: usize, col: usize, band: usize, value: Real) {
        let idx = self.geometry.value_index(row, col, band);
        self.data[idx] = value;
    }

    /// The stacked band-planar vector.
    pub fn as_vector(&self) -> DVector<Real> {
        DVector::from_column_slice(&self.data)
    }

    /// Rebuild an image from a stacked vector.
    pub fn from_vector(geometry: ImageGeometry, vector: &DVector<Real>) -> Result<Self, ImageError> {
        Self::from_data(geometry, vector.iter().copied().collect())
    }

    fn check_window(&self, rect: &PixelRect) -> Result<(), ImageError> {
        if !rect.fits_in(self.geometry.height, self.geometry.width) {
            return Err(ImageError::WindowOutOfBounds {
                row: rect.row,
                col: rect.col,
                height: rect.height,
                width: rect.width,
                image_height: self.geometry.height,
                image_width: self.geometry.width,
            });
        }
        Ok(())
    }

    /// Copy a rectangular window (all bands) into a new buffer.
    pub fn window(&self, rect: &PixelRect) -> Result<ImageBuffer, ImageError> {
        self.check_window(rect)?;
        let geometry = self.geometry.window(rect);
        let mut out = ImageBuffer::zeros(geometry);
        for band in 0..geometry.bands {
            for r in 0..rect.height {
                for c in 0..rect.width {
                    out.set(r, c, band, self.get(rect.row + r, rect.col + c, band));
                }
            }
        }
        Ok(out)
    }

    /// Write a window buffer back at `rect` (all bands). Used for stitching
    /// trimmed patch results into the full output image.
    pub fn write_window(&mut self, rect: &PixelRect, window: &ImageBuffer) -> Result<(), ImageError> {
        self.check_window(rect)?;
        let wg = window.geometry();
        if wg.bands != self.geometry.bands {
            return Err(ImageError::BandMismatch {
                expected: self.geometry.bands,
                got: wg.bands,
            });
        }
        if wg.height != rect.height || wg.width != rect.width {
            return Err(ImageError::WindowOutOfBounds {
                row: rect.row,
                col: rect.col,
                height: wg.height,
                width: wg.width,
                image_height: self.geometry.height,
                image_width: self.geometry.width,
            });
        }
        for band in 0..wg.bands {
            for r in 0..rect.height {
                for c in 0..rect.width {
                    self.set(rect.row + r, rect.col + c, band, window.get(r, c, band));
                }
            }
        }
        Ok(())
    }
}

/// Captured sensor data: either a single mosaiced plane or a full
/// multi-channel stack (no mosaic).
#[derive(Debug, Clone, PartialEq)]
pub enum CapturedImage {
    /// One recorded channel per pixel site; geometry has `bands == 1`.
    Mosaiced(ImageBuffer),
    /// All channels recorded at every pixel.
    MultiChannel(ImageBuffer),
}

impl CapturedImage {
    pub fn buffer(&self) -> &ImageBuffer {
        match self {
            CapturedImage::Mosaiced(buf) | CapturedImage::MultiChannel(buf) => buf,
        }
    }

    pub fn is_mosaiced(&self) -> bool {
        matches!(self, CapturedImage::Mosaiced(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn window_round_trip() {
        let g = ImageGeometry::new(4, 4, 2);
        let mut img = ImageBuffer::zeros(g);
        for band in 0..2 {
            for r in 0..4 {
                for c in 0..4 {
                    img.set(r, c, band, (band * 100 + r * 10 + c) as Real);
                }
            }
        }

        let rect = PixelRect::new(1, 2, 2, 2);
        let win = img.window(&rect).unwrap();
        assert_eq!(win.get(0, 0, 0), 12.0);
        assert_eq!(win.get(1, 1, 1), 123.0);

        let mut blank = ImageBuffer::zeros(g);
        blank.write_window(&rect, &win).unwrap();
        assert_eq!(blank.get(2, 3, 1), 123.0);
        assert_eq!(blank.get(0, 0, 0), 0.0);
    }

    #[test]
    fn window_out_of_bounds_is_rejected() {
        let img = ImageBuffer::zeros(ImageGeometry::new(4, 4, 1));
        let rect = PixelRect::new(2, 2, 4, 4);
        assert!(matches!(
            img.window(&rect),
            Err(ImageError::WindowOutOfBounds { .. })
        ));
    }

    #[test]
    fn vector_round_trip_is_band_planar() {
        let g = ImageGeometry::new(2, 2, 2);
        let img = ImageBuffer::from_data(g, (0..8).map(|v| v as Real).collect()).unwrap();
        let v = img.as_vector();
        assert_eq!(v[0], img.get(0, 0, 0));
        assert_eq!(v[4], img.get(0, 0, 1));
        let back = ImageBuffer::from_vector(g, &v).unwrap();
        assert_eq!(back, img);
    }
}
