//! Spectral-to-channel conversion operator.
//!
//! A sensitivity matrix maps per-pixel latent band values to per-pixel
//! captured channel values. In quadrature mode each band column is further
//! weighted by its trapezoidal wavelength step so the matrix acts as a
//! numerical integral over the continuous spectrum; in discrete mode the
//! sensitivity entries are used as-is (the bands are already discrete
//! channels).

use crate::error::OperatorError;
use nalgebra::DMatrix;
use recon_core::{CooMat, ImageGeometry, Real};
use serde::{Deserialize, Serialize};

/// Per-channel spectral response of the sensor, sampled at the latent bands.
#[derive(Debug, Clone, PartialEq)]
pub struct SpectralSensitivity {
    /// `channels x bands` response matrix.
    values: DMatrix<Real>,
    /// Wavelength of each band, ascending. Required for quadrature mode.
    wavelengths: Vec<Real>,
}

impl SpectralSensitivity {
    pub fn new(values: DMatrix<Real>, wavelengths: Vec<Real>) -> Result<Self, OperatorError> {
        if wavelengths.len() != values.ncols() {
            return Err(OperatorError::WavelengthCount {
                expected: values.ncols(),
                got: wavelengths.len(),
            });
        }
        Ok(Self {
            values,
            wavelengths,
        })
    }

    pub fn channels(&self) -> usize {
        self.values.nrows()
    }

    pub fn bands(&self) -> usize {
        self.values.ncols()
    }

    pub fn value(&self, channel: usize, band: usize) -> Real {
        self.values[(channel, band)]
    }

    pub fn wavelengths(&self) -> &[Real] {
        &self.wavelengths
    }
}

/// Whether spectral-to-channel conversion integrates over wavelength.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum IntegrationMode {
    /// Bands are already discrete channels; sensitivity entries are applied
    /// without wavelength weighting.
    Discrete,
    /// Trapezoidal quadrature over the wavelength list.
    Quadrature,
}

/// Trapezoidal quadrature weights for an ascending wavelength grid.
pub fn quadrature_weights(wavelengths: &[Real]) -> Vec<Real> {
    let n = wavelengths.len();
    if n <= 1 {
        return vec![1.0; n];
    }
    (0..n)
        .map(|i| {
            let lo = if i == 0 { wavelengths[0] } else { wavelengths[i - 1] };
            let hi = if i + 1 == n {
                wavelengths[n - 1]
            } else {
                wavelengths[i + 1]
            };
            (hi - lo) / 2.0
        })
        .collect()
}

/// Build the conversion operator for a `height x width` captured rectangle.
///
/// Rows: `pixels * channels`. Columns: `pixels * bands`. Both sides are
/// band-planar, and the operator is purely per-pixel (block diagonal up to
/// the planar permutation).
pub fn channel_conversion_operator(
    height: usize,
    width: usize,
    sensitivity: &SpectralSensitivity,
    mode: IntegrationMode,
) -> CooMat {
    let bands = sensitivity.bands();
    let channels = sensitivity.channels();
    let in_geom = ImageGeometry::new(height, width, bands);
    let out_geom = ImageGeometry::new(height, width, channels);

    let band_weights = match mode {
        IntegrationMode::Discrete => vec![1.0; bands],
        IntegrationMode::Quadrature => quadrature_weights(sensitivity.wavelengths()),
    };

    let mut op = CooMat::zeros(out_geom.num_values(), in_geom.num_values());
    let num_pixels = in_geom.num_pixels();
    for channel in 0..channels {
        for band in 0..bands {
            let weight = sensitivity.value(channel, band) * band_weights[band];
            if weight == 0.0 {
                continue;
            }
            for pixel in 0..num_pixels {
                op.push(channel * num_pixels + pixel, band * num_pixels + pixel, weight);
            }
        }
    }
    op
}
