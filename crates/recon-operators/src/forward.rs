//! Forward-model composition and regularizer setup.
//!
//! [`ForwardModel::build`] validates the configuration, composes
//! `A_fwd = Mosaic * ChannelConversion * Dispersion` from the factors that
//! are present, builds the enabled regularization operators and
//! pre-normalizes their weights. All configuration errors surface here,
//! before any solver iteration starts.

use crate::antimosaic::anti_mosaic_operator;
use crate::conversion::{channel_conversion_operator, IntegrationMode, SpectralSensitivity};
use crate::dispersion::validate_dispersion;
use crate::error::OperatorError;
use crate::gradient::{spatial_gradient_operator, spectral_spatial_operator};
use crate::mosaic::mosaic_operator;
use recon_core::{CfaPattern, CooMat, ImageGeometry, Real};
use serde::{Deserialize, Serialize};

/// The closed set of regularization operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RegKind {
    /// First-order spatial gradient, per band.
    SpatialGradient,
    /// Band difference of the spatial gradient (mixed second-order term).
    SpectralGradient,
    /// Second differences tuned to the mosaic frequency.
    AntiMosaic,
}

impl RegKind {
    pub const ALL: [RegKind; 3] = [
        RegKind::SpatialGradient,
        RegKind::SpectralGradient,
        RegKind::AntiMosaic,
    ];

    /// Position of this term in weight / norm / penalty vectors.
    pub fn index(self) -> usize {
        match self {
            RegKind::SpatialGradient => 0,
            RegKind::SpectralGradient => 1,
            RegKind::AntiMosaic => 2,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            RegKind::SpatialGradient => "spatial gradient",
            RegKind::SpectralGradient => "spectral gradient",
            RegKind::AntiMosaic => "anti-mosaic",
        }
    }
}

/// Norm choice per regularization term. L2 terms fold into the quadratic
/// system; L1 terms become ADMM splitting variables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RegNorm {
    L1,
    L2,
}

/// Weights and norm selectors for the three regularization terms, indexed by
/// [`RegKind::index`]. A zero weight disables the term entirely.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RegConfig {
    pub weights: [Real; 3],
    pub norms: [RegNorm; 3],
}

impl Default for RegConfig {
    fn default() -> Self {
        Self::disabled()
    }
}

impl RegConfig {
    /// All terms disabled.
    pub fn disabled() -> Self {
        Self {
            weights: [0.0; 3],
            norms: [RegNorm::L1; 3],
        }
    }

    pub fn weight(&self, kind: RegKind) -> Real {
        self.weights[kind.index()]
    }

    pub fn norm(&self, kind: RegKind) -> RegNorm {
        self.norms[kind.index()]
    }

    /// Negative weights are a fatal configuration error.
    pub fn validate(&self) -> Result<(), OperatorError> {
        for kind in RegKind::ALL {
            let weight = self.weight(kind);
            if weight < 0.0 {
                return Err(OperatorError::NegativeWeight {
                    kind: kind.label(),
                    weight,
                });
            }
        }
        Ok(())
    }
}

/// An enabled regularization term with its pre-normalized weight.
#[derive(Debug, Clone)]
pub struct Regularizer {
    pub kind: RegKind,
    pub op: CooMat,
    /// Input weight scaled by `A_fwd rows / op rows`.
    pub weight: Real,
    pub norm: RegNorm,
}

/// Composed forward operator plus the enabled regularizers for one solve.
#[derive(Debug, Clone)]
pub struct ForwardModel {
    /// `A_fwd`, mapping the stacked latent vector to the captured data vector.
    pub operator: CooMat,
    pub latent: ImageGeometry,
    pub regularizers: Vec<Regularizer>,
}

impl ForwardModel {
    /// Compose the forward operator and regularizers for one (patch-local or
    /// whole-image) solve.
    ///
    /// `captured_height`/`captured_width` describe the captured rectangle,
    /// which can differ from the latent sampling when a dispersion operator
    /// warps across its boundary. `pattern` must already be shifted for the
    /// rectangle's corner. Absent factors are simply omitted from the
    /// product; with no factors at all the forward operator is the identity.
    #[allow(clippy::too_many_arguments)]
    pub fn build(
        latent: &ImageGeometry,
        captured_height: usize,
        captured_width: usize,
        pattern: Option<&CfaPattern>,
        sensitivity: Option<&SpectralSensitivity>,
        mode: IntegrationMode,
        dispersion: Option<&CooMat>,
        reg: &RegConfig,
    ) -> Result<Self, OperatorError> {
        reg.validate()?;

        let captured = ImageGeometry::new(captured_height, captured_width, latent.bands);
        let captured_pixels = captured.num_pixels();

        // Channel count after conversion; without a sensitivity matrix the
        // latent bands are already the captured channels.
        let channels = match sensitivity {
            Some(s) => {
                if s.bands() != latent.bands {
                    return Err(OperatorError::BandMismatch {
                        sensitivity_bands: s.bands(),
                        latent_bands: latent.bands,
                    });
                }
                s.channels()
            }
            None => latent.bands,
        };
        if let Some(p) = pattern {
            if p.num_channels() != channels {
                return Err(OperatorError::ChannelMismatch {
                    pattern_channels: p.num_channels(),
                    channels,
                });
            }
        }

        if let Some(d) = dispersion {
            validate_dispersion(d, &captured, latent)?;
        } else if captured_pixels != latent.num_pixels() {
            return Err(OperatorError::CapturedLatentMismatch {
                captured_pixels,
                latent_pixels: latent.num_pixels(),
            });
        }

        // Right-to-left factor list: dispersion, then conversion, then mosaic.
        let mut factors: Vec<CooMat> = Vec::new();
        if let Some(d) = dispersion {
            factors.push(d.clone());
        }
        if let Some(s) = sensitivity {
            factors.push(channel_conversion_operator(
                captured_height,
                captured_width,
                s,
                mode,
            ));
        }
        if let Some(p) = pattern {
            factors.push(mosaic_operator(captured_height, captured_width, p));
        }

        let mut operator = match factors.first() {
            None => CooMat::identity(latent.num_values()),
            Some(first) => first.clone(),
        };
        for factor in factors.iter().skip(1) {
            operator = factor.matmul(&operator)?;
        }

        let mut regularizers = Vec::new();
        for kind in RegKind::ALL {
            let weight = reg.weight(kind);
            if weight == 0.0 {
                continue;
            }
            let op = match kind {
                RegKind::SpatialGradient => spatial_gradient_operator(latent),
                RegKind::SpectralGradient => spectral_spatial_operator(latent),
                RegKind::AntiMosaic => anti_mosaic_operator(latent),
            };
            if op.nrows() == 0 {
                // The geometry has no support for this term (e.g. a single
                // band for the spectral gradient); it contributes nothing.
                continue;
            }
            let normalized = weight * operator.nrows() as Real / op.nrows() as Real;
            regularizers.push(Regularizer {
                kind,
                op,
                weight: normalized,
                norm: reg.norm(kind),
            });
        }

        Ok(Self {
            operator,
            latent: *latent,
            regularizers,
        })
    }
}
