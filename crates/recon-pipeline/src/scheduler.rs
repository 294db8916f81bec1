//! The tiled solve.
//!
//! Iterates a regular grid of output patches, solves each against its slice
//! of the captured data, trims the padding and stitches the result into the
//! full output image. Patches are independent pure computations over shared
//! read-only inputs, so the grid runs in parallel; a failed patch fails the
//! whole solve (a silently skipped tile would corrupt the image with no
//! diagnostic).

use crate::patch::{plan_patch, DispersionIndex, PatchSpec};
use anyhow::{ensure, Context, Result};
use log::debug;
use rayon::prelude::*;
use recon_admm::{solve_admm, AdmmOptions, AdmmReport};
use recon_core::{CapturedImage, CfaPattern, CooMat, ImageBuffer, ImageGeometry, Real};
use recon_operators::{
    validate_dispersion, ForwardModel, IntegrationMode, RegConfig, SpectralSensitivity,
};
use serde::{Deserialize, Serialize};

/// Configuration of a tiled reconstruction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TiledSolveConfig {
    /// Output tile edge length.
    pub patch_size: usize,
    /// Padding radius solved around each tile and trimmed before stitching.
    pub pad: usize,
    pub reg: RegConfig,
    pub admm: AdmmOptions,
    pub integration: IntegrationMode,
    /// Also return the dispersion operator restricted to the solved patches.
    pub accumulate_dispersion: bool,
    /// Solve patches on the rayon pool instead of sequentially.
    pub parallel: bool,
}

impl Default for TiledSolveConfig {
    fn default() -> Self {
        Self {
            patch_size: 32,
            pad: 4,
            reg: RegConfig::disabled(),
            admm: AdmmOptions::default(),
            integration: IntegrationMode::Discrete,
            accumulate_dispersion: false,
            parallel: true,
        }
    }
}

/// Aggregated per-patch diagnostics.
#[derive(Debug, Clone)]
pub struct TiledSolveReport {
    pub patches: usize,
    pub max_iterations: usize,
    pub all_converged: bool,
    pub worst_primal_residual: Real,
    pub worst_dual_residual: Real,
}

/// Result of a tiled reconstruction.
#[derive(Debug, Clone)]
pub struct TiledSolveOutput {
    pub image: ImageBuffer,
    /// Dispersion operator restricted to the solved patches, if requested
    /// and a dispersion operator was supplied.
    pub dispersion: Option<CooMat>,
    pub report: TiledSolveReport,
}

struct PatchResult {
    spec: PatchSpec,
    trimmed: ImageBuffer,
    report: AdmmReport,
}

/// Regular grid of output patches covering the latent image; edge patches
/// shrink to the remaining extent.
fn patch_grid(latent: &ImageGeometry, patch_size: usize, pad: usize) -> Vec<PatchSpec> {
    let mut specs = Vec::new();
    let mut row = 0;
    while row < latent.height {
        let height = patch_size.min(latent.height - row);
        let mut col = 0;
        while col < latent.width {
            let width = patch_size.min(latent.width - col);
            specs.push(PatchSpec {
                row,
                col,
                height,
                width,
                pad,
            });
            col += width;
        }
        row += height;
    }
    specs
}

#[allow(clippy::too_many_arguments)]
fn solve_patch(
    spec: &PatchSpec,
    captured: &CapturedImage,
    pattern: Option<&CfaPattern>,
    sensitivity: Option<&SpectralSensitivity>,
    dispersion: Option<&DispersionIndex<'_>>,
    latent: &ImageGeometry,
    config: &TiledSolveConfig,
) -> Result<PatchResult> {
    let captured_geom = *captured.buffer().geometry();
    let plan = plan_patch(latent, captured_geom.height, captured_geom.width, dispersion, spec)
        .with_context(|| format!("failed to plan patch at ({}, {})", spec.row, spec.col))?;

    let local_latent = latent.window(&plan.padded);
    let local_pattern =
        pattern.map(|p| p.shifted(plan.captured_rect.row % 2, plan.captured_rect.col % 2));

    let b = captured
        .buffer()
        .window(&plan.captured_rect)
        .with_context(|| format!("failed to slice captured data at ({}, {})", spec.row, spec.col))?
        .as_vector();

    let model = ForwardModel::build(
        &local_latent,
        plan.captured_rect.height,
        plan.captured_rect.width,
        local_pattern.as_ref(),
        sensitivity,
        config.integration,
        plan.local_dispersion.as_ref(),
        &config.reg,
    )
    .with_context(|| format!("failed to build operators for patch at ({}, {})", spec.row, spec.col))?;

    let (x, report) = solve_admm(&model, &b, &config.admm)
        .with_context(|| format!("patch solve failed at ({}, {})", spec.row, spec.col))?;
    debug!(
        "patch ({}, {}): {} iterations, converged = {}",
        spec.row, spec.col, report.iterations, report.converged
    );

    let local_image = ImageBuffer::from_vector(local_latent, &x)?;
    let trimmed = local_image.window(&plan.trim)?;

    Ok(PatchResult {
        spec: *spec,
        trimmed,
        report,
    })
}

/// Reconstruct the full latent image patch by patch.
pub fn reconstruct_tiled(
    captured: &CapturedImage,
    pattern: Option<&CfaPattern>,
    sensitivity: Option<&SpectralSensitivity>,
    dispersion: Option<&CooMat>,
    latent: &ImageGeometry,
    config: &TiledSolveConfig,
) -> Result<TiledSolveOutput> {
    ensure!(config.patch_size > 0, "patch size must be positive");
    ensure!(
        latent.height > 0 && latent.width > 0 && latent.bands > 0,
        "latent geometry must be non-empty"
    );

    let captured_geom = *captured.buffer().geometry();
    match captured {
        CapturedImage::Mosaiced(_) => {
            ensure!(
                pattern.is_some(),
                "mosaiced capture requires a CFA pattern descriptor"
            );
            ensure!(
                captured_geom.bands == 1,
                "mosaiced capture must be a single plane, got {} bands",
                captured_geom.bands
            );
        }
        CapturedImage::MultiChannel(_) => {
            ensure!(
                pattern.is_none(),
                "multi-channel capture must not carry a CFA pattern"
            );
            let channels = sensitivity.map_or(latent.bands, SpectralSensitivity::channels);
            ensure!(
                captured_geom.bands == channels,
                "multi-channel capture has {} bands, the model produces {}",
                captured_geom.bands,
                channels
            );
        }
    }
    if let Some(d) = dispersion {
        validate_dispersion(d, &captured_geom.with_bands(latent.bands), latent)
            .context("full-image dispersion operator")?;
    }

    let specs = patch_grid(latent, config.patch_size, config.pad);
    debug!(
        "tiled solve: {} patches of up to {}x{} (+{} pad) over {}x{}x{}",
        specs.len(),
        config.patch_size,
        config.patch_size,
        config.pad,
        latent.height,
        latent.width,
        latent.bands
    );

    let dispersion_index = dispersion.map(|d| DispersionIndex::build(d, latent));
    let solve = |spec: &PatchSpec| {
        solve_patch(
            spec,
            captured,
            pattern,
            sensitivity,
            dispersion_index.as_ref(),
            latent,
            config,
        )
    };
    let results: Vec<PatchResult> = if config.parallel {
        specs.par_iter().map(solve).collect::<Result<_>>()?
    } else {
        specs.iter().map(solve).collect::<Result<_>>()?
    };

    let mut image = ImageBuffer::zeros(*latent);
    // The unpadded tiles partition the latent image, so each dispersion
    // entry's column pixel belongs to exactly one solved patch and the
    // block-wise union over the full grid is one pass over the operator.
    let accumulated = match (config.accumulate_dispersion, dispersion) {
        (true, Some(d)) => {
            let mut acc = CooMat::zeros(d.nrows(), d.ncols());
            for &(row, col, value) in d.triplets() {
                acc.push(row, col, value);
            }
            acc.compress();
            Some(acc)
        }
        _ => None,
    };
    let mut report = TiledSolveReport {
        patches: results.len(),
        max_iterations: 0,
        all_converged: true,
        worst_primal_residual: 0.0,
        worst_dual_residual: 0.0,
    };

    for result in results {
        image.write_window(&result.spec.rect(), &result.trimmed)?;
        report.max_iterations = report.max_iterations.max(result.report.iterations);
        report.all_converged &= result.report.converged;
        report.worst_primal_residual = report
            .worst_primal_residual
            .max(result.report.primal_residual);
        report.worst_dual_residual = report.worst_dual_residual.max(result.report.dual_residual);
    }

    Ok(TiledSolveOutput {
        image,
        dispersion: accumulated,
        report,
    })
}

/// Solve the whole image as a single unpadded patch.
pub fn reconstruct_whole(
    captured: &CapturedImage,
    pattern: Option<&CfaPattern>,
    sensitivity: Option<&SpectralSensitivity>,
    dispersion: Option<&CooMat>,
    latent: &ImageGeometry,
    config: &TiledSolveConfig,
) -> Result<TiledSolveOutput> {
    let whole = TiledSolveConfig {
        patch_size: latent.height.max(latent.width),
        pad: 0,
        ..config.clone()
    };
    reconstruct_tiled(captured, pattern, sensitivity, dispersion, latent, &whole)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn grid_covers_the_image_exactly() {
        let latent = ImageGeometry::new(10, 7, 1);
        let specs = patch_grid(&latent, 4, 2);
        assert_eq!(specs.len(), 3 * 2);
        let mut covered = vec![false; 70];
        for spec in &specs {
            for r in spec.row..spec.row + spec.height {
                for c in spec.col..spec.col + spec.width {
                    let idx = r * 7 + c;
                    assert!(!covered[idx], "tile overlap at ({r}, {c})");
                    covered[idx] = true;
                }
            }
        }
        assert!(covered.iter().all(|&v| v));
    }

    #[test]
    fn config_serde_round_trip() {
        let config = TiledSolveConfig::default();
        let json = serde_json::to_string(&config).unwrap();
        let back: TiledSolveConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back.patch_size, config.patch_size);
        assert_eq!(back.reg, config.reg);
    }
}
