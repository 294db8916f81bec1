//! Active-term classification.
//!
//! The per-term enable/disable decisions are made once here, producing a
//! tagged list the iteration loop walks without re-checking configuration:
//! L2 terms fold into the fixed quadratic system, L1 terms and the
//! non-negativity constraint each become one splitting variable.

use crate::error::AdmmError;
use crate::solver::AdmmOptions;
use recon_core::{CooMat, Real};
use recon_operators::{ForwardModel, RegNorm};

/// Index of the non-negativity penalty in the `rhos` vector, after the three
/// regularization terms.
pub(crate) const NONNEG_RHO_INDEX: usize = 3;

/// Proximal update of one splitting variable.
#[derive(Debug, Clone, Copy)]
pub(crate) enum Prox {
    /// `z = shrink(v, threshold)` for an L1 term.
    SoftThreshold { threshold: Real },
    /// `z = max(v, 0)` for the non-negativity constraint.
    Clamp,
}

/// One ADMM splitting variable: `z ~ G x` with penalty `rho`.
#[derive(Debug, Clone)]
pub(crate) struct SplitTerm {
    pub label: &'static str,
    pub op: CooMat,
    pub rho: Real,
    pub prox: Prox,
}

/// The classified terms of one solve.
#[derive(Debug, Clone)]
pub(crate) struct ActiveSet {
    /// `(G, weight)` pairs folded into the quadratic system.
    pub folded: Vec<(CooMat, Real)>,
    pub splits: Vec<SplitTerm>,
}

fn penalty(opts: &AdmmOptions, index: usize, label: &'static str) -> Result<Real, AdmmError> {
    let value = *opts
        .rhos
        .get(index)
        .ok_or(AdmmError::MissingPenalty {
            label,
            index,
            got: opts.rhos.len(),
        })?;
    if value <= 0.0 {
        return Err(AdmmError::NonPositivePenalty { label, value });
    }
    Ok(value)
}

/// Classify the model's enabled regularizers plus the optional
/// non-negativity constraint, validating penalty parameters as we go.
pub(crate) fn build_active_set(
    model: &ForwardModel,
    opts: &AdmmOptions,
) -> Result<ActiveSet, AdmmError> {
    if model.regularizers.is_empty() && !opts.nonneg {
        return Err(AdmmError::NoActiveTerms);
    }

    let mut folded = Vec::new();
    let mut splits = Vec::new();
    for reg in &model.regularizers {
        match reg.norm {
            RegNorm::L2 => folded.push((reg.op.clone(), reg.weight)),
            RegNorm::L1 => {
                let rho = penalty(opts, reg.kind.index(), reg.kind.label())?;
                splits.push(SplitTerm {
                    label: reg.kind.label(),
                    op: reg.op.clone(),
                    rho,
                    prox: Prox::SoftThreshold {
                        threshold: reg.weight / rho,
                    },
                });
            }
        }
    }

    if opts.nonneg {
        let rho = penalty(opts, NONNEG_RHO_INDEX, "non-negativity")?;
        splits.push(SplitTerm {
            label: "non-negativity",
            op: CooMat::identity(model.operator.ncols()),
            rho,
            prox: Prox::Clamp,
        });
    }

    Ok(ActiveSet { folded, splits })
}
