use recon_core::{Real, SparseError};
use thiserror::Error;

/// Configuration and numerical failures of the ADMM core.
///
/// Configuration variants are detected before the first iteration;
/// numerical variants abort the solve and propagate to the caller, which
/// must not attempt per-patch recovery.
#[derive(Debug, Error)]
pub enum AdmmError {
    #[error("every regularization weight is zero and non-negativity is disabled; refusing an unconstrained solve")]
    NoActiveTerms,
    #[error("penalty vector has {got} entries but the {label} term needs index {index}")]
    MissingPenalty {
        label: &'static str,
        index: usize,
        got: usize,
    },
    #[error("penalty for the {label} term must be positive, got {value}")]
    NonPositivePenalty { label: &'static str, value: Real },
    #[error("data vector has {got} entries, forward operator has {expected} rows")]
    DataLength { expected: usize, got: usize },
    #[error("system matrix factorization failed (singular or severely ill-conditioned)")]
    SingularSystem,
    #[error("iterate became non-finite at iteration {iteration}")]
    NonFinite { iteration: usize },
    #[error(transparent)]
    Sparse(#[from] SparseError),
}
