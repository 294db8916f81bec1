//! ADMM core for regularized multi-band reconstruction.
//!
//! Solves
//! `min_x 1/2 ||A_fwd x - b||^2 + sum_w weight_w ||G_w x||_{1 or 2}^2`
//! optionally subject to `x >= 0`, by the Alternating Direction Method of
//! Multipliers with scaled duals. L2 terms fold into the quadratic system;
//! L1 terms and the non-negativity constraint each own one splitting
//! variable. The normal-equation matrix is factored once per solve with
//! faer's sparse LU and reused across iterations.

mod error;
/// L1 proximal operator.
pub mod shrinkage;
/// ADMM iteration, options and diagnostics.
pub mod solver;
mod terms;

pub use error::AdmmError;
pub use shrinkage::soft_threshold;
pub use solver::{least_squares, solve_admm, AdmmOptions, AdmmReport};
