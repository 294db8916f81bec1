//! Scaled-dual ADMM iteration.
//!
//! The fixed system matrix
//! `K = A_fwd^T A_fwd + sum_{L2} weight G^T G + sum_{splits} rho G^T G`
//! is factored once per solve; every outer iteration then costs one sparse
//! triangular solve plus the proximal and dual updates of each splitting
//! variable. Termination follows the usual primal/dual residual test, both
//! residuals checked against combined absolute and relative tolerances.

use crate::error::AdmmError;
use crate::shrinkage::soft_threshold;
use crate::terms::{build_active_set, Prox};
use faer::linalg::solvers::SpSolver;
use faer::sparse::linalg::solvers::Lu;
use faer::Col;
use log::debug;
use nalgebra::DVector;
use recon_core::{CooMat, Real};
use recon_operators::{ForwardModel, RegKind};
use serde::{Deserialize, Serialize};

/// Iteration and termination knobs of the ADMM core.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdmmOptions {
    pub max_iters: usize,
    /// Absolute residual tolerance.
    pub abs_tol: Real,
    /// Relative residual tolerance.
    pub rel_tol: Real,
    /// Enforce `x >= 0` through an extra splitting variable.
    pub nonneg: bool,
    /// Penalty parameters, indexed `[spatial, spectral, anti-mosaic,
    /// non-negativity]`. The fourth entry is required whenever `nonneg` is
    /// set.
    pub rhos: Vec<Real>,
}

impl Default for AdmmOptions {
    fn default() -> Self {
        Self {
            max_iters: 50,
            abs_tol: 1e-6,
            rel_tol: 1e-4,
            nonneg: false,
            rhos: vec![1.0; 4],
        }
    }
}

/// Diagnostics of one solve.
#[derive(Debug, Clone)]
pub struct AdmmReport {
    /// Outer iterations run; zero for the direct (no-splitting) path.
    pub iterations: usize,
    pub converged: bool,
    pub primal_residual: Real,
    pub dual_residual: Real,
    /// `||G_w x||` per enabled regularizer, for external weight selection.
    pub term_norms: Vec<(RegKind, Real)>,
}

/// One sparse LU factorization, reused across iterations.
struct Factorized {
    lu: Lu<usize, f64>,
    n: usize,
}

impl Factorized {
    fn new(mat: &CooMat) -> Result<Self, AdmmError> {
        let csc = mat.to_faer()?;
        // faer's sparse LU panics on structurally singular input instead of
        // returning an error.
        let lu = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| csc.sp_lu().ok()))
            .ok()
            .flatten()
            .ok_or(AdmmError::SingularSystem)?;
        Ok(Self { lu, n: mat.ncols() })
    }

    fn solve(&self, rhs: &DVector<Real>) -> DVector<Real> {
        let col = Col::<f64>::from_fn(self.n, |i| rhs[i]);
        let sol = self.lu.solve(&col);
        DVector::from_fn(self.n, |i, _| sol[i])
    }
}

fn ensure_finite(x: &DVector<Real>, iteration: usize) -> Result<(), AdmmError> {
    if x.iter().all(|v| v.is_finite()) {
        Ok(())
    } else {
        Err(AdmmError::NonFinite { iteration })
    }
}

fn term_norms(model: &ForwardModel, x: &DVector<Real>) -> Vec<(RegKind, Real)> {
    model
        .regularizers
        .iter()
        .map(|reg| (reg.kind, reg.op.matvec(x).norm()))
        .collect()
}

/// Direct unregularized least-squares solve of `A_fwd x = b`.
///
/// Used internally for degenerate configurations and exposed for
/// diagnostics; the regular entry point is [`solve_admm`].
pub fn least_squares(model: &ForwardModel, b: &DVector<Real>) -> Result<DVector<Real>, AdmmError> {
    if b.len() != model.operator.nrows() {
        return Err(AdmmError::DataLength {
            expected: model.operator.nrows(),
            got: b.len(),
        });
    }
    let factor = Factorized::new(&model.operator.gram())?;
    let x = factor.solve(&model.operator.transpose_matvec(b));
    ensure_finite(&x, 0)?;
    Ok(x)
}

/// Solve the regularized reconstruction problem for one patch or whole
/// image.
///
/// Degenerate configurations behave as specified: an empty active set (all
/// weights zero, non-negativity off) is a configuration error, and an
/// L2-only active set collapses to a single direct solve of the folded
/// system. With the non-negativity constraint active the returned solution
/// is the constraint's splitting variable, which is feasible by
/// construction; the primal iterate is non-negative only to within the
/// termination tolerance.
pub fn solve_admm(
    model: &ForwardModel,
    b: &DVector<Real>,
    opts: &AdmmOptions,
) -> Result<(DVector<Real>, AdmmReport), AdmmError> {
    if b.len() != model.operator.nrows() {
        return Err(AdmmError::DataLength {
            expected: model.operator.nrows(),
            got: b.len(),
        });
    }
    let set = build_active_set(model, opts)?;

    let atb = model.operator.transpose_matvec(b);
    let mut a_const = model.operator.gram();
    for (op, weight) in &set.folded {
        a_const = a_const.add(&op.gram().scaled(*weight))?;
    }

    if set.splits.is_empty() {
        // Every enabled term uses the L2 norm: one direct solve.
        let factor = Factorized::new(&a_const)?;
        let x = factor.solve(&atb);
        ensure_finite(&x, 0)?;
        debug!("admm: no splitting variables, solved folded system directly");
        let report = AdmmReport {
            iterations: 0,
            converged: true,
            primal_residual: 0.0,
            dual_residual: 0.0,
            term_norms: term_norms(model, &x),
        };
        return Ok((x, report));
    }

    let mut k_mat = a_const;
    for split in &set.splits {
        k_mat = k_mat.add(&split.op.gram().scaled(split.rho))?;
    }
    let factor = Factorized::new(&k_mat)?;
    debug!(
        "admm: {} splitting variable(s): {}",
        set.splits.len(),
        set.splits
            .iter()
            .map(|s| s.label)
            .collect::<Vec<_>>()
            .join(", ")
    );

    let n = model.operator.ncols();
    let total_split_rows: usize = set.splits.iter().map(|s| s.op.nrows()).sum();
    let mut z: Vec<DVector<Real>> = set
        .splits
        .iter()
        .map(|s| DVector::zeros(s.op.nrows()))
        .collect();
    let mut u = z.clone();

    let mut x = DVector::zeros(n);
    let mut iterations = 0;
    let mut converged = false;
    let mut primal = Real::INFINITY;
    let mut dual = Real::INFINITY;

    for iter in 0..opts.max_iters {
        let mut rhs = atb.clone();
        for (split, (z_w, u_w)) in set.splits.iter().zip(z.iter().zip(u.iter())) {
            rhs += split.op.transpose_matvec(&(z_w - u_w)) * split.rho;
        }
        x = factor.solve(&rhs);
        ensure_finite(&x, iter)?;

        let mut primal_sq = 0.0;
        let mut dual_sq = 0.0;
        let mut gx_sq = 0.0;
        let mut z_sq = 0.0;
        let mut dual_scale_sq = 0.0;
        for (split, (z_w, u_w)) in set.splits.iter().zip(z.iter_mut().zip(u.iter_mut())) {
            let gx = split.op.matvec(&x);
            let v = &gx + &*u_w;
            let z_new = match split.prox {
                Prox::SoftThreshold { threshold } => v.map(|e| soft_threshold(e, threshold)),
                Prox::Clamp => v.map(|e| e.max(0.0)),
            };

            let dz = &z_new - &*z_w;
            dual_sq += (split.op.transpose_matvec(&dz) * split.rho).norm_squared();

            let residual = &gx - &z_new;
            primal_sq += residual.norm_squared();
            *u_w += residual;
            *z_w = z_new;

            gx_sq += gx.norm_squared();
            z_sq += z_w.norm_squared();
            dual_scale_sq += (split.op.transpose_matvec(u_w) * split.rho).norm_squared();
        }

        primal = primal_sq.sqrt();
        dual = dual_sq.sqrt();
        iterations = iter + 1;

        let eps_primal = (total_split_rows as Real).sqrt() * opts.abs_tol
            + opts.rel_tol * gx_sq.sqrt().max(z_sq.sqrt());
        let eps_dual =
            (n as Real).sqrt() * opts.abs_tol + opts.rel_tol * dual_scale_sq.sqrt();
        debug!(
            "admm iteration {iterations}: primal {primal:.3e} (eps {eps_primal:.3e}), \
             dual {dual:.3e} (eps {eps_dual:.3e})"
        );
        if primal <= eps_primal && dual <= eps_dual {
            converged = true;
            break;
        }
    }

    // the clamp term's z is exactly non-negative, unlike the primal iterate
    if let Some(idx) = set.splits.iter().position(|s| matches!(s.prox, Prox::Clamp)) {
        x = z[idx].clone();
    }

    let report = AdmmReport {
        iterations,
        converged,
        primal_residual: primal,
        dual_residual: dual,
        term_norms: term_norms(model, &x),
    };
    Ok((x, report))
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::DMatrix;
    use recon_core::ImageGeometry;
    use recon_operators::{IntegrationMode, RegConfig, RegNorm};

    fn identity_model(geom: &ImageGeometry, reg: &RegConfig) -> ForwardModel {
        ForwardModel::build(
            geom,
            geom.height,
            geom.width,
            None,
            None,
            IntegrationMode::Discrete,
            None,
            reg,
        )
        .unwrap()
    }

    fn dense_solve(m: &CooMat, rhs: &DVector<Real>) -> DVector<Real> {
        let mut d = DMatrix::<Real>::zeros(m.nrows(), m.ncols());
        for &(r, c, v) in m.triplets() {
            d[(r, c)] += v;
        }
        d.lu().solve(rhs).unwrap()
    }

    #[test]
    fn all_zero_weights_without_nonneg_is_an_error() {
        let geom = ImageGeometry::new(4, 4, 1);
        let model = identity_model(&geom, &RegConfig::disabled());
        let b = DVector::from_element(16, 1.0);
        let err = solve_admm(&model, &b, &AdmmOptions::default());
        assert!(matches!(err, Err(AdmmError::NoActiveTerms)));
    }

    #[test]
    fn l2_only_term_matches_closed_form_in_one_direct_solve() {
        let geom = ImageGeometry::new(4, 4, 1);
        let reg = RegConfig {
            weights: [0.5, 0.0, 0.0],
            norms: [RegNorm::L2; 3],
        };
        let model = identity_model(&geom, &reg);
        let b = DVector::from_fn(16, |i, _| ((i * 7) % 5) as Real - 2.0);

        let (x, report) = solve_admm(&model, &b, &AdmmOptions::default()).unwrap();
        assert_eq!(report.iterations, 0);
        assert!(report.converged);

        // closed form: (A^T A + w G^T G) x = A^T b with the normalized weight
        let reg_op = &model.regularizers[0];
        let system = model
            .operator
            .gram()
            .add(&reg_op.op.gram().scaled(reg_op.weight))
            .unwrap();
        let expected = dense_solve(&system, &model.operator.transpose_matvec(&b));
        assert!((&x - &expected).norm() < 1e-10);
    }

    #[test]
    fn identity_round_trip_with_nonneg_recovers_the_image() {
        let geom = ImageGeometry::new(4, 4, 2);
        let model = identity_model(&geom, &RegConfig::disabled());
        let truth = DVector::from_fn(geom.num_values(), |i, _| 0.1 + ((i % 7) as Real) * 0.1);
        let b = model.operator.matvec(&truth);

        let opts = AdmmOptions {
            nonneg: true,
            max_iters: 200,
            abs_tol: 1e-9,
            rel_tol: 1e-7,
            ..AdmmOptions::default()
        };
        let (x, report) = solve_admm(&model, &b, &opts).unwrap();
        assert!(report.converged, "did not converge: {report:?}");
        assert!((&x - &truth).norm() < 1e-4);
    }

    #[test]
    fn nonneg_clamps_exactly_the_negative_entry() {
        // 4x4 single band, identity forward operator, one negative target
        let geom = ImageGeometry::new(4, 4, 1);
        let model = identity_model(&geom, &RegConfig::disabled());
        let mut b = DVector::from_element(16, 0.5);
        b[5] = -0.3;

        let opts = AdmmOptions {
            nonneg: true,
            max_iters: 200,
            ..AdmmOptions::default()
        };
        let (x, _) = solve_admm(&model, &b, &opts).unwrap();
        assert!(x[5].abs() < 1e-4, "negative entry should clip to zero, got {}", x[5]);
        for i in 0..16 {
            assert!(x[i] >= 0.0);
            if i != 5 {
                assert!((x[i] - 0.5).abs() < 1e-4);
            }
        }
    }

    #[test]
    fn nonneg_result_is_feasible_at_default_tolerances() {
        // early termination leaves the primal iterate slightly negative; the
        // returned solution must still be feasible without tightening the
        // tolerances
        let geom = ImageGeometry::new(4, 4, 1);
        let model = identity_model(&geom, &RegConfig::disabled());
        let mut b = DVector::from_element(16, 0.5);
        b[5] = -0.3;

        let opts = AdmmOptions {
            nonneg: true,
            ..AdmmOptions::default()
        };
        let (x, report) = solve_admm(&model, &b, &opts).unwrap();
        assert!(report.converged);
        assert!(
            x.iter().all(|&v| v >= 0.0),
            "infeasible entry, min {}",
            x.min()
        );
    }

    #[test]
    fn nonneg_disabled_reproduces_unconstrained_result_on_nonneg_input() {
        let geom = ImageGeometry::new(4, 4, 1);
        let reg = RegConfig {
            weights: [0.1, 0.0, 0.0],
            norms: [RegNorm::L2; 3],
        };
        let model = identity_model(&geom, &reg);
        let b = DVector::from_fn(16, |i, _| 1.0 + (i as Real) * 0.05);

        let (unconstrained, _) = solve_admm(&model, &b, &AdmmOptions::default()).unwrap();
        assert!(unconstrained.iter().all(|&v| v >= 0.0));

        let opts = AdmmOptions {
            nonneg: true,
            max_iters: 300,
            abs_tol: 1e-9,
            rel_tol: 1e-7,
            ..AdmmOptions::default()
        };
        let (constrained, _) = solve_admm(&model, &b, &opts).unwrap();
        assert!((&unconstrained - &constrained).norm() < 1e-4);
    }

    #[test]
    fn l1_spatial_gradient_flattens_noise_on_a_constant_image() {
        let geom = ImageGeometry::new(6, 6, 1);
        let reg = RegConfig {
            weights: [2.0, 0.0, 0.0],
            norms: [RegNorm::L1; 3],
        };
        let model = identity_model(&geom, &reg);
        let b = DVector::from_fn(36, |i, _| 1.0 + if i % 2 == 0 { 0.05 } else { -0.05 });

        let opts = AdmmOptions {
            max_iters: 300,
            ..AdmmOptions::default()
        };
        let (x, report) = solve_admm(&model, &b, &opts).unwrap();
        assert!(report.iterations > 0);
        assert_eq!(report.term_norms.len(), 1);

        // the TV-style prior should shrink the alternating ripple
        let ripple = |v: &DVector<Real>| {
            let mean = v.mean();
            v.iter().map(|e| (e - mean).abs()).fold(0.0, Real::max)
        };
        assert!(ripple(&x) < ripple(&b));
    }

    #[test]
    fn zero_forward_operator_fails_the_solve() {
        let geom = ImageGeometry::new(2, 2, 1);
        let mut model = identity_model(&geom, &RegConfig::disabled());
        model.operator = CooMat::zeros(4, 4);
        let b = DVector::from_element(4, 1.0);
        assert!(least_squares(&model, &b).is_err());
    }

    #[test]
    fn data_length_is_validated() {
        let geom = ImageGeometry::new(2, 2, 1);
        let model = identity_model(&geom, &RegConfig::disabled());
        let b = DVector::from_element(3, 1.0);
        assert!(matches!(
            least_squares(&model, &b),
            Err(AdmmError::DataLength { .. })
        ));
    }
}
