//! Generalized conjugate gradient (Orthomin-style, spec §4.7): like CG but
//! `A`-orthogonalizes each new preconditioned search direction against a
//! bounded window of previous ones instead of assuming symmetry gives a
//! three-term recurrence for free. Used standalone for nonsymmetric systems
//! and, in compressed form, as the inner combination rule of the nonlinear
//! AMLI cycle (spec §4.6; see [`crate::amg::cycle`]'s embedded copy, kept
//! separate to avoid a module cycle — see that module's doc comment).

use crate::error::{SolverError, SolverResult};
use crate::params::ItsParam;
use crate::precond::Preconditioner;
use crate::sparse::CsrMatrix;
use crate::types::Vector;

use super::common::{check_finite, check_solution_stagnation, initial_denominator, is_breakdown, relative_residual, SolverStatus};

pub fn gcg(a: &CsrMatrix, b: &Vector, x: &mut Vector, m: &dyn Preconditioner, param: &ItsParam) -> SolverResult<SolverStatus> {
    let n = b.len();
    let mut r = b.clone();
    a.spmv_axpy(-1.0, x, &mut r)?;

    let r0_norm = r.norm();
    let denom = initial_denominator(param.stop_type, r0_norm, r0_norm, x.amax());
    if r0_norm <= crate::types::EPS_DENOM {
        return Ok(SolverStatus { iters: 0, relres: 0.0, converged: true });
    }

    // Bounded window of previous (search direction, A * direction) pairs,
    // capped at `restart` entries (Orthomin(k) truncation) to bound memory
    // and cost per step.
    let window = param.restart.max(1);
    let mut directions: Vec<(Vector, Vector)> = Vec::with_capacity(window);
    let mut stag_count = 0u32;

    for iter in 1..=param.maxit {
        let mut z = Vector::zeros(n);
        m.apply(&r, &mut z)?;
        let mut p = z;

        for (pi, api) in &directions {
            let denom_i = api.dot(api);
            if is_breakdown(denom_i) {
                continue;
            }
            let beta = api.dot(&p) / denom_i;
            p -= beta * pi;
        }

        let mut ap = Vector::zeros(n);
        a.spmv(&p, &mut ap)?;
        let ap_norm_sq = ap.dot(&ap);
        if is_breakdown(ap_norm_sq) {
            return Err(SolverError::Breakdown(format!("GCG: ||Ap||^2 = {ap_norm_sq:e}")));
        }
        let alpha = r.dot(&ap) / ap_norm_sq;

        let x_prev_norm = x.norm();
        *x += alpha * &p;
        r -= alpha * &ap;

        check_finite(x)?;
        check_solution_stagnation(x)?;

        let r_norm = r.norm();
        let relres = relative_residual(param.stop_type, r_norm, r_norm, denom);
        if relres <= param.tol {
            return Ok(SolverStatus { iters: iter, relres, converged: true });
        }

        let update_size = (x.norm() - x_prev_norm).abs();
        if update_size < crate::types::EPS_DENOM * x_prev_norm.max(1.0) {
            stag_count += 1;
            if stag_count >= super::common::MAX_STAG {
                return Err(SolverError::Stagnation(stag_count));
            }
        } else {
            stag_count = 0;
        }

        if directions.len() >= window {
            directions.clear();
        }
        directions.push((p, ap));
    }

    let final_relres = relative_residual(param.stop_type, r.norm(), r.norm(), denom);
    Err(SolverError::MaxIterationsReached(param.maxit, final_relres))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::precond::IdentityPreconditioner;
    use crate::sparse::CooMatrix;

    fn advection_diffusion(n: usize) -> CsrMatrix {
        let mut coo = CooMatrix::new(n, n);
        for i in 0..n {
            coo.push(i, i, 4.0);
            if i > 0 {
                coo.push(i, i - 1, -1.5);
            }
            if i + 1 < n {
                coo.push(i, i + 1, -0.5);
            }
        }
        CsrMatrix::from_coo(&coo)
    }

    #[test]
    fn gcg_converges_on_nonsymmetric_system() {
        let n = 30;
        let a = advection_diffusion(n);
        let b = Vector::from_element(n, 1.0);
        let mut x = Vector::zeros(n);
        let param = ItsParam { restart: 15, ..ItsParam::bicgstab().with_tol(1e-9).with_maxit(500) };
        let status = gcg(&a, &b, &mut x, &IdentityPreconditioner, &param).unwrap();
        assert!(status.converged);

        let mut r = b.clone();
        a.spmv_axpy(-1.0, &x, &mut r).unwrap();
        assert!(r.norm() / b.norm() < 1e-6);
    }
}
