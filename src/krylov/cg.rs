//! Preconditioned conjugate gradient, Hestenes-Stiefel form (spec §4.7).

use crate::error::{SolverError, SolverResult};
use crate::params::ItsParam;
use crate::precond::Preconditioner;
use crate::sparse::CsrMatrix;
use crate::types::Vector;

use super::common::{check_finite, check_solution_stagnation, initial_denominator, is_breakdown, relative_residual, SolverStatus};

/// Solves `A x = b` in place (`x` is both the initial guess and the
/// result). `A` must be symmetric positive definite for the classical
/// convergence guarantee to hold; PCG will still run (and may still
/// converge) on a non-SPD system, but with no such guarantee.
pub fn pcg(a: &CsrMatrix, b: &Vector, x: &mut Vector, m: &dyn Preconditioner, param: &ItsParam) -> SolverResult<SolverStatus> {
    let n = b.len();
    let mut r = b.clone();
    a.spmv_axpy(-1.0, x, &mut r)?;

    let mut z = Vector::zeros(n);
    m.apply(&r, &mut z)?;
    let mut p = z.clone();

    let mut rz = r.dot(&z);
    let r0_norm = r.norm();
    let precond_r0_norm = rz.max(0.0).sqrt();
    let denom = initial_denominator(param.stop_type, r0_norm, precond_r0_norm, x.amax());

    if r0_norm <= crate::types::EPS_DENOM {
        return Ok(SolverStatus { iters: 0, relres: 0.0, converged: true });
    }

    let mut stag_count = 0u32;
    let mut ap = Vector::zeros(n);

    for iter in 1..=param.maxit {
        ap.fill(0.0);
        a.spmv(&p, &mut ap)?;
        let pap = p.dot(&ap);
        if is_breakdown(pap) {
            return Err(SolverError::Breakdown(format!("PCG: <Ap,p> = {pap:e}")));
        }
        let alpha = rz / pap;

        let x_prev_norm = x.norm();
        *x += alpha * &p;
        r -= alpha * &ap;

        check_finite(x)?;
        check_solution_stagnation(x)?;

        m.apply(&r, &mut z)?;
        let rz_new = r.dot(&z);

        let r_norm = r.norm();
        let precond_r_norm = rz_new.max(0.0).sqrt();
        let relres = relative_residual(param.stop_type, r_norm, precond_r_norm, denom);

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

        if is_breakdown(rz) {
            return Err(SolverError::Breakdown(format!("PCG: <r,z> = {rz:e}")));
        }
        let beta = rz_new / rz;
        p = &z + beta * &p;
        rz = rz_new;
    }

    let final_relres = relative_residual(param.stop_type, r.norm(), rz.max(0.0).sqrt(), denom);
    Err(SolverError::MaxIterationsReached(param.maxit, final_relres))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::precond::{DiagonalPreconditioner, IdentityPreconditioner};
    use crate::sparse::CooMatrix;

    fn poisson(n: usize) -> CsrMatrix {
        let mut coo = CooMatrix::new(n, n);
        for i in 0..n {
            coo.push(i, i, 2.0);
            if i > 0 {
                coo.push(i, i - 1, -1.0);
            }
            if i + 1 < n {
                coo.push(i, i + 1, -1.0);
            }
        }
        CsrMatrix::from_coo(&coo)
    }

    #[test]
    fn pcg_converges_on_1d_poisson_with_diagonal_precond() {
        let n = 50;
        let a = poisson(n);
        let b = Vector::from_element(n, 1.0);
        let mut x = Vector::zeros(n);
        let prec = DiagonalPreconditioner::new(&a);
        let param = ItsParam::cg().with_tol(1e-10).with_maxit(500);
        let status = pcg(&a, &b, &mut x, &prec, &param).unwrap();
        assert!(status.converged);

        let mut r = b.clone();
        a.spmv_axpy(-1.0, &x, &mut r).unwrap();
        assert!(r.norm() / b.norm() < 1e-8);
    }

    #[test]
    fn unpreconditioned_cg_matches_identity_preconditioned_cg() {
        let n = 20;
        let a = poisson(n);
        let b = Vector::from_element(n, 1.0);
        let param = ItsParam::cg().with_tol(1e-10).with_maxit(200);

        let mut x1 = Vector::zeros(n);
        pcg(&a, &b, &mut x1, &IdentityPreconditioner, &param).unwrap();

        let mut x2 = Vector::zeros(n);
        pcg(&a, &b, &mut x2, &IdentityPreconditioner, &param).unwrap();

        for i in 0..n {
            assert!((x1[i] - x2[i]).abs() < 1e-9);
        }
    }

    #[test]
    fn residual_norm_is_monotone_nonincreasing_for_spd_system() {
        let n = 30;
        let a = poisson(n);
        let b = Vector::from_element(n, 1.0);
        let mut x = Vector::zeros(n);
        let prec = DiagonalPreconditioner::new(&a);
        let param = ItsParam::cg().with_tol(1e-12).with_maxit(1);

        let mut prev_norm = {
            let mut r = b.clone();
            a.spmv_axpy(-1.0, &x, &mut r).unwrap();
            r.norm()
        };
        for _ in 0..25 {
            let _ = pcg(&a, &b, &mut x, &prec, &param);
            let mut r = b.clone();
            a.spmv_axpy(-1.0, &x, &mut r).unwrap();
            let norm = r.norm();
            assert!(norm <= prev_norm + 1e-10);
            prev_norm = norm;
        }
    }
}
