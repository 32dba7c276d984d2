//! Preconditioned BiCGStab with a "safe net" (spec §4.7): the best iterate
//! seen so far (smallest residual norm) is tracked independently of the
//! running iterate, and restored if the method's two breakdown-prone
//! scalars (`rho`, `omega`) ever go near zero or the run exhausts `maxit`
//! without the running iterate being the best one found.

use crate::error::SolverResult;
use crate::params::ItsParam;
use crate::precond::Preconditioner;
use crate::sparse::CsrMatrix;
use crate::types::{Real, Vector};

use super::common::{check_finite, check_solution_stagnation, initial_denominator, is_breakdown, relative_residual, SolverStatus};

pub fn bicgstab(
    a: &CsrMatrix,
    b: &Vector,
    x: &mut Vector,
    m: &dyn Preconditioner,
    param: &ItsParam,
) -> SolverResult<SolverStatus> {
    let n = b.len();
    let mut r = b.clone();
    a.spmv_axpy(-1.0, x, &mut r)?;

    let r0_norm = r.norm();
    let denom = initial_denominator(param.stop_type, r0_norm, r0_norm, x.amax());
    if r0_norm <= crate::types::EPS_DENOM {
        return Ok(SolverStatus { iters: 0, relres: 0.0, converged: true });
    }

    let r_hat = r.clone();
    let mut rho = 1.0;
    let mut alpha = 1.0;
    let mut omega = 1.0;
    let mut v = Vector::zeros(n);
    let mut p = Vector::zeros(n);

    let mut best_x = x.clone();
    let mut best_relres = relative_residual(param.stop_type, r_norm_safe(&r), r_norm_safe(&r), denom);
    let mut stag_count = 0u32;

    for iter in 1..=param.maxit {
        let rho_new = r_hat.dot(&r);
        if is_breakdown(rho_new) || is_breakdown(omega) {
            *x = best_x;
            return Ok(SolverStatus { iters: iter, relres: best_relres, converged: best_relres <= param.tol });
        }
        let beta = (rho_new / rho) * (alpha / omega);
        p = &r + beta * (&p - omega * &v);

        let mut p_hat = Vector::zeros(n);
        m.apply(&p, &mut p_hat)?;
        v.fill(0.0);
        a.spmv(&p_hat, &mut v)?;

        let r_hat_v = r_hat.dot(&v);
        if is_breakdown(r_hat_v) {
            *x = best_x;
            return Ok(SolverStatus { iters: iter, relres: best_relres, converged: best_relres <= param.tol });
        }
        alpha = rho_new / r_hat_v;

        let s = &r - alpha * &v;
        let s_norm = s.norm();
        let s_relres = relative_residual(param.stop_type, s_norm, s_norm, denom);
        if s_relres <= param.tol {
            *x += alpha * &p_hat;
            check_finite(x)?;
            return Ok(SolverStatus { iters: iter, relres: s_relres, converged: true });
        }

        let mut s_hat = Vector::zeros(n);
        m.apply(&s, &mut s_hat)?;
        let mut t = Vector::zeros(n);
        a.spmv(&s_hat, &mut t)?;

        let tt = t.dot(&t);
        if is_breakdown(tt) {
            *x += alpha * &p_hat;
            check_finite(x)?;
            let relres = relative_residual(param.stop_type, s.norm(), s.norm(), denom);
            return Ok(SolverStatus { iters: iter, relres, converged: relres <= param.tol });
        }
        omega = t.dot(&s) / tt;

        let x_prev_norm = x.norm();
        *x += alpha * &p_hat + omega * &s_hat;
        r = &s - omega * &t;

        check_finite(x)?;
        check_solution_stagnation(x)?;

        let r_norm = r.norm();
        let relres = relative_residual(param.stop_type, r_norm, r_norm, denom);

        if relres < best_relres {
            best_relres = relres;
            best_x = x.clone();
        }

        if relres <= param.tol {
            return Ok(SolverStatus { iters: iter, relres, converged: true });
        }

        let update_size = (x.norm() - x_prev_norm).abs();
        if update_size < crate::types::EPS_DENOM * x_prev_norm.max(1.0) {
            stag_count += 1;
            if stag_count >= super::common::MAX_STAG {
                *x = best_x;
                return Ok(SolverStatus { iters: iter, relres: best_relres, converged: best_relres <= param.tol });
            }
        } else {
            stag_count = 0;
        }

        rho = rho_new;
    }

    *x = best_x;
    Ok(SolverStatus { iters: param.maxit, relres: best_relres, converged: best_relres <= param.tol })
}

fn r_norm_safe(r: &Vector) -> Real {
    r.norm()
}
