//! Restarted, right-preconditioned GMRES (spec §4.7), with Givens-rotation
//! incremental least-squares so the relative residual is known after every
//! Arnoldi step without forming `x`.
//!
//! `gmres` and `fgmres` share one core: both store the actual preconditioned
//! search direction `z_j = M^-1 v_j` used to build the Krylov basis (rather
//! than reconstructing `x` from `V` and re-applying `M` once at the end).
//! With a fixed preconditioner object (this crate's [`Preconditioner`] has
//! no notion of "a different `M` each iteration"), that is exactly
//! right-preconditioned GMRES — flexible GMRES is the same recurrence
//! generalized to a `j`-varying `M`, and collapses to it when `M` is fixed.
//! `fgmres` is kept as its own entry point for call sites that want to be
//! explicit about depending on that generalization (e.g. a future
//! AMG-cycle preconditioner whose relaxation order changes between calls).

use crate::error::{SolverError, SolverResult};
use crate::params::ItsParam;
use crate::precond::Preconditioner;
use crate::sparse::CsrMatrix;
use crate::types::{Real, Vector, EPS_DENOM};

use super::common::{check_finite, check_solution_stagnation, initial_denominator, relative_residual, SolverStatus};

pub fn gmres(a: &CsrMatrix, b: &Vector, x: &mut Vector, m: &dyn Preconditioner, param: &ItsParam) -> SolverResult<SolverStatus> {
    run_gmres(a, b, x, m, param)
}

pub fn fgmres(a: &CsrMatrix, b: &Vector, x: &mut Vector, m: &dyn Preconditioner, param: &ItsParam) -> SolverResult<SolverStatus> {
    run_gmres(a, b, x, m, param)
}

fn run_gmres(a: &CsrMatrix, b: &Vector, x: &mut Vector, m: &dyn Preconditioner, param: &ItsParam) -> SolverResult<SolverStatus> {
    let n = b.len();
    let restart = param.restart.max(1);

    let mut r = b.clone();
    a.spmv_axpy(-1.0, x, &mut r)?;
    let r0_norm = r.norm();
    let denom = initial_denominator(param.stop_type, r0_norm, r0_norm, x.amax());
    if r0_norm <= EPS_DENOM {
        return Ok(SolverStatus { iters: 0, relres: 0.0, converged: true });
    }

    let mut total_iters = 0usize;
    let mut last_relres = 1.0;

    while total_iters < param.maxit {
        r.copy_from(b);
        a.spmv_axpy(-1.0, x, &mut r)?;
        let beta = r.norm();
        let relres0 = relative_residual(param.stop_type, beta, beta, denom);
        if relres0 <= param.tol {
            return Ok(SolverStatus { iters: total_iters, relres: relres0, converged: true });
        }

        let mut v: Vec<Vector> = vec![r.scale(1.0 / beta)];
        let mut z: Vec<Vector> = Vec::with_capacity(restart);
        let mut h = vec![vec![0.0 as Real; restart]; restart + 1];
        let mut cs = vec![0.0 as Real; restart];
        let mut sn = vec![0.0 as Real; restart];
        let mut g = vec![0.0 as Real; restart + 1];
        g[0] = beta;

        let mut m_used = 0usize;
        let mut converged = false;

        for j in 0..restart {
            if total_iters >= param.maxit {
                break;
            }
            total_iters += 1;

            let mut zj = Vector::zeros(n);
            m.apply(&v[j], &mut zj)?;
            let mut w = Vector::zeros(n);
            a.spmv(&zj, &mut w)?;
            z.push(zj);

            for i in 0..=j {
                let hij = w.dot(&v[i]);
                h[i][j] = hij;
                w -= hij * &v[i];
            }
            let hjp1 = w.norm();
            h[j + 1][j] = hjp1;

            if hjp1 > EPS_DENOM {
                v.push(w.scale(1.0 / hjp1));
            } else {
                v.push(Vector::zeros(n));
            }

            // Apply previous Givens rotations to the new column.
            for i in 0..j {
                let temp = cs[i] * h[i][j] + sn[i] * h[i + 1][j];
                h[i + 1][j] = -sn[i] * h[i][j] + cs[i] * h[i + 1][j];
                h[i][j] = temp;
            }
            let denom_rot = (h[j][j] * h[j][j] + h[j + 1][j] * h[j + 1][j]).sqrt();
            let (c, s) = if denom_rot > EPS_DENOM {
                (h[j][j] / denom_rot, h[j + 1][j] / denom_rot)
            } else {
                (1.0, 0.0)
            };
            cs[j] = c;
            sn[j] = s;
            h[j][j] = c * h[j][j] + s * h[j + 1][j];
            h[j + 1][j] = 0.0;
            let g_temp = c * g[j] + s * g[j + 1];
            g[j + 1] = -s * g[j] + c * g[j + 1];
            g[j] = g_temp;

            m_used = j + 1;
            let relres = relative_residual(param.stop_type, g[j + 1].abs(), g[j + 1].abs(), denom);
            last_relres = relres;
            if relres <= param.tol || hjp1 <= EPS_DENOM {
                converged = relres <= param.tol;
                break;
            }
        }

        // Back-substitute the upper-triangular system H[0..m_used,0..m_used] y = g[0..m_used].
        let mut y = vec![0.0 as Real; m_used];
        for i in (0..m_used).rev() {
            let mut sum = g[i];
            for k in (i + 1)..m_used {
                sum -= h[i][k] * y[k];
            }
            if h[i][i].abs() < EPS_DENOM {
                return Err(SolverError::Breakdown(format!("GMRES: H[{i}][{i}] = {:e}", h[i][i])));
            }
            y[i] = sum / h[i][i];
        }

        for i in 0..m_used {
            *x += y[i] * &z[i];
        }
        check_finite(x)?;
        check_solution_stagnation(x)?;

        if converged {
            return Ok(SolverStatus { iters: total_iters, relres: last_relres, converged: true });
        }
    }

    Err(SolverError::MaxIterationsReached(param.maxit, last_relres))
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
    fn restarted_gmres_converges_on_nonsymmetric_system() {
        let n = 30;
        let a = advection_diffusion(n);
        let b = Vector::from_element(n, 1.0);
        let mut x = Vector::zeros(n);
        let param = ItsParam::gmres(10).with_tol(1e-9).with_maxit(300);
        let status = gmres(&a, &b, &mut x, &IdentityPreconditioner, &param).unwrap();
        assert!(status.converged);

        let mut r = b.clone();
        a.spmv_axpy(-1.0, &x, &mut r).unwrap();
        assert!(r.norm() / b.norm() < 1e-6);
    }

    #[test]
    fn fgmres_matches_gmres_with_a_fixed_preconditioner() {
        let n = 24;
        let a = advection_diffusion(n);
        let b = Vector::from_element(n, 1.0);
        let param = ItsParam::gmres(8).with_tol(1e-9).with_maxit(200);

        let mut x1 = Vector::zeros(n);
        gmres(&a, &b, &mut x1, &IdentityPreconditioner, &param).unwrap();
        let mut x2 = Vector::zeros(n);
        fgmres(&a, &b, &mut x2, &IdentityPreconditioner, &param).unwrap();

        for i in 0..n {
            assert!((x1[i] - x2[i]).abs() < 1e-8);
        }
    }
}
