//! Polynomial (Chebyshev-like) smoother (spec §4.3): a fixed-degree
//! polynomial in `D^-1 A` built from `mu0 = 1/||D^-1 A||_inf`, `mu1 = 4*mu0`,
//! and the Chebyshev three-term recurrence. Order-independent — safe to
//! run row-chunked in parallel, same as Jacobi.
//!
//! The degree/condition-number heuristic in the source
//! (`ndeg0 = floor(log(2(2+theta+1/theta)/(theta-1/theta)^2)/log(theta)+1)`,
//! with `kappa = smax/smin` estimated as `smin = smax/8`) is a tuning
//! heuristic, not a derivation (spec §9 Open Question 3) — this crate
//! exposes `degree` directly as a parameter instead of trying to
//! auto-select it from a condition-number guess.

use crate::error::SolverResult;
use crate::sparse::CsrMatrix;
use crate::types::{Real, Vector};

use super::{safe_diag, Smoother};

pub struct PolynomialSmoother {
    degree: usize,
    diag_inv: Vector,
    theta: Real,
    delta: Real,
}

impl PolynomialSmoother {
    pub fn new(a: &CsrMatrix, degree: usize) -> Self {
        let diag = a.diag();
        let diag_inv = Vector::from_iterator(a.rows, diag.iter().map(|&d| 1.0 / safe_diag(d)));

        // ||D^-1 A||_inf = max_i (1/|d_ii|) * sum_j |a_ij|.
        let mut inf_norm: Real = 0.0;
        for i in 0..a.rows {
            let row_sum: Real = a.row(i).map(|(_, v)| v.abs()).sum();
            inf_norm = inf_norm.max(diag_inv[i].abs() * row_sum);
        }
        let mu0 = if inf_norm > 0.0 { 1.0 / inf_norm } else { 1.0 };
        let mu1 = 4.0 * mu0;
        let theta = (mu0 + mu1) / 2.0;
        let delta = (mu1 - mu0) / 2.0;

        Self { degree: degree.max(1), diag_inv, theta, delta }
    }

    fn preconditioned_residual(&self, a: &CsrMatrix, b: &Vector, x: &Vector) -> SolverResult<Vector> {
        let mut r = b.clone();
        a.spmv_axpy(-1.0, x, &mut r)?;
        Ok(Vector::from_iterator(r.len(), r.iter().zip(self.diag_inv.iter()).map(|(&ri, &di)| ri * di)))
    }
}

impl Smoother for PolynomialSmoother {
    fn smooth(&self, a: &CsrMatrix, b: &Vector, x: &mut Vector, sweeps: usize) -> SolverResult<()> {
        for _ in 0..sweeps {
            let d0 = self.preconditioned_residual(a, b, x)?;
            let mut x_prev = x.clone();
            let mut x_cur = &*x + (1.0 / self.theta) * &d0;

            let mut c_prev = 1.0;
            let mut c_cur = self.theta / self.delta;
            for _k in 1..self.degree {
                let c_next = 2.0 * (self.theta / self.delta) * c_cur - c_prev;
                let beta = c_prev / c_next;
                let alpha = 2.0 * c_cur / (self.delta * c_next);

                let d_k = self.preconditioned_residual(a, b, &x_cur)?;
                let x_next = &x_cur + alpha * &d_k + beta * (&x_cur - &x_prev);

                x_prev = x_cur;
                x_cur = x_next;
                c_prev = c_cur;
                c_cur = c_next;
            }
            *x = x_cur;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
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
    fn polynomial_smoother_reduces_residual_norm() {
        let a = poisson(12);
        let b = Vector::from_element(12, 1.0);
        let mut x = Vector::zeros(12);
        let smoother = PolynomialSmoother::new(&a, 3);

        let mut r0 = b.clone();
        a.spmv_axpy(-1.0, &x, &mut r0).unwrap();

        smoother.smooth(&a, &b, &mut x, 2).unwrap();

        let mut r1 = b.clone();
        a.spmv_axpy(-1.0, &x, &mut r1).unwrap();
        assert!(r1.norm() < r0.norm());
        assert!(x.iter().all(|v| v.is_finite()));
    }
}
