//! Weighted Jacobi: `u <- u + omega * D^-1 * (b - A u)`. Order-independent —
//! safe to run row-chunked in parallel (spec §5).

use crate::error::SolverResult;
use crate::sparse::CsrMatrix;
use crate::types::{Real, Vector};

use super::{safe_diag, Smoother};

pub struct JacobiSmoother {
    pub omega: Real,
    diag_inv: Vector,
}

impl JacobiSmoother {
    pub fn new(a: &CsrMatrix, omega: Real) -> Self {
        let diag_inv = Vector::from_iterator(
            a.rows,
            a.diag().iter().map(|&d| 1.0 / safe_diag(d)),
        );
        Self { omega, diag_inv }
    }

    fn sweep_once(&self, a: &CsrMatrix, b: &Vector, x: &mut Vector) -> SolverResult<()> {
        let mut r = b.clone();
        a.spmv_axpy(-1.0, x, &mut r)?;
        for i in 0..x.len() {
            x[i] += self.omega * self.diag_inv[i] * r[i];
        }
        Ok(())
    }

    #[cfg(feature = "parallel")]
    fn sweep_once_parallel(&self, a: &CsrMatrix, b: &Vector, x: &mut Vector) -> SolverResult<()> {
        use rayon::prelude::*;
        let mut r = b.clone();
        a.spmv_axpy(-1.0, x, &mut r)?;
        let omega = self.omega;
        let update: Vec<Real> = (0..x.len())
            .into_par_iter()
            .map(|i| x[i] + omega * self.diag_inv[i] * r[i])
            .collect();
        x.copy_from_slice(&update);
        Ok(())
    }
}

impl Smoother for JacobiSmoother {
    fn smooth(&self, a: &CsrMatrix, b: &Vector, x: &mut Vector, sweeps: usize) -> SolverResult<()> {
        for _ in 0..sweeps {
            #[cfg(feature = "parallel")]
            self.sweep_once_parallel(a, b, x)?;
            #[cfg(not(feature = "parallel"))]
            self.sweep_once(a, b, x)?;
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
    fn jacobi_reduces_residual_norm() {
        let a = poisson(10);
        let b = Vector::from_element(10, 1.0);
        let mut x = Vector::zeros(10);
        let smoother = JacobiSmoother::new(&a, 0.6);

        let mut r0 = b.clone();
        a.spmv_axpy(-1.0, &x, &mut r0).unwrap();
        let norm0 = r0.norm();

        smoother.smooth(&a, &b, &mut x, 5).unwrap();

        let mut r1 = b.clone();
        a.spmv_axpy(-1.0, &x, &mut r1).unwrap();
        assert!(r1.norm() < norm0);
    }

    #[test]
    fn zero_diagonal_is_substituted_not_nan() {
        let mut coo = CooMatrix::new(2, 2);
        coo.push(0, 0, 0.0);
        coo.push(0, 1, 1.0);
        coo.push(1, 0, 1.0);
        coo.push(1, 1, 2.0);
        let a = CsrMatrix::from_coo(&coo);
        let b = Vector::from_element(2, 1.0);
        let mut x = Vector::zeros(2);
        let smoother = JacobiSmoother::new(&a, 1.0);
        smoother.smooth(&a, &b, &mut x, 3).unwrap();
        assert!(x.iter().all(|v| v.is_finite()));
    }
}
