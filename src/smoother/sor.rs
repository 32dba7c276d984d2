//! Successive over-relaxation: Gauss-Seidel mixed `(1-omega) u_old + omega u_new`.

use crate::error::SolverResult;
use crate::sparse::CsrMatrix;
use crate::types::{Real, Vector};

use super::gauss_seidel::GsOrder;
use super::{safe_diag, Smoother};

pub struct SorSmoother {
    omega: Real,
    diag: Vector,
    order: Vec<usize>,
}

impl SorSmoother {
    pub fn new(a: &CsrMatrix, order: GsOrder, omega: Real) -> Self {
        let n = a.rows;
        let diag = Vector::from_iterator(n, a.diag().iter().map(|&d| safe_diag(d)));
        let order = match order {
            GsOrder::Ascending => (0..n).collect(),
            GsOrder::Descending => (0..n).rev().collect(),
            GsOrder::UserOrder(v) | GsOrder::CfOrder(v) => v,
        };
        Self { omega, diag, order }
    }
}

impl Smoother for SorSmoother {
    fn smooth(&self, a: &CsrMatrix, b: &Vector, x: &mut Vector, sweeps: usize) -> SolverResult<()> {
        for _ in 0..sweeps {
            for &i in &self.order {
                let mut sum = b[i];
                for (j, v) in a.row(i) {
                    if j != i {
                        sum -= v * x[j];
                    }
                }
                let gs_update = sum / self.diag[i];
                x[i] = (1.0 - self.omega) * x[i] + self.omega * gs_update;
            }
        }
        Ok(())
    }
}
