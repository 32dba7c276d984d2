//! Gauss-Seidel and its four orderings (spec §4.3). Ascending/descending/
//! user-order are sequential by contract; the C/F ordering is the one
//! variant the caller may run in parallel within one color (spec §5), which
//! this crate does not attempt to auto-detect — it trusts the caller.

use crate::error::SolverResult;
use crate::sparse::{CsrMatrix, StrMatrix};
use crate::types::{Real, Vector};

use super::{safe_diag, Smoother};

/// Which order rows are relaxed in. `CfOrder` takes an already-resolved
/// permutation (build one with [`crate::coarsening::cf_sweep_order`]) since
/// "C then F" vs "F then C" is a coarsening-level policy choice, not
/// something the smoother itself should decide.
pub enum GsOrder {
    Ascending,
    Descending,
    UserOrder(Vec<usize>),
    CfOrder(Vec<usize>),
}

pub struct GsSmoother {
    diag: Vector,
    order: Vec<usize>,
}

impl GsSmoother {
    pub fn new(a: &CsrMatrix, order: GsOrder) -> Self {
        let n = a.rows;
        let diag = Vector::from_iterator(n, a.diag().iter().map(|&d| safe_diag(d)));
        let order = match order {
            GsOrder::Ascending => (0..n).collect(),
            GsOrder::Descending => (0..n).rev().collect(),
            GsOrder::UserOrder(v) | GsOrder::CfOrder(v) => {
                debug_assert_eq!(v.len(), n, "ordering must be a full permutation of the rows");
                v
            }
        };
        Self { diag, order }
    }

    fn sweep_once(&self, a: &CsrMatrix, b: &Vector, x: &mut Vector) -> SolverResult<()> {
        for &i in &self.order {
            let mut sum = b[i];
            for (j, v) in a.row(i) {
                if j != i {
                    sum -= v * x[j];
                }
            }
            x[i] = sum / self.diag[i];
        }
        Ok(())
    }
}

impl Smoother for GsSmoother {
    fn smooth(&self, a: &CsrMatrix, b: &Vector, x: &mut Vector, sweeps: usize) -> SolverResult<()> {
        for _ in 0..sweeps {
            self.sweep_once(a, b, x)?;
        }
        Ok(())
    }
}

/// Blockwise Gauss-Seidel over a structured matrix with `nc > 1` coupled
/// unknowns per node: each node's `nc x nc` diagonal block is inverted once
/// and applied as a block relaxation step, ascending node order.
pub fn str_block_gauss_seidel(
    a: &StrMatrix,
    b: &Vector,
    x: &mut Vector,
    sweeps: usize,
) -> SolverResult<()> {
    use crate::dense::inverse;

    let nc = a.nc;
    let diag_inv: Vec<_> = a
        .diag_blocks()
        .iter()
        .map(|blk| inverse(blk).unwrap_or_else(|| crate::dense::DenseBlock::identity(nc)))
        .collect();

    let mut r = Vector::zeros(b.len());
    for _ in 0..sweeps {
        for node in 0..a.ngrid() {
            r.fill(0.0);
            // Local residual for this node's block only: b_node - (A x)_node,
            // recomputed via full SpMV is wasteful but keeps the contract
            // simple; AMG-scale problems use CSR/BSR Gauss-Seidel instead.
            a.spmv(x, &mut r)?;
            let slot = node * nc;
            let mut local_r = vec![0.0; nc];
            for k in 0..nc {
                local_r[k] = b[slot + k] - r[slot + k];
            }
            let mut delta = vec![0.0; nc];
            diag_inv[node].matvec(&local_r, &mut delta);
            for k in 0..nc {
                x[slot + k] += delta[k];
            }
        }
    }
    Ok(())
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
    fn ascending_and_descending_both_reduce_residual() {
        let a = poisson(8);
        let b = Vector::from_element(8, 1.0);

        for order in [GsOrder::Ascending, GsOrder::Descending] {
            let mut x = Vector::zeros(8);
            let smoother = GsSmoother::new(&a, order);
            let mut r0 = b.clone();
            a.spmv_axpy(-1.0, &x, &mut r0).unwrap();
            smoother.smooth(&a, &b, &mut x, 5).unwrap();
            let mut r1 = b.clone();
            a.spmv_axpy(-1.0, &x, &mut r1).unwrap();
            assert!(r1.norm() < r0.norm());
        }
    }

    #[test]
    fn user_order_is_a_valid_permutation_and_converges() {
        let a = poisson(6);
        let b = Vector::from_element(6, 1.0);
        let perm: Vec<usize> = vec![5, 0, 4, 1, 3, 2];
        let mut x = Vector::zeros(6);
        let smoother = GsSmoother::new(&a, GsOrder::UserOrder(perm));
        smoother.smooth(&a, &b, &mut x, 20).unwrap();
        let mut r = b.clone();
        a.spmv_axpy(-1.0, &x, &mut r).unwrap();
        assert!(r.norm() < 1e-6);
    }
}
