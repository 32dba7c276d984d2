//! Krylov subspace drivers (spec §4.7): PCG, BiCGStab (with safe net),
//! restarted/flexible GMRES, and GCG, all built against the
//! [`crate::precond::Preconditioner`] trait so any of §4.7's preconditioner
//! variants can be swapped in without touching the driver.

mod bicgstab;
mod cg;
mod common;
mod gcg;
mod gmres;

pub use bicgstab::bicgstab;
pub use cg::pcg;
pub use common::SolverStatus;
pub use gcg::gcg;
pub use gmres::{fgmres, gmres};

use crate::error::SolverResult;
use crate::params::{ItsParam, SolverKind};
use crate::precond::Preconditioner;
use crate::sparse::CsrMatrix;
use crate::types::Vector;

/// Dispatches to the driver named by `param.solver_kind`.
pub fn solve(a: &CsrMatrix, b: &Vector, x: &mut Vector, m: &dyn Preconditioner, param: &ItsParam) -> SolverResult<SolverStatus> {
    match param.solver_kind {
        SolverKind::Cg => pcg(a, b, x, m, param),
        SolverKind::BiCgStab => bicgstab(a, b, x, m, param),
        SolverKind::Gmres => gmres(a, b, x, m, param),
        SolverKind::FGmres => fgmres(a, b, x, m, param),
        SolverKind::Gcg => gcg(a, b, x, m, param),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::precond::DiagonalPreconditioner;
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
    fn solve_dispatches_to_pcg_for_cg_kind() {
        let n = 20;
        let a = poisson(n);
        let b = Vector::from_element(n, 1.0);
        let mut x = Vector::zeros(n);
        let prec = DiagonalPreconditioner::new(&a);
        let param = ItsParam::cg().with_tol(1e-9).with_maxit(200);
        let status = solve(&a, &b, &mut x, &prec, &param).unwrap();
        assert!(status.converged);
    }
}
