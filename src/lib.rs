//! amgkry - Algebraic multigrid and Krylov-subspace solvers for sparse
//! linear systems
//!
//! This library provides a from-scratch Rust implementation of a classical
//! AMG/Krylov solver stack, supporting:
//! - CSR/BSR/structured-grid sparse matrix formats
//! - Small dense kernels (closed-form 2x2/3x3 inverse, LU fallback)
//! - Relaxation smoothers (Jacobi, Gauss-Seidel, SOR, ILU(k), polynomial, Schwarz)
//! - Classical Ruge-Stuben coarsening and compatible relaxation
//! - AMG setup and V/W/F/nonlinear-AMLI cycles
//! - PCG, BiCGStab (with safe net), restarted/flexible GMRES, and GCG
//!
//! ## Example
//! ```rust
//! use amgkry::prelude::*;
//!
//! // 1-D Poisson on 100 nodes: tridiag(-1, 2, -1).
//! let n = 100;
//! let mut coo = CooMatrix::new(n, n);
//! for i in 0..n {
//!     coo.push(i, i, 2.0);
//!     if i > 0 {
//!         coo.push(i, i - 1, -1.0);
//!     }
//!     if i + 1 < n {
//!         coo.push(i, i + 1, -1.0);
//!     }
//! }
//! let a = CsrMatrix::from_coo(&coo);
//! let b = Vector::from_element(n, 1.0);
//! let mut x = Vector::zeros(n);
//!
//! let amg = AmgPreconditioner::new(&a, AmgParam::default()).unwrap();
//! let status = pcg(&a, &b, &mut x, &amg, &ItsParam::cg().with_tol(1e-8)).unwrap();
//! assert!(status.converged);
//! ```

pub mod amg;
pub mod coarsening;
pub mod dense;
pub mod error;
pub mod krylov;
pub mod params;
pub mod precond;
pub mod smoother;
pub mod sparse;
pub mod types;

pub mod prelude {
    pub use crate::amg::{AmgHierarchy, Level};
    pub use crate::coarsening::CfMarker;
    pub use crate::error::{ReturnCode, SolverError, SolverResult};
    pub use crate::krylov::{bicgstab, fgmres, gcg, gmres, pcg, solve, SolverStatus};
    pub use crate::params::{AmgParam, CoarseningKind, CycleKind, IluParam, ItsParam, PrintLevel, SmootherKind, SolverKind, StopType, StrengthMeasure};
    pub use crate::precond::{AmgPreconditioner, CompositeKind, CompositePreconditioner, DiagonalPreconditioner, IdentityPreconditioner, Preconditioner};
    pub use crate::sparse::{BsrMatrix, CooMatrix, CsrMatrix, StrMatrix};
    pub use crate::types::{Index, Real, Vector};
}
