//! Error taxonomy for the solver core.
//!
//! Mirrors the kinds catalogued in the design notes — input-validity,
//! numerical, convergence, resource — as a `thiserror`-derived enum instead
//! of the source's negative integer return codes. [`ReturnCode`] is kept
//! alongside it for call sites that want the classic numeric code (e.g. an
//! adapter translating to a process exit status).

use thiserror::Error;

/// Result alias used throughout the crate.
pub type SolverResult<T> = Result<T, SolverError>;

/// Everything that can go wrong building or running a solver.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SolverError {
    /// Two operands of an operation (e.g. SpMV, AXPY) have incompatible shapes.
    #[error("dimension mismatch: {0}")]
    DimensionMismatch(String),

    /// An enum-valued parameter (cycle kind, stop type, ...) had no handler.
    #[error("unknown solver/parameter kind: {0}")]
    UnknownKind(String),

    /// A denominator (e.g. `<Ap, p>` in CG) dropped below [`crate::types::EPS_TINY`].
    #[error("numerical breakdown: {0}")]
    Breakdown(String),

    /// A `NaN` or `inf` was detected in an iterate.
    #[error("non-finite value encountered in iterate")]
    NonFinite,

    /// A small-dense-kernel pivot, or an ILU/Schwarz block factorization,
    /// was singular (or within `ε` of singular).
    #[error("singular or near-singular pivot: {0}")]
    SingularPivot(String),

    /// Krylov loop stagnated `MAX_STAG` consecutive times.
    #[error("stagnation after {0} restarts")]
    Stagnation(u32),

    /// Solution norm collapsed to (near) zero while the residual had not converged.
    #[error("solution stagnation: ||x||_inf <= eps_sol")]
    SolutionStagnation,

    /// `tol` could not be reached given floating-point roundoff.
    #[error("requested tolerance {0:e} is unreachable in floating point")]
    ToleranceTooSmall(f64),

    /// Iteration budget exhausted without convergence.
    #[error("reached maxit ({0}) without convergence, relres={1:e}")]
    MaxIterationsReached(usize, f64),

    /// Allocation/setup failure (e.g. AMG setup produced zero usable levels).
    #[error("setup failure: {0}")]
    SetupFailed(String),
}

/// Classic FASP-style return code: non-negative is the iteration count on
/// success, negative values enumerate failure kinds. Provided for adapters
/// that must reproduce the historical numeric contract of spec §6.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReturnCode {
    Success(usize),
    ErrorSolverStag,
    ErrorSolverSolstag,
    ErrorSolverTolsmall,
    ErrorSolverMaxit,
    ErrorSolverMisc,
    ErrorSolverType,
    ErrorAllocMem,
}

impl ReturnCode {
    /// Numeric code matching spec §6's taxonomy (`SUCCESS >= 0`, errors negative).
    pub fn code(self) -> i32 {
        match self {
            ReturnCode::Success(iters) => iters as i32,
            ReturnCode::ErrorSolverStag => -1,
            ReturnCode::ErrorSolverSolstag => -2,
            ReturnCode::ErrorSolverTolsmall => -3,
            ReturnCode::ErrorSolverMaxit => -4,
            ReturnCode::ErrorSolverMisc => -5,
            ReturnCode::ErrorSolverType => -6,
            ReturnCode::ErrorAllocMem => -7,
        }
    }
}

impl From<&SolverError> for ReturnCode {
    fn from(e: &SolverError) -> Self {
        match e {
            SolverError::Stagnation(_) => ReturnCode::ErrorSolverStag,
            SolverError::SolutionStagnation => ReturnCode::ErrorSolverSolstag,
            SolverError::ToleranceTooSmall(_) => ReturnCode::ErrorSolverTolsmall,
            SolverError::MaxIterationsReached(_, _) => ReturnCode::ErrorSolverMaxit,
            SolverError::Breakdown(_) | SolverError::NonFinite | SolverError::SingularPivot(_) => {
                ReturnCode::ErrorSolverMisc
            }
            SolverError::UnknownKind(_) => ReturnCode::ErrorSolverType,
            SolverError::DimensionMismatch(_) | SolverError::SetupFailed(_) => {
                ReturnCode::ErrorAllocMem
            }
        }
    }
}
