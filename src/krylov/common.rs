//! Shared plumbing for every Krylov driver (spec §4.7 "Initialization",
//! "Stagnation/false-convergence checks", "Stop-type denominators").

use crate::error::{SolverError, SolverResult};
use crate::params::StopType;
use crate::types::{Real, Vector, EPS_DENOM, EPS_SOL};

/// Driver return value: iteration count, final relative residual, and
/// whether `tol` was actually reached (vs. `maxit` exhausted).
#[derive(Debug, Clone, Copy)]
pub struct SolverStatus {
    pub iters: usize,
    pub relres: Real,
    pub converged: bool,
}

/// A Krylov loop is declared stagnant after this many consecutive
/// iterations whose relative update is below machine-epsilon-scale noise
/// (spec §4.7 "stagnation check").
pub const MAX_STAG: u32 = 20;

/// The denominator a driver divides the current residual measure by, fixed
/// once at iteration 0 per [`StopType`] (spec §4.7).
pub fn initial_denominator(stop_type: StopType, r0_norm: Real, precond_r0_norm: Real, x0_norm: Real) -> Real {
    match stop_type {
        StopType::RelRes => r0_norm.max(EPS_DENOM),
        StopType::RelPrecRes => precond_r0_norm.max(EPS_DENOM),
        StopType::ModRelRes => x0_norm.max(EPS_DENOM),
    }
}

/// The numerator a driver measures progress against, per [`StopType`]: the
/// raw residual norm in all three cases (`RelPrecRes` differs only in its
/// denominator, not its numerator, matching spec §4.7's definitions).
pub fn relative_residual(stop_type: StopType, r_norm: Real, precond_r_norm: Real, denom: Real) -> Real {
    match stop_type {
        StopType::RelPrecRes => precond_r_norm.max(EPS_DENOM) / denom,
        StopType::RelRes | StopType::ModRelRes => r_norm / denom,
    }
}

/// Fails fast on `NaN`/`inf` (spec §4.7 "non-finite guard"), which every
/// driver must check at least once per iteration.
pub fn check_finite(v: &Vector) -> SolverResult<()> {
    if v.iter().all(|x| x.is_finite()) {
        Ok(())
    } else {
        Err(SolverError::NonFinite)
    }
}

/// Solution-stagnation guard (spec §4.7): the iterate's infinity norm
/// collapsed to (near) zero while the residual has not converged — almost
/// always a sign the right-hand side itself was (near) zero.
pub fn check_solution_stagnation(x: &Vector) -> SolverResult<()> {
    if x.amax() <= EPS_SOL {
        Err(SolverError::SolutionStagnation)
    } else {
        Ok(())
    }
}

/// A scalar too small to safely divide by (spec §4.7 "divide-by-small
/// guard"): CG's `<Ap,p>`, BiCGStab's `<r0*, v>`, etc.
pub fn is_breakdown(denominator: Real) -> bool {
    denominator.abs() < EPS_DENOM
}
