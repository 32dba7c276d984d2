//! Fixed scalar/index types for the whole crate.
//!
//! The source this crate is modeled on fixes `REAL`/`INT` at compile time
//! via typedefs; we do the same with two plain aliases instead of generic
//! type parameters threaded through every signature. `Index` is `usize`
//! rather than a signed width: nothing in the matrix/vector contract stores
//! negative sentinels in `ia`/`ja`/permutations (those live in
//! [`crate::coarsening::CfMarker`] instead), so there is no reason to pay
//! for a signed type here.

/// Real scalar type used throughout the solver (IEEE-754 double).
pub type Real = f64;

/// Index type for rows, columns, and nnz counts.
pub type Index = usize;

/// Owned dense vector. A thin alias over `nalgebra::DVector` so that dense
/// vector arithmetic (axpy, dot, norms) comes from a battle-tested crate
/// rather than being hand-rolled.
pub type Vector = nalgebra::DVector<Real>;

/// Relative-tolerance denominators must never be driven to zero by a zero
/// residual/solution; this is the `ε` floor used throughout the Krylov
/// drivers' stopping criteria.
pub const EPS_DENOM: Real = 1e-20;

/// Below this magnitude a pivot/diagonal/denominator is treated as
/// numerically zero.
pub const EPS_TINY: Real = 1e-20;

/// `‖x‖_∞ ≤ EPS_SOL` marks an essentially-zero solution (sol-stagnation).
pub const EPS_SOL: Real = 1e-20;
