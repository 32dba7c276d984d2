//! Algebraic multigrid hierarchy (spec §4.4, §4.5, §4.6): setup builds a
//! tower of coarser operators via classical Ruge-Stuben coarsening and the
//! Galerkin triple product, and [`AmgHierarchy::cycle`] runs the V/W/F/
//! nonlinear-AMLI cycle over it.

mod cycle;
mod setup;

pub use cycle::amg_cycle;
pub use setup::{build_level_smoother, AmgHierarchy, Level};
