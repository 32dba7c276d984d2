//! Preconditioner composition (spec §4.7 "Preconditioner interface"): a
//! single trait every Krylov driver calls through, with concrete variants
//! for identity, Jacobi, ILU, one AMG cycle, Schwarz, and additive/
//! multiplicative composition of two preconditioners.

use crate::amg::{amg_cycle, AmgHierarchy};
use crate::error::SolverResult;
use crate::params::AmgParam;
use crate::sparse::CsrMatrix;
use crate::smoother::{safe_diag, Smoother};
use crate::types::Vector;

/// `z <- M^-1 r`. Implementations must tolerate `r` being the zero vector
/// (returning `z = 0`) since Krylov drivers probe this at iterate 0.
pub trait Preconditioner {
    fn apply(&self, r: &Vector, z: &mut Vector) -> SolverResult<()>;
}

/// `M = I`: the "unpreconditioned" case, expressed as a preconditioner so
/// every driver can be written against the same trait (spec §8 invariant 3).
pub struct IdentityPreconditioner;

impl Preconditioner for IdentityPreconditioner {
    fn apply(&self, r: &Vector, z: &mut Vector) -> SolverResult<()> {
        z.copy_from_slice(r.as_slice());
        Ok(())
    }
}

/// `M = diag(A)`.
pub struct DiagonalPreconditioner {
    diag_inv: Vector,
}

impl DiagonalPreconditioner {
    pub fn new(a: &CsrMatrix) -> Self {
        let diag_inv = Vector::from_iterator(a.rows, a.diag().iter().map(|&d| 1.0 / safe_diag(d)));
        Self { diag_inv }
    }
}

impl Preconditioner for DiagonalPreconditioner {
    fn apply(&self, r: &Vector, z: &mut Vector) -> SolverResult<()> {
        for i in 0..r.len() {
            z[i] = self.diag_inv[i] * r[i];
        }
        Ok(())
    }
}

/// Wraps any [`Smoother`] (ILU, Schwarz, polynomial, ...) as a one-shot
/// preconditioner: `z <- M^-1 r` is one sweep of the smoother starting from
/// `z = 0` against the system `A z = r`.
pub struct SmootherPreconditioner<'a> {
    a: &'a CsrMatrix,
    smoother: Box<dyn Smoother + Send + Sync>,
    sweeps: usize,
}

impl<'a> SmootherPreconditioner<'a> {
    pub fn new(a: &'a CsrMatrix, smoother: Box<dyn Smoother + Send + Sync>, sweeps: usize) -> Self {
        Self { a, smoother, sweeps }
    }
}

impl Preconditioner for SmootherPreconditioner<'_> {
    fn apply(&self, r: &Vector, z: &mut Vector) -> SolverResult<()> {
        z.fill(0.0);
        self.smoother.smooth(self.a, r, z, self.sweeps)
    }
}

/// One AMG V/W/F/nonlinear-AMLI cycle, used as a preconditioner (spec §4.7
/// "AMG as preconditioner").
pub struct AmgPreconditioner {
    hierarchy: AmgHierarchy,
    param: AmgParam,
}

impl AmgPreconditioner {
    pub fn new(a: &CsrMatrix, param: AmgParam) -> SolverResult<Self> {
        let hierarchy = AmgHierarchy::setup(a, &param)?;
        Ok(Self { hierarchy, param })
    }

    pub fn hierarchy(&self) -> &AmgHierarchy {
        &self.hierarchy
    }
}

impl Preconditioner for AmgPreconditioner {
    fn apply(&self, r: &Vector, z: &mut Vector) -> SolverResult<()> {
        z.fill(0.0);
        amg_cycle(&self.hierarchy, 0, r, z, &self.param);
        Ok(())
    }
}

/// How two preconditioners are combined (spec §4.7 "Composite").
pub enum CompositeKind {
    /// `z <- M1^-1 r + M2^-1 r`.
    Additive,
    /// `z <- M2^-1 (r - A M1^-1 r) + M1^-1 r`: apply `M1`, correct the
    /// residual, apply `M2`, and sum — the standard multiplicative (hybrid)
    /// combination.
    Multiplicative,
}

pub struct CompositePreconditioner<'a> {
    a: &'a CsrMatrix,
    first: Box<dyn Preconditioner + 'a>,
    second: Box<dyn Preconditioner + 'a>,
    kind: CompositeKind,
}

impl<'a> CompositePreconditioner<'a> {
    pub fn new(
        a: &'a CsrMatrix,
        first: Box<dyn Preconditioner + 'a>,
        second: Box<dyn Preconditioner + 'a>,
        kind: CompositeKind,
    ) -> Self {
        Self { a, first, second, kind }
    }
}

impl Preconditioner for CompositePreconditioner<'_> {
    fn apply(&self, r: &Vector, z: &mut Vector) -> SolverResult<()> {
        let mut z1 = Vector::zeros(r.len());
        self.first.apply(r, &mut z1)?;

        match self.kind {
            CompositeKind::Additive => {
                let mut z2 = Vector::zeros(r.len());
                self.second.apply(r, &mut z2)?;
                for i in 0..z.len() {
                    z[i] = z1[i] + z2[i];
                }
            }
            CompositeKind::Multiplicative => {
                let mut residual = r.clone();
                self.a.spmv_axpy(-1.0, &z1, &mut residual)?;
                let mut z2 = Vector::zeros(r.len());
                self.second.apply(&residual, &mut z2)?;
                for i in 0..z.len() {
                    z[i] = z1[i] + z2[i];
                }
            }
        }
        Ok(())
    }
}
