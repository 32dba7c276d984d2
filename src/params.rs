//! Parameter & status bundles (spec §3, ~5% of the source): solver/AMG/ILU
//! configuration structs in the teacher's `AnalysisOptions` idiom — plain
//! `serde`-serializable structs with a sensible `Default` and `with_*`
//! builder methods rather than a free-floating key-value parameter file
//! (parsing that file is the CLI adapter's job, explicitly out of scope).

use serde::{Deserialize, Serialize};

use crate::types::Real;

/// Which relative-residual denominator a Krylov driver normalizes against
/// (spec §4.7 "Initialization").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StopType {
    /// `||r|| / max(eps, ||r0||)`
    RelRes,
    /// `sqrt(|<r, Mr>|) / max(eps, sqrt(|<r0, Mr0>|))`
    RelPrecRes,
    /// `||r|| / max(eps, ||x||)`
    ModRelRes,
}

/// Which Krylov method a driver runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SolverKind {
    Cg,
    BiCgStab,
    Gmres,
    FGmres,
    Gcg,
}

/// How verbose a driver's per-termination log line is. Maps onto `log`
/// levels rather than a raw integer print level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum PrintLevel {
    Silent,
    Summary,
    Verbose,
}

/// Iterative-solver (Krylov driver) parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ItsParam {
    pub solver_kind: SolverKind,
    pub stop_type: StopType,
    pub maxit: usize,
    pub tol: Real,
    /// GMRES restart length / FGMRES restart length.
    pub restart: usize,
    pub print_level: PrintLevel,
    /// Nonlinear-AMLI's inner Krylov iteration count `k` (spec §4.6).
    pub amli_inner_iters: usize,
}

impl Default for ItsParam {
    fn default() -> Self {
        Self {
            solver_kind: SolverKind::Cg,
            stop_type: StopType::RelRes,
            maxit: 200,
            tol: 1e-8,
            restart: 30,
            print_level: PrintLevel::Silent,
            amli_inner_iters: 2,
        }
    }
}

impl ItsParam {
    pub fn cg() -> Self {
        Self { solver_kind: SolverKind::Cg, ..Self::default() }
    }

    pub fn bicgstab() -> Self {
        Self { solver_kind: SolverKind::BiCgStab, ..Self::default() }
    }

    pub fn gmres(restart: usize) -> Self {
        Self { solver_kind: SolverKind::Gmres, restart, ..Self::default() }
    }

    pub fn with_tol(mut self, tol: Real) -> Self {
        self.tol = tol;
        self
    }

    pub fn with_maxit(mut self, maxit: usize) -> Self {
        self.maxit = maxit;
        self
    }

    pub fn with_print_level(mut self, level: PrintLevel) -> Self {
        self.print_level = level;
        self
    }
}

/// Which AMG cycle shape [`crate::amg::cycle::amg_cycle`] runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CycleKind {
    V,
    W,
    F,
    /// Nonlinear AMLI with the outer Krylov run given by `ItsParam`.
    NonlinearAmli,
}

/// Which coarsening strategy builds the C/F split.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CoarseningKind {
    Classical,
    CompatibleRelaxation,
}

/// Which per-level relaxation the AMG cycle uses for pre/post-smoothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SmootherKind {
    Jacobi,
    GaussSeidel,
    Sor,
    Ilu,
    Polynomial,
    Schwarz,
}

/// Which strength-of-connection measure builds the C/F graph (spec §4.4
/// "Strength of connection"). Lives here rather than in `coarsening` so
/// `AmgParam` can name it without `coarsening` depending back on `params`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StrengthMeasure {
    /// Classical Ruge-Stuben: only negative off-diagonals count toward the
    /// row maximum, matching the assumption that `A` is an M-matrix.
    NegativeOnly,
    /// Uses `|a_ij|` instead of `-a_ij`, safe for general sparse matrices.
    Absolute,
    /// Modified Ruge-Stuben: rows that are already (weakly) diagonally
    /// dominant — `|sum_{j!=i} a_ij| <= max_row_sum * |a_ii|` — are given no
    /// strong connections at all (relaxation alone handles them well);
    /// every other row falls back to the `NegativeOnly` row-scaled test.
    Modified,
}

/// AMG setup + cycle parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AmgParam {
    pub cycle_kind: CycleKind,
    pub coarsening_kind: CoarseningKind,
    pub strength_measure: StrengthMeasure,
    pub strong_threshold: Real,
    /// Row-sum diagonal-dominance threshold consumed by
    /// `StrengthMeasure::Modified` (spec §4.4); unused by the other
    /// measures.
    pub max_row_sum: Real,
    pub truncation: Real,
    pub smoother_kind: SmootherKind,
    pub presmooth_sweeps: usize,
    pub postsmooth_sweeps: usize,
    pub relaxation: Real,
    pub max_levels: usize,
    pub coarse_size_cutoff: usize,
    /// Enable the optional coarse-grid scaling factor of spec §4.6.
    pub coarse_scaling: bool,
    /// Compatible-relaxation-only knobs (spec §4.4, Open Question 4): kept
    /// as configuration rather than hardcoded constants.
    pub cr_theta_g: Real,
    pub cr_nu: usize,
}

impl Default for AmgParam {
    fn default() -> Self {
        Self {
            cycle_kind: CycleKind::V,
            coarsening_kind: CoarseningKind::Classical,
            strength_measure: StrengthMeasure::NegativeOnly,
            strong_threshold: 0.25,
            max_row_sum: 0.9,
            truncation: 0.2,
            smoother_kind: SmootherKind::GaussSeidel,
            presmooth_sweeps: 1,
            postsmooth_sweeps: 1,
            relaxation: 1.0,
            max_levels: 25,
            coarse_size_cutoff: 25,
            coarse_scaling: false,
            cr_theta_g: 0.8,
            cr_nu: 3,
        }
    }
}

impl AmgParam {
    pub fn with_cycle(mut self, kind: CycleKind) -> Self {
        self.cycle_kind = kind;
        self
    }

    pub fn with_strong_threshold(mut self, threshold: Real) -> Self {
        self.strong_threshold = threshold;
        self
    }

    pub fn with_max_levels(mut self, max_levels: usize) -> Self {
        self.max_levels = max_levels;
        self
    }

    pub fn with_smoother(mut self, kind: SmootherKind) -> Self {
        self.smoother_kind = kind;
        self
    }

    pub fn with_strength_measure(mut self, measure: StrengthMeasure) -> Self {
        self.strength_measure = measure;
        self
    }
}

/// ILU factorization parameters. `droptol` drops new fill entries below
/// `droptol * ||row||_1` on top of the level-of-fill cap; `relax` (in
/// `[0, 1]`) lumps each dropped entry into the row's diagonal instead of
/// discarding it (MRILU-style relaxed ILU). Both default to off (plain
/// ILU(`level_of_fill`)).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IluParam {
    pub level_of_fill: usize,
    pub droptol: Real,
    pub relax: Real,
}

impl Default for IluParam {
    fn default() -> Self {
        Self {
            level_of_fill: 0,
            droptol: 0.0,
            relax: 0.0,
        }
    }
}

impl IluParam {
    pub fn ilu0() -> Self {
        Self::default()
    }

    pub fn with_level(mut self, level: usize) -> Self {
        self.level_of_fill = level;
        self
    }

    pub fn with_droptol(mut self, droptol: Real) -> Self {
        self.droptol = droptol;
        self
    }

    pub fn with_relax(mut self, relax: Real) -> Self {
        self.relax = relax;
        self
    }
}
