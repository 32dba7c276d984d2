//! AMG setup (spec §4.5): build the C/F hierarchy and Galerkin coarse
//! operators `A_{l+1} = R_l A_l P_l`, one level at a time, stopping at
//! `coarse_size_cutoff` or `max_levels` (or sooner, if coarsening stalls).

use crate::coarsening::{
    build_prolongation, classical_rs_split, compatible_relaxation_split, strong_connections, CfMarker,
};
use crate::dense::DenseBlock;
use crate::error::{SolverError, SolverResult};
use crate::params::{AmgParam, CoarseningKind, SmootherKind};
use crate::sparse::{CooMatrix, CsrMatrix};
use crate::smoother::{
    GsOrder, GsSmoother, IluSmoother, JacobiSmoother, PolynomialSmoother, SchwarzSmoother, SorSmoother, Smoother,
};
use crate::types::Real;

/// One level of the hierarchy: its operator, the prolongation from the next
/// coarser level (`None` at the coarsest), and the pre-built relaxation
/// smoother for this level.
pub struct Level {
    pub a: CsrMatrix,
    pub p: Option<CsrMatrix>,
    pub smoother: Box<dyn Smoother + Send + Sync>,
}

pub struct AmgHierarchy {
    pub levels: Vec<Level>,
    /// Dense LU factorization of the coarsest operator, used for an exact
    /// direct solve at the bottom of every cycle (spec §4.5 "coarsest-level
    /// solve").
    coarsest_lu: DenseBlock,
    coarsest_perm: Vec<usize>,
}

impl AmgHierarchy {
    pub fn setup(a0: &CsrMatrix, param: &AmgParam) -> SolverResult<Self> {
        let mut levels = Vec::new();
        let mut a = a0.clone();

        loop {
            let is_small_enough = a.rows <= param.coarse_size_cutoff;
            let is_max_depth = levels.len() + 1 >= param.max_levels;
            if is_small_enough || is_max_depth {
                break;
            }

            let graph = strong_connections(&a, param.strong_threshold, param.strength_measure, param.max_row_sum);
            let markers = match param.coarsening_kind {
                CoarseningKind::Classical => classical_rs_split(&graph),
                CoarseningKind::CompatibleRelaxation => compatible_relaxation_split(&a, &graph, param),
            };

            let ncoarse = markers.iter().filter(|m| m.is_coarse()).count();
            if ncoarse == 0 || ncoarse == a.rows {
                // Coarsening stalled: every point ended up fine (or every
                // point ended up coarse, i.e. no actual reduction). Treat
                // the current operator as the coarsest level.
                break;
            }

            let p = build_prolongation(&a, &graph, &markers, param.truncation);
            let r = p.transpose();
            let ap = a.matmul(&p)?;
            let a_coarse = r.matmul(&ap)?;

            let smoother = build_level_smoother(&a, &graph, &markers, param)?;
            levels.push(Level { a: a.clone(), p: Some(p), smoother });
            a = a_coarse;
        }

        let coarsest_smoother = build_level_smoother(
            &a,
            &strong_connections(&a, param.strong_threshold, param.strength_measure, param.max_row_sum),
            &vec![CfMarker::Coarse(0); a.rows],
            param,
        )?;
        let dense = csr_to_dense(&a);
        let mut lu = dense.clone();
        let mut perm = vec![0usize; a.rows];
        if !crate::dense::lu_factor_inplace(&mut lu, &mut perm) {
            return Err(SolverError::SetupFailed(
                "coarsest-level operator is singular; cannot factor for direct solve".into(),
            ));
        }
        levels.push(Level { a, p: None, smoother: coarsest_smoother });

        Ok(Self { levels, coarsest_lu: lu, coarsest_perm: perm })
    }

    pub fn num_levels(&self) -> usize {
        self.levels.len()
    }

    pub fn coarsest_solve(&self, b: &[Real]) -> Vec<Real> {
        crate::dense::lu_solve(&self.coarsest_lu, &self.coarsest_perm, b)
    }
}

fn csr_to_dense(a: &CsrMatrix) -> DenseBlock {
    let n = a.rows;
    let mut d = DenseBlock::zeros(n);
    for i in 0..n {
        for (j, v) in a.row(i) {
            d.set(i, j, v);
        }
    }
    d
}

/// Construct the per-level smoother named by `param.smoother_kind`. Schwarz
/// neighborhoods are each node's strong-graph closure (itself plus its
/// strong neighbors); every other kind is self-contained.
pub fn build_level_smoother(
    a: &CsrMatrix,
    graph: &crate::coarsening::StrengthGraph,
    markers: &[CfMarker],
    param: &AmgParam,
) -> SolverResult<Box<dyn Smoother + Send + Sync>> {
    Ok(match param.smoother_kind {
        SmootherKind::Jacobi => Box::new(JacobiSmoother::new(a, param.relaxation)),
        SmootherKind::GaussSeidel => {
            Box::new(GsSmoother::new(a, GsOrder::CfOrder(crate::coarsening::cf_sweep_order(markers))))
        }
        SmootherKind::Sor => Box::new(SorSmoother::new(
            a,
            GsOrder::CfOrder(crate::coarsening::cf_sweep_order(markers)),
            param.relaxation,
        )),
        SmootherKind::Ilu => Box::new(IluSmoother::new(a, &crate::params::IluParam::ilu0())?),
        SmootherKind::Polynomial => Box::new(PolynomialSmoother::new(a, 2)),
        SmootherKind::Schwarz => {
            let neighborhoods: Vec<Vec<usize>> = (0..a.rows)
                .map(|i| {
                    let mut nb = vec![i];
                    nb.extend_from_slice(graph.strong_neighbors(i));
                    nb
                })
                .collect();
            Box::new(SchwarzSmoother::build(a, &neighborhoods)?)
        }
    })
}

/// Used only by tests that need a throwaway operator built from a dense
/// neighborhood list; kept here rather than in `coarsening` since it is
/// purely a setup convenience, not part of the coarsening contract.
#[cfg(test)]
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn setup_builds_a_shrinking_hierarchy() {
        let a = poisson(64);
        let param = AmgParam::default();
        let hierarchy = AmgHierarchy::setup(&a, &param).unwrap();
        assert!(hierarchy.num_levels() >= 2);
        for pair in hierarchy.levels.windows(2) {
            assert!(pair[1].a.rows < pair[0].a.rows);
        }
    }

    #[test]
    fn coarsest_level_is_within_the_configured_cutoff_or_stalled() {
        let a = poisson(64);
        let param = AmgParam::default().with_max_levels(25);
        let hierarchy = AmgHierarchy::setup(&a, &param).unwrap();
        let coarsest = hierarchy.levels.last().unwrap();
        assert!(coarsest.a.rows <= param.coarse_size_cutoff || hierarchy.num_levels() == param.max_levels);
    }

    #[test]
    fn galerkin_operator_is_symmetric_for_symmetric_input() {
        let a = poisson(40);
        let param = AmgParam::default();
        let hierarchy = AmgHierarchy::setup(&a, &param).unwrap();
        if hierarchy.num_levels() < 2 {
            return;
        }
        let a1 = &hierarchy.levels[1].a;
        for i in 0..a1.rows {
            for (j, v) in a1.row(i) {
                let back = a1.row(j).find(|&(c, _)| c == i).map(|(_, v)| v).unwrap_or(0.0);
                assert!((v - back).abs() < 1e-8, "A1 not symmetric at ({i},{j})");
            }
        }
    }

    #[test]
    fn coarsest_dense_conversion_is_invertible() {
        let a = poisson(3);
        let dense = csr_to_dense(&a);
        assert!(crate::dense::inverse(&dense).is_some());
    }
}
