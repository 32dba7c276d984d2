//! AMG cycle shapes (spec §4.6): V, W, F, and nonlinear AMLI.
//!
//! Nonlinear AMLI's inner loop is a small GCG-flavored (A-orthogonalized,
//! conjugate-direction) combination of `amli_inner_iters` applications of
//! the coarser-level cycle, embedded directly here rather than calling
//! [`crate::krylov::gcg`] — `krylov` depends on `precond`, which in turn
//! depends on `amg` (for the AMG-cycle preconditioner variant), so `amg`
//! calling back into `krylov` would make the module graph circular. The
//! embedded loop below is the same conjugate-combination idea, just kept
//! local to this module.

use crate::params::{AmgParam, CycleKind};
use crate::types::{Real, Vector, EPS_DENOM};

use super::setup::AmgHierarchy;

/// Run one cycle rooted at `idx` (0 = finest), updating `x` in place
/// against right-hand side `b`.
pub fn amg_cycle(hierarchy: &AmgHierarchy, idx: usize, b: &Vector, x: &mut Vector, param: &AmgParam) {
    run_cycle(hierarchy, idx, b, x, param, param.cycle_kind);
}

fn run_cycle(hierarchy: &AmgHierarchy, idx: usize, b: &Vector, x: &mut Vector, param: &AmgParam, kind: CycleKind) {
    if idx == hierarchy.levels.len() - 1 {
        let sol = hierarchy.coarsest_solve(b.as_slice());
        x.copy_from_slice(&sol);
        return;
    }

    let lvl = &hierarchy.levels[idx];
    let _ = lvl.smoother.smooth(&lvl.a, b, x, param.presmooth_sweeps);

    let mut r = b.clone();
    let _ = lvl.a.spmv_axpy(-1.0, x, &mut r);

    let p = lvl.p.as_ref().expect("non-coarsest level always has a prolongation");
    let mut rc = Vector::zeros(p.cols);
    let _ = p.spmv_transpose(&r, &mut rc);
    let mut xc = Vector::zeros(p.cols);

    match kind {
        CycleKind::V => run_cycle(hierarchy, idx + 1, &rc, &mut xc, param, CycleKind::V),
        CycleKind::W => {
            run_cycle(hierarchy, idx + 1, &rc, &mut xc, param, CycleKind::W);
            run_cycle(hierarchy, idx + 1, &rc, &mut xc, param, CycleKind::W);
        }
        CycleKind::F => {
            run_cycle(hierarchy, idx + 1, &rc, &mut xc, param, CycleKind::F);
            run_cycle(hierarchy, idx + 1, &rc, &mut xc, param, CycleKind::V);
        }
        CycleKind::NonlinearAmli => nonlinear_amli_inner(hierarchy, idx + 1, &rc, &mut xc, param),
    }

    let mut correction = xc.clone();
    if param.coarse_scaling {
        // Optional coarse-grid scaling factor (spec §4.6): the Galerkin
        // line-search minimizer `<r, P xc> / <A P xc, P xc>` along the
        // correction direction, guarding against a near-zero denominator.
        let mut a_correction = Vector::zeros(x.len());
        let mut p_correction = Vector::zeros(x.len());
        let _ = p.spmv(&correction, &mut p_correction);
        let _ = lvl.a.spmv(&p_correction, &mut a_correction);
        let denom = a_correction.dot(&p_correction);
        if denom.abs() > EPS_DENOM {
            let scale = r.dot(&p_correction) / denom;
            correction *= scale;
        }
    }

    let _ = p.spmv_axpy(1.0, &correction, x);
    let _ = lvl.smoother.smooth(&lvl.a, b, x, param.postsmooth_sweeps);
}

/// `amli_inner_iters` A-orthogonalized applications of the coarser cycle
/// (used as a fixed linear operator `M^-1`) combined by the GCG
/// conjugate-direction rule: each new direction is projected against every
/// earlier one's `A`-image before its step length is chosen, so the
/// combination is (locally) energy-optimal rather than a flat sum.
fn nonlinear_amli_inner(hierarchy: &AmgHierarchy, idx: usize, b: &Vector, x: &mut Vector, param: &AmgParam) {
    let a_c = &hierarchy.levels[idx].a;
    let n = b.len();
    let mut residual = b.clone();
    let mut directions: Vec<(Vector, Vector)> = Vec::with_capacity(param.amli_inner_iters);

    for _ in 0..param.amli_inner_iters {
        let mut d = Vector::zeros(n);
        run_cycle(hierarchy, idx, &residual, &mut d, param, CycleKind::V);

        let mut ad = Vector::zeros(n);
        let _ = a_c.spmv(&d, &mut ad);

        for (prev_d, prev_ad) in &directions {
            let denom = prev_ad.dot(prev_ad);
            if denom.abs() < EPS_DENOM {
                continue;
            }
            let beta = ad.dot(prev_ad) / denom;
            d -= beta * prev_d;
            ad -= beta * prev_ad;
        }

        let denom: Real = ad.dot(&d);
        if denom.abs() < EPS_DENOM {
            break;
        }
        let alpha = residual.dot(&d) / denom;
        *x += alpha * &d;
        residual -= alpha * &ad;
        directions.push((d, ad));
    }
}
