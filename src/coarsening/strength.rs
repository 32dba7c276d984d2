//! Strong-connection graph (spec §4.4 "Strength of connection"): row `i`
//! strongly depends on column `j` when `-a_ij >= theta * max_{k != i} (-a_ik)`
//! (the classical, negative-coefficient-only definition; `Absolute` and
//! `Modified` offer alternate measures for non-M-matrix input — see
//! [`StrengthMeasure`]).

use crate::params::StrengthMeasure;
use crate::sparse::CsrMatrix;
use crate::types::{Index, Real};

/// `S[i]` holds the columns `i` strongly depends on; `s_t[j]` (transpose)
/// holds the rows that strongly depend on `j` — both directions are needed
/// by the lambda measure in C/F splitting.
pub struct StrengthGraph {
    rows: usize,
    depends_on: Vec<Vec<Index>>,
    depended_on_by: Vec<Vec<Index>>,
}

impl StrengthGraph {
    pub fn is_strong(&self, i: Index, j: Index) -> bool {
        self.depends_on[i].binary_search(&j).is_ok()
    }

    pub fn strong_neighbors(&self, i: Index) -> &[Index] {
        &self.depends_on[i]
    }

    /// Rows that strongly depend on `j` (used to compute lambda, the
    /// influence count, in C/F splitting).
    pub fn strongly_influences(&self, j: Index) -> &[Index] {
        &self.depended_on_by[j]
    }

    pub fn rows(&self) -> usize {
        self.rows
    }
}

/// `max_row_sum` is only consulted by `StrengthMeasure::Modified`; the other
/// two measures ignore it.
pub fn strong_connections(a: &CsrMatrix, theta: Real, measure: StrengthMeasure, max_row_sum: Real) -> StrengthGraph {
    let n = a.rows;
    let mut depends_on: Vec<Vec<Index>> = vec![Vec::new(); n];

    for i in 0..n {
        if measure == StrengthMeasure::Modified && is_weakly_diagonally_dominant(a, i, max_row_sum) {
            // Relaxation alone handles this row well; it gets no strong
            // connections in either direction (spec §4.4 "Modified").
            continue;
        }

        let row_max = match measure {
            StrengthMeasure::NegativeOnly | StrengthMeasure::Modified => a
                .row(i)
                .filter(|&(j, v)| j != i && v < 0.0)
                .map(|(_, v)| -v)
                .fold(0.0, Real::max),
            StrengthMeasure::Absolute => a
                .row(i)
                .filter(|&(j, _)| j != i)
                .map(|(_, v)| v.abs())
                .fold(0.0, Real::max),
        };
        if row_max <= 0.0 {
            continue;
        }
        for (j, v) in a.row(i) {
            if j == i {
                continue;
            }
            let strength = match measure {
                StrengthMeasure::NegativeOnly | StrengthMeasure::Modified => {
                    if v < 0.0 {
                        -v
                    } else {
                        0.0
                    }
                }
                StrengthMeasure::Absolute => v.abs(),
            };
            if strength >= theta * row_max {
                depends_on[i].push(j);
            }
        }
    }

    for neighbors in depends_on.iter_mut() {
        neighbors.sort_unstable();
    }

    let mut depended_on_by: Vec<Vec<Index>> = vec![Vec::new(); n];
    for (i, neighbors) in depends_on.iter().enumerate() {
        for &j in neighbors {
            depended_on_by[j].push(i);
        }
    }

    StrengthGraph { rows: n, depends_on, depended_on_by }
}

/// Row `i` is weakly diagonally dominant when `|sum_{j!=i} a_ij| <=
/// max_row_sum * |a_ii|` — relaxation already converges acceptably fast on
/// it, so the modified measure records no strong connections for it.
fn is_weakly_diagonally_dominant(a: &CsrMatrix, i: Index, max_row_sum: Real) -> bool {
    let mut diag = 0.0;
    let mut off_diag_sum = 0.0;
    for (j, v) in a.row(i) {
        if j == i {
            diag = v;
        } else {
            off_diag_sum += v;
        }
    }
    if diag.abs() < crate::types::EPS_TINY {
        return false;
    }
    off_diag_sum.abs() <= max_row_sum * diag.abs()
}

#[cfg(test)]
mod tests {
    use super::*;
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
    fn tridiagonal_interior_point_strongly_depends_on_both_neighbors() {
        let a = poisson(5);
        let graph = strong_connections(&a, 0.25, StrengthMeasure::NegativeOnly, 0.9);
        assert!(graph.is_strong(2, 1));
        assert!(graph.is_strong(2, 3));
        assert!(!graph.is_strong(2, 2));
    }

    #[test]
    fn strongly_influences_is_the_transpose_relation() {
        let a = poisson(4);
        let graph = strong_connections(&a, 0.25, StrengthMeasure::NegativeOnly, 0.9);
        assert!(graph.strongly_influences(1).contains(&0));
        assert!(graph.strongly_influences(1).contains(&2));
    }

    #[test]
    fn modified_measure_skips_weakly_diagonally_dominant_rows() {
        // Row 0 is strongly diagonally dominant (off-diag sum 1 << diag 100):
        // the modified measure should give it no strong connections at all.
        let mut coo = CooMatrix::new(3, 3);
        coo.push(0, 0, 100.0);
        coo.push(0, 1, -1.0);
        coo.push(1, 0, -1.0);
        coo.push(1, 1, 2.0);
        coo.push(1, 2, -1.0);
        coo.push(2, 1, -1.0);
        coo.push(2, 2, 2.0);
        let a = CsrMatrix::from_coo(&coo);

        let graph = strong_connections(&a, 0.25, StrengthMeasure::Modified, 0.9);
        assert!(graph.strong_neighbors(0).is_empty());
        assert!(graph.is_strong(1, 2));
    }

    #[test]
    fn modified_measure_matches_negative_only_on_non_dominant_rows() {
        let a = poisson(6);
        let modified = strong_connections(&a, 0.25, StrengthMeasure::Modified, 0.0);
        let classical = strong_connections(&a, 0.25, StrengthMeasure::NegativeOnly, 0.0);
        for i in 0..6 {
            assert_eq!(modified.strong_neighbors(i), classical.strong_neighbors(i));
        }
    }
}
