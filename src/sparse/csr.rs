//! Compressed Sparse Row matrix and its kernel contract (spec §4.1).

use crate::error::{SolverError, SolverResult};
use crate::sparse::coo::CooMatrix;
use crate::types::{Index, Real, Vector};

/// `{ rows, cols, ia, ja, val }` with `ia[0]=0`, `ia[rows]=nnz`, `ia`
/// non-decreasing, and `ja[ia[i]..ia[i+1]]` the (deduplicated, sorted)
/// columns of row `i`. Index base is zero throughout.
#[derive(Debug, Clone, PartialEq)]
pub struct CsrMatrix {
    pub rows: Index,
    pub cols: Index,
    pub ia: Vec<Index>,
    pub ja: Vec<Index>,
    pub val: Vec<Real>,
}

impl CsrMatrix {
    /// Construct directly from CSR arrays, trusting the caller's invariants
    /// in release builds but checking them under `debug_assertions`.
    pub fn from_raw(rows: Index, cols: Index, ia: Vec<Index>, ja: Vec<Index>, val: Vec<Real>) -> Self {
        debug_assert_eq!(ia.len(), rows + 1);
        debug_assert_eq!(ia[0], 0);
        debug_assert_eq!(*ia.last().unwrap(), ja.len());
        debug_assert_eq!(ja.len(), val.len());
        debug_assert!(ia.windows(2).all(|w| w[0] <= w[1]));
        debug_assert!(ja.iter().all(|&c| c < cols));
        Self { rows, cols, ia, ja, val }
    }

    pub fn zeros(rows: Index, cols: Index) -> Self {
        Self {
            rows,
            cols,
            ia: vec![0; rows + 1],
            ja: Vec::new(),
            val: Vec::new(),
        }
    }

    pub fn nnz(&self) -> usize {
        self.val.len()
    }

    /// Build from COO triples, summing duplicate `(row, col)` entries and
    /// sorting columns within each row.
    pub fn from_coo(coo: &CooMatrix) -> Self {
        let rows = coo.rows;
        let cols = coo.cols;

        let mut row_buckets: Vec<Vec<(Index, Real)>> = vec![Vec::new(); rows];
        for e in &coo.entries {
            row_buckets[e.row].push((e.col, e.val));
        }

        let mut ia = vec![0; rows + 1];
        let mut ja = Vec::with_capacity(coo.nnz());
        let mut val = Vec::with_capacity(coo.nnz());

        for (r, bucket) in row_buckets.iter_mut().enumerate() {
            bucket.sort_by_key(|(c, _)| *c);
            let mut last_col: Option<Index> = None;
            for (c, v) in bucket.drain(..) {
                if last_col == Some(c) {
                    *val.last_mut().unwrap() += v;
                } else {
                    ja.push(c);
                    val.push(v);
                    last_col = Some(c);
                }
            }
            ia[r + 1] = ja.len();
        }

        Self { rows, cols, ia, ja, val }
    }

    /// Inverse of [`Self::from_coo`]: expand back to COO triples (row order
    /// preserved, one triple per stored nonzero).
    pub fn to_coo(&self) -> CooMatrix {
        let mut coo = CooMatrix::new(self.rows, self.cols);
        for r in 0..self.rows {
            for k in self.ia[r]..self.ia[r + 1] {
                coo.push(r, self.ja[k], self.val[k]);
            }
        }
        coo
    }

    fn row_slice(&self, row: Index) -> (&[Index], &[Real]) {
        let (s, e) = (self.ia[row], self.ia[row + 1]);
        (&self.ja[s..e], &self.val[s..e])
    }

    /// Stored `(col, val)` pairs of one row, in column order.
    pub fn row(&self, row: Index) -> impl Iterator<Item = (Index, Real)> + '_ {
        let (cols, vals) = self.row_slice(row);
        cols.iter().copied().zip(vals.iter().copied())
    }

    /// All stored entries `(row, col, val)` of one column. O(nnz) — CSR has
    /// no column index, so this is a linear scan; used only by setup-time
    /// code, never inner kernels.
    pub fn col(&self, col: Index) -> Vec<(Index, Real)> {
        let mut out = Vec::new();
        for r in 0..self.rows {
            for (c, v) in self.row(r) {
                if c == col {
                    out.push((r, v));
                }
            }
        }
        out
    }

    fn check_matvec_shapes(&self, x: &Vector, y: &Vector) -> SolverResult<()> {
        if x.len() != self.cols {
            return Err(SolverError::DimensionMismatch(format!(
                "A is {}x{}, x has length {}",
                self.rows,
                self.cols,
                x.len()
            )));
        }
        if y.len() != self.rows {
            return Err(SolverError::DimensionMismatch(format!(
                "A is {}x{}, y has length {}",
                self.rows,
                self.cols,
                y.len()
            )));
        }
        Ok(())
    }

    /// `y <- A x` (replace).
    pub fn spmv(&self, x: &Vector, y: &mut Vector) -> SolverResult<()> {
        self.check_matvec_shapes(x, y)?;
        for r in 0..self.rows {
            let mut sum = 0.0;
            for (c, v) in self.row(r) {
                sum += v * x[c];
            }
            y[r] = sum;
        }
        Ok(())
    }

    /// `y <- alpha * A x + y` (AXPY variant).
    pub fn spmv_axpy(&self, alpha: Real, x: &Vector, y: &mut Vector) -> SolverResult<()> {
        self.check_matvec_shapes(x, y)?;
        for r in 0..self.rows {
            let mut sum = 0.0;
            for (c, v) in self.row(r) {
                sum += v * x[c];
            }
            y[r] += alpha * sum;
        }
        Ok(())
    }

    /// `y <- A^T x` (replace).
    pub fn spmv_transpose(&self, x: &Vector, y: &mut Vector) -> SolverResult<()> {
        if x.len() != self.rows {
            return Err(SolverError::DimensionMismatch(format!(
                "A^T is {}x{}, x has length {}",
                self.cols,
                self.rows,
                x.len()
            )));
        }
        if y.len() != self.cols {
            return Err(SolverError::DimensionMismatch(format!(
                "A^T is {}x{}, y has length {}",
                self.cols,
                self.rows,
                y.len()
            )));
        }
        y.fill(0.0);
        for r in 0..self.rows {
            let xr = x[r];
            for (c, v) in self.row(r) {
                y[c] += v * xr;
            }
        }
        Ok(())
    }

    pub fn diag(&self) -> Vector {
        let n = self.rows.min(self.cols);
        let mut d = Vector::zeros(n);
        for r in 0..n {
            for (c, v) in self.row(r) {
                if c == r {
                    d[r] = v;
                    break;
                }
            }
        }
        d
    }

    /// Exact transpose (no floating-point rounding): swapping row/col and
    /// re-running the COO->CSR sum-of-duplicates path, which is lossless
    /// since there are no duplicates to begin with.
    pub fn transpose(&self) -> CsrMatrix {
        let mut coo = CooMatrix::new(self.cols, self.rows);
        for r in 0..self.rows {
            for (c, v) in self.row(r) {
                coo.push(c, r, v);
            }
        }
        CsrMatrix::from_coo(&coo)
    }

    /// Sparse-sparse matrix product `self * rhs`, used by AMG's Galerkin
    /// triple product (`AP` stage).
    pub fn matmul(&self, rhs: &CsrMatrix) -> SolverResult<CsrMatrix> {
        if self.cols != rhs.rows {
            return Err(SolverError::DimensionMismatch(format!(
                "{}x{} * {}x{}",
                self.rows, self.cols, rhs.rows, rhs.cols
            )));
        }
        let mut coo = CooMatrix::new(self.rows, rhs.cols);
        let mut accum = vec![0.0_f64; rhs.cols];
        let mut touched = Vec::new();
        for r in 0..self.rows {
            for (k, a_rk) in self.row(r) {
                for (c, b_kc) in rhs.row(k) {
                    if accum[c] == 0.0 {
                        touched.push(c);
                    }
                    accum[c] += a_rk * b_kc;
                }
            }
            touched.sort_unstable();
            for &c in &touched {
                if accum[c] != 0.0 {
                    coo.push(r, c, accum[c]);
                }
                accum[c] = 0.0;
            }
            touched.clear();
        }
        Ok(CsrMatrix::from_coo(&coo))
    }
}

#[cfg(feature = "parallel")]
impl CsrMatrix {
    /// Row-chunked parallel `y <- A x`; deterministic because each row's
    /// partial sum is computed independently and written to a disjoint
    /// output slot — no reduction, so no order-dependence.
    pub fn spmv_parallel(&self, x: &Vector, y: &mut Vector) -> SolverResult<()> {
        self.check_matvec_shapes(x, y)?;
        use rayon::prelude::*;
        let rows = self.rows;
        let ia = &self.ia;
        let ja = &self.ja;
        let val = &self.val;
        let out: Vec<Real> = (0..rows)
            .into_par_iter()
            .map(|r| {
                let mut sum = 0.0;
                for k in ia[r]..ia[r + 1] {
                    sum += val[k] * x[ja[k]];
                }
                sum
            })
            .collect();
        y.copy_from_slice(&out);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> CsrMatrix {
        // [ 4 -1  0 ]
        // [-1  4 -1 ]
        // [ 0 -1  4 ]
        let mut coo = CooMatrix::new(3, 3);
        coo.push(0, 0, 4.0);
        coo.push(0, 1, -1.0);
        coo.push(1, 0, -1.0);
        coo.push(1, 1, 4.0);
        coo.push(1, 2, -1.0);
        coo.push(2, 1, -1.0);
        coo.push(2, 2, 4.0);
        CsrMatrix::from_coo(&coo)
    }

    #[test]
    fn coo_dedup_sums_duplicates() {
        let mut coo = CooMatrix::new(2, 2);
        coo.push(0, 0, 1.0);
        coo.push(0, 0, 2.0);
        coo.push(1, 1, 5.0);
        let a = CsrMatrix::from_coo(&coo);
        assert_eq!(a.nnz(), 2);
        assert_eq!(a.row(0).collect::<Vec<_>>(), vec![(0, 3.0)]);
    }

    #[test]
    fn spmv_matches_hand_computation() {
        let a = sample();
        let x = Vector::from_vec(vec![1.0, 1.0, 1.0]);
        let mut y = Vector::zeros(3);
        a.spmv(&x, &mut y).unwrap();
        assert_eq!(y.as_slice(), &[3.0, 2.0, 3.0]);
    }

    #[test]
    fn spmv_axpy_accumulates() {
        let a = sample();
        let x = Vector::from_vec(vec![1.0, 0.0, 0.0]);
        let mut y = Vector::from_vec(vec![1.0, 1.0, 1.0]);
        a.spmv_axpy(2.0, &x, &mut y).unwrap();
        // A*x = [4, -1, 0]; y = y + 2*(A x) = [9, -1, 1]
        assert_eq!(y.as_slice(), &[9.0, -1.0, 1.0]);
    }

    #[test]
    fn transpose_of_symmetric_is_self() {
        let a = sample();
        assert_eq!(a.transpose(), a);
    }

    #[test]
    fn double_transpose_is_exact_identity() {
        let mut coo = CooMatrix::new(2, 3);
        coo.push(0, 0, 1.0);
        coo.push(0, 2, 3.0);
        coo.push(1, 1, 2.0);
        let a = CsrMatrix::from_coo(&coo);
        assert_eq!(a.transpose().transpose(), a);
    }

    #[test]
    fn dimension_mismatch_is_reported() {
        let a = sample();
        let x = Vector::zeros(2);
        let mut y = Vector::zeros(3);
        assert!(a.spmv(&x, &mut y).is_err());
    }

    #[test]
    fn coo_roundtrip_preserves_matrix() {
        let a = sample();
        let back = CsrMatrix::from_coo(&a.to_coo());
        assert_eq!(a, back);
    }

    #[test]
    fn diag_extracts_diagonal() {
        let a = sample();
        assert_eq!(a.diag().as_slice(), &[4.0, 4.0, 4.0]);
    }
}
