//! Block Sparse Row matrix (spec §3, §4.1). Each stored "entry" is an
//! `nb x nb` dense tile; `nb in {2,3}` dispatches to hand-unrolled matvec
//! kernels, anything else (including `nb in {5,7}`) falls back to the
//! generic triple loop — the same split [`crate::dense::inverse`] draws
//! between its closed-form 2x2/3x3 paths and the shared LU fallback.

use crate::dense::DenseBlock;
use crate::error::{SolverError, SolverResult};
use crate::types::{Index, Real, Vector};

/// Row-major or column-major storage of each `nb x nb` tile.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageManner {
    RowMajor,
    ColMajor,
}

#[derive(Debug, Clone)]
pub struct BsrMatrix {
    /// Block-row / block-column counts (not scalar rows/cols).
    pub rows: Index,
    pub cols: Index,
    pub nb: usize,
    pub storage: StorageManner,
    pub ia: Vec<Index>,
    pub ja: Vec<Index>,
    /// Flattened `NNZ * nb * nb` values, one `nb x nb` tile per stored entry.
    pub val: Vec<Real>,
}

impl BsrMatrix {
    pub fn zeros(rows: Index, cols: Index, nb: usize, storage: StorageManner) -> Self {
        Self {
            rows,
            cols,
            nb,
            storage,
            ia: vec![0; rows + 1],
            ja: Vec::new(),
            val: Vec::new(),
        }
    }

    pub fn nnz_blocks(&self) -> usize {
        self.ja.len()
    }

    fn block_at(&self, k: usize) -> DenseBlock {
        let nb = self.nb;
        let raw = &self.val[k * nb * nb..(k + 1) * nb * nb];
        let mut b = DenseBlock::zeros(nb);
        match self.storage {
            StorageManner::RowMajor => b.data.copy_from_slice(raw),
            StorageManner::ColMajor => {
                for i in 0..nb {
                    for j in 0..nb {
                        b.set(i, j, raw[j * nb + i]);
                    }
                }
            }
        }
        b
    }

    fn check_shapes(&self, x: &Vector, y: &Vector) -> SolverResult<()> {
        let (n, m) = (self.rows * self.nb, self.cols * self.nb);
        if x.len() != m {
            return Err(SolverError::DimensionMismatch(format!(
                "BSR is {n}x{m} (scalar), x has length {}",
                x.len()
            )));
        }
        if y.len() != n {
            return Err(SolverError::DimensionMismatch(format!(
                "BSR is {n}x{m} (scalar), y has length {}",
                y.len()
            )));
        }
        Ok(())
    }

    /// `y <- alpha * A x + y`, dispatching per block to the unrolled 2x2/3x3
    /// kernel or the generic triple loop.
    pub fn spmv_axpy(&self, alpha: Real, x: &Vector, y: &mut Vector) -> SolverResult<()> {
        self.check_shapes(x, y)?;
        let nb = self.nb;
        for br in 0..self.rows {
            let mut acc = vec![0.0; nb];
            for k in self.ia[br]..self.ia[br + 1] {
                let bc = self.ja[k];
                let block = self.block_at(k);
                let xs = &x.as_slice()[bc * nb..(bc + 1) * nb];
                match nb {
                    2 => block_matvec_update_2(&block, xs, &mut acc),
                    3 => block_matvec_update_3(&block, xs, &mut acc),
                    _ => block.matvec_update(1.0, xs, &mut acc),
                }
            }
            let ys = &mut y.as_mut_slice()[br * nb..(br + 1) * nb];
            for i in 0..nb {
                ys[i] += alpha * acc[i];
            }
        }
        Ok(())
    }

    /// `y <- A x` (replace).
    pub fn spmv(&self, x: &Vector, y: &mut Vector) -> SolverResult<()> {
        y.fill(0.0);
        self.spmv_axpy(1.0, x, y)
    }

    /// `y <- A^T x` (replace). Each block contributes its transpose to the
    /// corresponding block-column of `y`.
    pub fn spmv_transpose(&self, x: &Vector, y: &mut Vector) -> SolverResult<()> {
        let nb = self.nb;
        if x.len() != self.rows * nb || y.len() != self.cols * nb {
            return Err(SolverError::DimensionMismatch(
                "BSR transpose shape mismatch".into(),
            ));
        }
        y.fill(0.0);
        for br in 0..self.rows {
            let xs = &x.as_slice()[br * nb..(br + 1) * nb];
            for k in self.ia[br]..self.ia[br + 1] {
                let bc = self.ja[k];
                let block = self.block_at(k);
                for i in 0..nb {
                    let mut sum = 0.0;
                    for j in 0..nb {
                        sum += block.get(j, i) * xs[j];
                    }
                    y[bc * nb + i] += sum;
                }
            }
        }
        Ok(())
    }

    /// Block-diagonal entries, one [`DenseBlock`] per block-row that has a
    /// stored diagonal block (missing diagonals are the caller's problem —
    /// smoothers treat a missing diagonal the same as a zero one).
    pub fn block_diag(&self) -> Vec<Option<DenseBlock>> {
        (0..self.rows)
            .map(|br| {
                (self.ia[br]..self.ia[br + 1])
                    .find(|&k| self.ja[k] == br)
                    .map(|k| self.block_at(k))
            })
            .collect()
    }

    /// Build from a list of `(block_row, block_col, DenseBlock)` triples,
    /// summing duplicate block positions (mirrors [`crate::sparse::csr::CsrMatrix::from_coo`]).
    pub fn from_block_triples(
        rows: Index,
        cols: Index,
        nb: usize,
        triples: Vec<(Index, Index, DenseBlock)>,
    ) -> Self {
        let mut buckets: Vec<Vec<(Index, DenseBlock)>> = vec![Vec::new(); rows];
        for (r, c, b) in triples {
            buckets[r].push((c, b));
        }
        let mut ia = vec![0; rows + 1];
        let mut ja = Vec::new();
        let mut val = Vec::new();
        for (r, bucket) in buckets.iter_mut().enumerate() {
            bucket.sort_by_key(|(c, _)| *c);
            let mut last: Option<Index> = None;
            for (c, b) in bucket.drain(..) {
                if last == Some(c) {
                    let start = (ja.len() - 1) * nb * nb;
                    for i in 0..nb * nb {
                        val[start + i] += b.data[i];
                    }
                } else {
                    ja.push(c);
                    val.extend_from_slice(&b.data);
                    last = Some(c);
                }
            }
            ia[r + 1] = ja.len();
        }
        Self {
            rows,
            cols,
            nb,
            storage: StorageManner::RowMajor,
            ia,
            ja,
            val,
        }
    }
}

/// `acc += block * xs` for a 2x2 block, unrolled.
fn block_matvec_update_2(block: &DenseBlock, xs: &[Real], acc: &mut [Real]) {
    acc[0] += block.get(0, 0) * xs[0] + block.get(0, 1) * xs[1];
    acc[1] += block.get(1, 0) * xs[0] + block.get(1, 1) * xs[1];
}

/// `acc += block * xs` for a 3x3 block, unrolled.
fn block_matvec_update_3(block: &DenseBlock, xs: &[Real], acc: &mut [Real]) {
    acc[0] += block.get(0, 0) * xs[0] + block.get(0, 1) * xs[1] + block.get(0, 2) * xs[2];
    acc[1] += block.get(1, 0) * xs[0] + block.get(1, 1) * xs[1] + block.get(1, 2) * xs[2];
    acc[2] += block.get(2, 0) * xs[0] + block.get(2, 1) * xs[1] + block.get(2, 2) * xs[2];
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_2x2_blocks() -> BsrMatrix {
        // One block-row, one diagonal 2x2 block [[2,0],[0,3]].
        let mut b = DenseBlock::zeros(2);
        b.set(0, 0, 2.0);
        b.set(1, 1, 3.0);
        BsrMatrix::from_block_triples(1, 1, 2, vec![(0, 0, b)])
    }

    #[test]
    fn bsr_spmv_matches_block_diagonal_scaling() {
        let a = sample_2x2_blocks();
        let x = Vector::from_vec(vec![1.0, 1.0]);
        let mut y = Vector::zeros(2);
        a.spmv(&x, &mut y).unwrap();
        assert_eq!(y.as_slice(), &[2.0, 3.0]);
    }

    #[test]
    fn bsr_transpose_of_symmetric_block_matches_forward() {
        let a = sample_2x2_blocks();
        let x = Vector::from_vec(vec![1.0, 2.0]);
        let mut y1 = Vector::zeros(2);
        let mut y2 = Vector::zeros(2);
        a.spmv(&x, &mut y1).unwrap();
        a.spmv_transpose(&x, &mut y2).unwrap();
        assert_eq!(y1, y2);
    }

    #[test]
    fn bsr_spmv_3x3_specialized_path_matches_generic_matvec() {
        let mut b = DenseBlock::zeros(3);
        let mut v = 1.0;
        for i in 0..3 {
            for j in 0..3 {
                b.set(i, j, v);
                v += 1.0;
            }
        }
        let a = BsrMatrix::from_block_triples(1, 1, 3, vec![(0, 0, b.clone())]);
        let x = Vector::from_vec(vec![1.0, 2.0, 3.0]);
        let mut y = Vector::zeros(3);
        a.spmv(&x, &mut y).unwrap();

        let mut expected = vec![0.0; 3];
        b.matvec(x.as_slice(), &mut expected);
        assert_eq!(y.as_slice(), expected.as_slice());
    }

    #[test]
    fn block_diag_extracts_stored_diagonal() {
        let a = sample_2x2_blocks();
        let diag = a.block_diag();
        assert!(diag[0].is_some());
        assert_eq!(diag[0].as_ref().unwrap().get(0, 0), 2.0);
    }
}
