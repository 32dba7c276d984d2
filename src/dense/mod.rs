//! Small dense kernels (spec §4.2): `n x n` inverse/multiply/mat-vec with
//! closed-form paths for `n in {2, 3}`, the shared LU fallback used for
//! `n in {5, 7}` and everything else (a 5x5/7x7 cofactor expansion buys
//! nothing over LU with partial pivoting — it is the same asymptotic cost
//! and far more error-prone to hand-unroll), plus the "saturation" variants
//! used by block Gauss-Seidel/Schwarz.

use crate::types::Real;

/// `|det(A)| < EPS_TINY` marks a block as ill-conditioned; callers may skip it.
pub const EPS_TINY: Real = 1e-24;

/// A dense `n x n` row-major block, reused for BSR tiles, Schwarz
/// subsystems, and STR node blocks.
#[derive(Debug, Clone, PartialEq)]
pub struct DenseBlock {
    pub n: usize,
    pub data: Vec<Real>,
}

impl DenseBlock {
    pub fn zeros(n: usize) -> Self {
        Self { n, data: vec![0.0; n * n] }
    }

    pub fn identity(n: usize) -> Self {
        let mut b = Self::zeros(n);
        for i in 0..n {
            b[(i, i)] = 1.0;
        }
        b
    }

    #[inline]
    pub fn get(&self, i: usize, j: usize) -> Real {
        self.data[i * self.n + j]
    }

    #[inline]
    pub fn set(&mut self, i: usize, j: usize, v: Real) {
        self.data[i * self.n + j] = v;
    }

    /// `y <- A x`.
    pub fn matvec(&self, x: &[Real], y: &mut [Real]) {
        for i in 0..self.n {
            let mut sum = 0.0;
            for j in 0..self.n {
                sum += self.get(i, j) * x[j];
            }
            y[i] = sum;
        }
    }

    /// `y <- y + sign * A x`, `sign = +-1`. Backs both "`y <- y + Ax`" and
    /// "`y <- y - Ax`" from spec §4.2.
    pub fn matvec_update(&self, sign: Real, x: &[Real], y: &mut [Real]) {
        for i in 0..self.n {
            let mut sum = 0.0;
            for j in 0..self.n {
                sum += self.get(i, j) * x[j];
            }
            y[i] += sign * sum;
        }
    }

    /// `C <- A * B` for two same-size blocks.
    pub fn matmul(&self, rhs: &DenseBlock) -> DenseBlock {
        assert_eq!(self.n, rhs.n);
        let n = self.n;
        let mut c = DenseBlock::zeros(n);
        for i in 0..n {
            for k in 0..n {
                let a_ik = self.get(i, k);
                if a_ik == 0.0 {
                    continue;
                }
                for j in 0..n {
                    c.data[i * n + j] += a_ik * rhs.get(k, j);
                }
            }
        }
        c
    }

    /// "Saturation" update on the trailing `(n-1) x (n-1)` subblock:
    /// `ys[1..] <- ys[1..] - A[1..,1..] * xs[1..]`.
    pub fn saturate_sub(&self, xs: &[Real], ys: &mut [Real]) {
        let n = self.n;
        for i in 1..n {
            let mut sum = 0.0;
            for j in 1..n {
                sum += self.get(i, j) * xs[j];
            }
            ys[i] -= sum;
        }
    }
}

impl std::ops::Index<(usize, usize)> for DenseBlock {
    type Output = Real;
    fn index(&self, (i, j): (usize, usize)) -> &Real {
        &self.data[i * self.n + j]
    }
}
impl std::ops::IndexMut<(usize, usize)> for DenseBlock {
    fn index_mut(&mut self, (i, j): (usize, usize)) -> &mut Real {
        &mut self.data[i * self.n + j]
    }
}

/// In-place LU with partial pivoting. Pivots are written into the
/// caller-supplied permutation vector (`perm[i]` = row swapped with row `i`).
/// Returns `false` (and leaves `a` partially factored) if a pivot column is
/// entirely (near-)zero.
pub fn lu_factor_inplace(a: &mut DenseBlock, perm: &mut [usize]) -> bool {
    let n = a.n;
    for (i, p) in perm.iter_mut().enumerate().take(n) {
        *p = i;
    }
    for k in 0..n {
        let mut piv_row = k;
        let mut piv_val = a.get(k, k).abs();
        for i in (k + 1)..n {
            let v = a.get(i, k).abs();
            if v > piv_val {
                piv_val = v;
                piv_row = i;
            }
        }
        if piv_val < EPS_TINY {
            return false;
        }
        if piv_row != k {
            for j in 0..n {
                a.data.swap(k * n + j, piv_row * n + j);
            }
            perm.swap(k, piv_row);
        }
        let akk = a.get(k, k);
        for i in (k + 1)..n {
            let factor = a.get(i, k) / akk;
            a.set(i, k, factor);
            for j in (k + 1)..n {
                let v = a.get(i, j) - factor * a.get(k, j);
                a.set(i, j, v);
            }
        }
    }
    true
}

/// Solve `A x = b` given the LU factorization and pivot vector from
/// [`lu_factor_inplace`].
pub fn lu_solve(lu: &DenseBlock, perm: &[usize], b: &[Real]) -> Vec<Real> {
    let n = lu.n;
    let mut y = vec![0.0; n];
    for i in 0..n {
        y[i] = b[perm[i]];
    }
    // Forward substitution, unit lower triangle.
    for i in 0..n {
        let mut sum = y[i];
        for j in 0..i {
            sum -= lu.get(i, j) * y[j];
        }
        y[i] = sum;
    }
    // Back substitution, upper triangle.
    for i in (0..n).rev() {
        let mut sum = y[i];
        for j in (i + 1)..n {
            sum -= lu.get(i, j) * y[j];
        }
        y[i] = sum / lu.get(i, i);
    }
    y
}

/// In-place inverse of an `n x n` block. `Some(inv)` with `inv.1 = |det|`
/// unless `|det| < EPS_TINY`, in which case the block is reported as
/// ill-conditioned (`None`) and callers should skip it (spec §4.2 invariant).
pub fn inverse(a: &DenseBlock) -> Option<DenseBlock> {
    match a.n {
        2 => inverse_2x2(a),
        3 => inverse_3x3(a),
        _ => inverse_generic_lu(a),
    }
}

fn inverse_2x2(a: &DenseBlock) -> Option<DenseBlock> {
    let (a11, a12, a21, a22) = (a.get(0, 0), a.get(0, 1), a.get(1, 0), a.get(1, 1));
    let det = a11 * a22 - a12 * a21;
    if det.abs() < EPS_TINY {
        return None;
    }
    let inv_det = 1.0 / det;
    let mut out = DenseBlock::zeros(2);
    out.set(0, 0, a22 * inv_det);
    out.set(0, 1, -a12 * inv_det);
    out.set(1, 0, -a21 * inv_det);
    out.set(1, 1, a11 * inv_det);
    Some(out)
}

fn inverse_3x3(a: &DenseBlock) -> Option<DenseBlock> {
    let m = |i: usize, j: usize| a.get(i, j);
    let c00 = m(1, 1) * m(2, 2) - m(1, 2) * m(2, 1);
    let c01 = m(1, 2) * m(2, 0) - m(1, 0) * m(2, 2);
    let c02 = m(1, 0) * m(2, 1) - m(1, 1) * m(2, 0);
    let det = m(0, 0) * c00 + m(0, 1) * c01 + m(0, 2) * c02;
    if det.abs() < EPS_TINY {
        return None;
    }
    let inv_det = 1.0 / det;
    let c10 = m(0, 2) * m(2, 1) - m(0, 1) * m(2, 2);
    let c11 = m(0, 0) * m(2, 2) - m(0, 2) * m(2, 0);
    let c12 = m(0, 1) * m(2, 0) - m(0, 0) * m(2, 1);
    let c20 = m(0, 1) * m(1, 2) - m(0, 2) * m(1, 1);
    let c21 = m(0, 2) * m(1, 0) - m(0, 0) * m(1, 2);
    let c22 = m(0, 0) * m(1, 1) - m(0, 1) * m(1, 0);
    let mut out = DenseBlock::zeros(3);
    for (idx, v) in [c00, c10, c20, c01, c11, c21, c02, c12, c22].iter().enumerate() {
        out.data[idx] = v * inv_det;
    }
    Some(out)
}

fn inverse_generic_lu(a: &DenseBlock) -> Option<DenseBlock> {
    let n = a.n;
    let mut lu = a.clone();
    let mut perm = vec![0usize; n];
    if !lu_factor_inplace(&mut lu, &mut perm) {
        return None;
    }
    let mut out = DenseBlock::zeros(n);
    let mut e = vec![0.0; n];
    for col in 0..n {
        e.iter_mut().for_each(|v| *v = 0.0);
        e[col] = 1.0;
        let x = lu_solve(&lu, &perm, &e);
        for row in 0..n {
            out.set(row, col, x[row]);
        }
    }
    Some(out)
}
