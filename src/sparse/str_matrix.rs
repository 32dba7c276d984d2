//! Structured-grid matrix (spec §3, §4.1): a fixed `nx*ny*nz` grid, `nc`
//! coupled unknowns per node, and `nband` fixed off-diagonal band offsets.

use crate::dense::DenseBlock;
use crate::error::{SolverError, SolverResult};
use crate::types::{Real, Vector};

#[derive(Debug, Clone)]
pub struct StrMatrix {
    pub nx: usize,
    pub ny: usize,
    pub nz: usize,
    pub nc: usize,
    /// Band offsets in node-index space (can be negative relative to the
    /// owning node; stored as `i64` since, unlike CSR/BSR indices, these are
    /// genuinely signed displacements).
    pub offsets: Vec<i64>,
    /// `ngrid * nc^2` diagonal block entries, one `nc x nc` tile per node.
    pub diag: Vec<Real>,
    /// One `Vec<Real>` per band; `offdiag[k]` has `(ngrid - |offsets[k]|) * nc^2`
    /// entries — the tile living at node `i` couples `i` to `i + offsets[k]`.
    pub offdiag: Vec<Vec<Real>>,
}

impl StrMatrix {
    pub fn ngrid(&self) -> usize {
        self.nx * self.ny * self.nz
    }

    pub fn nband(&self) -> usize {
        self.offsets.len()
    }

    fn diag_block(&self, node: usize) -> DenseBlock {
        let nc = self.nc;
        let mut b = DenseBlock::zeros(nc);
        b.data.copy_from_slice(&self.diag[node * nc * nc..(node + 1) * nc * nc]);
        b
    }

    /// Tile at `offdiag[band]` coupling `node` to `node + offsets[band]`, if
    /// that target node is in range `[0, ngrid)` (out-of-range targets are
    /// clamped — i.e. skipped — per spec §4.1).
    fn band_block(&self, band: usize, node: usize) -> Option<(usize, DenseBlock)> {
        let offset = self.offsets[band];
        let target = node as i64 + offset;
        if target < 0 || target as usize >= self.ngrid() {
            return None;
        }
        let target = target as usize;
        // The band array is indexed by the smaller of (node, target) so
        // that both directions of a symmetric band offset share storage;
        // we index by the source node that is in range for offset >= 0,
        // and by the target for offset < 0, matching the band's declared
        // length `ngrid - |offset|`.
        let store_index = if offset >= 0 { node } else { target };
        let nc = self.nc;
        let base = store_index * nc * nc;
        let slice = self.offdiag.get(band)?;
        if base + nc * nc > slice.len() {
            return None;
        }
        let mut b = DenseBlock::zeros(nc);
        b.data.copy_from_slice(&slice[base..base + nc * nc]);
        Some((target, b))
    }

    fn check_shapes(&self, x: &Vector, y: &Vector) -> SolverResult<()> {
        let n = self.ngrid() * self.nc;
        if x.len() != n || y.len() != n {
            return Err(SolverError::DimensionMismatch(format!(
                "STR matrix is {n}x{n}, x={}, y={}",
                x.len(),
                y.len()
            )));
        }
        Ok(())
    }

    /// `y <- alpha * A x + y`.
    pub fn spmv_axpy(&self, alpha: Real, x: &Vector, y: &mut Vector) -> SolverResult<()> {
        self.check_shapes(x, y)?;
        let nc = self.nc;
        for node in 0..self.ngrid() {
            let mut acc = vec![0.0; nc];
            let xs = &x.as_slice()[node * nc..(node + 1) * nc];
            self.diag_block(node).matvec_update(1.0, xs, &mut acc);
            for band in 0..self.nband() {
                if let Some((target, block)) = self.band_block(band, node) {
                    let xt = &x.as_slice()[target * nc..(target + 1) * nc];
                    block.matvec_update(1.0, xt, &mut acc);
                }
            }
            let ys = &mut y.as_mut_slice()[node * nc..(node + 1) * nc];
            for i in 0..nc {
                ys[i] += alpha * acc[i];
            }
        }
        Ok(())
    }

    pub fn spmv(&self, x: &Vector, y: &mut Vector) -> SolverResult<()> {
        y.fill(0.0);
        self.spmv_axpy(1.0, x, y)
    }

    pub fn diag_blocks(&self) -> Vec<DenseBlock> {
        (0..self.ngrid()).map(|i| self.diag_block(i)).collect()
    }
}
