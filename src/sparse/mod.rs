//! Sparse matrix formats: CSR, BSR, and structured-grid (STR), plus the COO
//! staging format all of them build from (spec §3, §4.1).

pub mod bsr;
pub mod coo;
pub mod csr;
pub mod str_matrix;

pub use bsr::{BsrMatrix, StorageManner};
pub use coo::{CooEntry, CooMatrix};
pub use csr::CsrMatrix;
pub use str_matrix::StrMatrix;
