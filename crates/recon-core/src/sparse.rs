//! COO sparse matrices for operator assembly.
//!
//! Operators are assembled, composed and sliced as triplet lists and only
//! converted to a compressed column layout at factorization time via
//! [`CooMat::to_faer`]. Duplicate coordinates are additive throughout, so
//! `add` is triplet concatenation and `compress` merges duplicates.

use crate::geometry::{IndexMap, Real};
use faer::sparse::SparseColMat;
use nalgebra::DVector;
use std::collections::HashMap;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SparseError {
    #[error("triplet ({row}, {col}) outside a {nrows}x{ncols} matrix")]
    TripletOutOfBounds {
        row: usize,
        col: usize,
        nrows: usize,
        ncols: usize,
    },
    #[error("dimension mismatch: left is {left_rows}x{left_cols}, right is {right_rows}x{right_cols}")]
    DimensionMismatch {
        left_rows: usize,
        left_cols: usize,
        right_rows: usize,
        right_cols: usize,
    },
    #[error("compressed sparse construction failed for a {nrows}x{ncols} matrix")]
    Construction { nrows: usize, ncols: usize },
}

/// Sparse matrix in coordinate (triplet) form.
#[derive(Debug, Clone, PartialEq)]
pub struct CooMat {
    nrows: usize,
    ncols: usize,
    triplets: Vec<(usize, usize, Real)>,
}

impl CooMat {
    /// Empty matrix with the given shape.
    pub fn zeros(nrows: usize, ncols: usize) -> Self {
        Self {
            nrows,
            ncols,
            triplets: Vec::new(),
        }
    }

    /// Square identity.
    pub fn identity(n: usize) -> Self {
        Self {
            nrows: n,
            ncols: n,
            triplets: (0..n).map(|i| (i, i, 1.0)).collect(),
        }
    }

    /// Build from triplets, validating coordinates against the shape.
    pub fn from_triplets(
        nrows: usize,
        ncols: usize,
        triplets: Vec<(usize, usize, Real)>,
    ) -> Result<Self, SparseError> {
        for &(row, col, _) in &triplets {
            if row >= nrows || col >= ncols {
                return Err(SparseError::TripletOutOfBounds {
                    row,
                    col,
                    nrows,
                    ncols,
                });
            }
        }
        Ok(Self {
            nrows,
            ncols,
            triplets,
        })
    }

    /// Append one entry. Coordinates must be in bounds.
    pub fn push(&mut self, row: usize, col: usize, value: Real) {
        debug_assert!(row < self.nrows && col < self.ncols);
        self.triplets.push((row, col, value));
    }

    pub fn nrows(&self) -> usize {
        self.nrows
    }

    pub fn ncols(&self) -> usize {
        self.ncols
    }

    pub fn nnz(&self) -> usize {
        self.triplets.len()
    }

    pub fn triplets(&self) -> &[(usize, usize, Real)] {
        &self.triplets
    }

    pub fn transpose(&self) -> CooMat {
        CooMat {
            nrows: self.ncols,
            ncols: self.nrows,
            triplets: self
                .triplets
                .iter()
                .map(|&(r, c, v)| (c, r, v))
                .collect(),
        }
    }

    /// Multiply every entry by `factor`.
    pub fn scaled(&self, factor: Real) -> CooMat {
        CooMat {
            nrows: self.nrows,
            ncols: self.ncols,
            triplets: self
                .triplets
                .iter()
                .map(|&(r, c, v)| (r, c, v * factor))
                .collect(),
        }
    }

    /// `y = A x`. The vector length must match `ncols`.
    pub fn matvec(&self, x: &DVector<Real>) -> DVector<Real> {
        assert_eq!(x.len(), self.ncols, "matvec dimension mismatch");
        let mut y = DVector::zeros(self.nrows);
        for &(r, c, v) in &self.triplets {
            y[r] += v * x[c];
        }
        y
    }

    /// `x = A^T y`. The vector length must match `nrows`.
    pub fn transpose_matvec(&self, y: &DVector<Real>) -> DVector<Real> {
        assert_eq!(y.len(), self.nrows, "transpose_matvec dimension mismatch");
        let mut x = DVector::zeros(self.ncols);
        for &(r, c, v) in &self.triplets {
            x[c] += v * y[r];
        }
        x
    }

    /// Sparse product `A B`.
    pub fn matmul(&self, rhs: &CooMat) -> Result<CooMat, SparseError> {
        if self.ncols != rhs.nrows {
            return Err(SparseError::DimensionMismatch {
                left_rows: self.nrows,
                left_cols: self.ncols,
                right_rows: rhs.nrows,
                right_cols: rhs.ncols,
            });
        }

        // Index rhs by row so each left entry walks one short list.
        let mut rhs_rows: Vec<Vec<(usize, Real)>> = vec![Vec::new(); rhs.nrows];
        for &(r, c, v) in &rhs.triplets {
            rhs_rows[r].push((c, v));
        }

        let mut acc: HashMap<(usize, usize), Real> = HashMap::new();
        for &(r, k, v) in &self.triplets {
            for &(c, w) in &rhs_rows[k] {
                *acc.entry((r, c)).or_insert(0.0) += v * w;
            }
        }

        let mut triplets: Vec<(usize, usize, Real)> = acc
            .into_iter()
            .map(|((r, c), v)| (r, c, v))
            .filter(|&(_, _, v)| v != 0.0)
            .collect();
        triplets.sort_unstable_by_key(|&(r, c, _)| (c, r));

        Ok(CooMat {
            nrows: self.nrows,
            ncols: rhs.ncols,
            triplets,
        })
    }

    /// Gram matrix `A^T A`, assembled row-by-row without forming `A^T`.
    pub fn gram(&self) -> CooMat {
        let mut rows: Vec<Vec<(usize, Real)>> = vec![Vec::new(); self.nrows];
        for &(r, c, v) in &self.triplets {
            rows[r].push((c, v));
        }

        let mut acc: HashMap<(usize, usize), Real> = HashMap::new();
        for entries in &rows {
            for &(ci, vi) in entries {
                for &(cj, vj) in entries {
                    *acc.entry((ci, cj)).or_insert(0.0) += vi * vj;
                }
            }
        }

        let mut triplets: Vec<(usize, usize, Real)> = acc
            .into_iter()
            .map(|((r, c), v)| (r, c, v))
            .filter(|&(_, _, v)| v != 0.0)
            .collect();
        triplets.sort_unstable_by_key(|&(r, c, _)| (c, r));

        CooMat {
            nrows: self.ncols,
            ncols: self.ncols,
            triplets,
        }
    }

    /// Entrywise sum. Shapes must match; triplets are concatenated since
    /// duplicates are additive.
    pub fn add(&self, other: &CooMat) -> Result<CooMat, SparseError> {
        if self.nrows != other.nrows || self.ncols != other.ncols {
            return Err(SparseError::DimensionMismatch {
                left_rows: self.nrows,
                left_cols: self.ncols,
                right_rows: other.nrows,
                right_cols: other.ncols,
            });
        }
        let mut triplets = self.triplets.clone();
        triplets.extend_from_slice(&other.triplets);
        Ok(CooMat {
            nrows: self.nrows,
            ncols: self.ncols,
            triplets,
        })
    }

    /// Slice down to the rows and columns present in the index maps,
    /// remapping coordinates to local indices. Entries whose row or column
    /// is absent from the corresponding map are dropped.
    pub fn select(&self, rows: &IndexMap, cols: &IndexMap) -> CooMat {
        let mut triplets = Vec::new();
        for &(r, c, v) in &self.triplets {
            if let (Some(lr), Some(lc)) = (rows.to_local(r), cols.to_local(c)) {
                triplets.push((lr, lc, v));
            }
        }
        CooMat {
            nrows: rows.len(),
            ncols: cols.len(),
            triplets,
        }
    }

    /// Merge duplicate coordinates, summing their values and dropping exact
    /// zeros.
    pub fn compress(&mut self) {
        self.triplets.sort_unstable_by_key(|&(r, c, _)| (c, r));
        let mut merged: Vec<(usize, usize, Real)> = Vec::with_capacity(self.triplets.len());
        for &(r, c, v) in &self.triplets {
            match merged.last_mut() {
                Some(last) if last.0 == r && last.1 == c => last.2 += v,
                _ => merged.push((r, c, v)),
            }
        }
        merged.retain(|&(_, _, v)| v != 0.0);
        self.triplets = merged;
    }

    /// Convert to faer's compressed column layout for factorization.
    pub fn to_faer(&self) -> Result<SparseColMat<usize, f64>, SparseError> {
        let mut dedup = self.clone();
        dedup.compress();
        SparseColMat::try_new_from_triplets(self.nrows, self.ncols, &dedup.triplets).map_err(
            |_| SparseError::Construction {
                nrows: self.nrows,
                ncols: self.ncols,
            },
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dense(m: &CooMat) -> Vec<Vec<Real>> {
        let mut d = vec![vec![0.0; m.ncols()]; m.nrows()];
        for &(r, c, v) in m.triplets() {
            d[r][c] += v;
        }
        d
    }

    #[test]
    fn matvec_and_transpose_agree_with_dense() {
        let a = CooMat::from_triplets(2, 3, vec![(0, 0, 1.0), (0, 2, 2.0), (1, 1, -3.0)]).unwrap();
        let x = DVector::from_vec(vec![1.0, 2.0, 3.0]);
        let y = a.matvec(&x);
        assert_eq!(y.as_slice(), &[7.0, -6.0]);

        let yt = DVector::from_vec(vec![1.0, 1.0]);
        let xt = a.transpose_matvec(&yt);
        assert_eq!(xt.as_slice(), &[1.0, -3.0, 2.0]);
    }

    #[test]
    fn matmul_matches_dense_product() {
        let a = CooMat::from_triplets(2, 2, vec![(0, 0, 1.0), (0, 1, 2.0), (1, 1, 3.0)]).unwrap();
        let b = CooMat::from_triplets(2, 2, vec![(0, 0, 4.0), (1, 0, 5.0), (1, 1, 6.0)]).unwrap();
        let c = a.matmul(&b).unwrap();
        let d = dense(&c);
        assert_eq!(d[0][0], 14.0);
        assert_eq!(d[0][1], 12.0);
        assert_eq!(d[1][0], 15.0);
        assert_eq!(d[1][1], 18.0);
    }

    #[test]
    fn matmul_rejects_mismatched_shapes() {
        let a = CooMat::zeros(2, 3);
        let b = CooMat::zeros(2, 2);
        assert!(matches!(
            a.matmul(&b),
            Err(SparseError::DimensionMismatch { .. })
        ));
    }

    #[test]
    fn gram_is_symmetric_and_correct() {
        let a = CooMat::from_triplets(3, 2, vec![(0, 0, 1.0), (1, 0, 2.0), (1, 1, 1.0), (2, 1, 3.0)])
            .unwrap();
        let g = a.gram();
        let d = dense(&g);
        assert_eq!(d[0][0], 5.0);
        assert_eq!(d[0][1], 2.0);
        assert_eq!(d[1][0], 2.0);
        assert_eq!(d[1][1], 10.0);
    }

    #[test]
    fn select_remaps_and_drops() {
        let a = CooMat::from_triplets(
            3,
            3,
            vec![(0, 0, 1.0), (1, 1, 2.0), (2, 2, 3.0), (1, 2, 4.0)],
        )
        .unwrap();
        let rows = IndexMap::from_globals(vec![1, 2]);
        let cols = IndexMap::from_globals(vec![1, 2]);
        let s = a.select(&rows, &cols);
        assert_eq!(s.nrows(), 2);
        assert_eq!(s.ncols(), 2);
        let d = dense(&s);
        assert_eq!(d[0][0], 2.0);
        assert_eq!(d[0][1], 4.0);
        assert_eq!(d[1][1], 3.0);
        assert_eq!(d[1][0], 0.0);
    }

    #[test]
    fn compress_merges_duplicates() {
        let mut a =
            CooMat::from_triplets(2, 2, vec![(0, 0, 1.0), (0, 0, 2.0), (1, 1, -1.0), (1, 1, 1.0)])
                .unwrap();
        a.compress();
        assert_eq!(a.nnz(), 1);
        assert_eq!(a.triplets()[0], (0, 0, 3.0));
    }

    #[test]
    fn out_of_bounds_triplets_are_rejected() {
        assert!(matches!(
            CooMat::from_triplets(2, 2, vec![(2, 0, 1.0)]),
            Err(SparseError::TripletOutOfBounds { .. })
        ));
    }
}
