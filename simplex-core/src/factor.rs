//! Basis factorization contract and a product-form reference backend.
//!
//! The simplex engine never works with the basis matrix B directly; it only
//! needs to solve `B x = u` and `B^T x = u` and to track one column
//! replacement per pivot. This module defines that contract
//! ([`Factorization`]) together with [`ProductFormInverse`], a dense LU
//! factorization extended by a bounded product-form eta file. Any LU-style
//! backend can be substituted behind the trait.

use std::cell::RefCell;

use sprs::CsMat;
use thiserror::Error;

/// Errors reported by a factorization backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum FactorError {
    /// The basis matrix is singular or too ill-conditioned to factorize at
    /// the current pivot tolerance.
    #[error("basis matrix is singular or ill-conditioned")]
    Singular,

    /// The incremental representation can no longer absorb updates; the
    /// caller must re-decompose the basis from scratch.
    #[error("factorization update rejected; reinversion required")]
    NeedsReinversion,
}

/// An invertible representation of the current basis matrix.
///
/// `decompose` rebuilds the representation from the basic columns of the
/// expanded constraint matrix. `ftran`/`btran` solve against B and B^T in
/// place. `update` replaces one basic column after a pivot; the replacement
/// column must have been presented to `ftran` with `save = true` beforehand.
pub trait Factorization {
    /// Order of the basis matrix.
    fn order(&self) -> usize;

    /// Relative pivot threshold used by the next `decompose`.
    fn set_pivot_tolerance(&mut self, tol: f64);

    /// Rebuild the representation from scratch. Column `i` of B is the
    /// column of `mat` indexed by `basic[i]`.
    fn decompose(&mut self, mat: &CsMat<f64>, basic: &[usize]) -> Result<(), FactorError>;

    /// Solve `B x = u` in place. With `save` set, the transformed vector is
    /// retained as the incoming column for a following `update`.
    fn ftran(&mut self, u: &mut [f64], save: bool);

    /// Solve `B^T x = u` in place.
    fn btran(&self, u: &mut [f64]);

    /// Replace basic column `pivot_row` by the column saved during the last
    /// `ftran(.., true)` call.
    fn update(&mut self, pivot_row: usize) -> Result<(), FactorError>;
}

/// One elementary transformation of the product-form file.
///
/// Represents `E = I` with column `row` replaced by `col`, so that
/// `B_new = B_old * E`.
struct Eta {
    row: usize,
    col: Vec<f64>,
}

/// Dense LU factorization with partial threshold pivoting, plus a bounded
/// product-form eta file for incremental column replacements.
pub struct ProductFormInverse {
    dim: usize,
    pivot_tol: f64,
    /// Row-major dim x dim storage holding L (unit lower, below diagonal)
    /// and U (on and above diagonal) after `decompose`.
    lu: Vec<f64>,
    /// perm[i] is the original row stored in factor row i.
    perm: Vec<usize>,
    etas: Vec<Eta>,
    max_etas: usize,
    saved: Option<Vec<f64>>,
    /// Solve workspace shared by both transform directions.
    scratch: RefCell<Vec<f64>>,
    factorized: bool,
}

impl ProductFormInverse {
    /// Create a backend for basis matrices of the given order. `max_etas`
    /// bounds the eta file; exceeding it reports `NeedsReinversion`.
    pub fn new(dim: usize, max_etas: usize) -> Self {
        Self {
            dim,
            pivot_tol: 0.10,
            lu: vec![0.0; dim * dim],
            perm: (0..dim).collect(),
            etas: Vec::new(),
            max_etas,
            saved: None,
            scratch: RefCell::new(vec![0.0; dim]),
            factorized: false,
        }
    }

    fn base_ftran(&self, u: &mut [f64], v: &mut [f64]) {
        let d = self.dim;
        for i in 0..d {
            v[i] = u[self.perm[i]];
        }
        // forward substitution with unit lower L
        for i in 0..d {
            let vi = v[i];
            if vi != 0.0 {
                for r in (i + 1)..d {
                    v[r] -= self.lu[r * d + i] * vi;
                }
            }
        }
        // back substitution with U
        for i in (0..d).rev() {
            let mut t = v[i];
            for c in (i + 1)..d {
                t -= self.lu[i * d + c] * v[c];
            }
            v[i] = t / self.lu[i * d + i];
        }
        u.copy_from_slice(&v[..d]);
    }

    fn base_btran(&self, u: &mut [f64], v: &mut [f64]) {
        let d = self.dim;
        v[..d].copy_from_slice(&u[..d]);
        // solve U^T y = v (U^T is lower triangular)
        for i in 0..d {
            let mut t = v[i];
            for r in 0..i {
                t -= self.lu[r * d + i] * v[r];
            }
            v[i] = t / self.lu[i * d + i];
        }
        // solve L^T z = y (L^T is unit upper triangular)
        for i in (0..d).rev() {
            let mut t = v[i];
            for r in (i + 1)..d {
                t -= self.lu[r * d + i] * v[r];
            }
            v[i] = t;
        }
        // undo the row permutation
        for i in 0..d {
            u[self.perm[i]] = v[i];
        }
    }

    /// Apply `E^{-1}` to `u` for one eta term.
    fn apply_eta(eta: &Eta, u: &mut [f64]) {
        let p = eta.row;
        let t = u[p] / eta.col[p];
        for (i, &a) in eta.col.iter().enumerate() {
            if i != p && a != 0.0 {
                u[i] -= a * t;
            }
        }
        u[p] = t;
    }

    /// Apply `E^{-T}` to `u` for one eta term.
    fn apply_eta_transposed(eta: &Eta, u: &mut [f64]) {
        let p = eta.row;
        let mut dot = 0.0;
        for (i, &a) in eta.col.iter().enumerate() {
            if i != p {
                dot += a * u[i];
            }
        }
        u[p] = (u[p] - dot) / eta.col[p];
    }
}

impl Factorization for ProductFormInverse {
    fn order(&self) -> usize {
        self.dim
    }

    fn set_pivot_tolerance(&mut self, tol: f64) {
        self.pivot_tol = tol;
    }

    fn decompose(&mut self, mat: &CsMat<f64>, basic: &[usize]) -> Result<(), FactorError> {
        let d = self.dim;
        debug_assert_eq!(basic.len(), d);
        self.lu.iter_mut().for_each(|x| *x = 0.0);
        for (j, &k) in basic.iter().enumerate() {
            if let Some(col) = mat.outer_view(k) {
                for (i, &val) in col.iter() {
                    self.lu[i * d + j] = val;
                }
            }
        }
        for (i, p) in self.perm.iter_mut().enumerate() {
            *p = i;
        }
        self.etas.clear();
        self.saved = None;
        self.factorized = false;
        // Gaussian elimination with threshold row pivoting: among rows at or
        // below the diagonal, take the first entry within pivot_tol of the
        // column maximum. A higher tolerance forces pivots closer to the
        // column maximum.
        for k in 0..d {
            let mut best = 0.0f64;
            for r in k..d {
                best = best.max(self.lu[r * d + k].abs());
            }
            if best < 1e-15 {
                return Err(FactorError::Singular);
            }
            let threshold = self.pivot_tol.max(1e-8) * best;
            let mut pivot = k;
            for r in k..d {
                if self.lu[r * d + k].abs() >= threshold {
                    pivot = r;
                    break;
                }
            }
            if pivot != k {
                for c in 0..d {
                    self.lu.swap(k * d + c, pivot * d + c);
                }
                self.perm.swap(k, pivot);
            }
            let diag = self.lu[k * d + k];
            for r in (k + 1)..d {
                let factor = self.lu[r * d + k] / diag;
                self.lu[r * d + k] = factor;
                if factor != 0.0 {
                    for c in (k + 1)..d {
                        self.lu[r * d + c] -= factor * self.lu[k * d + c];
                    }
                }
            }
        }
        self.factorized = true;
        Ok(())
    }

    fn ftran(&mut self, u: &mut [f64], save: bool) {
        debug_assert!(self.factorized);
        {
            let mut v = self.scratch.borrow_mut();
            self.base_ftran(u, v.as_mut_slice());
        }
        for eta in &self.etas {
            Self::apply_eta(eta, u);
        }
        if save {
            self.saved = Some(u.to_vec());
        }
    }

    fn btran(&self, u: &mut [f64]) {
        debug_assert!(self.factorized);
        for eta in self.etas.iter().rev() {
            Self::apply_eta_transposed(eta, u);
        }
        let mut v = self.scratch.borrow_mut();
        self.base_btran(u, v.as_mut_slice());
    }

    fn update(&mut self, pivot_row: usize) -> Result<(), FactorError> {
        let col = match self.saved.take() {
            Some(col) => col,
            None => return Err(FactorError::NeedsReinversion),
        };
        if self.etas.len() >= self.max_etas {
            return Err(FactorError::NeedsReinversion);
        }
        if col[pivot_row].abs() < 1e-12 {
            return Err(FactorError::NeedsReinversion);
        }
        self.etas.push(Eta {
            row: pivot_row,
            col,
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sprs::TriMat;

    fn csc(rows: usize, cols: usize, entries: &[(usize, usize, f64)]) -> CsMat<f64> {
        let mut tri = TriMat::new((rows, cols));
        for &(i, j, v) in entries {
            tri.add_triplet(i, j, v);
        }
        tri.to_csc()
    }

    #[test]
    fn test_ftran_identity() {
        let mat = csc(2, 2, &[(0, 0, 1.0), (1, 1, 1.0)]);
        let mut f = ProductFormInverse::new(2, 10);
        f.decompose(&mat, &[0, 1]).unwrap();
        let mut u = vec![3.0, -2.0];
        f.ftran(&mut u, false);
        assert_eq!(u, vec![3.0, -2.0]);
        f.btran(&mut u);
        assert_eq!(u, vec![3.0, -2.0]);
    }

    #[test]
    fn test_ftran_btran_dense() {
        // B = [[2, 1], [1, 3]], det = 5
        let mat = csc(2, 2, &[(0, 0, 2.0), (1, 0, 1.0), (0, 1, 1.0), (1, 1, 3.0)]);
        let mut f = ProductFormInverse::new(2, 10);
        f.decompose(&mat, &[0, 1]).unwrap();
        // solve B x = (5, 10) -> x = (1, 3)
        let mut u = vec![5.0, 10.0];
        f.ftran(&mut u, false);
        assert!((u[0] - 1.0).abs() < 1e-12);
        assert!((u[1] - 3.0).abs() < 1e-12);
        // solve B^T x = (4, 7) -> B^T = [[2,1],[1,3]], x = (1, 2)
        let mut u = vec![4.0, 7.0];
        f.btran(&mut u);
        assert!((u[0] - 1.0).abs() < 1e-12);
        assert!((u[1] - 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_interleaved_transforms_share_workspace() {
        // B = [[2, 1], [1, 3]]; alternating solve directions must not
        // disturb each other through the shared scratch buffer
        let mat = csc(2, 2, &[(0, 0, 2.0), (1, 0, 1.0), (0, 1, 1.0), (1, 1, 3.0)]);
        let mut f = ProductFormInverse::new(2, 10);
        f.decompose(&mat, &[0, 1]).unwrap();
        for _ in 0..3 {
            let mut u = vec![5.0, 10.0];
            f.ftran(&mut u, false);
            assert!((u[0] - 1.0).abs() < 1e-12);
            assert!((u[1] - 3.0).abs() < 1e-12);
            let mut w = vec![4.0, 7.0];
            f.btran(&mut w);
            assert!((w[0] - 1.0).abs() < 1e-12);
            assert!((w[1] - 2.0).abs() < 1e-12);
        }
    }

    #[test]
    fn test_singular_matrix_rejected() {
        let mat = csc(2, 2, &[(0, 0, 1.0), (0, 1, 2.0)]);
        let mut f = ProductFormInverse::new(2, 10);
        assert_eq!(f.decompose(&mat, &[0, 1]), Err(FactorError::Singular));
    }

    #[test]
    fn test_update_tracks_column_replacement() {
        // Start from B = I, replace column 1 by (1, 2): B' = [[1,1],[0,2]]
        let mat = csc(
            2,
            3,
            &[(0, 0, 1.0), (1, 1, 1.0), (0, 2, 1.0), (1, 2, 2.0)],
        );
        let mut f = ProductFormInverse::new(2, 10);
        f.decompose(&mat, &[0, 1]).unwrap();
        let mut col = vec![1.0, 2.0];
        f.ftran(&mut col, true);
        f.update(1).unwrap();
        // B' x = (3, 4) -> x = (1, 2)
        let mut u = vec![3.0, 4.0];
        f.ftran(&mut u, false);
        assert!((u[0] - 1.0).abs() < 1e-12);
        assert!((u[1] - 2.0).abs() < 1e-12);
        // B'^T x = (1, 5) -> rows of B'^T: (1,0),(1,2); x = (1, 2)
        let mut u = vec![1.0, 5.0];
        f.btran(&mut u);
        assert!((u[0] - 1.0).abs() < 1e-12);
        assert!((u[1] - 2.0).abs() < 1e-12);
        // agreement with a fresh decomposition
        let mut g = ProductFormInverse::new(2, 10);
        g.decompose(&mat, &[0, 2]).unwrap();
        let mut w = vec![3.0, 4.0];
        g.ftran(&mut w, false);
        assert!((w[0] - 1.0).abs() < 1e-12);
        assert!((w[1] - 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_eta_file_overflow_requests_reinversion() {
        let mat = csc(1, 2, &[(0, 0, 1.0), (0, 1, 2.0)]);
        let mut f = ProductFormInverse::new(1, 1);
        f.decompose(&mat, &[0]).unwrap();
        let mut col = vec![2.0];
        f.ftran(&mut col, true);
        f.update(0).unwrap();
        let mut col = vec![2.0];
        f.ftran(&mut col, true);
        assert_eq!(f.update(0), Err(FactorError::NeedsReinversion));
    }
}
