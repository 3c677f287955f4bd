//! Projected steepest-edge reference weights.
//!
//! The primal weights `gamma_j` approximate `1 + ||a~_j||^2` for each
//! nonbasic column of the simplex table; the dual weights `delta_i`
//! approximate `1 + ||a~_i||^2` for each row. Both are maintained by
//! rank-one recurrences across pivots, floored by the cheap lower bound
//! `1 + pivot^2` to keep accumulated drift from turning them negative.
//! The `exact_*` forms recompute a single weight from scratch.

use crate::basis::Basis;

impl Basis {
    /// Seed the primal weights from the raw constraint columns, as if the
    /// basis were the unit matrix: `gamma_j = 1 + ||N_j||^2`.
    pub fn init_primal_weights(&self, gvec: &mut [f64]) {
        for (j, &k) in self.nonbasic.iter().enumerate() {
            let mut t = 1.0;
            if let Some(col) = self.matrix().outer_view(k) {
                for (_, &val) in col.iter() {
                    t += val * val;
                }
            }
            gvec[j] = t;
        }
    }

    /// Seed the dual weights from the raw constraint rows:
    /// `delta_i = 1 + sum_j N[i][j]^2` over the nonbasic columns.
    pub fn init_dual_weights(&self, dvec: &mut [f64]) {
        dvec[..self.num_rows].iter_mut().for_each(|d| *d = 1.0);
        for &k in self.nonbasic.iter() {
            if let Some(col) = self.matrix().outer_view(k) {
                for (i, &val) in col.iter() {
                    dvec[i] += val * val;
                }
            }
        }
    }

    /// Recompute one primal weight exactly from the current table column.
    pub fn exact_primal_weight(&mut self, j: usize) -> f64 {
        let mut aq = vec![0.0; self.num_rows];
        self.table_column(j, &mut aq, false);
        1.0 + aq.iter().map(|a| a * a).sum::<f64>()
    }

    /// Recompute one dual weight exactly from the current table row.
    pub fn exact_dual_weight(&self, i: usize) -> f64 {
        let mut zeta = vec![0.0; self.num_rows];
        self.inverse_row(i, &mut zeta);
        let mut ap = vec![0.0; self.num_cols];
        self.table_row(&zeta, &mut ap);
        1.0 + ap.iter().map(|a| a * a).sum::<f64>()
    }

    /// Carry the primal weights across the pivot on row `p`, column `q`.
    /// `ap` and `aq` are the pivot row and entering column of the table;
    /// call before [`Basis::pivot`], while they still describe the old
    /// basis.
    pub fn update_primal_weights(
        &self,
        p: usize,
        q: usize,
        ap: &[f64],
        aq: &[f64],
        gvec: &mut [f64],
    ) {
        let piv = aq[p];
        // the entering weight is refreshed exactly; the recurrence then
        // spreads it to the other columns
        gvec[q] = 1.0 + aq.iter().map(|a| a * a).sum::<f64>();
        let mut w = aq.to_vec();
        self.factors().btran(&mut w);
        for (j, &k) in self.nonbasic.iter().enumerate() {
            if j == q || ap[j] == 0.0 {
                continue;
            }
            let alfa = -ap[j] / piv;
            let mut t = 0.0;
            if let Some(col) = self.matrix().outer_view(k) {
                for (i, &val) in col.iter() {
                    t += val * w[i];
                }
            }
            let g = gvec[j] + alfa * alfa * gvec[q] - 2.0 * alfa * t;
            gvec[j] = g.max(1.0 + alfa * alfa);
        }
        gvec[q] /= piv * piv;
    }

    /// Carry the dual weights across the pivot on row `p`, column `q`.
    /// Call before [`Basis::pivot`].
    pub fn update_dual_weights(
        &mut self,
        p: usize,
        q: usize,
        ap: &[f64],
        aq: &[f64],
        dvec: &mut [f64],
    ) {
        let piv = ap[q];
        dvec[p] = 1.0 + ap.iter().map(|a| a * a).sum::<f64>();
        let mut w = vec![0.0; self.num_rows];
        for (j, &k) in self.nonbasic.iter().enumerate() {
            if ap[j] == 0.0 {
                continue;
            }
            if let Some(col) = self.matrix().outer_view(k) {
                for (i, &val) in col.iter() {
                    w[i] += ap[j] * val;
                }
            }
        }
        self.factors_mut().ftran(&mut w, false);
        for i in 0..self.num_rows {
            if i == p {
                continue;
            }
            let alfa = aq[i] / piv;
            if alfa == 0.0 {
                continue;
            }
            let d = dvec[i] + alfa * alfa * dvec[p] + 2.0 * alfa * w[i];
            dvec[i] = d.max(1.0 + alfa * alfa);
        }
        dvec[p] /= piv * piv;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::basis::BasisTag;
    use crate::problem::{Bounds, Direction, Problem};

    fn fixture() -> Basis {
        let p = Problem::build(
            2,
            2,
            vec![
                Bounds::upper(4.0),
                Bounds::upper(2.0),
                Bounds::lower(0.0),
                Bounds::lower(0.0),
            ],
            vec![-1.0, -1.0],
            0.0,
            Direction::Minimize,
            vec![false, false],
            &[(0, 0, 1.0), (0, 1, 1.0), (1, 0, 1.0), (1, 1, -1.0)],
        )
        .unwrap();
        Basis::new(&p).unwrap()
    }

    #[test]
    fn test_init_weights_match_exact_at_unit_basis() {
        let mut b = fixture();
        let mut gvec = vec![0.0; 2];
        let mut dvec = vec![0.0; 2];
        b.init_primal_weights(&mut gvec);
        b.init_dual_weights(&mut dvec);
        for j in 0..2 {
            assert!((gvec[j] - b.exact_primal_weight(j)).abs() < 1e-12);
        }
        for i in 0..2 {
            assert!((dvec[i] - b.exact_dual_weight(i)).abs() < 1e-12);
        }
    }

    #[test]
    fn test_primal_weights_track_exact_across_pivot() {
        let mut b = fixture();
        let mut gvec = vec![0.0; 2];
        b.init_primal_weights(&mut gvec);
        // pivot: column 0 enters on row 1
        let (p, q) = (1, 0);
        let mut aq = vec![0.0; 2];
        b.table_column(q, &mut aq, true);
        let mut zeta = vec![0.0; 2];
        b.inverse_row(p, &mut zeta);
        let mut ap = vec![0.0; 2];
        b.table_row(&zeta, &mut ap);
        b.update_primal_weights(p, q, &ap, &aq, &mut gvec);
        b.pivot(p, BasisTag::Upper, q).unwrap();
        assert!((gvec[0] - b.exact_primal_weight(0)).abs() < 1e-9);
        assert!((gvec[1] - b.exact_primal_weight(1)).abs() < 1e-9);
        // hand-checked values for this pivot
        assert!((gvec[0] - 3.0).abs() < 1e-9);
        assert!((gvec[1] - 6.0).abs() < 1e-9);
    }

    #[test]
    fn test_dual_weights_track_exact_across_pivot() {
        let mut b = fixture();
        let mut dvec = vec![0.0; 2];
        b.init_dual_weights(&mut dvec);
        let (p, q) = (1, 0);
        let mut zeta = vec![0.0; 2];
        b.inverse_row(p, &mut zeta);
        let mut ap = vec![0.0; 2];
        b.table_row(&zeta, &mut ap);
        let mut aq = vec![0.0; 2];
        b.table_column(q, &mut aq, true);
        b.update_dual_weights(p, q, &ap, &aq, &mut dvec);
        b.pivot(p, BasisTag::Upper, q).unwrap();
        assert!((dvec[0] - b.exact_dual_weight(0)).abs() < 1e-9);
        assert!((dvec[1] - b.exact_dual_weight(1)).abs() < 1e-9);
        assert!((dvec[0] - 6.0).abs() < 1e-9);
        assert!((dvec[1] - 3.0).abs() < 1e-9);
    }
}
