//! Evaluation kernels shared by the simplex drivers.
//!
//! Everything here is expressed against the expanded system `A~ x = 0` with
//! `A~ = (I | -A)`: basic values come from `beta = inv(B) * (-N xN)`,
//! multipliers from `pi = inv(B^T) c_B`, and the simplex table is
//! `-inv(B) N` (columns) or `-N^T zeta` (rows).

use crate::basis::{Basis, BasisTag, Position};

/// Classification of a computed value against a reference value under a
/// relative tolerance: `eps = tol * max(1, |reference|)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Residual {
    /// Below the reference by more than `eps`.
    WellBelow,
    /// Below the reference within `eps`.
    Below,
    Equal,
    /// Above the reference within `eps`.
    Above,
    /// Above the reference by more than `eps`.
    WellAbove,
}

/// Compare `x` against the reference `x0` under the relative tolerance
/// `tol`.
pub fn compare_rel(x: f64, x0: f64, tol: f64) -> Residual {
    let eps = tol * x0.abs().max(1.0);
    if x < x0 {
        if x < x0 - eps {
            Residual::WellBelow
        } else {
            Residual::Below
        }
    } else if x > x0 {
        if x > x0 + eps {
            Residual::WellAbove
        } else {
            Residual::Above
        }
    } else {
        Residual::Equal
    }
}

impl Basis {
    /// Compute the values of the basic variables,
    /// `beta = inv(B) * (-N xN)`, into `bbar`.
    pub fn eval_basics(&mut self, bbar: &mut [f64]) {
        let m = self.num_rows;
        bbar[..m].iter_mut().for_each(|x| *x = 0.0);
        for j in 0..self.num_cols {
            let xj = self.nonbasic_value(j);
            if xj == 0.0 {
                continue;
            }
            let k = self.nonbasic[j];
            if let Some(col) = self.matrix().outer_view(k) {
                for (i, &val) in col.iter() {
                    bbar[i] -= val * xj;
                }
            }
        }
        self.factors_mut().ftran(bbar, false);
    }

    /// Compute the simplex multipliers `pi = inv(B^T) c_B` into `pi`.
    pub fn eval_multipliers(&self, c: &[f64], pi: &mut [f64]) {
        for (i, &k) in self.basic.iter().enumerate() {
            pi[i] = c[k];
        }
        self.factors().btran(pi);
    }

    /// Compute the reduced costs `d_j = c_k - pi . N_j` of the nonbasic
    /// variables into `cbar`.
    pub fn eval_reduced_costs(&self, c: &[f64], pi: &[f64], cbar: &mut [f64]) {
        for (j, &k) in self.nonbasic.iter().enumerate() {
            let mut d = c[k];
            if let Some(col) = self.matrix().outer_view(k) {
                for (i, &val) in col.iter() {
                    d -= pi[i] * val;
                }
            }
            cbar[j] = d;
        }
    }

    /// Compute column `j` of the simplex table, `-inv(B) N_j`, into `out`.
    /// With `save` set, the factorization retains the transformed column
    /// for the next update (use when `j` is the chosen entering column).
    pub fn table_column(&mut self, j: usize, out: &mut [f64], save: bool) {
        let m = self.num_rows;
        let k = self.nonbasic[j];
        out[..m].iter_mut().for_each(|x| *x = 0.0);
        if let Some(col) = self.matrix().outer_view(k) {
            for (i, &val) in col.iter() {
                out[i] = val;
            }
        }
        self.factors_mut().ftran(out, save);
        out[..m].iter_mut().for_each(|x| *x = -*x);
    }

    /// Compute row `i` of the inverse, `zeta = inv(B^T) e_i`, into `zeta`.
    pub fn inverse_row(&self, i: usize, zeta: &mut [f64]) {
        zeta[..self.num_rows].iter_mut().for_each(|x| *x = 0.0);
        zeta[i] = 1.0;
        self.factors().btran(zeta);
    }

    /// Compute a row of the simplex table, `a~_i = -N^T zeta`, into `out`
    /// from the corresponding row of the inverse.
    pub fn table_row(&self, zeta: &[f64], out: &mut [f64]) {
        for (j, &k) in self.nonbasic.iter().enumerate() {
            let mut sum = 0.0;
            if let Some(col) = self.matrix().outer_view(k) {
                for (i, &val) in col.iter() {
                    sum -= val * zeta[i];
                }
            }
            out[j] = sum;
        }
    }

    /// Whether the basic values satisfy their working bounds under `tol`.
    pub fn primal_feasible(&self, bbar: &[f64], tol: f64) -> bool {
        for (i, &k) in self.basic.iter().enumerate() {
            if self.kind[k].has_lower()
                && compare_rel(bbar[i], self.lower[k], tol) < Residual::Below
            {
                return false;
            }
            if self.kind[k].has_upper()
                && compare_rel(bbar[i], self.upper[k], tol) > Residual::Above
            {
                return false;
            }
        }
        true
    }

    /// Whether the reduced costs satisfy dual feasibility under `tol`:
    /// no nonbasic variable that is allowed to move could improve the
    /// objective.
    pub fn dual_feasible(&self, c: &[f64], cbar: &[f64], tol: f64) -> bool {
        for (j, &k) in self.nonbasic.iter().enumerate() {
            let r = compare_rel(cbar[j] + c[k], c[k], tol);
            match self.tag[j] {
                BasisTag::Free => {
                    if r < Residual::Below || r > Residual::Above {
                        return false;
                    }
                }
                BasisTag::Lower => {
                    if r < Residual::Below {
                        return false;
                    }
                }
                BasisTag::Upper => {
                    if r > Residual::Above {
                        return false;
                    }
                }
                BasisTag::Fixed => {}
                BasisTag::Basic => unreachable!(),
            }
        }
        true
    }

    /// Current value of any variable, given the basic values.
    pub fn value_of(&self, k: usize, bbar: &[f64]) -> f64 {
        match self.position[k] {
            Position::Basic(i) => bbar[i],
            Position::Nonbasic(j) => self.nonbasic_value(j),
        }
    }

    /// Value of the linear form `c . x` at the current basic solution.
    pub fn eval_objective(&self, c: &[f64], bbar: &[f64]) -> f64 {
        let mut obj = 0.0;
        for (i, &k) in self.basic.iter().enumerate() {
            obj += c[k] * bbar[i];
        }
        for (j, &k) in self.nonbasic.iter().enumerate() {
            obj += c[k] * self.nonbasic_value(j);
        }
        obj
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::problem::{Bounds, Direction, Problem};

    #[test]
    fn test_compare_rel_classes() {
        assert_eq!(compare_rel(0.0, 0.0, 1e-6), Residual::Equal);
        assert_eq!(compare_rel(1.0 + 5e-7, 1.0, 1e-6), Residual::Above);
        assert_eq!(compare_rel(1.0 + 5e-6, 1.0, 1e-6), Residual::WellAbove);
        assert_eq!(compare_rel(1.0 - 5e-7, 1.0, 1e-6), Residual::Below);
        assert_eq!(compare_rel(1.0 - 5e-6, 1.0, 1e-6), Residual::WellBelow);
        // reference scaling: eps = tol * max(1, |x0|)
        assert_eq!(compare_rel(1000.0 + 5e-4, 1000.0, 1e-6), Residual::Above);
    }

    fn basis_fixture() -> (Problem, Basis) {
        // rows: x0 (<= 4), x1 (<= 2); cols: x2, x3 >= 0
        // x0 = x2 + x3, x1 = x2 - x3
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
        let b = Basis::new(&p).unwrap();
        (p, b)
    }

    #[test]
    fn test_eval_basics_at_origin() {
        let (_p, mut b) = basis_fixture();
        let mut bbar = vec![0.0; 2];
        b.eval_basics(&mut bbar);
        assert_eq!(bbar, vec![0.0, 0.0]);
        assert!(b.primal_feasible(&bbar, 1e-7));
    }

    #[test]
    fn test_reduced_costs_with_identity_basis() {
        let (p, mut b) = basis_fixture();
        let c = p.expanded_objective();
        let mut pi = vec![0.0; 2];
        let mut cbar = vec![0.0; 2];
        b.eval_multipliers(&c, &mut pi);
        b.eval_reduced_costs(&c, &pi, &mut cbar);
        // basic objective coefficients are zero, so pi = 0 and the reduced
        // costs are the raw objective coefficients
        assert_eq!(pi, vec![0.0, 0.0]);
        assert_eq!(cbar, vec![-1.0, -1.0]);
        assert!(!b.dual_feasible(&c, &cbar, 1e-7));
        let mut aq = vec![0.0; 2];
        b.table_column(0, &mut aq, false);
        // -inv(I) * N_0 where N_0 = (-1, -1) from the expanded matrix
        assert_eq!(aq, vec![1.0, 1.0]);
    }

    #[test]
    fn test_table_row_matches_column(){
        let (_p, mut b) = basis_fixture();
        let mut zeta = vec![0.0; 2];
        b.inverse_row(0, &mut zeta);
        let mut row = vec![0.0; 2];
        b.table_row(&zeta, &mut row);
        let mut col0 = vec![0.0; 2];
        let mut col1 = vec![0.0; 2];
        b.table_column(0, &mut col0, false);
        b.table_column(1, &mut col1, false);
        assert!((row[0] - col0[0]).abs() < 1e-12);
        assert!((row[1] - col1[0]).abs() < 1e-12);
    }
}
