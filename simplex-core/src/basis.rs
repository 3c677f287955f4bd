//! Basis context: the mutable per-search state of the simplex engine.
//!
//! Holds a working copy of the variable bounds (branch-and-bound tightens
//! them per subproblem), the basic/nonbasic partition, and the handle to the
//! factorization backend. The partition is a bijection: every variable is
//! either basic at some row position or nonbasic at some column position
//! with a status tag.

use sprs::CsMat;

use crate::error::{SimplexError, SimplexResult};
use crate::factor::{FactorError, Factorization, ProductFormInverse};
use crate::problem::{BoundKind, Bounds, Problem};

/// Pivot tolerances tried in turn when a decomposition fails.
const PIVOT_LADDER: [f64; 3] = [0.10, 0.30, 0.70];

/// Status of a variable relative to the current basis.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BasisTag {
    /// In the basis.
    Basic,
    /// Nonbasic at its lower bound.
    Lower,
    /// Nonbasic at its upper bound.
    Upper,
    /// Nonbasic free (held at zero).
    Free,
    /// Nonbasic fixed.
    Fixed,
}

/// Where a variable currently sits in the partition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Position {
    /// Basic at row position `i`.
    Basic(usize),
    /// Nonbasic at column position `j`.
    Nonbasic(usize),
}

/// The leaving side of a primal ratio test.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Leaving {
    /// No basic variable blocks the entering one.
    Unbounded,
    /// The entering double-bounded variable travels to its opposite bound;
    /// the basis itself does not change.
    BoundFlip,
    /// Basic variable at row `row` leaves, driven onto the bound `tag`.
    Basic { row: usize, tag: BasisTag },
}

/// Mutable simplex state over one [`Problem`].
pub struct Basis {
    pub num_rows: usize,
    pub num_cols: usize,

    /// Working bound kinds, per variable (diverge from the problem during
    /// search).
    pub kind: Vec<BoundKind>,
    pub lower: Vec<f64>,
    pub upper: Vec<f64>,

    /// Partition position per variable.
    pub position: Vec<Position>,
    /// Variable at each basic row position.
    pub basic: Vec<usize>,
    /// Variable at each nonbasic column position.
    pub nonbasic: Vec<usize>,
    /// Status tag of each nonbasic position (never `Basic`).
    pub tag: Vec<BasisTag>,

    /// Simplex iterations performed through this context.
    pub iterations: u64,

    matrix: CsMat<f64>,
    factors: Box<dyn Factorization>,
}

impl Basis {
    /// Build the standard initial basis for a problem: all row variables
    /// basic (so B = I), all structural columns nonbasic at their natural
    /// bound. The default product-form backend is installed.
    pub fn new(problem: &Problem) -> SimplexResult<Self> {
        let factors = Box::new(ProductFormInverse::new(problem.num_rows, 100));
        Self::with_factorization(problem, factors)
    }

    /// Like [`Basis::new`] but with a caller-supplied factorization backend.
    pub fn with_factorization(
        problem: &Problem,
        factors: Box<dyn Factorization>,
    ) -> SimplexResult<Self> {
        let m = problem.num_rows;
        let n = problem.num_cols;
        if factors.order() != m {
            return Err(SimplexError::InvalidBasis(format!(
                "factorization order {} does not match row count {}",
                factors.order(),
                m
            )));
        }
        let mut basis = Self {
            num_rows: m,
            num_cols: n,
            kind: problem.bounds.iter().map(|b| b.kind).collect(),
            lower: problem.bounds.iter().map(|b| b.lower).collect(),
            upper: problem.bounds.iter().map(|b| b.upper).collect(),
            position: Vec::new(),
            basic: Vec::new(),
            nonbasic: Vec::new(),
            tag: Vec::new(),
            iterations: 0,
            matrix: problem.matrix().clone(),
            factors,
        };
        let tags: Vec<BasisTag> = (0..m + n)
            .map(|k| {
                if k < m {
                    BasisTag::Basic
                } else {
                    natural_tag(basis.kind[k])
                }
            })
            .collect();
        basis.set_statuses(&tags)?;
        basis.reinvert().map_err(SimplexError::BasisUnusable)?;
        Ok(basis)
    }

    /// Restore the working bounds to those of the problem.
    pub fn reset_bounds(&mut self, problem: &Problem) {
        for (k, b) in problem.bounds.iter().enumerate() {
            self.kind[k] = b.kind;
            self.lower[k] = b.lower;
            self.upper[k] = b.upper;
        }
    }

    /// Working bounds of variable `k`.
    pub fn bounds_of(&self, k: usize) -> Bounds {
        Bounds {
            kind: self.kind[k],
            lower: self.lower[k],
            upper: self.upper[k],
        }
    }

    /// The expanded constraint matrix.
    pub fn matrix(&self) -> &CsMat<f64> {
        &self.matrix
    }

    pub(crate) fn factors_mut(&mut self) -> &mut dyn Factorization {
        self.factors.as_mut()
    }

    pub(crate) fn factors(&self) -> &dyn Factorization {
        self.factors.as_ref()
    }

    /// Rebuild the partition from a full status-tag vector (one entry per
    /// variable). The number of `Basic` tags must equal the row count.
    pub fn set_statuses(&mut self, tags: &[BasisTag]) -> SimplexResult<()> {
        let m = self.num_rows;
        let n = self.num_cols;
        if tags.len() != m + n {
            return Err(SimplexError::InvalidBasis(format!(
                "expected {} status tags, got {}",
                m + n,
                tags.len()
            )));
        }
        let mut basic = Vec::with_capacity(m);
        let mut nonbasic = Vec::with_capacity(n);
        let mut tag = Vec::with_capacity(n);
        for (k, &t) in tags.iter().enumerate() {
            match t {
                BasisTag::Basic => basic.push(k),
                other => {
                    nonbasic.push(k);
                    tag.push(other);
                }
            }
        }
        if basic.len() != m {
            return Err(SimplexError::InvalidBasis(format!(
                "{} basic variables for {} rows",
                basic.len(),
                m
            )));
        }
        let mut position = vec![Position::Basic(0); m + n];
        for (i, &k) in basic.iter().enumerate() {
            position[k] = Position::Basic(i);
        }
        for (j, &k) in nonbasic.iter().enumerate() {
            position[k] = Position::Nonbasic(j);
        }
        self.position = position;
        self.basic = basic;
        self.nonbasic = nonbasic;
        self.tag = tag;
        Ok(())
    }

    /// Full status-tag vector for the current partition.
    pub fn statuses(&self) -> Vec<BasisTag> {
        let mut tags = vec![BasisTag::Basic; self.num_rows + self.num_cols];
        for (j, &k) in self.nonbasic.iter().enumerate() {
            tags[k] = self.tag[j];
        }
        tags
    }

    /// Value of the nonbasic variable at column position `j`.
    pub fn nonbasic_value(&self, j: usize) -> f64 {
        let k = self.nonbasic[j];
        match self.tag[j] {
            BasisTag::Lower | BasisTag::Fixed => self.lower[k],
            BasisTag::Upper => self.upper[k],
            BasisTag::Free => 0.0,
            BasisTag::Basic => unreachable!("nonbasic position holds a basic tag"),
        }
    }

    /// Rebuild the factorization, widening the pivot tolerance until it
    /// succeeds or the ladder is exhausted.
    pub fn reinvert(&mut self) -> Result<(), FactorError> {
        let mut last = FactorError::Singular;
        for &tol in PIVOT_LADDER.iter() {
            self.factors.set_pivot_tolerance(tol);
            match self.factors.decompose(&self.matrix, &self.basic) {
                Ok(()) => return Ok(()),
                Err(err) => last = err,
            }
        }
        Err(last)
    }

    /// Flip the nonbasic double-bounded variable at column position `q`
    /// to its opposite bound. Counts as one simplex iteration.
    pub fn flip_bound(&mut self, q: usize) {
        debug_assert_eq!(self.kind[self.nonbasic[q]], BoundKind::DoubleBounded);
        self.tag[q] = match self.tag[q] {
            BasisTag::Lower => BasisTag::Upper,
            BasisTag::Upper => BasisTag::Lower,
            other => unreachable!("bound flip of a {:?} variable", other),
        };
        self.iterations += 1;
    }

    /// Commit a pivot: the variable at nonbasic position `q` enters the
    /// basis at row `p`; the leaving variable becomes nonbasic with the
    /// given tag. The factorization is updated incrementally, falling back
    /// to a fresh decomposition if the update is rejected. Counts as one
    /// simplex iteration.
    ///
    /// The entering column must have been computed through
    /// [`Basis::table_column`](crate::kernels) with `save` set.
    pub fn pivot(&mut self, p: usize, tag: BasisTag, q: usize) -> Result<(), FactorError> {
        debug_assert!(tag != BasisTag::Basic);
        let leaving = self.basic[p];
        let entering = self.nonbasic[q];
        self.position[entering] = Position::Basic(p);
        self.position[leaving] = Position::Nonbasic(q);
        self.basic[p] = entering;
        self.nonbasic[q] = leaving;
        self.tag[q] = tag;
        let result = match self.factors.update(p) {
            Ok(()) => Ok(()),
            Err(_) => self.reinvert(),
        };
        self.iterations += 1;
        result
    }
}

/// Tag a nonbasic variable naturally carries for its bound kind.
pub fn natural_tag(kind: BoundKind) -> BasisTag {
    match kind {
        BoundKind::Free => BasisTag::Free,
        BoundKind::LowerOnly | BoundKind::DoubleBounded => BasisTag::Lower,
        BoundKind::UpperOnly => BasisTag::Upper,
        BoundKind::Fixed => BasisTag::Fixed,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::problem::Direction;

    fn small_problem() -> Problem {
        Problem::build(
            1,
            2,
            vec![Bounds::upper(3.0), Bounds::lower(0.0), Bounds::range(0.0, 2.0)],
            vec![1.0, 2.0],
            0.0,
            Direction::Minimize,
            vec![false, false],
            &[(0, 0, 1.0), (0, 1, 1.0)],
        )
        .unwrap()
    }

    #[test]
    fn test_initial_partition() {
        let p = small_problem();
        let b = Basis::new(&p).unwrap();
        assert_eq!(b.basic, vec![0]);
        assert_eq!(b.nonbasic, vec![1, 2]);
        assert_eq!(b.tag, vec![BasisTag::Lower, BasisTag::Lower]);
        assert_eq!(b.position[0], Position::Basic(0));
        assert_eq!(b.position[2], Position::Nonbasic(1));
    }

    #[test]
    fn test_statuses_round_trip() {
        let p = small_problem();
        let mut b = Basis::new(&p).unwrap();
        let tags = vec![BasisTag::Upper, BasisTag::Basic, BasisTag::Lower];
        b.set_statuses(&tags).unwrap();
        assert_eq!(b.statuses(), tags);
        assert_eq!(b.basic, vec![1]);
        assert_eq!(b.nonbasic, vec![0, 2]);
    }

    #[test]
    fn test_wrong_basic_count_rejected() {
        let p = small_problem();
        let mut b = Basis::new(&p).unwrap();
        let tags = vec![BasisTag::Basic, BasisTag::Basic, BasisTag::Lower];
        assert!(b.set_statuses(&tags).is_err());
    }

    #[test]
    fn test_bound_flip() {
        let p = small_problem();
        let mut b = Basis::new(&p).unwrap();
        assert_eq!(b.tag[1], BasisTag::Lower);
        b.flip_bound(1);
        assert_eq!(b.tag[1], BasisTag::Upper);
        assert_eq!(b.nonbasic_value(1), 2.0);
        assert_eq!(b.iterations, 1);
    }
}
