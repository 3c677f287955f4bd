//! Problem model: an immutable description of an LP/MILP instance.
//!
//! Variables are indexed `0..m+n`: indices `0..m` are row (auxiliary)
//! variables attached to the constraints, indices `m..m+n` are the
//! structural columns. Internally the constraints are kept in homogeneous
//! form `A~ x = 0` over the expanded matrix `A~ = (I | -A)`.

use sprs::{CsMat, TriMat};

use crate::error::{SimplexError, SimplexResult};

/// How a variable is bounded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoundKind {
    /// `-inf < x < +inf`
    Free,
    /// `lb <= x < +inf`
    LowerOnly,
    /// `-inf < x <= ub`
    UpperOnly,
    /// `lb <= x <= ub`
    DoubleBounded,
    /// `lb = x = ub`
    Fixed,
}

impl BoundKind {
    /// Whether the lower limit is meaningful for this kind.
    pub fn has_lower(self) -> bool {
        matches!(self, BoundKind::LowerOnly | BoundKind::DoubleBounded | BoundKind::Fixed)
    }

    /// Whether the upper limit is meaningful for this kind.
    pub fn has_upper(self) -> bool {
        matches!(self, BoundKind::UpperOnly | BoundKind::DoubleBounded | BoundKind::Fixed)
    }
}

/// Bound kind plus numeric limits. Limits without meaning for the kind are
/// ignored (conventionally zero).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    pub kind: BoundKind,
    pub lower: f64,
    pub upper: f64,
}

impl Bounds {
    pub fn free() -> Self {
        Self { kind: BoundKind::Free, lower: 0.0, upper: 0.0 }
    }

    pub fn lower(lb: f64) -> Self {
        Self { kind: BoundKind::LowerOnly, lower: lb, upper: 0.0 }
    }

    pub fn upper(ub: f64) -> Self {
        Self { kind: BoundKind::UpperOnly, lower: 0.0, upper: ub }
    }

    pub fn range(lb: f64, ub: f64) -> Self {
        if lb == ub {
            Self::fixed(lb)
        } else {
            Self { kind: BoundKind::DoubleBounded, lower: lb, upper: ub }
        }
    }

    pub fn fixed(val: f64) -> Self {
        Self { kind: BoundKind::Fixed, lower: val, upper: val }
    }
}

/// Optimization direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Minimize,
    Maximize,
}

/// An immutable MILP instance.
///
/// Constructed and frozen by [`Problem::build`], which validates the pieces
/// and derives the expanded constraint matrix.
#[derive(Debug, Clone)]
pub struct Problem {
    /// Number of constraints (row variables).
    pub num_rows: usize,

    /// Number of structural columns.
    pub num_cols: usize,

    /// Bounds of the row variables, then the structural columns
    /// (`num_rows + num_cols` entries).
    pub bounds: Vec<Bounds>,

    /// Objective coefficients of the structural columns.
    pub objective: Vec<f64>,

    /// Constant term of the objective.
    pub objective_constant: f64,

    pub direction: Direction,

    /// Integrality markers for the structural columns.
    pub integer: Vec<bool>,

    /// Expanded constraint matrix `(I | -A)`, CSC, `num_rows` by
    /// `num_rows + num_cols`.
    matrix: CsMat<f64>,
}

impl Problem {
    /// Validate the pieces of an instance and build the expanded matrix.
    /// `coefficients` holds `(row, col, value)` triplets of the original
    /// constraint matrix A.
    #[allow(clippy::too_many_arguments)]
    pub fn build(
        num_rows: usize,
        num_cols: usize,
        bounds: Vec<Bounds>,
        objective: Vec<f64>,
        objective_constant: f64,
        direction: Direction,
        integer: Vec<bool>,
        coefficients: &[(usize, usize, f64)],
    ) -> SimplexResult<Self> {
        let total = num_rows + num_cols;
        if bounds.len() != total {
            return Err(SimplexError::InvalidProblem(format!(
                "expected {} bound entries, got {}",
                total,
                bounds.len()
            )));
        }
        if objective.len() != num_cols {
            return Err(SimplexError::InvalidProblem(format!(
                "expected {} objective coefficients, got {}",
                num_cols,
                objective.len()
            )));
        }
        if integer.len() != num_cols {
            return Err(SimplexError::InvalidProblem(format!(
                "expected {} integrality flags, got {}",
                num_cols,
                integer.len()
            )));
        }
        for (k, b) in bounds.iter().enumerate() {
            match b.kind {
                BoundKind::DoubleBounded if b.lower > b.upper => {
                    return Err(SimplexError::InvalidProblem(format!(
                        "variable {}: lower bound {} exceeds upper bound {}",
                        k, b.lower, b.upper
                    )));
                }
                BoundKind::Fixed if b.lower != b.upper => {
                    return Err(SimplexError::InvalidProblem(format!(
                        "variable {}: fixed variable with lb {} != ub {}",
                        k, b.lower, b.upper
                    )));
                }
                _ => {}
            }
        }
        for (j, &is_int) in integer.iter().enumerate() {
            if !is_int {
                continue;
            }
            let b = &bounds[num_rows + j];
            if b.kind.has_lower() && b.lower != b.lower.floor() {
                return Err(SimplexError::InvalidProblem(format!(
                    "integer column {} has fractional lower bound {}",
                    j, b.lower
                )));
            }
            if b.kind.has_upper() && b.upper != b.upper.floor() {
                return Err(SimplexError::InvalidProblem(format!(
                    "integer column {} has fractional upper bound {}",
                    j, b.upper
                )));
            }
        }
        let mut tri = TriMat::new((num_rows, total));
        for i in 0..num_rows {
            tri.add_triplet(i, i, 1.0);
        }
        for &(i, j, val) in coefficients {
            if i >= num_rows || j >= num_cols {
                return Err(SimplexError::InvalidProblem(format!(
                    "coefficient ({}, {}) out of range",
                    i, j
                )));
            }
            if val != 0.0 {
                tri.add_triplet(i, num_rows + j, -val);
            }
        }
        Ok(Self {
            num_rows,
            num_cols,
            bounds,
            objective,
            objective_constant,
            direction,
            integer,
            matrix: tri.to_csc(),
        })
    }

    /// Total number of variables, row and structural.
    pub fn num_vars(&self) -> usize {
        self.num_rows + self.num_cols
    }

    /// The expanded constraint matrix `(I | -A)`.
    pub fn matrix(&self) -> &CsMat<f64> {
        &self.matrix
    }

    /// Whether variable `k` is an integer structural column.
    pub fn is_integer_var(&self, k: usize) -> bool {
        k >= self.num_rows && self.integer[k - self.num_rows]
    }

    /// Expanded objective in minimization sense: zero for row variables,
    /// the (sign-adjusted) column coefficients for structural ones.
    pub fn expanded_objective(&self) -> Vec<f64> {
        let sign = match self.direction {
            Direction::Minimize => 1.0,
            Direction::Maximize => -1.0,
        };
        let mut c = vec![0.0; self.num_vars()];
        for (j, &cj) in self.objective.iter().enumerate() {
            c[self.num_rows + j] = sign * cj;
        }
        c
    }

    /// Objective value for the given structural column values, in the
    /// problem's own direction.
    pub fn objective_value(&self, col_values: &[f64]) -> f64 {
        let mut sum = self.objective_constant;
        for (j, &cj) in self.objective.iter().enumerate() {
            sum += cj * col_values[j];
        }
        sum
    }
}
