//! Solution reporting for the branch-and-bound driver.

use simplex_core::{BasisTag, StopReason};

/// Outcome of a branch-and-bound run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MipStatus {
    /// Proven optimal integer solution.
    Optimal,

    /// Integer feasible solution in hand, optimality not proven (a limit
    /// was hit, or the search was asked to stop at the first one).
    Feasible,

    /// The relaxation itself has no feasible solution.
    Infeasible,

    /// The relaxation is feasible, but the search exhausted the tree
    /// without finding an integer assignment.
    NoIntegerFeasible,

    /// Only the root relaxation was solved, as requested.
    RelaxedOptimal,

    /// The search stopped for the given cause before finding any integer
    /// feasible solution.
    Stopped(StopReason),
}

impl MipStatus {
    /// Whether the reported values satisfy the integrality constraints.
    pub fn is_integer_feasible(self) -> bool {
        matches!(self, MipStatus::Optimal | MipStatus::Feasible)
    }
}

/// Best solution found by the search, plus accounting.
#[derive(Debug, Clone)]
pub struct MipSolution {
    pub status: MipStatus,

    /// Objective in the problem's own direction, constant included.
    pub objective: f64,

    /// Values of all variables, row variables first.
    pub values: Vec<f64>,

    /// Reduced costs at the reported basis, in the problem's own
    /// direction; zero for basic variables.
    pub reduced_costs: Vec<f64>,

    /// Basis status of every variable at the reported basis.
    pub statuses: Vec<BasisTag>,

    /// Simplex iterations spent across the whole search.
    pub iterations: u64,

    /// Subproblems solved, root included.
    pub nodes: u64,
}
