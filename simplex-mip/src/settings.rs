//! Configuration of the branch-and-bound driver.

use std::time::Duration;

use simplex_core::Tolerances;

/// What the search is asked to deliver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Goal {
    /// Search until integer optimality is proven.
    #[default]
    Optimal,

    /// Stop at the first integer feasible solution.
    FirstFeasible,

    /// Solve the root relaxation only.
    RelaxedOnly,
}

/// Branching variable selection rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BranchRule {
    /// First fractional integer column.
    First,

    /// Last fractional integer column.
    Last,

    /// Driebeek-Tomlin estimates: branch on the column whose better side
    /// degrades the objective the most, and descend first into the worse
    /// side, which is the one likelier to be pruned right away.
    #[default]
    Degradation,
}

/// Which suspended node to resume after a node is fathomed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BacktrackRule {
    /// Oldest node first (breadth first).
    Fifo,

    /// Newest node first (depth first).
    Lifo,

    /// Best projection: the node whose bound, corrected by the estimated
    /// cost of repairing its fractionality, looks best.
    #[default]
    BestProjection,
}

/// Branch-and-bound settings.
#[derive(Debug, Clone)]
pub struct MipSettings {
    pub goal: Goal,
    pub branch_rule: BranchRule,
    pub backtrack_rule: BacktrackRule,

    /// Tolerances handed down to the simplex drivers.
    pub tolerances: Tolerances,

    /// Integrality tolerance: a value within this distance of an integer
    /// counts as integral.
    pub tol_int: f64,

    /// Relative tolerance used when comparing relaxation objectives
    /// against the incumbent.
    pub tol_obj: f64,

    /// Price with projected steepest edge in the subproblem solves.
    pub steepest_edge: bool,

    /// Use the Harris two-pass ratio tests in the subproblem solves.
    pub harris_ratio: bool,

    /// Zero out negligible values and reduced costs in reported solutions.
    pub round_solution: bool,

    /// Cap on total simplex iterations across the whole search.
    pub iteration_limit: Option<u64>,

    /// Wall-clock limit for the whole search.
    pub time_limit: Option<Duration>,
}

impl Default for MipSettings {
    fn default() -> Self {
        Self {
            goal: Goal::default(),
            branch_rule: BranchRule::default(),
            backtrack_rule: BacktrackRule::default(),
            tolerances: Tolerances::default(),
            tol_int: 1e-5,
            tol_obj: 1e-7,
            steepest_edge: true,
            harris_ratio: true,
            round_solution: true,
            iteration_limit: None,
            time_limit: None,
        }
    }
}

impl MipSettings {
    pub fn with_goal(mut self, goal: Goal) -> Self {
        self.goal = goal;
        self
    }

    pub fn with_branch_rule(mut self, rule: BranchRule) -> Self {
        self.branch_rule = rule;
        self
    }

    pub fn with_backtrack_rule(mut self, rule: BacktrackRule) -> Self {
        self.backtrack_rule = rule;
        self
    }

    pub fn with_iteration_limit(mut self, limit: u64) -> Self {
        self.iteration_limit = Some(limit);
        self
    }

    pub fn with_time_limit(mut self, limit: Duration) -> Self {
        self.time_limit = Some(limit);
        self
    }
}
