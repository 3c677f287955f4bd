//! Branch-and-bound layer for mixed-integer linear programs.
//!
//! Subproblems are solved with the dual simplex method from `simplex-core`,
//! warm-started from the parent basis on descent and rebuilt by replaying
//! branching bounds and basis diffs along the root path on backtracking.
//! Branching rules: first/last fractional column, or Driebeek-Tomlin
//! degradation estimates. Backtracking: FIFO, LIFO, or best projection.
//!
//! # Example
//!
//! ```ignore
//! use simplex_core::{Bounds, Direction, Problem};
//! use simplex_mip::{solve_mip, MipSettings};
//!
//! // a small knapsack: max 10a + 7b, 4a + 3b <= 10, a, b in {0..2}
//! let problem = Problem::build(
//!     1,
//!     2,
//!     vec![Bounds::upper(10.0), Bounds::range(0.0, 2.0), Bounds::range(0.0, 2.0)],
//!     vec![10.0, 7.0],
//!     0.0,
//!     Direction::Maximize,
//!     vec![true, true],
//!     &[(0, 0, 4.0), (0, 1, 3.0)],
//! )?;
//! let solution = solve_mip(&problem, &MipSettings::default())?;
//! println!("objective: {}", solution.objective);
//! ```

#![allow(missing_docs)]
#![warn(clippy::all)]

pub mod driver;
pub mod error;
pub mod search;
pub mod settings;
pub mod solution;

pub use driver::BranchAndBound;
pub use error::{MipError, MipResult};
pub use settings::{BacktrackRule, BranchRule, Goal, MipSettings};
pub use solution::{MipSolution, MipStatus};

pub use simplex_core::StopReason;

use simplex_core::{solve_lp, LpSettings, LpStatus, Problem};

/// Solve a mixed-integer linear program: solve the root relaxation with the
/// two-phase primal method, then run branch and bound on it.
pub fn solve_mip(problem: &Problem, settings: &MipSettings) -> MipResult<MipSolution> {
    let lp_settings = LpSettings {
        tolerances: settings.tolerances,
        steepest_edge: settings.steepest_edge,
        harris_ratio: settings.harris_ratio,
        iteration_limit: settings.iteration_limit,
        time_limit: settings.time_limit,
    };
    let relaxation = solve_lp(problem, &lp_settings)?;
    match relaxation.status {
        LpStatus::Optimal => {}
        LpStatus::Infeasible => {
            return Ok(MipSolution {
                status: MipStatus::Infeasible,
                objective: relaxation.objective,
                values: relaxation.values,
                reduced_costs: relaxation.reduced_costs,
                statuses: relaxation.statuses,
                iterations: relaxation.iterations,
                nodes: 0,
            })
        }
        LpStatus::Unbounded => return Err(MipError::UnboundedRelaxation),
        LpStatus::Stopped(reason) => {
            return Ok(MipSolution {
                status: MipStatus::Stopped(reason),
                objective: relaxation.objective,
                values: relaxation.values,
                reduced_costs: relaxation.reduced_costs,
                statuses: relaxation.statuses,
                iterations: relaxation.iterations,
                nodes: 0,
            })
        }
    }
    if settings.goal == Goal::RelaxedOnly {
        return Ok(MipSolution {
            status: MipStatus::RelaxedOptimal,
            objective: relaxation.objective,
            values: relaxation.values,
            reduced_costs: relaxation.reduced_costs,
            statuses: relaxation.statuses,
            iterations: relaxation.iterations,
            nodes: 1,
        });
    }
    BranchAndBound::new(problem, &relaxation, settings.clone())?.run()
}
