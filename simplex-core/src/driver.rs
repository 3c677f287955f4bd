//! Simplex drivers: primal optimization, dual optimization, and primal
//! feasibility restoration, plus the two-phase wrapper and a one-call
//! [`solve_lp`] entry point.
//!
//! All three drivers share the same skeleton: recompute the basic solution
//! from scratch each iteration, give a [`Monitor`] the chance to stop the
//! run, verify the invariant the method maintains (returning `Unstable`
//! when round-off has broken it), select a pivot, and commit it. Callers
//! decide how to react to `Unstable`; [`solve_lp`] refactorizes and
//! restarts as long as restarts keep making progress.

use std::time::{Duration, Instant};

use crate::basis::{Basis, BasisTag, Leaving};
use crate::error::{SimplexError, SimplexResult};
use crate::kernels::{compare_rel, Residual};
use crate::problem::{BoundKind, Direction, Problem};

/// Why a driver stopped before reaching its natural end.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    IterationLimit,
    TimeLimit,
    /// The objective can no longer beat the caller's reference value.
    ObjectiveCutoff,
}

/// Per-iteration observer. `objective` is the current value of the linear
/// form being minimized, without any constant term.
pub trait Monitor {
    fn poll(&mut self, basis: &Basis, objective: f64) -> Option<StopReason>;
}

/// Tolerances shared by the drivers.
#[derive(Debug, Clone, Copy)]
pub struct Tolerances {
    /// Relative bound-violation tolerance of the primal solution.
    pub tol_bnd: f64,
    /// Relative reduced-cost tolerance of the dual solution.
    pub tol_dj: f64,
    /// Relative threshold below which a table entry is unusable as a pivot.
    pub tol_piv: f64,
}

impl Default for Tolerances {
    fn default() -> Self {
        Self {
            tol_bnd: 1e-7,
            tol_dj: 1e-7,
            tol_piv: 1e-10,
        }
    }
}

/// How a driver run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SimplexOutcome {
    /// The driver reached its goal: an optimal basis for the optimizers, a
    /// primal feasible basis for [`feasibility_restore`].
    Optimal,
    /// No feasible solution exists (for the dual driver: the dual problem
    /// is unbounded).
    Infeasible,
    /// The objective decreases without limit.
    Unbounded,
    /// Round-off broke the invariant the driver maintains; the caller may
    /// refactorize and retry.
    Unstable,
    Stopped(StopReason),
}

/// Minimize `c . x` by the primal method, starting from a primal feasible
/// basis. With `steepest` set the entering column is priced by projected
/// steepest edge, otherwise by largest squared reduced cost; with `harris`
/// set the leaving row uses the two-pass ratio test.
pub fn primal_optimize(
    basis: &mut Basis,
    c: &[f64],
    tols: &Tolerances,
    steepest: bool,
    harris: bool,
    mut monitor: Option<&mut (dyn Monitor + '_)>,
) -> SimplexResult<SimplexOutcome> {
    let m = basis.num_rows;
    let n = basis.num_cols;
    let mut bbar = vec![0.0; m];
    let mut pi = vec![0.0; m];
    let mut cbar = vec![0.0; n];
    let mut aq = vec![0.0; m];
    let mut zeta = vec![0.0; m];
    let mut ap = vec![0.0; n];
    let mut gvec = vec![1.0; n];
    if steepest {
        basis.init_primal_weights(&mut gvec);
    }
    loop {
        basis.eval_basics(&mut bbar);
        if let Some(mon) = monitor.as_deref_mut() {
            let obj = basis.eval_objective(c, &bbar);
            if let Some(reason) = mon.poll(basis, obj) {
                return Ok(SimplexOutcome::Stopped(reason));
            }
        }
        if !basis.primal_feasible(&bbar, tols.tol_bnd) {
            return Ok(SimplexOutcome::Unstable);
        }
        basis.eval_multipliers(c, &mut pi);
        basis.eval_reduced_costs(c, &pi, &mut cbar);
        let q = match basis.pivot_col(c, &cbar, steepest.then_some(&gvec[..]), tols.tol_dj) {
            Some(q) => q,
            None => return Ok(SimplexOutcome::Optimal),
        };
        basis.table_column(q, &mut aq, true);
        let decreasing = cbar[q] > 0.0;
        let leaving = if harris {
            basis.harris_row(q, decreasing, &aq, &bbar, tols.tol_piv, 0.003 * tols.tol_bnd)
        } else {
            basis.pivot_row(q, decreasing, &aq, &bbar, tols.tol_piv)
        };
        match leaving {
            Leaving::Unbounded => return Ok(SimplexOutcome::Unbounded),
            Leaving::BoundFlip => basis.flip_bound(q),
            Leaving::Basic { row: p, tag } => {
                if steepest {
                    basis.inverse_row(p, &mut zeta);
                    basis.table_row(&zeta, &mut ap);
                    basis.update_primal_weights(p, q, &ap, &aq, &mut gvec);
                }
                basis.pivot(p, tag, q).map_err(SimplexError::BasisUnusable)?;
            }
        }
    }
}

/// Minimize `c . x` by the dual method, starting from a dual feasible
/// basis. Flags as in [`primal_optimize`]; `steepest` here selects the
/// dual steepest-edge row pricing.
pub fn dual_optimize(
    basis: &mut Basis,
    c: &[f64],
    tols: &Tolerances,
    steepest: bool,
    harris: bool,
    mut monitor: Option<&mut (dyn Monitor + '_)>,
) -> SimplexResult<SimplexOutcome> {
    let m = basis.num_rows;
    let n = basis.num_cols;
    let mut bbar = vec![0.0; m];
    let mut pi = vec![0.0; m];
    let mut cbar = vec![0.0; n];
    let mut aq = vec![0.0; m];
    let mut zeta = vec![0.0; m];
    let mut ap = vec![0.0; n];
    let mut dvec = vec![1.0; m];
    if steepest {
        basis.init_dual_weights(&mut dvec);
    }
    loop {
        basis.eval_basics(&mut bbar);
        if let Some(mon) = monitor.as_deref_mut() {
            let obj = basis.eval_objective(c, &bbar);
            if let Some(reason) = mon.poll(basis, obj) {
                return Ok(SimplexOutcome::Stopped(reason));
            }
        }
        basis.eval_multipliers(c, &mut pi);
        basis.eval_reduced_costs(c, &pi, &mut cbar);
        if !basis.dual_feasible(c, &cbar, tols.tol_dj) {
            return Ok(SimplexOutcome::Unstable);
        }
        let (p, ptag) = match basis.dual_row(&bbar, steepest.then_some(&dvec[..]), tols.tol_bnd) {
            Some(choice) => choice,
            None => return Ok(SimplexOutcome::Optimal),
        };
        basis.inverse_row(p, &mut zeta);
        basis.table_row(&zeta, &mut ap);
        let q = if harris {
            basis.harris_col(ptag, &ap, &cbar, tols.tol_piv, 0.003 * tols.tol_dj)
        } else {
            basis.dual_col(ptag, &ap, &cbar, tols.tol_piv)
        };
        let q = match q {
            Some(q) => q,
            None => return Ok(SimplexOutcome::Infeasible),
        };
        basis.table_column(q, &mut aq, true);
        if steepest {
            basis.update_dual_weights(p, q, &ap, &aq, &mut dvec);
        }
        let tag = if basis.kind[basis.basic[p]] == BoundKind::Fixed {
            BasisTag::Fixed
        } else {
            ptag
        };
        basis.pivot(p, tag, q).map_err(SimplexError::BasisUnusable)?;
    }
}

/// Drive the basis to primal feasibility by minimizing the sum of bound
/// violations. Basic variables found outside their bounds get those bounds
/// temporarily reinterpreted so the violated limit becomes a target; the
/// working bounds are restored on every exit path. `Optimal` here means a
/// primal feasible basis was reached.
pub fn feasibility_restore(
    basis: &mut Basis,
    tols: &Tolerances,
    steepest: bool,
    harris: bool,
    monitor: Option<&mut (dyn Monitor + '_)>,
) -> SimplexResult<SimplexOutcome> {
    let saved_kind = basis.kind.clone();
    let saved_lower = basis.lower.clone();
    let saved_upper = basis.upper.clone();
    let result = feasibility_loop(
        basis,
        tols,
        steepest,
        harris,
        monitor,
        &saved_kind,
        &saved_lower,
        &saved_upper,
    );
    basis.kind.copy_from_slice(&saved_kind);
    basis.lower.copy_from_slice(&saved_lower);
    basis.upper.copy_from_slice(&saved_upper);
    result
}

#[allow(clippy::too_many_arguments)]
fn feasibility_loop(
    basis: &mut Basis,
    tols: &Tolerances,
    steepest: bool,
    harris: bool,
    mut monitor: Option<&mut (dyn Monitor + '_)>,
    saved_kind: &[BoundKind],
    saved_lower: &[f64],
    saved_upper: &[f64],
) -> SimplexResult<SimplexOutcome> {
    let m = basis.num_rows;
    let n = basis.num_cols;
    // violations smaller than this are left to the optimizer to live with
    let tol_vio = 0.30 * tols.tol_bnd;
    let mut bbar = vec![0.0; m];
    let mut pi = vec![0.0; m];
    let mut cbar = vec![0.0; n];
    let mut aq = vec![0.0; m];
    let mut zeta = vec![0.0; m];
    let mut ap = vec![0.0; n];
    let mut gvec = vec![1.0; n];
    if steepest {
        basis.init_primal_weights(&mut gvec);
    }
    // artificial objective: -1 pushes a variable up toward a violated
    // lower bound, +1 pushes it down toward a violated upper bound
    let mut aux = vec![0.0; m + n];
    let mut reinterpreted = vec![false; m + n];
    basis.eval_basics(&mut bbar);
    for i in 0..m {
        let k = basis.basic[i];
        if saved_kind[k].has_lower()
            && compare_rel(bbar[i], saved_lower[k], tol_vio) < Residual::Below
        {
            basis.kind[k] = BoundKind::UpperOnly;
            basis.lower[k] = 0.0;
            basis.upper[k] = saved_lower[k];
            aux[k] = -1.0;
            reinterpreted[k] = true;
        } else if saved_kind[k].has_upper()
            && compare_rel(bbar[i], saved_upper[k], tol_vio) > Residual::Above
        {
            basis.kind[k] = BoundKind::LowerOnly;
            basis.lower[k] = saved_upper[k];
            basis.upper[k] = 0.0;
            aux[k] = 1.0;
            reinterpreted[k] = true;
        }
    }
    loop {
        basis.eval_basics(&mut bbar);
        if let Some(mon) = monitor.as_deref_mut() {
            let obj = basis.eval_objective(&aux, &bbar);
            if let Some(reason) = mon.poll(basis, obj) {
                return Ok(SimplexOutcome::Stopped(reason));
            }
        }
        if !basis.primal_feasible(&bbar, tols.tol_bnd) {
            return Ok(SimplexOutcome::Unstable);
        }
        let mut feasible = true;
        for i in 0..m {
            let k = basis.basic[i];
            if saved_kind[k].has_lower()
                && compare_rel(bbar[i], saved_lower[k], tol_vio) < Residual::Below
            {
                feasible = false;
                break;
            }
            if saved_kind[k].has_upper()
                && compare_rel(bbar[i], saved_upper[k], tol_vio) > Residual::Above
            {
                feasible = false;
                break;
            }
        }
        if feasible {
            return Ok(SimplexOutcome::Optimal);
        }
        basis.eval_multipliers(&aux, &mut pi);
        basis.eval_reduced_costs(&aux, &pi, &mut cbar);
        let q = match basis.pivot_col(&aux, &cbar, steepest.then_some(&gvec[..]), tols.tol_dj) {
            Some(q) => q,
            None => return Ok(SimplexOutcome::Infeasible),
        };
        basis.table_column(q, &mut aq, true);
        let decreasing = cbar[q] > 0.0;
        let leaving = if harris {
            basis.harris_row(q, decreasing, &aq, &bbar, tols.tol_piv, 0.003 * tols.tol_bnd)
        } else {
            basis.pivot_row(q, decreasing, &aq, &bbar, tols.tol_piv)
        };
        match leaving {
            Leaving::Unbounded => {
                // the artificial objective is bounded below whenever any
                // bound is violated; hitting this means round-off
                return Ok(SimplexOutcome::Unstable);
            }
            Leaving::BoundFlip => basis.flip_bound(q),
            Leaving::Basic { row: p, mut tag } => {
                let k = basis.basic[p];
                if reinterpreted[k] {
                    // the reinterpreted limit was the original one seen from
                    // the other side
                    tag = match tag {
                        BasisTag::Lower => BasisTag::Upper,
                        BasisTag::Upper => BasisTag::Lower,
                        other => other,
                    };
                    basis.kind[k] = saved_kind[k];
                    basis.lower[k] = saved_lower[k];
                    basis.upper[k] = saved_upper[k];
                    aux[k] = 0.0;
                    reinterpreted[k] = false;
                    if saved_kind[k] == BoundKind::Fixed {
                        tag = BasisTag::Fixed;
                    }
                }
                if steepest {
                    basis.inverse_row(p, &mut zeta);
                    basis.table_row(&zeta, &mut ap);
                    basis.update_primal_weights(p, q, &ap, &aq, &mut gvec);
                }
                basis.pivot(p, tag, q).map_err(SimplexError::BasisUnusable)?;
            }
        }
    }
}

/// Restore primal feasibility, then minimize `c . x` from the feasible
/// basis. The optimization phase prices against a slightly tightened
/// reduced-cost tolerance so that the optimum it reports stays optimal
/// under the caller's tolerance.
pub fn two_phase(
    basis: &mut Basis,
    c: &[f64],
    tols: &Tolerances,
    steepest: bool,
    harris: bool,
    mut monitor: Option<&mut (dyn Monitor + '_)>,
) -> SimplexResult<SimplexOutcome> {
    match feasibility_restore(basis, tols, steepest, harris, monitor.as_deref_mut())? {
        SimplexOutcome::Optimal => {}
        other => return Ok(other),
    }
    let phase2 = Tolerances {
        tol_dj: 0.70 * tols.tol_dj,
        ..*tols
    };
    primal_optimize(basis, c, &phase2, steepest, harris, monitor)
}

/// Knobs of the one-call LP interface.
#[derive(Debug, Clone)]
pub struct LpSettings {
    pub tolerances: Tolerances,
    /// Price with projected steepest edge.
    pub steepest_edge: bool,
    /// Use the Harris two-pass ratio tests.
    pub harris_ratio: bool,
    pub iteration_limit: Option<u64>,
    pub time_limit: Option<Duration>,
}

impl Default for LpSettings {
    fn default() -> Self {
        Self {
            tolerances: Tolerances::default(),
            steepest_edge: true,
            harris_ratio: true,
            iteration_limit: None,
            time_limit: None,
        }
    }
}

/// Status of a finished [`solve_lp`] run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LpStatus {
    Optimal,
    Infeasible,
    Unbounded,
    Stopped(StopReason),
}

/// Solution of an LP (or of an MILP relaxation).
#[derive(Debug, Clone)]
pub struct LpSolution {
    pub status: LpStatus,
    /// Objective in the problem's own direction, constant included.
    pub objective: f64,
    /// Values of all variables, row variables first.
    pub values: Vec<f64>,
    /// Reduced costs of all variables in the problem's own direction,
    /// zero for basic ones.
    pub reduced_costs: Vec<f64>,
    /// Basis status of every variable at the final basis.
    pub statuses: Vec<BasisTag>,
    pub iterations: u64,
}

/// Stops a run at an iteration count or a wall-clock deadline.
pub struct LimitMonitor {
    iteration_limit: Option<u64>,
    deadline: Option<Instant>,
}

impl LimitMonitor {
    pub fn new(iteration_limit: Option<u64>, time_limit: Option<Duration>) -> Self {
        Self {
            iteration_limit,
            deadline: time_limit.map(|d| Instant::now() + d),
        }
    }
}

impl Monitor for LimitMonitor {
    fn poll(&mut self, basis: &Basis, _objective: f64) -> Option<StopReason> {
        if let Some(limit) = self.iteration_limit {
            if basis.iterations >= limit {
                return Some(StopReason::IterationLimit);
            }
        }
        if let Some(deadline) = self.deadline {
            if Instant::now() >= deadline {
                return Some(StopReason::TimeLimit);
            }
        }
        None
    }
}

/// Solve an LP from scratch with the two-phase primal method. On
/// instability the basis is refactorized and the run restarted; a restart
/// that performs no iterations before failing again is reported as an
/// error.
pub fn solve_lp(problem: &Problem, settings: &LpSettings) -> SimplexResult<LpSolution> {
    let mut basis = Basis::new(problem)?;
    let c = problem.expanded_objective();
    let mut monitor = LimitMonitor::new(settings.iteration_limit, settings.time_limit);
    let mut last_iterations = basis.iterations;
    let status = loop {
        let outcome = two_phase(
            &mut basis,
            &c,
            &settings.tolerances,
            settings.steepest_edge,
            settings.harris_ratio,
            Some(&mut monitor),
        )?;
        match outcome {
            SimplexOutcome::Optimal => break LpStatus::Optimal,
            SimplexOutcome::Infeasible => break LpStatus::Infeasible,
            SimplexOutcome::Unbounded => break LpStatus::Unbounded,
            SimplexOutcome::Stopped(reason) => break LpStatus::Stopped(reason),
            SimplexOutcome::Unstable => {
                if basis.iterations == last_iterations {
                    return Err(SimplexError::NumericalInstability(
                        "restart performed no iterations".into(),
                    ));
                }
                log::warn!(
                    "numerical instability after {} iterations, refactorizing",
                    basis.iterations
                );
                last_iterations = basis.iterations;
                basis.reinvert()?;
            }
        }
    };
    Ok(extract_solution(problem, &mut basis, &c, status))
}

pub(crate) fn extract_solution(
    problem: &Problem,
    basis: &mut Basis,
    c: &[f64],
    status: LpStatus,
) -> LpSolution {
    let m = basis.num_rows;
    let n = basis.num_cols;
    let mut bbar = vec![0.0; m];
    let mut pi = vec![0.0; m];
    let mut cbar = vec![0.0; n];
    basis.eval_basics(&mut bbar);
    basis.eval_multipliers(c, &mut pi);
    basis.eval_reduced_costs(c, &pi, &mut cbar);
    let values: Vec<f64> = (0..m + n).map(|k| basis.value_of(k, &bbar)).collect();
    let sign = match problem.direction {
        Direction::Minimize => 1.0,
        Direction::Maximize => -1.0,
    };
    let mut reduced_costs = vec![0.0; m + n];
    for (j, &k) in basis.nonbasic.iter().enumerate() {
        reduced_costs[k] = sign * cbar[j];
    }
    LpSolution {
        status,
        objective: problem.objective_value(&values[m..]),
        values,
        reduced_costs,
        statuses: basis.statuses(),
        iterations: basis.iterations,
    }
}
