//! Branch-and-bound driver over the dual simplex method.
//!
//! The search keeps one [`Basis`] that always describes the node being
//! processed. Descending into a child reuses the parent's optimal basis
//! directly (the added bound leaves it dual feasible); backtracking to a
//! suspended node rebuilds its basis by replaying the branching bounds and
//! recorded status diffs along the root path, then refactorizing.

use std::time::Instant;

use log::{debug, info, warn};

use simplex_core::{
    compare_rel, dual_optimize, two_phase, Basis, BasisTag, BoundKind, Direction, LpSolution,
    LpStatus, Monitor, Problem, Residual, SimplexError, SimplexOutcome, StopReason,
};

use crate::error::{MipError, MipResult};
use crate::search::{BranchDir, BranchFix, NodeId, SearchTree};
use crate::settings::{BacktrackRule, BranchRule, Goal, MipSettings};
use crate::solution::{MipSolution, MipStatus};

/// Limit checks plus the incumbent cutoff, polled by the simplex drivers
/// once per iteration.
struct SearchMonitor {
    iteration_limit: Option<u64>,
    deadline: Option<Instant>,
    /// Incumbent objective in minimization sense; a node whose relaxation
    /// objective is no longer well below it cannot improve on it.
    cutoff: Option<f64>,
    tol_obj: f64,
}

impl Monitor for SearchMonitor {
    fn poll(&mut self, basis: &Basis, objective: f64) -> Option<StopReason> {
        if let Some(best) = self.cutoff {
            if compare_rel(objective, best, self.tol_obj) >= Residual::Below {
                return Some(StopReason::ObjectiveCutoff);
            }
        }
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

/// How one subproblem solve ended.
enum NodeOutcome {
    /// Relaxation solved to optimality; node data recorded.
    Solved,
    /// Relaxation is infeasible.
    Infeasible,
    /// Cut off by the incumbent before reaching optimality.
    Fathomed,
    /// A global limit fired.
    Stopped(StopReason),
}

/// One branch-and-bound search over a problem whose root relaxation has
/// already been solved.
pub struct BranchAndBound<'a> {
    problem: &'a Problem,
    settings: MipSettings,
    basis: Basis,
    /// Expanded objective, minimization sense.
    obj: Vec<f64>,
    tree: SearchTree,
    root: NodeId,
    root_statuses: Vec<BasisTag>,
    relaxation: LpSolution,
    best: Option<MipSolution>,
    /// Incumbent objective in minimization sense.
    best_objective: Option<f64>,
    deadline: Option<Instant>,
}

impl<'a> BranchAndBound<'a> {
    /// Set up a search from an optimal root relaxation.
    pub fn new(
        problem: &'a Problem,
        relaxation: &LpSolution,
        settings: MipSettings,
    ) -> MipResult<Self> {
        if relaxation.status != LpStatus::Optimal {
            return Err(MipError::InvalidInput(format!(
                "root relaxation status is {:?}, need an optimal basis",
                relaxation.status
            )));
        }
        let obj = problem.expanded_objective();
        let mut basis = Basis::new(problem)?;
        basis.set_statuses(&relaxation.statuses)?;
        basis.reinvert().map_err(SimplexError::from)?;
        // keep the global iteration count continuous across relaxation
        // and search
        basis.iterations = relaxation.iterations;
        let (tree, root) = SearchTree::new();
        let deadline = settings.time_limit.map(|limit| Instant::now() + limit);
        let mut search = Self {
            problem,
            settings,
            basis,
            obj,
            tree,
            root,
            root_statuses: relaxation.statuses.clone(),
            relaxation: relaxation.clone(),
            best: None,
            best_objective: None,
            deadline,
        };
        let mut bbar = vec![0.0; search.basis.num_rows];
        search.basis.eval_basics(&mut bbar);
        search.round_off(&mut bbar);
        let objective = search.basis.eval_objective(&search.obj, &bbar);
        let infsum = search.eval_infsum(&bbar);
        let node = search.tree.node_mut(root);
        node.objective = objective;
        node.infsum = infsum;
        node.solved = true;
        search.tree.solved_total = 1;
        Ok(search)
    }

    /// Run the search to completion (or to a limit) and report the best
    /// integer solution found.
    pub fn run(&mut self) -> MipResult<MipSolution> {
        info!(
            "branch and bound over {} integer columns, root bound {:.6}",
            self.problem.integer.iter().filter(|&&b| b).count(),
            self.tree.node(self.root).objective
        );
        // the node most recently solved; the basis describes it
        let mut cur = self.root;
        'process: loop {
            let (node_obj, node_infsum) = {
                let node = self.tree.node(cur);
                (node.objective, node.infsum)
            };
            let dominated = match self.best_objective {
                Some(best) => {
                    compare_rel(node_obj, best, self.settings.tol_obj) >= Residual::Below
                }
                None => false,
            };
            if dominated {
                debug!("node bound {:.6} dominated by incumbent, fathoming", node_obj);
                self.tree.remove(cur);
            } else if node_infsum == 0.0 {
                let sol = self.snapshot(MipStatus::Feasible);
                info!(
                    "integer feasible solution {:.6} after {} nodes",
                    sol.objective, self.tree.solved_total
                );
                self.best_objective = Some(node_obj);
                self.best = Some(sol);
                self.tree.remove(cur);
                if self.settings.goal == Goal::FirstFeasible {
                    return Ok(self.take_best(MipStatus::Feasible));
                }
            } else {
                let mut bbar = vec![0.0; self.basis.num_rows];
                self.basis.eval_basics(&mut bbar);
                let (var, beta, descend) = match self.choose_branch(&bbar) {
                    Some(choice) => choice,
                    None => unreachable!("positive infeasibility sum without a fractional column"),
                };
                debug!(
                    "branching on column {} at {:.6}, descending {:?}",
                    var, beta, descend
                );
                self.save_diff(cur);
                let (up, down) = self.tree.split(cur, var, beta);
                let child = match descend {
                    BranchDir::Up => up,
                    BranchDir::Down => down,
                };
                self.tree.deactivate(child);
                match self.solve_node(child, true)? {
                    NodeOutcome::Solved => {
                        cur = child;
                        continue 'process;
                    }
                    NodeOutcome::Infeasible | NodeOutcome::Fathomed => {
                        self.tree.remove(child);
                    }
                    NodeOutcome::Stopped(reason) => return Ok(self.stopped(reason)),
                }
            }
            // backtracking: resume some suspended node with a cold start
            loop {
                if let Some(best) = self.best_objective {
                    let tol = self.settings.tol_obj;
                    self.tree
                        .purge(|bound| compare_rel(bound, best, tol) >= Residual::Below);
                }
                if self.tree.active.is_empty() {
                    return Ok(self.finished());
                }
                let next = self.select_node();
                self.tree.deactivate(next);
                match self.solve_node(next, false)? {
                    NodeOutcome::Solved => {
                        cur = next;
                        continue 'process;
                    }
                    NodeOutcome::Infeasible => {
                        debug!("subproblem infeasible, fathoming");
                        self.tree.remove(next);
                    }
                    NodeOutcome::Fathomed => {
                        debug!("subproblem cut off by incumbent");
                        self.tree.remove(next);
                    }
                    NodeOutcome::Stopped(reason) => return Ok(self.stopped(reason)),
                }
            }
        }
    }

    /// Solve the relaxation of one node. With `warm` set the basis is the
    /// parent's optimal one and only the node's branching bound needs
    /// applying; otherwise the node is rebuilt from the root path first.
    fn solve_node(&mut self, id: NodeId, warm: bool) -> MipResult<NodeOutcome> {
        if !warm {
            if let Some(parent) = self.tree.node(id).parent {
                self.revive(parent)?;
            }
        }
        if let Some(fix) = self.tree.node(id).branch {
            apply_branch(&mut self.basis, &fix);
        }
        let mut monitor = self.monitor(self.best_objective);
        let outcome = dual_optimize(
            &mut self.basis,
            &self.obj,
            &self.settings.tolerances,
            self.settings.steepest_edge,
            self.settings.harris_ratio,
            Some(&mut monitor),
        )?;
        let outcome = match outcome {
            SimplexOutcome::Unstable => self.recover(id)?,
            other => other,
        };
        match outcome {
            SimplexOutcome::Optimal => {
                self.finish_node(id);
                Ok(NodeOutcome::Solved)
            }
            SimplexOutcome::Infeasible => Ok(NodeOutcome::Infeasible),
            SimplexOutcome::Stopped(StopReason::ObjectiveCutoff) => Ok(NodeOutcome::Fathomed),
            SimplexOutcome::Stopped(reason) => Ok(NodeOutcome::Stopped(reason)),
            SimplexOutcome::Unbounded => Err(MipError::NumericalFailure(
                "bounded subproblem reported unbounded".into(),
            )),
            SimplexOutcome::Unstable => unreachable!("instability survives recovery"),
        }
    }

    /// Numerical recovery for one node: rebuild the basis from the root
    /// path and rerun with the two-phase primal method, refactorizing as
    /// long as restarts keep making progress.
    fn recover(&mut self, id: NodeId) -> MipResult<SimplexOutcome> {
        warn!("numerical trouble in a subproblem, switching to the primal method");
        match self.tree.node(id).parent {
            Some(parent) => self.revive(parent)?,
            None => {
                self.basis.reset_bounds(self.problem);
                self.basis.set_statuses(&self.root_statuses)?;
                self.basis.reinvert().map_err(SimplexError::from)?;
            }
        }
        if let Some(fix) = self.tree.node(id).branch {
            apply_branch(&mut self.basis, &fix);
        }
        let mut last_iterations = self.basis.iterations;
        loop {
            let mut monitor = self.monitor(None);
            let outcome = two_phase(
                &mut self.basis,
                &self.obj,
                &self.settings.tolerances,
                self.settings.steepest_edge,
                self.settings.harris_ratio,
                Some(&mut monitor),
            )?;
            match outcome {
                SimplexOutcome::Unstable => {
                    if self.basis.iterations == last_iterations {
                        return Err(MipError::NumericalFailure(
                            "restart performed no iterations".into(),
                        ));
                    }
                    last_iterations = self.basis.iterations;
                    self.basis.reinvert().map_err(SimplexError::from)?;
                }
                other => return Ok(other),
            }
        }
    }

    /// Rebuild the basis of the solved node `target` from scratch: problem
    /// bounds, then the branching bounds and status diffs along the root
    /// path, then a fresh factorization.
    fn revive(&mut self, target: NodeId) -> MipResult<()> {
        self.basis.reset_bounds(self.problem);
        let mut tags = self.root_statuses.clone();
        let mut fixes = Vec::new();
        for &nid in &self.tree.path(target) {
            let node = self.tree.node(nid);
            if let Some(fix) = node.branch {
                fixes.push(fix);
            }
            for &(k, tag) in &node.diff {
                tags[k] = tag;
            }
        }
        for fix in &fixes {
            apply_branch(&mut self.basis, fix);
        }
        self.basis.set_statuses(&tags)?;
        self.basis.reinvert().map_err(SimplexError::from)?;
        Ok(())
    }

    /// Record the basis statuses of the just-solved node `id` as a diff
    /// against what replaying its ancestors would produce.
    fn save_diff(&mut self, id: NodeId) {
        let tags_now = self.basis.statuses();
        let mut base = self.root_statuses.clone();
        if let Some(parent) = self.tree.node(id).parent {
            for &nid in &self.tree.path(parent) {
                for &(k, tag) in &self.tree.node(nid).diff {
                    base[k] = tag;
                }
            }
        }
        let mut diff = Vec::new();
        for (k, &tag) in tags_now.iter().enumerate() {
            if base[k] != tag {
                diff.push((k, tag));
            }
        }
        self.tree.node_mut(id).diff = diff;
    }

    /// Store the relaxation results on a node solved to optimality.
    fn finish_node(&mut self, id: NodeId) {
        let mut bbar = vec![0.0; self.basis.num_rows];
        self.basis.eval_basics(&mut bbar);
        self.round_off(&mut bbar);
        let objective = self.basis.eval_objective(&self.obj, &bbar);
        let infsum = self.eval_infsum(&bbar);
        debug!(
            "node solved: bound {:.6}, infeasibility sum {:.6}",
            objective, infsum
        );
        let node = self.tree.node_mut(id);
        node.objective = objective;
        node.infsum = infsum;
        node.solved = true;
        self.tree.solved_total += 1;
    }

    /// Clamp basic integer variables onto slightly violated bounds and
    /// snap them to integers when they are within the integrality
    /// tolerance.
    fn round_off(&self, bbar: &mut [f64]) {
        for (i, &k) in self.basis.basic.iter().enumerate() {
            if !self.problem.is_integer_var(k) {
                continue;
            }
            let mut v = bbar[i];
            if self.basis.kind[k].has_lower() && v < self.basis.lower[k] {
                v = self.basis.lower[k];
            } else if self.basis.kind[k].has_upper() && v > self.basis.upper[k] {
                v = self.basis.upper[k];
            }
            if (v - v.round()).abs() <= self.settings.tol_int {
                v = v.round();
            }
            bbar[i] = v;
        }
    }

    /// Sum of integer infeasibilities at the current basic solution.
    fn eval_infsum(&self, bbar: &[f64]) -> f64 {
        let mut infsum = 0.0;
        for k in self.problem.num_rows..self.problem.num_vars() {
            if !self.problem.is_integer_var(k) {
                continue;
            }
            let frac = fractionality(self.basis.value_of(k, bbar));
            if frac > self.settings.tol_int {
                infsum += frac;
            }
        }
        infsum
    }

    /// Pick the branching column and the child to descend into.
    fn choose_branch(&self, bbar: &[f64]) -> Option<(usize, f64, BranchDir)> {
        let mut candidates = Vec::new();
        for k in self.problem.num_rows..self.problem.num_vars() {
            if !self.problem.is_integer_var(k) {
                continue;
            }
            let beta = self.basis.value_of(k, bbar);
            if fractionality(beta) > self.settings.tol_int {
                candidates.push((k, beta));
            }
        }
        let (var, beta) = match self.settings.branch_rule {
            BranchRule::First => *candidates.first()?,
            BranchRule::Last => *candidates.last()?,
            BranchRule::Degradation => return self.choose_branch_degradation(&candidates),
        };
        let dir = if beta.ceil() - beta < beta - beta.floor() {
            BranchDir::Up
        } else {
            BranchDir::Down
        };
        Some((var, beta, dir))
    }

    /// Driebeek-Tomlin branching: estimate the objective degradation of
    /// forcing each candidate down and up with a single dual pivot, branch
    /// on the candidate whose better side degrades the most, and descend
    /// into the side that degrades more, since it is the one likelier to
    /// be pruned right away.
    fn choose_branch_degradation(
        &self,
        candidates: &[(usize, f64)],
    ) -> Option<(usize, f64, BranchDir)> {
        let m = self.basis.num_rows;
        let n = self.basis.num_cols;
        let mut pi = vec![0.0; m];
        let mut cbar = vec![0.0; n];
        self.basis.eval_multipliers(&self.obj, &mut pi);
        self.basis.eval_reduced_costs(&self.obj, &pi, &mut cbar);
        let mut zeta = vec![0.0; m];
        let mut ap = vec![0.0; n];
        let mut choice = None;
        let mut best_score = f64::NEG_INFINITY;
        for &(k, beta) in candidates {
            let row = match self.basis.position[k] {
                simplex_core::Position::Basic(i) => i,
                // a nonbasic variable sits on an integral bound
                simplex_core::Position::Nonbasic(_) => continue,
            };
            self.basis.inverse_row(row, &mut zeta);
            self.basis.table_row(&zeta, &mut ap);
            let deg_down = self.degradation(beta, beta.floor(), BasisTag::Upper, &ap, &cbar);
            let deg_up = self.degradation(beta, beta.ceil(), BasisTag::Lower, &ap, &cbar);
            let score = deg_down.min(deg_up);
            if score > best_score {
                best_score = score;
                let dir = if deg_up > deg_down {
                    BranchDir::Up
                } else {
                    BranchDir::Down
                };
                choice = Some((k, beta, dir));
            }
        }
        choice
    }

    /// Estimated objective degradation of driving a basic variable from
    /// `beta` to `target` with one dual pivot along the row `ap`. Returns
    /// infinity when no entering column exists (that side is infeasible).
    fn degradation(&self, beta: f64, target: f64, tag: BasisTag, ap: &[f64], cbar: &[f64]) -> f64 {
        let q = match self.basis.dual_col(tag, ap, cbar, 1e-10) {
            Some(q) => q,
            None => return f64::INFINITY,
        };
        let mut delta = (target - beta) / ap[q];
        // Tomlin correction: if the entering column is integer it has to
        // move by at least a whole unit
        if self.problem.is_integer_var(self.basis.nonbasic[q]) && delta.abs() < 1.0 {
            delta = if delta < 0.0 { -1.0 } else { 1.0 };
        }
        cbar[q] * delta
    }

    /// Pick the suspended node to resume.
    fn select_node(&self) -> NodeId {
        let fallback = || match self.tree.active.front() {
            Some(&id) => id,
            None => unreachable!("node selection over an empty active list"),
        };
        match self.settings.backtrack_rule {
            BacktrackRule::Fifo => fallback(),
            BacktrackRule::Lifo => match self.tree.active.back() {
                Some(&id) => id,
                None => unreachable!("node selection over an empty active list"),
            },
            BacktrackRule::BestProjection => {
                // without an incumbent: plain best bound; with one: bound
                // plus the root-rate estimate of repairing the node's
                // fractionality
                let rate = self.best_objective.map(|best| {
                    let root = self.tree.node(self.root);
                    if root.infsum > 0.0 {
                        (best - root.objective) / root.infsum
                    } else {
                        0.0
                    }
                });
                let mut best_id = None;
                let mut best_val = f64::INFINITY;
                for &id in &self.tree.active {
                    let parent = match self.tree.node(id).parent {
                        Some(p) => self.tree.node(p),
                        None => continue,
                    };
                    let val = match rate {
                        Some(rate) => parent.objective + rate * parent.infsum,
                        None => parent.objective,
                    };
                    if val < best_val {
                        best_val = val;
                        best_id = Some(id);
                    }
                }
                match best_id {
                    Some(id) => id,
                    None => fallback(),
                }
            }
        }
    }

    fn monitor(&self, cutoff: Option<f64>) -> SearchMonitor {
        SearchMonitor {
            iteration_limit: self.settings.iteration_limit,
            deadline: self.deadline,
            cutoff,
            tol_obj: self.settings.tol_obj,
        }
    }

    /// Build a reportable solution from the current basis.
    fn snapshot(&mut self, status: MipStatus) -> MipSolution {
        let m = self.basis.num_rows;
        let n = self.basis.num_cols;
        let mut bbar = vec![0.0; m];
        let mut pi = vec![0.0; m];
        let mut cbar = vec![0.0; n];
        self.basis.eval_basics(&mut bbar);
        self.round_off(&mut bbar);
        self.basis.eval_multipliers(&self.obj, &mut pi);
        self.basis.eval_reduced_costs(&self.obj, &pi, &mut cbar);
        if self.settings.round_solution {
            for v in bbar.iter_mut() {
                if v.abs() < self.settings.tolerances.tol_bnd {
                    *v = 0.0;
                }
            }
            for d in cbar.iter_mut() {
                if d.abs() < self.settings.tolerances.tol_dj {
                    *d = 0.0;
                }
            }
        }
        let values: Vec<f64> = (0..m + n).map(|k| self.basis.value_of(k, &bbar)).collect();
        let sign = match self.problem.direction {
            Direction::Minimize => 1.0,
            Direction::Maximize => -1.0,
        };
        let mut reduced_costs = vec![0.0; m + n];
        for (j, &k) in self.basis.nonbasic.iter().enumerate() {
            reduced_costs[k] = sign * cbar[j];
        }
        MipSolution {
            status,
            objective: self.problem.objective_value(&values[m..]),
            values,
            reduced_costs,
            statuses: self.basis.statuses(),
            iterations: self.basis.iterations,
            nodes: self.tree.solved_total,
        }
    }

    /// Hand out the incumbent with final accounting.
    fn take_best(&mut self, status: MipStatus) -> MipSolution {
        let mut sol = match self.best.take() {
            Some(sol) => sol,
            None => unreachable!("no incumbent to hand out"),
        };
        sol.status = status;
        sol.iterations = self.basis.iterations;
        sol.nodes = self.tree.solved_total;
        sol
    }

    /// Final result once the active list has drained.
    fn finished(&mut self) -> MipSolution {
        if self.best.is_some() {
            let sol = self.take_best(MipStatus::Optimal);
            info!(
                "search finished: optimal {:.6} after {} nodes",
                sol.objective, sol.nodes
            );
            sol
        } else {
            info!("search finished: no integer feasible solution");
            MipSolution {
                status: MipStatus::NoIntegerFeasible,
                objective: self.relaxation.objective,
                values: self.relaxation.values.clone(),
                reduced_costs: self.relaxation.reduced_costs.clone(),
                statuses: self.relaxation.statuses.clone(),
                iterations: self.basis.iterations,
                nodes: self.tree.solved_total,
            }
        }
    }

    /// Result for a search interrupted by a limit. With an incumbent in
    /// hand the run still counts as feasible; without one the stop cause
    /// becomes the status.
    fn stopped(&mut self, reason: StopReason) -> MipSolution {
        warn!("search stopped early: {:?}", reason);
        if self.best.is_some() {
            self.take_best(MipStatus::Feasible)
        } else {
            MipSolution {
                status: MipStatus::Stopped(reason),
                objective: self.relaxation.objective,
                values: self.relaxation.values.clone(),
                reduced_costs: self.relaxation.reduced_costs.clone(),
                statuses: self.relaxation.statuses.clone(),
                iterations: self.basis.iterations,
                nodes: self.tree.solved_total,
            }
        }
    }
}

/// Tighten the working bounds of one variable with a branching bound.
fn apply_branch(basis: &mut Basis, fix: &BranchFix) {
    let k = fix.var;
    let v = fix.value;
    match fix.dir {
        BranchDir::Up => match basis.kind[k] {
            BoundKind::Free => {
                basis.kind[k] = BoundKind::LowerOnly;
                basis.lower[k] = v;
            }
            BoundKind::LowerOnly => basis.lower[k] = v,
            BoundKind::UpperOnly | BoundKind::DoubleBounded => {
                if v >= basis.upper[k] {
                    basis.kind[k] = BoundKind::Fixed;
                    basis.lower[k] = basis.upper[k];
                } else {
                    basis.kind[k] = BoundKind::DoubleBounded;
                    basis.lower[k] = v;
                }
            }
            BoundKind::Fixed => {}
        },
        BranchDir::Down => match basis.kind[k] {
            BoundKind::Free => {
                basis.kind[k] = BoundKind::UpperOnly;
                basis.upper[k] = v;
            }
            BoundKind::UpperOnly => basis.upper[k] = v,
            BoundKind::LowerOnly | BoundKind::DoubleBounded => {
                if v <= basis.lower[k] {
                    basis.kind[k] = BoundKind::Fixed;
                    basis.upper[k] = basis.lower[k];
                } else {
                    basis.kind[k] = BoundKind::DoubleBounded;
                    basis.upper[k] = v;
                }
            }
            BoundKind::Fixed => {}
        },
    }
}

/// Distance of `v` to the nearest integer in the branching sense.
fn fractionality(v: f64) -> f64 {
    let f = v - v.floor();
    f.min(1.0 - f)
}

#[cfg(test)]
mod tests {
    use super::*;
    use simplex_core::{natural_tag, solve_lp, Bounds, LpSettings};

    #[test]
    fn test_fractionality() {
        assert!(fractionality(3.0) < 1e-12);
        assert!((fractionality(2.25) - 0.25).abs() < 1e-12);
        assert!((fractionality(-0.75) - 0.25).abs() < 1e-12);
    }

    fn basis_with_range() -> Basis {
        let p = Problem::build(
            1,
            1,
            vec![Bounds::free(), Bounds::range(0.0, 5.0)],
            vec![1.0],
            0.0,
            Direction::Minimize,
            vec![true],
            &[(0, 0, 1.0)],
        )
        .unwrap();
        Basis::new(&p).unwrap()
    }

    #[test]
    fn test_apply_branch_tightens_range() {
        let mut b = basis_with_range();
        apply_branch(
            &mut b,
            &BranchFix {
                var: 1,
                dir: BranchDir::Up,
                value: 3.0,
            },
        );
        assert_eq!(b.kind[1], BoundKind::DoubleBounded);
        assert_eq!(b.lower[1], 3.0);
        assert_eq!(b.upper[1], 5.0);
        apply_branch(
            &mut b,
            &BranchFix {
                var: 1,
                dir: BranchDir::Down,
                value: 3.0,
            },
        );
        assert_eq!(b.kind[1], BoundKind::Fixed);
        assert_eq!(b.lower[1], 3.0);
        assert_eq!(b.upper[1], 3.0);
    }

    #[test]
    fn test_apply_branch_up_to_upper_bound_fixes() {
        let mut b = basis_with_range();
        apply_branch(
            &mut b,
            &BranchFix {
                var: 1,
                dir: BranchDir::Up,
                value: 5.0,
            },
        );
        assert_eq!(b.kind[1], BoundKind::Fixed);
        assert_eq!(b.lower[1], 5.0);
        assert_eq!(b.upper[1], 5.0);
    }

    #[test]
    fn test_unstable_dual_solve_recovers_via_primal() {
        // max 3x + 2y, x + y <= 3.5, x, y in {0..3}; fractional root
        let p = Problem::build(
            1,
            2,
            vec![
                Bounds::upper(3.5),
                Bounds::range(0.0, 3.0),
                Bounds::range(0.0, 3.0),
            ],
            vec![3.0, 2.0],
            0.0,
            Direction::Maximize,
            vec![true, true],
            &[(0, 0, 1.0), (0, 1, 1.0)],
        )
        .unwrap();
        let relaxation = solve_lp(&p, &LpSettings::default()).unwrap();
        let mut search = BranchAndBound::new(&p, &relaxation, MipSettings::default()).unwrap();
        let root_bound = search.tree.node(search.root).objective;
        // throw the optimal basis away: row variable basic, structural
        // columns at their lower bounds. Under maximization their reduced
        // costs are negative, so the dual method finds its invariant
        // broken and gives up.
        let unit: Vec<BasisTag> = (0..p.num_vars())
            .map(|k| {
                if k < p.num_rows {
                    BasisTag::Basic
                } else {
                    natural_tag(search.basis.kind[k])
                }
            })
            .collect();
        search.basis.set_statuses(&unit).unwrap();
        search.basis.reinvert().unwrap();
        let mut monitor = search.monitor(None);
        let out = dual_optimize(
            &mut search.basis,
            &search.obj,
            &search.settings.tolerances,
            true,
            true,
            Some(&mut monitor),
        )
        .unwrap();
        assert_eq!(out, SimplexOutcome::Unstable);
        // recovery replays the recorded state, refactorizes, and reruns
        // the two-phase primal method from there
        search.root_statuses = unit;
        let root = search.root;
        let out = search.recover(root).unwrap();
        assert_eq!(out, SimplexOutcome::Optimal);
        let mut bbar = vec![0.0; search.basis.num_rows];
        search.basis.eval_basics(&mut bbar);
        let obj = search.basis.eval_objective(&search.obj, &bbar);
        assert!((obj - root_bound).abs() < 1e-6);
    }

    #[test]
    fn test_search_monitor_cutoff() {
        let b = basis_with_range();
        let mut mon = SearchMonitor {
            iteration_limit: None,
            deadline: None,
            cutoff: Some(10.0),
            tol_obj: 1e-7,
        };
        // well below the incumbent: keep going
        assert_eq!(mon.poll(&b, 5.0), None);
        // at or above it: no improvement possible down this node
        assert_eq!(mon.poll(&b, 10.0), Some(StopReason::ObjectiveCutoff));
        assert_eq!(mon.poll(&b, 12.0), Some(StopReason::ObjectiveCutoff));
    }
}
