//! End-to-end branch-and-bound tests through the public interface.

use simplex_core::{Bounds, Direction, Problem};
use simplex_mip::{
    solve_mip, BacktrackRule, BranchRule, Goal, MipSettings, MipStatus, StopReason,
};

const VALUES: [f64; 5] = [10.0, 13.0, 7.0, 8.0, 6.0];
const WEIGHTS: [f64; 5] = [5.0, 6.0, 4.0, 5.0, 3.0];
const CAPACITY: f64 = 12.0;

/// max v.x, w.x <= 12, x binary.
fn knapsack() -> Problem {
    let mut bounds = vec![Bounds::upper(CAPACITY)];
    bounds.extend(std::iter::repeat(Bounds::range(0.0, 1.0)).take(5));
    let coefficients: Vec<(usize, usize, f64)> =
        WEIGHTS.iter().enumerate().map(|(j, &w)| (0, j, w)).collect();
    Problem::build(
        1,
        5,
        bounds,
        VALUES.to_vec(),
        0.0,
        Direction::Maximize,
        vec![true; 5],
        &coefficients,
    )
    .unwrap()
}

fn knapsack_best_by_enumeration() -> f64 {
    let mut best = f64::NEG_INFINITY;
    for mask in 0u32..32 {
        let mut weight = 0.0;
        let mut value = 0.0;
        for j in 0..5 {
            if mask & (1 << j) != 0 {
                weight += WEIGHTS[j];
                value += VALUES[j];
            }
        }
        if weight <= CAPACITY && value > best {
            best = value;
        }
    }
    best
}

#[test]
fn test_knapsack_matches_enumeration() {
    let sol = solve_mip(&knapsack(), &MipSettings::default()).unwrap();
    assert_eq!(sol.status, MipStatus::Optimal);
    assert!((sol.objective - knapsack_best_by_enumeration()).abs() < 1e-6);
    for j in 0..5 {
        let v = sol.values[1 + j];
        assert!((v - v.round()).abs() < 1e-6);
        assert!((-1e-9..=1.0 + 1e-9).contains(&v));
    }
    assert!(sol.nodes >= 1);
    assert!(sol.iterations > 0);
}

#[test]
fn test_all_rule_combinations_agree() {
    let expected = knapsack_best_by_enumeration();
    let branch_rules = [BranchRule::First, BranchRule::Last, BranchRule::Degradation];
    let backtrack_rules = [
        BacktrackRule::Fifo,
        BacktrackRule::Lifo,
        BacktrackRule::BestProjection,
    ];
    for &branch in &branch_rules {
        for &backtrack in &backtrack_rules {
            let settings = MipSettings::default()
                .with_branch_rule(branch)
                .with_backtrack_rule(backtrack);
            let sol = solve_mip(&knapsack(), &settings).unwrap();
            assert_eq!(sol.status, MipStatus::Optimal, "{:?}/{:?}", branch, backtrack);
            assert!(
                (sol.objective - expected).abs() < 1e-6,
                "{:?}/{:?} found {}",
                branch,
                backtrack,
                sol.objective
            );
        }
    }
}

#[test]
fn test_integer_infeasible_even_circuit() {
    // the row pins 2x to 3, so the relaxation has x = 1.5 and both
    // branches are infeasible
    let p = Problem::build(
        1,
        1,
        vec![Bounds::fixed(3.0), Bounds::range(0.0, 3.0)],
        vec![1.0],
        0.0,
        Direction::Minimize,
        vec![true],
        &[(0, 0, 2.0)],
    )
    .unwrap();
    let sol = solve_mip(&p, &MipSettings::default()).unwrap();
    assert_eq!(sol.status, MipStatus::NoIntegerFeasible);
    assert!(sol.nodes >= 1);
}

#[test]
fn test_lp_infeasible_reported_before_search() {
    let p = Problem::build(
        2,
        1,
        vec![Bounds::lower(4.0), Bounds::upper(1.0), Bounds::range(0.0, 9.0)],
        vec![1.0],
        0.0,
        Direction::Minimize,
        vec![true],
        &[(0, 0, 1.0), (1, 0, 1.0)],
    )
    .unwrap();
    let sol = solve_mip(&p, &MipSettings::default()).unwrap();
    assert_eq!(sol.status, MipStatus::Infeasible);
    assert_eq!(sol.nodes, 0);
}

#[test]
fn test_mixed_integer_and_continuous() {
    // max 3x + 2y + z, x + y + z <= 4.7, x, y in {0..3} integer,
    // z in [0, 1.7] continuous; optimum x = 3, y = 1, z = 0.7
    let p = Problem::build(
        1,
        3,
        vec![
            Bounds::upper(4.7),
            Bounds::range(0.0, 3.0),
            Bounds::range(0.0, 3.0),
            Bounds::range(0.0, 1.7),
        ],
        vec![3.0, 2.0, 1.0],
        0.0,
        Direction::Maximize,
        vec![true, true, false],
        &[(0, 0, 1.0), (0, 1, 1.0), (0, 2, 1.0)],
    )
    .unwrap();
    let sol = solve_mip(&p, &MipSettings::default()).unwrap();
    assert_eq!(sol.status, MipStatus::Optimal);
    assert!((sol.objective - 11.7).abs() < 1e-6);
    assert!((sol.values[1] - 3.0).abs() < 1e-6);
    assert!((sol.values[2] - 1.0).abs() < 1e-6);
    assert!((sol.values[3] - 0.7).abs() < 1e-6);
}

#[test]
fn test_minimize_with_constant() {
    // min x + y - 1, x + y >= 3.5, x, y >= 0 integer; optimum 4 - 1 = 3
    let p = Problem::build(
        1,
        2,
        vec![Bounds::lower(3.5), Bounds::lower(0.0), Bounds::lower(0.0)],
        vec![1.0, 1.0],
        -1.0,
        Direction::Minimize,
        vec![true, true],
        &[(0, 0, 1.0), (0, 1, 1.0)],
    )
    .unwrap();
    let sol = solve_mip(&p, &MipSettings::default()).unwrap();
    assert_eq!(sol.status, MipStatus::Optimal);
    assert!((sol.objective - 3.0).abs() < 1e-6);
}

#[test]
fn test_first_feasible_goal_stops_early() {
    let settings = MipSettings::default().with_goal(Goal::FirstFeasible);
    let sol = solve_mip(&knapsack(), &settings).unwrap();
    assert_eq!(sol.status, MipStatus::Feasible);
    // integer feasible, but not necessarily optimal
    let mut weight = 0.0;
    for j in 0..5 {
        let v = sol.values[1 + j];
        assert!((v - v.round()).abs() < 1e-6);
        weight += WEIGHTS[j] * v;
    }
    assert!(weight <= CAPACITY + 1e-6);
    assert!(sol.objective <= knapsack_best_by_enumeration() + 1e-6);
}

#[test]
fn test_relaxed_only_goal() {
    let settings = MipSettings::default().with_goal(Goal::RelaxedOnly);
    let sol = solve_mip(&knapsack(), &settings).unwrap();
    assert_eq!(sol.status, MipStatus::RelaxedOptimal);
    assert_eq!(sol.nodes, 1);
    // the relaxation bound dominates every integer solution
    assert!(sol.objective >= knapsack_best_by_enumeration() - 1e-6);
}

#[test]
fn test_iteration_limit_carries_stop_cause() {
    let settings = MipSettings::default().with_iteration_limit(0);
    let sol = solve_mip(&knapsack(), &settings).unwrap();
    assert_eq!(sol.status, MipStatus::Stopped(StopReason::IterationLimit));
    assert!(!sol.status.is_integer_feasible());
}

#[test]
fn test_time_limit_carries_stop_cause() {
    let settings = MipSettings::default().with_time_limit(std::time::Duration::ZERO);
    let sol = solve_mip(&knapsack(), &settings).unwrap();
    assert_eq!(sol.status, MipStatus::Stopped(StopReason::TimeLimit));
}

#[test]
fn test_root_already_integral() {
    // the relaxation optimum is integral, so the search ends at the root
    let p = Problem::build(
        1,
        2,
        vec![Bounds::upper(4.0), Bounds::range(0.0, 2.0), Bounds::range(0.0, 2.0)],
        vec![2.0, 1.0],
        0.0,
        Direction::Maximize,
        vec![true, true],
        &[(0, 0, 1.0), (0, 1, 1.0)],
    )
    .unwrap();
    let sol = solve_mip(&p, &MipSettings::default()).unwrap();
    assert_eq!(sol.status, MipStatus::Optimal);
    assert!((sol.objective - 6.0).abs() < 1e-6);
    assert_eq!(sol.nodes, 1);
}
