//! Search node representation.

use simplex_core::BasisTag;

/// Index of a node in the [`SearchTree`](super::SearchTree) arena.
pub type NodeId = usize;

/// Which side of a fractional value a branch takes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BranchDir {
    /// `x <= floor(beta)`: the variable gets a new upper bound.
    Down,
    /// `x >= ceil(beta)`: the variable gets a new lower bound.
    Up,
}

/// The single bound a node adds on top of its parent.
#[derive(Debug, Clone, Copy)]
pub struct BranchFix {
    /// Variable index in the expanded numbering.
    pub var: usize,
    pub dir: BranchDir,
    /// The new bound value (already floored or ceiled).
    pub value: f64,
}

/// A subproblem of the search.
///
/// A node stores only what cannot be rebuilt from its ancestors: the one
/// branching bound it adds, and the basis-status entries that differ from
/// its parent's when it was suspended. Everything else is replayed along
/// the root path when the node is revived.
#[derive(Debug, Clone)]
pub struct SearchNode {
    pub parent: Option<NodeId>,
    pub depth: usize,

    /// Live children still in the tree.
    pub children: usize,

    /// Branching bound this node adds (`None` for the root).
    pub branch: Option<BranchFix>,

    /// Basis statuses that differ from the parent's, recorded when the
    /// node was suspended after being solved.
    pub diff: Vec<(usize, BasisTag)>,

    /// Relaxation objective, in minimization sense over the expanded
    /// objective. Meaningful once `solved` is set.
    pub objective: f64,

    /// Sum of integer infeasibilities of the relaxation solution.
    pub infsum: f64,

    pub solved: bool,
}

impl SearchNode {
    /// Fresh root subproblem.
    pub fn root() -> Self {
        Self {
            parent: None,
            depth: 0,
            children: 0,
            branch: None,
            diff: Vec::new(),
            objective: f64::NEG_INFINITY,
            infsum: 0.0,
            solved: false,
        }
    }

    /// Fresh child of `parent` adding the given branching bound.
    pub fn child(parent: NodeId, depth: usize, branch: BranchFix) -> Self {
        Self {
            parent: Some(parent),
            depth,
            children: 0,
            branch: Some(branch),
            diff: Vec::new(),
            objective: f64::NEG_INFINITY,
            infsum: 0.0,
            solved: false,
        }
    }
}
