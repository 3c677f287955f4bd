//! Arena-backed search tree with an explicit list of unsolved nodes.
//!
//! Node slots are reused through a free list, so node ids are only valid
//! while the node is live. Interior nodes (already branched) are kept as
//! long as they have live children: revival replays the root path, which
//! must stay intact. Removing a leaf therefore also removes every ancestor
//! that becomes childless.

use std::collections::VecDeque;

use super::node::{BranchDir, BranchFix, NodeId, SearchNode};

/// The branch-and-bound tree.
pub struct SearchTree {
    slots: Vec<Option<SearchNode>>,
    free: Vec<NodeId>,

    /// Unsolved leaves, in creation order (front is oldest).
    pub active: VecDeque<NodeId>,

    /// Live nodes currently in the arena.
    pub live: usize,

    /// Subproblems solved over the lifetime of the tree.
    pub solved_total: u64,
}

impl SearchTree {
    /// Empty tree holding just the root node.
    pub fn new() -> (Self, NodeId) {
        let mut tree = Self {
            slots: Vec::new(),
            free: Vec::new(),
            active: VecDeque::new(),
            live: 0,
            solved_total: 0,
        };
        let root = tree.insert(SearchNode::root());
        (tree, root)
    }

    fn insert(&mut self, node: SearchNode) -> NodeId {
        self.live += 1;
        match self.free.pop() {
            Some(id) => {
                self.slots[id] = Some(node);
                id
            }
            None => {
                self.slots.push(Some(node));
                self.slots.len() - 1
            }
        }
    }

    /// Borrow a live node.
    pub fn node(&self, id: NodeId) -> &SearchNode {
        match self.slots[id].as_ref() {
            Some(node) => node,
            None => unreachable!("reference to a removed search node"),
        }
    }

    /// Mutably borrow a live node.
    pub fn node_mut(&mut self, id: NodeId) -> &mut SearchNode {
        match self.slots[id].as_mut() {
            Some(node) => node,
            None => unreachable!("reference to a removed search node"),
        }
    }

    /// Branch the solved node `parent` on variable `var` with fractional
    /// value `beta`. The up child (`var >= ceil(beta)`) is created first,
    /// then the down child; both join the back of the active list. Returns
    /// `(up, down)`.
    pub fn split(&mut self, parent: NodeId, var: usize, beta: f64) -> (NodeId, NodeId) {
        let depth = self.node(parent).depth + 1;
        let up = self.insert(SearchNode::child(
            parent,
            depth,
            BranchFix {
                var,
                dir: BranchDir::Up,
                value: beta.ceil(),
            },
        ));
        let down = self.insert(SearchNode::child(
            parent,
            depth,
            BranchFix {
                var,
                dir: BranchDir::Down,
                value: beta.floor(),
            },
        ));
        self.node_mut(parent).children = 2;
        self.active.push_back(up);
        self.active.push_back(down);
        (up, down)
    }

    /// Remove a node from the active list (it is about to be processed or
    /// discarded).
    pub fn deactivate(&mut self, id: NodeId) {
        self.active.retain(|&a| a != id);
    }

    /// Delete a node, plus every ancestor left childless by the deletion.
    /// The node must already be off the active list.
    pub fn remove(&mut self, id: NodeId) {
        let mut cur = Some(id);
        while let Some(i) = cur {
            let parent = match self.slots[i].take() {
                Some(node) => node.parent,
                None => unreachable!("removal of an already removed node"),
            };
            self.free.push(i);
            self.live -= 1;
            cur = parent.filter(|&p| {
                let pn = self.node_mut(p);
                pn.children -= 1;
                pn.children == 0
            });
        }
    }

    /// Drop every active node whose parent's relaxation bound is judged
    /// dominated. `dominated` receives the parent's objective.
    pub fn purge<F: Fn(f64) -> bool>(&mut self, dominated: F) {
        let ids: Vec<NodeId> = self.active.iter().copied().collect();
        for id in ids {
            let parent_obj = match self.node(id).parent {
                Some(p) => self.node(p).objective,
                None => continue,
            };
            if dominated(parent_obj) {
                self.deactivate(id);
                self.remove(id);
            }
        }
    }

    /// Node ids from the root down to `id`, inclusive.
    pub fn path(&self, id: NodeId) -> Vec<NodeId> {
        let mut path = vec![id];
        let mut cur = id;
        while let Some(parent) = self.node(cur).parent {
            path.push(parent);
            cur = parent;
        }
        path.reverse();
        path
    }
}
