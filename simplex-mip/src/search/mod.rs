//! Branch-and-bound search tree.

mod node;
mod tree;

pub use node::{BranchDir, BranchFix, NodeId, SearchNode};
pub use tree::SearchTree;
