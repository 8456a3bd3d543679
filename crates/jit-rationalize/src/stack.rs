//! The ancestor stack of the post-order walk.
//!
//! The top is the node being visited, below it its user, and so on down to
//! the statement root. Rules query the stack instead of holding parent links.

use jit_ir::NodeId;

#[derive(Debug, Clone, Default)]
pub struct AncestorStack {
    nodes: Vec<NodeId>,
}

impl AncestorStack {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, node: NodeId) {
        self.nodes.push(node);
    }

    pub fn pop(&mut self) -> Option<NodeId> {
        self.nodes.pop()
    }

    /// Swap the current node for its replacement.
    pub fn replace_top(&mut self, node: NodeId) {
        if let Some(top) = self.nodes.last_mut() {
            *top = node;
        }
    }

    /// Every node above the current one, nearest first.
    pub fn ancestors(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.nodes.iter().rev().skip(1).copied()
    }
}
