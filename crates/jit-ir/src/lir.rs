//! Editing a block's linear node range.
//!
//! Once a block is linear its nodes form one doubly linked list bounded by
//! the block's `first`/`last`. All link surgery goes through [`LirRange`],
//! which keeps the links, the block bounds and each node's `linked` state in
//! agreement; misuse is reported as an [`IrError`] instead of corrupting the
//! list.

use rustc_hash::FxHashSet;

use crate::flags::NodeFlags;
use crate::function::{BlockId, IrFunction};
use crate::node::NodeId;
use crate::{IrError, Result};

/// An inclusive run of linked nodes, `first..=last`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadOnlyRange {
    pub first: NodeId,
    pub last: NodeId,
}

/// The linked nodes of a tree, located within a linear range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TreeRange {
    pub range: ReadOnlyRange,
    /// No foreign node sits between `first` and `last`
    pub closed: bool,
    /// Union of the effect flags of every node in the tree
    pub side_effects: NodeFlags,
}

/// Mutable view over one linear block.
pub struct LirRange<'f> {
    func: &'f mut IrFunction,
    block: BlockId,
}

impl IrFunction {
    /// Open the linear range of `block` for editing.
    pub fn range(&mut self, block: BlockId) -> LirRange<'_> {
        LirRange { func: self, block }
    }

    /// The nodes of a linear block in order.
    pub fn lir_nodes(&self, block: BlockId) -> Result<Vec<NodeId>> {
        let bounds = self.lir_bounds(block)?;
        let mut nodes = Vec::new();
        let mut cur = bounds.first;
        while let Some(id) = cur {
            if nodes.len() > self.node_count() {
                return Err(IrError::UnterminatedRange(id));
            }
            nodes.push(id);
            if Some(id) == bounds.last {
                break;
            }
            cur = self.node(id).next;
        }
        Ok(nodes)
    }

    /// Locate the linked part of the tree rooted at `root` by walking
    /// backwards from the root, which is always its last node.
    pub fn tree_range(&self, root: NodeId) -> Result<TreeRange> {
        if !self.node(root).is_linked() {
            return Err(IrError::NotLinked(root));
        }

        let mut members = FxHashSet::default();
        let mut stack = vec![root];
        while let Some(id) = stack.pop() {
            let node = self.node(id);
            if node.is_linked() {
                members.insert(id);
            }
            stack.extend(node.operands.iter().copied());
        }

        let mut remaining = members.len();
        let mut side_effects = NodeFlags::empty();
        let mut closed = true;
        let mut first = root;
        let mut cur = Some(root);
        while remaining > 0 {
            let id = cur.ok_or(IrError::UnterminatedRange(root))?;
            if members.contains(&id) {
                remaining -= 1;
                side_effects |= self.node(id).flags.effects();
                first = id;
            } else {
                closed = false;
            }
            cur = self.node(id).prev;
        }

        Ok(TreeRange {
            range: ReadOnlyRange { first, last: root },
            closed,
            side_effects,
        })
    }
}

impl<'f> LirRange<'f> {
    pub fn block(&self) -> BlockId {
        self.block
    }

    fn check_unlinked(&self, node: NodeId) -> Result<()> {
        if self.func.node(node).is_linked() {
            Err(IrError::AlreadyLinked(node))
        } else {
            Ok(())
        }
    }

    fn check_linked(&self, node: NodeId) -> Result<()> {
        if self.func.node(node).is_linked() {
            Ok(())
        } else {
            Err(IrError::NotLinked(node))
        }
    }

    /// Link an unlinked `node` immediately before `anchor`.
    pub fn insert_before(&mut self, anchor: NodeId, node: NodeId) -> Result<()> {
        let bounds = self.func.lir_bounds(self.block)?;
        self.check_linked(anchor)?;
        self.check_unlinked(node)?;

        let prev = self.func.node(anchor).prev;
        if prev.is_none() && bounds.first != Some(anchor) {
            return Err(IrError::NotInBlock(anchor, self.block));
        }

        let n = self.func.node_mut(node);
        n.prev = prev;
        n.next = Some(anchor);
        n.linked = true;
        self.func.node_mut(anchor).prev = Some(node);
        match prev {
            Some(p) => self.func.node_mut(p).next = Some(node),
            None => self.func.lir_bounds_mut(self.block)?.first = Some(node),
        }
        Ok(())
    }

    /// Link an unlinked `node` immediately after `anchor`.
    pub fn insert_after(&mut self, anchor: NodeId, node: NodeId) -> Result<()> {
        let bounds = self.func.lir_bounds(self.block)?;
        self.check_linked(anchor)?;
        self.check_unlinked(node)?;

        let next = self.func.node(anchor).next;
        if next.is_none() && bounds.last != Some(anchor) {
            return Err(IrError::NotInBlock(anchor, self.block));
        }

        let n = self.func.node_mut(node);
        n.prev = Some(anchor);
        n.next = next;
        n.linked = true;
        self.func.node_mut(anchor).next = Some(node);
        match next {
            Some(s) => self.func.node_mut(s).prev = Some(node),
            None => self.func.lir_bounds_mut(self.block)?.last = Some(node),
        }
        Ok(())
    }

    /// Link an unlinked `node` at the end of the block.
    pub fn push_back(&mut self, node: NodeId) -> Result<()> {
        match self.func.lir_bounds(self.block)?.last {
            Some(last) => self.insert_after(last, node),
            None => {
                self.check_unlinked(node)?;
                let n = self.func.node_mut(node);
                n.prev = None;
                n.next = None;
                n.linked = true;
                let bounds = self.func.lir_bounds_mut(self.block)?;
                bounds.first = Some(node);
                bounds.last = Some(node);
                Ok(())
            }
        }
    }

    /// Unlink a single node. Its operands are untouched.
    pub fn remove(&mut self, node: NodeId) -> Result<()> {
        let bounds = self.func.lir_bounds(self.block)?;
        self.check_linked(node)?;

        let (prev, next) = {
            let n = self.func.node(node);
            (n.prev, n.next)
        };
        if (prev.is_none() && bounds.first != Some(node))
            || (next.is_none() && bounds.last != Some(node))
        {
            return Err(IrError::NotInBlock(node, self.block));
        }

        match prev {
            Some(p) => self.func.node_mut(p).next = next,
            None => self.func.lir_bounds_mut(self.block)?.first = next,
        }
        match next {
            Some(s) => self.func.node_mut(s).prev = prev,
            None => self.func.lir_bounds_mut(self.block)?.last = prev,
        }

        let n = self.func.node_mut(node);
        n.prev = None;
        n.next = None;
        n.linked = false;
        Ok(())
    }

    /// Put an unlinked `new` where the linked `old` sits and unlink `old`.
    pub fn replace(&mut self, old: NodeId, new: NodeId) -> Result<()> {
        self.insert_before(old, new)?;
        self.remove(old)
    }

    /// Unlink every node of `range`, dropping the local references the
    /// removed nodes held.
    pub fn delete(&mut self, range: ReadOnlyRange) -> Result<()> {
        let bounds = self.func.lir_bounds(self.block)?;
        self.check_linked(range.first)?;

        let mut nodes = Vec::new();
        let mut cur = range.first;
        loop {
            nodes.push(cur);
            if cur == range.last {
                break;
            }
            cur = self
                .func
                .node(cur)
                .next
                .ok_or(IrError::UnterminatedRange(range.first))?;
        }

        let prev = self.func.node(range.first).prev;
        let next = self.func.node(range.last).next;
        if (prev.is_none() && bounds.first != Some(range.first))
            || (next.is_none() && bounds.last != Some(range.last))
        {
            return Err(IrError::NotInBlock(range.first, self.block));
        }

        match prev {
            Some(p) => self.func.node_mut(p).next = next,
            None => self.func.lir_bounds_mut(self.block)?.first = next,
        }
        match next {
            Some(s) => self.func.node_mut(s).prev = prev,
            None => self.func.lir_bounds_mut(self.block)?.last = prev,
        }

        for id in nodes {
            if self.func.node(id).local().is_some() {
                self.func.dec_ref_count(id);
            }
            let n = self.func.node_mut(id);
            n.prev = None;
            n.next = None;
            n.linked = false;
        }
        Ok(())
    }
}
