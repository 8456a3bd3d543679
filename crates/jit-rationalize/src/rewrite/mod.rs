//! Node rewrite rules for the linear walk.
//!
//! Each rule sees the node through its [`Use`] with every operand already
//! rewritten. Rules replace the node through the use (which also repoints
//! call argument tables) and unlink what they discard from the block range.

mod address;
mod assignment;
mod intrinsic;
mod simd;

use jit_ir::{NodeFlags, NodeId, Oper, Use, VarType};
use tracing::debug;

use crate::rationalizer::Rationalizer;
use crate::stack::AncestorStack;
use crate::{RationalizeError, Result};

impl<'a> Rationalizer<'a> {
    pub(crate) fn rewrite_node(&mut self, use_: &mut Use, stack: &AncestorStack) -> Result<()> {
        let node = use_.def();
        let is_late_arg = self.func.node(node).flags.contains(NodeFlags::LATE_ARG);

        // Argument lists are linked after their elements; drop any that
        // precede this node.
        self.prune_preceding_lists(node)?;

        let current = self.func.node(node);
        if current.oper == Oper::List {
            if current.is_non_aggregate_list() && current.is_linked() {
                self.range().remove(node)?;
            }
            return Ok(());
        }

        match current.oper {
            Oper::Asg => self.rewrite_assignment(use_, stack)?,

            Oper::Box => {
                let op1 = self.operand(node, 0)?;
                self.replace_use(use_, stack, op1)?;
                self.range().remove(node)?;
            }

            Oper::Addr => self.rewrite_address(use_, stack)?,

            Oper::Nop => {
                if let Some(op1) = current.op1() {
                    self.replace_use(use_, stack, op1)?;
                    self.range().remove(node)?;
                }
            }

            Oper::Comma => self.rewrite_comma(use_, stack)?,

            Oper::ArgPlace if current.is_linked() => self.range().remove(node)?,

            Oper::ClsVar if self.target.arch().is_xarch() => {
                self.rewrite_cls_var_read(use_, stack)?
            }

            Oper::Intrinsic => {
                if let Some(data) = current.intrinsic() {
                    if !self.target.is_target_intrinsic(data.id) {
                        return Err(RationalizeError::NonTargetIntrinsic {
                            node,
                            intrinsic: data.id,
                        });
                    }
                }
            }

            Oper::Blk | Oper::Obj if self.target.supports_simd() => {
                self.rewrite_blk_operand(use_, stack)?
            }

            Oper::LclFld | Oper::StoreLclFld => self.fixup_if_simd_local(node)?,

            Oper::Simd => self.rewrite_simd_node(use_, stack)?,

            _ => {}
        }

        // A local read whose value nobody consumes is dead.
        if use_.is_dummy_use() && self.func.node(node).oper.is_local_read() {
            if self.func.node(node).flags.has_side_effects() {
                return Err(RationalizeError::EffectfulLocalRead(node));
            }
            debug!(%node, "removing unused local read");
            self.func.dec_ref_count(node);
            self.range().remove(node)?;
        }

        debug_assert_eq!(
            is_late_arg,
            self.func.node(node).flags.contains(NodeFlags::LATE_ARG),
            "late argument flag changed on {node}"
        );
        Ok(())
    }

    fn prune_preceding_lists(&mut self, node: NodeId) -> Result<()> {
        while let Some(prev) = self.func.node(node).prev {
            if !self.func.node(prev).is_non_aggregate_list() {
                break;
            }
            self.range().remove(prev)?;
        }
        Ok(())
    }

    /// `COMMA(a, b)`: drop `a` when it is pure, then let `b` take the comma's
    /// place. At the top level a pure `b` goes too.
    fn rewrite_comma(&mut self, use_: &mut Use, stack: &AncestorStack) -> Result<()> {
        let node = use_.def();
        let op1 = self.operand(node, 0)?;
        let op2 = self.operand(node, 1)?;

        if !self.func.node(op1).flags.has_side_effects() {
            self.delete_pure_tree(op1)?;
        }

        if !use_.is_dummy_use() {
            self.replace_use(use_, stack, op2)?;
        } else if !self.func.node(op2).flags.has_side_effects() {
            self.delete_pure_tree(op2)?;
        }

        self.range().remove(node)?;
        debug!(%node, "removed COMMA");
        Ok(())
    }

    fn delete_pure_tree(&mut self, root: NodeId) -> Result<()> {
        let tree = self.func.tree_range(root)?;
        if !tree.closed || tree.side_effects.has_side_effects() {
            return Err(RationalizeError::RangeNotDeletable {
                root,
                closed: tree.closed,
                side_effects: tree.side_effects.has_side_effects(),
            });
        }
        self.range().delete(tree.range)?;
        Ok(())
    }

    /// Static reads become `IND(CLS_VAR_ADDR)` unless they are the
    /// destination of an assignment, which the assignment rule handles.
    fn rewrite_cls_var_read(&mut self, use_: &mut Use, stack: &AncestorStack) -> Result<()> {
        let node = use_.def();
        let is_destination = use_.user().is_some_and(|user| {
            let user = self.func.node(user);
            user.oper == Oper::Asg && user.op1() == Some(node)
        });
        if is_destination {
            return Ok(());
        }

        let ty = self.func.node(node).ty;
        let ind = self.func.ind(ty, node);
        let flags = &mut self.func.node_mut(ind).flags;
        flags.remove(NodeFlags::EXCEPT);
        flags.insert(NodeFlags::IND_NONFAULTING);

        let addr = self.func.node_mut(node);
        addr.set_oper(Oper::ClsVarAddr);
        addr.ty = VarType::Byref;

        self.range().insert_after(node, ind)?;
        self.replace_use(use_, stack, ind)?;
        debug!(%node, %ind, "rewrote CLS_VAR to IND(CLS_VAR_ADDR)");
        Ok(())
    }
}
