use jit_ir::{IrError, NodeData, NodeFlags, NodeId, Oper, SimdIntrinsicId, Use, VarType};
use tracing::debug;

use crate::rationalizer::Rationalizer;
use crate::stack::AncestorStack;
use crate::{RationalizeError, Result};

impl<'a> Rationalizer<'a> {
    /// Whether `asg` initializes an aggregate from a constant.
    pub(crate) fn is_init_blk_op(&self, asg: NodeId) -> bool {
        let node = self.func.node(asg);
        let (Some(location), Some(value)) = (node.op1(), node.op2()) else {
            return false;
        };
        node.oper == Oper::Asg
            && self.func.node(location).ty.is_struct()
            && (self.func.node(value).oper.is_const() || node.flags.contains(NodeFlags::BLK_INIT))
    }

    /// Lower `ASG(location, value)` to the store matching the location.
    pub(crate) fn rewrite_assignment(&mut self, use_: &mut Use, stack: &AncestorStack) -> Result<()> {
        let asg = use_.def();
        let location = self.operand(asg, 0)?;
        let mut value = self.operand(asg, 1)?;
        let location_oper = self.func.node(location).oper;
        let location_ty = self.func.node(location).ty;

        if self.target.supports_simd() && location_ty.is_simd() && self.is_init_blk_op(asg) {
            if location_oper == Oper::LclVar {
                if let Some(base) = self.func.simd_base_type_of_local(location) {
                    let init = self.func.simd(
                        SimdIntrinsicId::Init,
                        location_ty,
                        base,
                        location_ty.size(),
                        vec![value],
                    );
                    self.func.node_mut(asg).operands[1] = init;
                    self.range().insert_after(value, init)?;
                    value = init;
                }
            } else if !location_oper.is_blk() {
                return Err(RationalizeError::UnexpectedSimdInitTarget {
                    asg,
                    oper: location_oper,
                });
            }
        }

        match location_oper {
            Oper::LclVar | Oper::LclFld => {
                self.rewrite_assignment_into_store_lcl(asg, location, value)?;
                self.range().remove(location)?;
            }

            Oper::Ind => {
                let addr = self.operand(location, 0)?;
                let store = self
                    .func
                    .new_node(Oper::StoreInd, location_ty, vec![addr, value], NodeData::None);

                let asg_flags = self.func.node(asg).flags;
                let location_flags = self.func.node(location).flags;
                let flags = &mut self.func.node_mut(store).flags;
                flags.copy_masked(asg_flags, NodeFlags::ALL_EFFECT);
                flags.copy_masked(location_flags, NodeFlags::IND_FLAGS);
                if asg_flags.contains(NodeFlags::REVERSE_OPS) {
                    flags.insert(NodeFlags::REVERSE_OPS);
                }

                self.range().remove(location)?;
                self.range().replace(asg, store)?;
                self.replace_use(use_, stack, store)?;
                debug!(%asg, %store, "rewrote ASG(IND(x), y) to STOREIND(x, y)");
            }

            Oper::ClsVar => {
                let addr = self.func.node_mut(location);
                addr.set_oper(Oper::ClsVarAddr);
                addr.ty = VarType::Byref;
                self.func.node_mut(asg).set_oper(Oper::StoreInd);
                debug!(%asg, "rewrote ASG(CLS_VAR, y) to STOREIND(CLS_VAR_ADDR, y)");
            }

            Oper::Blk | Oper::Obj | Oper::DynBlk => {
                if !location_ty.is_struct() {
                    return Err(RationalizeError::UnexpectedAssignmentTarget {
                        asg,
                        oper: location_oper,
                    });
                }
                let store_oper = location_oper
                    .blk_store_form()
                    .ok_or(IrError::NoStoreForm(location_oper))?;
                let carried = self.func.node(asg).flags
                    & (NodeFlags::ALL_EFFECT
                        | NodeFlags::REVERSE_OPS
                        | NodeFlags::BLK_VOLATILE
                        | NodeFlags::BLK_UNALIGNED
                        | NodeFlags::BLK_INIT
                        | NodeFlags::DONT_CSE);

                let store = self.func.node_mut(location);
                store.set_oper(store_oper);
                store.flags.remove(NodeFlags::DONT_CSE);
                store.flags |= carried;
                // Value goes after the address; a dynamic size stays last.
                store.operands.insert(1, value);

                // The store must follow its value.
                self.range().remove(location)?;
                self.range().replace(asg, location)?;
                self.replace_use(use_, stack, location)?;
                debug!(%asg, "rewrote ASG({}(x), y) to {}(x, y)", location_oper, store_oper);
            }

            oper => {
                return Err(RationalizeError::UnexpectedAssignmentTarget { asg, oper });
            }
        }

        Ok(())
    }

    /// Retag the assignment itself as a local store, taking over the
    /// destination's local, type and liveness flags.
    fn rewrite_assignment_into_store_lcl(
        &mut self,
        asg: NodeId,
        location: NodeId,
        value: NodeId,
    ) -> Result<()> {
        let var = self.func.node(location);
        let store_oper = var.oper.store_form().ok_or(IrError::NoStoreForm(var.oper))?;
        let Some(local) = var.local().cloned() else {
            return Err(RationalizeError::UnexpectedAssignmentTarget {
                asg,
                oper: var.oper,
            });
        };
        let var_flags = var.flags;
        let var_ty = var.ty;
        let location_oper = var.oper;

        let store = self.func.node_mut(asg);
        store.set_oper(store_oper);
        store.data = NodeData::Local(local);
        store.flags.copy_masked(var_flags, NodeFlags::LIVENESS_MASK);
        store.flags.remove(NodeFlags::REVERSE_OPS);
        store.ty = var_ty;
        store.operands = vec![value];

        debug!(%asg, "rewrote ASG({}, x) to {}(x)", location_oper, store_oper);
        Ok(())
    }
}
