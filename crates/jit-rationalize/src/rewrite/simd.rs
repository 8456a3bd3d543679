//! Vector value canonicalization. Only reached when the target has vector
//! support enabled.

use jit_ir::{
    round_up, FieldSeq, IrError, NodeData, NodeFlags, NodeId, Oper, PromotionType,
    SimdIntrinsicId, Use, VarType, ARRAY_ELEMS_OFFSET, TARGET_POINTER_SIZE,
};
use tracing::debug;

use crate::rationalizer::Rationalizer;
use crate::stack::AncestorStack;
use crate::{RationalizeError, Result};

impl<'a> Rationalizer<'a> {
    /// `BLK`/`OBJ` in value position. The node stays a block when it is the
    /// destination of a plain struct copy, an initialization, or a copy where
    /// neither side is known to be a vector local.
    pub(crate) fn rewrite_blk_operand(&mut self, use_: &mut Use, stack: &AncestorStack) -> Result<()> {
        let node = use_.def();
        let mut keep_blk = false;

        if let Some(parent) = use_.user() {
            let parent_node = self.func.node(parent);
            if parent_node.oper == Oper::Asg && parent_node.op1() == Some(node) {
                let addr = self.operand(node, 0)?;
                if self.func.node(node).ty == VarType::Struct || self.is_init_blk_op(parent) {
                    keep_blk = true;
                } else if !self.func.is_addr_of_simd_type(addr) {
                    let src = self.operand(parent, 1)?;
                    let src_oper = self.func.node(src).oper;
                    if !src_oper.is_local() && src_oper != Oper::Simd {
                        if !src_oper.is_indir() {
                            return Err(RationalizeError::UnexpectedSimdSource {
                                node: src,
                                oper: src_oper,
                            });
                        }
                        let src_addr = self.operand(src, 0)?;
                        keep_blk = !self.func.is_addr_of_simd_type(src_addr);
                    }
                }
            }
        }

        self.rewrite_simd_operand(use_, stack, keep_blk)
    }

    /// A vector-typed indirection of a vector local's address becomes a read
    /// of the local; any other becomes a plain `IND` unless `keep_blk`.
    pub(crate) fn rewrite_simd_operand(
        &mut self,
        use_: &mut Use,
        stack: &AncestorStack,
        keep_blk: bool,
    ) -> Result<()> {
        if !self.target.supports_simd() {
            return Ok(());
        }

        let tree = use_.def();
        let node = self.func.node(tree);
        if !node.oper.is_indir() || !node.ty.is_simd() {
            return Ok(());
        }
        let simd_ty = node.ty;
        let addr = self.operand(tree, 0)?;
        let addr_oper = self.func.node(addr).oper;

        if addr_oper.is_local_addr() && self.func.is_addr_of_simd_type(addr) {
            let load = addr_oper.load_form().ok_or(IrError::NoLoadForm(addr_oper))?;
            self.range().remove(tree)?;

            let local = self.func.node_mut(addr);
            local.set_oper(load);
            local.ty = simd_ty;
            self.replace_use(use_, stack, addr)?;
            debug!(%tree, %addr, "rewrote vector indirection as {}", load);
        } else if !keep_blk {
            let ind = self.func.node_mut(tree);
            ind.set_oper(Oper::Ind);
            ind.ty = simd_ty;
            ind.data = NodeData::None;
        }
        Ok(())
    }

    /// Field accesses into vector locals: a pointer-sized access of the whole
    /// local becomes a whole-local access, then the node takes the local's
    /// vector type.
    pub(crate) fn fixup_if_simd_local(&mut self, node: NodeId) -> Result<()> {
        if !self.target.supports_simd() {
            return Ok(());
        }
        let Some(local) = self.func.node(node).local().cloned() else {
            return Ok(());
        };
        let dsc = self.func.local(local.lcl_num);
        if !dsc.is_simd() {
            return Ok(());
        }
        let exact_size = dsc.exact_size;
        let independent = dsc.promotion == PromotionType::Independent;

        let n = self.func.node(node);
        match n.oper {
            Oper::LclFld => {
                let whole_local = local.field_seq == FieldSeq::NotAField
                    && local.offset == 0
                    && n.ty == VarType::IImpl
                    && exact_size == TARGET_POINTER_SIZE;
                if !whole_local {
                    if independent {
                        return Err(RationalizeError::IllegalSimdFieldAccess {
                            node,
                            lcl: local.lcl_num,
                        });
                    }
                    return Ok(());
                }
                let n = self.func.node_mut(node);
                n.set_oper(Oper::LclVar);
                n.flags.remove(NodeFlags::VAR_USEASG);
            }
            Oper::StoreLclFld => {
                if n.ty != VarType::IImpl {
                    return Err(RationalizeError::IllegalSimdFieldStore { node, ty: n.ty });
                }
                let n = self.func.node_mut(node);
                n.set_oper(Oper::StoreLclVar);
                n.flags.remove(NodeFlags::VAR_USEASG);
            }
            _ => {}
        }

        let size = round_up(exact_size, TARGET_POINTER_SIZE);
        let ty = VarType::simd_for_size(size).ok_or(RationalizeError::NoSimdType { node, size })?;
        self.func.node_mut(node).ty = ty;
        Ok(())
    }

    /// `SIMD` nodes: pointer-sized returns get the 8-byte vector type, array
    /// initialization becomes an explicit load, and aggregate-typed operands
    /// take the node's vector type.
    pub(crate) fn rewrite_simd_node(&mut self, use_: &mut Use, stack: &AncestorStack) -> Result<()> {
        let node = use_.def();
        if !self.target.supports_simd() {
            return Err(RationalizeError::SimdNotSupported(node));
        }

        let n = self.func.node(node);
        let Some(simd) = n.simd().cloned() else {
            return Err(RationalizeError::ForbiddenOperator { node, oper: n.oper });
        };
        let simd_ty = VarType::simd_for_size(simd.size).ok_or(RationalizeError::NoSimdType {
            node,
            size: simd.size,
        })?;

        if n.ty == VarType::IImpl && simd.size == TARGET_POINTER_SIZE {
            // Only two-element vectors of 4-byte lanes come back this way.
            if simd.base_type.size() != 4 {
                return Err(RationalizeError::BadSimdBaseType {
                    node,
                    base: simd.base_type,
                });
            }
            self.func.node_mut(node).ty = VarType::Simd8;
        }

        if simd.intrinsic == SimdIntrinsicId::InitArray {
            let array = self.operand(node, 0)?;
            let index = self.operand(node, 1)?;
            let address = self
                .func
                .lea(array, Some(index), simd.base_type.size(), ARRAY_ELEMS_OFFSET);
            let ind = self.func.ind(simd_ty, address);

            self.range().insert_before(node, address)?;
            self.range().insert_before(node, ind)?;
            self.replace_use(use_, stack, ind)?;
            self.range().remove(node)?;
            debug!(%node, %ind, "rewrote SIMD InitArray as an explicit load");
        } else {
            let operands: Vec<NodeId> = self.func.node(node).operands.iter().take(2).copied().collect();
            for operand in operands {
                let op = self.func.node_mut(operand);
                if op.ty == VarType::Struct {
                    op.ty = simd_ty;
                }
            }
        }
        Ok(())
    }
}
