//! Node constructors.
//!
//! Every constructor allocates an unlinked node and computes its effect flags
//! from its operands, so a tree built bottom-up carries correct summaries at
//! every level.

use smol_str::SmolStr;

use crate::flags::NodeFlags;
use crate::function::{IrFunction, LclNum};
use crate::node::{
    AddrModeData, FieldSeq, IntrinsicData, LocalData, MethodRef, Node, NodeData, NodeId,
    SimdData,
};
use crate::oper::{IntrinsicId, Oper, SimdIntrinsicId};
use crate::types::VarType;

impl IrFunction {
    /// Allocate a node, folding the effects of its operands and of the
    /// operator itself into its flags.
    pub fn new_node(
        &mut self,
        oper: Oper,
        ty: VarType,
        operands: Vec<NodeId>,
        data: NodeData,
    ) -> NodeId {
        let mut flags = operands
            .iter()
            .fold(NodeFlags::empty(), |acc, &op| acc | self.node(op).flags.effects());

        match oper {
            Oper::Asg | Oper::StoreLclVar | Oper::StoreLclFld => flags |= NodeFlags::ASG,
            Oper::StoreInd | Oper::StoreBlk | Oper::StoreObj | Oper::StoreDynBlk => {
                flags |= NodeFlags::ASG | NodeFlags::EXCEPT
            }
            Oper::Call => flags |= NodeFlags::CALL,
            Oper::Ind | Oper::Blk | Oper::Obj | Oper::DynBlk | Oper::Div => {
                flags |= NodeFlags::EXCEPT
            }
            Oper::ClsVar => flags |= NodeFlags::GLOB_REF,
            _ => {}
        }

        let mut node = Node::new(oper, ty, operands, data);
        node.flags = flags;
        self.alloc(node)
    }

    // ------------------------------------------------------------------
    // Leaves
    // ------------------------------------------------------------------

    pub fn lcl_var(&mut self, lcl: LclNum, ty: VarType) -> NodeId {
        self.local_mut(lcl).ref_count += 1;
        self.new_node(Oper::LclVar, ty, vec![], NodeData::Local(LocalData::new(lcl)))
    }

    pub fn lcl_fld(
        &mut self,
        lcl: LclNum,
        ty: VarType,
        offset: u32,
        field_seq: FieldSeq,
    ) -> NodeId {
        self.local_mut(lcl).ref_count += 1;
        let data = LocalData {
            offset,
            field_seq,
            ..LocalData::new(lcl)
        };
        self.new_node(Oper::LclFld, ty, vec![], NodeData::Local(data))
    }

    pub fn cls_var(&mut self, name: impl Into<SmolStr>, ty: VarType) -> NodeId {
        self.new_node(Oper::ClsVar, ty, vec![], NodeData::ClsVar(name.into()))
    }

    pub fn cns_int(&mut self, ty: VarType, value: i64) -> NodeId {
        self.new_node(Oper::CnsInt, ty, vec![], NodeData::IntCon(value))
    }

    pub fn cns_dbl(&mut self, ty: VarType, value: f64) -> NodeId {
        self.new_node(Oper::CnsDbl, ty, vec![], NodeData::DblCon(value))
    }

    /// Placeholder standing in for a late argument in the early list.
    pub fn arg_place(&mut self, ty: VarType) -> NodeId {
        self.new_node(Oper::ArgPlace, ty, vec![], NodeData::None)
    }

    pub fn il_offset(&mut self, offset: u32) -> NodeId {
        self.new_node(Oper::IlOffset, VarType::Void, vec![], NodeData::IlOffset(offset))
    }

    // ------------------------------------------------------------------
    // Operators
    // ------------------------------------------------------------------

    pub fn unop(&mut self, oper: Oper, ty: VarType, op1: NodeId) -> NodeId {
        self.new_node(oper, ty, vec![op1], NodeData::None)
    }

    pub fn binop(&mut self, oper: Oper, ty: VarType, op1: NodeId, op2: NodeId) -> NodeId {
        self.new_node(oper, ty, vec![op1, op2], NodeData::None)
    }

    pub fn ind(&mut self, ty: VarType, addr: NodeId) -> NodeId {
        self.new_node(Oper::Ind, ty, vec![addr], NodeData::None)
    }

    /// A fixed-size block location (`Blk` or `Obj`).
    pub fn blk(&mut self, oper: Oper, ty: VarType, addr: NodeId, size: u32) -> NodeId {
        debug_assert!(matches!(oper, Oper::Blk | Oper::Obj));
        self.new_node(oper, ty, vec![addr], NodeData::Blk { size })
    }

    /// A block location whose size is computed at run time.
    pub fn dyn_blk(&mut self, addr: NodeId, size: NodeId) -> NodeId {
        self.new_node(
            Oper::DynBlk,
            VarType::Struct,
            vec![addr, size],
            NodeData::Blk { size: 0 },
        )
    }

    pub fn addr(&mut self, location: NodeId) -> NodeId {
        self.new_node(Oper::Addr, VarType::Byref, vec![location], NodeData::None)
    }

    /// `location = value`. A local destination is flagged as a definition;
    /// field destinations are partial definitions.
    pub fn assign(&mut self, location: NodeId, value: NodeId) -> NodeId {
        let ty = self.node(location).ty;
        match self.node(location).oper {
            Oper::LclVar => self.node_mut(location).flags.insert(NodeFlags::VAR_DEF),
            Oper::LclFld => self
                .node_mut(location)
                .flags
                .insert(NodeFlags::VAR_DEF | NodeFlags::VAR_USEASG),
            _ => {}
        }
        self.new_node(Oper::Asg, ty, vec![location, value], NodeData::None)
    }

    /// Evaluate `op1` for its effects, then yield `op2`.
    pub fn comma(&mut self, op1: NodeId, op2: NodeId) -> NodeId {
        let ty = self.node(op2).ty;
        self.new_node(Oper::Comma, ty, vec![op1, op2], NodeData::None)
    }

    pub fn box_node(&mut self, op1: NodeId) -> NodeId {
        self.new_node(Oper::Box, VarType::Ref, vec![op1], NodeData::None)
    }

    pub fn nop(&mut self, ty: VarType, op1: Option<NodeId>) -> NodeId {
        self.new_node(Oper::Nop, ty, op1.into_iter().collect(), NodeData::None)
    }

    /// Chain `values` into `List(value, rest)` cells, returning the head.
    pub fn arg_list(&mut self, values: &[NodeId], aggregate: bool) -> Option<NodeId> {
        let mut rest: Option<NodeId> = None;
        for &value in values.iter().rev() {
            let operands = std::iter::once(value).chain(rest).collect();
            let ty = if aggregate {
                self.node(value).ty
            } else {
                VarType::Void
            };
            rest = Some(self.new_node(Oper::List, ty, operands, NodeData::ArgList { aggregate }));
        }
        rest
    }

    pub fn intrinsic(
        &mut self,
        id: IntrinsicId,
        ty: VarType,
        method: MethodRef,
        operands: Vec<NodeId>,
    ) -> NodeId {
        debug_assert_eq!(operands.len(), id.arity());
        self.new_node(
            Oper::Intrinsic,
            ty,
            operands,
            NodeData::Intrinsic(IntrinsicData { id, method }),
        )
    }

    pub fn simd(
        &mut self,
        intrinsic: SimdIntrinsicId,
        ty: VarType,
        base_type: VarType,
        size: u32,
        operands: Vec<NodeId>,
    ) -> NodeId {
        self.new_node(
            Oper::Simd,
            ty,
            operands,
            NodeData::Simd(SimdData {
                intrinsic,
                base_type,
                size,
            }),
        )
    }

    /// `base + index * scale + offset`
    pub fn lea(
        &mut self,
        base: NodeId,
        index: Option<NodeId>,
        scale: u32,
        offset: i32,
    ) -> NodeId {
        let operands = std::iter::once(base).chain(index).collect();
        self.new_node(
            Oper::Lea,
            VarType::Byref,
            operands,
            NodeData::AddrMode(AddrModeData { scale, offset }),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_effects_propagate_upward() {
        let mut func = IrFunction::new("test");
        let p = func.new_local(VarType::Byref, None);
        let addr = func.lcl_var(p, VarType::Byref);
        let load = func.ind(VarType::Int, addr);
        let one = func.cns_int(VarType::Int, 1);
        let add = func.binop(Oper::Add, VarType::Int, load, one);

        assert!(func.node(load).flags.contains(NodeFlags::EXCEPT));
        assert!(func.node(add).flags.contains(NodeFlags::EXCEPT));
        assert!(!func.node(one).flags.has_side_effects());
    }

    #[test]
    fn test_assign_marks_definition() {
        let mut func = IrFunction::new("test");
        let x = func.new_local(VarType::Struct, None);
        let whole = func.lcl_var(x, VarType::Int);
        let zero = func.cns_int(VarType::Int, 0);
        let asg = func.assign(whole, zero);

        assert!(func.node(whole).flags.contains(NodeFlags::VAR_DEF));
        assert!(func.node(asg).flags.contains(NodeFlags::ASG));

        let field = func.lcl_fld(x, VarType::Int, 4, FieldSeq::Field("b".into()));
        let zero = func.cns_int(VarType::Int, 0);
        func.assign(field, zero);
        assert!(func
            .node(field)
            .flags
            .contains(NodeFlags::VAR_DEF | NodeFlags::VAR_USEASG));
        assert_eq!(func.local(x).ref_count, 2);
    }

    #[test]
    fn test_arg_list_shape() {
        let mut func = IrFunction::new("test");
        let a = func.cns_int(VarType::Int, 1);
        let b = func.cns_int(VarType::Int, 2);
        let head = func.arg_list(&[a, b], false).unwrap();

        let first = func.node(head);
        assert_eq!(first.oper, Oper::List);
        assert_eq!(first.op1(), Some(a));
        let tail = first.op2().unwrap();
        assert_eq!(func.node(tail).operands, vec![b]);
        assert!(func.node(tail).is_non_aggregate_list());
        assert_eq!(func.arg_list(&[], false), None);
    }
}
