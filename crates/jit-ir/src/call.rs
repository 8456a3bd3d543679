//! Call construction.
//!
//! A call keeps its arguments in two operand lists. Early arguments are
//! evaluated in order inside the early list; late arguments are evaluated
//! afterwards in the late list and leave an `ArgPlace` placeholder behind in
//! the early list. The argument table records where every argument lives.

use crate::args::{ArgTabEntry, ArgTable};
use crate::flags::NodeFlags;
use crate::function::IrFunction;
use crate::node::{CallData, CallKind, MethodRef, NodeData, NodeId};
use crate::oper::Oper;
use crate::types::VarType;
use crate::Result;

/// One actual argument handed to [`IrFunction::call`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallArg {
    Early(NodeId),
    Late(NodeId),
}

impl CallArg {
    pub fn node(self) -> NodeId {
        match self {
            CallArg::Early(node) | CallArg::Late(node) => node,
        }
    }
}

impl IrFunction {
    /// Build a call node with its argument lists and argument table.
    pub fn call(
        &mut self,
        kind: CallKind,
        method: MethodRef,
        ret: VarType,
        args: &[CallArg],
    ) -> NodeId {
        let mut early = Vec::with_capacity(args.len());
        let mut late = Vec::new();
        let mut arg_table = ArgTable::new();

        for (arg_num, &arg) in args.iter().enumerate() {
            let node = arg.node();
            match arg {
                CallArg::Early(_) => early.push(node),
                CallArg::Late(_) => {
                    let ty = self.node(node).ty;
                    let place = self.arg_place(ty);
                    early.push(place);
                    late.push(node);
                    self.node_mut(node).flags.insert(NodeFlags::LATE_ARG);
                }
            }
            arg_table.push(ArgTabEntry {
                arg_num: arg_num as u32,
                node,
                is_late: matches!(arg, CallArg::Late(_)),
            });
        }

        let mut operands = Vec::with_capacity(2);
        let early_args = self.arg_list(&early, false).map(|list| {
            operands.push(list);
            operands.len() - 1
        });
        let late_args = self.arg_list(&late, false).map(|list| {
            operands.push(list);
            operands.len() - 1
        });

        self.new_node(
            Oper::Call,
            ret,
            operands,
            NodeData::Call(CallData {
                kind,
                method,
                arg_table,
                early_args,
                late_args,
            }),
        )
    }
}

/// Builds calls on behalf of a pass that needs to turn an operator into a
/// call. Implementations decide calling convention details such as which
/// arguments are late.
pub trait CallBuilder {
    fn build_user_call(
        &mut self,
        func: &mut IrFunction,
        method: MethodRef,
        ret: VarType,
        args: &[NodeId],
    ) -> Result<NodeId>;
}

/// Passes every argument early, in order.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultCallBuilder;

impl CallBuilder for DefaultCallBuilder {
    fn build_user_call(
        &mut self,
        func: &mut IrFunction,
        method: MethodRef,
        ret: VarType,
        args: &[NodeId],
    ) -> Result<NodeId> {
        let args: Vec<CallArg> = args.iter().copied().map(CallArg::Early).collect();
        Ok(func.call(CallKind::User, method, ret, &args))
    }
}
