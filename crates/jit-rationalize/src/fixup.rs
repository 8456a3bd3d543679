//! Keeping call argument tables in step with argument rewrites.

use jit_ir::{IrError, IrFunction, NodeFlags, NodeId, Oper};
use tracing::trace;

use crate::stack::AncestorStack;
use crate::{RationalizeError, Result};

/// The call consuming the current node as an argument, if any. Must be
/// resolved before the node is replaced at its use.
///
/// Argument lists and placeholders between the node and the call are
/// skipped. An aggregate list is itself the argument, so nothing beneath it
/// is. A `NOP` whose operand is a call stands in for that call; morph can
/// leave such a `NOP` above a call it introduced.
pub(crate) fn call_arg_parent(func: &IrFunction, stack: &AncestorStack) -> Option<NodeId> {
    for ancestor in stack.ancestors() {
        let node = func.node(ancestor);
        match node.oper {
            Oper::List if !node.is_non_aggregate_list() => return None,
            Oper::List | Oper::ArgPlace => {}
            Oper::Nop => {
                if let Some(op1) = node.op1().filter(|&op1| func.node(op1).oper == Oper::Call) {
                    return Some(op1);
                }
            }
            Oper::Call => return Some(ancestor),
            _ => return None,
        }
    }
    None
}

/// Repoint `call`'s table entry from `old` to `new`. A late argument's binding
/// travels with its flag instead.
pub(crate) fn fixup_arg_tab_entry(
    func: &mut IrFunction,
    call: NodeId,
    old: NodeId,
    new: NodeId,
) -> Result<()> {
    if func.node(old).flags.contains(NodeFlags::LATE_ARG) {
        func.node_mut(new).flags.insert(NodeFlags::LATE_ARG);
        return Ok(());
    }

    let data = func.node_mut(call).call_mut().ok_or(IrError::NotACall(call))?;
    let entry = data
        .arg_table
        .entry_by_node_mut(old)
        .ok_or(RationalizeError::MissingArgEntry { call, node: old })?;
    entry.node = new;
    trace!(%call, %old, %new, "repointed argument table entry");
    Ok(())
}

/// Fix up the table of `arg_parent`, found by [`call_arg_parent`] before the
/// replacement, once `old` has been replaced by `new`.
pub(crate) fn fixup_if_call_arg(
    func: &mut IrFunction,
    arg_parent: Option<NodeId>,
    old: NodeId,
    new: NodeId,
) -> Result<()> {
    match arg_parent {
        Some(call) => fixup_arg_tab_entry(func, call, old, new),
        None => Ok(()),
    }
}
