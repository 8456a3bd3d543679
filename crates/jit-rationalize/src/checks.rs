//! Consistency checks run around the pass.
//!
//! [`sanity_check`] validates tree-form input and [`check_block`] validates a
//! block once it is linear. Failures are internal bugs, never bad input.
//! [`rewrite_is_fixpoint`] confirms that the rewrite rules have nothing left
//! to do on a linear function.

use jit_ir::{pretty, BlockId, DefaultCallBuilder, IrForm, IrFunction, NodeFlags, NodeId, Oper};
use rustc_hash::{FxHashMap, FxHashSet};

use crate::config::RationalizeConfig;
use crate::rationalizer::Rationalizer;
use crate::target::TargetCapabilities;
use crate::{RationalizeError, Result};

/// Validate every statement of a tree-form function.
pub fn sanity_check(func: &IrFunction) -> Result<()> {
    for block in func.block_ids() {
        for stmt in func.statements(block)? {
            let malformed = |reason| RationalizeError::MalformedStatement {
                block,
                root: stmt.root,
                reason,
            };

            if stmt.first != func.first_node(stmt.root) {
                return Err(malformed("first node is not the first node of the tree"));
            }
            if func.node(stmt.first).prev.is_some() {
                return Err(malformed("first node has a predecessor"));
            }
            if func.node(stmt.root).next.is_some() {
                return Err(malformed("root has a successor"));
            }

            let mut cur = Some(stmt.first);
            let mut steps = 0;
            while let Some(id) = cur {
                if !func.node(id).is_linked() {
                    return Err(malformed("sequence contains an unlinked node"));
                }
                if id == stmt.root {
                    break;
                }
                steps += 1;
                if steps > func.node_count() {
                    return Err(malformed("sequence does not terminate"));
                }
                cur = func.node(id).next;
            }
            if cur.is_none() {
                return Err(malformed("sequence does not reach the root"));
            }

            check_tree(func, stmt.root)?;
        }
    }
    Ok(())
}

fn check_tree(func: &IrFunction, root: NodeId) -> Result<()> {
    let mut stack = vec![root];
    while let Some(id) = stack.pop() {
        let node = func.node(id);
        if node.oper == Oper::Qmark {
            return Err(RationalizeError::ForbiddenOperator {
                node: id,
                oper: node.oper,
            });
        }

        if node.oper == Oper::Asg {
            if let (Some(location), Some(value)) = (node.op1(), node.op2()) {
                let location_node = func.node(location);
                let value_node = func.node(value);
                if location_node.oper == Oper::LclVar {
                    if !location_node.flags.contains(NodeFlags::VAR_DEF) {
                        return Err(RationalizeError::MissingDefFlag { asg: id, local: location });
                    }
                } else if value_node.oper == Oper::LclVar
                    && value_node.flags.contains(NodeFlags::VAR_DEF)
                {
                    return Err(RationalizeError::UnexpectedDefFlag { asg: id, local: value });
                }
            }
        }

        stack.extend(node.operands.iter().copied());
    }
    Ok(())
}

/// Validate the linear range of `block`.
pub fn check_block(func: &IrFunction, block: BlockId, target: &dyn TargetCapabilities) -> Result<()> {
    let broken = |node, reason| RationalizeError::BrokenRange {
        block,
        node,
        reason,
    };

    let bounds = func.lir_bounds(block)?;
    let nodes = func.lir_nodes(block)?;
    if nodes.last().copied() != bounds.last {
        let at = nodes.last().copied().or(bounds.first).unwrap_or(NodeId(0));
        return Err(broken(at, "walk does not end at the block's last node"));
    }

    let mut position = FxHashMap::default();
    let mut prev: Option<NodeId> = None;
    for (index, &id) in nodes.iter().enumerate() {
        let node = func.node(id);
        if !node.is_linked() {
            return Err(broken(id, "node in the range is not marked linked"));
        }
        if node.prev != prev {
            return Err(broken(id, "prev link disagrees with the list order"));
        }
        position.insert(id, index);
        prev = Some(id);
    }
    if let Some(last) = nodes.last() {
        if func.node(*last).next.is_some() {
            return Err(broken(*last, "last node has a successor"));
        }
    }

    let mut consumed = FxHashSet::default();
    for (index, &id) in nodes.iter().enumerate() {
        let node = func.node(id);
        if node.oper.is_tree_only() || node.is_non_aggregate_list() {
            return Err(RationalizeError::ForbiddenOperator {
                node: id,
                oper: node.oper,
            });
        }
        if let Some(data) = node.intrinsic() {
            if !target.is_target_intrinsic(data.id) {
                return Err(RationalizeError::NonTargetIntrinsic {
                    node: id,
                    intrinsic: data.id,
                });
            }
        }

        for operand in func.value_operands(id) {
            match position.get(&operand) {
                Some(&at) if at < index => {}
                Some(_) => return Err(broken(operand, "operand is evaluated after its user")),
                None => return Err(broken(operand, "operand is not in the block's range")),
            }
            if !consumed.insert(operand) {
                return Err(broken(operand, "value is consumed more than once"));
            }
        }

        if let Some(call) = node.call() {
            for entry in call.arg_table.entries() {
                if entry.is_late {
                    continue;
                }
                if !position.contains_key(&entry.node) || !func.is_descendant(id, entry.node) {
                    return Err(RationalizeError::DanglingArgument {
                        call: id,
                        node: entry.node,
                    });
                }
            }
        }
    }

    Ok(())
}

/// Validate every block of a linear function.
pub fn check_lir(func: &IrFunction, target: &dyn TargetCapabilities) -> Result<()> {
    func.expect_form(IrForm::Linear)?;
    for block in func.block_ids() {
        check_block(func, block, target)?;
    }
    Ok(())
}

/// Linked nodes of `block` whose value no other node of the block consumes,
/// in list order.
pub(crate) fn unconsumed_values(func: &IrFunction, block: BlockId) -> Result<Vec<NodeId>> {
    let nodes = func.lir_nodes(block)?;
    let consumed: FxHashSet<NodeId> = nodes
        .iter()
        .flat_map(|&id| func.value_operands(id))
        .collect();
    Ok(nodes.into_iter().filter(|id| !consumed.contains(id)).collect())
}

/// Run the rewrite rules once more over a copy of a linear function and
/// report whether the copy came out unchanged.
pub fn rewrite_is_fixpoint(func: &IrFunction, target: &dyn TargetCapabilities) -> Result<bool> {
    let mut copy = func.clone();
    let mut builder = DefaultCallBuilder;
    let config = RationalizeConfig::default();
    Rationalizer::new(&mut copy, target, &mut builder, &config).rewrite_linear()?;

    Ok(copy.node_count() == func.node_count()
        && func.node_ids().all(|id| copy.node(id) == func.node(id))
        && copy.locals() == func.locals()
        && pretty::dump_function(&copy) == pretty::dump_function(func))
}
