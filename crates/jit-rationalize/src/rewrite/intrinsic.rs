//! Tree-form legalization: intrinsics the target cannot expand become calls
//! to their library methods.

use jit_ir::{NodeFlags, Oper, Statement, Use};
use tracing::debug;

use crate::fixup;
use crate::rationalizer::Rationalizer;
use crate::stack::AncestorStack;
use crate::{RationalizeError, Result};

impl<'a> Rationalizer<'a> {
    pub(crate) fn legalize_node(
        &mut self,
        use_: &mut Use,
        stack: &mut AncestorStack,
        stmt: &mut Statement,
    ) -> Result<()> {
        let node = self.func.node(use_.def());
        match node.oper {
            Oper::Intrinsic => {
                let needs_call = node
                    .intrinsic()
                    .is_some_and(|data| self.target.is_intrinsic_implemented_by_user_call(data.id));
                if needs_call {
                    self.rewrite_intrinsic_as_user_call(use_, stack, stmt)?;
                }
            }
            oper if oper.is_local() => {
                // The backend has no use for use-def markers.
                self.func
                    .node_mut(use_.def())
                    .flags
                    .remove(NodeFlags::VAR_USEDEF);
            }
            _ => {}
        }
        Ok(())
    }

    /// Replace the intrinsic at `use_` with a call to its method, splicing the
    /// call's sequence where the intrinsic's was.
    fn rewrite_intrinsic_as_user_call(
        &mut self,
        use_: &mut Use,
        stack: &mut AncestorStack,
        stmt: &mut Statement,
    ) -> Result<()> {
        let intrinsic = use_.def();
        let node = self.func.node(intrinsic);
        let Some(data) = node.intrinsic().cloned() else {
            return Err(RationalizeError::ForbiddenOperator {
                node: intrinsic,
                oper: node.oper,
            });
        };
        let ret = node.ty;
        let args = node.operands.clone();
        let arg_parent = fixup::call_arg_parent(self.func, stack);

        let call = self
            .call_builder
            .build_user_call(self.func, data.method.clone(), ret, &args)?;
        use_.replace_with(self.func, call)?;

        let (first, starts_statement) = self.func.replace_tree_seq(intrinsic, call);
        if starts_statement {
            stmt.first = first;
        }

        fixup::fixup_if_call_arg(self.func, arg_parent, intrinsic, call)?;

        let effects = NodeFlags::CALL | self.func.node(call).flags.effects();
        for ancestor in stack.ancestors() {
            self.func.node_mut(ancestor).flags |= effects;
        }
        stack.replace_top(call);

        debug!(%intrinsic, %call, method = %data.method, "rewrote intrinsic {} as a user call", data.id);
        Ok(())
    }
}
