//! The pass driver: per-block legalization, linking and rewriting.

use jit_ir::{
    pretty, BlockId, CallBuilder, IrError, IrForm, IrFunction, LirRange, NodeFlags, NodeId,
    Statement, Use,
};
use tracing::{debug, info_span, trace};

use crate::checks;
use crate::config::RationalizeConfig;
use crate::fixup;
use crate::stack::AncestorStack;
use crate::target::TargetCapabilities;
use crate::{RationalizeError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Pass {
    /// Tree form: intrinsic legalization and use-def flag cleanup
    Legalize,
    /// Linear form: the node rewrite rules
    Rewrite,
}

/// One rationalization run over a function.
pub struct Rationalizer<'a> {
    pub(crate) func: &'a mut IrFunction,
    pub(crate) target: &'a dyn TargetCapabilities,
    pub(crate) call_builder: &'a mut dyn CallBuilder,
    config: &'a RationalizeConfig,
    pub(crate) block: BlockId,
}

impl<'a> Rationalizer<'a> {
    pub fn new(
        func: &'a mut IrFunction,
        target: &'a dyn TargetCapabilities,
        call_builder: &'a mut dyn CallBuilder,
        config: &'a RationalizeConfig,
    ) -> Self {
        Self {
            func,
            target,
            call_builder,
            config,
            block: BlockId(0),
        }
    }

    /// Rationalize every block and mark the function linear.
    pub fn run(mut self) -> Result<()> {
        let span = info_span!("rationalize", function = %self.func.name, arch = %self.target.arch());
        let _enter = span.enter();

        self.func.expect_form(IrForm::Tree)?;
        if self.config.check_invariants {
            checks::sanity_check(self.func)?;
        }

        let blocks = self.func.block_ids();
        for &block in &blocks {
            self.block = block;
            self.rationalize_block(block)?;

            if self.config.check_invariants {
                checks::check_block(self.func, block, self.target)?;
            }
            if self.config.dump_ir {
                trace!("{}", pretty::dump_block(self.func, block));
            }
        }

        self.func.set_form(IrForm::Linear);
        debug!(blocks = blocks.len(), nodes = self.func.node_count(), "function is now linear");
        Ok(())
    }

    fn rationalize_block(&mut self, block: BlockId) -> Result<()> {
        let mut statements = self.func.take_statements(block)?;
        if statements.is_empty() {
            self.func.make_lir(block, None, None);
            return Ok(());
        }

        // Turning intrinsics into calls builds argument lists the way the
        // front end does, which needs tree form.
        for stmt in &mut statements {
            let mut stack = AncestorStack::new();
            stmt.root = self.walk(Use::dummy(stmt.root), &mut stack, Pass::Legalize, stmt)?;
        }

        self.link_statements(block, &statements)?;

        for mut stmt in statements {
            if let Some(offset) = stmt.il_offset {
                let marker = self.func.il_offset(offset);
                self.range().insert_before(stmt.first, marker)?;
            }

            let mut stack = AncestorStack::new();
            let root = stmt.root;
            self.walk(Use::dummy(root), &mut stack, Pass::Rewrite, &mut stmt)?;
        }

        Ok(())
    }

    /// Apply the rewrite rules again to a function that is already linear,
    /// walking from every value nothing else in its block consumes.
    pub(crate) fn rewrite_linear(mut self) -> Result<()> {
        self.func.expect_form(IrForm::Linear)?;
        for block in self.func.block_ids() {
            self.block = block;
            for root in checks::unconsumed_values(self.func, block)? {
                let mut stmt = Statement {
                    root,
                    first: root,
                    il_offset: None,
                };
                let mut stack = AncestorStack::new();
                self.walk(Use::dummy(root), &mut stack, Pass::Rewrite, &mut stmt)?;
            }
        }
        Ok(())
    }

    /// Splice the statements' node sequences into one list and make it the
    /// block's linear range.
    fn link_statements(&mut self, block: BlockId, statements: &[Statement]) -> Result<()> {
        let mut last_in_previous: Option<NodeId> = None;
        for stmt in statements {
            if self.func.node(stmt.first).prev.is_some() || self.func.node(stmt.root).next.is_some()
            {
                return Err(RationalizeError::MalformedStatement {
                    block,
                    root: stmt.root,
                    reason: "statement sequence is linked to a neighbour",
                });
            }

            self.func.node_mut(stmt.first).prev = last_in_previous;
            if let Some(prev) = last_in_previous {
                self.func.node_mut(prev).next = Some(stmt.first);
            }
            last_in_previous = Some(stmt.root);
        }

        let first = statements.first().map(|stmt| stmt.first);
        self.func.make_lir(block, first, last_in_previous);
        Ok(())
    }

    /// Post-order walk from `use_`, returning the def left at that position.
    fn walk(
        &mut self,
        mut use_: Use,
        stack: &mut AncestorStack,
        pass: Pass,
        stmt: &mut Statement,
    ) -> Result<NodeId> {
        let node = use_.def();
        stack.push(node);

        for index in self.visit_order(node) {
            let operand = Use::operand(self.func, node, index)?;
            self.walk(operand, stack, pass, stmt)?;
        }

        match pass {
            Pass::Legalize => self.legalize_node(&mut use_, stack, stmt)?,
            Pass::Rewrite => self.rewrite_node(&mut use_, stack)?,
        }

        stack.pop();
        Ok(use_.def())
    }

    /// Operand indices in evaluation order.
    fn visit_order(&self, node: NodeId) -> Vec<usize> {
        let node = self.func.node(node);
        let count = node.operands.len();
        if count == 2 && node.flags.contains(NodeFlags::REVERSE_OPS) {
            vec![1, 0]
        } else {
            (0..count).collect()
        }
    }

    pub(crate) fn range(&mut self) -> LirRange<'_> {
        self.func.range(self.block)
    }

    pub(crate) fn operand(&self, node: NodeId, index: usize) -> Result<NodeId> {
        self.func
            .node(node)
            .operands
            .get(index)
            .copied()
            .ok_or_else(|| IrError::StaleUse { user: node, index }.into())
    }

    /// Install `new` at `use_` and repoint the enclosing call's argument
    /// table if the old def was an argument.
    pub(crate) fn replace_use(
        &mut self,
        use_: &mut Use,
        stack: &AncestorStack,
        new: NodeId,
    ) -> Result<()> {
        let old = use_.def();
        let arg_parent = fixup::call_arg_parent(self.func, stack);
        use_.replace_with(self.func, new)?;
        fixup::fixup_if_call_arg(self.func, arg_parent, old, new)
    }
}
