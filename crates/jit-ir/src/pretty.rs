//! Textual dumps of functions and blocks.
//!
//! Tree-form blocks print each statement as an indented tree, root first.
//! Linear blocks print one node per line in execution order, with operands
//! referring to earlier lines by id.

use std::fmt::Write;

use crate::function::{BlockBody, BlockId, IrFunction};
use crate::node::{FieldSeq, NodeData, NodeId};

/// Dump every block of a function.
pub fn dump_function(func: &IrFunction) -> String {
    let mut out = String::new();
    let mut printer = PrettyPrinter::new(&mut out, func);
    printer.print_function();
    out
}

/// Dump a single block.
pub fn dump_block(func: &IrFunction, block: BlockId) -> String {
    let mut out = String::new();
    let mut printer = PrettyPrinter::new(&mut out, func);
    printer.print_block(block);
    out
}

/// One-line description of a node: id, operator, type and payload.
pub fn describe_node(func: &IrFunction, id: NodeId) -> String {
    let mut out = String::new();
    let mut printer = PrettyPrinter::new(&mut out, func);
    printer.print_node_head(id);
    out
}

struct PrettyPrinter<'a> {
    out: &'a mut String,
    func: &'a IrFunction,
    indent: usize,
}

impl<'a> PrettyPrinter<'a> {
    fn new(out: &'a mut String, func: &'a IrFunction) -> Self {
        Self {
            out,
            func,
            indent: 0,
        }
    }

    fn write_indent(&mut self) {
        for _ in 0..self.indent {
            self.out.push(' ');
        }
    }

    fn print_function(&mut self) {
        let _ = writeln!(self.out, "fn {} ({} form) {{", self.func.name, self.func.form());
        for block in self.func.block_ids() {
            self.print_block(block);
        }
        self.out.push_str("}\n");
    }

    fn print_block(&mut self, block: BlockId) {
        let _ = writeln!(self.out, "{}:", block);
        match &self.func.block(block).body {
            BlockBody::Tree(statements) => {
                for (i, stmt) in statements.iter().enumerate() {
                    match stmt.il_offset {
                        Some(offset) => {
                            let _ = writeln!(self.out, "  stmt {} @IL{:#06x}", i, offset);
                        }
                        None => {
                            let _ = writeln!(self.out, "  stmt {}", i);
                        }
                    }
                    self.indent = 4;
                    self.print_tree(stmt.root);
                }
            }
            BlockBody::Linear(_) => match self.func.lir_nodes(block) {
                Ok(nodes) => {
                    for id in nodes {
                        self.out.push_str("  ");
                        self.print_linear_node(id);
                    }
                }
                Err(err) => {
                    let _ = writeln!(self.out, "  <broken range: {}>", err);
                }
            },
        }
    }

    fn print_tree(&mut self, id: NodeId) {
        self.write_indent();
        self.print_node_head(id);
        self.out.push('\n');
        self.indent += 2;
        for &operand in &self.func.node(id).operands {
            self.print_tree(operand);
        }
        self.indent -= 2;
    }

    fn print_linear_node(&mut self, id: NodeId) {
        self.print_node_head(id);
        let operands = self.func.value_operands(id);
        if !operands.is_empty() {
            let list: Vec<String> = operands.iter().map(|op| op.to_string()).collect();
            let _ = write!(self.out, " ({})", list.join(", "));
        }
        self.out.push('\n');
    }

    fn print_node_head(&mut self, id: NodeId) {
        let node = self.func.node(id);
        let _ = write!(self.out, "{} = {}.{}", id, node.oper, node.ty);

        match &node.data {
            NodeData::None | NodeData::ArgList { aggregate: false } => {}
            NodeData::ArgList { aggregate: true } => self.out.push_str(" aggregate"),
            NodeData::Local(local) => {
                let _ = write!(self.out, " {}", local.lcl_num);
                if local.offset != 0 {
                    let _ = write!(self.out, "+{}", local.offset);
                }
                if let FieldSeq::Field(name) = &local.field_seq {
                    let _ = write!(self.out, " .{}", name);
                }
            }
            NodeData::ClsVar(name) => {
                let _ = write!(self.out, " {}", name);
            }
            NodeData::IntCon(value) => {
                let _ = write!(self.out, " {}", value);
            }
            NodeData::DblCon(value) => {
                let _ = write!(self.out, " {:?}", value);
            }
            NodeData::Blk { size } => {
                let _ = write!(self.out, " <{}>", size);
            }
            NodeData::Call(call) => {
                let _ = write!(self.out, " {}", call.method);
            }
            NodeData::Intrinsic(intrinsic) => {
                let _ = write!(self.out, " {}", intrinsic.id);
            }
            NodeData::Simd(simd) => {
                let _ = write!(self.out, " {} {}x{}", simd.intrinsic, simd.base_type, simd.size);
            }
            NodeData::AddrMode(am) => {
                let _ = write!(self.out, " [*{} {:+}]", am.scale, am.offset);
            }
            NodeData::IlOffset(offset) => {
                let _ = write!(self.out, " IL{:#06x}", offset);
            }
        }

        if !node.flags.is_empty() {
            let _ = write!(self.out, " {:?}", node.flags);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::function::IrForm;
    use crate::oper::Oper;
    use crate::types::VarType;

    #[test]
    fn test_dump_tree_and_linear() {
        let mut func = IrFunction::new("dump");
        let x = func.new_local(VarType::Int, None);
        let block = func.new_block();
        let a = func.lcl_var(x, VarType::Int);
        let b = func.cns_int(VarType::Int, 5);
        let add = func.binop(Oper::Add, VarType::Int, a, b);
        func.add_statement(block, add, Some(0x10)).unwrap();

        let tree = dump_function(&func);
        assert!(tree.contains("fn dump (tree form)"));
        assert!(tree.contains("stmt 0 @IL0x0010"));
        assert!(tree.contains("      n000 = LCL_VAR.int V00"));

        let stmt = func.take_statements(block).unwrap().remove(0);
        func.make_lir(block, Some(stmt.first), Some(stmt.root));
        func.set_form(IrForm::Linear);

        let linear = dump_block(&func, block);
        assert!(linear.contains("n002 = ADD.int (n000, n001)"));
        assert_eq!(describe_node(&func, b), "n001 = CNS_INT.int 5");
    }
}
