//! Functions, basic blocks, statements and local variables.

use rustc_hash::FxHashSet;
use smol_str::SmolStr;
use std::fmt;

use crate::node::{Node, NodeId};
use crate::oper::Oper;
use crate::types::VarType;
use crate::{IrError, Result};

// ============================================================================
// Identifiers
// ============================================================================

/// Local variable number
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LclNum(pub u32);

impl fmt::Display for LclNum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "V{:02}", self.0)
    }
}

/// Basic block identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BlockId(pub u32);

impl fmt::Display for BlockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BB{:02}", self.0)
    }
}

// ============================================================================
// Locals
// ============================================================================

/// How a struct local was split into per-field locals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PromotionType {
    #[default]
    None,
    /// Each field lives in its own local; the parent is never accessed whole
    Independent,
    /// Fields are tracked separately but the parent stays in memory
    Dependent,
}

/// Local variable descriptor
#[derive(Debug, Clone, PartialEq)]
pub struct LocalVarDsc {
    pub name: Option<SmolStr>,
    pub ty: VarType,
    /// Exact size in bytes, before any rounding
    pub exact_size: u32,
    pub ref_count: u32,
    /// Element type for vector locals whose layout is known
    pub simd_base_type: Option<VarType>,
    pub promotion: PromotionType,
}

impl LocalVarDsc {
    pub fn new(ty: VarType, name: Option<SmolStr>) -> Self {
        Self {
            name,
            ty,
            exact_size: ty.size(),
            ref_count: 0,
            simd_base_type: None,
            promotion: PromotionType::None,
        }
    }

    pub fn is_simd(&self) -> bool {
        self.ty.is_simd()
    }
}

// ============================================================================
// Blocks and statements
// ============================================================================

/// A tree-form statement: one root expression, its first node in evaluation
/// order, and an optional IL offset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Statement {
    pub root: NodeId,
    pub first: NodeId,
    pub il_offset: Option<u32>,
}

/// First and last node of a linear block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LirBounds {
    pub first: Option<NodeId>,
    pub last: Option<NodeId>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BlockBody {
    Tree(Vec<Statement>),
    Linear(LirBounds),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BasicBlock {
    pub id: BlockId,
    pub body: BlockBody,
}

impl BasicBlock {
    pub fn is_linear(&self) -> bool {
        matches!(self.body, BlockBody::Linear(_))
    }

    pub fn statements(&self) -> Option<&[Statement]> {
        match &self.body {
            BlockBody::Tree(statements) => Some(statements),
            BlockBody::Linear(_) => None,
        }
    }

    pub fn bounds(&self) -> Option<LirBounds> {
        match &self.body {
            BlockBody::Linear(bounds) => Some(*bounds),
            BlockBody::Tree(_) => None,
        }
    }
}

/// Which IR discipline the function is currently in. Downstream stages
/// assert `Linear` rather than inferring it from block contents.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IrForm {
    Tree,
    Linear,
}

impl fmt::Display for IrForm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IrForm::Tree => f.write_str("tree"),
            IrForm::Linear => f.write_str("linear"),
        }
    }
}

// ============================================================================
// Function
// ============================================================================

/// A function under compilation. Owns the node arena for its whole lifetime.
#[derive(Debug, Clone)]
pub struct IrFunction {
    pub name: SmolStr,
    nodes: Vec<Node>,
    locals: Vec<LocalVarDsc>,
    blocks: Vec<BasicBlock>,
    form: IrForm,
}

impl IrFunction {
    pub fn new(name: impl Into<SmolStr>) -> Self {
        Self {
            name: name.into(),
            nodes: Vec::new(),
            locals: Vec::new(),
            blocks: Vec::new(),
            form: IrForm::Tree,
        }
    }

    // ------------------------------------------------------------------
    // Nodes
    // ------------------------------------------------------------------

    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.index()]
    }

    pub fn node_mut(&mut self, id: NodeId) -> &mut Node {
        &mut self.nodes[id.index()]
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn node_ids(&self) -> impl Iterator<Item = NodeId> {
        (0..self.nodes.len() as u32).map(NodeId)
    }

    /// Place a node in the arena.
    pub fn alloc(&mut self, node: Node) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(node);
        id
    }

    // ------------------------------------------------------------------
    // Locals
    // ------------------------------------------------------------------

    pub fn new_local(&mut self, ty: VarType, name: Option<SmolStr>) -> LclNum {
        let num = LclNum(self.locals.len() as u32);
        self.locals.push(LocalVarDsc::new(ty, name));
        num
    }

    pub fn local(&self, lcl: LclNum) -> &LocalVarDsc {
        &self.locals[lcl.0 as usize]
    }

    pub fn local_mut(&mut self, lcl: LclNum) -> &mut LocalVarDsc {
        &mut self.locals[lcl.0 as usize]
    }

    pub fn locals(&self) -> &[LocalVarDsc] {
        &self.locals
    }

    /// Drop one reference from the local a node reads or writes.
    pub fn dec_ref_count(&mut self, node: NodeId) {
        let Some(lcl) = self.node(node).local().map(|l| l.lcl_num) else {
            return;
        };
        let dsc = self.local_mut(lcl);
        dsc.ref_count = dsc.ref_count.saturating_sub(1);
    }

    /// True when `addr` is the address of a local known to hold a vector.
    pub fn is_addr_of_simd_type(&self, addr: NodeId) -> bool {
        let node = self.node(addr);
        let local = match node.oper {
            Oper::LclVarAddr | Oper::LclFldAddr => node.local(),
            Oper::Addr => node
                .op1()
                .map(|location| self.node(location))
                .filter(|location| location.oper.is_local_read())
                .and_then(|location| location.local()),
            _ => None,
        };
        local.is_some_and(|l| self.local(l.lcl_num).is_simd())
    }

    /// Element type of the vector local a node refers to, when known.
    pub fn simd_base_type_of_local(&self, node: NodeId) -> Option<VarType> {
        let local = self.node(node).local()?;
        let dsc = self.local(local.lcl_num);
        if dsc.is_simd() {
            dsc.simd_base_type
        } else {
            None
        }
    }

    // ------------------------------------------------------------------
    // Blocks
    // ------------------------------------------------------------------

    pub fn new_block(&mut self) -> BlockId {
        let id = BlockId(self.blocks.len() as u32);
        self.blocks.push(BasicBlock {
            id,
            body: BlockBody::Tree(Vec::new()),
        });
        id
    }

    pub fn block(&self, id: BlockId) -> &BasicBlock {
        &self.blocks[id.0 as usize]
    }

    pub fn block_mut(&mut self, id: BlockId) -> &mut BasicBlock {
        &mut self.blocks[id.0 as usize]
    }

    pub fn blocks(&self) -> &[BasicBlock] {
        &self.blocks
    }

    pub fn block_ids(&self) -> Vec<BlockId> {
        self.blocks.iter().map(|b| b.id).collect()
    }

    pub fn statements(&self, block: BlockId) -> Result<&[Statement]> {
        self.block(block)
            .statements()
            .ok_or(IrError::NotInTreeForm(block))
    }

    pub fn statements_mut(&mut self, block: BlockId) -> Result<&mut Vec<Statement>> {
        match &mut self.block_mut(block).body {
            BlockBody::Tree(statements) => Ok(statements),
            BlockBody::Linear(_) => Err(IrError::NotInTreeForm(block)),
        }
    }

    /// Take the statements out of a tree-form block, leaving it empty.
    pub fn take_statements(&mut self, block: BlockId) -> Result<Vec<Statement>> {
        Ok(std::mem::take(self.statements_mut(block)?))
    }

    /// Append a statement rooted at `root`, establishing the evaluation order
    /// of its nodes.
    pub fn add_statement(
        &mut self,
        block: BlockId,
        root: NodeId,
        il_offset: Option<u32>,
    ) -> Result<()> {
        self.statements(block)?;
        let first = self.set_tree_seq(root);
        self.statements_mut(block)?.push(Statement {
            root,
            first,
            il_offset,
        });
        Ok(())
    }

    /// Switch a block to linear form with the given boundaries.
    pub fn make_lir(&mut self, block: BlockId, first: Option<NodeId>, last: Option<NodeId>) {
        self.block_mut(block).body = BlockBody::Linear(LirBounds { first, last });
    }

    pub fn lir_bounds(&self, block: BlockId) -> Result<LirBounds> {
        self.block(block)
            .bounds()
            .ok_or(IrError::NotInLinearForm(block))
    }

    pub(crate) fn lir_bounds_mut(&mut self, block: BlockId) -> Result<&mut LirBounds> {
        match &mut self.block_mut(block).body {
            BlockBody::Linear(bounds) => Ok(bounds),
            BlockBody::Tree(_) => Err(IrError::NotInLinearForm(block)),
        }
    }

    // ------------------------------------------------------------------
    // Form
    // ------------------------------------------------------------------

    pub fn form(&self) -> IrForm {
        self.form
    }

    pub fn set_form(&mut self, form: IrForm) {
        self.form = form;
    }

    pub fn expect_form(&self, expected: IrForm) -> Result<()> {
        if self.form == expected {
            Ok(())
        } else {
            Err(IrError::WrongForm {
                expected,
                found: self.form,
            })
        }
    }

    // ------------------------------------------------------------------
    // Tree queries and sequencing
    // ------------------------------------------------------------------

    /// The first node evaluated within the tree rooted at `root`.
    pub fn first_node(&self, root: NodeId) -> NodeId {
        let mut node = root;
        while let Some(&first) = self.node(node).eval_order_operands().first() {
            node = first;
        }
        node
    }

    /// Link every node of the tree rooted at `root` in evaluation order,
    /// returning the first one. The root is always last; the ends of the
    /// sequence are left unlinked for the caller to splice.
    pub fn set_tree_seq(&mut self, root: NodeId) -> NodeId {
        let mut order = Vec::new();
        self.collect_eval_order(root, &mut order);

        let mut prev: Option<NodeId> = None;
        for &id in &order {
            let node = self.node_mut(id);
            node.prev = prev;
            node.next = None;
            node.linked = true;
            if let Some(p) = prev {
                self.node_mut(p).next = Some(id);
            }
            prev = Some(id);
        }

        order[0]
    }

    /// Swap the sequence of the tree rooted at `old_root` for a freshly
    /// sequenced tree rooted at `new_root`, keeping the neighbours of the old
    /// sequence. Returns the first node of the new sequence, and whether it
    /// now starts the statement (the old tree had no predecessor).
    pub fn replace_tree_seq(&mut self, old_root: NodeId, new_root: NodeId) -> (NodeId, bool) {
        let prev = self.node(self.first_node(old_root)).prev;
        let next = self.node(old_root).next;

        let mut old_nodes = Vec::new();
        self.collect_eval_order(old_root, &mut old_nodes);
        for id in old_nodes {
            let node = self.node_mut(id);
            node.prev = None;
            node.next = None;
            node.linked = false;
        }

        let first = self.set_tree_seq(new_root);
        self.node_mut(first).prev = prev;
        if let Some(p) = prev {
            self.node_mut(p).next = Some(first);
        }
        self.node_mut(new_root).next = next;
        if let Some(n) = next {
            self.node_mut(n).prev = Some(new_root);
        }

        (first, prev.is_none())
    }

    fn collect_eval_order(&self, node: NodeId, out: &mut Vec<NodeId>) {
        for operand in self.node(node).eval_order_operands() {
            self.collect_eval_order(operand, out);
        }
        out.push(node);
    }

    /// True when `node` is reachable through operand edges from `ancestor`
    /// (and is not `ancestor` itself).
    pub fn is_descendant(&self, ancestor: NodeId, node: NodeId) -> bool {
        let mut stack: Vec<NodeId> = self.node(ancestor).operands.clone();
        let mut seen = FxHashSet::default();
        while let Some(id) = stack.pop() {
            if id == node {
                return true;
            }
            if seen.insert(id) {
                stack.extend(self.node(id).operands.iter().copied());
            }
        }
        false
    }

    /// The nodes whose values `node` consumes once the function is linear:
    /// argument lists are looked through and placeholders skipped.
    pub fn value_operands(&self, node: NodeId) -> Vec<NodeId> {
        let mut values = Vec::new();
        for &operand in &self.node(node).operands {
            self.push_values(operand, &mut values);
        }
        values
    }

    fn push_values(&self, operand: NodeId, values: &mut Vec<NodeId>) {
        let node = self.node(operand);
        if node.is_non_aggregate_list() {
            for &inner in &node.operands {
                self.push_values(inner, values);
            }
        } else if node.oper != Oper::ArgPlace {
            values.push(operand);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flags::NodeFlags;

    #[test]
    fn test_function_creation() {
        let mut func = IrFunction::new("test");
        assert_eq!(func.form(), IrForm::Tree);
        assert_eq!(func.node_count(), 0);

        let x = func.new_local(VarType::Int, Some("x".into()));
        assert_eq!(x, LclNum(0));
        assert_eq!(func.local(x).exact_size, 4);

        let block = func.new_block();
        assert_eq!(block, BlockId(0));
        assert!(func.statements(block).unwrap().is_empty());
        assert!(func.lir_bounds(block).is_err());
    }

    #[test]
    fn test_statement_sequencing() {
        let mut func = IrFunction::new("test");
        let x = func.new_local(VarType::Int, None);
        let y = func.new_local(VarType::Int, None);
        let block = func.new_block();

        let dst = func.lcl_var(x, VarType::Int);
        let src = func.lcl_var(y, VarType::Int);
        let one = func.cns_int(VarType::Int, 1);
        let add = func.binop(Oper::Add, VarType::Int, src, one);
        let asg = func.assign(dst, add);
        func.add_statement(block, asg, Some(0)).unwrap();

        let stmt = &func.statements(block).unwrap()[0];
        assert_eq!(stmt.first, dst);
        assert_eq!(stmt.root, asg);
        assert_eq!(func.node(dst).next, Some(src));
        assert_eq!(func.node(add).next, Some(asg));
        assert_eq!(func.node(asg).next, None);
        assert!(func.node(one).is_linked());
    }

    #[test]
    fn test_reverse_ops_sequencing() {
        let mut func = IrFunction::new("test");
        let a = func.cns_int(VarType::Int, 1);
        let b = func.cns_int(VarType::Int, 2);
        let sub = func.binop(Oper::Sub, VarType::Int, a, b);
        func.node_mut(sub).flags.insert(NodeFlags::REVERSE_OPS);

        assert_eq!(func.first_node(sub), b);
        let first = func.set_tree_seq(sub);
        assert_eq!(first, b);
        assert_eq!(func.node(b).next, Some(a));
        assert_eq!(func.node(a).next, Some(sub));
    }

    #[test]
    fn test_replace_tree_seq() {
        let mut func = IrFunction::new("test");
        let a = func.cns_int(VarType::Int, 1);
        let neg = func.unop(Oper::Neg, VarType::Int, a);
        let b = func.cns_int(VarType::Int, 2);
        let add = func.binop(Oper::Add, VarType::Int, b, neg);
        func.set_tree_seq(add);

        // Swap `-a` for `!a`, reusing `a`.
        let not = func.unop(Oper::Not, VarType::Int, a);
        func.node_mut(add).operands[1] = not;
        let (first, starts) = func.replace_tree_seq(neg, not);

        assert_eq!(first, a);
        assert!(!starts);
        assert!(!func.node(neg).is_linked());
        assert_eq!(func.node(b).next, Some(a));
        assert_eq!(func.node(a).next, Some(not));
        assert_eq!(func.node(not).next, Some(add));
        assert_eq!(func.node(add).prev, Some(not));
    }

    #[test]
    fn test_descendant_query() {
        let mut func = IrFunction::new("test");
        let a = func.cns_int(VarType::Int, 1);
        let neg = func.unop(Oper::Neg, VarType::Int, a);
        let b = func.cns_int(VarType::Int, 2);
        let add = func.binop(Oper::Add, VarType::Int, neg, b);

        assert!(func.is_descendant(add, a));
        assert!(func.is_descendant(add, b));
        assert!(!func.is_descendant(neg, b));
        assert!(!func.is_descendant(add, add));
    }

    #[test]
    fn test_simd_local_queries() {
        let mut func = IrFunction::new("test");
        let v = func.new_local(VarType::Simd16, Some("v".into()));
        func.local_mut(v).simd_base_type = Some(VarType::Float);
        let s = func.new_local(VarType::Struct, None);

        let read = func.lcl_var(v, VarType::Simd16);
        let addr = func.addr(read);
        let other = func.lcl_var(s, VarType::Struct);
        let other_addr = func.addr(other);

        assert!(func.is_addr_of_simd_type(addr));
        assert!(!func.is_addr_of_simd_type(other_addr));
        assert_eq!(func.simd_base_type_of_local(read), Some(VarType::Float));
        assert_eq!(func.simd_base_type_of_local(other), None);
    }
}
