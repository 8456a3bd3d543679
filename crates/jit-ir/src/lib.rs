//! Node IR for the JIT mid-end.
//!
//! A function is a set of basic blocks over one node arena. Blocks start in
//! *tree form* (ordered statements, each an expression tree with a defined
//! evaluation order) and are later rewritten into *linear form* (a single
//! doubly linked list of nodes in execution order per block).
//!
//! - **Nodes** carry an operator, a type, effect flags, owned operand slots
//!   and an operator-specific payload ([`Node`], [`NodeData`])
//! - **Uses** name the position holding a value so it can be replaced
//!   without knowing what kind of position it is ([`Use`])
//! - **Ranges** edit a linear block's list while keeping links and block
//!   bounds consistent ([`LirRange`])
//! - **Calls** own an argument table that must follow argument rewrites
//!   ([`ArgTable`])
//!
//! # Example
//!
//! ```
//! use jit_ir::{IrFunction, Oper, VarType};
//!
//! let mut func = IrFunction::new("example");
//! let x = func.new_local(VarType::Int, Some("x".into()));
//! let y = func.new_local(VarType::Int, Some("y".into()));
//! let block = func.new_block();
//!
//! // x = y + 1
//! let dst = func.lcl_var(x, VarType::Int);
//! let src = func.lcl_var(y, VarType::Int);
//! let one = func.cns_int(VarType::Int, 1);
//! let add = func.binop(Oper::Add, VarType::Int, src, one);
//! let asg = func.assign(dst, add);
//! func.add_statement(block, asg, None).unwrap();
//! ```

use thiserror::Error;

mod args;
mod build;
mod call;
mod flags;
mod function;
mod lir;
mod node;
mod oper;
pub mod pretty;
mod types;
mod use_edge;

pub use args::{ArgTabEntry, ArgTable};
pub use call::{CallArg, CallBuilder, DefaultCallBuilder};
pub use flags::NodeFlags;
pub use function::{
    BasicBlock, BlockBody, BlockId, IrForm, IrFunction, LclNum, LirBounds, LocalVarDsc,
    PromotionType, Statement,
};
pub use lir::{LirRange, ReadOnlyRange, TreeRange};
pub use node::{
    AddrModeData, CallData, CallKind, FieldSeq, IntrinsicData, LocalData, MethodRef, Node,
    NodeData, NodeId, SimdData,
};
pub use oper::{IntrinsicId, Oper, SimdIntrinsicId};
pub use types::{round_up, VarType, ARRAY_ELEMS_OFFSET, TARGET_POINTER_SIZE};
pub use use_edge::{Use, UseEdge};

/// Errors raised by IR editing primitives. All of them indicate a bug in
/// the caller rather than bad input.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum IrError {
    #[error("node {0} is not linked into a range")]
    NotLinked(NodeId),

    #[error("node {0} is already linked into a range")]
    AlreadyLinked(NodeId),

    #[error("node {0} is not part of block {1}")]
    NotInBlock(NodeId, BlockId),

    #[error("range starting at {0} does not terminate inside its block")]
    UnterminatedRange(NodeId),

    #[error("block {0} is not in tree form")]
    NotInTreeForm(BlockId),

    #[error("block {0} is not in linear form")]
    NotInLinearForm(BlockId),

    #[error("function is in {found} form, expected {expected} form")]
    WrongForm { expected: IrForm, found: IrForm },

    #[error("operand {index} of {user} no longer holds the expected def")]
    StaleUse { user: NodeId, index: usize },

    #[error("node {0} is not a call")]
    NotACall(NodeId),

    #[error("{0} has no store form")]
    NoStoreForm(Oper),

    #[error("{0} has no address form")]
    NoAddrForm(Oper),

    #[error("{0} has no load form")]
    NoLoadForm(Oper),
}

/// Result type for IR editing
pub type Result<T> = std::result::Result<T, IrError>;
