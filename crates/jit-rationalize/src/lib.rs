//! Rationalization: the hand-off from tree-form IR to linear IR.
//!
//! The pass runs once per function and leaves every block as a single
//! execution-ordered list of nodes with no tree-only constructs remaining:
//!
//! - **Intrinsic legalization**: intrinsics the target cannot expand are
//!   turned back into calls while the block is still in tree form
//! - **Linking**: each block's statements are spliced into one list, with an
//!   `IL_OFFSET` marker ahead of every statement that carries an offset
//! - **Rewriting**: a post-order walk lowers assignments to stores, removes
//!   address-of, comma, box and argument-shape nodes, canonicalizes vector
//!   values and drops unused local reads
//!
//! Call argument tables are repointed whenever a rewrite replaces an
//! argument node.
//!
//! # Example
//!
//! ```
//! use jit_ir::{IrForm, IrFunction, Oper, VarType};
//! use jit_rationalize::{rationalize, RationalizeConfig, TargetInfo};
//!
//! let mut func = IrFunction::new("example");
//! let x = func.new_local(VarType::Int, None);
//! let block = func.new_block();
//! let dst = func.lcl_var(x, VarType::Int);
//! let zero = func.cns_int(VarType::Int, 0);
//! let asg = func.assign(dst, zero);
//! func.add_statement(block, asg, None).unwrap();
//!
//! rationalize(&mut func, &TargetInfo::x64(), &RationalizeConfig::checked()).unwrap();
//! assert_eq!(func.form(), IrForm::Linear);
//! assert_eq!(func.node(asg).oper, Oper::StoreLclVar);
//! ```

use jit_ir::{
    BlockId, DefaultCallBuilder, IntrinsicId, IrError, IrFunction, LclNum, NodeId, Oper,
    VarType,
};
use thiserror::Error;

pub mod checks;
mod config;
mod fixup;
mod rationalizer;
mod rewrite;
mod stack;
mod target;

pub use config::RationalizeConfig;
pub use rationalizer::Rationalizer;
pub use stack::AncestorStack;
pub use target::{TargetArch, TargetCapabilities, TargetInfo};

/// Internal-consistency failures. Any of them aborts the function; the IR is
/// left in an unspecified state and must be discarded.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RationalizeError {
    #[error(transparent)]
    Ir(#[from] IrError),

    #[error("assignment {asg} has an unexpected {oper} destination")]
    UnexpectedAssignmentTarget { asg: NodeId, oper: Oper },

    #[error("call {call} has no argument table entry for {node}")]
    MissingArgEntry { call: NodeId, node: NodeId },

    #[error("intrinsic {intrinsic} at {node} is not supported by the target")]
    NonTargetIntrinsic { node: NodeId, intrinsic: IntrinsicId },

    #[error("field access {node} into independently promoted vector local {lcl}")]
    IllegalSimdFieldAccess { node: NodeId, lcl: LclNum },

    #[error("field store {node} into a vector local has type {ty}, expected nint")]
    IllegalSimdFieldStore { node: NodeId, ty: VarType },

    #[error("vector node {0} found but vector support is disabled")]
    SimdNotSupported(NodeId),

    #[error("no vector type of {size} bytes for {node}")]
    NoSimdType { node: NodeId, size: u32 },

    #[error("pointer-sized vector {node} has {base} elements, expected 4-byte elements")]
    BadSimdBaseType { node: NodeId, base: VarType },

    #[error("vector copy {node} reads from an unexpected {oper} source")]
    UnexpectedSimdSource { node: NodeId, oper: Oper },

    #[error("vector initialization {asg} targets {oper}, expected a block")]
    UnexpectedSimdInitTarget { asg: NodeId, oper: Oper },

    #[error("statement rooted at {root} in {block} is malformed: {reason}")]
    MalformedStatement {
        block: BlockId,
        root: NodeId,
        reason: &'static str,
    },

    #[error("{oper} node {node} must not appear here")]
    ForbiddenOperator { node: NodeId, oper: Oper },

    #[error("assignment {asg} does not flag local {local} as a definition")]
    MissingDefFlag { asg: NodeId, local: NodeId },

    #[error("assignment {asg} flags its source local {local} as a definition")]
    UnexpectedDefFlag { asg: NodeId, local: NodeId },

    #[error("unused local read {0} carries side effects")]
    EffectfulLocalRead(NodeId),

    #[error("range of {root} cannot be deleted: closed={closed}, has side effects={side_effects}")]
    RangeNotDeletable {
        root: NodeId,
        closed: bool,
        side_effects: bool,
    },

    #[error("linear range of {block} is broken at {node}: {reason}")]
    BrokenRange {
        block: BlockId,
        node: NodeId,
        reason: &'static str,
    },

    #[error("call {call} argument {node} is not a linked descendant of the call")]
    DanglingArgument { call: NodeId, node: NodeId },
}

/// Result type for rationalization
pub type Result<T> = std::result::Result<T, RationalizeError>;

/// Rationalize `func` into linear form, building helper calls with the
/// default call builder.
pub fn rationalize(
    func: &mut IrFunction,
    target: &dyn TargetCapabilities,
    config: &RationalizeConfig,
) -> Result<()> {
    let mut builder = DefaultCallBuilder;
    Rationalizer::new(func, target, &mut builder, config).run()
}

/// Rationalize `func` using a caller-provided call builder.
pub fn rationalize_with(
    func: &mut IrFunction,
    target: &dyn TargetCapabilities,
    call_builder: &mut dyn jit_ir::CallBuilder,
    config: &RationalizeConfig,
) -> Result<()> {
    Rationalizer::new(func, target, call_builder, config).run()
}
