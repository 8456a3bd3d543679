//! IR nodes.
//!
//! A node is a tagged operator with a type, a flag set, owned operand slots
//! and an operator-specific payload. Once a node sits in an evaluation-order
//! list it also carries `prev`/`next` links. Nodes live in the function's
//! arena and are addressed by [`NodeId`]; they are never freed individually.

use smol_str::SmolStr;
use std::fmt;

use crate::args::ArgTable;
use crate::flags::NodeFlags;
use crate::function::LclNum;
use crate::oper::{IntrinsicId, Oper, SimdIntrinsicId};
use crate::types::VarType;

/// Index of a node in its function's arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub u32);

impl NodeId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "n{:03}", self.0)
    }
}

/// Reference to a method, as resolved by the front end.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MethodRef(pub SmolStr);

impl MethodRef {
    pub fn new(name: impl Into<SmolStr>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MethodRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Field sequence annotation on a local field access.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum FieldSeq {
    /// The access does not correspond to a declared field (e.g. overlapping
    /// layouts that could not be analyzed).
    #[default]
    NotAField,
    Field(SmolStr),
}

/// Payload of local variable nodes (reads, stores and addresses).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalData {
    pub lcl_num: LclNum,
    pub ssa_num: u32,
    /// Byte offset of a field access; zero for whole-local nodes
    pub offset: u32,
    pub field_seq: FieldSeq,
}

impl LocalData {
    pub fn new(lcl_num: LclNum) -> Self {
        Self {
            lcl_num,
            ssa_num: 0,
            offset: 0,
            field_seq: FieldSeq::NotAField,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallKind {
    User,
    Helper,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallData {
    pub kind: CallKind,
    pub method: MethodRef,
    pub arg_table: ArgTable,
    /// Operand slot of the early argument list, if any
    pub early_args: Option<usize>,
    /// Operand slot of the late argument list, if any
    pub late_args: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IntrinsicData {
    pub id: IntrinsicId,
    /// The library method implementing the intrinsic
    pub method: MethodRef,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SimdData {
    pub intrinsic: SimdIntrinsicId,
    pub base_type: VarType,
    /// Vector size in bytes
    pub size: u32,
}

/// `base + index * scale + offset`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddrModeData {
    pub scale: u32,
    pub offset: i32,
}

/// Operator-specific payload.
#[derive(Debug, Clone, PartialEq)]
pub enum NodeData {
    None,
    Local(LocalData),
    ClsVar(SmolStr),
    IntCon(i64),
    DblCon(f64),
    Blk { size: u32 },
    Call(CallData),
    Intrinsic(IntrinsicData),
    Simd(SimdData),
    AddrMode(AddrModeData),
    /// `aggregate` lists carry a multi-register value and survive
    /// linearization; all other lists only describe argument shape.
    ArgList { aggregate: bool },
    IlOffset(u32),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub oper: Oper,
    pub ty: VarType,
    pub flags: NodeFlags,
    pub operands: Vec<NodeId>,
    pub data: NodeData,
    pub prev: Option<NodeId>,
    pub next: Option<NodeId>,
    pub(crate) linked: bool,
}

impl Node {
    pub fn new(oper: Oper, ty: VarType, operands: Vec<NodeId>, data: NodeData) -> Self {
        Self {
            oper,
            ty,
            flags: NodeFlags::empty(),
            operands,
            data,
            prev: None,
            next: None,
            linked: false,
        }
    }

    /// Whether the node currently occupies a position in an evaluation-order
    /// list (a statement in tree form, a block range in linear form).
    pub fn is_linked(&self) -> bool {
        self.linked
    }

    pub fn op1(&self) -> Option<NodeId> {
        self.operands.first().copied()
    }

    pub fn op2(&self) -> Option<NodeId> {
        self.operands.get(1).copied()
    }

    /// Retag the node in place. Operands and payload are left untouched.
    pub fn set_oper(&mut self, oper: Oper) {
        self.oper = oper;
    }

    pub fn local(&self) -> Option<&LocalData> {
        match &self.data {
            NodeData::Local(local) => Some(local),
            _ => None,
        }
    }

    pub fn local_mut(&mut self) -> Option<&mut LocalData> {
        match &mut self.data {
            NodeData::Local(local) => Some(local),
            _ => None,
        }
    }

    pub fn call(&self) -> Option<&CallData> {
        match &self.data {
            NodeData::Call(call) => Some(call),
            _ => None,
        }
    }

    pub fn call_mut(&mut self) -> Option<&mut CallData> {
        match &mut self.data {
            NodeData::Call(call) => Some(call),
            _ => None,
        }
    }

    pub fn intrinsic(&self) -> Option<&IntrinsicData> {
        match &self.data {
            NodeData::Intrinsic(intrinsic) => Some(intrinsic),
            _ => None,
        }
    }

    pub fn simd(&self) -> Option<&SimdData> {
        match &self.data {
            NodeData::Simd(simd) => Some(simd),
            _ => None,
        }
    }

    /// True for argument lists that only describe argument shape.
    pub fn is_non_aggregate_list(&self) -> bool {
        self.oper == Oper::List && !matches!(self.data, NodeData::ArgList { aggregate: true })
    }

    /// Operands in the order they are evaluated.
    pub fn eval_order_operands(&self) -> Vec<NodeId> {
        let mut operands = self.operands.clone();
        if operands.len() == 2 && self.flags.contains(NodeFlags::REVERSE_OPS) {
            operands.swap(0, 1);
        }
        operands
    }
}
