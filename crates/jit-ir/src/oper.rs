//! Operator kinds and their classification.
//!
//! Several operators come in families (load / store / address-of) and the
//! rationalizer moves nodes between the members of a family in place. The
//! `*_form` helpers encode those families.

use std::fmt;

/// The operator tag of a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Oper {
    // Locals
    LclVar,
    LclFld,
    StoreLclVar,
    StoreLclFld,
    LclVarAddr,
    LclFldAddr,

    // Statics
    ClsVar,
    ClsVarAddr,

    // Constants
    CnsInt,
    CnsDbl,

    // Memory
    Ind,
    StoreInd,
    Blk,
    Obj,
    DynBlk,
    StoreBlk,
    StoreObj,
    StoreDynBlk,
    Lea,

    // Tree-only wrappers
    Asg,
    Addr,
    Comma,
    Box,
    Nop,
    List,
    ArgPlace,
    Qmark,
    Colon,

    // Arithmetic
    Neg,
    Not,
    Cast,
    Add,
    Sub,
    Mul,
    Div,
    And,
    Or,
    Xor,
    Lsh,
    Rsh,

    // Relations
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,

    // Calls and intrinsics
    Call,
    Intrinsic,
    Simd,

    // Control and markers
    Return,
    Jtrue,
    IlOffset,
}

impl Oper {
    /// Reads or writes of a local variable.
    pub fn is_local(self) -> bool {
        matches!(
            self,
            Oper::LclVar | Oper::LclFld | Oper::StoreLclVar | Oper::StoreLclFld
        )
    }

    pub fn is_local_read(self) -> bool {
        matches!(self, Oper::LclVar | Oper::LclFld)
    }

    pub fn is_local_store(self) -> bool {
        matches!(self, Oper::StoreLclVar | Oper::StoreLclFld)
    }

    pub fn is_local_addr(self) -> bool {
        matches!(self, Oper::LclVarAddr | Oper::LclFldAddr)
    }

    /// Any node that dereferences its first operand.
    pub fn is_indir(self) -> bool {
        matches!(
            self,
            Oper::Ind
                | Oper::StoreInd
                | Oper::Blk
                | Oper::Obj
                | Oper::DynBlk
                | Oper::StoreBlk
                | Oper::StoreObj
                | Oper::StoreDynBlk
        )
    }

    pub fn is_blk(self) -> bool {
        matches!(
            self,
            Oper::Blk
                | Oper::Obj
                | Oper::DynBlk
                | Oper::StoreBlk
                | Oper::StoreObj
                | Oper::StoreDynBlk
        )
    }

    pub fn is_const(self) -> bool {
        matches!(self, Oper::CnsInt | Oper::CnsDbl)
    }

    /// Leaves never own operands.
    pub fn is_leaf(self) -> bool {
        matches!(
            self,
            Oper::LclVar
                | Oper::LclFld
                | Oper::LclVarAddr
                | Oper::LclFldAddr
                | Oper::ClsVar
                | Oper::ClsVarAddr
                | Oper::CnsInt
                | Oper::CnsDbl
                | Oper::ArgPlace
                | Oper::IlOffset
        )
    }

    /// Operators that only exist in tree form and must be gone once a
    /// function is linear.
    pub fn is_tree_only(self) -> bool {
        matches!(
            self,
            Oper::Asg
                | Oper::Addr
                | Oper::Comma
                | Oper::Box
                | Oper::ArgPlace
                | Oper::Qmark
                | Oper::Colon
        )
    }

    /// The store operator matching a local load operator.
    pub fn store_form(self) -> Option<Oper> {
        match self {
            Oper::LclVar => Some(Oper::StoreLclVar),
            Oper::LclFld => Some(Oper::StoreLclFld),
            _ => None,
        }
    }

    /// The address-of operator matching a local load operator.
    pub fn addr_form(self) -> Option<Oper> {
        match self {
            Oper::LclVar => Some(Oper::LclVarAddr),
            Oper::LclFld => Some(Oper::LclFldAddr),
            _ => None,
        }
    }

    /// The load operator matching a local address operator.
    pub fn load_form(self) -> Option<Oper> {
        match self {
            Oper::LclVarAddr => Some(Oper::LclVar),
            Oper::LclFldAddr => Some(Oper::LclFld),
            _ => None,
        }
    }

    /// The block store matching a block location operator.
    pub fn blk_store_form(self) -> Option<Oper> {
        match self {
            Oper::Blk => Some(Oper::StoreBlk),
            Oper::Obj => Some(Oper::StoreObj),
            Oper::DynBlk => Some(Oper::StoreDynBlk),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Oper::LclVar => "LCL_VAR",
            Oper::LclFld => "LCL_FLD",
            Oper::StoreLclVar => "STORE_LCL_VAR",
            Oper::StoreLclFld => "STORE_LCL_FLD",
            Oper::LclVarAddr => "LCL_VAR_ADDR",
            Oper::LclFldAddr => "LCL_FLD_ADDR",
            Oper::ClsVar => "CLS_VAR",
            Oper::ClsVarAddr => "CLS_VAR_ADDR",
            Oper::CnsInt => "CNS_INT",
            Oper::CnsDbl => "CNS_DBL",
            Oper::Ind => "IND",
            Oper::StoreInd => "STOREIND",
            Oper::Blk => "BLK",
            Oper::Obj => "OBJ",
            Oper::DynBlk => "DYN_BLK",
            Oper::StoreBlk => "STORE_BLK",
            Oper::StoreObj => "STORE_OBJ",
            Oper::StoreDynBlk => "STORE_DYN_BLK",
            Oper::Lea => "LEA",
            Oper::Asg => "ASG",
            Oper::Addr => "ADDR",
            Oper::Comma => "COMMA",
            Oper::Box => "BOX",
            Oper::Nop => "NOP",
            Oper::List => "LIST",
            Oper::ArgPlace => "ARGPLACE",
            Oper::Qmark => "QMARK",
            Oper::Colon => "COLON",
            Oper::Neg => "NEG",
            Oper::Not => "NOT",
            Oper::Cast => "CAST",
            Oper::Add => "ADD",
            Oper::Sub => "SUB",
            Oper::Mul => "MUL",
            Oper::Div => "DIV",
            Oper::And => "AND",
            Oper::Or => "OR",
            Oper::Xor => "XOR",
            Oper::Lsh => "LSH",
            Oper::Rsh => "RSH",
            Oper::Eq => "EQ",
            Oper::Ne => "NE",
            Oper::Lt => "LT",
            Oper::Le => "LE",
            Oper::Gt => "GT",
            Oper::Ge => "GE",
            Oper::Call => "CALL",
            Oper::Intrinsic => "INTRINSIC",
            Oper::Simd => "SIMD",
            Oper::Return => "RETURN",
            Oper::Jtrue => "JTRUE",
            Oper::IlOffset => "IL_OFFSET",
        }
    }
}

impl fmt::Display for Oper {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Math intrinsics recognized by the importer. Whether an intrinsic stays an
/// operator or becomes a call depends on the target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IntrinsicId {
    Sqrt,
    Abs,
    Round,
    Floor,
    Ceiling,
    Sin,
    Cos,
    Tan,
    Atan2,
    Pow,
    Exp,
    Log,
}

impl IntrinsicId {
    pub fn arity(self) -> usize {
        match self {
            IntrinsicId::Atan2 | IntrinsicId::Pow => 2,
            _ => 1,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            IntrinsicId::Sqrt => "Sqrt",
            IntrinsicId::Abs => "Abs",
            IntrinsicId::Round => "Round",
            IntrinsicId::Floor => "Floor",
            IntrinsicId::Ceiling => "Ceiling",
            IntrinsicId::Sin => "Sin",
            IntrinsicId::Cos => "Cos",
            IntrinsicId::Tan => "Tan",
            IntrinsicId::Atan2 => "Atan2",
            IntrinsicId::Pow => "Pow",
            IntrinsicId::Exp => "Exp",
            IntrinsicId::Log => "Log",
        }
    }
}

impl fmt::Display for IntrinsicId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Vector intrinsics carried by `Oper::Simd` nodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SimdIntrinsicId {
    /// Broadcast a scalar into every lane
    Init,
    /// Load a vector from `array[index..]`
    InitArray,
    Add,
    Sub,
    Mul,
    Div,
    Equal,
    DotProduct,
    Sqrt,
}

impl SimdIntrinsicId {
    pub fn name(self) -> &'static str {
        match self {
            SimdIntrinsicId::Init => "Init",
            SimdIntrinsicId::InitArray => "InitArray",
            SimdIntrinsicId::Add => "Add",
            SimdIntrinsicId::Sub => "Sub",
            SimdIntrinsicId::Mul => "Mul",
            SimdIntrinsicId::Div => "Div",
            SimdIntrinsicId::Equal => "Equal",
            SimdIntrinsicId::DotProduct => "DotProduct",
            SimdIntrinsicId::Sqrt => "Sqrt",
        }
    }
}

impl fmt::Display for SimdIntrinsicId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
