//! Value types carried by IR nodes and local variables.

use std::fmt;

/// Size in bytes of a pointer on the compilation target.
pub const TARGET_POINTER_SIZE: u32 = 8;

/// Byte offset of the first element in an array object (method table pointer
/// plus the length field, padded to pointer alignment).
pub const ARRAY_ELEMS_OFFSET: i32 = 16;

/// The machine-level type of a node's value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VarType {
    Void,
    Bool,
    Byte,
    UByte,
    Short,
    UShort,
    Int,
    UInt,
    Long,
    ULong,
    Float,
    Double,
    /// Object reference tracked by the GC
    Ref,
    /// Interior (managed) pointer
    Byref,
    /// Native-sized integer
    IImpl,
    /// Aggregate value of arbitrary layout
    Struct,
    Simd8,
    Simd12,
    Simd16,
    Simd32,
}

impl VarType {
    /// Size of a value of this type in bytes. Aggregates report zero; their
    /// size lives on the node or local that carries them.
    pub fn size(self) -> u32 {
        match self {
            VarType::Void | VarType::Struct => 0,
            VarType::Bool | VarType::Byte | VarType::UByte => 1,
            VarType::Short | VarType::UShort => 2,
            VarType::Int | VarType::UInt | VarType::Float => 4,
            VarType::Long | VarType::ULong | VarType::Double => 8,
            VarType::Ref | VarType::Byref | VarType::IImpl => TARGET_POINTER_SIZE,
            VarType::Simd8 => 8,
            VarType::Simd12 => 12,
            VarType::Simd16 => 16,
            VarType::Simd32 => 32,
        }
    }

    pub fn is_simd(self) -> bool {
        matches!(
            self,
            VarType::Simd8 | VarType::Simd12 | VarType::Simd16 | VarType::Simd32
        )
    }

    /// True for aggregates, including vector types.
    pub fn is_struct(self) -> bool {
        self == VarType::Struct || self.is_simd()
    }

    pub fn is_integral(self) -> bool {
        matches!(
            self,
            VarType::Bool
                | VarType::Byte
                | VarType::UByte
                | VarType::Short
                | VarType::UShort
                | VarType::Int
                | VarType::UInt
                | VarType::Long
                | VarType::ULong
                | VarType::IImpl
        )
    }

    pub fn is_floating(self) -> bool {
        matches!(self, VarType::Float | VarType::Double)
    }

    /// The vector type with exactly `size` bytes, if there is one.
    pub fn simd_for_size(size: u32) -> Option<VarType> {
        match size {
            8 => Some(VarType::Simd8),
            12 => Some(VarType::Simd12),
            16 => Some(VarType::Simd16),
            32 => Some(VarType::Simd32),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            VarType::Void => "void",
            VarType::Bool => "bool",
            VarType::Byte => "byte",
            VarType::UByte => "ubyte",
            VarType::Short => "short",
            VarType::UShort => "ushort",
            VarType::Int => "int",
            VarType::UInt => "uint",
            VarType::Long => "long",
            VarType::ULong => "ulong",
            VarType::Float => "float",
            VarType::Double => "double",
            VarType::Ref => "ref",
            VarType::Byref => "byref",
            VarType::IImpl => "nint",
            VarType::Struct => "struct",
            VarType::Simd8 => "simd8",
            VarType::Simd12 => "simd12",
            VarType::Simd16 => "simd16",
            VarType::Simd32 => "simd32",
        }
    }
}

impl fmt::Display for VarType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Round `value` up to the next multiple of `align` (a power of two).
pub fn round_up(value: u32, align: u32) -> u32 {
    (value + align - 1) & !(align - 1)
}
