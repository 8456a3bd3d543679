//! Target capability queries.

use jit_ir::IntrinsicId;
use rustc_hash::FxHashSet;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TargetArch {
    X64,
    X86,
    Arm64,
    Arm,
}

impl TargetArch {
    /// x86 family targets
    pub fn is_xarch(self) -> bool {
        matches!(self, TargetArch::X64 | TargetArch::X86)
    }

    /// Intrinsics the code generator expands inline on this architecture.
    pub fn native_intrinsics(self) -> &'static [IntrinsicId] {
        match self {
            TargetArch::X64 | TargetArch::X86 => {
                &[IntrinsicId::Sqrt, IntrinsicId::Abs, IntrinsicId::Round]
            }
            TargetArch::Arm64 => &[
                IntrinsicId::Sqrt,
                IntrinsicId::Abs,
                IntrinsicId::Round,
                IntrinsicId::Floor,
                IntrinsicId::Ceiling,
            ],
            TargetArch::Arm => &[IntrinsicId::Sqrt, IntrinsicId::Abs],
        }
    }
}

impl fmt::Display for TargetArch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TargetArch::X64 => f.write_str("x64"),
            TargetArch::X86 => f.write_str("x86"),
            TargetArch::Arm64 => f.write_str("arm64"),
            TargetArch::Arm => f.write_str("arm"),
        }
    }
}

/// What the pass needs to know about the compilation target.
pub trait TargetCapabilities {
    fn arch(&self) -> TargetArch;

    /// Whether vector types are enabled for this compilation
    fn supports_simd(&self) -> bool;

    /// The intrinsic is a legal operator on this target.
    fn is_target_intrinsic(&self, id: IntrinsicId) -> bool;

    /// The intrinsic must be turned back into a call to its library method.
    fn is_intrinsic_implemented_by_user_call(&self, id: IntrinsicId) -> bool {
        !self.is_target_intrinsic(id)
    }
}

/// A concrete target description.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetInfo {
    arch: TargetArch,
    simd: bool,
    native: FxHashSet<IntrinsicId>,
}

impl TargetInfo {
    /// Target with the architecture's default native intrinsics and vector
    /// support disabled.
    pub fn new(arch: TargetArch) -> Self {
        Self {
            arch,
            simd: false,
            native: arch.native_intrinsics().iter().copied().collect(),
        }
    }

    pub fn x64() -> Self {
        Self::new(TargetArch::X64)
    }

    pub fn arm64() -> Self {
        Self::new(TargetArch::Arm64)
    }

    pub fn with_simd(mut self, enabled: bool) -> Self {
        self.simd = enabled;
        self
    }

    /// Replace the native intrinsic set.
    pub fn with_native_intrinsics(mut self, ids: impl IntoIterator<Item = IntrinsicId>) -> Self {
        self.native = ids.into_iter().collect();
        self
    }

    pub fn without_native_intrinsic(mut self, id: IntrinsicId) -> Self {
        self.native.remove(&id);
        self
    }
}

impl TargetCapabilities for TargetInfo {
    fn arch(&self) -> TargetArch {
        self.arch
    }

    fn supports_simd(&self) -> bool {
        self.simd
    }

    fn is_target_intrinsic(&self, id: IntrinsicId) -> bool {
        self.native.contains(&id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_intrinsics() {
        let x64 = TargetInfo::x64();
        assert!(x64.is_target_intrinsic(IntrinsicId::Sqrt));
        assert!(x64.is_intrinsic_implemented_by_user_call(IntrinsicId::Floor));
        assert!(!x64.supports_simd());

        let arm64 = TargetInfo::arm64();
        assert!(arm64.is_target_intrinsic(IntrinsicId::Ceiling));
        assert!(arm64.is_intrinsic_implemented_by_user_call(IntrinsicId::Pow));

        let arm = TargetInfo::new(TargetArch::Arm);
        assert!(!arm.is_target_intrinsic(IntrinsicId::Round));
    }

    #[test]
    fn test_overrides() {
        let target = TargetInfo::x64()
            .with_simd(true)
            .without_native_intrinsic(IntrinsicId::Sqrt);
        assert!(target.supports_simd());
        assert!(target.is_intrinsic_implemented_by_user_call(IntrinsicId::Sqrt));
        assert!(target.arch().is_xarch());

        let none = TargetInfo::arm64().with_native_intrinsics(Vec::new());
        assert!(!none.is_target_intrinsic(IntrinsicId::Abs));
    }
}
