//! Per-node flag bits: side-effect summaries, liveness markers and
//! operator-specific qualifiers.

use bitflags::bitflags;

bitflags! {
    /// Flags carried by every node.
    ///
    /// The effect bits (`ASG` through `ORDER_SIDEEFF`) summarize the node
    /// *and everything beneath it*; node constructors propagate them upward
    /// from operands.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct NodeFlags: u32 {
        /// An assignment happens at or below this node.
        const ASG = 1 << 0;
        /// A call happens at or below this node.
        const CALL = 1 << 1;
        /// This node or a descendant may throw.
        const EXCEPT = 1 << 2;
        /// This node or a descendant reads or writes global state.
        const GLOB_REF = 1 << 3;
        /// Ordering with respect to other side effects must be kept.
        const ORDER_SIDEEFF = 1 << 4;

        const ALL_EFFECT = Self::ASG.bits()
            | Self::CALL.bits()
            | Self::EXCEPT.bits()
            | Self::GLOB_REF.bits()
            | Self::ORDER_SIDEEFF.bits();

        /// The second operand is evaluated before the first.
        const REVERSE_OPS = 1 << 5;
        const DONT_CSE = 1 << 6;
        /// This call argument is bound through the flag rather than through
        /// an up-to-date argument table entry.
        const LATE_ARG = 1 << 7;

        /// The local node is a definition.
        const VAR_DEF = 1 << 8;
        /// Partial definition: the local is both used and defined.
        const VAR_USEASG = 1 << 9;
        /// Use-def of a local in a compound operation.
        const VAR_USEDEF = 1 << 10;
        /// Last use of the local.
        const VAR_DEATH = 1 << 11;

        const LIVENESS_MASK = Self::VAR_DEF.bits()
            | Self::VAR_USEASG.bits()
            | Self::VAR_USEDEF.bits()
            | Self::VAR_DEATH.bits();

        const IND_VOLATILE = 1 << 12;
        const IND_UNALIGNED = 1 << 13;
        const IND_NONFAULTING = 1 << 14;

        const IND_FLAGS = Self::IND_VOLATILE.bits()
            | Self::IND_UNALIGNED.bits()
            | Self::IND_NONFAULTING.bits();

        const BLK_VOLATILE = Self::IND_VOLATILE.bits();
        const BLK_UNALIGNED = Self::IND_UNALIGNED.bits();
        /// The block operation initializes rather than copies.
        const BLK_INIT = 1 << 15;
    }
}

impl NodeFlags {
    /// Replace the bits selected by `mask` with those of `src`.
    pub fn copy_masked(&mut self, src: NodeFlags, mask: NodeFlags) {
        self.remove(mask);
        self.insert(src & mask);
    }

    /// The effect subset of these flags.
    pub fn effects(self) -> NodeFlags {
        self & NodeFlags::ALL_EFFECT
    }

    pub fn has_side_effects(self) -> bool {
        self.intersects(NodeFlags::ALL_EFFECT)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_copy_masked() {
        let mut dst = NodeFlags::VAR_DEF | NodeFlags::CALL;
        let src = NodeFlags::VAR_DEATH | NodeFlags::EXCEPT;
        dst.copy_masked(src, NodeFlags::LIVENESS_MASK);
        assert_eq!(dst, NodeFlags::VAR_DEATH | NodeFlags::CALL);
    }

    #[test]
    fn test_effects() {
        let flags = NodeFlags::CALL | NodeFlags::REVERSE_OPS | NodeFlags::LATE_ARG;
        assert_eq!(flags.effects(), NodeFlags::CALL);
        assert!(flags.has_side_effects());
        assert!(!NodeFlags::VAR_DEF.has_side_effects());
    }
}
