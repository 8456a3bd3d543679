use jit_ir::{IrError, NodeFlags, Oper, Use, VarType};
use tracing::debug;

use crate::rationalizer::Rationalizer;
use crate::stack::AncestorStack;
use crate::Result;

impl<'a> Rationalizer<'a> {
    /// `ADDR(x)` becomes the address form of `x` for locals and statics, and
    /// cancels against an indirection.
    pub(crate) fn rewrite_address(&mut self, use_: &mut Use, stack: &AncestorStack) -> Result<()> {
        let address = use_.def();
        let location = self.operand(address, 0)?;
        let location_oper = self.func.node(location).oper;

        if location_oper.is_local() || location_oper == Oper::ClsVar {
            let addr_oper = match location_oper {
                Oper::ClsVar => Oper::ClsVarAddr,
                oper => oper.addr_form().ok_or(IrError::NoAddrForm(oper))?,
            };
            let address_flags = self.func.node(address).flags;

            let node = self.func.node_mut(location);
            node.set_oper(addr_oper);
            node.ty = VarType::Byref;
            node.flags.copy_masked(address_flags, NodeFlags::ALL_EFFECT);

            self.replace_use(use_, stack, location)?;
            self.range().remove(address)?;
            debug!(%address, "rewrote ADDR({}) to {}", location_oper, addr_oper);
        } else if location_oper.is_indir() {
            let target = self.operand(location, 0)?;
            self.replace_use(use_, stack, target)?;
            self.range().remove(location)?;
            self.range().remove(address)?;
            debug!(%address, "rewrote ADDR({}(x)) to x", location_oper);
        }

        Ok(())
    }
}
