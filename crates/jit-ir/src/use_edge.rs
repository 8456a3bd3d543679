//! Def-use edges.
//!
//! A [`Use`] names one position that currently holds a value: an operand slot
//! of a user node, or the top level of a block where the value is discarded.
//! Rewrites replace values through the edge so they never need to know which
//! kind of position they are editing.

use crate::function::IrFunction;
use crate::node::NodeId;
use crate::{IrError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UseEdge {
    /// Operand `index` of `user`
    Operand { user: NodeId, index: usize },
    /// A statement root whose value nobody consumes
    TopLevel,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Use {
    edge: UseEdge,
    def: NodeId,
}

impl Use {
    /// The use of `user`'s operand `index`.
    pub fn operand(func: &IrFunction, user: NodeId, index: usize) -> Result<Use> {
        let def = func
            .node(user)
            .operands
            .get(index)
            .copied()
            .ok_or(IrError::StaleUse { user, index })?;
        Ok(Use {
            edge: UseEdge::Operand { user, index },
            def,
        })
    }

    /// A result-discarded position holding `def`.
    pub fn dummy(def: NodeId) -> Use {
        Use {
            edge: UseEdge::TopLevel,
            def,
        }
    }

    pub fn def(&self) -> NodeId {
        self.def
    }

    pub fn edge(&self) -> UseEdge {
        self.edge
    }

    /// The consuming node, `None` for a dummy use.
    pub fn user(&self) -> Option<NodeId> {
        match self.edge {
            UseEdge::Operand { user, .. } => Some(user),
            UseEdge::TopLevel => None,
        }
    }

    pub fn is_dummy_use(&self) -> bool {
        self.edge == UseEdge::TopLevel
    }

    /// Install `new` at this position. The previous def stays linked; removing
    /// it is up to the caller.
    pub fn replace_with(&mut self, func: &mut IrFunction, new: NodeId) -> Result<()> {
        if let UseEdge::Operand { user, index } = self.edge {
            let slot = func
                .node_mut(user)
                .operands
                .get_mut(index)
                .ok_or(IrError::StaleUse { user, index })?;
            if *slot != self.def {
                return Err(IrError::StaleUse { user, index });
            }
            *slot = new;
        }
        self.def = new;
        Ok(())
    }
}
