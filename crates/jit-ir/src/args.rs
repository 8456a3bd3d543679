//! Call argument tables.
//!
//! Every call owns a side table describing its arguments: which formal
//! position each one fills and which node currently computes it. The table
//! refers to nodes by id, so whoever replaces an argument node must repoint
//! the matching entry, unless the argument is late-bound (see
//! [`NodeFlags::LATE_ARG`](crate::NodeFlags::LATE_ARG)).

use crate::node::NodeId;

/// One argument descriptor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArgTabEntry {
    /// Formal argument position
    pub arg_num: u32,
    /// Node currently computing the argument's value
    pub node: NodeId,
    /// The argument is evaluated in the late argument list and its binding is
    /// carried by the `LATE_ARG` flag on the node.
    pub is_late: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ArgTable {
    entries: Vec<ArgTabEntry>,
}

impl ArgTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, entry: ArgTabEntry) {
        self.entries.push(entry);
    }

    pub fn entries(&self) -> &[ArgTabEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entry_by_arg_num(&self, arg_num: u32) -> Option<&ArgTabEntry> {
        self.entries.iter().find(|e| e.arg_num == arg_num)
    }

    pub fn entry_by_node(&self, node: NodeId) -> Option<&ArgTabEntry> {
        self.entries.iter().find(|e| e.node == node)
    }

    pub fn entry_by_node_mut(&mut self, node: NodeId) -> Option<&mut ArgTabEntry> {
        self.entries.iter_mut().find(|e| e.node == node)
    }

    /// Whether any entry, late or not, refers to `node`.
    pub fn references(&self, node: NodeId) -> bool {
        self.entry_by_node(node).is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entry_lookup() {
        let mut table = ArgTable::new();
        table.push(ArgTabEntry {
            arg_num: 0,
            node: NodeId(4),
            is_late: false,
        });
        table.push(ArgTabEntry {
            arg_num: 1,
            node: NodeId(7),
            is_late: true,
        });

        assert_eq!(table.len(), 2);
        assert_eq!(table.entry_by_node(NodeId(7)).map(|e| e.arg_num), Some(1));
        assert_eq!(table.entry_by_arg_num(0).map(|e| e.node), Some(NodeId(4)));
        assert!(table.entry_by_node(NodeId(5)).is_none());

        table.entry_by_node_mut(NodeId(4)).unwrap().node = NodeId(9);
        assert!(table.references(NodeId(9)));
        assert!(!table.references(NodeId(4)));
    }
}
