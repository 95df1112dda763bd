use std::ops::Shr;

use slotmap::new_key_type;

pub const MAX_NODE_INPUTS: usize = 32;
pub const DEFAULT_MAX_DEPTH: usize = 1024;

new_key_type! { pub struct NodeKey; }

/// How a node's result buffer is owned.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum Storage {
    /// `prepare` allocates a buffer of the node's size filled with the operation's
    /// seed (`Operation::seed`) and keeps it with the node. The buffer is reused
    /// (and accumulated into) on every evaluation.
    #[default]
    Persistent,
    /// The node was given its buffer up front (literal payload or seeded accumulator).
    /// Its length must match the node's size.
    Seeded,
    /// No buffer is kept. The operation allocates a new one on every evaluation and
    /// the consuming node releases it.
    Fresh,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct GraphConfig {
    /// Maximum nesting of recursive evaluation frames.
    pub max_depth: usize,
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

impl GraphConfig {
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }
}

/// Counters for buffers allocated by operations on nodes without persistent storage.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct BufferStats {
    pub allocated: usize,
    pub released: usize,
}

impl BufferStats {
    /// Fresh buffers that were handed out but not released by the evaluator,
    /// i.e. fresh roots now owned by callers.
    pub fn outstanding(&self) -> usize {
        self.allocated.saturating_sub(self.released)
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Connection {
    pub from: NodeKey,
    pub to: NodeKey,
}

/// Connections collected with `>>`, applied with `Graph::connect_all`.
#[derive(Clone, Debug)]
pub struct ConnectionBuilder {
    pub(crate) from: NodeKey,
    pub(crate) connections: Vec<Connection>,
}

impl ConnectionBuilder {
    /// Also feed the same source into `to`.
    pub fn and(mut self, to: NodeKey) -> Self {
        self.connections.push(Connection {
            from: self.from,
            to,
        });
        self
    }

    pub fn connections(&self) -> &[Connection] {
        &self.connections
    }
}

impl Shr<NodeKey> for NodeKey {
    type Output = ConnectionBuilder;

    fn shr(self, to: NodeKey) -> ConnectionBuilder {
        ConnectionBuilder {
            from: self,
            connections: vec![Connection { from: self, to }],
        }
    }
}
