mod graph_impl;
pub mod topology;
mod traits;
pub mod types;


pub use graph_impl::{Graph, GraphError, NodeData};
pub use traits::{uniform_size, Arity, OpContext, Operation, Produced, SizeError};
pub use types::{
    BufferStats, Connection, ConnectionBuilder, GraphConfig, NodeKey, Storage, DEFAULT_MAX_DEPTH,
    MAX_NODE_INPUTS,
};
