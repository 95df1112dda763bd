use std::borrow::Cow;
use std::error::Error;
use std::fmt;

use arrayvec::ArrayVec;
use log::{debug, trace};
use slotmap::SlotMap;

use super::topology::{self, TopologyError};
use super::traits::{OpContext, Operation, Produced, SizeError};
use super::types::{
    BufferStats, ConnectionBuilder, GraphConfig, NodeKey, Storage, MAX_NODE_INPUTS,
};
use crate::ops::Input;

#[derive(Debug)]
pub struct NodeData {
    pub operation: Box<dyn Operation>,
    pub inputs: ArrayVec<NodeKey, MAX_NODE_INPUTS>,
    /// Element count of each input's result, filled in by `Graph::prepare`.
    pub input_sizes: ArrayVec<usize, MAX_NODE_INPUTS>,
    /// Element count of this node's result, filled in by `Graph::prepare`.
    pub size: usize,
    pub storage: Storage,
    pub data: Option<Vec<f64>>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum GraphError {
    Allocation {
        node: NodeKey,
        operation: &'static str,
    },
    SizeMismatch {
        node: NodeKey,
        reason: String,
    },
    CycleDetected(Vec<NodeKey>),
    DepthExceeded {
        limit: usize,
    },
    NodeNotFound(NodeKey),
    TooManyInputs {
        limit: usize,
    },
}

impl fmt::Display for GraphError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GraphError::Allocation { node, operation } => write!(
                f,
                "Operation '{}' on node {:?} did not produce a buffer it owns",
                operation, node
            ),
            GraphError::SizeMismatch { node, reason } => {
                write!(f, "Size mismatch at node {:?}: {}", node, reason)
            }
            GraphError::CycleDetected(nodes) => write!(
                f,
                "Invalid cycle detected in graph. Cycle contains {} nodes",
                nodes.len()
            ),
            GraphError::DepthExceeded { limit } => {
                write!(f, "Graph is deeper than the evaluation limit of {}", limit)
            }
            GraphError::NodeNotFound(node) => write!(f, "Node {:?} does not exist", node),
            GraphError::TooManyInputs { limit } => {
                write!(f, "A node accepts at most {} inputs", limit)
            }
        }
    }
}

impl Error for GraphError {}

impl From<TopologyError<NodeKey>> for GraphError {
    fn from(err: TopologyError<NodeKey>) -> Self {
        match err {
            TopologyError::CycleDetected { path } => GraphError::CycleDetected(path),
        }
    }
}

/// Result of one evaluation frame.
#[derive(Debug)]
enum Slot {
    /// The producing node's own `data`; owned by the node, never released here.
    Persistent(NodeKey),
    /// Allocated during this evaluation; released by the consuming frame.
    Fresh(Vec<f64>),
}

#[derive(Debug)]
pub struct Graph {
    pub config: GraphConfig,
    nodes: SlotMap<NodeKey, NodeData>,
    node_order: Vec<NodeKey>,
    topology_dirty: bool,
    stats: BufferStats,
}

impl Default for Graph {
    fn default() -> Self {
        Self::new()
    }
}

impl Graph {
    pub fn new() -> Self {
        Self::with_config(GraphConfig::default())
    }

    pub fn with_config(config: GraphConfig) -> Self {
        Self {
            config,
            nodes: SlotMap::with_key(),
            node_order: Vec::new(),
            topology_dirty: true,
            stats: BufferStats::default(),
        }
    }

    /// Adds a leaf whose literal payload is `data`.
    pub fn add_input(&mut self, data: Vec<f64>) -> NodeKey {
        self.topology_dirty = true;
        self.nodes.insert(NodeData {
            operation: Box::new(Input),
            inputs: ArrayVec::new(),
            input_sizes: ArrayVec::new(),
            size: data.len(),
            storage: Storage::Seeded,
            data: Some(data),
        })
    }

    pub fn add_node<O>(
        &mut self,
        operation: O,
        inputs: &[NodeKey],
        storage: Storage,
    ) -> Result<NodeKey, GraphError>
    where
        O: Operation + 'static,
    {
        self.add_operation(Box::new(operation), inputs, storage)
    }

    /// Adds a node that owns `data` from the start, e.g. an accumulator with a
    /// non-zero seed.
    pub fn add_seeded<O>(
        &mut self,
        operation: O,
        inputs: &[NodeKey],
        data: Vec<f64>,
    ) -> Result<NodeKey, GraphError>
    where
        O: Operation + 'static,
    {
        let key = self.add_operation(Box::new(operation), inputs, Storage::Seeded)?;
        if let Some(node) = self.nodes.get_mut(key) {
            node.data = Some(data);
        }
        Ok(key)
    }

    pub fn add_operation(
        &mut self,
        operation: Box<dyn Operation>,
        inputs: &[NodeKey],
        storage: Storage,
    ) -> Result<NodeKey, GraphError> {
        if let Some(&missing) = inputs.iter().find(|&&key| !self.nodes.contains_key(key)) {
            return Err(GraphError::NodeNotFound(missing));
        }

        let inputs = ArrayVec::<NodeKey, MAX_NODE_INPUTS>::try_from(inputs).map_err(|_| {
            GraphError::TooManyInputs {
                limit: MAX_NODE_INPUTS,
            }
        })?;

        self.topology_dirty = true;

        Ok(self.nodes.insert(NodeData {
            operation,
            inputs,
            input_sizes: ArrayVec::new(),
            size: 0,
            storage,
            data: None,
        }))
    }

    /// Appends `from` to the inputs of `to`.
    pub fn connect(&mut self, from: NodeKey, to: NodeKey) -> Result<(), GraphError> {
        if !self.nodes.contains_key(from) {
            return Err(GraphError::NodeNotFound(from));
        }

        let node = self.nodes.get_mut(to).ok_or(GraphError::NodeNotFound(to))?;
        node.inputs
            .try_push(from)
            .map_err(|_| GraphError::TooManyInputs {
                limit: MAX_NODE_INPUTS,
            })?;

        self.topology_dirty = true;
        Ok(())
    }

    pub fn connect_all(&mut self, connections: Vec<ConnectionBuilder>) -> Result<(), GraphError> {
        for builder in connections {
            for connection in builder.connections {
                self.connect(connection.from, connection.to)?;
            }
        }
        Ok(())
    }

    /// Removes every occurrence of `from` among the inputs of `to`.
    pub fn disconnect(&mut self, from: NodeKey, to: NodeKey) -> bool {
        let Some(node) = self.nodes.get_mut(to) else {
            return false;
        };

        let original_len = node.inputs.len();
        node.inputs.retain(|key| *key != from);
        let removed = node.inputs.len() != original_len;

        if removed {
            self.topology_dirty = true;
        }

        removed
    }

    pub fn remove_node(&mut self, node_key: NodeKey) -> bool {
        if self.nodes.remove(node_key).is_none() {
            return false;
        }

        for node in self.nodes.values_mut() {
            node.inputs.retain(|key| *key != node_key);
        }
        self.node_order.retain(|&key| key != node_key);

        self.topology_dirty = true;
        true
    }

    pub fn node(&self, key: NodeKey) -> Option<&NodeData> {
        self.nodes.get(key)
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn data(&self, key: NodeKey) -> Option<&[f64]> {
        self.nodes.get(key).and_then(|node| node.data.as_deref())
    }

    /// Mutable access to a node's buffer, for changing a payload in place between
    /// evaluations. Lengths cannot change through this handle.
    pub fn data_mut(&mut self, key: NodeKey) -> Option<&mut [f64]> {
        self.nodes
            .get_mut(key)
            .and_then(|node| node.data.as_deref_mut())
    }

    /// Replaces a node's buffer. The node keeps it from now on.
    pub fn set_data(&mut self, key: NodeKey, data: Vec<f64>) -> Result<(), GraphError> {
        let node = self.nodes.get_mut(key).ok_or(GraphError::NodeNotFound(key))?;

        if node.data.as_ref().map(Vec::len) != Some(data.len()) {
            self.topology_dirty = true;
        }

        node.storage = Storage::Seeded;
        node.data = Some(data);
        Ok(())
    }

    pub fn size(&self, key: NodeKey) -> Option<usize> {
        self.nodes.get(key).map(|node| node.size)
    }

    pub fn input_sizes(&self, key: NodeKey) -> Option<&[usize]> {
        self.nodes.get(key).map(|node| node.input_sizes.as_slice())
    }

    pub fn stats(&self) -> BufferStats {
        self.stats
    }

    pub fn reset_stats(&mut self) {
        self.stats = BufferStats::default();
    }

    /// Node keys with every node after all of its inputs.
    /// Empty until the graph has been prepared.
    pub fn node_order(&self) -> &[NodeKey] {
        &self.node_order
    }

    /// Validates the graph and precomputes everything evaluation relies on:
    /// rejects cycles, derives every node's input sizes and output size, and
    /// allocates the buffers of `Storage::Persistent` nodes.
    pub fn prepare(&mut self) -> Result<(), GraphError> {
        self.node_order = self.topological_sort()?;

        for index in 0..self.node_order.len() {
            let key = self.node_order[index];
            self.prepare_node(key)?;
        }

        self.topology_dirty = false;
        debug!("prepared graph with {} nodes", self.node_order.len());
        Ok(())
    }

    fn prepare_node(&mut self, key: NodeKey) -> Result<(), GraphError> {
        let node = self.nodes.get(key).ok_or(GraphError::NodeNotFound(key))?;

        let mut input_sizes = ArrayVec::<usize, MAX_NODE_INPUTS>::new();
        for &input in &node.inputs {
            let input_node = self.nodes.get(input).ok_or(GraphError::NodeNotFound(input))?;
            input_sizes.push(input_node.size);
        }

        let size_mismatch = |reason: String| GraphError::SizeMismatch { node: key, reason };

        let size = match (&node.data, node.inputs.is_empty()) {
            (Some(data), true) => data.len(),
            _ => node
                .operation
                .output_size(&input_sizes)
                .map_err(|err: SizeError| size_mismatch(err.to_string()))?,
        };

        let node = self.nodes.get_mut(key).ok_or(GraphError::NodeNotFound(key))?;
        match node.storage {
            Storage::Persistent => {
                if node.data.as_ref().map(Vec::len) != Some(size) {
                    trace!("allocating {} persistent values for {:?}", size, key);
                    node.data = Some(vec![node.operation.seed(); size]);
                }
            }
            Storage::Seeded => {
                let len = node.data.as_ref().map(Vec::len).unwrap_or(0);
                if len != size {
                    return Err(size_mismatch(format!(
                        "buffer has {} elements, operation '{}' produces {}",
                        len,
                        node.operation.name(),
                        size
                    )));
                }
            }
            Storage::Fresh => node.data = None,
        }

        node.input_sizes = input_sizes;
        node.size = size;
        Ok(())
    }

    fn update_topology_if_needed(&mut self) -> Result<(), GraphError> {
        if self.topology_dirty {
            self.prepare()?;
        }
        Ok(())
    }

    fn topological_sort(&self) -> Result<Vec<NodeKey>, GraphError> {
        let get_dependencies = |key: &NodeKey| -> Vec<NodeKey> {
            self.nodes
                .get(*key)
                .map(|node| node.inputs.to_vec())
                .unwrap_or_default()
        };

        topology::topological_sort(self.nodes.keys(), get_dependencies).map_err(|err| {
            debug!("rejecting graph: {}", err);
            GraphError::from(err)
        })
    }

    /// Evaluates `root`, evaluating its inputs first.
    ///
    /// A root that owns `data` is returned borrowed: the slice is the node's own
    /// buffer. A root without `data` hands its freshly allocated buffer to the
    /// caller as `Cow::Owned`.
    pub fn evaluate(&mut self, root: NodeKey) -> Result<Cow<'_, [f64]>, GraphError> {
        self.update_topology_if_needed()?;

        match self.evaluate_node(root, 0)? {
            Slot::Fresh(buffer) => Ok(Cow::Owned(buffer)),
            Slot::Persistent(key) => self
                .data(key)
                .map(Cow::Borrowed)
                .ok_or(GraphError::NodeNotFound(key)),
        }
    }

    fn evaluate_node(&mut self, key: NodeKey, depth: usize) -> Result<Slot, GraphError> {
        if depth >= self.config.max_depth {
            return Err(GraphError::DepthExceeded {
                limit: self.config.max_depth,
            });
        }

        let input_count = self
            .nodes
            .get(key)
            .map(|node| node.inputs.len())
            .ok_or(GraphError::NodeNotFound(key))?;

        // Index-based to avoid cloning the input list on every frame
        let mut slots = Vec::with_capacity(input_count);
        for index in 0..input_count {
            let Some(input) = self
                .nodes
                .get(key)
                .and_then(|node| node.inputs.get(index))
                .copied()
            else {
                break;
            };
            slots.push(self.evaluate_node(input, depth + 1)?);
        }

        // The node's own buffer leaves the arena for the call so the input slices
        // can be borrowed from it at the same time.
        let mut data = self.nodes.get_mut(key).and_then(|node| node.data.take());
        let owns_data = data.is_some();

        let applied = self.apply(key, &slots, data.as_deref_mut());

        if let Some(node) = self.nodes.get_mut(key) {
            node.data = data;
        }

        let (operation, produced) = applied?;
        let result = match (produced, owns_data) {
            (Some(Produced::InPlace), true) => Slot::Persistent(key),
            (Some(Produced::Fresh(buffer)), false) => {
                self.stats.allocated += 1;
                trace!("{:?} ({}) allocated {} values", key, operation, buffer.len());
                Slot::Fresh(buffer)
            }
            _ => {
                return Err(GraphError::Allocation {
                    node: key,
                    operation,
                })
            }
        };

        for slot in slots {
            if let Slot::Fresh(buffer) = slot {
                self.stats.released += 1;
                trace!("{:?} released an input buffer of {} values", key, buffer.len());
            }
        }

        Ok(result)
    }

    fn apply(
        &self,
        key: NodeKey,
        slots: &[Slot],
        data: Option<&mut [f64]>,
    ) -> Result<(&'static str, Option<Produced>), GraphError> {
        let node = self.nodes.get(key).ok_or(GraphError::NodeNotFound(key))?;

        let mut inputs: Vec<&[f64]> = Vec::with_capacity(slots.len());
        for slot in slots {
            inputs.push(self.resolve(slot)?);
        }

        let context = OpContext::new(&inputs, &node.input_sizes);
        let produced = node.operation.apply(&context, data);
        Ok((node.operation.name(), produced))
    }

    fn resolve<'a>(&'a self, slot: &'a Slot) -> Result<&'a [f64], GraphError> {
        match slot {
            Slot::Fresh(buffer) => Ok(buffer.as_slice()),
            Slot::Persistent(key) => self.data(*key).ok_or(GraphError::NodeNotFound(*key)),
        }
    }
}
