//! Lazy computation graph IR.
//!
//! Tensors are handles to nodes in this graph. Nothing is computed while the
//! graph is being described; `Runtime::launch` schedules it and
//! `Runtime::run` dispatches each node to the active backend.

use crate::types::{DType, Shape};
use smallvec::SmallVec;

/// Unique identifier for a node in the computation graph.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub(crate) u64);

/// Metadata about a tensor (known before materialization).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TensorMeta {
    pub shape: Shape,
    pub dtype: DType,
}

/// A node in the lazy computation graph.
#[derive(Clone, Debug)]
pub struct Node {
    pub id: NodeId,
    pub op: OpKind,
    pub inputs: SmallVec<[NodeId; 2]>,
    pub meta: TensorMeta,
}

/// The set of operations supported by the graph IR.
#[derive(Clone, Debug, PartialEq)]
pub enum OpKind {
    /// Input tensor, filled from the host after launch.
    Input,
    /// Softmax along `axis` (negative values count from the end).
    Softmax { axis: i32 },
    /// Sum along `axis`, keeping it with extent 1. With `relu`, each reduced
    /// value is clamped at zero.
    ReduceSum { axis: i32, relu: bool },
}

impl OpKind {
    pub fn is_source(&self) -> bool {
        matches!(self, OpKind::Input)
    }
}

/// Read-only view of a graph, used by the scheduler.
pub trait GraphView {
    fn node(&self, id: NodeId) -> Option<&Node>;
    fn node_ids(&self) -> Vec<NodeId>;
}

/// The computation graph arena.
#[derive(Debug, Default)]
pub struct Graph {
    nodes: Vec<Node>,
}

impl Graph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a node and return its ID.
    pub fn add_node(
        &mut self,
        op: OpKind,
        inputs: SmallVec<[NodeId; 2]>,
        meta: TensorMeta,
    ) -> NodeId {
        // Ids are arena indices; nodes are never removed.
        let id = NodeId(self.nodes.len() as u64);
        self.nodes.push(Node {
            id,
            op,
            inputs,
            meta,
        });
        id
    }

    /// Get a node by ID.
    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.0 as usize)
    }

    /// Number of nodes.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether the graph is empty.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

impl GraphView for Graph {
    fn node(&self, id: NodeId) -> Option<&Node> {
        self.get(id)
    }

    fn node_ids(&self) -> Vec<NodeId> {
        self.nodes.iter().map(|n| n.id).collect()
    }
}
