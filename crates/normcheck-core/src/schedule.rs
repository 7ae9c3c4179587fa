use crate::graph::{GraphView, NodeId};
use crate::{NormError, Result};
use std::collections::{HashMap, HashSet, VecDeque};
use tracing::debug;

#[derive(Debug, Clone)]
pub struct Schedule {
    /// Nodes in an order where dependencies appear before dependents.
    pub topo: Vec<NodeId>,
}

impl Schedule {
    pub fn len(&self) -> usize {
        self.topo.len()
    }

    pub fn is_empty(&self) -> bool {
        self.topo.is_empty()
    }
}

/// Compute a topo order for the subgraph required to produce `outputs`.
///
/// - Only includes nodes reachable from outputs.
/// - Ensures dependencies appear before dependents.
/// - The order is deterministic: the initial ready set and each node's users
///   are visited in id order.
/// - Detects cycles and dangling inputs.
pub fn topo_schedule(graph: &dyn GraphView, outputs: &[NodeId]) -> Result<Schedule> {
    // 1) Collect reachable nodes by reverse traversal (from outputs to inputs).
    let mut reachable: HashSet<NodeId> = HashSet::new();
    let mut stack: Vec<NodeId> = outputs.to_vec();

    while let Some(nid) = stack.pop() {
        if !reachable.insert(nid) {
            continue;
        }
        let n = graph
            .node(nid)
            .ok_or(NormError::Graph("schedule references a missing node"))?;
        stack.extend(n.inputs.iter().copied());
    }

    // 2) In-degrees within the reachable subgraph + adjacency (dep -> users).
    let mut indeg: HashMap<NodeId, usize> = HashMap::new();
    let mut users: HashMap<NodeId, Vec<NodeId>> = HashMap::new();

    for &nid in reachable.iter() {
        indeg.entry(nid).or_insert(0);
        let Some(node) = graph.node(nid) else {
            continue;
        };
        for &inp in node.inputs.iter() {
            *indeg.entry(nid).or_insert(0) += 1;
            users.entry(inp).or_default().push(nid);
        }
    }

    // 3) Kahn's algorithm.
    let mut ready: Vec<NodeId> = indeg
        .iter()
        .filter(|&(_, &d)| d == 0)
        .map(|(&nid, _)| nid)
        .collect();
    ready.sort();
    let mut q: VecDeque<NodeId> = ready.into();

    let mut topo = Vec::with_capacity(reachable.len());
    while let Some(nid) = q.pop_front() {
        topo.push(nid);
        if let Some(us) = users.get_mut(&nid) {
            us.sort();
            for &u in us.iter() {
                if let Some(e) = indeg.get_mut(&u) {
                    *e -= 1;
                    if *e == 0 {
                        q.push_back(u);
                    }
                }
            }
        }
    }

    if topo.len() != reachable.len() {
        return Err(NormError::Graph("cycle detected in graph"));
    }

    debug!(nodes = topo.len(), outputs = outputs.len(), "scheduled graph");
    Ok(Schedule { topo })
}

/// Schedule every node of the graph.
pub fn schedule_all(graph: &dyn GraphView) -> Result<Schedule> {
    topo_schedule(graph, &graph.node_ids())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{Graph, Node, OpKind, TensorMeta};
    use crate::types::{DType, Shape};
    use smallvec::SmallVec;

    fn meta() -> TensorMeta {
        TensorMeta {
            shape: Shape::new(vec![2, 3]),
            dtype: DType::F32,
        }
    }

    #[test]
    fn test_dependencies_first() {
        let mut g = Graph::new();
        let a = g.add_node(OpKind::Input, SmallVec::new(), meta());
        let b = g.add_node(
            OpKind::Softmax { axis: -1 },
            SmallVec::from_slice(&[a]),
            meta(),
        );
        let c = g.add_node(
            OpKind::Softmax { axis: 0 },
            SmallVec::from_slice(&[b]),
            meta(),
        );

        let s = topo_schedule(&g, &[c]).unwrap();
        assert_eq!(s.topo, vec![a, b, c]);
    }

    #[test]
    fn test_order_is_repeatable() {
        let mut g = Graph::new();
        let x = g.add_node(OpKind::Input, SmallVec::new(), meta());
        let y = g.add_node(OpKind::Input, SmallVec::new(), meta());
        let from_y = g.add_node(
            OpKind::Softmax { axis: -1 },
            SmallVec::from_slice(&[y]),
            meta(),
        );
        let from_x = g.add_node(
            OpKind::Softmax { axis: -1 },
            SmallVec::from_slice(&[x]),
            meta(),
        );

        let first = schedule_all(&g).unwrap();
        // Users are released in queue order, not global id order.
        assert_eq!(first.topo, vec![x, y, from_x, from_y]);
        for _ in 0..8 {
            assert_eq!(schedule_all(&g).unwrap().topo, first.topo);
        }
    }

    #[test]
    fn test_only_reachable_nodes() {
        let mut g = Graph::new();
        let a = g.add_node(OpKind::Input, SmallVec::new(), meta());
        let _unused = g.add_node(OpKind::Input, SmallVec::new(), meta());
        let b = g.add_node(
            OpKind::Softmax { axis: -1 },
            SmallVec::from_slice(&[a]),
            meta(),
        );
        assert_eq!(topo_schedule(&g, &[b]).unwrap().len(), 2);
        assert_eq!(schedule_all(&g).unwrap().len(), 3);
    }

    struct Cyclic {
        nodes: Vec<Node>,
    }

    impl GraphView for Cyclic {
        fn node(&self, id: NodeId) -> Option<&Node> {
            self.nodes.iter().find(|n| n.id == id)
        }

        fn node_ids(&self) -> Vec<NodeId> {
            self.nodes.iter().map(|n| n.id).collect()
        }
    }

    #[test]
    fn test_cycle_detected() {
        let a = NodeId(0);
        let b = NodeId(1);
        let g = Cyclic {
            nodes: vec![
                Node {
                    id: a,
                    op: OpKind::Softmax { axis: 0 },
                    inputs: SmallVec::from_slice(&[b]),
                    meta: meta(),
                },
                Node {
                    id: b,
                    op: OpKind::Softmax { axis: 0 },
                    inputs: SmallVec::from_slice(&[a]),
                    meta: meta(),
                },
            ],
        };
        let err = topo_schedule(&g, &[a]).unwrap_err();
        assert!(matches!(err, NormError::Graph(_)));
    }

    #[test]
    fn test_missing_node() {
        let g = Graph::new();
        assert!(topo_schedule(&g, &[NodeId(3)]).is_err());
    }
}
