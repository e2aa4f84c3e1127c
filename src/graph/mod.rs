// Copyright (C) 2025 Jeremy J. Carroll. See LICENSE for details.

//! Behavior graph: the immutable tree of every packet-processing path.
//!
//! The graph is built elsewhere (from execution traces) and consumed here
//! read-only. [`GraphBuilder`] exists so callers and tests can assemble a
//! validated tree bottom-up.
//!
//! # Example
//!
//! ```
//! use epsynth::graph::{Call, Expr, GraphBuilder, Route};
//!
//! let mut builder = GraphBuilder::new();
//! let forward = builder.terminal(Route::Forward { port: 1 });
//! let drop = builder.terminal(Route::Drop);
//! let branch = builder.branch(Expr::opaque("is_tcp", 1), forward, drop);
//! let parse = builder.call(Call::new("packet_borrow_next_chunk"), branch);
//! let graph = builder.finish(parse).unwrap();
//!
//! assert_eq!(graph.len(), 4);
//! assert_eq!(graph.node(branch).parent, Some(parse));
//! ```

pub mod expr;
pub mod node;
pub mod ops;

pub use expr::{Addr, Expr, Symbol, SymbolSource};
pub use node::{Call, Node, NodeId, NodeKind, Route};

use crate::error::{Error, Result};
use std::collections::BTreeMap;

/// Immutable, validated behavior tree.
#[derive(Debug, Clone)]
pub struct BehaviorGraph {
    nodes: Vec<Node>,
    root: NodeId,
    /// Allocation call for each object address.
    allocations: BTreeMap<Addr, NodeId>,
}

impl BehaviorGraph {
    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Look up a node.
    ///
    /// # Panics
    ///
    /// Panics if `id` does not belong to this graph.
    pub fn node(&self, id: NodeId) -> &Node {
        self.nodes
            .get(id.0 as usize)
            .unwrap_or_else(|| panic!("Node {} is not part of the behavior graph", id))
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Node> {
        self.nodes.iter()
    }

    /// The node a call continues with.
    ///
    /// # Panics
    ///
    /// Panics if `id` is not a call or the call has no successor. A call
    /// reached by the planner must continue somewhere; a missing pointer is a
    /// graph-construction defect.
    pub fn successor(&self, id: NodeId) -> NodeId {
        match &self.node(id).kind {
            NodeKind::Call(call) => call.next.unwrap_or_else(|| {
                panic!(
                    "Behavior graph invariant violated: call {} ({}) has no successor",
                    id, call.function
                )
            }),
            other => panic!("Node {} is not a call: {:?}", id, other),
        }
    }

    /// The call that allocates `addr`, if the graph contains one.
    pub fn allocation(&self, addr: Addr) -> Option<&Call> {
        self.allocations
            .get(&addr)
            .and_then(|id| self.node(*id).as_call())
    }

    /// Number of branch nodes between the root and `id` (exclusive).
    pub fn branch_depth(&self, id: NodeId) -> u32 {
        let mut depth = 0;
        let mut current = self.node(id).parent;
        while let Some(parent) = current {
            let node = self.node(parent);
            if matches!(node.kind, NodeKind::Branch { .. }) {
                depth += 1;
            }
            current = node.parent;
        }
        depth
    }
}

/// Bottom-up builder for a [`BehaviorGraph`].
///
/// Children are created before their parents; [`GraphBuilder::finish`]
/// assigns parent pointers and rejects anything that is not a tree.
#[derive(Debug, Default)]
pub struct GraphBuilder {
    nodes: Vec<Node>,
}

impl GraphBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    fn push(&mut self, kind: NodeKind) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(Node {
            id,
            parent: None,
            kind,
        });
        id
    }

    pub fn call(&mut self, mut call: Call, next: NodeId) -> NodeId {
        call.next = Some(next);
        self.push(NodeKind::Call(call))
    }

    /// Add a call with no successor. Only useful for exercising the
    /// missing-successor invariant.
    pub fn call_unlinked(&mut self, mut call: Call) -> NodeId {
        call.next = None;
        self.push(NodeKind::Call(call))
    }

    pub fn branch(&mut self, condition: Expr, on_true: NodeId, on_false: NodeId) -> NodeId {
        self.push(NodeKind::Branch {
            condition,
            on_true,
            on_false,
        })
    }

    pub fn terminal(&mut self, route: Route) -> NodeId {
        self.push(NodeKind::Terminal(route))
    }

    /// Validate the tree rooted at `root` and freeze it.
    pub fn finish(mut self, root: NodeId) -> Result<BehaviorGraph> {
        let count = self.nodes.len();
        if root.0 as usize >= count {
            return Err(Error::Graph(format!("root {} does not exist", root)));
        }

        let mut visited = vec![false; count];
        let mut stack = vec![(root, None)];
        while let Some((id, parent)) = stack.pop() {
            let index = id.0 as usize;
            if index >= count {
                return Err(Error::Graph(format!(
                    "{} points to missing node {}",
                    parent.map_or_else(|| "root".to_string(), |p: NodeId| p.to_string()),
                    id
                )));
            }
            if visited[index] {
                return Err(Error::Graph(format!("node {} has more than one parent", id)));
            }
            visited[index] = true;
            self.nodes[index].parent = parent;
            for child in self.nodes[index].children().into_iter().rev() {
                stack.push((child, Some(id)));
            }
        }

        if let Some(index) = visited.iter().position(|seen| !seen) {
            return Err(Error::Graph(format!(
                "node {} is unreachable from root {}",
                NodeId(index as u32),
                root
            )));
        }

        let mut allocations = BTreeMap::new();
        for node in &self.nodes {
            let Some(call) = node.as_call() else { continue };
            if !ops::ALLOCATIONS.contains(&call.function.as_str()) {
                continue;
            }
            let addr = call.object().ok_or_else(|| {
                Error::Graph(format!("allocation {} has no object address", node.id))
            })?;
            if allocations.insert(addr, node.id).is_some() {
                return Err(Error::Graph(format!("object {} is allocated twice", addr)));
            }
        }

        Ok(BehaviorGraph {
            nodes: self.nodes,
            root,
            allocations,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::ops::arg;

    #[test]
    fn test_parents_assigned() {
        let mut b = GraphBuilder::new();
        let t1 = b.terminal(Route::Drop);
        let t2 = b.terminal(Route::Broadcast);
        let br = b.branch(Expr::opaque("c", 1), t1, t2);
        let root = b.call(Call::new(ops::CURRENT_TIME), br);
        let graph = b.finish(root).unwrap();

        assert_eq!(graph.root(), root);
        assert_eq!(graph.node(root).parent, None);
        assert_eq!(graph.node(br).parent, Some(root));
        assert_eq!(graph.node(t1).parent, Some(br));
        assert_eq!(graph.node(t2).parent, Some(br));
        assert_eq!(graph.branch_depth(t1), 1);
        assert_eq!(graph.branch_depth(br), 0);
    }

    #[test]
    fn test_shared_child_rejected() {
        let mut b = GraphBuilder::new();
        let t = b.terminal(Route::Drop);
        let br = b.branch(Expr::opaque("c", 1), t, t);
        let err = b.finish(br).unwrap_err();
        assert!(matches!(err, Error::Graph(msg) if msg.contains("more than one parent")));
    }

    #[test]
    fn test_unreachable_rejected() {
        let mut b = GraphBuilder::new();
        let _orphan = b.terminal(Route::Drop);
        let root = b.terminal(Route::Broadcast);
        assert!(b.finish(root).is_err());
    }

    #[test]
    fn test_missing_child_rejected() {
        let mut b = GraphBuilder::new();
        let t = b.terminal(Route::Drop);
        let root = b.branch(Expr::opaque("c", 1), t, NodeId(42));
        assert!(b.finish(root).is_err());
    }

    #[test]
    fn test_allocation_index() {
        let mut b = GraphBuilder::new();
        let t = b.terminal(Route::Drop);
        let alloc = Call::new(ops::MAP_ALLOCATE)
            .arg(arg::OBJ, Expr::addr(0x100))
            .arg(arg::CAPACITY, Expr::constant(1024, 32));
        let root = b.call(alloc, t);
        let graph = b.finish(root).unwrap();
        let call = graph.allocation(Addr(0x100)).unwrap();
        assert_eq!(call.const_or(arg::CAPACITY, 0), 1024);
        assert!(graph.allocation(Addr(0x200)).is_none());
    }

    #[test]
    fn test_double_allocation_rejected() {
        let mut b = GraphBuilder::new();
        let t = b.terminal(Route::Drop);
        let a2 = b.call(Call::new(ops::MAP_ALLOCATE).arg(arg::OBJ, Expr::addr(1)), t);
        let a1 = b.call(Call::new(ops::VECTOR_ALLOCATE).arg(arg::OBJ, Expr::addr(1)), a2);
        assert!(matches!(b.finish(a1), Err(Error::Graph(_))));
    }

    #[test]
    #[should_panic(expected = "has no successor")]
    fn test_missing_successor_is_fatal() {
        let mut b = GraphBuilder::new();
        let root = b.call_unlinked(Call::new(ops::CURRENT_TIME));
        let graph = b.finish(root).unwrap();
        graph.successor(root);
    }
}
