// Copyright (C) 2025 Jeremy J. Carroll. See LICENSE for details.

//! Behavior-graph nodes.

use crate::graph::expr::{Addr, Expr, Symbol};
use crate::graph::ops::arg;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

/// Identifier of a node within one behavior graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct NodeId(pub u32);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "n{}", self.0)
    }
}

/// What a packet path does when it ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Route {
    Forward { port: u16 },
    Drop,
    Broadcast,
}

/// A call to a stateful or packet-manipulating function.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Call {
    pub function: String,
    pub args: BTreeMap<String, Expr>,
    pub ret: Option<Expr>,
    /// Symbols this call introduces (e.g. a lookup's "found" flag).
    pub generated: Vec<Symbol>,
    pub next: Option<NodeId>,
}

impl Call {
    pub fn new(function: impl Into<String>) -> Self {
        Self {
            function: function.into(),
            args: BTreeMap::new(),
            ret: None,
            generated: Vec::new(),
            next: None,
        }
    }

    pub fn arg(mut self, name: &str, value: Expr) -> Self {
        self.args.insert(name.to_string(), value);
        self
    }

    pub fn ret(mut self, value: Expr) -> Self {
        self.ret = Some(value);
        self
    }

    pub fn generates(mut self, symbol: Symbol) -> Self {
        self.generated.push(symbol);
        self
    }

    pub fn get(&self, name: &str) -> Option<&Expr> {
        self.args.get(name)
    }

    /// Address of the object this call operates on.
    pub fn object(&self) -> Option<Addr> {
        self.get(arg::OBJ).and_then(Expr::resolve_addr)
    }

    /// Constant argument value, or `default` when absent or symbolic.
    pub fn const_or(&self, name: &str, default: u64) -> u64 {
        self.get(name).and_then(Expr::as_const).unwrap_or(default)
    }

    /// First generated symbol, if any.
    pub fn first_generated(&self) -> Option<&Symbol> {
        self.generated.first()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeKind {
    Call(Call),
    Branch {
        condition: Expr,
        on_true: NodeId,
        on_false: NodeId,
    },
    Terminal(Route),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Node {
    pub id: NodeId,
    pub parent: Option<NodeId>,
    pub kind: NodeKind,
}

impl Node {
    pub fn as_call(&self) -> Option<&Call> {
        match &self.kind {
            NodeKind::Call(call) => Some(call),
            _ => None,
        }
    }

    /// True if this node is a call to `function`.
    pub fn is_call_to(&self, function: &str) -> bool {
        self.as_call().is_some_and(|call| call.function == function)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self.kind, NodeKind::Terminal(_))
    }

    /// Child node ids, in true-before-false order for branches.
    pub fn children(&self) -> Vec<NodeId> {
        match &self.kind {
            NodeKind::Call(call) => call.next.into_iter().collect(),
            NodeKind::Branch {
                on_true, on_false, ..
            } => vec![*on_true, *on_false],
            NodeKind::Terminal(_) => Vec::new(),
        }
    }
}
