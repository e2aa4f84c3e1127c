// Copyright (C) 2025 Jeremy J. Carroll. See LICENSE for details.

//! Patterns every target implements the same way.

use crate::context::{Context, Structure};
use crate::graph::ops::{self, arg};
use crate::graph::{BehaviorGraph, Call, NodeId, NodeKind};
use crate::module::{Draft, Module, Op, Successor};
use crate::target::Target;

/// The call at `node`, if it is a call to `function`.
pub(super) fn call_to<'g>(graph: &'g BehaviorGraph, node: NodeId, function: &str) -> Option<&'g Call> {
    graph
        .node(node)
        .as_call()
        .filter(|call| call.function == function)
}

/// The abstract structure an allocation call creates.
pub(super) fn allocated_structure(function: &str) -> Option<Structure> {
    match function {
        ops::MAP_ALLOCATE => Some(Structure::Map),
        ops::VECTOR_ALLOCATE => Some(Structure::Vector),
        ops::DCHAIN_ALLOCATE => Some(Structure::Dchain),
        ops::CMS_ALLOCATE => Some(Structure::Sketch),
        _ => None,
    }
}

pub(super) fn ignore(graph: &BehaviorGraph, node: NodeId) -> Option<Draft> {
    let call = graph.node(node).as_call()?;
    if !ops::NO_OPS.contains(&call.function.as_str()) {
        return None;
    }
    Some(Draft::skip(Successor::Next(graph.successor(node))))
}

pub(super) fn parse_header(target: Target, graph: &BehaviorGraph, node: NodeId) -> Option<Draft> {
    let call = call_to(graph, node, ops::PACKET_BORROW_NEXT_CHUNK)?;
    let length = call.const_or(arg::LENGTH, 0);
    let op = Op::ParseHeader {
        length,
        chunk: call.ret.clone(),
    };
    Some(
        Draft::module(
            Module::new(target, node, op),
            Successor::Next(graph.successor(node)),
        )
        .param("length", i64::try_from(length).unwrap_or(i64::MAX)),
    )
}

pub(super) fn branch(target: Target, graph: &BehaviorGraph, node: NodeId) -> Option<Draft> {
    let NodeKind::Branch {
        condition,
        on_true,
        on_false,
    } = &graph.node(node).kind
    else {
        return None;
    };
    let op = Op::If {
        condition: condition.clone(),
    };
    Some(Draft::module(
        Module::new(target, node, op),
        Successor::Branch {
            on_true: *on_true,
            on_false: *on_false,
        },
    ))
}

pub(super) fn route(target: Target, graph: &BehaviorGraph, node: NodeId) -> Option<Draft> {
    let NodeKind::Terminal(route) = &graph.node(node).kind else {
        return None;
    };
    Some(Draft::module(
        Module::new(target, node, Op::Route(*route)),
        Successor::Stop,
    ))
}

/// One draft per representation `target` may give the allocated object and
/// the context still allows.
pub(super) fn allocate(
    target: Target,
    graph: &BehaviorGraph,
    ctx: &Context,
    node: NodeId,
) -> Vec<Draft> {
    let Some(call) = graph.node(node).as_call() else {
        return Vec::new();
    };
    let Some(structure) = allocated_structure(&call.function) else {
        return Vec::new();
    };
    let Some(obj) = call.object() else {
        return Vec::new();
    };
    let capacity = call.const_or(arg::CAPACITY, 0);
    let next = graph.successor(node);

    structure
        .candidates(target)
        .iter()
        .filter(|tag| ctx.feasible(obj, **tag))
        .map(|tag| {
            let op = Op::Allocate {
                obj,
                structure,
                implementation: *tag,
                capacity,
            };
            Draft::module(Module::new(target, node, op), Successor::Next(next))
                .commit(obj, *tag)
                .param("capacity", i64::try_from(capacity).unwrap_or(i64::MAX))
        })
        .collect()
}
