// Copyright (C) 2025 Jeremy J. Carroll. See LICENSE for details.

//! Controller and host patterns.
//!
//! Software targets act on whatever representation the object was
//! allocated with, provided the target can reach it: in-memory structures
//! directly, and (on the controller) switch-resident ones through the
//! control plane.

use crate::context::{Context, DSImpl, Structure};
use crate::graph::ops::{self, arg};
use crate::graph::{Addr, BehaviorGraph, Call, NodeId};
use crate::module::shared::call_to;
use crate::module::{Draft, Module, Op, Successor};
use crate::target::Target;

/// The committed representation of `addr`, if `target` may operate on it.
fn committed_tag(ctx: &Context, target: Target, addr: Addr, structure: Structure) -> Option<DSImpl> {
    structure
        .candidates(target)
        .iter()
        .copied()
        .find(|tag| ctx.committed(addr, *tag))
}

/// The call at `node` if it is `function` on an object of `structure` that
/// `target` can reach, with the object's address and representation.
fn stateful_call<'g>(
    graph: &'g BehaviorGraph,
    ctx: &Context,
    target: Target,
    node: NodeId,
    function: &str,
    structure: Structure,
) -> Option<(&'g Call, Addr, DSImpl)> {
    let call = call_to(graph, node, function)?;
    let addr = call.object()?;
    let tag = committed_tag(ctx, target, addr, structure)?;
    Some((call, addr, tag))
}

fn draft(target: Target, graph: &BehaviorGraph, node: NodeId, op: Op) -> Draft {
    Draft::module(
        Module::new(target, node, op),
        Successor::Next(graph.successor(node)),
    )
}

pub(super) fn map_get(target: Target, graph: &BehaviorGraph, ctx: &Context, node: NodeId) -> Option<Draft> {
    let (call, map, implementation) =
        stateful_call(graph, ctx, target, node, ops::MAP_GET, Structure::Map)?;
    let op = Op::MapGet {
        map,
        key: call.get(arg::KEY)?.clone(),
        value: call.get(arg::VALUE).cloned(),
        found: call.first_generated().cloned(),
        implementation,
    };
    Some(draft(target, graph, node, op))
}

pub(super) fn map_put(target: Target, graph: &BehaviorGraph, ctx: &Context, node: NodeId) -> Option<Draft> {
    let (call, map, implementation) =
        stateful_call(graph, ctx, target, node, ops::MAP_PUT, Structure::Map)?;
    let op = Op::MapPut {
        map,
        key: call.get(arg::KEY)?.clone(),
        value: call.get(arg::VALUE)?.clone(),
        implementation,
    };
    Some(draft(target, graph, node, op))
}

pub(super) fn map_erase(target: Target, graph: &BehaviorGraph, ctx: &Context, node: NodeId) -> Option<Draft> {
    let (call, map, implementation) =
        stateful_call(graph, ctx, target, node, ops::MAP_ERASE, Structure::Map)?;
    let op = Op::MapErase {
        map,
        key: call.get(arg::KEY)?.clone(),
        implementation,
    };
    Some(draft(target, graph, node, op))
}

pub(super) fn vector_read(target: Target, graph: &BehaviorGraph, ctx: &Context, node: NodeId) -> Option<Draft> {
    let (call, vector, implementation) =
        stateful_call(graph, ctx, target, node, ops::VECTOR_BORROW, Structure::Vector)?;
    let op = Op::VectorRead {
        vector,
        index: call.get(arg::INDEX)?.clone(),
        value: call.get(arg::VALUE).cloned(),
        implementation,
    };
    Some(draft(target, graph, node, op))
}

pub(super) fn vector_write(target: Target, graph: &BehaviorGraph, ctx: &Context, node: NodeId) -> Option<Draft> {
    let (call, vector, implementation) =
        stateful_call(graph, ctx, target, node, ops::VECTOR_RETURN, Structure::Vector)?;
    let op = Op::VectorWrite {
        vector,
        index: call.get(arg::INDEX)?.clone(),
        value: call.get(arg::VALUE)?.clone(),
        implementation,
    };
    Some(draft(target, graph, node, op))
}

pub(super) fn dchain_allocate_index(
    target: Target,
    graph: &BehaviorGraph,
    ctx: &Context,
    node: NodeId,
) -> Option<Draft> {
    let (call, chain, _) = stateful_call(
        graph,
        ctx,
        target,
        node,
        ops::DCHAIN_ALLOCATE_NEW_INDEX,
        Structure::Dchain,
    )?;
    let op = Op::DchainAllocateIndex {
        chain,
        index: call.get(arg::INDEX).cloned(),
        out_of_space: call.first_generated().cloned(),
    };
    Some(draft(target, graph, node, op))
}

pub(super) fn dchain_rejuvenate(
    target: Target,
    graph: &BehaviorGraph,
    ctx: &Context,
    node: NodeId,
) -> Option<Draft> {
    let (call, chain, _) = stateful_call(
        graph,
        ctx,
        target,
        node,
        ops::DCHAIN_REJUVENATE_INDEX,
        Structure::Dchain,
    )?;
    let op = Op::DchainRejuvenate {
        chain,
        index: call.get(arg::INDEX)?.clone(),
    };
    Some(draft(target, graph, node, op))
}

pub(super) fn dchain_free(target: Target, graph: &BehaviorGraph, ctx: &Context, node: NodeId) -> Option<Draft> {
    let (call, chain, _) = stateful_call(
        graph,
        ctx,
        target,
        node,
        ops::DCHAIN_FREE_INDEX,
        Structure::Dchain,
    )?;
    let op = Op::DchainFree {
        chain,
        index: call.get(arg::INDEX)?.clone(),
    };
    Some(draft(target, graph, node, op))
}

pub(super) fn sketch_update(target: Target, graph: &BehaviorGraph, ctx: &Context, node: NodeId) -> Option<Draft> {
    let (call, sketch, implementation) =
        stateful_call(graph, ctx, target, node, ops::CMS_INCREMENT, Structure::Sketch)?;
    let op = Op::SketchUpdate {
        sketch,
        key: call.get(arg::KEY)?.clone(),
        implementation,
    };
    Some(draft(target, graph, node, op))
}

pub(super) fn sketch_query(target: Target, graph: &BehaviorGraph, ctx: &Context, node: NodeId) -> Option<Draft> {
    let (call, sketch, implementation) =
        stateful_call(graph, ctx, target, node, ops::CMS_COUNT_MIN, Structure::Sketch)?;
    let op = Op::SketchQuery {
        sketch,
        key: call.get(arg::KEY)?.clone(),
        estimate: call.ret.clone(),
        implementation,
    };
    Some(draft(target, graph, node, op))
}

/// Age out map entries whose dchain index expired. Both objects must be
/// reachable from this target.
pub(super) fn expire_items(target: Target, graph: &BehaviorGraph, ctx: &Context, node: NodeId) -> Option<Draft> {
    let (call, map, _) = stateful_call(
        graph,
        ctx,
        target,
        node,
        ops::EXPIRE_ITEMS_SINGLE_MAP,
        Structure::Map,
    )?;
    let chain = call.get(arg::CHAIN)?.resolve_addr()?;
    committed_tag(ctx, target, chain, Structure::Dchain)?;
    Some(draft(target, graph, node, Op::ExpireItems { map, chain }))
}
