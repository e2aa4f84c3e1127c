// Copyright (C) 2025 Jeremy J. Carroll. See LICENSE for details.

//! Switch pipeline patterns.
//!
//! Stateful accesses on the switch need the object's representation to be
//! committed already, and turn into pipeline objects whose stages follow
//! from what the path touched earlier in the same pass.

use crate::context::{Context, DSImpl};
use crate::graph::ops::{self, arg};
use crate::graph::{Addr, BehaviorGraph, Call, Expr, NodeId, NodeKind};
use crate::module::shared::call_to;
use crate::module::{Draft, Module, Op, Successor};
use crate::pipeline::{ObjectId, ObjectRole, StatefulObject};
use crate::target::Target;

/// Width assumed for values whose allocation does not state one.
const DEFAULT_VALUE_WIDTH: u64 = 32;

/// A width stated by an allocation, if it fits a switch field.
fn width_arg(alloc: &Call, name: &str) -> Option<u32> {
    u32::try_from(alloc.const_or(name, DEFAULT_VALUE_WIDTH)).ok()
}

/// Width of one count-min sketch cell.
const SKETCH_CELL_WIDTH: u32 = 32;

/// The object a call accesses, if it is committed to `tag`, together with
/// the call that allocates it.
fn committed_object<'g>(
    graph: &'g BehaviorGraph,
    ctx: &Context,
    call: &Call,
    tag: DSImpl,
) -> Option<(Addr, &'g Call)> {
    let addr = call.object()?;
    if !ctx.committed(addr, tag) {
        return None;
    }
    Some((addr, graph.allocation(addr)?))
}

fn next(graph: &BehaviorGraph, node: NodeId) -> Successor {
    Successor::Next(graph.successor(node))
}

pub(super) fn table_lookup(graph: &BehaviorGraph, ctx: &Context, node: NodeId) -> Option<Draft> {
    let call = call_to(graph, node, ops::MAP_GET)?;
    let (table, alloc) = committed_object(graph, ctx, call, DSImpl::ExactMatchTable)?;
    let keys: Vec<Expr> = call.get(arg::KEY)?.parts().into_iter().cloned().collect();

    let request = StatefulObject::Table {
        key_widths: keys.iter().map(Expr::width).collect(),
        value_width: width_arg(alloc, arg::VALUE_WIDTH)?,
        capacity: alloc.const_or(arg::CAPACITY, 0),
        ternary: false,
    };
    let op = Op::TableLookup {
        table,
        keys,
        value: call.get(arg::VALUE).cloned(),
        hit: call.first_generated().cloned(),
    };
    Some(
        Draft::module(Module::new(Target::Switch, node, op), next(graph, node))
            .place(ObjectId::new(table, ObjectRole::Table), request),
    )
}

/// `map_put` on a switch table: the data plane cannot write match tables, so
/// it sends a digest and the controller installs the entry.
pub(super) fn table_learn(graph: &BehaviorGraph, ctx: &Context, node: NodeId) -> Option<Draft> {
    let call = call_to(graph, node, ops::MAP_PUT)?;
    let (table, _) = committed_object(graph, ctx, call, DSImpl::ExactMatchTable)?;
    let key = call.get(arg::KEY)?.clone();
    let value = call.get(arg::VALUE)?.clone();

    let request = StatefulObject::Digest {
        bits: key.width() + value.width(),
    };
    let op = Op::TableLearn { table, key, value };
    Some(
        Draft::module(Module::new(Target::Switch, node, op), next(graph, node))
            .place(ObjectId::new(table, ObjectRole::Digest), request),
    )
}

fn register_request(alloc: &Call) -> Option<StatefulObject> {
    Some(StatefulObject::Register {
        width: width_arg(alloc, arg::ELEM_WIDTH)?,
        capacity: alloc.const_or(arg::CAPACITY, 0),
    })
}

pub(super) fn register_read(graph: &BehaviorGraph, ctx: &Context, node: NodeId) -> Option<Draft> {
    let call = call_to(graph, node, ops::VECTOR_BORROW)?;
    let (register, alloc) = committed_object(graph, ctx, call, DSImpl::RegisterArray)?;
    let op = Op::RegisterRead {
        register,
        index: call.get(arg::INDEX)?.clone(),
        value: call.get(arg::VALUE).cloned(),
    };
    let object = ObjectId::new(register, ObjectRole::Register);
    Some(
        Draft::module(Module::new(Target::Switch, node, op), next(graph, node))
            .place(object, register_request(alloc)?)
            .fuse(object),
    )
}

pub(super) fn register_write(graph: &BehaviorGraph, ctx: &Context, node: NodeId) -> Option<Draft> {
    let call = call_to(graph, node, ops::VECTOR_RETURN)?;
    let (register, alloc) = committed_object(graph, ctx, call, DSImpl::RegisterArray)?;
    let op = Op::RegisterWrite {
        register,
        index: call.get(arg::INDEX)?.clone(),
        value: call.get(arg::VALUE)?.clone(),
    };
    let object = ObjectId::new(register, ObjectRole::Register);
    Some(
        Draft::module(Module::new(Target::Switch, node, op), next(graph, node))
            .place(object, register_request(alloc)?)
            .fuse(object),
    )
}

/// A count-min sketch is a hash unit feeding `height` rows of `width`
/// register cells. Updates and queries are one fused action over both.
fn sketch_draft(op: Op, node: NodeId, sketch: Addr, key: &Expr, alloc: &Call, graph: &BehaviorGraph) -> Draft {
    let hash = ObjectId::new(sketch, ObjectRole::Hash);
    let cells = ObjectId::new(sketch, ObjectRole::Register);
    let height = alloc.const_or(arg::HEIGHT, 1);
    let width = alloc.const_or(arg::WIDTH, 0);

    Draft::module(Module::new(Target::Switch, node, op), next(graph, node))
        .place(
            hash,
            StatefulObject::Hash {
                input_bits: key.width(),
            },
        )
        .place(
            cells,
            StatefulObject::Register {
                width: SKETCH_CELL_WIDTH,
                capacity: height.saturating_mul(width),
            },
        )
        .fuse(hash)
        .fuse(cells)
        .param("height", i64::try_from(height).unwrap_or(i64::MAX))
}

pub(super) fn sketch_update(graph: &BehaviorGraph, ctx: &Context, node: NodeId) -> Option<Draft> {
    let call = call_to(graph, node, ops::CMS_INCREMENT)?;
    let (sketch, alloc) = committed_object(graph, ctx, call, DSImpl::CountMinSketch)?;
    let key = call.get(arg::KEY)?;
    let op = Op::SketchUpdate {
        sketch,
        key: key.clone(),
        implementation: DSImpl::CountMinSketch,
    };
    Some(sketch_draft(op, node, sketch, key, alloc, graph))
}

pub(super) fn sketch_query(graph: &BehaviorGraph, ctx: &Context, node: NodeId) -> Option<Draft> {
    let call = call_to(graph, node, ops::CMS_COUNT_MIN)?;
    let (sketch, alloc) = committed_object(graph, ctx, call, DSImpl::CountMinSketch)?;
    let key = call.get(arg::KEY)?;
    let op = Op::SketchQuery {
        sketch,
        key: key.clone(),
        estimate: call.ret.clone(),
        implementation: DSImpl::CountMinSketch,
    };
    Some(sketch_draft(op, node, sketch, key, alloc, graph))
}

/// Punt the packet to the controller, which resumes at the same node.
pub(super) fn send_to_controller(graph: &BehaviorGraph, node: NodeId) -> Option<Draft> {
    if matches!(graph.node(node).kind, NodeKind::Terminal(_)) {
        return None;
    }
    Some(Draft::module(
        Module::new(Target::Switch, node, Op::SendToController),
        Successor::Transfer {
            target: Target::Controller,
            next: node,
        },
    ))
}
