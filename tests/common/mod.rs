// Copyright (C) 2025 Jeremy J. Carroll. See LICENSE for details.

//! Common test utilities shared across integration tests.

#![allow(dead_code)]

use epsynth::config::Config;
use epsynth::graph::ops::{self, arg};
use epsynth::graph::{BehaviorGraph, Call, Expr, GraphBuilder, Route, Symbol};
use epsynth::module::Factory;
use epsynth::{Environment, ExecutionPlan};
use tracing_subscriber::EnvFilter;

/// Route engine logs to the test output, filtered by `RUST_LOG`.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

pub const MAC_TABLE: u64 = 0x100;
pub const COUNTERS: u64 = 0x200;
pub const FLOWS: u64 = 0x300;

/// Learning bridge:
///
/// ```text
/// map_allocate -> parse -> map_get(dst) -> if known { forward }
///                                          else { map_put(src) -> broadcast }
/// ```
pub fn learning_bridge() -> BehaviorGraph {
    let mut b = GraphBuilder::new();
    let fwd = b.terminal(Route::Forward { port: 1 });
    let flood = b.terminal(Route::Broadcast);
    let learn = b.call(
        Call::new(ops::MAP_PUT)
            .arg(arg::OBJ, Expr::addr(MAC_TABLE))
            .arg(arg::KEY, Expr::opaque("src_mac", 48))
            .arg(arg::VALUE, Expr::opaque("in_port", 16)),
        flood,
    );
    let known = b.branch(Expr::symbol("map_has_this_key", 1), fwd, learn);
    let lookup = b.call(
        Call::new(ops::MAP_GET)
            .arg(arg::OBJ, Expr::addr(MAC_TABLE))
            .arg(arg::KEY, Expr::opaque("dst_mac", 48))
            .arg(arg::VALUE, Expr::opaque("out_port", 16))
            .generates(Symbol::new("map_has_this_key", 1)),
        known,
    );
    let parse = b.call(
        Call::new(ops::PACKET_BORROW_NEXT_CHUNK).arg(arg::LENGTH, Expr::constant(14, 32)),
        lookup,
    );
    let alloc = b.call(
        Call::new(ops::MAP_ALLOCATE)
            .arg(arg::OBJ, Expr::addr(MAC_TABLE))
            .arg(arg::CAPACITY, Expr::constant(4096, 32))
            .arg(arg::VALUE_WIDTH, Expr::constant(16, 32)),
        parse,
    );
    b.finish(alloc).expect("learning bridge is well formed")
}

/// Per-port packet counter:
///
/// ```text
/// vector_allocate -> parse -> vector_borrow -> vector_return -> packet_return_chunk -> forward
/// ```
pub fn port_counter() -> BehaviorGraph {
    let mut b = GraphBuilder::new();
    let fwd = b.terminal(Route::Forward { port: 2 });
    let ret = b.call(Call::new(ops::PACKET_RETURN_CHUNK), fwd);
    let write = b.call(
        Call::new(ops::VECTOR_RETURN)
            .arg(arg::OBJ, Expr::addr(COUNTERS))
            .arg(arg::INDEX, Expr::opaque("in_port", 16))
            .arg(arg::VALUE, Expr::opaque("count_plus_one", 32)),
        ret,
    );
    let read = b.call(
        Call::new(ops::VECTOR_BORROW)
            .arg(arg::OBJ, Expr::addr(COUNTERS))
            .arg(arg::INDEX, Expr::opaque("in_port", 16))
            .arg(arg::VALUE, Expr::opaque("count", 32)),
        write,
    );
    let parse = b.call(
        Call::new(ops::PACKET_BORROW_NEXT_CHUNK).arg(arg::LENGTH, Expr::constant(14, 32)),
        read,
    );
    let alloc = b.call(
        Call::new(ops::VECTOR_ALLOCATE)
            .arg(arg::OBJ, Expr::addr(COUNTERS))
            .arg(arg::CAPACITY, Expr::constant(64, 32))
            .arg(arg::ELEM_WIDTH, Expr::constant(32, 32)),
        parse,
    );
    b.finish(alloc).expect("port counter is well formed")
}

/// Flow allocator that needs a dchain, which only software targets have:
///
/// ```text
/// dchain_allocate -> dchain_allocate_new_index -> if out_of_space { drop } else { forward }
/// ```
pub fn flow_allocator() -> BehaviorGraph {
    let mut b = GraphBuilder::new();
    let drop = b.terminal(Route::Drop);
    let fwd = b.terminal(Route::Forward { port: 3 });
    let full = b.branch(Expr::symbol("out_of_space", 1), drop, fwd);
    let index = b.call(
        Call::new(ops::DCHAIN_ALLOCATE_NEW_INDEX)
            .arg(arg::OBJ, Expr::addr(FLOWS))
            .arg(arg::INDEX, Expr::opaque("flow_index", 32))
            .generates(Symbol::new("out_of_space", 1)),
        full,
    );
    let alloc = b.call(
        Call::new(ops::DCHAIN_ALLOCATE)
            .arg(arg::OBJ, Expr::addr(FLOWS))
            .arg(arg::CAPACITY, Expr::constant(1024, 32)),
        index,
    );
    b.finish(alloc).expect("flow allocator is well formed")
}

/// A configuration that keeps searching until the frontier is empty.
pub fn exhaustive(heuristic: &str, seed: u64) -> Config {
    let mut config = Config::default();
    config.search.stop_on_first_solution = false;
    config.search.heuristic = heuristic.to_string();
    config.search.seed = seed;
    config
}

/// Check that every module of `plan` can be rebuilt from its final context.
pub fn assert_reconstructible(env: &Environment, plan: &ExecutionPlan) {
    for node in plan.nodes() {
        let module = &node.module;
        let factory = Factory::new(module.target, module.kind());
        assert_eq!(
            factory.reconstruct(&env.graph, plan.context(), module.node),
            Some(module.clone()),
            "{} on {} not reconstructible in plan {}",
            module.kind(),
            module.target,
            plan.id()
        );
    }
}
