// Copyright (C) 2025 Jeremy J. Carroll. See LICENSE for details.

//! Search context split into two tiers.
//!
//! - Tier 1 ([`Environment`]): the behavior graph, target registry and
//!   configuration, fixed for the whole search.
//! - Tier 2 ([`Context`]): the implementation tag committed for each abstract
//!   object, owned by one plan and forked with it.
//!
//! # Example
//!
//! ```
//! use epsynth::context::{Context, DSImpl};
//! use epsynth::graph::Addr;
//!
//! let mut ctx = Context::new();
//! let map = Addr(0x1000);
//! assert!(ctx.feasible(map, DSImpl::ExactMatchTable));
//!
//! ctx.commit(map, DSImpl::ExactMatchTable);
//! assert!(ctx.committed(map, DSImpl::ExactMatchTable));
//! assert!(!ctx.feasible(map, DSImpl::InMemoryMap));
//! ```

pub mod ds_impl;
pub mod dynamic;
pub mod memoized;

pub use ds_impl::{DSImpl, Structure};
pub use dynamic::{Context, ContextDelta};
pub use memoized::Environment;
