// Copyright (C) 2025 Jeremy J. Carroll. See LICENSE for details.

//! Per-plan data-structure implementation bindings (mutable tier).
//!
//! Every read, update, or free of an abstract object must agree with the
//! representation chosen when it was allocated. The search explores many
//! candidate representations at once; each plan carries its own `Context`
//! so commitments on one branch never leak into another.

use crate::context::DSImpl;
use crate::graph::Addr;
use std::collections::BTreeMap;
use std::rc::Rc;

/// Bindings a speculative decision would add.
pub type ContextDelta = Vec<(Addr, DSImpl)>;

/// Registry of committed implementation tags, one per address.
///
/// Storage is shared between clones until one of them commits, at which
/// point that clone gets its own copy. A fork therefore costs one pointer
/// copy and still never observes a sibling's commitments.
#[derive(Debug, Clone, Default)]
pub struct Context {
    bindings: Rc<BTreeMap<Addr, DSImpl>>,
}

impl Context {
    pub fn new() -> Self {
        Self::default()
    }

    /// True iff `addr` is uncommitted or already committed to exactly `tag`.
    pub fn feasible(&self, addr: Addr, tag: DSImpl) -> bool {
        self.bindings.get(&addr).map_or(true, |bound| *bound == tag)
    }

    /// True iff `addr` is committed to exactly `tag`.
    pub fn committed(&self, addr: Addr, tag: DSImpl) -> bool {
        self.bindings.get(&addr) == Some(&tag)
    }

    /// Record `addr -> tag`.
    ///
    /// # Panics
    ///
    /// Panics if `addr` is already bound to a different tag. Factories gate
    /// every commit on [`Context::feasible`], so reaching this is a defect.
    pub fn commit(&mut self, addr: Addr, tag: DSImpl) {
        if let Some(bound) = self.bindings.get(&addr) {
            assert_eq!(
                *bound, tag,
                "Object {} already implemented as {}, cannot commit {}",
                addr, bound, tag
            );
            return;
        }
        Rc::make_mut(&mut self.bindings).insert(addr, tag);
    }

    pub fn get(&self, addr: Addr) -> Option<DSImpl> {
        self.bindings.get(&addr).copied()
    }

    /// True if every binding in `delta` is feasible here.
    pub fn admits(&self, delta: &ContextDelta) -> bool {
        delta.iter().all(|(addr, tag)| self.feasible(*addr, *tag))
    }

    /// Commit every binding in `delta`.
    pub fn apply(&mut self, delta: &ContextDelta) {
        for (addr, tag) in delta {
            self.commit(*addr, *tag);
        }
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (Addr, DSImpl)> + '_ {
        self.bindings.iter().map(|(addr, tag)| (*addr, *tag))
    }
}

impl PartialEq for Context {
    fn eq(&self, other: &Self) -> bool {
        self.bindings == other.bindings
    }
}

impl Eq for Context {}

#[cfg(test)]
mod tests {
    use super::*;

    const A: Addr = Addr(0x10);
    const B: Addr = Addr(0x20);

    #[test]
    fn test_feasible_uncommitted() {
        let ctx = Context::new();
        assert!(ctx.feasible(A, DSImpl::ExactMatchTable));
        assert!(ctx.feasible(A, DSImpl::InMemoryMap));
        assert!(!ctx.committed(A, DSImpl::ExactMatchTable));
    }

    #[test]
    fn test_commit_restricts_feasibility() {
        let mut ctx = Context::new();
        ctx.commit(A, DSImpl::ExactMatchTable);
        assert!(ctx.committed(A, DSImpl::ExactMatchTable));
        assert!(ctx.feasible(A, DSImpl::ExactMatchTable));
        assert!(!ctx.feasible(A, DSImpl::InMemoryMap));
        assert!(ctx.feasible(B, DSImpl::InMemoryMap));
    }

    #[test]
    fn test_recommit_same_tag_is_noop() {
        let mut ctx = Context::new();
        ctx.commit(A, DSImpl::RegisterArray);
        ctx.commit(A, DSImpl::RegisterArray);
        assert_eq!(ctx.len(), 1);
    }

    #[test]
    #[should_panic(expected = "already implemented as")]
    fn test_conflicting_commit_is_fatal() {
        let mut ctx = Context::new();
        ctx.commit(A, DSImpl::ExactMatchTable);
        ctx.commit(A, DSImpl::InMemoryMap);
    }

    #[test]
    fn test_clones_are_isolated() {
        let mut first = Context::new();
        first.commit(A, DSImpl::InMemoryVector);
        let mut second = first.clone();

        second.commit(B, DSImpl::RegisterArray);
        assert!(first.feasible(B, DSImpl::InMemoryVector));
        assert_eq!(first.len(), 1);
        assert_eq!(second.len(), 2);

        first.commit(B, DSImpl::InMemoryVector);
        assert!(second.committed(B, DSImpl::RegisterArray));
    }

    #[test]
    fn test_delta() {
        let mut ctx = Context::new();
        ctx.commit(A, DSImpl::InMemoryMap);
        let ok: ContextDelta = vec![(A, DSImpl::InMemoryMap), (B, DSImpl::InMemoryDchain)];
        let bad: ContextDelta = vec![(A, DSImpl::ExactMatchTable)];
        assert!(ctx.admits(&ok));
        assert!(!ctx.admits(&bad));
        ctx.apply(&ok);
        assert_eq!(ctx.get(B), Some(DSImpl::InMemoryDchain));
    }
}
