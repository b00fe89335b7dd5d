//! The call graph (C8 builds it; C9/C11-13 consume it): reachable methods
//! plus typed call edges, indexed for the queries the downstream analyses
//! need (call sites within a method, callers of a method, edges of a
//! call site).

pub mod cha;

use std::collections::{BTreeMap as Map, BTreeSet as Set};

use crate::ir::{CallKind, MethodId, StmtId};

#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub struct CallEdge {
    pub kind: CallKind,
    pub call_site: StmtId,
    pub caller: MethodId,
    pub callee: MethodId,
}

#[derive(Clone, Debug, Default)]
pub struct CallGraph {
    pub reachable: Set<MethodId>,
    edges: Set<CallEdge>,
    edges_of_site: Map<StmtId, Set<MethodId>>,
    callers_of: Map<MethodId, Set<MethodId>>,
    /// `false` once a cancellation token trips or a configured budget is
    /// exhausted mid-build: the reachable set and edges below are a
    /// prefix of the true whole-program graph, not the whole thing.
    pub complete: bool,
}

impl CallGraph {
    pub fn new() -> Self {
        CallGraph { complete: true, ..CallGraph::default() }
    }

    pub fn add_reachable(&mut self, m: MethodId) -> bool {
        self.reachable.insert(m)
    }

    pub fn is_reachable(&self, m: &MethodId) -> bool {
        self.reachable.contains(m)
    }

    /// Adds an edge, returning whether it is new (callers should
    /// `addReachable`/wire parameter edges only on a genuinely new edge).
    pub fn add_edge(&mut self, edge: CallEdge) -> bool {
        let is_new = self.edges.insert(edge.clone());
        if is_new {
            self.edges_of_site.entry(edge.call_site.clone()).or_default().insert(edge.callee.clone());
            self.callers_of.entry(edge.callee).or_default().insert(edge.caller);
        }
        is_new
    }

    pub fn edges(&self) -> impl Iterator<Item = &CallEdge> {
        self.edges.iter()
    }

    pub fn callees_of_site(&self, site: &StmtId) -> impl Iterator<Item = &MethodId> {
        self.edges_of_site.get(site).into_iter().flatten()
    }

    pub fn callers_of(&self, m: &MethodId) -> impl Iterator<Item = &MethodId> {
        self.callers_of.get(m).into_iter().flatten()
    }
}
