//! Interprocedural CFG (C9): overlays the call graph on each reachable
//! method's intraprocedural CFG. `IcfgEdgeKind` distinguishes the edge
//! kinds whose transfer differs (Normal stays inside a method; the other
//! three cross a call boundary) from the rest of the node's own transfer.

use std::collections::BTreeMap as Map;

use crate::callgraph::CallGraph;
use crate::cfg::{build_cfg, Cfg, EdgeKind};
use crate::ir::{MethodId, Program, StmtNode, Var};

#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum IcfgEdgeKind {
    Normal,
    /// call site → its own fallthrough node, same method.
    CallToReturn,
    /// call site → callee entry.
    Call,
    /// callee exit → the post-call return node; carries the caller's
    /// result variables so the transfer can bind just that slot.
    Return(Vec<Var>),
}

/// A facade over per-method CFGs plus the call graph's edges, giving a
/// single `succ`/`pred` view with interprocedural edges mixed in.
pub struct Icfg<'p> {
    program: &'p Program,
    call_graph: &'p CallGraph,
    cfgs: Map<MethodId, Cfg<StmtNode>>,
}

impl<'p> Icfg<'p> {
    pub fn build(program: &'p Program, call_graph: &'p CallGraph) -> Self {
        let mut cfgs = Map::new();
        for m in &call_graph.reachable {
            let method = program.method(m);
            cfgs.insert(m.clone(), build_cfg(method));
        }
        Icfg { program, call_graph, cfgs }
    }

    pub fn program(&self) -> &'p Program {
        self.program
    }

    pub fn cfg(&self, m: &MethodId) -> &Cfg<StmtNode> {
        self.cfgs.get(m).unwrap_or_else(|| panic!("{m} not part of this ICFG (unreachable)"))
    }

    pub fn nodes(&self) -> impl Iterator<Item = &StmtNode> {
        self.cfgs.values().flat_map(|cfg| cfg.nodes())
    }

    /// Every ICFG edge touching `n`, intraprocedural edges tagged
    /// `Normal` and call/return edges synthesized from the call graph at
    /// invoke statements.
    ///
    /// A call site's own successors are the callee's entry (`Call`) and
    /// its intraprocedural fallthrough (`CallToReturn`) — never the
    /// callee's exit. The `Return` edge instead originates at the
    /// callee's `Exit` node and targets every calling site's fallthrough,
    /// carrying that call's result variable so the edge transfer can bind
    /// just that slot.
    pub fn succ(&self, n: &StmtNode) -> Vec<(StmtNode, IcfgEdgeKind)> {
        if let Some(id) = n.as_stmt_id() {
            let method = self.program.method(n.method());
            if let crate::ir::Stmt::Invoke(call) = method.stmt(id) {
                let mut out = Vec::new();
                let fallthrough = self.cfg(n.method()).succ_nodes(n).next().cloned();
                for callee in self.call_graph.callees_of_site(id) {
                    out.push((StmtNode::Entry(callee.clone()), IcfgEdgeKind::Call));
                }
                if let Some(ft) = fallthrough {
                    out.push((ft, IcfgEdgeKind::CallToReturn));
                }
                return out;
            }
        }
        if let StmtNode::Exit(callee) = n {
            let mut out: Vec<(StmtNode, IcfgEdgeKind)> = Vec::new();
            for caller in self.call_graph.callers_of(callee) {
                let caller_cfg = self.cfg(caller);
                for site_node in caller_cfg.nodes() {
                    let Some(site_id) = site_node.as_stmt_id() else { continue };
                    let caller_method = self.program.method(caller);
                    let crate::ir::Stmt::Invoke(call) = caller_method.stmt(site_id) else { continue };
                    if !self.call_graph.callees_of_site(site_id).any(|c| c == callee) {
                        continue;
                    }
                    if let Some(ft) = caller_cfg.succ_nodes(site_node).next() {
                        let ret_vars = call.result.clone().into_iter().collect();
                        out.push((ft.clone(), IcfgEdgeKind::Return(ret_vars)));
                    }
                }
            }
            return out;
        }
        self.cfg(n.method())
            .succ_nodes(n)
            .map(|s| (s.clone(), IcfgEdgeKind::Normal))
            .collect()
    }

    /// Linear scan over every node's successors; the interprocedural
    /// solver calls this once per worklist pop; building a reverse index
    /// up front would trade construction cost for query cost and isn't
    /// worth it at this scale.
    pub fn pred(&self, n: &StmtNode) -> Vec<(StmtNode, IcfgEdgeKind)> {
        let mut out = Vec::new();
        for node in self.nodes() {
            for (succ, kind) in self.succ(node) {
                if succ == *n {
                    out.push((node.clone(), kind));
                }
            }
        }
        out
    }

    /// `EdgeKind` of the intraprocedural edge leaving `n`, when `n` is
    /// not a call site (used by callers that need branch-kind info, e.g.
    /// dead-code's switch/if handling, without reaching into `cfg()`
    /// directly).
    pub fn intra_edge_kind(&self, n: &StmtNode, to: &StmtNode) -> Option<EdgeKind> {
        self.cfg(n.method()).succ(n).find(|(s, _)| s == to).map(|(_, k)| *k)
    }
}
