//! Interprocedural analysis (C10): a generic ICFG solver plus its
//! instantiation as interprocedural constant propagation (IPCP), reusing
//! the intraprocedural evaluator from `dataflow::constprop`.

use std::collections::{BTreeMap as Map, VecDeque};

use tracing::{debug, trace};

use crate::config::{AnalysisConfig, Budget};
use crate::dataflow::constprop::{evaluate, Env as CPFact};
use crate::icfg::{Icfg, IcfgEdgeKind};
use crate::ir::{Stmt, StmtNode};
use crate::lattice::Value;
use crate::solver::DataflowResult;

/// An interprocedural analysis over statement-level facts. Unlike
/// `Analysis` (C3), the direction is always forward and the per-edge
/// transfer is distinct from the per-node transfer, matching the ICFG's
/// four edge kinds.
pub trait InterAnalysis {
    type Fact: Clone + PartialEq;

    fn new_boundary_fact(&self, icfg: &Icfg<'_>, entry: &StmtNode) -> Self::Fact;
    fn new_initial_fact(&self) -> Self::Fact;
    fn meet_into(&self, src: &Self::Fact, dst: &mut Self::Fact) -> bool;

    /// Transfers `out[src]` across `edge` into a fresh fact to be met
    /// into `in[dst]`.
    fn transfer_edge(&self, icfg: &Icfg<'_>, src: &StmtNode, dst: &StmtNode, kind: &IcfgEdgeKind, out_src: &Self::Fact) -> Self::Fact;

    /// Node-local transfer, `out ← f(in)`. Returns whether `out` changed.
    fn transfer_node(&self, icfg: &Icfg<'_>, node: &StmtNode, in_fact: &Self::Fact, out_fact: &mut Self::Fact) -> bool;
}

/// The single-worklist interprocedural solver: pop a node, meet in the
/// edge-transferred facts from every predecessor, run the node transfer,
/// and on change enqueue every ICFG successor.
pub fn solve_inter<A: InterAnalysis>(analysis: &A, icfg: &Icfg<'_>, entries: &[StmtNode], config: &AnalysisConfig) -> DataflowResult<StmtNode, A::Fact> {
    let _span = tracing::debug_span!("solve_inter").entered();
    let budget = Budget::start(config);

    let mut in_facts: Map<StmtNode, A::Fact> = Map::new();
    let mut out_facts: Map<StmtNode, A::Fact> = Map::new();
    for n in icfg.nodes() {
        in_facts.insert(n.clone(), analysis.new_initial_fact());
        out_facts.insert(n.clone(), analysis.new_initial_fact());
    }
    for entry in entries {
        let boundary = analysis.new_boundary_fact(icfg, entry);
        in_facts.insert(entry.clone(), boundary.clone());
        out_facts.insert(entry.clone(), boundary);
    }

    let mut worklist: VecDeque<StmtNode> = icfg.nodes().cloned().collect();
    let mut complete = true;

    while let Some(n) = worklist.pop_front() {
        if config.cancellation.is_cancelled() || budget.expired() {
            debug!("inter-solve cut short: cancelled or budget exhausted");
            complete = false;
            break;
        }
        trace!(node = ?n, "pop");

        let mut in_fact = analysis.new_initial_fact();
        for (pred, kind) in icfg.pred(&n) {
            let pred_out = out_facts.get(&pred).expect("predecessor fact missing");
            let transferred = analysis.transfer_edge(icfg, &pred, &n, &kind, pred_out);
            analysis.meet_into(&transferred, &mut in_fact);
        }
        if entries.contains(&n) {
            // Boundary nodes also keep their seeded fact even with no
            // predecessors (e.g. the program's true entry method).
            let seeded = in_facts.get(&n).expect("boundary fact missing").clone();
            analysis.meet_into(&seeded, &mut in_fact);
        }
        in_facts.insert(n.clone(), in_fact.clone());

        let mut out_fact = out_facts.get(&n).cloned().unwrap_or_else(|| analysis.new_initial_fact());
        let changed = analysis.transfer_node(icfg, &n, &in_fact, &mut out_fact);
        out_facts.insert(n.clone(), out_fact);

        if changed {
            for (succ, _) in icfg.succ(&n) {
                worklist.push_back(succ);
            }
        }
    }

    DataflowResult { in_facts, out_facts, complete }
}

/// Interprocedural constant propagation: the per-node transfer reuses
/// `dataflow::constprop::evaluate`; the interesting semantics live on the
/// edges, per the edge table.
pub struct Ipcp;

impl InterAnalysis for Ipcp {
    type Fact = CPFact;

    fn new_boundary_fact(&self, icfg: &Icfg<'_>, entry: &StmtNode) -> CPFact {
        let method = icfg.program().method(entry.method());
        let mut fact = CPFact::new();
        for p in &method.params {
            if method.var_type(p).is_integer_holding() {
                fact.update(p.clone(), Value::Nac);
            }
        }
        fact
    }

    fn new_initial_fact(&self) -> CPFact {
        CPFact::new()
    }

    fn meet_into(&self, src: &CPFact, dst: &mut CPFact) -> bool {
        src.meet_into(dst)
    }

    fn transfer_edge(&self, icfg: &Icfg<'_>, src: &StmtNode, dst: &StmtNode, kind: &IcfgEdgeKind, out_src: &CPFact) -> CPFact {
        match kind {
            IcfgEdgeKind::Normal => out_src.copy(),
            IcfgEdgeKind::CallToReturn => {
                let mut f = out_src.copy();
                if let Some(id) = src.as_stmt_id() {
                    let method = icfg.program().method(src.method());
                    if let Stmt::Invoke(call) = method.stmt(id) {
                        if let Some(result) = &call.result {
                            f.remove(result);
                        }
                    }
                }
                f
            }
            IcfgEdgeKind::Call => {
                let mut f = CPFact::new();
                if let Some(id) = src.as_stmt_id() {
                    let caller = icfg.program().method(src.method());
                    if let Stmt::Invoke(call) = caller.stmt(id) {
                        let callee = icfg.program().method(dst.method());
                        for (param, arg) in callee.params.iter().zip(call.args.iter()) {
                            if callee.var_type(param).is_integer_holding() {
                                let v = crate::dataflow::constprop::eval_operand(arg, out_src);
                                f.update(param.clone(), v);
                            }
                        }
                    }
                }
                f
            }
            IcfgEdgeKind::Return(ret_vars) => {
                let mut f = CPFact::new();
                if let [result] = ret_vars.as_slice() {
                    let callee = icfg.program().method(src.method());
                    let mut merged = Value::Undef;
                    for rv in callee.return_vars() {
                        merged = merged.meet(&out_src.get(&rv));
                    }
                    f.update(result.clone(), merged);
                }
                f
            }
        }
    }

    /// Node-local work is always a plain copy: the interesting semantics
    /// for a call site live entirely on its Call/CallToReturn edges, and
    /// an ordinary assignment's transfer is the same `evaluate` as the
    /// intraprocedural analysis.
    fn transfer_node(&self, icfg: &Icfg<'_>, node: &StmtNode, in_fact: &CPFact, out_fact: &mut CPFact) -> bool {
        let mut new_out = in_fact.copy();
        if let Some(id) = node.as_stmt_id() {
            let method = icfg.program().method(node.method());
            if let Stmt::Assign { lhs, rhs } = method.stmt(id) {
                if method.var_type(lhs).is_integer_holding() {
                    let val = evaluate(rhs, &new_out);
                    new_out.update(lhs.clone(), val);
                }
            }
        }
        let changed = new_out != *out_fact;
        *out_fact = new_out;
        changed
    }
}

pub fn analyze(icfg: &Icfg<'_>, entry: &StmtNode, config: &AnalysisConfig) -> DataflowResult<StmtNode, CPFact> {
    solve_inter(&Ipcp, icfg, std::slice::from_ref(entry), config)
}
