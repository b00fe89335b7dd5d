//! The generic worklist solver (C3): a forward/backward monotone fixpoint
//! driver, parameterized over the node type and the fact type. The solver
//! never inspects the fact's internals — it only calls `meet_into` and
//! `transfer_node` — so instantiating it for a new analysis is just
//! implementing `Analysis`.
//!
//! `transfer_node(node, in_fact, out_fact)` is direction-relative: for a
//! forward analysis `in_fact` is the meet of predecessors' out-facts and
//! `out_fact` is mutated in place; for a backward analysis the solver
//! passes the meet of successors' in-facts as `in_fact` and mutates the
//! node's in-fact through `out_fact`. Either way the two arguments are
//! "the fact flowing toward this node" and "the fact this node produces",
//! matching the spec's `transferNode(s, in, out)` naming.

use std::collections::{BTreeMap as Map, VecDeque};

use tracing::{debug, trace};

use crate::cfg::Cfg;
use crate::config::{AnalysisConfig, Budget};

pub trait Analysis {
    type Node: Ord + Clone + std::fmt::Debug;
    type Fact: Clone + PartialEq;

    /// `true` for a forward analysis, `false` for backward.
    fn is_forward(&self) -> bool;

    /// The fact installed at the entry (forward) / exit (backward) node.
    fn new_boundary_fact(&self, cfg: &Cfg<Self::Node>) -> Self::Fact;

    /// The fact every other node starts with.
    fn new_initial_fact(&self) -> Self::Fact;

    /// `dst ← meet(src, dst)`. Returns whether `dst` changed.
    fn meet_into(&self, src: &Self::Fact, dst: &mut Self::Fact) -> bool;

    /// The per-node transfer function; see the module docs for the
    /// direction-relative argument convention. Returns whether `out_fact`
    /// changed.
    fn transfer_node(&self, node: &Self::Node, in_fact: &Self::Fact, out_fact: &mut Self::Fact) -> bool;
}

#[derive(Clone, Debug)]
pub struct DataflowResult<N: Ord + Clone, F: Clone> {
    pub in_facts: Map<N, F>,
    pub out_facts: Map<N, F>,
    pub complete: bool,
}

impl<N: Ord + Clone, F: Clone> DataflowResult<N, F> {
    pub fn in_fact(&self, n: &N) -> &F {
        self.in_facts.get(n).expect("node missing from dataflow result")
    }

    pub fn out_fact(&self, n: &N) -> &F {
        self.out_facts.get(n).expect("node missing from dataflow result")
    }
}

pub fn solve<A: Analysis>(analysis: &A, cfg: &Cfg<A::Node>, config: &AnalysisConfig) -> DataflowResult<A::Node, A::Fact> {
    if analysis.is_forward() {
        solve_forward(analysis, cfg, config)
    } else {
        solve_backward(analysis, cfg, config)
    }
}

fn solve_forward<A: Analysis>(analysis: &A, cfg: &Cfg<A::Node>, config: &AnalysisConfig) -> DataflowResult<A::Node, A::Fact> {
    let _span = tracing::debug_span!("solve_forward").entered();
    let budget = Budget::start(config);

    let mut in_facts: Map<A::Node, A::Fact> = Map::new();
    let mut out_facts: Map<A::Node, A::Fact> = Map::new();
    for n in cfg.nodes() {
        in_facts.insert(n.clone(), analysis.new_initial_fact());
        out_facts.insert(n.clone(), analysis.new_initial_fact());
    }
    let boundary = analysis.new_boundary_fact(cfg);
    in_facts.insert(cfg.entry.clone(), boundary.clone());
    out_facts.insert(cfg.entry.clone(), boundary);

    let mut worklist: VecDeque<A::Node> = cfg.nodes().filter(|n| **n != cfg.entry).cloned().collect();
    let mut complete = true;

    while let Some(n) = worklist.pop_front() {
        if config.cancellation.is_cancelled() || budget.expired() {
            debug!("forward solve cut short: cancelled or budget exhausted");
            complete = false;
            break;
        }
        trace!(node = ?n, "pop");

        let mut in_fact = analysis.new_initial_fact();
        for pred in cfg.pred_nodes(&n) {
            let pred_out = out_facts.get(pred).expect("predecessor fact missing");
            analysis.meet_into(pred_out, &mut in_fact);
        }
        in_facts.insert(n.clone(), in_fact.clone());

        let mut out_fact = out_facts.get(&n).cloned().unwrap_or_else(|| analysis.new_initial_fact());
        let changed = analysis.transfer_node(&n, &in_fact, &mut out_fact);
        out_facts.insert(n.clone(), out_fact);

        if changed {
            for succ in cfg.succ_nodes(&n) {
                worklist.push_back(succ.clone());
            }
        }
    }

    DataflowResult { in_facts, out_facts, complete }
}

fn solve_backward<A: Analysis>(analysis: &A, cfg: &Cfg<A::Node>, config: &AnalysisConfig) -> DataflowResult<A::Node, A::Fact> {
    let _span = tracing::debug_span!("solve_backward").entered();
    let budget = Budget::start(config);

    let mut in_facts: Map<A::Node, A::Fact> = Map::new();
    let mut out_facts: Map<A::Node, A::Fact> = Map::new();
    for n in cfg.nodes() {
        in_facts.insert(n.clone(), analysis.new_initial_fact());
        out_facts.insert(n.clone(), analysis.new_initial_fact());
    }
    let boundary = analysis.new_boundary_fact(cfg);
    in_facts.insert(cfg.exit.clone(), boundary.clone());
    out_facts.insert(cfg.exit.clone(), boundary);

    let mut worklist: VecDeque<A::Node> = cfg.nodes().filter(|n| **n != cfg.exit).cloned().collect();
    let mut complete = true;

    while let Some(n) = worklist.pop_front() {
        if config.cancellation.is_cancelled() || budget.expired() {
            debug!("backward solve cut short: cancelled or budget exhausted");
            complete = false;
            break;
        }
        trace!(node = ?n, "pop");

        let mut out_fact = analysis.new_initial_fact();
        for succ in cfg.succ_nodes(&n) {
            let succ_in = in_facts.get(succ).expect("successor fact missing");
            analysis.meet_into(succ_in, &mut out_fact);
        }
        out_facts.insert(n.clone(), out_fact.clone());

        let mut in_fact = in_facts.get(&n).cloned().unwrap_or_else(|| analysis.new_initial_fact());
        let changed = analysis.transfer_node(&n, &out_fact, &mut in_fact);
        in_facts.insert(n.clone(), in_fact);

        if changed {
            for pred in cfg.pred_nodes(&n) {
                worklist.push_back(pred.clone());
            }
        }
    }

    DataflowResult { in_facts, out_facts, complete }
}
