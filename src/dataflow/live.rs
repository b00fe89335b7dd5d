//! Intraprocedural live-variable analysis (C4): backward, meet = union.

use crate::cfg::Cfg;
use crate::ir::{Method, StmtNode, Var};
use crate::lattice::SetFact;
use crate::solver::Analysis;

pub type Env = SetFact<Var>;

pub struct LiveVariables<'m> {
    pub method: &'m Method,
}

impl<'m> LiveVariables<'m> {
    pub fn new(method: &'m Method) -> Self {
        LiveVariables { method }
    }
}

impl<'m> Analysis for LiveVariables<'m> {
    type Node = StmtNode;
    type Fact = Env;

    fn is_forward(&self) -> bool {
        false
    }

    fn new_boundary_fact(&self, _cfg: &Cfg<StmtNode>) -> Env {
        Env::new()
    }

    fn new_initial_fact(&self) -> Env {
        Env::new()
    }

    fn meet_into(&self, src: &Env, dst: &mut Env) -> bool {
        dst.union(src)
    }

    /// `in_fact` is the meet of successors' in-facts (i.e. this node's
    /// `out`); `out_fact` receives this node's `in` set:
    /// `in' = (out \ def(s)) ∪ use(s)`.
    fn transfer_node(&self, node: &StmtNode, in_fact: &Env, out_fact: &mut Env) -> bool {
        let stmt = match node.as_stmt_id() {
            Some(id) => self.method.stmt(id),
            None => {
                // Entry/Exit carry no statement: identity transfer.
                let new_in = in_fact.copy();
                let changed = new_in != *out_fact;
                *out_fact = new_in;
                return changed;
            }
        };

        let mut new_in = in_fact.copy();
        if let Some(def) = stmt.def() {
            new_in.remove(def);
        }
        for used in stmt.uses() {
            new_in.insert(used);
        }

        let changed = new_in != *out_fact;
        *out_fact = new_in;
        changed
    }
}

pub fn analyze(method: &Method, config: &crate::config::AnalysisConfig) -> crate::solver::DataflowResult<StmtNode, Env> {
    let cfg = crate::cfg::build_cfg(method);
    let analysis = LiveVariables::new(method);
    crate::solver::solve(&analysis, &cfg, config)
}
