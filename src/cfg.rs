//! The CFG facade (C2): a directed graph with a unique entry/exit, typed
//! edges, and predecessor/successor queries. Generic over the node type so
//! the same shape serves both the intraprocedural CFG (nodes = statements)
//! and, via `Icfg`, the interprocedural overlay.

use std::collections::{BTreeMap as Map, BTreeSet as Set};

use crate::ir::{Method, Stmt, StmtNode};

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum EdgeKind {
    Normal,
    IfTrue,
    IfFalse,
    SwitchCase(i32),
    SwitchDefault,
}

#[derive(Clone, Debug)]
pub struct Cfg<N: Ord + Clone> {
    pub entry: N,
    pub exit: N,
    nodes: Set<N>,
    succ: Map<N, Vec<(N, EdgeKind)>>,
    pred: Map<N, Vec<(N, EdgeKind)>>,
}

impl<N: Ord + Clone + std::fmt::Debug> Cfg<N> {
    pub fn new(entry: N, exit: N) -> Self {
        let mut nodes = Set::new();
        nodes.insert(entry.clone());
        nodes.insert(exit.clone());
        let mut succ = Map::new();
        let mut pred = Map::new();
        succ.insert(entry.clone(), Vec::new());
        pred.insert(exit.clone(), Vec::new());
        Cfg {
            entry,
            exit,
            nodes,
            succ,
            pred,
        }
    }

    pub fn add_node(&mut self, n: N) {
        if self.nodes.insert(n.clone()) {
            self.succ.entry(n.clone()).or_default();
            self.pred.entry(n).or_default();
        }
    }

    pub fn add_edge(&mut self, from: N, to: N, kind: EdgeKind) {
        self.add_node(from.clone());
        self.add_node(to.clone());
        self.succ.entry(from.clone()).or_default().push((to.clone(), kind));
        self.pred.entry(to).or_default().push((from, kind));
    }

    pub fn nodes(&self) -> impl Iterator<Item = &N> {
        self.nodes.iter()
    }

    pub fn contains(&self, n: &N) -> bool {
        self.nodes.contains(n)
    }

    pub fn succ(&self, n: &N) -> impl Iterator<Item = &(N, EdgeKind)> {
        self.succ.get(n).into_iter().flatten()
    }

    pub fn pred(&self, n: &N) -> impl Iterator<Item = &(N, EdgeKind)> {
        self.pred.get(n).into_iter().flatten()
    }

    pub fn succ_nodes(&self, n: &N) -> impl Iterator<Item = &N> {
        self.succ(n).map(|(to, _)| to)
    }

    pub fn pred_nodes(&self, n: &N) -> impl Iterator<Item = &N> {
        self.pred(n).map(|(from, _)| from)
    }

    pub fn pred_count(&self, n: &N) -> usize {
        self.pred.get(n).map_or(0, Vec::len)
    }

    pub fn succ_count(&self, n: &N) -> usize {
        self.succ.get(n).map_or(0, Vec::len)
    }
}

/// Builds the per-statement CFG for a single method. Every statement falls
/// through to the next index unless it is a control-transfer
/// (`If`/`Switch`/`Goto`) or a `Return`, which connects to the method's
/// unique exit node.
pub fn build_cfg(method: &Method) -> Cfg<StmtNode> {
    let entry = StmtNode::Entry(method.id.clone());
    let exit = StmtNode::Exit(method.id.clone());
    let mut cfg = Cfg::new(entry.clone(), exit.clone());

    if method.body.is_empty() {
        cfg.add_edge(entry, exit, EdgeKind::Normal);
        return cfg;
    }

    let at = |i: usize| StmtNode::At(crate::ir::stmt_id(&method.id, i));
    cfg.add_edge(entry, at(0), EdgeKind::Normal);

    for (i, stmt) in method.body.iter().enumerate() {
        let here = at(i);
        match stmt {
            Stmt::If { then_target, else_target, .. } => {
                cfg.add_edge(here.clone(), at(*then_target), EdgeKind::IfTrue);
                cfg.add_edge(here, at(*else_target), EdgeKind::IfFalse);
            }
            Stmt::Switch { cases, default, .. } => {
                for (value, target) in cases {
                    cfg.add_edge(here.clone(), at(*target), EdgeKind::SwitchCase(*value));
                }
                cfg.add_edge(here, at(*default), EdgeKind::SwitchDefault);
            }
            Stmt::Goto(target) => {
                cfg.add_edge(here, at(*target), EdgeKind::Normal);
            }
            Stmt::Return(_) => {
                cfg.add_edge(here, exit.clone(), EdgeKind::Normal);
            }
            _ => {
                if i + 1 < method.body.len() {
                    cfg.add_edge(here, at(i + 1), EdgeKind::Normal);
                } else {
                    cfg.add_edge(here, exit.clone(), EdgeKind::Normal);
                }
            }
        }
    }

    cfg
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::*;

    fn method_with(body: Vec<Stmt>) -> Method {
        let id = method_id(&class_id("C"), "f()");
        Method {
            id,
            is_static: true,
            is_abstract: false,
            this_var: None,
            params: Vec::new(),
            locals: std::collections::BTreeMap::new(),
            ret_type: Type::Prim(PrimType::Int),
            body,
        }
    }

    #[test]
    fn if_branches_to_both_targets() {
        let m = method_with(vec![
            Stmt::If { op: CondOp::Lt, lhs: Operand::Const(1), rhs: Operand::Const(2), then_target: 1, else_target: 2 },
            Stmt::Return(Vec::new()),
            Stmt::Return(Vec::new()),
        ]);
        let cfg = build_cfg(&m);
        let here = StmtNode::At(stmt_id(&m.id, 0));
        let succs: Vec<_> = cfg.succ(&here).collect();
        assert_eq!(succs.len(), 2);
        assert!(succs.iter().any(|(n, k)| *n == StmtNode::At(stmt_id(&m.id, 1)) && *k == EdgeKind::IfTrue));
        assert!(succs.iter().any(|(n, k)| *n == StmtNode::At(stmt_id(&m.id, 2)) && *k == EdgeKind::IfFalse));
    }

    #[test]
    fn return_connects_to_exit_not_the_next_statement() {
        let m = method_with(vec![
            Stmt::Return(Vec::new()),
            Stmt::Return(Vec::new()),
        ]);
        let cfg = build_cfg(&m);
        let here = StmtNode::At(stmt_id(&m.id, 0));
        let exit = StmtNode::Exit(m.id.clone());
        let succs: Vec<_> = cfg.succ_nodes(&here).collect();
        assert_eq!(succs, vec![&exit]);
        assert_eq!(cfg.pred_count(&StmtNode::At(stmt_id(&m.id, 1))), 0, "statement after a Return falls off, no predecessor");
    }

    #[test]
    fn ordinary_statement_falls_through_to_next_index() {
        let m = method_with(vec![
            Stmt::Assign { lhs: var(&method_id(&class_id("C"), "f()"), "x"), rhs: Exp::Const(1) },
            Stmt::Return(Vec::new()),
        ]);
        let cfg = build_cfg(&m);
        let here = StmtNode::At(stmt_id(&m.id, 0));
        let next = StmtNode::At(stmt_id(&m.id, 1));
        let succs: Vec<_> = cfg.succ(&here).collect();
        assert_eq!(succs, vec![&(next, EdgeKind::Normal)]);
    }

    #[test]
    fn empty_body_connects_entry_directly_to_exit() {
        let m = method_with(Vec::new());
        let cfg = build_cfg(&m);
        let entry = cfg.entry.clone();
        assert_eq!(cfg.succ_nodes(&entry).collect::<Vec<_>>(), vec![&cfg.exit]);
    }
}
