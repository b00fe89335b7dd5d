//! Dead-code detection (C6): three passes over a single method, composing
//! the live-variable (C4) and constant-propagation (C5) results, merged
//! into one statement-index-ordered set.

use std::collections::BTreeSet as Set;

use crate::cfg::{build_cfg, Cfg};
use crate::config::AnalysisConfig;
use crate::dataflow::{constprop, live};
use crate::ir::{stmt_id, Method, Stmt, StmtNode};
use crate::lattice::Value;

/// The statements found dead, in source order. `index` alone identifies a
/// statement within the method this report was built for.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct DeadCodeReport {
    pub dead: Set<usize>,
}

impl DeadCodeReport {
    pub fn is_dead(&self, index: usize) -> bool {
        self.dead.contains(&index)
    }
}

/// Runs live-variable and constant-propagation analysis on `method` and
/// classifies every statement as reachable/live or dead.
pub fn detect(method: &Method, config: &AnalysisConfig) -> DeadCodeReport {
    let cfg = build_cfg(method);
    let live_result = live::analyze(method, config);
    let cp_result = constprop::analyze(method, config);

    let mut dead = Set::new();
    control_flow_unreachable(method, &cfg, &mut dead);
    branch_unreachable(method, &cfg, &cp_result, &mut dead);
    dead_assignment(method, &live_result, &mut dead);

    DeadCodeReport { dead }
}

/// (a) Every non-entry node with an empty predecessor set is unreachable,
/// along with the real statements among them.
fn control_flow_unreachable(method: &Method, cfg: &Cfg<StmtNode>, dead: &mut Set<usize>) {
    for id in method.stmt_ids() {
        let node = StmtNode::At(id.clone());
        if node != cfg.entry && cfg.pred_count(&node) == 0 {
            dead.insert(id.index);
        }
    }
}

/// Walks a dead-branch chain starting at `start`, collecting statements as
/// long as each successor has exactly one predecessor and one successor
/// (stopping at a join point or the method's exit).
fn collect_chain(method: &Method, cfg: &Cfg<StmtNode>, start: usize, dead: &mut Set<usize>) {
    let mut current = StmtNode::At(stmt_id(&method.id, start));
    loop {
        if current == cfg.exit {
            return;
        }
        let id = match current.as_stmt_id() {
            Some(id) => id.clone(),
            None => return,
        };
        if cfg.pred_count(&current) != 1 {
            return;
        }
        dead.insert(id.index);
        if cfg.succ_count(&current) != 1 {
            return;
        }
        let next = cfg.succ_nodes(&current).next().cloned().expect("checked succ_count == 1");
        current = next;
    }
}

/// (b) For each `If` whose condition is fully constant under its OUT fact,
/// the untaken branch is dead; for each `Switch` with a constant selector,
/// every non-matching case (and, if no case matches, the default) is dead.
fn branch_unreachable(
    method: &Method,
    cfg: &Cfg<StmtNode>,
    cp_result: &crate::solver::DataflowResult<StmtNode, constprop::Env>,
    dead: &mut Set<usize>,
) {
    for id in method.stmt_ids() {
        let node = StmtNode::At(id.clone());
        match method.stmt(&id) {
            Stmt::If { op, lhs, rhs, then_target, else_target } => {
                let out = cp_result.out_fact(&node);
                let lv = constprop::eval_operand(lhs, out);
                let rv = constprop::eval_operand(rhs, out);
                let (Some(a), Some(b)) = (lv.as_const(), rv.as_const()) else {
                    continue;
                };
                let taken = match constprop::eval_cond(*op, a, b) {
                    Value::Const(1) => *then_target,
                    _ => *else_target,
                };
                let dead_target = if taken == *then_target { *else_target } else { *then_target };
                collect_chain(method, cfg, dead_target, dead);
            }
            Stmt::Switch { var, cases, default } => {
                let out = cp_result.out_fact(&node);
                let Some(selector) = out.get(var).as_const() else {
                    continue;
                };
                let mut matched = false;
                for (value, target) in cases {
                    if *value == selector {
                        matched = true;
                    } else {
                        collect_chain(method, cfg, *target, dead);
                    }
                }
                if matched {
                    collect_chain(method, cfg, *default, dead);
                }
            }
            _ => {}
        }
    }
}

/// (c) An assignment `v = e` is dead when `v` is not live immediately
/// after it and `e` has no side effect. A copy `v = u` is never
/// side-effecting, so it's dead whenever `v` is not live after it.
fn dead_assignment(method: &Method, live_result: &crate::solver::DataflowResult<StmtNode, live::Env>, dead: &mut Set<usize>) {
    for id in method.stmt_ids() {
        let lhs = match method.stmt(&id) {
            Stmt::Assign { lhs, rhs } if !rhs.has_side_effect() => lhs,
            Stmt::Copy { lhs, .. } => lhs,
            _ => continue,
        };
        let node = StmtNode::At(id.clone());
        let live_out = live_result.out_fact(&node);
        if !live_out.contains(lhs) {
            dead.insert(id.index);
        }
    }
}
