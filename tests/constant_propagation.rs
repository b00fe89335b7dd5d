mod support;

use cha_pointer_analysis::cfg::build_cfg;
use cha_pointer_analysis::config::AnalysisConfig;
use cha_pointer_analysis::dataflow::constprop::ConstProp;
use cha_pointer_analysis::ir::*;
use cha_pointer_analysis::lattice::Value;
use cha_pointer_analysis::solve_constant_propagation;
use cha_pointer_analysis::solver::solve;
use pretty_assertions::assert_eq;
use support::*;

/// S1 — division by zero folds to UNDEF, other locals keep their
/// constants.
#[test]
fn div_by_zero_yields_undef() {
    let mb = MethodBuilder::new("Calc", "f()")
        .int_local("a")
        .int_local("b")
        .int_local("c");
    let a = mb.var("a");
    let b = mb.var("b");
    let c = mb.var("c");
    let mb = mb
        .stmt(Stmt::Assign { lhs: a.clone(), rhs: Exp::Const(10) })
        .stmt(Stmt::Assign { lhs: b.clone(), rhs: Exp::Const(0) })
        .stmt(Stmt::Assign { lhs: c.clone(), rhs: arith(ArithOp::Div, o(a.clone()), o(b.clone())) })
        .stmt(Stmt::Return(vec![c.clone()]));
    let method = mb.build();

    let result = solve_constant_propagation(&method, &AnalysisConfig::default());
    let ret_node = StmtNode::At(stmt_id(&method.id, 3));
    let out = result.out_fact(&ret_node);

    assert_eq!(out.get(&a), Value::Const(10));
    assert_eq!(out.get(&b), Value::Const(0));
    assert_eq!(out.get(&c), Value::Undef);
}

/// S2 — a value assigned differently along two branches meets to NAC.
#[test]
fn meet_of_distinct_constants_is_nac() {
    let mb = MethodBuilder::new("Calc", "g(int)").param("p").int_local("x");
    let p = mb.var("p");
    let x = mb.var("x");
    // 0: if (p != 0) goto 1 else goto 3
    // 1: x = 1
    // 2: goto 4
    // 3: x = 2
    // 4: return x
    let mb = mb
        .stmt(Stmt::If { op: CondOp::Ne, lhs: o(p.clone()), rhs: c(0), then_target: 1, else_target: 3 })
        .stmt(Stmt::Assign { lhs: x.clone(), rhs: Exp::Const(1) })
        .stmt(Stmt::Goto(4))
        .stmt(Stmt::Assign { lhs: x.clone(), rhs: Exp::Const(2) })
        .stmt(Stmt::Return(vec![x.clone()]));
    let method = mb.build();

    let result = solve_constant_propagation(&method, &AnalysisConfig::default());
    let ret_node = StmtNode::At(stmt_id(&method.id, 4));
    assert_eq!(result.out_fact(&ret_node).get(&x), Value::Nac);
}

/// Monotonicity sanity check on the three-element lattice: meeting a
/// value with itself is a no-op, and `meet` never moves toward UNDEF.
#[test]
fn value_meet_is_monotone_and_idempotent() {
    let nac = Value::Nac;
    let c5 = Value::Const(5);
    let undef = Value::Undef;

    assert_eq!(c5.meet(&c5), c5);
    assert_eq!(c5.meet(&undef), c5);
    assert_eq!(c5.meet(&nac), nac);
    assert_eq!(nac.meet(&nac), nac);
    assert_eq!(undef.meet(&undef), undef);
    assert_eq!(Value::Const(5).meet(&Value::Const(6)), nac);
}

/// Running the solver twice on the same method yields identical facts
/// (idempotence of `solve`, independent of any external state).
#[test]
fn solve_is_idempotent() {
    let mb = MethodBuilder::new("Calc", "h()").int_local("a");
    let a = mb.var("a");
    let mb = mb.stmt(Stmt::Assign { lhs: a.clone(), rhs: Exp::Const(42) }).stmt(Stmt::Return(vec![a.clone()]));
    let method = mb.build();

    let r1 = solve_constant_propagation(&method, &AnalysisConfig::default());
    let r2 = solve_constant_propagation(&method, &AnalysisConfig::default());
    let node = StmtNode::At(stmt_id(&method.id, 1));
    assert_eq!(r1.out_fact(&node).get(&a), r2.out_fact(&node).get(&a));
    assert_eq!(r1.out_fact(&node).get(&a), Value::Const(42));
}

/// Determinism (property 4): the fixpoint must not depend on worklist
/// order. A diamond-shaped CFG gives the join node two predecessors whose
/// facts are only complete once both arms have been visited, so a FIFO
/// vs. a reversed-and-LIFO worklist order visit the join at different
/// points in the run — yet the final facts must agree exactly.
#[test]
fn fixpoint_is_independent_of_worklist_order() {
    let mb = MethodBuilder::new("Calc", "branchy(int)").param("p").int_local("x");
    let p = mb.var("p");
    let x = mb.var("x");
    // 0: if (p != 0) goto 1 else goto 3
    // 1: x = 1
    // 2: goto 4
    // 3: x = 2
    // 4: return x
    let mb = mb
        .stmt(Stmt::If { op: CondOp::Ne, lhs: o(p.clone()), rhs: c(0), then_target: 1, else_target: 3 })
        .stmt(Stmt::Assign { lhs: x.clone(), rhs: Exp::Const(1) })
        .stmt(Stmt::Goto(4))
        .stmt(Stmt::Assign { lhs: x.clone(), rhs: Exp::Const(2) })
        .stmt(Stmt::Return(vec![x.clone()]));
    let method = mb.build();

    let cfg = build_cfg(&method);
    let analysis = ConstProp::new(&method);
    let config = AnalysisConfig::default();

    let fifo = solve(&analysis, &cfg, &config);
    let reordered = solve_forward_reordered(&analysis, &cfg, &config);

    for node in cfg.nodes() {
        assert_eq!(fifo.out_fact(node).get(&x), reordered.out_fact(node).get(&x), "node {node:?} disagrees between worklist orders");
    }
    let ret_node = StmtNode::At(stmt_id(&method.id, 4));
    assert_eq!(fifo.out_fact(&ret_node).get(&x), Value::Nac);
}
