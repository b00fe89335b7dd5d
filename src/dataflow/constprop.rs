//! Intraprocedural integer constant propagation (C5): forward, meet =
//! pointwise `meetValue`.

use crate::cfg::Cfg;
use crate::ir::{ArithOp, BinOp, CondOp, Exp, Method, Operand, Stmt, StmtNode};
use crate::lattice::{CPFact, Value};
use crate::solver::Analysis;

pub type Env = CPFact;

/// Evaluates an operand against a CP fact: a literal is its own constant,
/// a variable looks itself up (UNDEF if unbound).
pub fn eval_operand(op: &Operand, fact: &CPFact) -> Value {
    match op {
        Operand::Const(n) => Value::Const(*n),
        Operand::Var(v) => fact.get(v),
    }
}

/// 32-bit wrapping arithmetic per the design: `+ - *` wrap, `/ %` truncate
/// and signal `UNDEF` on a zero divisor, shifts take their count mod 32,
/// bitwise ops and comparisons produce 0/1 integers.
pub fn eval_arith(op: ArithOp, a: i32, b: i32) -> Value {
    match op {
        ArithOp::Add => Value::Const(a.wrapping_add(b)),
        ArithOp::Sub => Value::Const(a.wrapping_sub(b)),
        ArithOp::Mul => Value::Const(a.wrapping_mul(b)),
        ArithOp::Div => {
            if b == 0 {
                Value::Undef
            } else {
                Value::Const(a.wrapping_div(b))
            }
        }
        ArithOp::Rem => {
            if b == 0 {
                Value::Undef
            } else {
                Value::Const(a.wrapping_rem(b))
            }
        }
        ArithOp::Shl => Value::Const(a.wrapping_shl(b as u32 & 31)),
        ArithOp::ShrArith => Value::Const(a.wrapping_shr(b as u32 & 31)),
        ArithOp::ShrLogical => Value::Const(((a as u32).wrapping_shr(b as u32 & 31)) as i32),
        ArithOp::And => Value::Const(a & b),
        ArithOp::Or => Value::Const(a | b),
        ArithOp::Xor => Value::Const(a ^ b),
    }
}

pub fn eval_cond(op: CondOp, a: i32, b: i32) -> Value {
    let result = match op {
        CondOp::Eq => a == b,
        CondOp::Ne => a != b,
        CondOp::Lt => a < b,
        CondOp::Le => a <= b,
        CondOp::Gt => a > b,
        CondOp::Ge => a >= b,
    };
    Value::Const(result as i32)
}

fn eval_binary(op: BinOp, lhs: Value, rhs: Value) -> Value {
    match (lhs, rhs) {
        (Value::Const(a), Value::Const(b)) => match op {
            BinOp::Arith(aop) => eval_arith(aop, a, b),
            BinOp::Cond(cop) => eval_cond(cop, a, b),
        },
        // Division/remainder by a known-zero constant is UNDEF even when
        // the other operand is NAC; otherwise NAC dominates unless the
        // other side already forced UNDEF.
        (Value::Const(0), Value::Nac) | (Value::Nac, Value::Const(0))
            if matches!(op, BinOp::Arith(ArithOp::Div | ArithOp::Rem)) =>
        {
            Value::Nac
        }
        (Value::Nac, _) | (_, Value::Nac) => Value::Nac,
        (Value::Undef, _) | (_, Value::Undef) => Value::Undef,
    }
}

/// `evaluate(e, in)` from the design: literals fold directly, variables
/// look themselves up, binary ops fold when both sides are constant,
/// otherwise NAC/UNDEF propagate per the rules above. Any other
/// expression shape defaults to NAC (the reference's documented default).
pub fn evaluate(exp: &Exp, fact: &CPFact) -> Value {
    match exp {
        Exp::Const(n) => Value::Const(*n),
        Exp::Var(v) => fact.get(v),
        Exp::Binary { op, lhs, rhs } => eval_binary(*op, eval_operand(lhs, fact), eval_operand(rhs, fact)),
        Exp::Cast { .. } => Value::Nac,
    }
}

pub struct ConstProp<'m> {
    pub method: &'m Method,
}

impl<'m> ConstProp<'m> {
    pub fn new(method: &'m Method) -> Self {
        ConstProp { method }
    }
}

impl<'m> Analysis for ConstProp<'m> {
    type Node = StmtNode;
    type Fact = Env;

    fn is_forward(&self) -> bool {
        true
    }

    /// Integer-holding parameters are bound to NAC at the boundary;
    /// non-integer parameters carry no CP meaning and are left unbound.
    fn new_boundary_fact(&self, _cfg: &Cfg<StmtNode>) -> Env {
        let mut fact = CPFact::new();
        for p in &self.method.params {
            if self.method.var_type(p).is_integer_holding() {
                fact.update(p.clone(), Value::Nac);
            }
        }
        fact
    }

    fn new_initial_fact(&self) -> Env {
        CPFact::new()
    }

    fn meet_into(&self, src: &Env, dst: &mut Env) -> bool {
        src.meet_into(dst)
    }

    fn transfer_node(&self, node: &StmtNode, in_fact: &Env, out_fact: &mut Env) -> bool {
        let stmt = match node.as_stmt_id() {
            Some(id) => self.method.stmt(id),
            None => {
                let changed = in_fact != out_fact;
                out_fact.copy_from(in_fact);
                return changed;
            }
        };

        let mut new_out = in_fact.copy();
        if let Stmt::Assign { lhs, rhs } = stmt {
            if self.method.var_type(lhs).is_integer_holding() {
                let val = evaluate(rhs, &new_out);
                new_out.update(lhs.clone(), val);
            }
        }

        let changed = new_out != *out_fact;
        *out_fact = new_out;
        changed
    }
}

pub fn analyze(method: &Method, config: &crate::config::AnalysisConfig) -> crate::solver::DataflowResult<StmtNode, Env> {
    let cfg = crate::cfg::build_cfg(method);
    let analysis = ConstProp::new(method);
    crate::solver::solve(&analysis, &cfg, config)
}
