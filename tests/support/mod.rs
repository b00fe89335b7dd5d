//! In-memory IR fixture builders shared by the scenario tests. Builds
//! just enough of a `Program`/`Method`/`Class` to exercise one analysis;
//! there is no text format to parse, so fixtures are plain constructors.

#![allow(dead_code)]

use std::collections::{BTreeMap as Map, BTreeSet as Set};

use cha_pointer_analysis::config::AnalysisConfig;
use cha_pointer_analysis::ir::*;

pub fn int() -> Type {
    Type::Prim(PrimType::Int)
}

pub fn v(method: &MethodId, name: &str) -> Var {
    var(method, name)
}

/// A single-method program: one class with one non-static method whose
/// locals are all `int`-typed unless overridden by the caller.
pub struct MethodBuilder {
    pub id: MethodId,
    pub is_static: bool,
    pub this_var: Option<Var>,
    pub ret_type: Type,
    pub params: Vec<Var>,
    pub locals: Map<Name, Type>,
    pub body: Vec<Stmt>,
}

impl MethodBuilder {
    pub fn new(class: &str, subsig: &str) -> Self {
        let id = method_id(&class_id(class), subsig);
        MethodBuilder {
            id,
            is_static: true,
            this_var: None,
            ret_type: int(),
            params: Vec::new(),
            locals: Map::new(),
            body: Vec::new(),
        }
    }

    /// Turns this into an instance method with an implicit `this` of
    /// `class`, declared but not counted among `params`.
    pub fn instance_method(mut self) -> Self {
        let this = v(&self.id, "this");
        self.locals.insert(this.local.clone(), Type::Class(self.id.class.clone()));
        self.this_var = Some(this);
        self.is_static = false;
        self
    }

    pub fn returns(mut self, ty: Type) -> Self {
        self.ret_type = ty;
        self
    }

    pub fn param(mut self, name: &str) -> Self {
        let var = v(&self.id, name);
        self.locals.insert(var.local.clone(), int());
        self.params.push(var);
        self
    }

    pub fn local(mut self, name: &str, ty: Type) -> Self {
        self.locals.insert(Name::from(name), ty);
        self
    }

    pub fn int_local(self, name: &str) -> Self {
        self.local(name, int())
    }

    pub fn stmt(mut self, s: Stmt) -> Self {
        self.body.push(s);
        self
    }

    pub fn var(&self, name: &str) -> Var {
        v(&self.id, name)
    }

    pub fn this(&self) -> Var {
        self.this_var.clone().expect("instance_method() not called")
    }

    pub fn build(self) -> Method {
        Method {
            id: self.id,
            is_static: self.is_static,
            is_abstract: false,
            this_var: self.this_var,
            params: self.params,
            locals: self.locals,
            ret_type: self.ret_type,
            body: self.body,
        }
    }
}

pub fn single_method_program(method: Method) -> Program {
    let entry = method.id.clone();
    let class = ClassBuilder::new(&method.id.class.0)
        .method(&method.id.subsig)
        .build();
    ProgramBuilder::new().class(class).method(method).build(entry)
}

/// A class/interface under construction, for the multi-class fixtures CHA
/// and pointer-analysis scenarios need.
pub struct ClassBuilder {
    pub id: ClassId,
    pub is_interface: bool,
    pub is_abstract: bool,
    pub superclass: Option<ClassId>,
    pub interfaces: Vec<ClassId>,
    pub methods: Map<Name, MethodId>,
    pub static_fields: Set<Name>,
    pub instance_fields: Set<Name>,
}

impl ClassBuilder {
    pub fn new(name: &str) -> Self {
        ClassBuilder {
            id: class_id(name),
            is_interface: false,
            is_abstract: false,
            superclass: None,
            interfaces: Vec::new(),
            methods: Map::new(),
            static_fields: Set::new(),
            instance_fields: Set::new(),
        }
    }

    pub fn interface(mut self) -> Self {
        self.is_interface = true;
        self
    }

    pub fn abstract_class(mut self) -> Self {
        self.is_abstract = true;
        self
    }

    pub fn extends(mut self, sup: &str) -> Self {
        self.superclass = Some(class_id(sup));
        self
    }

    pub fn implements(mut self, iface: &str) -> Self {
        self.interfaces.push(class_id(iface));
        self
    }

    /// Declares that this class directly declares a method with this
    /// subsignature (the caller still builds and registers the `Method`
    /// itself via `ProgramBuilder::method`).
    pub fn method(mut self, subsig: &str) -> Self {
        self.methods.insert(Name::from(subsig), method_id(&self.id, subsig));
        self
    }

    pub fn instance_field(mut self, name: &str) -> Self {
        self.instance_fields.insert(Name::from(name));
        self
    }

    pub fn build(self) -> Class {
        Class {
            id: self.id,
            is_interface: self.is_interface,
            is_abstract: self.is_abstract,
            superclass: self.superclass,
            interfaces: self.interfaces,
            methods: self.methods,
            static_fields: self.static_fields,
            instance_fields: self.instance_fields,
        }
    }
}

/// Assembles classes and methods built independently into one `Program`.
#[derive(Default)]
pub struct ProgramBuilder {
    classes: Map<ClassId, Class>,
    methods: Map<MethodId, Method>,
}

impl ProgramBuilder {
    pub fn new() -> Self {
        ProgramBuilder::default()
    }

    pub fn class(mut self, c: Class) -> Self {
        self.classes.insert(c.id.clone(), c);
        self
    }

    pub fn method(mut self, m: Method) -> Self {
        self.methods.insert(m.id.clone(), m);
        self
    }

    pub fn build(self, entry: MethodId) -> Program {
        Program { classes: self.classes, methods: self.methods, entry }
    }
}

/// A worklist-order variant of `solver::solve_forward` used only by the
/// determinism property test: same fixpoint equations, but the worklist
/// starts in reverse node order and pops LIFO instead of FIFO. The final
/// facts must come out identical to the ordinary FIFO solve, since the
/// spec's ordering guarantee says the result must not depend on the
/// worklist's iteration order.
pub fn solve_forward_reordered<A: cha_pointer_analysis::solver::Analysis>(
    analysis: &A,
    cfg: &cha_pointer_analysis::cfg::Cfg<A::Node>,
    config: &AnalysisConfig,
) -> cha_pointer_analysis::solver::DataflowResult<A::Node, A::Fact> {
    use std::collections::BTreeMap as Map;

    let mut in_facts: Map<A::Node, A::Fact> = Map::new();
    let mut out_facts: Map<A::Node, A::Fact> = Map::new();
    for n in cfg.nodes() {
        in_facts.insert(n.clone(), analysis.new_initial_fact());
        out_facts.insert(n.clone(), analysis.new_initial_fact());
    }
    let boundary = analysis.new_boundary_fact(cfg);
    in_facts.insert(cfg.entry.clone(), boundary.clone());
    out_facts.insert(cfg.entry.clone(), boundary);

    let mut worklist: Vec<A::Node> = cfg.nodes().filter(|n| **n != cfg.entry).cloned().collect();
    worklist.reverse();

    while let Some(n) = worklist.pop() {
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
                worklist.insert(0, succ.clone());
            }
        }
    }

    cha_pointer_analysis::solver::DataflowResult { in_facts, out_facts, complete: true }
}

pub fn binary(op: BinOp, lhs: Operand, rhs: Operand) -> Exp {
    Exp::Binary { op, lhs, rhs }
}

pub fn arith(op: ArithOp, lhs: Operand, rhs: Operand) -> Exp {
    binary(BinOp::Arith(op), lhs, rhs)
}

pub fn cmp(op: CondOp, lhs: Operand, rhs: Operand) -> Exp {
    binary(BinOp::Cond(op), lhs, rhs)
}

pub fn c(n: i32) -> Operand {
    Operand::Const(n)
}

pub fn o(var: Var) -> Operand {
    Operand::Var(var)
}
