//! The intermediate representation this core analyzes.
//!
//! This is the "collaborator-supplied" data model described in the design:
//! a class-based IR with single inheritance, dynamic dispatch, and a
//! statement-per-CFG-node control-flow shape (there is no basic-block
//! layer — each `Stmt` is its own program point, addressed by `StmtId`).
//! A real pipeline would build this from a class-file loader; here it is
//! just plain data that the fixpoint machinery consumes.

use std::collections::{BTreeMap as Map, BTreeSet as Set};
use std::fmt;
use std::rc::Rc;

pub type Name = Rc<str>;

fn name(s: &str) -> Name {
    Rc::from(s)
}

/// Identity of a class or interface.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ClassId(pub Name);

pub fn class_id(s: &str) -> ClassId {
    ClassId(name(s))
}

impl fmt::Debug for ClassId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for ClassId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identity of a method: its declaring class plus a subsignature (name +
/// parameter/return shape, independent of declaring class — the same
/// subsignature recurs in every class that overrides the method).
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MethodId {
    pub class: ClassId,
    pub subsig: Name,
}

pub fn method_id(class: &ClassId, subsig: &str) -> MethodId {
    MethodId {
        class: class.clone(),
        subsig: name(subsig),
    }
}

impl fmt::Debug for MethodId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}::{}", self.class, self.subsig)
    }
}

impl fmt::Display for MethodId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}::{}", self.class, self.subsig)
    }
}

/// A field, named by its declaring class (the class that actually declares
/// the field, not necessarily the static type of the access expression).
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub struct FieldRef {
    pub class: ClassId,
    pub name: Name,
}

pub fn field_ref(class: &ClassId, field: &str) -> FieldRef {
    FieldRef {
        class: class.clone(),
        name: name(field),
    }
}

impl fmt::Display for FieldRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.class, self.name)
    }
}

/// A local variable, scoped to the method that declares it. Parameters and
/// the implicit `this` are ordinary locals as far as the analyses are
/// concerned.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Var {
    pub method: MethodId,
    pub local: Name,
}

pub fn var(method: &MethodId, local: &str) -> Var {
    Var {
        method: method.clone(),
        local: name(local),
    }
}

impl fmt::Debug for Var {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.local)
    }
}

impl fmt::Display for Var {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.local)
    }
}

/// A program point: the `index`-th statement in `method`'s body.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct StmtId {
    pub method: MethodId,
    pub index: usize,
}

pub fn stmt_id(method: &MethodId, index: usize) -> StmtId {
    StmtId {
        method: method.clone(),
        index,
    }
}

impl fmt::Debug for StmtId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.method, self.index)
    }
}

impl fmt::Display for StmtId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.method, self.index)
    }
}

/// A heap-allocation site. Every `New`/`NewArray` statement is its own site;
/// identity is the statement itself.
pub type AllocSite = StmtId;

/// The primitive kinds that carry CP meaning ("integer-holding" in the
/// design's terms).
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum PrimType {
    Byte,
    Short,
    Int,
    Char,
    Boolean,
}

#[derive(Clone, PartialEq, Eq, Debug)]
pub enum Type {
    Prim(PrimType),
    Class(ClassId),
    Array(Box<Type>),
    Void,
}

impl Type {
    /// "Integer-holding" per the design: BYTE, SHORT, INT, CHAR, BOOLEAN.
    pub fn is_integer_holding(&self) -> bool {
        matches!(self, Type::Prim(_))
    }

    pub fn is_reference(&self) -> bool {
        matches!(self, Type::Class(_) | Type::Array(_))
    }
}

#[derive(Clone, Debug)]
pub enum Operand {
    Const(i32),
    Var(Var),
}

impl Operand {
    pub fn as_var(&self) -> Option<&Var> {
        match self {
            Operand::Var(v) => Some(v),
            Operand::Const(_) => None,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ArithOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    Shl,
    ShrArith,
    ShrLogical,
    And,
    Or,
    Xor,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum CondOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum BinOp {
    Arith(ArithOp),
    Cond(CondOp),
}

/// Field access target, shared by `LoadField`/`StoreField`.
#[derive(Clone, Debug)]
pub enum FieldAccess {
    Instance(Var, Name),
    Static(FieldRef),
}

/// An expression as it appears on the right-hand side of an `Assign`.
/// `Copy`/`New`/`LoadField`/`LoadArray`/`Invoke` are their own statement
/// variants rather than expression variants, matching the statement
/// taxonomy: each gets its own dataflow and pointer-analysis treatment.
#[derive(Clone, Debug)]
pub enum Exp {
    Const(i32),
    Var(Var),
    Binary { op: BinOp, lhs: Operand, rhs: Operand },
    Cast { ty: Type, operand: Var },
}

impl Exp {
    /// Whether evaluating this expression can itself have a side effect
    /// (relevant to dead-assignment detection: `new`/cast/field/array
    /// access and arithmetic `/`/`%` all count, the last because the
    /// divisor might be zero).
    pub fn has_side_effect(&self) -> bool {
        match self {
            Exp::Const(_) | Exp::Var(_) => false,
            Exp::Cast { .. } => true,
            Exp::Binary { op: BinOp::Arith(ArithOp::Div | ArithOp::Rem), .. } => true,
            Exp::Binary { .. } => false,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum CallKind {
    Static,
    Special,
    Virtual,
    Interface,
    Dynamic,
}

/// A call site. `method_ref` is the statically-named target (declaring
/// class + subsignature); CHA/pointer analysis resolve it to zero or more
/// concrete `MethodId`s depending on `kind`.
#[derive(Clone, Debug)]
pub struct CallSite {
    pub kind: CallKind,
    pub method_ref: MethodId,
    pub receiver: Option<Var>,
    pub args: Vec<Operand>,
    pub result: Option<Var>,
}

#[derive(Clone, Debug)]
pub enum Stmt {
    Assign { lhs: Var, rhs: Exp },
    Copy { lhs: Var, rhs: Operand },
    New { lhs: Var, class: ClassId, site: AllocSite },
    NewArray { lhs: Var, elem_ty: Type, length: Operand, site: AllocSite },
    LoadField { lhs: Var, field: FieldAccess },
    StoreField { field: FieldAccess, rhs: Operand },
    LoadArray { lhs: Var, base: Var, index: Operand },
    StoreArray { base: Var, index: Operand, rhs: Operand },
    Invoke(CallSite),
    If { op: CondOp, lhs: Operand, rhs: Operand, then_target: usize, else_target: usize },
    Switch { var: Var, cases: Vec<(i32, usize)>, default: usize },
    Return(Vec<Var>),
    Goto(usize),
}

impl Stmt {
    /// The variable this statement defines, if any (used by live-variable
    /// and reaching-style analyses).
    pub fn def(&self) -> Option<&Var> {
        match self {
            Stmt::Assign { lhs, .. }
            | Stmt::Copy { lhs, .. }
            | Stmt::New { lhs, .. }
            | Stmt::NewArray { lhs, .. }
            | Stmt::LoadField { lhs, .. }
            | Stmt::LoadArray { lhs, .. } => Some(lhs),
            Stmt::Invoke(call) => call.result.as_ref(),
            _ => None,
        }
    }

    /// The variables this statement reads.
    pub fn uses(&self) -> Vec<Var> {
        fn push_operand(out: &mut Vec<Var>, op: &Operand) {
            if let Some(v) = op.as_var() {
                out.push(v.clone());
            }
        }
        let mut out = Vec::new();
        match self {
            Stmt::Assign { rhs, .. } => match rhs {
                Exp::Var(v) => out.push(v.clone()),
                Exp::Binary { lhs, rhs, .. } => {
                    push_operand(&mut out, lhs);
                    push_operand(&mut out, rhs);
                }
                Exp::Cast { operand, .. } => out.push(operand.clone()),
                Exp::Const(_) => {}
            },
            Stmt::Copy { rhs, .. } => push_operand(&mut out, rhs),
            Stmt::New { .. } => {}
            Stmt::NewArray { length, .. } => push_operand(&mut out, length),
            Stmt::LoadField { field, .. } => {
                if let FieldAccess::Instance(base, _) = field {
                    out.push(base.clone());
                }
            }
            Stmt::StoreField { field, rhs } => {
                if let FieldAccess::Instance(base, _) = field {
                    out.push(base.clone());
                }
                push_operand(&mut out, rhs);
            }
            Stmt::LoadArray { base, index, .. } => {
                out.push(base.clone());
                push_operand(&mut out, index);
            }
            Stmt::StoreArray { base, index, rhs } => {
                out.push(base.clone());
                push_operand(&mut out, index);
                push_operand(&mut out, rhs);
            }
            Stmt::Invoke(call) => {
                if let Some(recv) = &call.receiver {
                    out.push(recv.clone());
                }
                for a in &call.args {
                    push_operand(&mut out, a);
                }
            }
            Stmt::If { lhs, rhs, .. } => {
                push_operand(&mut out, lhs);
                push_operand(&mut out, rhs);
            }
            Stmt::Switch { var, .. } => out.push(var.clone()),
            Stmt::Return(vars) => out.extend(vars.iter().cloned()),
            Stmt::Goto(_) => {}
        }
        out
    }
}

/// A single CFG node: either the method's unique entry/exit pseudo-nodes,
/// or one of its statements. Carries the owning method, so the same type
/// doubles as a globally-unique ICFG node with no further wrapping.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum StmtNode {
    Entry(MethodId),
    Exit(MethodId),
    At(StmtId),
}

impl StmtNode {
    pub fn method(&self) -> &MethodId {
        match self {
            StmtNode::Entry(m) | StmtNode::Exit(m) => m,
            StmtNode::At(id) => &id.method,
        }
    }

    pub fn as_stmt_id(&self) -> Option<&StmtId> {
        match self {
            StmtNode::At(id) => Some(id),
            _ => None,
        }
    }
}

impl fmt::Debug for StmtNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StmtNode::Entry(m) => write!(f, "entry({m})"),
            StmtNode::Exit(m) => write!(f, "exit({m})"),
            StmtNode::At(id) => write!(f, "{id}"),
        }
    }
}

pub struct Method {
    pub id: MethodId,
    pub is_static: bool,
    pub is_abstract: bool,
    pub this_var: Option<Var>,
    pub params: Vec<Var>,
    pub locals: Map<Name, Type>,
    pub ret_type: Type,
    pub body: Vec<Stmt>,
}

impl Method {
    pub fn var_type(&self, v: &Var) -> Type {
        self.locals
            .get(&v.local)
            .cloned()
            .unwrap_or(Type::Void)
    }

    pub fn stmt(&self, id: &StmtId) -> &Stmt {
        &self.body[id.index]
    }

    pub fn stmt_ids(&self) -> impl Iterator<Item = StmtId> + '_ {
        let m = self.id.clone();
        (0..self.body.len()).map(move |i| stmt_id(&m, i))
    }

    pub fn invoke_sites(&self) -> impl Iterator<Item = (StmtId, &CallSite)> {
        self.stmt_ids().filter_map(move |id| match self.stmt(&id) {
            Stmt::Invoke(call) => Some((id, call)),
            _ => None,
        })
    }

    /// The first variable of every `Return` statement in this method's
    /// body (a method returns at most one value in this IR).
    pub fn return_vars(&self) -> impl Iterator<Item = Var> + '_ {
        self.body.iter().filter_map(|s| match s {
            Stmt::Return(vars) => vars.first().cloned(),
            _ => None,
        })
    }
}

pub struct Class {
    pub id: ClassId,
    pub is_interface: bool,
    pub is_abstract: bool,
    pub superclass: Option<ClassId>,
    /// Direct `extends`/`implements` targets: superinterfaces for an
    /// interface, implemented interfaces for a class.
    pub interfaces: Vec<ClassId>,
    /// subsig -> method declared directly in this class.
    pub methods: Map<Name, MethodId>,
    pub static_fields: Set<Name>,
    pub instance_fields: Set<Name>,
}

pub struct Program {
    pub classes: Map<ClassId, Class>,
    pub methods: Map<MethodId, Method>,
    pub entry: MethodId,
}

impl Program {
    pub fn method(&self, id: &MethodId) -> &Method {
        self.methods
            .get(id)
            .unwrap_or_else(|| panic!("unknown method {id} (malformed IR)"))
    }

    pub fn class(&self, id: &ClassId) -> &Class {
        self.classes
            .get(id)
            .unwrap_or_else(|| panic!("unknown class {id} (malformed IR)"))
    }
}

/// The statement-visitor capability set from the external interface: each
/// analysis overrides only the variants it cares about. Pointer analysis
/// (the only caller today) only needs the heap/pointer-relevant variants;
/// everything else defaults to a no-op.
pub trait StmtVisitor {
    fn visit_new(&mut self, _site: &StmtId, _lhs: &Var, _class: &ClassId) {}
    fn visit_new_array(&mut self, _site: &StmtId, _lhs: &Var, _elem_ty: &Type) {}
    fn visit_copy(&mut self, _lhs: &Var, _rhs: &Operand) {}
    fn visit_load_field(&mut self, _lhs: &Var, _field: &FieldAccess) {}
    fn visit_store_field(&mut self, _field: &FieldAccess, _rhs: &Operand) {}
    fn visit_load_array(&mut self, _lhs: &Var, _base: &Var) {}
    fn visit_store_array(&mut self, _base: &Var, _rhs: &Operand) {}
    fn visit_invoke(&mut self, _site: &StmtId, _call: &CallSite) {}

    fn dispatch(&mut self, site: &StmtId, stmt: &Stmt) {
        match stmt {
            Stmt::New { lhs, class, .. } => self.visit_new(site, lhs, class),
            Stmt::NewArray { lhs, elem_ty, .. } => self.visit_new_array(site, lhs, elem_ty),
            Stmt::Copy { lhs, rhs } => self.visit_copy(lhs, rhs),
            Stmt::LoadField { lhs, field } => self.visit_load_field(lhs, field),
            Stmt::StoreField { field, rhs } => self.visit_store_field(field, rhs),
            Stmt::LoadArray { lhs, base, .. } => self.visit_load_array(lhs, base),
            Stmt::StoreArray { base, rhs, .. } => self.visit_store_array(base, rhs),
            Stmt::Invoke(call) => self.visit_invoke(site, call),
            _ => {}
        }
    }
}
