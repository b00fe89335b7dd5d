//! Lattice and fact primitives (the analysis's `Value`/`CPFact`/`SetFact`).

use std::collections::{BTreeMap as Map, BTreeSet as Set};
use std::fmt;

use derive_more::Display;

use crate::ir::Var;

/// The constant-propagation abstract value: a three-element flat lattice
/// `UNDEF ⊑ CONST(n) ⊑ NAC`. Distinct constants are incomparable.
#[derive(Copy, Clone, Debug, Display, Eq, PartialEq, Hash)]
pub enum Value {
    #[display(fmt = "UNDEF")]
    Undef,
    #[display(fmt = "{_0}")]
    Const(i32),
    #[display(fmt = "NAC")]
    Nac,
}

impl Value {
    pub fn meet(&self, other: &Value) -> Value {
        use Value::*;
        match (*self, *other) {
            (Nac, _) | (_, Nac) => Nac,
            (Undef, v) => v,
            (v, Undef) => v,
            (Const(a), Const(b)) if a == b => Const(a),
            (Const(_), Const(_)) => Nac,
        }
    }

    pub fn is_const(&self) -> bool {
        matches!(self, Value::Const(_))
    }

    pub fn as_const(&self) -> Option<i32> {
        match self {
            Value::Const(n) => Some(*n),
            _ => None,
        }
    }
}

/// A mapping from variable identity to `Value`; an unbound key is
/// conceptually `UNDEF`.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct CPFact {
    values: Map<Var, Value>,
}

impl CPFact {
    pub fn new() -> Self {
        Self { values: Map::new() }
    }

    pub fn get(&self, v: &Var) -> Value {
        self.values.get(v).copied().unwrap_or(Value::Undef)
    }

    /// Binds `v` to `val`, returning whether the fact changed.
    pub fn update(&mut self, v: Var, val: Value) -> bool {
        if self.get(&v) == val {
            return false;
        }
        if val == Value::Undef {
            self.values.remove(&v);
        } else {
            self.values.insert(v, val);
        }
        true
    }

    pub fn remove(&mut self, v: &Var) -> Option<Value> {
        self.values.remove(v)
    }

    pub fn copy(&self) -> Self {
        self.clone()
    }

    pub fn copy_from(&mut self, other: &CPFact) {
        self.values = other.values.clone();
    }

    pub fn key_set(&self) -> impl Iterator<Item = &Var> {
        self.values.keys()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Var, &Value)> {
        self.values.iter()
    }

    /// Pointwise `meetInto`: for every key bound in `self`, replace
    /// `dst[k]` with `meet(self[k], dst[k])`. Returns whether `dst` changed.
    pub fn meet_into(&self, dst: &mut CPFact) -> bool {
        let mut changed = false;
        for (k, v) in &self.values {
            let merged = v.meet(&dst.get(k));
            if dst.update(k.clone(), merged) {
                changed = true;
            }
        }
        changed
    }
}

impl fmt::Display for CPFact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (k, v) in &self.values {
            write!(f, "{k}={v} ")?;
        }
        Ok(())
    }
}

/// An unordered set fact used by liveness (and by dead-code control-flow
/// classification): `union`, `remove`, `contains`, value equality.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct SetFact<T: Ord + Clone> {
    items: Set<T>,
}

impl<T: Ord + Clone> SetFact<T> {
    pub fn new() -> Self {
        Self { items: Set::new() }
    }

    pub fn singleton(item: T) -> Self {
        let mut items = Set::new();
        items.insert(item);
        Self { items }
    }

    pub fn contains(&self, item: &T) -> bool {
        self.items.contains(item)
    }

    pub fn insert(&mut self, item: T) -> bool {
        self.items.insert(item)
    }

    pub fn remove(&mut self, item: &T) -> bool {
        self.items.remove(item)
    }

    pub fn copy(&self) -> Self {
        self.clone()
    }

    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.items.iter()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Set union, in place. Returns whether `self` changed.
    pub fn union(&mut self, other: &SetFact<T>) -> bool {
        let mut changed = false;
        for item in &other.items {
            if self.items.insert(item.clone()) {
                changed = true;
            }
        }
        changed
    }
}

impl<T: Ord + Clone + fmt::Display> fmt::Display for SetFact<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{")?;
        let len = self.items.len();
        for (i, item) in self.items.iter().enumerate() {
            if i + 1 == len {
                write!(f, "{item}")?;
            } else {
                write!(f, "{item}, ")?;
            }
        }
        write!(f, "}}")
    }
}
