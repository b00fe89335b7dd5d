//! Shared pointer-analysis primitives (C11): the pointer-flow-graph (PFG)
//! abstraction, points-to sets, and the propagation worklist, generic over
//! an object identity `O` and a pointer identity `P` so the same shapes
//! serve both the context-insensitive (C12) and context-sensitive (C13)
//! variants; only the higher-level `addReachable`/main-loop logic differs
//! enough between the two to stay unduplicated in separate modules.

pub mod ci;
pub mod context;
pub mod cs;

use std::collections::{BTreeMap as Map, BTreeSet as Set, VecDeque};

use crate::error::{InternalError, Result};
use crate::ir::{AllocSite, ClassId, FieldRef, Name};

/// An abstract heap object: identified by its allocation site and the
/// class it instantiates. Context-sensitive pointer analysis additionally
/// wraps this in a heap context (see `context::CsObj`).
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Obj {
    pub site: AllocSite,
    pub class: ClassId,
}

/// A pointer-flow-graph node: either a variable pointer, a static field,
/// or an instance field qualified by the concrete object it belongs to.
/// `V` is the variable identity (`Var` for CI, `context::CsVar` for CS).
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Pointer<O: Ord + Clone, V: Ord + Clone> {
    VarPtr(V),
    StaticField(FieldRef),
    InstanceField(O, Name),
    ArrayIndex(O),
}

/// A monotonically growing set of points-to objects.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PointsToSet<O: Ord + Clone>(Set<O>);

impl<O: Ord + Clone> PointsToSet<O> {
    pub fn new() -> Self {
        PointsToSet(Set::new())
    }

    pub fn contains(&self, o: &O) -> bool {
        self.0.contains(o)
    }

    pub fn iter(&self) -> impl Iterator<Item = &O> {
        self.0.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// `self \ current`, the objects in `self` not yet in `current`.
    pub fn diff(&self, current: &PointsToSet<O>) -> PointsToSet<O> {
        PointsToSet(self.0.difference(&current.0).cloned().collect())
    }

    /// Unions `delta` into `self`, returning whether anything was added.
    pub fn union_in_place(&mut self, delta: &PointsToSet<O>) -> bool {
        let before = self.0.len();
        self.0.extend(delta.0.iter().cloned());
        self.0.len() != before
    }

    pub fn singleton(o: O) -> Self {
        let mut s = Set::new();
        s.insert(o);
        PointsToSet(s)
    }
}

impl<O: Ord + Clone> FromIterator<O> for PointsToSet<O> {
    fn from_iter<I: IntoIterator<Item = O>>(iter: I) -> Self {
        PointsToSet(iter.into_iter().collect())
    }
}

/// The pointer-flow-graph: directed edges `src -> dst` meaning "whatever
/// `src` points to also flows into `dst`", plus each pointer's current
/// points-to set.
#[derive(Clone, Debug, Default)]
pub struct PointerFlowGraph<O: Ord + Clone, V: Ord + Clone> {
    succ: Map<Pointer<O, V>, Set<Pointer<O, V>>>,
    pts: Map<Pointer<O, V>, PointsToSet<O>>,
}

impl<O: Ord + Clone, V: Ord + Clone> PointerFlowGraph<O, V> {
    pub fn new() -> Self {
        PointerFlowGraph { succ: Map::new(), pts: Map::new() }
    }

    pub fn pts(&self, p: &Pointer<O, V>) -> PointsToSet<O> {
        self.pts.get(p).cloned().unwrap_or_default()
    }

    /// Unions `delta` into `p`'s points-to set in place, returning
    /// whether it changed.
    pub fn propagate_into(&mut self, p: &Pointer<O, V>, delta: &PointsToSet<O>) -> bool {
        self.pts.entry(p.clone()).or_default().union_in_place(delta)
    }

    pub fn successors(&self, p: &Pointer<O, V>) -> impl Iterator<Item = &Pointer<O, V>> {
        self.succ.get(p).into_iter().flatten()
    }

    /// Adds a PFG edge `src -> dst`. Rejects a self-loop as an internal
    /// invariant violation (§7): a pointer flowing into itself is always
    /// a bug in the caller's wiring, never a property of valid input.
    /// Returns whether the edge is new and, if so, `src`'s current
    /// points-to set (the caller enqueues `(dst, src.pts)` on a new edge
    /// with non-empty points-to, per the design).
    pub fn add_edge(&mut self, src: Pointer<O, V>, dst: Pointer<O, V>) -> Result<Option<PointsToSet<O>>> {
        if src == dst {
            return Err(InternalError(format!("PFG self-loop requested: {src:?}")).into());
        }
        let is_new = self.succ.entry(src.clone()).or_default().insert(dst);
        if is_new {
            let pts = self.pts(&src);
            if !pts.is_empty() {
                return Ok(Some(pts));
            }
        }
        Ok(None)
    }
}

/// The propagation worklist: `(pointer, delta points-to)` pairs awaiting
/// processing by the main loop.
pub struct PtWorkList<O: Ord + Clone, V: Ord + Clone>(VecDeque<(Pointer<O, V>, PointsToSet<O>)>);

impl<O: Ord + Clone, V: Ord + Clone> PtWorkList<O, V> {
    pub fn new() -> Self {
        PtWorkList(VecDeque::new())
    }

    pub fn push(&mut self, p: Pointer<O, V>, delta: PointsToSet<O>) {
        if !delta.is_empty() {
            self.0.push_back((p, delta));
        }
    }

    pub fn pop(&mut self) -> Option<(Pointer<O, V>, PointsToSet<O>)> {
        self.0.pop_front()
    }
}

impl<O: Ord + Clone, V: Ord + Clone> Default for PtWorkList<O, V> {
    fn default() -> Self {
        Self::new()
    }
}
