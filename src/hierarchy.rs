//! The class hierarchy oracle (C7): direct subtype queries and virtual
//! dispatch, read-only once built. `ClassHierarchy` is built once from a
//! `Program` and then shared read-only across every analysis run in that
//! run's lifetime (see the shared-resource policy: loading a new class
//! means restarting analyses, not mutating this oracle in place).

use std::collections::{BTreeMap as Map, BTreeSet as Set};

use crate::ir::{ClassId, MethodId, Name, Program};

#[derive(Clone, Debug, Default)]
pub struct ClassHierarchy {
    direct_subclasses: Map<ClassId, Set<ClassId>>,
    direct_subinterfaces: Map<ClassId, Set<ClassId>>,
    direct_implementors: Map<ClassId, Set<ClassId>>,
}

impl ClassHierarchy {
    pub fn build(program: &Program) -> Self {
        let mut h = ClassHierarchy::default();
        for class in program.classes.values() {
            if let Some(sup) = &class.superclass {
                if class.is_interface {
                    h.direct_subinterfaces.entry(sup.clone()).or_default().insert(class.id.clone());
                } else {
                    h.direct_subclasses.entry(sup.clone()).or_default().insert(class.id.clone());
                }
            }
            for iface in &class.interfaces {
                if class.is_interface {
                    h.direct_subinterfaces.entry(iface.clone()).or_default().insert(class.id.clone());
                } else {
                    h.direct_implementors.entry(iface.clone()).or_default().insert(class.id.clone());
                }
            }
        }
        h
    }

    pub fn direct_subclasses(&self, c: &ClassId) -> impl Iterator<Item = &ClassId> {
        self.direct_subclasses.get(c).into_iter().flatten()
    }

    pub fn direct_subinterfaces(&self, i: &ClassId) -> impl Iterator<Item = &ClassId> {
        self.direct_subinterfaces.get(i).into_iter().flatten()
    }

    pub fn direct_implementors(&self, i: &ClassId) -> impl Iterator<Item = &ClassId> {
        self.direct_implementors.get(i).into_iter().flatten()
    }

    pub fn superclass(&self, program: &Program, c: &ClassId) -> Option<ClassId> {
        program.class(c).superclass.clone()
    }

    /// The method named `subsig` as declared directly by `c`, if any.
    pub fn declared_method(&self, program: &Program, c: &ClassId, subsig: &Name) -> Option<MethodId> {
        program.class(c).methods.get(subsig).cloned()
    }

    /// Walks upward from `c` until a class declaring `subsig` is found.
    /// Returns `None` ("no method") rather than erroring: partial dispatch
    /// is a normal, silently-omitted outcome, not an internal error.
    pub fn dispatch(&self, program: &Program, c: &ClassId, subsig: &Name) -> Option<MethodId> {
        let mut cur = Some(c.clone());
        while let Some(class_id) = cur {
            if let Some(m) = self.declared_method(program, &class_id, subsig) {
                return Some(m);
            }
            cur = self.superclass(program, &class_id);
        }
        None
    }

    /// All direct children of `c` for dispatch-widening purposes: direct
    /// subclasses if `c` is a class, direct subinterfaces ∪ direct
    /// implementors if `c` is an interface.
    pub fn direct_children(&self, program: &Program, c: &ClassId) -> Set<ClassId> {
        if program.class(c).is_interface {
            self.direct_subinterfaces(c).chain(self.direct_implementors(c)).cloned().collect()
        } else {
            self.direct_subclasses(c).cloned().collect()
        }
    }

    /// Transitive closure of `direct_children`, used when
    /// `AnalysisConfig::direct_subtypes_only` is `false`.
    pub fn transitive_children(&self, program: &Program, c: &ClassId) -> Set<ClassId> {
        let mut seen = Set::new();
        let mut worklist: Vec<ClassId> = self.direct_children(program, c).into_iter().collect();
        while let Some(child) = worklist.pop() {
            if seen.insert(child.clone()) {
                worklist.extend(self.direct_children(program, &child));
            }
        }
        seen
    }
}
