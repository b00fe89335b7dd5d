//! Context-insensitive pointer analysis (C12): `addReachable`, the main
//! propagation loop, and on-the-fly call-graph construction.

use std::collections::BTreeMap as Map;

use crate::callgraph::{cha, CallEdge, CallGraph};
use crate::config::{AnalysisConfig, Budget};
use crate::error::Result;
use crate::hierarchy::ClassHierarchy;
use crate::ir::{CallKind, CallSite, FieldAccess, MethodId, Name, Program, Stmt, StmtId, Var};
use crate::pointer::{Obj, Pointer, PointerFlowGraph, PointsToSet, PtWorkList};

pub type Ptr = Pointer<Obj, Var>;

pub struct CiResult {
    pub call_graph: CallGraph,
    pub pfg: PointerFlowGraph<Obj, Var>,
    pub complete: bool,
}

impl CiResult {
    pub fn pts(&self, p: &Ptr) -> PointsToSet<Obj> {
        self.pfg.pts(p)
    }
}

struct CiAnalysis<'p> {
    program: &'p Program,
    hierarchy: &'p ClassHierarchy,
    config: &'p AnalysisConfig,
    pfg: PointerFlowGraph<Obj, Var>,
    call_graph: CallGraph,
    worklist: PtWorkList<Obj, Var>,
    /// `x.f = u` (instance, non-static) uses, keyed by `x`.
    store_fields: Map<Var, Vec<(Name, Var)>>,
    /// `y = x.f` (instance, non-static) uses, keyed by `x`.
    load_fields: Map<Var, Vec<(Var, Name)>>,
    /// `x[i] = u` uses, keyed by `x`.
    store_arrays: Map<Var, Vec<Var>>,
    /// `y = x[i]` uses, keyed by `x`.
    load_arrays: Map<Var, Vec<Var>>,
    /// Non-static call sites whose receiver is `x`, keyed by `x`.
    calls_by_receiver: Map<Var, Vec<StmtId>>,
}

pub fn analyze(program: &Program, hierarchy: &ClassHierarchy, entry: &MethodId, config: &AnalysisConfig) -> Result<CiResult> {
    let _span = tracing::debug_span!("pointer_analysis_ci", entry = %entry).entered();
    let mut a = CiAnalysis {
        program,
        hierarchy,
        config,
        pfg: PointerFlowGraph::new(),
        call_graph: CallGraph::new(),
        worklist: PtWorkList::new(),
        store_fields: Map::new(),
        load_fields: Map::new(),
        store_arrays: Map::new(),
        load_arrays: Map::new(),
        calls_by_receiver: Map::new(),
    };
    a.add_reachable(entry)?;
    let complete = a.solve()?;
    Ok(CiResult { call_graph: a.call_graph, pfg: a.pfg, complete })
}

impl<'p> CiAnalysis<'p> {
    fn add_pfg_edge(&mut self, src: Ptr, dst: Ptr) -> Result<()> {
        if let Some(delta) = self.pfg.add_edge(src, dst.clone())? {
            self.worklist.push(dst, delta);
        }
        Ok(())
    }

    fn add_reachable(&mut self, m: &MethodId) -> Result<()> {
        if !self.call_graph.add_reachable(m.clone()) {
            return Ok(());
        }
        let method = self.program.method(m);
        for id in method.stmt_ids() {
            let stmt = method.stmt(&id).clone_shallow();
            match stmt {
                ShallowStmt::New { lhs, class, site } => {
                    let obj = Obj { site, class };
                    self.worklist.push(Pointer::VarPtr(lhs), PointsToSet::singleton(obj));
                }
                ShallowStmt::Copy { lhs, rhs } => {
                    if let Some(v) = rhs {
                        self.add_pfg_edge(Pointer::VarPtr(v), Pointer::VarPtr(lhs))?;
                    }
                }
                ShallowStmt::StoreStaticField { field, rhs } => {
                    if let Some(v) = rhs {
                        self.add_pfg_edge(Pointer::VarPtr(v), Pointer::StaticField(field))?;
                    }
                }
                ShallowStmt::StoreInstanceField { base, name, rhs } => {
                    if let Some(v) = rhs {
                        self.store_fields.entry(base).or_default().push((name, v));
                    }
                }
                ShallowStmt::LoadStaticField { lhs, field } => {
                    self.add_pfg_edge(Pointer::StaticField(field), Pointer::VarPtr(lhs))?;
                }
                ShallowStmt::LoadInstanceField { lhs, base, name } => {
                    self.load_fields.entry(base).or_default().push((lhs, name));
                }
                ShallowStmt::StoreArray { base, rhs } => {
                    if let Some(v) = rhs {
                        self.store_arrays.entry(base).or_default().push(v);
                    }
                }
                ShallowStmt::LoadArray { lhs, base } => {
                    self.load_arrays.entry(base).or_default().push(lhs);
                }
                ShallowStmt::Invoke => {
                    let Stmt::Invoke(call) = method.stmt(&id) else { unreachable!() };
                    if call.kind == CallKind::Static {
                        self.process_static_call(&id, call)?;
                    } else if let Some(recv) = call.receiver.clone() {
                        self.calls_by_receiver.entry(recv.clone()).or_default().push(id.clone());
                        let existing = self.pfg.pts(&Pointer::VarPtr(recv.clone()));
                        let objs: Vec<Obj> = existing.iter().cloned().collect();
                        for obj in objs {
                            self.process_call(&obj, &id)?;
                        }
                    }
                }
                ShallowStmt::Other => {}
            }
        }
        Ok(())
    }

    fn process_static_call(&mut self, site: &StmtId, call: &CallSite) -> Result<()> {
        let targets = cha::resolve(self.program, self.hierarchy, call, self.config);
        for target in targets {
            self.add_call_edge(call.kind, site, &target, call)?;
        }
        Ok(())
    }

    /// `processCall(x, obj)` for every call site whose receiver is `x`.
    fn process_call(&mut self, obj: &Obj, site: &StmtId) -> Result<()> {
        let method = self.program.method(&site.method);
        let Stmt::Invoke(call) = method.stmt(site) else {
            return Ok(());
        };
        let Some(target) = self.hierarchy.dispatch(self.program, &obj.class, &call.method_ref.subsig) else {
            return Ok(()); // partial dispatch: silently no target, per the error taxonomy.
        };
        let callee = self.program.method(&target);
        if let Some(this_var) = callee.this_var.clone() {
            self.worklist.push(Pointer::VarPtr(this_var), PointsToSet::singleton(obj.clone()));
        }
        let call = call.clone();
        self.add_call_edge(call.kind, site, &target, &call)
    }

    fn add_call_edge(&mut self, kind: CallKind, site: &StmtId, target: &MethodId, call: &CallSite) -> Result<()> {
        let edge = CallEdge {
            kind,
            call_site: site.clone(),
            caller: site.method.clone(),
            callee: target.clone(),
        };
        if self.call_graph.add_edge(edge) {
            self.add_reachable(target)?;
            let callee = self.program.method(target);
            for (param, arg) in callee.params.iter().zip(call.args.iter()) {
                if let Some(v) = arg.as_var() {
                    self.add_pfg_edge(Pointer::VarPtr(v.clone()), Pointer::VarPtr(param.clone()))?;
                }
            }
            if let Some(result) = &call.result {
                for ret_var in callee.return_vars() {
                    self.add_pfg_edge(Pointer::VarPtr(ret_var), Pointer::VarPtr(result.clone()))?;
                }
            }
        }
        Ok(())
    }

    /// The main loop: pop `(n, delta)`, union `delta` into `pt(n)`, fan
    /// out to PFG successors, and if `n` is a variable pointer, wire the
    /// field/array/call uses that depend on its newly-added objects.
    fn solve(&mut self) -> Result<bool> {
        let budget = Budget::start(self.config);
        let mut complete = true;
        while let Some((n, delta)) = self.worklist.pop() {
            if self.config.cancellation.is_cancelled() || budget.expired() {
                complete = false;
                break;
            }
            let real_delta = delta.diff(&self.pfg.pts(&n));
            if real_delta.is_empty() {
                continue;
            }
            self.pfg.propagate_into(&n, &real_delta);
            tracing::trace!(pointer = ?n, added = real_delta.iter().count(), "propagated");

            for succ in self.pfg.successors(&n).cloned().collect::<Vec<_>>() {
                self.worklist.push(succ, real_delta.clone());
            }

            if let Pointer::VarPtr(x) = &n {
                let objs: Vec<Obj> = real_delta.iter().cloned().collect();
                for obj in &objs {
                    self.wire_instance_accesses(x, obj)?;
                    if let Some(sites) = self.calls_by_receiver.get(x).cloned() {
                        for site in sites {
                            self.process_call(obj, &site)?;
                        }
                    }
                }
            }
        }
        Ok(complete)
    }

    fn wire_instance_accesses(&mut self, x: &Var, obj: &Obj) -> Result<()> {
        if let Some(stores) = self.store_fields.get(x).cloned() {
            for (field, rhs) in stores {
                self.add_pfg_edge(Pointer::VarPtr(rhs), Pointer::InstanceField(obj.clone(), field))?;
            }
        }
        if let Some(loads) = self.load_fields.get(x).cloned() {
            for (lhs, field) in loads {
                self.add_pfg_edge(Pointer::InstanceField(obj.clone(), field), Pointer::VarPtr(lhs))?;
            }
        }
        if let Some(stores) = self.store_arrays.get(x).cloned() {
            for rhs in stores {
                self.add_pfg_edge(Pointer::VarPtr(rhs), Pointer::ArrayIndex(obj.clone()))?;
            }
        }
        if let Some(loads) = self.load_arrays.get(x).cloned() {
            for lhs in loads {
                self.add_pfg_edge(Pointer::ArrayIndex(obj.clone()), Pointer::VarPtr(lhs))?;
            }
        }
        Ok(())
    }
}

/// A shallow, owned view of the statement shapes `addReachable` cares
/// about (the heap/pointer-relevant subset); lets the dispatch match
/// without juggling borrows of `method.stmt(&id)` across mutable self
/// calls.
enum ShallowStmt {
    New { lhs: Var, class: crate::ir::ClassId, site: crate::ir::AllocSite },
    Copy { lhs: Var, rhs: Option<Var> },
    StoreStaticField { field: crate::ir::FieldRef, rhs: Option<Var> },
    StoreInstanceField { base: Var, name: Name, rhs: Option<Var> },
    LoadStaticField { lhs: Var, field: crate::ir::FieldRef },
    LoadInstanceField { lhs: Var, base: Var, name: Name },
    StoreArray { base: Var, rhs: Option<Var> },
    LoadArray { lhs: Var, base: Var },
    Invoke,
    Other,
}

trait ShallowClone {
    fn clone_shallow(&self) -> ShallowStmt;
}

impl ShallowClone for Stmt {
    fn clone_shallow(&self) -> ShallowStmt {
        match self {
            Stmt::New { lhs, class, site } => ShallowStmt::New { lhs: lhs.clone(), class: class.clone(), site: site.clone() },
            Stmt::Copy { lhs, rhs } => ShallowStmt::Copy { lhs: lhs.clone(), rhs: rhs.as_var().cloned() },
            Stmt::StoreField { field, rhs } => match field {
                FieldAccess::Static(f) => ShallowStmt::StoreStaticField { field: f.clone(), rhs: rhs.as_var().cloned() },
                FieldAccess::Instance(base, name) => ShallowStmt::StoreInstanceField {
                    base: base.clone(),
                    name: name.clone(),
                    rhs: rhs.as_var().cloned(),
                },
            },
            Stmt::LoadField { lhs, field } => match field {
                FieldAccess::Static(f) => ShallowStmt::LoadStaticField { lhs: lhs.clone(), field: f.clone() },
                FieldAccess::Instance(base, name) => ShallowStmt::LoadInstanceField {
                    lhs: lhs.clone(),
                    base: base.clone(),
                    name: name.clone(),
                },
            },
            Stmt::StoreArray { base, rhs, .. } => ShallowStmt::StoreArray { base: base.clone(), rhs: rhs.as_var().cloned() },
            Stmt::LoadArray { lhs, base, .. } => ShallowStmt::LoadArray { lhs: lhs.clone(), base: base.clone() },
            Stmt::Invoke(_) => ShallowStmt::Invoke,
            _ => ShallowStmt::Other,
        }
    }
}
