//! Context-sensitive pointer analysis (C13): mirrors C12's shape with
//! every pointer/object/call entity wrapped in a `Context`, read from the
//! owning `CsVar`/`CsMethod` and chosen by a pluggable `ContextSelector`.

use std::collections::BTreeMap as Map;

use crate::callgraph::{CallEdge, CallGraph};
use crate::config::{AnalysisConfig, Budget};
use crate::error::Result;
use crate::hierarchy::ClassHierarchy;
use crate::ir::{CallKind, CallSite, FieldAccess, MethodId, Name, Program, Stmt, StmtId, Var};
use crate::pointer::context::{Context, ContextSelector, CsCallSite, CsManager, CsMethod, CsObj, CsVar};
use crate::pointer::{Obj, Pointer, PointerFlowGraph, PointsToSet, PtWorkList};

pub type CsPtr = Pointer<CsObj, CsVar>;

pub struct CsResult {
    pub call_graph: CallGraph,
    pub pfg: PointerFlowGraph<CsObj, CsVar>,
    pub complete: bool,
}

impl CsResult {
    pub fn pts(&self, p: &CsPtr) -> PointsToSet<CsObj> {
        self.pfg.pts(p)
    }

    /// Projects a context-qualified points-to set down to plain `Obj`s,
    /// the shape CI analysis reports — used to cross-check
    /// `ContextInsensitiveSelector` reproduces CI exactly.
    pub fn pts_projected(&self, var: &Var) -> std::collections::BTreeSet<Obj> {
        self.pfg
            .pts(&Pointer::VarPtr(CsVar { context: Context::empty(), var: var.clone() }))
            .iter()
            .map(|(_, obj)| obj.clone())
            .collect()
    }
}

struct CsAnalysis<'p, S: ContextSelector> {
    program: &'p Program,
    hierarchy: &'p ClassHierarchy,
    config: &'p AnalysisConfig,
    selector: &'p S,
    manager: CsManager,
    pfg: PointerFlowGraph<CsObj, CsVar>,
    call_graph: CallGraph,
    worklist: PtWorkList<CsObj, CsVar>,
    store_fields: Map<CsVar, Vec<(Name, CsVar)>>,
    load_fields: Map<CsVar, Vec<(CsVar, Name)>>,
    store_arrays: Map<CsVar, Vec<CsVar>>,
    load_arrays: Map<CsVar, Vec<CsVar>>,
    calls_by_receiver: Map<CsVar, Vec<(Context, StmtId)>>,
}

pub fn analyze<S: ContextSelector>(
    program: &Program,
    hierarchy: &ClassHierarchy,
    entry: &MethodId,
    config: &AnalysisConfig,
    selector: &S,
) -> Result<CsResult> {
    let _span = tracing::debug_span!("pointer_analysis_cs", entry = %entry).entered();
    let mut a = CsAnalysis {
        program,
        hierarchy,
        config,
        selector,
        manager: CsManager::new(),
        pfg: PointerFlowGraph::new(),
        call_graph: CallGraph::new(),
        worklist: PtWorkList::new(),
        store_fields: Map::new(),
        load_fields: Map::new(),
        store_arrays: Map::new(),
        load_arrays: Map::new(),
        calls_by_receiver: Map::new(),
    };
    let entry_ctx = CsMethod { context: selector.empty_context(), method: entry.clone() };
    a.add_reachable(&entry_ctx)?;
    let complete = a.solve()?;
    Ok(CsResult { call_graph: a.call_graph, pfg: a.pfg, complete })
}

impl<'p, S: ContextSelector> CsAnalysis<'p, S> {
    fn cs_var(&mut self, context: &Context, var: &Var) -> CsVar {
        self.manager.intern_var(CsVar { context: context.clone(), var: var.clone() })
    }

    fn add_pfg_edge(&mut self, src: CsPtr, dst: CsPtr) -> Result<()> {
        if let Some(delta) = self.pfg.add_edge(src, dst.clone())? {
            self.worklist.push(dst, delta);
        }
        Ok(())
    }

    fn reachable_key(m: &CsMethod) -> MethodId {
        // The call graph's reachable set is keyed on plain `MethodId`;
        // distinct contexts of the same method still share one CHA
        // reachability/cg-edge record, matching `CallGraph`'s shape
        // (it is not itself context-parameterized in this design).
        m.method.clone()
    }

    fn add_reachable(&mut self, cs_method: &CsMethod) -> Result<()> {
        let first_visit = self.call_graph.add_reachable(Self::reachable_key(cs_method));
        if !first_visit {
            return Ok(());
        }
        let method = self.program.method(&cs_method.method);
        let ctx = &cs_method.context;
        for id in method.stmt_ids() {
            let stmt = method.stmt(&id).clone_shallow();
            match stmt {
                ShallowStmt::New { lhs, class, site } => {
                    let heap_ctx = self.selector.select_heap_context(cs_method, &Obj { site: site.clone(), class: class.clone() });
                    let obj = self.manager.intern_obj((heap_ctx, Obj { site, class }));
                    let v = self.cs_var(ctx, &lhs);
                    self.worklist.push(Pointer::VarPtr(v), PointsToSet::singleton(obj));
                }
                ShallowStmt::Copy { lhs, rhs } => {
                    if let Some(rv) = rhs {
                        let src = self.cs_var(ctx, &rv);
                        let dst = self.cs_var(ctx, &lhs);
                        self.add_pfg_edge(Pointer::VarPtr(src), Pointer::VarPtr(dst))?;
                    }
                }
                ShallowStmt::StoreStaticField { field, rhs } => {
                    if let Some(rv) = rhs {
                        let src = self.cs_var(ctx, &rv);
                        self.add_pfg_edge(Pointer::VarPtr(src), Pointer::StaticField(field))?;
                    }
                }
                ShallowStmt::StoreInstanceField { base, name, rhs } => {
                    if let Some(rv) = rhs {
                        let base_v = self.cs_var(ctx, &base);
                        let rhs_v = self.cs_var(ctx, &rv);
                        self.store_fields.entry(base_v).or_default().push((name, rhs_v));
                    }
                }
                ShallowStmt::LoadStaticField { lhs, field } => {
                    let dst = self.cs_var(ctx, &lhs);
                    self.add_pfg_edge(Pointer::StaticField(field), Pointer::VarPtr(dst))?;
                }
                ShallowStmt::LoadInstanceField { lhs, base, name } => {
                    let base_v = self.cs_var(ctx, &base);
                    let lhs_v = self.cs_var(ctx, &lhs);
                    self.load_fields.entry(base_v).or_default().push((lhs_v, name));
                }
                ShallowStmt::StoreArray { base, rhs } => {
                    if let Some(rv) = rhs {
                        let base_v = self.cs_var(ctx, &base);
                        let rhs_v = self.cs_var(ctx, &rv);
                        self.store_arrays.entry(base_v).or_default().push(rhs_v);
                    }
                }
                ShallowStmt::LoadArray { lhs, base } => {
                    let base_v = self.cs_var(ctx, &base);
                    let lhs_v = self.cs_var(ctx, &lhs);
                    self.load_arrays.entry(base_v).or_default().push(lhs_v);
                }
                ShallowStmt::Invoke => {
                    let Stmt::Invoke(call) = method.stmt(&id) else { unreachable!() };
                    if call.kind == CallKind::Static {
                        self.process_static_call(cs_method, &id, call)?;
                    } else if let Some(recv) = call.receiver.clone() {
                        let recv_v = self.cs_var(ctx, &recv);
                        self.calls_by_receiver.entry(recv_v.clone()).or_default().push((ctx.clone(), id.clone()));
                        let existing = self.pfg.pts(&Pointer::VarPtr(recv_v));
                        let objs: Vec<CsObj> = existing.iter().cloned().collect();
                        for obj in objs {
                            self.process_call(ctx, &obj, &id)?;
                        }
                    }
                }
                ShallowStmt::Other => {}
            }
        }
        Ok(())
    }

    fn process_static_call(&mut self, caller: &CsMethod, site: &StmtId, call: &CallSite) -> Result<()> {
        let targets = crate::callgraph::cha::resolve(self.program, self.hierarchy, call, self.config);
        for target in targets {
            let cs_site = CsCallSite { context: caller.context.clone(), call_site: site.clone() };
            let callee_ctx = self.selector.select_context_static(&cs_site, &target);
            self.add_call_edge(call.kind, caller, site, &callee_ctx, &target, call)?;
        }
        Ok(())
    }

    fn process_call(&mut self, caller_ctx: &Context, obj: &CsObj, site: &StmtId) -> Result<()> {
        let caller = CsMethod { context: caller_ctx.clone(), method: site.method.clone() };
        let method = self.program.method(&site.method);
        let Stmt::Invoke(call) = method.stmt(site) else {
            return Ok(());
        };
        let Some(target) = self.hierarchy.dispatch(self.program, &obj.1.class, &call.method_ref.subsig) else {
            return Ok(());
        };
        let cs_site = CsCallSite { context: caller_ctx.clone(), call_site: site.clone() };
        let callee_ctx = self.selector.select_context_instance(&cs_site, obj, &target);
        let callee = self.program.method(&target);
        if let Some(this_var) = callee.this_var.clone() {
            let this_cs = self.cs_var(&callee_ctx, &this_var);
            self.worklist.push(Pointer::VarPtr(this_cs), PointsToSet::singleton(obj.clone()));
        }
        let call = call.clone();
        self.add_call_edge(call.kind, &caller, site, &callee_ctx, &target, &call)
    }

    fn add_call_edge(
        &mut self,
        kind: CallKind,
        caller: &CsMethod,
        site: &StmtId,
        callee_ctx: &Context,
        target: &MethodId,
        call: &CallSite,
    ) -> Result<()> {
        let edge = CallEdge {
            kind,
            call_site: site.clone(),
            caller: caller.method.clone(),
            callee: target.clone(),
        };
        let is_new = self.call_graph.add_edge(edge);
        let callee_method = CsMethod { context: callee_ctx.clone(), method: target.clone() };
        if is_new {
            self.add_reachable(&callee_method)?;
        }
        // Parameter/return PFG edges are context-specific (a distinct
        // caller context yields a distinct argument binding), so they are
        // wired on every call, not only on a new CG edge.
        let callee = self.program.method(target);
        for (param, arg) in callee.params.iter().zip(call.args.iter()) {
            if let Some(v) = arg.as_var() {
                let arg_cs = self.cs_var(&caller.context, v);
                let param_cs = self.cs_var(callee_ctx, param);
                self.add_pfg_edge(Pointer::VarPtr(arg_cs), Pointer::VarPtr(param_cs))?;
            }
        }
        if let Some(result) = &call.result {
            let result_cs = self.cs_var(&caller.context, result);
            for ret_var in callee.return_vars() {
                let ret_cs = self.cs_var(callee_ctx, &ret_var);
                self.add_pfg_edge(Pointer::VarPtr(ret_cs), Pointer::VarPtr(result_cs.clone()))?;
            }
        }
        Ok(())
    }

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

            for succ in self.pfg.successors(&n).cloned().collect::<Vec<_>>() {
                self.worklist.push(succ, real_delta.clone());
            }

            if let Pointer::VarPtr(x) = &n {
                let objs: Vec<CsObj> = real_delta.iter().cloned().collect();
                for obj in &objs {
                    self.wire_instance_accesses(x, obj)?;
                    if let Some(sites) = self.calls_by_receiver.get(x).cloned() {
                        for (ctx, site) in sites {
                            self.process_call(&ctx, obj, &site)?;
                        }
                    }
                }
            }
        }
        Ok(complete)
    }

    fn wire_instance_accesses(&mut self, x: &CsVar, obj: &CsObj) -> Result<()> {
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
