//! Class-hierarchy-analysis call-graph construction (C8): `resolve` per
//! call kind, and the worklist that builds a whole-program call graph
//! from a single entry method.

use std::collections::VecDeque;

use crate::callgraph::{CallEdge, CallGraph};
use crate::config::{AnalysisConfig, Budget};
use crate::error::{InternalError, Result};
use crate::hierarchy::ClassHierarchy;
use crate::ir::{CallKind, CallSite, MethodId, Program};

/// Resolves a call site to the set of methods it may dispatch to, per its
/// `CallKind`. STATIC/SPECIAL resolve to exactly `dispatch` on the
/// statically-named target; VIRTUAL/INTERFACE widen over the declaring
/// class's direct children (or the full transitive closure, per
/// `AnalysisConfig::direct_subtypes_only`); DYNAMIC resolves to nothing,
/// left to whatever dynamic-call policy a caller layers on top.
pub fn resolve(program: &Program, hierarchy: &ClassHierarchy, site: &CallSite, config: &AnalysisConfig) -> Vec<MethodId> {
    let declaring = &site.method_ref.class;
    let subsig = &site.method_ref.subsig;

    match site.kind {
        CallKind::Static | CallKind::Special => {
            hierarchy.dispatch(program, declaring, subsig).into_iter().collect()
        }
        CallKind::Virtual | CallKind::Interface => {
            let mut targets = std::collections::BTreeSet::new();
            if !program.class(declaring).is_abstract {
                if let Some(m) = hierarchy.dispatch(program, declaring, subsig) {
                    targets.insert(m);
                }
            }
            let children = if config.direct_subtypes_only {
                hierarchy.direct_children(program, declaring)
            } else {
                hierarchy.transitive_children(program, declaring)
            };
            for child in &children {
                if let Some(m) = hierarchy.dispatch(program, child, subsig) {
                    targets.insert(m);
                }
            }
            targets.into_iter().collect()
        }
        CallKind::Dynamic => {
            tracing::trace!(call = ?site.method_ref, "dynamic call site resolves to empty target set");
            Vec::new()
        }
    }
}

/// Builds a whole-program call graph by CHA, seeded from `entry`: for
/// each newly-reachable method, resolve every call site it contains and
/// enqueue each resolved target.
pub fn build_cha(program: &Program, hierarchy: &ClassHierarchy, entry: &MethodId, config: &AnalysisConfig) -> Result<CallGraph> {
    let _span = tracing::debug_span!("build_cha", entry = %entry).entered();
    let mut cg = CallGraph::new();
    let mut worklist: VecDeque<MethodId> = VecDeque::new();
    worklist.push_back(entry.clone());
    let budget = Budget::start(config);

    while let Some(m) = worklist.pop_front() {
        if config.cancellation.is_cancelled() || budget.expired() {
            cg.complete = false;
            break;
        }
        if !cg.add_reachable(m.clone()) {
            continue;
        }
        let method = program.methods.get(&m).ok_or_else(|| {
            InternalError(format!("reachable method {m} missing from program (malformed IR)"))
        })?;

        for (site_id, call) in method.invoke_sites() {
            let targets = resolve(program, hierarchy, call, config);
            for target in targets {
                let edge = CallEdge {
                    kind: call.kind,
                    call_site: site_id.clone(),
                    caller: m.clone(),
                    callee: target.clone(),
                };
                if cg.add_edge(edge) {
                    tracing::trace!(site = %site_id, callee = %target, "new CHA edge");
                    worklist.push_back(target);
                }
            }
        }
    }

    Ok(cg)
}
