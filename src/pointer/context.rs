//! Context-sensitivity support for C13: `Context`, the `ContextSelector`
//! trait, an `Rc`-based interning manager, and two concrete selectors.
//!
//! The design note sketches an arena + integer-handle interner; this
//! core takes a lighter `Rc`-based memoization instead; `BTreeMap`-keyed
//! structural equality already gives canonical identity for the
//! `(Context, element)` pairs the design calls for, so a handle table
//! buys nothing extra here. See the open-question log.

use std::collections::BTreeMap as Map;
use std::rc::Rc;

use crate::ir::{MethodId, StmtId};
use crate::pointer::Obj;

/// A calling context: an ordered sequence of call sites (empty for a
/// context-insensitive selector, up to `K` deep for k-CFA). Shared via
/// `Rc` so cloning a context is cheap and equal contexts compare equal
/// without re-walking the vector.
#[derive(Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Context(Rc<Vec<StmtId>>);

impl Context {
    pub fn empty() -> Self {
        Context(Rc::new(Vec::new()))
    }

    pub fn elements(&self) -> &[StmtId] {
        &self.0
    }

    /// Appends `site` and truncates to the last `k` elements (FIFO),
    /// used by `CallSiteSensitiveSelector<K>`.
    fn extended(&self, site: &StmtId, k: usize) -> Self {
        let mut v: Vec<StmtId> = self.0.iter().cloned().collect();
        v.push(site.clone());
        if v.len() > k {
            let drop = v.len() - k;
            v.drain(0..drop);
        }
        Context(Rc::new(v))
    }
}

/// A context-qualified variable: the context a call was made in, plus
/// the variable itself.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CsVar {
    pub context: Context,
    pub var: crate::ir::Var,
}

/// A context-qualified method, the unit `selectContext` reasons over.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CsMethod {
    pub context: Context,
    pub method: MethodId,
}

/// A context-qualified call site, the unit `selectContext` is invoked at.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CsCallSite {
    pub context: Context,
    pub call_site: StmtId,
}

/// A context-qualified heap object: the heap context from
/// `selectHeapContext` plus the underlying allocation-site object.
pub type CsObj = (Context, Obj);

/// Interns `(Context, element)` pairs by value — since both halves are
/// `Ord + Clone` and cheap to compare, a `BTreeMap`-backed cache gives
/// canonical identity without a separate handle allocator.
#[derive(Default)]
pub struct CsManager {
    vars: Map<CsVar, CsVar>,
    methods: Map<CsMethod, CsMethod>,
    objs: Map<CsObj, CsObj>,
}

impl CsManager {
    pub fn new() -> Self {
        CsManager::default()
    }

    pub fn intern_var(&mut self, v: CsVar) -> CsVar {
        self.vars.entry(v.clone()).or_insert(v).clone()
    }

    pub fn intern_method(&mut self, m: CsMethod) -> CsMethod {
        self.methods.entry(m.clone()).or_insert(m).clone()
    }

    pub fn intern_obj(&mut self, o: CsObj) -> CsObj {
        self.objs.entry(o.clone()).or_insert(o).clone()
    }
}

/// The pluggable context policy. Every method returns a fresh `Context`;
/// a selector is pure and stateless across calls.
pub trait ContextSelector {
    fn empty_context(&self) -> Context;

    /// The heap context assigned to an allocation made by `method`
    /// (already context-qualified) when it executes `obj`'s `New`.
    fn select_heap_context(&self, method: &CsMethod, obj: &Obj) -> Context;

    /// Context for a static/special dispatch: no receiver object
    /// involved.
    fn select_context_static(&self, call_site: &CsCallSite, callee: &MethodId) -> Context;

    /// Context for an instance dispatch, given the context-qualified
    /// receiver object resolved by the pointer analysis.
    fn select_context_instance(&self, call_site: &CsCallSite, recv_obj: &CsObj, callee: &MethodId) -> Context;
}

/// Every context is the empty context: running CS with this selector
/// must reproduce CI's points-to sets exactly, which is the cross-check
/// this selector exists for.
pub struct ContextInsensitiveSelector;

impl ContextSelector for ContextInsensitiveSelector {
    fn empty_context(&self) -> Context {
        Context::empty()
    }

    fn select_heap_context(&self, _method: &CsMethod, _obj: &Obj) -> Context {
        Context::empty()
    }

    fn select_context_static(&self, _call_site: &CsCallSite, _callee: &MethodId) -> Context {
        Context::empty()
    }

    fn select_context_instance(&self, _call_site: &CsCallSite, _recv_obj: &CsObj, _callee: &MethodId) -> Context {
        Context::empty()
    }
}

/// k-CFA: the context is the last `K` call sites on the calling path,
/// truncated FIFO. Heap contexts track the allocating method's own
/// context, matching the common "object-less" k-CFA heap policy.
pub struct CallSiteSensitiveSelector<const K: usize>;

impl<const K: usize> ContextSelector for CallSiteSensitiveSelector<K> {
    fn empty_context(&self) -> Context {
        Context::empty()
    }

    fn select_heap_context(&self, method: &CsMethod, _obj: &Obj) -> Context {
        method.context.clone()
    }

    fn select_context_static(&self, call_site: &CsCallSite, _callee: &MethodId) -> Context {
        call_site.context.extended(&call_site.call_site, K)
    }

    fn select_context_instance(&self, call_site: &CsCallSite, _recv_obj: &CsObj, _callee: &MethodId) -> Context {
        call_site.context.extended(&call_site.call_site, K)
    }
}
