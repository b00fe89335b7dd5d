//! A whole-program static-analysis core: class hierarchy analysis and
//! call-graph construction, a generic monotone dataflow solver
//! instantiated for live variables and constant propagation,
//! interprocedural constant propagation over an ICFG, dead-code
//! detection, and Andersen-style pointer analysis in both
//! context-insensitive and context-sensitive flavors.
//!
//! The IR (`ir`), class hierarchy, and statement visitor are the data
//! model a caller builds once from its own front end; everything else is
//! pure analysis over that data. `build_cha`, `run_pointer_analysis_ci`
//! and `run_pointer_analysis_cs` touch the `Program`/`ClassHierarchy`
//! the caller built and so return `error::Result` (see `error`) against a
//! malformed IR; the single-method dataflow solvers
//! (`solve_constant_propagation`, `solve_live_variables`,
//! `solve_inter_cp`, `detect_dead_code`) run purely in memory over an
//! already-validated `Method`/`Icfg` and return their result type
//! directly, since they cannot fail. None of these analyses panics on
//! well-formed input.

pub mod callgraph;
pub mod cfg;
pub mod config;
pub mod dataflow;
pub mod deadcode;
pub mod error;
pub mod hierarchy;
pub mod icfg;
pub mod interproc;
pub mod ir;
pub mod lattice;
pub mod pointer;
pub mod solver;

use callgraph::CallGraph;
use config::AnalysisConfig;
use error::Result;
use hierarchy::ClassHierarchy;
use ir::{MethodId, Program, StmtNode};
use pointer::context::ContextSelector;
use pointer::ci::CiResult;
use pointer::cs::CsResult;
use solver::DataflowResult;

/// Builds a whole-program call graph by class hierarchy analysis, seeded
/// from `entry`.
pub fn build_cha(program: &Program, hierarchy: &ClassHierarchy, entry: &MethodId, config: &AnalysisConfig) -> Result<CallGraph> {
    callgraph::cha::build_cha(program, hierarchy, entry, config)
}

/// Runs constant propagation on a single method's CFG.
pub fn solve_constant_propagation(method: &ir::Method, config: &AnalysisConfig) -> DataflowResult<StmtNode, dataflow::constprop::Env> {
    dataflow::constprop::analyze(method, config)
}

/// Runs live-variable analysis on a single method's CFG.
pub fn solve_live_variables(method: &ir::Method, config: &AnalysisConfig) -> DataflowResult<StmtNode, dataflow::live::Env> {
    dataflow::live::analyze(method, config)
}

/// Runs interprocedural constant propagation over the ICFG rooted at
/// `entry`.
pub fn solve_inter_cp(icfg: &icfg::Icfg<'_>, entry: &StmtNode, config: &AnalysisConfig) -> DataflowResult<StmtNode, dataflow::constprop::Env> {
    interproc::analyze(icfg, entry, config)
}

/// Detects dead code in a single method by composing live-variable and
/// constant-propagation results.
pub fn detect_dead_code(method: &ir::Method, config: &AnalysisConfig) -> deadcode::DeadCodeReport {
    deadcode::detect(method, config)
}

/// Runs context-insensitive pointer analysis (and on-the-fly call-graph
/// construction) seeded from `entry`.
pub fn run_pointer_analysis_ci(program: &Program, hierarchy: &ClassHierarchy, entry: &MethodId, config: &AnalysisConfig) -> Result<CiResult> {
    pointer::ci::analyze(program, hierarchy, entry, config)
}

/// Runs context-sensitive pointer analysis with the given `selector`,
/// seeded from `entry`.
pub fn run_pointer_analysis_cs<S: ContextSelector>(
    program: &Program,
    hierarchy: &ClassHierarchy,
    entry: &MethodId,
    config: &AnalysisConfig,
    selector: &S,
) -> Result<CsResult> {
    pointer::cs::analyze(program, hierarchy, entry, config, selector)
}
