//! indvars - induction-variable and polytope analysis.
//!
//! This pass runs on a disassembled function already lifted to SSA form
//! with a computed loop forest. Per loop it classifies which register
//! versions are induction variables (quantities varying by a fixed stride
//! per iteration) and which are loop-invariant, then characterizes every
//! memory access inside innermost loops by a symbolic address formula
//! plus, where derivable, its iteration start/stop bounds.
//!
//! # Primary Usage
//!
//! ```ignore
//! use bumpalo::Bump;
//! use indvars::{analyze_function, AnalysisSession};
//!
//! // One arena per analyzed function; it owns every symbolic node.
//! let arena = Bump::new();
//! let session = AnalysisSession::new(&arena);
//!
//! let analysis = analyze_function(&session, &func, &loops)?;
//! for lp in analysis.polytopes.loop_ids() {
//!     println!("{}", analysis.polytopes.export(&func, arch));
//! }
//! ```
//!
//! # Architecture
//!
//! - [`ir`] - immutable SSA form and loop forest handed in by the toolkit
//! - [`expr`] - symbolic expression nodes and induction triples
//! - [`induction`] - invariant/induction classifier and hierarchy walker
//! - [`interp`] - generic forward symbolic interpreter
//! - [`polytope`] - per-access address polytopes and the textual export
//! - [`arch`] - architecture descriptions and the triple interpreter seam
//! - [`core`] - shared infrastructure (session, errors)

pub mod arch;
pub mod core;
pub mod expr;
pub mod induction;
pub mod interp;
pub mod ir;
pub mod polytope;

pub use crate::core::{AnalysisError, AnalysisResult, AnalysisSession, SessionStats};
pub use crate::expr::{SymExpr, SymOp, Triple};
pub use crate::induction::InductionState;
pub use crate::polytope::{Polytope, PolytopeSet};

use crate::ir::{Function, LoopForest};

/// Complete analysis results for one function.
///
/// Queryable by register version (triples), by loop id (invariant
/// tables and polytope collections), and exportable as text.
#[derive(Debug)]
pub struct FunctionAnalysis<'a> {
    pub induction: InductionState<'a>,
    pub polytopes: PolytopeSet<'a>,
}

/// Run the full pass over one function.
///
/// Fatal errors are a function without SSA form and a target
/// architecture with no registered triple interpreter; every other
/// irregularity degrades into unclassified registers, missing bounds or
/// `computed = false` on the affected polytopes.
pub fn analyze_function<'a>(
    sess: &AnalysisSession<'a>,
    func: &Function,
    loops: &LoopForest,
) -> AnalysisResult<FunctionAnalysis<'a>> {
    if func.blocks.is_empty() || func.insts.is_empty() {
        return Err(AnalysisError::MissingSsa { name: func.name.clone() });
    }
    let arch = arch::lookup(func.arch).ok_or(AnalysisError::UnsupportedArch { arch: func.arch })?;

    log::debug!(
        "analyzing `{}` on {}: {} blocks, {} loops",
        func.name,
        arch.name(),
        func.blocks.len(),
        loops.len()
    );
    let state = induction::run(sess, func, loops, arch);
    let polytopes = polytope::build(sess, func, loops, arch, &state);
    Ok(FunctionAnalysis { induction: state, polytopes })
}
