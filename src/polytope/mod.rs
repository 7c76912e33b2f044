//! Polytope construction for memory accesses in innermost loops.
//!
//! A polytope is the symbolic address formula of one memory operand plus
//! its resolvable iteration bounds: the stop bound read off the loop's
//! single exit compare and the start bound read off the induction
//! family's phi merge. Collections are grouped per loop id in the order
//! the interpreter visited the instructions.

pub mod builder;
pub mod export;

use hashbrown::HashMap;

use crate::expr::{SymExpr, Triple};
use crate::ir::{InstId, LoopId, RegId};

pub use builder::build;

/// Stop bound: the exit-block compare limiting the iteration.
#[derive(Debug, Clone, Copy)]
pub struct StopBound {
    pub inst: InstId,
    /// Immediate first operand of the compare.
    pub imm: i64,
    /// Register second operand of the compare.
    pub reg: RegId,
}

/// Start bound: the loop-entry value of the induction family.
#[derive(Debug, Clone, Copy)]
pub struct StartBound<'a> {
    pub reg: RegId,
    pub inst: Option<InstId>,
    pub value: &'a SymExpr<'a>,
}

/// One memory operand of one instruction inside an innermost loop.
#[derive(Debug, Clone)]
pub struct Polytope<'a> {
    pub inst: InstId,
    /// Address of the wrapped machine instruction.
    pub address: u64,
    /// Nesting depth of the enclosing loop.
    pub level: u32,
    pub expr: &'a SymExpr<'a>,
    /// Transitively referenced register versions, first-seen order.
    pub referenced: Vec<RegId>,
    /// Rendered address formula.
    pub text: String,
    /// True iff every referenced register is invariant-in-loop or an
    /// induction register.
    pub computed: bool,
    /// Induction register matched from the stop bound, with its triple.
    pub induction: Option<(RegId, Triple<'a>)>,
    pub stop_bound: Option<StopBound>,
    pub start_bound: Option<StartBound<'a>>,
}

/// Per-function polytope collections, grouped by loop id.
#[derive(Debug)]
pub struct PolytopeSet<'a> {
    pub function: String,
    sets: HashMap<LoopId, Vec<Polytope<'a>>>,
}

impl<'a> PolytopeSet<'a> {
    pub(crate) fn new(function: String, sets: HashMap<LoopId, Vec<Polytope<'a>>>) -> Self {
        Self { function, sets }
    }

    /// Ordered polytopes of one loop.
    pub fn for_loop(&self, lp: LoopId) -> &[Polytope<'a>] {
        self.sets.get(&lp).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Loop ids with at least one polytope, ascending.
    pub fn loop_ids(&self) -> Vec<LoopId> {
        let mut ids: Vec<LoopId> = self.sets.keys().copied().collect();
        ids.sort();
        ids
    }

    pub fn len(&self) -> usize {
        self.sets.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.sets.is_empty()
    }
}
