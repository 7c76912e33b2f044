// This module owns the per-function induction state: one invariant table per
// loop (register version -> InvariantRef node, built once and cached for the
// run), the memo behind is_invariant, the function-wide register -> triple
// mapping with the loop each triple was classified in, and the per-block
// visited marks the hierarchy walker threads through its traversal. All
// expression nodes referenced here live in the session arena; the state holds
// plain references and never frees anything itself, so releasing the arena
// after the run frees every node exactly once.

//! Per-function induction classification state.

use bumpalo::Bump;
use hashbrown::HashMap;

use crate::expr::{self, SymExpr, Triple};
use crate::ir::{BlockId, Function, LoopForest, LoopId, RegId};

/// Visit status of a block during the hierarchy walk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockMark {
    Unvisited,
    Visited,
}

/// Induction classification results for one function.
#[derive(Debug)]
pub struct InductionState<'a> {
    arena: &'a Bump,
    /// Per-loop invariant tables.
    invariant_tables: HashMap<LoopId, HashMap<RegId, &'a SymExpr<'a>>>,
    /// Memo for `is_invariant`, keyed by (register, loop).
    invariant_memo: HashMap<(RegId, LoopId), bool>,
    /// Function-wide induction mapping.
    triples: HashMap<RegId, Triple<'a>>,
    /// Loop each triple was classified in.
    classified_in: HashMap<RegId, LoopId>,
    marks: Vec<BlockMark>,
}

impl<'a> InductionState<'a> {
    pub fn new(arena: &'a Bump, func: &Function) -> Self {
        Self {
            arena,
            invariant_tables: HashMap::new(),
            invariant_memo: HashMap::new(),
            triples: HashMap::new(),
            classified_in: HashMap::new(),
            marks: vec![BlockMark::Unvisited; func.blocks.len()],
        }
    }

    pub fn arena(&self) -> &'a Bump {
        self.arena
    }

    /// Is the register invariant for the loop?
    ///
    /// True when it has no defining instruction, or its defining
    /// instruction's block is not a member of the loop's block set (a
    /// membership test: a block belongs to every loop enclosing it).
    /// Memoized per (register, loop).
    pub fn is_invariant(
        &mut self,
        func: &Function,
        loops: &LoopForest,
        reg: RegId,
        lp: LoopId,
    ) -> bool {
        if let Some(&cached) = self.invariant_memo.get(&(reg, lp)) {
            return cached;
        }
        let invariant = match func.def_block(reg) {
            None => true,
            Some(block) => !loops.get(lp).contains(block),
        };
        self.invariant_memo.insert((reg, lp), invariant);
        if invariant {
            self.invariant_ref(lp, reg);
        }
        invariant
    }

    /// InvariantRef node for the register in the loop's table,
    /// creating it on first use.
    pub fn invariant_ref(&mut self, lp: LoopId, reg: RegId) -> &'a SymExpr<'a> {
        let table = self.invariant_tables.entry(lp).or_default();
        if let Some(&node) = table.get(&reg) {
            return node;
        }
        let node = expr::reg(self.arena, reg);
        table.insert(reg, node);
        node
    }

    /// Invariant table of a loop, if any register was recorded for it.
    pub fn invariant_table(&self, lp: LoopId) -> Option<&HashMap<RegId, &'a SymExpr<'a>>> {
        self.invariant_tables.get(&lp)
    }

    /// Induction triple of a register version, if classified.
    pub fn triple(&self, reg: RegId) -> Option<Triple<'a>> {
        self.triples.get(&reg).copied()
    }

    /// Loop a register's triple was classified in.
    pub fn classified_in(&self, reg: RegId) -> Option<LoopId> {
        self.classified_in.get(&reg).copied()
    }

    /// All induction registers classified in the given loop.
    pub fn inductions_in(&self, lp: LoopId) -> impl Iterator<Item = (RegId, Triple<'a>)> + '_ {
        self.classified_in
            .iter()
            .filter(move |(_, &l)| l == lp)
            .map(|(&r, _)| (r, self.triples[&r]))
    }

    /// Record a classified triple.
    ///
    /// A register is never simultaneously invariant and an induction key
    /// for the same loop; its definition sits inside the loop it was
    /// classified in.
    pub fn insert_triple(&mut self, reg: RegId, lp: LoopId, triple: Triple<'a>) {
        debug_assert_ne!(self.invariant_memo.get(&(reg, lp)), Some(&true));
        self.triples.insert(reg, triple);
        self.classified_in.insert(reg, lp);
    }

    pub fn is_visited(&self, block: BlockId) -> bool {
        self.marks[block.0 as usize] == BlockMark::Visited
    }

    pub fn mark_visited(&mut self, block: BlockId) {
        self.marks[block.0 as usize] = BlockMark::Visited;
    }

    /// Number of classified induction registers.
    pub fn len(&self) -> usize {
        self.triples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.triples.is_empty()
    }
}
