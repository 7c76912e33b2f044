// This module implements the invariant and induction classifier. For each
// block the hierarchy walker hands it, the classifier examines every
// instruction once: phi merges at loop headers seed basic induction variables
// (their own family, add 0, mul 1), and single-output machine instructions
// qualify when every explicit source operand is an immediate, an invariant
// register or an induction register with at most one induction operand across
// the whole operand list, and every implicit source is invariant or induction.
// Qualified instructions are handed to the architecture's triple interpreter,
// which composes (family, add*c + d, mul*c) with constant folding.
// Qualification failure is the normal case for irregular code and simply
// leaves the output unclassified.

//! Instruction classification into induction triples.

use crate::arch::{Arch, SrcVal};
use crate::core::AnalysisSession;
use crate::expr::{self, Triple};
use crate::induction::state::InductionState;
use crate::ir::{
    BlockId, Function, InstId, InstKind, Instruction, LoopForest, LoopId, MachInst, RegId,
};

/// Classifies the instructions of one function, driven by the walker.
pub struct Classifier<'s, 'a> {
    sess: &'s AnalysisSession<'a>,
    func: &'s Function,
    loops: &'s LoopForest,
    arch: &'s dyn Arch,
    pub(crate) state: InductionState<'a>,
}

impl<'s, 'a> Classifier<'s, 'a> {
    pub fn new(
        sess: &'s AnalysisSession<'a>,
        func: &'s Function,
        loops: &'s LoopForest,
        arch: &'s dyn Arch,
    ) -> Self {
        let state = InductionState::new(sess.arena(), func);
        Self { sess, func, loops, arch, state }
    }

    pub fn into_state(self) -> InductionState<'a> {
        self.state
    }

    /// Classify every instruction of a block in the context of `lp`.
    pub fn classify_block(&mut self, block: BlockId, lp: LoopId) {
        for &inst in &self.func.block(block).insts {
            self.classify_inst(inst, lp);
        }
        self.sess.note_block_classified();
    }

    fn classify_inst(&mut self, id: InstId, lp: LoopId) {
        let inst = self.func.inst(id);
        let [out] = inst.outputs.as_slice() else {
            return;
        };
        let out = *out;
        match &inst.kind {
            InstKind::Phi { incoming } => self.seed_phi(out, incoming, lp),
            InstKind::Mach(mach) => self.classify_mach(out, inst, mach, lp),
        }
    }

    /// Seed a basic induction variable from a loop-carried phi merge:
    /// one incoming value enters the loop (invariant), another is
    /// redefined inside it.
    fn seed_phi(&mut self, out: RegId, incoming: &[RegId], lp: LoopId) {
        if incoming.len() < 2 {
            return;
        }
        let mut has_entry = false;
        let mut has_carried = false;
        for &r in incoming {
            if self.state.is_invariant(self.func, self.loops, r, lp) {
                has_entry = true;
            } else {
                has_carried = true;
            }
        }
        if !(has_entry && has_carried) {
            return;
        }
        let arena = self.sess.arena();
        let triple = Triple {
            family: out,
            add: expr::konst(arena, 0),
            mul: expr::konst(arena, 1),
        };
        self.state.insert_triple(out, lp, triple);
        self.sess.note_triple();
        log::debug!(
            "seeded basic induction variable {:?} in loop {:?}",
            out,
            lp
        );
    }

    fn classify_mach(&mut self, out: RegId, inst: &Instruction, mach: &MachInst, lp: LoopId) {
        // Qualification: explicit sources are immediates, invariant
        // registers or induction registers, with at most one induction
        // operand counted across the whole list.
        let mut induction_seen = 0usize;
        for r in inst.explicit_src_regs() {
            if self.state.triple(r).is_some() {
                induction_seen += 1;
                if induction_seen > 1 {
                    log::trace!("{:?}: more than one induction operand", out);
                    return;
                }
            } else if !self.state.is_invariant(self.func, self.loops, r, lp) {
                return;
            }
            self.sess.note_invariant_query();
        }
        // Implicit sources (flags and friends): invariant or induction,
        // unrestricted count.
        for &r in &mach.implicit_in {
            if self.state.triple(r).is_none()
                && !self.state.is_invariant(self.func, self.loops, r, lp)
            {
                return;
            }
        }
        if induction_seen == 0 {
            // Nothing linear in a family to compose.
            return;
        }

        let arena = self.sess.arena();
        let func = self.func;
        let loops = self.loops;
        let state = &mut self.state;
        let triple = self.arch.build_triple(arena, mach, &mut |r| {
            if let Some(t) = state.triple(r) {
                Some(SrcVal::Induction(t))
            } else if state.is_invariant(func, loops, r, lp) {
                Some(SrcVal::Invariant(state.invariant_ref(lp, r)))
            } else {
                None
            }
        });
        if let Some(triple) = triple {
            self.state.insert_triple(out, lp, triple);
            self.sess.note_triple();
            log::debug!("classified {:?} as induction in loop {:?}", out, lp);
        }
    }
}
