// This module implements the polytope builder as a driver for the generic
// forward symbolic interpreter. The filter accepts instructions sitting in an
// innermost loop that are not address computations, no-ops or calls and carry
// at least one memory operand. For each memory operand of an accepted
// instruction, execute assembles disp + base + index*scale from the
// interpreter's register mapping, collects the transitively referenced
// register versions, and derives the iteration bounds: the stop bound comes
// from a backward scan of the loop's single exit block where the first compare
// found decides (immediate-vs-register matches, anything else ends the scan
// empty), the induction match looks that register up in the triple mapping,
// and the start bound follows the family's phi merge to the incoming value
// that enters the loop. The completeness flag records whether every referenced
// register was resolved.

//! Polytope builder driving the forward interpreter.

use hashbrown::HashMap;

use crate::arch::{Arch, InstClass};
use crate::core::AnalysisSession;
use crate::expr::Triple;
use crate::induction::InductionState;
use crate::interp::{Driver, ForwardInterpreter, InterpCx, InterpFlags};
use crate::ir::{
    BlockId, Function, InstId, InstKind, LoopForest, LoopId, MemRef, Operand, RegId,
};
use crate::polytope::{Polytope, PolytopeSet, StartBound, StopBound};

/// Backward scan of an exit block for the stop compare.
///
/// Pure over the reversed instruction list: the first compare
/// encountered decides. It matches iff it has exactly two explicit
/// operands, an immediate first and a register second; a first compare
/// of any other shape ends the scan with no bound. Non-compares are
/// skipped.
pub fn find_stop_compare(func: &Function, arch: &dyn Arch, exit: BlockId) -> Option<StopBound> {
    for &id in func.block(exit).insts.iter().rev() {
        let Some(mach) = func.inst(id).mach() else {
            continue;
        };
        if arch.inst_class(mach) != InstClass::Compare {
            continue;
        }
        if let [Operand::Imm(imm), Operand::Reg(reg)] = mach.operands.as_slice() {
            return Some(StopBound { inst: id, imm: *imm, reg: *reg });
        }
        return None;
    }
    None
}

struct PolytopeBuilder<'s, 'a> {
    sess: &'s AnalysisSession<'a>,
    func: &'s Function,
    loops: &'s LoopForest,
    arch: &'s dyn Arch,
    state: &'s InductionState<'a>,
    sets: HashMap<LoopId, Vec<Polytope<'a>>>,
}

impl<'s, 'a> PolytopeBuilder<'s, 'a> {
    /// Innermost loop of the instruction's block, if it has one.
    fn innermost_of(&self, inst: InstId) -> Option<LoopId> {
        let lp = self.loops.innermost_for(self.func.inst(inst).block)?;
        self.loops.is_innermost(lp).then_some(lp)
    }

    fn find_start_bound(
        &self,
        cx: &InterpCx<'a>,
        family: RegId,
        stop_reg: RegId,
    ) -> Option<StartBound<'a>> {
        let def = self.func.reg(family).def?;
        let InstKind::Phi { incoming } = &self.func.inst(def).kind else {
            return None;
        };
        let picked = match incoming.as_slice() {
            [only] => *only,
            [a, b] => {
                // The back-edge value is the compared register; the
                // other incoming value enters the loop.
                if *a == stop_reg {
                    *b
                } else {
                    *a
                }
            }
            // More than two reaching definitions: no start bound.
            _ => return None,
        };
        Some(StartBound {
            reg: picked,
            inst: self.func.reg(picked).def,
            value: cx.value_or_reg(picked),
        })
    }

    fn build_polytope(&mut self, cx: &InterpCx<'a>, inst_id: InstId, lp: LoopId, mem: &MemRef) {
        let func = self.func;
        let address = func
            .inst(inst_id)
            .mach()
            .map(|m| m.address)
            .unwrap_or(0);

        let expr = cx.address_of(mem);
        let mut referenced = Vec::new();
        expr.collect_regs(&mut referenced);
        let text = expr.render(&|r| {
            format!(
                "{}_{}",
                self.arch.reg_name(func.reg(r).phys),
                func.reg(r).version
            )
        });

        // Bounds, single-exit loops only.
        let mut stop_bound = None;
        let mut induction: Option<(RegId, Triple<'a>)> = None;
        let mut start_bound = None;
        if let [exit] = self.loops.get(lp).exits.as_slice() {
            if let Some(sb) = find_stop_compare(func, self.arch, *exit) {
                stop_bound = Some(sb);
                if let Some(t) = self.state.triple(sb.reg) {
                    induction = Some((sb.reg, t));
                    start_bound = self.find_start_bound(cx, t.family, sb.reg);
                } else {
                    log::trace!(
                        "stop-bound register {:?} not in induction mapping, bounds aborted",
                        sb.reg
                    );
                }
            }
        }

        // Complete iff no referenced register is both unclassified and
        // defined inside the current innermost loop.
        let loop_ref = self.loops.get(lp);
        let computed = referenced.iter().all(|&r| {
            self.state.triple(r).is_some()
                || !func.def_block(r).is_some_and(|b| loop_ref.contains(b))
        });

        let polytope = Polytope {
            inst: inst_id,
            address,
            level: self.loops.depth(lp),
            expr,
            referenced,
            text,
            computed,
            induction,
            stop_bound,
            start_bound,
        };
        log::debug!(
            "polytope at {:#x} in loop {:?}: `{}` computed={}",
            address,
            lp,
            polytope.text,
            polytope.computed
        );
        self.sets.entry(lp).or_default().push(polytope);
        self.sess.note_polytope();
    }
}

impl<'s, 'a> Driver<'a> for PolytopeBuilder<'s, 'a> {
    fn filter(&self, func: &Function, inst: InstId) -> bool {
        if self.innermost_of(inst).is_none() {
            return false;
        }
        let Some(mach) = func.inst(inst).mach() else {
            return false;
        };
        if matches!(
            self.arch.inst_class(mach),
            InstClass::AddressCompute | InstClass::Nop | InstClass::Call
        ) {
            return false;
        }
        !func.inst(inst).mem_operands().is_empty()
    }

    fn execute(&mut self, cx: &InterpCx<'a>, inst: InstId) {
        let Some(lp) = self.innermost_of(inst) else {
            return;
        };
        for mem in self.func.inst(inst).mem_operands() {
            self.build_polytope(cx, inst, lp, &mem);
        }
    }
}

/// Build all polytopes of a function from its induction classification.
pub fn build<'a>(
    sess: &AnalysisSession<'a>,
    func: &Function,
    loops: &LoopForest,
    arch: &dyn Arch,
    state: &InductionState<'a>,
) -> PolytopeSet<'a> {
    let mut builder = PolytopeBuilder {
        sess,
        func,
        loops,
        arch,
        state,
        sets: HashMap::new(),
    };
    ForwardInterpreter::new(InterpFlags::default()).run(sess.arena(), func, &mut builder);
    PolytopeSet::new(func.name.clone(), builder.sets)
}
