// This module implements the generic forward symbolic interpreter shared by
// the analyses in the toolkit. It walks a function's blocks in reverse
// post-order, keeps a register-version -> symbolic-expression mapping, and
// evaluates each instruction into the mapping: copies and linear arithmetic
// become expression nodes, everything else leaves its outputs opaque. A driver
// supplies three callbacks: filter selects the instructions it wants to see,
// execute receives each selected instruction together with the mapping as it
// stood just before the instruction, and propagate is told whenever the
// interpreter carries values from a block to a not-yet-visited successor (a
// shared contract with sibling analyses; the polytope builder does not use it
// otherwise). The reverse post-order construction follows the analyzer of the
// code-generation framework.

//! Generic forward symbolic interpreter.

use bumpalo::Bump;
use hashbrown::{HashMap, HashSet};

use crate::expr::{self, SymExpr, SymOp};
use crate::ir::{BlockId, Function, InstId, InstKind, MemRef, OpKind, Operand, RegId};

/// Interpreter behavior flags.
#[derive(Debug, Clone, Copy)]
pub struct InterpFlags {
    /// Carry block out-states only to successors not yet visited in the
    /// reverse post-order sweep.
    pub propagate_unvisited_only: bool,
}

impl Default for InterpFlags {
    fn default() -> Self {
        Self { propagate_unvisited_only: true }
    }
}

/// Callbacks a client supplies to drive the interpreter.
pub trait Driver<'a> {
    /// Select the instructions `execute` should see.
    fn filter(&self, func: &Function, inst: InstId) -> bool;

    /// Visit a selected instruction with the register mapping as it
    /// stands before the instruction executes.
    fn execute(&mut self, cx: &InterpCx<'a>, inst: InstId);

    /// Values of `from` are being carried to the unvisited block `to`.
    fn propagate(&mut self, _cx: &InterpCx<'a>, _from: BlockId, _to: BlockId) {}
}

/// Register mapping visible to a driver at one program point.
pub struct InterpCx<'a> {
    arena: &'a Bump,
    values: HashMap<RegId, &'a SymExpr<'a>>,
}

impl<'a> InterpCx<'a> {
    fn new(arena: &'a Bump, values: HashMap<RegId, &'a SymExpr<'a>>) -> Self {
        Self { arena, values }
    }

    pub fn arena(&self) -> &'a Bump {
        self.arena
    }

    /// Interpreted value of a register, if one was computed.
    pub fn value(&self, reg: RegId) -> Option<&'a SymExpr<'a>> {
        self.values.get(&reg).copied()
    }

    /// Interpreted value, falling back to an opaque register reference.
    pub fn value_or_reg(&self, reg: RegId) -> &'a SymExpr<'a> {
        match self.values.get(&reg) {
            Some(&e) => e,
            None => expr::reg(self.arena, reg),
        }
    }

    /// Symbolic address of a memory reference:
    /// `disp + base*1 + index*scale`, absent terms omitted.
    pub fn address_of(&self, mem: &MemRef) -> &'a SymExpr<'a> {
        let mut acc: Option<&'a SymExpr<'a>> = None;
        if mem.disp != 0 {
            acc = Some(expr::konst(self.arena, mem.disp));
        }
        if let Some(base) = mem.base {
            let b = self.value_or_reg(base);
            acc = Some(match acc {
                Some(e) => expr::fold(self.arena, SymOp::Add, e, b),
                None => b,
            });
        }
        if let Some(index) = mem.index {
            let scaled = expr::fold(
                self.arena,
                SymOp::Mul,
                self.value_or_reg(index),
                expr::konst(self.arena, i64::from(mem.scale.max(1))),
            );
            acc = Some(match acc {
                Some(e) => expr::fold(self.arena, SymOp::Add, e, scaled),
                None => scaled,
            });
        }
        acc.unwrap_or_else(|| expr::konst(self.arena, mem.disp))
    }

    fn bind(&mut self, reg: RegId, value: &'a SymExpr<'a>) {
        self.values.insert(reg, value);
    }

    fn operand_value(&self, operand: &Operand) -> Option<&'a SymExpr<'a>> {
        match operand {
            Operand::Imm(c) => Some(expr::konst(self.arena, *c)),
            Operand::Reg(r) => Some(self.value_or_reg(*r)),
            Operand::Mem(_) => None,
        }
    }
}

/// Forward interpreter over one function.
pub struct ForwardInterpreter {
    flags: InterpFlags,
}

impl ForwardInterpreter {
    pub fn new(flags: InterpFlags) -> Self {
        Self { flags }
    }

    /// Run the driver over the function.
    pub fn run<'a>(&self, arena: &'a Bump, func: &Function, driver: &mut dyn Driver<'a>) {
        // -------- reverse post-order over reachable blocks ---------
        let mut post = Vec::new();
        let mut stack = vec![(func.entry, false)];
        let mut seen = HashSet::new();
        while let Some((block, processed)) = stack.pop() {
            if processed {
                post.push(block);
                continue;
            }
            if !seen.insert(block) {
                continue;
            }
            stack.push((block, true));
            for &succ in &func.block(block).succs {
                stack.push((succ, false));
            }
        }
        post.reverse();

        // -------- interpret blocks in order ---------
        let mut pending: HashMap<BlockId, HashMap<RegId, &'a SymExpr<'a>>> = HashMap::new();
        let mut done: HashSet<BlockId> = HashSet::new();
        for &block in &post {
            let incoming = pending.remove(&block).unwrap_or_default();
            let mut cx = InterpCx::new(arena, incoming);

            for &inst in &func.block(block).insts {
                if driver.filter(func, inst) {
                    driver.execute(&cx, inst);
                }
                self.eval(func, &mut cx, inst);
            }
            done.insert(block);

            for &succ in &func.block(block).succs {
                if self.flags.propagate_unvisited_only && done.contains(&succ) {
                    continue;
                }
                driver.propagate(&cx, block, succ);
                let state = pending.entry(succ).or_default();
                for (&reg, &value) in &cx.values {
                    state.entry(reg).or_insert(value);
                }
            }
        }
    }

    /// Evaluate one instruction into the mapping. Opaque results are
    /// simply left unbound; readers see a plain register reference.
    fn eval<'a>(&self, func: &Function, cx: &mut InterpCx<'a>, inst: InstId) {
        let inst = func.inst(inst);
        let [out] = inst.outputs.as_slice() else {
            return;
        };
        let out = *out;
        let InstKind::Mach(mach) = &inst.kind else {
            return;
        };
        let arena = cx.arena;
        match mach.op {
            OpKind::Mov => {
                if let [src] = mach.operands.as_slice() {
                    if let Some(v) = cx.operand_value(src) {
                        cx.bind(out, v);
                    }
                }
            }
            OpKind::Add | OpKind::Sub | OpKind::Mul | OpKind::Shl => {
                if let [a, b] = mach.operands.as_slice() {
                    let op = match mach.op {
                        OpKind::Add => SymOp::Add,
                        OpKind::Sub => SymOp::Sub,
                        OpKind::Mul => SymOp::Mul,
                        _ => SymOp::Shl,
                    };
                    if let (Some(va), Some(vb)) = (cx.operand_value(a), cx.operand_value(b)) {
                        cx.bind(out, expr::fold(arena, op, va, vb));
                    }
                }
            }
            OpKind::Lea => {
                if let [Operand::Mem(mem)] = mach.operands.as_slice() {
                    let addr = cx.address_of(mem);
                    cx.bind(out, addr);
                }
            }
            _ => {}
        }
    }
}
