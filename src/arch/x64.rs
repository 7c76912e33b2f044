//! x86-64 architecture description.
//!
//! The decoder normalizes instructions to three-address SSA form before
//! this pass runs: `operands` hold sources only, destinations appear as
//! output register versions. The triple interpreter below expresses the
//! composition law `j*c + d -> (family, add*c + d, mul*c)` for the x86-64
//! opcodes that keep a value linear in one induction family.

use bumpalo::Bump;

use super::{Arch, InstClass, SrcVal};
use crate::expr::{self, SymExpr, SymOp, Triple};
use crate::ir::{ArchId, MachInst, MemRef, OpKind, Operand, PhysReg, RegId};

pub const ARCH_ID: ArchId = ArchId(1);

pub const RAX: PhysReg = PhysReg(0);
pub const RCX: PhysReg = PhysReg(1);
pub const RDX: PhysReg = PhysReg(2);
pub const RBX: PhysReg = PhysReg(3);
pub const RSP: PhysReg = PhysReg(4);
pub const RBP: PhysReg = PhysReg(5);
pub const RSI: PhysReg = PhysReg(6);
pub const RDI: PhysReg = PhysReg(7);
pub const RFLAGS: PhysReg = PhysReg(16);

static REG_NAMES: [&str; 17] = [
    "rax", "rcx", "rdx", "rbx", "rsp", "rbp", "rsi", "rdi", "r8", "r9", "r10", "r11", "r12",
    "r13", "r14", "r15", "rflags",
];

/// Source value after resolution, immediates included.
enum Val<'a> {
    Imm(i64),
    Inv(&'a SymExpr<'a>),
    Ind(Triple<'a>),
}

impl<'a> Val<'a> {
    /// Expression form of a non-induction value.
    fn expr(&self, arena: &'a Bump) -> Option<&'a SymExpr<'a>> {
        match self {
            Val::Imm(c) => Some(expr::konst(arena, *c)),
            Val::Inv(e) => Some(e),
            Val::Ind(_) => None,
        }
    }
}

pub struct X64;

impl X64 {
    fn value_of<'a>(
        &self,
        operand: &Operand,
        resolve: &mut dyn FnMut(RegId) -> Option<SrcVal<'a>>,
    ) -> Option<Val<'a>> {
        match operand {
            Operand::Imm(c) => Some(Val::Imm(*c)),
            Operand::Reg(r) => match resolve(*r)? {
                SrcVal::Invariant(e) => Some(Val::Inv(e)),
                SrcVal::Induction(t) => Some(Val::Ind(t)),
            },
            // Loaded values are opaque; only lea consumes a memory
            // operand as an address computation.
            Operand::Mem(_) => None,
        }
    }

    /// `lea out, [base + index*scale + disp]` over one induction part.
    fn lea_triple<'a>(
        &self,
        arena: &'a Bump,
        mem: &MemRef,
        resolve: &mut dyn FnMut(RegId) -> Option<SrcVal<'a>>,
    ) -> Option<Triple<'a>> {
        let base = match mem.base {
            Some(r) => Some(resolve(r)?),
            None => None,
        };
        let index = match mem.index {
            Some(r) => Some(resolve(r)?),
            None => None,
        };
        let scale = expr::konst(arena, i64::from(mem.scale.max(1)));
        let disp = expr::konst(arena, mem.disp);

        match (base, index) {
            (Some(SrcVal::Induction(_)), Some(SrcVal::Induction(_))) => None,
            (Some(SrcVal::Induction(t)), other_index) => {
                let mut add = t.add;
                if let Some(SrcVal::Invariant(e)) = other_index {
                    add = expr::fold(arena, SymOp::Add, add, expr::fold(arena, SymOp::Mul, e, scale));
                }
                add = expr::fold(arena, SymOp::Add, add, disp);
                Some(Triple { family: t.family, add, mul: t.mul })
            }
            (other_base, Some(SrcVal::Induction(t))) => {
                let mut add = expr::fold(arena, SymOp::Mul, t.add, scale);
                if let Some(SrcVal::Invariant(e)) = other_base {
                    add = expr::fold(arena, SymOp::Add, add, e);
                }
                add = expr::fold(arena, SymOp::Add, add, disp);
                let mul = expr::fold(arena, SymOp::Mul, t.mul, scale);
                Some(Triple { family: t.family, add, mul })
            }
            _ => None,
        }
    }
}

impl Arch for X64 {
    fn id(&self) -> ArchId {
        ARCH_ID
    }

    fn name(&self) -> &'static str {
        "x86-64"
    }

    fn reg_name(&self, reg: PhysReg) -> &'static str {
        REG_NAMES.get(reg.0 as usize).copied().unwrap_or("??")
    }

    fn inst_class(&self, inst: &MachInst) -> InstClass {
        match inst.op {
            OpKind::Cmp | OpKind::Test => InstClass::Compare,
            OpKind::Lea => InstClass::AddressCompute,
            OpKind::Call => InstClass::Call,
            OpKind::Nop => InstClass::Nop,
            _ => InstClass::Other,
        }
    }

    fn build_triple<'a>(
        &self,
        arena: &'a Bump,
        inst: &MachInst,
        resolve: &mut dyn FnMut(RegId) -> Option<SrcVal<'a>>,
    ) -> Option<Triple<'a>> {
        match inst.op {
            OpKind::Mov => {
                let [src] = inst.operands.as_slice() else {
                    return None;
                };
                match self.value_of(src, resolve)? {
                    Val::Ind(t) => Some(t),
                    _ => None,
                }
            }
            OpKind::Add | OpKind::Sub => {
                let [a, b] = inst.operands.as_slice() else {
                    return None;
                };
                let (va, vb) = (self.value_of(a, resolve)?, self.value_of(b, resolve)?);
                match (inst.op, va, vb) {
                    (_, Val::Ind(_), Val::Ind(_)) => None,
                    (OpKind::Add, Val::Ind(t), other) | (OpKind::Add, other, Val::Ind(t)) => {
                        let e = other.expr(arena)?;
                        Some(Triple {
                            family: t.family,
                            add: expr::fold(arena, SymOp::Add, t.add, e),
                            mul: t.mul,
                        })
                    }
                    (OpKind::Sub, Val::Ind(t), other) => {
                        let e = other.expr(arena)?;
                        Some(Triple {
                            family: t.family,
                            add: expr::fold(arena, SymOp::Sub, t.add, e),
                            mul: t.mul,
                        })
                    }
                    (OpKind::Sub, other, Val::Ind(t)) => {
                        let e = other.expr(arena)?;
                        let neg = expr::konst(arena, -1);
                        Some(Triple {
                            family: t.family,
                            add: expr::fold(arena, SymOp::Sub, e, t.add),
                            mul: expr::fold(arena, SymOp::Mul, neg, t.mul),
                        })
                    }
                    _ => None,
                }
            }
            OpKind::Mul => {
                let [a, b] = inst.operands.as_slice() else {
                    return None;
                };
                let (va, vb) = (self.value_of(a, resolve)?, self.value_of(b, resolve)?);
                match (va, vb) {
                    (Val::Ind(_), Val::Ind(_)) => None,
                    (Val::Ind(t), other) | (other, Val::Ind(t)) => {
                        let e = other.expr(arena)?;
                        Some(Triple {
                            family: t.family,
                            add: expr::fold(arena, SymOp::Mul, t.add, e),
                            mul: expr::fold(arena, SymOp::Mul, t.mul, e),
                        })
                    }
                    _ => None,
                }
            }
            OpKind::Shl => {
                let [a, b] = inst.operands.as_slice() else {
                    return None;
                };
                let Val::Ind(t) = self.value_of(a, resolve)? else {
                    return None;
                };
                let Operand::Imm(k) = b else {
                    return None;
                };
                if !(0..63).contains(k) {
                    return None;
                }
                let factor = expr::konst(arena, 1i64 << *k);
                Some(Triple {
                    family: t.family,
                    add: expr::fold(arena, SymOp::Mul, t.add, factor),
                    mul: expr::fold(arena, SymOp::Mul, t.mul, factor),
                })
            }
            OpKind::Lea => {
                let [Operand::Mem(mem)] = inst.operands.as_slice() else {
                    return None;
                };
                self.lea_triple(arena, mem, resolve)
            }
            _ => None,
        }
    }
}
