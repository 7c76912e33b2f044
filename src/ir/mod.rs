// This module defines the SSA input model the analysis pass consumes. The
// disassembler and SSA construction live elsewhere in the toolkit; what arrives
// here is immutable: a function's register-version table, its instruction list
// (phi merges plus decoded machine instructions normalized to OpKind), and its
// basic blocks with successor edges. Each register version carries its physical
// register, a version index and an optional back-reference to the defining
// instruction; entry values and phi "previous value" placeholders have none.
// Memory operands are decomposed into base/index/scale/displacement so the
// polytope builder can reassemble symbolic address formulas without re-decoding.

//! Immutable SSA form consumed by the induction and polytope passes.

use smallvec::SmallVec;

pub mod build;
pub mod loops;

pub use build::FunctionBuilder;
pub use loops::{Loop, LoopForest, LoopId};

/// Physical register number, named by the architecture description.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PhysReg(pub u16);

/// A register *version*: index into the function's register table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RegId(pub u32);

/// Index into the function's instruction list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct InstId(pub u32);

/// Index into the function's block list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BlockId(pub u32);

/// Architecture identifier used to key the interpreter dispatch table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ArchId(pub u16);

/// One SSA register version.
///
/// `def` is absent for function-entry values and for the placeholder
/// versions a phi merge reads on its back edge before the defining
/// instruction has been seen.
#[derive(Debug, Clone, Copy)]
pub struct RegisterVersion {
    pub phys: PhysReg,
    pub version: u32,
    pub def: Option<InstId>,
}

/// Decomposed memory reference: `disp + base + index*scale`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemRef {
    pub base: Option<RegId>,
    pub index: Option<RegId>,
    pub scale: u8,
    pub disp: i64,
}

/// Explicit operand of a decoded instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operand {
    Imm(i64),
    Reg(RegId),
    Mem(MemRef),
}

impl Operand {
    pub fn mem(base: Option<RegId>, index: Option<RegId>, scale: u8, disp: i64) -> Self {
        Operand::Mem(MemRef { base, index, scale, disp })
    }
}

/// Normalized opcode set emitted by the decoder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpKind {
    Add,
    Sub,
    Mul,
    Shl,
    Mov,
    Lea,
    Cmp,
    Test,
    Load,
    Store,
    Call,
    Nop,
    Other,
}

/// A real decoded instruction wrapped by an SSA instruction.
#[derive(Debug, Clone)]
pub struct MachInst {
    pub address: u64,
    pub op: OpKind,
    pub operands: SmallVec<[Operand; 4]>,
    /// Implicit source registers (e.g. flags), enumerated by the decoder.
    pub implicit_in: SmallVec<[RegId; 2]>,
}

/// SSA instruction body: either a synthetic phi merge or a wrapped
/// machine instruction.
#[derive(Debug, Clone)]
pub enum InstKind {
    Phi { incoming: SmallVec<[RegId; 2]> },
    Mach(MachInst),
}

/// One instruction of the SSA form.
#[derive(Debug, Clone)]
pub struct Instruction {
    pub kind: InstKind,
    pub outputs: SmallVec<[RegId; 2]>,
    pub block: BlockId,
}

impl Instruction {
    /// The wrapped machine instruction, absent for phi merges.
    pub fn mach(&self) -> Option<&MachInst> {
        match &self.kind {
            InstKind::Mach(m) => Some(m),
            InstKind::Phi { .. } => None,
        }
    }

    pub fn is_phi(&self) -> bool {
        matches!(self.kind, InstKind::Phi { .. })
    }

    /// Every explicit source register, with memory operands decomposed
    /// into their base and index registers.
    pub fn explicit_src_regs(&self) -> SmallVec<[RegId; 4]> {
        let mut out = SmallVec::new();
        match &self.kind {
            InstKind::Phi { incoming } => out.extend(incoming.iter().copied()),
            InstKind::Mach(m) => {
                for op in &m.operands {
                    match op {
                        Operand::Imm(_) => {}
                        Operand::Reg(r) => out.push(*r),
                        Operand::Mem(mem) => {
                            if let Some(b) = mem.base {
                                out.push(b);
                            }
                            if let Some(i) = mem.index {
                                out.push(i);
                            }
                        }
                    }
                }
            }
        }
        out
    }

    /// Memory operands of the wrapped instruction, in operand order.
    pub fn mem_operands(&self) -> SmallVec<[MemRef; 2]> {
        let mut out = SmallVec::new();
        if let InstKind::Mach(m) = &self.kind {
            for op in &m.operands {
                if let Operand::Mem(mem) = op {
                    out.push(*mem);
                }
            }
        }
        out
    }
}

/// A basic block: ordered instructions plus successor edges.
#[derive(Debug, Clone, Default)]
pub struct Block {
    pub insts: Vec<InstId>,
    pub succs: SmallVec<[BlockId; 2]>,
}

/// A function in SSA form, ready for analysis.
#[derive(Debug, Clone)]
pub struct Function {
    pub name: String,
    pub arch: ArchId,
    pub entry: BlockId,
    pub regs: Vec<RegisterVersion>,
    pub insts: Vec<Instruction>,
    pub blocks: Vec<Block>,
}

impl Function {
    pub fn reg(&self, id: RegId) -> &RegisterVersion {
        &self.regs[id.0 as usize]
    }

    pub fn inst(&self, id: InstId) -> &Instruction {
        &self.insts[id.0 as usize]
    }

    pub fn block(&self, id: BlockId) -> &Block {
        &self.blocks[id.0 as usize]
    }

    /// Block containing the defining instruction of a register version,
    /// if it has one.
    pub fn def_block(&self, reg: RegId) -> Option<BlockId> {
        self.reg(reg).def.map(|i| self.inst(i).block)
    }

    /// Address of the defining instruction, 0 when there is none or the
    /// definition is a phi merge.
    pub fn def_address(&self, reg: RegId) -> u64 {
        self.reg(reg)
            .def
            .and_then(|i| self.inst(i).mach())
            .map(|m| m.address)
            .unwrap_or(0)
    }
}
