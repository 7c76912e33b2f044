//! Convenience builder for SSA functions.
//!
//! The toolkit's SSA construction produces [`Function`] values directly;
//! this builder exists so unit and integration tests can assemble small
//! functions without hand-writing index tables. Register versions per
//! physical register are numbered automatically.

use hashbrown::HashMap;
use smallvec::SmallVec;

use super::{
    ArchId, Block, BlockId, Function, InstId, InstKind, Instruction, MachInst, MemRef, OpKind,
    Operand, PhysReg, RegId, RegisterVersion,
};

/// Incrementally builds a [`Function`] in SSA form.
pub struct FunctionBuilder {
    name: String,
    arch: ArchId,
    regs: Vec<RegisterVersion>,
    insts: Vec<Instruction>,
    blocks: Vec<Block>,
    next_version: HashMap<PhysReg, u32>,
    next_address: u64,
}

impl FunctionBuilder {
    pub fn new(name: &str, arch: ArchId) -> Self {
        Self {
            name: name.to_string(),
            arch,
            regs: Vec::new(),
            insts: Vec::new(),
            blocks: Vec::new(),
            next_version: HashMap::new(),
            next_address: 0x1000,
        }
    }

    /// Append an empty block.
    pub fn block(&mut self) -> BlockId {
        self.blocks.push(Block::default());
        BlockId(self.blocks.len() as u32 - 1)
    }

    /// Add a control-flow edge.
    pub fn edge(&mut self, from: BlockId, to: BlockId) {
        self.blocks[from.0 as usize].succs.push(to);
    }

    /// Fresh register version with no defining instruction (entry value
    /// or forward placeholder for a back edge).
    pub fn reg(&mut self, phys: PhysReg) -> RegId {
        let version = self.bump_version(phys);
        self.regs.push(RegisterVersion { phys, version, def: None });
        RegId(self.regs.len() as u32 - 1)
    }

    fn bump_version(&mut self, phys: PhysReg) -> u32 {
        let v = self.next_version.entry(phys).or_insert(0);
        let version = *v;
        *v += 1;
        version
    }

    /// Append a machine instruction producing one fresh output version.
    pub fn inst(
        &mut self,
        block: BlockId,
        op: OpKind,
        operands: &[Operand],
        out_phys: PhysReg,
    ) -> RegId {
        let out = self.reg(out_phys);
        self.inst_into(block, op, operands, out);
        out
    }

    /// Append a machine instruction defining an already-reserved output
    /// version (used to close phi back edges).
    pub fn inst_into(&mut self, block: BlockId, op: OpKind, operands: &[Operand], out: RegId) {
        let id = self.push_mach(block, op, operands, SmallVec::from_slice(&[out]));
        self.regs[out.0 as usize].def = Some(id);
    }

    /// Append a machine instruction with no outputs (store, compare, branch).
    pub fn inst_void(&mut self, block: BlockId, op: OpKind, operands: &[Operand]) -> InstId {
        self.push_mach(block, op, operands, SmallVec::new())
    }

    fn push_mach(
        &mut self,
        block: BlockId,
        op: OpKind,
        operands: &[Operand],
        outputs: SmallVec<[RegId; 2]>,
    ) -> InstId {
        let address = self.next_address;
        self.next_address += 4;
        let inst = Instruction {
            kind: InstKind::Mach(MachInst {
                address,
                op,
                operands: SmallVec::from_slice(operands),
                implicit_in: SmallVec::new(),
            }),
            outputs,
            block,
        };
        self.insts.push(inst);
        let id = InstId(self.insts.len() as u32 - 1);
        self.blocks[block.0 as usize].insts.push(id);
        id
    }

    /// Id of the most recently appended instruction.
    pub fn last_inst(&self) -> InstId {
        InstId(self.insts.len() as u32 - 1)
    }

    /// Attach implicit source registers to an instruction.
    pub fn implicit_in(&mut self, inst: InstId, regs: &[RegId]) {
        if let InstKind::Mach(m) = &mut self.insts[inst.0 as usize].kind {
            m.implicit_in.extend_from_slice(regs);
        }
    }

    /// Append a phi merge producing a fresh output version.
    pub fn phi(&mut self, block: BlockId, out_phys: PhysReg, incoming: &[RegId]) -> RegId {
        let out = self.reg(out_phys);
        let inst = Instruction {
            kind: InstKind::Phi { incoming: SmallVec::from_slice(incoming) },
            outputs: SmallVec::from_slice(&[out]),
            block,
        };
        self.insts.push(inst);
        let id = InstId(self.insts.len() as u32 - 1);
        self.blocks[block.0 as usize].insts.push(id);
        self.regs[out.0 as usize].def = Some(id);
        out
    }

    /// Shorthand for a `[base + index*scale + disp]` operand.
    pub fn mem(
        &self,
        base: Option<RegId>,
        index: Option<RegId>,
        scale: u8,
        disp: i64,
    ) -> Operand {
        Operand::Mem(MemRef { base, index, scale, disp })
    }

    pub fn build(self) -> Function {
        Function {
            name: self.name,
            arch: self.arch,
            entry: BlockId(0),
            regs: self.regs,
            insts: self.insts,
            blocks: self.blocks,
        }
    }
}
