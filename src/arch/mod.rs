// This module defines the architecture description consumed by the pass:
// register naming, instruction-family classification, and the strategy
// interface for the architecture-specific triple-building interpreter used by
// the induction classifier. Implementations are registered in a static
// dispatch table keyed by ArchId and looked up once at analysis start; a miss
// is the single fatal "architecture not supported" error. The classifier does
// all qualification itself and hands the interpreter a resolver that maps
// register versions to their already-known symbolic values, so each
// implementation only has to express the composition law for its opcodes.

//! Architecture descriptions and the triple-building interpreter seam.

use bumpalo::Bump;

use crate::expr::{SymExpr, Triple};
use crate::ir::{ArchId, MachInst, PhysReg, RegId};

pub mod x64;

/// Instruction families the pass cares about.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstClass {
    Compare,
    AddressCompute,
    Call,
    Nop,
    Other,
}

/// Resolved value of a source register during classification.
#[derive(Debug, Clone, Copy)]
pub enum SrcVal<'a> {
    /// Loop-invariant register, as an expression node.
    Invariant(&'a SymExpr<'a>),
    /// Already-classified induction register.
    Induction(Triple<'a>),
}

/// One instruction-set architecture, as seen by the analysis.
pub trait Arch: Sync {
    fn id(&self) -> ArchId;

    fn name(&self) -> &'static str;

    fn reg_name(&self, reg: PhysReg) -> &'static str;

    fn inst_class(&self, inst: &MachInst) -> InstClass;

    /// Compose the induction triple of a qualifying single-output
    /// instruction, or decline.
    ///
    /// `resolve` maps any source register version to its known value;
    /// the classifier guarantees it succeeds for every explicit source
    /// and that at most one resolves to [`SrcVal::Induction`].
    fn build_triple<'a>(
        &self,
        arena: &'a Bump,
        inst: &MachInst,
        resolve: &mut dyn FnMut(RegId) -> Option<SrcVal<'a>>,
    ) -> Option<Triple<'a>>;
}

/// Registered architectures, keyed by [`ArchId`].
static ARCHS: &[&(dyn Arch)] = &[&x64::X64];

/// Select the architecture description for an identifier.
pub fn lookup(id: ArchId) -> Option<&'static dyn Arch> {
    ARCHS.iter().find(|a| a.id() == id).copied()
}
