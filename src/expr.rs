// This module implements the symbolic expression model shared by the induction
// classifier and the polytope builder. Expressions are tagged-variant nodes:
// integer constants, references to loop-invariant register versions, and binary
// operations over two children. Every node is allocated in the per-function
// analysis arena and referenced by shared &'arena pointers, so sub-trees can be
// reused across triples and polytopes freely; dropping the arena releases each
// node exactly once regardless of how many structures point at it. The fold
// constructor performs the constant folding the triple composition law relies
// on. Induction triples (family, add, mul) live here as well since they are
// just two expression roots plus a family register.

//! Symbolic expressions and induction triples.

use bumpalo::Bump;

use crate::ir::RegId;

/// Binary operators appearing in symbolic expressions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SymOp {
    Add,
    Sub,
    Mul,
    Shl,
}

/// A symbolic expression node, arena-allocated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SymExpr<'a> {
    Const(i64),
    /// Reference to a loop-invariant (or otherwise opaque) register version.
    Reg(RegId),
    Bin(SymOp, &'a SymExpr<'a>, &'a SymExpr<'a>),
}

/// Induction triple: value = `family * mul + add`.
///
/// A basic induction variable is its own family with `mul = Const(1)`.
#[derive(Debug, Clone, Copy)]
pub struct Triple<'a> {
    pub family: RegId,
    pub add: &'a SymExpr<'a>,
    pub mul: &'a SymExpr<'a>,
}

/// Allocate a constant node.
pub fn konst(arena: &Bump, v: i64) -> &SymExpr<'_> {
    arena.alloc(SymExpr::Const(v))
}

/// Allocate an invariant-register reference node.
pub fn reg(arena: &Bump, r: RegId) -> &SymExpr<'_> {
    arena.alloc(SymExpr::Reg(r))
}

/// Build a binary node, folding constant sub-expressions.
///
/// Identities are simplified (`x+0`, `x-0`, `x*1`, `x*0`, `x<<0`) so the
/// add/mul roots of composed triples stay small.
pub fn fold<'a>(arena: &'a Bump, op: SymOp, l: &'a SymExpr<'a>, r: &'a SymExpr<'a>) -> &'a SymExpr<'a> {
    use SymExpr::*;
    match (op, l, r) {
        (SymOp::Add, Const(a), Const(b)) => konst(arena, a.wrapping_add(*b)),
        (SymOp::Sub, Const(a), Const(b)) => konst(arena, a.wrapping_sub(*b)),
        (SymOp::Mul, Const(a), Const(b)) => konst(arena, a.wrapping_mul(*b)),
        (SymOp::Shl, Const(a), Const(b)) if (0..64).contains(b) => {
            konst(arena, a.wrapping_shl(*b as u32))
        }
        (SymOp::Add, Const(0), _) => r,
        (SymOp::Add, _, Const(0)) => l,
        (SymOp::Sub, _, Const(0)) => l,
        (SymOp::Mul, Const(1), _) => r,
        (SymOp::Mul, _, Const(1)) => l,
        (SymOp::Mul, Const(0), _) | (SymOp::Mul, _, Const(0)) => konst(arena, 0),
        (SymOp::Shl, _, Const(0)) => l,
        _ => arena.alloc(Bin(op, l, r)),
    }
}

impl<'a> SymExpr<'a> {
    /// Constant value of the node, if it is one.
    pub fn as_const(&self) -> Option<i64> {
        match self {
            SymExpr::Const(v) => Some(*v),
            _ => None,
        }
    }

    /// Collect transitively referenced register versions, first-seen order,
    /// no duplicates.
    pub fn collect_regs(&self, out: &mut Vec<RegId>) {
        match self {
            SymExpr::Const(_) => {}
            SymExpr::Reg(r) => {
                if !out.contains(r) {
                    out.push(*r);
                }
            }
            SymExpr::Bin(_, l, r) => {
                l.collect_regs(out);
                r.collect_regs(out);
            }
        }
    }

    /// Render to address-formula text, e.g. `rax_3*4+rbx_1+16`.
    pub fn render(&self, namer: &dyn Fn(RegId) -> String) -> String {
        let mut s = String::new();
        self.render_prec(namer, 1, &mut s);
        s
    }

    fn render_prec(&self, namer: &dyn Fn(RegId) -> String, min_prec: u8, out: &mut String) {
        match self {
            SymExpr::Const(v) => out.push_str(&v.to_string()),
            SymExpr::Reg(r) => out.push_str(&namer(*r)),
            SymExpr::Bin(op, l, r) => {
                let (prec, sym) = match op {
                    SymOp::Add => (1, "+"),
                    SymOp::Sub => (1, "-"),
                    SymOp::Mul => (2, "*"),
                    SymOp::Shl => (0, "<<"),
                };
                let paren = prec < min_prec;
                if paren {
                    out.push('(');
                }
                // a + (-c) reads better as a - c
                if *op == SymOp::Add {
                    if let SymExpr::Const(c) = r {
                        if *c < 0 {
                            l.render_prec(namer, prec, out);
                            out.push('-');
                            out.push_str(&c.unsigned_abs().to_string());
                            if paren {
                                out.push(')');
                            }
                            return;
                        }
                    }
                }
                l.render_prec(namer, prec, out);
                out.push_str(sym);
                r.render_prec(namer, prec + 1, out);
                if paren {
                    out.push(')');
                }
            }
        }
    }

    /// Render the tree as visualization code, one constructor call per node.
    pub fn to_code(&self, namer: &dyn Fn(RegId) -> String) -> String {
        match self {
            SymExpr::Const(v) => format!("const({})", v),
            SymExpr::Reg(r) => format!("reg({})", namer(*r)),
            SymExpr::Bin(op, l, r) => {
                let name = match op {
                    SymOp::Add => "add",
                    SymOp::Sub => "sub",
                    SymOp::Mul => "mul",
                    SymOp::Shl => "shl",
                };
                format!("{}({}, {})", name, l.to_code(namer), r.to_code(namer))
            }
        }
    }
}
