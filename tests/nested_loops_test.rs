//! Nested-loop classification: bottom-up walk, per-loop invariant
//! tables, and single classification of shared blocks.
//!
//! ```text
//! b0:  rdi_0 (arr), rbx_0 = mov 0            ; j = 0
//! b1:  rbx_2 = phi rbx_0, rbx_1              ; outer header
//!      rsi_0 = add rdi_0, rbx_2              ; row = arr + j
//!      rax_0 = mov 0                         ; i = 0
//! b2:  rax_2 = phi rax_0, rax_1              ; inner header
//!      rcx_0 = add rsi_0, rax_2              ; p = row + i
//!      store [rcx_0], 0
//!      rax_1 = add rax_2, 1
//!      cmp 8, rax_1
//!      -> b2, b3
//! b3:  rbx_1 = add rbx_2, 1
//!      cmp 4, rbx_1
//!      -> b1, b4
//! ```

use bumpalo::Bump;
use smallvec::smallvec;

use indvars::arch::x64;
use indvars::ir::{FunctionBuilder, Loop, LoopForest, LoopId, OpKind, Operand, RegId};
use indvars::{analyze_function, AnalysisSession};

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

struct Nest {
    func: indvars::ir::Function,
    loops: LoopForest,
    j: RegId,
    i: RegId,
    row: RegId,
    p: RegId,
}

const OUTER: LoopId = LoopId(0);
const INNER: LoopId = LoopId(1);

fn nested() -> Nest {
    let mut b = FunctionBuilder::new("nest", x64::ARCH_ID);
    let b0 = b.block();
    let b1 = b.block();
    let b2 = b.block();
    let b3 = b.block();
    let b4 = b.block();
    b.edge(b0, b1);
    b.edge(b1, b2);
    b.edge(b2, b2);
    b.edge(b2, b3);
    b.edge(b3, b1);
    b.edge(b3, b4);

    let arr = b.reg(x64::RDI);
    let j0 = b.inst(b0, OpKind::Mov, &[Operand::Imm(0)], x64::RBX);
    let j_next = b.reg(x64::RBX);
    let j = b.phi(b1, x64::RBX, &[j0, j_next]);
    let row = b.inst(b1, OpKind::Add, &[Operand::Reg(arr), Operand::Reg(j)], x64::RSI);
    let i0 = b.inst(b1, OpKind::Mov, &[Operand::Imm(0)], x64::RAX);

    let i_next = b.reg(x64::RAX);
    let i = b.phi(b2, x64::RAX, &[i0, i_next]);
    let p = b.inst(b2, OpKind::Add, &[Operand::Reg(row), Operand::Reg(i)], x64::RCX);
    b.inst_void(b2, OpKind::Store, &[b.mem(Some(p), None, 1, 0), Operand::Imm(0)]);
    b.inst_into(b2, OpKind::Add, &[Operand::Reg(i), Operand::Imm(1)], i_next);
    b.inst_void(b2, OpKind::Cmp, &[Operand::Imm(8), Operand::Reg(i_next)]);

    b.inst_into(b3, OpKind::Add, &[Operand::Reg(j), Operand::Imm(1)], j_next);
    b.inst_void(b3, OpKind::Cmp, &[Operand::Imm(4), Operand::Reg(j_next)]);

    let func = b.build();
    let loops = LoopForest::new(vec![
        Loop::new(OUTER, b1, vec![b1, b2, b3], smallvec![b3], None),
        Loop::new(INNER, b2, vec![b2], smallvec![b2], Some(OUTER)),
    ]);
    Nest { func, loops, j, i, row, p }
}

#[test]
fn inner_loop_sees_outer_definitions_as_invariant() {
    init_logging();
    let nest = nested();
    let arena = Bump::new();
    let session = AnalysisSession::new(&arena);
    let analysis = analyze_function(&session, &nest.func, &nest.loops).unwrap();

    // `row` is defined in the outer loop body and unmodified by the
    // inner loop: the inner invariant table must carry it.
    let table = analysis
        .induction
        .invariant_table(INNER)
        .expect("inner invariant table");
    assert!(table.contains_key(&nest.row));
}

#[test]
fn each_loop_classifies_its_own_registers() {
    init_logging();
    let nest = nested();
    let arena = Bump::new();
    let session = AnalysisSession::new(&arena);
    let analysis = analyze_function(&session, &nest.func, &nest.loops).unwrap();

    assert_eq!(analysis.induction.classified_in(nest.i), Some(INNER));
    assert_eq!(analysis.induction.classified_in(nest.p), Some(INNER));
    assert_eq!(analysis.induction.classified_in(nest.j), Some(OUTER));
    assert_eq!(analysis.induction.classified_in(nest.row), Some(OUTER));

    // `p = row + i` is linear in the inner family.
    let t = analysis.induction.triple(nest.p).unwrap();
    assert_eq!(t.family, nest.i);
    assert_eq!(t.mul.as_const(), Some(1));

    // `row = arr + j` is linear in the outer family.
    let t = analysis.induction.triple(nest.row).unwrap();
    assert_eq!(t.family, nest.j);
}

#[test]
fn blocks_are_classified_exactly_once() {
    init_logging();
    let nest = nested();
    let arena = Bump::new();
    let session = AnalysisSession::new(&arena);
    let _analysis = analyze_function(&session, &nest.func, &nest.loops).unwrap();

    // Three loop-member blocks; the inner block is not revisited when
    // the outer loop iterates its member list.
    assert_eq!(session.stats().blocks_classified, 3);
}

#[test]
fn inner_polytope_is_complete_and_bounded() {
    init_logging();
    let nest = nested();
    let arena = Bump::new();
    let session = AnalysisSession::new(&arena);
    let analysis = analyze_function(&session, &nest.func, &nest.loops).unwrap();

    // Only the innermost loop collects polytopes.
    assert_eq!(analysis.polytopes.loop_ids(), vec![INNER]);
    let p = &analysis.polytopes.for_loop(INNER)[0];
    assert_eq!(p.level, 2);
    assert!(p.computed);
    assert_eq!(p.stop_bound.unwrap().imm, 8);
    let start = p.start_bound.expect("inner start bound");
    assert_eq!(start.value.as_const(), Some(0));
}

#[test]
fn invariance_queries_are_stable() {
    init_logging();
    let nest = nested();
    let arena = Bump::new();
    let session = AnalysisSession::new(&arena);
    let mut analysis = analyze_function(&session, &nest.func, &nest.loops).unwrap();

    let first = analysis
        .induction
        .is_invariant(&nest.func, &nest.loops, nest.row, INNER);
    for _ in 0..3 {
        assert_eq!(
            analysis
                .induction
                .is_invariant(&nest.func, &nest.loops, nest.row, INNER),
            first
        );
    }
    assert!(first);
}
