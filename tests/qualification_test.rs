//! Classifier qualification rules and polytope completeness.
//!
//! Covers mixed induction/invariant address expressions, unresolvable
//! in-loop operands, the at-most-one-induction-operand rule (the counter
//! accumulates across the whole operand list), and the implicit-operand
//! requirement.

use bumpalo::Bump;
use smallvec::smallvec;

use indvars::arch::x64;
use indvars::ir::{FunctionBuilder, Loop, LoopForest, LoopId, OpKind, Operand, RegId};
use indvars::{analyze_function, AnalysisSession, FunctionAnalysis};

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// One-block counted loop with a caller-supplied body builder.
///
/// The body closure receives the builder, the loop block and the current
/// counter value, and returns the registers the test wants back.
fn loop_with_body<R>(
    body: impl FnOnce(&mut FunctionBuilder, indvars::ir::BlockId, RegId) -> R,
) -> (indvars::ir::Function, LoopForest, RegId, R) {
    let mut b = FunctionBuilder::new("f", x64::ARCH_ID);
    let b0 = b.block();
    let b1 = b.block();
    let b2 = b.block();
    b.edge(b0, b1);
    b.edge(b1, b1);
    b.edge(b1, b2);

    let i0 = b.inst(b0, OpKind::Mov, &[Operand::Imm(0)], x64::RAX);
    let i_next = b.reg(x64::RAX);
    let i = b.phi(b1, x64::RAX, &[i0, i_next]);
    let extra = body(&mut b, b1, i);
    b.inst_into(b1, OpKind::Add, &[Operand::Reg(i), Operand::Imm(1)], i_next);
    b.inst_void(b1, OpKind::Cmp, &[Operand::Imm(100), Operand::Reg(i_next)]);

    let func = b.build();
    let loops = LoopForest::new(vec![Loop::new(
        LoopId(0),
        b1,
        vec![b1],
        smallvec![b1],
        None,
    )]);
    (func, loops, i, extra)
}

fn analyze<'a>(
    session: &AnalysisSession<'a>,
    func: &indvars::ir::Function,
    loops: &LoopForest,
) -> FunctionAnalysis<'a> {
    analyze_function(session, func, loops).unwrap()
}

#[test]
fn invariant_plus_induction_index_is_computed() {
    init_logging();
    // a[i*4 + j] with j invariant: both registers referenced, complete.
    let (func, loops, i, j) = loop_with_body(|b, b1, i| {
        let j = b.reg(x64::RSI);
        b.inst_void(
            b1,
            OpKind::Store,
            &[b.mem(Some(j), Some(i), 4, 0), Operand::Imm(0)],
        );
        j
    });
    let arena = Bump::new();
    let session = AnalysisSession::new(&arena);
    let analysis = analyze(&session, &func, &loops);

    let p = &analysis.polytopes.for_loop(LoopId(0))[0];
    assert!(p.computed);
    assert!(p.referenced.contains(&i));
    assert!(p.referenced.contains(&j));
}

#[test]
fn unresolved_inloop_operand_clears_computed() {
    init_logging();
    // a[f(i, k)] where k is loaded inside the loop: unclassifiable,
    // defined in-loop, so the access is incomplete.
    let (func, loops, _i, k) = loop_with_body(|b, b1, i| {
        let scratch = b.reg(x64::RBP);
        let k = b.inst(b1, OpKind::Load, &[b.mem(Some(scratch), None, 1, 0)], x64::RDX);
        b.inst_void(
            b1,
            OpKind::Store,
            &[b.mem(Some(k), Some(i), 4, 0), Operand::Imm(0)],
        );
        k
    });
    let arena = Bump::new();
    let session = AnalysisSession::new(&arena);
    let analysis = analyze(&session, &func, &loops);

    assert!(analysis.induction.triple(k).is_none());
    let store = analysis
        .polytopes
        .for_loop(LoopId(0))
        .iter()
        .find(|p| p.referenced.contains(&k))
        .expect("store polytope");
    assert!(!store.computed);
}

#[test]
fn completeness_flips_with_single_register() {
    init_logging();
    // Same address shape; only the base register's origin differs.
    let store_computed = |inloop_base: bool| {
        let (func, loops, i, _) = loop_with_body(|b, b1, i| {
            let base = if inloop_base {
                let scratch = b.reg(x64::RBP);
                b.inst(b1, OpKind::Load, &[b.mem(Some(scratch), None, 1, 0)], x64::RBX)
            } else {
                b.reg(x64::RBX)
            };
            b.inst_void(
                b1,
                OpKind::Store,
                &[b.mem(Some(base), Some(i), 8, 0), Operand::Imm(0)],
            );
        });
        let arena = Bump::new();
        let session = AnalysisSession::new(&arena);
        let analysis = analyze(&session, &func, &loops);
        analysis
            .polytopes
            .for_loop(LoopId(0))
            .iter()
            .find(|p| p.referenced.contains(&i))
            .expect("store polytope")
            .computed
    };
    assert!(store_computed(false));
    assert!(!store_computed(true));
}

#[test]
fn at_most_one_induction_operand_counts_whole_list() {
    init_logging();
    // d = i + i has two induction operands; the counter never resets
    // between operands, so the result stays unclassified.
    let (func, loops, _i, d) = loop_with_body(|b, b1, i| {
        b.inst(b1, OpKind::Add, &[Operand::Reg(i), Operand::Reg(i)], x64::RCX)
    });
    let arena = Bump::new();
    let session = AnalysisSession::new(&arena);
    let analysis = analyze(&session, &func, &loops);
    assert!(analysis.induction.triple(d).is_none());
}

#[test]
fn derived_induction_through_scale_and_offset() {
    init_logging();
    // d = i*4 + 8 composes to (i, 8, 4).
    let (func, loops, i, d) = loop_with_body(|b, b1, i| {
        let scaled = b.inst(b1, OpKind::Mul, &[Operand::Reg(i), Operand::Imm(4)], x64::RCX);
        b.inst(
            b1,
            OpKind::Add,
            &[Operand::Reg(scaled), Operand::Imm(8)],
            x64::RDX,
        )
    });
    let arena = Bump::new();
    let session = AnalysisSession::new(&arena);
    let analysis = analyze(&session, &func, &loops);

    let t = analysis.induction.triple(d).expect("derived classified");
    assert_eq!(t.family, i);
    assert_eq!(t.add.as_const(), Some(8));
    assert_eq!(t.mul.as_const(), Some(4));
}

#[test]
fn inloop_implicit_operand_blocks_classification() {
    init_logging();
    let (func, loops, _i, (tainted, clean)) = loop_with_body(|b, b1, i| {
        // Flags produced inside the loop by an opaque instruction taint
        // the first add through its implicit source; the second add has
        // no implicit sources and classifies.
        let flags = b.inst(b1, OpKind::Other, &[Operand::Imm(0)], x64::RFLAGS);
        let tainted = b.inst(b1, OpKind::Add, &[Operand::Reg(i), Operand::Imm(2)], x64::RCX);
        b.implicit_in(b.last_inst(), &[flags]);
        let clean = b.inst(b1, OpKind::Add, &[Operand::Reg(i), Operand::Imm(3)], x64::RDX);
        (tainted, clean)
    });
    let arena = Bump::new();
    let session = AnalysisSession::new(&arena);
    let analysis = analyze(&session, &func, &loops);
    assert!(analysis.induction.triple(tainted).is_none());
    assert!(analysis.induction.triple(clean).is_some());
}

#[test]
fn invariant_implicit_operand_is_allowed() {
    init_logging();
    let (func, loops, i, guarded) = loop_with_body(|b, b1, i| {
        // Flags defined before the loop are invariant and do not block
        // classification, regardless of count.
        let flags = b.reg(x64::RFLAGS);
        let guarded = b.inst(b1, OpKind::Add, &[Operand::Reg(i), Operand::Imm(4)], x64::RCX);
        b.implicit_in(b.last_inst(), &[flags]);
        guarded
    });
    let arena = Bump::new();
    let session = AnalysisSession::new(&arena);
    let analysis = analyze(&session, &func, &loops);
    let t = analysis.induction.triple(guarded).expect("classified");
    assert_eq!(t.family, i);
    assert_eq!(t.add.as_const(), Some(4));
}
