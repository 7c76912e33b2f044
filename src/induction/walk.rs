//! Loop hierarchy walker.
//!
//! Drives the classifier over the loop forest innermost-first: a loop is
//! visited only after all of its nesting-tree children, so every register
//! from a strictly-inner loop is already resolved when the enclosing loop
//! is processed. The per-block visited marks in the induction state
//! guarantee each block is classified exactly once per function: a block
//! that belongs only to an outer loop is first reached when that loop is,
//! a block of an inner loop is skipped when the outer loop iterates over
//! its member list.

use crate::arch::Arch;
use crate::core::AnalysisSession;
use crate::induction::classify::Classifier;
use crate::induction::state::InductionState;
use crate::ir::{Function, LoopForest, LoopId};

/// Classify all loops of a function, returning the induction state.
pub fn run<'a>(
    sess: &AnalysisSession<'a>,
    func: &Function,
    loops: &LoopForest,
    arch: &dyn Arch,
) -> InductionState<'a> {
    let mut classifier = Classifier::new(sess, func, loops, arch);
    for &root in loops.roots() {
        visit(&mut classifier, loops, root);
    }
    classifier.into_state()
}

fn visit(classifier: &mut Classifier<'_, '_>, loops: &LoopForest, lp: LoopId) {
    // Post-order: children strictly before the loop itself.
    for &child in loops.children(lp) {
        visit(classifier, loops, child);
    }
    log::trace!("walking loop {:?} at depth {}", lp, loops.depth(lp));
    for &block in &loops.get(lp).blocks {
        if classifier.state.is_visited(block) {
            continue;
        }
        classifier.classify_block(block, lp);
        classifier.state.mark_visited(block);
    }
}
