// This module provides arena-based session management for one analysis run
// using the bumpalo crate. AnalysisSession owns a reference to the arena that
// every symbolic expression node is allocated in, plus run statistics and a
// string interning table for rendered register names. All per-function state
// shares the session lifetime: triples and polytopes hold plain references into
// the arena, and dropping the arena after the run releases every node exactly
// once no matter how many structures shared it. Analyzing different functions
// concurrently only requires giving each its own arena and session.

//! Arena-backed analysis session.

use bumpalo::Bump;
use hashbrown::HashMap;
use std::cell::RefCell;

/// Counters gathered over one analysis run, for diagnostics.
#[derive(Debug, Default, Clone, Copy)]
pub struct SessionStats {
    pub blocks_classified: usize,
    pub triples_built: usize,
    pub invariant_queries: usize,
    pub polytopes_built: usize,
}

/// Per-function analysis session.
///
/// Wraps the arena and shares its lifetime with everything the pass
/// produces. Created once per analyzed function.
pub struct AnalysisSession<'arena> {
    arena: &'arena Bump,
    stats: RefCell<SessionStats>,
    interned: RefCell<HashMap<String, &'arena str>>,
}

impl<'arena> AnalysisSession<'arena> {
    pub fn new(arena: &'arena Bump) -> Self {
        Self {
            arena,
            stats: RefCell::new(SessionStats::default()),
            interned: RefCell::new(HashMap::new()),
        }
    }

    pub fn arena(&self) -> &'arena Bump {
        self.arena
    }

    /// Allocate a value in the session arena.
    pub fn alloc<T>(&self, value: T) -> &'arena mut T {
        self.arena.alloc(value)
    }

    /// Intern a rendered name in the arena.
    pub fn intern_str(&self, s: &str) -> &'arena str {
        let mut interned = self.interned.borrow_mut();
        if let Some(&cached) = interned.get(s) {
            return cached;
        }
        let stored = self.arena.alloc_str(s);
        interned.insert(s.to_string(), stored);
        stored
    }

    pub fn stats(&self) -> SessionStats {
        *self.stats.borrow()
    }

    pub fn note_block_classified(&self) {
        self.stats.borrow_mut().blocks_classified += 1;
    }

    pub fn note_triple(&self) {
        self.stats.borrow_mut().triples_built += 1;
    }

    pub fn note_invariant_query(&self) {
        self.stats.borrow_mut().invariant_queries += 1;
    }

    pub fn note_polytope(&self) {
        self.stats.borrow_mut().polytopes_built += 1;
    }
}
