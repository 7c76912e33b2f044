//! Invariant and induction-variable classification.
//!
//! The walker visits the loop forest bottom-up and hands each not-yet
//! visited member block to the classifier, which produces one
//! `(family, add, mul)` triple per induction register and one invariant
//! table per loop, all held in [`InductionState`].

pub mod classify;
pub mod state;
pub mod walk;

pub use state::{BlockMark, InductionState};
pub use walk::run;
