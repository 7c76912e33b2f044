// This module defines error types for the analysis pass using the thiserror
// crate. Only fatal conditions become errors: a function arriving without SSA
// form (nothing to analyze) and a target architecture with no registered
// triple-building interpreter. Everything else the pass can encounter
// (unclassifiable instructions, multi-exit loops, unresolvable registers) is
// the normal outcome for irregular binary code and is reported through
// optional fields and booleans on the results, never through this enum.

//! Error types for the induction/polytope pass.

use thiserror::Error;

use crate::ir::ArchId;

/// Fatal analysis failures.
#[derive(Error, Debug)]
pub enum AnalysisError {
    #[error("function `{name}` has no SSA form")]
    MissingSsa { name: String },

    #[error("architecture not supported: no induction interpreter registered for {arch:?}")]
    UnsupportedArch { arch: ArchId },
}

/// Result type alias for analysis operations.
pub type AnalysisResult<T> = Result<T, AnalysisError>;
