//! Shared infrastructure for the analysis pass: the arena-backed session
//! and the fatal error types. Everything else in the crate is built on
//! top of these two pieces.

pub mod error;
pub mod session;

pub use error::{AnalysisError, AnalysisResult};
pub use session::{AnalysisSession, SessionStats};
