//! Diagnostics shared by the validator, the interpreter and reporters.
//!
//! Two kinds of error exist and are never merged:
//!
//! - [`SemanticError`]: found by the validator before anything runs.
//! - [`RuntimeError`]: a [`RuntimeFailure`] raised during execution and
//!   attributed to the instruction that caused it.

pub mod code;
pub mod runtime;
pub mod semantic;

pub use code::{RuntimeErrorCode, SemanticErrorCode};
pub use runtime::{Attribute, Fault, Location, RuntimeError, RuntimeFailure};
pub use semantic::SemanticError;
