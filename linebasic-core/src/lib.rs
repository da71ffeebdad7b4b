//! Core of the line-numbered BASIC toolchain.
//!
//! The pipeline is roughly:
//!
//!   source .bas
//!     -> lexer       (tokens, one line at a time)
//!     -> parser      (numbered instructions + line texts)
//!     -> validate    (semantic checks, block pairing)
//!     -> interpreter (execution, runtime error attribution)
//!
//! Higher-level tools (the CLI, editors, etc.) should depend on this crate
//! rather than reimplementing the pipeline.

// ---------------------------------------------------------------------
// Error handling and diagnostics
// ---------------------------------------------------------------------

pub mod diagnostic;
pub mod error;

// ---------------------------------------------------------------------
// Front-end: lexing and parsing
// ---------------------------------------------------------------------

pub mod ast;
pub mod lexer;
pub mod parser;
pub mod program;

// ---------------------------------------------------------------------
// Semantic checks
// ---------------------------------------------------------------------

pub mod validate;

// ---------------------------------------------------------------------
// Values, builtins and execution
// ---------------------------------------------------------------------

pub mod builtins;
pub mod interpreter;
pub mod value;

// ---------------------------------------------------------------------
// Program discovery on disk
// ---------------------------------------------------------------------

pub mod sources;

// ---------------------------------------------------------------------
// Public API re-exports
// ---------------------------------------------------------------------

use std::io::Write;

pub use diagnostic::{
    RuntimeError, RuntimeErrorCode, RuntimeFailure, SemanticError, SemanticErrorCode,
};
pub use error::CoreError;
pub use interpreter::Interpreter;
pub use parser::parse_program;
pub use program::{InputRef, Instruction, Program};
pub use sources::{SourceFile, load_programs};
pub use validate::validate;

/// Parses and validates `source` without running it.
pub fn check_source(source: &str) -> Result<Program, CoreError> {
    let program = parse_program(source)?;
    validate(&program)?;
    Ok(program)
}

/// Parses, validates and runs `source`, writing `PRINT` output to `out`.
///
/// Nothing is executed when validation fails.
pub fn run_source(source: &str, out: &mut dyn Write) -> Result<(), CoreError> {
    let program = parse_program(source)?;
    let blocks = validate::analyze(&program)?;
    Interpreter::new(&program, blocks).run(out)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn check_source_reports_the_first_semantic_error() {
        let err = check_source("10 FOR I = 1 TO 3\n20 PRINT I\n").unwrap_err();
        let CoreError::Semantic(err) = err else {
            panic!("expected semantic error, got {err:?}");
        };
        assert_eq!(err.code(), SemanticErrorCode::ForWithoutNext);
        assert_eq!(err.input_ref(), Some(InputRef::new(10)));
    }

    #[test]
    fn check_source_accepts_a_valid_program() {
        let program = check_source("10 PRINT \"HELLO\"\n20 END\n").expect("valid program");
        assert_eq!(program.len(), 2);
    }

    #[test]
    fn parse_errors_name_the_source_line() {
        let err = check_source("10 PRINT 1\nPRINT 2\n").unwrap_err();
        assert!(matches!(err, CoreError::ParseError { line: 2, .. }), "{err:?}");
    }

    #[test]
    fn deep_nesting_is_a_parse_error_not_a_crash() {
        let source = format!("10 PRINT {}1{}\n", "(".repeat(3000), ")".repeat(3000));
        let mut out = Vec::new();
        let err = run_source(&source, &mut out).unwrap_err();
        assert!(matches!(err, CoreError::ParseError { line: 1, .. }), "{err:?}");
        assert!(out.is_empty());
    }

    #[test]
    fn run_source_writes_program_output() {
        let mut out = Vec::new();
        run_source("10 FOR I = 1 TO 3\n20 PRINT I;\n30 NEXT I\n", &mut out).expect("runs");
        assert_eq!(String::from_utf8(out).expect("utf8"), "123");
    }
}
