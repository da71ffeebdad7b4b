use thiserror::Error;

use crate::diagnostic::{RuntimeError, SemanticError};

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("failed to read source: {0}")]
    SourceIo(#[from] std::io::Error),
    #[error("parse error at line {line}: {message}")]
    ParseError { line: usize, message: String },
    #[error(transparent)]
    Semantic(#[from] SemanticError),
    #[error(transparent)]
    Runtime(#[from] RuntimeError),
}

impl CoreError {
    pub(crate) fn parse(line: usize, message: impl Into<String>) -> Self {
        CoreError::ParseError {
            line,
            message: message.into(),
        }
    }
}
