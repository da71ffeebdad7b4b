use thiserror::Error;

use super::code::SemanticErrorCode;
use crate::program::InputRef;

/// A static violation found before the first instruction runs.
///
/// Renders as `[<code>] <message>\nLINE:\n<line text>`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("[{code}] {message}\nLINE:\n{line_text}")]
pub struct SemanticError {
    code: SemanticErrorCode,
    message: String,
    line_text: String,
    input_ref: Option<InputRef>,
}

impl SemanticError {
    pub fn new(
        code: SemanticErrorCode,
        message: impl Into<String>,
        line_text: impl Into<String>,
    ) -> Self {
        Self {
            code,
            message: message.into(),
            line_text: line_text.into(),
            input_ref: None,
        }
    }

    /// Records which line the error refers to (builder-style).
    pub fn with_input_ref(mut self, input_ref: InputRef) -> Self {
        self.input_ref = Some(input_ref);
        self
    }

    pub fn code(&self) -> SemanticErrorCode {
        self.code
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn line_text(&self) -> &str {
        &self.line_text
    }

    pub fn input_ref(&self) -> Option<InputRef> {
        self.input_ref
    }
}
