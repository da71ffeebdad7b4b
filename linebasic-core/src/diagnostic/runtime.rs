//! Runtime failures and their attribution to source lines.
//!
//! A fault is raised as a [`RuntimeFailure`] exactly where it happens and
//! carries no location. The innermost execution frame that owns the
//! faulting [`Instruction`] turns it into a [`RuntimeError`] through
//! [`Attribute`]. A `RuntimeError` keeps the failure as its cause and
//! cannot be attributed again: attributing it returns it unchanged.

use std::fmt;

use log::{debug, warn};
use thiserror::Error;

use super::code::RuntimeErrorCode;
use crate::program::{InputRef, Instruction, LineSource};

/// An unattributed fault, created at the point of violation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("[{code}] {message}")]
pub struct RuntimeFailure {
    code: RuntimeErrorCode,
    message: String,
}

impl RuntimeFailure {
    pub fn new(code: RuntimeErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn division_by_zero() -> Self {
        Self::new(RuntimeErrorCode::DivisionByZero, "Division by zero")
    }

    pub fn type_mismatch(message: impl Into<String>) -> Self {
        Self::new(RuntimeErrorCode::TypeMismatch, message)
    }

    pub fn illegal_parameter(message: impl Into<String>) -> Self {
        Self::new(RuntimeErrorCode::IllegalParameter, message)
    }

    pub fn out_of_range(message: impl Into<String>) -> Self {
        Self::new(RuntimeErrorCode::ValueOutOfRange, message)
    }

    pub fn code(&self) -> RuntimeErrorCode {
        self.code
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

/// Where an attributed error happened.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Location {
    input_ref: InputRef,
    line_text: String,
}

impl Location {
    pub fn input_ref(&self) -> InputRef {
        self.input_ref
    }

    pub fn line_text(&self) -> &str {
        &self.line_text
    }
}

/// A runtime failure attributed to the instruction that raised it.
///
/// Renders as `[<code>] <original message>\nLine: <inputRef>\n<line text>`,
/// or as `[<code>] <original message>` when the line text was not
/// available at attribution time.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub struct RuntimeError {
    #[source]
    cause: RuntimeFailure,
    location: Option<Location>,
    message: String,
}

impl RuntimeError {
    fn attributed(cause: RuntimeFailure, location: Option<Location>) -> Self {
        let message = match &location {
            Some(location) => format!(
                "{}\nLine: {}\n{}",
                cause.message, location.input_ref, location.line_text
            ),
            None => cause.message.clone(),
        };
        Self {
            cause,
            location,
            message,
        }
    }

    /// Always the code of the cause.
    pub fn code(&self) -> RuntimeErrorCode {
        self.cause.code
    }

    pub fn cause(&self) -> &RuntimeFailure {
        &self.cause
    }

    pub fn location(&self) -> Option<&Location> {
        self.location.as_ref()
    }

    /// The original message followed by the location section, without the
    /// code prefix.
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for RuntimeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code(), self.message)
    }
}

/// Turns a fault into a located [`RuntimeError`].
///
/// Implementations never fail. Attribution of something that already
/// carries a location is the identity.
pub trait Attribute {
    fn attribute(self, instruction: &Instruction, lines: &dyn LineSource) -> RuntimeError;
}

impl Attribute for RuntimeFailure {
    fn attribute(self, instruction: &Instruction, lines: &dyn LineSource) -> RuntimeError {
        let input_ref = instruction.input_ref;
        let location = match lines.line_text(input_ref) {
            Some(text) => Some(Location {
                input_ref,
                line_text: text.to_string(),
            }),
            None => {
                warn!("no source text for line {input_ref}; reporting {} without location", self.code);
                None
            }
        };
        debug!("attributed {} to line {input_ref}", self.code);
        RuntimeError::attributed(self, location)
    }
}

impl Attribute for RuntimeError {
    fn attribute(self, _instruction: &Instruction, _lines: &dyn LineSource) -> RuntimeError {
        self
    }
}

/// What execution frames pass between each other while unwinding.
///
/// A frame that owns the current instruction attributes a `Raw` fault;
/// frames further out see `Attributed` and hand it on untouched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Fault {
    Raw(RuntimeFailure),
    Attributed(RuntimeError),
}

impl From<RuntimeFailure> for Fault {
    fn from(failure: RuntimeFailure) -> Self {
        Fault::Raw(failure)
    }
}

impl From<RuntimeError> for Fault {
    fn from(error: RuntimeError) -> Self {
        Fault::Attributed(error)
    }
}

impl Attribute for Fault {
    fn attribute(self, instruction: &Instruction, lines: &dyn LineSource) -> RuntimeError {
        match self {
            Fault::Raw(failure) => failure.attribute(instruction, lines),
            Fault::Attributed(error) => error,
        }
    }
}
