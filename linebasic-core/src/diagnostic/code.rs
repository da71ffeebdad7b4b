//! Closed failure-code sets.
//!
//! Codes are stable identifiers meant for programmatic dispatch. Their
//! string form (`WHILE_WITHOUT_WEND`, `DIVISION_BY_ZERO`, ...) is what
//! appears between brackets in rendered messages, and parses back to the
//! same variant.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString, IntoStaticStr};

/// Violations found by the validator before execution.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Display,
    EnumString,
    IntoStaticStr,
    EnumIter,
    Serialize,
    Deserialize,
)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SemanticErrorCode {
    /// An array is declared under a builtin or user function name.
    ArrayFunctionNameCollision,
    /// A name without a `DIM` declaration is subscripted.
    ScalarUsedAsArray,
    MalformedNumber,
    InvalidAssignmentTarget,
    /// String and numeric values are mixed where the sigils already tell.
    TypeMismatch,
    /// A user function is called with fewer arguments than it declares.
    InsufficientArguments,
    WhileWithoutWend,
    WendWithoutWhile,
    ForWithoutNext,
    NextWithoutFor,
    BadArgument,
}

impl SemanticErrorCode {
    pub fn as_str(self) -> &'static str {
        self.into()
    }
}

/// Faults raised while a program runs.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Display,
    EnumString,
    IntoStaticStr,
    EnumIter,
    Serialize,
    Deserialize,
)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RuntimeErrorCode {
    ArrayIndexOutOfBounds,
    /// Positions outside strings and control stacks.
    IndexOutOfBounds,
    DivisionByZero,
    /// A builtin received an argument outside its domain.
    IllegalParameter,
    /// A result cannot be represented as a finite number or a character.
    ValueOutOfRange,
    IoFailure,
    TypeMismatch,
    IllegalFileAccess,
    /// `READ` ran past the last `DATA` item.
    DataExhausted,
}

impl RuntimeErrorCode {
    pub fn as_str(self) -> &'static str {
        self.into()
    }
}
