//! The executable program representation.
//!
//! A [`Program`] is the ordered list of numbered lines produced by the
//! parser. Each line becomes one [`Instruction`]; the literal text of the
//! line is kept next to it so diagnostics can quote the source.

use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;

use crate::ast::Statement;

/// Source-location marker attached to every instruction.
///
/// In a line-numbered program the location is the line number itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct InputRef(u32);

impl InputRef {
    pub const fn new(line_number: u32) -> Self {
        InputRef(line_number)
    }

    pub const fn line_number(self) -> u32 {
        self.0
    }
}

impl fmt::Display for InputRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One unit of execution: a statement and the line it came from.
#[derive(Debug, Clone, PartialEq)]
pub struct Instruction {
    pub input_ref: InputRef,
    pub statement: Statement,
}

impl Instruction {
    pub fn new(input_ref: InputRef, statement: Statement) -> Self {
        Instruction {
            input_ref,
            statement,
        }
    }
}

/// Lookup of the literal text of a program line.
pub trait LineSource {
    fn line_text(&self, at: InputRef) -> Option<&str>;
}

impl LineSource for BTreeMap<InputRef, String> {
    fn line_text(&self, at: InputRef) -> Option<&str> {
        self.get(&at).map(String::as_str)
    }
}

/// A parsed program, ordered by line number.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Program {
    instructions: Vec<Instruction>,
    texts: BTreeMap<InputRef, String>,
}

impl Program {
    pub fn new() -> Self {
        Program::default()
    }

    /// Inserts a line, replacing any existing line with the same number.
    pub fn insert(&mut self, instruction: Instruction, text: impl Into<String>) {
        let at = instruction.input_ref;
        match self
            .instructions
            .binary_search_by_key(&at, |existing| existing.input_ref)
        {
            Ok(index) => self.instructions[index] = instruction,
            Err(index) => self.instructions.insert(index, instruction),
        }
        self.texts.insert(at, text.into());
    }

    pub fn instructions(&self) -> &[Instruction] {
        &self.instructions
    }

    pub fn len(&self) -> usize {
        self.instructions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instructions.is_empty()
    }

    /// Index of the instruction for a line number, if the line exists.
    pub fn position(&self, line_number: u32) -> Option<usize> {
        self.instructions
            .binary_search_by_key(&InputRef::new(line_number), |instruction| {
                instruction.input_ref
            })
            .ok()
    }
}

impl LineSource for Program {
    fn line_text(&self, at: InputRef) -> Option<&str> {
        self.texts.line_text(at)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keeps_lines_sorted_and_replaces_duplicates() {
        let mut program = Program::new();
        program.insert(Instruction::new(InputRef::new(20), Statement::End), "END");
        program.insert(Instruction::new(InputRef::new(10), Statement::Rem), "REM A");
        program.insert(Instruction::new(InputRef::new(10), Statement::Stop), "STOP");

        let numbers: Vec<_> = program
            .instructions()
            .iter()
            .map(|instruction| instruction.input_ref.line_number())
            .collect();
        assert_eq!(numbers, vec![10, 20]);
        assert_eq!(program.instructions()[0].statement, Statement::Stop);
        assert_eq!(program.line_text(InputRef::new(10)), Some("STOP"));
    }

    #[test]
    fn finds_positions_by_line_number() {
        let mut program = Program::new();
        program.insert(Instruction::new(InputRef::new(100), Statement::End), "END");
        program.insert(Instruction::new(InputRef::new(5), Statement::Rem), "REM");
        assert_eq!(program.position(100), Some(1));
        assert_eq!(program.position(7), None);
        assert_eq!(program.line_text(InputRef::new(7)), None);
    }
}
