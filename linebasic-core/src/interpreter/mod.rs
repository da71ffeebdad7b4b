//! Tree-walking execution of a validated program.
//!
//! The main loop is the frame that owns the current instruction: any
//! fault raised while executing it is attributed there, exactly once.
//! Evaluating a `DEF FN` body opens a nested frame owned by the `DEF`
//! line (see `eval.rs`); faults attributed in that frame come back as
//! [`Fault::Attributed`] and are passed on unchanged.

mod environment;
mod eval;

use std::collections::HashMap;
use std::io::Write;

use log::trace;

use crate::ast::{DataItem, Expr, PrintItem, Statement};
use crate::diagnostic::{Attribute, Fault, RuntimeError, RuntimeErrorCode, RuntimeFailure};
use crate::program::Program;
use crate::validate::BlockMap;
use crate::value::{Value, ValueType, finite};
use environment::Environment;

/// Width of a `PRINT` zone reached with `,`.
const PRINT_ZONE: usize = 14;

enum Flow {
    Next,
    Jump(usize),
    Halt,
}

struct ForFrame {
    opener: usize,
    var: String,
    limit: f64,
    step: f64,
}

pub struct Interpreter<'p> {
    program: &'p Program,
    blocks: BlockMap,
    env: Environment,
    functions: HashMap<&'p str, usize>,
    data: Vec<&'p DataItem>,
    data_cursor: usize,
    returns: Vec<usize>,
    loops: Vec<ForFrame>,
    column: usize,
    depth: usize,
}

impl<'p> Interpreter<'p> {
    /// `blocks` must come from [`crate::validate::analyze`] on the same
    /// program.
    pub fn new(program: &'p Program, blocks: BlockMap) -> Self {
        let mut functions = HashMap::new();
        let mut data = Vec::new();
        for (position, instruction) in program.instructions().iter().enumerate() {
            match &instruction.statement {
                Statement::DefFn { name, .. } => {
                    functions.entry(name.as_str()).or_insert(position);
                }
                Statement::Data(items) => data.extend(items.iter()),
                _ => {}
            }
        }
        Interpreter {
            program,
            blocks,
            env: Environment::new(),
            functions,
            data,
            data_cursor: 0,
            returns: Vec::new(),
            loops: Vec::new(),
            column: 0,
            depth: 0,
        }
    }

    /// Run from the first line until `END`, `STOP`, the last line, or the
    /// first runtime error.
    pub fn run(&mut self, out: &mut dyn Write) -> Result<(), RuntimeError> {
        let program = self.program;
        let mut pc = 0;
        while let Some(instruction) = program.instructions().get(pc) {
            trace!(
                "line {}: {}",
                instruction.input_ref,
                instruction.statement.keyword()
            );
            let flow = self
                .execute(pc, &instruction.statement, out)
                .map_err(|fault| fault.attribute(instruction, program))?;
            pc = match flow {
                Flow::Next => pc + 1,
                Flow::Jump(target) => target,
                Flow::Halt => break,
            };
        }
        Ok(())
    }

    fn execute(
        &mut self,
        position: usize,
        statement: &'p Statement,
        out: &mut dyn Write,
    ) -> Result<Flow, Fault> {
        match statement {
            Statement::Rem | Statement::DefFn { .. } | Statement::Data(_) => {}
            Statement::End | Statement::Stop => return Ok(Flow::Halt),
            Statement::Let { target, value } => {
                let value = self.eval(value)?;
                self.assign(target, value)?;
            }
            Statement::Print(items) => self.print(items, out)?,
            Statement::Dim(decls) => {
                for decl in decls {
                    let bounds = self.eval_numbers(&decl.bounds)?;
                    self.env.dim(&decl.name, &bounds)?;
                }
            }
            Statement::If { condition, then } => {
                if self.eval_number(condition)? != 0.0 {
                    return self.execute(position, then, out);
                }
            }
            Statement::Goto(line) => return Ok(Flow::Jump(self.line_position(*line)?)),
            Statement::Gosub(line) => {
                let target = self.line_position(*line)?;
                self.returns.push(position + 1);
                return Ok(Flow::Jump(target));
            }
            Statement::Return => {
                let back = self.returns.pop().ok_or_else(|| {
                    RuntimeFailure::new(RuntimeErrorCode::IndexOutOfBounds, "RETURN without GOSUB")
                })?;
                return Ok(Flow::Jump(back));
            }
            Statement::While(condition) => {
                if self.eval_number(condition)? == 0.0 {
                    return Ok(Flow::Jump(self.closer(position)? + 1));
                }
            }
            Statement::Wend => return Ok(Flow::Jump(self.opener(position)?)),
            Statement::For {
                target,
                from,
                to,
                step,
            } => return self.enter_for(position, target, from, to, step.as_ref()),
            Statement::Next(_) => return self.next(position),
            Statement::Read(targets) => {
                for target in targets {
                    let value = self.read_data(target)?;
                    self.assign(target, value)?;
                }
            }
            Statement::Restore => self.data_cursor = 0,
        }
        Ok(Flow::Next)
    }

    fn enter_for(
        &mut self,
        position: usize,
        target: &Expr,
        from: &Expr,
        to: &Expr,
        step: Option<&Expr>,
    ) -> Result<Flow, Fault> {
        let Expr::Var(var) = target else {
            return Err(RuntimeFailure::type_mismatch("FOR needs a numeric variable").into());
        };
        let start = self.eval_number(from)?;
        let limit = self.eval_number(to)?;
        let step = match step {
            Some(step) => self.eval_number(step)?,
            None => 1.0,
        };
        self.env.set(var, Value::Number(start));
        self.loops.retain(|frame| frame.opener != position);
        if loop_finished(start, limit, step) {
            return Ok(Flow::Jump(self.closer(position)? + 1));
        }
        self.loops.push(ForFrame {
            opener: position,
            var: var.clone(),
            limit,
            step,
        });
        Ok(Flow::Next)
    }

    fn next(&mut self, position: usize) -> Result<Flow, Fault> {
        let opener = self.opener(position)?;
        let index = self
            .loops
            .iter()
            .rposition(|frame| frame.opener == opener)
            .ok_or_else(|| {
                RuntimeFailure::new(RuntimeErrorCode::IndexOutOfBounds, "NEXT without active FOR")
            })?;
        self.loops.truncate(index + 1);
        let frame = &self.loops[index];
        let value = self.env.get(&frame.var).as_number()? + frame.step;
        let value = finite(value, "FOR counter")?;
        let (limit, step) = (frame.limit, frame.step);
        let var = frame.var.clone();
        self.env.set(&var, Value::Number(value));
        if loop_finished(value, limit, step) {
            self.loops.pop();
            Ok(Flow::Next)
        } else {
            Ok(Flow::Jump(opener + 1))
        }
    }

    fn print(&mut self, items: &[PrintItem], out: &mut dyn Write) -> Result<(), Fault> {
        let mut newline = true;
        for item in items {
            match item {
                PrintItem::Expr(expr) => {
                    let value = self.eval(expr)?;
                    self.write(out, &value.to_string())?;
                    newline = true;
                }
                PrintItem::Semicolon => newline = false,
                PrintItem::Comma => {
                    let pad = PRINT_ZONE - self.column % PRINT_ZONE;
                    self.write(out, &" ".repeat(pad))?;
                    newline = false;
                }
            }
        }
        if newline {
            self.write(out, "\n")?;
        }
        Ok(())
    }

    fn write(&mut self, out: &mut dyn Write, text: &str) -> Result<(), RuntimeFailure> {
        out.write_all(text.as_bytes()).map_err(|err| {
            RuntimeFailure::new(RuntimeErrorCode::IoFailure, format!("cannot write output: {err}"))
        })?;
        match text.rfind('\n') {
            Some(index) => self.column = text[index + 1..].chars().count(),
            None => self.column += text.chars().count(),
        }
        Ok(())
    }

    fn read_data(&mut self, target: &Expr) -> Result<Value, RuntimeFailure> {
        let item = self
            .data
            .get(self.data_cursor)
            .copied()
            .ok_or_else(|| RuntimeFailure::new(RuntimeErrorCode::DataExhausted, "Out of DATA"))?;
        self.data_cursor += 1;
        let wanted = match target {
            Expr::Var(name) | Expr::Index { name, .. } => ValueType::of_name(name),
            _ => ValueType::Number,
        };
        match (item, wanted) {
            (DataItem::Number(text), ValueType::Number) => {
                let n = text.parse::<f64>().map_err(|_| {
                    RuntimeFailure::type_mismatch(format!("DATA item {text} is not a number"))
                })?;
                Ok(Value::Number(finite(n, &format!("DATA item {text}"))?))
            }
            (DataItem::Number(text), ValueType::Str) => Ok(Value::Str(text.clone())),
            (DataItem::Str(text), ValueType::Str) => Ok(Value::Str(text.clone())),
            (DataItem::Str(text), ValueType::Number) => Err(RuntimeFailure::type_mismatch(
                format!("cannot READ string \"{text}\" into a numeric variable"),
            )),
        }
    }

    fn assign(&mut self, target: &Expr, value: Value) -> Result<(), Fault> {
        match target {
            Expr::Var(name) => self.env.set(name, value),
            Expr::Index { name, args } => {
                let subscripts = self.eval_numbers(args)?;
                self.env.set_element(name, &subscripts, value)?;
            }
            _ => return Err(RuntimeFailure::type_mismatch("cannot assign to expression").into()),
        }
        Ok(())
    }

    fn line_position(&self, line: u32) -> Result<usize, RuntimeFailure> {
        self.program.position(line).ok_or_else(|| {
            RuntimeFailure::new(
                RuntimeErrorCode::IndexOutOfBounds,
                format!("undefined line {line}"),
            )
        })
    }

    fn closer(&self, opener: usize) -> Result<usize, RuntimeFailure> {
        self.blocks.closer_of(opener).ok_or_else(|| {
            RuntimeFailure::new(RuntimeErrorCode::IndexOutOfBounds, "block has no closing statement")
        })
    }

    fn opener(&self, closer: usize) -> Result<usize, RuntimeFailure> {
        self.blocks.opener_of(closer).ok_or_else(|| {
            RuntimeFailure::new(RuntimeErrorCode::IndexOutOfBounds, "block has no opening statement")
        })
    }
}

fn loop_finished(value: f64, limit: f64, step: f64) -> bool {
    if step >= 0.0 { value > limit } else { value < limit }
}

#[cfg(test)]
mod tests {
    use std::io;

    use crate::diagnostic::Location;
    use crate::error::CoreError;
    use crate::program::InputRef;
    use crate::run_source;

    use super::*;

    fn run(source: &str) -> (String, Result<(), CoreError>) {
        let mut out = Vec::new();
        let result = run_source(source, &mut out);
        (String::from_utf8(out).expect("utf8 output"), result)
    }

    fn output(source: &str) -> String {
        let (out, result) = run(source);
        result.expect("program should run");
        out
    }

    fn runtime_error(source: &str) -> RuntimeError {
        match run(source).1 {
            Err(CoreError::Runtime(err)) => err,
            other => panic!("expected runtime error, got {other:?}"),
        }
    }

    #[test]
    fn prints_with_separators_and_zones() {
        assert_eq!(output("10 PRINT \"A\"; 1 + 2\n20 PRINT 3, 4\n"), "A3\n3             4\n");
        assert_eq!(output("10 PRINT 1;\n20 PRINT 2\n30 PRINT\n"), "12\n\n");
    }

    #[test]
    fn division_by_zero_is_attributed_to_its_line() {
        let err = runtime_error("10 PRINT 1/0\n");
        assert_eq!(err.code(), RuntimeErrorCode::DivisionByZero);
        assert_eq!(err.location().map(Location::line_text), Some("PRINT 1/0"));
        assert_eq!(
            err.to_string(),
            "[DIVISION_BY_ZERO] Division by zero\nLine: 10\nPRINT 1/0"
        );
    }

    #[test]
    fn reading_past_the_data_is_exhausted() {
        let (out, result) = run("10 DATA 1\n20 READ A\n30 PRINT A\n40 READ B\n");
        assert_eq!(out, "1\n");
        let Err(CoreError::Runtime(err)) = result else {
            panic!("expected runtime error");
        };
        assert_eq!(err.code(), RuntimeErrorCode::DataExhausted);
        assert_eq!(err.to_string(), "[DATA_EXHAUSTED] Out of DATA\nLine: 40\nREAD B");
    }

    #[test]
    fn fault_inside_a_user_function_is_attributed_once_to_the_def_line() {
        let err = runtime_error("10 DEF FNR(X) = 1/X\n20 PRINT FNR(0)\n");
        assert_eq!(err.code(), RuntimeErrorCode::DivisionByZero);
        assert_eq!(err.location().map(Location::input_ref), Some(InputRef::new(10)));
        let rendered = err.to_string();
        assert_eq!(rendered.matches("Line:").count(), 1);
        assert_eq!(
            rendered,
            "[DIVISION_BY_ZERO] Division by zero\nLine: 10\nDEF FNR(X) = 1/X"
        );
    }

    #[test]
    fn fault_in_function_arguments_belongs_to_the_caller() {
        let err = runtime_error("10 DEF FNR(X) = X\n20 PRINT FNR(1/0)\n");
        assert_eq!(err.location().map(Location::input_ref), Some(InputRef::new(20)));
    }

    #[test]
    fn nested_function_calls_keep_the_innermost_location() {
        let err = runtime_error(
            "10 DEF FNA(X) = SQR(X)\n20 DEF FNB(X) = FNA(X) + 1\n30 PRINT FNB(-4)\n",
        );
        assert_eq!(err.code(), RuntimeErrorCode::IllegalParameter);
        assert_eq!(err.location().map(Location::input_ref), Some(InputRef::new(10)));
        assert_eq!(err.to_string().matches("Line:").count(), 1);
    }

    #[test]
    fn runaway_recursion_is_reported_at_the_def_line() {
        let err = runtime_error("10 DEF FNA(X) = FNA(X)\n20 PRINT FNA(1)\n");
        assert_eq!(err.code(), RuntimeErrorCode::IndexOutOfBounds);
        assert_eq!(err.location().map(Location::input_ref), Some(InputRef::new(10)));
    }

    #[test]
    fn fault_inside_a_subroutine_names_the_subroutine_line() {
        let err = runtime_error("10 GOSUB 100\n20 END\n100 A = SQR(-1)\n110 RETURN\n");
        assert_eq!(err.code(), RuntimeErrorCode::IllegalParameter);
        assert_eq!(err.location().map(Location::line_text), Some("A = SQR(-1)"));
    }

    #[test]
    fn fault_inside_a_loop_body_names_the_body_line() {
        let (out, result) = run("10 DIM A(3)\n20 FOR I = 0 TO 5\n30 PRINT I;\n40 A(I) = I\n50 NEXT I\n");
        assert_eq!(out, "01234");
        let Err(CoreError::Runtime(err)) = result else {
            panic!("expected runtime error");
        };
        assert_eq!(err.code(), RuntimeErrorCode::ArrayIndexOutOfBounds);
        assert_eq!(
            err.to_string(),
            "[ARRAY_INDEX_OUT_OF_BOUNDS] subscript 4 of A is outside 0..3\nLine: 40\nA(I) = I"
        );
    }

    #[test]
    fn runs_while_loops() {
        assert_eq!(
            output("10 WHILE I < 3\n20 I = I + 1\n30 PRINT I;\n40 WEND\n50 PRINT\n"),
            "123\n"
        );
    }

    #[test]
    fn runs_for_loops_with_steps_and_skips_empty_ranges() {
        assert_eq!(
            output("10 FOR I = 5 TO 1 STEP -2\n20 PRINT I;\n30 NEXT I\n40 PRINT\n"),
            "531\n"
        );
        assert_eq!(
            output("10 FOR I = 5 TO 1\n20 PRINT I\n30 NEXT\n40 PRINT \"DONE\"\n"),
            "DONE\n"
        );
        assert_eq!(
            output("10 FOR I = 1 TO 2\n20 FOR J = 1 TO 2\n30 PRINT I * 10 + J;\n40 NEXT J\n50 NEXT I\n60 PRINT\n"),
            "11122122\n"
        );
    }

    #[test]
    fn follows_goto_if_and_gosub() {
        assert_eq!(output("10 I = I + 1\n20 IF I < 3 THEN 10\n30 PRINT I\n"), "3\n");
        assert_eq!(
            output("10 GOSUB 100\n20 PRINT \"BACK\"\n30 END\n100 PRINT \"SUB\"\n110 RETURN\n"),
            "SUB\nBACK\n"
        );
    }

    #[test]
    fn return_without_gosub_is_an_index_fault() {
        let err = runtime_error("10 RETURN\n");
        assert_eq!(err.code(), RuntimeErrorCode::IndexOutOfBounds);
    }

    #[test]
    fn reads_restores_and_checks_data_types() {
        assert_eq!(
            output("10 DATA 1, 2\n20 READ A\n30 RESTORE\n40 READ B, C\n50 PRINT A; B; C\n"),
            "112\n"
        );
        let err = runtime_error("10 DATA \"X\"\n20 READ A\n");
        assert_eq!(err.code(), RuntimeErrorCode::TypeMismatch);
    }

    #[test]
    fn overflow_is_out_of_range() {
        assert_eq!(
            runtime_error("10 X = 1E300 * 1E300\n").code(),
            RuntimeErrorCode::ValueOutOfRange
        );
        assert_eq!(runtime_error("10 PRINT 5 MOD 0\n").code(), RuntimeErrorCode::DivisionByZero);
    }

    #[test]
    fn evaluates_strings_and_comparisons() {
        assert_eq!(
            output("10 A$ = \"AB\" + \"C\"\n20 PRINT A$; LEN(A$); A$ = \"ABC\"; NOT 0\n"),
            "ABC3-1-1\n"
        );
    }

    #[test]
    fn semantic_errors_prevent_execution() {
        let (out, result) = run("10 PRINT \"HI\"\n20 WEND\n");
        assert_eq!(out, "");
        assert!(matches!(result, Err(CoreError::Semantic(_))));
    }

    struct FailingWriter;

    impl io::Write for FailingWriter {
        fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
            Err(io::Error::other("disk full"))
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn output_failures_are_io_faults() {
        let result = run_source("10 PRINT 1\n", &mut FailingWriter);
        let Err(CoreError::Runtime(err)) = result else {
            panic!("expected runtime error");
        };
        assert_eq!(err.code(), RuntimeErrorCode::IoFailure);
        assert_eq!(err.location().map(Location::input_ref), Some(InputRef::new(10)));
    }
}
