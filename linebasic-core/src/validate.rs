//! Semantic validation of a parsed program.
//!
//! Validation is a pure function of the program: one pass over the
//! lines in order, stopping at the first violation. Names that may be
//! declared anywhere (arrays, user functions) are collected up front so
//! a use before its declaration is not reported as an error.

use std::collections::{HashMap, HashSet};

use log::debug;

use crate::ast::{BinaryOp, DataItem, Expr, PrintItem, Statement, UnaryOp};
use crate::builtins::find_builtin;
use crate::diagnostic::{SemanticError, SemanticErrorCode};
use crate::parser::is_fn_name;
use crate::program::{InputRef, LineSource, Program};
use crate::value::ValueType;

/// Pairing of block openers with their closers, by instruction index.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BlockMap {
    closers: HashMap<usize, usize>,
    openers: HashMap<usize, usize>,
}

impl BlockMap {
    fn pair(&mut self, opener: usize, closer: usize) {
        self.closers.insert(opener, closer);
        self.openers.insert(closer, opener);
    }

    /// The `WEND`/`NEXT` closing the block opened at `opener`.
    pub fn closer_of(&self, opener: usize) -> Option<usize> {
        self.closers.get(&opener).copied()
    }

    /// The `WHILE`/`FOR` opening the block closed at `closer`.
    pub fn opener_of(&self, closer: usize) -> Option<usize> {
        self.openers.get(&closer).copied()
    }
}

/// Check a program before it runs.
pub fn validate(program: &Program) -> Result<(), SemanticError> {
    analyze(program).map(|_| ())
}

/// Same pass as [`validate`], keeping the block pairing for the
/// interpreter.
pub fn analyze(program: &Program) -> Result<BlockMap, SemanticError> {
    let result = Validator::new(program).run();
    match &result {
        Ok(_) => debug!("program with {} lines passed validation", program.len()),
        Err(err) => debug!("validation stopped with {}", err.code()),
    }
    result
}

enum OpenBlock {
    While,
    For(String),
}

struct Validator<'p> {
    program: &'p Program,
    arrays: HashMap<&'p str, usize>,
    functions: HashMap<&'p str, &'p [String]>,
    dimensioned: HashSet<&'p str>,
    defined: HashSet<&'p str>,
    open: Vec<(usize, OpenBlock)>,
    blocks: BlockMap,
    current: InputRef,
}

impl<'p> Validator<'p> {
    fn new(program: &'p Program) -> Self {
        let mut arrays = HashMap::new();
        let mut functions = HashMap::new();
        for instruction in program.instructions() {
            let mut statement = &instruction.statement;
            while let Statement::If { then, .. } = statement {
                statement = then.as_ref();
            }
            match statement {
                Statement::Dim(decls) => {
                    for decl in decls {
                        arrays.entry(decl.name.as_str()).or_insert(decl.bounds.len());
                    }
                }
                Statement::DefFn { name, params, .. } => {
                    functions.entry(name.as_str()).or_insert(params.as_slice());
                }
                _ => {}
            }
        }
        Validator {
            program,
            arrays,
            functions,
            dimensioned: HashSet::new(),
            defined: HashSet::new(),
            open: Vec::new(),
            blocks: BlockMap::default(),
            current: InputRef::new(0),
        }
    }

    fn run(mut self) -> Result<BlockMap, SemanticError> {
        let program = self.program;
        for (position, instruction) in program.instructions().iter().enumerate() {
            self.current = instruction.input_ref;
            self.check_statement(position, &instruction.statement)?;
        }
        if let Some((position, block)) = self.open.first() {
            self.current = program.instructions()[*position].input_ref;
            return Err(match block {
                OpenBlock::While => self.error(
                    SemanticErrorCode::WhileWithoutWend,
                    "WHILE without matching WEND",
                ),
                OpenBlock::For(var) => self.error(
                    SemanticErrorCode::ForWithoutNext,
                    format!("FOR {var} without matching NEXT"),
                ),
            });
        }
        Ok(self.blocks)
    }

    fn error(&self, code: SemanticErrorCode, message: impl Into<String>) -> SemanticError {
        let text = self.program.line_text(self.current).unwrap_or_default();
        SemanticError::new(code, message, text).with_input_ref(self.current)
    }

    fn check_statement(&mut self, position: usize, statement: &'p Statement) -> Result<(), SemanticError> {
        match statement {
            Statement::Rem
            | Statement::End
            | Statement::Stop
            | Statement::Return
            | Statement::Restore => {}
            Statement::Let { target, value } => {
                let target_ty = self.check_target(target)?;
                let value_ty = self.check_expr(value)?;
                if target_ty != value_ty {
                    return Err(self.error(
                        SemanticErrorCode::TypeMismatch,
                        format!(
                            "cannot assign a {} value to a {} target",
                            value_ty.describe(),
                            target_ty.describe()
                        ),
                    ));
                }
            }
            Statement::Print(items) => {
                for item in items {
                    if let PrintItem::Expr(expr) = item {
                        self.check_expr(expr)?;
                    }
                }
            }
            Statement::Dim(decls) => {
                for decl in decls {
                    let name = decl.name.as_str();
                    if find_builtin(name).is_some() || is_fn_name(name) {
                        return Err(self.error(
                            SemanticErrorCode::ArrayFunctionNameCollision,
                            format!("array {name} collides with function name {name}"),
                        ));
                    }
                    if !self.dimensioned.insert(name) {
                        return Err(self.error(
                            SemanticErrorCode::BadArgument,
                            format!("array {name} is dimensioned twice"),
                        ));
                    }
                    for bound in &decl.bounds {
                        self.expect_number(bound, "array bound")?;
                    }
                }
            }
            Statement::If { condition, then } => {
                self.expect_number(condition, "IF condition")?;
                match then.as_ref() {
                    Statement::While(_)
                    | Statement::Wend
                    | Statement::For { .. }
                    | Statement::Next(_)
                    | Statement::DefFn { .. }
                    | Statement::Data(_) => {
                        return Err(self.error(
                            SemanticErrorCode::BadArgument,
                            format!("{} is not allowed after THEN", then.keyword()),
                        ));
                    }
                    nested => self.check_statement(position, nested)?,
                }
            }
            Statement::Goto(target) | Statement::Gosub(target) => {
                if self.program.position(*target).is_none() {
                    return Err(self.error(
                        SemanticErrorCode::BadArgument,
                        format!("{} to undefined line {target}", statement.keyword()),
                    ));
                }
            }
            Statement::While(condition) => {
                self.expect_number(condition, "WHILE condition")?;
                self.open.push((position, OpenBlock::While));
            }
            Statement::Wend => match self.open.last() {
                Some((opener, OpenBlock::While)) => {
                    let opener = *opener;
                    self.open.pop();
                    self.blocks.pair(opener, position);
                }
                _ => {
                    return Err(self.error(
                        SemanticErrorCode::WendWithoutWhile,
                        "WEND without matching WHILE",
                    ));
                }
            },
            Statement::For {
                target,
                from,
                to,
                step,
            } => {
                let var = match target {
                    Expr::Var(name) if ValueType::of_name(name) == ValueType::Number => name,
                    Expr::Var(name) => {
                        return Err(self.error(
                            SemanticErrorCode::InvalidAssignmentTarget,
                            format!("FOR variable {name} must be numeric"),
                        ));
                    }
                    _ => {
                        return Err(self.error(
                            SemanticErrorCode::InvalidAssignmentTarget,
                            "FOR needs a simple numeric variable",
                        ));
                    }
                };
                self.expect_number(from, "FOR start")?;
                self.expect_number(to, "FOR limit")?;
                if let Some(step) = step {
                    self.expect_number(step, "FOR step")?;
                }
                self.open.push((position, OpenBlock::For(var.clone())));
            }
            Statement::Next(var) => match (self.open.last(), var) {
                (Some((opener, OpenBlock::For(open_var))), Some(var)) if open_var == var => {
                    let opener = *opener;
                    self.open.pop();
                    self.blocks.pair(opener, position);
                }
                (Some((opener, OpenBlock::For(_))), None) => {
                    let opener = *opener;
                    self.open.pop();
                    self.blocks.pair(opener, position);
                }
                _ => {
                    let message = match var {
                        Some(var) => format!("NEXT {var} without matching FOR"),
                        None => "NEXT without matching FOR".to_string(),
                    };
                    return Err(self.error(SemanticErrorCode::NextWithoutFor, message));
                }
            },
            Statement::Read(targets) => {
                for target in targets {
                    self.check_target(target)?;
                }
            }
            Statement::Data(items) => {
                for item in items {
                    if let DataItem::Number(text) = item {
                        self.check_number_literal(text)?;
                    }
                }
            }
            Statement::DefFn { name, params, body } => {
                if !self.defined.insert(name.as_str()) {
                    return Err(self.error(
                        SemanticErrorCode::BadArgument,
                        format!("function {name} is defined twice"),
                    ));
                }
                let mut seen = HashSet::new();
                for param in params {
                    if !seen.insert(param.as_str()) {
                        return Err(self.error(
                            SemanticErrorCode::BadArgument,
                            format!("parameter {param} of {name} is repeated"),
                        ));
                    }
                }
                let body_ty = self.check_expr(body)?;
                let declared = ValueType::of_name(name);
                if body_ty != declared {
                    return Err(self.error(
                        SemanticErrorCode::TypeMismatch,
                        format!(
                            "{name} must return a {} value, body is {}",
                            declared.describe(),
                            body_ty.describe()
                        ),
                    ));
                }
            }
        }
        Ok(())
    }

    fn check_target(&self, target: &Expr) -> Result<ValueType, SemanticError> {
        match target {
            Expr::Var(name) => Ok(ValueType::of_name(name)),
            Expr::Index { name, .. } | Expr::FnCall { name, .. }
                if find_builtin(name).is_some() || is_fn_name(name) =>
            {
                Err(self.error(
                    SemanticErrorCode::InvalidAssignmentTarget,
                    format!("cannot assign to function {name}"),
                ))
            }
            Expr::Index { name, args } => self.check_array_ref(name, args),
            _ => Err(self.error(
                SemanticErrorCode::InvalidAssignmentTarget,
                "only variables and array elements can be assigned",
            )),
        }
    }

    fn check_array_ref(&self, name: &str, args: &[Expr]) -> Result<ValueType, SemanticError> {
        let Some(&dims) = self.arrays.get(name) else {
            return Err(self.error(
                SemanticErrorCode::ScalarUsedAsArray,
                format!("{name} is subscripted but never dimensioned"),
            ));
        };
        if dims != args.len() {
            return Err(self.error(
                SemanticErrorCode::BadArgument,
                format!(
                    "array {name} has {dims} dimensions, {} subscripts given",
                    args.len()
                ),
            ));
        }
        for arg in args {
            self.expect_number(arg, "array subscript")?;
        }
        Ok(ValueType::of_name(name))
    }

    fn check_expr(&self, expr: &Expr) -> Result<ValueType, SemanticError> {
        match expr {
            Expr::Number(text) => {
                self.check_number_literal(text)?;
                Ok(ValueType::Number)
            }
            Expr::Str(_) => Ok(ValueType::Str),
            Expr::Var(name) => {
                if find_builtin(name).is_some() {
                    return Err(self.error(
                        SemanticErrorCode::BadArgument,
                        format!("function {name} used without arguments"),
                    ));
                }
                Ok(ValueType::of_name(name))
            }
            Expr::Index { name, args } => match find_builtin(name) {
                Some(builtin) => {
                    if !builtin.accepts_arity(args.len()) {
                        return Err(self.error(
                            SemanticErrorCode::BadArgument,
                            format!(
                                "{name} expects {} arguments, {} given",
                                arity_text(builtin.required, builtin.params.len()),
                                args.len()
                            ),
                        ));
                    }
                    for (index, (arg, expected)) in args.iter().zip(builtin.params).enumerate() {
                        let actual = self.check_expr(arg)?;
                        if actual != *expected {
                            return Err(self.error(
                                SemanticErrorCode::TypeMismatch,
                                format!(
                                    "argument {} of {name} must be {}",
                                    index + 1,
                                    expected.describe()
                                ),
                            ));
                        }
                    }
                    Ok(builtin.result)
                }
                None => self.check_array_ref(name, args),
            },
            Expr::FnCall { name, args } => {
                let Some(params) = self.functions.get(name.as_str()) else {
                    return Err(self.error(
                        SemanticErrorCode::BadArgument,
                        format!("undefined function {name}"),
                    ));
                };
                if args.len() < params.len() {
                    return Err(self.error(
                        SemanticErrorCode::InsufficientArguments,
                        format!(
                            "{name} expects {} arguments, {} given",
                            params.len(),
                            args.len()
                        ),
                    ));
                }
                if args.len() > params.len() {
                    return Err(self.error(
                        SemanticErrorCode::BadArgument,
                        format!(
                            "{name} expects {} arguments, {} given",
                            params.len(),
                            args.len()
                        ),
                    ));
                }
                for (arg, param) in args.iter().zip(params.iter()) {
                    let expected = ValueType::of_name(param);
                    if self.check_expr(arg)? != expected {
                        return Err(self.error(
                            SemanticErrorCode::TypeMismatch,
                            format!("parameter {param} of {name} must be {}", expected.describe()),
                        ));
                    }
                }
                Ok(ValueType::of_name(name))
            }
            Expr::Unary { op, operand } => {
                let what = match op {
                    UnaryOp::Neg => "operand of '-'",
                    UnaryOp::Not => "operand of NOT",
                };
                self.expect_number(operand, what)?;
                Ok(ValueType::Number)
            }
            Expr::Binary { op, lhs, rhs } => {
                let left = self.check_expr(lhs)?;
                let right = self.check_expr(rhs)?;
                match op {
                    BinaryOp::Add if left == right => Ok(left),
                    _ if op.is_comparison() && left == right => Ok(ValueType::Number),
                    _ if left == ValueType::Number && right == ValueType::Number => {
                        Ok(ValueType::Number)
                    }
                    _ => Err(self.error(
                        SemanticErrorCode::TypeMismatch,
                        format!(
                            "operator {} cannot combine {} and {} values",
                            op.symbol(),
                            left.describe(),
                            right.describe()
                        ),
                    )),
                }
            }
        }
    }

    fn expect_number(&self, expr: &Expr, what: &str) -> Result<(), SemanticError> {
        match self.check_expr(expr)? {
            ValueType::Number => Ok(()),
            ValueType::Str => Err(self.error(
                SemanticErrorCode::TypeMismatch,
                format!("{what} must be numeric"),
            )),
        }
    }

    fn check_number_literal(&self, text: &str) -> Result<(), SemanticError> {
        let digits = text.strip_prefix('-').unwrap_or(text);
        let well_formed = digits.starts_with(|ch: char| ch.is_ascii_digit() || ch == '.')
            && digits.parse::<f64>().is_ok_and(f64::is_finite);
        if well_formed {
            Ok(())
        } else {
            Err(self.error(
                SemanticErrorCode::MalformedNumber,
                format!("malformed number {text}"),
            ))
        }
    }
}

fn arity_text(required: usize, max: usize) -> String {
    if required == max {
        required.to_string()
    } else {
        format!("{required} to {max}")
    }
}
