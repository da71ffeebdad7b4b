use crate::ast::{BinaryOp, Expr, Statement, UnaryOp};
use crate::builtins::{call_builtin, find_builtin};
use crate::diagnostic::{Attribute, Fault, RuntimeErrorCode, RuntimeFailure};
use crate::value::{Value, finite, format_number};

use super::Interpreter;

/// Limit on nested user function calls.
const MAX_CALL_DEPTH: usize = 64;

impl<'p> Interpreter<'p> {
    pub(super) fn eval(&mut self, expr: &Expr) -> Result<Value, Fault> {
        let value = match expr {
            Expr::Number(text) => {
                let n = text.parse::<f64>().map_err(|_| {
                    RuntimeFailure::illegal_parameter(format!("malformed number {text}"))
                })?;
                Value::Number(finite(n, &format!("number {text}"))?)
            }
            Expr::Str(text) => Value::Str(text.clone()),
            Expr::Var(name) => self.env.get(name),
            Expr::Index { name, args } => match find_builtin(name) {
                Some(builtin) => {
                    let mut values = Vec::with_capacity(args.len());
                    for arg in args {
                        values.push(self.eval(arg)?);
                    }
                    call_builtin(builtin, &values)?
                }
                None => {
                    let subscripts = self.eval_numbers(args)?;
                    self.env.element(name, &subscripts)?
                }
            },
            Expr::FnCall { name, args } => self.call_function(name, args)?,
            Expr::Unary { op, operand } => {
                let n = self.eval_number(operand)?;
                match op {
                    UnaryOp::Neg => Value::Number(-n),
                    UnaryOp::Not => Value::Number(f64::from(!to_int(n)?)),
                }
            }
            Expr::Binary { op, lhs, rhs } => {
                let left = self.eval(lhs)?;
                let right = self.eval(rhs)?;
                binary(*op, left, right)?
            }
        };
        Ok(value)
    }

    pub(super) fn eval_number(&mut self, expr: &Expr) -> Result<f64, Fault> {
        Ok(self.eval(expr)?.as_number()?)
    }

    pub(super) fn eval_numbers(&mut self, exprs: &[Expr]) -> Result<Vec<f64>, Fault> {
        let mut numbers = Vec::with_capacity(exprs.len());
        for expr in exprs {
            numbers.push(self.eval_number(expr)?);
        }
        Ok(numbers)
    }

    /// Evaluates a `DEF FN` body in its own frame.
    ///
    /// Arguments are evaluated by the caller's frame. Anything raised
    /// inside the body is attributed to the `DEF` line before it leaves
    /// this function.
    fn call_function(&mut self, name: &str, args: &[Expr]) -> Result<Value, Fault> {
        let program = self.program;
        let position = *self.functions.get(name).ok_or_else(|| {
            RuntimeFailure::illegal_parameter(format!("undefined function {name}"))
        })?;
        let instruction = &program.instructions()[position];
        let Statement::DefFn { params, body, .. } = &instruction.statement else {
            return Err(RuntimeFailure::illegal_parameter(format!("{name} is not a function")).into());
        };

        let mut values = Vec::with_capacity(args.len());
        for arg in args {
            values.push(self.eval(arg)?);
        }
        if self.depth >= MAX_CALL_DEPTH {
            return Err(RuntimeFailure::new(
                RuntimeErrorCode::IndexOutOfBounds,
                format!("{name} nested deeper than {MAX_CALL_DEPTH} calls"),
            )
            .into());
        }

        let shadowed: Vec<_> = params
            .iter()
            .zip(values)
            .map(|(param, value)| (param.as_str(), self.env.bind(param, value)))
            .collect();
        self.depth += 1;
        let result = self.eval(body);
        self.depth -= 1;
        for (param, previous) in shadowed.into_iter().rev() {
            self.env.restore(param, previous);
        }

        result.map_err(|fault| Fault::Attributed(fault.attribute(instruction, program)))
    }
}

fn binary(op: BinaryOp, left: Value, right: Value) -> Result<Value, RuntimeFailure> {
    match (left, right) {
        (Value::Number(l), Value::Number(r)) => {
            if op.is_comparison() {
                return Ok(Value::from_bool(compare(op, &l, &r)));
            }
            Ok(Value::Number(arithmetic(op, l, r)?))
        }
        (Value::Str(l), Value::Str(r)) => match op {
            BinaryOp::Add => Ok(Value::Str(l + &r)),
            _ if op.is_comparison() => Ok(Value::from_bool(compare(op, &l, &r))),
            _ => Err(RuntimeFailure::type_mismatch(format!(
                "operator {} does not apply to strings",
                op.symbol()
            ))),
        },
        _ => Err(RuntimeFailure::type_mismatch(format!(
            "operator {} cannot combine strings and numbers",
            op.symbol()
        ))),
    }
}

fn compare<T: PartialOrd + ?Sized>(op: BinaryOp, l: &T, r: &T) -> bool {
    match op {
        BinaryOp::Eq => l == r,
        BinaryOp::Ne => l != r,
        BinaryOp::Lt => l < r,
        BinaryOp::Le => l <= r,
        BinaryOp::Gt => l > r,
        BinaryOp::Ge => l >= r,
        _ => false,
    }
}

fn arithmetic(op: BinaryOp, l: f64, r: f64) -> Result<f64, RuntimeFailure> {
    let result = match op {
        BinaryOp::Add => l + r,
        BinaryOp::Sub => l - r,
        BinaryOp::Mul => l * r,
        BinaryOp::Div => {
            if r == 0.0 {
                return Err(RuntimeFailure::division_by_zero());
            }
            l / r
        }
        BinaryOp::Mod => {
            let divisor = r.trunc();
            if divisor == 0.0 {
                return Err(RuntimeFailure::division_by_zero());
            }
            l.trunc() % divisor
        }
        BinaryOp::Pow => l.powf(r),
        BinaryOp::And => f64::from(to_int(l)? & to_int(r)?),
        BinaryOp::Or => f64::from(to_int(l)? | to_int(r)?),
        _ => {
            return Err(RuntimeFailure::illegal_parameter(format!(
                "operator {} is not arithmetic",
                op.symbol()
            )));
        }
    };
    finite(result, &format!("{} {} {}", format_number(l), op.symbol(), format_number(r)))
}

/// Logical operators work bitwise on 32-bit integers; true is -1.
fn to_int(n: f64) -> Result<i32, RuntimeFailure> {
    let truncated = n.trunc();
    if truncated < f64::from(i32::MIN) || truncated > f64::from(i32::MAX) {
        return Err(RuntimeFailure::out_of_range(format!(
            "{} does not fit a logical operand",
            format_number(n)
        )));
    }
    Ok(truncated as i32)
}
