//! Builtin functions.
//!
//! Builtin names form the reserved function namespace: arrays may not be
//! declared under them and they cannot be assigned to. The validator uses
//! the descriptors below for arity and argument types; the interpreter
//! calls [`call_builtin`] with already evaluated arguments.

use crate::diagnostic::{RuntimeErrorCode, RuntimeFailure};
use crate::value::{Value, ValueType, finite, format_number};

/// Kind tag used by the interpreter to dispatch a call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuiltinKind {
    Abs,
    Int,
    Sgn,
    Sqr,
    Log,
    Exp,
    Sin,
    Cos,
    Len,
    Val,
    Asc,
    Left,
    Right,
    Mid,
    Chr,
    Str,
}

/// Metadata about a single builtin.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuiltinDescriptor {
    /// Name as written in programs (upper case).
    pub name: &'static str,

    /// Parameter types. Parameters past `required` may be omitted.
    pub params: &'static [ValueType],

    pub required: usize,

    pub result: ValueType,

    pub kind: BuiltinKind,
}

const N: ValueType = ValueType::Number;
const S: ValueType = ValueType::Str;

/// The complete list of builtins.
pub const BUILTINS: &[BuiltinDescriptor] = &[
    builtin("ABS", &[N], 1, N, BuiltinKind::Abs),
    builtin("INT", &[N], 1, N, BuiltinKind::Int),
    builtin("SGN", &[N], 1, N, BuiltinKind::Sgn),
    builtin("SQR", &[N], 1, N, BuiltinKind::Sqr),
    builtin("LOG", &[N], 1, N, BuiltinKind::Log),
    builtin("EXP", &[N], 1, N, BuiltinKind::Exp),
    builtin("SIN", &[N], 1, N, BuiltinKind::Sin),
    builtin("COS", &[N], 1, N, BuiltinKind::Cos),
    builtin("LEN", &[S], 1, N, BuiltinKind::Len),
    builtin("VAL", &[S], 1, N, BuiltinKind::Val),
    builtin("ASC", &[S], 1, N, BuiltinKind::Asc),
    builtin("LEFT$", &[S, N], 2, S, BuiltinKind::Left),
    builtin("RIGHT$", &[S, N], 2, S, BuiltinKind::Right),
    builtin("MID$", &[S, N, N], 2, S, BuiltinKind::Mid),
    builtin("CHR$", &[N], 1, S, BuiltinKind::Chr),
    builtin("STR$", &[N], 1, S, BuiltinKind::Str),
];

const fn builtin(
    name: &'static str,
    params: &'static [ValueType],
    required: usize,
    result: ValueType,
    kind: BuiltinKind,
) -> BuiltinDescriptor {
    BuiltinDescriptor {
        name,
        params,
        required,
        result,
        kind,
    }
}

/// Look up a builtin by name. The table is small, so this is linear.
pub fn find_builtin(name: &str) -> Option<&'static BuiltinDescriptor> {
    BUILTINS.iter().find(|b| b.name == name)
}

impl BuiltinDescriptor {
    pub fn accepts_arity(&self, given: usize) -> bool {
        given >= self.required && given <= self.params.len()
    }
}

pub fn call_builtin(builtin: &BuiltinDescriptor, args: &[Value]) -> Result<Value, RuntimeFailure> {
    let name = builtin.name;
    if !builtin.accepts_arity(args.len()) {
        return Err(RuntimeFailure::illegal_parameter(format!(
            "{name} called with {} arguments",
            args.len()
        )));
    }
    let value = match builtin.kind {
        BuiltinKind::Abs => Value::Number(args[0].as_number()?.abs()),
        BuiltinKind::Int => Value::Number(args[0].as_number()?.floor()),
        BuiltinKind::Sgn => {
            let n = args[0].as_number()?;
            Value::Number(if n > 0.0 {
                1.0
            } else if n < 0.0 {
                -1.0
            } else {
                0.0
            })
        }
        BuiltinKind::Sqr => {
            let n = args[0].as_number()?;
            if n < 0.0 {
                return Err(RuntimeFailure::illegal_parameter(format!(
                    "SQR of negative number {}",
                    format_number(n)
                )));
            }
            Value::Number(n.sqrt())
        }
        BuiltinKind::Log => {
            let n = args[0].as_number()?;
            if n <= 0.0 {
                return Err(RuntimeFailure::illegal_parameter(format!(
                    "LOG of non-positive number {}",
                    format_number(n)
                )));
            }
            Value::Number(n.ln())
        }
        BuiltinKind::Exp => Value::Number(finite(args[0].as_number()?.exp(), "EXP")?),
        BuiltinKind::Sin => Value::Number(args[0].as_number()?.sin()),
        BuiltinKind::Cos => Value::Number(args[0].as_number()?.cos()),
        BuiltinKind::Len => Value::Number(args[0].as_str()?.chars().count() as f64),
        BuiltinKind::Val => Value::Number(parse_leading_number(args[0].as_str()?)),
        BuiltinKind::Asc => {
            let s = args[0].as_str()?;
            let first = s
                .chars()
                .next()
                .ok_or_else(|| RuntimeFailure::illegal_parameter("ASC of empty string"))?;
            Value::Number(u32::from(first) as f64)
        }
        BuiltinKind::Left => {
            let chars: Vec<char> = args[0].as_str()?.chars().collect();
            let count = count_arg(name, &args[1])?.min(chars.len());
            Value::Str(chars[..count].iter().collect())
        }
        BuiltinKind::Right => {
            let chars: Vec<char> = args[0].as_str()?.chars().collect();
            let count = count_arg(name, &args[1])?.min(chars.len());
            Value::Str(chars[chars.len() - count..].iter().collect())
        }
        BuiltinKind::Mid => {
            let chars: Vec<char> = args[0].as_str()?.chars().collect();
            let start = args[1].as_number()?.trunc();
            if start < 1.0 || start > chars.len() as f64 + 1.0 {
                return Err(RuntimeFailure::new(
                    RuntimeErrorCode::IndexOutOfBounds,
                    format!(
                        "MID$ position {} outside string of length {}",
                        format_number(start),
                        chars.len()
                    ),
                ));
            }
            let from = start as usize - 1;
            let available = chars.len() - from;
            let count = match args.get(2) {
                Some(length) => count_arg(name, length)?.min(available),
                None => available,
            };
            Value::Str(chars[from..from + count].iter().collect())
        }
        BuiltinKind::Chr => {
            let n = args[0].as_number()?.trunc();
            if !(0.0..=255.0).contains(&n) {
                return Err(RuntimeFailure::out_of_range(format!(
                    "CHR$ code {} is outside 0..255",
                    format_number(n)
                )));
            }
            let ch = char::from(n as u8);
            Value::Str(ch.to_string())
        }
        BuiltinKind::Str => Value::Str(format_number(args[0].as_number()?)),
    };
    Ok(value)
}

fn count_arg(name: &str, value: &Value) -> Result<usize, RuntimeFailure> {
    let n = value.as_number()?.trunc();
    if n < 0.0 {
        return Err(RuntimeFailure::illegal_parameter(format!(
            "{name} length {} is negative",
            format_number(n)
        )));
    }
    Ok(n as usize)
}

/// `VAL` semantics: the longest numeric prefix, or 0.
fn parse_leading_number(text: &str) -> f64 {
    let trimmed = text.trim_start();
    let mut best = 0.0;
    for (index, ch) in trimmed.char_indices() {
        if !matches!(ch, '+' | '-' | '.' | 'e' | 'E' | '0'..='9') {
            break;
        }
        if let Ok(n) = trimmed[..index + ch.len_utf8()].parse::<f64>() {
            if n.is_finite() {
                best = n;
            }
        }
    }
    best
}
