//! Runtime values and their static types.

use std::fmt;

use crate::diagnostic::RuntimeFailure;

/// The two value types of the language.
///
/// A name ending in `$` holds a string, every other name a number.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueType {
    Number,
    Str,
}

impl ValueType {
    pub fn of_name(name: &str) -> Self {
        if name.ends_with('$') {
            ValueType::Str
        } else {
            ValueType::Number
        }
    }

    pub fn describe(self) -> &'static str {
        match self {
            ValueType::Number => "numeric",
            ValueType::Str => "string",
        }
    }

    pub fn default_value(self) -> Value {
        match self {
            ValueType::Number => Value::Number(0.0),
            ValueType::Str => Value::Str(String::new()),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Number(f64),
    Str(String),
}

impl Value {
    pub fn as_number(&self) -> Result<f64, RuntimeFailure> {
        match self {
            Value::Number(n) => Ok(*n),
            Value::Str(_) => Err(RuntimeFailure::type_mismatch(
                "numeric value expected, found string",
            )),
        }
    }

    pub fn as_str(&self) -> Result<&str, RuntimeFailure> {
        match self {
            Value::Str(s) => Ok(s),
            Value::Number(_) => Err(RuntimeFailure::type_mismatch(
                "string value expected, found number",
            )),
        }
    }

    pub fn from_bool(value: bool) -> Self {
        Value::Number(if value { -1.0 } else { 0.0 })
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Number(n) => write!(f, "{}", format_number(*n)),
            Value::Str(s) => f.write_str(s),
        }
    }
}

/// Formats a number the way `PRINT` and `STR$` show it.
pub fn format_number(n: f64) -> String {
    if n == 0.0 {
        // avoids "-0"
        return "0".to_string();
    }
    format!("{n}")
}

/// Checks an arithmetic result before it is stored anywhere.
pub fn finite(n: f64, what: &str) -> Result<f64, RuntimeFailure> {
    if n.is_nan() {
        Err(RuntimeFailure::illegal_parameter(format!(
            "{what} has no numeric result"
        )))
    } else if n.is_infinite() {
        Err(RuntimeFailure::out_of_range(format!("{what} overflows")))
    } else {
        Ok(n)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostic::RuntimeErrorCode;

    #[test]
    fn sigil_decides_the_type() {
        assert_eq!(ValueType::of_name("A$"), ValueType::Str);
        assert_eq!(ValueType::of_name("A1"), ValueType::Number);
    }

    #[test]
    fn formats_numbers_without_trailing_zeros() {
        assert_eq!(Value::Number(3.0).to_string(), "3");
        assert_eq!(Value::Number(-0.0).to_string(), "0");
        assert_eq!(Value::Number(2.5).to_string(), "2.5");
    }

    #[test]
    fn classifies_non_finite_results() {
        let nan = finite(f64::NAN, "SQR").unwrap_err();
        assert_eq!(nan.code(), RuntimeErrorCode::IllegalParameter);
        let inf = finite(f64::INFINITY, "*").unwrap_err();
        assert_eq!(inf.code(), RuntimeErrorCode::ValueOutOfRange);
    }
}
