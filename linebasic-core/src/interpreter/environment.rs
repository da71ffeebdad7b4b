use std::collections::HashMap;

use crate::diagnostic::{RuntimeErrorCode, RuntimeFailure};
use crate::value::{Value, ValueType, format_number};

/// Upper limit on the number of cells a single array may hold.
const MAX_ARRAY_CELLS: usize = 1 << 20;

#[derive(Debug)]
struct Array {
    bounds: Vec<usize>,
    cells: Vec<Value>,
}

/// Scalar variables and dimensioned arrays of one run.
#[derive(Debug, Default)]
pub(super) struct Environment {
    scalars: HashMap<String, Value>,
    arrays: HashMap<String, Array>,
}

impl Environment {
    pub(super) fn new() -> Self {
        Environment::default()
    }

    /// Unassigned variables read as `0` or `""`.
    pub(super) fn get(&self, name: &str) -> Value {
        self.scalars
            .get(name)
            .cloned()
            .unwrap_or_else(|| ValueType::of_name(name).default_value())
    }

    pub(super) fn set(&mut self, name: &str, value: Value) {
        self.scalars.insert(name.to_string(), value);
    }

    /// Binds a function parameter, returning what it shadows.
    pub(super) fn bind(&mut self, name: &str, value: Value) -> Option<Value> {
        self.scalars.insert(name.to_string(), value)
    }

    pub(super) fn restore(&mut self, name: &str, previous: Option<Value>) {
        match previous {
            Some(value) => {
                self.scalars.insert(name.to_string(), value);
            }
            None => {
                self.scalars.remove(name);
            }
        }
    }

    pub(super) fn dim(&mut self, name: &str, bounds: &[f64]) -> Result<(), RuntimeFailure> {
        let mut upper = Vec::with_capacity(bounds.len());
        let mut cells: usize = 1;
        for &bound in bounds {
            let bound = bound.trunc();
            if bound < 0.0 {
                return Err(RuntimeFailure::illegal_parameter(format!(
                    "array {name} has negative bound {}",
                    format_number(bound)
                )));
            }
            let size = (bound + 1.0).min(MAX_ARRAY_CELLS as f64 + 1.0) as usize;
            cells = cells
                .checked_mul(size)
                .filter(|&total| total <= MAX_ARRAY_CELLS)
                .ok_or_else(|| {
                    RuntimeFailure::out_of_range(format!(
                        "array {name} would exceed {MAX_ARRAY_CELLS} elements"
                    ))
                })?;
            upper.push(bound as usize);
        }
        let fill = ValueType::of_name(name).default_value();
        self.arrays.insert(
            name.to_string(),
            Array {
                bounds: upper,
                cells: vec![fill; cells],
            },
        );
        Ok(())
    }

    pub(super) fn element(&self, name: &str, subscripts: &[f64]) -> Result<Value, RuntimeFailure> {
        let (array, offset) = self.locate(name, subscripts)?;
        Ok(array.cells[offset].clone())
    }

    pub(super) fn set_element(
        &mut self,
        name: &str,
        subscripts: &[f64],
        value: Value,
    ) -> Result<(), RuntimeFailure> {
        let (_, offset) = self.locate(name, subscripts)?;
        if let Some(array) = self.arrays.get_mut(name) {
            array.cells[offset] = value;
        }
        Ok(())
    }

    fn locate(&self, name: &str, subscripts: &[f64]) -> Result<(&Array, usize), RuntimeFailure> {
        let array = self.arrays.get(name).ok_or_else(|| {
            RuntimeFailure::new(
                RuntimeErrorCode::ArrayIndexOutOfBounds,
                format!("array {name} is not dimensioned"),
            )
        })?;
        if subscripts.len() != array.bounds.len() {
            return Err(RuntimeFailure::new(
                RuntimeErrorCode::ArrayIndexOutOfBounds,
                format!(
                    "array {name} has {} dimensions, {} subscripts given",
                    array.bounds.len(),
                    subscripts.len()
                ),
            ));
        }
        let mut offset = 0;
        for (&subscript, &bound) in subscripts.iter().zip(&array.bounds) {
            let index = subscript.trunc();
            if index < 0.0 || index > bound as f64 {
                return Err(RuntimeFailure::new(
                    RuntimeErrorCode::ArrayIndexOutOfBounds,
                    format!(
                        "subscript {} of {name} is outside 0..{bound}",
                        format_number(index)
                    ),
                ));
            }
            offset = offset * (bound + 1) + index as usize;
        }
        Ok((array, offset))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_defaults_by_sigil() {
        let env = Environment::new();
        assert_eq!(env.get("X"), Value::Number(0.0));
        assert_eq!(env.get("X$"), Value::Str(String::new()));
    }

    #[test]
    fn stores_multi_dimensional_elements() {
        let mut env = Environment::new();
        env.dim("M", &[2.0, 3.0]).expect("dim");
        env.set_element("M", &[1.0, 2.0], Value::Number(7.0))
            .expect("store");
        assert_eq!(env.element("M", &[1.0, 2.0]), Ok(Value::Number(7.0)));
        assert_eq!(env.element("M", &[2.0, 1.0]), Ok(Value::Number(0.0)));
    }

    #[test]
    fn rejects_out_of_bounds_subscripts() {
        let mut env = Environment::new();
        env.dim("A", &[10.0]).expect("dim");
        let err = env.element("A", &[11.0]).unwrap_err();
        assert_eq!(err.code(), RuntimeErrorCode::ArrayIndexOutOfBounds);
        assert_eq!(err.message(), "subscript 11 of A is outside 0..10");
        let err = env.element("B", &[0.0]).unwrap_err();
        assert_eq!(err.code(), RuntimeErrorCode::ArrayIndexOutOfBounds);
    }

    #[test]
    fn rejects_bad_dimensions() {
        let mut env = Environment::new();
        let negative = env.dim("A", &[-1.0]).unwrap_err();
        assert_eq!(negative.code(), RuntimeErrorCode::IllegalParameter);
        let huge = env.dim("B", &[1e9, 1e9]).unwrap_err();
        assert_eq!(huge.code(), RuntimeErrorCode::ValueOutOfRange);
    }

    #[test]
    fn restores_shadowed_parameters() {
        let mut env = Environment::new();
        env.set("X", Value::Number(1.0));
        let previous = env.bind("X", Value::Number(5.0));
        assert_eq!(env.get("X"), Value::Number(5.0));
        env.restore("X", previous);
        assert_eq!(env.get("X"), Value::Number(1.0));
        let previous = env.bind("Y", Value::Number(2.0));
        env.restore("Y", previous);
        assert_eq!(env.get("Y"), Value::Number(0.0));
    }
}
