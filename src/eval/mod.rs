//! Expression evaluation contract.
//!
//! The engine only calls [`ExpressionEvaluator::evaluate`]; which language
//! sits behind it is up to the host. [`BasicEvaluator`] covers the common
//! comparison and string functions used by drilldown conditions.

mod basic;

pub use basic::BasicEvaluator;

use crate::error::EvalError;
use crate::tokens::ValueSource;
use serde_json::Value;

pub trait ExpressionEvaluator {
    fn evaluate(&self, expr: &str, source: &ValueSource) -> Result<Value, EvalError>;
}

impl<F> ExpressionEvaluator for F
where
    F: Fn(&str, &ValueSource) -> Result<Value, EvalError>,
{
    fn evaluate(&self, expr: &str, source: &ValueSource) -> Result<Value, EvalError> {
        self(expr, source)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_closure_is_an_evaluator() {
        let eval = |expr: &str, _: &ValueSource| -> Result<Value, EvalError> {
            Ok(Value::String(expr.to_uppercase()))
        };
        assert_eq!(eval.evaluate("abc", &ValueSource::new()), Ok(json!("ABC")));
    }
}
