//! Error types shared across the drilldown engine.
//!
//! Configuration problems are fatal when a handler is built. Everything that
//! can go wrong while an event is being dispatched is scoped to the single
//! action that failed and reported through [`DrilldownError`].

use thiserror::Error;

/// A handler definition that the engine refuses to build.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("No event name specified for event handler instance")]
    MissingEventName,

    #[error("Condition #{index} has no attribute and its value {value:?} is not \"*\"")]
    MissingConditionAttr { index: usize, value: String },

    #[error("Condition #{index} is missing its value")]
    MissingConditionValue { index: usize },

    #[error("Drilldown action must be an object, got {0}")]
    ActionNotAnObject(String),

    #[error("Drilldown action has no type: {0}")]
    MissingActionType(String),

    #[error("`{kind}` action is missing required field `{field}`")]
    MissingActionField { kind: &'static str, field: &'static str },

    #[error("Field `{field}` of `{kind}` action must be {expected}")]
    InvalidActionField {
        kind: &'static str,
        field: &'static str,
        expected: &'static str,
    },

    #[error("Cannot mix top-level actions with explicit conditions")]
    MixedConditions,

    #[error("Malformed handler definition: {0}")]
    Malformed(String),
}

/// Failure reported by an expression evaluator.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EvalError {
    #[error("Syntax error at offset {offset}: {message}")]
    Syntax { offset: usize, message: String },

    #[error("Unknown function `{0}`")]
    UnknownFunction(String),

    #[error("Function `{name}` expects {expected} argument(s), got {got}")]
    Arity {
        name: String,
        expected: String,
        got: usize,
    },

    #[error("Type error: {0}")]
    Type(String),

    #[error("{0}")]
    Other(String),
}

/// Error raised while executing a single drilldown action.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DrilldownError {
    #[error("Invalid drilldown action type {0:?}")]
    UnknownAction(String),

    #[error("Error executing eval expression {expr}: {source}")]
    Eval {
        expr: String,
        #[source]
        source: EvalError,
    },
}
