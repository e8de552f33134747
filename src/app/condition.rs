//! Conditions and the matcher that picks the first one an event satisfies.

use super::action::DeclaredAction;
use super::context::Environment;
use super::event::DrilldownEvent;
use serde_json::Value;
use tracing::{error, warn};

/// Attribute name marking a condition whose value is an expression.
pub const MATCH_ATTR: &str = "match";
/// Condition value that matches every event.
pub const WILDCARD: &str = "*";

#[derive(Debug, Clone, PartialEq)]
pub enum ConditionTest {
    /// `value: "*"`
    Any,
    /// `attr: "match"`, value is an expression.
    Expr(String),
    /// Compare `event[attr]` with `value`.
    Attr { attr: String, value: String },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Condition {
    pub test: ConditionTest,
    pub actions: Vec<DeclaredAction>,
}

impl Condition {
    pub fn any<I, A>(actions: I) -> Self
    where
        I: IntoIterator<Item = A>,
        A: Into<DeclaredAction>,
    {
        Self {
            test: ConditionTest::Any,
            actions: actions.into_iter().map(Into::into).collect(),
        }
    }

    pub fn expr<I, A>(expr: impl Into<String>, actions: I) -> Self
    where
        I: IntoIterator<Item = A>,
        A: Into<DeclaredAction>,
    {
        Self {
            test: ConditionTest::Expr(expr.into()),
            actions: actions.into_iter().map(Into::into).collect(),
        }
    }

    pub fn attr<I, A>(attr: impl Into<String>, value: impl Into<String>, actions: I) -> Self
    where
        I: IntoIterator<Item = A>,
        A: Into<DeclaredAction>,
    {
        let attr = attr.into();
        let value = value.into();
        let test = if attr == MATCH_ATTR {
            ConditionTest::Expr(value)
        } else if value == WILDCARD {
            ConditionTest::Any
        } else {
            ConditionTest::Attr { attr, value }
        };
        Self {
            test,
            actions: actions.into_iter().map(Into::into).collect(),
        }
    }
}

/// Decides whether conditions match events.
pub struct Matcher<'a> {
    env: &'a Environment,
}

impl<'a> Matcher<'a> {
    pub fn new(env: &'a Environment) -> Self {
        Self { env }
    }

    /// The first condition, in declaration order, that matches `event`.
    /// Conditions after it are never evaluated.
    pub fn first_match<'c>(
        &self,
        conditions: &'c [Condition],
        event: &DrilldownEvent,
    ) -> Option<(usize, &'c Condition)> {
        conditions
            .iter()
            .enumerate()
            .find(|(_, condition)| self.matches(condition, event))
    }

    pub fn matches(&self, condition: &Condition, event: &DrilldownEvent) -> bool {
        match &condition.test {
            ConditionTest::Expr(expr) => self.expression_matches(expr, event),
            ConditionTest::Any => true,
            ConditionTest::Attr { attr, value } => match event.attribute(attr) {
                Some(Value::Array(items)) => list_matches(items, value),
                Some(actual) => scalar_matches(actual, value),
                None => false,
            },
        }
    }

    fn expression_matches(&self, expr: &str, event: &DrilldownEvent) -> bool {
        let source = self.env.value_source(event, event.data.first());
        match self.env.evaluator.evaluate(expr, &source) {
            Ok(Value::Bool(b)) => b,
            Ok(other) => {
                warn!(expr, result = %other, "eval expression for condition did not return a boolean value");
                false
            }
            Err(e) => {
                error!(expr, error = %e, "error executing eval expression for condition");
                false
            }
        }
    }
}

/// Unordered, duplicate-sensitive comparison of a list attribute against a
/// comma-separated expectation such as `"a, b"`.
///
/// Only string items can match. Values that themselves contain commas cannot
/// be expressed and will never match; the comma always splits.
pub fn list_matches(actual: &[Value], expected: &str) -> bool {
    let Some(mut actual) = actual
        .iter()
        .map(Value::as_str)
        .collect::<Option<Vec<&str>>>()
    else {
        return false;
    };
    let mut expected: Vec<&str> = expected.split(',').map(str::trim).collect();
    actual.sort_unstable();
    expected.sort_unstable();
    actual == expected
}

/// Strict equality: a number or bool never equals its text.
fn scalar_matches(actual: &Value, expected: &str) -> bool {
    actual.as_str() == Some(expected)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::action::Action;
    use crate::binding::Components;
    use crate::error::EvalError;
    use crate::navigation::RecordingNavigator;
    use crate::tokens::{TokenScopes, ValueSource};
    use serde_json::json;
    use std::cell::Cell;
    use std::rc::Rc;

    fn env_with<F>(eval: F) -> Environment
    where
        F: Fn(&str, &ValueSource) -> Result<Value, EvalError> + 'static,
    {
        Environment::new(
            Rc::new(Components::new()),
            TokenScopes::in_memory(),
            Rc::new(eval),
            Rc::new(RecordingNavigator::new()),
        )
    }

    fn env() -> Environment {
        env_with(|_: &str, _: &ValueSource| Err(EvalError::Other("no evaluator".into())))
    }

    fn event(attrs: Value) -> DrilldownEvent {
        let mut e = DrilldownEvent::default();
        e.attributes = attrs.as_object().cloned().unwrap_or_default();
        e
    }

    fn noop() -> Vec<Action> {
        vec![Action::unset("x")]
    }

    #[test]
    fn test_wildcard_always_matches() {
        let env = env();
        let m = Matcher::new(&env);
        let cond = Condition::any(noop());
        assert!(m.matches(&cond, &DrilldownEvent::default()));
        assert!(m.matches(&cond, &event(json!({"name": ["x"], "other": null}))));
        assert!(m.matches(&Condition::attr("name", "*", noop()), &event(json!({}))));
    }

    #[test]
    fn test_scalar_equality() {
        let env = env();
        let m = Matcher::new(&env);
        let cond = Condition::attr("name", "Save", noop());
        assert!(m.matches(&cond, &event(json!({"name": "Save"}))));
        assert!(!m.matches(&cond, &event(json!({"name": "save"}))));
        assert!(!m.matches(&cond, &event(json!({}))));
        assert!(m.matches(&Condition::attr("n", "5", noop()), &event(json!({"n": "5"}))));
        assert!(!m.matches(&Condition::attr("n", "", noop()), &event(json!({"n": null}))));
    }

    #[test]
    fn test_numbers_and_bools_never_equal_their_text() {
        let env = env();
        let m = Matcher::new(&env);
        assert!(!m.matches(&Condition::attr("n", "5", noop()), &event(json!({"n": 5}))));
        assert!(!m.matches(&Condition::attr("b", "true", noop()), &event(json!({"b": true}))));
        let items = json!([1, "2"]).as_array().cloned().unwrap();
        assert!(!list_matches(&items, "1,2"));
    }

    #[test]
    fn test_list_match_is_order_insensitive_and_multiset_sensitive() {
        let items = |v: Value| v.as_array().cloned().unwrap();
        assert!(list_matches(&items(json!(["a", "b"])), "b,a"));
        assert!(list_matches(&items(json!(["a", "b"])), " b , a "));
        assert!(!list_matches(&items(json!(["a", "a"])), "a,b"));
        assert!(!list_matches(&items(json!(["a", "b", "a"])), "a,b"));
        assert!(list_matches(&items(json!(["b", "a", "a"])), "a,a,b"));
        assert!(list_matches(&items(json!([""])), ""));
    }

    #[test]
    fn test_list_match_leaves_event_untouched() {
        let env = env();
        let m = Matcher::new(&env);
        let e = event(json!({"series": ["z", "y", "x"]}));
        assert!(m.matches(&Condition::attr("series", "x,y,z", noop()), &e));
        assert_eq!(e.attribute("series"), Some(&json!(["z", "y", "x"])));
    }

    #[test]
    fn test_values_with_commas_are_split() {
        // A single value containing a comma is read as two expected values.
        let items = json!(["a,b"]).as_array().cloned().unwrap();
        assert!(!list_matches(&items, "a,b"));
        let items = json!(["a", "b"]).as_array().cloned().unwrap();
        assert!(list_matches(&items, "a,b"));
    }

    #[test]
    fn test_expression_conditions() {
        let env = env_with(|expr: &str, source: &ValueSource| match expr {
            "yes" => Ok(json!(true)),
            "no" => Ok(json!(false)),
            "host" => Ok(source.get("host").cloned().unwrap_or(Value::Null)),
            _ => Err(EvalError::Other("boom".into())),
        });
        env.tokens.apply("host", "from-token".into(), true);
        let m = Matcher::new(&env);
        let e = DrilldownEvent::default();
        assert!(m.matches(&Condition::expr("yes", noop()), &e));
        assert!(!m.matches(&Condition::expr("no", noop()), &e));
        assert!(!m.matches(&Condition::expr("explode", noop()), &e));
        // Only a boolean `true` matches; other values never do.
        assert!(!m.matches(&Condition::expr("host", noop()), &e));
        let conditions = vec![
            Condition::expr("host", noop()),
            Condition::expr("yes", noop()),
        ];
        assert_eq!(m.first_match(&conditions, &e).map(|(i, _)| i), Some(1));
        // `match` wins over the wildcard value.
        assert!(!m.matches(&Condition::attr("match", "no", noop()), &e));
    }

    #[test]
    fn test_first_match_short_circuits() {
        let calls = Rc::new(Cell::new(0));
        let c = calls.clone();
        let env = env_with(move |_: &str, _: &ValueSource| {
            c.set(c.get() + 1);
            Err(EvalError::Other("must not run".into()))
        });
        let m = Matcher::new(&env);
        let conditions = vec![Condition::any(noop()), Condition::expr("anything", noop())];
        let (index, _) = m.first_match(&conditions, &DrilldownEvent::default()).unwrap();
        assert_eq!(index, 0);
        assert_eq!(calls.get(), 0);
    }

    #[test]
    fn test_catch_all_acts_as_else_branch() {
        let env = env();
        let m = Matcher::new(&env);
        let conditions = vec![
            Condition::attr("name", "Save", noop()),
            Condition::any(noop()),
        ];
        let save = event(json!({"name": "Save"}));
        let cancel = event(json!({"name": "Cancel"}));
        assert_eq!(m.first_match(&conditions, &save).map(|(i, _)| i), Some(0));
        assert_eq!(m.first_match(&conditions, &cancel).map(|(i, _)| i), Some(1));
        assert!(m.first_match(&conditions[..1], &cancel).is_none());
    }
}
