//! Value sources: the merged view of tokens and event fields that templates
//! and expressions read from.

use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// A row of event fields, e.g. `{"click.name": "host", "click.value": "web01"}`.
pub type Fields = Map<String, Value>;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ValueSource {
    values: Fields,
}

impl ValueSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from a set of string tokens.
    pub fn from_tokens(tokens: BTreeMap<String, String>) -> Self {
        Self {
            values: tokens
                .into_iter()
                .map(|(k, v)| (k, Value::String(v)))
                .collect(),
        }
    }

    /// Overlay event fields; fields shadow tokens of the same name.
    pub fn with_fields(mut self, fields: &Fields) -> Self {
        for (k, v) in fields {
            self.values.insert(k.clone(), v.clone());
        }
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.values.insert(name.into(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }

    /// String form of `name`, or `None` if the source has no such entry.
    pub fn render(&self, name: &str) -> Option<String> {
        self.values.get(name).map(render_value)
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl From<Fields> for ValueSource {
    fn from(values: Fields) -> Self {
        Self { values }
    }
}

/// String form of a field value as it appears in a resolved template.
pub fn render_value(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::Array(items) => items.iter().map(render_value).collect::<Vec<_>>().join(","),
        Value::Object(_) => value.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_fields_shadow_tokens() {
        let mut tokens = BTreeMap::new();
        tokens.insert("host".to_string(), "token-host".to_string());
        tokens.insert("env".to_string(), "prod".to_string());
        let fields = json!({"host": "web01"}).as_object().cloned().unwrap();

        let source = ValueSource::from_tokens(tokens).with_fields(&fields);
        assert_eq!(source.render("host").as_deref(), Some("web01"));
        assert_eq!(source.render("env").as_deref(), Some("prod"));
        assert_eq!(source.render("missing"), None);
    }

    #[test]
    fn test_render_value() {
        assert_eq!(render_value(&json!(null)), "");
        assert_eq!(render_value(&json!(42)), "42");
        assert_eq!(render_value(&json!(1.5)), "1.5");
        assert_eq!(render_value(&json!(true)), "true");
        assert_eq!(render_value(&json!(["a", "b", 3])), "a,b,3");
    }
}
