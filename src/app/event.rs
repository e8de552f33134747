use crate::tokens::Fields;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::cell::Cell;

/// Modifier keys of the browser event that triggered a drilldown.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Modifiers {
    #[serde(default)]
    pub meta: bool,
    #[serde(default)]
    pub ctrl: bool,
}

impl Modifiers {
    /// Meta/ctrl-click opens links in a new window.
    pub fn wants_new_window(&self) -> bool {
        self.meta || self.ctrl
    }
}

/// Event payload: one row of fields, or several for multi-select events.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Payload {
    Rows(Vec<Fields>),
    Row(Fields),
}

impl Default for Payload {
    fn default() -> Self {
        Payload::Row(Fields::new())
    }
}

impl Payload {
    /// The row used when only one is wanted.
    pub fn first(&self) -> Option<&Fields> {
        match self {
            Payload::Row(row) => Some(row),
            Payload::Rows(rows) => rows.first(),
        }
    }

    pub fn is_list(&self) -> bool {
        matches!(self, Payload::Rows(_))
    }
}

impl From<Fields> for Payload {
    fn from(row: Fields) -> Self {
        Payload::Row(row)
    }
}

impl From<Vec<Fields>> for Payload {
    fn from(rows: Vec<Fields>) -> Self {
        Payload::Rows(rows)
    }
}

/// An event emitted by a dashboard component (click, selection change, ...).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DrilldownEvent {
    /// Top-level event attributes conditions can test (`name`, `field`, ...).
    pub attributes: Fields,
    pub data: Payload,
    /// Modifiers of the originating browser event, if there was one.
    pub original: Option<Modifiers>,
    default_prevented: Cell<bool>,
}

impl DrilldownEvent {
    pub fn new(data: impl Into<Payload>) -> Self {
        Self {
            data: data.into(),
            ..Default::default()
        }
    }

    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }

    pub fn with_original(mut self, modifiers: Modifiers) -> Self {
        self.original = Some(modifiers);
        self
    }

    /// Attribute lookup for conditions: explicit attributes first, then the
    /// fields of the first payload row.
    pub fn attribute(&self, name: &str) -> Option<&Value> {
        self.attributes
            .get(name)
            .or_else(|| self.data.first().and_then(|row| row.get(name)))
    }

    pub fn prevent_default(&self) {
        self.default_prevented.set(true);
    }

    pub fn default_prevented(&self) -> bool {
        self.default_prevented.get()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn row(v: Value) -> Fields {
        v.as_object().cloned().unwrap()
    }

    #[test]
    fn test_attribute_falls_back_to_payload() {
        let event = DrilldownEvent::new(row(json!({"name": "Save", "x": 1})))
            .with_attribute("name", "Override");
        assert_eq!(event.attribute("name"), Some(&json!("Override")));
        assert_eq!(event.attribute("x"), Some(&json!(1)));
        assert_eq!(event.attribute("missing"), None);
    }

    #[test]
    fn test_payload_deserializes_row_or_rows() {
        let one: Payload = serde_json::from_value(json!({"a": "1"})).unwrap();
        assert!(!one.is_list());
        let many: Payload = serde_json::from_value(json!([{"a": "1"}, {"a": "2"}])).unwrap();
        assert!(many.is_list());
        assert_eq!(many.first().and_then(|r| r.get("a")), Some(&json!("1")));
        assert_eq!(Payload::Rows(vec![]).first(), None);
    }

    #[test]
    fn test_prevent_default_through_shared_ref() {
        let event = DrilldownEvent::default();
        assert!(!event.default_prevented());
        event.prevent_default();
        assert!(event.default_prevented());
    }
}
