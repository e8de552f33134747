//! Handler definitions: the JSON shape dashboards declare drilldowns in, and
//! its conversion into the typed model.

use crate::app::action::{Action, DeclaredAction};
use crate::app::condition::{Condition, MATCH_ATTR, WILDCARD};
use crate::error::ConfigError;
use crate::tokens::render_value;
use serde::Deserialize;
use serde_json::{Map, Value};
use tracing::warn;

/// Validated configuration of one event handler.
#[derive(Debug, Clone, PartialEq)]
pub struct HandlerConfig {
    pub component_id: Option<String>,
    pub event: String,
    pub conditions: Vec<Condition>,
    /// Default window for `link` actions.
    pub target: Option<String>,
}

impl HandlerConfig {
    pub fn new(event: impl Into<String>) -> Self {
        Self {
            component_id: None,
            event: event.into(),
            conditions: Vec::new(),
            target: None,
        }
    }

    pub fn component(mut self, id: impl Into<String>) -> Self {
        self.component_id = Some(id.into());
        self
    }

    pub fn condition(mut self, condition: Condition) -> Self {
        self.conditions.push(condition);
        self
    }

    pub fn target(mut self, target: impl Into<String>) -> Self {
        self.target = Some(target.into());
        self
    }

    /// Check the invariants a handler is built on. Conditions without actions
    /// are dropped.
    pub fn validate(mut self) -> Result<Self, ConfigError> {
        if self.event.trim().is_empty() {
            return Err(ConfigError::MissingEventName);
        }
        let mut index = 0;
        self.conditions.retain(|condition| {
            index += 1;
            if condition.actions.is_empty() {
                warn!(event = %self.event, condition = index - 1, "dropping condition without actions");
                false
            } else {
                true
            }
        });
        Ok(self)
    }

    /// Parse a JSON handler definition.
    pub fn from_value(value: &Value) -> Result<Self, ConfigError> {
        let raw = RawHandler::deserialize(value).map_err(|e| ConfigError::Malformed(e.to_string()))?;
        raw.into_config()
    }

    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        let value: Value =
            serde_json::from_str(text).map_err(|e| ConfigError::Malformed(e.to_string()))?;
        Self::from_value(&value)
    }
}

/// Turns a flat action list into conditions: matching actions get a
/// condition of their own, the rest share a trailing catch-all.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ImplicitRules {
    /// Attribute the generated conditions test.
    pub attr: String,
    /// Action types eligible for their own condition.
    #[serde(default)]
    pub actions: Vec<String>,
    /// Action fields holding the condition value, checked in order.
    #[serde(default)]
    pub attributes: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct RawHandler {
    #[serde(alias = "viewid")]
    component: Option<String>,
    event: Option<String>,
    target: Option<String>,
    conditions: Option<Vec<RawCondition>>,
    actions: Option<Vec<Value>>,
    implicit: Option<ImplicitRules>,
}

#[derive(Debug, Deserialize)]
struct RawCondition {
    attr: Option<String>,
    value: Option<Value>,
    #[serde(default)]
    actions: Vec<Value>,
}

impl RawHandler {
    fn into_config(self) -> Result<HandlerConfig, ConfigError> {
        let event = match self.event {
            Some(event) if !event.trim().is_empty() => event,
            _ => return Err(ConfigError::MissingEventName),
        };

        let conditions = match (self.conditions, self.actions) {
            (Some(_), Some(_)) => return Err(ConfigError::MixedConditions),
            (Some(conditions), None) => conditions
                .into_iter()
                .enumerate()
                .map(|(index, raw)| raw.into_condition(index))
                .collect::<Result<Vec<_>, _>>()?,
            (None, Some(actions)) => implicit_conditions(&actions, self.implicit.as_ref())?,
            (None, None) => Vec::new(),
        };

        HandlerConfig {
            component_id: self.component,
            event,
            conditions,
            target: self.target,
        }
        .validate()
    }
}

impl RawCondition {
    fn into_condition(self, index: usize) -> Result<Condition, ConfigError> {
        let value = match &self.value {
            Some(Value::Null) | None => return Err(ConfigError::MissingConditionValue { index }),
            Some(value) => render_value(value),
        };
        let actions = parse_actions(&self.actions)?;
        match self.attr {
            Some(attr) if attr == MATCH_ATTR => Ok(Condition::expr(value, actions)),
            Some(attr) if !attr.is_empty() => Ok(Condition::attr(attr, value, actions)),
            _ if value == WILDCARD => Ok(Condition::any(actions)),
            _ => Err(ConfigError::MissingConditionAttr { index, value }),
        }
    }
}

fn implicit_conditions(
    actions: &[Value],
    rules: Option<&ImplicitRules>,
) -> Result<Vec<Condition>, ConfigError> {
    let Some(rules) = rules else {
        return Ok(vec![Condition::any(parse_actions(actions)?)]);
    };

    let mut conditions = Vec::new();
    let mut rest = Vec::new();
    for raw in actions {
        let action = parse_action(raw)?;
        let fields = raw.as_object();
        let kind = fields.and_then(|f| f.get("type")).and_then(Value::as_str);
        let condition_value = kind
            .filter(|kind| rules.actions.iter().any(|a| a == kind))
            .and_then(|_| {
                rules.attributes.iter().find_map(|name| match fields?.get(name) {
                    Some(Value::Null) | None => None,
                    Some(v) => Some(render_value(v)),
                })
            });
        match condition_value {
            Some(value) => conditions.push(Condition::attr(rules.attr.as_str(), value, [action])),
            None => rest.push(action),
        }
    }
    if !rest.is_empty() {
        conditions.push(Condition::any(rest));
    }
    Ok(conditions)
}

fn parse_actions(raw: &[Value]) -> Result<Vec<DeclaredAction>, ConfigError> {
    raw.iter().map(parse_action).collect()
}

/// Parse one action object. Unknown types are kept and fail when executed.
pub fn parse_action(raw: &Value) -> Result<DeclaredAction, ConfigError> {
    let fields = raw
        .as_object()
        .ok_or_else(|| ConfigError::ActionNotAnObject(raw.to_string()))?;
    let kind = fields
        .get("type")
        .and_then(Value::as_str)
        .ok_or_else(|| ConfigError::MissingActionType(raw.to_string()))?;

    let action = match kind {
        "set" => Action::Set {
            token: required(fields, "set", "token")?,
            value: required(fields, "set", "value")?,
            delimiter: optional(fields, "set", "delimiter")?,
            prefix: optional(fields, "set", "prefix")?,
            suffix: optional(fields, "set", "suffix")?,
            submit: submit_flag(fields, "set")?,
        },
        "unset" => Action::Unset {
            token: required(fields, "unset", "token")?,
            submit: submit_flag(fields, "unset")?,
        },
        "link" => Action::Link {
            value: required(fields, "link", "value")?,
            target: optional(fields, "link", "target")?,
        },
        "eval" => Action::Eval {
            token: required(fields, "eval", "token")?,
            value: required(fields, "eval", "value")?,
            submit: submit_flag(fields, "eval")?,
        },
        other => return Ok(DeclaredAction::Unrecognized(other.to_string())),
    };
    Ok(DeclaredAction::Known(action))
}

fn required(
    fields: &Map<String, Value>,
    kind: &'static str,
    field: &'static str,
) -> Result<String, ConfigError> {
    optional(fields, kind, field)?.ok_or(ConfigError::MissingActionField { kind, field })
}

fn optional(
    fields: &Map<String, Value>,
    kind: &'static str,
    field: &'static str,
) -> Result<Option<String>, ConfigError> {
    match fields.get(field) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.clone())),
        Some(v @ (Value::Number(_) | Value::Bool(_))) => Ok(Some(render_value(v))),
        Some(_) => Err(ConfigError::InvalidActionField {
            kind,
            field,
            expected: "a string",
        }),
    }
}

fn submit_flag(fields: &Map<String, Value>, kind: &'static str) -> Result<bool, ConfigError> {
    match fields.get("submit") {
        None | Some(Value::Null) => Ok(true),
        Some(Value::Bool(b)) => Ok(*b),
        Some(Value::String(s)) if s.eq_ignore_ascii_case("true") => Ok(true),
        Some(Value::String(s)) if s.eq_ignore_ascii_case("false") => Ok(false),
        Some(_) => Err(ConfigError::InvalidActionField {
            kind,
            field: "submit",
            expected: "a boolean",
        }),
    }
}
