//! Executes the actions of a matched condition.

use super::action::{Action, DeclaredAction};
use super::context::Environment;
use super::event::{DrilldownEvent, Payload};
use super::state::Effect;
use crate::error::DrilldownError;
use crate::navigation::rewrite_link;
use crate::tokens::{render_value, resolve_with_filters, Escaper, Fields};
use tracing::debug;

pub struct Executor<'a> {
    env: &'a Environment,
    /// Window the owning handler navigates in when an action names none.
    target: Option<&'a str>,
}

impl<'a> Executor<'a> {
    pub fn new(env: &'a Environment, target: Option<&'a str>) -> Self {
        Self { env, target }
    }

    /// Run one action against `event`. Tokens and navigation are changed
    /// through the environment; the returned effect describes what was done.
    pub fn execute(
        &self,
        action: &DeclaredAction,
        event: &DrilldownEvent,
    ) -> Result<Effect, DrilldownError> {
        let action = match action {
            DeclaredAction::Known(action) => action,
            DeclaredAction::Unrecognized(kind) => {
                return Err(DrilldownError::UnknownAction(kind.clone()))
            }
        };
        debug!(kind = action.kind(), "executing drilldown action");

        let effect = match action {
            Action::Set {
                token,
                value,
                delimiter,
                prefix,
                suffix,
                submit,
            } => {
                let mut resolved = match (delimiter, &event.data) {
                    (Some(delimiter), Payload::Rows(rows)) => rows
                        .iter()
                        .map(|row| self.resolve(value, event, Some(row), Escaper::None))
                        .collect::<Vec<_>>()
                        .join(delimiter),
                    _ => self.resolve(value, event, event.data.first(), Escaper::None),
                };
                if prefix.is_some() || suffix.is_some() {
                    resolved = format!(
                        "{}{}{}",
                        prefix.as_deref().unwrap_or_default(),
                        resolved,
                        suffix.as_deref().unwrap_or_default()
                    );
                }
                self.write(token, resolved, *submit)
            }
            Action::Unset { token, submit } => {
                let submitted = *submit && self.env.tokens.submitted.is_some();
                self.env.tokens.remove(token, *submit);
                Effect::TokenUnset {
                    token: token.clone(),
                    submitted,
                }
            }
            Action::Eval {
                token,
                value,
                submit,
            } => {
                let source = self.env.value_source(event, event.data.first());
                let result = self
                    .env
                    .evaluator
                    .evaluate(value, &source)
                    .map_err(|source| DrilldownError::Eval {
                        expr: value.clone(),
                        source,
                    })?;
                self.write(token, render_value(&result), *submit)
            }
            Action::Link { value, target } => {
                let resolved = self.resolve(value, event, event.data.first(), Escaper::Url);
                let url = rewrite_link(&resolved, &self.env.page);
                let new_window = event
                    .original
                    .map(|m| m.wants_new_window())
                    .unwrap_or(false);
                let target = target.as_deref().or(self.target);
                self.env.navigator.navigate(&url, new_window, target);
                Effect::Navigate {
                    url,
                    new_window,
                    target: target.map(str::to_string),
                }
            }
        };
        Ok(effect)
    }

    fn resolve(
        &self,
        template: &str,
        event: &DrilldownEvent,
        row: Option<&Fields>,
        escaper: Escaper,
    ) -> String {
        let source = self.env.value_source(event, row);
        resolve_with_filters(template, &source, escaper, &self.env.filters)
    }

    fn write(&self, token: &str, value: String, submit: bool) -> Effect {
        let submitted = submit && self.env.tokens.submitted.is_some();
        self.env.tokens.apply(token, value.clone(), submit);
        Effect::TokenSet {
            token: token.to_string(),
            value,
            submitted,
        }
    }
}
