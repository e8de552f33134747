//! The event handler: matches events from a bound component against its
//! conditions and runs the actions of the first match.

use super::condition::{Condition, Matcher};
use super::context::Environment;
use super::event::DrilldownEvent;
use super::executor::Executor;
use super::state::{Dispatch, HandlerState};
use crate::binding::{Binding, Listener};
use crate::config::HandlerConfig;
use crate::error::ConfigError;
use std::rc::{Rc, Weak};
use tracing::{debug, error};

struct HandlerInner {
    event: String,
    conditions: Vec<Condition>,
    target: Option<String>,
    env: Environment,
    binding: Binding,
}

impl HandlerInner {
    fn dispatch(&self, event: &DrilldownEvent) -> Dispatch {
        let mut report = Dispatch::new(&self.event, self.binding.component_id());
        let matcher = Matcher::new(&self.env);
        let Some((index, condition)) = matcher.first_match(&self.conditions, event) else {
            debug!(handler = %self.event, component = ?report.component_id, "no condition matched");
            return report;
        };

        event.prevent_default();
        report.matched = Some(index);

        let executor = Executor::new(&self.env, self.target.as_deref());
        for action in &condition.actions {
            match executor.execute(action, event) {
                Ok(effect) => report.effects.push(effect),
                Err(e) => {
                    error!(handler = %self.event, component = ?report.component_id, error = %e, "drilldown action failed");
                    report.errors.push(e);
                }
            }
        }
        report
    }
}

/// A drilldown handler bound to one event of one component.
///
/// Events delivered through the binding are processed immediately. Their
/// reports go to the environment's report sink, if it has one.
pub struct EventHandler {
    inner: Rc<HandlerInner>,
}

impl EventHandler {
    pub fn new(config: HandlerConfig, env: Environment) -> Result<Self, ConfigError> {
        let HandlerConfig {
            component_id,
            event,
            conditions,
            target,
        } = config.validate()?;

        let inner = Rc::new_cyclic(|weak: &Weak<HandlerInner>| {
            let weak = weak.clone();
            let listener: Listener = Rc::new(move |event: &DrilldownEvent| {
                if let Some(inner) = weak.upgrade() {
                    let report = inner.dispatch(event);
                    if let Some(sink) = &inner.env.reports {
                        sink.report(report);
                    }
                }
            });
            HandlerInner {
                binding: Binding::new(env.registry.clone(), event.clone(), listener),
                event,
                conditions,
                target,
                env,
            }
        });

        let handler = Self { inner };
        handler.set_component_id(component_id.as_deref());
        Ok(handler)
    }

    /// Run `event` through the conditions directly, bypassing the binding.
    /// The report is returned rather than sent to the sink.
    pub fn handle_event(&self, event: &DrilldownEvent) -> Dispatch {
        self.inner.dispatch(event)
    }

    /// Follow a different component. The old subscription is dropped before
    /// the new one is made.
    pub fn set_component_id(&self, id: Option<&str>) {
        self.inner.binding.bind(id);
    }

    pub fn component_id(&self) -> Option<String> {
        self.inner.binding.component_id()
    }

    pub fn event_name(&self) -> &str {
        &self.inner.event
    }

    pub fn conditions(&self) -> &[Condition] {
        &self.inner.conditions
    }

    pub fn state(&self) -> HandlerState {
        if self.inner.binding.is_bound() {
            HandlerState::Bound
        } else {
            HandlerState::Unbound
        }
    }
}

impl std::fmt::Debug for EventHandler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventHandler")
            .field("event", &self.inner.event)
            .field("component_id", &self.component_id())
            .field("conditions", &self.inner.conditions.len())
            .field("state", &self.state())
            .finish()
    }
}
