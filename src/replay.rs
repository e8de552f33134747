//! Replays scripted component events against a dashboard's handlers.
//!
//! A script is JSON lines, one step each:
//!
//! ```text
//! {"op": "mount", "component": "chart1"}
//! {"op": "emit", "component": "chart1", "event": "click", "attributes": {"name": "Save"}}
//! {"op": "unmount", "component": "chart1"}
//! ```

use crate::app::context::Environment;
use crate::app::event::{DrilldownEvent, Modifiers, Payload};
use crate::app::handler::EventHandler;
use crate::app::state::{Dispatch, ReportQueue};
use crate::binding::{ComponentInstance, Components};
use crate::config::{AppConfig, Dashboard};
use crate::error::ConfigError;
use crate::eval::BasicEvaluator;
use crate::navigation::{Navigation, PageContext, RecordingNavigator};
use crate::tokens::{Fields, TokenModel, TokenScope, TokenScopes};
use serde::Deserialize;
use std::collections::{BTreeMap, HashMap};
use std::rc::Rc;
use tracing::{debug, warn};

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "op", rename_all = "lowercase")]
pub enum ScriptStep {
    /// Register a fresh instance under `component`, replacing any previous one.
    Mount { component: String },
    Unmount { component: String },
    Emit {
        component: String,
        event: String,
        #[serde(default)]
        data: Payload,
        #[serde(default)]
        attributes: Fields,
        #[serde(default)]
        meta: bool,
        #[serde(default)]
        ctrl: bool,
    },
}

impl ScriptStep {
    pub fn parse(line: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(line)
    }
}

/// A dashboard page with in-memory components, tokens and navigation.
pub struct Replay {
    registry: Rc<Components>,
    mounted: HashMap<String, Rc<ComponentInstance>>,
    handlers: Vec<EventHandler>,
    tokens: TokenScopes,
    navigator: Rc<RecordingNavigator>,
    reports: Rc<ReportQueue>,
}

impl Replay {
    pub fn new(dashboard: &Dashboard, config: &AppConfig) -> Result<Self, ConfigError> {
        let registry = Rc::new(Components::new());
        let submitted: Option<Rc<dyn TokenScope>> = if config.tokens.submitted_scope {
            Some(Rc::new(TokenModel::new()))
        } else {
            None
        };
        let tokens = TokenScopes::new(Rc::new(TokenModel::new()), submitted);
        for (name, value) in &config.tokens.initial {
            tokens.apply(name, value.clone(), true);
        }
        let navigator = Rc::new(RecordingNavigator::new());
        let reports = Rc::new(ReportQueue::default());

        let env = Environment::new(
            registry.clone(),
            tokens.clone(),
            Rc::new(BasicEvaluator::new()),
            navigator.clone(),
        )
        .with_page(PageContext::from(config.page.clone()))
        .with_reports(reports.clone());

        let handlers = dashboard
            .handlers
            .iter()
            .map(|handler| EventHandler::new(handler.clone(), env.clone()))
            .collect::<Result<Vec<_>, _>>()?;
        debug!(dashboard = %dashboard.name, handlers = handlers.len(), "dashboard loaded");

        Ok(Self {
            registry,
            mounted: HashMap::new(),
            handlers,
            tokens,
            navigator,
            reports,
        })
    }

    /// Run one step and return the reports of every handler it triggered.
    pub fn apply(&mut self, step: ScriptStep) -> Vec<Dispatch> {
        match step {
            ScriptStep::Mount { component } => {
                let instance = Rc::new(ComponentInstance::new());
                self.mounted.insert(component.clone(), instance.clone());
                self.registry.register(&component, instance);
            }
            ScriptStep::Unmount { component } => {
                if self.mounted.remove(&component).is_none() {
                    warn!(component = %component, "unmount of a component that is not mounted");
                }
                self.registry.remove(&component);
            }
            ScriptStep::Emit {
                component,
                event,
                data,
                attributes,
                meta,
                ctrl,
            } => match self.mounted.get(&component) {
                Some(instance) => {
                    let mut payload = DrilldownEvent::new(data);
                    payload.attributes = attributes;
                    if meta || ctrl {
                        payload = payload.with_original(Modifiers { meta, ctrl });
                    }
                    let prevented = instance.emit(&event, payload);
                    debug!(component = %component, event = %event, prevented, "event emitted");
                }
                None => warn!(component = %component, event = %event, "emit on a component that is not mounted"),
            },
        }
        self.reports.take()
    }

    pub fn handlers(&self) -> &[EventHandler] {
        &self.handlers
    }

    /// Default-scope tokens.
    pub fn tokens(&self) -> BTreeMap<String, String> {
        self.tokens.default.snapshot()
    }

    pub fn submitted_tokens(&self) -> BTreeMap<String, String> {
        self.tokens.submitted_snapshot()
    }

    pub fn take_navigations(&self) -> Vec<Navigation> {
        self.navigator.take()
    }
}
