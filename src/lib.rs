//! Dashboard drilldown dispatch.
//!
//! A dashboard declares handlers of the form "when component X emits event Y,
//! run the actions of the first condition the event satisfies". Actions set
//! and unset tokens, evaluate expressions into tokens, or navigate to a link,
//! with `$token$` placeholders substituted from the page's tokens and the
//! event payload.
//!
//! ```
//! use drilldown::{Action, Condition, DrilldownEvent, Environment, EventHandler, HandlerConfig};
//! use drilldown::{BasicEvaluator, ComponentInstance, Components, RecordingNavigator, TokenScope, TokenScopes};
//! use std::rc::Rc;
//!
//! let registry = Rc::new(Components::new());
//! let tokens = TokenScopes::in_memory();
//! let env = Environment::new(
//!     registry.clone(),
//!     tokens.clone(),
//!     Rc::new(BasicEvaluator::new()),
//!     Rc::new(RecordingNavigator::new()),
//! );
//! let config = HandlerConfig::new("click")
//!     .component("chart1")
//!     .condition(Condition::attr("name", "Save", [Action::set("status", "saved:$name$")]))
//!     .condition(Condition::any([Action::unset("status")]));
//! let _handler = EventHandler::new(config, env).unwrap();
//!
//! let chart = Rc::new(ComponentInstance::new());
//! registry.register("chart1", chart.clone());
//! chart.emit("click", DrilldownEvent::default().with_attribute("name", "Save"));
//! assert_eq!(tokens.default.get("status").as_deref(), Some("saved:Save"));
//! ```

pub mod app;
pub mod binding;
pub mod config;
pub mod error;
pub mod eval;
pub mod logging;
pub mod navigation;
pub mod replay;
pub mod tokens;

pub use app::action::{Action, DeclaredAction};
pub use app::condition::{Condition, ConditionTest, Matcher};
pub use app::context::Environment;
pub use app::event::{DrilldownEvent, Modifiers, Payload};
pub use app::executor::Executor;
pub use app::handler::EventHandler;
pub use app::state::{Dispatch, Effect, HandlerState, ReportQueue, ReportSink};
pub use binding::{Binding, Component, ComponentInstance, ComponentRegistry, Components};
pub use config::{AppConfig, Dashboard, HandlerConfig};
pub use error::{ConfigError, DrilldownError, EvalError};
pub use eval::{BasicEvaluator, ExpressionEvaluator};
pub use navigation::{Navigator, PageContext, RecordingNavigator};
pub use replay::{Replay, ScriptStep};
pub use tokens::{TokenModel, TokenScope, TokenScopes, ValueSource};
