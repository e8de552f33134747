//! Core drilldown logic: events, conditions, action execution and the
//! handler that ties them to a bound component.

pub mod action;
pub mod condition;
pub mod context;
pub mod event;
pub mod executor;
pub mod handler;
pub mod state;
