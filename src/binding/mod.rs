//! Binding lifecycle: component registry contracts and the subscription
//! manager that follows a component id across instance replacements.

pub mod manager;
pub mod registry;

pub use manager::Binding;
pub use registry::{
    ChangeCallback, Component, ComponentInstance, ComponentRef, ComponentRegistry, Components,
    Listener, ListenerId, WatchId,
};
