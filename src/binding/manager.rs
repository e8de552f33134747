//! Keeps one listener attached to whichever component currently answers to
//! an id.

use super::registry::{ComponentRef, ComponentRegistry, Listener, ListenerId, WatchId};
use std::cell::RefCell;
use std::rc::{Rc, Weak};
use tracing::debug;

#[derive(Default)]
struct BindingState {
    component_id: Option<String>,
    watch: Option<WatchId>,
    current: Option<(ComponentRef, ListenerId)>,
}

/// Owned subscription of one listener to one named event of a component
/// tracked by id.
///
/// Switching instances detaches from the old one and attaches to the new one
/// inside a single call, so the listener is never attached to two
/// components. Dropping the binding releases both the registry watch and the
/// component subscription.
pub struct Binding {
    registry: Rc<dyn ComponentRegistry>,
    event_name: Rc<str>,
    listener: Listener,
    state: Rc<RefCell<BindingState>>,
}

impl Binding {
    pub fn new(
        registry: Rc<dyn ComponentRegistry>,
        event_name: impl Into<String>,
        listener: Listener,
    ) -> Self {
        Self {
            registry,
            event_name: Rc::from(event_name.into()),
            listener,
            state: Rc::new(RefCell::new(BindingState::default())),
        }
    }

    /// Track `component_id` from now on, dropping whatever was tracked
    /// before. `None` leaves the binding idle.
    pub fn bind(&self, component_id: Option<&str>) {
        self.release();
        let Some(id) = component_id else {
            return;
        };
        self.state.borrow_mut().component_id = Some(id.to_string());

        let weak: Weak<RefCell<BindingState>> = Rc::downgrade(&self.state);
        let event_name = self.event_name.clone();
        let listener = self.listener.clone();
        let watch = self.registry.watch(
            id,
            Rc::new(move |component: Option<ComponentRef>| {
                if let Some(state) = weak.upgrade() {
                    switch(&state, &event_name, &listener, component);
                }
            }),
        );
        self.state.borrow_mut().watch = Some(watch);

        match self.registry.get(id) {
            Some(component) => switch(&self.state, &self.event_name, &self.listener, Some(component)),
            None => debug!(component = id, event = %self.event_name, "no component registered yet"),
        }
    }

    /// Stop tracking any component.
    pub fn unbind(&self) {
        self.release();
    }

    pub fn is_bound(&self) -> bool {
        self.state.borrow().current.is_some()
    }

    pub fn component_id(&self) -> Option<String> {
        self.state.borrow().component_id.clone()
    }

    pub fn event_name(&self) -> &str {
        &self.event_name
    }

    fn release(&self) {
        let (id, watch, current) = {
            let mut state = self.state.borrow_mut();
            (state.component_id.take(), state.watch.take(), state.current.take())
        };
        if let (Some(id), Some(watch)) = (&id, watch) {
            self.registry.unwatch(id, watch);
        }
        if let Some((component, listener_id)) = current {
            component.off(&self.event_name, listener_id);
        }
    }
}

impl Drop for Binding {
    fn drop(&mut self) {
        self.release();
    }
}

/// Move the subscription to `component` (or drop it when `None`), then
/// replay the new component's last event of this kind.
fn switch(
    state: &Rc<RefCell<BindingState>>,
    event_name: &str,
    listener: &Listener,
    component: Option<ComponentRef>,
) {
    let replay = {
        let mut state = state.borrow_mut();
        if let Some((old, listener_id)) = state.current.take() {
            old.off(event_name, listener_id);
        }
        match component {
            Some(component) => {
                let listener_id = component.on(event_name, listener.clone());
                let last = component.last_event(event_name);
                debug!(
                    component = ?state.component_id,
                    event = event_name,
                    replay = last.is_some(),
                    "bound to component"
                );
                state.current = Some((component, listener_id));
                last
            }
            None => {
                debug!(component = ?state.component_id, event = event_name, "component removed");
                None
            }
        }
    };
    if let Some(event) = replay {
        listener(&event);
    }
}
