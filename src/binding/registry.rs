//! Component registry and component handles.
//!
//! Handlers never hold on to a component by identity; they ask the registry
//! for whatever instance currently answers to an id and watch for
//! replacements.

use crate::app::event::DrilldownEvent;
use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

pub type Listener = Rc<dyn Fn(&DrilldownEvent)>;
pub type ComponentRef = Rc<dyn Component>;
/// Called with the new instance for a watched id, or `None` when it is removed.
pub type ChangeCallback = Rc<dyn Fn(Option<ComponentRef>)>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WatchId(u64);

/// A live UI component that emits named events.
pub trait Component {
    fn on(&self, event: &str, listener: Listener) -> ListenerId;
    fn off(&self, event: &str, id: ListenerId);
    /// Most recent event of this kind, replayed to late subscribers.
    fn last_event(&self, event: &str) -> Option<DrilldownEvent>;
}

pub trait ComponentRegistry {
    fn get(&self, id: &str) -> Option<ComponentRef>;
    fn watch(&self, id: &str, callback: ChangeCallback) -> WatchId;
    fn unwatch(&self, id: &str, watch: WatchId);
}

/// In-memory component that records its listeners and last events.
#[derive(Default)]
pub struct ComponentInstance {
    listeners: RefCell<HashMap<String, Vec<(ListenerId, Listener)>>>,
    last: RefCell<HashMap<String, DrilldownEvent>>,
    next_id: Cell<u64>,
}

impl ComponentInstance {
    pub fn new() -> Self {
        Self::default()
    }

    /// Deliver `event` to every listener of `name` and remember it for
    /// replay. Returns whether a listener prevented the default behavior.
    pub fn emit(&self, name: &str, event: DrilldownEvent) -> bool {
        self.last.borrow_mut().insert(name.to_string(), event.clone());
        // Listeners may subscribe or unsubscribe while running.
        let listeners: Vec<Listener> = self
            .listeners
            .borrow()
            .get(name)
            .map(|l| l.iter().map(|(_, f)| f.clone()).collect())
            .unwrap_or_default();
        for listener in listeners {
            listener(&event);
        }
        event.default_prevented()
    }

    pub fn listener_count(&self, name: &str) -> usize {
        self.listeners.borrow().get(name).map_or(0, Vec::len)
    }
}

impl Component for ComponentInstance {
    fn on(&self, event: &str, listener: Listener) -> ListenerId {
        let id = ListenerId(self.next_id.get());
        self.next_id.set(id.0 + 1);
        self.listeners
            .borrow_mut()
            .entry(event.to_string())
            .or_default()
            .push((id, listener));
        id
    }

    fn off(&self, event: &str, id: ListenerId) {
        if let Some(list) = self.listeners.borrow_mut().get_mut(event) {
            list.retain(|(lid, _)| *lid != id);
        }
    }

    fn last_event(&self, event: &str) -> Option<DrilldownEvent> {
        self.last.borrow().get(event).cloned()
    }
}

impl fmt::Debug for ComponentInstance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let counts: HashMap<String, usize> = self
            .listeners
            .borrow()
            .iter()
            .map(|(k, v)| (k.clone(), v.len()))
            .collect();
        f.debug_struct("ComponentInstance")
            .field("listeners", &counts)
            .finish()
    }
}

/// In-memory registry keyed by component id.
#[derive(Default)]
pub struct Components {
    entries: RefCell<HashMap<String, ComponentRef>>,
    watchers: RefCell<HashMap<String, Vec<(WatchId, ChangeCallback)>>>,
    next_id: Cell<u64>,
}

impl Components {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `component` under `id`, replacing any previous instance, and
    /// notify watchers of `id`.
    pub fn register(&self, id: &str, component: ComponentRef) {
        self.entries
            .borrow_mut()
            .insert(id.to_string(), component.clone());
        self.notify(id, Some(component));
    }

    /// Remove the instance registered under `id` and notify watchers.
    pub fn remove(&self, id: &str) -> Option<ComponentRef> {
        let removed = self.entries.borrow_mut().remove(id);
        if removed.is_some() {
            self.notify(id, None);
        }
        removed
    }

    pub fn watcher_count(&self, id: &str) -> usize {
        self.watchers.borrow().get(id).map_or(0, Vec::len)
    }

    fn notify(&self, id: &str, component: Option<ComponentRef>) {
        let callbacks: Vec<ChangeCallback> = self
            .watchers
            .borrow()
            .get(id)
            .map(|w| w.iter().map(|(_, cb)| cb.clone()).collect())
            .unwrap_or_default();
        for callback in callbacks {
            callback(component.clone());
        }
    }
}

impl ComponentRegistry for Components {
    fn get(&self, id: &str) -> Option<ComponentRef> {
        self.entries.borrow().get(id).cloned()
    }

    fn watch(&self, id: &str, callback: ChangeCallback) -> WatchId {
        let watch = WatchId(self.next_id.get());
        self.next_id.set(watch.0 + 1);
        self.watchers
            .borrow_mut()
            .entry(id.to_string())
            .or_default()
            .push((watch, callback));
        watch
    }

    fn unwatch(&self, id: &str, watch: WatchId) {
        if let Some(list) = self.watchers.borrow_mut().get_mut(id) {
            list.retain(|(w, _)| *w != watch);
        }
    }
}

impl fmt::Debug for Components {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut ids: Vec<String> = self.entries.borrow().keys().cloned().collect();
        ids.sort();
        f.debug_struct("Components").field("ids", &ids).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_emit_reaches_listeners_and_is_cached() {
        let component = ComponentInstance::new();
        let hits = Rc::new(Cell::new(0));
        let h = hits.clone();
        let id = component.on("click", Rc::new(move |_: &DrilldownEvent| h.set(h.get() + 1)));

        component.emit("click", DrilldownEvent::default());
        component.emit("hover", DrilldownEvent::default());
        assert_eq!(hits.get(), 1);
        assert!(component.last_event("click").is_some());
        assert!(component.last_event("change").is_none());

        component.off("click", id);
        component.emit("click", DrilldownEvent::default());
        assert_eq!(hits.get(), 1);
        assert_eq!(component.listener_count("click"), 0);
    }

    #[test]
    fn test_registry_notifies_watchers() {
        let registry = Components::new();
        let seen = Rc::new(RefCell::new(Vec::new()));
        let s = seen.clone();
        let watch = registry.watch("chart", Rc::new(move |c: Option<ComponentRef>| s.borrow_mut().push(c.is_some())));

        registry.register("chart", Rc::new(ComponentInstance::new()));
        registry.register("other", Rc::new(ComponentInstance::new()));
        registry.remove("chart");
        registry.remove("chart");
        assert_eq!(*seen.borrow(), vec![true, false]);

        registry.unwatch("chart", watch);
        assert_eq!(registry.watcher_count("chart"), 0);
        registry.register("chart", Rc::new(ComponentInstance::new()));
        assert_eq!(seen.borrow().len(), 2);
    }
}
