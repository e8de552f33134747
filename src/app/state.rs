use crate::error::DrilldownError;
use chrono::{DateTime, Local};
use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use tracing::warn;

/// One observable change made while handling an event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    TokenSet {
        token: String,
        value: String,
        submitted: bool,
    },
    TokenUnset {
        token: String,
        submitted: bool,
    },
    Navigate {
        url: String,
        new_window: bool,
        target: Option<String>,
    },
}

/// What happened when a handler received one event.
#[derive(Debug, Clone)]
pub struct Dispatch {
    pub at: DateTime<Local>,
    pub event_name: String,
    pub component_id: Option<String>,
    /// Index of the condition that matched, if any.
    pub matched: Option<usize>,
    pub effects: Vec<Effect>,
    pub errors: Vec<DrilldownError>,
}

impl Dispatch {
    pub fn new(event_name: impl Into<String>, component_id: Option<String>) -> Self {
        Self {
            at: Local::now(),
            event_name: event_name.into(),
            component_id,
            matched: None,
            effects: Vec::new(),
            errors: Vec::new(),
        }
    }

    pub fn navigations(&self) -> impl Iterator<Item = &Effect> {
        self.effects
            .iter()
            .filter(|e| matches!(e, Effect::Navigate { .. }))
    }
}

/// Receives the reports of events a handler gets through its binding.
pub trait ReportSink {
    fn report(&self, dispatch: Dispatch);
}

/// A bounded [`ReportSink`] the host drains with [`ReportQueue::take`].
/// When full, the oldest report is dropped.
#[derive(Debug)]
pub struct ReportQueue {
    capacity: usize,
    queue: RefCell<VecDeque<Dispatch>>,
    dropped: Cell<usize>,
}

impl ReportQueue {
    pub const DEFAULT_CAPACITY: usize = 1024;

    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            queue: RefCell::new(VecDeque::with_capacity(capacity.min(Self::DEFAULT_CAPACITY))),
            dropped: Cell::new(0),
        }
    }

    /// Reports received since the last call, oldest first.
    pub fn take(&self) -> Vec<Dispatch> {
        self.queue.borrow_mut().drain(..).collect()
    }

    pub fn len(&self) -> usize {
        self.queue.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.borrow().is_empty()
    }

    /// Reports discarded because the queue was full.
    pub fn dropped(&self) -> usize {
        self.dropped.get()
    }
}

impl Default for ReportQueue {
    fn default() -> Self {
        Self::new(Self::DEFAULT_CAPACITY)
    }
}

impl ReportSink for ReportQueue {
    fn report(&self, dispatch: Dispatch) {
        if self.capacity == 0 {
            self.dropped.set(self.dropped.get() + 1);
            return;
        }
        let mut queue = self.queue.borrow_mut();
        if queue.len() >= self.capacity {
            queue.pop_front();
            let dropped = self.dropped.get() + 1;
            self.dropped.set(dropped);
            if dropped == 1 {
                warn!(capacity = self.capacity, "report queue full, dropping oldest reports");
            }
        }
        queue.push_back(dispatch);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandlerState {
    /// No component id, or the id is not registered yet.
    Unbound,
    Bound,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_queue_keeps_newest_reports() {
        let queue = ReportQueue::new(3);
        for i in 0..10 {
            queue.report(Dispatch::new(format!("e{}", i), None));
        }
        assert_eq!(queue.len(), 3);
        assert_eq!(queue.dropped(), 7);
        let names: Vec<String> = queue.take().into_iter().map(|d| d.event_name).collect();
        assert_eq!(names, vec!["e7", "e8", "e9"]);
        assert!(queue.is_empty());
    }

    #[test]
    fn test_zero_capacity_queue_keeps_nothing() {
        let queue = ReportQueue::new(0);
        queue.report(Dispatch::new("click", None));
        assert!(queue.take().is_empty());
        assert_eq!(queue.dropped(), 1);
    }
}
