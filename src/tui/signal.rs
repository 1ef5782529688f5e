//! Invalidation signal carried by every control.
//!
//! A signal holds two kinds of handlers. A relay forwards the notification
//! to the container that owns the control; it is installed by the tree when
//! the control is added and removed when the control leaves. A callback is
//! an external listener, typically the driver that schedules redraws.

use slotmap::{SlotMap, new_key_type};

use crate::tui::tree::ControlId;

new_key_type! {
    /// Handle returned when subscribing to a control's invalidation signal.
    pub struct SubscriptionId;
}

pub enum Handler {
    Relay(ControlId),
    Callback(Box<dyn FnMut()>),
}

impl std::fmt::Debug for Handler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Handler::Relay(container) => f.debug_tuple("Relay").field(container).finish(),
            Handler::Callback(_) => f.write_str("Callback(..)"),
        }
    }
}

#[derive(Debug, Default)]
pub struct Signal {
    handlers: SlotMap<SubscriptionId, Handler>,
}

impl Signal {
    pub fn subscribe(&mut self, handler: Handler) -> SubscriptionId {
        self.handlers.insert(handler)
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> Option<Handler> {
        self.handlers.remove(id)
    }

    pub fn contains(&self, id: SubscriptionId) -> bool {
        self.handlers.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    /// Number of relay handlers installed.
    pub fn relay_count(&self) -> usize {
        self.handlers
            .values()
            .filter(|handler| matches!(handler, Handler::Relay(_)))
            .count()
    }

    /// The container this subscription relays to, if it is a relay.
    pub fn relay_target(&self, id: SubscriptionId) -> Option<ControlId> {
        match self.handlers.get(id) {
            Some(Handler::Relay(container)) => Some(*container),
            _ => None,
        }
    }

    /// Run every callback and push relay targets onto `relays`.
    ///
    /// Relays are not followed here; the tree walks them so that a deep tree
    /// does not turn into deep recursion.
    pub fn raise(&mut self, relays: &mut Vec<ControlId>) {
        for handler in self.handlers.values_mut() {
            match handler {
                Handler::Relay(container) => relays.push(*container),
                Handler::Callback(callback) => callback(),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use slotmap::KeyData;
    use std::cell::Cell;
    use std::rc::Rc;

    #[test]
    fn test_raise_runs_callbacks_and_collects_relays() {
        let hits = Rc::new(Cell::new(0));
        let mut signal = Signal::default();
        let counter = hits.clone();
        signal.subscribe(Handler::Callback(Box::new(move || {
            counter.set(counter.get() + 1)
        })));
        let target = ControlId::from(KeyData::from_ffi(7));
        signal.subscribe(Handler::Relay(target));

        let mut relays = Vec::new();
        signal.raise(&mut relays);
        signal.raise(&mut relays);

        assert_eq!(hits.get(), 2);
        assert_eq!(relays, vec![target, target]);
    }

    #[test]
    fn test_unsubscribe_stops_delivery() {
        let hits = Rc::new(Cell::new(0));
        let mut signal = Signal::default();
        let counter = hits.clone();
        let id = signal.subscribe(Handler::Callback(Box::new(move || {
            counter.set(counter.get() + 1)
        })));

        assert!(signal.unsubscribe(id).is_some());
        assert!(signal.unsubscribe(id).is_none());
        signal.raise(&mut Vec::new());
        assert_eq!(hits.get(), 0);
        assert!(signal.is_empty());
    }
}
