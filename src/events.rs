//! Listener registration with explicit handles.
//!
//! Every `subscribe` returns a [`SubscriptionId`]. Listeners are removed one
//! at a time with [`Subscriptions::unsubscribe`] or all at once with
//! [`Subscriptions::dispose`]; after disposal new registrations are refused
//! and nothing is ever emitted again.

use std::fmt;

/// Handle to one registered listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(u64);

type Listener<E> = Box<dyn FnMut(&E)>;

/// Arena of listeners for events of type `E`.
pub struct Subscriptions<E> {
    next_id: u64,
    listeners: Vec<(SubscriptionId, Listener<E>)>,
    disposed: bool,
}

impl<E> Default for Subscriptions<E> {
    fn default() -> Self {
        Self {
            next_id: 0,
            listeners: Vec::new(),
            disposed: false,
        }
    }
}

impl<E> fmt::Debug for Subscriptions<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscriptions")
            .field("listeners", &self.listeners.len())
            .field("disposed", &self.disposed)
            .finish()
    }
}

impl<E> Subscriptions<E> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a listener. Returns `None` once disposed.
    pub fn subscribe(&mut self, listener: impl FnMut(&E) + 'static) -> Option<SubscriptionId> {
        if self.disposed {
            return None;
        }
        let id = SubscriptionId(self.next_id);
        self.next_id += 1;
        self.listeners.push((id, Box::new(listener)));
        Some(id)
    }

    /// Remove one listener. Returns whether it was registered.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(sid, _)| *sid != id);
        self.listeners.len() != before
    }

    /// Deliver an event to every listener in registration order.
    pub fn emit(&mut self, event: &E) {
        for (_, listener) in &mut self.listeners {
            listener(event);
        }
    }

    pub fn len(&self) -> usize {
        self.listeners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.listeners.is_empty()
    }

    /// Revoke every subscription and refuse new ones.
    pub fn dispose(&mut self) {
        self.listeners.clear();
        self.disposed = true;
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed
    }
}
